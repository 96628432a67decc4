//! Reference in-memory store.

use super::{ChangedRow, StoreReader, StoreSession, SyncStore};
use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};
use crate::key::{KeyComponent, NativeKey};
use crate::schema::{TypeDescriptor, TypeRegistry};
use parking_lot::RwLock;
use reconsync_protocol::ChangeTimestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Store-side definition of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDef {
    /// Model name.
    pub name: String,
    /// Whether the model assigns integer keys on creation.
    #[serde(default)]
    pub generated_keys: bool,
    /// Fields that must be non-null on commit.
    #[serde(default)]
    pub required: Vec<String>,
}

impl ModelDef {
    /// Creates a model with caller-supplied keys and no required fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generated_keys: false,
            required: Vec::new(),
        }
    }

    /// Derives the model a registered type needs.
    #[must_use]
    pub fn for_descriptor(descriptor: &TypeDescriptor) -> Self {
        Self {
            name: descriptor.model().to_string(),
            generated_keys: descriptor.key_strategy().is_generated(),
            required: descriptor.required_fields().map(str::to_string).collect(),
        }
    }

    /// Makes the model assign keys.
    #[must_use]
    pub fn with_generated_keys(mut self) -> Self {
        self.generated_keys = true;
        self
    }

    /// Adds a required field.
    #[must_use]
    pub fn with_required(mut self, field: impl Into<String>) -> Self {
        self.required.push(field.into());
        self
    }
}

/// Row counts of one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    /// Model name.
    pub name: String,
    /// Live rows.
    pub rows: usize,
    /// Recorded deletions.
    pub tombstones: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRow {
    entity: Entity,
    changed: ChangeTimestamp,
}

#[derive(Debug, Default)]
struct ModelState {
    rows: BTreeMap<NativeKey, StoredRow>,
    tombstones: BTreeMap<NativeKey, StoredRow>,
    next_id: i64,
}

#[derive(Debug, Default)]
struct StoreState {
    defs: BTreeMap<String, ModelDef>,
    models: BTreeMap<String, ModelState>,
    last_timestamp: ChangeTimestamp,
}

impl StoreState {
    fn model(&self, name: &str) -> StoreResult<&ModelState> {
        self.models.get(name).ok_or_else(|| unknown_model(name))
    }

    fn tick(&mut self) -> ChangeTimestamp {
        let now = ChangeTimestamp::now();
        self.last_timestamp = if now > self.last_timestamp {
            now
        } else {
            self.last_timestamp.next()
        };
        self.last_timestamp
    }
}

fn unknown_model(name: &str) -> StoreError {
    StoreError::UnknownModel {
        model: name.to_string(),
    }
}

fn missing_key(model: &str) -> StoreError {
    StoreError::MissingKey {
        model: model.to_string(),
    }
}

#[derive(Serialize, Deserialize)]
struct ModelSnapshot {
    def: ModelDef,
    next_id: i64,
    rows: Vec<StoredRow>,
    tombstones: Vec<StoredRow>,
}

#[derive(Serialize, Deserialize)]
struct StoreSnapshot {
    last_timestamp: ChangeTimestamp,
    models: Vec<ModelSnapshot>,
}

/// A [`SyncStore`] keeping every model in memory.
///
/// Each commit is stamped with a wall-clock timestamp, bumped when needed so
/// timestamps stay strictly increasing. Deletions leave tombstones so
/// incremental downloads can report them; recreating a key clears its
/// tombstone.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    /// Creates a store with no models.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with a model for every registered type.
    #[must_use]
    pub fn for_registry(registry: &TypeRegistry) -> Self {
        let store = Self::new();
        store.ensure_models(registry);
        store
    }

    /// Adds a model, replacing the definition of an existing one.
    pub fn register_model(&self, def: ModelDef) {
        let mut state = self.state.write();
        state.models.entry(def.name.clone()).or_default();
        state.defs.insert(def.name.clone(), def);
    }

    /// Adds models for registered types that have none yet.
    pub fn ensure_models(&self, registry: &TypeRegistry) {
        for descriptor in registry.iter() {
            if !self.has_model(descriptor.model()) {
                self.register_model(ModelDef::for_descriptor(descriptor));
            }
        }
    }

    /// Returns the row counts of every model, in name order.
    pub fn stats(&self) -> Vec<ModelStats> {
        let state = self.state.read();
        state
            .models
            .iter()
            .map(|(name, model)| ModelStats {
                name: name.clone(),
                rows: model.rows.len(),
                tombstones: model.tombstones.len(),
            })
            .collect()
    }

    /// Reads one committed row.
    pub fn get(&self, model: &str, key: &NativeKey) -> StoreResult<Option<Entity>> {
        let state = self.state.read();
        Ok(state.model(model)?.rows.get(key).map(|row| row.entity.clone()))
    }

    /// Writes the whole store to a JSON file.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        let snapshot = {
            let state = self.state.read();
            StoreSnapshot {
                last_timestamp: state.last_timestamp,
                models: state
                    .defs
                    .values()
                    .map(|def| {
                        let model = state.models.get(&def.name);
                        ModelSnapshot {
                            def: def.clone(),
                            next_id: model.map_or(0, |m| m.next_id),
                            rows: model
                                .map(|m| m.rows.values().cloned().collect())
                                .unwrap_or_default(),
                            tombstones: model
                                .map(|m| m.tombstones.values().cloned().collect())
                                .unwrap_or_default(),
                        }
                    })
                    .collect(),
            }
        };

        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), "saved store snapshot");
        Ok(())
    }

    /// Loads a store written by [`MemoryStore::save_to_path`].
    pub fn load_from_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        let bytes = fs::read(path.as_ref())?;
        let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;

        let mut state = StoreState {
            last_timestamp: snapshot.last_timestamp,
            ..StoreState::default()
        };
        for model in snapshot.models {
            let mut loaded = ModelState {
                next_id: model.next_id,
                ..ModelState::default()
            };
            for (rows, target) in [
                (model.rows, &mut loaded.rows),
                (model.tombstones, &mut loaded.tombstones),
            ] {
                for row in rows {
                    let key = row.entity.key().cloned().ok_or_else(|| missing_key(&model.def.name))?;
                    target.insert(key, row);
                }
            }
            state.models.insert(model.def.name.clone(), loaded);
            state.defs.insert(model.def.name.clone(), model.def);
        }

        Ok(Self {
            state: RwLock::new(state),
        })
    }
}

impl StoreReader for MemoryStore {
    fn find_by_key(&self, model: &str, key: &NativeKey) -> StoreResult<Option<Entity>> {
        self.get(model, key)
    }

    fn scan(&self, model: &str) -> StoreResult<Vec<Entity>> {
        let state = self.state.read();
        Ok(state
            .model(model)?
            .rows
            .values()
            .map(|row| row.entity.clone())
            .collect())
    }
}

impl SyncStore for MemoryStore {
    fn has_model(&self, model: &str) -> bool {
        self.state.read().models.contains_key(model)
    }

    fn begin(&self) -> Box<dyn StoreSession + '_> {
        Box::new(MemorySession {
            store: self,
            staged: BTreeMap::new(),
        })
    }

    fn query_changed_since(
        &self,
        model: &str,
        since: Option<ChangeTimestamp>,
    ) -> StoreResult<Vec<ChangedRow>> {
        let state = self.state.read();
        let model = state.model(model)?;

        let live = model.rows.values().map(|row| (row, false));
        let mut changed: Vec<ChangedRow> = match since {
            None => live
                .map(|(row, deleted)| changed_row(row, deleted))
                .collect(),
            Some(cursor) => live
                .chain(model.tombstones.values().map(|row| (row, true)))
                .filter(|(row, _)| row.changed > cursor)
                .map(|(row, deleted)| changed_row(row, deleted))
                .collect(),
        };
        changed.sort_by_key(|row| row.timestamp);
        Ok(changed)
    }
}

fn changed_row(row: &StoredRow, is_deleted: bool) -> ChangedRow {
    ChangedRow {
        entity: row.entity.clone(),
        timestamp: row.changed,
        is_deleted,
    }
}

#[derive(Debug)]
enum Staged {
    Insert(Entity),
    Placeholder(Entity),
    Update(Entity),
    Delete,
}

struct MemorySession<'a> {
    store: &'a MemoryStore,
    staged: BTreeMap<(String, NativeKey), Staged>,
}

impl MemorySession<'_> {
    fn check_model(&self, model: &str) -> StoreResult<()> {
        if self.store.has_model(model) {
            Ok(())
        } else {
            Err(unknown_model(model))
        }
    }
}

impl StoreReader for MemorySession<'_> {
    fn find_by_key(&self, model: &str, key: &NativeKey) -> StoreResult<Option<Entity>> {
        self.check_model(model)?;
        match self.staged.get(&(model.to_string(), key.clone())) {
            Some(Staged::Insert(entity) | Staged::Placeholder(entity) | Staged::Update(entity)) => {
                Ok(Some(entity.clone()))
            }
            Some(Staged::Delete) => Ok(None),
            None => self.store.get(model, key),
        }
    }

    fn scan(&self, model: &str) -> StoreResult<Vec<Entity>> {
        let mut rows: BTreeMap<NativeKey, Entity> = self
            .store
            .scan(model)?
            .into_iter()
            .filter_map(|e| e.key().cloned().map(|k| (k, e)))
            .collect();
        for ((staged_model, key), staged) in &self.staged {
            if staged_model != model {
                continue;
            }
            match staged {
                Staged::Insert(entity) | Staged::Placeholder(entity) | Staged::Update(entity) => {
                    rows.insert(key.clone(), entity.clone());
                }
                Staged::Delete => {
                    rows.remove(key);
                }
            }
        }
        Ok(rows.into_values().collect())
    }
}

impl StoreSession for MemorySession<'_> {
    fn create(&mut self, model: &str) -> StoreResult<Entity> {
        let mut state = self.store.state.write();
        let generated = state
            .defs
            .get(model)
            .ok_or_else(|| unknown_model(model))?
            .generated_keys;
        if !generated {
            return Ok(Entity::new());
        }
        let counter = state
            .models
            .get_mut(model)
            .ok_or_else(|| unknown_model(model))?;
        counter.next_id += 1;
        let id = counter.next_id;
        Ok(Entity::with_key(NativeKey::single(KeyComponent::Integer(id))))
    }

    fn insert(&mut self, model: &str, entity: Entity) -> StoreResult<()> {
        self.check_model(model)?;
        let key = entity.key().cloned().ok_or_else(|| missing_key(model))?;
        let slot = (model.to_string(), key);
        let staged = match self.staged.remove(&slot) {
            Some(Staged::Delete) => Staged::Update(entity),
            _ => Staged::Insert(entity),
        };
        self.staged.insert(slot, staged);
        Ok(())
    }

    fn insert_placeholder(&mut self, model: &str, entity: Entity) -> StoreResult<()> {
        self.check_model(model)?;
        let key = entity.key().cloned().ok_or_else(|| missing_key(model))?;
        let slot = (model.to_string(), key);
        if !self.staged.contains_key(&slot) {
            self.staged.insert(slot, Staged::Placeholder(entity));
        }
        Ok(())
    }

    fn update(&mut self, model: &str, entity: Entity) -> StoreResult<()> {
        self.check_model(model)?;
        let key = entity.key().cloned().ok_or_else(|| missing_key(model))?;
        let slot = (model.to_string(), key);
        let staged = match self.staged.remove(&slot) {
            Some(Staged::Insert(_) | Staged::Placeholder(_)) => Staged::Insert(entity),
            _ => Staged::Update(entity),
        };
        self.staged.insert(slot, staged);
        Ok(())
    }

    fn delete(&mut self, model: &str, key: &NativeKey) -> StoreResult<bool> {
        self.check_model(model)?;
        let slot = (model.to_string(), key.clone());
        match self.staged.remove(&slot) {
            Some(Staged::Insert(_) | Staged::Placeholder(_)) => Ok(true),
            Some(Staged::Delete) => {
                self.staged.insert(slot, Staged::Delete);
                Ok(false)
            }
            Some(Staged::Update(_)) => {
                self.staged.insert(slot, Staged::Delete);
                Ok(true)
            }
            None => {
                let existed = self.store.get(model, key)?.is_some();
                if existed {
                    self.staged.insert(slot, Staged::Delete);
                }
                Ok(existed)
            }
        }
    }

    fn as_reader(&self) -> &dyn StoreReader {
        self
    }

    fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemorySession { store, staged } = *self;
        if staged.is_empty() {
            return Ok(());
        }
        let mut state = store.state.write();

        for ((model, key), staged) in &staged {
            let def = state.defs.get(model).ok_or_else(|| unknown_model(model))?;
            let rows = &state.model(model)?.rows;
            let entity = match staged {
                Staged::Insert(entity) => {
                    if rows.contains_key(key) {
                        return Err(StoreError::DuplicateKey {
                            model: model.clone(),
                            key: key.to_string(),
                        });
                    }
                    entity
                }
                Staged::Update(entity) => entity,
                Staged::Placeholder(_) | Staged::Delete => continue,
            };
            if let Some(field) = def.required.iter().find(|f| entity.get(f).is_null()) {
                return Err(StoreError::MissingRequiredField {
                    model: model.clone(),
                    key: key.to_string(),
                    field: field.clone(),
                });
            }
        }

        let timestamp = state.tick();
        let writes = staged.len();
        for ((model, key), staged) in staged {
            let Some(target) = state.models.get_mut(&model) else {
                return Err(unknown_model(&model));
            };
            if matches!(staged, Staged::Placeholder(_)) && target.rows.contains_key(&key) {
                continue;
            }
            match staged {
                Staged::Insert(entity) | Staged::Placeholder(entity) | Staged::Update(entity) => {
                    target.tombstones.remove(&key);
                    if let Some(KeyComponent::Integer(id)) = key.components().first() {
                        target.next_id = target.next_id.max(*id);
                    }
                    target.rows.insert(
                        key,
                        StoredRow {
                            entity,
                            changed: timestamp,
                        },
                    );
                }
                Staged::Delete => {
                    if let Some(mut row) = target.rows.remove(&key) {
                        row.changed = timestamp;
                        target.tombstones.insert(key, row);
                    }
                }
            }
        }
        tracing::trace!(writes, %timestamp, "committed session");
        Ok(())
    }
}
