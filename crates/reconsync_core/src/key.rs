//! Native keys and per-type key resolution.
//!
//! Clients always address objects by a string key. Each registered type
//! carries a [`KeyStrategy`] that turns that string into a [`NativeKey`] and
//! renders native keys back into their canonical client form.

use crate::error::{SyncError, SyncResult};
use crate::value::{FieldType, FieldValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// One component of a native key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyComponent {
    /// Integer component.
    Integer(i64),
    /// Text component.
    Text(String),
    /// UUID component.
    Uuid(Uuid),
}

impl KeyComponent {
    /// Returns the field value stored in the matching key field.
    #[must_use]
    pub fn to_field_value(&self) -> FieldValue {
        match self {
            KeyComponent::Integer(i) => FieldValue::Integer(*i),
            KeyComponent::Text(s) => FieldValue::Text(s.clone()),
            KeyComponent::Uuid(u) => FieldValue::Uuid(*u),
        }
    }
}

impl fmt::Display for KeyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyComponent::Integer(i) => write!(f, "{i}"),
            KeyComponent::Text(s) => f.write_str(s),
            KeyComponent::Uuid(u) => write!(f, "{u}"),
        }
    }
}

/// The key a store uses to address a row.
///
/// Keys are ordered component-wise, which gives stores a stable row order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeKey(Vec<KeyComponent>);

impl NativeKey {
    /// Creates a key from its components.
    #[must_use]
    pub fn new(components: Vec<KeyComponent>) -> Self {
        Self(components)
    }

    /// Creates a single-component key.
    #[must_use]
    pub fn single(component: KeyComponent) -> Self {
        Self(vec![component])
    }

    /// Returns the key components.
    pub fn components(&self) -> &[KeyComponent] {
        &self.0
    }

    /// Returns the number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for a key without components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NativeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

impl From<i64> for NativeKey {
    fn from(value: i64) -> Self {
        Self::single(KeyComponent::Integer(value))
    }
}

impl From<&str> for NativeKey {
    fn from(value: &str) -> Self {
        Self::single(KeyComponent::Text(value.to_string()))
    }
}

impl From<Uuid> for NativeKey {
    fn from(value: Uuid) -> Self {
        Self::single(KeyComponent::Uuid(value))
    }
}

/// The type of one key component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Key used verbatim.
    Text,
    /// Decimal integer.
    Integer,
    /// Hyphenated or simple UUID.
    Uuid,
}

impl KeyKind {
    /// Parses one component.
    pub fn parse(self, raw: &str) -> Result<KeyComponent, String> {
        match self {
            KeyKind::Text if raw.is_empty() => Err("key is empty".to_string()),
            KeyKind::Text => Ok(KeyComponent::Text(raw.to_string())),
            KeyKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(KeyComponent::Integer)
                .map_err(|_| format!("'{raw}' is not an integer")),
            KeyKind::Uuid => Uuid::parse_str(raw.trim())
                .map(KeyComponent::Uuid)
                .map_err(|e| format!("'{raw}' is not a UUID: {e}")),
        }
    }

    /// Returns the field type a key field of this kind must have.
    #[must_use]
    pub const fn field_type(self) -> FieldType {
        match self {
            KeyKind::Text => FieldType::Text,
            KeyKind::Integer => FieldType::Integer,
            KeyKind::Uuid => FieldType::Uuid,
        }
    }
}

/// A user-supplied key resolver for types whose keys do not fit a built-in
/// strategy.
pub trait KeyResolver: Send + Sync {
    /// Parses a client key. The error is a human-readable reason.
    fn resolve(&self, raw: &str) -> Result<NativeKey, String>;

    /// Renders a native key back into its canonical client form.
    fn render(&self, key: &NativeKey) -> String;
}

/// Outcome of resolving a client key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedKey {
    /// The client named a concrete key.
    Known(NativeKey),
    /// The client left the key to the server.
    Unassigned,
}

/// How a type's client keys map to native keys.
#[derive(Clone)]
pub enum KeyStrategy {
    /// One component of the given kind.
    Single(KeyKind),
    /// Several components joined by a separator on the wire.
    Composite {
        /// Wire separator between components.
        separator: String,
        /// Component kinds, in key-field order.
        parts: Vec<KeyKind>,
    },
    /// Integer key assigned by the store on creation.
    AutoIncrement,
    /// Fully custom resolver.
    Custom(Arc<dyn KeyResolver>),
}

impl fmt::Debug for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStrategy::Single(kind) => f.debug_tuple("Single").field(kind).finish(),
            KeyStrategy::Composite { separator, parts } => f
                .debug_struct("Composite")
                .field("separator", separator)
                .field("parts", parts)
                .finish(),
            KeyStrategy::AutoIncrement => f.write_str("AutoIncrement"),
            KeyStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Default for KeyStrategy {
    fn default() -> Self {
        KeyStrategy::Single(KeyKind::Text)
    }
}

impl KeyStrategy {
    /// Single text key.
    #[must_use]
    pub fn text() -> Self {
        KeyStrategy::Single(KeyKind::Text)
    }

    /// Single integer key.
    #[must_use]
    pub fn integer() -> Self {
        KeyStrategy::Single(KeyKind::Integer)
    }

    /// Single UUID key.
    #[must_use]
    pub fn uuid() -> Self {
        KeyStrategy::Single(KeyKind::Uuid)
    }

    /// Composite key.
    #[must_use]
    pub fn composite(separator: impl Into<String>, parts: Vec<KeyKind>) -> Self {
        KeyStrategy::Composite {
            separator: separator.into(),
            parts,
        }
    }

    /// Custom resolver.
    #[must_use]
    pub fn custom(resolver: impl KeyResolver + 'static) -> Self {
        KeyStrategy::Custom(Arc::new(resolver))
    }

    /// Returns true if the store assigns keys for this strategy.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        matches!(self, KeyStrategy::AutoIncrement)
    }

    /// Returns the component kinds, when the strategy declares them.
    pub fn component_kinds(&self) -> Option<Vec<KeyKind>> {
        match self {
            KeyStrategy::Single(kind) => Some(vec![*kind]),
            KeyStrategy::Composite { parts, .. } => Some(parts.clone()),
            KeyStrategy::AutoIncrement => Some(vec![KeyKind::Integer]),
            KeyStrategy::Custom(_) => None,
        }
    }

    /// Converts a client key into a native key.
    ///
    /// Generated-key types accept an empty key, meaning "assign one".
    pub fn resolve(&self, type_name: &str, raw: &str) -> SyncResult<ResolvedKey> {
        let fail = |reason: String| SyncError::key_resolution(type_name, raw, reason);
        match self {
            KeyStrategy::Single(kind) => kind
                .parse(raw)
                .map(|c| ResolvedKey::Known(NativeKey::single(c)))
                .map_err(fail),
            KeyStrategy::Composite { separator, parts } => {
                let pieces: Vec<&str> = raw.split(separator.as_str()).collect();
                if pieces.len() != parts.len() {
                    return Err(fail(format!(
                        "expected {} components separated by '{separator}', found {}",
                        parts.len(),
                        pieces.len()
                    )));
                }
                let components = parts
                    .iter()
                    .zip(pieces)
                    .map(|(kind, piece)| kind.parse(piece))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(fail)?;
                Ok(ResolvedKey::Known(NativeKey::new(components)))
            }
            KeyStrategy::AutoIncrement if raw.trim().is_empty() => Ok(ResolvedKey::Unassigned),
            KeyStrategy::AutoIncrement => KeyKind::Integer
                .parse(raw)
                .map(|c| ResolvedKey::Known(NativeKey::single(c)))
                .map_err(fail),
            KeyStrategy::Custom(resolver) => resolver
                .resolve(raw)
                .map(ResolvedKey::Known)
                .map_err(fail),
        }
    }

    /// Renders a native key in canonical client form.
    #[must_use]
    pub fn render(&self, key: &NativeKey) -> String {
        match self {
            KeyStrategy::Composite { separator, .. } => key
                .components()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(separator.as_str()),
            KeyStrategy::Custom(resolver) => resolver.render(key),
            _ => key.to_string(),
        }
    }
}
