//! Validation hooks and download visibility filters.
//!
//! A [`SyncHook`] runs once per uploaded item, after the merge and reference
//! resolution and before that item's commit. It sees the live post-merge
//! entity (edits made here are persisted), the pre-merge snapshot, a read
//! handle on the open store session, the raw change item and the caller
//! context. Returning `false` rejects the item.

use crate::context::RequestContext;
use crate::entity::{Entity, EntitySnapshot};
use crate::error::{SyncError, SyncResult};
use crate::schema::TypeDescriptor;
use crate::store::StoreReader;
use reconsync_protocol::ChangeItem;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Everything a hook can see about one item.
pub struct HookArgs<'a> {
    entity: &'a mut Entity,
    original: Option<&'a EntitySnapshot>,
    store: &'a dyn StoreReader,
    change: &'a ChangeItem,
    context: &'a RequestContext,
    descriptor: &'a TypeDescriptor,
    rejection: Option<String>,
}

impl<'a> HookArgs<'a> {
    pub(crate) fn new(
        entity: &'a mut Entity,
        original: Option<&'a EntitySnapshot>,
        store: &'a dyn StoreReader,
        change: &'a ChangeItem,
        context: &'a RequestContext,
        descriptor: &'a TypeDescriptor,
    ) -> Self {
        Self {
            entity,
            original,
            store,
            change,
            context,
            descriptor,
            rejection: None,
        }
    }

    /// The post-merge entity that will be committed.
    pub fn entity(&self) -> &Entity {
        self.entity
    }

    /// Mutable access to the post-merge entity.
    pub fn entity_mut(&mut self) -> &mut Entity {
        self.entity
    }

    /// The entity as it was before the merge; `None` for creates.
    pub fn original(&self) -> Option<&EntitySnapshot> {
        self.original
    }

    /// Read access to the open session. The entity being processed is
    /// already staged and visible here.
    pub fn store(&self) -> &dyn StoreReader {
        self.store
    }

    /// The raw change item.
    pub fn change(&self) -> &ChangeItem {
        self.change
    }

    /// The caller context.
    pub fn context(&self) -> &RequestContext {
        self.context
    }

    /// The descriptor of the entity's type.
    pub fn descriptor(&self) -> &TypeDescriptor {
        self.descriptor
    }

    /// Records a rejection message and returns `false`, so a hook can end
    /// with `return args.reject("...")`.
    pub fn reject(&mut self, message: impl Into<String>) -> bool {
        self.rejection = Some(message.into());
        false
    }

    pub(crate) fn take_rejection(&mut self) -> Option<String> {
        self.rejection.take()
    }
}

/// Per-type check-and-transform callback.
pub trait SyncHook: Send + Sync {
    /// Inspects and optionally edits the entity. `false` rejects the item.
    fn check_and_process(&self, args: &mut HookArgs<'_>) -> bool;
}

impl<F> SyncHook for F
where
    F: Fn(&mut HookArgs<'_>) -> bool + Send + Sync,
{
    fn check_and_process(&self, args: &mut HookArgs<'_>) -> bool {
        self(args)
    }
}

/// Hook that accepts every item unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl SyncHook for AcceptAll {
    fn check_and_process(&self, _args: &mut HookArgs<'_>) -> bool {
        true
    }
}

/// Runs a hook, turning a `false` return into [`SyncError::HookRejected`] and
/// a panic into [`SyncError::HookFault`].
pub(crate) fn run_hook(hook: &dyn SyncHook, args: &mut HookArgs<'_>) -> SyncResult<()> {
    match catch_unwind(AssertUnwindSafe(|| hook.check_and_process(args))) {
        Ok(true) => Ok(()),
        Ok(false) => Err(SyncError::HookRejected {
            message: args.take_rejection().unwrap_or_else(|| {
                format!(
                    "{} {} was rejected by its validation hook",
                    args.descriptor().name(),
                    args.change().primary_key
                )
            }),
        }),
        Err(panic) => Err(SyncError::HookFault {
            message: panic_message(panic.as_ref()),
        }),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "hook panicked".to_string()
    }
}

/// Decides whether a row is shared with a caller on download.
pub trait VisibilityFilter: Send + Sync {
    /// Returns true if the caller may see the entity.
    fn is_visible(&self, context: &RequestContext, entity: &Entity) -> bool;
}

impl<F> VisibilityFilter for F
where
    F: Fn(&RequestContext, &Entity) -> bool + Send + Sync,
{
    fn is_visible(&self, context: &RequestContext, entity: &Entity) -> bool {
        self(context, entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, TypeDescriptor};
    use crate::store::MemoryStore;
    use crate::store::SyncStore;
    use crate::value::FieldValue;

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::builder("Note")
            .field(FieldDescriptor::text("Text"))
            .build()
            .unwrap()
    }

    fn invoke(hook: &dyn SyncHook, entity: &mut Entity) -> SyncResult<()> {
        let store = MemoryStore::new();
        let session = store.begin();
        let change = ChangeItem::delete("Note", "1");
        let context = RequestContext::anonymous();
        let descriptor = descriptor();
        let mut args = HookArgs::new(entity, None, session.as_reader(), &change, &context, &descriptor);
        run_hook(hook, &mut args)
    }

    #[test]
    fn accept_all_commits() {
        let mut entity = Entity::new();
        assert!(invoke(&AcceptAll, &mut entity).is_ok());
    }

    #[test]
    fn edits_reach_the_entity() {
        let hook = |args: &mut HookArgs<'_>| {
            args.entity_mut().set("Text", "edited");
            true
        };
        let mut entity = Entity::new().with("Text", "original");
        invoke(&hook, &mut entity).unwrap();
        assert_eq!(entity.get("Text"), &FieldValue::from("edited"));
    }

    #[test]
    fn rejection_message() {
        let hook = |args: &mut HookArgs<'_>| args.reject("text is required");
        let err = invoke(&hook, &mut Entity::new()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::HookRejection);
        assert!(err.to_string().contains("text is required"));

        let silent = |_: &mut HookArgs<'_>| false;
        let err = invoke(&silent, &mut Entity::new()).unwrap_err();
        assert!(err.to_string().contains("Note 1"));
    }

    #[test]
    fn panic_becomes_fault() {
        let hook = |_: &mut HookArgs<'_>| -> bool { panic!("boom") };
        let err = invoke(&hook, &mut Entity::new()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::HookFault);
        assert!(err.to_string().contains("boom"));
    }
}
