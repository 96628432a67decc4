//! Caller context forwarded to hooks and visibility filters.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque per-request context.
///
/// The engine never inspects it; it is handed unchanged to validation hooks
/// and download visibility filters.
#[derive(Clone, Default)]
pub struct RequestContext {
    principal: Option<String>,
    data: Option<Arc<dyn Any + Send + Sync>>,
}

impl RequestContext {
    /// Creates an anonymous context.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Creates a context for an authenticated principal.
    #[must_use]
    pub fn for_principal(principal: impl Into<String>) -> Self {
        Self {
            principal: Some(principal.into()),
            data: None,
        }
    }

    /// Attaches arbitrary typed data.
    #[must_use]
    pub fn with_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.data = Some(Arc::new(data));
        self
    }

    /// Returns the principal, if any.
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Returns the attached data if it has type `T`.
    pub fn data<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.data.as_deref().and_then(|d| d.downcast_ref::<T>())
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("principal", &self.principal)
            .field("has_data", &self.data.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tenant(u32);

    #[test]
    fn typed_data() {
        let ctx = RequestContext::for_principal("alice").with_data(Tenant(7));
        assert_eq!(ctx.principal(), Some("alice"));
        assert_eq!(ctx.data::<Tenant>(), Some(&Tenant(7)));
        assert_eq!(ctx.data::<String>(), None);
        assert!(RequestContext::anonymous().principal().is_none());
    }
}
