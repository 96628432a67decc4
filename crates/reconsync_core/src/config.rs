//! Engine configuration.

/// What the merge does with payload members that match no field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFieldPolicy {
    /// Skip them silently.
    #[default]
    Ignore,
    /// Fail the item.
    Reject,
}

/// Knobs of the reconciliation engine.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Match payload members to fields ignoring ASCII case when there is no
    /// exact match.
    pub case_insensitive_fields: bool,

    /// Handling of payload members that match no field.
    pub unknown_fields: UnknownFieldPolicy,

    /// Create placeholder rows for referenced keys that do not exist yet.
    /// When disabled, such references fail the item.
    pub create_placeholders: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            case_insensitive_fields: true,
            unknown_fields: UnknownFieldPolicy::Ignore,
            create_placeholders: true,
        }
    }
}

impl ReconcilerConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets case-insensitive field matching.
    #[must_use]
    pub const fn case_insensitive_fields(mut self, value: bool) -> Self {
        self.case_insensitive_fields = value;
        self
    }

    /// Sets the unknown-field policy.
    #[must_use]
    pub const fn unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_fields = policy;
        self
    }

    /// Sets whether missing reference targets get placeholder rows.
    #[must_use]
    pub const fn create_placeholders(mut self, value: bool) -> Self {
        self.create_placeholders = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_lenient() {
        let config = ReconcilerConfig::new();
        assert!(config.case_insensitive_fields);
        assert_eq!(config.unknown_fields, UnknownFieldPolicy::Ignore);
        assert!(config.create_placeholders);
    }

    #[test]
    fn builder_chain() {
        let config = ReconcilerConfig::new()
            .case_insensitive_fields(false)
            .unknown_fields(UnknownFieldPolicy::Reject)
            .create_placeholders(false);
        assert!(!config.case_insensitive_fields);
        assert_eq!(config.unknown_fields, UnknownFieldPolicy::Reject);
        assert!(!config.create_placeholders);
    }
}
