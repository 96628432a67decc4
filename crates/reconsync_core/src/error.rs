//! Error types for the reconciliation engine.

use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for registry construction.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Coarse classification of engine errors.
///
/// Every kind except [`ErrorKind::UnregisteredType`] is reported to the
/// client as a failed upload result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The type name has no registry entry.
    UnregisteredType,
    /// The type is registered but the store has no model for it.
    UnmodeledType,
    /// The client key cannot be parsed for the type's key strategy.
    KeyResolution,
    /// The payload is not a field map.
    MalformedPayload,
    /// A payload value cannot be converted to the field's type.
    FieldCoercion,
    /// A reference field names keys that cannot be resolved.
    ReferenceResolution,
    /// The validation hook returned `false`.
    HookRejection,
    /// The validation hook panicked.
    HookFault,
    /// The store refused the write.
    StoreFault,
    /// The registry itself is inconsistent.
    Schema,
}

/// Errors produced while reconciling a change.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The type name has no registry entry.
    #[error("type {type_name} is not registered")]
    UnregisteredType {
        /// The wire type name.
        type_name: String,
    },

    /// The type is registered but the store cannot represent it.
    #[error("The entity type {type_name} is not part of the model for the current context")]
    UnmodeledType {
        /// The wire type name.
        type_name: String,
    },

    /// The client key could not be converted to a native key.
    #[error("cannot resolve key '{key}' for type {type_name}: {reason}")]
    KeyResolution {
        /// The wire type name.
        type_name: String,
        /// The raw client key.
        key: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The payload could not be read as a field map.
    #[error("malformed payload: {reason}")]
    MalformedPayload {
        /// Why parsing failed.
        reason: String,
    },

    /// A payload value could not be converted to the field's type.
    #[error("cannot assign field {field}: {reason}")]
    FieldCoercion {
        /// The field name.
        field: String,
        /// Why conversion failed.
        reason: String,
    },

    /// A reference field could not be resolved.
    #[error("cannot resolve reference field {field}: {reason}")]
    ReferenceResolution {
        /// The reference field name.
        field: String,
        /// Why resolution failed.
        reason: String,
    },

    /// The validation hook rejected the change.
    #[error("rejected by validation: {message}")]
    HookRejected {
        /// Rejection message.
        message: String,
    },

    /// The validation hook panicked.
    #[error("validation hook failed: {message}")]
    HookFault {
        /// Panic message, if one could be recovered.
        message: String,
    },

    /// The persistence layer refused the operation.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The registry is inconsistent.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl SyncError {
    /// Creates a key resolution error.
    pub fn key_resolution(
        type_name: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::KeyResolution {
            type_name: type_name.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a field coercion error.
    pub fn field_coercion(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FieldCoercion {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a reference resolution error.
    pub fn reference(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReferenceResolution {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::UnregisteredType { .. } => ErrorKind::UnregisteredType,
            SyncError::UnmodeledType { .. } => ErrorKind::UnmodeledType,
            SyncError::KeyResolution { .. } => ErrorKind::KeyResolution,
            SyncError::MalformedPayload { .. } => ErrorKind::MalformedPayload,
            SyncError::FieldCoercion { .. } => ErrorKind::FieldCoercion,
            SyncError::ReferenceResolution { .. } => ErrorKind::ReferenceResolution,
            SyncError::HookRejected { .. } => ErrorKind::HookRejection,
            SyncError::HookFault { .. } => ErrorKind::HookFault,
            SyncError::Store(StoreError::UnknownModel { .. }) => ErrorKind::UnmodeledType,
            SyncError::Store(_) => ErrorKind::StoreFault,
            SyncError::Schema(_) => ErrorKind::Schema,
        }
    }

    /// Returns true if the error is reported to the client as a failed item.
    pub fn is_reported(&self) -> bool {
        self.kind() != ErrorKind::UnregisteredType
    }
}

/// Errors raised by a persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No model is registered under this name.
    #[error("The entity type {model} is not part of the model for the current context")]
    UnknownModel {
        /// Model name.
        model: String,
    },

    /// An insert collided with an existing row.
    #[error("duplicate key {key} in {model}")]
    DuplicateKey {
        /// Model name.
        model: String,
        /// Canonical key.
        key: String,
    },

    /// A required field was left null.
    #[error("required field {field} of {model} {key} is null")]
    MissingRequiredField {
        /// Model name.
        model: String,
        /// Canonical key.
        key: String,
        /// Field name.
        field: String,
    },

    /// A row without a key was written to a model that does not generate keys.
    #[error("{model} does not generate keys and the row has none")]
    MissingKey {
        /// Model name.
        model: String,
    },

    /// A generated key was requested from a model that cannot produce one.
    #[error("{model} cannot generate keys")]
    KeyGenerationUnsupported {
        /// Model name.
        model: String,
    },

    /// I/O failure while loading or saving a store snapshot.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A store snapshot could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while building a type registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Two types share a wire name.
    #[error("type {0} is registered twice")]
    DuplicateType(String),

    /// A type declares the same field twice.
    #[error("type {type_name} declares field {field} twice")]
    DuplicateField {
        /// Type name.
        type_name: String,
        /// Field name.
        field: String,
    },

    /// The key declaration is unusable.
    #[error("type {type_name} has an invalid key: {reason}")]
    InvalidKey {
        /// Type name.
        type_name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A reference field targets an unregistered type.
    #[error("reference field {type_name}.{field} targets unregistered type {target}")]
    UnknownReferenceTarget {
        /// Type name.
        type_name: String,
        /// Field name.
        field: String,
        /// Target type name.
        target: String,
    },

    /// A schema file could not be parsed.
    #[error("invalid schema document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A schema file could not be read.
    #[error("cannot read schema: {0}")]
    Io(#[from] io::Error),
}
