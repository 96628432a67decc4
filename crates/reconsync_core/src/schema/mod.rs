//! Type registry: what gets synchronized and how.

mod config;
mod descriptor;
mod registry;

pub use config::{KeyConfig, SchemaConfig, TypeConfig};
pub use descriptor::{
    FieldDescriptor, Member, ReferenceDescriptor, TypeDescriptor, TypeDescriptorBuilder,
};
pub use registry::{TypeRegistry, TypeRegistryBuilder};
