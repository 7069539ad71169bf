//! TOSCA Type Registry
//!
//! Named type definitions for a hierarchically-typed topology modeling
//! language: basic scalar types, struct types, node types, and node
//! templates, with single-inheritance derivation queries and
//! dependency-closure import between registries.

mod environment;
mod import;
mod registry;
mod types;

pub use environment::{ToscaEnvironment, DEFAULT_NAMESPACE};
pub use registry::{RegistryError, TypeRegistry, EMPTY_STRUCT, ROOT_NODE_TYPE};
pub use types::*;
