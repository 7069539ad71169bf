//! Environment façade: one registry per namespace.
//!
//! The environment owns the registries and is the entry point foreign
//! importers talk to. `import_with_supertypes` takes any entity handle from
//! a source registry and pulls its full dependency closure into the default
//! namespace.

use crate::{
    CoercedDef, EntityRef, NodeTypeDef, RegistryError, StructDef, TemplateDef, TypeRegistry,
};
use indexmap::IndexMap;
use tosca_core::{CoercedId, NodeTypeId, StructId, TemplateId};

/// The namespace used when none is specified.
pub const DEFAULT_NAMESPACE: &str = "";

/// Owns one `TypeRegistry` per namespace.
#[derive(Debug)]
pub struct ToscaEnvironment {
    namespaces: IndexMap<String, TypeRegistry>,
}

impl ToscaEnvironment {
    /// Create an environment with a bootstrapped default namespace.
    pub fn new() -> Self {
        let mut namespaces = IndexMap::new();
        namespaces.insert(DEFAULT_NAMESPACE.to_string(), TypeRegistry::new());
        Self { namespaces }
    }

    /// The default namespace's registry.
    pub fn registry(&self) -> &TypeRegistry {
        &self.namespaces[DEFAULT_NAMESPACE]
    }

    /// The default namespace's registry, mutably.
    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.namespaces[DEFAULT_NAMESPACE]
    }

    /// Get a namespace's registry, if it exists.
    pub fn namespace(&self, name: &str) -> Option<&TypeRegistry> {
        self.namespaces.get(name)
    }

    /// Get a namespace's registry mutably, if it exists.
    pub fn namespace_mut(&mut self, name: &str) -> Option<&mut TypeRegistry> {
        self.namespaces.get_mut(name)
    }

    /// Get or create a namespace's registry.
    pub fn add_namespace(&mut self, name: &str) -> &mut TypeRegistry {
        self.namespaces
            .entry(name.to_string())
            .or_insert_with(TypeRegistry::new)
    }

    /// Namespace names, in creation order.
    pub fn namespace_names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(|s| s.as_str())
    }

    /// Register a struct type in the default namespace.
    pub fn register_struct_type(
        &mut self,
        name: &str,
        def: StructDef,
    ) -> Result<StructId, RegistryError> {
        self.registry_mut().register_struct_type(name, def)
    }

    /// Register a node type in the default namespace.
    pub fn register_node_type(
        &mut self,
        name: &str,
        def: NodeTypeDef,
    ) -> Result<NodeTypeId, RegistryError> {
        self.registry_mut().register_node_type(name, def)
    }

    /// Register a node template in the default namespace.
    pub fn register_node_template(
        &mut self,
        name: &str,
        def: TemplateDef,
    ) -> Result<TemplateId, RegistryError> {
        self.registry_mut().register_node_template(name, def)
    }

    /// Register a coerced type in the default namespace.
    pub fn register_coerced_type(
        &mut self,
        name: &str,
        def: CoercedDef,
    ) -> Result<CoercedId, RegistryError> {
        self.registry_mut().register_coerced_type(name, def)
    }

    /// Import any entity from `source` into the default namespace, with its
    /// full dependency closure, and return the local handle. Basic types
    /// resolve to the local bootstrap entities without any work.
    pub fn import_with_supertypes(
        &mut self,
        source: &TypeRegistry,
        entity: EntityRef,
    ) -> Result<EntityRef, RegistryError> {
        let registry = self.registry_mut();
        match entity {
            EntityRef::Basic(basic) => Ok(EntityRef::Basic(basic)),
            EntityRef::Struct(id) => registry
                .import_struct_type(source, id)
                .map(EntityRef::Struct),
            EntityRef::NodeType(id) => registry
                .import_node_type(source, id)
                .map(EntityRef::NodeType),
            EntityRef::Template(id) => registry
                .import_node_template(source, id)
                .map(EntityRef::Template),
            EntityRef::Coerced(id) => registry
                .import_coerced_type(source, id)
                .map(EntityRef::Coerced),
        }
    }
}

impl Default for ToscaEnvironment {
    fn default() -> Self {
        Self::new()
    }
}
