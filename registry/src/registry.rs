//! The TypeRegistry - per-namespace store of named type definitions.
//!
//! Each entity kind lives in an arena `Vec` paired with a name index. Arena
//! slots are never removed, so ids stay stable for the lifetime of the
//! registry and iteration follows insertion order. Rename rebinds the name
//! index and updates the wrapper in place; every holder of the id observes
//! the new name.

use crate::{
    Attribute, BasicType, CoercedDef, NamedCoerced, NamedNodeType, NamedStruct, NamedTemplate,
    NodeTypeDef, Property, Restriction, StructDef, TemplateDef, TypeRef,
};
use indexmap::IndexMap;
use regex_lite::Regex;
use std::collections::HashMap;
use thiserror::Error;
use tosca_core::{CoercedId, NodeTypeId, StructId, TemplateId};

/// Name of the built-in root node type.
pub const ROOT_NODE_TYPE: &str = "tosca.nodes.Root";

/// Name of the hidden bootstrap struct every struct type derives from.
pub const EMPTY_STRUCT: &str = "emptyStruct";

/// Errors that can occur while mutating a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The name is already bound; the registry is unchanged.
    #[error("name already registered: {0}")]
    NameTaken(String),

    /// A definition references an entity that is not registered here.
    #[error("unknown dependency: {0}")]
    UnknownDependency(String),

    /// The import walk crossed its own path.
    #[error("cyclic type definition: {0}")]
    CyclicTypeDefinition(String),

    /// A pattern restriction does not compile.
    #[error("invalid pattern restriction: {0}")]
    InvalidPattern(String),
}

/// Store of named type definitions for one namespace.
#[derive(Debug)]
pub struct TypeRegistry {
    /// Built-in scalar types by name.
    basic_types: IndexMap<String, BasicType>,

    /// Struct type arena, in registration order.
    structs: Vec<NamedStruct>,
    /// Struct type id lookup by name.
    struct_names: HashMap<String, StructId>,

    /// Node type arena, in registration order.
    node_types: Vec<NamedNodeType>,
    /// Node type id lookup by name.
    node_type_names: HashMap<String, NodeTypeId>,

    /// Node template arena, in registration order.
    templates: Vec<NamedTemplate>,
    /// Node template id lookup by name.
    template_names: HashMap<String, TemplateId>,

    /// Coerced type arena, in registration order.
    coerced: Vec<NamedCoerced>,
    /// Coerced type id lookup by name.
    coerced_names: HashMap<String, CoercedId>,

    /// The hidden bootstrap struct root.
    empty_struct: StructId,
    /// The built-in node type root.
    root_node_type: NodeTypeId,
}

impl TypeRegistry {
    /// Create a registry holding the bootstrap entities: the six basic
    /// types, the root node type, and the hidden empty struct.
    pub fn new() -> Self {
        let mut basic_types = IndexMap::new();
        for basic in BasicType::ALL {
            basic_types.insert(basic.name().to_string(), basic);
        }

        let mut registry = Self {
            basic_types,
            structs: Vec::new(),
            struct_names: HashMap::new(),
            node_types: Vec::new(),
            node_type_names: HashMap::new(),
            templates: Vec::new(),
            template_names: HashMap::new(),
            coerced: Vec::new(),
            coerced_names: HashMap::new(),
            empty_struct: StructId::new(0),
            root_node_type: NodeTypeId::new(0),
        };

        let mut empty = NamedStruct::new(EMPTY_STRUCT, StructDef::new());
        empty.hidden = true;
        registry.structs.push(empty);
        registry
            .struct_names
            .insert(EMPTY_STRUCT.to_string(), registry.empty_struct);

        registry
            .node_types
            .push(NamedNodeType::new(ROOT_NODE_TYPE, NodeTypeDef::new()));
        registry
            .node_type_names
            .insert(ROOT_NODE_TYPE.to_string(), registry.root_node_type);

        registry
    }

    /// The hidden bootstrap struct root.
    pub fn empty_struct(&self) -> StructId {
        self.empty_struct
    }

    /// The built-in root node type.
    pub fn root_node_type(&self) -> NodeTypeId {
        self.root_node_type
    }

    // ==================== Lookups ====================

    /// Look up a basic or struct type by name. Basic types shadow struct
    /// types on a name collision (defensive; should not occur in practice).
    pub fn get_type(&self, name: &str) -> Option<TypeRef> {
        if let Some(&basic) = self.basic_types.get(name) {
            return Some(TypeRef::Basic(basic));
        }
        self.struct_names.get(name).copied().map(TypeRef::Struct)
    }

    /// Look up a basic type by name.
    pub fn get_basic_type(&self, name: &str) -> Option<BasicType> {
        self.basic_types.get(name).copied()
    }

    /// Look up a struct type id by name.
    pub fn get_struct_type(&self, name: &str) -> Option<StructId> {
        self.struct_names.get(name).copied()
    }

    /// Look up a node type id by name.
    pub fn get_node_type(&self, name: &str) -> Option<NodeTypeId> {
        self.node_type_names.get(name).copied()
    }

    /// Look up a node template id by name.
    pub fn get_node_template(&self, name: &str) -> Option<TemplateId> {
        self.template_names.get(name).copied()
    }

    /// Look up a coerced type id by name.
    pub fn get_coerced_type(&self, name: &str) -> Option<CoercedId> {
        self.coerced_names.get(name).copied()
    }

    /// Get a struct type by id.
    pub fn struct_type(&self, id: StructId) -> Option<&NamedStruct> {
        self.structs.get(id.index())
    }

    /// Get a node type by id.
    pub fn node_type(&self, id: NodeTypeId) -> Option<&NamedNodeType> {
        self.node_types.get(id.index())
    }

    /// Get a node template by id.
    pub fn node_template(&self, id: TemplateId) -> Option<&NamedTemplate> {
        self.templates.get(id.index())
    }

    /// Get a coerced type by id.
    pub fn coerced_type(&self, id: CoercedId) -> Option<&NamedCoerced> {
        self.coerced.get(id.index())
    }

    /// All struct types, in registration order.
    pub fn all_struct_types(&self) -> impl Iterator<Item = (StructId, &NamedStruct)> {
        self.structs
            .iter()
            .enumerate()
            .map(|(i, s)| (StructId::new(i as u32), s))
    }

    /// All node types, in registration order.
    pub fn all_node_types(&self) -> impl Iterator<Item = (NodeTypeId, &NamedNodeType)> {
        self.node_types
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeTypeId::new(i as u32), n))
    }

    /// All node templates, in registration order.
    pub fn all_node_templates(&self) -> impl Iterator<Item = (TemplateId, &NamedTemplate)> {
        self.templates
            .iter()
            .enumerate()
            .map(|(i, t)| (TemplateId::new(i as u32), t))
    }

    // ==================== Registration ====================

    /// Register a struct type under `name`.
    ///
    /// Fails with `NameTaken` if the name already exists as a node type
    /// (cross-namespace check) or as a struct type. A definition without a
    /// parent is anchored to the hidden empty struct.
    pub fn register_struct_type(
        &mut self,
        name: &str,
        def: StructDef,
    ) -> Result<StructId, RegistryError> {
        if self.node_type_names.contains_key(name) || self.struct_names.contains_key(name) {
            return Err(RegistryError::NameTaken(name.to_string()));
        }
        self.validate_struct_def(&def)?;

        let mut def = def;
        def.parent = def.parent.or(Some(self.empty_struct));

        let id = StructId::new(self.structs.len() as u32);
        self.structs.push(NamedStruct::new(name, def));
        self.struct_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Register a node type under `name`.
    ///
    /// Fails with `NameTaken` if the name already exists as a node type. A
    /// definition without a parent is anchored to the root node type.
    pub fn register_node_type(
        &mut self,
        name: &str,
        def: NodeTypeDef,
    ) -> Result<NodeTypeId, RegistryError> {
        if self.node_type_names.contains_key(name) {
            return Err(RegistryError::NameTaken(name.to_string()));
        }
        self.validate_node_type_def(&def)?;

        let mut def = def;
        def.parent = def.parent.or(Some(self.root_node_type));

        let id = NodeTypeId::new(self.node_types.len() as u32);
        self.node_types.push(NamedNodeType::new(name, def));
        self.node_type_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Register a node template under `name`.
    ///
    /// Fails with `NameTaken` if the name already exists as a node type
    /// (cross-namespace check) or as a template. A definition without a base
    /// node type is anchored to the root node type.
    pub fn register_node_template(
        &mut self,
        name: &str,
        def: TemplateDef,
    ) -> Result<TemplateId, RegistryError> {
        if self.node_type_names.contains_key(name) || self.template_names.contains_key(name) {
            return Err(RegistryError::NameTaken(name.to_string()));
        }
        self.validate_template_def(&def)?;

        let mut def = def;
        def.node_type = def.node_type.or(Some(self.root_node_type));

        let id = TemplateId::new(self.templates.len() as u32);
        self.templates.push(NamedTemplate::new(name, def));
        self.template_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Register a coerced type under `name`.
    ///
    /// Coerced types live in a logically separate namespace: there is no
    /// collision check against struct or node type names, and re-registering
    /// a name rebinds it. Pattern restrictions must compile.
    pub fn register_coerced_type(
        &mut self,
        name: &str,
        def: CoercedDef,
    ) -> Result<CoercedId, RegistryError> {
        for restriction in &def.restrictions {
            if let Restriction::Pattern(pattern) = restriction {
                if Regex::new(pattern).is_err() {
                    return Err(RegistryError::InvalidPattern(pattern.clone()));
                }
            }
        }

        let id = CoercedId::new(self.coerced.len() as u32);
        self.coerced.push(NamedCoerced::new(name, def));
        self.coerced_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Rename an entity, wherever it is keyed.
    ///
    /// An entity occupies exactly one of {templates, node types, structs} at
    /// a time, but all three maps are checked defensively. The wrapper's name
    /// field is updated in place, so any holder of the id observes the new
    /// name. Fails with `NameTaken` if `new_name` is already bound.
    pub fn rename_entity(&mut self, name: &str, new_name: &str) -> Result<(), RegistryError> {
        if name == new_name {
            return Ok(());
        }
        if self.template_names.contains_key(new_name)
            || self.node_type_names.contains_key(new_name)
            || self.struct_names.contains_key(new_name)
        {
            return Err(RegistryError::NameTaken(new_name.to_string()));
        }

        if let Some(id) = self.template_names.remove(name) {
            self.templates[id.index()].rename(new_name);
            self.template_names.insert(new_name.to_string(), id);
        }
        if let Some(id) = self.node_type_names.remove(name) {
            self.node_types[id.index()].rename(new_name);
            self.node_type_names.insert(new_name.to_string(), id);
        }
        if let Some(id) = self.struct_names.remove(name) {
            self.structs[id.index()].rename(new_name);
            self.struct_names.insert(new_name.to_string(), id);
        }
        Ok(())
    }

    // ==================== Derivation Queries ====================

    /// Check whether struct `a` equals `b` or has `b` in its parent chain.
    pub fn struct_derives_from(&self, a: StructId, b: StructId) -> bool {
        let mut current = Some(a);
        while let Some(id) = current {
            if id == b {
                return true;
            }
            current = self.structs.get(id.index()).and_then(|s| s.def.parent);
        }
        false
    }

    /// Check whether node type `a` equals `b` or has `b` in its parent chain.
    pub fn node_type_derives_from(&self, a: NodeTypeId, b: NodeTypeId) -> bool {
        let mut current = Some(a);
        while let Some(id) = current {
            if id == b {
                return true;
            }
            current = self.node_types.get(id.index()).and_then(|n| n.def.parent);
        }
        false
    }

    /// Check whether template `t` is bound to `node_type` or one of its
    /// derived node types.
    pub fn template_is_of_type(&self, t: TemplateId, node_type: NodeTypeId) -> bool {
        self.templates
            .get(t.index())
            .and_then(|tpl| tpl.def.node_type)
            .map(|base| self.node_type_derives_from(base, node_type))
            .unwrap_or(false)
    }

    /// Struct types deriving from `root`, in registration order, excluding
    /// hidden entries.
    pub fn structs_deriving_from(
        &self,
        root: StructId,
    ) -> impl Iterator<Item = (StructId, &NamedStruct)> + '_ {
        self.all_struct_types()
            .filter(move |(id, s)| !s.hidden && self.struct_derives_from(*id, root))
    }

    /// Node types deriving from `root`, in registration order, excluding
    /// hidden entries.
    pub fn node_types_deriving_from(
        &self,
        root: NodeTypeId,
    ) -> impl Iterator<Item = (NodeTypeId, &NamedNodeType)> + '_ {
        self.all_node_types()
            .filter(move |(id, n)| !n.hidden && self.node_type_derives_from(*id, root))
    }

    /// Node templates bound to `root` or a node type deriving from it, in
    /// registration order. Templates are never hidden.
    pub fn templates_of_type(
        &self,
        root: NodeTypeId,
    ) -> impl Iterator<Item = (TemplateId, &NamedTemplate)> + '_ {
        self.all_node_templates()
            .filter(move |(id, _)| self.template_is_of_type(*id, root))
    }

    // ==================== Canonicalization ====================

    /// Rebuild a struct definition from `source` with every reference
    /// re-anchored to this registry by name. The referenced entities must
    /// already be registered here; the importer guarantees that.
    pub(crate) fn canonicalize_struct_def(
        &self,
        source: &TypeRegistry,
        def: &StructDef,
    ) -> Result<StructDef, RegistryError> {
        Ok(StructDef {
            parent: self.resolve_parent_struct(source, def.parent)?,
            description: def.description.clone(),
            properties: self.resolve_properties(source, &def.properties)?,
        })
    }

    /// Rebuild a node type definition from `source` re-anchored here.
    pub(crate) fn canonicalize_node_type_def(
        &self,
        source: &TypeRegistry,
        def: &NodeTypeDef,
    ) -> Result<NodeTypeDef, RegistryError> {
        Ok(NodeTypeDef {
            parent: self.resolve_parent_node_type(source, def.parent)?,
            description: def.description.clone(),
            properties: self.resolve_properties(source, &def.properties)?,
            attributes: self.resolve_attributes(source, &def.attributes)?,
        })
    }

    /// Rebuild a template definition from `source` re-anchored here.
    pub(crate) fn canonicalize_template_def(
        &self,
        source: &TypeRegistry,
        def: &TemplateDef,
    ) -> Result<TemplateDef, RegistryError> {
        Ok(TemplateDef {
            node_type: self.resolve_parent_node_type(source, def.node_type)?,
            description: def.description.clone(),
            properties: self.resolve_properties(source, &def.properties)?,
            attributes: self.resolve_attributes(source, &def.attributes)?,
        })
    }

    fn resolve_parent_struct(
        &self,
        source: &TypeRegistry,
        parent: Option<StructId>,
    ) -> Result<Option<StructId>, RegistryError> {
        match parent {
            None => Ok(None),
            Some(id) => {
                let named = source
                    .struct_type(id)
                    .ok_or_else(|| RegistryError::UnknownDependency(id.to_string()))?;
                self.struct_names
                    .get(named.name())
                    .copied()
                    .map(Some)
                    .ok_or_else(|| RegistryError::UnknownDependency(named.name().to_string()))
            }
        }
    }

    fn resolve_parent_node_type(
        &self,
        source: &TypeRegistry,
        parent: Option<NodeTypeId>,
    ) -> Result<Option<NodeTypeId>, RegistryError> {
        match parent {
            None => Ok(None),
            Some(id) => {
                let named = source
                    .node_type(id)
                    .ok_or_else(|| RegistryError::UnknownDependency(id.to_string()))?;
                self.node_type_names
                    .get(named.name())
                    .copied()
                    .map(Some)
                    .ok_or_else(|| RegistryError::UnknownDependency(named.name().to_string()))
            }
        }
    }

    fn resolve_type_ref(
        &self,
        source: &TypeRegistry,
        type_ref: &TypeRef,
    ) -> Result<TypeRef, RegistryError> {
        match type_ref {
            TypeRef::Basic(basic) => Ok(TypeRef::Basic(*basic)),
            TypeRef::Struct(id) => {
                let named = source
                    .struct_type(*id)
                    .ok_or_else(|| RegistryError::UnknownDependency(id.to_string()))?;
                self.struct_names
                    .get(named.name())
                    .copied()
                    .map(TypeRef::Struct)
                    .ok_or_else(|| RegistryError::UnknownDependency(named.name().to_string()))
            }
            TypeRef::Coerced(id) => {
                let named = source
                    .coerced_type(*id)
                    .ok_or_else(|| RegistryError::UnknownDependency(id.to_string()))?;
                self.coerced_names
                    .get(named.name())
                    .copied()
                    .map(TypeRef::Coerced)
                    .ok_or_else(|| RegistryError::UnknownDependency(named.name().to_string()))
            }
            TypeRef::Anon(def) => Ok(TypeRef::Anon(Box::new(
                self.canonicalize_struct_def(source, def)?,
            ))),
        }
    }

    fn resolve_properties(
        &self,
        source: &TypeRegistry,
        properties: &IndexMap<String, Property>,
    ) -> Result<IndexMap<String, Property>, RegistryError> {
        let mut resolved = IndexMap::with_capacity(properties.len());
        for (name, property) in properties {
            resolved.insert(
                name.clone(),
                Property {
                    type_ref: self.resolve_type_ref(source, &property.type_ref)?,
                    description: property.description.clone(),
                    required: property.required,
                    default: property.default.clone(),
                },
            );
        }
        Ok(resolved)
    }

    fn resolve_attributes(
        &self,
        source: &TypeRegistry,
        attributes: &IndexMap<String, Attribute>,
    ) -> Result<IndexMap<String, Attribute>, RegistryError> {
        let mut resolved = IndexMap::with_capacity(attributes.len());
        for (name, attribute) in attributes {
            resolved.insert(
                name.clone(),
                Attribute {
                    type_ref: self.resolve_type_ref(source, &attribute.type_ref)?,
                    description: attribute.description.clone(),
                    default: attribute.default.clone(),
                },
            );
        }
        Ok(resolved)
    }

    // ==================== Native Definition Validation ====================

    fn validate_struct_def(&self, def: &StructDef) -> Result<(), RegistryError> {
        if let Some(parent) = def.parent {
            self.require_struct(parent)?;
        }
        self.validate_properties(&def.properties)
    }

    fn validate_node_type_def(&self, def: &NodeTypeDef) -> Result<(), RegistryError> {
        if let Some(parent) = def.parent {
            self.require_node_type(parent)?;
        }
        self.validate_properties(&def.properties)?;
        self.validate_attributes(&def.attributes)
    }

    fn validate_template_def(&self, def: &TemplateDef) -> Result<(), RegistryError> {
        if let Some(node_type) = def.node_type {
            self.require_node_type(node_type)?;
        }
        self.validate_properties(&def.properties)?;
        self.validate_attributes(&def.attributes)
    }

    fn validate_properties(
        &self,
        properties: &IndexMap<String, Property>,
    ) -> Result<(), RegistryError> {
        for property in properties.values() {
            self.validate_type_ref(&property.type_ref)?;
        }
        Ok(())
    }

    fn validate_attributes(
        &self,
        attributes: &IndexMap<String, Attribute>,
    ) -> Result<(), RegistryError> {
        for attribute in attributes.values() {
            self.validate_type_ref(&attribute.type_ref)?;
        }
        Ok(())
    }

    fn validate_type_ref(&self, type_ref: &TypeRef) -> Result<(), RegistryError> {
        match type_ref {
            TypeRef::Basic(_) => Ok(()),
            TypeRef::Struct(id) => self.require_struct(*id),
            TypeRef::Coerced(id) => {
                if self.coerced.get(id.index()).is_some() {
                    Ok(())
                } else {
                    Err(RegistryError::UnknownDependency(id.to_string()))
                }
            }
            TypeRef::Anon(def) => self.validate_struct_def(def),
        }
    }

    /// Every id a native definition references must already be registered.
    /// Structural fields are immutable after registration, so this also
    /// rules out ancestor and property-type cycles by construction.
    fn require_struct(&self, id: StructId) -> Result<(), RegistryError> {
        if self.structs.get(id.index()).is_some() {
            Ok(())
        } else {
            Err(RegistryError::UnknownDependency(id.to_string()))
        }
    }

    fn require_node_type(&self, id: NodeTypeId) -> Result<(), RegistryError> {
        if self.node_types.get(id.index()).is_some() {
            Ok(())
        } else {
            Err(RegistryError::UnknownDependency(id.to_string()))
        }
    }

    // Test-only access for corrupting the arena (cycle-guard coverage).
    #[cfg(test)]
    pub(crate) fn struct_mut(&mut self, id: StructId) -> &mut NamedStruct {
        &mut self.structs[id.index()]
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
