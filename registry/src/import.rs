//! Dependency-closure import across registries.
//!
//! Importing an entity first imports everything it structurally depends on:
//! its ancestor chain, then the types of its declared properties and
//! attributes, and only then the entity itself. The walk is ordered by
//! recursion rather than an explicit topological sort; ancestor chains
//! terminate at the source registry's bootstrap root entities, whose names
//! are already bound in every target registry.
//!
//! An entity already registered here under the same kind resolves to the
//! existing local entity without re-walking its subtree. A name held by a
//! different kind surfaces as `NameTaken`.

use crate::{Attribute, Property, RegistryError, StructDef, TypeRef, TypeRegistry};
use indexmap::IndexMap;
use std::collections::HashSet;
use tosca_core::{CoercedId, NodeTypeId, StructId, TemplateId};

impl TypeRegistry {
    /// Import a struct type from `source`, together with its ancestor chain
    /// and the types of its declared properties.
    pub fn import_struct_type(
        &mut self,
        source: &TypeRegistry,
        id: StructId,
    ) -> Result<StructId, RegistryError> {
        ImportSession::new(self, source).import_struct_type(id)
    }

    /// Import a node type from `source`, together with its ancestor chain
    /// and the types of its declared properties and attributes.
    pub fn import_node_type(
        &mut self,
        source: &TypeRegistry,
        id: NodeTypeId,
    ) -> Result<NodeTypeId, RegistryError> {
        ImportSession::new(self, source).import_node_type(id)
    }

    /// Import a node template from `source`, together with its node type's
    /// closure and the types of its declared properties and attributes.
    pub fn import_node_template(
        &mut self,
        source: &TypeRegistry,
        id: TemplateId,
    ) -> Result<TemplateId, RegistryError> {
        ImportSession::new(self, source).import_node_template(id)
    }

    /// Import a coerced type from `source`. Its base is a basic type,
    /// pre-registered in every registry, so there is no closure to walk.
    pub fn import_coerced_type(
        &mut self,
        source: &TypeRegistry,
        id: CoercedId,
    ) -> Result<CoercedId, RegistryError> {
        ImportSession::new(self, source).import_coerced_type(id)
    }
}

/// Kind-tagged key for the per-session bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EntityKey {
    Struct(String),
    NodeType(String),
    Template(String),
}

/// One import walk from a source registry into a target registry.
struct ImportSession<'a> {
    target: &'a mut TypeRegistry,
    source: &'a TypeRegistry,
    /// Names whose subtree has already been walked this session.
    visited: HashSet<EntityKey>,
    /// Names currently being walked; a repeat means the source graph has a
    /// cycle.
    stack: Vec<EntityKey>,
}

impl<'a> ImportSession<'a> {
    fn new(target: &'a mut TypeRegistry, source: &'a TypeRegistry) -> Self {
        Self {
            target,
            source,
            visited: HashSet::new(),
            stack: Vec::new(),
        }
    }

    fn import_struct_type(&mut self, id: StructId) -> Result<StructId, RegistryError> {
        let named = self
            .source
            .struct_type(id)
            .ok_or_else(|| RegistryError::UnknownDependency(id.to_string()))?;
        let name = named.name().to_string();
        let def = named.def.clone();

        if let Some(local) = self.target.get_struct_type(&name) {
            return Ok(local);
        }
        let key = EntityKey::Struct(name.clone());
        if self.visited.contains(&key) {
            // Walked before but never became a local struct: the name is
            // held by another kind.
            return Err(RegistryError::NameTaken(name));
        }
        if self.stack.contains(&key) {
            return Err(RegistryError::CyclicTypeDefinition(name));
        }

        self.stack.push(key.clone());
        let walked = self.import_struct_dependencies(&def);
        self.stack.pop();
        walked?;
        self.visited.insert(key);

        let canonical = self.target.canonicalize_struct_def(self.source, &def)?;
        self.target.register_struct_type(&name, canonical)
    }

    fn import_node_type(&mut self, id: NodeTypeId) -> Result<NodeTypeId, RegistryError> {
        let named = self
            .source
            .node_type(id)
            .ok_or_else(|| RegistryError::UnknownDependency(id.to_string()))?;
        let name = named.name().to_string();
        let def = named.def.clone();

        if let Some(local) = self.target.get_node_type(&name) {
            return Ok(local);
        }
        let key = EntityKey::NodeType(name.clone());
        if self.visited.contains(&key) {
            return Err(RegistryError::NameTaken(name));
        }
        if self.stack.contains(&key) {
            return Err(RegistryError::CyclicTypeDefinition(name));
        }

        self.stack.push(key.clone());
        let walked = (|| {
            if let Some(parent) = def.parent {
                self.import_node_type(parent)?;
            }
            self.import_property_types(&def.properties)?;
            self.import_attribute_types(&def.attributes)
        })();
        self.stack.pop();
        walked?;
        self.visited.insert(key);

        let canonical = self.target.canonicalize_node_type_def(self.source, &def)?;
        self.target.register_node_type(&name, canonical)
    }

    fn import_node_template(&mut self, id: TemplateId) -> Result<TemplateId, RegistryError> {
        let named = self
            .source
            .node_template(id)
            .ok_or_else(|| RegistryError::UnknownDependency(id.to_string()))?;
        let name = named.name().to_string();
        let def = named.def.clone();

        if let Some(local) = self.target.get_node_template(&name) {
            return Ok(local);
        }
        let key = EntityKey::Template(name.clone());
        if self.visited.contains(&key) {
            return Err(RegistryError::NameTaken(name));
        }
        if self.stack.contains(&key) {
            return Err(RegistryError::CyclicTypeDefinition(name));
        }

        self.stack.push(key.clone());
        let walked = (|| {
            if let Some(node_type) = def.node_type {
                self.import_node_type(node_type)?;
            }
            self.import_property_types(&def.properties)?;
            self.import_attribute_types(&def.attributes)
        })();
        self.stack.pop();
        walked?;
        self.visited.insert(key);

        let canonical = self.target.canonicalize_template_def(self.source, &def)?;
        self.target.register_node_template(&name, canonical)
    }

    fn import_coerced_type(&mut self, id: CoercedId) -> Result<CoercedId, RegistryError> {
        let named = self
            .source
            .coerced_type(id)
            .ok_or_else(|| RegistryError::UnknownDependency(id.to_string()))?;
        let name = named.name().to_string();
        if let Some(local) = self.target.get_coerced_type(&name) {
            return Ok(local);
        }
        self.target.register_coerced_type(&name, named.def.clone())
    }

    fn import_struct_dependencies(&mut self, def: &StructDef) -> Result<(), RegistryError> {
        if let Some(parent) = def.parent {
            self.import_struct_type(parent)?;
        }
        self.import_property_types(&def.properties)
    }

    fn import_property_types(
        &mut self,
        properties: &IndexMap<String, Property>,
    ) -> Result<(), RegistryError> {
        for property in properties.values() {
            self.import_type_ref(&property.type_ref)?;
        }
        Ok(())
    }

    fn import_attribute_types(
        &mut self,
        attributes: &IndexMap<String, Attribute>,
    ) -> Result<(), RegistryError> {
        for attribute in attributes.values() {
            self.import_type_ref(&attribute.type_ref)?;
        }
        Ok(())
    }

    fn import_type_ref(&mut self, type_ref: &TypeRef) -> Result<(), RegistryError> {
        match type_ref {
            // Pre-registered in every registry.
            TypeRef::Basic(_) => Ok(()),
            TypeRef::Struct(id) => self.import_struct_type(*id).map(|_| ()),
            // Materialize the coerced type here; its base is basic.
            TypeRef::Coerced(id) => self.import_coerced_type(*id).map(|_| ()),
            // An inline struct is carried by its owner, but its ancestor
            // chain and property types still re-anchor by name and must be
            // walked like a named struct's.
            TypeRef::Anon(def) => self.import_struct_dependencies(def),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BasicType, CoercedDef, NodeTypeDef, Restriction, TemplateDef};
    use tosca_core::Value;

    fn foreign_with_chain() -> (TypeRegistry, NodeTypeId) {
        // N1 <- N2, N2 has property x: T (struct) and attribute a: integer
        let mut source = TypeRegistry::new();
        let t = source
            .register_struct_type(
                "T",
                StructDef::new().property("size", Property::new(TypeRef::Basic(BasicType::Integer))),
            )
            .unwrap();
        let n1 = source.register_node_type("N1", NodeTypeDef::new()).unwrap();
        let n2 = source
            .register_node_type(
                "N2",
                NodeTypeDef::new()
                    .extends(n1)
                    .property("x", Property::new(TypeRef::Struct(t)))
                    .attribute("a", Attribute::new(TypeRef::Basic(BasicType::Integer))),
            )
            .unwrap();
        (source, n2)
    }

    // ========== TEST: closure_import ==========
    #[test]
    fn test_import_brings_ancestors_and_property_types_first() {
        // GIVEN a foreign N2 whose parent N1 and property type T are absent
        // locally
        let (source, n2) = foreign_with_chain();
        let mut target = TypeRegistry::new();

        // WHEN importing N2
        let local_n2 = target.import_node_type(&source, n2).unwrap();

        // THEN N1, N2 and T are all present locally
        let local_n1 = target.get_node_type("N1").unwrap();
        let local_t = target.get_struct_type("T").unwrap();
        assert_eq!(target.get_node_type("N2"), Some(local_n2));

        // AND N2's parent is the locally stored N1 (identity, not name)
        let stored = target.node_type(local_n2).unwrap();
        assert_eq!(stored.def.parent, Some(local_n1));
        assert_eq!(
            stored.def.get_property("x").unwrap().type_ref,
            TypeRef::Struct(local_t)
        );
        assert!(target.node_type_derives_from(local_n2, local_n1));
    }

    // ========== TEST: deep_ancestor_chain ==========
    #[test]
    fn test_import_walks_multi_level_struct_ancestors() {
        // GIVEN A <- B <- C in the source, and an entity whose property is
        // typed by C
        let mut source = TypeRegistry::new();
        let a = source.register_struct_type("A", StructDef::new()).unwrap();
        let b = source
            .register_struct_type("B", StructDef::new().extends(a))
            .unwrap();
        let c = source
            .register_struct_type("C", StructDef::new().extends(b))
            .unwrap();
        let holder = source
            .register_struct_type(
                "Holder",
                StructDef::new().property("p", Property::new(TypeRef::Struct(c))),
            )
            .unwrap();

        // WHEN importing the holder
        let mut target = TypeRegistry::new();
        target.import_struct_type(&source, holder).unwrap();

        // THEN the whole ancestor chain of the property type is present
        let local_a = target.get_struct_type("A").unwrap();
        let local_b = target.get_struct_type("B").unwrap();
        let local_c = target.get_struct_type("C").unwrap();
        assert!(target.struct_derives_from(local_c, local_b));
        assert!(target.struct_derives_from(local_c, local_a));
    }

    // ========== TEST: import_is_idempotent ==========
    #[test]
    fn test_reimport_resolves_to_existing_entities() {
        let (source, n2) = foreign_with_chain();
        let mut target = TypeRegistry::new();

        let first = target.import_node_type(&source, n2).unwrap();
        let count_after_first = target.all_node_types().count();
        let second = target.import_node_type(&source, n2).unwrap();

        assert_eq!(first, second);
        assert_eq!(target.all_node_types().count(), count_after_first);
    }

    // ========== TEST: diamond_dependency ==========
    #[test]
    fn test_shared_dependency_registered_once() {
        // GIVEN two properties typed by the same foreign struct
        let mut source = TypeRegistry::new();
        let shared = source
            .register_struct_type("Shared", StructDef::new())
            .unwrap();
        let owner = source
            .register_struct_type(
                "Owner",
                StructDef::new()
                    .property("first", Property::new(TypeRef::Struct(shared)))
                    .property("second", Property::new(TypeRef::Struct(shared))),
            )
            .unwrap();

        let mut target = TypeRegistry::new();
        target.import_struct_type(&source, owner).unwrap();

        let shared_count = target
            .all_struct_types()
            .filter(|(_, s)| s.name() == "Shared")
            .count();
        assert_eq!(shared_count, 1);
    }

    // ========== TEST: coerced_property_type ==========
    #[test]
    fn test_import_materializes_coerced_property_types() {
        // GIVEN a foreign struct with a property typed by a coerced integer
        let mut source = TypeRegistry::new();
        let port = source
            .register_coerced_type(
                "Port",
                CoercedDef::new(BasicType::Integer)
                    .restrict(Restriction::InRange(Value::Int(1), Value::Int(65535))),
            )
            .unwrap();
        let endpoint = source
            .register_struct_type(
                "Endpoint",
                StructDef::new().property("port", Property::new(TypeRef::Coerced(port))),
            )
            .unwrap();

        // WHEN importing the struct
        let mut target = TypeRegistry::new();
        let local = target.import_struct_type(&source, endpoint).unwrap();

        // THEN the coerced type exists locally and the property points at it
        let local_port = target.get_coerced_type("Port").unwrap();
        assert_eq!(
            target
                .struct_type(local)
                .unwrap()
                .def
                .get_property("port")
                .unwrap()
                .type_ref,
            TypeRef::Coerced(local_port)
        );
        assert_eq!(
            target.coerced_type(local_port).unwrap().def.base,
            BasicType::Integer
        );
    }

    // ========== TEST: anon_struct_property ==========
    #[test]
    fn test_import_recurses_into_anonymous_struct_parent() {
        // GIVEN a property typed by an inline struct extending a named one
        let mut source = TypeRegistry::new();
        let base = source
            .register_struct_type("AnonBase", StructDef::new())
            .unwrap();
        let anon = StructDef::new()
            .extends(base)
            .property("nested", Property::new(TypeRef::Basic(BasicType::String)));
        let owner = source
            .register_struct_type(
                "AnonOwner",
                StructDef::new().property("inline", Property::new(TypeRef::Anon(Box::new(anon)))),
            )
            .unwrap();

        // WHEN importing the owner
        let mut target = TypeRegistry::new();
        let local = target.import_struct_type(&source, owner).unwrap();

        // THEN the inline struct's parent chain came along, re-anchored
        let local_base = target.get_struct_type("AnonBase").unwrap();
        match &target
            .struct_type(local)
            .unwrap()
            .def
            .get_property("inline")
            .unwrap()
            .type_ref
        {
            TypeRef::Anon(def) => assert_eq!(def.parent, Some(local_base)),
            other => panic!("expected anon struct, got {other:?}"),
        }
    }

    // ========== TEST: anon_struct_property_types ==========
    #[test]
    fn test_import_walks_anonymous_struct_property_types() {
        // GIVEN an inline struct whose properties reference a named struct,
        // a coerced type, and a nested inline struct with its own reference
        let mut source = TypeRegistry::new();
        let inner = source
            .register_struct_type("Inner", StructDef::new())
            .unwrap();
        let deep = source
            .register_struct_type("Deep", StructDef::new())
            .unwrap();
        let slug = source
            .register_coerced_type("Slug", CoercedDef::new(BasicType::String))
            .unwrap();
        let nested = StructDef::new().property("d", Property::new(TypeRef::Struct(deep)));
        let anon = StructDef::new()
            .property("n", Property::new(TypeRef::Struct(inner)))
            .property("s", Property::new(TypeRef::Coerced(slug)))
            .property("inner", Property::new(TypeRef::Anon(Box::new(nested))));
        let owner = source
            .register_struct_type(
                "Owner",
                StructDef::new().property("inline", Property::new(TypeRef::Anon(Box::new(anon)))),
            )
            .unwrap();

        // WHEN importing the owner
        let mut target = TypeRegistry::new();
        let local = target.import_struct_type(&source, owner).unwrap();

        // THEN every type the inline struct references exists locally
        let local_inner = target.get_struct_type("Inner").unwrap();
        let local_slug = target.get_coerced_type("Slug").unwrap();
        assert!(target.get_struct_type("Deep").is_some());

        // AND the stored inline struct points at the local entities
        match &target
            .struct_type(local)
            .unwrap()
            .def
            .get_property("inline")
            .unwrap()
            .type_ref
        {
            TypeRef::Anon(def) => {
                assert_eq!(
                    def.get_property("n").unwrap().type_ref,
                    TypeRef::Struct(local_inner)
                );
                assert_eq!(
                    def.get_property("s").unwrap().type_ref,
                    TypeRef::Coerced(local_slug)
                );
            }
            other => panic!("expected anon struct, got {other:?}"),
        }
    }

    // ========== TEST: template_import ==========
    #[test]
    fn test_import_node_template_brings_its_node_type() {
        let (mut source, n2) = foreign_with_chain();
        let tpl = source
            .register_node_template(
                "frontend",
                TemplateDef::new()
                    .of_type(n2)
                    .property("x", Property::new(TypeRef::Basic(BasicType::String))),
            )
            .unwrap();

        let mut target = TypeRegistry::new();
        let local_tpl = target.import_node_template(&source, tpl).unwrap();

        let local_n2 = target.get_node_type("N2").unwrap();
        assert!(target.template_is_of_type(local_tpl, local_n2));
        assert!(target.get_node_type("N1").is_some());
        assert!(target.get_struct_type("T").is_some());
    }

    // ========== TEST: cross_kind_collision ==========
    #[test]
    fn test_import_fails_when_name_held_by_other_kind() {
        // GIVEN a foreign struct whose name is a node type locally
        let mut source = TypeRegistry::new();
        let s = source
            .register_struct_type("Compute", StructDef::new())
            .unwrap();
        let mut target = TypeRegistry::new();
        target
            .register_node_type("Compute", NodeTypeDef::new())
            .unwrap();

        let result = target.import_struct_type(&source, s);

        assert_eq!(result, Err(RegistryError::NameTaken("Compute".to_string())));
    }

    // ========== TEST: cycle_guard ==========
    #[test]
    fn test_cyclic_source_graph_is_reported_not_recursed() {
        // GIVEN a source registry whose arena has been corrupted into an
        // ancestor cycle (unconstructible through the public API)
        let mut source = TypeRegistry::new();
        let a = source.register_struct_type("CycA", StructDef::new()).unwrap();
        let b = source
            .register_struct_type("CycB", StructDef::new().extends(a))
            .unwrap();
        source.struct_mut(a).def.parent = Some(b);

        // WHEN importing either end
        let mut target = TypeRegistry::new();
        let result = target.import_struct_type(&source, a);

        // THEN the walk stops with an explicit error
        assert!(matches!(
            result,
            Err(RegistryError::CyclicTypeDefinition(_))
        ));
    }
}
