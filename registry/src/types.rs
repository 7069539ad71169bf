//! Type model: basic types, properties, unnamed definitions, named wrappers.
//!
//! Every entity stored in a registry is a named wrapper around an unnamed
//! structural definition. The definition carries the parent reference and the
//! property/attribute maps; the wrapper adds the registry key and the hidden
//! flag. Parent and property-type references are arena ids, so two entities
//! are in a derivation relationship exactly when their id chains meet.

use indexmap::IndexMap;
use tosca_core::{CoercedId, NodeTypeId, StructId, TemplateId, Value};

/// Built-in scalar types. Pre-registered in every registry, never imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    String,
    Boolean,
    Float,
    Integer,
    Range,
    ScalarUnit,
}

impl BasicType {
    /// All basic types, in bootstrap registration order.
    pub const ALL: [BasicType; 6] = [
        BasicType::String,
        BasicType::Boolean,
        BasicType::Float,
        BasicType::Integer,
        BasicType::Range,
        BasicType::ScalarUnit,
    ];

    /// The registry name of this type, as written in documents.
    pub fn name(self) -> &'static str {
        match self {
            BasicType::String => "string",
            BasicType::Boolean => "boolean",
            BasicType::Float => "float",
            BasicType::Integer => "integer",
            BasicType::Range => "range",
            BasicType::ScalarUnit => "scalar-unit",
        }
    }

    /// Look up a basic type by its registry name.
    pub fn from_name(name: &str) -> Option<BasicType> {
        BasicType::ALL.iter().copied().find(|b| b.name() == name)
    }
}

/// How a property or attribute names its type.
///
/// Ids are local to the registry the enclosing definition is stored in;
/// the importer re-anchors them when a definition crosses registries.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// A built-in scalar type.
    Basic(BasicType),
    /// A registered coerced (restricted) type.
    Coerced(CoercedId),
    /// A registered named struct type.
    Struct(StructId),
    /// An inline unnamed struct.
    Anon(Box<StructDef>),
}

/// A typed property slot declared by a struct, node type, or template.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// The declared type.
    pub type_ref: TypeRef,
    /// Human-readable description.
    pub description: String,
    /// Whether a value must be supplied.
    pub required: bool,
    /// Default value if none is supplied.
    pub default: Option<Value>,
}

impl Property {
    pub fn new(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            description: String::new(),
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A typed attribute slot declared by a node type or template.
///
/// Attributes have the same shape as properties but describe runtime-observed
/// values, so they carry no required flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// The declared type.
    pub type_ref: TypeRef,
    /// Human-readable description.
    pub description: String,
    /// Default value.
    pub default: Option<Value>,
}

impl Attribute {
    pub fn new(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            description: String::new(),
            default: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Unnamed struct definition: single optional parent plus ordered properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructDef {
    /// Parent struct. `None` anchors to the registry's empty-struct root at
    /// registration time.
    pub parent: Option<StructId>,
    /// Human-readable description.
    pub description: String,
    /// Declared properties, in declaration order.
    pub properties: IndexMap<String, Property>,
}

impl StructDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parent struct.
    pub fn extends(mut self, parent: StructId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a property.
    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Get a declared property by name.
    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }
}

/// Unnamed node type definition: a struct shape with declared attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeTypeDef {
    /// Parent node type. `None` anchors to the registry's root node type at
    /// registration time.
    pub parent: Option<NodeTypeId>,
    /// Human-readable description.
    pub description: String,
    /// Declared properties, in declaration order.
    pub properties: IndexMap<String, Property>,
    /// Declared attributes, in declaration order.
    pub attributes: IndexMap<String, Attribute>,
}

impl NodeTypeDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parent node type.
    pub fn extends(mut self, parent: NodeTypeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a property.
    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Declare an attribute.
    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    /// Get a declared property by name.
    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Get a declared attribute by name.
    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }
}

/// Unnamed node template definition: a named instance shape bound to a node
/// type, with its own property and attribute bindings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateDef {
    /// The node type this template instantiates. `None` anchors to the
    /// registry's root node type at registration time.
    pub node_type: Option<NodeTypeId>,
    /// Human-readable description.
    pub description: String,
    /// Declared properties, in declaration order.
    pub properties: IndexMap<String, Property>,
    /// Declared attributes, in declaration order.
    pub attributes: IndexMap<String, Attribute>,
}

impl TemplateDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a node type.
    pub fn of_type(mut self, node_type: NodeTypeId) -> Self {
        self.node_type = Some(node_type);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a property.
    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    /// Declare an attribute.
    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }
}

/// A restriction narrowing the value space of a basic type.
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    /// Value must be >= the bound.
    GreaterOrEqual(Value),
    /// Value must be <= the bound.
    LessOrEqual(Value),
    /// Value must fall inside the closed interval.
    InRange(Value, Value),
    /// Value must be one of the listed values.
    ValidValues(Vec<Value>),
    /// String value must match the regex.
    Pattern(String),
}

/// Unnamed coerced type definition: a restricted specialization of a basic
/// type. Not part of the inheritance hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercedDef {
    /// The basic type being restricted.
    pub base: BasicType,
    /// Human-readable description.
    pub description: String,
    /// Restrictions, applied conjunctively.
    pub restrictions: Vec<Restriction>,
}

impl CoercedDef {
    pub fn new(base: BasicType) -> Self {
        Self {
            base,
            description: String::new(),
            restrictions: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a restriction.
    pub fn restrict(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }
}

/// Named wrapper around a struct definition.
#[derive(Debug, Clone)]
pub struct NamedStruct {
    pub(crate) name: String,
    pub(crate) hidden: bool,
    pub def: StructDef,
}

impl NamedStruct {
    pub(crate) fn new(name: impl Into<String>, def: StructDef) -> Self {
        Self {
            name: name.into(),
            hidden: false,
            def,
        }
    }

    /// The registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is an internal bootstrap entity, excluded from
    /// derivation-query results.
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn description(&self) -> &str {
        &self.def.description
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

/// Named wrapper around a node type definition.
#[derive(Debug, Clone)]
pub struct NamedNodeType {
    pub(crate) name: String,
    pub(crate) hidden: bool,
    pub def: NodeTypeDef,
}

impl NamedNodeType {
    pub(crate) fn new(name: impl Into<String>, def: NodeTypeDef) -> Self {
        Self {
            name: name.into(),
            hidden: false,
            def,
        }
    }

    /// The registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is an internal bootstrap entity, excluded from
    /// derivation-query results.
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub fn description(&self) -> &str {
        &self.def.description
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

/// Named wrapper around a node template definition.
#[derive(Debug, Clone)]
pub struct NamedTemplate {
    pub(crate) name: String,
    pub def: TemplateDef,
}

impl NamedTemplate {
    pub(crate) fn new(name: impl Into<String>, def: TemplateDef) -> Self {
        Self {
            name: name.into(),
            def,
        }
    }

    /// The registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.def.description
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

/// Named wrapper around a coerced type definition.
#[derive(Debug, Clone)]
pub struct NamedCoerced {
    pub(crate) name: String,
    pub def: CoercedDef,
}

impl NamedCoerced {
    pub(crate) fn new(name: impl Into<String>, def: CoercedDef) -> Self {
        Self {
            name: name.into(),
            def,
        }
    }

    /// The registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.def.description
    }
}

/// A handle to any named entity in a registry, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Basic(BasicType),
    Struct(StructId),
    NodeType(NodeTypeId),
    Template(TemplateId),
    Coerced(CoercedId),
}
