//! Schema model.
//!
//! Schemas are assembled in code with [`SchemaBuilder`]; there is no SDL
//! parser. Object types, interface types, unions and field definitions keep
//! the directive uses attached to them, so plugins can read annotations such
//! as `@cacheControl` once when they are constructed.

use indexmap::IndexMap;
use serde_json::Value;

/// Scalars every schema starts with.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// A GraphQL schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub query_type: Option<String>,
    pub mutation_type: Option<String>,
    pub types: IndexMap<String, TypeDef>,
    pub directives: IndexMap<String, DirectiveDefinition>,
}

impl Schema {
    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Iterates over named types in definition order.
    pub fn types(&self) -> impl Iterator<Item = (&String, &TypeDef)> {
        self.types.iter()
    }

    /// Looks up a field declared on an object or interface type.
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDef> {
        self.get_type(type_name)?.fields()?.get(field_name)
    }

    pub fn directive_definition(&self, name: &str) -> Option<&DirectiveDefinition> {
        self.directives.get(name)
    }

    /// Whether a value of type `type_name` can appear where `abstract_name` is
    /// expected: the same type, a union member, or an implementor.
    pub fn is_possible_type(&self, abstract_name: &str, type_name: &str) -> bool {
        if abstract_name == type_name {
            return true;
        }
        match self.get_type(abstract_name) {
            Some(TypeDef::Union(union)) => union.members.iter().any(|member| member == type_name),
            Some(TypeDef::Interface(_)) => self
                .get_type(type_name)
                .map(TypeDef::interfaces)
                .is_some_and(|interfaces| interfaces.iter().any(|name| name == abstract_name)),
            _ => false,
        }
    }
}

/// A named type.
#[derive(Debug, Clone)]
pub enum TypeDef {
    Scalar(ScalarDef),
    Enum(EnumDef),
    Object(ObjectDef),
    Interface(InterfaceDef),
    Union(UnionDef),
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(def) => &def.name,
            Self::Enum(def) => &def.name,
            Self::Object(def) => &def.name,
            Self::Interface(def) => &def.name,
            Self::Union(def) => &def.name,
        }
    }

    /// Fields of object and interface types.
    pub fn fields(&self) -> Option<&IndexMap<String, FieldDef>> {
        match self {
            Self::Object(def) => Some(&def.fields),
            Self::Interface(def) => Some(&def.fields),
            _ => None,
        }
    }

    /// Interfaces implemented by an object or interface type.
    pub fn interfaces(&self) -> &[String] {
        match self {
            Self::Object(def) => &def.implements,
            Self::Interface(def) => &def.implements,
            _ => &[],
        }
    }

    /// Directive uses on the type itself.
    pub fn directives(&self) -> &[Directive] {
        match self {
            Self::Object(def) => &def.directives,
            Self::Interface(def) => &def.directives,
            Self::Union(def) => &def.directives,
            Self::Scalar(_) | Self::Enum(_) => &[],
        }
    }

    /// Scalars and enums.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_))
    }
}

#[derive(Debug, Clone)]
pub struct ScalarDef {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumDef {
    pub fn new<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectDef {
    pub name: String,
    pub implements: Vec<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub directives: Vec<Directive>,
}

impl ObjectDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }

    /// Adds a field, replacing one with the same name.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct InterfaceDef {
    pub name: String,
    pub implements: Vec<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub directives: Vec<Directive>,
}

impl InterfaceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a field, replacing one with the same name.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnionDef {
    pub name: String,
    pub members: Vec<String>,
    pub directives: Vec<Directive>,
}

impl UnionDef {
    pub fn new<I>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
            directives: Vec::new(),
        }
    }

    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }
}

/// A field of an object or interface type.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub arguments: IndexMap<String, ArgumentDef>,
    pub directives: Vec<Directive>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            arguments: IndexMap::new(),
            directives: Vec::new(),
        }
    }

    pub fn argument(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        let argument = ArgumentDef::new(name, ty);
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }
}

/// An argument of a field or directive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDef {
    pub name: String,
    pub ty: TypeRef,
}

impl ArgumentDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A reference to a type from a field or argument.
///
/// `Named` is non-null; `Option` marks the nullable wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    Option(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn option(inner: TypeRef) -> Self {
        Self::Option(Box::new(inner))
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    /// The named type under any list and nullable wrappers.
    pub fn named_type(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Option(inner) | Self::List(inner) => inner.named_type(),
        }
    }
}

/// A directive use, e.g. `@cacheControl(maxAge: 30)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: IndexMap<String, Value>,
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: IndexMap::new(),
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }
}

/// Where a directive may be used in a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveLocation {
    Schema,
    Scalar,
    Object,
    FieldDefinition,
    ArgumentDefinition,
    Interface,
    Union,
    Enum,
    EnumValue,
}

/// A directive declared by the schema.
#[derive(Debug, Clone)]
pub struct DirectiveDefinition {
    pub name: String,
    pub arguments: IndexMap<String, ArgumentDef>,
    pub locations: Vec<DirectiveLocation>,
    pub repeatable: bool,
}

impl DirectiveDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: IndexMap::new(),
            locations: Vec::new(),
            repeatable: false,
        }
    }

    pub fn argument(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        let argument = ArgumentDef::new(name, ty);
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    pub fn on(mut self, location: DirectiveLocation) -> Self {
        if !self.locations.contains(&location) {
            self.locations.push(location);
        }
        self
    }

    pub fn allows(&self, location: DirectiveLocation) -> bool {
        self.locations.contains(&location)
    }
}

/// Assembles a [`Schema`]. Later definitions replace earlier ones with the
/// same name.
#[derive(Debug)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    /// Starts a schema containing the built-in scalars.
    pub fn new() -> Self {
        let types = BUILTIN_SCALARS
            .iter()
            .map(|name| {
                let scalar = ScalarDef {
                    name: (*name).to_string(),
                };
                ((*name).to_string(), TypeDef::Scalar(scalar))
            })
            .collect();
        Self {
            schema: Schema {
                types,
                ..Schema::default()
            },
        }
    }

    pub fn query_type(mut self, name: impl Into<String>) -> Self {
        self.schema.query_type = Some(name.into());
        self
    }

    pub fn mutation_type(mut self, name: impl Into<String>) -> Self {
        self.schema.mutation_type = Some(name.into());
        self
    }

    pub fn add_type(mut self, def: TypeDef) -> Self {
        self.schema.types.insert(def.name().to_owned(), def);
        self
    }

    pub fn object(self, def: ObjectDef) -> Self {
        self.add_type(TypeDef::Object(def))
    }

    pub fn interface(self, def: InterfaceDef) -> Self {
        self.add_type(TypeDef::Interface(def))
    }

    pub fn union(self, def: UnionDef) -> Self {
        self.add_type(TypeDef::Union(def))
    }

    pub fn enumeration(self, def: EnumDef) -> Self {
        self.add_type(TypeDef::Enum(def))
    }

    pub fn directive(mut self, def: DirectiveDefinition) -> Self {
        self.schema.directives.insert(def.name.clone(), def);
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}
