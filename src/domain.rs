//! Flat Type/Property model shared by every emitter.
//!
//! A [`Domain`] is built once by [`DomainBuilder`] and never mutated
//! afterwards. Names are derived during the build and stored here, so the IDL
//! and the generated compiler can only ever spell a field one way.
pub mod builder;

use std::fmt;

use indexmap::IndexMap;

use crate::classify::Classifier;

pub use builder::DomainBuilder;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct Domain {
    pub(crate) types: IndexMap<String, Type>,
    pub(crate) classifier: Classifier,
    pub(crate) root: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub name: String,
    pub kind: TypeKind,
    pub properties: Vec<Property>,
    /// Original keys that must be present in a document node.
    pub required: Vec<String>,
    /// The type collects pattern-matched keys into at least one bag.
    pub open_extension: bool,
    /// Set when the type is nothing but a map of string to this target.
    pub map_of: Option<Target>,
    /// Schema path the type was built from (`synthetic:` for generated helpers).
    pub origin: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Keyed fields, bags and an optional map payload.
    Object,
    /// Exactly one alternative is populated, chosen by first successful build.
    OneOf,
    /// Wraps a repeated value where the IDL cannot nest repetition.
    Array,
    /// Arbitrary value, carried as JSON text.
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Key as spelled in documents. For bags this is the role name.
    pub name: String,
    /// Identifier used by every emitter.
    pub field_name: String,
    pub role: Role,
    pub target: Target,
    pub repetition: Repetition,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Field,
    /// Catch-all for keys the classifier assigns to `role`.
    Bag { role: String, pattern: String },
    /// Every remaining key, as a string-keyed map.
    AdditionalProperties,
    /// One slot of a one-of type.
    Alternative,
    /// Payload of an array wrapper.
    Element,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Scalar(ScalarKind),
    Message(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repetition {
    Singular,
    Repeated,
    Map,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Double,
    Float,
    Int64,
    Int32,
    Bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Domain {
    /// Types in output order.
    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.types.values()
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Name of the type built from the schema root.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}

impl Type {
    /// Plain field by its original key.
    pub fn field(&self, key: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.role == Role::Field && p.name == key)
    }

    pub fn bags(&self) -> impl Iterator<Item = &Property> {
        self.properties
            .iter()
            .filter(|p| matches!(p.role, Role::Bag { .. }))
    }

    /// Roles of this type's bags, in property order.
    pub fn bag_roles(&self) -> Vec<&str> {
        self.bags()
            .filter_map(|p| match &p.role {
                Role::Bag { role, .. } => Some(role.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn bag(&self, role: &str) -> Option<&Property> {
        self.bags()
            .find(|p| matches!(&p.role, Role::Bag { role: r, .. } if r == role))
    }

    pub fn additional(&self) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.role == Role::AdditionalProperties)
    }
}

impl Target {
    /// Word used to name helper types (`NamedString`, `PathItemArray`).
    pub fn type_word(&self) -> &str {
        match self {
            Target::Scalar(kind) => kind.type_word(),
            Target::Message(name) => name,
        }
    }
}

impl ScalarKind {
    pub fn proto_name(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Double => "double",
            ScalarKind::Float => "float",
            ScalarKind::Int64 => "int64",
            ScalarKind::Int32 => "int32",
            ScalarKind::Bool => "bool",
        }
    }

    pub fn rust_type(self) -> &'static str {
        match self {
            ScalarKind::String => "::std::string::String",
            ScalarKind::Double => "f64",
            ScalarKind::Float => "f32",
            ScalarKind::Int64 => "i64",
            ScalarKind::Int32 => "i32",
            ScalarKind::Bool => "bool",
        }
    }

    /// Name of the runtime conversion function, also the one-of slot name.
    pub fn builder_name(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Double => "double",
            ScalarKind::Float => "float",
            ScalarKind::Int64 => "int64",
            ScalarKind::Int32 => "int32",
            ScalarKind::Bool => "boolean",
        }
    }

    pub fn type_word(self) -> &'static str {
        match self {
            ScalarKind::String => "String",
            ScalarKind::Double => "Double",
            ScalarKind::Float => "Float",
            ScalarKind::Int64 => "Int64",
            ScalarKind::Int32 => "Int32",
            ScalarKind::Bool => "Boolean",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Scalar(kind) => f.write_str(kind.proto_name()),
            Target::Message(name) => f.write_str(name),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.field_name)?;
        match self.repetition {
            Repetition::Singular => write!(f, "{}", self.target)?,
            Repetition::Repeated => write!(f, "repeated {}", self.target)?,
            Repetition::Map => write!(f, "map<string, {}>", self.target)?,
        }
        match &self.role {
            Role::Bag { pattern, .. } => write!(f, " [{pattern}]"),
            Role::Field if self.name != self.field_name => write!(f, " (\"{}\")", self.name),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        match self.kind {
            TypeKind::Object if self.map_of.is_some() => write!(f, " (map)")?,
            TypeKind::Object if self.open_extension => write!(f, " (open)")?,
            TypeKind::Object => {}
            TypeKind::OneOf => write!(f, " (one of)")?,
            TypeKind::Array => write!(f, " (array)")?,
            TypeKind::Any => write!(f, " (any)")?,
        }
        writeln!(f)?;
        for property in &self.properties {
            write!(f, "  {property}")?;
            if self.required.contains(&property.name) {
                write!(f, " required")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ty) in self.types().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{ty}")?;
        }
        Ok(())
    }
}
