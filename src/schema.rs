//! JSON-Schema graph: the input of the domain builder.
//!
//! A [`SchemaGraph`] owns the root document plus any external documents it
//! references (registered by `id`). [`SchemaGraph::resolve`] removes every
//! `$ref` and `allOf`:
//!
//! - `#/definitions/<name>` in the root document becomes a *link*: the node
//!   keeps only the definition name, so recursive schemas stay finite.
//! - every other reference is inlined from its target.
//! - `allOf` lists are merged into one schema.
pub mod resolve;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ConfigError, Error, ResolveError};
use crate::path_de::{self, PathError};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    /// Name of the root definition this node stands for (set by resolution).
    #[serde(skip)]
    pub link: Option<String>,
    #[serde(alias = "$id")]
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<TypeSpec>,
    pub format: Option<String>,
    pub properties: Option<IndexMap<String, Schema>>,
    pub pattern_properties: Option<IndexMap<String, Schema>>,
    pub additional_properties: Option<Additional>,
    pub items: Option<Items>,
    pub all_of: Option<Vec<Schema>>,
    pub one_of: Option<Vec<Schema>>,
    pub any_of: Option<Vec<Schema>>,
    #[serde(rename = "enum")]
    pub enumeration: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "required_keys")]
    pub required: Vec<String>,
    pub definitions: Option<IndexMap<String, Schema>>,
}

/// `type` is either one name or a list of names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Additional {
    Allowed(bool),
    Schema(Box<Schema>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Items {
    // list first: a derived struct would also accept a JSON array
    Many(Vec<Schema>),
    One(Box<Schema>),
}

/// The root document plus the external documents it may reference.
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    pub(crate) root: Schema,
    pub(crate) source: Value,
    pub(crate) externals: IndexMap<String, Value>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeSpec {
    pub fn names(&self) -> Vec<&str> {
        match self {
            TypeSpec::One(name) => vec![name.as_str()],
            TypeSpec::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

impl Schema {
    pub fn from_value(value: Value) -> Result<Self, PathError> {
        path_de::from_value_with_path(value)
    }

    /// Type names with `null` removed (nullability has no IDL counterpart).
    pub fn type_names(&self) -> Vec<&str> {
        self.type_
            .as_ref()
            .map(|t| t.names().into_iter().filter(|n| *n != "null").collect())
            .unwrap_or_default()
    }

    pub fn is_union(&self) -> bool {
        self.one_of.is_some() || self.any_of.is_some() || self.type_names().len() > 1
    }

    /// Alternatives of a union, in declaration order. A multi-valued `type`
    /// yields one single-typed alternative per name.
    pub fn alternatives(&self) -> Vec<Schema> {
        if let Some(alts) = self.one_of.as_ref().or(self.any_of.as_ref()) {
            return alts.clone();
        }
        self.type_names()
            .into_iter()
            .map(|name| Schema {
                type_: Some(TypeSpec::One(name.to_string())),
                format: self.format.clone(),
                properties: self.properties.clone(),
                pattern_properties: self.pattern_properties.clone(),
                additional_properties: self.additional_properties.clone(),
                items: self.items.clone(),
                required: self.required.clone(),
                ..Schema::default()
            })
            .collect()
    }

    /// `additionalProperties: true` only gives shape to an explicit object;
    /// on its own it constrains nothing.
    pub fn has_shape(&self) -> bool {
        self.properties.is_some()
            || self.pattern_properties.is_some()
            || match self.additional_properties {
                Some(Additional::Schema(_)) => true,
                Some(Additional::Allowed(true)) => self.type_names() == ["object"],
                _ => false,
            }
    }

    /// Whether this schema models an object (and therefore becomes a Type).
    pub fn is_object_like(&self) -> bool {
        self.is_union() || self.has_shape() || self.type_names() == ["object"]
    }

    /// True for `{}` and schemas that only carry annotations.
    pub fn is_unconstrained(&self) -> bool {
        self.link.is_none()
            && self.reference.is_none()
            && self.type_.is_none()
            && !self.is_object_like()
            && self.items.is_none()
            && self.all_of.is_none()
            && self.enumeration.is_none()
    }

    /// Visit each direct sub-schema with its path.
    pub(crate) fn try_for_each_child<E>(
        &mut self,
        path: &str,
        mut f: impl FnMut(&mut Schema, String) -> Result<(), E>,
    ) -> Result<(), E> {
        if let Some(props) = &mut self.properties {
            for (key, child) in props.iter_mut() {
                f(child, format!("{path}/properties/{key}"))?;
            }
        }
        if let Some(props) = &mut self.pattern_properties {
            for (pattern, child) in props.iter_mut() {
                f(child, format!("{path}/patternProperties/{pattern}"))?;
            }
        }
        if let Some(Additional::Schema(child)) = &mut self.additional_properties {
            f(&mut **child, format!("{path}/additionalProperties"))?;
        }
        match &mut self.items {
            Some(Items::One(child)) => f(&mut **child, format!("{path}/items"))?,
            Some(Items::Many(children)) => {
                for (i, child) in children.iter_mut().enumerate() {
                    f(child, format!("{path}/items/{i}"))?;
                }
            }
            None => {}
        }
        for (keyword, list) in [
            ("allOf", &mut self.all_of),
            ("oneOf", &mut self.one_of),
            ("anyOf", &mut self.any_of),
        ] {
            if let Some(list) = list {
                for (i, child) in list.iter_mut().enumerate() {
                    f(child, format!("{path}/{keyword}/{i}"))?;
                }
            }
        }
        if let Some(defs) = &mut self.definitions {
            for (name, child) in defs.iter_mut() {
                f(child, format!("{path}/definitions/{name}"))?;
            }
        }
        Ok(())
    }

    /// Fold another schema into this one; `other` wins on conflicts.
    pub(crate) fn absorb(&mut self, other: Schema) {
        if other.type_.is_some() {
            self.type_ = other.type_;
        }
        if other.format.is_some() {
            self.format = other.format;
        }
        if self.title.is_none() {
            self.title = other.title;
        }
        if self.description.is_none() {
            self.description = other.description;
        }
        merge_map(&mut self.properties, other.properties);
        merge_map(&mut self.pattern_properties, other.pattern_properties);
        if other.additional_properties.is_some() {
            self.additional_properties = other.additional_properties;
        }
        if other.items.is_some() {
            self.items = other.items;
        }
        if other.one_of.is_some() {
            self.one_of = other.one_of;
        }
        if other.any_of.is_some() {
            self.any_of = other.any_of;
        }
        if other.enumeration.is_some() {
            self.enumeration = other.enumeration;
        }
        for key in other.required {
            if !self.required.contains(&key) {
                self.required.push(key);
            }
        }
    }
}

impl SchemaGraph {
    pub fn parse(source: Value) -> Result<Self, PathError> {
        let root = Schema::from_value(source.clone())?;
        Ok(Self { root, source, externals: IndexMap::new() })
    }

    pub fn from_json_str(src: &str) -> Result<Self, PathError> {
        let source: Value = path_de::from_str_with_path(src)?;
        Self::parse(source)
    }

    /// Register a document that references may point into, keyed by its `id`.
    pub fn add_external(&mut self, document: Value) -> Result<(), Error> {
        let id = document
            .get("id")
            .or_else(|| document.get("$id"))
            .and_then(Value::as_str)
            .map(document_id)
            .ok_or_else(|| ConfigError::Invalid("external schema document has no `id`".into()))?;
        tracing::debug!(%id, "registered external schema");
        self.externals.insert(id, document);
        Ok(())
    }

    pub fn root(&self) -> &Schema {
        &self.root
    }

    pub fn definition(&self, name: &str) -> Option<&Schema> {
        self.root.definitions.as_ref()?.get(name)
    }

    pub fn definition_names(&self) -> impl Iterator<Item = &str> {
        self.root
            .definitions
            .iter()
            .flat_map(|defs| defs.keys().map(String::as_str))
    }

    /// Resolve references, then merge `allOf` lists.
    pub fn resolve(&mut self) -> Result<(), ResolveError> {
        self.resolve_refs()?;
        self.resolve_all_ofs()
    }
}

/// Document id without the trailing empty fragment.
pub(crate) fn document_id(id: &str) -> String {
    id.trim_end_matches('#').to_string()
}

fn merge_map(into: &mut Option<IndexMap<String, Schema>>, from: Option<IndexMap<String, Schema>>) {
    let Some(from) = from else { return };
    let into = into.get_or_insert_with(IndexMap::new);
    for (key, schema) in from {
        into.insert(key, schema);
    }
}

fn required_keys<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // draft-03 used `"required": true` on the property itself
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Required {
        Keys(Vec<String>),
        Flag(bool),
    }
    Ok(match Required::deserialize(de)? {
        Required::Keys(keys) => keys,
        Required::Flag(_) => Vec::new(),
    })
}
