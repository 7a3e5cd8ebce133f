//! Compiles documents straight from a [`Domain`], with no generated code.
//!
//! Dispatch follows the generated compilers exactly. The difference is the
//! result: a [`Data`] tree records every key that was present, so an empty
//! array and an absent key stay distinct and default scalars survive a
//! round trip through [`to_node`].
use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::domain::{Domain, Property, Repetition, Role, ScalarKind, Target, Type, TypeKind};
use crate::runtime::{self, Built, CompilerError, Context, Scalar, Warning};

#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    String(String),
    Double(f64),
    Float(f32),
    Int64(i64),
    Int32(i32),
    Bool(bool),
    Message(Message),
    List(Vec<Data>),
    Map(BTreeMap<String, Data>),
}

/// An instance of a domain type. Fields are keyed by field name.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub type_name: String,
    pub fields: IndexMap<String, Data>,
}

impl Message {
    pub fn get(&self, field_name: &str) -> Option<&Data> {
        self.fields.get(field_name)
    }
}

impl Data {
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Data::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Data]> {
        match self {
            Data::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Build an instance of `type_name` from `node`.
pub fn build(domain: &Domain, type_name: &str, node: &Value, context: &Context) -> Result<Built<Data>, CompilerError> {
    let mut warnings = Vec::new();
    let value = Compiler { domain }.message(type_name, node, context, &mut warnings)?;
    Ok(Built::new(value, warnings))
}

/// The document node `data` serializes to.
pub fn to_node(domain: &Domain, data: &Data) -> Value {
    match data {
        Data::String(v) => v.to_node(),
        Data::Double(v) => v.to_node(),
        Data::Float(v) => v.to_node(),
        Data::Int64(v) => v.to_node(),
        Data::Int32(v) => v.to_node(),
        Data::Bool(v) => v.to_node(),
        Data::Message(message) => message_node(domain, message),
        Data::List(items) => Value::Array(items.iter().map(|item| to_node(domain, item)).collect()),
        Data::Map(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), to_node(domain, value)))
                .collect(),
        ),
    }
}

struct Compiler<'d> {
    domain: &'d Domain,
}

impl Compiler<'_> {
    fn message(
        &self,
        type_name: &str,
        node: &Value,
        context: &Context,
        warnings: &mut Vec<Warning>,
    ) -> Result<Data, CompilerError> {
        let ty = self
            .domain
            .get(type_name)
            .ok_or_else(|| CompilerError::UnknownType { type_name: type_name.to_string() })?;
        let fields = match ty.kind {
            TypeKind::Object => self.object(ty, node, context, warnings)?,
            TypeKind::OneOf => self.one_of(ty, node, context, warnings)?,
            TypeKind::Array | TypeKind::Any => self.wrapper(ty, node, context, warnings)?,
        };
        Ok(Data::Message(Message { type_name: ty.name.clone(), fields }))
    }

    fn object(
        &self,
        ty: &Type,
        node: &Value,
        context: &Context,
        warnings: &mut Vec<Warning>,
    ) -> Result<IndexMap<String, Data>, CompilerError> {
        let map = runtime::expect_map(node, context)?;
        let required: Vec<&str> = ty.required.iter().map(String::as_str).collect();
        runtime::check_required(map, context, &required)?;
        let roles = ty.bag_roles();

        let mut fields = IndexMap::new();
        for (key, item) in map {
            let at = context.child(key);
            if let Some(property) = ty.field(key) {
                let value = self.value(property, item, &at, warnings)?;
                fields.insert(property.field_name.clone(), value);
                continue;
            }
            let bag = self
                .domain
                .classifier()
                .classify(key, &roles)
                .and_then(|role| ty.bag(role));
            if let Some(bag) = bag {
                let entry = self.entry(bag, key, item, &at, warnings)?;
                if let Data::List(entries) = fields
                    .entry(bag.field_name.clone())
                    .or_insert_with(|| Data::List(Vec::new()))
                {
                    entries.push(entry);
                }
                continue;
            }
            if let Some(additional) = ty.additional() {
                let value = self.item(&additional.target, item, &at, warnings)?;
                if let Data::Map(entries) = fields
                    .entry(additional.field_name.clone())
                    .or_insert_with(|| Data::Map(BTreeMap::new()))
                {
                    entries.insert(key.clone(), value);
                }
                continue;
            }
            warnings.push(runtime::unknown_key(context, key));
        }
        Ok(fields)
    }

    fn one_of(
        &self,
        ty: &Type,
        node: &Value,
        context: &Context,
        warnings: &mut Vec<Warning>,
    ) -> Result<IndexMap<String, Data>, CompilerError> {
        let mut errors = Vec::new();
        for alternative in &ty.properties {
            match runtime::attempt(node, context, |n, c, w| self.item(&alternative.target, n, c, w)) {
                Ok(built) => {
                    warnings.extend(built.warnings);
                    return Ok(IndexMap::from([(alternative.field_name.clone(), built.value)]));
                }
                Err(error) => errors.push(error),
            }
        }
        Err(CompilerError::NoAlternative {
            location: context.path().to_string(),
            type_name: ty.name.clone(),
            errors,
        })
    }

    fn wrapper(
        &self,
        ty: &Type,
        node: &Value,
        context: &Context,
        warnings: &mut Vec<Warning>,
    ) -> Result<IndexMap<String, Data>, CompilerError> {
        let mut fields = IndexMap::new();
        if let Some(property) = ty.properties.first() {
            let value = match ty.kind {
                TypeKind::Any => Data::String(runtime::any(node, context, warnings)?),
                _ => Data::List(self.repeated(&property.target, node, context, warnings)?),
            };
            fields.insert(property.field_name.clone(), value);
        }
        Ok(fields)
    }

    fn entry(
        &self,
        bag: &Property,
        key: &str,
        item: &Value,
        context: &Context,
        warnings: &mut Vec<Warning>,
    ) -> Result<Data, CompilerError> {
        let unknown = || CompilerError::UnknownType { type_name: bag.target.to_string() };
        let Target::Message(entry_type) = &bag.target else {
            return Err(unknown());
        };
        let value_target = self
            .domain
            .get(entry_type)
            .and_then(|ty| ty.field("value"))
            .map(|property| &property.target)
            .ok_or_else(unknown)?;
        let value = self.item(value_target, item, context, warnings)?;
        Ok(Data::Message(Message {
            type_name: entry_type.clone(),
            fields: IndexMap::from([
                ("name".to_string(), Data::String(key.to_string())),
                ("value".to_string(), value),
            ]),
        }))
    }

    fn value(
        &self,
        property: &Property,
        node: &Value,
        context: &Context,
        warnings: &mut Vec<Warning>,
    ) -> Result<Data, CompilerError> {
        match property.repetition {
            Repetition::Singular => self.item(&property.target, node, context, warnings),
            Repetition::Repeated | Repetition::Map => {
                Ok(Data::List(self.repeated(&property.target, node, context, warnings)?))
            }
        }
    }

    fn repeated(
        &self,
        target: &Target,
        node: &Value,
        context: &Context,
        warnings: &mut Vec<Warning>,
    ) -> Result<Vec<Data>, CompilerError> {
        runtime::repeated(node, context, warnings, |n, c, w| self.item(target, n, c, w))
    }

    fn item(
        &self,
        target: &Target,
        node: &Value,
        context: &Context,
        warnings: &mut Vec<Warning>,
    ) -> Result<Data, CompilerError> {
        match target {
            Target::Scalar(kind) => scalar(*kind, node, context, warnings),
            Target::Message(type_name) => self.message(type_name, node, context, warnings),
        }
    }
}

fn scalar(kind: ScalarKind, node: &Value, context: &Context, warnings: &mut Vec<Warning>) -> Result<Data, CompilerError> {
    Ok(match kind {
        ScalarKind::String => Data::String(runtime::string(node, context, warnings)?),
        ScalarKind::Double => Data::Double(runtime::double(node, context, warnings)?),
        ScalarKind::Float => Data::Float(runtime::float(node, context, warnings)?),
        ScalarKind::Int64 => Data::Int64(runtime::int64(node, context, warnings)?),
        ScalarKind::Int32 => Data::Int32(runtime::int32(node, context, warnings)?),
        ScalarKind::Bool => Data::Bool(runtime::boolean(node, context, warnings)?),
    })
}

fn message_node(domain: &Domain, message: &Message) -> Value {
    let Some(ty) = domain.get(&message.type_name) else {
        return Value::Null;
    };
    match ty.kind {
        TypeKind::Any => match message.get("json") {
            Some(Data::String(json)) => runtime::any_node(json),
            _ => Value::Null,
        },
        TypeKind::Array => message
            .fields
            .values()
            .next()
            .map_or_else(|| Value::Array(Vec::new()), |value| to_node(domain, value)),
        TypeKind::OneOf => message
            .fields
            .values()
            .next()
            .map_or(Value::Null, |value| to_node(domain, value)),
        TypeKind::Object => {
            let mut map = Map::new();
            for property in &ty.properties {
                let Some(value) = message.get(&property.field_name) else {
                    continue;
                };
                match (&property.role, value) {
                    (Role::Bag { .. }, Data::List(entries)) => {
                        for entry in entries.iter().filter_map(Data::as_message) {
                            let Some(name) = entry.get("name").and_then(Data::as_str) else {
                                continue;
                            };
                            let node = entry.get("value").map_or(Value::Null, |v| to_node(domain, v));
                            map.insert(name.to_string(), node);
                        }
                    }
                    (Role::AdditionalProperties, Data::Map(entries)) => {
                        for (key, value) in entries {
                            map.insert(key.clone(), to_node(domain, value));
                        }
                    }
                    _ => {
                        map.insert(property.name.clone(), to_node(domain, value));
                    }
                }
            }
            Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::domain::DomainBuilder;
    use crate::schema::SchemaGraph;
    use serde_json::json;

    fn domain(schema: Value) -> Domain {
        let mut graph = SchemaGraph::parse(schema).unwrap();
        graph.resolve().unwrap();
        DomainBuilder::new(&graph, &GeneratorConfig::openapi_v2()).unwrap().build().unwrap()
    }

    fn compile(domain: &Domain, node: Value) -> Result<Built<Data>, CompilerError> {
        build(domain, domain.root(), &node, &Context::root())
    }

    #[test]
    fn empty_arrays_differ_from_absent_keys() {
        let d = domain(json!({ "properties": { "tags": { "type": "array", "items": { "type": "string" } } } }));
        let empty = compile(&d, json!({ "tags": [] })).unwrap().value;
        let absent = compile(&d, json!({})).unwrap().value;
        assert_ne!(empty, absent);
        assert_eq!(empty.as_message().unwrap().get("tags"), Some(&Data::List(Vec::new())));
        assert_eq!(to_node(&d, &empty), json!({ "tags": [] }));
    }

    #[test]
    fn keys_route_to_bags_then_map() {
        let d = domain(json!({
            "properties": { "name": { "type": "string" } },
            "patternProperties": { "^x-": { "type": "string" } },
            "additionalProperties": { "type": "integer" }
        }));
        let node = json!({ "name": "n", "x-a": "1", "size": 3, "x-b": "2" });
        let built = compile(&d, node.clone()).unwrap();
        assert!(built.warnings.is_empty());
        let message = built.value.as_message().unwrap();
        let bag = message.get("vendor_extension").and_then(Data::as_list).unwrap();
        assert_eq!(bag.len(), 2);
        assert_eq!(bag[1].as_message().unwrap().get("name"), Some(&Data::String("x-b".into())));
        assert_eq!(
            message.get("additional_properties"),
            Some(&Data::Map(BTreeMap::from([("size".to_string(), Data::Int64(3))])))
        );
        let back = to_node(&d, &built.value);
        assert_eq!(compile(&d, back).unwrap().value, built.value);
    }

    #[test]
    fn unknown_types_are_reported() {
        let d = domain(json!({ "properties": { "a": { "type": "string" } } }));
        let err = build(&d, "Missing", &json!({}), &Context::root()).unwrap_err();
        assert_eq!(err, CompilerError::UnknownType { type_name: "Missing".into() });
    }

    #[test]
    fn failed_alternatives_are_aggregated() {
        let d = domain(json!({ "properties": { "flag": { "type": ["boolean", "integer"] } } }));
        let err = compile(&d, json!({ "flag": "yes" })).unwrap_err();
        match err {
            CompilerError::NoAlternative { location, type_name, errors } => {
                assert_eq!(location, "$root.flag");
                assert_eq!(type_name, "Flag");
                assert_eq!(errors.len(), 2);
            }
            other => panic!("unexpected {other}"),
        }
    }
}
