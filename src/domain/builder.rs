//! Resolved schema graph -> [`Domain`].
use std::collections::HashMap;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use super::{Domain, Property, Repetition, Role, ScalarKind, Target, Type, TypeKind};
use crate::classify::Classifier;
use crate::config::GeneratorConfig;
use crate::error::{Error, ModelError};
use crate::naming;
use crate::schema::{Additional, Items, Schema, SchemaGraph};

/// `string` formats that keep the plain string scalar.
const STRING_FORMATS: &[&str] = &[
    "uri", "uri-reference", "url", "email", "hostname", "ipv4", "ipv6", "date", "date-time",
    "time", "regex", "byte", "binary", "password", "uuid",
];

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub struct DomainBuilder<'a> {
    graph: &'a SchemaGraph,
    classifier: Classifier,
    root_type: String,
    types: IndexMap<String, Type>,
    /// Schema path -> type name, so a schema is only ever modeled once.
    origins: HashMap<String, String>,
    /// Definition type names -> their origin, held before anything is built.
    reserved: HashMap<String, String>,
    /// Non-object definitions currently being expanded.
    aliases: Vec<String>,
}

/// Candidate names for a type built from an inline schema.
struct Naming {
    preferred: String,
    fallback: Option<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Naming {
    fn exact(name: impl Into<String>) -> Self {
        Self { preferred: name.into(), fallback: None }
    }

    /// `PascalCase(key)`, else `Parent + PascalCase(key)`.
    fn keyed(parent: &str, key: &str, path: &str) -> Result<Self, ModelError> {
        let word = naming::type_name(key).ok_or_else(|| invalid_identifier(path, key))?;
        Ok(Self { fallback: Some(format!("{parent}{word}")), preferred: word })
    }
}

impl<'a> DomainBuilder<'a> {
    /// `graph` must already be resolved.
    pub fn new(graph: &'a SchemaGraph, config: &GeneratorConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            graph,
            classifier: config.classifier()?,
            root_type: config.root_type.clone(),
            types: IndexMap::new(),
            origins: HashMap::new(),
            reserved: HashMap::new(),
            aliases: Vec::new(),
        })
    }

    pub fn build(mut self) -> Result<Domain, ModelError> {
        let graph = self.graph;
        let root = graph.root();
        if !root.is_object_like() {
            check_resolved(root, "#")?;
            return Err(ModelError::Unsupported {
                path: "#".into(),
                detail: "the root schema does not describe an object".into(),
            });
        }
        for name in graph.definition_names() {
            let is_object = graph.definition(name).is_some_and(Schema::is_object_like);
            if let (true, Some(type_name)) = (is_object, naming::type_name(name)) {
                self.reserved
                    .entry(type_name)
                    .or_insert_with(|| format!("#/definitions/{name}"));
            }
        }
        let root_name = self.object_type(Naming::exact(self.root_type.clone()), root, "#")?;

        for name in graph.definition_names() {
            let is_object = graph.definition(name).is_some_and(Schema::is_object_like);
            if is_object {
                self.definition(name, &format!("#/definitions/{name}"))?;
            }
        }

        self.types.sort_keys();
        tracing::debug!(types = self.types.len(), root = %root_name, "domain built");
        Ok(Domain { types: self.types, classifier: self.classifier, root: root_name })
    }

    fn definition(&mut self, name: &str, path: &str) -> Result<(Target, Repetition), ModelError> {
        let graph = self.graph;
        let schema = graph
            .definition(name)
            .ok_or_else(|| ModelError::Unresolved { path: path.into(), what: "link" })?;
        let origin = format!("#/definitions/{name}");
        let type_name = naming::type_name(name).ok_or_else(|| invalid_identifier(&origin, name))?;

        if schema.is_object_like() {
            let ty = self.object_type(Naming::exact(type_name), schema, &origin)?;
            return Ok((Target::Message(ty), Repetition::Singular));
        }
        if self.aliases.iter().any(|alias| alias == name) {
            return Err(ModelError::Unsupported {
                path: origin,
                detail: format!("definition `{name}` contains itself without an object in between"),
            });
        }
        self.aliases.push(name.to_string());
        let result = self.target(Naming::exact(type_name), schema, &origin);
        self.aliases.pop();
        result
    }

    fn object_type(&mut self, naming: Naming, schema: &Schema, origin: &str) -> Result<String, ModelError> {
        if let Some(name) = self.origins.get(origin) {
            return Ok(name.clone());
        }
        check_resolved(schema, origin)?;
        let name = self.claim(naming, origin)?;

        // registered before the properties so recursive links find it
        self.origins.insert(origin.to_string(), name.clone());
        self.types.insert(name.clone(), new_type(&name, TypeKind::Object, origin));

        let ty = if schema.is_union() {
            self.one_of_type(&name, schema, origin)?
        } else {
            self.struct_type(&name, schema, origin)?
        };
        tracing::debug!(type_name = %name, %origin, properties = ty.properties.len(), "registered type");
        self.types.insert(name.clone(), ty);
        Ok(name)
    }

    fn claim(&self, naming: Naming, origin: &str) -> Result<String, ModelError> {
        let Naming { preferred, fallback } = naming;
        let Some(existing) = self.owner(&preferred, origin) else {
            return Ok(preferred);
        };
        if let Some(fallback) = fallback.filter(|name| self.owner(name, origin).is_none()) {
            return Ok(fallback);
        }
        Err(ModelError::TypeCollision { path: origin.to_string(), name: preferred, existing })
    }

    /// Origin holding `name`, unless it is free for `origin`.
    fn owner(&self, name: &str, origin: &str) -> Option<String> {
        if let Some(ty) = self.types.get(name) {
            return Some(ty.origin.clone());
        }
        self.reserved.get(name).filter(|owner| *owner != origin).cloned()
    }

    fn struct_type(&mut self, name: &str, schema: &Schema, path: &str) -> Result<Type, ModelError> {
        let mut ty = new_type(name, TypeKind::Object, path);
        ty.description = describe(schema);

        let mut bags = Vec::new();
        for (pattern, value) in schema.pattern_properties.iter().flatten() {
            let at = format!("{path}/patternProperties/{pattern}");
            if let Err(source) = Regex::new(pattern) {
                return Err(ModelError::MalformedPattern { path: at, pattern: pattern.clone(), source });
            }
            let role = self
                .classifier
                .role_for_pattern(pattern)
                .ok_or_else(|| ModelError::UnclassifiedPattern { path: at.clone(), pattern: pattern.clone() })?
                .to_string();
            bags.push((role, pattern, value, at));
        }
        let roles: Vec<&str> = bags.iter().map(|(role, ..)| role.as_str()).collect();

        for (key, property) in schema.properties.iter().flatten() {
            let at = format!("{path}/properties/{key}");
            if let Some(role) = self.classifier.classify(key, &roles) {
                tracing::debug!(type_name = %name, %key, %role, "declared key collected by bag");
                continue;
            }
            let field_name = naming::field_name(key).ok_or_else(|| invalid_identifier(&at, key))?;
            let (target, repetition) = self.target(Naming::keyed(name, key, &at)?, property, &at)?;
            ty.properties.push(Property {
                name: key.clone(),
                field_name,
                role: Role::Field,
                target,
                repetition,
                description: describe(property),
            });
        }

        for (role, pattern, value, at) in &bags {
            let field_name = naming::field_name(role).ok_or_else(|| invalid_identifier(at, role))?;
            let value_target = self.item_target(Naming::keyed(name, role, at)?, value, at)?;
            let entry = self.named_type(value_target)?;
            ty.properties.push(Property {
                name: role.clone(),
                field_name,
                role: Role::Bag { role: role.clone(), pattern: pattern.to_string() },
                target: Target::Message(entry),
                repetition: Repetition::Repeated,
                description: describe(value),
            });
        }
        ty.open_extension = !bags.is_empty();

        let additional = match &schema.additional_properties {
            Some(Additional::Schema(value)) => {
                let at = format!("{path}/additionalProperties");
                let target = self.item_target(Naming::exact(format!("{name}Value")), value, &at)?;
                Some((target, describe(value)))
            }
            Some(Additional::Allowed(true)) => Some((Target::Message(self.any_type()?), None)),
            _ => None,
        };
        if let Some((target, description)) = additional {
            if ty.properties.is_empty() {
                ty.map_of = Some(target.clone());
            }
            ty.properties.push(Property {
                name: "additionalProperties".into(),
                field_name: "additional_properties".into(),
                role: Role::AdditionalProperties,
                target,
                repetition: Repetition::Map,
                description,
            });
        }

        if ty.properties.is_empty() && !schema.has_shape() {
            return Err(ModelError::Shapeless { path: path.to_string() });
        }

        let required: Vec<String> = schema
            .required
            .iter()
            .filter(|key| ty.field(key).is_some())
            .cloned()
            .collect();
        ty.required = required;
        check_unique(&ty.properties, path, |p| p.field_name.clone())?;
        Ok(ty)
    }

    fn one_of_type(&mut self, name: &str, schema: &Schema, path: &str) -> Result<Type, ModelError> {
        let keyword = if schema.one_of.is_some() {
            "oneOf"
        } else if schema.any_of.is_some() {
            "anyOf"
        } else {
            "type"
        };
        let alternatives = schema.alternatives();
        if alternatives.is_empty() {
            return Err(ModelError::Unsupported {
                path: path.to_string(),
                detail: format!("`{keyword}` lists no alternatives"),
            });
        }

        let mut ty = new_type(name, TypeKind::OneOf, path);
        ty.description = describe(schema);
        for (i, alternative) in alternatives.iter().enumerate() {
            let at = format!("{path}/{keyword}/{i}");
            let candidates = Naming::exact(format!("{name}Alternative{}", i + 1));
            let target = self.item_target(candidates, alternative, &at)?;
            let field_name = match &target {
                Target::Scalar(kind) => kind.builder_name().to_string(),
                Target::Message(type_name) => {
                    naming::field_name(type_name).ok_or_else(|| invalid_identifier(&at, type_name))?
                }
            };
            ty.properties.push(Property {
                name: field_name.clone(),
                field_name,
                role: Role::Alternative,
                target,
                repetition: Repetition::Singular,
                description: describe(alternative),
            });
        }
        check_unique(&ty.properties, path, |p| p.field_name.clone())?;
        check_unique(&ty.properties, path, |p| naming::variant_name(&p.field_name))?;
        Ok(ty)
    }

    /// What a property of this schema points at, and how often.
    fn target(&mut self, naming: Naming, schema: &Schema, path: &str) -> Result<(Target, Repetition), ModelError> {
        check_resolved(schema, path)?;
        if let Some(name) = &schema.link {
            return self.definition(name, path);
        }
        if schema.is_object_like() {
            let ty = self.object_type(naming, schema, path)?;
            return Ok((Target::Message(ty), Repetition::Singular));
        }

        let types = schema.type_names();
        match types.first().copied() {
            Some("array") => Ok((self.items_target(naming, schema, path)?, Repetition::Repeated)),
            Some(other) => {
                let kind = scalar_kind(other, schema.format.as_deref(), path)?;
                Ok((Target::Scalar(kind), Repetition::Singular))
            }
            None if schema.type_.is_some() => Err(ModelError::Unsupported {
                path: path.to_string(),
                detail: "`null` is the only allowed type".into(),
            }),
            None if schema.items.is_some() => {
                Ok((self.items_target(naming, schema, path)?, Repetition::Repeated))
            }
            None => match &schema.enumeration {
                Some(values) if !values.is_empty() && values.iter().all(Value::is_string) => {
                    Ok((Target::Scalar(ScalarKind::String), Repetition::Singular))
                }
                _ => Ok((Target::Message(self.any_type()?), Repetition::Singular)),
            },
        }
    }

    fn items_target(&mut self, naming: Naming, schema: &Schema, path: &str) -> Result<Target, ModelError> {
        match &schema.items {
            Some(Items::One(item)) => self.item_target(naming, item, &format!("{path}/items")),
            Some(Items::Many(_)) => Err(ModelError::Unsupported {
                path: format!("{path}/items"),
                detail: "tuple-form `items` is not supported".into(),
            }),
            None => Ok(Target::Message(self.any_type()?)),
        }
    }

    /// Target of a value that cannot itself be repeated (array items, map
    /// values, bag values, alternatives). Repetition goes through a wrapper.
    fn item_target(&mut self, naming: Naming, schema: &Schema, path: &str) -> Result<Target, ModelError> {
        let (target, repetition) = self.target(naming, schema, path)?;
        match repetition {
            Repetition::Singular => Ok(target),
            Repetition::Repeated | Repetition::Map => Ok(Target::Message(self.array_type(target)?)),
        }
    }

    fn any_type(&mut self) -> Result<String, ModelError> {
        self.synthetic("Any".to_string(), |name, origin| Type {
            properties: vec![plain("json", Target::Scalar(ScalarKind::String), Repetition::Singular, Role::Field)],
            description: Some("Any value, carried as JSON text.".into()),
            ..new_type(name, TypeKind::Any, origin)
        })
    }

    fn array_type(&mut self, element: Target) -> Result<String, ModelError> {
        let name = format!("{}Array", element.type_word());
        self.synthetic(name, move |name, origin| Type {
            properties: vec![plain("value", element, Repetition::Repeated, Role::Element)],
            ..new_type(name, TypeKind::Array, origin)
        })
    }

    fn named_type(&mut self, value: Target) -> Result<String, ModelError> {
        let name = format!("Named{}", value.type_word());
        self.synthetic(name, move |name, origin| Type {
            properties: vec![
                plain("name", Target::Scalar(ScalarKind::String), Repetition::Singular, Role::Field),
                plain("value", value, Repetition::Singular, Role::Field),
            ],
            required: vec!["name".into()],
            description: Some("A pattern-matched key and its value.".into()),
            ..new_type(name, TypeKind::Object, origin)
        })
    }

    fn synthetic(&mut self, name: String, make: impl FnOnce(&str, &str) -> Type) -> Result<String, ModelError> {
        let origin = format!("synthetic:{name}");
        if let Some(existing) = self.origins.get(&origin) {
            return Ok(existing.clone());
        }
        let name = self.claim(Naming::exact(name), &origin)?;
        let ty = make(&name, &origin);
        tracing::debug!(type_name = %name, "registered synthetic type");
        self.origins.insert(origin, name.clone());
        self.types.insert(name.clone(), ty);
        Ok(name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn new_type(name: &str, kind: TypeKind, origin: &str) -> Type {
    Type {
        name: name.to_string(),
        kind,
        properties: Vec::new(),
        required: Vec::new(),
        open_extension: false,
        map_of: None,
        origin: origin.to_string(),
        description: None,
    }
}

fn plain(name: &str, target: Target, repetition: Repetition, role: Role) -> Property {
    Property {
        name: name.to_string(),
        field_name: name.to_string(),
        role,
        target,
        repetition,
        description: None,
    }
}

fn describe(schema: &Schema) -> Option<String> {
    schema.description.clone().or_else(|| schema.title.clone())
}

fn scalar_kind(type_name: &str, format: Option<&str>, path: &str) -> Result<ScalarKind, ModelError> {
    let kind = match (type_name, format) {
        ("string", None) => ScalarKind::String,
        ("string", Some(format)) if STRING_FORMATS.contains(&format) => ScalarKind::String,
        ("number", None | Some("double")) => ScalarKind::Double,
        ("number", Some("float")) => ScalarKind::Float,
        ("integer", None | Some("int64")) => ScalarKind::Int64,
        ("integer", Some("int32")) => ScalarKind::Int32,
        ("boolean", None) => ScalarKind::Bool,
        ("string" | "number" | "integer" | "boolean", Some(format)) => {
            return Err(ModelError::UnsupportedFormat {
                path: path.to_string(),
                type_name: type_name.to_string(),
                format: format.to_string(),
            });
        }
        (other, _) => {
            return Err(ModelError::Unsupported {
                path: path.to_string(),
                detail: format!("unknown type `{other}`"),
            });
        }
    };
    Ok(kind)
}

fn check_resolved(schema: &Schema, path: &str) -> Result<(), ModelError> {
    let what = if schema.reference.is_some() {
        "$ref"
    } else if schema.all_of.is_some() {
        "allOf"
    } else {
        return Ok(());
    };
    Err(ModelError::Unresolved { path: path.to_string(), what })
}

fn check_unique(
    properties: &[Property],
    path: &str,
    key: impl Fn(&Property) -> String,
) -> Result<(), ModelError> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for property in properties {
        let name = key(property);
        if let Some(first) = seen.get(&name) {
            return Err(ModelError::FieldCollision {
                path: path.to_string(),
                first: first.to_string(),
                second: property.name.clone(),
                field_name: name,
            });
        }
        seen.insert(name, &property.name);
    }
    Ok(())
}

fn invalid_identifier(path: &str, key: &str) -> ModelError {
    ModelError::InvalidIdentifier { path: path.to_string(), key: key.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn domain(schema: Value) -> Result<Domain, ModelError> {
        let mut graph = SchemaGraph::parse(schema).unwrap();
        graph.resolve().unwrap();
        DomainBuilder::new(&graph, &GeneratorConfig::openapi_v2()).unwrap().build()
    }

    fn field_names(ty: &Type) -> Vec<&str> {
        ty.properties.iter().map(|p| p.field_name.as_str()).collect()
    }

    #[test]
    fn named_fields_plus_extension_bag() {
        let d = domain(json!({
            "properties": { "name": { "type": "string" } },
            "patternProperties": { "^x-": {} }
        }))
        .unwrap();
        let names: Vec<_> = d.types().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Any", "Document", "NamedAny"]);

        let doc = d.get("Document").unwrap();
        assert!(doc.open_extension);
        assert_eq!(field_names(doc), ["name", "vendor_extension"]);
        let bag = &doc.properties[1];
        assert_eq!(bag.target, Target::Message("NamedAny".into()));
        assert_eq!(bag.repetition, Repetition::Repeated);
        assert_eq!(bag.role, Role::Bag { role: "vendorExtension".into(), pattern: "^x-".into() });
        assert_eq!(d.get("NamedAny").unwrap().required, ["name"]);
    }

    #[test]
    fn declared_properties_keep_order_unless_bagged() {
        let d = domain(json!({
            "required": ["b", "x-c", "missing"],
            "properties": {
                "b": { "type": "integer", "format": "int32" },
                "x-c": { "type": "string" },
                "a": { "type": "boolean" }
            },
            "patternProperties": { "^x-": { "type": "string" } }
        }))
        .unwrap();
        let doc = d.get("Document").unwrap();
        assert_eq!(field_names(doc), ["b", "a", "vendor_extension"]);
        assert_eq!(doc.properties[0].target, Target::Scalar(ScalarKind::Int32));
        assert_eq!(doc.required, ["b"]);
        assert!(d.get("NamedString").is_some());
    }

    #[test]
    fn arrays_of_arrays_use_wrappers() {
        let d = domain(json!({
            "properties": {
                "matrix": { "type": "array", "items": { "type": "array", "items": { "type": "integer" } } },
                "anything": { "type": "array" }
            }
        }))
        .unwrap();
        let doc = d.get("Document").unwrap();
        assert_eq!(doc.properties[0].target, Target::Message("Int64Array".into()));
        assert_eq!(doc.properties[0].repetition, Repetition::Repeated);
        assert_eq!(doc.properties[1].target, Target::Message("Any".into()));
        let wrapper = d.get("Int64Array").unwrap();
        assert_eq!(wrapper.kind, TypeKind::Array);
        assert_eq!(wrapper.properties[0].repetition, Repetition::Repeated);
    }

    #[test]
    fn pure_maps_record_their_value() {
        let d = domain(json!({
            "properties": { "labels": { "type": "object", "additionalProperties": { "type": "string" } } }
        }))
        .unwrap();
        let labels = d.get("Labels").unwrap();
        assert_eq!(labels.map_of, Some(Target::Scalar(ScalarKind::String)));
        assert_eq!(labels.properties[0].repetition, Repetition::Map);
        assert_eq!(labels.properties[0].field_name, "additional_properties");
    }

    #[test]
    fn unions_keep_declaration_order() {
        let d = domain(json!({
            "properties": {
                "flag": { "type": ["boolean", "string"] },
                "param": { "$ref": "#/definitions/parameter" }
            },
            "definitions": {
                "parameter": { "oneOf": [{ "$ref": "#/definitions/body" }, { "$ref": "#/definitions/query" }] },
                "body": { "properties": { "schema": {} } },
                "query": { "properties": { "in": { "type": "string" } } }
            }
        }))
        .unwrap();
        let flag = d.get("Flag").unwrap();
        assert_eq!(flag.kind, TypeKind::OneOf);
        assert_eq!(field_names(flag), ["boolean", "string"]);
        let parameter = d.get("Parameter").unwrap();
        assert_eq!(field_names(parameter), ["body", "query"]);
        assert_eq!(parameter.properties[1].target, Target::Message("Query".into()));
    }

    #[test]
    fn inline_names_fall_back_to_the_parent() {
        let d = domain(json!({
            "properties": {
                "a": { "properties": { "info": { "properties": { "x": { "type": "string" } } } } },
                "info": { "properties": { "y": { "type": "string" } } }
            }
        }))
        .unwrap();
        assert_eq!(d.get("Info").unwrap().origin, "#/properties/a/properties/info");
        assert_eq!(d.get("DocumentInfo").unwrap().origin, "#/properties/info");
    }

    #[test]
    fn definitions_keep_their_names_over_inline_objects() {
        let d = domain(json!({
            "properties": {
                "info": { "properties": { "y": { "type": "string" } } },
                "about": { "$ref": "#/definitions/info" }
            },
            "definitions": {
                "info": { "properties": { "title": { "type": "string" } } }
            }
        }))
        .unwrap();
        assert_eq!(d.get("Info").unwrap().origin, "#/definitions/info");
        assert_eq!(d.get("DocumentInfo").unwrap().origin, "#/properties/info");
        let doc = d.get("Document").unwrap();
        assert_eq!(doc.properties[0].target, Target::Message("DocumentInfo".into()));
        assert_eq!(doc.properties[1].target, Target::Message("Info".into()));
    }

    #[test]
    fn recursive_definitions_are_built_once() {
        let d = domain(json!({
            "properties": { "root": { "$ref": "#/definitions/node" } },
            "definitions": {
                "node": {
                    "type": "object",
                    "properties": { "children": { "type": "array", "items": { "$ref": "#/definitions/node" } } }
                },
                "unused": { "properties": { "z": { "type": "number", "format": "float" } } }
            }
        }))
        .unwrap();
        let node = d.get("Node").unwrap();
        assert_eq!(node.properties[0].target, Target::Message("Node".into()));
        assert_eq!(d.get("Unused").unwrap().properties[0].target, Target::Scalar(ScalarKind::Float));
    }

    #[test]
    fn modeling_errors_name_the_path() {
        let err = domain(json!({ "properties": { "a": { "type": "string", "format": "color" } } })).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedFormat { ref path, .. } if path == "#/properties/a"));

        let err = domain(json!({ "properties": { "a": { "type": "object" } } })).unwrap_err();
        assert!(matches!(err, ModelError::Shapeless { ref path } if path == "#/properties/a"));

        let err = domain(json!({ "properties": { "a": { "patternProperties": { "^y-": {} } } } })).unwrap_err();
        assert!(matches!(err, ModelError::UnclassifiedPattern { .. }));

        let err = domain(json!({ "properties": { "a": { "items": [{ "type": "string" }] } } })).unwrap_err();
        assert!(matches!(err, ModelError::Unsupported { ref path, .. } if path == "#/properties/a/items"));
    }

    #[test]
    fn sanitized_name_collisions_fail() {
        let err = domain(json!({
            "properties": { "fooBar": { "type": "string" }, "foo_bar": { "type": "string" } }
        }))
        .unwrap_err();
        match err {
            ModelError::FieldCollision { first, second, field_name, .. } => {
                assert_eq!((first.as_str(), second.as_str(), field_name.as_str()), ("fooBar", "foo_bar", "foo_bar"));
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn domain_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Domain>();
    }

    #[test]
    fn description_lists_every_type() {
        let d = domain(json!({
            "required": ["name"],
            "properties": { "name": { "type": "string" } },
            "patternProperties": { "^x-": {} }
        }))
        .unwrap();
        let text = d.to_string();
        assert!(text.contains("Document (open)\n  name: string required\n  vendor_extension: repeated NamedAny [^x-]\n"), "{text}");
        assert!(text.contains("Any (any)\n  json: string\n"), "{text}");
    }
}
