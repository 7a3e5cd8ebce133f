//! Compiler emitter: Rust source that builds typed values from parsed
//! documents.
//!
//! The output declares the classifier table as data (`PATTERNS`), one struct
//! per domain type (plus a `<Type>Oneof` enum per one-of type), and a
//! `runtime::Message` impl for each. Everything outside the generated items is
//! spelled with absolute paths so schema type names cannot shadow it.
use std::fmt;

use crate::config::GeneratorConfig;
use crate::domain::{Domain, Property, Repetition, Role, Target, Type, TypeKind};
use crate::emit::Writer;
use crate::error::Error;
use crate::naming::{rust_ident, variant_name};

const RESULT: &str = "::std::result::Result";
const OPTION: &str = "::std::option::Option";
const BOX: &str = "::std::boxed::Box";

pub fn generate(domain: &Domain, config: &GeneratorConfig) -> Result<String, Error> {
    let text = render(domain, config).map_err(Error::generate("compiler"))?;
    tracing::debug!(module = %config.module_name(), bytes = text.len(), "rendered compiler");
    Ok(text)
}

fn render(domain: &Domain, config: &GeneratorConfig) -> Result<String, fmt::Error> {
    let mut w = Writer::new("    ");
    if !config.license.is_empty() {
        if config.license.lines().all(|line| line.trim_start().starts_with("//")) {
            w.raw(&config.license)?;
        } else {
            w.comment(&config.license)?;
        }
        w.blank()?;
    }
    w.line("// Code generated by schema-idl. DO NOT EDIT.")?;
    w.line(format_args!("// Compiler for package `{}`.", config.package))?;
    w.blank()?;
    w.line(format_args!("use {}::runtime;", config.runtime_crate))?;
    w.blank()?;

    w.line("// Pattern -> role table used to route keys into catch-all fields.")?;
    w.block("pub const PATTERNS: &[(&str, &str)] = &[", "];", |w| {
        for rule in domain.classifier().rules() {
            w.line(format_args!("({:?}, {:?}),", rule.pattern, rule.role))?;
        }
        Ok(())
    })?;
    w.blank()?;
    w.line("#[allow(dead_code)]")?;
    w.line(format_args!(
        "static CLASSIFIER: runtime::Lazy<{RESULT}<runtime::Classifier, ::std::string::String>> ="
    ))?;
    w.indent();
    w.line("runtime::Lazy::new(|| runtime::Classifier::new(PATTERNS.iter().copied()).map_err(|e| e.to_string()));")?;
    w.dedent();

    for ty in domain.types() {
        w.blank()?;
        render_type(&mut w, domain, ty)?;
    }
    Ok(w.finish())
}

fn render_type(w: &mut Writer, domain: &Domain, ty: &Type) -> fmt::Result {
    if let Some(description) = &ty.description {
        w.comment(description)?;
    }
    w.line("#[derive(Debug, Clone, Default, PartialEq)]")?;
    if ty.kind == TypeKind::OneOf {
        let enum_name = oneof_enum(ty);
        w.block(format_args!("pub struct {} {{", ty.name), "}", |w| {
            w.line(format_args!("pub oneof: {OPTION}<{enum_name}>,"))
        })?;
        w.blank()?;
        w.line("#[derive(Debug, Clone, PartialEq)]")?;
        w.block(format_args!("pub enum {enum_name} {{"), "}", |w| {
            for alternative in &ty.properties {
                if let Some(description) = &alternative.description {
                    w.comment(description)?;
                }
                w.line(format_args!(
                    "{}({}),",
                    variant_name(&alternative.field_name),
                    variant_payload(&alternative.target)
                ))?;
            }
            Ok(())
        })?;
    } else {
        w.block(format_args!("pub struct {} {{", ty.name), "}", |w| {
            for property in &ty.properties {
                if let Some(description) = &property.description {
                    w.comment(description)?;
                }
                w.line(format_args!("pub {}: {},", rust_ident(&property.field_name), field_type(property)))?;
            }
            Ok(())
        })?;
    }
    w.blank()?;

    w.block(format_args!("impl runtime::Message for {} {{", ty.name), "}", |w| {
        w.line("#[allow(unused_mut, unused_variables)]")?;
        w.block(
            format_args!(
                "fn build(node: &runtime::Value, context: &runtime::Context) -> {RESULT}<runtime::Built<Self>, runtime::CompilerError> {{"
            ),
            "}",
            |w| match ty.kind {
                TypeKind::Object => build_object(w, domain, ty),
                TypeKind::OneOf => build_one_of(w, ty),
                TypeKind::Array | TypeKind::Any => build_wrapper(w, ty),
            },
        )?;
        w.blank()?;
        w.line("#[allow(unused_mut)]")?;
        w.block("fn to_node(&self) -> runtime::Value {", "}", |w| match ty.kind {
            TypeKind::Object => object_node(w, domain, ty),
            TypeKind::OneOf => one_of_node(w, ty),
            TypeKind::Array | TypeKind::Any => wrapper_node(w, ty),
        })
    })
}

// ——— build ———

fn build_object(w: &mut Writer, domain: &Domain, ty: &Type) -> fmt::Result {
    w.line("let map = runtime::expect_map(node, context)?;")?;
    if !ty.required.is_empty() {
        let keys: Vec<String> = ty.required.iter().map(|key| format!("{key:?}")).collect();
        w.line(format_args!("runtime::check_required(map, context, &[{}])?;", keys.join(", ")))?;
    }
    w.line("let mut value = Self::default();")?;
    w.line("let mut warnings = ::std::vec::Vec::new();")?;
    w.block("for (key, item) in map {", "}", |w| {
        w.line("let at = context.child(key);")?;
        w.block("match key.as_str() {", "}", |w| {
            for property in ty.properties.iter().filter(|p| p.role == Role::Field) {
                w.line(format_args!(
                    "{:?} => value.{} = {},",
                    property.name,
                    rust_ident(&property.field_name),
                    field_expr(property)
                ))?;
            }
            w.block("_ => {", "}", |w| catch_all(w, domain, ty))
        })
    })?;
    w.line(format!("{RESULT}::Ok(runtime::Built::new(value, warnings))"))
}

/// Keys no declared field claims: bags, then the map, then a warning.
fn catch_all(w: &mut Writer, domain: &Domain, ty: &Type) -> fmt::Result {
    let fallback = match ty.additional() {
        Some(additional) => format!(
            "{{ value.{}.insert(key.clone(), {}); }}",
            rust_ident(&additional.field_name),
            item_expr(&additional.target)
        ),
        None => "warnings.push(runtime::unknown_key(context, key))".to_string(),
    };
    let roles = ty.bag_roles();
    if roles.is_empty() {
        return w.line(fallback);
    }

    let role_list: Vec<String> = roles.iter().map(|role| format!("{role:?}")).collect();
    w.block(
        format_args!(
            "match runtime::classifier(&CLASSIFIER)?.classify(key, &[{}]) {{",
            role_list.join(", ")
        ),
        "}",
        |w| {
            for bag in ty.bags() {
                let Role::Bag { role, .. } = &bag.role else { continue };
                let Target::Message(entry) = &bag.target else { continue };
                let value = match bag_value(domain, bag) {
                    Some(value) => singular_expr(&value.target),
                    None => "::std::default::Default::default()".to_string(),
                };
                w.line(format_args!(
                    "{OPTION}::Some({role:?}) => value.{}.push({entry} {{ name: key.clone(), value: {value} }}),",
                    rust_ident(&bag.field_name),
                ))?;
            }
            w.line(format_args!("_ => {fallback},"))
        },
    )
}

fn build_one_of(w: &mut Writer, ty: &Type) -> fmt::Result {
    let enum_name = oneof_enum(ty);
    w.line("let mut errors = ::std::vec::Vec::new();")?;
    for alternative in &ty.properties {
        let wrap = match &alternative.target {
            Target::Message(_) => format!("{BOX}::new(v)"),
            Target::Scalar(_) => "v".to_string(),
        };
        w.block(
            format_args!("match runtime::attempt(node, context, {}) {{", item_builder(&alternative.target)),
            "}",
            |w| {
                w.block(format_args!("{RESULT}::Ok(built) => {{"), "}", |w| {
                    w.line(format_args!(
                        "return {RESULT}::Ok(built.map(|v| Self {{ oneof: {OPTION}::Some({enum_name}::{}({wrap})) }}));",
                        variant_name(&alternative.field_name)
                    ))
                })?;
                w.line(format_args!("{RESULT}::Err(error) => errors.push(error),"))
            },
        )?;
    }
    w.block(format_args!("{RESULT}::Err(runtime::CompilerError::NoAlternative {{"), "})", |w| {
        w.line("location: context.path().to_string(),")?;
        w.line(format_args!("type_name: {:?}.to_string(),", ty.name))?;
        w.line("errors,")
    })
}

/// Array wrappers and `Any`: one property built from the node itself.
fn build_wrapper(w: &mut Writer, ty: &Type) -> fmt::Result {
    w.line("let mut warnings = ::std::vec::Vec::new();")?;
    let Some(property) = ty.properties.first() else {
        return w.line(format!("{RESULT}::Ok(runtime::Built::new(Self::default(), warnings))"));
    };
    let expr = match ty.kind {
        TypeKind::Any => "runtime::any(node, context, &mut warnings)?".to_string(),
        _ => format!(
            "runtime::repeated(node, context, &mut warnings, {})?",
            item_builder(&property.target)
        ),
    };
    w.line(format_args!("let {} = {expr};", rust_ident(&property.field_name)))?;
    w.line(format_args!(
        "{RESULT}::Ok(runtime::Built::new(Self {{ {} }}, warnings))",
        rust_ident(&property.field_name)
    ))
}

// ——— to_node ———

fn object_node(w: &mut Writer, domain: &Domain, ty: &Type) -> fmt::Result {
    w.line("let mut map = runtime::Map::new();")?;
    for property in &ty.properties {
        let field = format!("self.{}", rust_ident(&property.field_name));
        match (&property.role, property.repetition) {
            (Role::Bag { .. }, _) => {
                let value = match bag_value(domain, property) {
                    Some(value) => singular_node(&value.target, "entry.value"),
                    None => "runtime::Value::Null".to_string(),
                };
                w.block(format_args!("for entry in &{field} {{"), "}", |w| {
                    w.line(format_args!("map.insert(entry.name.clone(), {value});"))
                })?;
            }
            (Role::AdditionalProperties, _) | (_, Repetition::Map) => {
                w.block(format_args!("for (key, v) in &{field} {{"), "}", |w| {
                    w.line(format_args!("map.insert(key.clone(), {});", element_node(&property.target, "v")))
                })?;
            }
            (_, Repetition::Repeated) => {
                w.block(format_args!("if let {OPTION}::Some(v) = &{field} {{"), "}", |w| {
                    w.line(format_args!(
                        "map.insert({:?}.to_string(), {});",
                        property.name,
                        array_node(&property.target, "v")
                    ))
                })?;
            }
            (_, Repetition::Singular) => match &property.target {
                Target::Scalar(_) if ty.required.contains(&property.name) => {
                    w.line(format_args!(
                        "map.insert({:?}.to_string(), runtime::Scalar::to_node(&{field}));",
                        property.name
                    ))?;
                }
                Target::Scalar(_) => {
                    w.block(format_args!("if !runtime::Scalar::is_default(&{field}) {{"), "}", |w| {
                        w.line(format_args!(
                            "map.insert({:?}.to_string(), runtime::Scalar::to_node(&{field}));",
                            property.name
                        ))
                    })?;
                }
                Target::Message(_) => {
                    w.block(format_args!("if let {OPTION}::Some(v) = &{field} {{"), "}", |w| {
                        w.line(format_args!(
                            "map.insert({:?}.to_string(), runtime::Message::to_node(&**v));",
                            property.name
                        ))
                    })?;
                }
            },
        }
    }
    w.line("runtime::Value::Object(map)")
}

fn one_of_node(w: &mut Writer, ty: &Type) -> fmt::Result {
    let enum_name = oneof_enum(ty);
    w.block("match &self.oneof {", "}", |w| {
        for alternative in &ty.properties {
            let node = match &alternative.target {
                Target::Message(_) => "runtime::Message::to_node(&**v)",
                Target::Scalar(_) => "runtime::Scalar::to_node(v)",
            };
            w.line(format_args!(
                "{OPTION}::Some({enum_name}::{}(v)) => {node},",
                variant_name(&alternative.field_name)
            ))?;
        }
        w.line(format_args!("{OPTION}::None => runtime::Value::Null,"))
    })
}

fn wrapper_node(w: &mut Writer, ty: &Type) -> fmt::Result {
    let Some(property) = ty.properties.first() else {
        return w.line("runtime::Value::Null");
    };
    let field = format!("self.{}", rust_ident(&property.field_name));
    match ty.kind {
        TypeKind::Any => w.line(format_args!("runtime::any_node(&{field})")),
        _ => w.line(array_node(&property.target, &field)),
    }
}

// ——— expressions ———

fn oneof_enum(ty: &Type) -> String {
    format!("{}Oneof", ty.name)
}

fn variant_payload(target: &Target) -> String {
    match target {
        Target::Scalar(kind) => kind.rust_type().to_string(),
        Target::Message(name) => format!("{BOX}<{name}>"),
    }
}

fn element_type(target: &Target) -> String {
    match target {
        Target::Scalar(kind) => kind.rust_type().to_string(),
        Target::Message(name) => name.clone(),
    }
}

fn field_type(property: &Property) -> String {
    match (property.repetition, &property.target) {
        (Repetition::Singular, Target::Scalar(kind)) => kind.rust_type().to_string(),
        (Repetition::Singular, Target::Message(name)) => format!("{OPTION}<{BOX}<{name}>>"),
        (Repetition::Repeated, target) if property.role == Role::Field => {
            format!("{OPTION}<::std::vec::Vec<{}>>", element_type(target))
        }
        (Repetition::Repeated, target) => format!("::std::vec::Vec<{}>", element_type(target)),
        (Repetition::Map, target) => format!(
            "::std::collections::BTreeMap<::std::string::String, {}>",
            element_type(target)
        ),
    }
}

/// The runtime function building one value of `target`.
fn item_builder(target: &Target) -> String {
    match target {
        Target::Scalar(kind) => format!("runtime::{}", kind.builder_name()),
        Target::Message(name) => format!("runtime::message::<{name}>"),
    }
}

/// One value of `target` built from `item`, unwrapped.
fn item_expr(target: &Target) -> String {
    format!("{}(item, &at, &mut warnings)?", item_builder(target))
}

/// A singular field value (messages are optional and boxed).
fn singular_expr(target: &Target) -> String {
    match target {
        Target::Scalar(_) => item_expr(target),
        Target::Message(_) => format!("{OPTION}::Some({BOX}::new({}))", item_expr(target)),
    }
}

/// A declared field's value. Repeated fields keep presence.
fn field_expr(property: &Property) -> String {
    match property.repetition {
        Repetition::Singular => singular_expr(&property.target),
        Repetition::Repeated | Repetition::Map => format!(
            "{OPTION}::Some(runtime::repeated(item, &at, &mut warnings, {})?)",
            item_builder(&property.target)
        ),
    }
}

/// Node of a singular field stored at `place`.
fn singular_node(target: &Target, place: &str) -> String {
    match target {
        Target::Scalar(_) => format!("runtime::Scalar::to_node(&{place})"),
        Target::Message(_) => format!("{place}.as_deref().map_or(runtime::Value::Null, runtime::Message::to_node)"),
    }
}

/// Node of a collection element borrowed as `binding`.
fn element_node(target: &Target, binding: &str) -> String {
    match target {
        Target::Scalar(_) => format!("runtime::Scalar::to_node({binding})"),
        Target::Message(_) => format!("runtime::Message::to_node({binding})"),
    }
}

fn array_node(target: &Target, place: &str) -> String {
    let convert = match target {
        Target::Scalar(_) => "runtime::Scalar::to_node",
        Target::Message(_) => "runtime::Message::to_node",
    };
    format!("runtime::Value::Array({place}.iter().map({convert}).collect())")
}

/// The `value` property of a bag's entry type.
fn bag_value<'d>(domain: &'d Domain, bag: &Property) -> Option<&'d Property> {
    let Target::Message(entry) = &bag.target else { return None };
    domain.get(entry)?.field("value")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainBuilder;
    use crate::schema::SchemaGraph;
    use serde_json::{Value, json};

    fn render_schema(schema: Value) -> String {
        let config = GeneratorConfig::openapi_v2();
        let mut graph = SchemaGraph::parse(schema).unwrap();
        graph.resolve().unwrap();
        let domain = DomainBuilder::new(&graph, &config).unwrap().build().unwrap();
        generate(&domain, &config).unwrap()
    }

    #[test]
    fn header_declares_the_pattern_table() {
        let text = render_schema(json!({ "properties": { "a": { "type": "string" } } }));
        assert!(text.starts_with("// Code generated by schema-idl. DO NOT EDIT.\n"));
        assert!(text.contains("use schema_idl::runtime;\n"));
        assert!(text.contains("    (\"^x-\", \"vendorExtension\"),\n"));
        assert!(text.contains("    (\"^([0-9]{3})$|^(default)$\", \"responseCode\"),\n"));
    }

    #[test]
    fn objects_dispatch_declared_keys_then_bags() {
        let text = render_schema(json!({
            "required": ["name"],
            "properties": { "name": { "type": "string" }, "type": { "type": "integer", "format": "int32" } },
            "patternProperties": { "^x-": {} }
        }));
        assert!(text.contains("pub struct Document {\n    pub name: ::std::string::String,\n    pub r#type: i32,\n"), "{text}");
        assert!(text.contains("runtime::check_required(map, context, &[\"name\"])?;"), "{text}");
        assert!(text.contains("\"name\" => value.name = runtime::string(item, &at, &mut warnings)?,"), "{text}");
        assert!(text.contains("\"type\" => value.r#type = runtime::int32(item, &at, &mut warnings)?,"), "{text}");
        assert!(
            text.contains("match runtime::classifier(&CLASSIFIER)?.classify(key, &[\"vendorExtension\"]) {"),
            "{text}"
        );
        assert!(text.contains(
            "::std::option::Option::Some(\"vendorExtension\") => value.vendor_extension.push(NamedAny { name: key.clone(), value: ::std::option::Option::Some(::std::boxed::Box::new(runtime::message::<Any>(item, &at, &mut warnings)?)) }),"
        ), "{text}");
        assert!(text.contains("_ => warnings.push(runtime::unknown_key(context, key)),"), "{text}");
    }

    #[test]
    fn required_scalars_are_always_written() {
        let text = render_schema(json!({
            "required": ["name"],
            "properties": { "name": { "type": "string" }, "note": { "type": "string" } }
        }));
        assert!(text.contains(
            "    map.insert(\"name\".to_string(), runtime::Scalar::to_node(&self.name));\n"
        ), "{text}");
        assert!(text.contains("if !runtime::Scalar::is_default(&self.note) {"), "{text}");
    }

    #[test]
    fn one_of_types_try_alternatives_in_order() {
        let text = render_schema(json!({
            "properties": { "flag": { "type": ["boolean", "string"] } }
        }));
        let boolean = text.find("match runtime::attempt(node, context, runtime::boolean) {").unwrap();
        let string = text.find("match runtime::attempt(node, context, runtime::string) {").unwrap();
        assert!(boolean < string);
        assert!(text.contains("pub enum FlagOneof {\n    Boolean(bool),\n    String(::std::string::String),\n}"), "{text}");
        assert!(text.contains("type_name: \"Flag\".to_string(),"), "{text}");
    }

    #[test]
    fn maps_and_wrappers() {
        let text = render_schema(json!({
            "properties": {
                "labels": { "additionalProperties": { "type": "string" } },
                "matrix": { "type": "array", "items": { "type": "array", "items": { "type": "integer" } } }
            }
        }));
        assert!(text.contains("pub additional_properties: ::std::collections::BTreeMap<::std::string::String, ::std::string::String>,"), "{text}");
        assert!(text.contains("{ value.additional_properties.insert(key.clone(), runtime::string(item, &at, &mut warnings)?); }"), "{text}");
        assert!(text.contains("pub matrix: ::std::option::Option<::std::vec::Vec<Int64Array>>,"), "{text}");
        assert!(text.contains(
            "\"matrix\" => value.matrix = ::std::option::Option::Some(runtime::repeated(item, &at, &mut warnings, runtime::message::<Int64Array>)?),"
        ), "{text}");
        assert!(text.contains("pub struct Int64Array {\n    pub value: ::std::vec::Vec<i64>,\n}"), "{text}");
        assert!(text.contains("let value = runtime::repeated(node, context, &mut warnings, runtime::int64)?;"), "{text}");
    }

    #[test]
    fn output_is_deterministic() {
        let schema = json!({
            "properties": { "b": { "$ref": "#/definitions/thing" }, "a": { "type": "array" } },
            "patternProperties": { "^x-": { "type": "string" } },
            "definitions": { "thing": { "properties": { "z": { "type": "boolean" } } } }
        });
        assert_eq!(render_schema(schema.clone()), render_schema(schema));
    }
}
