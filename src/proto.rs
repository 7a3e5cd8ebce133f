//! proto3 IDL emitter.
//!
//! Output order is fixed: license, `syntax`, `package`, file options, then one
//! message per domain type in domain order. Field numbers follow property
//! order, so an unchanged domain always renders the same numbers.
use std::fmt;

use crate::config::{GeneratorConfig, ProtoOption};
use crate::domain::{Domain, Property, Repetition, Type, TypeKind};
use crate::emit::Writer;
use crate::error::Error;

pub fn generate(domain: &Domain, config: &GeneratorConfig) -> Result<String, Error> {
    let text = render(domain, config).map_err(Error::generate("IDL"))?;
    tracing::debug!(package = %config.package, bytes = text.len(), "rendered IDL");
    Ok(text)
}

fn render(domain: &Domain, config: &GeneratorConfig) -> Result<String, fmt::Error> {
    let mut w = Writer::new("  ");
    if !config.license.is_empty() {
        w.raw(&config.license)?;
        w.blank()?;
    }
    w.line("syntax = \"proto3\";")?;
    w.blank()?;
    w.line(format_args!("package {};", config.package))?;
    w.blank()?;

    for option in &config.options {
        render_option(&mut w, option)?;
        w.blank()?;
    }

    for (i, ty) in domain.types().enumerate() {
        if i > 0 {
            w.blank()?;
        }
        render_message(&mut w, ty)?;
    }
    Ok(w.finish())
}

fn render_option(w: &mut Writer, option: &ProtoOption) -> fmt::Result {
    if !option.comment.is_empty() {
        w.comment(&option.comment)?;
    }
    w.line(format_args!("option {} = {};", option.name, option_literal(&option.value)))
}

fn render_message(w: &mut Writer, ty: &Type) -> fmt::Result {
    if let Some(description) = &ty.description {
        w.comment(description)?;
    }
    if ty.properties.is_empty() {
        return w.line(format_args!("message {} {{}}", ty.name));
    }
    w.block(format_args!("message {} {{", ty.name), "}", |w| match ty.kind {
        TypeKind::OneOf => w.block("oneof oneof {", "}", |w| render_fields(w, ty)),
        TypeKind::Object | TypeKind::Array | TypeKind::Any => render_fields(w, ty),
    })
}

fn render_fields(w: &mut Writer, ty: &Type) -> fmt::Result {
    for (i, property) in ty.properties.iter().enumerate() {
        if let Some(description) = &property.description {
            w.comment(description)?;
        }
        w.line(format_args!("{} {} = {};", field_type(property), property.field_name, i + 1))?;
    }
    Ok(())
}

fn field_type(property: &Property) -> String {
    match property.repetition {
        Repetition::Singular => property.target.to_string(),
        Repetition::Repeated => format!("repeated {}", property.target),
        Repetition::Map => format!("map<string, {}>", property.target),
    }
}

/// Booleans and numbers are bare; everything else is a quoted string.
fn option_literal(value: &str) -> String {
    let bare = matches!(value, "true" | "false")
        || value.parse::<i64>().is_ok()
        || value.parse::<f64>().is_ok_and(f64::is_finite);
    if bare {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainBuilder;
    use crate::schema::SchemaGraph;
    use serde_json::{Value, json};

    fn render_schema(schema: Value, config: &GeneratorConfig) -> String {
        let mut graph = SchemaGraph::parse(schema).unwrap();
        graph.resolve().unwrap();
        let domain = DomainBuilder::new(&graph, config).unwrap().build().unwrap();
        generate(&domain, config).unwrap()
    }

    fn bare_config() -> GeneratorConfig {
        GeneratorConfig { options: Vec::new(), ..GeneratorConfig::openapi_v2() }
    }

    #[test]
    fn name_field_plus_extension_field() {
        let text = render_schema(
            json!({
                "properties": { "name": { "type": "string" } },
                "patternProperties": { "^x-": {} }
            }),
            &bare_config(),
        );
        assert!(
            text.contains("message Document {\n  string name = 1;\n  repeated NamedAny vendor_extension = 2;\n}\n"),
            "{text}"
        );
        assert!(text.starts_with("syntax = \"proto3\";\n\npackage openapi.v2;\n\n"));
    }

    #[test]
    fn header_renders_license_and_options() {
        let mut config = GeneratorConfig::openapi_v2();
        config.license = "// Copyright 2017 Example Authors".into();
        let text = render_schema(json!({ "properties": { "a": { "type": "string" } } }), &config);
        assert!(text.starts_with("// Copyright 2017 Example Authors\n\nsyntax = \"proto3\";\n"));
        assert!(text.contains("// work with it directly.\noption java_outer_classname = \"OpenAPIProto\";\n"));
        assert!(text.contains("option java_multiple_files = true;\n"));
        assert!(text.contains("option java_package = \"org.openapi.v2\";\n"));
    }

    #[test]
    fn unions_maps_and_repetition() {
        let text = render_schema(
            json!({
                "properties": {
                    "flag": { "description": "Either form.", "type": ["boolean", "string"] },
                    "labels": { "additionalProperties": { "type": "string" } },
                    "matrix": { "type": "array", "items": { "type": "array", "items": { "type": "number" } } }
                }
            }),
            &bare_config(),
        );
        assert!(
            text.contains("// Either form.\nmessage Flag {\n  oneof oneof {\n    bool boolean = 1;\n    string string = 2;\n  }\n}\n"),
            "{text}"
        );
        assert!(text.contains("message Labels {\n  map<string, string> additional_properties = 1;\n}\n"), "{text}");
        assert!(text.contains("  repeated DoubleArray matrix = 3;\n"), "{text}");
        assert!(text.contains("message DoubleArray {\n  repeated double value = 1;\n}\n"), "{text}");
    }

    #[test]
    fn output_is_stable_across_runs() {
        let schema = json!({
            "properties": {
                "b": { "$ref": "#/definitions/thing" },
                "a": { "type": "integer" }
            },
            "definitions": { "thing": { "properties": { "z": { "type": "boolean" }, "y": {} } } }
        });
        let first = render_schema(schema.clone(), &bare_config());
        let second = render_schema(schema, &bare_config());
        assert_eq!(first, second);
        assert!(first.contains("message Thing {\n  bool z = 1;\n  Any y = 2;\n}\n"), "{first}");
    }

    #[test]
    fn option_values_are_quoted_unless_bare() {
        assert_eq!(option_literal("true"), "true");
        assert_eq!(option_literal("42"), "42");
        assert_eq!(option_literal("1.5"), "1.5");
        assert_eq!(option_literal("OAS"), "\"OAS\"");
        assert_eq!(option_literal("a\"b"), "\"a\\\"b\"");
        assert_eq!(option_literal("inf"), "\"inf\"");
    }
}
