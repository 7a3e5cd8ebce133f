use schema_idl::dynamic::{self, Data};
use schema_idl::runtime::{CompilerError, Context, Warning};
use schema_idl::{Domain, GeneratorConfig, SchemaGraph};
use serde_json::{Value, json};

fn load(schema: Value) -> Domain {
    let mut graph = SchemaGraph::parse(schema).unwrap();
    schema_idl::load_domain(&mut graph, &GeneratorConfig::openapi_v2()).unwrap()
}

fn proto(schema: Value) -> String {
    let config = GeneratorConfig::openapi_v2();
    let mut graph = SchemaGraph::parse(schema).unwrap();
    let domain = schema_idl::load_domain(&mut graph, &config).unwrap();
    schema_idl::generate(&domain, &config).unwrap().proto
}

fn compile(domain: &Domain, node: Value) -> Result<schema_idl::runtime::Built<Data>, CompilerError> {
    dynamic::build(domain, domain.root(), &node, &Context::root())
}

#[test]
fn name_plus_extension_document() {
    let domain = load(json!({
        "properties": { "name": { "type": "string" } },
        "patternProperties": { "^x-": {} }
    }));
    let names: Vec<&str> = domain.types().map(|ty| ty.name.as_str()).collect();
    assert_eq!(names, ["Any", "Document", "NamedAny"]);

    let built = compile(&domain, json!({ "name": "widget", "x-note": "v1" })).unwrap();
    assert!(built.warnings.is_empty());
    let document = built.value.as_message().unwrap();
    assert_eq!(document.get("name").and_then(Data::as_str), Some("widget"));
    let extensions = document.get("vendor_extension").and_then(Data::as_list).unwrap();
    assert_eq!(extensions.len(), 1);
    let entry = extensions[0].as_message().unwrap();
    assert_eq!(entry.get("name").and_then(Data::as_str), Some("x-note"));
    let any = entry.get("value").and_then(Data::as_message).unwrap();
    assert_eq!(any.get("json").and_then(Data::as_str), Some("\"v1\""));
}

#[test]
fn declared_properties_are_numbered_in_order() {
    let text = proto(json!({
        "properties": {
            "zeta": { "type": "string" },
            "alpha": { "type": "integer" },
            "x-extra": { "type": "string" }
        },
        "patternProperties": { "^x-": {} }
    }));
    assert!(text.contains(
        "message Document {\n  string zeta = 1;\n  int64 alpha = 2;\n  repeated NamedAny vendor_extension = 3;\n}\n"
    ), "{text}");
}

#[test]
fn appending_a_property_keeps_existing_numbers() {
    let before = proto(json!({ "properties": { "a": { "type": "string" }, "b": { "type": "boolean" } } }));
    let after = proto(json!({
        "properties": { "a": { "type": "string" }, "b": { "type": "boolean" }, "c": { "type": "number" } }
    }));
    assert!(before.contains("  string a = 1;\n  bool b = 2;\n}\n"));
    assert!(after.contains("  string a = 1;\n  bool b = 2;\n  double c = 3;\n}\n"));
}

#[test]
fn both_artifacts_are_deterministic() {
    let schema = json!({
        "required": ["info"],
        "properties": {
            "info": { "$ref": "#/definitions/info" },
            "paths": { "$ref": "#/definitions/paths" },
            "flag": { "type": ["boolean", "string"] }
        },
        "patternProperties": { "^x-": {} },
        "definitions": {
            "info": { "properties": { "title": { "type": "string" } } },
            "paths": {
                "patternProperties": { "^/": { "$ref": "#/definitions/pathItem" } }
            },
            "pathItem": {
                "properties": { "summary": { "type": "string" }, "next": { "$ref": "#/definitions/pathItem" } }
            }
        }
    });
    let config = GeneratorConfig::openapi_v2();
    let run = || {
        let mut graph = SchemaGraph::parse(schema.clone()).unwrap();
        let domain = schema_idl::load_domain(&mut graph, &config).unwrap();
        schema_idl::generate(&domain, &config).unwrap()
    };
    let first = run();
    for _ in 0..4 {
        assert_eq!(run(), first);
    }
}

#[test]
fn unknown_keys_warn_exactly_once() {
    let domain = load(json!({ "properties": { "name": { "type": "string" } } }));
    let built = compile(&domain, json!({ "name": "n", "other": 1 })).unwrap();
    assert_eq!(
        built.warnings,
        vec![Warning::UnknownKey { location: "$root".into(), key: "other".into() }]
    );
}

#[test]
fn earlier_alternative_wins_a_tie() {
    let domain = load(json!({
        "properties": {
            "choice": { "oneOf": [{ "$ref": "#/definitions/a" }, { "$ref": "#/definitions/b" }] }
        },
        "definitions": {
            "a": { "properties": { "x": { "type": "string" } } },
            "b": { "properties": { "x": { "type": "string" } } }
        }
    }));
    let built = compile(&domain, json!({ "choice": { "x": "1" } })).unwrap();
    let choice = built.value.as_message().unwrap().get("choice").and_then(Data::as_message).unwrap();
    assert_eq!(choice.type_name, "Choice");
    assert_eq!(choice.fields.keys().collect::<Vec<_>>(), ["a"]);
}

#[test]
fn empty_array_is_not_an_absent_key() {
    let domain = load(json!({ "properties": { "tags": { "type": "array", "items": { "type": "string" } } } }));
    let empty = compile(&domain, json!({ "tags": [] })).unwrap().value;
    let absent = compile(&domain, json!({})).unwrap().value;
    assert_ne!(empty, absent);
    assert_eq!(dynamic::to_node(&domain, &empty), json!({ "tags": [] }));
    assert_eq!(dynamic::to_node(&domain, &absent), json!({}));
}

#[test]
fn dynamic_values_round_trip() {
    let domain = load(json!({
        "properties": {
            "name": { "type": "string" },
            "count": { "type": "integer", "format": "int32" },
            "labels": { "additionalProperties": { "type": "string" } },
            "grid": { "type": "array", "items": { "type": "array", "items": { "type": "number" } } }
        },
        "patternProperties": { "^x-": {} }
    }));
    let node = json!({
        "name": "",
        "count": 0,
        "labels": { "a": "1" },
        "grid": [[1.5], []],
        "x-any": { "nested": [null, true] }
    });
    let built = compile(&domain, node.clone()).unwrap();
    assert!(built.warnings.is_empty());
    assert_eq!(dynamic::to_node(&domain, &built.value), node);
}

#[test]
fn external_documents_resolve_by_id() {
    let mut graph = SchemaGraph::parse(json!({
        "properties": { "owner": { "$ref": "http://example.com/base.json#/definitions/person" } }
    }))
    .unwrap();
    graph
        .add_external(json!({
            "id": "http://example.com/base.json#",
            "definitions": {
                "person": { "properties": { "name": { "type": "string" }, "email": { "$ref": "#/definitions/email" } } },
                "email": { "type": "string", "format": "email" }
            }
        }))
        .unwrap();
    let domain = schema_idl::load_domain(&mut graph, &GeneratorConfig::openapi_v2()).unwrap();
    let owner = domain.get("Owner").unwrap();
    let fields: Vec<&str> = owner.properties.iter().map(|p| p.field_name.as_str()).collect();
    assert_eq!(fields, ["name", "email"]);
}

#[test]
fn unresolvable_references_fail_the_run() {
    let mut graph = SchemaGraph::parse(json!({
        "properties": { "a": { "$ref": "#/definitions/missing" } }
    }))
    .unwrap();
    let err = schema_idl::load_domain(&mut graph, &GeneratorConfig::openapi_v2()).unwrap_err();
    assert_eq!(err.to_string(), "#/properties/a: unresolvable reference `#/definitions/missing`");
}
