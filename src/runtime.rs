//! Support code for generated compilers.
//!
//! Generated code reaches everything through `runtime::` paths, so a compiler
//! only needs this module in scope. Every builder shares one signature:
//! `fn(&Value, &Context, &mut Vec<Warning>) -> Result<T, CompilerError>`.
use std::fmt;

use thiserror::Error;

pub use crate::classify::Classifier;
pub use once_cell::sync::Lazy;
pub use serde_json::{Map, Value};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Location of a node inside the document being compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    path: String,
}

/// Non-fatal findings collected alongside a built value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    UnknownKey { location: String, key: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompilerError {
    #[error("{location}: expected {expected}, found {found}")]
    TypeMismatch {
        location: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{location}: missing required key `{key}`")]
    MissingRequired { location: String, key: String },

    #[error("{location}: no alternative of `{type_name}` matches: {}", join(.errors))]
    NoAlternative {
        location: String,
        type_name: String,
        errors: Vec<CompilerError>,
    },

    #[error("unknown type `{type_name}`")]
    UnknownType { type_name: String },

    #[error("classifier table is invalid: {0}")]
    Classifier(String),
}

/// A built value plus the warnings raised while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Built<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

/// A generated message type.
pub trait Message: Sized {
    fn build(node: &Value, context: &Context) -> Result<Built<Self>, CompilerError>;

    /// The document node this value serializes to.
    fn to_node(&self) -> Value;

    /// Build from a document root.
    fn compile(node: &Value) -> Result<Built<Self>, CompilerError> {
        Self::build(node, &Context::root())
    }
}

/// proto3 scalar values.
pub trait Scalar {
    fn to_node(&self) -> Value;

    /// Default values are absent on the wire.
    fn is_default(&self) -> bool;
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Context {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn root() -> Self {
        Self::new("$root")
    }

    pub fn child(&self, key: &str) -> Self {
        Self { path: format!("{}.{}", self.path, key) }
    }

    pub fn index(&self, index: usize) -> Self {
        Self { path: format!("{}[{}]", self.path, index) }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnknownKey { location, key } => write!(f, "{location}: unknown key `{key}`"),
        }
    }
}

impl<T> Built<T> {
    pub fn new(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Built<U> {
        Built { value: f(self.value), warnings: self.warnings }
    }
}

impl Scalar for String {
    fn to_node(&self) -> Value {
        Value::String(self.clone())
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }
}

impl Scalar for f64 {
    fn to_node(&self) -> Value {
        serde_json::Number::from_f64(*self).map_or(Value::Null, Value::Number)
    }

    fn is_default(&self) -> bool {
        *self == 0.0
    }
}

impl Scalar for f32 {
    fn to_node(&self) -> Value {
        f64::from(*self).to_node()
    }

    fn is_default(&self) -> bool {
        *self == 0.0
    }
}

impl Scalar for i64 {
    fn to_node(&self) -> Value {
        Value::from(*self)
    }

    fn is_default(&self) -> bool {
        *self == 0
    }
}

impl Scalar for i32 {
    fn to_node(&self) -> Value {
        Value::from(*self)
    }

    fn is_default(&self) -> bool {
        *self == 0
    }
}

impl Scalar for bool {
    fn to_node(&self) -> Value {
        Value::Bool(*self)
    }

    fn is_default(&self) -> bool {
        !*self
    }
}

// ——— scalar builders ———

pub fn string(node: &Value, context: &Context, _warnings: &mut Vec<Warning>) -> Result<String, CompilerError> {
    node.as_str()
        .map(str::to_string)
        .ok_or_else(|| mismatch(context, "string", node))
}

pub fn double(node: &Value, context: &Context, _warnings: &mut Vec<Warning>) -> Result<f64, CompilerError> {
    node.as_f64().ok_or_else(|| mismatch(context, "number", node))
}

/// Numbers that stay finite at single precision.
pub fn float(node: &Value, context: &Context, warnings: &mut Vec<Warning>) -> Result<f32, CompilerError> {
    let narrow = double(node, context, warnings)? as f32;
    if narrow.is_finite() {
        Ok(narrow)
    } else {
        Err(mismatch(context, "32-bit float", node))
    }
}

/// Integers, and floats with no fractional part that fit.
pub fn int64(node: &Value, context: &Context, _warnings: &mut Vec<Warning>) -> Result<i64, CompilerError> {
    if let Some(v) = node.as_i64() {
        return Ok(v);
    }
    match node.as_f64() {
        Some(v) if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 => Ok(v as i64),
        _ => Err(mismatch(context, "integer", node)),
    }
}

pub fn int32(node: &Value, context: &Context, warnings: &mut Vec<Warning>) -> Result<i32, CompilerError> {
    let wide = int64(node, context, warnings)?;
    i32::try_from(wide).map_err(|_| mismatch(context, "32-bit integer", node))
}

pub fn boolean(node: &Value, context: &Context, _warnings: &mut Vec<Warning>) -> Result<bool, CompilerError> {
    node.as_bool().ok_or_else(|| mismatch(context, "boolean", node))
}

/// Any node, as JSON text.
pub fn any(node: &Value, _context: &Context, _warnings: &mut Vec<Warning>) -> Result<String, CompilerError> {
    Ok(node.to_string())
}

/// Inverse of [`any`].
pub fn any_node(json: &str) -> Value {
    if json.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(json).unwrap_or_else(|_| Value::String(json.to_string()))
}

// ——— composite builders ———

pub fn message<T: Message>(node: &Value, context: &Context, warnings: &mut Vec<Warning>) -> Result<T, CompilerError> {
    let built = T::build(node, context)?;
    warnings.extend(built.warnings);
    Ok(built.value)
}

/// Each element built independently, located by index.
pub fn repeated<T>(
    node: &Value,
    context: &Context,
    warnings: &mut Vec<Warning>,
    item: impl Fn(&Value, &Context, &mut Vec<Warning>) -> Result<T, CompilerError>,
) -> Result<Vec<T>, CompilerError> {
    expect_array(node, context)?
        .iter()
        .enumerate()
        .map(|(i, element)| item(element, &context.index(i), warnings))
        .collect()
}

/// Run one one-of alternative; its warnings are only kept if it succeeds.
pub fn attempt<T>(
    node: &Value,
    context: &Context,
    build: impl FnOnce(&Value, &Context, &mut Vec<Warning>) -> Result<T, CompilerError>,
) -> Result<Built<T>, CompilerError> {
    let mut warnings = Vec::new();
    let value = build(node, context, &mut warnings)?;
    Ok(Built::new(value, warnings))
}

// ——— node access ———

pub fn expect_map<'a>(node: &'a Value, context: &Context) -> Result<&'a Map<String, Value>, CompilerError> {
    node.as_object().ok_or_else(|| mismatch(context, "object", node))
}

pub fn expect_array<'a>(node: &'a Value, context: &Context) -> Result<&'a Vec<Value>, CompilerError> {
    node.as_array().ok_or_else(|| mismatch(context, "array", node))
}

pub fn check_required(map: &Map<String, Value>, context: &Context, keys: &[&str]) -> Result<(), CompilerError> {
    match keys.iter().find(|key| !map.contains_key(**key)) {
        Some(key) => Err(CompilerError::MissingRequired {
            location: context.path().to_string(),
            key: key.to_string(),
        }),
        None => Ok(()),
    }
}

/// Warning for a key of the object at `context` that nothing claims.
pub fn unknown_key(context: &Context, key: &str) -> Warning {
    Warning::UnknownKey { location: context.path().to_string(), key: key.to_string() }
}

/// The lazily compiled classifier of a generated compiler.
pub fn classifier(cell: &Result<Classifier, String>) -> Result<&Classifier, CompilerError> {
    cell.as_ref().map_err(|e| CompilerError::Classifier(e.clone()))
}

pub fn kind_name(node: &Value) -> &'static str {
    match node {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn mismatch(context: &Context, expected: &'static str, node: &Value) -> CompilerError {
    CompilerError::TypeMismatch {
        location: context.path().to_string(),
        expected,
        found: kind_name(node),
    }
}

fn join(errors: &[CompilerError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run<T>(
        f: impl Fn(&Value, &Context, &mut Vec<Warning>) -> Result<T, CompilerError>,
        node: Value,
    ) -> Result<T, CompilerError> {
        f(&node, &Context::root().child("a"), &mut Vec::new())
    }

    #[test]
    fn scalar_conversions() {
        assert_eq!(run(string, json!("x")).unwrap(), "x");
        assert_eq!(run(int64, json!(3)).unwrap(), 3);
        assert_eq!(run(int64, json!(3.0)).unwrap(), 3);
        assert_eq!(run(float, json!(1.5)).unwrap(), 1.5);
        assert_eq!(run(double, json!(2)).unwrap(), 2.0);
        assert!(run(boolean, json!(true)).unwrap());
        assert_eq!(run(any, json!({ "k": [1] })).unwrap(), r#"{"k":[1]}"#);
    }

    #[test]
    fn mismatches_carry_location_and_kinds() {
        let err = run(int64, json!(3.5)).unwrap_err();
        assert_eq!(
            err,
            CompilerError::TypeMismatch { location: "$root.a".into(), expected: "integer", found: "number" }
        );
        let err = run(int32, json!(5_000_000_000i64)).unwrap_err();
        assert!(matches!(err, CompilerError::TypeMismatch { expected: "32-bit integer", .. }));
        let err = run(float, json!(1e300)).unwrap_err();
        assert_eq!(
            err,
            CompilerError::TypeMismatch { location: "$root.a".into(), expected: "32-bit float", found: "number" }
        );
        let err = run(string, json!(null)).unwrap_err();
        assert_eq!(err.to_string(), "$root.a: expected string, found null");
    }

    #[test]
    fn repeated_locates_each_element() {
        let err = run(|n, c, w| repeated(n, c, w, boolean), json!([true, 1])).unwrap_err();
        assert!(matches!(err, CompilerError::TypeMismatch { ref location, .. } if location == "$root.a[1]"));
        assert_eq!(run(|n, c, w| repeated(n, c, w, string), json!([])).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn attempt_isolates_warnings() {
        let built = attempt(&json!("x"), &Context::root(), |node, context, warnings| {
            warnings.push(unknown_key(context, "k"));
            string(node, context, warnings)
        })
        .unwrap();
        assert_eq!(built.value, "x");
        assert_eq!(built.warnings, [Warning::UnknownKey { location: "$root".into(), key: "k".into() }]);
    }

    #[test]
    fn required_keys_and_any_nodes() {
        let map = json!({ "a": 1 });
        let map = map.as_object().unwrap();
        assert!(check_required(map, &Context::root(), &["a"]).is_ok());
        let err = check_required(map, &Context::root(), &["a", "b"]).unwrap_err();
        assert_eq!(err.to_string(), "$root: missing required key `b`");
        assert_eq!(any_node(r#"{"k":1}"#), json!({ "k": 1 }));
        assert_eq!(any_node(""), Value::Null);
    }

    #[test]
    fn scalars_know_their_defaults() {
        assert!(Scalar::is_default(&String::new()));
        assert!(!Scalar::is_default(&1i32));
        assert_eq!(Scalar::to_node(&1.5f32), json!(1.5));
        assert_eq!(Scalar::to_node(&false), json!(false));
    }
}
