//! Error types for resolution, modeling and generation.
//!
//! Every variant is fatal for the run that produced it. Errors raised while
//! compiling documents with a generated compiler live in
//! [`crate::runtime::CompilerError`] instead.
use thiserror::Error;

use crate::path_de::PathError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error for a generation run.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid schema document: {0}")]
    Schema(#[from] PathError),

    /// The writer failed while rendering an artifact.
    #[error("failed to generate {artifact}")]
    Generate {
        artifact: &'static str,
        #[source]
        source: std::fmt::Error,
    },
}

/// The input schema graph could not be made reference-free.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{path}: unresolvable reference `{reference}`")]
    Unresolvable { path: String, reference: String },

    #[error("{path}: reference `{reference}` points at something that is not a schema: {detail}")]
    NotASchema {
        path: String,
        reference: String,
        detail: String,
    },

    #[error("cyclic reference: {}", chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    #[error("cyclic allOf merge: {}", chain.join(" -> "))]
    CyclicMerge { chain: Vec<String> },
}

/// A schema construct has no representation in the domain.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("{path}: {detail}")]
    Unsupported { path: String, detail: String },

    #[error("{path}: unsupported format `{format}` for type `{type_name}`")]
    UnsupportedFormat {
        path: String,
        type_name: String,
        format: String,
    },

    #[error("{path}: malformed pattern `{pattern}`")]
    MalformedPattern {
        path: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{path}: pattern `{pattern}` has no role in the classifier table")]
    UnclassifiedPattern { path: String, pattern: String },

    #[error("{path}: object schema has no properties, pattern properties or additional properties")]
    Shapeless { path: String },

    #[error("{path}: keys `{first}` and `{second}` both map to field `{field_name}`")]
    FieldCollision {
        path: String,
        first: String,
        second: String,
        field_name: String,
    },

    #[error("{path}: type name `{name}` is already taken by {existing}")]
    TypeCollision {
        path: String,
        name: String,
        existing: String,
    },

    #[error("{path}: `{key}` does not produce a valid identifier")]
    InvalidIdentifier { path: String, key: String },

    #[error("{path}: schema still holds unresolved {what}")]
    Unresolved { path: String, what: &'static str },
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration {0}")]
    Parse(#[from] PathError),

    #[error("classifier pattern `{pattern}` is malformed")]
    MalformedPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

impl Error {
    pub(crate) fn generate(artifact: &'static str) -> impl FnOnce(std::fmt::Error) -> Self {
        move |source| Error::Generate { artifact, source }
    }
}
