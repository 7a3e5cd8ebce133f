//! Generate a proto3 IDL and a typed document compiler from a JSON-Schema.
//!
//! ```text
//! SchemaGraph --resolve--> DomainBuilder --> Domain --+--> proto::generate
//!                                                     +--> compiler::generate
//! ```
pub mod classify;
pub mod compiler;
pub mod config;
pub mod domain;
pub mod dynamic;
pub mod emit;
pub mod error;
pub mod naming;
pub mod path_de;
pub mod proto;
pub mod runtime;
pub mod schema;

pub use config::GeneratorConfig;
pub use domain::{Domain, DomainBuilder};
pub use error::{Error, Result};
pub use schema::SchemaGraph;

/// Both texts of one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub proto: String,
    pub compiler: String,
}

/// Resolve `graph` in place and model it.
pub fn load_domain(graph: &mut SchemaGraph, config: &GeneratorConfig) -> Result<Domain> {
    graph.resolve()?;
    let domain = DomainBuilder::new(graph, config)?.build()?;
    Ok(domain)
}

/// Render the IDL and the compiler concurrently.
pub fn generate(domain: &Domain, config: &GeneratorConfig) -> Result<Artifacts> {
    let (proto, compiler) = rayon::join(
        || proto::generate(domain, config),
        || compiler::generate(domain, config),
    );
    Ok(Artifacts { proto: proto?, compiler: compiler? })
}
