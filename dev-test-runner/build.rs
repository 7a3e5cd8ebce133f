//! Generates the catalog compiler and IDL from the fixtures into `OUT_DIR`.
use std::path::PathBuf;

use schema_idl::{GeneratorConfig, SchemaGraph};

const SCHEMA: &str = "fixtures/catalog.schema.json";
const CONFIG: &str = "fixtures/catalog.config.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed={SCHEMA}");
    println!("cargo:rerun-if-changed={CONFIG}");

    let config = GeneratorConfig::from_json_str(&std::fs::read_to_string(CONFIG)?)?;
    let mut graph = SchemaGraph::from_json_str(&std::fs::read_to_string(SCHEMA)?)?;
    let domain = schema_idl::load_domain(&mut graph, &config)?;
    let artifacts = schema_idl::generate(&domain, &config)?;

    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    std::fs::write(out_dir.join("catalog.proto"), &artifacts.proto)?;
    std::fs::write(out_dir.join("catalog.rs"), &artifacts.compiler)?;
    Ok(())
}
