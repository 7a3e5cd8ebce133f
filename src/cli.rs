//! CLI: schema -> (proto + compiler | type model | compiled document)
use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use schema_idl::runtime::Context;
use schema_idl::{Domain, GeneratorConfig, SchemaGraph, dynamic};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate a proto3 IDL and a typed document compiler from a JSON-Schema
#[derive(Parser, Debug)]
#[command(name = "schema-idl", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// write `<name>.proto` and `<module>.rs`
    Generate(GenerateOut),
    /// print the type model built from the schema
    Describe(DescribeOut),
    /// compile a JSON or YAML document against the schema
    Compile(CompileOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// the JSON-Schema to generate from (JSON or YAML)
    #[arg(long, short)]
    schema: PathBuf,

    /// further schema documents that references may point into, keyed by
    /// their `id`. May be literal paths or quoted glob patterns
    #[arg(long, num_args = 1..)]
    base_schema: Vec<String>,

    /// use the OpenAPI 2.0 configuration (the default)
    #[arg(long, conflicts_with_all = ["v3", "config"])]
    v2: bool,

    /// use the OpenAPI 3.0 configuration
    #[arg(long, conflicts_with = "config")]
    v3: bool,

    /// generator configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// file whose text heads both artifacts
    #[arg(long)]
    license: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// output directory
    #[arg(short, long)]
    out: PathBuf,
}

#[derive(clap::Parser, Debug)]
struct DescribeOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,
}

#[derive(clap::Parser, Debug)]
struct CompileOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// the document to compile
    #[arg(long, short)]
    document: PathBuf,

    /// type to build (the root type if omitted)
    #[arg(long)]
    type_name: Option<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn config(&self) -> anyhow::Result<GeneratorConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let source = read_text(path)?;
                GeneratorConfig::from_json_str(&source)
                    .with_context(|| format!("failed to load configuration {}", path.display()))?
            }
            None if self.v3 => GeneratorConfig::openapi_v3(),
            None => {
                if !self.v2 {
                    tracing::debug!("no configuration given, using the OpenAPI 2.0 preset");
                }
                GeneratorConfig::openapi_v2()
            }
        };
        if let Some(path) = &self.license {
            config.license = read_text(path)?;
        }
        Ok(config)
    }

    fn load(&self) -> anyhow::Result<(GeneratorConfig, Domain)> {
        let config = self.config()?;
        let source = read_document(&self.schema)?;
        let mut graph = SchemaGraph::parse(source)
            .with_context(|| format!("{} is not a valid schema", self.schema.display()))?;
        for path in resolve_file_path_patterns(&self.base_schema)? {
            let document = read_document(&path)?;
            graph
                .add_external(document)
                .with_context(|| format!("failed to register {}", path.display()))?;
        }
        let domain = schema_idl::load_domain(&mut graph, &config)
            .with_context(|| format!("failed to model {}", self.schema.display()))?;
        tracing::info!(types = domain.len(), root = %domain.root(), "schema modeled");
        Ok((config, domain))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                let (config, domain) = target.schema_settings.load()?;
                let artifacts = schema_idl::generate(&domain, &config)?;
                std::fs::create_dir_all(&target.out)
                    .with_context(|| format!("failed to create {}", target.out.display()))?;
                let proto_path = target.out.join(format!("{}.proto", config.name));
                let compiler_path = target.out.join(format!("{}.rs", config.module_name()));
                write_text(&proto_path, &artifacts.proto)?;
                write_text(&compiler_path, &artifacts.compiler)?;
            }
            Command::Describe(target) => {
                let (_, domain) = target.schema_settings.load()?;
                print!("{domain}");
            }
            Command::Compile(target) => {
                let (_, domain) = target.schema_settings.load()?;
                let document = read_document(&target.document)?;
                let type_name = target.type_name.as_deref().unwrap_or(domain.root());
                let built = dynamic::build(&domain, type_name, &document, &Context::root())
                    .with_context(|| format!("failed to compile {}", target.document.display()))?;
                for warning in &built.warnings {
                    tracing::warn!(%warning, "document warning");
                }
                tracing::info!(warnings = built.warnings.len(), %type_name, "document compiled");
                println!("{:#?}", built.value);
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_text(path: &Path, text: &str) -> anyhow::Result<()> {
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = text.len(), "wrote artifact");
    Ok(())
}

/// JSON, or YAML for `.yaml` / `.yml` files.
fn read_document(path: &Path) -> anyhow::Result<Value> {
    let source = read_text(path)?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext, "yaml" | "yml"));
    if is_yaml {
        serde_yaml::from_str(&source).with_context(|| format!("failed to parse YAML {}", path.display()))
    } else {
        serde_json::from_str(&source).with_context(|| format!("failed to parse JSON {}", path.display()))
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    out.sort();
    Ok(out)
}
