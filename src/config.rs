//! Generator configuration.
//!
//! Package names, the pattern table, file options and license text are
//! explicit values here, passed into the builder and both emitters.
use serde::{Deserialize, Serialize};

use crate::classify::Classifier;
use crate::error::ConfigError;
use crate::path_de;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Base name of the IDL artifact (`<name>.proto`).
    pub name: String,
    /// IDL package, e.g. `openapi.v2`.
    pub package: String,
    #[serde(default = "default_root_type")]
    pub root_type: String,
    /// Ordered pattern -> role table. Earlier entries win.
    pub patterns: Vec<PatternRole>,
    #[serde(default)]
    pub options: Vec<ProtoOption>,
    /// Header copied verbatim to the top of both artifacts.
    #[serde(default)]
    pub license: String,
    /// Path generated code uses to reach the runtime support module.
    #[serde(default = "default_runtime_crate")]
    pub runtime_crate: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternRole {
    pub pattern: String,
    pub role: String,
}

/// A file-level IDL option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtoOption {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub comment: String,
}

fn default_root_type() -> String {
    "Document".to_string()
}

fn default_runtime_crate() -> String {
    "schema_idl".to_string()
}

impl GeneratorConfig {
    /// Configuration for the OpenAPI 2.0 meta-schema.
    pub fn openapi_v2() -> Self {
        Self::openapi("OpenAPIv2", "openapi.v2", "vendorExtension")
    }

    /// Configuration for the OpenAPI 3.0 meta-schema.
    pub fn openapi_v3() -> Self {
        Self::openapi("OpenAPIv3", "openapi.v3", "specificationExtension")
    }

    fn openapi(name: &str, package: &str, extension_role: &str) -> Self {
        let patterns = [
            ("^x-", extension_role),
            ("^/", "path"),
            ("^([0-9]{3})$|^(default)$", "responseCode"),
        ]
        .into_iter()
        .map(|(pattern, role)| PatternRole { pattern: pattern.into(), role: role.into() })
        .collect();

        GeneratorConfig {
            name: name.to_string(),
            package: package.to_string(),
            root_type: default_root_type(),
            patterns,
            options: openapi_options(package),
            license: String::new(),
            runtime_crate: default_runtime_crate(),
        }
    }

    pub fn from_json_str(src: &str) -> Result<Self, ConfigError> {
        let config: Self = path_de::from_str_with_path(src)?;
        config.validate()?;
        Ok(config)
    }

    /// Rust module name for the generated compiler (`openapi.v2` -> `openapi_v2`).
    pub fn module_name(&self) -> String {
        self.package.replace(['.', '-'], "_")
    }

    pub fn classifier(&self) -> Result<Classifier, ConfigError> {
        for entry in &self.patterns {
            if let Err(source) = regex::Regex::new(&entry.pattern) {
                return Err(ConfigError::MalformedPattern { pattern: entry.pattern.clone(), source });
            }
        }
        Classifier::new(self.patterns.iter().map(|p| (p.pattern.as_str(), p.role.as_str())))
            .map_err(|source| ConfigError::Invalid(source.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.package.is_empty() {
            return Err(ConfigError::Invalid("`package` must not be empty".into()));
        }
        if crate::naming::type_name(&self.root_type).as_deref() != Some(self.root_type.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "`rootType` `{}` is not a PascalCase identifier",
                self.root_type
            )));
        }
        for (i, entry) in self.patterns.iter().enumerate() {
            if crate::naming::field_name(&entry.role).is_none() {
                return Err(ConfigError::Invalid(format!("role `{}` is not an identifier", entry.role)));
            }
            if self.patterns[..i].iter().any(|p| p.pattern == entry.pattern) {
                return Err(ConfigError::Invalid(format!("pattern `{}` is listed twice", entry.pattern)));
            }
        }
        self.classifier().map(|_| ())
    }
}

fn openapi_options(package: &str) -> Vec<ProtoOption> {
    let option = |name: &str, value: String, comment: &str| ProtoOption {
        name: name.to_string(),
        value,
        comment: comment.to_string(),
    };
    vec![
        option(
            "java_multiple_files",
            "true".into(),
            "This option lets the proto compiler generate Java code inside the package\n\
             name (see below) instead of inside an outer class. It creates a simpler\n\
             developer experience by reducing one-level of name nesting and be\n\
             consistent with most programming languages that don't support outer classes.",
        ),
        option(
            "java_outer_classname",
            "OpenAPIProto".into(),
            "The Java outer classname should be the filename in UpperCamelCase. This\n\
             class is only used to hold proto descriptor, so developers don't need to\n\
             work with it directly.",
        ),
        option(
            "java_package",
            format!("org.{package}"),
            "The Java package name must be proto package name with proper prefix.",
        ),
        option(
            "objc_class_prefix",
            "OAS".into(),
            "A reasonable prefix for the Objective-C symbols generated from the package.\n\
             It should at a minimum be 3 characters long, all uppercase, and convention\n\
             is to use an abbreviation of the package name. Something short, but\n\
             hopefully unique enough to not conflict with things that may come along in\n\
             the future. 'GPB' is reserved for the protocol buffer implementation itself.",
        ),
    ]
}
