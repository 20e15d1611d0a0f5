//! Module and base descriptors.
//!
//! Descriptors are plain data: a module is a name, a parameter schema and one
//! variant per supported base; a base is a scaffold template with a single
//! injection point plus its own manifest fragment. They are built while the
//! catalog is loaded and never change afterwards.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::compose::errors::{SchemaError, TemplateError};
use crate::compose::template::Template;
use crate::core::manifest::ManifestFragment;

/// Binding name the base template iterates to splice in module fragments.
pub const INJECTION_POINT: &str = "scripts";

/// Binding names owned by the composer; modules may not declare them as parameters.
pub const RESERVED_BINDINGS: [&str; 3] = ["app", "build", INJECTION_POINT];

/// Literal tokens accepted by boolean parameters.
pub const BOOL_TOKENS: [&str; 2] = ["true", "false"];

/// The domain of values a parameter accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamDomain {
    Bool,
    String,
    Integer,
    Enum(Vec<String>),
}

impl ParamDomain {
    /// Check a candidate value.
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            ParamDomain::Bool => BOOL_TOKENS.contains(&value),
            ParamDomain::String => !value.trim().is_empty(),
            ParamDomain::Integer => value.parse::<i64>().is_ok(),
            ParamDomain::Enum(values) => values.iter().any(|v| v == value),
        }
    }

    /// Human readable description for error messages.
    pub fn describe(&self) -> String {
        match self {
            ParamDomain::Bool => format!("one of `{}`, `{}`", BOOL_TOKENS[0], BOOL_TOKENS[1]),
            ParamDomain::String => "a non-empty string".to_string(),
            ParamDomain::Integer => "an integer".to_string(),
            ParamDomain::Enum(values) => {
                let quoted: Vec<String> = values.iter().map(|v| format!("`{}`", v)).collect();
                format!("one of {}", quoted.join(", "))
            }
        }
    }
}

impl fmt::Display for ParamDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamDomain::Bool => f.write_str("bool"),
            ParamDomain::String => f.write_str("string"),
            ParamDomain::Integer => f.write_str("integer"),
            ParamDomain::Enum(values) => write!(f, "enum[{}]", values.join("|")),
        }
    }
}

/// A declared module parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub domain: ParamDomain,
    pub default: String,
}

impl ParamSpec {
    pub fn new(domain: ParamDomain, default: impl Into<String>) -> Self {
        ParamSpec {
            domain,
            default: default.into(),
        }
    }

    pub fn boolean(default: bool) -> Self {
        Self::new(ParamDomain::Bool, default.to_string())
    }
}

/// What a module provides for one base.
#[derive(Debug, Clone, Default)]
pub struct ModuleVariant {
    /// Script fragment template; a module may contribute only a manifest.
    pub script: Option<Template>,
    pub manifest: ManifestFragment,
}

impl ModuleVariant {
    /// Build a variant, parsing its script template.
    pub fn new(
        module: &str,
        base: &str,
        script: Option<&str>,
        manifest: ManifestFragment,
    ) -> Result<Self, TemplateError> {
        let script = script
            .map(|text| Template::parse(module_origin(module, base), text))
            .transpose()?;
        Ok(ModuleVariant { script, manifest })
    }
}

/// Name of a module template in error messages.
pub fn module_origin(module: &str, base: &str) -> String {
    format!("module `{}` (base `{}`)", module, base)
}

/// A catalog module.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    name: String,
    description: Option<String>,
    parameters: BTreeMap<String, ParamSpec>,
    variants: BTreeMap<String, ModuleVariant>,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleDescriptor {
            name: name.into(),
            description: None,
            parameters: BTreeMap::new(),
            variants: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a parameter. The default must satisfy the domain.
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        spec: ParamSpec,
    ) -> Result<Self, SchemaError> {
        let name = name.into();

        if RESERVED_BINDINGS.contains(&name.as_str()) {
            return Err(SchemaError::ReservedParameter {
                module: self.name.clone(),
                parameter: name,
            });
        }

        if !spec.domain.accepts(&spec.default) {
            return Err(SchemaError::InvalidParameterValue {
                module: self.name.clone(),
                parameter: name,
                value: spec.default,
                expected: spec.domain.describe(),
            });
        }

        self.parameters.insert(name, spec);
        Ok(self)
    }

    pub fn with_variant(mut self, base: impl Into<String>, variant: ModuleVariant) -> Self {
        self.variants.insert(base.into(), variant);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parameters(&self) -> &BTreeMap<String, ParamSpec> {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.get(name)
    }

    pub fn supports(&self, base: &str) -> bool {
        self.variants.contains_key(base)
    }

    pub fn variant(&self, base: &str) -> Option<&ModuleVariant> {
        self.variants.get(base)
    }

    /// Names of the bases this module supports.
    pub fn supported_bases(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(String::as_str)
    }
}

/// A base system scaffold.
#[derive(Debug, Clone)]
pub struct BaseDescriptor {
    name: String,
    script: Template,
    manifest: ManifestFragment,
    package: Option<Template>,
}

impl BaseDescriptor {
    /// Build a base, checking the scaffold references the injection point exactly once.
    pub fn new(
        name: impl Into<String>,
        script: &str,
        manifest: ManifestFragment,
    ) -> Result<Self, TemplateError> {
        let name = name.into();
        let script = Template::parse(format!("base `{}`", name), script)?;

        let found = script.reference_count(INJECTION_POINT);
        if found != 1 {
            return Err(TemplateError::InjectionPoint {
                origin: script.origin().to_string(),
                name: INJECTION_POINT.to_string(),
                found,
            });
        }

        Ok(BaseDescriptor {
            name,
            script,
            manifest,
            package: None,
        })
    }

    /// Render `package.json` from `text` instead of the built-in layout.
    pub fn with_package_template(mut self, text: &str) -> Result<Self, TemplateError> {
        let origin = format!("base `{}` package.json", self.name);
        self.package = Some(Template::parse(origin, text)?);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn script(&self) -> &Template {
        &self.script
    }

    pub fn manifest(&self) -> &ManifestFragment {
        &self.manifest
    }

    pub fn package_template(&self) -> Option<&Template> {
        self.package.as_ref()
    }
}

/// The workspace-local module: highest precedence, no parameters.
#[derive(Debug, Clone, Default)]
pub struct LocalModule {
    pub script: Option<Template>,
    pub manifest: Option<ManifestFragment>,
}

impl LocalModule {
    pub const ORIGIN: &'static str = "workspace-local module";

    pub fn new(
        script: Option<&str>,
        manifest: Option<ManifestFragment>,
    ) -> Result<Self, TemplateError> {
        let script = script
            .map(|text| Template::parse(Self::ORIGIN, text))
            .transpose()?;
        Ok(LocalModule { script, manifest })
    }
}

/// `module.yaml` as written in the catalog.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleSpecFile {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub parameters: BTreeMap<String, RawParamSpec>,
}

/// One parameter entry of `module.yaml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawParamSpec {
    #[serde(rename = "type")]
    pub kind: RawParamKind,

    #[serde(default)]
    pub values: Vec<serde_yaml::Value>,

    pub default: serde_yaml::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawParamKind {
    Bool,
    String,
    Integer,
    Enum,
}

impl ModuleSpecFile {
    /// Apply the declared description and parameters to a descriptor.
    pub fn apply(self, mut module: ModuleDescriptor) -> Result<ModuleDescriptor, SchemaError> {
        if let Some(description) = self.description {
            module = module.with_description(description);
        }

        for (name, raw) in self.parameters {
            let invalid = |what: &serde_yaml::Value, expected: &str| {
                SchemaError::InvalidParameterValue {
                    module: module.name().to_string(),
                    parameter: name.clone(),
                    value: format!("{:?}", what),
                    expected: expected.to_string(),
                }
            };

            let domain = match raw.kind {
                RawParamKind::Bool => ParamDomain::Bool,
                RawParamKind::String => ParamDomain::String,
                RawParamKind::Integer => ParamDomain::Integer,
                RawParamKind::Enum => {
                    let mut values = Vec::with_capacity(raw.values.len());
                    for v in &raw.values {
                        values.push(yaml_scalar(v).ok_or_else(|| invalid(v, "a string, bool or integer (quote decimal values)"))?);
                    }
                    if values.is_empty() {
                        return Err(SchemaError::InvalidField {
                            field: format!("{}.parameters.{}.values", module.name(), name),
                            reason: "an enum parameter needs at least one value".to_string(),
                        });
                    }
                    ParamDomain::Enum(values)
                }
            };

            let default =
                yaml_scalar(&raw.default).ok_or_else(|| invalid(&raw.default, "a string, bool or integer (quote decimal values)"))?;
            module = module.with_parameter(name.clone(), ParamSpec::new(domain, default))?;
        }

        Ok(module)
    }
}

/// Render a YAML scalar as the string a template would see.
///
/// Returns `None` for null, sequences, mappings and non-integer numbers.
/// YAML reads `3.10` as a float whose text comes back as `3.1`, so such
/// values have to be quoted.
pub fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}
