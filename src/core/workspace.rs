//! Workspace definition (`application.yaml`) and the workspace directory.
//!
//! A workspace is a directory containing `application.yaml`, optionally a
//! workspace-local module under `module/`, and after `prepare` the generated
//! `Dockerfile` and `package.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::compose::errors::SchemaError;
use crate::core::manifest::ManifestFragment;
use crate::core::module::{yaml_scalar, LocalModule};

/// Name of the workspace definition file.
pub const WORKSPACE_FILE: &str = "application.yaml";

/// Directory holding the workspace-local module.
pub const LOCAL_MODULE_DIR: &str = "module";

/// File name of build scripts, both in the catalog and as output.
pub const SCRIPT_FILE: &str = "Dockerfile";

/// File name of manifests, both in the catalog and as output.
pub const MANIFEST_FILE: &str = "package.json";

/// Default for `app.base_tag` and `app.dep_version`.
pub const DEFAULT_TAG: &str = "latest";

/// Identity of the application, from the `app` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMetadata {
    pub name: String,
    pub version: String,
    pub org: String,
    pub license: String,
    pub title: String,
    pub base: String,
    pub base_tag: String,
    pub dep_version: String,
}

/// Image build settings, from the `build` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildMetadata {
    /// Registry to additionally tag the image for
    pub registry: Option<String>,

    /// `--build-arg` values
    pub arguments: BTreeMap<String, String>,
}

/// A validated `application.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceDefinition {
    pub app: AppMetadata,

    /// Module name -> parameter overrides
    pub parameters: BTreeMap<String, BTreeMap<String, String>>,

    pub build: BuildMetadata,

    /// Selected modules, in precedence order
    pub modules: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWorkspace {
    app: Option<RawApp>,
    #[serde(default)]
    parameters: Option<BTreeMap<String, Option<BTreeMap<String, serde_yaml::Value>>>>,
    #[serde(default)]
    build: Option<RawBuild>,
    #[serde(default)]
    modules: Option<Vec<serde_yaml::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawApp {
    name: Option<serde_yaml::Value>,
    version: Option<serde_yaml::Value>,
    org: Option<serde_yaml::Value>,
    license: Option<serde_yaml::Value>,
    title: Option<serde_yaml::Value>,
    base: Option<serde_yaml::Value>,
    base_tag: Option<serde_yaml::Value>,
    dep_version: Option<serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuild {
    registry: Option<serde_yaml::Value>,
    arguments: Option<BTreeMap<String, serde_yaml::Value>>,
}

/// Read a string field; `None` when absent or null.
///
/// Unquoted numbers are refused: YAML would turn `version: 1.10` into `1.1`.
fn optional(field: &str, value: Option<&serde_yaml::Value>) -> Result<Option<String>, SchemaError> {
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::Number(n)) => Err(SchemaError::InvalidField {
            field: field.to_string(),
            reason: format!("expected a string, found the number {}; quote the value", n),
        }),
        Some(v) => {
            let s = yaml_scalar(v).ok_or_else(|| SchemaError::InvalidField {
                field: field.to_string(),
                reason: "expected a string".to_string(),
            })?;
            if s.trim().is_empty() {
                return Err(SchemaError::InvalidField {
                    field: field.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
            Ok(Some(s))
        }
    }
}

fn required(field: &str, value: Option<&serde_yaml::Value>) -> Result<String, SchemaError> {
    optional(field, value)?.ok_or_else(|| SchemaError::MissingField {
        field: field.to_string(),
    })
}

/// Derive an application name from its title: lower-cased, words joined by `-`.
pub fn derive_name(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

impl WorkspaceDefinition {
    /// Load and validate a workspace definition file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read workspace definition: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("invalid {}", path.display()))
    }

    /// Parse and structurally validate `application.yaml` content.
    ///
    /// Catalog-dependent checks (known base, known modules, parameter
    /// domains) happen later against a registry.
    pub fn parse(content: &str) -> Result<Self, SchemaError> {
        let raw: RawWorkspace =
            serde_yaml::from_str(content).map_err(|e| SchemaError::Malformed {
                message: e.to_string(),
            })?;

        let raw_app = raw.app.ok_or_else(|| SchemaError::MissingField {
            field: "app".to_string(),
        })?;

        let title = required("app.title", raw_app.title.as_ref())?;
        let name = match optional("app.name", raw_app.name.as_ref())? {
            Some(name) => name,
            None => derive_name(&title),
        };

        let app = AppMetadata {
            name,
            version: required("app.version", raw_app.version.as_ref())?,
            org: required("app.org", raw_app.org.as_ref())?,
            license: required("app.license", raw_app.license.as_ref())?,
            base: required("app.base", raw_app.base.as_ref())?,
            base_tag: optional("app.base_tag", raw_app.base_tag.as_ref())?
                .unwrap_or_else(|| DEFAULT_TAG.to_string()),
            dep_version: optional("app.dep_version", raw_app.dep_version.as_ref())?
                .unwrap_or_else(|| DEFAULT_TAG.to_string()),
            title,
        };

        let mut parameters = BTreeMap::new();
        for (module, overrides) in raw.parameters.unwrap_or_default() {
            let mut values = BTreeMap::new();
            for (key, value) in overrides.unwrap_or_default() {
                let s = yaml_scalar(&value).ok_or_else(|| SchemaError::InvalidParameterValue {
                    module: module.clone(),
                    parameter: key.clone(),
                    value: format!("{:?}", value),
                    expected: "a string, bool or integer (quote decimal values)".to_string(),
                })?;
                values.insert(key, s);
            }
            parameters.insert(module, values);
        }

        let build = match raw.build {
            Some(raw_build) => {
                let mut arguments = BTreeMap::new();
                for (key, value) in raw_build.arguments.unwrap_or_default() {
                    let field = format!("build.arguments.{}", key);
                    let s = yaml_scalar(&value).ok_or_else(|| SchemaError::InvalidField {
                        field,
                        reason: "expected a string, bool or integer; quote decimal values"
                            .to_string(),
                    })?;
                    arguments.insert(key, s);
                }
                BuildMetadata {
                    registry: optional("build.registry", raw_build.registry.as_ref())?,
                    arguments,
                }
            }
            None => BuildMetadata::default(),
        };

        let mut modules: Vec<String> = Vec::new();
        for (i, entry) in raw.modules.unwrap_or_default().iter().enumerate() {
            let module = required(&format!("modules[{}]", i), Some(entry))?;
            if modules.contains(&module) {
                return Err(SchemaError::DuplicateModule { module });
            }
            modules.push(module);
        }

        Ok(WorkspaceDefinition {
            app,
            parameters,
            build,
            modules,
        })
    }

    /// Parameter overrides for one module.
    pub fn overrides(&self, module: &str) -> Option<&BTreeMap<String, String>> {
        self.parameters.get(module)
    }

    /// Image repository, `<org>/<name>`.
    pub fn image_repository(&self) -> String {
        format!("{}/{}", self.app.org, self.app.name)
    }
}

/// A workspace directory with its loaded definition.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    definition: WorkspaceDefinition,
    local_module: Option<LocalModule>,
}

impl Workspace {
    /// Load the workspace in `root`, including its local module if present.
    pub fn load(root: &Path) -> Result<Self> {
        let definition = WorkspaceDefinition::load(&root.join(WORKSPACE_FILE))?;
        let local_module = load_local_module(&root.join(LOCAL_MODULE_DIR))?;

        Ok(Workspace {
            root: root.to_path_buf(),
            definition,
            local_module,
        })
    }

    /// Create a workspace from an already parsed definition.
    pub fn from_definition(root: impl Into<PathBuf>, definition: WorkspaceDefinition) -> Self {
        Workspace {
            root: root.into(),
            definition,
            local_module: None,
        }
    }

    /// Attach a workspace-local module.
    pub fn with_local_module(mut self, local_module: LocalModule) -> Self {
        self.local_module = Some(local_module);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn definition(&self) -> &WorkspaceDefinition {
        &self.definition
    }

    pub fn local_module(&self) -> Option<&LocalModule> {
        self.local_module.as_ref()
    }

    /// Path of the generated build script.
    pub fn script_path(&self) -> PathBuf {
        self.root.join(SCRIPT_FILE)
    }

    /// Path of the generated manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Project-level tool directory.
    pub fn tool_dir(&self) -> PathBuf {
        self.root.join(".theia-builder")
    }

    /// Default catalog location: the workspace's parent directory.
    pub fn default_module_dir(&self) -> PathBuf {
        let root = crate::util::fs::normalize_path(&self.root);
        root.parent().map(Path::to_path_buf).unwrap_or(root)
    }
}

/// Read `module/Dockerfile` and `module/package.json`, if any.
fn load_local_module(dir: &Path) -> Result<Option<LocalModule>> {
    let script_path = dir.join(SCRIPT_FILE);
    let manifest_path = dir.join(MANIFEST_FILE);

    let script = if script_path.is_file() {
        Some(crate::util::fs::read_to_string(&script_path)?)
    } else {
        None
    };
    let manifest = if manifest_path.is_file() {
        Some(ManifestFragment::load(&manifest_path)?)
    } else {
        None
    };

    if script.is_none() && manifest.is_none() {
        return Ok(None);
    }

    tracing::debug!("using workspace-local module at {}", dir.display());
    let local = LocalModule::new(script.as_deref(), manifest)
        .with_context(|| format!("invalid template: {}", script_path.display()))?;
    Ok(Some(local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL: &str = r#"
app:
  name: python-ws
  version: 1.0.0
  org: acme
  license: Apache-2.0
  title: Python Workspace
  base: theia
  base_tag: next
parameters:
  python:
    pip: false
  go: ~
build:
  registry: registry.example.com
  arguments:
    HTTP_PROXY: http://proxy:3128
    UID: 1000
modules:
  - python
  - go
"#;

    #[test]
    fn test_parse_full_definition() {
        let def = WorkspaceDefinition::parse(FULL).unwrap();

        assert_eq!(def.app.name, "python-ws");
        assert_eq!(def.app.version, "1.0.0");
        assert_eq!(def.app.base_tag, "next");
        assert_eq!(def.app.dep_version, DEFAULT_TAG);
        assert_eq!(def.modules, vec!["python", "go"]);
        assert_eq!(def.overrides("python").unwrap()["pip"], "false");
        assert!(def.overrides("go").unwrap().is_empty());
        assert_eq!(def.build.registry.as_deref(), Some("registry.example.com"));
        assert_eq!(def.build.arguments["UID"], "1000");
        assert_eq!(def.image_repository(), "acme/python-ws");
    }

    #[test]
    fn test_name_derived_from_title() {
        let def = WorkspaceDefinition::parse(
            "app: { version: '1', org: o, license: MIT, title: 'My  Great IDE', base: theia }",
        )
        .unwrap();
        assert_eq!(def.app.name, "my-great-ide");
        assert!(def.modules.is_empty());
    }

    #[test]
    fn test_missing_field_is_named() {
        let err = WorkspaceDefinition::parse(
            "app: { name: x, org: o, license: MIT, title: X, base: theia }",
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                field: "app.version".to_string()
            }
        );
    }

    #[test]
    fn test_empty_field_is_invalid() {
        let err = WorkspaceDefinition::parse(
            "app: { name: x, version: '', org: o, license: MIT, title: X, base: theia }",
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { ref field, .. } if field == "app.version"));
    }

    #[test]
    fn test_unquoted_number_in_app_is_invalid() {
        let err = WorkspaceDefinition::parse(
            "app: { name: x, version: 1.10, org: o, license: MIT, title: X, base: theia }",
        )
        .unwrap_err();
        match err {
            SchemaError::InvalidField { field, reason } => {
                assert_eq!(field, "app.version");
                assert!(reason.contains("quote the value"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let def = WorkspaceDefinition::parse(
            "app: { name: x, version: '1.10', org: o, license: MIT, title: X, base: theia }",
        )
        .unwrap();
        assert_eq!(def.app.version, "1.10");
    }

    #[test]
    fn test_decimal_override_must_be_quoted() {
        let err = WorkspaceDefinition::parse(
            "app: { name: x, version: '1', org: o, license: MIT, title: X, base: theia }\nparameters: { python: { version: 3.10 } }",
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidParameterValue { ref parameter, .. } if parameter == "version"));

        let def = WorkspaceDefinition::parse(
            "app: { name: x, version: '1', org: o, license: MIT, title: X, base: theia }\nbuild: { arguments: { UID: 1000 } }",
        )
        .unwrap();
        assert_eq!(def.build.arguments["UID"], "1000");
    }

    #[test]
    fn test_unknown_key_is_malformed() {
        let err = WorkspaceDefinition::parse(
            "app: { name: x, version: '1', org: o, license: MIT, title: X, base: theia, colour: red }",
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { .. }));
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let err = WorkspaceDefinition::parse(
            "app: { name: x, version: '1', org: o, license: MIT, title: X, base: theia }\nmodules: [go, python, go]",
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateModule {
                module: "go".to_string()
            }
        );
    }

    #[test]
    fn test_non_scalar_override_rejected() {
        let err = WorkspaceDefinition::parse(
            "app: { name: x, version: '1', org: o, license: MIT, title: X, base: theia }\nparameters: { go: { tools: [a, b] } }",
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidParameterValue { .. }));
    }

    #[test]
    fn test_workspace_load_with_local_module() {
        let tmp = TempDir::new().unwrap();
        let app_dir = tmp.path().join("app");
        std::fs::create_dir_all(app_dir.join(LOCAL_MODULE_DIR)).unwrap();
        std::fs::write(app_dir.join(WORKSPACE_FILE), FULL).unwrap();
        std::fs::write(
            app_dir.join(LOCAL_MODULE_DIR).join(SCRIPT_FILE),
            "RUN echo {{ app.name }}",
        )
        .unwrap();

        let ws = Workspace::load(&app_dir).unwrap();
        let local = ws.local_module().unwrap();
        assert!(local.script.is_some());
        assert!(local.manifest.is_none());
        assert!(ws.script_path().ends_with(SCRIPT_FILE));
        assert_eq!(
            ws.default_module_dir(),
            crate::util::fs::normalize_path(tmp.path())
        );
    }

    #[test]
    fn test_workspace_load_reports_path() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(WORKSPACE_FILE), "app: {}").unwrap();

        let err = format!("{:#}", Workspace::load(tmp.path()).unwrap_err());
        assert!(err.contains(WORKSPACE_FILE));
        assert!(err.contains("app.title"));
    }
}
