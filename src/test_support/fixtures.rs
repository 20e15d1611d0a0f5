//! On-disk fixtures for catalogs and workspaces.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::registry::{BASE_DIR, BASE_TEMPLATE, MODULES_DIR, MODULE_SPEC_FILE, PACKAGE_TEMPLATE};
use crate::core::workspace::{LOCAL_MODULE_DIR, MANIFEST_FILE, SCRIPT_FILE, WORKSPACE_FILE};

/// Scaffold used by the `theia` base of the standard catalog.
pub const THEIA_SCAFFOLD: &str = r#"FROM theiaide/theia:{{ app.base_tag }}
LABEL org.opencontainers.image.title="{{ app.title }}"
{% for script in scripts %}
{{ script }}
{% endfor %}
"#;

/// A catalog directory described as relative path -> file content.
#[derive(Debug, Clone, Default)]
pub struct CatalogFixture {
    files: BTreeMap<PathBuf, String>,
}

impl CatalogFixture {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Two bases (`theia`, `theia-alpine`) and three modules:
    /// - `python`: parameters `pip` (bool) and `version` (enum), `theia` only
    /// - `go`: both bases, with a per-base manifest on `theia-alpine`
    /// - `git`: manifest only, `theia` only
    pub fn standard() -> Self {
        Self::new()
            .base_scaffold("theia", THEIA_SCAFFOLD)
            .base_manifest(
                "theia",
                r#"{ "dependencies": { "@theia/core": "latest", "@theia/editor": "latest" } }"#,
            )
            .base_scaffold(
                "theia-alpine",
                "FROM theiaide/theia:{{ app.base_tag }}-alpine\n{% for script in scripts %}\n{{ script }}\n{% endfor %}\n",
            )
            .module_spec(
                "python",
                r#"
description: Python language support
parameters:
  pip:
    type: bool
    default: true
  version:
    type: enum
    values: ["3.8", "3.9"]
    default: "3.9"
"#,
            )
            .module_manifest(
                "python",
                r#"{
  "dependencies": { "@theia/python": "latest" },
  "theiaPlugins": { "vscode-python": "https://plugins.example.com/python.vsix" }
}"#,
            )
            .module_script(
                "python",
                "theia",
                "RUN apt-get install -y python{{ version }}\nENV PYTHON_PIP={{ pip }}\n",
            )
            .module_manifest("go", r#"{ "dependencies": { "@theia/go": "latest" } }"#)
            .module_script("go", "theia", "RUN install-go\n")
            .module_script("go", "theia-alpine", "RUN apk add go\n")
            .file(
                format!("{}/go/theia-alpine/{}", MODULES_DIR, MANIFEST_FILE),
                r#"{ "dependencies": { "@theia/go": "alpine" } }"#,
            )
            .module_manifest(
                "git",
                r#"{ "theiaPlugins": { "vscode-git": "https://plugins.example.com/git.vsix" } }"#,
            )
            .dir(format!("{}/git/theia", MODULES_DIR))
    }

    /// Add a file at a catalog-relative path.
    pub fn file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Add an empty directory.
    pub fn dir(self, path: impl AsRef<Path>) -> Self {
        self.file(path.as_ref().join(".keep"), "")
    }

    pub fn base_scaffold(self, base: &str, text: &str) -> Self {
        self.file(format!("{}/{}/{}", BASE_DIR, base, BASE_TEMPLATE), text)
    }

    pub fn base_manifest(self, base: &str, json: &str) -> Self {
        self.file(format!("{}/{}/{}", BASE_DIR, base, MANIFEST_FILE), json)
    }

    pub fn base_package_template(self, base: &str, text: &str) -> Self {
        self.file(format!("{}/{}/{}", BASE_DIR, base, PACKAGE_TEMPLATE), text)
    }

    pub fn module_spec(self, module: &str, yaml: &str) -> Self {
        self.file(format!("{}/{}/{}", MODULES_DIR, module, MODULE_SPEC_FILE), yaml)
    }

    pub fn module_manifest(self, module: &str, json: &str) -> Self {
        self.file(format!("{}/{}/{}", MODULES_DIR, module, MANIFEST_FILE), json)
    }

    pub fn module_script(self, module: &str, base: &str, text: &str) -> Self {
        self.file(
            format!("{}/{}/{}/{}", MODULES_DIR, module, base, SCRIPT_FILE),
            text,
        )
    }

    /// Write the catalog under `root`.
    pub fn write(&self, root: &Path) -> std::io::Result<()> {
        write_files(root, &self.files)
    }
}

/// A workspace directory: `application.yaml` plus optional local module.
#[derive(Debug, Clone)]
pub struct WorkspaceFixture {
    name: String,
    files: BTreeMap<PathBuf, String>,
}

impl WorkspaceFixture {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        let mut files = BTreeMap::new();
        files.insert(PathBuf::from(WORKSPACE_FILE), definition.into());
        WorkspaceFixture {
            name: name.into(),
            files,
        }
    }

    /// A workspace on base `theia` selecting `modules`.
    pub fn with_modules(name: &str, modules: &[&str]) -> Self {
        Self::new(name, definition_yaml(name, "theia", modules))
    }

    pub fn local_script(mut self, text: &str) -> Self {
        self.files.insert(
            Path::new(LOCAL_MODULE_DIR).join(SCRIPT_FILE),
            text.to_string(),
        );
        self
    }

    pub fn local_manifest(mut self, json: &str) -> Self {
        self.files.insert(
            Path::new(LOCAL_MODULE_DIR).join(MANIFEST_FILE),
            json.to_string(),
        );
        self
    }

    /// Write the workspace as `parent/<name>` and return its path.
    pub fn write(&self, parent: &Path) -> std::io::Result<PathBuf> {
        let root = parent.join(&self.name);
        write_files(&root, &self.files)?;
        Ok(root)
    }
}

/// A minimal `application.yaml`.
pub fn definition_yaml(name: &str, base: &str, modules: &[&str]) -> String {
    let mut yaml = format!(
        "app:\n  name: {name}\n  version: 1.0.0\n  org: acme\n  license: MIT\n  title: {name} IDE\n  base: {base}\n"
    );
    if !modules.is_empty() {
        yaml.push_str("modules:\n");
        for module in modules {
            yaml.push_str(&format!("  - {}\n", module));
        }
    }
    yaml
}

fn write_files(root: &Path, files: &BTreeMap<PathBuf, String>) -> std::io::Result<()> {
    std::fs::create_dir_all(root)?;
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(full, content)?;
    }
    Ok(())
}
