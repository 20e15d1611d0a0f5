//! Composition engine.
//!
//! Composes one workspace against the registry: validates the definition,
//! renders each selected module's fragment, injects the fragments into the
//! base scaffold and merges the manifests. A base that ships a
//! `package.json` template also gets that template rendered against the
//! merged manifest. The engine does no I/O; callers load the registry and
//! write the artifacts.

use rayon::prelude::*;

use crate::compose::errors::ComposeError;
use crate::compose::merge::{self, ManifestConflict, ManifestLayer, LOCAL_LAYER};
use crate::compose::template::{Bindings, Value};
use crate::compose::validate::{self, CompositionPlan, PlannedModule};
use crate::core::manifest::{ManifestSection, MergedManifest};
use crate::core::module::INJECTION_POINT;
use crate::core::registry::ModuleRegistry;
use crate::core::workspace::{AppMetadata, BuildMetadata, Workspace};

/// Artifacts of one composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionResult {
    /// The composed build script
    pub script: String,

    /// The merged manifest sections
    pub manifest: MergedManifest,

    /// Conflicts found while merging, in precedence order
    pub conflicts: Vec<ManifestConflict>,

    /// `package.json` rendered from the base's template, if it has one
    pub package_json: Option<String>,
}

/// Composes workspaces against a registry.
#[derive(Debug, Clone, Copy)]
pub struct Composer<'r> {
    registry: &'r ModuleRegistry,
}

impl<'r> Composer<'r> {
    pub fn new(registry: &'r ModuleRegistry) -> Self {
        Composer { registry }
    }

    /// Compose `workspace` into a script and a manifest.
    ///
    /// All validation happens before any template is rendered, and any
    /// error aborts the whole composition.
    pub fn compose(&self, workspace: &Workspace) -> Result<CompositionResult, ComposeError> {
        let definition = workspace.definition();
        let plan = validate::check(definition, self.registry)?;

        let app = app_binding(&definition.app);

        // Rendered in parallel, collected back in list order.
        let mut fragments: Vec<String> = plan
            .modules
            .par_iter()
            .map(|module| render_module(module, &app))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect();

        if let Some(script) = workspace.local_module().and_then(|l| l.script.as_ref()) {
            let bindings = Bindings::new().with("app", app.clone());
            fragments.push(script.render(&bindings)?.trim().to_string());
            tracing::debug!("rendered workspace-local module");
        }

        let bindings = Bindings::new()
            .with("app", app.clone())
            .with("build", build_binding(&definition.build))
            .with(INJECTION_POINT, Value::scalars(fragments));
        let script = plan.base.script().render(&bindings)?;

        let (manifest, conflicts) = merge_manifests(&plan, workspace);
        for conflict in &conflicts {
            tracing::warn!("{}", conflict);
        }

        let package_json = match plan.base.package_template() {
            Some(template) => {
                let bindings = Bindings::new()
                    .with("app", app)
                    .with("package", package_binding(&manifest));
                tracing::debug!("rendering package.json from base `{}`", plan.base.name());
                Some(template.render(&bindings)?)
            }
            None => None,
        };

        Ok(CompositionResult {
            script,
            manifest,
            conflicts,
            package_json,
        })
    }
}

fn render_module(module: &PlannedModule<'_>, app: &Value) -> Result<Option<String>, ComposeError> {
    let Some(template) = &module.variant.script else {
        tracing::debug!("module `{}` has no script for this base", module.name());
        return Ok(None);
    };

    let mut bindings = Bindings::new().with("app", app.clone());
    for (name, value) in module.parameters.iter() {
        bindings.insert(name, value);
    }

    let fragment = template.render(&bindings)?;
    tracing::debug!("rendered module `{}`", module.name());
    Ok(Some(fragment.trim().to_string()))
}

fn merge_manifests(
    plan: &CompositionPlan<'_>,
    workspace: &Workspace,
) -> (MergedManifest, Vec<ManifestConflict>) {
    let base_layer = format!("base `{}`", plan.base.name());
    let module_layers: Vec<String> = plan
        .modules
        .iter()
        .map(|m| format!("module `{}`", m.name()))
        .collect();

    let mut layers = Vec::with_capacity(plan.modules.len() + 2);
    layers.push(ManifestLayer::new(&base_layer, plan.base.manifest()));
    for (name, module) in module_layers.iter().zip(&plan.modules) {
        layers.push(ManifestLayer::new(name, &module.variant.manifest));
    }
    if let Some(manifest) = workspace.local_module().and_then(|l| l.manifest.as_ref()) {
        layers.push(ManifestLayer::new(LOCAL_LAYER, manifest));
    }

    merge::merge(&layers)
}

/// `app.*` bindings.
pub fn app_binding(app: &AppMetadata) -> Value {
    Value::scalar_map([
        ("name", app.name.as_str()),
        ("version", app.version.as_str()),
        ("org", app.org.as_str()),
        ("license", app.license.as_str()),
        ("title", app.title.as_str()),
        ("base", app.base.as_str()),
        ("base_tag", app.base_tag.as_str()),
        ("dep_version", app.dep_version.as_str()),
    ])
}

/// `build.*` bindings.
///
/// `build.registry` is empty when unset. `build.arguments` is a sequence of
/// `{name, value}` maps in key order.
pub fn build_binding(build: &BuildMetadata) -> Value {
    let arguments = build
        .arguments
        .iter()
        .map(|(name, value)| Value::scalar_map([("name", name.as_str()), ("value", value.as_str())]))
        .collect();

    Value::Map(
        [
            (
                "registry".to_string(),
                Value::from(build.registry.clone().unwrap_or_default()),
            ),
            ("arguments".to_string(), Value::Sequence(arguments)),
        ]
        .into_iter()
        .collect(),
    )
}

/// `package.*` bindings for a base's `package.json` template.
///
/// `package.dependencies` and `package.theiaPlugins` are sequences of
/// `{name, value, sep}` maps in key order. `name` and `value` are escaped for
/// use inside a JSON string; `sep` is `,` on every entry except the last.
pub fn package_binding(manifest: &MergedManifest) -> Value {
    let section = |section: ManifestSection| {
        let entries = manifest.section(section);
        let last = entries.len().saturating_sub(1);
        let items = entries
            .iter()
            .enumerate()
            .map(|(i, (name, value))| {
                let sep = if i == last { "" } else { "," };
                Value::scalar_map([
                    ("name", json_escape(name).as_str()),
                    ("value", json_escape(value).as_str()),
                    ("sep", sep),
                ])
            })
            .collect();
        (section.to_string(), Value::Sequence(items))
    };

    Value::Map(ManifestSection::ALL.into_iter().map(section).collect())
}

/// Escape `s` for the inside of a JSON string literal.
fn json_escape(s: &str) -> String {
    let quoted = serde_json::Value::from(s).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
