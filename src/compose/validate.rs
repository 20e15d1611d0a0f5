//! Catalog-dependent validation of a workspace definition.
//!
//! Structural checks run when `application.yaml` is parsed. The checks here
//! need the registry: the base must exist, every selected module must exist
//! and support that base, and every parameter override must name a declared
//! parameter with a value inside its domain. Overrides are checked even for
//! modules that are not selected. All of them complete before any template
//! is rendered.

use crate::compose::errors::SchemaError;
use crate::compose::params::ResolvedParameters;
use crate::core::module::{BaseDescriptor, ModuleDescriptor, ModuleVariant};
use crate::core::registry::ModuleRegistry;
use crate::core::workspace::WorkspaceDefinition;

/// A selected module ready to render.
#[derive(Debug, Clone)]
pub struct PlannedModule<'r> {
    pub descriptor: &'r ModuleDescriptor,
    pub variant: &'r ModuleVariant,
    pub parameters: ResolvedParameters,
}

impl PlannedModule<'_> {
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }
}

/// The validated inputs of one composition.
#[derive(Debug, Clone)]
pub struct CompositionPlan<'r> {
    pub base: &'r BaseDescriptor,

    /// Selected modules in list order
    pub modules: Vec<PlannedModule<'r>>,
}

/// Validate `definition` against `registry`.
pub fn check<'r>(
    definition: &WorkspaceDefinition,
    registry: &'r ModuleRegistry,
) -> Result<CompositionPlan<'r>, SchemaError> {
    let base_name = definition.app.base.as_str();
    let base = registry
        .base(base_name)
        .ok_or_else(|| SchemaError::UnknownBase {
            base: base_name.to_string(),
            available: registry.base_names(),
        })?;

    for (module, overrides) in &definition.parameters {
        let descriptor = registry
            .lookup(module)
            .ok_or_else(|| SchemaError::UnknownModule {
                module: module.clone(),
            })?;
        ResolvedParameters::resolve(descriptor, Some(overrides))?;

        if !definition.modules.contains(module) {
            tracing::warn!(
                "parameters given for module `{}`, which is not selected; ignoring",
                module
            );
        }
    }

    let mut modules = Vec::with_capacity(definition.modules.len());
    for name in &definition.modules {
        let descriptor = registry
            .lookup(name)
            .ok_or_else(|| SchemaError::UnknownModule {
                module: name.clone(),
            })?;

        let variant = descriptor
            .variant(base_name)
            .ok_or_else(|| SchemaError::UnsupportedBase {
                module: name.clone(),
                base: base_name.to_string(),
            })?;

        let parameters = ResolvedParameters::resolve(descriptor, definition.overrides(name))?;

        modules.push(PlannedModule {
            descriptor,
            variant,
            parameters,
        });
    }

    tracing::debug!(
        "validated `{}`: base `{}`, {} module(s)",
        definition.app.name,
        base_name,
        modules.len()
    );

    Ok(CompositionPlan { base, modules })
}
