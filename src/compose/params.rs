//! Per-module parameter resolution.

use std::collections::BTreeMap;

use crate::compose::errors::SchemaError;
use crate::core::module::ModuleDescriptor;

/// A module's parameters for one workspace: declared defaults overlaid by
/// the workspace's overrides, each checked against its domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedParameters {
    values: BTreeMap<String, String>,
}

impl ResolvedParameters {
    /// Resolve `module`'s parameters with optional workspace overrides.
    pub fn resolve(
        module: &ModuleDescriptor,
        overrides: Option<&BTreeMap<String, String>>,
    ) -> Result<Self, SchemaError> {
        let mut values: BTreeMap<String, String> = module
            .parameters()
            .iter()
            .map(|(name, spec)| (name.clone(), spec.default.clone()))
            .collect();

        for (name, value) in overrides.into_iter().flatten() {
            let spec = module
                .parameter(name)
                .ok_or_else(|| SchemaError::UnknownParameter {
                    module: module.name().to_string(),
                    parameter: name.clone(),
                })?;

            if !spec.domain.accepts(value) {
                return Err(SchemaError::InvalidParameterValue {
                    module: module.name().to_string(),
                    parameter: name.clone(),
                    value: value.clone(),
                    expected: spec.domain.describe(),
                });
            }

            tracing::debug!("{}: {} = {} (override)", module.name(), name, value);
            values.insert(name.clone(), value.clone());
        }

        Ok(ResolvedParameters { values })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
