//! Layered manifest merging with conflict detection.
//!
//! Layers are applied lowest precedence first: base, selected modules in
//! list order, then the workspace-local module. A later layer always wins.
//! Every overwrite that changes a value is recorded as a conflict, including
//! overwrites of the base layer.

use std::collections::BTreeMap;
use std::fmt;

use crate::core::manifest::{ManifestFragment, ManifestSection, MergedManifest};
use crate::util::diagnostic::Diagnostic;

/// Layer name of the workspace-local module.
pub const LOCAL_LAYER: &str = "workspace-local module";

/// One precedence layer.
#[derive(Debug, Clone, Copy)]
pub struct ManifestLayer<'a> {
    pub name: &'a str,
    pub fragment: &'a ManifestFragment,
}

impl<'a> ManifestLayer<'a> {
    pub fn new(name: &'a str, fragment: &'a ManifestFragment) -> Self {
        ManifestLayer { name, fragment }
    }
}

/// A key defined with different values by two layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestConflict {
    pub section: ManifestSection,
    pub key: String,
    pub previous_value: String,
    pub previous_layer: String,
    pub new_value: String,
    pub new_layer: String,
}

impl ManifestConflict {
    /// Convert to a warning diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::warning(format!(
            "`{}` in `{}` is overridden",
            self.key, self.section
        ))
        .with_context(format!("{} sets `{}`", self.previous_layer, self.previous_value))
        .with_context(format!("{} sets `{}` (used)", self.new_layer, self.new_value))
    }
}

impl fmt::Display for ManifestConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}: `{}` from {} replaced by `{}` from {}",
            self.section,
            self.key,
            self.previous_value,
            self.previous_layer,
            self.new_value,
            self.new_layer
        )
    }
}

/// Fold `layers` into one manifest.
///
/// Conflicts are returned in layer order and, within a layer, by section
/// then key, so the same layers always produce the same list.
pub fn merge(layers: &[ManifestLayer<'_>]) -> (MergedManifest, Vec<ManifestConflict>) {
    let mut merged = MergedManifest::default();
    let mut conflicts = Vec::new();

    for section in ManifestSection::ALL {
        // key -> (value, layer that set it)
        let mut acc: BTreeMap<&str, (&str, &str)> = BTreeMap::new();
        let mut section_conflicts = Vec::new();

        for (index, layer) in layers.iter().enumerate() {
            for (key, value) in layer.fragment.section(section) {
                match acc.get(key.as_str()) {
                    None => {
                        acc.insert(key.as_str(), (value.as_str(), layer.name));
                    }
                    Some((prev_value, _)) if *prev_value == value.as_str() => {}
                    Some(&(prev_value, prev_layer)) => {
                        section_conflicts.push((
                            index,
                            ManifestConflict {
                                section,
                                key: key.clone(),
                                previous_value: prev_value.to_string(),
                                previous_layer: prev_layer.to_string(),
                                new_value: value.clone(),
                                new_layer: layer.name.to_string(),
                            },
                        ));
                        acc.insert(key.as_str(), (value.as_str(), layer.name));
                    }
                }
            }
        }

        *merged.section_mut(section) = acc
            .into_iter()
            .map(|(k, (v, _))| (k.to_string(), v.to_string()))
            .collect();
        conflicts.extend(section_conflicts);
    }

    // Stable: keeps section then key order within each layer.
    conflicts.sort_by_key(|(index, _)| *index);
    let conflicts = conflicts.into_iter().map(|(_, c)| c).collect();

    (merged, conflicts)
}
