//! Workspace composition.
//!
//! Turns a workspace definition plus the module catalog into a build script
//! and a merged manifest:
//!
//! 1. [`validate`] checks the definition against the registry.
//! 2. [`template`] renders each module fragment, then the base scaffold
//!    with the fragments injected.
//! 3. [`merge`] folds the manifests in precedence order.
//!
//! [`engine::Composer`] drives the three steps.

pub mod engine;
pub mod errors;
pub mod merge;
pub mod params;
pub mod template;
pub mod validate;

pub use engine::{CompositionResult, Composer};
pub use errors::{ComposeError, SchemaError, TemplateError};
pub use merge::{ManifestConflict, ManifestLayer};
pub use template::{Bindings, Template, Value};
