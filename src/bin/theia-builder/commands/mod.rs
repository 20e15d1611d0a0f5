//! Command implementations

pub mod build;
pub mod completions;
pub mod modules;
pub mod prepare;

use theia_builder::compose::ComposeError;
use theia_builder::util::diagnostic::{self, Diagnostic};

/// Print a fatal error to stderr.
///
/// Composition errors get the full diagnostic with suggestions; anything
/// else prints its context chain.
pub fn report_error(err: &anyhow::Error, color: bool) {
    match err.downcast_ref::<ComposeError>() {
        Some(compose) => {
            let mut diag = compose.to_diagnostic();
            // Outer context, e.g. which application failed
            let outer = err.to_string();
            if outer != compose.to_string() {
                diag = diag.with_context(outer);
            }
            diagnostic::emit(&diag, color);
        }
        None => diagnostic::emit(&Diagnostic::error(format!("{:#}", err)), color),
    }
}
