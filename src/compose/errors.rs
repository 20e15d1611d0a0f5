//! Composition error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// A workspace definition or catalog that does not satisfy its schema.
///
/// Always fatal, and always raised before any template is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum SchemaError {
    #[error("malformed workspace definition: {message}")]
    #[diagnostic(code(theia_builder::schema::malformed))]
    Malformed { message: String },

    #[error("missing required field `{field}`")]
    #[diagnostic(code(theia_builder::schema::missing_field))]
    MissingField { field: String },

    #[error("invalid value for `{field}`: {reason}")]
    #[diagnostic(code(theia_builder::schema::invalid_field))]
    InvalidField { field: String, reason: String },

    #[error("module `{module}` is listed more than once")]
    #[diagnostic(code(theia_builder::schema::duplicate_module))]
    DuplicateModule { module: String },

    #[error("unknown base `{base}`")]
    #[diagnostic(code(theia_builder::schema::unknown_base))]
    UnknownBase { base: String, available: Vec<String> },

    #[error("unknown module `{module}`")]
    #[diagnostic(code(theia_builder::schema::unknown_module))]
    UnknownModule { module: String },

    #[error("module `{module}` does not support base `{base}`")]
    #[diagnostic(code(theia_builder::schema::unsupported_base))]
    UnsupportedBase { module: String, base: String },

    #[error("module `{module}` has no parameter `{parameter}`")]
    #[diagnostic(code(theia_builder::schema::unknown_parameter))]
    UnknownParameter { module: String, parameter: String },

    #[error("invalid value `{value}` for parameter `{parameter}` of module `{module}`: expected {expected}")]
    #[diagnostic(code(theia_builder::schema::invalid_parameter))]
    InvalidParameterValue {
        module: String,
        parameter: String,
        value: String,
        expected: String,
    },

    #[error("module `{module}` declares reserved parameter name `{parameter}`")]
    #[diagnostic(code(theia_builder::schema::reserved_parameter))]
    ReservedParameter { module: String, parameter: String },
}

impl SchemaError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());

        match self {
            SchemaError::Malformed { .. } => diag
                .with_suggestion("Check application.yaml for typos and unsupported keys"),

            SchemaError::MissingField { field } => {
                diag.with_suggestion(format!("Add `{}` to application.yaml", field))
            }

            SchemaError::InvalidField { .. } => diag,

            SchemaError::DuplicateModule { module } => diag.with_suggestion(format!(
                "Remove the repeated `{}` entry from `modules`",
                module
            )),

            SchemaError::UnknownBase { available, .. } => {
                let diag = if available.is_empty() {
                    diag.with_context("the catalog defines no bases")
                } else {
                    diag.with_context(format!("available bases: {}", available.join(", ")))
                };
                diag.with_suggestion("Set `app.base` to one of the catalog's bases")
            }

            SchemaError::UnknownModule { .. } => diag
                .with_suggestion("Run `theia-builder modules` to list the catalog")
                .with_suggestion("Check `--module-dir` points at the right catalog"),

            SchemaError::UnsupportedBase { module, base } => diag
                .with_context(format!(
                    "`{}` has no `{}` directory in the catalog",
                    module, base
                ))
                .with_suggestion(format!("Remove `{}` from `modules`", module)),

            SchemaError::UnknownParameter { module, .. } => diag.with_suggestion(format!(
                "Run `theia-builder modules` to see the parameters of `{}`",
                module
            )),

            SchemaError::InvalidParameterValue { .. } => diag,

            SchemaError::ReservedParameter { .. } => {
                diag.with_context("`app`, `build` and `scripts` are bound by the composer")
            }
        }
    }
}

/// A template that cannot be parsed or rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum TemplateError {
    #[error("{origin}, line {line}: {message}")]
    #[diagnostic(code(theia_builder::template::malformed))]
    Malformed {
        origin: String,
        line: usize,
        message: String,
    },

    #[error("{origin}: unresolved binding `{name}`")]
    #[diagnostic(code(theia_builder::template::unresolved))]
    Unresolved { origin: String, name: String },

    #[error("{origin}: `{name}` is not a scalar and cannot be interpolated")]
    #[diagnostic(code(theia_builder::template::not_scalar))]
    NotScalar { origin: String, name: String },

    #[error("{origin}: `{name}` is not a sequence and cannot be iterated")]
    #[diagnostic(code(theia_builder::template::not_sequence))]
    NotSequence { origin: String, name: String },

    #[error("{origin}: injection point `{name}` must be referenced exactly once, found {found}")]
    #[diagnostic(code(theia_builder::template::injection_point))]
    InjectionPoint {
        origin: String,
        name: String,
        found: usize,
    },
}

/// Any fatal failure of a composition.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum ComposeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),
}

impl ComposeError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = match self {
            ComposeError::Schema(e) => e.to_diagnostic(),
            ComposeError::Template(e) => Diagnostic::error(e.to_string())
                .with_suggestion("Fix the template in the catalog or the workspace-local module"),
        };

        match MietteDiagnostic::code(self) {
            Some(code) => diag.with_context(format!("code: {}", code)),
            None => diag,
        }
    }
}
