use thiserror::Error;

/// Typed failures raised by the mapping layer.
///
/// They travel inside [`crate::Error`] (an `anyhow::Error`), callers that need to branch on the
/// kind use `error.downcast_ref::<MapperError>()`. Transport failures are not part of this enum,
/// they are propagated untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapperError {
    #[error("Statement failed with code {code}: {message}\n  {sql}")]
    RemoteStatement {
        code: String,
        message: String,
        sql: String,
    },
    #[error(
        "Table `{table}` has columns without a matching field on `{entity}`: {}",
        .columns.join(", ")
    )]
    SchemaMismatch {
        entity: &'static str,
        table: &'static str,
        columns: Vec<String>,
    },
    #[error("Value of type {kind} cannot be written as a SQL literal")]
    UnsupportedValueType { kind: &'static str },
    #[error("Unknown wire type `{tag}` for column `{column}`")]
    UnknownWireType { tag: String, column: String },
    #[error("Variables were set but never used in the template: {}", .names.join(", "))]
    UnusedVariable { names: Vec<String> },
    #[error("Placeholder {{{name}}} is used in the template but no variable was set")]
    MissingVariable { name: String },
    #[error("Cannot {operation} entity of type `{entity}`, insufficient identity")]
    InsufficientIdentity {
        entity: &'static str,
        operation: &'static str,
    },
    #[error("Field `{field}` is not declared on `{entity}`")]
    UnknownField { entity: String, field: String },
    #[error("Field `{field}` of `{entity}` is not initialized")]
    UninitializedField { entity: &'static str, field: String },
    #[error("Lookup on `{entity}` yielded more than one row")]
    AmbiguousIdentity { entity: &'static str },
    #[error("Invalid value for `{target}`: {reason}")]
    InvalidValue { target: String, reason: String },
}
