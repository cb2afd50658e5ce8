use thiserror::Error;

/// Everything that can go wrong while lowering an AST into a [`crate::Plan`].
///
/// Surfaced upstream as `StoreError` per the error-handling design; callers
/// that need the distinction between "the query asked for something we
/// don't implement" and "the query was malformed" can match on the variant.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlanError {
    #[error("range queries are not supported: {0}")]
    RangeNotImplemented(String),

    #[error("malformed id, expected BAG:TITLE: {0:?}")]
    MalformedId(String),

    #[error("failed to parse search query, malformed near: {0}")]
    MalformedNear(String),

    #[error("{0} is not a valid field name")]
    InvalidFieldName(String),

    #[error("NOT requires an operand")]
    NotWithoutOperand,

    #[error("generated search SQL incorrect: {0}")]
    SqlGeneration(String),
}
