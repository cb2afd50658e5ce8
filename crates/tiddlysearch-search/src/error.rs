use thiserror::Error;

use tiddlysearch_parser::ParseError;
use tiddlysearch_plan::PlanError;

/// The engine rejected generated SQL, or the session capability otherwise
/// failed to run a query. Distinct from [`PlanError`]: this is "the plan
/// was fine but execution blew up" (§7, "indicate planner bugs and should
/// be testable").
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("generated search SQL incorrect: {0}")]
    Sql(String),
    #[error("error in the store: {0}")]
    Store(String),
}

/// The union of everything a search can fail with, matching the
/// `StoreError` surfaced to the caller in the source (§7).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SearchError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Returned by [`crate::TiddlerStore::get`] when the external store can't
/// produce the document a search result pointed at.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct StoreGetError(pub String);

/// The Index-Query Adapter's outcome on anything that stops it from
/// producing documents. Never folded into [`SearchError`]: per §7 this
/// "never propagates as a hard error to the client", it's the signal the
/// caller uses to fall back to its own generic filter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FilterIndexRefused {
    #[error("unable to process values with quotes")]
    QuotedValue,
    #[error("error in the store: {0}")]
    Store(String),
}
