//! The "session/engine" capability the core consumes (§1): the ability to
//! run parametric SQL and get rows back. Kept as a trait object so the
//! executor is testable against an in-memory fake without ever opening a
//! socket — the production adapter (outside this crate) wraps a
//! `mysql_async::Pool` checkout.

use tiddlysearch_plan::Plan;

use crate::error::ExecutionError;

/// One checked-out connection/session, scoped to a single search.
///
/// Takes the structured [`Plan`] rather than pre-rendered SQL text: a real
/// adapter renders it (`Plan::render`) and sends the result over the wire,
/// while a fixture-backed fake can instead interpret the plan directly
/// against in-memory rows, which is what makes the scenarios in
/// `tests/scenarios.rs` exercisable without a server.
pub trait Session {
    /// Runs `plan` and returns every matching `(bag, title)` pair in the
    /// engine's native ordering. Eager, for simplicity: the production
    /// adapter buffers a result set the same way `mysql_async` hands back
    /// rows page-at-a-time under the hood, so this isn't a meaningfully
    /// different resource profile for the sizes this engine targets.
    fn execute(&mut self, plan: &Plan) -> Result<Vec<(String, String)>, ExecutionError>;

    /// Rolls back and releases the session after any exception mid-search.
    fn rollback(&mut self);

    /// Releases the session after a search iterator is exhausted or
    /// abandoned cleanly.
    fn close(&mut self);
}

/// The process-wide capability that hands out a [`Session`] per search
/// (§5: "a shared, process-wide connection pool; each search acquires one
/// session").
pub trait Engine {
    fn open_session(&self) -> Result<Box<dyn Session>, ExecutionError>;
}

/// Streams `(bag, title)` identifiers from a finished search. Owns the
/// session for its whole lifetime and releases it on [`Drop`], so an
/// abandoned iterator (caller stops pulling rows) still cleans up (§5
/// Cancellation: "release the session on drop/close").
///
/// Finite and non-restartable, per §4.3: once consumed (or dropped), a new
/// search is required to iterate again.
pub struct SearchResults {
    session: Box<dyn Session>,
    rows: std::vec::IntoIter<(String, String)>,
    exhausted: bool,
    failed: bool,
}

impl std::fmt::Debug for SearchResults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchResults")
            .field("exhausted", &self.exhausted)
            .field("failed", &self.failed)
            .finish()
    }
}

impl SearchResults {
    pub(crate) fn run(
        mut session: Box<dyn Session>,
        plan: &Plan,
    ) -> Result<SearchResults, ExecutionError> {
        match session.execute(plan) {
            Ok(rows) => Ok(SearchResults {
                session,
                rows: rows.into_iter(),
                exhausted: false,
                failed: false,
            }),
            Err(err) => {
                session.rollback();
                Err(err)
            }
        }
    }
}

impl Iterator for SearchResults {
    type Item = (String, String);

    fn next(&mut self) -> Option<Self::Item> {
        match self.rows.next() {
            Some(row) => Some(row),
            None => {
                self.exhausted = true;
                None
            }
        }
    }
}

impl Drop for SearchResults {
    fn drop(&mut self) {
        if self.failed || !self.exhausted {
            self.session.rollback();
        } else {
            self.session.close();
        }
    }
}
