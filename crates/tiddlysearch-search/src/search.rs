//! The Search Executor's entry point: parse, plan, inject the default
//! limit, open a session, and run.

use tracing::{debug, warn};

use tiddlysearch_parser::parse;
use tiddlysearch_plan::{Catalog, ColumnRef, Direction, OrderBy, PlanBuilder};

use crate::config::Config;
use crate::error::SearchError;
use crate::session::{Engine, SearchResults};

/// Runs `query` to completion and returns a lazily-drained iterator of
/// `(bag, title)` identifiers.
///
/// Per §4.2, a plan with no explicit `_limit`/`near` gets the configured
/// default limit before execution; parse and plan failures never reach the
/// session (testable property 6, "parse-failure isolation").
pub fn search<E, C>(
    engine: &E,
    catalog: &C,
    config: &Config,
    query: &str,
) -> Result<SearchResults, SearchError>
where
    E: Engine,
    C: Catalog,
{
    let ast = parse(query).map_err(|err| {
        debug!(%err, "search query failed to parse");
        SearchError::Parse(err)
    })?;

    let mut plan = PlanBuilder::new(catalog).build(&ast).map_err(|err| {
        debug!(%err, "failed to lower query into a plan");
        SearchError::Plan(err)
    })?;
    if plan.limit.is_none() {
        plan.limit = Some(config.mysql.search_limit);
        // Mirrors `PlanBuilder::build_limit`'s side effect: a limit, whether
        // explicit or defaulted in here, implies "most recently modified
        // first" unless the query already asked for a different order.
        if plan.order_by.is_empty() {
            plan.order_by = vec![OrderBy {
                column: ColumnRef::new("revision", "modified"),
                direction: Direction::Desc,
            }];
        }
    }

    let session = engine.open_session().map_err(SearchError::Execution)?;
    SearchResults::run(session, &plan).map_err(|err| {
        warn!(%err, "search execution failed");
        SearchError::Execution(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;
    use crate::session::Session;
    use pretty_assertions::assert_eq;
    use tiddlysearch_plan::RevisionCatalog;

    struct FixtureEngine {
        rows: Vec<(String, String)>,
    }

    struct FixtureSession {
        rows: Vec<(String, String)>,
    }

    impl Session for FixtureSession {
        fn execute(&mut self, _plan: &tiddlysearch_plan::Plan) -> Result<Vec<(String, String)>, ExecutionError> {
            Ok(self.rows.clone())
        }
        fn rollback(&mut self) {}
        fn close(&mut self) {}
    }

    impl Engine for FixtureEngine {
        fn open_session(&self) -> Result<Box<dyn Session>, ExecutionError> {
            Ok(Box::new(FixtureSession { rows: self.rows.clone() }))
        }
    }

    #[test]
    fn parse_failure_never_opens_a_session() {
        struct PanicsOnOpen;
        impl Engine for PanicsOnOpen {
            fn open_session(&self) -> Result<Box<dyn Session>, ExecutionError> {
                panic!("must not be called for a query that fails to parse");
            }
        }
        let catalog = RevisionCatalog;
        let config = Config {
            mysql: crate::config::MysqlConfig::default(),
        };
        let err = search(&PanicsOnOpen, &catalog, &config, "unterminated)").unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[test]
    fn default_limit_is_injected_when_absent() {
        let catalog = RevisionCatalog;
        let config = Config {
            mysql: crate::config::MysqlConfig::default(),
        };
        let engine = FixtureEngine {
            rows: vec![("bag1".into(), "tiddler1".into())],
        };
        let results = search(&engine, &catalog, &config, "chrisdent").unwrap();
        let hits: Vec<_> = results.collect();
        assert_eq!(hits, vec![("bag1".into(), "tiddler1".into())]);
    }

    #[test]
    fn default_limit_also_defaults_the_order() {
        use std::cell::RefCell;
        use std::rc::Rc;
        use tiddlysearch_plan::Plan;

        struct RecordingSession {
            seen: Rc<RefCell<Option<Plan>>>,
        }
        impl Session for RecordingSession {
            fn execute(&mut self, plan: &Plan) -> Result<Vec<(String, String)>, ExecutionError> {
                *self.seen.borrow_mut() = Some(plan.clone());
                Ok(vec![])
            }
            fn rollback(&mut self) {}
            fn close(&mut self) {}
        }
        struct RecordingEngine {
            seen: Rc<RefCell<Option<Plan>>>,
        }
        impl Engine for RecordingEngine {
            fn open_session(&self) -> Result<Box<dyn Session>, ExecutionError> {
                Ok(Box::new(RecordingSession { seen: self.seen.clone() }))
            }
        }

        let catalog = RevisionCatalog;
        let config = Config {
            mysql: crate::config::MysqlConfig::default(),
        };
        let seen = Rc::new(RefCell::new(None));
        let engine = RecordingEngine { seen: seen.clone() };
        search(&engine, &catalog, &config, "chrisdent").unwrap();

        let plan = seen.borrow().clone().expect("execute was called");
        assert_eq!(plan.limit, Some(config.mysql.search_limit));
        assert_eq!(
            plan.order_by,
            vec![tiddlysearch_plan::OrderBy {
                column: tiddlysearch_plan::ColumnRef::new("revision", "modified"),
                direction: tiddlysearch_plan::Direction::Desc,
            }]
        );
    }
}
