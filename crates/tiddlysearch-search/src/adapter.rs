//! Index-Query Adapter (§4.4): turns a `{field: value}` mapping into a
//! query string, searches with it, and rehydrates each hit from the
//! external store.

use std::collections::BTreeMap;

use tiddlysearch_plan::Catalog;

use crate::config::Config;
use crate::error::{FilterIndexRefused, StoreGetError};
use crate::search::search;
use crate::session::Engine;

/// The external CRUD store, out of scope to implement (§1) but in scope as
/// a seam: anything that can materialize a `(bag, title)` hit into a full
/// document.
pub trait TiddlerStore {
    type Tiddler;

    fn get(&self, bag: &str, title: &str) -> Result<Self::Tiddler, StoreGetError>;
}

/// A sorted map keeps the generated query's field order deterministic,
/// which matters for testing the round-trip property but not for
/// correctness (the query is an implicit conjunction either way).
pub type FieldFilter = BTreeMap<String, String>;

/// Characters that would change the meaning of the generated `name:"value"`
/// text if they appeared unescaped in a field name (mirrors the grammar's
/// own reserved-character set for a bare `Word`, since a field name is
/// never quoted). A value is additionally refused for containing `"` or
/// `\`, since the grammar has no escape for either inside a quoted phrase
/// once this function has already chosen the quoting (§4.4, "the parser
/// does not support nested quoting").
const RESERVED_IN_FIELD_NAME: &[char] = &['\\', '(', ')', ':', '"', '{', '}', '[', ']'];

/// Builds `name:"value"` for each entry, joined with spaces, runs it
/// through [`search`], and fetches each hit from `store`. Refuses up front
/// if any field name or value could change the generated query's grammar
/// rather than just its content.
pub fn search_by_fields<E, C, S>(
    engine: &E,
    catalog: &C,
    config: &Config,
    store: &S,
    filter: &FieldFilter,
) -> Result<Vec<S::Tiddler>, FilterIndexRefused>
where
    E: Engine,
    C: Catalog,
    S: TiddlerStore,
{
    let name_is_unsafe = |name: &str| {
        name.is_empty() || name.chars().any(|c| c.is_whitespace() || RESERVED_IN_FIELD_NAME.contains(&c))
    };
    if filter.keys().any(|name| name_is_unsafe(name))
        || filter.values().any(|v| v.contains('"') || v.contains('\\'))
    {
        return Err(FilterIndexRefused::QuotedValue);
    }

    let query = build_query(filter);
    let results =
        search(engine, catalog, config, &query).map_err(|err| FilterIndexRefused::Store(err.to_string()))?;

    let mut docs = Vec::new();
    for (bag, title) in results {
        let doc = store
            .get(&bag, &title)
            .map_err(|StoreGetError(msg)| FilterIndexRefused::Store(msg))?;
        docs.push(doc);
    }
    Ok(docs)
}

fn build_query(filter: &FieldFilter) -> String {
    filter
        .iter()
        .map(|(name, value)| format!("{name}:\"{value}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;
    use crate::session::Session;
    use pretty_assertions::assert_eq;
    use tiddlysearch_parser::{parse, Node};
    use tiddlysearch_plan::RevisionCatalog;

    struct PanicsOnOpen;
    impl Engine for PanicsOnOpen {
        fn open_session(&self) -> Result<Box<dyn Session>, ExecutionError> {
            panic!("must not search when a value contains a quote");
        }
    }

    struct NoopStore;
    impl TiddlerStore for NoopStore {
        type Tiddler = ();
        fn get(&self, _bag: &str, _title: &str) -> Result<(), StoreGetError> {
            Ok(())
        }
    }

    #[test]
    fn quoted_value_is_refused_before_searching() {
        let mut filter = FieldFilter::new();
        filter.insert("house".into(), "a \"cottage\"".into());
        let config = Config {
            mysql: crate::config::MysqlConfig::default(),
        };
        let err = search_by_fields(&PanicsOnOpen, &RevisionCatalog, &config, &NoopStore, &filter)
            .unwrap_err();
        assert_eq!(err, FilterIndexRefused::QuotedValue);
    }

    #[test]
    fn unsafe_field_name_is_refused_before_searching() {
        let mut filter = FieldFilter::new();
        filter.insert("bag OR x".into(), "bag1".into());
        let config = Config {
            mysql: crate::config::MysqlConfig::default(),
        };
        let err = search_by_fields(&PanicsOnOpen, &RevisionCatalog, &config, &NoopStore, &filter)
            .unwrap_err();
        assert_eq!(err, FilterIndexRefused::QuotedValue);
    }

    #[test]
    fn round_trip_produces_one_field_per_entry() {
        let mut filter = FieldFilter::new();
        filter.insert("bag".into(), "bag1".into());
        filter.insert("house".into(), "cottage".into());
        let query = build_query(&filter);
        let ast = parse(&query).unwrap();
        match ast {
            Node::Toplevel(children) => assert_eq!(children.len(), 2),
            other => panic!("expected Toplevel, got {other:?}"),
        }
    }
}
