//! The "entity catalog" capability the core consumes (§1 of the core's
//! contract): a whitelist of the revision relation's first-class columns,
//! consulted by field-name canonicalization before falling through to the
//! generic key/value `field` relation. Keeping this behind a trait (rather
//! than a hardcoded match) means the whitelist — and so the set of names a
//! query can bind directly to a column, the thing that keeps the planner
//! from interpolating an attacker-chosen column name into SQL — lives with
//! whoever owns the schema, not with the parser.

use std::fmt;

/// A first-class column of the `revision` relation, addressable by a field
/// name that may differ from the column's storage name (e.g. `title` binds
/// to the `tiddler_title` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionColumn {
    pub field_name: &'static str,
    pub sql_column: &'static str,
}

pub trait Catalog: fmt::Debug {
    /// The first-class revision columns a query may bind to by name, beyond
    /// the always-recognized `title`/`ftitle`/`bag`/`fbag`/`id`/`tag`/
    /// `near`/`_limit` operators that the Producer handles unconditionally.
    fn revision_columns(&self) -> &[RevisionColumn];

    /// Looks up `name` against [`revision_columns`](Self::revision_columns),
    /// returning the column it's bound to, if any.
    fn resolve_revision_column(&self, name: &str) -> Option<&'static str> {
        self.revision_columns()
            .iter()
            .find(|c| c.field_name == name)
            .map(|c| c.sql_column)
    }
}

/// The catalog implied by the data model: `modified`, `type`, `creator`,
/// `modifier`. `title`/`bag`/`id` are handled by the Producer directly since
/// they bind to the `tiddler` relation, not `revision`, and are never looked
/// up here.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevisionCatalog;

const REVISION_COLUMNS: &[RevisionColumn] = &[
    RevisionColumn {
        field_name: "modified",
        sql_column: "modified",
    },
    RevisionColumn {
        field_name: "type",
        sql_column: "type",
    },
    RevisionColumn {
        field_name: "creator",
        sql_column: "creator",
    },
    RevisionColumn {
        field_name: "modifier",
        sql_column: "modifier",
    },
];

impl Catalog for RevisionCatalog {
    fn revision_columns(&self) -> &[RevisionColumn] {
        REVISION_COLUMNS
    }
}
