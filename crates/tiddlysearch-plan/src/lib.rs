//! Lowers a parsed search query into a relational plan against the
//! tiddler/revision/text/tag/field schema.
//!
//! [`PlanBuilder`] does the walking; [`Plan`] is the immutable result,
//! consumed exactly once by an executor via [`Plan::render`].

pub mod builder;
pub mod catalog;
pub mod error;
pub mod plan;

pub use builder::PlanBuilder;
pub use catalog::{Catalog, RevisionCatalog, RevisionColumn};
pub use error::PlanError;
pub use plan::{
    ColumnRef, Direction, EARTH_RADIUS_METRES, JoinedRelation, NearClause, OrderBy, Plan,
    Predicate, Relation, RenderedQuery, SqlValue,
};
