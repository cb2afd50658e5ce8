//! The relational plan the Producer builds, and its translation into
//! parametrized MySQL text. The plan stays engine-agnostic data up to
//! [`Plan::render`]; nothing in this module touches a connection.

use std::fmt::Write as _;

/// A value bound into generated SQL as a placeholder parameter, never
/// interpolated as text. This is the "parameter binding" half of the
/// injection story; the other half is the column whitelist in [`crate::catalog`].
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Str(String),
    I64(i64),
    F64(f64),
}

/// The five fixed relations the planner ever joins against. `Tiddler` and
/// `Revision` form the always-present base join; the others are introduced
/// on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Tiddler,
    Revision,
    Text,
    Tag,
    Field,
}

impl Relation {
    fn table_name(self) -> &'static str {
        match self {
            Relation::Tiddler => "tiddler",
            Relation::Revision => "revision",
            Relation::Text => "text",
            Relation::Tag => "tag",
            Relation::Field => "field",
        }
    }
}

/// One joined occurrence of a [`Relation`] under a specific alias.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRelation {
    pub relation: Relation,
    pub alias: String,
}

/// A column reference bound to a specific joined alias, e.g. `tag_0.tag`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub alias: String,
    pub column: &'static str,
}

impl ColumnRef {
    pub fn new(alias: impl Into<String>, column: &'static str) -> ColumnRef {
        ColumnRef {
            alias: alias.into(),
            column,
        }
    }
}

/// A WHERE-clause predicate tree. Composed bottom-up by the builder and
/// rendered into parametrized SQL text by [`Plan::render`].
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Always satisfied; the identity element for conjunction. Produced by
    /// operators (`_limit`, `near`) that contribute no WHERE-clause term of
    /// their own.
    True,
    Eq(ColumnRef, SqlValue),
    Like(ColumnRef, SqlValue),
    /// `MATCH(<column>) AGAINST(<value> IN BOOLEAN MODE)`.
    FulltextMatch(ColumnRef, SqlValue),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn and(mut terms: Vec<Predicate>) -> Predicate {
        terms.retain(|p| *p != Predicate::True);
        match terms.len() {
            0 => Predicate::True,
            1 => terms.pop().unwrap(),
            _ => Predicate::And(terms),
        }
    }

    pub fn or(terms: Vec<Predicate>) -> Predicate {
        match terms.len() {
            0 => Predicate::True,
            1 => terms.into_iter().next().unwrap(),
            _ => Predicate::Or(terms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub direction: Direction,
}

/// The `near:` operator's deferred effects: a computed distance column, a
/// `HAVING` bound, an ascending sort, and (unless later overridden) a
/// default limit of 20.
#[derive(Debug, Clone, PartialEq)]
pub struct NearClause {
    pub long_alias: String,
    pub lat_alias: String,
    pub lat: f64,
    pub long: f64,
    pub radius_m: f64,
}

pub const EARTH_RADIUS_METRES: f64 = 6_371_000.0;

/// The finished, immutable relational plan: consumed by the Executor
/// exactly once (§ state machine, `Final`).
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub joins: Vec<JoinedRelation>,
    pub predicate: Predicate,
    pub near: Option<NearClause>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
}

/// A rendered query ready to hand to a session capability: MySQL text with
/// `?` placeholders, and the parameters to bind into them in order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Plan {
    /// Renders the plan into parametrized MySQL text selecting distinct
    /// `(bag, title)` pairs, per §4.2's contract: "select distinct (bag,
    /// title) from tiddler joined with its current revision such that
    /// predicate P(ast) holds."
    pub fn render(&self) -> RenderedQuery {
        let mut sql = String::from(
            "SELECT DISTINCT tiddler.bag, tiddler.title\nFROM tiddler\nJOIN revision ON revision.number = tiddler.current_revision",
        );
        let mut params = Vec::new();

        if let Some(near) = &self.near {
            let _ = write!(
                sql,
                ",\n  ({R} * ACOS(\
                   COS(RADIANS(?)) * COS(RADIANS({lat}.value)) * COS(RADIANS({long}.value) - RADIANS(?)) \
                   + SIN(RADIANS(?)) * SIN(RADIANS({lat}.value)))) AS greatcircle",
                R = EARTH_RADIUS_METRES,
                lat = near.lat_alias,
                long = near.long_alias,
            );
            params.push(SqlValue::F64(near.lat));
            params.push(SqlValue::F64(near.long));
            params.push(SqlValue::F64(near.lat));
        }

        for join in &self.joins {
            let _ = write!(
                sql,
                "\nJOIN {table} AS {alias} ON {alias}.revision_number = revision.number",
                table = join.relation.table_name(),
                alias = join.alias,
            );
        }
        if let Some(near) = &self.near {
            let _ = write!(
                sql,
                "\nJOIN field AS {lat} ON {lat}.revision_number = revision.number AND {lat}.name = 'geo.lat'\
                 \nJOIN field AS {long} ON {long}.revision_number = revision.number AND {long}.name = 'geo.long'",
                lat = near.lat_alias,
                long = near.long_alias,
            );
        }

        sql.push_str("\nWHERE ");
        render_predicate(&self.predicate, &mut sql, &mut params);

        if let Some(near) = &self.near {
            sql.push_str("\nHAVING greatcircle < ?");
            params.push(SqlValue::F64(near.radius_m));
        }

        if !self.order_by.is_empty() {
            sql.push_str("\nORDER BY ");
            let rendered: Vec<String> = self
                .order_by
                .iter()
                .map(|o| {
                    format!(
                        "{}.{} {}",
                        o.column.alias,
                        o.column.column,
                        match o.direction {
                            Direction::Asc => "ASC",
                            Direction::Desc => "DESC",
                        }
                    )
                })
                .collect();
            sql.push_str(&rendered.join(", "));
        }

        if let Some(limit) = self.limit {
            let _ = write!(sql, "\nLIMIT {limit}");
        }

        RenderedQuery { sql, params }
    }
}

fn render_predicate(pred: &Predicate, sql: &mut String, params: &mut Vec<SqlValue>) {
    match pred {
        Predicate::True => sql.push_str("TRUE"),
        Predicate::Eq(col, value) => {
            let _ = write!(sql, "{}.{} = ?", col.alias, col.column);
            params.push(value.clone());
        }
        Predicate::Like(col, value) => {
            let _ = write!(sql, "{}.{} LIKE ?", col.alias, col.column);
            params.push(value.clone());
        }
        Predicate::FulltextMatch(col, value) => {
            let _ = write!(
                sql,
                "MATCH({}.{}) AGAINST(? IN BOOLEAN MODE)",
                col.alias, col.column
            );
            params.push(value.clone());
        }
        Predicate::And(children) => render_joined(children, "AND", sql, params),
        Predicate::Or(children) => render_joined(children, "OR", sql, params),
        Predicate::Not(inner) => {
            sql.push_str("NOT (");
            render_predicate(inner, sql, params);
            sql.push(')');
        }
    }
}

fn render_joined(children: &[Predicate], op: &str, sql: &mut String, params: &mut Vec<SqlValue>) {
    sql.push('(');
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            let _ = write!(sql, " {op} ");
        }
        render_predicate(child, sql, params);
    }
    sql.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_single_equality() {
        let plan = Plan {
            joins: vec![],
            predicate: Predicate::Eq(
                ColumnRef::new("revision", "type"),
                SqlValue::Str("text/plain".into()),
            ),
            near: None,
            order_by: vec![],
            limit: None,
        };
        let rendered = plan.render();
        assert!(rendered.sql.contains("revision.type = ?"));
        assert_eq!(rendered.params, vec![SqlValue::Str("text/plain".into())]);
    }

    #[test]
    fn true_collapses_out_of_and() {
        let combined = Predicate::and(vec![Predicate::True, Predicate::True]);
        assert_eq!(combined, Predicate::True);
    }

    #[test]
    fn near_params_stay_positional_alongside_another_predicate() {
        let plan = Plan {
            joins: vec![JoinedRelation {
                relation: Relation::Tag,
                alias: "tag_0".into(),
            }],
            predicate: Predicate::Eq(
                ColumnRef::new("tag_0", "tag"),
                SqlValue::Str("toilet".into()),
            ),
            near: Some(NearClause {
                long_alias: "geolong_0".into(),
                lat_alias: "geolat_0".into(),
                lat: 10.0,
                long: -10.0,
                radius_m: 100_000.0,
            }),
            order_by: vec![],
            limit: None,
        };
        let rendered = plan.render();
        // The SELECT clause's three `?`s (query lat, query long, query lat again)
        // must come before the WHERE clause's one `?` (the tag equality), since
        // that's the order they appear in `sql`.
        assert_eq!(
            rendered.params,
            vec![
                SqlValue::F64(10.0),
                SqlValue::F64(-10.0),
                SqlValue::F64(10.0),
                SqlValue::Str("toilet".into()),
                SqlValue::F64(100_000.0),
            ]
        );
    }
}
