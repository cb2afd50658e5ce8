//! The Producer: walks a parsed query and accumulates a [`Plan`].
//!
//! Mirrors the shape of the teacher's `Scope` (`sql/scope.rs`): a single
//! mutable struct threaded by `&mut self` through a recursive descent,
//! rather than a pile of accumulator parameters. Every method here is
//! private; [`build`] is the only entry point, so the type-state transitions
//! in [`BuilderState`] can't be driven out of order by a caller.

use std::collections::HashMap;

use tiddlysearch_parser::{FieldNode, Node, RangeNode};

use crate::catalog::Catalog;
use crate::error::PlanError;
use crate::plan::{
    ColumnRef, Direction, JoinedRelation, NearClause, OrderBy, Plan, Predicate, Relation, SqlValue,
};

/// Tracks where a freshly-constructed [`PlanBuilder`] is in its lifecycle.
/// Transitions are enforced by which methods exist to call, not by a runtime
/// check on every call; the `debug_assert!`s here are a cheap
/// double-check in debug builds, not the actual guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuilderState {
    Init,
    Building,
    Final,
}

/// Special field names recognized unconditionally, ahead of any catalog
/// lookup. Ordering here has no significance; it's the superset of names
/// §6 calls out as "recognized field names (special)".
enum SpecialField {
    Title,
    Bag,
    Id,
    Tag,
    Near,
    Limit,
}

fn canonicalize(name: &str) -> Option<SpecialField> {
    match name {
        "title" | "ftitle" => Some(SpecialField::Title),
        "bag" | "fbag" => Some(SpecialField::Bag),
        "id" => Some(SpecialField::Id),
        "tag" => Some(SpecialField::Tag),
        "near" => Some(SpecialField::Near),
        "_limit" => Some(SpecialField::Limit),
        _ => None,
    }
}

/// Per-query mutable state for lowering an AST into a [`Plan`]. One builder
/// per query; never reused or shared across queries (§5).
pub struct PlanBuilder<'c, C: Catalog> {
    catalog: &'c C,
    state: BuilderState,
    next_alias: HashMap<&'static str, u32>,
    joined_tag: Option<String>,
    joined_field: Option<String>,
    joined_text: Option<String>,
    in_and: bool,
    joins: Vec<JoinedRelation>,
    near: Option<NearClause>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
}

impl<'c, C: Catalog> PlanBuilder<'c, C> {
    pub fn new(catalog: &'c C) -> PlanBuilder<'c, C> {
        PlanBuilder {
            catalog,
            state: BuilderState::Init,
            next_alias: HashMap::new(),
            joined_tag: None,
            joined_field: None,
            joined_text: None,
            in_and: false,
            joins: Vec::new(),
            near: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Lowers `ast` into a finished [`Plan`]. Consumes the builder: per the
    /// state machine, a builder is used exactly once.
    pub fn build(mut self, ast: &Node) -> Result<Plan, PlanError> {
        debug_assert_eq!(self.state, BuilderState::Init);
        self.state = BuilderState::Building;
        let predicate = self.build_node(ast, None)?;
        self.state = BuilderState::Final;
        Ok(Plan {
            joins: self.joins,
            predicate,
            near: self.near,
            order_by: self.order_by,
            limit: self.limit,
        })
    }

    /// Allocates a fresh alias name for `prefix` without joining anything;
    /// used for the `near` field joins, which are rendered specially
    /// rather than through the generic `joins` list.
    fn alloc_alias(&mut self, prefix: &'static str) -> String {
        let n = self.next_alias.entry(prefix).or_insert(0);
        let alias = format!("{prefix}_{n}");
        *n += 1;
        alias
    }

    fn mint_alias(&mut self, relation: Relation, prefix: &'static str) -> String {
        let alias = self.alloc_alias(prefix);
        self.joins.push(JoinedRelation { relation, alias: alias.clone() });
        alias
    }

    /// The tag-join alias to predicate against: a fresh one under an `AND`
    /// context, the primary one otherwise (§4.2 join discipline).
    fn tag_alias(&mut self) -> String {
        if self.in_and {
            return self.mint_alias(Relation::Tag, "tag");
        }
        if let Some(alias) = &self.joined_tag {
            return alias.clone();
        }
        let alias = self.mint_alias(Relation::Tag, "tag");
        self.joined_tag = Some(alias.clone());
        alias
    }

    fn field_alias(&mut self) -> String {
        if self.in_and {
            return self.mint_alias(Relation::Field, "field");
        }
        if let Some(alias) = &self.joined_field {
            return alias.clone();
        }
        let alias = self.mint_alias(Relation::Field, "field");
        self.joined_field = Some(alias.clone());
        alias
    }

    fn text_alias(&mut self) -> String {
        if let Some(alias) = &self.joined_text {
            return alias.clone();
        }
        let alias = self.mint_alias(Relation::Text, "text");
        self.joined_text = Some(alias.clone());
        alias
    }

    /// Walks `node`. `field` carries the enclosing `Field` name, if any, so
    /// that `Word`/`Quotes`/`Range` leaves nested under a `name:(...)` group
    /// resolve against that field rather than falling back to fulltext.
    fn build_node(&mut self, node: &Node, field: Option<&str>) -> Result<Predicate, PlanError> {
        match node {
            Node::Toplevel(children) | Node::Group(children) => {
                let terms: Result<Vec<_>, _> = children
                    .iter()
                    .map(|c| self.build_node(c, field))
                    .collect();
                Ok(Predicate::and(terms?))
            }
            Node::And(children) => {
                let was_and = self.in_and;
                self.in_and = true;
                let terms: Result<Vec<_>, _> = children
                    .iter()
                    .map(|c| self.build_node(c, field))
                    .collect();
                self.in_and = was_and;
                Ok(Predicate::and(terms?))
            }
            Node::Or(children) => {
                let terms: Result<Vec<_>, _> = children
                    .iter()
                    .map(|c| self.build_node(c, field))
                    .collect();
                Ok(Predicate::or(terms?))
            }
            Node::Not(inner) => {
                let operand = self.build_node(inner, field)?;
                Ok(Predicate::Not(Box::new(operand)))
            }
            Node::Field(FieldNode { name, unit }) => self.build_field(name, unit),
            Node::Word(word) => Ok(self.build_leaf_value(field, word, false)),
            Node::Quotes(phrase) => Ok(self.build_leaf_value(field, phrase, true)),
            Node::Range(range) => Err(self.range_error(range, field)),
        }
    }

    fn range_error(&self, range: &RangeNode, field: Option<&str>) -> PlanError {
        let _ = field;
        PlanError::RangeNotImplemented(format!("{range:?}"))
    }

    /// Binds a `Field`'s name as context and walks its unit. `title`/`bag`/
    /// `tag`/known-revision-column/generic all resolve the same way whether
    /// the unit is a bare `Word` or a `Group` of alternatives
    /// (`title:(a OR b)`) — [`try_canonicalized_leaf`](Self::try_canonicalized_leaf)
    /// is what actually does the binding, once the walk reaches a leaf.
    /// `id`/`near`/`_limit` need the unit's shape directly, so they're
    /// special-cased here instead of going through the generic walk.
    fn build_field(&mut self, name: &str, unit: &Node) -> Result<Predicate, PlanError> {
        match canonicalize(name) {
            Some(SpecialField::Id) => self.build_id(unit),
            Some(SpecialField::Near) => self.build_near(unit),
            Some(SpecialField::Limit) => {
                self.build_limit(unit);
                Ok(Predicate::True)
            }
            _ => self.build_node(unit, Some(name)),
        }
    }

    /// `id:BAG:TITLE`. The grammar can't represent a literal `:` inside a
    /// `Word`, so `BAG:TITLE` parses as a nested `Field` (`bag` bound to
    /// `TITLE`); unwrap exactly that one level.
    fn build_id(&mut self, unit: &Node) -> Result<Predicate, PlanError> {
        match unit {
            Node::Field(FieldNode { name: bag, unit: title_unit }) => {
                let title = literal(title_unit)?;
                Ok(Predicate::And(vec![
                    Predicate::Eq(ColumnRef::new("tiddler", "bag"), SqlValue::Str(bag.clone())),
                    Predicate::Eq(
                        ColumnRef::new("tiddler", "title"),
                        SqlValue::Str(title),
                    ),
                ]))
            }
            other => Err(PlanError::MalformedId(format!("{other:?}"))),
        }
    }

    fn build_near(&mut self, unit: &Node) -> Result<Predicate, PlanError> {
        let value = literal(unit)?;
        let parts: Vec<&str> = value.split(',').collect();
        let (lat, long, radius) = match parts.as_slice() {
            [lat, long, radius] => match (lat.parse::<f64>(), long.parse::<f64>(), radius.parse::<f64>()) {
                (Ok(lat), Ok(long), Ok(radius)) => (lat, long, radius),
                _ => return Err(PlanError::MalformedNear(value)),
            },
            _ => return Err(PlanError::MalformedNear(value)),
        };
        let lat_alias = self.alloc_alias("geolat");
        let long_alias = self.alloc_alias("geolong");
        self.near = Some(NearClause {
            long_alias: long_alias.clone(),
            lat_alias: lat_alias.clone(),
            lat,
            long,
            radius_m: radius,
        });
        self.order_by = vec![OrderBy {
            column: ColumnRef::new("", "greatcircle"),
            direction: Direction::Asc,
        }];
        self.limit.get_or_insert(20);
        Ok(Predicate::True)
    }

    fn build_limit(&mut self, unit: &Node) {
        let Ok(value) = literal(unit) else { return };
        let Ok(n) = value.parse::<i64>() else { return };
        if n < 0 {
            return;
        }
        self.limit = Some(n as u64);
        if self.order_by.is_empty() {
            self.order_by = vec![OrderBy {
                column: ColumnRef::new("revision", "modified"),
                direction: Direction::Desc,
            }];
        }
    }

    /// An unfielded leaf: fulltext match against `text.text`.
    fn build_leaf_value(&mut self, field: Option<&str>, value: &str, is_phrase: bool) -> Predicate {
        if let Some(name) = field {
            if let Some(pred) = self.try_canonicalized_leaf(name, value) {
                return pred;
            }
        }
        let alias = self.text_alias();
        let against = if is_phrase {
            format!("\"{value}\"")
        } else {
            value.to_string()
        };
        Predicate::FulltextMatch(ColumnRef::new(alias, "text"), SqlValue::Str(against))
    }

    /// Handles the case where a bare `Word`/`Quotes` appears *nested inside*
    /// a `Field`'s unit, e.g. `title:(a OR b)`: the field name applies to
    /// each leaf in the subtree, not just a direct child.
    fn try_canonicalized_leaf(&mut self, name: &str, value: &str) -> Option<Predicate> {
        match canonicalize(name) {
            Some(SpecialField::Title) => {
                Some(self.column_predicate(ColumnRef::new("tiddler", "title"), value))
            }
            Some(SpecialField::Bag) => {
                Some(self.column_predicate(ColumnRef::new("tiddler", "bag"), value))
            }
            Some(SpecialField::Tag) => {
                let alias = self.tag_alias();
                Some(self.column_predicate(ColumnRef::new(alias, "tag"), value))
            }
            Some(SpecialField::Id) | Some(SpecialField::Near) | Some(SpecialField::Limit) => None,
            None => {
                if let Some(column) = self.catalog.resolve_revision_column(name) {
                    Some(self.column_predicate(ColumnRef::new("revision", column), value))
                } else {
                    let alias = self.field_alias();
                    let name_eq = Predicate::Eq(
                        ColumnRef::new(alias.clone(), "name"),
                        SqlValue::Str(name.to_string()),
                    );
                    let value_pred = self.column_predicate(ColumnRef::new(alias, "value"), value);
                    Some(Predicate::and(vec![name_eq, value_pred]))
                }
            }
        }
    }

    /// Wildcard handling shared by every column-bound leaf (§4.2): a
    /// trailing `*` becomes SQL `%` and switches `=` to `LIKE`. Any `%`/`_`/
    /// `\` already present in the user's prefix is escaped first, so a
    /// literal percent sign in the query can't smuggle in its own SQL
    /// wildcard (MySQL's default `LIKE` escape character is `\`).
    fn column_predicate(&self, column: ColumnRef, value: &str) -> Predicate {
        match value.strip_suffix('*') {
            Some(prefix) => {
                Predicate::Like(column, SqlValue::Str(format!("{}%", escape_like(prefix))))
            }
            None => Predicate::Eq(column, SqlValue::Str(value.to_string())),
        }
    }
}

/// Escapes `\`, `%`, and `_` so `prefix` is matched literally by `LIKE`
/// before the caller appends its own trailing `%`.
fn escape_like(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Extracts the literal string value from a `Word`/`Quotes` unit, the only
/// shapes a `Field`'s direct unit may reduce to for column comparisons.
fn literal(node: &Node) -> Result<String, PlanError> {
    match node {
        Node::Word(w) => Ok(w.clone()),
        Node::Quotes(q) => Ok(q.clone()),
        other => Err(PlanError::InvalidFieldName(format!(
            "expected a literal value, found {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RevisionCatalog;
    use pretty_assertions::assert_eq;
    use tiddlysearch_parser::parse;

    fn plan(query: &str) -> Plan {
        let catalog = RevisionCatalog;
        let ast = parse(query).unwrap();
        PlanBuilder::new(&catalog).build(&ast).unwrap()
    }

    #[test]
    fn bare_word_joins_text_once() {
        let p = plan("chrisdent");
        assert_eq!(p.joins.len(), 1);
        assert_eq!(p.joins[0].relation, Relation::Text);
        assert_eq!(
            p.predicate,
            Predicate::FulltextMatch(
                ColumnRef::new("text_0", "text"),
                SqlValue::Str("chrisdent".into())
            )
        );
    }

    #[test]
    fn implicit_conjunction_of_tags_reuses_join() {
        let p = plan("tag:orange tag:pear");
        assert_eq!(p.joins.len(), 1, "implicit conjunction reuses the primary tag join");
    }

    #[test]
    fn explicit_and_of_tags_mints_fresh_aliases() {
        let p = plan("tag:a AND tag:b");
        assert_eq!(p.joins.len(), 2, "explicit AND requires a fresh alias per conjunct");
    }

    #[test]
    fn wildcard_suffix_becomes_like() {
        let p = plan("house:cott*");
        match &p.predicate {
            Predicate::And(children) => match &children[1] {
                Predicate::Like(_, SqlValue::Str(v)) => assert_eq!(v, "cott%"),
                other => panic!("expected Like, got {other:?}"),
            },
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn wildcard_prefix_escapes_literal_percent_and_underscore() {
        let p = plan("house:50%off_special*");
        match &p.predicate {
            Predicate::And(children) => match &children[1] {
                Predicate::Like(_, SqlValue::Str(v)) => {
                    assert_eq!(v, r"50\%off\_special%");
                }
                other => panic!("expected Like, got {other:?}"),
            },
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn id_splits_into_bag_and_title() {
        let p = plan("id:bag1:tiddler1");
        assert_eq!(
            p.predicate,
            Predicate::And(vec![
                Predicate::Eq(ColumnRef::new("tiddler", "bag"), SqlValue::Str("bag1".into())),
                Predicate::Eq(ColumnRef::new("tiddler", "title"), SqlValue::Str("tiddler1".into())),
            ])
        );
    }

    #[test]
    fn near_sets_default_limit_and_order() {
        let p = plan("near:10,-10,100000");
        assert!(p.near.is_some());
        assert_eq!(p.limit, Some(20));
        assert_eq!(p.order_by[0].direction, Direction::Asc);
    }

    #[test]
    fn limit_after_near_overrides_default() {
        let p = plan("near:10,-10,100000 _limit:5");
        assert_eq!(p.limit, Some(5));
    }

    #[test]
    fn malformed_near_is_rejected() {
        let catalog = RevisionCatalog;
        let ast = parse("near:60,-60,3km").unwrap();
        let err = PlanBuilder::new(&catalog).build(&ast).unwrap_err();
        assert!(matches!(err, PlanError::MalformedNear(_)));
    }

    #[test]
    fn limit_ignores_non_integer_silently() {
        let p = plan("_limit:abc");
        assert_eq!(p.limit, None);
    }

    #[test]
    fn empty_query_matches_everything() {
        let p = plan("");
        assert_eq!(p.predicate, Predicate::True);
    }

    #[test]
    fn range_outside_field_is_a_plan_error() {
        let catalog = RevisionCatalog;
        let ast = parse("[10 TO 20]").unwrap();
        let err = PlanBuilder::new(&catalog).build(&ast).unwrap_err();
        assert!(matches!(err, PlanError::RangeNotImplemented(_)));
    }
}
