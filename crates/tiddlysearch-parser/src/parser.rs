//! Recursive-descent parser for the query language described in the crate
//! docs. The parser is a pure function of its input: no state survives a
//! single call to [`parse`].

use crate::ast::{FieldNode, Node, RangeNode};
use crate::error::ParseError;
use crate::keywords;
use crate::lexer::LexBuf;

/// Parses `query` into an AST, or fails with a [`ParseError`] describing
/// the first byte range the grammar could not account for.
///
/// Any unparsed residue fails the whole query, per the grammar's
/// "toplevel" production: a query is either consumed in full or rejected.
pub fn parse(query: &str) -> Result<Node, ParseError> {
    let mut parser = Parser {
        query,
        lex: LexBuf::new(query),
    };
    let children = parser.parse_expression()?;
    parser.lex.skip_whitespace();
    if !parser.lex.at_end() {
        return Err(ParseError::new(
            query,
            parser.lex.pos(),
            format!(
                "unexpected trailing input starting at {:?}",
                &query[parser.lex.pos()..]
            ),
        ));
    }
    Ok(Node::Toplevel(children))
}

struct Parser<'a> {
    query: &'a str,
    lex: LexBuf<'a>,
}

impl<'a> Parser<'a> {
    /// A sequence of implicitly-conjoined terms, used both for the
    /// toplevel query and for the contents of a `(...)` group.
    fn parse_expression(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut terms = Vec::new();
        loop {
            self.lex.skip_whitespace();
            match self.lex.peek() {
                None => break,
                Some(')') => break,
                Some(_) => terms.push(self.parse_term()?),
            }
        }
        Ok(terms)
    }

    fn parse_term(&mut self) -> Result<Node, ParseError> {
        self.parse_or_chain()
    }

    fn parse_or_chain(&mut self) -> Result<Node, ParseError> {
        let mut items = vec![self.parse_and_chain()?];
        loop {
            let checkpoint = self.lex.pos();
            let ws = self.lex.skip_whitespace();
            if ws > 0 && self.lex.consume_bounded_literal(keywords::OR) {
                let ws2 = self.lex.skip_whitespace();
                if ws2 == 0 {
                    return Err(self.err("expected whitespace after OR"));
                }
                items.push(self.parse_and_chain()?);
            } else {
                self.rewind(checkpoint);
                break;
            }
        }
        Ok(if items.len() > 1 {
            Node::Or(items)
        } else {
            items.pop().unwrap()
        })
    }

    fn parse_and_chain(&mut self) -> Result<Node, ParseError> {
        let mut items = vec![self.parse_primary()?];
        loop {
            let checkpoint = self.lex.pos();
            let ws = self.lex.skip_whitespace();
            if ws > 0 && self.lex.consume_bounded_literal(keywords::AND) {
                let ws2 = self.lex.skip_whitespace();
                if ws2 == 0 {
                    return Err(self.err("expected whitespace after AND"));
                }
                items.push(self.parse_primary()?);
            } else {
                self.rewind(checkpoint);
                break;
            }
        }
        Ok(if items.len() > 1 {
            Node::And(items)
        } else {
            items.pop().unwrap()
        })
    }

    /// `NOT unit` or a bare boosted unit. `NOT` binds to a single unit, not
    /// to a whole `AND`/`OR` chain, so `NOT a AND b` parses as `(NOT a) AND
    /// b` — authors who want `NOT (a AND b)` must parenthesize.
    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        if self.lex.consume_bounded_literal(keywords::NOT) {
            let ws = self.lex.skip_whitespace();
            if ws == 0 {
                return Err(self.err("expected whitespace after NOT"));
            }
            let operand = self.parse_boosted()?;
            return Ok(Node::Not(Box::new(operand)));
        }
        self.parse_boosted()
    }

    /// A core unit, optionally followed by an ignored `^number` boost.
    fn parse_boosted(&mut self) -> Result<Node, ParseError> {
        let core = self.parse_core()?;
        self.maybe_consume_boost()?;
        Ok(core)
    }

    fn maybe_consume_boost(&mut self) -> Result<(), ParseError> {
        if !self.lex.consume('^') {
            return Ok(());
        }
        let mut digits = String::new();
        while matches!(self.lex.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            digits.push(self.lex.next().unwrap());
        }
        if digits.is_empty() || digits.parse::<f64>().is_err() {
            return Err(self.err("expected a number after ^ boost"));
        }
        Ok(())
    }

    /// `Group`, `Quotes`, `Range`, `Field`, or `Word` — the things a `unit`
    /// can be, per the grammar.
    fn parse_core(&mut self) -> Result<Node, ParseError> {
        match self.lex.peek() {
            Some('(') => {
                self.lex.next();
                let children = self.parse_expression()?;
                if !self.lex.consume(')') {
                    return Err(self.err("expected closing )"));
                }
                Ok(Node::Group(children))
            }
            Some('"') => {
                self.lex.next();
                match self.lex.take_until_unescaped('"') {
                    Some(content) => Ok(Node::Quotes(content)),
                    None => Err(self.err("unterminated quoted phrase")),
                }
            }
            Some('[') | Some('{') => self.parse_range(),
            Some(c) if c == ')' || c == ']' || c == '}' || c == ':' || c == '\\' => {
                Err(self.err(&format!("unexpected character {:?}", c)))
            }
            Some(_) => self.parse_word_or_field(),
            None => Err(self.err("expected a search term")),
        }
    }

    fn parse_word_or_field(&mut self) -> Result<Node, ParseError> {
        let start = self.lex.pos();
        let word = self.lex.take_word();
        if word.is_empty() {
            let bad = self.lex.peek();
            return Err(self.err(&format!("unexpected character {:?}", bad)));
        }
        if self.lex.peek() == Some(':') {
            if !is_valid_field_name(&word) {
                return Err(ParseError::at(
                    self.query,
                    start..self.lex.pos(),
                    format!("{:?} is not a valid field name", word),
                ));
            }
            self.lex.next();
            let unit = self.parse_field_value()?;
            return Ok(Node::Field(FieldNode {
                name: word,
                unit: Box::new(unit),
            }));
        }
        Ok(Node::Word(word))
    }

    /// The value bound to a `Field`: any `Group`/`Quotes`/`Word`/`Range`,
    /// optionally boosted, but never an `And`/`Or`/`Not` — those only ever
    /// appear as siblings in an enclosing expression.
    fn parse_field_value(&mut self) -> Result<Node, ParseError> {
        self.parse_boosted()
    }

    fn parse_range(&mut self) -> Result<Node, ParseError> {
        let start = self.lex.pos();
        let open = self.lex.next().expect("caller checked peek");
        let low_inclusive = open == '[';
        self.lex.skip_whitespace();
        let low_tok = self.lex.take_token_until(&[']', '}']);
        self.lex.skip_whitespace();
        if !self.lex.consume_bounded_literal(keywords::TO) {
            return Err(self.err("expected TO in range expression"));
        }
        self.lex.skip_whitespace();
        let high_tok = self.lex.take_token_until(&[']', '}']);
        self.lex.skip_whitespace();
        let high_inclusive = match self.lex.next() {
            Some(']') => true,
            Some('}') => false,
            other => {
                return Err(ParseError::at(
                    self.query,
                    start..self.lex.pos(),
                    format!("expected ] or }} to close range, found {:?}", other),
                ))
            }
        };
        if low_tok.is_empty() || high_tok.is_empty() {
            return Err(ParseError::at(
                self.query,
                start..self.lex.pos(),
                "range endpoints must not be empty",
            ));
        }
        Ok(Node::Range(RangeNode {
            low: if low_tok == "*" { None } else { Some(low_tok) },
            low_inclusive,
            high: if high_tok == "*" {
                None
            } else {
                Some(high_tok)
            },
            high_inclusive,
        }))
    }

    fn rewind(&mut self, pos: usize) {
        self.lex.set_pos(pos);
    }

    fn err(&self, message: &str) -> ParseError {
        ParseError::new(self.query, self.lex.pos(), message)
    }
}

fn is_valid_field_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_query_is_empty_toplevel() {
        assert_eq!(parse("").unwrap(), Node::Toplevel(vec![]));
        assert_eq!(parse("   ").unwrap(), Node::Toplevel(vec![]));
    }

    #[test]
    fn bare_word() {
        assert_eq!(
            parse("chrisdent").unwrap(),
            Node::Toplevel(vec![Node::Word("chrisdent".into())])
        );
    }

    #[test]
    fn implicit_conjunction_of_two_words() {
        assert_eq!(
            parse("tag:orange tag:pear").unwrap(),
            Node::Toplevel(vec![
                Node::Field(FieldNode {
                    name: "tag".into(),
                    unit: Box::new(Node::Word("orange".into()))
                }),
                Node::Field(FieldNode {
                    name: "tag".into(),
                    unit: Box::new(Node::Word("pear".into()))
                }),
            ])
        );
    }

    #[test]
    fn explicit_and_is_a_single_binary_node() {
        assert_eq!(
            parse("tag:a AND tag:b").unwrap(),
            Node::Toplevel(vec![Node::And(vec![
                Node::Field(FieldNode {
                    name: "tag".into(),
                    unit: Box::new(Node::Word("a".into()))
                }),
                Node::Field(FieldNode {
                    name: "tag".into(),
                    unit: Box::new(Node::Word("b".into()))
                }),
            ])])
        );
    }

    #[test]
    fn group_or_of_bags() {
        let ast = parse("ftitle:GettingStarted (bag:cdent_public OR bag:fnd_public)").unwrap();
        match ast {
            Node::Toplevel(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(children[0], Node::Field(_)));
                match &children[1] {
                    Node::Group(inner) => {
                        assert_eq!(inner.len(), 1);
                        assert!(matches!(inner[0], Node::Or(_)));
                    }
                    other => panic!("expected Group, got {:?}", other),
                }
            }
            other => panic!("expected Toplevel, got {:?}", other),
        }
    }

    #[test]
    fn quoted_phrase_preserves_inner_text() {
        assert_eq!(
            parse("\"hello world\"").unwrap(),
            Node::Toplevel(vec![Node::Quotes("hello world".into())])
        );
    }

    #[test]
    fn not_binds_tighter_than_and() {
        assert_eq!(
            parse("NOT a AND b").unwrap(),
            Node::Toplevel(vec![Node::And(vec![
                Node::Not(Box::new(Node::Word("a".into()))),
                Node::Word("b".into()),
            ])])
        );
    }

    #[test]
    fn and_is_not_confused_with_a_word_prefix() {
        assert_eq!(
            parse("ANDROID").unwrap(),
            Node::Toplevel(vec![Node::Word("ANDROID".into())])
        );
    }

    #[test]
    fn range_with_open_upper_bound() {
        assert_eq!(
            parse("[10 TO *]").unwrap(),
            Node::Toplevel(vec![Node::Range(RangeNode {
                low: Some("10".into()),
                low_inclusive: true,
                high: None,
                high_inclusive: true,
            })])
        );
    }

    #[test]
    fn boost_is_parsed_and_discarded() {
        assert_eq!(
            parse("hello^2.5").unwrap(),
            Node::Toplevel(vec![Node::Word("hello".into())])
        );
    }

    #[test]
    fn trailing_residue_is_a_parse_error() {
        assert!(parse("(unterminated").is_err());
        assert!(parse("unterminated)").is_err());
    }

    #[test]
    fn near_is_an_ordinary_field() {
        assert_eq!(
            parse("near:10,-10,100000").unwrap(),
            Node::Toplevel(vec![Node::Field(FieldNode {
                name: "near".into(),
                unit: Box::new(Node::Word("10,-10,100000".into())),
            })])
        );
    }

    #[test]
    fn invalid_field_name_is_rejected() {
        assert!(parse("föö:bar").is_err());
    }
}
