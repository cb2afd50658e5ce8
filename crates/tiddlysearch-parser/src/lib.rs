//! Grammar and parser for the tiddler search query language: fielded
//! terms, phrases, groups, `AND`/`OR`/`NOT`, trailing-`*` wildcards, and
//! range expressions. See [`parser::parse`] for the entry point and
//! [`ast::Node`] for the tree it produces.
//!
//! The parser is stateless and the AST it returns is immutable; nothing
//! here talks to a database or retains state between calls.

pub mod ast;
pub mod error;
mod keywords;
mod lexer;
mod parser;

pub use ast::{FieldNode, Node, RangeNode};
pub use error::ParseError;
pub use parser::parse;
