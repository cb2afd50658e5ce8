use std::ops::Range;

use thiserror::Error;

/// The grammar rejected the input. Carries the original query and the byte
/// range the parser had reached, so callers can point at the offending
/// fragment without re-scanning.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("failed to parse search query: {message} (at byte {}..{})", range.start, range.end)]
pub struct ParseError {
    pub query: String,
    pub message: String,
    pub range: Range<usize>,
}

impl ParseError {
    pub(crate) fn new(query: &str, pos: usize, message: impl Into<String>) -> ParseError {
        ParseError {
            query: query.to_string(),
            message: message.into(),
            range: pos..query.len(),
        }
    }

    pub(crate) fn at(query: &str, range: Range<usize>, message: impl Into<String>) -> ParseError {
        ParseError {
            query: query.to_string(),
            message: message.into(),
            range,
        }
    }
}
