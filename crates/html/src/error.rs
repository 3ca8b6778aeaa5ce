//! Parse-error records and the fatal strict-mode boundary.
//!
//! Recoverable conditions are structured values accumulated in emission
//! order; nothing in the pipeline panics on malformed input. The only fatal
//! paths are strict-mode escalation and option validation, both surfaced as
//! [`ParseFailure`].

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorOrigin {
    Tokenizer,
    TreeBuilder,
}

impl ErrorOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorOrigin::Tokenizer => "tokenizer",
            ErrorOrigin::TreeBuilder => "treebuilder",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    EofInComment,
    EofInDoctype,
    EofInTag,
    ExpectedClosingTagButGotEof,
    UnexpectedEndTag,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::EofInComment => "eof-in-comment",
            ErrorCode::EofInDoctype => "eof-in-doctype",
            ErrorCode::EofInTag => "eof-in-tag",
            ErrorCode::ExpectedClosingTagButGotEof => "expected-closing-tag-but-got-eof",
            ErrorCode::UnexpectedEndTag => "unexpected-end-tag",
        }
    }
}

/// One recoverable parse error.
///
/// `line`/`column` are 1-based positions into the decoded input; `None` when
/// the position is unknown (such errors sort after positioned ones).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub origin: ErrorOrigin,
    pub code: ErrorCode,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.origin.as_str(), self.code.as_str())?;
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, " at {line}:{column}")?;
        }
        if !self.message.is_empty() {
            write!(f, " ({})", self.message)?;
        }
        Ok(())
    }
}

/// Stable sort by `(line, column)` with unknown positions last.
///
/// Emission order is the tie-breaker, which a stable sort preserves for free.
pub(crate) fn sort_by_position(errors: &mut [ParseError]) {
    errors.sort_by_key(|e| match (e.line, e.column) {
        (Some(line), Some(column)) => (0u8, line, column),
        (Some(line), None) => (0, line, u32::MAX),
        (None, _) => (1, u32::MAX, u32::MAX),
    });
}

/// Fatal outcome of a parse entry point.
#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    /// Strict mode: the earliest parse error by source order.
    #[error("strict parse failed: {0}")]
    Strict(ParseError),
    /// Option validation failed before any parsing happened.
    #[error("invalid options: {0}")]
    Options(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(line: Option<u32>, column: Option<u32>, code: ErrorCode) -> ParseError {
        ParseError {
            origin: ErrorOrigin::Tokenizer,
            code,
            message: String::new(),
            line,
            column,
        }
    }

    #[test]
    fn sort_orders_by_position_with_unknowns_last() {
        let mut errors = vec![
            err(None, None, ErrorCode::EofInTag),
            err(Some(2), Some(1), ErrorCode::EofInComment),
            err(Some(1), Some(9), ErrorCode::UnexpectedEndTag),
            err(Some(1), Some(2), ErrorCode::EofInDoctype),
        ];
        sort_by_position(&mut errors);
        let codes: Vec<_> = errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::EofInDoctype,
                ErrorCode::UnexpectedEndTag,
                ErrorCode::EofInComment,
                ErrorCode::EofInTag,
            ]
        );
    }

    #[test]
    fn sort_is_stable_for_equal_positions() {
        let mut errors = vec![
            err(Some(1), Some(1), ErrorCode::EofInComment),
            err(Some(1), Some(1), ErrorCode::UnexpectedEndTag),
        ];
        sort_by_position(&mut errors);
        assert_eq!(errors[0].code, ErrorCode::EofInComment);
        assert_eq!(errors[1].code, ErrorCode::UnexpectedEndTag);
    }

    #[test]
    fn display_includes_origin_code_and_position() {
        let e = err(Some(3), Some(7), ErrorCode::EofInComment);
        assert_eq!(e.to_string(), "tokenizer error: eof-in-comment at 3:7");
    }
}
