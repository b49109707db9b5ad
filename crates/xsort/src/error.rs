//! Error types for xsort

use std::fmt;
use thiserror::Error;

/// Position in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Span representing a range in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn at(pos: Pos) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub const fn empty() -> Self {
        Self {
            start: Pos::new(0, 0, 0),
            end: Pos::new(0, 0, 0),
        }
    }

    /// True for spans that do not point into any source text
    pub const fn is_empty(&self) -> bool {
        self.start.line == 0
    }
}

/// Broad class of an error, used by callers that only need to know which
/// stage failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The input text is not well-formed XML
    Parse,
    /// A caller-supplied argument was rejected before any work started
    InvalidArgument,
    /// A sort key could not be converted to the requested type
    KeyConversion,
}

/// Error kind for detailed categorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidToken,
    UnexpectedEof,
    MismatchedTag { expected: String, found: String },
    DuplicateAttribute { name: String },
    UnboundPrefix { prefix: String },
    InvalidEntity,
    InvalidCharacter,
    InvalidUtf8,
    MissingRoot,
    TrailingContent,
    MaxDepthExceeded { max: u16 },
    MaxSizeExceeded { max: usize },
    InvalidSortKey { key: String },
    InvalidPath { path: String },
    KeyConversion {
        parent: String,
        position: usize,
        value: String,
        target: &'static str,
        /// Why the value was rejected, when the converter can tell
        reason: Option<String>,
    },
}

impl ErrorKind {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSortKey { .. } | Self::InvalidPath { .. } => {
                ErrorCategory::InvalidArgument
            }
            Self::KeyConversion { .. } => ErrorCategory::KeyConversion,
            _ => ErrorCategory::Parse,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "invalid token"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::MismatchedTag { expected, found } => {
                write!(f, "mismatched tag: expected </{expected}>, found </{found}>")
            }
            Self::DuplicateAttribute { name } => write!(f, "duplicate attribute: {name}"),
            Self::UnboundPrefix { prefix } => write!(f, "unbound prefix: {prefix}"),
            Self::InvalidEntity => write!(f, "invalid xml entity"),
            Self::InvalidCharacter => write!(f, "invalid character"),
            Self::InvalidUtf8 => write!(f, "invalid utf-8"),
            Self::MissingRoot => write!(f, "no root element found"),
            Self::TrailingContent => write!(f, "junk after document element"),
            Self::MaxDepthExceeded { max } => write!(f, "max depth exceeded: {max}"),
            Self::MaxSizeExceeded { max } => write!(f, "max size exceeded: {max}"),
            Self::InvalidSortKey { key } => write!(f, "invalid sort key name: {key:?}"),
            Self::InvalidPath { path } => write!(f, "invalid node path: {path:?}"),
            Self::KeyConversion {
                parent,
                position,
                value,
                target,
                reason,
            } => {
                write!(
                    f,
                    "cannot convert {value:?} to {target} (child {position} of {parent})"
                )?;
                match reason {
                    Some(reason) => write!(f, ": {reason}"),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Main error type for xsort
#[derive(Error, Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    span: Span,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            span,
            message,
        }
    }

    pub fn with_message(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Create an error that does not point into the source text
    pub fn without_span(kind: ErrorKind) -> Self {
        Self::new(kind, Span::empty())
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create error at specific position
    pub fn at(kind: ErrorKind, pos: Pos) -> Self {
        Self::new(kind, Span::at(pos))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(
                f,
                "{}: line {}, column {}",
                self.message, self.span.start.line, self.span.start.col
            )
        }
    }
}

/// Result type alias for xsort
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_display() {
        let pos = Pos::new(42, 10, 5);
        assert_eq!(pos.to_string(), "10:5");
    }

    #[test]
    fn test_error_display_with_position() {
        let err = Error::at(ErrorKind::InvalidEntity, Pos::new(10, 2, 5));
        assert_eq!(err.to_string(), "invalid xml entity: line 2, column 5");
    }

    #[test]
    fn test_error_display_without_position() {
        let err = Error::without_span(ErrorKind::InvalidSortKey {
            key: "1abc".to_string(),
        });
        assert_eq!(err.to_string(), "invalid sort key name: \"1abc\"");
    }

    #[test]
    fn test_error_category() {
        let parse = Error::at(ErrorKind::MissingRoot, Pos::new(0, 1, 1));
        assert_eq!(parse.category(), ErrorCategory::Parse);

        let path = Error::without_span(ErrorKind::InvalidPath {
            path: "/abs".to_string(),
        });
        assert_eq!(path.category(), ErrorCategory::InvalidArgument);

        let conversion = Error::without_span(ErrorKind::KeyConversion {
            parent: "/root".to_string(),
            position: 2,
            value: "x".to_string(),
            target: "decimal",
            reason: None,
        });
        assert_eq!(conversion.category(), ErrorCategory::KeyConversion);
        assert!(conversion.to_string().ends_with("child 2 of /root)"));

        let with_reason = Error::without_span(ErrorKind::KeyConversion {
            parent: "/root".to_string(),
            position: 1,
            value: "May 5".to_string(),
            target: "datetime",
            reason: Some("no year".to_string()),
        });
        assert!(with_reason.to_string().ends_with("(child 1 of /root): no year"));
    }
}
