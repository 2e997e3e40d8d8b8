//! Error types for reading and writing JSON.

use core::fmt::{self, Display};
use std::io;

use typebind_core::{DeserializeError, NotRegistered, SerializeError};

/// JSON text that could not be parsed into a value tree.
///
/// The message never depends on the wording of the parsing backend, only on
/// the kind of problem and where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// What went wrong
    pub kind: SyntaxErrorKind,
    /// 1-based line, 0 when unknown
    pub line: usize,
    /// 1-based column, 0 when unknown
    pub column: usize,
}

/// Specific kinds of [`SyntaxError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// The input was empty or only whitespace
    NoInput,
    /// The input is not JSON
    Malformed,
    /// The input is JSON, but not acceptable as a value tree, e.g. an object
    /// with a repeated key
    Invalid(String),
}

impl SyntaxError {
    /// Creates an error at a position.
    pub const fn new(kind: SyntaxErrorKind, line: usize, column: usize) -> Self {
        SyntaxError { kind, line, column }
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SyntaxErrorKind::NoInput => f.write_str("no JSON to deserialize"),
            SyntaxErrorKind::Malformed => write!(
                f,
                "syntax error in JSON at line {}, column {}",
                self.line, self.column
            ),
            SyntaxErrorKind::Invalid(message) => write!(
                f,
                "{message} at line {}, column {}",
                self.line, self.column
            ),
        }
    }
}

impl std::error::Error for SyntaxError {}

/// Everything that can go wrong between JSON text and typed values.
#[derive(Debug)]
pub enum Error {
    /// The text was not valid JSON
    Syntax(SyntaxError),
    /// The JSON did not fit the requested type
    Deserialize(DeserializeError),
    /// A value could not be represented as JSON
    Serialize(SerializeError),
    /// The requested type has no converter at all
    NotRegistered(NotRegistered),
    /// Reading or writing the underlying stream failed
    Io(io::Error),
}

impl Error {
    /// Returns true if the problem lies with the input rather than with the
    /// application: a syntax error, or a conversion failure with no internal
    /// errors in it. Such failures map to a 400-class response, everything
    /// else to a 500-class one.
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::Syntax(_) => true,
            Error::Deserialize(e) => !e.has_internal(),
            Error::Serialize(_) | Error::NotRegistered(_) | Error::Io(_) => false,
        }
    }

    /// Get an error code for this kind of error.
    pub const fn code(&self) -> &'static str {
        match self {
            Error::Syntax(_) => "json::syntax",
            Error::Deserialize(_) => "json::deserialize",
            Error::Serialize(_) => "json::serialize",
            Error::NotRegistered(_) => "json::not_registered",
            Error::Io(_) => "json::io",
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Syntax(e) => write!(f, "{e}"),
            Error::Deserialize(e) => write!(f, "{e}"),
            Error::Serialize(e) => write!(f, "{e}"),
            Error::NotRegistered(e) => write!(f, "{e}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Syntax(e) => Some(e),
            Error::Deserialize(e) => Some(e),
            Error::Serialize(e) => Some(e),
            Error::NotRegistered(e) => Some(e),
            Error::Io(e) => Some(e),
        }
    }
}

impl From<SyntaxError> for Error {
    fn from(e: SyntaxError) -> Self {
        Error::Syntax(e)
    }
}

impl From<DeserializeError> for Error {
    fn from(e: DeserializeError) -> Self {
        Error::Deserialize(e)
    }
}

impl From<SerializeError> for Error {
    fn from(e: SerializeError) -> Self {
        Error::Serialize(e)
    }
}

impl From<NotRegistered> for Error {
    fn from(e: NotRegistered) -> Self {
        Error::NotRegistered(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
