//! Error types for query-string parsing.

use core::fmt::{self, Display};
use std::collections::BTreeMap;

use typebind_core::NotRegistered;

/// Message for a required parameter that was not given.
pub const MISSING_PARAMETER: &str = "missing parameter";

/// Message for a parameter that matches no record component.
pub const UNEXPECTED_PARAMETER: &str = "unexpected parameter";

/// Message for a parameter given more than once.
pub const DUPLICATE_PARAMETER: &str = "duplicate parameter";

/// Message shown in place of an internal failure.
pub const PARSE_ERROR: &str = "parse error";

/// Key under which errors about the whole parameter set are reported, such
/// as a record constructor rejecting an otherwise valid combination.
pub const ROOT: &str = "(root)";

/// Why a single string could not be parsed.
#[derive(Debug)]
pub enum ParseError {
    /// The text is not acceptable; the message is shown to the client.
    Invalid(String),
    /// Something unrelated to the input went wrong, such as a missing parser.
    /// Logged, and shown to the client as [`PARSE_ERROR`].
    Internal(Box<dyn core::error::Error + Send + Sync>),
}

impl ParseError {
    /// A client-visible failure.
    pub fn invalid(message: impl Into<String>) -> Self {
        ParseError::Invalid(message.into())
    }

    /// An internal failure.
    pub fn internal(error: impl core::error::Error + Send + Sync + 'static) -> Self {
        ParseError::Internal(Box::new(error))
    }

    /// The text shown to clients.
    pub fn client_message(&self) -> &str {
        match self {
            ParseError::Invalid(message) => message,
            ParseError::Internal(_) => PARSE_ERROR,
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Invalid(message) => f.write_str(message),
            ParseError::Internal(error) => write!(f, "internal parse error: {error}"),
        }
    }
}

impl core::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            ParseError::Invalid(_) => None,
            ParseError::Internal(error) => Some(&**error),
        }
    }
}

/// Per-parameter failures of one query string, keyed by parameter name.
///
/// Messages are already safe to show to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerystringError {
    fields: BTreeMap<String, String>,
}

impl QuerystringError {
    /// Wraps a map of parameter name to message.
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        QuerystringError { fields }
    }

    /// A single failure.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.into(), message.into());
        QuerystringError { fields }
    }

    /// The failures, ordered by parameter name.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Consumes the error, returning the failures.
    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }
}

impl Display for QuerystringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.fields.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

impl core::error::Error for QuerystringError {}

/// Everything that can go wrong turning parameters into a typed value.
#[derive(Debug)]
pub enum Error {
    /// Some parameters were missing, unexpected, repeated or unparseable
    Parameters(QuerystringError),
    /// The requested type has no query-string parser
    NotRegistered(NotRegistered),
}

impl Error {
    /// Returns true if the problem lies with the request rather than with the
    /// application.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Parameters(_))
    }

    /// Get an error code for this kind of error.
    pub const fn code(&self) -> &'static str {
        match self {
            Error::Parameters(_) => "querystring::parameters",
            Error::NotRegistered(_) => "querystring::not_registered",
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parameters(e) => write!(f, "{e}"),
            Error::NotRegistered(e) => write!(f, "{e}"),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Error::Parameters(e) => Some(e),
            Error::NotRegistered(e) => Some(e),
        }
    }
}

impl From<QuerystringError> for Error {
    fn from(e: QuerystringError) -> Self {
        Error::Parameters(e)
    }
}

impl From<NotRegistered> for Error {
    fn from(e: NotRegistered) -> Self {
        Error::NotRegistered(e)
    }
}
