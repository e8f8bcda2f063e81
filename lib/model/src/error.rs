use thiserror::Error;

/// Raised when a string does not name one of the [`NodeKind`](crate::NodeKind)s.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not a known node kind")]
pub struct UnknownNodeKindError(pub String);

/// Raised when a lexical form cannot be read as an `xsd:dateTime` or `xsd:date`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not a valid date time")]
pub struct DateTimeParseError(pub String);
