use thiserror::Error;

use crate::rest::querybuilder::Mode;

/// Errors raised by the endpoint builder, the dispatcher and the transport.
///
/// Precondition variants are returned synchronously, before any request is
/// issued or registered. `Transport` carries the opaque failure reason and is
/// shared by every caller attached to the same pending fetch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RestError {
    /// Builder modifier or terminal called in the wrong stack mode.
    #[error("{operation}() must be called in '{expected}' mode")]
    InvalidMode {
        operation: &'static str,
        expected: Mode,
    },

    /// Builder modifier or terminal called before any segment was pushed.
    #[error("{operation}() called on an empty endpoint")]
    EmptyStack { operation: &'static str },

    /// A required parent key was absent from the filters or instance.
    #[error("{operation}: `{key}` must be supplied")]
    MissingParentKey { operation: &'static str, key: String },

    /// More than one parent key was omitted from relationship filters.
    #[error("fetchAll: too many parent keys missing from filters: {}", .keys.join(", "))]
    TooFewParentKeys { keys: Vec<String> },

    /// Every parent key was supplied to a relationship fetchAll.
    #[error("fetchAll: exactly one of the parents' keys must be omitted from filters")]
    AmbiguousParentKeys,

    /// Update or delete of an instance without an `id`.
    #[error("{operation}: `id` must be defined")]
    MissingId { operation: &'static str },

    /// Fetch method name not one of fetch, fetchAll, fetchPage.
    #[error("invalid fetch method `{0}`")]
    UnknownFetchMethod(String),

    /// fetchPage called without `$limit`.
    #[error("fetchPage: must take a `$limit`, otherwise use fetchAll")]
    MissingLimit,

    /// The transport rejected the request.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Client configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RestError>;
