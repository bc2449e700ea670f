//! Error types.
//!
//! [`RouteError`] is raised at startup for a malformed or conflicting route.
//! [`DispatchError`] means no route matched or a pipeline step reported a
//! [`Failure`]. [`Error`] covers binding and configuration.
//!
//! Mapping a [`DispatchError`] onto a status code is the server's job, not the router's.

use http::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;
use crate::middleware::Phase;

/// The value a controller or middleware returns when it refuses to continue.
///
/// The optional status is a hint for whoever writes the wire response. The
/// router itself never looks at it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct Failure {
    message: String,
    status: Option<StatusCode>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), status: None }
    }

    /// A failure that should surface with `status` (e.g. `401` from an auth check).
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self { message: message.into(), status: Some(status) }
    }

    pub fn message(&self) -> &str { &self.message }
    pub fn status(&self) -> Option<StatusCode> { self.status }
}

impl From<serde_json::Error> for Failure {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Result type of controllers and middleware.
pub type Outcome = Result<(), Failure>;

/// Why a dispatched request produced no response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// No node matches the path, or the node has no handler for the method.
    /// The two cases are deliberately indistinguishable.
    #[error("not found")]
    NotFound,

    #[error("{phase} middleware failed: {failure}")]
    Middleware { phase: Phase, failure: Failure },

    #[error("controller failed: {0}")]
    Controller(Failure),
}

impl DispatchError {
    /// The failure a pipeline step produced, if any.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::NotFound => None,
            Self::Middleware { failure, .. } | Self::Controller(failure) => Some(failure),
        }
    }
}

/// A route that cannot be added to the tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// A level already has a parameter child under another name. Only one
    /// parameter child per level can take part in matching.
    #[error("route `{path}`: parameter `:{new}` conflicts with existing `:{existing}`")]
    ConflictingParameter { path: String, existing: String, new: String },

    #[error("route `{path}`: parameter segment has no name")]
    EmptyParameterName { path: String },
}

/// Infrastructure failures: binding a port, accepting connections, loading config.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}
