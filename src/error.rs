use thiserror::Error;

/// Failure of a single backend call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// A response arrived with a non-success status. The body is kept raw
    /// because error bodies are not guaranteed to be JSON.
    #[error("{status} {status_text}: {body}")]
    Status {
        status: u16,
        status_text: String,
        body: String,
    },

    /// No response was received.
    #[error("{0}")]
    Transport(String),

    /// A success response whose body could not be decoded.
    #[error("{0}")]
    Parse(String),
}

impl ApiError {
    /// HTTP status carried by the error, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Form input rejected before any network call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure recorded against a console operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// A newer invocation of the same operation started before this one
    /// settled; its outcome was discarded.
    #[error("superseded by a newer invocation")]
    Superseded,
}

pub type Result<T> = std::result::Result<T, OperationError>;
