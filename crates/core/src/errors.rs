use thiserror::Error;

/// Input an engine refuses before reaching any collaborator.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Failure of one engine call. Engines fold it into a failed envelope; adapters that
/// reject a request before any engine runs map it with [`ApplicationError::into_interface`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let (kind, message) = match self {
            Self::Domain(DomainError::InvalidInput(message)) => {
                (InterfaceErrorKind::BadRequest, message)
            }
            Self::Persistence(message) => (InterfaceErrorKind::ServiceUnavailable, message),
        };
        InterfaceError { kind, message, correlation_id: correlation_id.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterfaceErrorKind {
    BadRequest,
    ServiceUnavailable,
}

/// Error surfaced to HTTP callers, tagged with the request's correlation id.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{}: {message}", .kind.label())]
pub struct InterfaceError {
    pub kind: InterfaceErrorKind,
    pub message: String,
    pub correlation_id: String,
}

impl InterfaceErrorKind {
    fn label(self) -> &'static str {
        match self {
            Self::BadRequest => "bad request",
            Self::ServiceUnavailable => "service unavailable",
        }
    }
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            InterfaceErrorKind::BadRequest => {
                "The request could not be processed. Check inputs and try again."
            }
            InterfaceErrorKind::ServiceUnavailable => {
                "The service is temporarily unavailable. Please retry shortly."
            }
        }
    }
}
