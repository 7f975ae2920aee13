use thiserror::Error;

use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
}

/// Failures reported by a backend operation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<FlowTransitionError> for ApplicationError {
    fn from(value: FlowTransitionError) -> Self {
        Self::Domain(DomainError::FlowTransition(value))
    }
}

impl ApplicationError {
    /// Detail shown to the user inside the chat error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(error) => error.to_string(),
            Self::Domain(_) => {
                "We could not complete your request with the details provided.".to_owned()
            }
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain",
            Self::Backend(BackendError::InvalidRequest(_)) => "invalid_request",
            Self::Backend(BackendError::Unavailable(_)) => "backend_unavailable",
        }
    }
}
