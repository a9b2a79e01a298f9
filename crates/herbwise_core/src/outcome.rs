//! crates/herbwise_core/src/outcome.rs
//!
//! The uniform result shape returned by every account and records operation.
//! Callers branch on the tag instead of catching errors; nothing in this
//! crate's service layer panics or returns a raw `Err` across the boundary.

use crate::ports::PortError;

/// Broad classification of an operation failure, for callers that want to
/// branch without string-matching messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally before any provider call was made.
    Validation,
    /// The identity provider or record store refused the request.
    ProviderRejected,
    /// The account exists but carries a soft-delete marker.
    SoftDeleted,
    /// The provider could not be reached at all.
    Network,
    /// A multi-step operation completed some steps and failed others.
    PartialFailure,
}

#[derive(Debug, Clone)]
pub struct OpError {
    pub kind: ErrorKind,
    pub message: String,
}

impl OpError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// The shared refusal for operations that need a live session.
    pub fn not_signed_in() -> Self {
        Self::validation("No user is signed in.")
    }
}

impl std::fmt::Display for OpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<PortError> for OpError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Network(message) => Self::new(ErrorKind::Network, message),
            other => Self::new(ErrorKind::ProviderRejected, other.to_string()),
        }
    }
}

/// The three-way result of an application operation.
///
/// `Pending` covers flows that genuinely finish later, like registration on a
/// provider that requires email confirmation first. It is neither success nor
/// failure and must be surfaced as its own state.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Pending { message: String },
    Failure(OpError),
}

impl<T> Outcome<T> {
    pub fn success(value: T) -> Self {
        Self::Success(value)
    }

    pub fn pending(message: impl Into<String>) -> Self {
        Self::Pending { message: message.into() }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure(OpError::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// The carried error, if this is a failure.
    pub fn error(&self) -> Option<&OpError> {
        match self {
            Self::Failure(err) => Some(err),
            _ => None,
        }
    }

    /// The carried value, if this is a success.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }
}

// Lets service methods finish with `port_call.await.into()`.
impl<T> From<Result<T, PortError>> for Outcome<T> {
    fn from(result: Result<T, PortError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Failure(err.into()),
        }
    }
}
