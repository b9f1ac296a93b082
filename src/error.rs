use thiserror::Error;

/// Failures surfaced by the auth session machine and the identity backend.
///
/// Every variant is recoverable: a failed operation never partially applies a
/// transition, so callers can display the message and let the user retry.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The caller submitted an empty email; the backend is never contacted.
    #[error("Please enter your email address")]
    EmptyInput,
    /// The backend rejected the email format.
    #[error("{message}")]
    Validation { message: String },
    /// The challenge response did not match, or no challenge is outstanding.
    #[error("{message}")]
    InvalidCode { message: String },
    /// The operation was called while the machine is in an incompatible state.
    #[error("No verification is pending for this session")]
    InvalidState,
    /// The third-party identity exchange failed.
    #[error("{message}")]
    Provider { message: String },
    /// Another mutating operation is still in flight.
    #[error("Another sign-in operation is already in progress")]
    OperationInProgress,
    /// The identity backend did not respond within the configured deadline.
    #[error("The sign-in request timed out. Please try again.")]
    Timeout,
}

impl AuthError {
    /// Validation failure with the default user-facing message.
    #[must_use]
    pub fn validation() -> Self {
        Self::validation_with("Please enter a valid email address")
    }

    /// Validation failure with a backend-provided message.
    pub fn validation_with(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Code rejection with the default user-facing message.
    #[must_use]
    pub fn invalid_code() -> Self {
        Self::invalid_code_with("Invalid code. Please try again.")
    }

    /// Code rejection with a backend-provided message.
    pub fn invalid_code_with(message: impl Into<String>) -> Self {
        Self::InvalidCode {
            message: message.into(),
        }
    }

    /// Provider failure with the default user-facing message.
    #[must_use]
    pub fn provider() -> Self {
        Self::provider_with("Google authentication failed")
    }

    /// Provider failure with a backend-provided message.
    pub fn provider_with(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }
}
