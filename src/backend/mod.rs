//! Identity backend capability the session machine depends on.
//!
//! The machine only sees pass/fail outcomes; challenge codes live entirely
//! behind this trait. The reference implementation is [`MockIdentityBackend`];
//! a real identity provider is a drop-in replacement.

mod mock;

pub use mock::{MockIdentityBackend, PROVIDER_EMAIL, TEST_CODE};

use async_trait::async_trait;

use crate::error::AuthError;

/// Acknowledgement that a challenge was issued for an email.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChallengeAccepted {
    /// The address the challenge was sent to, as accepted by the backend.
    pub email: String,
    /// Human-readable confirmation for the UI.
    pub message: String,
}

/// Successful challenge verification.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerifiedChallenge {
    /// Fresh opaque session token.
    pub token: String,
}

/// Identity asserted by a third-party provider exchange.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProviderIdentity {
    /// Provider-asserted email address.
    pub email: String,
    /// Fresh opaque session token.
    pub token: String,
}

/// External identity provider: challenge issuance, verification, and
/// third-party sign-in.
///
/// All operations are async and safely repeatable; the only backend state is
/// the single outstanding challenge, which a repeated `send_challenge`
/// replaces.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Issues a one-time code for `email` after validating its format.
    ///
    /// On success the backend expects a `verify_challenge` call for that
    /// email. Fails with [`AuthError::Validation`] on a malformed address.
    async fn send_challenge(&self, email: &str) -> Result<ChallengeAccepted, AuthError>;

    /// Consumes the outstanding challenge if `code` matches.
    ///
    /// Fails with [`AuthError::InvalidCode`] when no challenge is outstanding
    /// or the code does not match.
    async fn verify_challenge(&self, code: &str) -> Result<VerifiedChallenge, AuthError>;

    /// Performs the third-party sign-in exchange and returns the asserted
    /// identity. Fails with [`AuthError::Provider`] when the exchange fails.
    async fn authenticate_with_provider(&self) -> Result<ProviderIdentity, AuthError>;
}

#[async_trait]
impl<B: IdentityBackend + ?Sized> IdentityBackend for std::sync::Arc<B> {
    async fn send_challenge(&self, email: &str) -> Result<ChallengeAccepted, AuthError> {
        (**self).send_challenge(email).await
    }

    async fn verify_challenge(&self, code: &str) -> Result<VerifiedChallenge, AuthError> {
        (**self).verify_challenge(code).await
    }

    async fn authenticate_with_provider(&self) -> Result<ProviderIdentity, AuthError> {
        (**self).authenticate_with_provider().await
    }
}
