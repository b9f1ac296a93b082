//! Reference identity backend with simulated latency and a fixed test code.
//!
//! Stands in for a real identity provider during local development and in
//! tests. The permissive five-digit fallback reproduces the reference
//! behavior for local use only; it is not part of the [`IdentityBackend`]
//! contract and [`MockIdentityBackend::strict`] disables it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use rand::{RngCore, rngs::OsRng};
use regex::Regex;
use tokio::time::sleep;
use tracing::debug;

use super::{ChallengeAccepted, IdentityBackend, ProviderIdentity, VerifiedChallenge};
use crate::error::AuthError;

/// Universal test code accepted by the mock.
pub const TEST_CODE: &str = "12345";

/// Placeholder identity returned by the mock provider exchange.
pub const PROVIDER_EMAIL: &str = "user@gmail.com";

const SEND_DELAY: Duration = Duration::from_millis(1000);
const VERIFY_DELAY: Duration = Duration::from_millis(1000);
const PROVIDER_DELAY: Duration = Duration::from_millis(1500);

/// Basic email format check: non-empty local part, `@`, domain with a dot.
fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

/// Whether the code is exactly five ASCII digits.
fn five_digit_code(code: &str) -> bool {
    code.len() == 5 && code.bytes().all(|byte| byte.is_ascii_digit())
}

/// Create a fresh opaque session token.
/// Random, never validated by the client; only its presence matters here.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Mock [`IdentityBackend`] holding at most one outstanding challenge.
///
/// Per-operation call counters are exposed so tests can assert that an
/// operation never reached the backend.
pub struct MockIdentityBackend {
    accepted_code: String,
    permissive: bool,
    send_delay: Duration,
    verify_delay: Duration,
    provider_delay: Duration,
    outstanding: Mutex<Option<String>>,
    send_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    provider_calls: AtomicUsize,
}

impl MockIdentityBackend {
    /// Reference behavior: accepts [`TEST_CODE`] or any five-digit code, with
    /// simulated network delays.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accepted_code: TEST_CODE.to_string(),
            permissive: true,
            send_delay: SEND_DELAY,
            verify_delay: VERIFY_DELAY,
            provider_delay: PROVIDER_DELAY,
            outstanding: Mutex::new(None),
            send_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            provider_calls: AtomicUsize::new(0),
        }
    }

    /// Like [`MockIdentityBackend::new`] but accepts only the configured code,
    /// matching what a real backend must do.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            permissive: false,
            ..Self::new()
        }
    }

    /// Overrides the simulated delays; tests usually pass `Duration::ZERO`.
    #[must_use]
    pub fn with_delays(mut self, send: Duration, verify: Duration, provider: Duration) -> Self {
        self.send_delay = send;
        self.verify_delay = verify;
        self.provider_delay = provider;
        self
    }

    /// Overrides the accepted code.
    #[must_use]
    pub fn with_accepted_code(mut self, code: impl Into<String>) -> Self {
        self.accepted_code = code.into();
        self
    }

    /// Number of `send_challenge` calls received.
    #[must_use]
    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::Relaxed)
    }

    /// Number of `verify_challenge` calls received.
    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::Relaxed)
    }

    /// Number of provider exchanges received.
    #[must_use]
    pub fn provider_calls(&self) -> usize {
        self.provider_calls.load(Ordering::Relaxed)
    }

    fn outstanding(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.outstanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockIdentityBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityBackend for MockIdentityBackend {
    async fn send_challenge(&self, email: &str) -> Result<ChallengeAccepted, AuthError> {
        self.send_calls.fetch_add(1, Ordering::Relaxed);
        sleep(self.send_delay).await;

        let email = email.trim();
        if !valid_email(email) {
            return Err(AuthError::validation());
        }

        // A resend replaces any previous challenge, including one for a
        // different email.
        *self.outstanding() = Some(email.to_string());
        debug!("challenge issued");

        Ok(ChallengeAccepted {
            email: email.to_string(),
            message: "OTP sent successfully".to_string(),
        })
    }

    async fn verify_challenge(&self, code: &str) -> Result<VerifiedChallenge, AuthError> {
        self.verify_calls.fetch_add(1, Ordering::Relaxed);
        sleep(self.verify_delay).await;

        let mut outstanding = self.outstanding();
        if outstanding.is_none() {
            return Err(AuthError::invalid_code_with("No pending verification found"));
        }

        let code = code.trim();
        let accepted = code == self.accepted_code || (self.permissive && five_digit_code(code));
        if !accepted {
            return Err(AuthError::invalid_code_with("Invalid OTP code"));
        }

        *outstanding = None;
        debug!("challenge verified");
        Ok(VerifiedChallenge {
            token: generate_token(),
        })
    }

    async fn authenticate_with_provider(&self) -> Result<ProviderIdentity, AuthError> {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
        sleep(self.provider_delay).await;

        // A provider sign-in abandons whatever challenge was outstanding.
        *self.outstanding() = None;
        debug!("provider exchange completed");

        Ok(ProviderIdentity {
            email: PROVIDER_EMAIL.to_string(),
            token: generate_token(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        MockIdentityBackend, PROVIDER_EMAIL, TEST_CODE, five_digit_code, generate_token,
        valid_email,
    };
    use crate::backend::IdentityBackend;
    use crate::error::AuthError;
    use anyhow::Result;
    use std::time::Duration;

    fn instant_mock() -> MockIdentityBackend {
        MockIdentityBackend::new().with_delays(
            Duration::ZERO,
            Duration::ZERO,
            Duration::ZERO,
        )
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
        assert!(!valid_email("missing-dot@example"));
        assert!(!valid_email(""));
    }

    #[test]
    fn five_digit_code_requires_exactly_five_digits() {
        assert!(five_digit_code("00000"));
        assert!(five_digit_code("98765"));
        assert!(!five_digit_code("1234"));
        assert!(!five_digit_code("123456"));
        assert!(!five_digit_code("12a45"));
    }

    #[test]
    fn generated_tokens_are_fresh_and_non_empty() {
        let first = generate_token();
        let second = generate_token();
        assert!(!first.is_empty());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn send_challenge_rejects_invalid_email() -> Result<()> {
        let mock = instant_mock();
        let err = mock.send_challenge("not-an-email").await.unwrap_err();
        assert_eq!(err, AuthError::validation());
        assert_eq!(mock.send_calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn verify_without_outstanding_challenge_fails() -> Result<()> {
        let mock = instant_mock();
        let err = mock.verify_challenge(TEST_CODE).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::invalid_code_with("No pending verification found")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_code_verifies_outstanding_challenge() -> Result<()> {
        let mock = instant_mock();
        mock.send_challenge("a@b.com").await?;
        let verified = mock.verify_challenge(TEST_CODE).await?;
        assert!(!verified.token.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn challenge_is_consumed_on_success() -> Result<()> {
        let mock = instant_mock();
        mock.send_challenge("a@b.com").await?;
        mock.verify_challenge(TEST_CODE).await?;
        let err = mock.verify_challenge(TEST_CODE).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::invalid_code_with("No pending verification found")
        );
        Ok(())
    }

    #[tokio::test]
    async fn permissive_mode_accepts_any_five_digit_code() -> Result<()> {
        let mock = instant_mock();
        mock.send_challenge("a@b.com").await?;
        assert!(mock.verify_challenge("98765").await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn strict_mode_rejects_unconfigured_codes() -> Result<()> {
        let mock = MockIdentityBackend::strict().with_delays(
            Duration::ZERO,
            Duration::ZERO,
            Duration::ZERO,
        );
        mock.send_challenge("a@b.com").await?;
        let err = mock.verify_challenge("98765").await.unwrap_err();
        assert_eq!(err, AuthError::invalid_code_with("Invalid OTP code"));
        assert!(mock.verify_challenge(TEST_CODE).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn wrong_code_keeps_challenge_outstanding() -> Result<()> {
        let mock = instant_mock();
        mock.send_challenge("a@b.com").await?;
        assert!(mock.verify_challenge("abcde").await.is_err());
        assert!(mock.verify_challenge(TEST_CODE).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn provider_exchange_returns_placeholder_identity() -> Result<()> {
        let mock = instant_mock();
        let identity = mock.authenticate_with_provider().await?;
        assert_eq!(identity.email, PROVIDER_EMAIL);
        assert!(!identity.token.is_empty());
        assert_eq!(mock.provider_calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn provider_exchange_abandons_outstanding_challenge() -> Result<()> {
        let mock = instant_mock();
        mock.send_challenge("a@b.com").await?;
        mock.authenticate_with_provider().await?;
        let err = mock.verify_challenge(TEST_CODE).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::invalid_code_with("No pending verification found")
        );
        Ok(())
    }
}
