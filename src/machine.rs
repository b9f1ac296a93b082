//! The login state machine: anonymous → pending verification → authenticated.
//!
//! Holds the single tab-scoped [`Session`], persists it through a
//! [`SessionStore`], and drives an [`IdentityBackend`] for challenge delivery
//! and verification. Mutating operations acquire an in-flight marker first,
//! so a concurrent call fails with [`AuthError::OperationInProgress`] instead
//! of racing; at most one result ever mutates state.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::{ChallengeAccepted, IdentityBackend, ProviderIdentity};
use crate::error::AuthError;
use crate::session::{AuthMethod, Session, SessionStatus};
use crate::store::{
    AUTH_KEYS, AUTH_METHOD_KEY, AUTH_TOKEN_KEY, PENDING_EMAIL_KEY, SessionStore, USER_EMAIL_KEY,
};

/// Normalize an email before any backend contact or persistence.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Releases the in-flight marker when the operation completes, including on
/// early return.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The authentication session state machine.
///
/// One instance per tab. Construct it, call [`restore_session`] once before
/// making authorization decisions, then hand the instance (or an `Arc` of it)
/// to the UI layer.
///
/// [`restore_session`]: AuthSessionMachine::restore_session
pub struct AuthSessionMachine<S, B> {
    store: S,
    backend: B,
    session: Mutex<Session>,
    in_flight: AtomicBool,
    timeout: Option<Duration>,
}

impl<S: SessionStore, B: IdentityBackend> AuthSessionMachine<S, B> {
    #[must_use]
    pub fn new(store: S, backend: B) -> Self {
        Self {
            store,
            backend,
            session: Mutex::new(Session::Anonymous),
            in_flight: AtomicBool::new(false),
            timeout: None,
        }
    }

    /// Bounds every backend call; a slow backend then surfaces
    /// [`AuthError::Timeout`] instead of hanging the caller indefinitely.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Rebuilds the session from the store without contacting the backend.
    ///
    /// Run once at startup, before dependent UI makes authorization
    /// decisions. Returns the restored status so callers can route on it.
    pub fn restore_session(&self) -> SessionStatus {
        let session = if let Some(token) = self.store.get(AUTH_TOKEN_KEY) {
            let email = self.store.get(USER_EMAIL_KEY).unwrap_or_default();
            let method = AuthMethod::from_stored(self.store.get(AUTH_METHOD_KEY).as_deref());
            Session::Authenticated {
                email,
                token,
                method,
            }
        } else if let Some(email) = self.store.get(PENDING_EMAIL_KEY) {
            Session::PendingVerification { email }
        } else {
            Session::Anonymous
        };

        let status = session.status();
        *self.session_guard() = session;
        debug!(?status, "session restored from store");
        status
    }

    /// Sends (or resends) a one-time code to `email` and enters
    /// `PendingVerification`.
    ///
    /// An input that is empty after trimming fails with
    /// [`AuthError::EmptyInput`] before any backend contact. Legal from any
    /// state: a repeat call replaces the outstanding challenge (resend, or a
    /// different email), and a call while authenticated discards the
    /// authenticated session in favor of the new pending one.
    pub async fn initiate_challenge(&self, email: &str) -> Result<ChallengeAccepted, AuthError> {
        let _guard = self.begin_operation()?;

        if email.trim().is_empty() {
            return Err(AuthError::EmptyInput);
        }
        let email = normalize_email(email);

        let accepted = match self.bounded(self.backend.send_challenge(&email)).await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "challenge request rejected");
                return Err(err);
            }
        };

        self.store.clear(&[AUTH_TOKEN_KEY, USER_EMAIL_KEY, AUTH_METHOD_KEY]);
        self.store.set(PENDING_EMAIL_KEY, &email);
        *self.session_guard() = Session::PendingVerification { email };
        info!("challenge issued, awaiting verification");
        Ok(accepted)
    }

    /// Verifies the submitted code and finalizes the session.
    ///
    /// Fails with [`AuthError::InvalidState`] unless a verification is
    /// pending. On success the authenticated email is the previously stored
    /// pending email; the backend only reports pass/fail plus a token. On
    /// failure the pending state is untouched so the user can retry or
    /// resend. The machine buffers no partial code input.
    pub async fn verify_code(&self, code: &str) -> Result<(), AuthError> {
        let _guard = self.begin_operation()?;

        let email = match &*self.session_guard() {
            Session::PendingVerification { email } => email.clone(),
            _ => return Err(AuthError::InvalidState),
        };

        let verified = match self.bounded(self.backend.verify_challenge(code)).await {
            Ok(verified) => verified,
            Err(err) => {
                warn!(error = %err, "code verification failed");
                return Err(err);
            }
        };

        self.store.set(AUTH_TOKEN_KEY, &verified.token);
        self.store.set(USER_EMAIL_KEY, &email);
        self.store.set(AUTH_METHOD_KEY, AuthMethod::Otp.as_str());
        self.store.remove(PENDING_EMAIL_KEY);
        *self.session_guard() = Session::Authenticated {
            email,
            token: verified.token,
            method: AuthMethod::Otp,
        };
        info!(method = AuthMethod::Otp.as_str(), "session authenticated");
        Ok(())
    }

    /// Signs in through the third-party identity provider, from any state.
    ///
    /// A pending challenge is abandoned: its store key is cleared along with
    /// the transition. Returns the provider-asserted identity.
    pub async fn authenticate_with_provider(&self) -> Result<ProviderIdentity, AuthError> {
        let _guard = self.begin_operation()?;

        let identity = match self.bounded(self.backend.authenticate_with_provider()).await {
            Ok(identity) => identity,
            Err(err) => {
                warn!(error = %err, "provider exchange failed");
                return Err(err);
            }
        };

        self.store.remove(PENDING_EMAIL_KEY);
        self.store.set(AUTH_TOKEN_KEY, &identity.token);
        self.store.set(USER_EMAIL_KEY, &identity.email);
        self.store.set(AUTH_METHOD_KEY, AuthMethod::Google.as_str());
        *self.session_guard() = Session::Authenticated {
            email: identity.email.clone(),
            token: identity.token.clone(),
            method: AuthMethod::Google,
        };
        info!(method = AuthMethod::Google.as_str(), "session authenticated");
        Ok(identity)
    }

    /// Clears every persisted auth key and returns to `Anonymous`.
    /// Idempotent and unconditional; logging out an anonymous session is a
    /// no-op.
    pub fn logout(&self) {
        self.store.clear(&AUTH_KEYS);
        *self.session_guard() = Session::Anonymous;
        debug!("session cleared");
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session_guard().clone()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.session_guard().status()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session_guard().is_authenticated()
    }

    /// Whether a mutating operation is currently in flight. The UI can read
    /// this instead of tracking its own loading flags.
    #[must_use]
    pub fn operation_in_progress(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin_operation(&self) -> Result<InFlightGuard<'_>, AuthError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(AuthError::OperationInProgress);
        }
        Ok(InFlightGuard(&self.in_flight))
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, AuthError>>,
    ) -> Result<T, AuthError> {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(AuthError::Timeout),
            },
            None => call.await,
        }
    }

    fn session_guard(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
