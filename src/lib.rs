//! Passwordless authentication session core for the Draftflow client.
//!
//! A user submits an email, receives a one-time code, verifies it, and
//! obtains an authenticated session; a Google-identity path short-circuits
//! directly to an authenticated session. This crate owns the session state
//! machine, its persistence, and its error classification; page layout and
//! routing live in the UI layer, which calls the operations here and reads
//! the exposed [`Session`].
//!
//! - [`AuthSessionMachine`] — the state machine and protocol logic.
//! - [`SessionStore`] / [`MemorySessionStore`] — tab-scoped key/value
//!   persistence of session fields.
//! - [`IdentityBackend`] / [`MockIdentityBackend`] — the external identity
//!   provider contract and its reference mock.
//! - [`AuthError`] — the recoverable error taxonomy.

mod backend;
mod error;
mod machine;
mod session;
mod store;

pub use backend::{
    ChallengeAccepted, IdentityBackend, MockIdentityBackend, PROVIDER_EMAIL, ProviderIdentity,
    TEST_CODE, VerifiedChallenge,
};
pub use error::AuthError;
pub use machine::AuthSessionMachine;
pub use session::{AuthMethod, Session, SessionStatus};
pub use store::{
    AUTH_KEYS, AUTH_METHOD_KEY, AUTH_TOKEN_KEY, MemorySessionStore, PENDING_EMAIL_KEY,
    SessionStore, USER_EMAIL_KEY,
};
