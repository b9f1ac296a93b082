//! The tab-scoped identity record: who is signed in, how, and what is pending.
//!
//! `Session` is an enum so each status carries exactly the fields that are
//! legal for it; a pending email can never coexist with an authenticated
//! token.

/// How the current session was authenticated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthMethod {
    /// Email one-time-code verification.
    Otp,
    /// Third-party identity provider (Google).
    Google,
}

impl AuthMethod {
    /// The string persisted under the `authMethod` key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Otp => "otp",
            Self::Google => "google",
        }
    }

    /// Classify a persisted method string. Missing or unrecognized values fall
    /// back to `Otp`, matching sessions written before the method was stored.
    pub(crate) fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("google") => Self::Google,
            _ => Self::Otp,
        }
    }
}

/// The three reachable session states.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionStatus {
    Anonymous,
    PendingVerification,
    Authenticated,
}

/// Authoritative identity state for the current browser tab.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Session {
    /// No sign-in attempt underway.
    Anonymous,
    /// A challenge was sent to `email` and awaits verification.
    PendingVerification { email: String },
    /// A verified session holding the proof-of-verification token.
    Authenticated {
        email: String,
        token: String,
        method: AuthMethod,
    },
}

impl Session {
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Anonymous => SessionStatus::Anonymous,
            Self::PendingVerification { .. } => SessionStatus::PendingVerification,
            Self::Authenticated { .. } => SessionStatus::Authenticated,
        }
    }

    /// Email awaiting verification, if any.
    #[must_use]
    pub fn pending_email(&self) -> Option<&str> {
        match self {
            Self::PendingVerification { email } => Some(email),
            _ => None,
        }
    }

    /// Verified identity, if authenticated.
    #[must_use]
    pub fn authenticated_email(&self) -> Option<&str> {
        match self {
            Self::Authenticated { email, .. } => Some(email),
            _ => None,
        }
    }

    /// Opaque session token, if authenticated.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }

    /// Method used to authenticate, if authenticated.
    #[must_use]
    pub fn auth_method(&self) -> Option<AuthMethod> {
        match self {
            Self::Authenticated { method, .. } => Some(*method),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::Anonymous
    }
}
