//! Tab-scoped key/value persistence for session fields.
//!
//! The store is intentionally dumb: get/set/remove of named string fields,
//! nothing else. All policy lives in the session machine, which is the only
//! writer of these keys.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Email awaiting verification.
pub const PENDING_EMAIL_KEY: &str = "pendingEmail";
/// Opaque proof of verification.
pub const AUTH_TOKEN_KEY: &str = "authToken";
/// Verified identity of the authenticated session.
pub const USER_EMAIL_KEY: &str = "userEmail";
/// `"otp"` or `"google"`.
pub const AUTH_METHOD_KEY: &str = "authMethod";

/// Every key the auth flow persists; logout clears them all.
pub const AUTH_KEYS: [&str; 4] = [
    PENDING_EMAIL_KEY,
    AUTH_TOKEN_KEY,
    USER_EMAIL_KEY,
    AUTH_METHOD_KEY,
];

/// Synchronous persistence scoped to the lifetime of the browser tab.
///
/// Operations are infallible under normal conditions; an unavailable store is
/// an environment precondition failure, not a runtime error this crate
/// classifies.
pub trait SessionStore: Send + Sync {
    /// Returns the stored value, or `None` when unset.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&self, key: &str, value: &str);

    /// Removes `key`; removing an absent key is a no-op.
    fn remove(&self, key: &str);

    /// Removes every listed key.
    fn clear(&self, keys: &[&str]) {
        for key in keys {
            self.remove(key);
        }
    }
}

impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value);
    }

    fn remove(&self, key: &str) {
        (**self).remove(key);
    }

    fn clear(&self, keys: &[&str]) {
        (**self).clear(keys);
    }
}

/// In-memory [`SessionStore`] backed by a `HashMap`.
///
/// Stands in for `sessionStorage` in tests and native hosts; values live as
/// long as the store instance, mirroring tab-lifetime semantics.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }
}
