//! The session storage contract.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A per-principal key/value store carried across requests.
///
/// The host owns the storage discipline (cookies, server-side store, ...);
/// this crate only reads and writes string slots through it.
pub trait Session: Send + Sync {
    /// Get the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`.
    fn insert(&self, key: &str, value: String);

    /// Remove and return the value stored under `key`.
    fn remove(&self, key: &str) -> Option<String>;
}

/// A shared handle to the session store of one request.
///
/// Hosts attach a handle to the request extensions before dispatch; requests
/// without one get a handle to no store at all, where reads come back empty
/// and writes are dropped.
#[derive(Clone)]
pub struct SessionHandle(Arc<dyn Session>);

impl SessionHandle {
    /// Wrap a session store.
    pub fn new(session: impl Session + 'static) -> Self {
        Self(Arc::new(session))
    }
}

impl Deref for SessionHandle {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self(Arc::new(NullSession))
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle").finish_non_exhaustive()
    }
}

/// The store used when the host attached none.
struct NullSession;

impl Session for NullSession {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn insert(&self, key: &str, _value: String) {
        tracing::debug!("no session store attached, dropping value for `{key}`");
    }

    fn remove(&self, _key: &str) -> Option<String> {
        None
    }
}

/// An in-memory session store.
#[derive(Debug, Default)]
pub struct MemorySession(Mutex<HashMap<String, String>>);

impl MemorySession {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Session for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        self.slots().get(key).cloned()
    }

    fn insert(&self, key: &str, value: String) {
        self.slots().insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.slots().remove(key)
    }
}
