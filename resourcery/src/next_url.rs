//! The "next URL" redirect convention.
//!
//! Create, update and destroy redirect to a caller-chosen URL carried across
//! the flow in the session, with a per-request `next` field taking precedence
//! over the stored value.

use crate::session::SessionHandle;

/// The reserved session key holding the pending redirect target.
pub const NEXT_KEY: &str = "next";

/// Store a pending redirect target.
pub fn stash(session: &SessionHandle, url: &str) {
    session.insert(NEXT_KEY, url.to_owned());
}

/// Resolve the pending redirect target.
///
/// The session slot is popped unconditionally, so stale state never leaks
/// into a later flow; a non-empty `request_next` wins over the popped value.
/// When neither is present, `default` is returned.
pub fn pop_resolved(
    session: &SessionHandle,
    request_next: Option<&str>,
    default: Option<&str>,
) -> Option<String> {
    let stashed = session.remove(NEXT_KEY).filter(|url| !url.is_empty());

    match request_next.filter(|url| !url.is_empty()) {
        Some(url) => Some(url.to_owned()),
        None => stashed.or_else(|| default.map(str::to_owned)),
    }
}
