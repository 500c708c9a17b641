//! Session context for owner-partitioned collections.

use serde::{Deserialize, Serialize};

use crate::models::Record;
use crate::util::normalize_text_option;

/// Email used when no account has ever signed in on this device.
pub const FALLBACK_EMAIL: &str = "local";

/// The owner context every engine operation runs under.
///
/// There is no ambient current-user state: callers resolve a session once
/// and pass it down, so tests and multi-account tools stay honest about
/// whose rows they touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    email: String,
}

impl Session {
    /// Create a session for the given owner email.
    ///
    /// Blank input falls back to the device-local owner.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        let email = normalize_text_option(Some(email.into()))
            .unwrap_or_else(|| FALLBACK_EMAIL.to_string());
        Self { email }
    }

    /// Resolve a session from the signed-in email, falling back to the
    /// last known email, then to the device-local owner.
    #[must_use]
    pub fn resolve(signed_in: Option<String>, last_known: Option<String>) -> Self {
        let email = normalize_text_option(signed_in)
            .or_else(|| normalize_text_option(last_known))
            .unwrap_or_else(|| FALLBACK_EMAIL.to_string());
        Self { email }
    }

    /// The owner email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// True when a record belongs to this session.
    ///
    /// Rows without an owner email count as owned, so data written before
    /// any sign-in is never stranded.
    #[must_use]
    pub fn owns(&self, record: &Record) -> bool {
        record.email().is_none_or(|email| email == self.email)
    }

    /// Visibility rule for rendering: pending rows always show, synced
    /// rows only when owned.
    #[must_use]
    pub fn can_view(&self, record: &Record) -> bool {
        record.is_pending() || self.owns(record)
    }
}

/// Claim every pending row for the given session.
///
/// Rows captured while signed out (or under another account) move to the
/// account that will replay them. Returns true when anything changed.
pub fn adopt_pending(records: &mut [Record], session: &Session) -> bool {
    let mut changed = false;
    for record in records.iter_mut() {
        if record.is_pending() && record.email() != Some(session.email()) {
            record.set_email(session.email());
            changed = true;
        }
    }
    changed
}
