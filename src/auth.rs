//! Shared-password gate in front of every workflow.
//!
//! Authentication yields a [`Session`] value that callers pass along; there is no
//! process-wide "logged in" flag.

use crate::utils::error::{IntelError, Result};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    secret: Option<String>,
}

/// Proof that the caller passed the gate for this run.
#[derive(Debug, Clone)]
pub struct Session {
    opened_at: DateTime<Utc>,
    authenticated: bool,
}

impl AccessGate {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.secret.is_none()
    }

    pub fn authenticate(&self, attempt: Option<&str>) -> Result<Session> {
        let Some(secret) = &self.secret else {
            tracing::debug!("No access password configured; gate is open");
            return Ok(Session::open(false));
        };

        match attempt {
            Some(attempt) if constant_time_eq(secret.as_bytes(), attempt.as_bytes()) => {
                Ok(Session::open(true))
            }
            _ => {
                tracing::warn!("🔒 Rejected access attempt");
                Err(IntelError::AccessDenied)
            }
        }
    }
}

impl Session {
    fn open(authenticated: bool) -> Self {
        Self {
            opened_at: Utc::now(),
            authenticated,
        }
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// `false` when the gate had no password configured.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
