//! k-anonymity hash derivation
//!
//! A password is reduced to an uppercase hex SHA-1 digest split into a
//! 5-character prefix and 35-character suffix. Only the prefix ever leaves
//! the process; the suffix is matched locally against the range response.

use crate::error::{BreachResult, CheckError};
use sha1::{Digest, Sha1};
use std::fmt;

/// Length of the hash prefix sent to the range API
pub const PREFIX_LEN: usize = 5;

/// Ephemeral k-anonymity split of a password hash.
///
/// Never persisted, never logged in full. `Debug` redacts the suffix so an
/// accidental `{:?}` in a log line cannot leak enough hash to brute-force
/// the password offline.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash {
    /// First 5 hex characters of the SHA-1 digest
    pub prefix: String,

    /// Remaining 35 hex characters, kept local
    pub suffix: String,
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHash")
            .field("prefix", &self.prefix)
            .field("suffix", &"[REDACTED]")
            .finish()
    }
}

/// Derive the k-anonymity hash split for a password.
///
/// Deterministic and pure. Rejects empty input.
pub fn derive(password: &str) -> BreachResult<PasswordHash> {
    if password.is_empty() {
        return Err(CheckError::InvalidInput);
    }

    let digest = Sha1::digest(password.as_bytes());
    let hex_digest = hex::encode_upper(digest);
    let (prefix, suffix) = hex_digest.split_at(PREFIX_LEN);

    Ok(PasswordHash {
        prefix: prefix.to_string(),
        suffix: suffix.to_string(),
    })
}
