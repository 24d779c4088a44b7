//! Local password policy validation
//!
//! Complexity requirements and personal-information checks that run
//! before any breach lookup. These are cheap, synchronous, and fully
//! local; UI layers render the per-requirement results as itemized
//! feedback.

use crate::config::PolicyConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Accepted special characters
static SPECIAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[~`!@#$%^&*()_=\-+/?><\\|{}\[\].,]").expect("invalid special regex"));

/// Per-requirement outcome of a policy validation
#[derive(Debug, Clone, Serialize)]
pub struct PolicyReport {
    /// All requirements satisfied
    pub is_valid: bool,

    /// Minimum length met
    pub length: bool,

    /// At least one uppercase letter
    pub uppercase: bool,

    /// At least one lowercase letter
    pub lowercase: bool,

    /// At least one digit
    pub digit: bool,

    /// At least one special character
    pub special: bool,

    /// Free of username/email fragments
    pub no_personal_info: bool,

    /// Human-readable messages for each failed requirement
    pub errors: Vec<String>,
}

/// Complexity and personal-info validator
pub struct PolicyValidator {
    min_length: usize,
}

impl PolicyValidator {
    /// Create a validator from configuration
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            min_length: config.min_length,
        }
    }

    /// Gate for the breach check: only passwords that meet the minimum
    /// length are worth a corpus lookup
    pub fn should_check(&self, password: &str) -> bool {
        password.chars().count() >= self.min_length
    }

    /// Validate complexity requirements and personal-info containment.
    ///
    /// Username and email matching is case-insensitive; for emails both
    /// the full address and the local part are rejected as substrings.
    pub fn validate(
        &self,
        password: &str,
        username: Option<&str>,
        email: Option<&str>,
    ) -> PolicyReport {
        let length = password.chars().count() >= self.min_length;
        let uppercase = password.chars().any(|c| c.is_ascii_uppercase());
        let lowercase = password.chars().any(|c| c.is_ascii_lowercase());
        let digit = password.chars().any(|c| c.is_ascii_digit());
        let special = SPECIAL_CHARS.is_match(password);

        let mut errors = Vec::new();
        if !length {
            errors.push(format!(
                "Password must be at least {} characters long",
                self.min_length
            ));
        }
        if !uppercase {
            errors.push("Password must contain at least one uppercase letter".to_string());
        }
        if !lowercase {
            errors.push("Password must contain at least one lowercase letter".to_string());
        }
        if !digit {
            errors.push("Password must contain at least one number".to_string());
        }
        if !special {
            errors.push("Password must contain at least one special character".to_string());
        }

        let password_lower = password.to_lowercase();
        let mut no_personal_info = true;

        if let Some(username) = username.filter(|u| !u.is_empty()) {
            if password_lower.contains(&username.to_lowercase()) {
                no_personal_info = false;
                errors.push("Password must not contain your username".to_string());
            }
        }

        if let Some(email) = email.filter(|e| !e.is_empty()) {
            let email_lower = email.to_lowercase();
            let local_part = email_lower.split('@').next().unwrap_or(&email_lower);
            if password_lower.contains(&email_lower) || password_lower.contains(local_part) {
                no_personal_info = false;
                errors.push("Password must not contain your email address".to_string());
            }
        }

        PolicyReport {
            is_valid: errors.is_empty(),
            length,
            uppercase,
            lowercase,
            digit,
            special,
            no_personal_info,
            errors,
        }
    }
}
