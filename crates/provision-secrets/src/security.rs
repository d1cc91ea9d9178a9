//! Security utilities for credential handling
//!
//! Provides:
//! - SecureString with zeroize
//! - Exact-value redaction of known secrets in diagnostic text
//! - Heuristic error sanitization for text from external tools

use std::fmt;
use std::sync::OnceLock;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Placeholder written in place of a redacted value
pub const REDACTED: &str = "[REDACTED]";

/// A secure string that is automatically zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureString {
    inner: String,
}

impl SecureString {
    /// Create a new secure string
    pub fn new(value: String) -> Self {
        Self { inner: value }
    }

    /// Get the string value (use with caution)
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Get length
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString([REDACTED {} bytes])", self.len())
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// Replace every occurrence of each known secret in `text`.
///
/// Empty secrets are ignored so they never match everywhere.
pub fn redact<S: AsRef<str>>(text: &str, secrets: &[S]) -> String {
    let mut redacted = text.to_string();
    for secret in secrets {
        let secret = secret.as_ref();
        if !secret.is_empty() && redacted.contains(secret) {
            redacted = redacted.replace(secret, REDACTED);
        }
    }
    redacted
}

fn redaction_patterns() -> &'static [(regex::Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(regex::Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // URLs with embedded credentials
            (r"://[^/\s:@]+:[^@\s]+@", "://[REDACTED]@"),
            // Tokens and keys
            (r"(?i)token[=:]\s*[^\s]+", "token=[REDACTED]"),
            (r"(?i)password[=:]\s*[^\s]+", "password=[REDACTED]"),
            (r"(?i)secret[_-]?key[=:]\s*[^\s]+", "secret_key=[REDACTED]"),
            // Vault service tokens
            (r"\bhv[sbr]\.[A-Za-z0-9_-]{20,}", "[REDACTED_TOKEN]"),
            // Base64-looking strings (48+ chars of base64 characters)
            (r"[A-Za-z0-9+/]{48,}={0,2}", "[REDACTED_BASE64]"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            regex::Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    })
}

/// Sanitize error messages from external tools to remove values that look
/// like credentials. Applied after [`redact`], never instead of it.
pub fn sanitize_error(error: &str) -> String {
    let mut sanitized = error.to_string();
    for (re, replacement) in redaction_patterns() {
        sanitized = re.replace_all(&sanitized, *replacement).into_owned();
    }
    sanitized
}
