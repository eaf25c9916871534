//! Log Redaction
//!
//! Scrubs SSH key material and pairing tokens from strings prior to logging.

use once_cell::sync::Lazy;
use regex::Regex;

/// Base64 payload following an SSH key type name.
static KEY_BLOB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b((?:ssh-(?:ed25519|rsa|dss)|ecdsa-sha2-nistp(?:256|384|521)|sk-[a-z0-9@.-]+))\s+[A-Za-z0-9+/]{16,}={0,3}")
        .unwrap()
});
/// 128-bit hex tokens.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[0-9a-fA-F]{32}\b").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = KEY_BLOB_RE.replace_all(input, "$1 [REDACTED_KEY]");
    TOKEN_RE
        .replace_all(&redacted, "[REDACTED_TOKEN]")
        .into_owned()
}

/// A loggable stand-in for a token: its first four characters.
pub fn token_hint(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}…")
}
