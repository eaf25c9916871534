//! Short relay codes derived from the live token.
//!
//! A code is a convenience for reading a token aloud or typing it on another
//! machine. It carries no capability of its own: it only resolves while the
//! token it was derived from is still the live one.

use sha2::{Digest, Sha256};
use sshpair_core::{PairError, PairResult};

/// Characters in a relay code.
pub const CODE_LEN: usize = 8;

/// First [`CODE_LEN`] lowercase hex characters of SHA-256(token).
pub fn derive_code(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut code = hex::encode(digest);
    code.truncate(CODE_LEN);
    code
}

/// Whether `code` is shaped like a relay code (length and alphabet only).
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN && code.chars().all(|c| c.is_ascii_hexdigit())
}

/// Map a code back to `current_token` if it was derived from it.
pub fn resolve<'a>(code: &str, current_token: &'a str) -> PairResult<&'a str> {
    let code = code.trim().to_ascii_lowercase();
    if is_well_formed(&code) && code == derive_code(current_token) {
        Ok(current_token)
    } else {
        Err(PairError::NotFound("unknown or stale code".into()))
    }
}
