//! Syntactic validation of OpenSSH public key lines.
//!
//! Accepts `<key-type> <base64-blob>[ <comment>]`. The blob has to decode and
//! carry the same key-type name in its wire header; nothing cryptographic is
//! checked beyond that.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sshpair_core::{PairError, PairResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "ssh-ed25519")]
    Ed25519,
    #[serde(rename = "ssh-rsa")]
    Rsa,
    #[serde(rename = "ecdsa-sha2-nistp256")]
    EcdsaP256,
    #[serde(rename = "ecdsa-sha2-nistp384")]
    EcdsaP384,
    #[serde(rename = "ecdsa-sha2-nistp521")]
    EcdsaP521,
}

impl KeyType {
    pub const ALL: [KeyType; 5] = [
        KeyType::Ed25519,
        KeyType::Rsa,
        KeyType::EcdsaP256,
        KeyType::EcdsaP384,
        KeyType::EcdsaP521,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ssh-ed25519",
            KeyType::Rsa => "ssh-rsa",
            KeyType::EcdsaP256 => "ecdsa-sha2-nistp256",
            KeyType::EcdsaP384 => "ecdsa-sha2-nistp384",
            KeyType::EcdsaP521 => "ecdsa-sha2-nistp521",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = PairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyType::ALL
            .into_iter()
            .find(|kt| kt.as_str() == s)
            .ok_or_else(|| PairError::InvalidFormat(format!("unsupported key type '{s}'")))
    }
}

/// A validated public key line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyRecord {
    pub key_type: KeyType,
    pub blob: String,
    pub comment: Option<String>,
}

impl PublicKeyRecord {
    /// Canonical single-line form, suitable for `authorized_keys`.
    pub fn to_line(&self) -> String {
        match &self.comment {
            Some(c) => format!("{} {} {}", self.key_type, self.blob, c),
            None => format!("{} {}", self.key_type, self.blob),
        }
    }
}

impl fmt::Display for PublicKeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Collapse every run of whitespace (line breaks included) to one space.
///
/// Pasting a key through a terminal or chat client often wraps it.
pub fn normalize(candidate: &str) -> String {
    candidate.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse and check a candidate key line.
pub fn validate(candidate: &str) -> PairResult<PublicKeyRecord> {
    let normalized = normalize(candidate);
    let mut parts = normalized.splitn(3, ' ');

    let key_type: KeyType = match parts.next() {
        Some(t) if !t.is_empty() => t.parse()?,
        _ => return Err(PairError::InvalidFormat("empty key".into())),
    };
    let blob = parts
        .next()
        .ok_or_else(|| PairError::InvalidFormat("missing key data".into()))?;
    let comment = parts.next().map(str::to_string);

    check_blob(key_type, blob)?;

    Ok(PublicKeyRecord {
        key_type,
        blob: blob.to_string(),
        comment,
    })
}

fn check_blob(key_type: KeyType, blob: &str) -> PairResult<()> {
    let raw = STANDARD
        .decode(blob)
        .map_err(|e| PairError::InvalidFormat(format!("key data is not base64: {e}")))?;

    // SSH wire format: u32 big-endian length, then the key type name.
    let header: [u8; 4] = raw
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| PairError::InvalidFormat("key data too short".into()))?;
    let len = u32::from_be_bytes(header) as usize;
    let name = raw
        .get(4..4 + len)
        .ok_or_else(|| PairError::InvalidFormat("key data truncated".into()))?;

    if name != key_type.as_str().as_bytes() {
        return Err(PairError::InvalidFormat(format!(
            "key data does not match declared type {key_type}"
        )));
    }
    if raw.len() == 4 + len {
        return Err(PairError::InvalidFormat("key data has no key material".into()));
    }
    Ok(())
}
