use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The single bearer credential the offerer hands out.
///
/// A credential is valid while `now - issued_at <= ttl` and it has not been
/// consumed by a pairing. Clocks that step backwards (`now < issued_at`)
/// count as expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub ttl: Duration,
    pub paired: bool,
}

impl Credential {
    pub fn new(token: String, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self { token, issued_at, ttl, paired: false }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now - self.issued_at;
        age < Duration::zero() || age > self.ttl
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.paired && !self.is_expired(now)
    }

    /// Whole seconds left before expiry, never negative.
    pub fn expires_in_secs(&self, now: DateTime<Utc>) -> i64 {
        if self.is_expired(now) {
            return 0;
        }
        (self.ttl - (now - self.issued_at)).num_seconds().max(0)
    }
}

/// Who paired last. Kept across rotations to pre-fill sudo grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub user: Option<String>,
    pub host: Option<String>,
}

impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.user.as_deref().unwrap_or(""),
            self.host.as_deref().unwrap_or("")
        )
    }
}

/// A public key as submitted by an accepter, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeySubmission {
    pub pubkey: Option<String>,
    pub user: Option<String>,
    #[serde(alias = "hostname")]
    pub host: Option<String>,
}

impl KeySubmission {
    pub fn peer(&self) -> PeerInfo {
        PeerInfo {
            user: non_blank(self.user.as_deref()),
            host: non_blank(self.host.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// One block appended to an `authorized_keys` file: a comment line naming
/// where the key came from, then the key itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedKeyEntry {
    pub attribution: String,
    pub key_line: String,
}

impl AuthorizedKeyEntry {
    pub fn new(at: DateTime<Utc>, peer: &PeerInfo, key_line: impl Into<String>) -> Self {
        Self {
            attribution: format!(
                "sshpair {} {}",
                at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                peer
            ),
            key_line: key_line.into(),
        }
    }

    /// The exact bytes written to disk. Always one write, always newline-terminated.
    pub fn render(&self) -> String {
        format!("\n# {}\n{}\n", self.attribution, self.key_line)
    }
}
