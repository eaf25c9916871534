//! The single active pairing credential and its rotation rules.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info};

use sshpair_core::{Credential, PairError, PairResult, PeerInfo};

/// Bytes of OS entropy per token.
pub const TOKEN_BYTES: usize = 16;

/// Default validity window.
pub const DEFAULT_TTL_SECS: i64 = 15 * 60;

/// Generate a fresh bearer token: [`TOKEN_BYTES`] random bytes, lowercase hex.
///
/// Panics if the OS entropy source is unavailable, which is not recoverable.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Why a read handed back a different token than the one that was live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// The previous token outlived its TTL.
    Expired,
    /// The previous token was used to pair a key.
    Consumed,
}

/// Result of [`TokenManager::current_if_valid`].
#[derive(Debug, Clone)]
pub struct Refresh {
    pub credential: Credential,
    pub rotated: Option<Rotation>,
}

/// Owns the one live [`Credential`].
///
/// Not synchronized on its own; callers keep it behind a mutex so that reads,
/// pairings and resets are mutually exclusive.
#[derive(Debug)]
pub struct TokenManager {
    current: Credential,
    ttl: Duration,
    last_peer: Option<PeerInfo>,
    unreported_pairing: bool,
}

impl TokenManager {
    pub fn new(ttl: Duration, now: DateTime<Utc>) -> Self {
        let current = Credential::new(generate_token(), now, ttl);
        debug!(ttl_secs = ttl.num_seconds(), "Issued initial pairing token");
        Self {
            current,
            ttl,
            last_peer: None,
            unreported_pairing: false,
        }
    }

    pub fn current(&self) -> &Credential {
        &self.current
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn last_peer(&self) -> Option<&PeerInfo> {
        self.last_peer.as_ref()
    }

    /// Replace the live credential with a new one. Clears `paired`.
    pub fn issue(&mut self, now: DateTime<Utc>) -> &Credential {
        let mut token = generate_token();
        while token == self.current.token {
            token = generate_token();
        }
        self.current = Credential::new(token, now, self.ttl);
        &self.current
    }

    /// Return the live credential, rotating first if it is expired or consumed.
    ///
    /// This is a mutating read: status polling is what advances an idle
    /// credential. A pairing that completed since the last read is reported
    /// once through `rotated == Some(Rotation::Consumed)`.
    pub fn current_if_valid(&mut self, now: DateTime<Utc>) -> Refresh {
        let mut rotated = if std::mem::take(&mut self.unreported_pairing) {
            Some(Rotation::Consumed)
        } else {
            None
        };

        if !self.current.is_valid(now) {
            let cause = if self.current.paired {
                Rotation::Consumed
            } else {
                Rotation::Expired
            };
            self.issue(now);
            debug!(?cause, "Rotated pairing token on read");
            rotated = rotated.or(Some(cause));
        }

        Refresh {
            credential: self.current.clone(),
            rotated,
        }
    }

    /// Check a presented token against the live credential.
    ///
    /// Only equality and TTL are considered; use [`Self::authorize_pairing`]
    /// when the credential must also be unconsumed.
    pub fn authorize(&self, token: &str, now: DateTime<Utc>) -> PairResult<&Credential> {
        if !constant_time_eq(token.as_bytes(), self.current.token.as_bytes()) {
            return Err(PairError::InvalidToken);
        }
        if self.current.is_expired(now) {
            return Err(PairError::TokenExpired);
        }
        Ok(&self.current)
    }

    /// Like [`Self::authorize`], but a consumed credential is rejected too.
    pub fn authorize_pairing(&self, token: &str, now: DateTime<Utc>) -> PairResult<&Credential> {
        let credential = self.authorize(token, now)?;
        if credential.paired {
            return Err(PairError::InvalidToken);
        }
        Ok(credential)
    }

    /// Mark the live credential consumed by `peer`, then rotate so it cannot be replayed.
    pub fn complete_pairing(&mut self, peer: PeerInfo, now: DateTime<Utc>) -> &Credential {
        self.current.paired = true;
        info!(peer = %peer, "Pairing completed; rotating token");
        self.last_peer = Some(peer);
        self.unreported_pairing = true;
        self.issue(now)
    }

    /// Explicit reset, independent of expiry or pairing.
    pub fn invalidate(&mut self, now: DateTime<Utc>) -> &Credential {
        info!("Pairing token reset");
        self.issue(now)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
