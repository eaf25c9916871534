/// Pairing service: the state machine that turns a relayed token into an
/// accepted public key.
///
/// One [`TokenManager`] lives behind a mutex. Every operation that reads or
/// moves the credential takes that lock, and a key submission holds it across
/// the authorized-keys append, so two submissions under the same token can
/// never both succeed.
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use sshpair_core::{
    AuthorizedKeyEntry, AuthorizedKeysStore, Clock, Credential, KeySubmission, LocalKeySource,
    PairError, PairResult, PeerInfo,
};

use crate::code::{derive_code, resolve};
use crate::key_format::validate;
use crate::token::{Rotation, TokenManager};

/// What a status poll reports.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub token: String,
    pub code: String,
    /// True on the first poll after a key was accepted.
    pub paired: bool,
    pub expires_in: i64,
    pub has_local_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_peer: Option<PeerInfo>,
}

/// Context handed to callers that use the token as a capability.
#[derive(Debug, Clone)]
pub struct Authorization {
    pub credential: Credential,
    pub last_peer: Option<PeerInfo>,
}

pub struct PairingService {
    tokens: Mutex<TokenManager>,
    keys: Arc<dyn AuthorizedKeysStore>,
    local_key: Arc<dyn LocalKeySource>,
    clock: Arc<dyn Clock>,
}

impl PairingService {
    pub fn new(
        ttl: Duration,
        keys: Arc<dyn AuthorizedKeysStore>,
        local_key: Arc<dyn LocalKeySource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = TokenManager::new(ttl, clock.now());
        Self {
            tokens: Mutex::new(tokens),
            keys,
            local_key,
            clock,
        }
    }

    /// Current token and code. May rotate the token (see [`TokenManager::current_if_valid`]).
    pub async fn status(&self) -> StatusSnapshot {
        let (refresh, last_peer) = {
            let mut tokens = self.tokens.lock().await;
            let now = self.clock.now();
            let refresh = tokens.current_if_valid(now);
            (refresh, tokens.last_peer().cloned())
        };
        let now = self.clock.now();

        // Looked up outside the lock: it touches the file system.
        let has_local_key = self.local_key.public_key().await.is_some();

        StatusSnapshot {
            code: derive_code(&refresh.credential.token),
            paired: refresh.rotated == Some(Rotation::Consumed),
            expires_in: refresh.credential.expires_in_secs(now),
            token: refresh.credential.token,
            has_local_key,
            last_peer,
        }
    }

    /// Resolve a relay code to the live token. Stale, expired or consumed
    /// credentials do not resolve.
    pub async fn resolve_code(&self, code: &str) -> PairResult<String> {
        let tokens = self.tokens.lock().await;
        let current = tokens.current();
        if !current.is_valid(self.clock.now()) {
            return Err(PairError::NotFound("unknown or stale code".into()));
        }
        resolve(code, &current.token).map(str::to_string)
    }

    /// Accept an accepter's public key under `token`.
    ///
    /// On success the key has been appended and the token rotated. On
    /// `WriteFailed` nothing moved and the same token may be retried.
    pub async fn submit_key(&self, token: &str, submission: KeySubmission) -> PairResult<()> {
        let mut tokens = self.tokens.lock().await;
        let now = self.clock.now();
        tokens.authorize_pairing(token, now)?;

        let raw = submission
            .pubkey
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(PairError::MissingField("pubkey"))?;
        let record = validate(raw)?;

        let peer = submission.peer();
        let entry = AuthorizedKeyEntry::new(now, &peer, record.to_line());
        if let Err(e) = self.keys.append(&entry).await {
            warn!(error = %e, "Failed to append authorized key; token left unrotated");
            return Err(e);
        }

        info!(key_type = %record.key_type, peer = %peer, "Authorized new public key");
        tokens.complete_pairing(peer, self.clock.now());
        Ok(())
    }

    /// The offerer's own public key, for accepters granting access back.
    pub async fn fetch_local_key(&self, token: &str) -> PairResult<String> {
        self.authorize(token).await?;
        self.local_key
            .public_key()
            .await
            .ok_or_else(|| PairError::NotFound("no public key found on offerer".into()))
    }

    /// Check `token` as a capability (equality and TTL only).
    pub async fn authorize(&self, token: &str) -> PairResult<Authorization> {
        let tokens = self.tokens.lock().await;
        let credential = tokens.authorize(token, self.clock.now())?.clone();
        Ok(Authorization {
            credential,
            last_peer: tokens.last_peer().cloned(),
        })
    }

    /// Drop the live token and issue a new one.
    pub async fn reset(&self) -> Credential {
        let mut tokens = self.tokens.lock().await;
        let now = self.clock.now();
        tokens.invalidate(now).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_format::tests::ED25519;
    use crate::token::DEFAULT_TTL_SECS;
    use sshpair_core::testing::{ManualClock, MemoryKeyStore, StaticLocalKey};

    struct Fixture {
        service: Arc<PairingService>,
        keys: Arc<MemoryKeyStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture_with_key(local: Option<&str>) -> Fixture {
        let keys = Arc::new(MemoryKeyStore::default());
        let clock = Arc::new(ManualClock::at_epoch());
        let service = Arc::new(PairingService::new(
            Duration::seconds(DEFAULT_TTL_SECS),
            keys.clone(),
            Arc::new(StaticLocalKey(local.map(str::to_string))),
            clock.clone(),
        ));
        Fixture { service, keys, clock }
    }

    fn fixture() -> Fixture {
        fixture_with_key(None)
    }

    fn submission(pubkey: &str) -> KeySubmission {
        KeySubmission {
            pubkey: Some(pubkey.to_string()),
            user: Some("alice".into()),
            host: Some("laptop".into()),
        }
    }

    #[tokio::test]
    async fn submit_succeeds_exactly_once() {
        let f = fixture();
        let token = f.service.status().await.token;

        f.service.submit_key(&token, submission(ED25519)).await.unwrap();
        let again = f.service.submit_key(&token, submission(ED25519)).await;

        assert_eq!(again.unwrap_err(), PairError::InvalidToken);
        let entries = f.keys.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key_line, ED25519);
        assert!(entries[0].attribution.ends_with("alice@laptop"));
    }

    #[tokio::test]
    async fn status_reports_pairing_then_moves_on() {
        let f = fixture();
        let token = f.service.status().await.token;
        f.service.submit_key(&token, submission(ED25519)).await.unwrap();

        let first = f.service.status().await;
        assert!(first.paired);
        assert_ne!(first.token, token);
        assert_eq!(first.last_peer.unwrap().user.as_deref(), Some("alice"));

        let second = f.service.status().await;
        assert!(!second.paired);
        assert_eq!(second.token, first.token);
    }

    #[tokio::test]
    async fn expired_token_is_rejected_before_key_checks() {
        let f = fixture();
        let token = f.service.status().await.token;
        f.clock.advance(Duration::seconds(DEFAULT_TTL_SECS + 1));

        let err = f.service.submit_key(&token, submission("not-a-key")).await.unwrap_err();
        assert_eq!(err, PairError::TokenExpired);
        assert!(f.keys.entries().is_empty());
    }

    #[tokio::test]
    async fn wrong_token_is_invalid() {
        let f = fixture();
        let err = f.service.submit_key("deadbeef", submission(ED25519)).await.unwrap_err();
        assert_eq!(err, PairError::InvalidToken);
    }

    #[tokio::test]
    async fn missing_and_malformed_keys() {
        let f = fixture();
        let token = f.service.status().await.token;

        let missing = KeySubmission::default();
        assert_eq!(
            f.service.submit_key(&token, missing).await.unwrap_err(),
            PairError::MissingField("pubkey")
        );
        assert!(matches!(
            f.service.submit_key(&token, submission("not-a-key")).await,
            Err(PairError::InvalidFormat(_))
        ));
        // Neither failure consumed the token.
        assert!(f.service.submit_key(&token, submission(ED25519)).await.is_ok());
    }

    #[tokio::test]
    async fn failed_append_leaves_token_usable() {
        let f = fixture();
        let token = f.service.status().await.token;
        f.keys.fail_next("disk full");

        let err = f.service.submit_key(&token, submission(ED25519)).await.unwrap_err();
        assert_eq!(err, PairError::WriteFailed("disk full".into()));
        assert_eq!(f.service.status().await.token, token);

        f.service.submit_key(&token, submission(ED25519)).await.unwrap();
        assert_eq!(f.keys.entries().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_submissions_pair_once() {
        let f = fixture();
        let token = f.service.status().await.token;

        let (a, b) = tokio::join!(
            f.service.submit_key(&token, submission(ED25519)),
            f.service.submit_key(&token, submission(ED25519)),
        );
        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| r == &Err(PairError::InvalidToken)));
        assert_eq!(f.keys.entries().len(), 1);
    }

    #[tokio::test]
    async fn code_resolves_to_live_token_only() {
        let f = fixture();
        let status = f.service.status().await;
        assert_eq!(f.service.resolve_code(&status.code).await.unwrap(), status.token);

        f.service.reset().await;
        assert!(matches!(
            f.service.resolve_code(&status.code).await,
            Err(PairError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn code_for_expired_token_does_not_resolve() {
        let f = fixture();
        let status = f.service.status().await;
        f.clock.advance(Duration::seconds(DEFAULT_TTL_SECS + 1));
        assert!(f.service.resolve_code(&status.code).await.is_err());
    }

    #[tokio::test]
    async fn local_key_requires_token_and_presence() {
        let f = fixture_with_key(Some(ED25519));
        let token = f.service.status().await.token;
        assert!(f.service.status().await.has_local_key);
        assert_eq!(f.service.fetch_local_key(&token).await.unwrap(), ED25519);
        assert_eq!(
            f.service.fetch_local_key("bogus").await.unwrap_err(),
            PairError::InvalidToken
        );

        let empty = fixture();
        let token = empty.service.status().await.token;
        assert!(matches!(
            empty.service.fetch_local_key(&token).await,
            Err(PairError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn reset_issues_new_token() {
        let f = fixture();
        let old = f.service.status().await.token;
        let new = f.service.reset().await;
        assert_ne!(new.token, old);
        assert_eq!(f.service.authorize(&old).await.unwrap_err(), PairError::InvalidToken);
    }
}
