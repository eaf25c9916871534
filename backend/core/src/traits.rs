use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::PairResult;
use crate::types::AuthorizedKeyEntry;

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The offerer's trust store. Appends must land whole or not at all.
#[async_trait]
pub trait AuthorizedKeysStore: Send + Sync {
    async fn append(&self, entry: &AuthorizedKeyEntry) -> PairResult<()>;
}

/// The offerer's own public key, if it has one.
#[async_trait]
pub trait LocalKeySource: Send + Sync {
    async fn public_key(&self) -> Option<String>;
}

/// Writes sudoers fragments and runs the external syntax checker.
#[async_trait]
pub trait SudoersWriter: Send + Sync {
    /// Directory fragments live in (e.g. `/etc/sudoers.d`).
    fn directory(&self) -> &Path;

    /// Create or truncate `path` with `contents` and mode 0440.
    async fn write(&self, path: &Path, contents: &str) -> PairResult<()>;

    /// Syntax-check a single file. `ValidationFailed` carries the checker output.
    async fn check(&self, path: &Path) -> PairResult<()>;

    /// Atomically move a checked file into place.
    async fn activate(&self, from: &Path, to: &Path) -> PairResult<()>;

    async fn remove(&self, path: &Path) -> PairResult<()>;
}

/// Whether this process may write system configuration directly.
pub trait PrivilegeProbe: Send + Sync {
    fn is_privileged(&self) -> bool;
}
