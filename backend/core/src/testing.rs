//! In-memory fakes for the collaborator traits.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::{PairError, PairResult};
use crate::traits::{AuthorizedKeysStore, Clock, LocalKeySource, PrivilegeProbe, SudoersWriter};
use crate::types::AuthorizedKeyEntry;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// 2023-11-14T22:13:20Z, a fixed point for reproducible timestamps.
    pub fn at_epoch() -> Self {
        Self::new(Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *lock(&self.now) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

/// Collects appended entries; can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    entries: Mutex<Vec<AuthorizedKeyEntry>>,
    fail_with: Mutex<Option<String>>,
}

impl MemoryKeyStore {
    pub fn entries(&self) -> Vec<AuthorizedKeyEntry> {
        lock(&self.entries).clone()
    }

    pub fn fail_next(&self, reason: &str) {
        *lock(&self.fail_with) = Some(reason.to_string());
    }
}

#[async_trait]
impl AuthorizedKeysStore for MemoryKeyStore {
    async fn append(&self, entry: &AuthorizedKeyEntry) -> PairResult<()> {
        if let Some(reason) = lock(&self.fail_with).take() {
            return Err(PairError::WriteFailed(reason));
        }
        lock(&self.entries).push(entry.clone());
        Ok(())
    }
}

/// A fixed local public key (or none).
#[derive(Debug, Default, Clone)]
pub struct StaticLocalKey(pub Option<String>);

#[async_trait]
impl LocalKeySource for StaticLocalKey {
    async fn public_key(&self) -> Option<String> {
        self.0.clone()
    }
}

/// A privilege answer that never changes.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrivilege(pub bool);

impl PrivilegeProbe for FixedPrivilege {
    fn is_privileged(&self) -> bool {
        self.0
    }
}

/// Sudoers directory held in memory, with a scripted syntax-check verdict.
#[derive(Debug)]
pub struct FakeSudoers {
    dir: PathBuf,
    files: Mutex<BTreeMap<PathBuf, String>>,
    reject: Mutex<Option<String>>,
}

impl FakeSudoers {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Mutex::new(BTreeMap::new()),
            reject: Mutex::new(None),
        }
    }

    /// Every subsequent `check` fails with this checker output.
    pub fn reject_with(&self, output: &str) {
        *lock(&self.reject) = Some(output.to_string());
    }

    pub fn files(&self) -> BTreeMap<PathBuf, String> {
        lock(&self.files).clone()
    }
}

#[async_trait]
impl SudoersWriter for FakeSudoers {
    fn directory(&self) -> &Path {
        &self.dir
    }

    async fn write(&self, path: &Path, contents: &str) -> PairResult<()> {
        lock(&self.files).insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    async fn check(&self, path: &Path) -> PairResult<()> {
        if !lock(&self.files).contains_key(path) {
            return Err(PairError::ValidationFailed(format!("{}: no such file", path.display())));
        }
        match lock(&self.reject).clone() {
            Some(output) => Err(PairError::ValidationFailed(output)),
            None => Ok(()),
        }
    }

    async fn activate(&self, from: &Path, to: &Path) -> PairResult<()> {
        let mut files = lock(&self.files);
        let contents = files
            .remove(from)
            .ok_or_else(|| PairError::WriteFailed(format!("{}: no such file", from.display())))?;
        files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    async fn remove(&self, path: &Path) -> PairResult<()> {
        lock(&self.files).remove(path);
        Ok(())
    }
}
