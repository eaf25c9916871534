//! File-backed `authorized_keys` store.
//!
//! Appends attributed key blocks to `~/.ssh/authorized_keys`, creating the
//! directory (0700) and file (0600) as needed. A key whose type and data are
//! already present is not appended a second time.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use sshpair_core::{AuthorizedKeyEntry, AuthorizedKeysStore, PairError, PairResult};

pub const AUTHORIZED_KEYS: &str = "authorized_keys";

pub struct FileAuthorizedKeys {
    ssh_dir: PathBuf,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileAuthorizedKeys {
    pub fn new(ssh_dir: impl Into<PathBuf>) -> Self {
        let ssh_dir = ssh_dir.into();
        let path = ssh_dir.join(AUTHORIZED_KEYS);
        Self {
            ssh_dir,
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a key with the same type and data is already authorized.
    pub async fn contains(&self, key_line: &str) -> PairResult<bool> {
        let Some(wanted) = key_identity(key_line) else {
            return Ok(false);
        };
        let existing = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(write_failed(&self.path, e)),
        };
        Ok(existing
            .lines()
            .filter(|l| !l.trim_start().starts_with('#'))
            .filter_map(key_identity)
            .any(|k| k == wanted))
    }

    async fn ensure_dir(&self) -> PairResult<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(&self.ssh_dir)
            .await
            .map_err(|e| write_failed(&self.ssh_dir, e))
    }
}

#[async_trait]
impl AuthorizedKeysStore for FileAuthorizedKeys {
    async fn append(&self, entry: &AuthorizedKeyEntry) -> PairResult<()> {
        let _guard = self.write_lock.lock().await;

        if self.contains(&entry.key_line).await? {
            info!(path = %self.path.display(), "Key already authorized; not appending again");
            return Ok(());
        }

        self.ensure_dir().await?;

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options
            .open(&self.path)
            .await
            .map_err(|e| write_failed(&self.path, e))?;

        // One write call per entry so concurrent appenders never interleave lines.
        file.write_all(entry.render().as_bytes())
            .await
            .map_err(|e| write_failed(&self.path, e))?;
        file.sync_data().await.map_err(|e| write_failed(&self.path, e))?;

        tighten_permissions(&self.ssh_dir, &self.path).await;
        debug!(path = %self.path.display(), "Appended authorized key");
        Ok(())
    }
}

/// `(type, data)` of a plain `<type> <data> [comment]` line. Lines with an
/// options prefix never match, which only means a possible duplicate.
fn key_identity(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    Some((parts.next()?, parts.next()?))
}

#[cfg(unix)]
async fn tighten_permissions(dir: &Path, file: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)).await;
    let _ = fs::set_permissions(file, std::fs::Permissions::from_mode(0o600)).await;
}

#[cfg(not(unix))]
async fn tighten_permissions(_dir: &Path, _file: &Path) {}

fn write_failed(path: &Path, e: std::io::Error) -> PairError {
    PairError::WriteFailed(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sshpair_core::PeerInfo;

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOXLI4WbeZ31Yzi03gTECtdFJcODXbPrdYScFyUwZcYh user@host";

    fn entry(key: &str) -> AuthorizedKeyEntry {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let peer = PeerInfo { user: Some("alice".into()), host: Some("laptop".into()) };
        AuthorizedKeyEntry::new(at, &peer, key)
    }

    #[tokio::test]
    async fn creates_ssh_dir_and_appends() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileAuthorizedKeys::new(tmp.path().join(".ssh"));

        store.append(&entry(KEY)).await.unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            text,
            format!("\n# sshpair 2023-11-14T22:13:20.000Z alice@laptop\n{KEY}\n")
        );
    }

    #[tokio::test]
    async fn keeps_existing_content() {
        let tmp = tempfile::tempdir().unwrap();
        let ssh = tmp.path().join(".ssh");
        std::fs::create_dir_all(&ssh).unwrap();
        std::fs::write(ssh.join(AUTHORIZED_KEYS), "ssh-rsa AAAAexisting old\n").unwrap();

        let store = FileAuthorizedKeys::new(&ssh);
        store.append(&entry(KEY)).await.unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("ssh-rsa AAAAexisting old\n"));
        assert!(text.ends_with(&format!("{KEY}\n")));
    }

    #[tokio::test]
    async fn same_key_is_not_appended_twice() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileAuthorizedKeys::new(tmp.path());

        store.append(&entry(KEY)).await.unwrap();
        let relabelled = KEY.replace("user@host", "other comment");
        store.append(&entry(&relabelled)).await.unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.matches("AAAAC3NzaC1lZDI1NTE5AAAAIOXL").count(), 1);
        assert!(store.contains(&relabelled).await.unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let store = FileAuthorizedKeys::new(tmp.path().join(".ssh"));
        store.append(&entry(KEY)).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let dir_mode = std::fs::metadata(tmp.path().join(".ssh")).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }

    #[tokio::test]
    async fn unwritable_location_reports_write_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let store = FileAuthorizedKeys::new(blocker.join(".ssh"));

        let err = store.append(&entry(KEY)).await.unwrap_err();
        assert!(matches!(err, PairError::WriteFailed(_)));
    }
}
