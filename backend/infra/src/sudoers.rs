//! Sudoers fragments on disk, checked with `visudo`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use sshpair_core::{PairError, PairResult, SudoersWriter};

pub const DEFAULT_SUDOERS_DIR: &str = "/etc/sudoers.d";
pub const DEFAULT_VISUDO: &str = "visudo";

#[derive(Debug, Clone)]
pub struct SystemSudoers {
    dir: PathBuf,
    visudo: String,
}

impl SystemSudoers {
    pub fn new(dir: impl Into<PathBuf>, visudo: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            visudo: visudo.into(),
        }
    }
}

impl Default for SystemSudoers {
    fn default() -> Self {
        Self::new(DEFAULT_SUDOERS_DIR, DEFAULT_VISUDO)
    }
}

#[async_trait]
impl SudoersWriter for SystemSudoers {
    fn directory(&self) -> &Path {
        &self.dir
    }

    async fn write(&self, path: &Path, contents: &str) -> PairResult<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o440);
        let mut file = options.open(path).await.map_err(|e| write_failed(path, e))?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| write_failed(path, e))?;
        file.sync_all().await.map_err(|e| write_failed(path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, std::fs::Permissions::from_mode(0o440))
                .await
                .map_err(|e| write_failed(path, e))?;
        }
        Ok(())
    }

    async fn check(&self, path: &Path) -> PairResult<()> {
        let output = Command::new(&self.visudo)
            .arg("-c")
            .arg("-f")
            .arg(path)
            .output()
            .await
            .map_err(|e| PairError::ValidationFailed(format!("could not run {}: {e}", self.visudo)))?;

        if output.status.success() {
            debug!(path = %path.display(), "Sudoers fragment passed syntax check");
            return Ok(());
        }
        let mut detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            if !detail.is_empty() {
                detail.push('\n');
            }
            detail.push_str(stdout.trim());
        }
        if detail.is_empty() {
            detail = format!("{} exited with {}", self.visudo, output.status);
        }
        Err(PairError::ValidationFailed(detail))
    }

    async fn activate(&self, from: &Path, to: &Path) -> PairResult<()> {
        fs::rename(from, to).await.map_err(|e| write_failed(to, e))
    }

    async fn remove(&self, path: &Path) -> PairResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(write_failed(path, e)),
        }
    }
}

fn write_failed(path: &Path, e: std::io::Error) -> PairError {
    PairError::WriteFailed(format!("{}: {e}", path.display()))
}
