//! The offerer's (or accepter's) own SSH key pair.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

use sshpair_core::LocalKeySource;

/// Public key files looked up, in order of preference.
pub const PUBLIC_KEY_CANDIDATES: &[&str] = &["id_ed25519.pub", "id_rsa.pub"];

/// Reads the first non-empty public key file from an SSH directory.
#[derive(Debug, Clone)]
pub struct LocalKeyFiles {
    ssh_dir: PathBuf,
}

impl LocalKeyFiles {
    pub fn new(ssh_dir: impl Into<PathBuf>) -> Self {
        Self { ssh_dir: ssh_dir.into() }
    }

    pub fn ssh_dir(&self) -> &Path {
        &self.ssh_dir
    }

    /// Generate an ed25519 key pair with `ssh-keygen` unless a public key
    /// already exists. Returns the public key text.
    pub async fn ensure(&self, ssh_keygen: &str) -> Result<String> {
        if let Some(existing) = self.public_key().await {
            return Ok(existing);
        }

        fs::create_dir_all(&self.ssh_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.ssh_dir.display()))?;

        let private = self.ssh_dir.join("id_ed25519");
        info!(path = %private.display(), "No SSH key found; generating ed25519 key pair");
        let status = Command::new(ssh_keygen)
            .args(["-q", "-t", "ed25519", "-N", "", "-f"])
            .arg(&private)
            .status()
            .await
            .with_context(|| format!("Failed to run {ssh_keygen}"))?;
        if !status.success() {
            bail!("{ssh_keygen} exited with {status}");
        }

        self.public_key()
            .await
            .context("ssh-keygen succeeded but no public key was written")
    }
}

#[async_trait]
impl LocalKeySource for LocalKeyFiles {
    async fn public_key(&self) -> Option<String> {
        for name in PUBLIC_KEY_CANDIDATES {
            let path = self.ssh_dir.join(name);
            match fs::read_to_string(&path).await {
                Ok(text) if !text.trim().is_empty() => return Some(text.trim().to_string()),
                Ok(_) => debug!(path = %path.display(), "Public key file is empty"),
                Err(_) => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prefers_ed25519_over_rsa() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("id_rsa.pub"), "ssh-rsa AAAArsa me\n").unwrap();
        std::fs::write(tmp.path().join("id_ed25519.pub"), "ssh-ed25519 AAAAed me\n").unwrap();

        let keys = LocalKeyFiles::new(tmp.path());
        assert_eq!(keys.public_key().await.as_deref(), Some("ssh-ed25519 AAAAed me"));
    }

    #[tokio::test]
    async fn skips_empty_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("id_ed25519.pub"), "  \n").unwrap();
        std::fs::write(tmp.path().join("id_rsa.pub"), "ssh-rsa AAAArsa me").unwrap();

        let keys = LocalKeyFiles::new(tmp.path());
        assert_eq!(keys.public_key().await.as_deref(), Some("ssh-rsa AAAArsa me"));
    }

    #[tokio::test]
    async fn missing_dir_has_no_key() {
        let tmp = tempfile::tempdir().unwrap();
        let keys = LocalKeyFiles::new(tmp.path().join("nope"));
        assert_eq!(keys.public_key().await, None);
    }

    #[tokio::test]
    async fn ensure_keeps_existing_key() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("id_ed25519.pub"), "ssh-ed25519 AAAAed me").unwrap();
        let keys = LocalKeyFiles::new(tmp.path());
        // The keygen binary is never run when a key is present.
        let key = keys.ensure("/nonexistent/ssh-keygen").await.unwrap();
        assert_eq!(key, "ssh-ed25519 AAAAed me");
    }

    #[tokio::test]
    async fn ensure_reports_failing_keygen() {
        let tmp = tempfile::tempdir().unwrap();
        let keys = LocalKeyFiles::new(tmp.path());
        assert!(keys.ensure("/nonexistent/ssh-keygen").await.is_err());
    }
}
