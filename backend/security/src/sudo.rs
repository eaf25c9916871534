//! Sudo grants for a paired user.
//!
//! When this process runs as root the fragment is written to a staging file,
//! syntax-checked, and only then moved into place. Otherwise nothing is
//! written and the caller gets a [`DeferredCommand`] to run by hand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use sshpair_core::{Clock, PairError, PairResult, PrivilegeProbe, SudoersWriter};

use crate::pairing::PairingService;

/// File name prefix for fragments this service owns.
pub const FRAGMENT_PREFIX: &str = "sshpair-";

/// Conservative POSIX login names. Anything else could break out of a file
/// name, a sudoers line or a shell word.
static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").unwrap());

/// A single sudoers rule granting full privileges to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SudoDirective {
    pub username: String,
    pub no_password: bool,
}

impl SudoDirective {
    pub fn new(username: &str, no_password: bool) -> PairResult<Self> {
        if !USERNAME_RE.is_match(username) {
            return Err(PairError::InvalidFormat(format!("invalid username '{username}'")));
        }
        Ok(Self {
            username: username.to_string(),
            no_password,
        })
    }

    pub fn line(&self) -> String {
        if self.no_password {
            format!("{} ALL=(ALL) NOPASSWD: ALL", self.username)
        } else {
            format!("{} ALL=(ALL) ALL", self.username)
        }
    }

    /// Full fragment text, header comment included.
    pub fn fragment(&self, at: DateTime<Utc>) -> String {
        format!(
            "# added by sshpair on {}\n{}\n",
            at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.line()
        )
    }

    /// Final fragment path. One file per user, so re-granting overwrites.
    pub fn target_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{FRAGMENT_PREFIX}{}", self.username))
    }

    /// Staging path. sudo skips files whose names contain a `.`, so a staging
    /// file is never live even before it has been checked.
    pub fn staging_in(&self, dir: &Path, suffix: &str) -> PathBuf {
        dir.join(format!("{FRAGMENT_PREFIX}{}.{suffix}", self.username))
    }
}

/// A privileged operation described as data, for a human to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeferredCommand {
    pub staging: PathBuf,
    pub target: PathBuf,
    pub contents: String,
}

impl DeferredCommand {
    /// The one shell rendering: stage, chmod, check, then move or remove.
    pub fn render(&self) -> String {
        let staging = shell_quote(&self.staging.to_string_lossy());
        let target = shell_quote(&self.target.to_string_lossy());
        format!(
            "printf '%s' {contents} | sudo tee {staging} > /dev/null \
             && sudo chmod 0440 {staging} \
             && {{ sudo visudo -c -f {staging} && sudo mv {staging} {target} \
             || {{ sudo rm -f {staging}; false; }}; }}",
            contents = shell_quote(&self.contents),
        )
    }
}

/// Wrap `s` in single quotes so a POSIX shell reads it literally.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The fragment is live at this path.
    Applied { file: PathBuf, username: String },
    /// Nothing was written; run this as root.
    Deferred(DeferredCommand),
}

#[derive(Debug, Clone, Default)]
pub struct GrantRequest {
    pub username: Option<String>,
    pub no_password: bool,
}

pub struct SudoGrantService {
    pairing: Arc<PairingService>,
    writer: Arc<dyn SudoersWriter>,
    privilege: Arc<dyn PrivilegeProbe>,
    clock: Arc<dyn Clock>,
}

impl SudoGrantService {
    pub fn new(
        pairing: Arc<PairingService>,
        writer: Arc<dyn SudoersWriter>,
        privilege: Arc<dyn PrivilegeProbe>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { pairing, writer, privilege, clock }
    }

    /// Grant sudo to `request.username`, or to the last paired user.
    pub async fn request_grant(&self, token: &str, request: GrantRequest) -> PairResult<GrantOutcome> {
        let auth = self.pairing.authorize(token).await?;

        let username = request
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .or_else(|| auth.last_peer.and_then(|p| p.user))
            .ok_or(PairError::MissingUsername)?;
        let directive = SudoDirective::new(&username, request.no_password)?;
        let contents = directive.fragment(self.clock.now());
        let dir = self.writer.directory().to_path_buf();

        if !self.privilege.is_privileged() {
            info!(user = %directive.username, "Not privileged; returning sudo command for manual use");
            return Ok(GrantOutcome::Deferred(DeferredCommand {
                staging: directive.staging_in(&dir, "pending"),
                target: directive.target_in(&dir),
                contents,
            }));
        }

        let staging = directive.staging_in(&dir, &Uuid::new_v4().simple().to_string());
        let target = directive.target_in(&dir);
        self.apply(&staging, &target, &contents).await?;
        info!(user = %directive.username, no_password = directive.no_password, "Sudo grant applied");
        Ok(GrantOutcome::Applied {
            file: target,
            username: directive.username,
        })
    }

    async fn apply(&self, staging: &Path, target: &Path, contents: &str) -> PairResult<()> {
        let result = async {
            self.writer.write(staging, contents).await?;
            self.writer.check(staging).await?;
            self.writer.activate(staging, target).await
        }
        .await;

        if let Err(e) = &result {
            warn!(kind = e.kind(), "Sudoers fragment not applied; removing staging file");
            if let Err(cleanup) = self.writer.remove(staging).await {
                warn!(kind = cleanup.kind(), "Failed to remove staging sudoers file");
            }
        }
        result
    }
}
