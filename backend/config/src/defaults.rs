//! Default values.

use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4321;
/// 15 minutes.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 15 * 60;
pub const DEFAULT_SUDOERS_DIR: &str = "/etc/sudoers.d";
pub const DEFAULT_VISUDO: &str = "visudo";
pub const DEFAULT_SSH_KEYGEN: &str = "ssh-keygen";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Accepted token TTL range, in seconds.
pub const MIN_TOKEN_TTL_SECS: i64 = 60;
pub const MAX_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// `~/.ssh`, or `.ssh` relative to the working directory when there is no home.
pub fn default_ssh_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".ssh"))
        .unwrap_or_else(|| PathBuf::from(".ssh"))
}
