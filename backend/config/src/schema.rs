//! sshpair runtime configuration schema.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::defaults;

/// Root configuration. Every field has a default, so a partial YAML file is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SshPairConfig {
    /// HTTP bind address
    pub bind_address: String,
    /// HTTP port
    pub port: u16,
    /// Token validity window in seconds
    pub token_ttl_secs: i64,
    /// SSH directory holding `authorized_keys` and the local key pair.
    /// Defaults to `~/.ssh`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_dir: Option<PathBuf>,
    /// Where sudoers fragments are written
    pub sudoers_dir: PathBuf,
    /// Sudoers syntax checker
    pub visudo_path: String,
    /// Key generator used when no local key exists
    pub ssh_keygen_path: String,
    /// Fallback log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Directory for JSON log files; console only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// Host name or address put into install one-liners
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertise_host: Option<String>,
}

impl Default for SshPairConfig {
    fn default() -> Self {
        Self {
            bind_address: defaults::DEFAULT_BIND.to_string(),
            port: defaults::DEFAULT_PORT,
            token_ttl_secs: defaults::DEFAULT_TOKEN_TTL_SECS,
            ssh_dir: None,
            sudoers_dir: PathBuf::from(defaults::DEFAULT_SUDOERS_DIR),
            visudo_path: defaults::DEFAULT_VISUDO.to_string(),
            ssh_keygen_path: defaults::DEFAULT_SSH_KEYGEN.to_string(),
            log_level: defaults::DEFAULT_LOG_LEVEL.to_string(),
            log_dir: None,
            advertise_host: None,
        }
    }
}

impl SshPairConfig {
    /// The configured SSH directory, or `~/.ssh`.
    pub fn ssh_dir(&self) -> PathBuf {
        self.ssh_dir.clone().unwrap_or_else(defaults::default_ssh_dir)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: SshPairConfig = serde_yaml::from_str("port: 5000\nadvertiseHost: box.lan\n").unwrap();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.advertise_host.as_deref(), Some("box.lan"));
        assert_eq!(cfg.token_ttl_secs, defaults::DEFAULT_TOKEN_TTL_SECS);
        assert_eq!(cfg.sudoers_dir, PathBuf::from("/etc/sudoers.d"));
    }

    #[test]
    fn listen_addr_joins_bind_and_port() {
        let cfg = SshPairConfig::default();
        assert_eq!(cfg.listen_addr(), "0.0.0.0:4321");
    }
}
