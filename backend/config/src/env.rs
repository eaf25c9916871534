//! Environment variable overrides.
//!
//! Applied on top of the file config. Unparseable numeric values are ignored
//! with a warning rather than failing startup.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::warn;

use crate::schema::SshPairConfig;

pub const ENV_BIND: &str = "SSHPAIR_BIND";
pub const ENV_PORT: &str = "SSHPAIR_PORT";
/// Plain `PORT` is honoured as a fallback for container platforms.
pub const ENV_PORT_FALLBACK: &str = "PORT";
pub const ENV_TOKEN_TTL: &str = "SSHPAIR_TOKEN_TTL";
pub const ENV_SSH_DIR: &str = "SSHPAIR_SSH_DIR";
pub const ENV_SUDOERS_DIR: &str = "SSHPAIR_SUDOERS_DIR";
pub const ENV_LOG_DIR: &str = "SSHPAIR_LOG_DIR";
pub const ENV_ADVERTISE_HOST: &str = "SSHPAIR_ADVERTISE_HOST";
pub const ENV_LOG_LEVEL: &str = "RUST_LOG";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: SshPairConfig) -> SshPairConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from a provided map (useful for testing).
pub fn apply_env_overrides_with(
    mut config: SshPairConfig,
    env: &HashMap<String, String>,
) -> SshPairConfig {
    let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(bind) = get(ENV_BIND) {
        config.bind_address = bind.to_string();
    }
    if let Some(port) = get(ENV_PORT).or_else(|| get(ENV_PORT_FALLBACK)) {
        match port.parse() {
            Ok(p) => config.port = p,
            Err(_) => warn!(value = %port, "Ignoring unparseable port override"),
        }
    }
    if let Some(ttl) = get(ENV_TOKEN_TTL) {
        match ttl.parse() {
            Ok(t) => config.token_ttl_secs = t,
            Err(_) => warn!(value = %ttl, "Ignoring unparseable token TTL override"),
        }
    }
    if let Some(dir) = get(ENV_SSH_DIR) {
        config.ssh_dir = Some(PathBuf::from(dir));
    }
    if let Some(dir) = get(ENV_SUDOERS_DIR) {
        config.sudoers_dir = PathBuf::from(dir);
    }
    if let Some(dir) = get(ENV_LOG_DIR) {
        config.log_dir = Some(PathBuf::from(dir));
    }
    if let Some(host) = get(ENV_ADVERTISE_HOST) {
        config.advertise_host = Some(host.to_string());
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.log_level = level.to_string();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn overrides_apply() {
        let cfg = apply_env_overrides_with(
            SshPairConfig::default(),
            &env(&[
                (ENV_PORT, "9000"),
                (ENV_TOKEN_TTL, "120"),
                (ENV_SSH_DIR, "/tmp/ssh"),
                (ENV_ADVERTISE_HOST, "10.0.0.5"),
            ]),
        );
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.token_ttl_secs, 120);
        assert_eq!(cfg.ssh_dir(), PathBuf::from("/tmp/ssh"));
        assert_eq!(cfg.advertise_host.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn plain_port_is_a_fallback() {
        let cfg = apply_env_overrides_with(SshPairConfig::default(), &env(&[("PORT", "8081")]));
        assert_eq!(cfg.port, 8081);

        let cfg = apply_env_overrides_with(
            SshPairConfig::default(),
            &env(&[("PORT", "8081"), (ENV_PORT, "8082")]),
        );
        assert_eq!(cfg.port, 8082);
    }

    #[test]
    fn bad_numbers_are_ignored() {
        let cfg = apply_env_overrides_with(
            SshPairConfig::default(),
            &env(&[(ENV_PORT, "http"), (ENV_TOKEN_TTL, "")]),
        );
        assert_eq!(cfg, SshPairConfig::default());
    }
}
