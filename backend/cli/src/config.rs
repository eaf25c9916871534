//! Effective configuration for a CLI invocation: file, then environment,
//! then command-line flags.

use anyhow::{Context, Result};
use std::path::PathBuf;

use sshpair_config::{config_dir, config_file_path, load_and_prepare, SshPairConfig};

/// Load the config from `explicit`, or from the default config directory.
pub async fn load(explicit: Option<PathBuf>) -> Result<SshPairConfig> {
    let path = explicit.unwrap_or_else(|| config_file_path(&config_dir()));
    load_and_prepare(&path)
        .await
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Base URL of an offerer given as `host`, `host:port` or a full URL.
pub fn offerer_base(host: &str, default_port: u16) -> Result<String> {
    let host = host.trim().trim_end_matches('/');
    anyhow::ensure!(!host.is_empty(), "--host cannot be empty");

    if host.starts_with("http://") || host.starts_with("https://") {
        return Ok(host.to_string());
    }
    if host.starts_with('[') {
        // Bracketed IPv6, with or without a port.
        return Ok(if host.contains("]:") {
            format!("http://{host}")
        } else {
            format!("http://{host}:{default_port}")
        });
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') => {
            let port: u16 = port
                .parse()
                .with_context(|| format!("Invalid port in --host '{host}'"))?;
            Ok(format!("http://{name}:{port}"))
        }
        Some(_) => Ok(format!("http://[{host}]:{default_port}")),
        None => Ok(format!("http://{host}:{default_port}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_forms() {
        assert_eq!(offerer_base("10.0.0.2", 4321).unwrap(), "http://10.0.0.2:4321");
        assert_eq!(offerer_base("10.0.0.2:5000", 4321).unwrap(), "http://10.0.0.2:5000");
        assert_eq!(offerer_base("box.lan/", 4321).unwrap(), "http://box.lan:4321");
        assert_eq!(
            offerer_base("https://pair.example", 4321).unwrap(),
            "https://pair.example"
        );
        assert_eq!(offerer_base("fe80::1", 4321).unwrap(), "http://[fe80::1]:4321");
        assert_eq!(offerer_base("[fe80::1]:9", 4321).unwrap(), "http://[fe80::1]:9");
        assert!(offerer_base("box:http", 4321).is_err());
        assert!(offerer_base("  ", 4321).is_err());
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(dir.path().join("config.yaml"))).await.is_ok());
    }
}
