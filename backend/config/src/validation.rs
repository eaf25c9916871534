//! Config validation with field paths in every message.

use crate::defaults::{MAX_TOKEN_TTL_SECS, MIN_TOKEN_TTL_SECS};
use crate::schema::SshPairConfig;
use std::net::IpAddr;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &SshPairConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_listener(config, &mut report);
    validate_token(config, &mut report);
    validate_paths(config, &mut report);
    report
}

fn validate_listener(config: &SshPairConfig, report: &mut ValidationReport) {
    if config.port == 0 {
        report.error("port", "Port must be between 1 and 65535");
    }
    if config.bind_address.parse::<IpAddr>().is_err() {
        report.error(
            "bindAddress",
            format!("'{}' is not an IP address", config.bind_address),
        );
    }
    if let Some(host) = &config.advertise_host {
        if host.is_empty()
            || !host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'))
        {
            report.error(
                "advertiseHost",
                "Only letters, digits, '.', '-' and ':' are allowed",
            );
        }
    }
}

fn validate_token(config: &SshPairConfig, report: &mut ValidationReport) {
    let ttl = config.token_ttl_secs;
    if !(MIN_TOKEN_TTL_SECS..=MAX_TOKEN_TTL_SECS).contains(&ttl) {
        report.error(
            "tokenTtlSecs",
            format!("Must be between {MIN_TOKEN_TTL_SECS} and {MAX_TOKEN_TTL_SECS} seconds, got {ttl}"),
        );
    } else if ttl > 60 * 60 {
        report.warn("tokenTtlSecs", "Tokens valid for over an hour widen the pairing window");
    }
}

fn validate_paths(config: &SshPairConfig, report: &mut ValidationReport) {
    if !config.sudoers_dir.is_absolute() {
        report.error("sudoersDir", "Must be an absolute path");
    }
    if let Some(dir) = &config.ssh_dir {
        if dir.as_os_str().is_empty() {
            report.error("sshDir", "Cannot be empty");
        }
    }
    if config.visudo_path.trim().is_empty() {
        report.error("visudoPath", "Cannot be empty");
    }
    if config.ssh_keygen_path.trim().is_empty() {
        report.error("sshKeygenPath", "Cannot be empty");
    }
}
