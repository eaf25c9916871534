//! `sshpair serve`: wire the file-backed collaborators into the services
//! and run the HTTP API.

use anyhow::{Context, Result};
use chrono::Duration;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use sshpair_config::SshPairConfig;
use sshpair_core::{Clock, SystemClock};
use sshpair_gateway::{start_server, GatewayState};
use sshpair_infra::{EffectiveUid, FileAuthorizedKeys, LocalKeyFiles, SystemSudoers};
use sshpair_security::{PairingService, SudoGrantService};

use crate::terminal_output::{note_info, BOLD, RESET};

pub fn build_state(config: &SshPairConfig) -> GatewayState {
    let ssh_dir = config.ssh_dir();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let pairing = Arc::new(PairingService::new(
        Duration::seconds(config.token_ttl_secs),
        Arc::new(FileAuthorizedKeys::new(&ssh_dir)),
        Arc::new(LocalKeyFiles::new(&ssh_dir)),
        clock.clone(),
    ));
    let grants = Arc::new(SudoGrantService::new(
        pairing.clone(),
        Arc::new(SystemSudoers::new(&config.sudoers_dir, config.visudo_path.clone())),
        Arc::new(EffectiveUid),
        clock,
    ));

    GatewayState {
        pairing,
        grants,
        port: config.port,
        advertise_host: config.advertise_host.clone(),
    }
}

pub async fn run(config: SshPairConfig) -> Result<()> {
    let addr: SocketAddr = config
        .listen_addr()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.listen_addr()))?;

    let state = build_state(&config);
    let status = state.pairing.status().await;
    info!(
        port = config.port,
        bind = %config.bind_address,
        ssh_dir = %config.ssh_dir().display(),
        ttl_secs = config.token_ttl_secs,
        "Starting sshpair"
    );

    println!("\n{BOLD}Pairing code:{RESET} {}", status.code);
    if !status.has_local_key {
        note_info("No local public key; run `sshpair gen-key` so accepters can grant access back");
    }
    note_info(&format!(
        "Run `sshpair status --host 127.0.0.1:{}` for the install one-liners",
        config.port
    ));

    start_server(addr, state).await
}
