//! Accepter-side commands: `accept`, `grant` and `sudo`.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use std::path::Path;
use tracing::info;

use sshpair_core::{AuthorizedKeyEntry, AuthorizedKeysStore, KeySubmission, PeerInfo};
use sshpair_infra::{FileAuthorizedKeys, LocalKeyFiles};
use sshpair_security::code::is_well_formed;
use sshpair_security::{validate, CODE_LEN};

use crate::api::PairClient;
use crate::terminal_output::{note_info, note_success, note_warn};

/// How the offerer's token is obtained: relayed code or the token itself.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// 8-character pairing code shown by the offerer
    #[arg(long)]
    pub code: Option<String>,
    /// Full pairing token
    #[arg(long)]
    pub token: Option<String>,
}

/// Resolve a [`Target`] to a token, asking the offerer when given a code.
pub async fn resolve_target(client: &PairClient, target: &Target) -> Result<String> {
    match (&target.token, &target.code) {
        (Some(token), _) => Ok(token.trim().to_string()),
        (None, Some(code)) => {
            let code = code.trim().to_ascii_lowercase();
            if !is_well_formed(&code) {
                bail!("Pairing code must be {CODE_LEN} hex characters");
            }
            client
                .resolve(&code)
                .await
                .context("Offerer did not recognise the code (expired or already used?)")
        }
        (None, None) => bail!("Either --code or --token is required"),
    }
}

/// Send this machine's public key to the offerer, generating one if needed.
pub async fn accept(client: &PairClient, target: &Target, ssh_dir: &Path, ssh_keygen: &str) -> Result<()> {
    let token = resolve_target(client, target).await?;
    let local = LocalKeyFiles::new(ssh_dir);
    let pubkey = local.ensure(ssh_keygen).await?;

    let submission = KeySubmission {
        pubkey: Some(pubkey),
        user: current_user(),
        host: current_hostname().await,
    };
    let peer = submission.peer();
    client.submit_key(&token, &submission).await?;

    info!(peer = %peer, "Public key accepted by offerer");
    note_success(&format!("Key sent. The offerer can now run: ssh {peer}"));
    Ok(())
}

/// Fetch the offerer's public key and authorize it locally.
pub async fn grant(client: &PairClient, target: &Target, ssh_dir: &Path) -> Result<()> {
    let token = resolve_target(client, target).await?;
    let raw = client.public_key(&token).await?;
    let record = validate(&raw).context("Offerer sent an unusable public key")?;

    let store = FileAuthorizedKeys::new(ssh_dir);
    if store.contains(&record.to_line()).await? {
        note_info("Offerer key is already authorized");
        return Ok(());
    }

    let peer = offerer_peer(record.comment.as_deref(), client.base());
    let entry = AuthorizedKeyEntry::new(Utc::now(), &peer, record.to_line());
    store.append(&entry).await?;

    note_success(&format!("Offerer key added to {}", store.path().display()));
    Ok(())
}

/// Ask the offerer to grant sudo to a user on the offerer's machine.
pub async fn sudo(client: &PairClient, target: &Target, username: Option<&str>, nopass: bool) -> Result<()> {
    let token = resolve_target(client, target).await?;
    let outcome = client.grant_sudo(&token, username, nopass).await?;

    if outcome.applied {
        let file = outcome.file.unwrap_or_default();
        note_success(&format!("Sudo granted ({file})"));
    } else if let (true, Some(command)) = (outcome.needs_root, outcome.command) {
        note_warn("The offerer is not running as root. Run this on the offerer:");
        println!("\n{command}\n");
    } else {
        bail!("Offerer neither applied the grant nor returned a command");
    }
    Ok(())
}

fn current_user() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .ok()
        .filter(|u| !u.is_empty())
}

async fn current_hostname() -> Option<String> {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.trim().is_empty() {
            return Some(name.trim().to_string());
        }
    }
    tokio::fs::read_to_string("/etc/hostname")
        .await
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Attribution for the offerer's key: its `user@host` comment when it has
/// one, else `offerer@<address we reached>`.
fn offerer_peer(comment: Option<&str>, base: &str) -> PeerInfo {
    match comment.and_then(|c| c.split_once('@')) {
        Some((user, host)) => PeerInfo {
            user: Some(user.to_string()),
            host: Some(host.to_string()),
        },
        None => PeerInfo {
            user: Some("offerer".into()),
            host: host_of(base),
        },
    }
}

fn host_of(base: &str) -> Option<String> {
    let rest = base.split("://").nth(1).unwrap_or(base);
    rest.split('/').next().map(str::to_string).filter(|h| !h.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sshpair_core::testing::{FakeSudoers, FixedPrivilege, ManualClock, MemoryKeyStore, StaticLocalKey};
    use sshpair_gateway::{router, GatewayState};
    use sshpair_security::{PairingService, SudoGrantService};
    use std::sync::Arc;

    const OFFERER_KEY: &str =
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOXLI4WbeZ31Yzi03gTECtdFJcODXbPrdYScFyUwZcYh root@server";
    const ACCEPTER_KEY: &str =
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOXLI4WbeZ31Yzi03gTECtdFJcODXbPrdYScFyUwZcYh alice@laptop";

    struct Offerer {
        client: PairClient,
        keys: Arc<MemoryKeyStore>,
    }

    async fn spawn_offerer() -> Offerer {
        let clock = Arc::new(ManualClock::at_epoch());
        let keys = Arc::new(MemoryKeyStore::default());
        let pairing = Arc::new(PairingService::new(
            Duration::seconds(900),
            keys.clone(),
            Arc::new(StaticLocalKey(Some(OFFERER_KEY.to_string()))),
            clock.clone(),
        ));
        let grants = Arc::new(SudoGrantService::new(
            pairing.clone(),
            Arc::new(FakeSudoers::new("/etc/sudoers.d")),
            Arc::new(FixedPrivilege(false)),
            clock,
        ));
        let state = GatewayState {
            pairing,
            grants,
            port: 4321,
            advertise_host: None,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        Offerer {
            client: PairClient::new(format!("http://{addr}")),
            keys,
        }
    }

    fn by_code(code: &str) -> Target {
        Target {
            code: Some(code.to_string()),
            token: None,
        }
    }

    fn by_token(token: &str) -> Target {
        Target {
            code: None,
            token: Some(token.to_string()),
        }
    }

    #[tokio::test]
    async fn code_resolves_through_offerer() {
        let offerer = spawn_offerer().await;
        let status = offerer.client.status().await.unwrap();

        let token = resolve_target(&offerer.client, &by_code(&status.code.to_uppercase()))
            .await
            .unwrap();
        assert_eq!(token, status.token);

        let err = resolve_target(&offerer.client, &by_code("abc")).await.unwrap_err();
        assert!(err.to_string().contains("8 hex characters"));
        assert!(resolve_target(&offerer.client, &by_code("00000000")).await.is_err());
    }

    #[tokio::test]
    async fn accept_sends_existing_local_key() {
        let offerer = spawn_offerer().await;
        let token = offerer.client.status().await.unwrap().token;

        let ssh = tempfile::tempdir().unwrap();
        tokio::fs::write(ssh.path().join("id_ed25519.pub"), format!("{ACCEPTER_KEY}\n"))
            .await
            .unwrap();

        accept(&offerer.client, &by_token(&token), ssh.path(), "ssh-keygen")
            .await
            .unwrap();
        let entries = offerer.keys.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key_line, ACCEPTER_KEY);

        let status = offerer.client.status().await.unwrap();
        assert!(status.paired);
        assert_ne!(status.token, token);
    }

    #[tokio::test]
    async fn grant_appends_offerer_key_once() {
        let offerer = spawn_offerer().await;
        let token = offerer.client.status().await.unwrap().token;
        let ssh = tempfile::tempdir().unwrap();

        grant(&offerer.client, &by_token(&token), ssh.path()).await.unwrap();
        grant(&offerer.client, &by_token(&token), ssh.path()).await.unwrap();

        let contents = tokio::fs::read_to_string(ssh.path().join("authorized_keys"))
            .await
            .unwrap();
        assert_eq!(contents.matches("AAAAC3NzaC1lZDI1NTE5").count(), 1);
        assert!(contents.contains("# sshpair "));
        assert!(contents.contains("root@server\n"));
    }

    #[tokio::test]
    async fn sudo_without_root_prints_command() {
        let offerer = spawn_offerer().await;
        let token = offerer.client.status().await.unwrap().token;

        sudo(&offerer.client, &by_token(&token), Some("alice"), false)
            .await
            .unwrap();
        let err = sudo(&offerer.client, &by_token(&token), None, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("MISSING_USERNAME"));
    }

    #[test]
    fn offerer_attribution() {
        assert_eq!(
            offerer_peer(Some("root@server"), "http://10.0.0.2:4321").to_string(),
            "root@server"
        );
        assert_eq!(
            offerer_peer(None, "http://10.0.0.2:4321").to_string(),
            "offerer@10.0.0.2:4321"
        );
    }

    #[test]
    fn host_of_strips_scheme() {
        assert_eq!(host_of("http://10.0.0.2:4321").as_deref(), Some("10.0.0.2:4321"));
        assert_eq!(host_of("box").as_deref(), Some("box"));
    }
}
