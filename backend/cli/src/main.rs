mod api;
mod config;
mod pair_cmd;
mod serve_cmd;
mod status_cmd;
mod terminal_output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use sshpair_infra::LocalKeyFiles;

use api::PairClient;
use pair_cmd::Target;
use terminal_output::{note_error, note_success};

#[derive(Parser)]
#[command(name = "sshpair")]
#[command(about = "sshpair: exchange SSH keys between two machines with a one-time code")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.sshpair/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the offerer: serve the pairing API on this machine
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind to
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Show the running offerer's code and install one-liners
    Status {
        /// Offerer address (default: the local server)
        #[arg(long)]
        host: Option<String>,
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Send this machine's public key to an offerer
    Accept {
        /// Offerer address: host, host:port or URL
        #[arg(long)]
        host: String,
        #[command(flatten)]
        target: Target,
    },
    /// Authorize the offerer's public key on this machine
    Grant {
        /// Offerer address: host, host:port or URL
        #[arg(long)]
        host: String,
        #[command(flatten)]
        target: Target,
    },
    /// Ask the offerer to grant sudo to a user on the offerer
    Sudo {
        /// Offerer address: host, host:port or URL
        #[arg(long)]
        host: String,
        #[command(flatten)]
        target: Target,
        /// User to grant (default: the user that last paired)
        #[arg(long)]
        username: Option<String>,
        /// Grant NOPASSWD sudo
        #[arg(long)]
        nopass: bool,
    },
    /// Invalidate the current token and issue a new one
    Reset {
        /// Offerer address (default: the local server)
        #[arg(long)]
        host: Option<String>,
    },
    /// Generate an ed25519 key pair if this machine has none
    GenKey,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!(error = %e, "Command failed");
        note_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = config::load(cli.config).await?;
    sshpair_logging::init_logger(config.log_dir.as_deref(), &config.log_level);

    let local_base = |host: Option<String>, port: u16| {
        config::offerer_base(host.as_deref().unwrap_or("127.0.0.1"), port)
    };

    match cli.command {
        Commands::Serve { port, bind } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            serve_cmd::run(config).await
        }
        Commands::Status { host, json } => {
            let client = PairClient::new(local_base(host, config.port)?);
            status_cmd::run(&client, json).await
        }
        Commands::Reset { host } => {
            let client = PairClient::new(local_base(host, config.port)?);
            status_cmd::reset(&client).await
        }
        Commands::Accept { host, target } => {
            let client = PairClient::new(config::offerer_base(&host, config.port)?);
            pair_cmd::accept(&client, &target, &config.ssh_dir(), &config.ssh_keygen_path).await
        }
        Commands::Grant { host, target } => {
            let client = PairClient::new(config::offerer_base(&host, config.port)?);
            pair_cmd::grant(&client, &target, &config.ssh_dir()).await
        }
        Commands::Sudo {
            host,
            target,
            username,
            nopass,
        } => {
            let client = PairClient::new(config::offerer_base(&host, config.port)?);
            pair_cmd::sudo(&client, &target, username.as_deref(), nopass).await
        }
        Commands::GenKey => {
            let key = LocalKeyFiles::new(config.ssh_dir())
                .ensure(&config.ssh_keygen_path)
                .await?;
            note_success("Local public key:");
            println!("{key}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn code_and_token_are_exclusive() {
        assert!(Cli::try_parse_from(["sshpair", "accept", "--host", "h", "--code", "3f9a1c0b"]).is_ok());
        assert!(Cli::try_parse_from(["sshpair", "accept", "--host", "h"]).is_err());
        assert!(Cli::try_parse_from([
            "sshpair", "grant", "--host", "h", "--code", "3f9a1c0b", "--token", "t"
        ])
        .is_err());
    }

    #[test]
    fn sudo_flags_parse() {
        let cli = Cli::try_parse_from([
            "sshpair", "sudo", "--host", "h", "--token", "t", "--username", "dev", "--nopass",
        ])
        .unwrap();
        match cli.command {
            Commands::Sudo { username, nopass, .. } => {
                assert_eq!(username.as_deref(), Some("dev"));
                assert!(nopass);
            }
            _ => panic!("expected sudo"),
        }
    }
}
