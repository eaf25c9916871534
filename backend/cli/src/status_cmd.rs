//! Offerer-side commands against a running server: `status` and `reset`.

use anyhow::Result;

use crate::api::{PairClient, StatusView};
use crate::terminal_output::{note_success, render_table, Column};

pub async fn run(client: &PairClient, json: bool) -> Result<()> {
    let status = client.status().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", render_status(&status));
    }
    Ok(())
}

pub async fn reset(client: &PairClient) -> Result<()> {
    client.reset().await?;
    let status = client.status().await?;
    note_success(&format!("Token reset. New code: {}", status.code));
    Ok(())
}

fn render_status(status: &StatusView) -> String {
    let mut rows = vec![
        vec!["Code".to_string(), status.code.clone()],
        vec!["Expires in".to_string(), format!("{}s", status.expires_in)],
        vec!["Paired".to_string(), if status.paired { "yes" } else { "no" }.to_string()],
        vec![
            "Local key".to_string(),
            if status.has_pubkey { "present" } else { "missing" }.to_string(),
        ],
    ];
    if let Some(peer) = &status.last_peer {
        rows.push(vec!["Last peer".to_string(), peer.to_string()]);
    }
    rows.push(vec!["Send key".to_string(), status.oneliner.clone()]);
    rows.push(vec!["Grant key".to_string(), status.grant_oneliner.clone()]);

    render_table(&[Column::left("Field"), Column::left("Value")], &rows)
}
