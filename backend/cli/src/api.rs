//! HTTP client for a running offerer.

use anyhow::{bail, Context, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use sshpair_core::{KeySubmission, PeerInfo};

/// `GET /api/status` as seen by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub token: String,
    pub code: String,
    pub paired: bool,
    pub expires_in: i64,
    pub has_pubkey: bool,
    pub port: u16,
    pub oneliner: String,
    pub grant_oneliner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_peer: Option<PeerInfo>,
}

/// `POST /api/grant-sudo` as seen by a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantView {
    pub applied: bool,
    pub file: Option<String>,
    #[serde(default)]
    pub needs_root: bool,
    pub command: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    token: String,
}

pub struct PairClient {
    http: Client,
    base: String,
}

impl PairClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base: base.into(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Turn a non-2xx response into an error carrying the server's message.
    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => bail!("{} ({})", body.error, body.code),
            Err(_) => bail!("offerer returned HTTP {status}"),
        }
    }

    pub async fn status(&self) -> Result<StatusView> {
        let resp = self
            .http
            .get(self.url("/api/status"))
            .send()
            .await
            .with_context(|| format!("Could not reach sshpair at {}", self.base))?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn resolve(&self, code: &str) -> Result<String> {
        let resp = self
            .http
            .get(self.url(&format!("/api/resolve/{code}")))
            .send()
            .await
            .with_context(|| format!("Could not reach sshpair at {}", self.base))?;
        let body: TokenBody = Self::check(resp).await?.json().await?;
        Ok(body.token)
    }

    pub async fn submit_key(&self, token: &str, submission: &KeySubmission) -> Result<()> {
        let resp = self
            .http
            .post(self.url(&format!("/api/pairing/{token}")))
            .json(submission)
            .send()
            .await
            .with_context(|| format!("Could not reach sshpair at {}", self.base))?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn public_key(&self, token: &str) -> Result<String> {
        let resp = self
            .http
            .get(self.url("/api/publickey"))
            .query(&[("token", token)])
            .send()
            .await
            .with_context(|| format!("Could not reach sshpair at {}", self.base))?;
        Ok(Self::check(resp).await?.text().await?.trim().to_string())
    }

    pub async fn grant_sudo(&self, token: &str, username: Option<&str>, nopass: bool) -> Result<GrantView> {
        let resp = self
            .http
            .post(self.url("/api/grant-sudo"))
            .json(&json!({ "token": token, "username": username, "nopass": nopass }))
            .send()
            .await
            .with_context(|| format!("Could not reach sshpair at {}", self.base))?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn reset(&self) -> Result<String> {
        let resp = self
            .http
            .post(self.url("/api/reset"))
            .send()
            .await
            .with_context(|| format!("Could not reach sshpair at {}", self.base))?;
        let body: TokenBody = Self::check(resp).await?.json().await?;
        Ok(body.token)
    }
}
