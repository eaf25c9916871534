//! `POST /api/grant-sudo`.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use sshpair_core::PairError;
use sshpair_logging::{EventLogger, PairingEvent};
use sshpair_security::{GrantOutcome, GrantRequest};

use crate::error::ApiResult;
use crate::pairing_api::TokenQuery;
use crate::server::GatewayState;

#[derive(Debug, Default, Deserialize)]
pub struct GrantSudoBody {
    pub token: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub nopass: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantSudoResponse {
    pub ok: bool,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_root: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// The token comes from the body, or from `?token=` when the body has none.
pub async fn grant_sudo(
    State(state): State<GatewayState>,
    Query(query): Query<TokenQuery>,
    body: Option<Json<GrantSudoBody>>,
) -> ApiResult<Json<GrantSudoResponse>> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let token = body
        .token
        .or(query.token)
        .filter(|t| !t.is_empty())
        .ok_or(PairError::MissingField("token"))?;

    let request = GrantRequest {
        username: body.username,
        no_password: body.nopass,
    };
    let outcome = state.grants.request_grant(&token, request).await?;

    let response = match outcome {
        GrantOutcome::Applied { file, username } => {
            EventLogger::record(PairingEvent::SudoGranted { username });
            GrantSudoResponse {
                ok: true,
                applied: true,
                file: Some(file),
                needs_root: None,
                command: None,
            }
        }
        GrantOutcome::Deferred(command) => GrantSudoResponse {
            ok: true,
            applied: false,
            file: None,
            needs_root: Some(true),
            command: Some(command.render()),
        },
    };
    Ok(Json(response))
}
