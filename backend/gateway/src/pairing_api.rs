//! Pairing endpoints: status, code resolution, key submission, the
//! offerer's public key, and reset.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use sshpair_core::{KeySubmission, PairError, PeerInfo};
use sshpair_logging::{token_hint, EventLogger, PairingEvent};

use crate::error::{ApiError, ApiResult};
use crate::install_script::{oneliner, InstallMode};
use crate::server::GatewayState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
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

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub ok: bool,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Handler for `GET /api/status`
pub async fn get_status(State(state): State<GatewayState>, headers: HeaderMap) -> Json<StatusResponse> {
    let snapshot = state.pairing.status().await;
    let base = state.public_base(&headers);

    Json(StatusResponse {
        oneliner: oneliner(&base, &snapshot.token, InstallMode::Send),
        grant_oneliner: oneliner(&base, &snapshot.token, InstallMode::Grant),
        token: snapshot.token,
        code: snapshot.code,
        paired: snapshot.paired,
        expires_in: snapshot.expires_in,
        has_pubkey: snapshot.has_local_key,
        port: state.port,
        last_peer: snapshot.last_peer,
    })
}

/// Handler for `GET /api/resolve/:code`
pub async fn resolve_code(
    State(state): State<GatewayState>,
    Path(code): Path<String>,
) -> ApiResult<Json<TokenResponse>> {
    let token = state.pairing.resolve_code(&code).await?;
    Ok(Json(TokenResponse { token }))
}

/// Handler for `POST /api/pairing/:token`
///
/// A missing or unparseable body is treated as an empty submission, so the
/// caller gets a `MISSING_FIELD` error in the usual shape.
pub async fn submit_key(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    body: Option<Json<KeySubmission>>,
) -> ApiResult<Json<OkResponse>> {
    let submission = body.map(|Json(s)| s).unwrap_or_default();
    let key_type = submission
        .pubkey
        .as_deref()
        .and_then(|k| k.split_whitespace().next())
        .unwrap_or_default()
        .to_string();
    let peer = submission.peer();

    match state.pairing.submit_key(&token, submission).await {
        Ok(()) => {
            EventLogger::record(PairingEvent::KeyAuthorized {
                peer: peer.to_string(),
                key_type,
            });
            Ok(Json(OkResponse { ok: true }))
        }
        Err(e) => {
            EventLogger::record(PairingEvent::RequestRejected {
                route: format!("pairing/{}", token_hint(&token)),
                kind: e.kind().to_string(),
                detail: e.to_string(),
            });
            Err(ApiError(e))
        }
    }
}

/// Handler for `GET /api/publickey?token=`
pub async fn get_public_key(
    State(state): State<GatewayState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<impl IntoResponse> {
    let token = query.token.ok_or(PairError::MissingField("token"))?;
    let key = state.pairing.fetch_local_key(&token).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("{}\n", key.trim_end()),
    ))
}

/// Handler for `POST /api/reset`
pub async fn reset(State(state): State<GatewayState>) -> Json<ResetResponse> {
    let credential = state.pairing.reset().await;
    EventLogger::record(PairingEvent::TokenReset);
    Json(ResetResponse {
        ok: true,
        token: credential.token,
    })
}
