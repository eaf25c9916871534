//! `GET /api/install/:token?mode=send|grant&host=`

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
};
use serde::Deserialize;

use sshpair_core::PairError;

use crate::error::ApiResult;
use crate::install_script::{self, InstallMode};
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct InstallQuery {
    #[serde(default)]
    pub mode: InstallMode,
    /// Host the script should call back to, when the accepter reached us
    /// through a different name than the one we would advertise.
    pub host: Option<String>,
}

pub async fn install_script(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    Query(query): Query<InstallQuery>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    state.pairing.authorize(&token).await?;

    let base = match query.host.as_deref() {
        Some(host) if install_script::is_valid_host(host) => install_script::base_url(host, state.port),
        Some(_) => {
            return Err(PairError::InvalidFormat("host may only contain letters, digits, '.', ':' and '-'".into()).into())
        }
        None => state.public_base(&headers),
    };

    Ok((
        [(header::CONTENT_TYPE, "text/x-sh; charset=utf-8")],
        install_script::render(&base, &token, query.mode),
    ))
}
