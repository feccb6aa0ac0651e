//! Authentication routes
//!
//! - POST /auth/token - OAuth2 password grant (form or JSON)

use hyper::{Method, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::helpers::{json_response, ApiRequest, BoxBody};
use crate::server::AppState;
use crate::services::accounts;
use crate::types::Result;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

pub async fn handle_auth_request(
    req: &ApiRequest,
    state: Arc<AppState>,
) -> Option<Result<Response<BoxBody>>> {
    match (&req.method, req.segments().as_slice()) {
        (&Method::POST, ["auth", "token"]) => Some(handle_token(req, &state).await),
        _ => None,
    }
}

/// POST /auth/token
async fn handle_token(req: &ApiRequest, state: &AppState) -> Result<Response<BoxBody>> {
    let body: TokenRequest = req.form_or_json()?;
    let token = accounts::login(state.store.as_ref(), &state.jwt, &body.username, &body.password)
        .await?;
    Ok(json_response(StatusCode::OK, &token))
}
