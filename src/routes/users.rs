//! Account and favorites routes
//!
//! - POST   /users
//! - GET    /users/me
//! - GET    /users/me/favorites
//! - POST   /users/me/favorites/{record_id}
//! - DELETE /users/me/favorites/{record_id}

use hyper::{Method, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use super::helpers::{json_response, no_content, parse_id, ApiRequest, BoxBody};
use crate::server::AppState;
use crate::services::{accounts, favorites};
use crate::types::Result;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub password: String,
}

pub async fn handle_users_request(
    req: &ApiRequest,
    state: Arc<AppState>,
) -> Option<Result<Response<BoxBody>>> {
    let segments = req.segments();
    let response = match (&req.method, segments.as_slice()) {
        (&Method::POST, ["users"]) => handle_register(req, &state).await,
        (&Method::GET, ["users", "me"]) => handle_me(req, &state).await,
        (&Method::GET, ["users", "me", "favorites"]) => handle_list_favorites(req, &state).await,
        (&Method::POST, ["users", "me", "favorites", id]) => {
            handle_add_favorite(req, &state, id).await
        }
        (&Method::DELETE, ["users", "me", "favorites", id]) => {
            handle_remove_favorite(req, &state, id).await
        }
        _ => return None,
    };
    Some(response)
}

/// POST /users
async fn handle_register(req: &ApiRequest, state: &AppState) -> Result<Response<BoxBody>> {
    let body: RegisterRequest = req.json()?;
    let user = accounts::register(state.store.as_ref(), &body.name, &body.password).await?;
    let view = accounts::user_view(state.store.as_ref(), &user, state.args.max_page_size).await?;
    Ok(json_response(StatusCode::CREATED, &view))
}

/// GET /users/me
async fn handle_me(req: &ApiRequest, state: &AppState) -> Result<Response<BoxBody>> {
    let user = state.current_user(req).await?;
    let view = accounts::user_view(state.store.as_ref(), &user, state.args.max_page_size).await?;
    Ok(json_response(StatusCode::OK, &view))
}

/// GET /users/me/favorites
async fn handle_list_favorites(req: &ApiRequest, state: &AppState) -> Result<Response<BoxBody>> {
    let user = state.current_user(req).await?;
    let records = favorites::list(state.store.as_ref(), &user).await?;
    Ok(json_response(StatusCode::OK, &records))
}

/// POST /users/me/favorites/{record_id}
async fn handle_add_favorite(
    req: &ApiRequest,
    state: &AppState,
    id: &str,
) -> Result<Response<BoxBody>> {
    let record_id = parse_id(id)?;
    let user = state.current_user(req).await?;
    favorites::add(state.store.as_ref(), &user, record_id).await?;
    let view = accounts::user_view(state.store.as_ref(), &user, state.args.max_page_size).await?;
    Ok(json_response(StatusCode::OK, &view))
}

/// DELETE /users/me/favorites/{record_id}
async fn handle_remove_favorite(
    req: &ApiRequest,
    state: &AppState,
    id: &str,
) -> Result<Response<BoxBody>> {
    let record_id = parse_id(id)?;
    let user = state.current_user(req).await?;
    favorites::remove(state.store.as_ref(), &user, record_id).await?;
    Ok(no_content())
}
