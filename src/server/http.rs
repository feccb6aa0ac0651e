//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; one task per connection.

use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::db::{MemoryStore, SurveyStore};
use crate::routes::{self, ApiRequest, BoxBody};
use crate::services::accounts;
use crate::types::{Result, SurveyError, User};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn SurveyStore>,
    pub jwt: JwtValidator,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn SurveyStore>) -> Result<Self> {
        let jwt = args.jwt_validator()?;
        Ok(Self {
            args,
            store,
            jwt,
            started_at: Instant::now(),
        })
    }

    /// State backed by a fresh in-memory store
    pub fn in_memory(args: Args) -> Result<Self> {
        Self::new(args, Arc::new(MemoryStore::new()))
    }

    /// Active account behind the request's bearer token
    pub async fn current_user(&self, req: &ApiRequest) -> Result<User> {
        accounts::authenticate(self.store.as_ref(), &self.jwt, req.auth_header()).await
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "mapsurvey listening on {} (store: {})",
        state.args.listen,
        state.store.backend_name()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - using built-in JWT secret");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<hyper::body::Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = dispatch(state, req).await;

    info!(
        "[{}] {} {} -> {} ({} ms)",
        addr,
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    Ok(response)
}

/// Route one request to its handler.
///
/// Generic over the body so tests can drive it without a socket.
pub async fn dispatch<B>(state: Arc<AppState>, req: Request<B>) -> Response<BoxBody>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut response = match ApiRequest::read(req, state.args.max_body_bytes).await {
        Ok(api_req) => route(state, &api_req).await,
        Err(e) => routes::error_response(&e),
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

async fn route(state: Arc<AppState>, req: &ApiRequest) -> Response<BoxBody> {
    if req.method == Method::OPTIONS {
        return routes::cors_preflight();
    }

    let segments = req.segments();
    let handled = match segments.first().copied() {
        Some("ping") if req.method == Method::GET && segments.len() == 1 => {
            return routes::ping();
        }
        Some("health") if req.method == Method::GET && segments.len() == 1 => {
            return routes::health_check(state).await;
        }
        Some("auth") => routes::handle_auth_request(req, state).await,
        Some("users") => routes::handle_users_request(req, state).await,
        Some("questionnaires") => routes::handle_questionnaire_request(req, state).await,
        Some("data") => routes::handle_data_request(req, state).await,
        _ => None,
    };

    match handled {
        Some(Ok(response)) => response,
        Some(Err(e)) => {
            log_rejection(req, &e);
            routes::error_response(&e)
        }
        None => routes::not_found_response(&req.path),
    }
}

fn log_rejection(req: &ApiRequest, err: &SurveyError) {
    if err.status_code().is_client_error() {
        debug!(method = %req.method, path = %req.path, error = %err, "Request rejected");
    }
}
