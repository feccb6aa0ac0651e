//! Request parsing and response building shared by every route

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::error;

use crate::types::{Page, Result, SurveyError};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Header carrying a questionnaire's shared password
pub const QUESTIONNAIRE_PASSWORD_HEADER: &str = "x-questionnaire-password";

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Questionnaire-Password, X-Request-Id";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A fully read request: head plus a size-capped body
#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    /// Path without trailing slash ("/" stays "/")
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiRequest {
    /// Read the request, rejecting bodies over `max_body_bytes`
    pub async fn read<B>(req: Request<B>, max_body_bytes: usize) -> Result<Self>
    where
        B: hyper::body::Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();

        let body = Limited::new(body, max_body_bytes)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    SurveyError::BadRequest("Request body too large".into())
                } else {
                    SurveyError::Http(format!("Failed to read body: {}", e))
                }
            })?
            .to_bytes();

        Ok(Self {
            method: parts.method,
            path: normalize_path(parts.uri.path()),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body,
        })
    }

    /// Path segments, e.g. `/data/7` -> `["data", "7"]`
    pub fn segments(&self) -> Vec<&str> {
        self.path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn auth_header(&self) -> Option<&str> {
        self.header(hyper::header::AUTHORIZATION.as_str())
    }

    pub fn questionnaire_password(&self) -> Option<&str> {
        self.header(QUESTIONNAIRE_PASSWORD_HEADER)
    }

    /// Deserialize a JSON body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| SurveyError::BadRequest(format!("Invalid JSON body: {}", e)))
    }

    /// Deserialize an urlencoded form body, or JSON when the content type says so
    pub fn form_or_json<T: DeserializeOwned>(&self) -> Result<T> {
        let is_json = self
            .header(CONTENT_TYPE.as_str())
            .is_some_and(|ct| ct.starts_with("application/json"));
        if is_json {
            return self.json();
        }
        serde_urlencoded::from_bytes(&self.body)
            .map_err(|e| SurveyError::BadRequest(format!("Invalid form body: {}", e)))
    }

    /// Deserialize the query string (missing query parses as empty)
    pub fn query<T: DeserializeOwned>(&self) -> Result<T> {
        serde_urlencoded::from_str(self.query.as_deref().unwrap_or(""))
            .map_err(|e| SurveyError::BadRequest(format!("Invalid query parameters: {}", e)))
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a numeric path segment
pub fn parse_id(segment: &str) -> Result<i64> {
    segment
        .parse()
        .map_err(|_| SurveyError::BadRequest(format!("Invalid id: {}", segment)))
}

/// `skip`/`limit` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl PageQuery {
    /// Clamp to `max_page_size`, which is also the default limit.
    /// A zero limit is rejected.
    pub fn to_page(&self, max_page_size: usize) -> Result<Page> {
        if self.limit == Some(0) {
            return Err(SurveyError::BadRequest("limit must be at least 1".into()));
        }
        Ok(Page::new(
            self.skip.unwrap_or(0),
            self.limit.unwrap_or(max_page_size).min(max_page_size),
        ))
    }
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

fn with_cors(mut response: Response<BoxBody>) -> Response<BoxBody> {
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("access-control-allow-origin"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut response = Response::new(full_body(json));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    with_cors(response)
}

pub fn no_content() -> Response<BoxBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = StatusCode::NO_CONTENT;
    with_cors(response)
}

pub fn cors_preflight() -> Response<BoxBody> {
    let mut response = no_content();
    response.headers_mut().insert(
        HeaderName::from_static("access-control-max-age"),
        HeaderValue::from_static("86400"),
    );
    response
}

/// Translate an error into its JSON response. Server-side failures are
/// logged and their details withheld.
pub fn error_response(err: &SurveyError) -> Response<BoxBody> {
    let status = err.status_code();
    let message = if status.is_server_error() {
        error!(error = %err, "Request failed");
        match status {
            StatusCode::SERVICE_UNAVAILABLE => "Storage unavailable".to_string(),
            _ => "Internal server error".to_string(),
        }
    } else {
        err.detail().to_string()
    };

    json_response(
        status,
        &ErrorResponse {
            error: message,
            code: Some(error_code(status).to_string()),
        },
    )
}

fn error_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
        StatusCode::FORBIDDEN => "FORBIDDEN",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::CONFLICT => "CONFLICT",
        StatusCode::SERVICE_UNAVAILABLE => "UNAVAILABLE",
        _ => "INTERNAL",
    }
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("No route for {}", path),
            code: Some("NOT_FOUND".into()),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, uri: &str, body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    #[tokio::test]
    async fn test_read_normalizes_path() {
        let req = ApiRequest::read(request(Method::GET, "/data/7/?skip=2", ""), 1024)
            .await
            .unwrap();
        assert_eq!(req.path, "/data/7");
        assert_eq!(req.segments(), vec!["data", "7"]);

        let page: PageQuery = req.query().unwrap();
        assert_eq!(page.to_page(100).unwrap(), Page::new(2, 100));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let err = ApiRequest::read(request(Method::POST, "/users", "0123456789"), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, SurveyError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_form_body() {
        #[derive(Deserialize)]
        struct Login {
            username: String,
            password: String,
        }
        let req = ApiRequest::read(
            request(Method::POST, "/auth/token", "username=alice&password=p%40ss"),
            1024,
        )
        .await
        .unwrap();
        let login: Login = req.form_or_json().unwrap();
        assert_eq!(login.username, "alice");
        assert_eq!(login.password, "p@ss");
    }

    #[test]
    fn test_page_is_clamped() {
        let q = PageQuery {
            skip: None,
            limit: Some(10_000),
        };
        assert_eq!(q.to_page(100).unwrap(), Page::new(0, 100));
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let q = PageQuery {
            skip: Some(3),
            limit: Some(0),
        };
        assert!(matches!(q.to_page(100), Err(SurveyError::BadRequest(_))));
    }

    #[test]
    fn test_error_response_hides_server_details() {
        let response = error_response(&SurveyError::Database("connection refused".into()));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = error_response(&SurveyError::NotOwned("nope".into()));
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}
