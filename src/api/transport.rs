// HTTP transport for the storefront backend.
// Sends requests, attaches the session token, and converts failures into ApiError.

use std::error::Error as StdError;
use std::future::Future;
use std::io;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};

use super::params::Params;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A request to the backend, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub params: Params,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>, params: Params) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            params,
            body: None,
        }
    }

    pub fn mutation(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Params::new(),
            body,
        }
    }
}

/// A successful backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub data: Value,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }
}

/// Something that can carry an [`ApiRequest`] to the backend.
///
/// Dropping the returned future abandons the request.
pub trait Transport: Send + Sync {
    fn send(&self, request: ApiRequest) -> impl Future<Output = Result<ApiResponse>> + Send;
}

/// Bearer token for the current admin session, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct AuthToken(Arc<RwLock<Option<String>>>);

impl AuthToken {
    pub fn new(token: Option<String>) -> Self {
        Self(Arc::new(RwLock::new(token)))
    }

    pub fn get(&self) -> Option<String> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Forget the token (logout).
    pub fn clear(&self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_set(&self) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Error body shape returned by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    token: AuthToken,
}

impl HttpTransport {
    /// Create a transport for the given base URL.
    pub fn new(base_url: &str, token: AuthToken) -> Result<Self> {
        Self::build(base_url, token, None)
    }

    /// Create a transport from client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::build(
            &config.base_url,
            AuthToken::new(config.token.clone()),
            config.timeout,
        )
    }

    fn build(base_url: &str, token: AuthToken, timeout: Option<Duration>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("storefront-client/", env!("CARGO_PKG_VERSION"))),
        );

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ApiError::Transport)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// The session token attached to requests.
    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Check response status and convert errors.
    async fn check_response(&self, response: Response) -> Result<ApiResponse> {
        let status = response.status();
        let text = response.text().await.map_err(ApiError::Transport)?;

        if status.is_success() {
            return Ok(ApiResponse {
                status,
                data: parse_body(&text),
            });
        }

        let message = error_message(&text);
        let error = ApiError::status(status, message);

        if status == StatusCode::UNAUTHORIZED {
            warn!("unauthorized response, clearing session token");
            self.token.clear();
        } else if error.is_transient() {
            warn!(status = %status, "backend connection limit reached: {}", error);
        }

        Err(error)
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method.into(), self.url(&request.path));

        if !request.params.is_empty() {
            builder = builder.query(&request.params.to_query());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = self.token.get() {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(classify_send_error)?;
        self.check_response(response).await
    }
}

/// Decode a success body: JSON when possible, raw text otherwise, null when empty.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Pull the backend's `message` out of an error body, falling back to the raw text.
fn error_message(text: &str) -> Option<String> {
    if let Ok(ErrorBody {
        message: Some(message),
    }) = serde_json::from_str::<ErrorBody>(text)
    {
        return Some(message);
    }

    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Map a send failure, singling out refused connections.
fn classify_send_error(err: reqwest::Error) -> ApiError {
    if is_connection_refused(&err) {
        ApiError::ConnectionRefused(err.to_string())
    } else {
        ApiError::Transport(err)
    }
}

fn is_connection_refused(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joins_without_double_slash() {
        let transport = HttpTransport::new("https://api.example.com/api/", AuthToken::default())
            .unwrap();
        assert_eq!(transport.url("/featured"), "https://api.example.com/api/featured");
        assert_eq!(transport.url("categories"), "https://api.example.com/api/categories");
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("  "), Value::Null);
        assert_eq!(parse_body(r#"{"id": 42}"#), json!({"id": 42}));
        assert_eq!(parse_body("created"), json!("created"));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"message": "max_connections_per_hour exceeded"}"#),
            Some("max_connections_per_hour exceeded".to_string())
        );
        assert_eq!(
            error_message("Service Unavailable"),
            Some("Service Unavailable".to_string())
        );
        assert_eq!(error_message(r#"{"error": "nope"}"#), Some(r#"{"error": "nope"}"#.to_string()));
        assert_eq!(error_message(""), None);
    }

    #[test]
    fn test_auth_token_shared_between_clones() {
        let token = AuthToken::new(Some("secret".to_string()));
        let clone = token.clone();
        assert_eq!(clone.get().as_deref(), Some("secret"));

        token.clear();
        assert!(!clone.is_set());

        clone.set("fresh");
        assert_eq!(token.get().as_deref(), Some("fresh"));
    }

    /// Transport that ignores proxy settings, so local sockets are reached directly.
    fn direct_transport(base_url: &str, token: AuthToken) -> HttpTransport {
        HttpTransport {
            client: Client::builder().no_proxy().build().unwrap(),
            base_url: base_url.to_string(),
            token,
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_transient() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = direct_transport(&format!("http://{}", addr), AuthToken::default());
        let err = transport
            .send(ApiRequest::get("/featured", Params::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::ConnectionRefused(_)), "got {:?}", err);
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_unauthorized_clears_token() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let body = r#"{"message":"Unauthenticated."}"#;
            let response = format!(
                "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_lowercase()
        });

        let token = AuthToken::new(Some("admin-session".to_string()));
        let transport = direct_transport(&format!("http://{}", addr), token.clone());
        let err = transport
            .send(ApiRequest::get("/orders/1", Params::new()))
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert!(!err.is_transient());
        assert_eq!(err.user_message(), "Unauthenticated.");
        assert!(!token.is_set());

        let request = server.await.unwrap();
        assert!(request.starts_with("get /orders/1 "));
        assert!(request.contains("authorization: bearer admin-session"));
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(reqwest::Method::from(Method::Get), reqwest::Method::GET);
        assert_eq!(reqwest::Method::from(Method::Delete), reqwest::Method::DELETE);
    }
}
