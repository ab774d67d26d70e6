use std::time::Duration;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::types::ServiceName;
use crate::config::ClientConfig;
use crate::error::{Result, ServiceError};

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub headers: Vec<(String, String)>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl ClientOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            timeout: config.timeout(),
            headers: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// HTTP client bound to one service's resolved base URL.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    service: ServiceName,
    base_url: String,
    client: reqwest::Client,
    authenticated: bool,
}

impl ServiceClient {
    pub(crate) fn build(
        service: ServiceName,
        base_url: &str,
        options: &ClientOptions,
        bearer_token: Option<&str>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &options.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ServiceError::InvalidHeader { name: name.clone(), reason: e.to_string() }
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                ServiceError::InvalidHeader { name: name.clone(), reason: e.to_string() }
            })?;
            headers.insert(header_name, header_value);
        }

        if let Some(token) = bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                ServiceError::InvalidHeader { name: AUTHORIZATION.to_string(), reason: e.to_string() }
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()
            .map_err(ServiceError::ClientBuild)?;

        Ok(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            authenticated: bearer_token.is_some(),
        })
    }

    pub fn service(&self) -> ServiceName {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Send a request built from [`Self::request`], mapping non-success statuses to errors.
    /// A 401 on an authenticated client becomes [`ServiceError::SessionInvalid`].
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED && self.authenticated {
            tracing::warn!("Authentication failed for {}", self.service);
            return Err(ServiceError::SessionInvalid { service: self.service });
        }

        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::Status {
            service: self.service,
            status,
            body,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.send(self.request(Method::POST, path).json(body)).await?;
        Ok(response.json().await?)
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    async fn whoami(headers: AxumHeaders) -> std::result::Result<Json<Value>, AxumStatus> {
        match headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some("Bearer good-token") => Ok(Json(json!({ "user": "ana" }))),
            _ => Err(AxumStatus::UNAUTHORIZED),
        }
    }

    async fn serve() -> String {
        let router = Router::new()
            .route("/users/me", get(whoami))
            .route("/echo", post(|Json(body): Json<Value>| async move { Json(body) }))
            .route("/broken", get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_bearer_token_attached() {
        let base = serve().await;
        let client = ServiceClient::build(
            ServiceName::Backend,
            &base,
            &ClientOptions::default(),
            Some("good-token"),
        )
        .unwrap();

        let me: Value = client.get("/users/me").await.unwrap();
        assert_eq!(me["user"], "ana");
    }

    #[tokio::test]
    async fn test_unauthorized_signals_session_invalid() {
        let base = serve().await;
        let client = ServiceClient::build(
            ServiceName::Backend,
            &base,
            &ClientOptions::default(),
            Some("expired-token"),
        )
        .unwrap();

        let err = client.get::<Value>("/users/me").await.unwrap_err();
        assert!(err.is_session_invalid(), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_plain_client_reports_status() {
        let base = serve().await;
        let client = ServiceClient::build(ServiceName::Backend, &base, &ClientOptions::default(), None).unwrap();

        match client.get::<Value>("/users/me").await.unwrap_err() {
            ServiceError::Status { status, .. } => assert_eq!(status, StatusCode::UNAUTHORIZED),
            other => panic!("unexpected error: {}", other),
        }
        match client.get::<Value>("/broken").await.unwrap_err() {
            ServiceError::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {}", other),
        }

        let echoed: Value = client.post("echo", &json!({ "text": "hi" })).await.unwrap();
        assert_eq!(echoed["text"], "hi");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let options = ClientOptions::default().with_header("bad header", "x");
        let err = ServiceClient::build(ServiceName::Backend, "http://localhost:8000", &options, None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidHeader { .. }));
    }

    #[test]
    fn test_url_joining() {
        let client = ServiceClient::build(
            ServiceName::AiCoaching,
            "http://10.0.2.2:8001/",
            &ClientOptions::default().with_timeout(Duration::from_secs(2)),
            None,
        )
        .unwrap();
        assert_eq!(client.url("/sessions"), "http://10.0.2.2:8001/sessions");
        assert_eq!(client.url("sessions"), "http://10.0.2.2:8001/sessions");
        assert!(!client.is_authenticated());
    }
}
