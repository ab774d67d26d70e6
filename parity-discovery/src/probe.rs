use std::time::Duration;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};

/// One bounded-time liveness check.
///
/// Returns `true` only for a success-class response inside `timeout`.
/// Transport errors, error statuses and timeouts all collapse into `false`.
/// Dropping the returned future cancels the request.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, base_url: &str, health_path: &str, timeout: Duration) -> bool;
}

/// Probe issuing `GET {base_url}{health_path}` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .pool_max_idle_per_host(0)
            .build()
            .context("Failed to create probe HTTP client")?;

        Ok(Self { client })
    }
}

pub fn health_url(base_url: &str, health_path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if health_path.starts_with('/') {
        format!("{}{}", base, health_path)
    } else {
        format!("{}/{}", base, health_path)
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, base_url: &str, health_path: &str, timeout: Duration) -> bool {
        let url = health_url(base_url, health_path);
        tracing::debug!("Probing {}", url);

        let request = self
            .client
            .get(&url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .timeout(timeout)
            .send();

        // The outer timeout also bounds DNS and connect; on expiry the request
        // future is dropped, which aborts the connection.
        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => {
                let status = response.status();
                tracing::debug!("Response from {}: {}", url, status);
                status.is_success()
            }
            Ok(Err(e)) => {
                tracing::debug!("Probe of {} failed: {}", url, e);
                false
            }
            Err(_) => {
                tracing::debug!("Probe of {} timed out after {:?}", url, timeout);
                false
            }
        }
    }
}
