use std::collections::BTreeMap;
use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use parity_discovery::{hash, NetworkInfo, ServiceConfig};
use shared::types::{EndpointSet, ServiceName};
use crate::config::ApiConfig;

#[derive(Clone)]
pub struct AppState {
    pub service: ServiceConfig,
    pub config: Arc<ApiConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndpointResponse {
    pub service: ServiceName,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub address: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/endpoints", get(get_endpoints))
        .route("/v1/endpoints/hash", get(get_hash))
        .route("/v1/endpoints/:service", get(get_endpoint))
        .route("/v1/network", get(get_network))
        .route("/v1/status", get(get_status))
        .route("/v1/refresh", post(refresh))
        .route("/v1/override", post(override_known_good))
        .with_state(state)
}

async fn get_endpoints(State(state): State<AppState>) -> Json<EndpointSet> {
    Json(state.service.all_endpoints().await)
}

async fn get_hash(State(state): State<AppState>) -> String {
    hash::fingerprint(&state.service.all_endpoints().await)
}

async fn get_endpoint(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<Json<EndpointResponse>, StatusCode> {
    let service: ServiceName = service.parse().map_err(|_| StatusCode::NOT_FOUND)?;

    Ok(Json(EndpointResponse {
        service,
        url: state.service.endpoint(service).await,
    }))
}

async fn get_network(State(state): State<AppState>) -> Json<NetworkInfo> {
    Json(state.service.network_info())
}

async fn get_status(State(state): State<AppState>) -> Json<BTreeMap<ServiceName, bool>> {
    Json(state.service.service_status().await)
}

async fn refresh(State(state): State<AppState>) -> Json<EndpointSet> {
    Json(state.service.refresh().await)
}

async fn override_known_good(
    State(state): State<AppState>,
    Json(request): Json<OverrideRequest>,
) -> Result<Json<EndpointSet>, StatusCode> {
    if request.address.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    tracing::info!("Override requested via API on {}: {}", state.config.listen, request.address);

    Ok(Json(state.service.override_known_good(&request.address).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, header};
    use tower::ServiceExt;
    use parity_discovery::{
        CandidateListBuilder, ClientConfig, DiscoveryCache, DiscoveryConfig, DiscoveryService,
        EnvironmentClass, HttpProbe, StaticDetector,
    };
    use shared::protocol::production_endpoints;

    /// Release classification with no hosts: resolution never touches the network.
    fn app() -> Router {
        let discovery = DiscoveryService::new(
            Arc::new(StaticDetector(EnvironmentClass::default())),
            CandidateListBuilder::default(),
            Arc::new(HttpProbe::new().unwrap()),
            DiscoveryCache::open(":memory:").unwrap(),
            &DiscoveryConfig::default(),
        );
        router(AppState {
            service: ServiceConfig::new(discovery, ClientConfig::default()),
            config: Arc::new(ApiConfig::default()),
        })
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_endpoints_falls_back_to_production() {
        let response = app()
            .oneshot(Request::get("/v1/endpoints").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let endpoints: EndpointSet = body_json(response).await;
        assert_eq!(endpoints, production_endpoints());
    }

    #[tokio::test]
    async fn test_get_single_endpoint() {
        let app = app();

        let response = app
            .clone()
            .oneshot(Request::get("/v1/endpoints/aiCoaching").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: EndpointResponse = body_json(response).await;
        assert_eq!(body.service, ServiceName::AiCoaching);
        assert_eq!(body.url.as_deref(), Some("https://ai-coaching.parity-app.com"));

        let response = app
            .oneshot(Request::get("/v1/endpoints/payments").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_override_then_hash_changes() {
        let app = app();

        let before = app
            .clone()
            .oneshot(Request::get("/v1/endpoints/hash").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let before = to_bytes(before.into_body(), usize::MAX).await.unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::post("/v1/override")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"address":"192.168.9.9"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let endpoints: EndpointSet = body_json(response).await;
        assert_eq!(endpoints.get(ServiceName::NotificationService), Some("http://192.168.9.9:8004"));

        let after = app
            .clone()
            .oneshot(Request::get("/v1/endpoints/hash").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let after = to_bytes(after.into_body(), usize::MAX).await.unwrap();
        assert_ne!(before, after);

        let response = app
            .oneshot(Request::get("/v1/network").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let info: serde_json::Value = body_json(response).await;
        assert_eq!(info["initialized"], true);
        assert_eq!(info["known_good"], "http://192.168.9.9");
        assert_eq!(info["environment"]["device"], "physical-device");
    }

    #[tokio::test]
    async fn test_override_rejects_blank_address() {
        let response = app()
            .oneshot(
                Request::post("/v1/override")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"address":"  "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_refresh_returns_fresh_set() {
        let response = app()
            .oneshot(Request::post("/v1/refresh").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let endpoints: EndpointSet = body_json(response).await;
        assert_eq!(endpoints, production_endpoints());
    }
}
