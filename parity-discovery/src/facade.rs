use std::collections::BTreeMap;
use std::sync::Arc;
use anyhow::Result as AnyResult;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::watch;
use shared::protocol::{PRIMARY_SERVICE, SERVICES};
use shared::types::{EndpointSet, EnvironmentClass, ServiceName};
use crate::cache::DiscoveryCache;
use crate::candidates::{normalize_base, CandidateListBuilder};
use crate::client::{ClientOptions, ServiceClient};
use crate::config::{ClientConfig, Settings};
use crate::coordinator::DiscoveryService;
use crate::environment::{RuntimeDetector, RuntimeSignals};
use crate::error::{Result, ServiceError};
use crate::hash;
use crate::probe::HttpProbe;

/// Debug snapshot of the discovery state.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkInfo {
    pub environment: EnvironmentClass,
    pub signals: RuntimeSignals,
    pub initialized: bool,
    pub base_url: Option<String>,
    pub known_good: Option<String>,
    pub endpoints: Option<EndpointSet>,
    pub fingerprint: Option<String>,
}

/// The one entry point feature code uses to reach backend services.
#[derive(Clone)]
pub struct ServiceConfig {
    discovery: DiscoveryService,
    client: ClientConfig,
}

impl ServiceConfig {
    pub fn new(discovery: DiscoveryService, client: ClientConfig) -> Self {
        Self { discovery, client }
    }

    /// Wire up the production stack: process detector, HTTP probe, SQLite cache.
    pub fn open(settings: &Settings) -> AnyResult<Self> {
        let detector = Arc::new(RuntimeDetector::new(&settings.environment));
        let probe = Arc::new(HttpProbe::new()?);
        let cache = DiscoveryCache::open(&settings.cache.db_path)?;
        let candidates = CandidateListBuilder::from_config(&settings.discovery);

        let discovery = DiscoveryService::new(detector, candidates, probe, cache, &settings.discovery);
        Ok(Self::new(discovery, settings.client.clone()))
    }

    pub fn discovery(&self) -> &DiscoveryService {
        &self.discovery
    }

    /// Resolved URL for a service, resolving on first use. `None` means the
    /// feature backed by this service is unavailable.
    pub async fn endpoint(&self, name: ServiceName) -> Option<String> {
        self.discovery.resolve().await.get(name).map(str::to_string)
    }

    pub async fn endpoint_named(&self, name: &str) -> Result<Option<String>> {
        let name: ServiceName = name.parse()?;
        Ok(self.endpoint(name).await)
    }

    pub async fn all_endpoints(&self) -> EndpointSet {
        self.discovery.resolve().await
    }

    /// URL of the primary backend.
    pub async fn api_url(&self) -> Option<String> {
        self.endpoint(PRIMARY_SERVICE).await
    }

    pub async fn http_client(&self, name: ServiceName, options: ClientOptions) -> Result<ServiceClient> {
        let base_url = self.endpoint(name).await.ok_or(ServiceError::NoEndpoint(name))?;
        ServiceClient::build(name, &base_url, &options, None)
    }

    /// Like [`Self::http_client`], with a bearer token on every request.
    /// A 401 comes back as [`ServiceError::SessionInvalid`].
    pub async fn authenticated_http_client(
        &self,
        name: ServiceName,
        token: &str,
        options: ClientOptions,
    ) -> Result<ServiceClient> {
        let base_url = self.endpoint(name).await.ok_or(ServiceError::NoEndpoint(name))?;
        ServiceClient::build(name, &base_url, &options, Some(token))
    }

    /// Client options carrying the configured default timeout.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions::from_config(&self.client)
    }

    /// Forget cached and in-memory endpoints and discover again.
    pub async fn refresh(&self) -> EndpointSet {
        self.discovery.refresh().await
    }

    /// Use one known address for every service, without probing.
    pub async fn override_known_good(&self, address: &str) -> EndpointSet {
        let base = normalize_base(address);
        let endpoints = EndpointSet::from_base(&base, &SERVICES);
        self.discovery.override_with(endpoints, Some(base)).await
    }

    /// Install an arbitrary endpoint set, without probing.
    pub async fn set_endpoints(&self, endpoints: EndpointSet) -> EndpointSet {
        self.discovery.override_with(endpoints, None).await
    }

    /// Change notifications for the endpoint set. The current value is visible
    /// immediately through `borrow()`.
    pub fn subscribe(&self) -> watch::Receiver<Option<EndpointSet>> {
        self.discovery.registry().subscribe()
    }

    pub async fn is_service_available(&self, name: ServiceName) -> bool {
        match self.endpoint(name).await {
            Some(url) => self.discovery.check(name, &url).await,
            None => false,
        }
    }

    /// Live reachability of every service's resolved endpoint.
    pub async fn service_status(&self) -> BTreeMap<ServiceName, bool> {
        let endpoints = self.discovery.resolve().await;
        let checks = ServiceName::ALL.into_iter().map(|name| {
            let url = endpoints.get(name).map(str::to_string);
            async move {
                let available = match url {
                    Some(url) => self.discovery.check(name, &url).await,
                    None => false,
                };
                (name, available)
            }
        });
        join_all(checks).await.into_iter().collect()
    }

    pub fn network_info(&self) -> NetworkInfo {
        let endpoints = self.discovery.registry().snapshot();
        NetworkInfo {
            environment: self.discovery.environment(),
            signals: self.discovery.signals(),
            initialized: endpoints.is_some(),
            base_url: endpoints
                .as_ref()
                .and_then(|set| set.get(PRIMARY_SERVICE).map(str::to_string)),
            known_good: self.discovery.known_good(),
            fingerprint: endpoints.as_ref().map(hash::fingerprint),
            endpoints,
        }
    }

    pub async fn shutdown(&self) {
        self.discovery.shutdown().await;
    }
}
