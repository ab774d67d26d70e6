//! Drives endpoint resolution.
//!
//! A resolution run is spawned as its own task and shared between every
//! caller that asks while it is in flight. Runs carry a cancellation token;
//! `refresh`, `override_with` and `shutdown` cancel the current run, and a
//! cancelled run never writes to the registry or the cache. All writes go
//! through the commit lock, which also guards the cache read at the start of
//! a run, so a refresh cannot interleave with a run that already read stale
//! state.

use std::sync::Arc;
use std::time::Duration;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use shared::protocol::{descriptor, production_endpoints, PRIMARY_SERVICE, SERVICES};
use shared::types::{EndpointSet, EnvironmentClass, ServiceDescriptor, ServiceName};
use crate::cache::DiscoveryCache;
use crate::candidates::CandidateListBuilder;
use crate::config::DiscoveryConfig;
use crate::environment::{EnvironmentDetector, RuntimeSignals};
use crate::probe::Probe;
use crate::registry::ServiceRegistry;

type FlightResult = Shared<BoxFuture<'static, Option<EndpointSet>>>;

struct Flight {
    cancel: CancellationToken,
    result: FlightResult,
}

struct Inner {
    detector: Arc<dyn EnvironmentDetector>,
    class: EnvironmentClass,
    candidates: CandidateListBuilder,
    probe: Arc<dyn Probe>,
    probe_timeout: Duration,
    health_path: Option<String>,
    registry: ServiceRegistry,
    cache: DiscoveryCache,
    known_good: Mutex<Option<String>>,
    flight: Mutex<Option<Flight>>,
    commit: tokio::sync::Mutex<()>,
    closed: CancellationToken,
}

/// Handle to the discovery subsystem. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct DiscoveryService {
    inner: Arc<Inner>,
}

impl DiscoveryService {
    pub fn new(
        detector: Arc<dyn EnvironmentDetector>,
        candidates: CandidateListBuilder,
        probe: Arc<dyn Probe>,
        cache: DiscoveryCache,
        config: &DiscoveryConfig,
    ) -> Self {
        let class = detector.classify();
        tracing::info!("Runtime environment classified as {}", class);

        Self {
            inner: Arc::new(Inner {
                detector,
                class,
                candidates,
                probe,
                probe_timeout: config.probe_timeout(),
                health_path: config.health_path.clone(),
                registry: ServiceRegistry::new(),
                cache,
                known_good: Mutex::new(None),
                flight: Mutex::new(None),
                commit: tokio::sync::Mutex::new(()),
                closed: CancellationToken::new(),
            }),
        }
    }

    pub fn environment(&self) -> EnvironmentClass {
        self.inner.class
    }

    pub fn signals(&self) -> RuntimeSignals {
        self.inner.detector.signals()
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.inner.registry
    }

    /// Base address confirmed this session, if any.
    pub fn known_good(&self) -> Option<String> {
        self.inner.known_good.lock().clone()
    }

    /// Resolve the endpoint set, joining an in-flight run if there is one.
    /// Once resolved, returns the registry contents without touching the network.
    pub async fn resolve(&self) -> EndpointSet {
        loop {
            if let Some(endpoints) = self.inner.registry.snapshot() {
                return endpoints;
            }
            if self.inner.closed.is_cancelled() {
                return production_endpoints();
            }

            // None means the run was superseded; go around and join its successor
            if let Some(endpoints) = self.inner.join_or_start().await {
                return endpoints;
            }
        }
    }

    /// Drop cached and in-memory state and run discovery again.
    pub async fn refresh(&self) -> EndpointSet {
        tracing::info!("Refreshing endpoints");
        {
            let _commit = self.inner.commit.lock().await;
            self.inner.cancel_flight();
            if let Err(e) = self.inner.cache.clear().await {
                tracing::warn!("Failed to clear endpoint cache: {}", e);
            }
            self.inner.registry.clear();
        }
        self.resolve().await
    }

    /// Install an endpoint set directly, bypassing discovery. A set with no
    /// resolved entry is replaced by the production table.
    pub async fn override_with(&self, endpoints: EndpointSet, base_address: Option<String>) -> EndpointSet {
        let (endpoints, base_address) = if endpoints.is_empty() {
            tracing::warn!("Override has no resolved entries, using production endpoints");
            (production_endpoints(), None)
        } else {
            (endpoints, base_address)
        };

        let _commit = self.inner.commit.lock().await;
        self.inner.cancel_flight();

        tracing::info!("Manually setting endpoints (base {:?})", base_address);
        self.inner.registry.set(endpoints.clone());
        if let Err(e) = self.inner.cache.save(&endpoints, base_address.as_deref()).await {
            tracing::warn!("Failed to persist overridden endpoints: {}", e);
        }
        *self.inner.known_good.lock() = base_address;

        endpoints
    }

    /// Probe one service's resolved URL with its health path.
    pub async fn check(&self, name: ServiceName, url: &str) -> bool {
        let service = descriptor(name);
        self.inner
            .probe
            .probe(url, self.inner.health_path_for(service), self.inner.probe_timeout)
            .await
    }

    /// Cancel any in-flight run and stop the cache store. After shutdown no
    /// probing starts; `resolve` returns the current set or the production table.
    pub async fn shutdown(&self) {
        self.inner.closed.cancel();
        self.inner.cancel_flight();
        if let Err(e) = self.inner.cache.shutdown().await {
            tracing::error!("Failed to shutdown endpoint cache: {}", e);
        }
        tracing::info!("Discovery service shut down");
    }
}

impl Inner {
    fn join_or_start(self: &Arc<Self>) -> FlightResult {
        let mut flight = self.flight.lock();

        if let Some(current) = flight.as_ref() {
            if current.result.peek().is_none() {
                return current.result.clone();
            }
        }

        let cancel = self.closed.child_token();
        let handle = tokio::spawn(Arc::clone(self).run(cancel.clone()));
        let result = async move {
            match handle.await {
                Ok(endpoints) => endpoints,
                Err(e) => {
                    tracing::error!("Discovery task failed: {}", e);
                    None
                }
            }
        }
        .boxed()
        .shared();

        *flight = Some(Flight {
            cancel,
            result: result.clone(),
        });
        result
    }

    fn cancel_flight(&self) {
        if let Some(current) = self.flight.lock().take() {
            current.cancel.cancel();
        }
    }

    fn health_path_for<'a>(&'a self, service: &'a ServiceDescriptor) -> &'a str {
        self.health_path.as_deref().unwrap_or(service.health_path)
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) -> Option<EndpointSet> {
        {
            let _commit = self.commit.lock().await;
            if cancel.is_cancelled() {
                return None;
            }
            match self.cache.load().await {
                Ok(Some(record)) if record.endpoints.is_empty() => {
                    tracing::warn!("Cached endpoint set has no entries, probing instead");
                }
                Ok(Some(record)) => {
                    tracing::info!(
                        "Restored endpoints from cache (written {}, base {:?})",
                        record.written_at,
                        record.discovered_at
                    );
                    if record.discovered_at.is_some() {
                        *self.known_good.lock() = record.discovered_at.clone();
                    }
                    self.registry.set(record.endpoints.clone());
                    return Some(record.endpoints);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Failed to read endpoint cache, probing instead: {}", e);
                }
            }
        }

        let known_good = self.known_good.lock().clone();
        let candidates = self
            .candidates
            .clone()
            .with_known_good(known_good)
            .build(self.class);

        tracing::info!(
            "Probing {} candidate base addresses for {}",
            candidates.len(),
            PRIMARY_SERVICE
        );

        let base = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            base = self.find_primary(&candidates) => base,
        };

        let (endpoints, discovered_at) = match base {
            Some(base) => {
                let endpoints = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return None,
                    endpoints = self.probe_services(&base) => endpoints,
                };
                (endpoints, Some(base))
            }
            None => {
                tracing::warn!(
                    "No candidate reachable for {}, using production endpoints",
                    PRIMARY_SERVICE
                );
                (production_endpoints(), None)
            }
        };

        let _commit = self.commit.lock().await;
        if cancel.is_cancelled() {
            tracing::debug!("Discovery run superseded before commit");
            return None;
        }

        self.registry.set(endpoints.clone());
        if discovered_at.is_some() {
            *self.known_good.lock() = discovered_at.clone();
        }
        if let Err(e) = self.cache.save(&endpoints, discovered_at.as_deref()).await {
            tracing::warn!("Failed to persist discovered endpoints: {}", e);
        }

        Some(endpoints)
    }

    /// Sequential, first success wins.
    async fn find_primary(&self, candidates: &[String]) -> Option<String> {
        let primary = descriptor(PRIMARY_SERVICE);

        for base in candidates {
            let url = primary.url_for(base);
            if self
                .probe
                .probe(&url, self.health_path_for(primary), self.probe_timeout)
                .await
            {
                tracing::info!("Found working {} at {}", PRIMARY_SERVICE, url);
                return Some(base.clone());
            }
            tracing::debug!("{} not reachable at {}", PRIMARY_SERVICE, url);
        }

        None
    }

    /// Every service against one confirmed base address, concurrently.
    /// The primary is already confirmed and is not probed again.
    async fn probe_services(&self, base: &str) -> EndpointSet {
        let checks = SERVICES.iter().map(|service| async move {
            let url = service.url_for(base);
            if service.name == PRIMARY_SERVICE {
                return (service.name, Some(url));
            }

            let reachable = self
                .probe
                .probe(&url, self.health_path_for(service), self.probe_timeout)
                .await;
            if reachable {
                tracing::info!("{} service found at {}", service.name, url);
                (service.name, Some(url))
            } else {
                tracing::warn!("{} service not reachable at {}", service.name, url);
                (service.name, None)
            }
        });

        join_all(checks).await.into_iter().collect()
    }
}
