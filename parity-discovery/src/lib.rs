//! Endpoint discovery for the Parity client.
//!
//! Finds which base address currently reaches the backend services, caches the
//! resulting name -> URL table durably, and hands it to feature code through
//! [`ServiceConfig`].
//!
//! ```rust,ignore
//! let service = ServiceConfig::open(&Settings::default())?;
//! let url = service.endpoint(ServiceName::AiCoaching).await;
//! let client = service.authenticated_http_client(ServiceName::Backend, &token, ClientOptions::default()).await?;
//! ```

pub mod cache;
pub mod candidates;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod environment;
pub mod error;
pub mod facade;
pub mod hash;
pub mod probe;
pub mod registry;

pub use cache::DiscoveryCache;
pub use candidates::CandidateListBuilder;
pub use client::{ClientOptions, ServiceClient};
pub use config::{CacheConfig, ClientConfig, DiscoveryConfig, EnvironmentOverrides, Settings};
pub use coordinator::DiscoveryService;
pub use environment::{EnvironmentDetector, Platform, RuntimeDetector, RuntimeSignals, StaticDetector};
pub use error::{Result, ServiceError};
pub use facade::{NetworkInfo, ServiceConfig};
pub use probe::{HttpProbe, Probe};
pub use registry::ServiceRegistry;

pub use shared::types::{BuildMode, CacheRecord, DeviceKind, EndpointSet, EnvironmentClass, ServiceName};
