use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// Logical backend services the client routes calls to.
/// Serialized names match the keys used in the persisted endpoint blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceName {
    Backend,
    AiCoaching,
    SocialAffirmation,
    RelationshipAnalytics,
    ContentModeration,
    NotificationService,
}

impl ServiceName {
    pub const ALL: [ServiceName; 6] = [
        ServiceName::Backend,
        ServiceName::AiCoaching,
        ServiceName::SocialAffirmation,
        ServiceName::RelationshipAnalytics,
        ServiceName::ContentModeration,
        ServiceName::NotificationService,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Backend => "backend",
            ServiceName::AiCoaching => "aiCoaching",
            ServiceName::SocialAffirmation => "socialAffirmation",
            ServiceName::RelationshipAnalytics => "relationshipAnalytics",
            ServiceName::ContentModeration => "contentModeration",
            ServiceName::NotificationService => "notificationService",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownServiceName(pub String);

impl fmt::Display for UnknownServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown service name: {}", self.0)
    }
}

impl std::error::Error for UnknownServiceName {}

impl FromStr for ServiceName {
    type Err = UnknownServiceName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownServiceName(s.to_string()))
    }
}

/// Static definition of one logical service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: ServiceName,

    /// Port the service listens on, combined with a discovered base address
    pub port: u16,

    /// Path answered by the service's liveness check, e.g. "/health"
    pub health_path: &'static str,
}

impl ServiceDescriptor {
    /// Full service URL for a base address (scheme + host, no port).
    pub fn url_for(&self, base_address: &str) -> String {
        format!("{}:{}", base_address.trim_end_matches('/'), self.port)
    }
}

/// Resolved service name -> URL mapping. `None` means "not resolved or unreachable".
/// This is the unit of caching and the unit handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointSet {
    endpoints: BTreeMap<ServiceName, Option<String>>,
}

impl EndpointSet {
    /// A set with every service present and unresolved.
    pub fn unresolved() -> Self {
        ServiceName::ALL.into_iter().map(|name| (name, None)).collect()
    }

    /// Every service resolved against one base address.
    pub fn from_base(base_address: &str, services: &[ServiceDescriptor]) -> Self {
        let mut set = Self::unresolved();
        for service in services {
            set.set(service.name, Some(service.url_for(base_address)));
        }
        set
    }

    pub fn get(&self, name: ServiceName) -> Option<&str> {
        self.endpoints.get(&name).and_then(|url| url.as_deref())
    }

    pub fn set(&mut self, name: ServiceName, url: Option<String>) {
        self.endpoints.insert(name, url);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ServiceName, Option<&str>)> {
        self.endpoints.iter().map(|(name, url)| (*name, url.as_deref()))
    }

    /// True if the primary service resolved, i.e. discovery succeeded at least partially.
    pub fn is_resolved(&self) -> bool {
        self.get(ServiceName::Backend).is_some()
    }

    /// True if no entry resolved at all.
    pub fn is_empty(&self) -> bool {
        self.endpoints.values().all(Option::is_none)
    }
}

impl FromIterator<(ServiceName, Option<String>)> for EndpointSet {
    fn from_iter<I: IntoIterator<Item = (ServiceName, Option<String>)>>(iter: I) -> Self {
        Self { endpoints: iter.into_iter().collect() }
    }
}

/// Persisted form of a resolution: stored as one blob under a fixed key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub endpoints: EndpointSet,

    /// Base address the set was derived from, if it came from discovery or override
    pub discovered_at: Option<String>,

    pub written_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKind {
    #[default]
    PhysicalDevice,
    Emulator,
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BuildMode {
    Debug,
    #[default]
    Release,
}

/// Coarse classification of the execution context.
/// The default is the conservative physical-device/release pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct EnvironmentClass {
    pub device: DeviceKind,
    pub build: BuildMode,
}

impl EnvironmentClass {
    pub fn new(device: DeviceKind, build: BuildMode) -> Self {
        Self { device, build }
    }

    pub fn is_debug(&self) -> bool {
        self.build == BuildMode::Debug
    }
}

impl fmt::Display for EnvironmentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = match self.device {
            DeviceKind::PhysicalDevice => "physical-device",
            DeviceKind::Emulator => "emulator",
            DeviceKind::Browser => "browser",
        };
        let build = match self.build {
            BuildMode::Debug => "debug",
            BuildMode::Release => "release",
        };
        write!(f, "{}/{}", device, build)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name_parse() {
        assert_eq!("aiCoaching".parse::<ServiceName>().unwrap(), ServiceName::AiCoaching);
        assert!("ai_coaching".parse::<ServiceName>().is_err());

        for name in ServiceName::ALL {
            assert_eq!(name.as_str().parse::<ServiceName>().unwrap(), name);
        }
    }

    #[test]
    fn test_endpoint_set_keeps_null_entries() {
        let mut set = EndpointSet::unresolved();
        set.set(ServiceName::Backend, Some("http://10.0.2.2:8000".to_string()));

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["backend"], "http://10.0.2.2:8000");
        assert!(json["aiCoaching"].is_null());

        let back: EndpointSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
        assert!(back.is_resolved());
        assert!(!back.is_empty());
    }

    #[test]
    fn test_default_classification_is_conservative() {
        let class = EnvironmentClass::default();
        assert_eq!(class.device, DeviceKind::PhysicalDevice);
        assert_eq!(class.build, BuildMode::Release);
        assert_eq!(class.to_string(), "physical-device/release");
    }
}
