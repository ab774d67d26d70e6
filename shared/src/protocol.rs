use crate::types::{EndpointSet, ServiceDescriptor, ServiceName};

/// Liveness path every service answers
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Storage key holding the serialized CacheRecord
pub const CACHE_KEY: &str = "api_endpoints";

/// Service whose reachability decides which base address wins
pub const PRIMARY_SERVICE: ServiceName = ServiceName::Backend;

/// Fixed service table
pub const SERVICES: [ServiceDescriptor; 6] = [
    ServiceDescriptor { name: ServiceName::Backend, port: 8000, health_path: DEFAULT_HEALTH_PATH },
    ServiceDescriptor { name: ServiceName::AiCoaching, port: 8001, health_path: DEFAULT_HEALTH_PATH },
    ServiceDescriptor { name: ServiceName::SocialAffirmation, port: 4000, health_path: DEFAULT_HEALTH_PATH },
    ServiceDescriptor { name: ServiceName::RelationshipAnalytics, port: 8002, health_path: DEFAULT_HEALTH_PATH },
    ServiceDescriptor { name: ServiceName::ContentModeration, port: 8003, health_path: DEFAULT_HEALTH_PATH },
    ServiceDescriptor { name: ServiceName::NotificationService, port: 8004, health_path: DEFAULT_HEALTH_PATH },
];

/// Compiled-in endpoints used when every discovery candidate fails
pub const PRODUCTION_ENDPOINTS: [(ServiceName, &str); 6] = [
    (ServiceName::Backend, "https://api.parity-app.com"),
    (ServiceName::AiCoaching, "https://ai-coaching.parity-app.com"),
    (ServiceName::SocialAffirmation, "https://social.parity-app.com"),
    (ServiceName::RelationshipAnalytics, "https://analytics.parity-app.com"),
    (ServiceName::ContentModeration, "https://moderation.parity-app.com"),
    (ServiceName::NotificationService, "https://notifications.parity-app.com"),
];

pub fn descriptor(name: ServiceName) -> &'static ServiceDescriptor {
    let index = match name {
        ServiceName::Backend => 0,
        ServiceName::AiCoaching => 1,
        ServiceName::SocialAffirmation => 2,
        ServiceName::RelationshipAnalytics => 3,
        ServiceName::ContentModeration => 4,
        ServiceName::NotificationService => 5,
    };
    &SERVICES[index]
}

pub fn production_endpoints() -> EndpointSet {
    PRODUCTION_ENDPOINTS
        .iter()
        .map(|(name, url)| (*name, Some(url.to_string())))
        .collect()
}
