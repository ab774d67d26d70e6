use shared::types::{ServiceName, UnknownServiceName};

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced to feature code by [`crate::ServiceConfig`] and the clients it builds.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service has no resolved endpoint; treat the feature as unavailable
    #[error("service {0} has no resolved endpoint")]
    NoEndpoint(ServiceName),

    #[error(transparent)]
    UnknownService(#[from] UnknownServiceName),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{service} responded with {status}: {body}")]
    Status {
        service: ServiceName,
        status: reqwest::StatusCode,
        body: String,
    },

    /// A bearer-authenticated request got 401; the session must be renewed by the caller
    #[error("authentication expired for {service}")]
    SessionInvalid { service: ServiceName },
}

impl ServiceError {
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, ServiceError::SessionInvalid { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServiceError::NoEndpoint(ServiceName::AiCoaching);
        assert_eq!(err.to_string(), "service aiCoaching has no resolved endpoint");

        let err = ServiceError::from(UnknownServiceName("chat".to_string()));
        assert_eq!(err.to_string(), "unknown service name: chat");

        let err = ServiceError::SessionInvalid { service: ServiceName::Backend };
        assert!(err.is_session_invalid());
        assert_eq!(err.to_string(), "authentication expired for backend");
    }
}
