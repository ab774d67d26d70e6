use std::collections::HashSet;
use shared::types::{DeviceKind, EnvironmentClass};
use crate::config::DiscoveryConfig;

/// Host loopback as seen from the Android emulator, then adb-reversed loopback
const EMULATOR_LOOPBACK: &[&str] = &["http://10.0.2.2", "http://localhost", "http://127.0.0.1"];

/// Reachable from a physical device only through USB port forwarding
const DEVICE_LOOPBACK: &[&str] = &["http://localhost", "http://127.0.0.1"];

const BROWSER_LOOPBACK: &[&str] = &["http://localhost", "http://127.0.0.1", "http://[::1]"];

/// Builds the ordered list of base addresses to probe.
///
/// Order: session known-good address, then classification-specific loopback
/// and explicit developer hosts, then common private-network addresses.
/// Release builds only try the known-good address and explicit hosts.
/// Output never contains duplicates and depends only on the builder state
/// and the classification.
#[derive(Debug, Clone, Default)]
pub struct CandidateListBuilder {
    known_good: Option<String>,
    explicit_hosts: Vec<String>,
    private_hosts: Vec<String>,
}

impl CandidateListBuilder {
    pub fn new(explicit_hosts: Vec<String>, private_hosts: Vec<String>) -> Self {
        Self {
            known_good: None,
            explicit_hosts,
            private_hosts,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.explicit_hosts.clone(), config.private_hosts.clone())
    }

    pub fn with_known_good(mut self, address: Option<String>) -> Self {
        self.known_good = address;
        self
    }

    pub fn build(&self, class: EnvironmentClass) -> Vec<String> {
        let mut list = CandidateList::default();

        if let Some(address) = &self.known_good {
            list.push(address);
        }

        if !class.is_debug() {
            list.extend(&self.explicit_hosts);
            return list.into_inner();
        }

        match class.device {
            DeviceKind::PhysicalDevice => {
                list.extend(&self.explicit_hosts);
                list.extend(DEVICE_LOOPBACK);
            }
            DeviceKind::Emulator => {
                list.extend(EMULATOR_LOOPBACK);
                list.extend(&self.explicit_hosts);
            }
            DeviceKind::Browser => {
                list.extend(BROWSER_LOOPBACK);
                list.extend(&self.explicit_hosts);
            }
        }

        list.extend(&self.private_hosts);
        list.into_inner()
    }
}

#[derive(Default)]
struct CandidateList {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl CandidateList {
    fn push(&mut self, address: &str) {
        let address = normalize_base(address);
        if address.is_empty() {
            return;
        }
        if self.seen.insert(address.clone()) {
            self.ordered.push(address);
        }
    }

    fn extend<S: AsRef<str>>(&mut self, addresses: &[S]) {
        for address in addresses {
            self.push(address.as_ref());
        }
    }

    fn into_inner(self) -> Vec<String> {
        self.ordered
    }
}

/// Canonical base address: scheme + host, no trailing slash.
/// A bare host gets `http://`.
pub fn normalize_base(address: &str) -> String {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::BuildMode;

    const ALL_CLASSES: [EnvironmentClass; 6] = [
        EnvironmentClass { device: DeviceKind::PhysicalDevice, build: BuildMode::Debug },
        EnvironmentClass { device: DeviceKind::PhysicalDevice, build: BuildMode::Release },
        EnvironmentClass { device: DeviceKind::Emulator, build: BuildMode::Debug },
        EnvironmentClass { device: DeviceKind::Emulator, build: BuildMode::Release },
        EnvironmentClass { device: DeviceKind::Browser, build: BuildMode::Debug },
        EnvironmentClass { device: DeviceKind::Browser, build: BuildMode::Release },
    ];

    fn builder() -> CandidateListBuilder {
        CandidateListBuilder::from_config(&DiscoveryConfig::default())
    }

    #[test]
    fn test_build_is_deterministic_without_duplicates() {
        // Overlapping inputs on purpose
        let builder = CandidateListBuilder::new(
            vec!["http://localhost".to_string(), "192.168.1.100/".to_string()],
            vec!["http://192.168.1.100".to_string(), "10.0.2.2".to_string()],
        )
        .with_known_good(Some("http://10.0.2.2".to_string()));

        for class in ALL_CLASSES {
            let first = builder.build(class);
            let second = builder.build(class);
            assert_eq!(first, second, "{} should be deterministic", class);

            let unique: HashSet<_> = first.iter().collect();
            assert_eq!(unique.len(), first.len(), "{} produced duplicates: {:?}", class, first);
        }
    }

    #[test]
    fn test_known_good_comes_first() {
        let builder = builder().with_known_good(Some("192.168.44.2".to_string()));
        for class in ALL_CLASSES {
            assert_eq!(builder.build(class)[0], "http://192.168.44.2");
        }
    }

    #[test]
    fn test_loopback_sets_follow_classification() {
        let emulator = builder().build(EnvironmentClass::new(DeviceKind::Emulator, BuildMode::Debug));
        assert_eq!(emulator[0], "http://10.0.2.2");

        let browser = builder().build(EnvironmentClass::new(DeviceKind::Browser, BuildMode::Debug));
        assert_eq!(browser[0], "http://localhost");
        assert!(!browser.contains(&"http://10.0.2.2".to_string()));

        let device = builder().build(EnvironmentClass::new(DeviceKind::PhysicalDevice, BuildMode::Debug));
        assert_eq!(device[0], "http://192.168.12.246");
        assert!(!device.contains(&"http://10.0.2.2".to_string()));
        assert_eq!(device.last().unwrap(), "http://10.0.0.102");
    }

    #[test]
    fn test_release_skips_loopback_and_lan_patterns() {
        let release = builder().build(EnvironmentClass::default());
        assert_eq!(
            release,
            vec!["http://192.168.12.246".to_string(), "http://192.168.134.197".to_string()]
        );

        let empty = CandidateListBuilder::default().build(EnvironmentClass::default());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_normalize_base() {
        assert_eq!(normalize_base("192.168.9.9"), "http://192.168.9.9");
        assert_eq!(normalize_base("https://api.example.com/"), "https://api.example.com");
        assert_eq!(normalize_base("   "), "");
    }
}
