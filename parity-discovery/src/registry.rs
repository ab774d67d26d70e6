use tokio::sync::watch;
use shared::types::{EndpointSet, ServiceName};

/// Holds the process-wide endpoint set.
///
/// Backed by a watch channel: readers borrow the current value, subscribers
/// are woken only when the set actually changes.
#[derive(Debug)]
pub struct ServiceRegistry {
    tx: watch::Sender<Option<EndpointSet>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn get(&self, name: ServiceName) -> Option<String> {
        self.tx
            .borrow()
            .as_ref()
            .and_then(|set| set.get(name).map(str::to_string))
    }

    /// Current set, or None before the first resolution.
    pub fn snapshot(&self) -> Option<EndpointSet> {
        self.tx.borrow().clone()
    }

    pub fn is_populated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Replace the set. Returns true if subscribers were notified.
    pub fn set(&self, endpoints: EndpointSet) -> bool {
        self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&endpoints) {
                return false;
            }
            *current = Some(endpoints);
            true
        })
    }

    pub fn clear(&self) -> bool {
        self.tx.send_if_modified(|current| current.take().is_some())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<EndpointSet>> {
        self.tx.subscribe()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
