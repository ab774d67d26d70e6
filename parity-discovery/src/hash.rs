use sha2::{Digest, Sha256};
use shared::types::EndpointSet;

/// SHA-256 over the endpoint set's entries in service order.
/// Unresolved entries hash as an empty URL.
pub fn fingerprint(endpoints: &EndpointSet) -> String {
    let mut hasher = Sha256::new();
    for (name, url) in endpoints.iter() {
        hasher.update(name.as_str().as_bytes());
        hasher.update(b"=");
        hasher.update(url.unwrap_or_default().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
