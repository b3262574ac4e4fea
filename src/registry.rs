//! Endpoint registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::endpoint::{Endpoint, EndpointId, TypeDescriptor};

/// Exclusive-ownership map from endpoint id to endpoint; insert-only.
///
/// Endpoints are created only by successful registration and live until the
/// registry is discarded at bridge teardown; there is no unregister
/// operation. Steady-state lookups take the read lock only.
pub struct EndpointRegistry {
    endpoints: RwLock<HashMap<EndpointId, Arc<Endpoint>>>,
    queue_depth: usize,
}

impl EndpointRegistry {
    /// Create an empty registry whose endpoints bound their queues at
    /// `queue_depth`.
    pub fn new(queue_depth: usize) -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
            queue_depth,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<EndpointId, Arc<Endpoint>>> {
        self.endpoints.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new endpoint.
    ///
    /// Returns false without any mutation if `id` is already present; the
    /// existing endpoint's descriptors are untouched.
    pub fn register(
        &self,
        id: EndpointId,
        send_type: TypeDescriptor,
        recv_type: TypeDescriptor,
    ) -> bool {
        let mut endpoints = self.endpoints.write().unwrap_or_else(|e| e.into_inner());
        if endpoints.contains_key(&id) {
            warn!(endpoint = id, "duplicate endpoint registration rejected");
            return false;
        }
        endpoints.insert(
            id,
            Arc::new(Endpoint::new(id, send_type, recv_type, self.queue_depth)),
        );
        info!(
            endpoint = id,
            send_type_id = send_type.type_id,
            recv_type_id = recv_type.type_id,
            "endpoint registered"
        );
        true
    }

    /// Look up an endpoint by id. Never fails; called on every get/put.
    pub fn lookup(&self, id: EndpointId) -> Option<Arc<Endpoint>> {
        self.read().get(&id).cloned()
    }

    /// All registered endpoints, ascending by id.
    pub fn snapshot(&self) -> Vec<Arc<Endpoint>> {
        let mut endpoints: Vec<_> = self.read().values().cloned().collect();
        endpoints.sort_by_key(|ep| ep.id());
        endpoints
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if no endpoints are registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Close every endpoint's queues, unblocking parked client consumers.
    pub fn close_all(&self) {
        for ep in self.read().values() {
            ep.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(a: i64, b: i64) -> (TypeDescriptor, TypeDescriptor) {
        (TypeDescriptor::new(a, 4), TypeDescriptor::new(b, 4))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = EndpointRegistry::new(8);
        let (send, recv) = types(0xA, 0xB);

        assert!(registry.register(5, send, recv));
        let ep = registry.lookup(5).expect("registered");
        assert_eq!(ep.id(), 5);
        assert_eq!(ep.send_type(), send);
        assert_eq!(ep.recv_type(), recv);
    }

    #[test]
    fn test_duplicate_register_keeps_original_descriptors() {
        let registry = EndpointRegistry::new(8);
        let (send, recv) = types(0xA, 0xB);

        assert!(registry.register(5, send, recv));
        assert!(!registry.register(5, TypeDescriptor::new(0xC, 16), TypeDescriptor::new(0xD, 16)));

        let ep = registry.lookup(5).expect("registered");
        assert_eq!(ep.send_type(), send);
        assert_eq!(ep.recv_type(), recv);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_unknown_is_none() {
        let registry = EndpointRegistry::new(8);
        assert!(registry.lookup(999).is_none());
    }

    #[test]
    fn test_snapshot_sorted_by_id() {
        let registry = EndpointRegistry::new(8);
        let (send, recv) = types(1, 2);
        registry.register(9, send, recv);
        registry.register(3, send, recv);
        registry.register(7, send, recv);

        let ids: Vec<_> = registry.snapshot().iter().map(|ep| ep.id()).collect();
        assert_eq!(ids, vec![3, 7, 9]);
    }

    #[test]
    fn test_close_all_closes_queues() {
        let registry = EndpointRegistry::new(8);
        let (send, recv) = types(1, 2);
        registry.register(1, send, recv);

        let ep = registry.lookup(1).expect("registered");
        registry.close_all();
        assert!(ep.push_inbound(crate::message::MessageBlob::from(vec![1])).is_err());
    }
}
