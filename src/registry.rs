//! Connection bookkeeping for the signaling server.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;

/// Opaque identifier for one accepted transport connection.
///
/// Ids come from a process-wide counter, so near-simultaneous accepts can
/// never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> ConnectionId {
        static ID_COUNTER: AtomicU64 = AtomicU64::new(0);
        ConnectionId(ID_COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

impl Deref for ConnectionId {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Send primitive exposed by the transport layer for one connection.
///
/// The registry only routes frames back to their origin; it never owns or
/// closes the underlying socket.
pub trait SignalSink: Send + Sync {
    fn send(&self, frame: String) -> Result<()>;
}

/// Active connections keyed by id. Owned by the server instance; created on
/// accept, removed on close, never mutated otherwise.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Arc<dyn SignalSink>>,
}

impl ConnectionRegistry {
    pub fn new() -> ConnectionRegistry {
        ConnectionRegistry::default()
    }

    pub fn insert(&mut self, id: ConnectionId, sink: Arc<dyn SignalSink>) {
        self.connections.insert(id, sink);
    }

    /// Removes a connection. A no-op for ids already removed.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        self.connections.remove(&id).is_some()
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Arc<dyn SignalSink>> {
        self.connections.get(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
