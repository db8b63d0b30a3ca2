//! Lifecycle observation hooks (`SessionCreated` / `SessionCompleted`).

use std::net::SocketAddr;

/// Observes session lifecycle events without participating in protocol
/// decisions. Implementations must not block: [`super::server::Server`]
/// fires these off a spawned task so a slow observer cannot stall the
/// connection it's watching.
pub trait SessionObserver: Send + Sync {
    fn session_created(&self, _remote_addr: SocketAddr) {}
    fn session_completed(&self, _remote_addr: SocketAddr) {}
}

/// An observer that does nothing, used when the host does not care to
/// watch session lifecycle.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
