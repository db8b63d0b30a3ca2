//! Per-connection context threaded through command execution.

use std::net::SocketAddr;
use std::sync::Arc;

use super::options::ServerOptions;
use super::transaction::Transaction;

/// Everything a [`super::filter::MailboxFilter`] or
/// [`super::store::MessageStore`] might need to know about the connection
/// it's serving, without owning the transport itself.
pub struct SessionContext {
    pub transaction: Transaction,
    pub remote_addr: SocketAddr,
    pub options: Arc<ServerOptions>,
}

impl SessionContext {
    pub fn new(remote_addr: SocketAddr, options: Arc<ServerOptions>) -> Self {
        SessionContext {
            transaction: Transaction::new(),
            remote_addr,
            options,
        }
    }
}
