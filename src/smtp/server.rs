//! Binds the configured endpoints, accepts connections, and drives one
//! [`Session`] per connection.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use log::{debug, error, info};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::events::{NoopObserver, SessionObserver};
use super::filter::MailboxFilterFactory;
use super::options::ServerOptions;
use super::response::SmtpResponse;
use super::session::Session;
use super::store::MessageStoreFactory;

/// An embeddable SMTP server.
///
/// Binds every address in [`ServerOptions::endpoints`], then spawns one
/// task per accepted connection running [`Session::run`] against the
/// host-supplied factories. The factories and observer are shared via
/// `Arc` across every connection's task, so they must be `Send + Sync` —
/// both `MailboxFilterFactory` and `MessageStoreFactory` require this at
/// the trait level.
pub struct Server {
    options: Arc<ServerOptions>,
    filter_factory: Arc<dyn MailboxFilterFactory>,
    store_factory: Arc<dyn MessageStoreFactory>,
    observer: Arc<dyn SessionObserver>,
    sessions: Arc<Mutex<HashSet<SocketAddr>>>,
}

impl Server {
    pub fn new(
        options: ServerOptions,
        filter_factory: Arc<dyn MailboxFilterFactory>,
        store_factory: Arc<dyn MessageStoreFactory>,
    ) -> Self {
        Server {
            options: Arc::new(options),
            filter_factory,
            store_factory,
            observer: Arc::new(NoopObserver),
            sessions: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Replaces the default no-op [`SessionObserver`].
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Number of connections currently being served.
    pub async fn active_session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Binds every configured endpoint and serves connections until
    /// `cancel` is triggered, returning once every acceptor (and every
    /// session it spawned) has finished.
    ///
    /// A bind failure on any endpoint fails the whole call before any
    /// acceptor starts running.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut listeners = Vec::with_capacity(self.options.endpoints.len());
        for addr in &self.options.endpoints {
            let listener = TcpListener::bind(addr).await?;
            info!("SMTP server listening on {}", addr);
            listeners.push(listener);
        }

        let mut acceptors = Vec::with_capacity(listeners.len());
        for listener in listeners {
            acceptors.push(tokio::spawn(accept_loop(
                listener,
                cancel.clone(),
                Arc::clone(&self.options),
                Arc::clone(&self.filter_factory),
                Arc::clone(&self.store_factory),
                Arc::clone(&self.observer),
                Arc::clone(&self.sessions),
            )));
        }

        for acceptor in acceptors {
            acceptor.await?;
        }

        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
async fn accept_loop(
    listener: TcpListener,
    cancel: CancellationToken,
    options: Arc<ServerOptions>,
    filter_factory: Arc<dyn MailboxFilterFactory>,
    store_factory: Arc<dyn MessageStoreFactory>,
    observer: Arc<dyn SessionObserver>,
    sessions: Arc<Mutex<HashSet<SocketAddr>>>,
) {
    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_default();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Acceptor on {} shutting down", local);
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        info!("New connection from: {}", addr);
                        tokio::spawn(handle_connection(
                            stream,
                            addr,
                            Arc::clone(&options),
                            Arc::clone(&filter_factory),
                            Arc::clone(&store_factory),
                            Arc::clone(&observer),
                            Arc::clone(&sessions),
                            cancel.clone(),
                        ));
                    }
                    Err(e) => {
                        error!("Error accepting connection on {}: {}", local, e);
                    }
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    options: Arc<ServerOptions>,
    filter_factory: Arc<dyn MailboxFilterFactory>,
    store_factory: Arc<dyn MessageStoreFactory>,
    observer: Arc<dyn SessionObserver>,
    sessions: Arc<Mutex<HashSet<SocketAddr>>>,
    cancel: CancellationToken,
) {
    sessions.lock().await.insert(addr);
    let created_observer = Arc::clone(&observer);
    tokio::spawn(async move { created_observer.session_created(addr) });

    let (read_half, write_half) = stream.into_split();
    let reader = tokio::io::BufReader::new(read_half);
    let mut session = Session::new(reader, write_half);

    let result = tokio::select! {
        res = session.run(addr, options, filter_factory.as_ref(), store_factory.as_ref()) => res,
        _ = cancel.cancelled() => {
            let _ = session.write_response(&SmtpResponse::service_closing()).await;
            Ok(())
        }
    };

    if let Err(e) = result {
        debug!("SMTP connection from {} ended: {:#}", addr, e);
    }

    sessions.lock().await.remove(&addr);
    tokio::spawn(async move { observer.session_completed(addr) });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::filter::test_support::AllowAllFilterFactory;
    use crate::smtp::store::test_support::RecordingStoreFactory;
    use std::net::{Ipv4Addr, TcpListener as StdTcpListener};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn free_addr() -> SocketAddr {
        let listener = StdTcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        listener.local_addr().unwrap()
        // Dropped here: the OS may hand the same port to our Server below.
        // A tiny, accepted race in test helpers of this shape.
    }

    #[tokio::test]
    async fn serves_a_real_tcp_connection_end_to_end() {
        let addr = free_addr();
        let options = ServerOptions::new("test.local", vec![addr]);
        let lines = Arc::new(StdMutex::new(Vec::new()));
        let store_factory: Arc<dyn MessageStoreFactory> = Arc::new(RecordingStoreFactory {
            lines: Arc::clone(&lines),
        });
        let filter_factory: Arc<dyn MailboxFilterFactory> = Arc::new(AllowAllFilterFactory);
        let server = Server::new(options, filter_factory, store_factory);

        let cancel = CancellationToken::new();
        let server_cancel = cancel.clone();
        let server_handle = tokio::spawn(async move {
            server.run(server_cancel).await.unwrap();
        });

        // Give the acceptor a moment to bind before connecting.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut greeting = String::new();
        reader.read_line(&mut greeting).await.unwrap();
        assert!(greeting.starts_with("220 "));

        write_half.write_all(b"HELO client\r\n").await.unwrap();
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.starts_with("250"));

        write_half.write_all(b"QUIT\r\n").await.unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.starts_with("221"));

        cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(1), server_handle).await;
    }
}
