//! `ServerOptions`: the enumerated configuration the core consumes.

use std::net::SocketAddr;

/// Static, host-supplied configuration for one [`super::Server`] instance.
///
/// Unlike [`crate::config::Config`] (which also carries demo-binary-only
/// settings like the webhook URL), `ServerOptions` is exactly the
/// configuration surface the protocol core itself understands.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub server_name: String,
    pub endpoints: Vec<SocketAddr>,
    /// Maximum accepted `SIZE=` value on `MAIL FROM`. `0` means unlimited.
    pub max_message_size: usize,
    pub supported_extensions: Vec<String>,
}

impl ServerOptions {
    pub fn new(server_name: impl Into<String>, endpoints: Vec<SocketAddr>) -> Self {
        let max_message_size = 0;
        ServerOptions {
            server_name: server_name.into(),
            endpoints,
            max_message_size,
            supported_extensions: Self::default_extensions(max_message_size),
        }
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self.supported_extensions = Self::default_extensions(max_message_size);
        self
    }

    fn default_extensions(max_message_size: usize) -> Vec<String> {
        if max_message_size > 0 {
            vec![format!("SIZE {max_message_size}")]
        } else {
            Vec::new()
        }
    }
}
