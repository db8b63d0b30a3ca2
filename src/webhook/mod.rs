//! Handles sending processed email data to a configured webhook URL via HTTPS POST.
//!
//! This module defines the data structure for the webhook payload (`EmailPayload`)
//! and provides a `WebhookClient` responsible for making the asynchronous HTTP request.
//! It uses `hyper` and `hyper-rustls` for the underlying HTTP/S communication.

use anyhow::Result;
use async_trait::async_trait;
use hyper::Request;
use hyper_rustls::HttpsConnectorBuilder;
// Import necessary components from hyper-util, using aliases for clarity.
use hyper_util::{client::legacy::{connect::HttpConnector, Client}, rt::TokioExecutor};
use http_body_util::Full; // For creating simple, complete request bodies.
use bytes::Bytes; // Bytes type for request body data.
use log::{info, error, warn};
use serde::{Serialize, Deserialize};
use std::sync::Arc;
use std::time::Duration;
use crate::config::Config;
use crate::smtp::context::SessionContext;
use crate::smtp::email_parser::EmailParser;
use crate::smtp::filter::{FilterResult, MailboxFilter, MailboxFilterFactory};
use crate::smtp::mailbox::Mailbox;
use crate::smtp::response::SmtpResponse;
use crate::smtp::store::{MessageStore, MessageStoreFactory};
use crate::smtp::transaction::Transaction;

// --- Type Aliases for Hyper Client ---

/// Type alias for the HTTPS connector using `hyper-rustls`.
type HttpsConn = hyper_rustls::HttpsConnector<HttpConnector>;
/// Type alias for the specific Hyper client configuration used for sending webhooks.
/// Uses the `HttpsConn` for TLS and expects/sends `Full<Bytes>` bodies.
type WebhookHttpClient = Client<HttpsConn, Full<Bytes>>;

// --- Public Data Structures ---

/// Represents the data payload sent to the webhook URL.
///
/// Contains the essential extracted information from a received email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailPayload {
    /// The email address of the original sender.
    pub sender: String,
    /// The specific recipient address this email was accepted for.
    pub recipient: String,
    /// The subject line of the email.
    pub subject: String,
    /// The plain text representation of the body (HTML stripped).
    pub body: String,
    /// The original HTML body content, if the email contained HTML.
    #[serde(skip_serializing_if = "Option::is_none")] // Don't include in JSON if None
    pub html_body: Option<String>,
}

/// A client responsible for sending `EmailPayload` data to a configured webhook URL.
///
/// Encapsulates the `hyper` HTTP client setup with `rustls` for HTTPS support.
pub struct WebhookClient {
    /// Shared application configuration.
    config: Config,
    /// The underlying asynchronous HTTP client instance.
    client: WebhookHttpClient,
    /// The User-Agent string sent with webhook requests, derived from the crate's metadata.
    user_agent: String,
}

impl WebhookClient {
    /// Creates a new `WebhookClient`.
    ///
    /// Initializes an HTTPS client using `hyper-rustls` with native system certificates.
    /// Constructs a User-Agent string based on the crate's name and version from `Cargo.toml`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application configuration, used to get the webhook URL.
    ///
    /// # Panics
    ///
    /// Panics if loading the system's native root TLS certificates fails. This is considered
    /// a fatal error during startup.
    pub fn new(config: Config) -> Self {
        // Configure the HTTPS connector using rustls and native certs.
        let https = HttpsConnectorBuilder::new()
            .with_native_roots()
            // Panic if cert loading fails - essential for HTTPS operation.
            .expect("Failed to load native root certificates for hyper-rustls")
            .https_only() // Ensure only HTTPS connections are made.
            .enable_http1() // Enable HTTP/1.1 support.
            .build();

        // Build the hyper client using the HTTPS connector and Tokio runtime.
        let client: WebhookHttpClient = Client::builder(TokioExecutor::new()).build(https);

        // Create a User-Agent string like "MailLaser/0.1.0".
        let user_agent = format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );

        Self {
            config,
            client,
            user_agent,
        }
    }

    /// Sends the given `EmailPayload` to the configured webhook URL.
    ///
    /// Serializes the payload to JSON and sends it as an HTTPS POST request.
    /// Logs the outcome (success or failure status code) of the request.
    ///
    /// **Note:** A non-successful HTTP status code from the webhook endpoint (e.g., 4xx, 5xx)
    /// is logged as an error but does *not* cause this function to return an `Err`.
    /// The email is considered successfully processed by MailLaser once the webhook
    /// request is attempted.
    ///
    /// # Arguments
    ///
    /// * `email` - The `EmailPayload` to send.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - Serialization of the `EmailPayload` to JSON fails.
    /// - Building the HTTP request fails.
    /// - The HTTP request itself fails (e.g., network error, DNS resolution failure).
    pub async fn forward_email(&self, email: EmailPayload) -> Result<()> {
        info!("Forwarding email from {} with subject: {}", email.sender, email.subject);

        // Serialize payload to JSON once; each retry attempt reuses it.
        let json_body = serde_json::to_string(&email)?;
        let timeout = Duration::from_secs(self.config.webhook_timeout_secs);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_forward(&json_body, timeout).await {
                Ok(status) if status.is_success() => {
                    info!(
                        "Email successfully forwarded to webhook {}, status: {}",
                        self.config.webhook_url, status
                    );
                    return Ok(());
                }
                Ok(status) => {
                    error!(
                        "Webhook request to {} failed with status: {}",
                        self.config.webhook_url, status
                    );
                }
                Err(e) => {
                    warn!(
                        "Webhook request to {} failed on attempt {}: {}",
                        self.config.webhook_url, attempt, e
                    );
                }
            }

            if attempt > self.config.webhook_max_retries {
                error!(
                    "Giving up on webhook delivery to {} after {} attempts",
                    self.config.webhook_url, attempt
                );
                // A non-success webhook response does not fail the SMTP
                // transaction: the message has already been accepted.
                return Ok(());
            }

            let backoff = Duration::from_millis(200 * 2u64.pow(attempt.min(5)));
            tokio::time::sleep(backoff).await;
        }
    }

    async fn try_forward(
        &self,
        json_body: &str,
        timeout: Duration,
    ) -> Result<hyper::StatusCode> {
        let request = Request::builder()
            .method(hyper::Method::POST)
            .uri(&self.config.webhook_url)
            .header("content-type", "application/json")
            .header("user-agent", &self.user_agent)
            .body(Full::new(Bytes::from(json_body.to_string())))?;

        let response = tokio::time::timeout(timeout, self.client.request(request)).await??;
        Ok(response.status())
    }
}

/// Forwards each accepted message to the configured webhook as a
/// [`MessageStore`], one [`EmailPayload`] per recipient in the envelope.
pub struct WebhookMessageStore {
    client: Arc<WebhookClient>,
    header_prefixes: Vec<String>,
    from: Option<Mailbox>,
    to: Vec<Mailbox>,
    raw: String,
}

#[async_trait]
impl MessageStore for WebhookMessageStore {
    async fn begin_write(&mut self) -> SmtpResponse {
        SmtpResponse::ok()
    }

    async fn write(&mut self, line: &str) -> Result<()> {
        self.raw.push_str(line);
        self.raw.push_str("\r\n");
        Ok(())
    }

    async fn end_write(&mut self) -> SmtpResponse {
        let (subject, body, headers) =
            match EmailParser::parse_with_headers(&self.raw, &self.header_prefixes) {
                Ok(parsed) => parsed,
                Err(e) => {
                    error!("Failed to parse message body: {}", e);
                    return SmtpResponse::transaction_failed();
                }
            };

        let sender = self
            .from
            .as_ref()
            .map(Mailbox::as_address)
            .unwrap_or_default();

        for recipient in &self.to {
            let mut payload = EmailPayload {
                sender: sender.clone(),
                recipient: recipient.as_address(),
                subject: subject.clone(),
                body: body.clone(),
                html_body: None,
            };
            if !headers.is_empty() {
                // Prepend matched headers to the body rather than adding
                // fields to EmailPayload, so the webhook JSON shape stays
                // stable regardless of which header_prefixes are configured.
                let header_block: String = headers
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}\n"))
                    .collect();
                payload.body = format!("{header_block}\n{}", payload.body);
            }

            let client = Arc::clone(&self.client);
            if let Err(e) = client.forward_email(payload).await {
                error!("Webhook delivery failed: {}", e);
                return SmtpResponse::transaction_failed();
            }
        }

        SmtpResponse::ok()
    }
}

pub struct WebhookMessageStoreFactory {
    client: Arc<WebhookClient>,
    header_prefixes: Vec<String>,
}

impl WebhookMessageStoreFactory {
    pub fn new(client: Arc<WebhookClient>, header_prefixes: Vec<String>) -> Self {
        WebhookMessageStoreFactory {
            client,
            header_prefixes,
        }
    }
}

impl MessageStoreFactory for WebhookMessageStoreFactory {
    fn create(&self, _context: &SessionContext, envelope: &Transaction) -> Box<dyn MessageStore> {
        Box::new(WebhookMessageStore {
            client: Arc::clone(&self.client),
            header_prefixes: self.header_prefixes.clone(),
            from: envelope.from.clone(),
            to: envelope.to.clone(),
            raw: String::new(),
        })
    }
}

/// Accepts mail only for the configured set of target mailboxes
/// (case-insensitive), rejecting everything else at `RCPT`.
pub struct TargetMailboxFilter {
    target_emails: Vec<String>,
}

#[async_trait]
impl MailboxFilter for TargetMailboxFilter {
    async fn can_accept_from(
        &mut self,
        _context: &SessionContext,
        _from: Option<&Mailbox>,
        _size: usize,
    ) -> FilterResult {
        FilterResult::Yes
    }

    async fn can_deliver_to(
        &mut self,
        _context: &SessionContext,
        to: &Mailbox,
        _from: Option<&Mailbox>,
    ) -> FilterResult {
        let address = to.as_address().to_lowercase();
        if self
            .target_emails
            .iter()
            .any(|target| target.to_lowercase() == address)
        {
            FilterResult::Yes
        } else {
            FilterResult::NoPermanently
        }
    }
}

pub struct TargetMailboxFilterFactory {
    target_emails: Vec<String>,
}

impl TargetMailboxFilterFactory {
    pub fn new(target_emails: Vec<String>) -> Self {
        TargetMailboxFilterFactory { target_emails }
    }
}

impl MailboxFilterFactory for TargetMailboxFilterFactory {
    fn create(&self, _context: &SessionContext) -> Box<dyn MailboxFilter> {
        Box::new(TargetMailboxFilter {
            target_emails: self.target_emails.clone(),
        })
    }
}
