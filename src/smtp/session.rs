//! Per-connection driver: reads lines, parses, dispatches, writes replies.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use log::{debug, info, trace};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

use super::command::{self, Command, Verb};
use super::context::SessionContext;
use super::data_command;
use super::filter::{FilterResult, MailboxFilterFactory};
use super::mailbox::Mailbox;
use super::options::ServerOptions;
use super::response::SmtpResponse;
use super::state_machine::{SmtpState, StateMachine};
use super::store::MessageStoreFactory;

/// Buffered line I/O plus the current [`SmtpState`] for one connection.
///
/// Generic over the reader/writer so tests can drive it against in-memory
/// buffers instead of a real `TcpStream`, the same trick the teacher's
/// original `SmtpProtocol` used.
pub struct Session<R, W>
where
    R: AsyncBufReadExt + Unpin,
    W: AsyncWriteExt + Unpin,
{
    reader: R,
    writer: W,
    state: SmtpState,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufReadExt + Unpin,
    W: AsyncWriteExt + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Session {
            reader,
            writer,
            state: SmtpState::WaitingForHelo,
        }
    }

    pub fn state(&self) -> SmtpState {
        self.state
    }

    /// Test-only accessor for the underlying writer, consuming the
    /// session. Lets tests outside this module (e.g. `data_command`'s)
    /// inspect what was written without exposing the field generally.
    #[cfg(test)]
    pub(crate) fn into_writer(self) -> W {
        self.writer
    }

    /// Reads one CRLF-terminated line, with the terminator stripped.
    /// `Ok(None)` means the peer closed the connection (EOF); an empty
    /// line is `Ok(Some(String::new()))`, distinct from EOF. The DATA body
    /// loop needs that distinction since a blank line is valid content.
    pub async fn read_line_opt(&mut self) -> Result<Option<String>> {
        let mut buffer = String::new();
        let bytes_read = self.reader.read_line(&mut buffer).await?;
        if bytes_read == 0 {
            Ok(None)
        } else {
            let line = buffer.trim_end_matches(['\r', '\n']).to_string();
            trace!("SMTP read: {:?}", line);
            Ok(Some(line))
        }
    }

    /// Reads one CRLF-terminated line, collapsing EOF to an empty string.
    /// Used by the command loop, where an empty line and EOF are handled
    /// identically (neither is a legal command).
    pub async fn read_line(&mut self) -> Result<String> {
        Ok(self.read_line_opt().await?.unwrap_or_default())
    }

    /// Writes one reply, flushing immediately.
    pub async fn write_response(&mut self, response: &SmtpResponse) -> Result<()> {
        trace!("SMTP write: {}", response);
        self.writer.write_all(response.render().as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn write_raw(&mut self, text: &str) -> Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Sends the initial `220` greeting. Must be called exactly once,
    /// before the command loop starts.
    pub async fn send_greeting(&mut self, server_name: &str) -> Result<()> {
        self.write_response(&SmtpResponse::service_ready(server_name)).await
    }

    /// Runs the command loop until `QUIT`, EOF, or an I/O error.
    ///
    /// All protocol-level errors (bad syntax, bad sequence, policy
    /// rejection) are recovered into replies inside this loop; only
    /// transport failures propagate out as `Err`, ending the session
    /// silently.
    pub async fn run(
        &mut self,
        remote_addr: SocketAddr,
        options: Arc<ServerOptions>,
        filter_factory: &dyn MailboxFilterFactory,
        store_factory: &dyn MessageStoreFactory,
    ) -> Result<()> {
        self.send_greeting(&options.server_name).await?;
        let mut context = SessionContext::new(remote_addr, options);

        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                info!("Connection closed by client (EOF)");
                break;
            }

            let command = command::parse_command(&line);
            debug!("Session({:?}): {:?} -> {:?}", self.state, line, command);

            if matches!(command, Command::Data) {
                // DATA has its own multi-line body-read loop and state
                // transition, handled by the dedicated driver.
                if StateMachine::transition(self.state, Verb::Data).is_none() {
                    self.write_response(&SmtpResponse::bad_sequence()).await?;
                    continue;
                }
                let next = data_command::run(self, &mut context, store_factory).await?;
                self.state = next;
                continue;
            }

            match command {
                Command::Invalid(response) => {
                    self.write_response(&response).await?;
                }
                Command::Quit => {
                    self.write_response(&SmtpResponse::service_closing()).await?;
                    break;
                }
                Command::Noop => {
                    self.write_response(&SmtpResponse::ok()).await?;
                }
                Command::Helo(domain) => {
                    if self.accept_transition(Verb::Helo).await? {
                        self.write_response(&SmtpResponse::new(250, &options_server_name(&context))).await?;
                        let _ = domain; // only used for the (discarded) greeting text below
                    }
                }
                Command::Ehlo(domain) => {
                    if self.accept_transition(Verb::Ehlo).await? {
                        self.reply_ehlo(&context, &domain).await?;
                    }
                }
                Command::Mail { address, params } => {
                    if self.accept_transition(Verb::Mail).await? {
                        self.execute_mail(&mut context, filter_factory, address, params)
                            .await?;
                    }
                }
                Command::Rcpt(mailbox) => {
                    if self.accept_transition(Verb::Rcpt).await? {
                        self.execute_rcpt(&mut context, filter_factory, mailbox).await?;
                    }
                }
                Command::Rset => {
                    if self.accept_transition(Verb::Rset).await? {
                        context.transaction.reset();
                        self.write_response(&SmtpResponse::ok()).await?;
                    }
                }
                Command::Data => unreachable!("handled above"),
            }
        }

        Ok(())
    }

    /// Asks the state machine whether `verb` is legal right now. On
    /// rejection, writes `503 BadSequence` and returns `false`. On
    /// acceptance, updates `self.state` and returns `true`.
    async fn accept_transition(&mut self, verb: Verb) -> Result<bool> {
        match StateMachine::transition(self.state, verb) {
            Some(next) => {
                self.state = next;
                Ok(true)
            }
            None => {
                self.write_response(&SmtpResponse::bad_sequence()).await?;
                Ok(false)
            }
        }
    }

    async fn reply_ehlo(&mut self, context: &SessionContext, domain: &str) -> Result<()> {
        let _ = domain;
        let mut lines = vec![format!("{} greets you", context.options.server_name)];
        lines.extend(context.options.supported_extensions.iter().cloned());
        self.write_raw(&SmtpResponse::render_multiline(250, &lines)).await
    }

    async fn execute_mail(
        &mut self,
        context: &mut SessionContext,
        filter_factory: &dyn MailboxFilterFactory,
        address: Option<Mailbox>,
        params: std::collections::HashMap<String, String>,
    ) -> Result<()> {
        context.transaction.reset();

        let size: usize = params
            .get("SIZE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let max = context.options.max_message_size;
        if max > 0 && size > max {
            self.write_response(&SmtpResponse::size_limit_exceeded()).await?;
            return Ok(());
        }

        let mut filter = filter_factory.create(context);
        let result = filter.can_accept_from(context, address.as_ref(), size).await;

        match result {
            FilterResult::Yes => {
                context.transaction.from = address;
                self.write_response(&SmtpResponse::ok()).await?;
            }
            FilterResult::NoTemporarily => {
                self.write_response(&SmtpResponse::mailbox_unavailable()).await?;
            }
            FilterResult::NoPermanently => {
                self.write_response(&SmtpResponse::mailbox_name_not_allowed()).await?;
            }
            FilterResult::SizeLimitExceeded => {
                self.write_response(&SmtpResponse::size_limit_exceeded()).await?;
            }
        }

        Ok(())
    }

    async fn execute_rcpt(
        &mut self,
        context: &mut SessionContext,
        filter_factory: &dyn MailboxFilterFactory,
        recipient: Mailbox,
    ) -> Result<()> {
        let mut filter = filter_factory.create(context);
        let result = filter
            .can_deliver_to(context, &recipient, context.transaction.from.as_ref())
            .await;

        match result {
            FilterResult::Yes => {
                context.transaction.to.push(recipient);
                self.write_response(&SmtpResponse::ok()).await?;
            }
            FilterResult::NoTemporarily => {
                self.write_response(&SmtpResponse::mailbox_unavailable()).await?;
            }
            FilterResult::NoPermanently => {
                self.write_response(&SmtpResponse::mailbox_name_not_allowed()).await?;
            }
            FilterResult::SizeLimitExceeded => {
                self.write_response(&SmtpResponse::size_limit_exceeded()).await?;
            }
        }

        Ok(())
    }
}

fn options_server_name(context: &SessionContext) -> String {
    context.options.server_name.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::filter::test_support::AllowAllFilterFactory;
    use crate::smtp::store::test_support::RecordingStoreFactory;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Mutex;
    use tokio::io::{BufReader, BufWriter};

    fn remote() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 2525)
    }

    async fn run_script(script: &str) -> (String, Vec<String>) {
        let reader = BufReader::new(script.as_bytes());
        let writer = BufWriter::new(Vec::new());
        let mut session = Session::new(reader, writer);

        let lines = Arc::new(Mutex::new(Vec::new()));
        let store_factory = RecordingStoreFactory {
            lines: Arc::clone(&lines),
        };
        let filter_factory = AllowAllFilterFactory;
        let options = Arc::new(ServerOptions::new("test.example", Vec::new()));

        session
            .run(remote(), options, &filter_factory, &store_factory)
            .await
            .unwrap();

        let writer = session.writer.into_inner();
        let recorded = lines.lock().unwrap().clone();
        (String::from_utf8(writer).unwrap(), recorded)
    }

    #[tokio::test]
    async fn smoke_delivery() {
        let script = "HELO client\r\nMAIL FROM:<a@x>\r\nRCPT TO:<b@y>\r\nDATA\r\nHello\r\n.\r\nQUIT\r\n";
        let (output, lines) = run_script(script).await;
        assert!(output.starts_with("220 "));
        assert!(output.contains("250 Ok\r\n")); // at least one 250 Ok along the way
        assert!(output.contains("354 "));
        assert!(output.contains("221 "));
        assert_eq!(lines, vec!["Hello".to_string()]);
    }

    #[tokio::test]
    async fn bad_sequence_rejected() {
        let script = "HELO c\r\nDATA\r\nQUIT\r\n";
        let (output, _) = run_script(script).await;
        assert!(output.contains("503 BadSequence\r\n"));
    }

    #[tokio::test]
    async fn null_reverse_path_accepted() {
        let script = "EHLO c\r\nMAIL FROM:<>\r\nRCPT TO:<b@y>\r\nDATA\r\n.\r\nQUIT\r\n";
        let (output, _) = run_script(script).await;
        assert!(output.contains("250 Ok\r\n"));
        assert!(!output.contains("501"));
    }

    #[tokio::test]
    async fn size_limit_exceeded() {
        let reader = BufReader::new("MAIL FROM:<a@x> SIZE=2000\r\n".as_bytes());
        let writer = BufWriter::new(Vec::new());
        let mut session = Session::new(reader, writer);
        session.state = SmtpState::WaitingForMail;

        let lines = Arc::new(Mutex::new(Vec::new()));
        let store_factory = RecordingStoreFactory { lines };
        let filter_factory = AllowAllFilterFactory;
        let options = Arc::new(ServerOptions::new("test", Vec::new()).with_max_message_size(1000));
        let mut context = SessionContext::new(remote(), options);

        let line = session.read_line().await.unwrap();
        let command = command::parse_command(&line);
        match command {
            Command::Mail { address, params } => {
                session
                    .execute_mail(&mut context, &filter_factory, address, params)
                    .await
                    .unwrap();
            }
            other => panic!("expected Mail, got {other:?}"),
        }

        let written = String::from_utf8(session.writer.into_inner()).unwrap();
        assert_eq!(written, "452 SizeLimitExceeded\r\n");
        assert!(context.transaction.from.is_none());
    }

    #[tokio::test]
    async fn trailing_hyphen_helo_domain_rejected() {
        let script = "HELO foo-\r\nQUIT\r\n";
        let (output, _) = run_script(script).await;
        assert!(output.starts_with("220 "));
        assert!(output.contains("501 SyntaxError\r\n"));
    }
}
