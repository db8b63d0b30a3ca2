//! The host-supplied message sink consulted during `DATA`.

use async_trait::async_trait;
use anyhow::Result;

use super::context::SessionContext;
use super::response::SmtpResponse;
use super::transaction::Transaction;

/// A scoped sink for one message body.
///
/// Created per `DATA` command by [`MessageStoreFactory`] and dropped once
/// `DATA` completes or fails, regardless of outcome.
#[async_trait]
pub trait MessageStore: Send {
    /// Called once, before any body line is written. If this does not
    /// return a `250` response, [`super::data_command`] forwards the reply
    /// as-is and aborts without entering the body-read loop.
    async fn begin_write(&mut self) -> SmtpResponse;

    /// Called once per body line (dot-stuffing already undone, blank-line
    /// policy already applied). An `Err` here aborts the transaction with
    /// `554 TransactionFailed`.
    async fn write(&mut self, line: &str) -> Result<()>;

    /// Called once after the terminating `.` line, whether or not any body
    /// lines were written.
    async fn end_write(&mut self) -> SmtpResponse;
}

/// Creates a [`MessageStore`] for each `DATA` command.
pub trait MessageStoreFactory: Send + Sync {
    fn create(&self, context: &SessionContext, envelope: &Transaction) -> Box<dyn MessageStore>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// A store that records every line it receives, for assertions in
    /// session/data-command tests.
    pub struct RecordingStore {
        pub lines: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl MessageStore for RecordingStore {
        async fn begin_write(&mut self) -> SmtpResponse {
            SmtpResponse::ok()
        }

        async fn write(&mut self, line: &str) -> Result<()> {
            self.lines.lock().unwrap().push(line.to_string());
            Ok(())
        }

        async fn end_write(&mut self) -> SmtpResponse {
            SmtpResponse::ok()
        }
    }

    pub struct RecordingStoreFactory {
        pub lines: Arc<Mutex<Vec<String>>>,
    }

    impl MessageStoreFactory for RecordingStoreFactory {
        fn create(&self, _context: &SessionContext, _envelope: &Transaction) -> Box<dyn MessageStore> {
            Box::new(RecordingStore {
                lines: Arc::clone(&self.lines),
            })
        }
    }

    /// A store whose `begin_write` rejects every message, to exercise the
    /// sink-rejection path.
    pub struct RejectingStore;

    #[async_trait]
    impl MessageStore for RejectingStore {
        async fn begin_write(&mut self) -> SmtpResponse {
            SmtpResponse::mailbox_unavailable()
        }

        async fn write(&mut self, _line: &str) -> Result<()> {
            Ok(())
        }

        async fn end_write(&mut self) -> SmtpResponse {
            SmtpResponse::ok()
        }
    }

    pub struct RejectingStoreFactory;

    impl MessageStoreFactory for RejectingStoreFactory {
        fn create(&self, _context: &SessionContext, _envelope: &Transaction) -> Box<dyn MessageStore> {
            Box::new(RejectingStore)
        }
    }
}
