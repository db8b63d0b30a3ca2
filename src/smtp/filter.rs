//! The host-supplied mailbox acceptance policy.

use async_trait::async_trait;

use super::context::SessionContext;
use super::mailbox::Mailbox;

/// The outcome of a mailbox acceptance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    Yes,
    NoTemporarily,
    NoPermanently,
    SizeLimitExceeded,
}

/// A per-session policy consulted by `MAIL` and `RCPT` execution.
///
/// A fresh instance is created per session by [`MailboxFilterFactory`] and
/// dropped once the session ends — Rust's ownership model gives the
/// "guaranteed release on all exit paths" the source achieves with explicit
/// scoped disposal, for free.
#[async_trait]
pub trait MailboxFilter: Send {
    /// Consulted by `MAIL FROM:<from>`. `from` is `None` for the null
    /// reverse path. `size` is the `SIZE=` ESMTP parameter value, or 0 if
    /// absent.
    async fn can_accept_from(
        &mut self,
        context: &SessionContext,
        from: Option<&Mailbox>,
        size: usize,
    ) -> FilterResult;

    /// Consulted by `RCPT TO:<to>`, with the sender from the current
    /// transaction (`None` for the null reverse path).
    async fn can_deliver_to(
        &mut self,
        context: &SessionContext,
        to: &Mailbox,
        from: Option<&Mailbox>,
    ) -> FilterResult;
}

/// Creates a [`MailboxFilter`] for each new session.
pub trait MailboxFilterFactory: Send + Sync {
    fn create(&self, context: &SessionContext) -> Box<dyn MailboxFilter>;
}
