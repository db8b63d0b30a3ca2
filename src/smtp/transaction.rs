//! The in-progress mail envelope assembled by `MAIL`/`RCPT` before `DATA`.

use super::mailbox::Mailbox;

/// The envelope of the transaction currently in progress on a session.
///
/// `from` is `None` until a successful `MAIL` (or remains `None` forever if
/// the client used the null reverse path `<>`). `to` accumulates one entry
/// per successful `RCPT`.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    pub from: Option<Mailbox>,
    pub to: Vec<Mailbox>,
}

impl Transaction {
    pub fn new() -> Self {
        Transaction::default()
    }

    /// Clears both `from` and `to`. Called on connection setup, on `RSET`,
    /// and at the start of every `MAIL` (even one that is ultimately
    /// rejected by the mailbox filter).
    pub fn reset(&mut self) {
        self.from = None;
        self.to.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_from_and_to() {
        let mut t = Transaction::new();
        t.from = Some(Mailbox::new("a", "x"));
        t.to.push(Mailbox::new("b", "y"));
        t.reset();
        assert!(t.from.is_none());
        assert!(t.to.is_empty());
    }

    #[test]
    fn new_transaction_is_empty() {
        let t = Transaction::new();
        assert!(t.from.is_none());
        assert!(t.to.is_empty());
    }
}
