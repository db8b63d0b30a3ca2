//! The pure SMTP session state machine (RFC 5321 command sequencing).

use super::command::Verb;

/// The state of an SMTP conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpState {
    /// Before any `HELO`/`EHLO`.
    WaitingForHelo,
    /// Greeted, waiting for `MAIL`.
    WaitingForMail,
    /// After `MAIL`, zero or more `RCPT` so far.
    WithinTransaction,
    /// After at least one successful `RCPT`; `DATA` is now legal.
    CanAcceptData,
}

impl Default for SmtpState {
    fn default() -> Self {
        SmtpState::WaitingForHelo
    }
}

/// A pure function from `(state, verb)` to the next state, or rejection.
///
/// The machine neither performs I/O nor mutates the transaction: it only
/// decides whether a verb is legal right now, and if so what state follows.
/// `NOOP` and `QUIT` are legal in every state and never change it (except
/// that `QUIT` ends the session, a fact the caller — not this function —
/// acts on).
pub struct StateMachine;

impl StateMachine {
    /// Returns `Some(next_state)` if `verb` is legal in `state`, or `None`
    /// if the command should be rejected with `503 BadSequence`.
    pub fn transition(state: SmtpState, verb: Verb) -> Option<SmtpState> {
        use SmtpState::*;
        use Verb::*;

        match (state, verb) {
            (_, Noop) | (_, Quit) => Some(state),
            (_, Invalid) => Some(state),

            (WaitingForHelo, Helo) | (WaitingForHelo, Ehlo) => Some(WaitingForMail),

            (WaitingForMail, Helo) | (WaitingForMail, Ehlo) => Some(WaitingForMail),
            (WaitingForMail, Mail) => Some(WithinTransaction),
            (WaitingForMail, Rset) => Some(WaitingForMail),

            (WithinTransaction, Rcpt) => Some(CanAcceptData),
            (WithinTransaction, Rset) => Some(WaitingForMail),

            (CanAcceptData, Rcpt) => Some(CanAcceptData),
            (CanAcceptData, Data) => Some(WaitingForMail),
            (CanAcceptData, Rset) => Some(WaitingForMail),

            _ => None,
        }
    }
}
