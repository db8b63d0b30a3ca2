//! The embeddable SMTP/ESMTP server core (RFC 5321).
//!
//! Bytes flow: [`token`] → [`enumerator`] → [`parser`] → [`command`] →
//! [`state_machine`], with [`session`] driving the per-connection loop and
//! [`data_command`] taking over for the DATA phase. [`server`] owns the TCP
//! acceptor that spawns one session per connection. Everything the core
//! needs from its host crosses the [`filter`] and [`store`] trait
//! boundaries.

pub mod command;
pub mod context;
pub mod data_command;
pub(crate) mod email_parser;
pub mod enumerator;
pub mod events;
pub mod filter;
pub mod mailbox;
pub mod options;
pub mod parser;
pub mod response;
pub mod server;
pub mod session;
pub mod state_machine;
pub mod store;
pub mod token;
pub mod transaction;

pub use command::{Command, Verb};
pub use context::SessionContext;
pub use events::{NoopObserver, SessionObserver};
pub use filter::{FilterResult, MailboxFilter, MailboxFilterFactory};
pub use mailbox::Mailbox;
pub use options::ServerOptions;
pub use response::SmtpResponse;
pub use server::Server;
pub use session::Session;
pub use state_machine::{SmtpState, StateMachine};
pub use store::{MessageStore, MessageStoreFactory};
pub use transaction::Transaction;
