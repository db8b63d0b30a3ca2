//! The DATA-phase streaming driver (RFC 5321 §4.5.2).
//!
//! This is the one part of the session loop that doesn't fit the
//! single-line-in, single-reply-out shape of every other command: it reads
//! a variable number of body lines, undoes dot-stuffing, and drives a
//! host-supplied [`super::store::MessageStore`] through its lifecycle.

use anyhow::Result;
use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

use super::context::SessionContext;
use super::response::SmtpResponse;
use super::session::Session;
use super::state_machine::SmtpState;
use super::store::MessageStoreFactory;

/// Runs one DATA command to completion.
///
/// The state machine has already verified `DATA` is legal in the caller's
/// current state and that the next state is `WaitingForMail` regardless of
/// outcome — this function always returns that state, resetting the
/// transaction before it does.
pub async fn run<R, W>(
    session: &mut Session<R, W>,
    context: &mut SessionContext,
    store_factory: &dyn MessageStoreFactory,
) -> Result<SmtpState>
where
    R: AsyncBufReadExt + Unpin,
    W: AsyncWriteExt + Unpin,
{
    if context.transaction.to.is_empty() {
        // Defense in depth: the state machine only reaches `CanAcceptData`
        // after a successful RCPT, so this should be unreachable in
        // practice.
        session
            .write_response(&SmtpResponse::no_valid_recipients_given())
            .await?;
        context.transaction.reset();
        return Ok(SmtpState::WaitingForMail);
    }

    session.write_response(&SmtpResponse::start_mail_input()).await?;

    let mut store = store_factory.create(context, &context.transaction);
    let begin = store.begin_write().await;
    if begin.code != 250 {
        session.write_response(&begin).await?;
        context.transaction.reset();
        return Ok(SmtpState::WaitingForMail);
    }

    // An empty body line is legal content, but it is not written until the
    // line after it arrives: a run of blank lines immediately before the
    // terminator is absorbed rather than flushed (see DESIGN.md).
    let mut pending_blank = false;
    let mut sink_failed = false;

    loop {
        let line = match session.read_line_opt().await? {
            Some(line) => line,
            None => {
                debug!("DATA: connection closed mid-body");
                context.transaction.reset();
                return Ok(SmtpState::WaitingForMail);
            }
        };

        if line == "." {
            break;
        }

        // Dot-stuffing: a leading "." on a non-terminator line was doubled
        // by the sender and must be undone before delivery to the sink.
        let content = if line.len() > 1 && line.starts_with('.') {
            line[1..].to_string()
        } else {
            line
        };

        if content.is_empty() {
            pending_blank = true;
            continue;
        }

        if pending_blank {
            if store.write("").await.is_err() {
                sink_failed = true;
                break;
            }
            pending_blank = false;
        }

        if store.write(&content).await.is_err() {
            sink_failed = true;
            break;
        }
    }

    context.transaction.reset();

    if sink_failed {
        session.write_response(&SmtpResponse::transaction_failed()).await?;
    } else {
        let end = store.end_write().await;
        session.write_response(&end).await?;
    }

    Ok(SmtpState::WaitingForMail)
}
