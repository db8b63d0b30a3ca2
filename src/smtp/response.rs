//! `SmtpResponse` values and the line-rendering codec (RFC 5321 §4.2).

use std::fmt;

/// A numeric reply code plus its text, as sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpResponse {
    pub code: u16,
    pub text: String,
}

impl SmtpResponse {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        SmtpResponse {
            code,
            text: text.into(),
        }
    }

    pub fn service_ready(server_name: &str) -> Self {
        SmtpResponse::new(220, format!("{server_name} ESMTP ServiceReady"))
    }

    pub fn service_closing() -> Self {
        SmtpResponse::new(221, "ServiceClosingTransmissionChannel")
    }

    pub fn ok() -> Self {
        SmtpResponse::new(250, "Ok")
    }

    pub fn start_mail_input() -> Self {
        SmtpResponse::new(354, "StartMailInput, end with <CRLF>.<CRLF>")
    }

    pub fn mailbox_unavailable() -> Self {
        SmtpResponse::new(450, "MailboxUnavailable")
    }

    pub fn size_limit_exceeded() -> Self {
        SmtpResponse::new(452, "SizeLimitExceeded")
    }

    pub fn syntax_error() -> Self {
        SmtpResponse::new(501, "SyntaxError")
    }

    pub fn command_unrecognized() -> Self {
        SmtpResponse::new(500, "CommandUnrecognized")
    }

    pub fn bad_sequence() -> Self {
        SmtpResponse::new(503, "BadSequence")
    }

    pub fn authentication_required() -> Self {
        SmtpResponse::new(530, "AuthenticationRequired")
    }

    pub fn mailbox_name_not_allowed() -> Self {
        SmtpResponse::new(550, "MailboxNameNotAllowed")
    }

    /// See `DESIGN.md` for why this uses 554 rather than the 550 implied
    /// by the canonical-instances list elsewhere in the spec: the DATA
    /// execution steps are explicit that the no-recipients rejection uses
    /// 554, and that more specific text wins over the summary table.
    pub fn no_valid_recipients_given() -> Self {
        SmtpResponse::new(554, "NoValidRecipientsGiven")
    }

    pub fn transaction_failed() -> Self {
        SmtpResponse::new(554, "TransactionFailed")
    }

    /// Renders a single-line reply as `"{code} {text}\r\n"`.
    pub fn render(&self) -> String {
        format!("{} {}\r\n", self.code, self.text)
    }

    /// Renders a multi-line reply (used by `EHLO`): every line but the last
    /// uses `"{code}-{text}\r\n"`, the last uses `"{code} {text}\r\n"`.
    pub fn render_multiline(code: u16, lines: &[impl AsRef<str>]) -> String {
        let mut out = String::new();
        for (i, line) in lines.iter().enumerate() {
            let sep = if i + 1 == lines.len() { ' ' } else { '-' };
            out.push_str(&format!("{code}{sep}{}\r\n", line.as_ref()));
        }
        out
    }
}

impl fmt::Display for SmtpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}
