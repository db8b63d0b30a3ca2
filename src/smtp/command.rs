//! Maps a raw command line to a [`Command`] value.

use std::collections::HashMap;

use log::debug;

use super::enumerator::TokenEnumerator;
use super::mailbox::Mailbox;
use super::parser;
use super::response::SmtpResponse;
use super::token::tokenize;

/// A fully parsed SMTP command, tagged by verb.
///
/// `Invalid` carries the reply that should be sent for a syntactically
/// malformed command line; the state machine treats it like any other verb
/// it does not recognize as legal in the current state, except that its
/// execution always replies with the carried response rather than
/// `503 BadSequence`.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Helo(String),
    Ehlo(String),
    Mail {
        address: Option<Mailbox>,
        params: HashMap<String, String>,
    },
    Rcpt(Mailbox),
    Data,
    Rset,
    Noop,
    Quit,
    Invalid(SmtpResponse),
}

impl Command {
    /// A coarse tag used by the state machine, so it never has to match on
    /// command payloads.
    pub fn verb(&self) -> Verb {
        match self {
            Command::Helo(_) => Verb::Helo,
            Command::Ehlo(_) => Verb::Ehlo,
            Command::Mail { .. } => Verb::Mail,
            Command::Rcpt(_) => Verb::Rcpt,
            Command::Data => Verb::Data,
            Command::Rset => Verb::Rset,
            Command::Noop => Verb::Noop,
            Command::Quit => Verb::Quit,
            Command::Invalid(_) => Verb::Invalid,
        }
    }
}

/// The verb tag used for state-machine transitions, independent of any
/// parsed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Helo,
    Ehlo,
    Mail,
    Rcpt,
    Data,
    Rset,
    Noop,
    Quit,
    Invalid,
}

/// Splits a raw command line into `(verb, rest)`, where `verb` is the
/// leading run of letters (case preserved) and `rest` is whatever follows,
/// with at most one separating space stripped.
fn split_verb(line: &str) -> (&str, &str) {
    let trimmed = line.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    let (verb, rest) = trimmed.split_at(end);
    (verb, rest.trim_start_matches([' ', '\t']))
}

/// Parses one command line into a [`Command`], consulting the grammar
/// parser for verbs that take arguments. An unrecognized verb yields
/// `500 CommandUnrecognized`; a recognized verb with malformed arguments
/// yields `501 SyntaxError` (both wrapped in `Command::Invalid`).
pub fn parse_command(line: &str) -> Command {
    let (verb, rest) = split_verb(line);
    let verb_upper = verb.to_uppercase();
    debug!("CommandFactory: verb={:?} rest={:?}", verb_upper, rest);

    match verb_upper.as_str() {
        "HELO" => parse_domain_arg(rest, Command::Helo),
        "EHLO" => parse_domain_arg(rest, Command::Ehlo),
        "MAIL" => parse_mail(rest),
        "RCPT" => parse_rcpt(rest),
        "DATA" => Command::Data,
        "RSET" => Command::Rset,
        "NOOP" => Command::Noop,
        "QUIT" => Command::Quit,
        "" => Command::Invalid(SmtpResponse::syntax_error()),
        _ => Command::Invalid(SmtpResponse::command_unrecognized()),
    }
}

fn parse_domain_arg(rest: &str, make: impl FnOnce(String) -> Command) -> Command {
    let mut e = TokenEnumerator::new(tokenize(rest));
    match parser::try_make_domain(&mut e) {
        Some(domain) if e.at_end() => make(domain),
        _ => Command::Invalid(SmtpResponse::syntax_error()),
    }
}

/// `MAIL FROM:<path> [SP Mail-parameters]`.
fn parse_mail(rest: &str) -> Command {
    let rest = match strip_prefix_ci(rest, "FROM:") {
        Some(r) => r,
        None => return Command::Invalid(SmtpResponse::syntax_error()),
    };

    let mut e = TokenEnumerator::new(tokenize(rest));
    let address = match parser::try_make_reverse_path(&mut e) {
        Some(address) => address,
        None => return Command::Invalid(SmtpResponse::syntax_error()),
    };

    e.take_while(|t| t.kind == super::token::TokenKind::Space);
    let params = if e.at_end() {
        HashMap::new()
    } else {
        match parser::try_make_mail_parameters(&mut e) {
            Some(params) if e.at_end() => params,
            _ => return Command::Invalid(SmtpResponse::syntax_error()),
        }
    };

    Command::Mail { address, params }
}

/// `RCPT TO:<path>`.
fn parse_rcpt(rest: &str) -> Command {
    let rest = match strip_prefix_ci(rest, "TO:") {
        Some(r) => r,
        None => return Command::Invalid(SmtpResponse::syntax_error()),
    };

    let mut e = TokenEnumerator::new(tokenize(rest));
    let mailbox = match parser::try_make_path(&mut e) {
        Some(mailbox) => mailbox,
        None => return Command::Invalid(SmtpResponse::syntax_error()),
    };

    e.take_while(|t| t.kind == super::token::TokenKind::Space);
    // Recipient parameters are accepted and discarded: the spec's grammar
    // only requires MAIL parameters to be retained.
    let _ = parser::try_make_mail_parameters(&mut e);
    e.take_while(|t| t.kind == super::token::TokenKind::Space);
    if !e.at_end() {
        return Command::Invalid(SmtpResponse::syntax_error());
    }

    Command::Rcpt(mailbox)
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() < prefix.len() {
        return None;
    }
    let (head, tail) = text.split_at(prefix.len());
    if head.eq_ignore_ascii_case(prefix) {
        Some(tail)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_helo() {
        let cmd = parse_command("HELO client.example.com");
        assert_eq!(cmd, Command::Helo("client.example.com".to_string()));
    }

    #[test]
    fn parses_mail_from_null_sender() {
        let cmd = parse_command("MAIL FROM:<>");
        assert_eq!(
            cmd,
            Command::Mail {
                address: None,
                params: HashMap::new(),
            }
        );
    }

    #[test]
    fn parses_mail_from_with_size_param() {
        let cmd = parse_command("MAIL FROM:<a@x.com> SIZE=2000");
        match cmd {
            Command::Mail { address, params } => {
                assert_eq!(address.unwrap().as_address(), "a@x.com");
                assert_eq!(params.get("SIZE").map(String::as_str), Some("2000"));
            }
            other => panic!("expected Mail, got {other:?}"),
        }
    }

    #[test]
    fn parses_rcpt_to() {
        let cmd = parse_command("RCPT TO:<b@y.com>");
        assert_eq!(cmd, Command::Rcpt(Mailbox::new("b", "y.com")));
    }

    #[test]
    fn rcpt_to_is_case_insensitive() {
        let cmd = parse_command("rcpt to:<b@y.com>");
        assert_eq!(cmd, Command::Rcpt(Mailbox::new("b", "y.com")));
    }

    #[test]
    fn unknown_verb_is_invalid_with_500() {
        let cmd = parse_command("BOGUS");
        assert_eq!(
            cmd,
            Command::Invalid(SmtpResponse::command_unrecognized())
        );
    }

    #[test]
    fn malformed_mail_is_invalid_with_501() {
        let cmd = parse_command("MAIL FROM:not-an-address");
        assert_eq!(cmd, Command::Invalid(SmtpResponse::syntax_error()));
    }

    #[test]
    fn data_rset_noop_quit_take_no_args() {
        assert_eq!(parse_command("DATA"), Command::Data);
        assert_eq!(parse_command("RSET"), Command::Rset);
        assert_eq!(parse_command("NOOP"), Command::Noop);
        assert_eq!(parse_command("QUIT"), Command::Quit);
    }

    #[test]
    fn trailing_hyphen_domain_in_helo_is_rejected() {
        let cmd = parse_command("HELO foo-");
        assert_eq!(cmd, Command::Invalid(SmtpResponse::syntax_error()));
    }
}
