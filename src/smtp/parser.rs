//! Backtracking recognizers for the RFC 5321 address grammar.
//!
//! Every `try_make_*` function takes the enumerator by mutable reference and
//! returns `Option<T>`: `Some` on success, having advanced the cursor past
//! what it recognized, or `None` on failure, having left the cursor exactly
//! where it found it. That "leave no trace on failure" guarantee comes from
//! routing every recognizer through [`TokenEnumerator::try_make`].
//!
//! Quoted-string local parts are intentionally unimplemented — see
//! `DESIGN.md` for why that gap is kept rather than closed.

use std::collections::HashMap;

use super::enumerator::TokenEnumerator;
use super::mailbox::Mailbox;
use super::token::{Token, TokenKind};

/// Characters from the RFC 5321 `atext` production that can appear outside
/// ALPHA/DIGIT runs in a dot-atom local part.
const ATEXT_SYMBOLS: &[char] = &[
    '!', '#', '%', '&', '\'', '*', '-', '/', '?', '_', '{', '}', '$', '+', '=', '^', '`', '|', '~',
];

fn is_atext_token(tok: &Token) -> bool {
    match tok.kind {
        TokenKind::Text | TokenKind::Number => true,
        TokenKind::Punctuation | TokenKind::Symbol => tok
            .single_char()
            .map(|c| ATEXT_SYMBOLS.contains(&c))
            .unwrap_or(false),
        _ => false,
    }
}

fn is_text_or_number(tok: &Token) -> bool {
    matches!(tok.kind, TokenKind::Text | TokenKind::Number)
}

/// Recognizes a `ReversePath`: either a normal `Path`, or the null-sender
/// form `"<" Space* ">"`. Returns `Some(None)` for the null form, and
/// `Some(Some(mailbox))` for a populated path.
pub fn try_make_reverse_path(e: &mut TokenEnumerator) -> Option<Option<Mailbox>> {
    e.try_make(|e| {
        if e.peek().single_char() == Some('<') {
            let mark = e.checkpoint();
            e.take();
            e.take_while(|t| t.kind == TokenKind::Space);
            if e.peek().single_char() == Some('>') {
                e.take();
                return Some(None);
            }
            e.rollback(mark);
        }
        try_make_path(e).map(Some)
    })
}

/// Recognizes `Path`: `"<"? (AtDomainList ":")? Mailbox ">"?`. The optional
/// at-domain-list source route is parsed and discarded per RFC 5321
/// Appendix C. If an opening `<` was consumed, a matching `>` is required.
pub fn try_make_path(e: &mut TokenEnumerator) -> Option<Mailbox> {
    e.try_make(|e| {
        let had_angle = e.peek().single_char() == Some('<');
        if had_angle {
            e.take();
        }

        try_make_at_domain_list_prefix(e);

        let mailbox = try_make_mailbox(e)?;

        if had_angle {
            if e.peek().single_char() != Some('>') {
                return None;
            }
            e.take();
        }

        Some(mailbox)
    })
}

/// Consumes an optional `AtDomainList ":"` prefix (the SMTP "source
/// route"), discarding its contents. Never fails: absence of the prefix is
/// not an error.
fn try_make_at_domain_list_prefix(e: &mut TokenEnumerator) {
    e.try_make(|e| -> Option<()> {
        if e.peek().single_char() != Some('@') {
            return None;
        }
        loop {
            e.take(); // '@'
            try_make_domain(e)?;
            match e.peek().single_char() {
                Some(',') => {
                    e.take();
                    if e.peek().single_char() != Some('@') {
                        return None;
                    }
                    continue;
                }
                Some(':') => {
                    e.take();
                    return Some(());
                }
                _ => return None,
            }
        }
    });
}

/// Recognizes `Mailbox ::= LocalPart "@" (Domain | AddressLiteral)`.
pub fn try_make_mailbox(e: &mut TokenEnumerator) -> Option<Mailbox> {
    e.try_make(|e| {
        let local_part = try_make_dot_string(e)?;
        if e.peek().single_char() != Some('@') {
            return None;
        }
        e.take();

        let domain = try_make_domain(e).or_else(|| try_make_address_literal(e))?;

        Some(Mailbox::new(local_part, domain))
    })
}

/// `DotString ::= Atom ("." Atom)*`.
fn try_make_dot_string(e: &mut TokenEnumerator) -> Option<String> {
    e.try_make(|e| {
        let mut parts = vec![try_make_atom(e)?];
        loop {
            let mark = e.checkpoint();
            if e.peek().single_char() == Some('.') {
                e.take();
                match try_make_atom(e) {
                    Some(atom) => parts.push(atom),
                    None => {
                        e.rollback(mark);
                        break;
                    }
                }
            } else {
                break;
            }
        }
        Some(parts.join("."))
    })
}

/// `Atom ::= Atext+`.
fn try_make_atom(e: &mut TokenEnumerator) -> Option<String> {
    e.try_make(|e| {
        let toks = e.take_while(is_atext_token);
        if toks.is_empty() {
            None
        } else {
            Some(toks.into_iter().map(|t| t.text).collect())
        }
    })
}

/// `Domain ::= Subdomain ("." Subdomain)*`.
pub fn try_make_domain(e: &mut TokenEnumerator) -> Option<String> {
    e.try_make(|e| {
        let mut parts = vec![try_make_subdomain(e)?];
        loop {
            let mark = e.checkpoint();
            if e.peek().single_char() == Some('.') {
                e.take();
                match try_make_subdomain(e) {
                    Some(sub) => parts.push(sub),
                    None => {
                        e.rollback(mark);
                        break;
                    }
                }
            } else {
                break;
            }
        }
        Some(parts.join("."))
    })
}

/// `Subdomain ::= TextOrNumber (LdhString)?`, where `LdhString` is one or
/// more Text/Number/`-` tokens that must not end with `-`.
fn try_make_subdomain(e: &mut TokenEnumerator) -> Option<String> {
    e.try_make(|e| {
        if !is_text_or_number(&e.peek()) {
            return None;
        }

        let mut text = String::new();
        loop {
            let tok = e.peek();
            if is_text_or_number(&tok) {
                text.push_str(&tok.text);
                e.take();
            } else if tok.single_char() == Some('-') {
                // Only consume the trailing run of letter/digit/hyphen
                // tokens if it is itself followed by more letters/digits,
                // so the subdomain never ends on a hyphen.
                let mark = e.checkpoint();
                let mut hyphen_run = String::from("-");
                e.take();
                while let Some(c) = e.peek().single_char() {
                    if c == '-' {
                        hyphen_run.push('-');
                        e.take();
                    } else {
                        break;
                    }
                }
                if is_text_or_number(&e.peek()) {
                    text.push_str(&hyphen_run);
                    continue;
                } else {
                    e.rollback(mark);
                    break;
                }
            } else {
                break;
            }
        }

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    })
}

/// `AddressLiteral ::= "[" Space* IPv4 Space* "]"`.
pub fn try_make_address_literal(e: &mut TokenEnumerator) -> Option<String> {
    e.try_make(|e| {
        if e.peek().single_char() != Some('[') {
            return None;
        }
        e.take();
        e.take_while(|t| t.kind == TokenKind::Space);
        let ip = try_make_ipv4_address_literal(e)?;
        e.take_while(|t| t.kind == TokenKind::Space);
        if e.peek().single_char() != Some(']') {
            return None;
        }
        e.take();
        Some(ip)
    })
}

/// `IPv4 ::= Snum "." Snum "." Snum "." Snum`, `Snum` = decimal in [0,255].
pub fn try_make_ipv4_address_literal(e: &mut TokenEnumerator) -> Option<String> {
    e.try_make(|e| {
        let mut octets = Vec::with_capacity(4);
        for i in 0..4 {
            if i > 0 {
                if e.peek().single_char() != Some('.') {
                    return None;
                }
                e.take();
            }
            octets.push(try_make_snum(e)?);
        }
        Some(octets.join("."))
    })
}

/// `Snum`: a decimal number token whose value fits in `[0, 255]`.
pub fn try_make_snum(e: &mut TokenEnumerator) -> Option<String> {
    e.try_make(|e| {
        let tok = e.peek();
        if tok.kind != TokenKind::Number {
            return None;
        }
        let value: u32 = tok.text.parse().ok()?;
        if value > 255 {
            return None;
        }
        e.take();
        Some(tok.text)
    })
}

/// `MailParameters ::= EsmtpParameter (Space+ EsmtpParameter)*`, folded into
/// a case-insensitive (uppercased-key) map.
pub fn try_make_mail_parameters(e: &mut TokenEnumerator) -> Option<HashMap<String, String>> {
    e.try_make(|e| {
        let mut params = HashMap::new();
        let (key, value) = try_make_esmtp_parameter(e)?;
        params.insert(key.to_uppercase(), value);

        loop {
            let mark = e.checkpoint();
            let spaces = e.take_while(|t| t.kind == TokenKind::Space);
            if spaces.is_empty() {
                break;
            }
            match try_make_esmtp_parameter(e) {
                Some((key, value)) => {
                    params.insert(key.to_uppercase(), value);
                }
                None => {
                    e.rollback(mark);
                    break;
                }
            }
        }

        Some(params)
    })
}

/// `EsmtpParameter ::= Keyword "=" Value`.
fn try_make_esmtp_parameter(e: &mut TokenEnumerator) -> Option<(String, String)> {
    e.try_make(|e| {
        let key = try_make_esmtp_keyword(e)?;
        if e.peek().single_char() != Some('=') {
            return None;
        }
        e.take();
        let value = try_make_esmtp_value(e)?;
        Some((key, value))
    })
}

/// `Keyword ::= (ALPHA|DIGIT) (ALPHA|DIGIT|"-")*`.
fn try_make_esmtp_keyword(e: &mut TokenEnumerator) -> Option<String> {
    e.try_make(|e| {
        if !is_text_or_number(&e.peek()) {
            return None;
        }
        let mut text = String::new();
        loop {
            let tok = e.peek();
            if is_text_or_number(&tok) || tok.single_char() == Some('-') {
                text.push_str(&tok.text);
                e.take();
            } else {
                break;
            }
        }
        Some(text)
    })
}

/// `Value ::= (any printable token in 33-126 except "=")+`.
///
/// Per RFC 5321 this excludes byte 61 (`=`) only; implementations that also
/// exclude the range 62-126 are following an off-by-one bug in an older
/// reference implementation, which this parser does not reproduce.
fn try_make_esmtp_value(e: &mut TokenEnumerator) -> Option<String> {
    e.try_make(|e| {
        let toks = e.take_while(|t| match t.single_char() {
            Some(c) => (33..=126).contains(&(c as u32)) && c != '=',
            None => matches!(t.kind, TokenKind::Text | TokenKind::Number),
        });
        if toks.is_empty() {
            None
        } else {
            Some(toks.into_iter().map(|t| t.text).collect())
        }
    })
}

/// `Base64 ::= (Text|Number|"+"|"/")+` with total length divisible by 4.
///
/// This only recognizes the lexical shape of a base64 blob (for `AUTH`
/// continuation lines); it does not decode it. Decoding base64-encoded
/// credentials is out of scope for this crate.
pub fn try_make_base64(e: &mut TokenEnumerator) -> Option<String> {
    e.try_make(|e| {
        let toks = e.take_while(|t| match t.kind {
            TokenKind::Text | TokenKind::Number => true,
            TokenKind::Punctuation | TokenKind::Symbol => {
                matches!(t.single_char(), Some('+') | Some('/'))
            }
            _ => false,
        });
        if toks.is_empty() {
            return None;
        }
        let text: String = toks.into_iter().map(|t| t.text).collect();
        if text.len() % 4 != 0 {
            return None;
        }
        Some(text)
    })
}
