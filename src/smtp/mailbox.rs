//! The `Mailbox` value produced by the address-grammar recognizers.

use std::fmt;

/// A parsed SMTP mailbox: a local part and a domain (which may be a DNS
/// name or an IPv4 address literal's dotted-decimal text).
///
/// The null reverse path (`MAIL FROM:<>`) is represented by `Option<Mailbox>`
/// being `None` at the call site, never by a `Mailbox` with an empty
/// `local_part` — there is no such thing as an empty-but-present mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox {
    pub local_part: String,
    pub domain: String,
}

impl Mailbox {
    pub fn new(local_part: impl Into<String>, domain: impl Into<String>) -> Self {
        Mailbox {
            local_part: local_part.into(),
            domain: domain.into(),
        }
    }

    /// Renders the mailbox as `local@domain`.
    pub fn as_address(&self) -> String {
        format!("{}@{}", self.local_part, self.domain)
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_address_joins_local_and_domain() {
        let m = Mailbox::new("user.name+tag", "sub.example.com");
        assert_eq!(m.as_address(), "user.name+tag@sub.example.com");
    }

    #[test]
    fn display_matches_as_address() {
        let m = Mailbox::new("a", "x");
        assert_eq!(m.to_string(), "a@x");
    }
}
