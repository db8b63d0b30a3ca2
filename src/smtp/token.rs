//! Converts a single SMTP command line into a stream of typed tokens.
//!
//! The tokenizer is the bottom layer of the parsing pipeline: it knows
//! nothing about SMTP grammar, only about the lexical categories RFC 5321's
//! ABNF is built from (`ALPHA`, `DIGIT`, punctuation, and everything else).
//! The [`super::parser`] module consumes the resulting [`Token`] stream
//! through a [`super::enumerator::TokenEnumerator`].

/// The lexical category of a [`Token`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    /// One or more consecutive ASCII letters.
    Text,
    /// One or more consecutive ASCII digits.
    Number,
    /// A single character from the RFC 5321 punctuation set `.,:;@[]-/`.
    Punctuation,
    /// A single printable character that is neither letter, digit, space,
    /// nor one of the punctuation characters (e.g. `<`, `>`, `"`, `+`, `=`).
    Symbol,
    /// One or more consecutive space or horizontal-tab characters.
    Space,
    /// End-of-stream sentinel. Never produced mid-stream.
    None,
}

const PUNCTUATION: &[char] = &['.', ',', ':', ';', '@', '[', ']', '-', '/'];

/// A single lexical unit produced by [`tokenize`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            kind,
            text: text.into(),
        }
    }

    /// The end-of-stream sentinel token.
    pub fn none() -> Self {
        Token {
            kind: TokenKind::None,
            text: String::new(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == TokenKind::None
    }

    /// Convenience accessor for the single character of a one-character
    /// token (Punctuation or Symbol). Returns `None` for multi-character
    /// tokens.
    pub fn single_char(&self) -> Option<char> {
        let mut chars = self.text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }
}

/// Tokenizes one input line (CR/LF already stripped) into a sequence of
/// [`Token`]s. The stream is not explicitly terminated with a `None` token
/// here — callers go through [`super::enumerator::TokenEnumerator`], which
/// synthesizes a `None` token once the underlying `Vec` is exhausted.
pub fn tokenize(line: &str) -> Vec<Token> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_ascii_alphabetic() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_alphabetic() {
                i += 1;
            }
            tokens.push(Token::new(TokenKind::Text, chars[start..i].iter().collect::<String>()));
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            tokens.push(Token::new(TokenKind::Number, chars[start..i].iter().collect::<String>()));
        } else if c == ' ' || c == '\t' {
            let start = i;
            while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
                i += 1;
            }
            tokens.push(Token::new(TokenKind::Space, chars[start..i].iter().collect::<String>()));
        } else if PUNCTUATION.contains(&c) {
            tokens.push(Token::new(TokenKind::Punctuation, c.to_string()));
            i += 1;
        } else {
            // Every other printable character (and anything else that slipped
            // through, e.g. stray control bytes) is a one-character Symbol.
            tokens.push(Token::new(TokenKind::Symbol, c.to_string()));
            i += 1;
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_mail_from_line() {
        let tokens = tokenize("MAIL FROM:<a@x.com>");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Text,       // MAIL
                TokenKind::Space,
                TokenKind::Text,       // FROM
                TokenKind::Punctuation, // :
                TokenKind::Symbol,     // <
                TokenKind::Text,       // a
                TokenKind::Punctuation, // @
                TokenKind::Text,       // x
                TokenKind::Punctuation, // .
                TokenKind::Text,       // com
                TokenKind::Symbol,     // >
            ]
        );
    }

    #[test]
    fn preserves_case() {
        let tokens = tokenize("HeLo");
        assert_eq!(tokens[0].text, "HeLo");
    }

    #[test]
    fn groups_runs_of_digits_and_hyphens() {
        let tokens = tokenize("foo-123");
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Text, "foo"),
                Token::new(TokenKind::Punctuation, "-"),
                Token::new(TokenKind::Number, "123"),
            ]
        );
    }

    #[test]
    fn classifies_atext_symbols() {
        let tokens = tokenize("+_~");
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Symbol));
    }

    #[test]
    fn empty_line_yields_no_tokens() {
        assert!(tokenize("").is_empty());
    }
}
