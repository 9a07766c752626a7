use std::fmt;

/// Lexical class of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Whitespace,
    Comment,
    String,
    Punctuation,
    Word,
    Other,
}

impl TokenKind {
    /// Whitespace and comments carry no meaning for schema comparison.
    #[must_use]
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment)
    }
}

/// The smallest lexical unit, holding its exact source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn is_significant(&self) -> bool {
        !self.kind.is_trivia()
    }

    /// Case-insensitive keyword test. `keyword` must be upper case.
    #[must_use]
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    #[must_use]
    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punctuation && self.text == punct
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

const PUNCTUATION: &[char] = &['(', ')', '[', ']', '$', '.', ',', ';', '#', '@'];

/// Splits `text` into tokens, keeping whitespace and comments.
///
/// Tokenizing never fails: unterminated comments and strings run to the end
/// of the input. Concatenating the text of every returned token reproduces
/// `text` exactly.
#[must_use]
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = text;

    while let Some(first) = rest.chars().next() {
        let (kind, len) = if first.is_whitespace() {
            (TokenKind::Whitespace, scan_while(rest, char::is_whitespace))
        } else if rest.starts_with("--") {
            (TokenKind::Comment, scan_line_comment(rest))
        } else if rest.starts_with("/*") {
            (TokenKind::Comment, scan_block_comment(rest))
        } else if first == '\'' || first == '"' {
            (TokenKind::String, scan_string(rest, first))
        } else if PUNCTUATION.contains(&first) {
            (TokenKind::Punctuation, first.len_utf8())
        } else if is_word_char(first) {
            (TokenKind::Word, scan_while(rest, is_word_char))
        } else {
            (TokenKind::Other, first.len_utf8())
        };

        let (token_text, remaining) = rest.split_at(len);
        tokens.push(Token::new(kind, token_text));
        rest = remaining;
    }

    tokens
}

/// Concatenates token texts back into source text.
#[must_use]
pub fn render_tokens(tokens: &[Token]) -> String {
    let capacity = tokens.iter().map(|token| token.text.len()).sum();
    let mut out = String::with_capacity(capacity);
    for token in tokens {
        out.push_str(&token.text);
    }
    out
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn scan_while(input: &str, predicate: impl Fn(char) -> bool) -> usize {
    input
        .char_indices()
        .find(|&(_, ch)| !predicate(ch))
        .map_or(input.len(), |(index, _)| index)
}

// `--` up to and including the line terminator.
fn scan_line_comment(input: &str) -> usize {
    let bytes = input.as_bytes();
    let mut index = 2;
    while index < bytes.len() {
        match bytes[index] {
            b'\n' => return index + 1,
            b'\r' if bytes.get(index + 1) == Some(&b'\n') => return index + 2,
            _ => index += 1,
        }
    }
    input.len()
}

fn scan_block_comment(input: &str) -> usize {
    input[2..].find("*/").map_or(input.len(), |end| end + 4)
}

fn scan_string(input: &str, quote: char) -> usize {
    let quote = quote as u8;
    let bytes = input.as_bytes();
    let mut index = 1;
    while index < bytes.len() {
        if bytes[index] == quote {
            if bytes.get(index + 1) == Some(&quote) {
                index += 2;
                continue;
            }
            return index + 1;
        }
        index += 1;
    }
    input.len()
}

/// Removes the surrounding quotes of a string token and collapses doubled
/// quotes. Returns `None` when `text` is not a terminated quoted string.
#[must_use]
pub fn unquote(text: &str) -> Option<String> {
    let quote = text.chars().next().filter(|ch| *ch == '\'' || *ch == '"')?;
    if text.len() < 2 || !text.ends_with(quote) {
        return None;
    }

    let inner = &text[1..text.len() - 1];
    let doubled = [quote, quote].iter().collect::<String>();
    Some(inner.replace(&doubled, &quote.to_string()))
}
