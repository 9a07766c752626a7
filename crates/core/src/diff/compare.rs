use crate::token::{Token, TokenKind};

/// Compares two token runs on their significant tokens only.
///
/// Whitespace and comments are ignored. Words compare case-insensitively;
/// strings, punctuation, and other tokens must match byte for byte.
#[must_use]
pub fn significant_tokens_equal(left: &[Token], right: &[Token]) -> bool {
    let mut left = left.iter().filter(|token| token.is_significant());
    let mut right = right.iter().filter(|token| token.is_significant());
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(left), Some(right)) if tokens_equal(left, right) => {}
            _ => return false,
        }
    }
}

fn tokens_equal(left: &Token, right: &Token) -> bool {
    if left.kind != right.kind {
        return false;
    }
    match left.kind {
        TokenKind::Word => words_equal(&left.text, &right.text),
        _ => left.text == right.text,
    }
}

fn words_equal(left: &str, right: &str) -> bool {
    if left.is_ascii() && right.is_ascii() {
        left.eq_ignore_ascii_case(right)
    } else {
        left.to_uppercase() == right.to_uppercase()
    }
}
