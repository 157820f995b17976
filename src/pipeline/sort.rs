//! Natural ordering of archive entry names.
//!
//! Archive tools disagree on entry order, and plain lexicographic order puts
//! `page10` before `page9`. Names are compared on their file name only,
//! lowercased, split into alternating digit and non-digit runs; digit runs
//! compare by value, everything else compares as text.

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Digits(&'a str),
    Text(&'a str),
}

impl<'a> Token<'a> {
    fn as_str(&self) -> &'a str {
        match self {
            Token::Digits(s) | Token::Text(s) => s,
        }
    }
}

/// Last path component, accepting both `/` and `\` separators.
fn file_name(name: &str) -> &str {
    name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name)
}

fn tokenize(s: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;

    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != digit => {
                tokens.push(make_token(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }
    if let Some(prev) = in_digits {
        tokens.push(make_token(&s[start..], prev));
    }
    tokens
}

fn make_token(s: &str, digits: bool) -> Token<'_> {
    if digits {
        Token::Digits(s)
    } else {
        Token::Text(s)
    }
}

/// Compare two digit runs by integer value without overflowing on long runs.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Natural-order comparator over entry names.
///
/// Two names whose tokens are all equal (e.g. `a/01.jpg` and `b/1.jpg`)
/// compare `Equal`; a stable sort keeps their discovery order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a = file_name(a).to_lowercase();
    let b = file_name(b).to_lowercase();
    let ta = tokenize(&a);
    let tb = tokenize(&b);

    for i in 0..ta.len().max(tb.len()) {
        let ord = match (ta.get(i), tb.get(i)) {
            (Some(Token::Digits(x)), Some(Token::Digits(y))) => compare_digits(x, y),
            (Some(x), Some(y)) => x.as_str().cmp(y.as_str()),
            // A missing token pads as "" and loses to anything non-empty.
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Stable in-place natural sort.
pub fn sort_natural<S: AsRef<str>>(names: &mut [S]) {
    names.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}
