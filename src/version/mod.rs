// src/version/mod.rs

//! Package version comparison
//!
//! The resolver only ever compares versions through [`VersionComparator`].
//! [`ApkVersion`] is the default implementation and follows the ordering of
//! apk-tools: dot separated numbers, an optional trailing letter, `_suffix`
//! markers (pre-release suffixes sort before the bare version, post-release
//! ones after it) and a final `-rN` package revision.
//!
//! ```ignore
//! use pmbuild::version::{ApkVersion, VersionComparator};
//! use std::cmp::Ordering;
//!
//! assert_eq!(ApkVersion.compare("1.2_rc1", "1.2_rc2"), Ordering::Less);
//! assert_eq!(ApkVersion.compare("1.2-r1", "1.2-r0"), Ordering::Greater);
//! ```

use std::cmp::Ordering;

/// Three-way comparison of two version strings
pub trait VersionComparator {
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

impl<F> VersionComparator for F
where
    F: Fn(&str, &str) -> Ordering,
{
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self(a, b)
    }
}

/// Comparator implementing apk version ordering
#[derive(Debug, Clone, Copy, Default)]
pub struct ApkVersion;

impl VersionComparator for ApkVersion {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        compare(a, b)
    }
}

/// Cut a dependency specifier at its first comparison operator
///
/// `"musl>=1.2"` becomes `"musl"`, `"so:libc.musl-x86_64.so.1"` is returned
/// unchanged.
pub fn strip_operators(dep: &str) -> &str {
    match dep.find(['>', '<', '=', '~']) {
        Some(pos) => &dep[..pos],
        None => dep,
    }
}

/// Token kinds, ordered the way apk ranks them when two versions diverge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Token {
    Invalid,
    DigitOrZero,
    Digit,
    Letter,
    Suffix,
    SuffixNo,
    RevisionNo,
    End,
}

const PRE_SUFFIXES: [&str; 4] = ["alpha", "beta", "pre", "rc"];
const POST_SUFFIXES: [&str; 5] = ["cvs", "svn", "git", "hg", "p"];

/// Determine the kind of the upcoming token, dropping one separator
fn next_token(previous: Token, rest: &str) -> (Token, &str) {
    let mut chars = rest.chars();
    let Some(first) = chars.next() else {
        return (Token::End, rest);
    };

    let (mut next, rest) = match first {
        c if matches!(previous, Token::Digit | Token::DigitOrZero) && c.is_ascii_lowercase() => {
            (Token::Letter, rest)
        }
        c if previous == Token::Letter && c.is_ascii_digit() => (Token::Digit, rest),
        c if previous == Token::Suffix && c.is_ascii_digit() => (Token::SuffixNo, rest),
        '.' => (Token::DigitOrZero, chars.as_str()),
        '_' => (Token::Suffix, chars.as_str()),
        '-' if rest.starts_with("-r") => (Token::RevisionNo, &rest[2..]),
        _ => (Token::Invalid, chars.as_str()),
    };

    let allowed_backstep = matches!(
        (next, previous),
        (Token::DigitOrZero, Token::Digit)
            | (Token::Suffix, Token::SuffixNo)
            | (Token::Digit, Token::Letter)
    );
    if next < previous && !allowed_backstep {
        next = Token::Invalid;
    }
    (next, rest)
}

/// Value of a `_suffix`, negative for pre-release markers
fn parse_suffix(rest: &str) -> Option<(&str, i64)> {
    for (i, suffix) in PRE_SUFFIXES.iter().enumerate() {
        if let Some(tail) = rest.strip_prefix(suffix) {
            return Some((tail, i as i64 - PRE_SUFFIXES.len() as i64));
        }
    }
    for (i, suffix) in POST_SUFFIXES.iter().enumerate() {
        if let Some(tail) = rest.strip_prefix(suffix) {
            return Some((tail, i as i64));
        }
    }
    None
}

/// Consume the token of kind `previous` and classify the one after it
fn get_token(previous: Token, rest: &str) -> (Token, i64, &str) {
    if rest.is_empty() {
        return (Token::End, 0, rest);
    }

    let mut rest = rest;
    let mut value = 0i64;
    let mut next = Token::Invalid;
    let mut invalid_suffix = false;

    if previous == Token::DigitOrZero && rest.starts_with('0') {
        // Leading zeros sort below any non-zero digit run
        let trimmed = rest.trim_start_matches('0');
        value = -((rest.len() - trimmed.len()) as i64);
        rest = trimmed;
        next = Token::Digit;
    } else if matches!(
        previous,
        Token::DigitOrZero | Token::Digit | Token::SuffixNo | Token::RevisionNo
    ) {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        value = rest[..end].bytes().fold(0i64, |acc, b| {
            acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
        });
        rest = &rest[end..];
    } else if previous == Token::Letter {
        let mut chars = rest.chars();
        value = chars.next().map(|c| c as i64).unwrap_or(0);
        rest = chars.as_str();
    } else if previous == Token::Suffix {
        match parse_suffix(rest) {
            Some((tail, suffix_value)) => {
                rest = tail;
                value = suffix_value;
            }
            None => invalid_suffix = true,
        }
    } else {
        value = -1;
    }

    if rest.is_empty() {
        next = Token::End;
    } else if next == Token::Invalid && !invalid_suffix {
        (next, rest) = next_token(previous, rest);
    }

    (next, value, rest)
}

/// Check whether a version string is well formed
pub fn validate(version: &str) -> bool {
    let mut current = Token::Digit;
    let mut rest = version;
    while current != Token::End {
        let (token, _, tail) = get_token(current, rest);
        if token == Token::Invalid {
            return false;
        }
        current = token;
        rest = tail;
    }
    true
}

/// Compare two version strings the way apk does
pub fn compare(a: &str, b: &str) -> Ordering {
    let (mut a_token, mut b_token) = (Token::Digit, Token::Digit);
    let (mut a_value, mut b_value) = (0i64, 0i64);
    let (mut a_rest, mut b_rest) = (a, b);

    while a_token == b_token
        && !matches!(a_token, Token::End | Token::Invalid)
        && a_value == b_value
    {
        (a_token, a_value, a_rest) = get_token(a_token, a_rest);
        (b_token, b_value, b_rest) = get_token(b_token, b_rest);
    }

    match a_value.cmp(&b_value) {
        Ordering::Equal => {}
        other => return other,
    }
    if a_token == b_token {
        return Ordering::Equal;
    }

    // Same prefix: the longer version wins unless it continues with a
    // pre-release suffix
    if a_token == Token::Suffix {
        let (token, value, _) = get_token(a_token, a_rest);
        if value < 0 {
            return Ordering::Less;
        }
        a_token = token;
    }
    if b_token == Token::Suffix {
        let (token, value, _) = get_token(b_token, b_rest);
        if value < 0 {
            return Ordering::Greater;
        }
        b_token = token;
    }

    b_token.cmp(&a_token)
}
