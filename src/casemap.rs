//! Nick and channel keys under the `rfc1459` case mapping.
//!
//! Roster, topic and identified-user maps are keyed by the folded form, so
//! `Alice` and `ALICE` name one user and `#Chan[1]` and `#chan{1}` name one
//! channel.

/// `rfc1459` treats `[]\~` as the upper-case forms of `{}|^`.
#[inline]
const fn fold(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        _ => c.to_ascii_lowercase(),
    }
}

/// The storage key for a nickname or channel name.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(fold).collect()
}

pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.chars().map(fold).eq(b.chars().map(fold))
}
