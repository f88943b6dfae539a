//! Plain-text fallback for tag streams the parser rejects.
//!
//! Every `<…>` token is replaced by a space, whitespace runs collapse to a
//! single space, and the ends are trimmed. All structure is lost; the words
//! survive.
//!
//! Bracket edge cases follow directly from the `<[^>]+>` pattern:
//!
//! | input          | output     |
//! |----------------|------------|
//! | `x<a<b>>y`     | `x >y`     |
//! | `a <b`         | `a <b`     |
//! | `a <> b`       | `a <> b`   |
//! | `1 < 2 > 0`    | `1 0`      |
//!
//! Nested brackets are removed up to the first `>`; an opening bracket with
//! no closing one is ordinary text.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip all markup from a raw tag stream.
pub fn strip_tags(raw: &str) -> String {
    let text = RE_MARKUP.replace_all(raw, " ");
    let text = RE_WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}
