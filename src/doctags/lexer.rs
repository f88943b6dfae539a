//! Tokeniser for raw DocTags streams.
//!
//! A DocTags stream is flat text interleaved with `<name>` / `</name>`
//! markers. Anything that is not a well-formed tag (for instance a literal
//! `a < b` inside a paragraph) is kept as text, so tokenising never fails;
//! grammar errors are the parser's job.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)([A-Za-z_][A-Za-z0-9_]*)>").unwrap());

static RE_LOC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^loc_([0-9]+)$").unwrap());

/// One lexical unit of a tag stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// `<name>`
    Open { name: &'a str, offset: usize },
    /// `</name>`
    Close { name: &'a str, offset: usize },
    /// `<loc_N>`; the value is not range-checked here.
    Loc { value: u32, offset: usize },
    /// Text between tags, verbatim.
    Text { text: &'a str, offset: usize },
}

/// Split a tag stream into tokens, in stream order.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for caps in RE_TAG.captures_iter(input) {
        let Some(m) = caps.get(0) else { continue };
        if m.start() > last {
            tokens.push(Token::Text {
                text: &input[last..m.start()],
                offset: last,
            });
        }

        let closing = !caps[1].is_empty();
        let name = caps.get(2).map_or("", |g| g.as_str());
        let offset = m.start();

        let token = if closing {
            Token::Close { name, offset }
        } else if let Some(loc) = RE_LOC.captures(name) {
            // Digits only; saturate absurdly long values so the parser can
            // still report them as out of range.
            let value = loc[1].parse::<u32>().unwrap_or(u32::MAX);
            Token::Loc { value, offset }
        } else {
            Token::Open { name, offset }
        };
        tokens.push(token);
        last = m.end();
    }

    if last < input.len() {
        tokens.push(Token::Text {
            text: &input[last..],
            offset: last,
        });
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_tags_locs_and_text() {
        let tokens = tokenize("<text><loc_10>Hello</text>");
        assert_eq!(
            tokens,
            vec![
                Token::Open { name: "text", offset: 0 },
                Token::Loc { value: 10, offset: 6 },
                Token::Text { text: "Hello", offset: 14 },
                Token::Close { name: "text", offset: 19 },
            ]
        );
    }

    #[test]
    fn literal_angle_brackets_stay_text() {
        let tokens = tokenize("<text>a < b and c > d</text>");
        assert_eq!(tokens.len(), 3);
        assert!(matches!(tokens[1], Token::Text { text: "a < b and c > d", .. }));
    }

    #[test]
    fn code_language_marker_is_an_open_tag() {
        let tokens = tokenize("<code><_Python_>print(1)</code>");
        assert!(matches!(tokens[1], Token::Open { name: "_Python_", .. }));
    }

    #[test]
    fn oversized_loc_saturates() {
        let tokens = tokenize("<loc_99999999999999>");
        assert_eq!(tokens, vec![Token::Loc { value: u32::MAX, offset: 0 }]);
    }

    #[test]
    fn empty_input_has_no_tokens() {
        assert!(tokenize("").is_empty());
    }
}
