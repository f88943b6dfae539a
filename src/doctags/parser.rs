//! Recursive-descent parser from a DocTags token stream to document items.
//!
//! The grammar is strict: one `<doctag>` root, known tags only, every element
//! closed by its own name. Inline styling tags (`<bold>` and friends) are
//! flattened into the surrounding text. Inside `<picture>` and `<chart>`
//! classification markers are skipped, since the model emits an open-ended
//! set of them.

use super::document::{
    BoundingBox, DocItem, ListEntry, ListGroup, PageSize, PictureKind, Provenance, TextLabel,
    LOC_GRID,
};
use super::lexer::{tokenize, Token};
use super::otsl::{CellKind, OtslBuilder};
use crate::error::DocTagsParseError;

/// Items parsed from one tag stream.
#[derive(Debug)]
pub(crate) struct ParsedPage {
    pub items: Vec<DocItem>,
    /// Page number in effect at the end of the stream; advanced by `<page_break>`.
    pub last_page: usize,
}

/// What a tag name means to the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Root,
    Text(TextLabel),
    SectionHeader(u8),
    Formula,
    Code,
    List { ordered: bool },
    ListItem,
    Picture(PictureKind),
    Table,
    Cell(CellKind),
    RowEnd,
    PageBreak,
    EndOfUtterance,
    Inline,
    Language,
}

fn classify(name: &str) -> Option<TagKind> {
    let kind = match name {
        "doctag" => TagKind::Root,
        "title" => TagKind::Text(TextLabel::Title),
        "text" | "paragraph" => TagKind::Text(TextLabel::Text),
        "caption" => TagKind::Text(TextLabel::Caption),
        "footnote" => TagKind::Text(TextLabel::Footnote),
        "page_header" => TagKind::Text(TextLabel::PageHeader),
        "page_footer" => TagKind::Text(TextLabel::PageFooter),
        "reference" => TagKind::Text(TextLabel::Reference),
        "checkbox_selected" => TagKind::Text(TextLabel::CheckboxSelected),
        "checkbox_unselected" => TagKind::Text(TextLabel::CheckboxUnselected),
        "section_header" => TagKind::SectionHeader(1),
        "formula" => TagKind::Formula,
        "code" => TagKind::Code,
        "unordered_list" => TagKind::List { ordered: false },
        "ordered_list" => TagKind::List { ordered: true },
        "list_item" => TagKind::ListItem,
        "picture" => TagKind::Picture(PictureKind::Picture),
        "chart" => TagKind::Picture(PictureKind::Chart),
        "otsl" => TagKind::Table,
        "nl" => TagKind::RowEnd,
        "page_break" => TagKind::PageBreak,
        "end_of_utterance" => TagKind::EndOfUtterance,
        "bold" | "italic" | "underline" | "strikethrough" | "subscript" | "superscript" => {
            TagKind::Inline
        }
        other => {
            if let Some(level) = other.strip_prefix("section_header_level_") {
                return match level.parse::<u8>() {
                    Ok(l @ 1..=6) => Some(TagKind::SectionHeader(l)),
                    _ => None,
                };
            }
            if let Some(kind) = CellKind::from_tag(other) {
                return Some(TagKind::Cell(kind));
            }
            if other.len() > 2 && other.starts_with('_') && other.ends_with('_') {
                return Some(TagKind::Language);
            }
            return None;
        }
    };
    Some(kind)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unknown(tag: &str, offset: usize) -> DocTagsParseError {
    DocTagsParseError::UnknownTag {
        tag: tag.to_string(),
        offset,
    }
}

fn misplaced(tag: &str, context: &str, offset: usize) -> DocTagsParseError {
    DocTagsParseError::MisplacedTag {
        tag: tag.to_string(),
        context: context.to_string(),
        offset,
    }
}

fn unclosed(tag: &str, offset: usize) -> DocTagsParseError {
    DocTagsParseError::UnclosedElement {
        tag: tag.to_string(),
        offset,
    }
}

fn mismatched(expected: &str, found: &str, offset: usize) -> DocTagsParseError {
    DocTagsParseError::MismatchedClosingTag {
        expected: expected.to_string(),
        found: found.to_string(),
        offset,
    }
}

/// Raw content of a text-bearing element.
struct ElementBody {
    text: String,
    locs: Vec<u32>,
    language: Option<String>,
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    page_no: usize,
    size: Option<PageSize>,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Option<Token<'a>> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn check_loc(value: u32, offset: usize) -> Result<(), DocTagsParseError> {
        if value > LOC_GRID {
            return Err(DocTagsParseError::InvalidLocation { value, offset });
        }
        Ok(())
    }

    fn provenance(&self, locs: &[u32]) -> Provenance {
        let bbox = match locs {
            [l, t, r, b, ..] => Some(BoundingBox::from_locs([*l, *t, *r, *b], self.size)),
            _ => None,
        };
        Provenance {
            page_no: self.page_no,
            bbox,
        }
    }

    fn parse_root(&mut self) -> Result<Vec<DocItem>, DocTagsParseError> {
        let root_offset = loop {
            match self.next() {
                Some(Token::Text { text, .. }) if text.trim().is_empty() => continue,
                Some(Token::Open { name: "doctag", offset }) => break offset,
                _ => return Err(DocTagsParseError::MissingRoot),
            }
        };

        let items = self.parse_body(root_offset)?;

        // Only whitespace and the end-of-generation marker may follow the root.
        while let Some(tok) = self.next() {
            match tok {
                Token::Text { text, offset } => {
                    if !text.trim().is_empty() {
                        return Err(DocTagsParseError::StrayText { offset });
                    }
                }
                Token::Open { name, offset } => match classify(name) {
                    Some(TagKind::EndOfUtterance) => {}
                    Some(_) => return Err(misplaced(name, "end of stream", offset)),
                    None => return Err(unknown(name, offset)),
                },
                Token::Close { name, offset } => {
                    return Err(DocTagsParseError::UnexpectedClosingTag {
                        tag: name.to_string(),
                        offset,
                    })
                }
                Token::Loc { offset, .. } => return Err(misplaced("loc", "end of stream", offset)),
            }
        }

        Ok(items)
    }

    fn parse_body(&mut self, root_offset: usize) -> Result<Vec<DocItem>, DocTagsParseError> {
        let mut items = Vec::new();

        loop {
            let Some(tok) = self.next() else {
                return Err(unclosed("doctag", root_offset));
            };
            match tok {
                Token::Text { text, offset } => {
                    if !text.trim().is_empty() {
                        return Err(DocTagsParseError::StrayText { offset });
                    }
                }
                Token::Loc { offset, .. } => return Err(misplaced("loc", "doctag", offset)),
                Token::Close { name: "doctag", .. } => return Ok(items),
                Token::Close { name, offset } => return Err(mismatched("doctag", name, offset)),
                Token::Open { name, offset } => {
                    let Some(kind) = classify(name) else {
                        return Err(unknown(name, offset));
                    };
                    match kind {
                        TagKind::Text(label) => {
                            let body = self.parse_element(name, offset, false)?;
                            items.push(DocItem::Text {
                                label,
                                text: collapse_whitespace(&body.text),
                                prov: self.provenance(&body.locs),
                            });
                        }
                        TagKind::SectionHeader(level) => {
                            let body = self.parse_element(name, offset, false)?;
                            items.push(DocItem::SectionHeader {
                                level,
                                text: collapse_whitespace(&body.text),
                                prov: self.provenance(&body.locs),
                            });
                        }
                        TagKind::Formula => {
                            let body = self.parse_element(name, offset, false)?;
                            items.push(DocItem::Formula {
                                text: collapse_whitespace(&body.text),
                                prov: self.provenance(&body.locs),
                            });
                        }
                        TagKind::Code => {
                            let body = self.parse_element(name, offset, true)?;
                            items.push(DocItem::Code {
                                language: body.language,
                                text: body.text.trim().to_string(),
                                prov: self.provenance(&body.locs),
                            });
                        }
                        TagKind::List { ordered } => {
                            let group = self.parse_list(name, ordered, offset)?;
                            items.push(DocItem::List(group));
                        }
                        TagKind::Picture(kind) => items.push(self.parse_picture(name, kind, offset)?),
                        TagKind::Table => items.push(self.parse_table(offset)?),
                        TagKind::PageBreak => self.page_no += 1,
                        _ => return Err(misplaced(name, "doctag", offset)),
                    }
                }
            }
        }
    }

    /// Body of a leaf element up to its own closing tag.
    fn parse_element(
        &mut self,
        name: &str,
        open_offset: usize,
        allow_language: bool,
    ) -> Result<ElementBody, DocTagsParseError> {
        let mut body = ElementBody {
            text: String::new(),
            locs: Vec::new(),
            language: None,
        };

        loop {
            let Some(tok) = self.next() else {
                return Err(unclosed(name, open_offset));
            };
            match tok {
                Token::Loc { value, offset } => {
                    Self::check_loc(value, offset)?;
                    body.locs.push(value);
                }
                Token::Text { text, .. } => body.text.push_str(text),
                Token::Open { name: inner, offset } => match classify(inner) {
                    Some(TagKind::Inline) => {}
                    Some(TagKind::Language) if allow_language && body.language.is_none() => {
                        body.language = Some(inner.trim_matches('_').to_string());
                    }
                    Some(_) => return Err(misplaced(inner, name, offset)),
                    None => return Err(unknown(inner, offset)),
                },
                Token::Close { name: inner, offset } => {
                    if inner == name {
                        return Ok(body);
                    }
                    if classify(inner) == Some(TagKind::Inline) {
                        continue;
                    }
                    return Err(mismatched(name, inner, offset));
                }
            }
        }
    }

    fn parse_list(
        &mut self,
        name: &str,
        ordered: bool,
        open_offset: usize,
    ) -> Result<ListGroup, DocTagsParseError> {
        let mut entries = Vec::new();

        loop {
            let Some(tok) = self.next() else {
                return Err(unclosed(name, open_offset));
            };
            match tok {
                Token::Text { text, offset } => {
                    if !text.trim().is_empty() {
                        return Err(DocTagsParseError::StrayText { offset });
                    }
                }
                Token::Loc { value, offset } => Self::check_loc(value, offset)?,
                Token::Close { name: inner, offset } => {
                    if inner == name {
                        return Ok(ListGroup { ordered, entries });
                    }
                    return Err(mismatched(name, inner, offset));
                }
                Token::Open { name: inner, offset } => match classify(inner) {
                    Some(TagKind::ListItem) => {
                        let body = self.parse_element(inner, offset, false)?;
                        entries.push(ListEntry::Item {
                            text: collapse_whitespace(&body.text),
                            prov: self.provenance(&body.locs),
                        });
                    }
                    Some(TagKind::List { ordered: nested }) => {
                        entries.push(ListEntry::Nested(self.parse_list(inner, nested, offset)?));
                    }
                    Some(_) => return Err(misplaced(inner, name, offset)),
                    None => return Err(unknown(inner, offset)),
                },
            }
        }
    }

    fn parse_picture(
        &mut self,
        name: &str,
        kind: PictureKind,
        open_offset: usize,
    ) -> Result<DocItem, DocTagsParseError> {
        let mut locs = Vec::new();
        let mut caption = None;

        loop {
            let Some(tok) = self.next() else {
                return Err(unclosed(name, open_offset));
            };
            match tok {
                Token::Loc { value, offset } => {
                    Self::check_loc(value, offset)?;
                    locs.push(value);
                }
                Token::Text { .. } => {}
                Token::Open { name: inner, offset } => match classify(inner) {
                    Some(TagKind::Text(TextLabel::Caption)) => {
                        let body = self.parse_element(inner, offset, false)?;
                        caption = Some(collapse_whitespace(&body.text));
                    }
                    // Classification markers and chart data (`<otsl>` and
                    // its cells) are skipped unvalidated.
                    _ => {}
                },
                Token::Close { name: inner, .. } => {
                    if inner == name {
                        return Ok(DocItem::Picture {
                            kind,
                            caption,
                            prov: self.provenance(&locs),
                        });
                    }
                }
            }
        }
    }

    fn parse_table(&mut self, open_offset: usize) -> Result<DocItem, DocTagsParseError> {
        let mut locs = Vec::new();
        let mut caption = None;
        let mut builder = OtslBuilder::default();

        loop {
            let Some(tok) = self.next() else {
                return Err(unclosed("otsl", open_offset));
            };
            match tok {
                Token::Loc { value, offset } => {
                    Self::check_loc(value, offset)?;
                    if !builder.has_cells() {
                        locs.push(value);
                    }
                }
                Token::Text { text, offset } => builder.push_text(text, offset)?,
                Token::Open { name, offset } => match classify(name) {
                    Some(TagKind::Cell(kind)) => builder.start_cell(kind),
                    Some(TagKind::RowEnd) => builder.end_row(),
                    Some(TagKind::Inline) => {}
                    Some(TagKind::Text(TextLabel::Caption)) => {
                        let body = self.parse_element(name, offset, false)?;
                        caption = Some(collapse_whitespace(&body.text));
                    }
                    Some(_) => return Err(misplaced(name, "otsl", offset)),
                    None => return Err(unknown(name, offset)),
                },
                Token::Close { name: "otsl", .. } => break,
                Token::Close { name, offset } => {
                    if classify(name) == Some(TagKind::Inline) {
                        continue;
                    }
                    return Err(mismatched("otsl", name, offset));
                }
            }
        }

        let data = builder.finish(open_offset)?;
        Ok(DocItem::Table {
            data,
            caption,
            prov: self.provenance(&locs),
        })
    }
}

/// Parse one page's tag stream.
///
/// `page_no` is the 1-indexed page the stream starts on; `size` scales
/// location tokens into pixels.
pub(crate) fn parse_page(
    doctags: &str,
    page_no: usize,
    size: Option<PageSize>,
) -> Result<ParsedPage, DocTagsParseError> {
    let mut parser = Parser {
        tokens: tokenize(doctags),
        pos: 0,
        page_no,
        size,
    };
    let items = parser.parse_root()?;
    Ok(ParsedPage {
        items,
        last_page: parser.page_no,
    })
}
