//! Markdown export of a [`StructuredDocument`].
//!
//! Each top-level item renders to one block; blocks are joined by a blank
//! line. Tables become padded GitHub-flavoured pipe tables.

use super::document::{
    DocItem, ListEntry, ListGroup, StructuredDocument, TableData, TextLabel,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownOptions {
    /// Emit page headers and footers.
    pub include_furniture: bool,
    /// Escape `_` in prose so it is not read as emphasis.
    pub escape_underscores: bool,
    /// Line emitted for every picture or chart.
    pub image_placeholder: String,
    /// Spaces per nesting level of a list.
    pub indent: usize,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            include_furniture: false,
            escape_underscores: true,
            image_placeholder: "<!-- image -->".to_string(),
            indent: 4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkdownExporter {
    options: MarkdownOptions,
}

impl MarkdownExporter {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    pub fn export(&self, doc: &StructuredDocument) -> String {
        doc.items
            .iter()
            .filter_map(|item| self.render_item(item))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn prose(&self, text: &str) -> String {
        if self.options.escape_underscores {
            text.replace('_', "\\_")
        } else {
            text.to_string()
        }
    }

    fn render_item(&self, item: &DocItem) -> Option<String> {
        match item {
            DocItem::Text { label, text, .. } => {
                if text.is_empty() || (label.is_furniture() && !self.options.include_furniture) {
                    return None;
                }
                let text = self.prose(text);
                Some(match label {
                    TextLabel::Title => format!("# {text}"),
                    TextLabel::CheckboxSelected => format!("- [x] {text}"),
                    TextLabel::CheckboxUnselected => format!("- [ ] {text}"),
                    _ => text,
                })
            }
            DocItem::SectionHeader { level, text, .. } => {
                if text.is_empty() {
                    return None;
                }
                let hashes = "#".repeat((usize::from(*level) + 1).min(6));
                Some(format!("{hashes} {}", self.prose(text)))
            }
            DocItem::Formula { text, .. } => Some(if text.is_empty() {
                "<!-- formula-not-decoded -->".to_string()
            } else {
                format!("$${text}$$")
            }),
            DocItem::Code { language, text, .. } => Some(format!(
                "```{}\n{text}\n```",
                language.as_deref().unwrap_or_default()
            )),
            DocItem::List(group) => {
                let mut lines = Vec::new();
                self.render_list(group, 0, &mut lines);
                if lines.is_empty() {
                    None
                } else {
                    Some(lines.join("\n"))
                }
            }
            DocItem::Table { data, caption, .. } => {
                let mut blocks = Vec::new();
                if let Some(c) = caption.as_deref().filter(|c| !c.is_empty()) {
                    blocks.push(self.prose(c));
                }
                if !data.is_empty() {
                    blocks.push(self.render_table(data));
                }
                (!blocks.is_empty()).then(|| blocks.join("\n\n"))
            }
            DocItem::Picture { caption, .. } => {
                let mut blocks = Vec::new();
                if let Some(c) = caption.as_deref().filter(|c| !c.is_empty()) {
                    blocks.push(self.prose(c));
                }
                blocks.push(self.options.image_placeholder.clone());
                Some(blocks.join("\n\n"))
            }
        }
    }

    fn render_list(&self, group: &ListGroup, depth: usize, lines: &mut Vec<String>) {
        let pad = " ".repeat(self.options.indent * depth);
        let mut n = 0;
        for entry in &group.entries {
            match entry {
                ListEntry::Item { text, .. } => {
                    n += 1;
                    let marker = if group.ordered {
                        format!("{n}.")
                    } else {
                        "-".to_string()
                    };
                    lines.push(format!("{pad}{marker} {}", self.prose(text)));
                }
                ListEntry::Nested(inner) => self.render_list(inner, depth + 1, lines),
            }
        }
    }

    fn render_table(&self, data: &TableData) -> String {
        let rows: Vec<Vec<String>> = (0..data.num_rows)
            .map(|r| {
                (0..data.num_cols)
                    .map(|c| {
                        data.cell_at(r, c)
                            .map(|cell| self.prose(&cell.text).replace('|', "\\|"))
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = (0..data.num_cols)
            .map(|c| {
                rows.iter()
                    .map(|row| row[c].chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();

        let format_row = |row: &[String]| {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(text, w)| format!(" {text:<w$} ", w = *w))
                .collect();
            format!("|{}|", cells.join("|"))
        };

        let mut lines = Vec::with_capacity(rows.len() + 1);
        for (i, row) in rows.iter().enumerate() {
            lines.push(format_row(row));
            if i == 0 {
                let sep: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
                lines.push(format!("|{}|", sep.join("|")));
            }
        }
        lines.join("\n")
    }
}
