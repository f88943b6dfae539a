//! Structured document model built from DocTags.
//!
//! [`DocTagsDocument`] pairs each page's tag stream with the image it was
//! generated from; [`StructuredDocument`] is the parsed tree. Items are kept
//! in stream order, which is the model's reading order.

use super::markdown::{MarkdownExporter, MarkdownOptions};
use super::parser;
use crate::error::DocTagsParseError;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Side length of the square grid `<loc_N>` tokens are expressed in.
pub const LOC_GRID: u32 = 500;

/// Pixel size of the image a tag stream was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

impl PageSize {
    pub fn of(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// One page of model output waiting to be parsed.
#[derive(Debug, Clone)]
pub struct DocTagsPage {
    pub doctags: String,
    pub size: Option<PageSize>,
}

/// Tag streams paired with their source images, one entry per page.
#[derive(Debug, Clone, Default)]
pub struct DocTagsDocument {
    pub pages: Vec<DocTagsPage>,
}

impl DocTagsDocument {
    /// Pair tag streams with the images they were generated from.
    ///
    /// Only the image dimensions are retained; they scale `<loc_N>` tokens
    /// into pixel bounding boxes. A page without an image keeps grid units.
    pub fn from_doctags_and_image_pairs<'a, S, I>(pairs: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Option<&'a RgbImage>)>,
    {
        Self {
            pages: pairs
                .into_iter()
                .map(|(doctags, image)| DocTagsPage {
                    doctags: doctags.into(),
                    size: image.map(PageSize::of),
                })
                .collect(),
        }
    }
}

/// Axis-aligned box, top-left origin.
///
/// In pixels when the page size is known, otherwise in `LOC_GRID` units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub l: f64,
    pub t: f64,
    pub r: f64,
    pub b: f64,
}

impl BoundingBox {
    /// Build a box from four grid locations `[l, t, r, b]`.
    pub fn from_locs(locs: [u32; 4], size: Option<PageSize>) -> Self {
        let (sx, sy) = match size {
            Some(s) => (
                f64::from(s.width) / f64::from(LOC_GRID),
                f64::from(s.height) / f64::from(LOC_GRID),
            ),
            None => (1.0, 1.0),
        };
        Self {
            l: f64::from(locs[0]) * sx,
            t: f64::from(locs[1]) * sy,
            r: f64::from(locs[2]) * sx,
            b: f64::from(locs[3]) * sy,
        }
    }
}

/// Where an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// 1-indexed page number.
    pub page_no: usize,
    pub bbox: Option<BoundingBox>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextLabel {
    Title,
    Text,
    Caption,
    Footnote,
    PageHeader,
    PageFooter,
    Reference,
    CheckboxSelected,
    CheckboxUnselected,
}

impl TextLabel {
    /// Page headers and footers sit outside the reading flow.
    pub fn is_furniture(self) -> bool {
        matches!(self, TextLabel::PageHeader | TextLabel::PageFooter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PictureKind {
    Picture,
    Chart,
}

/// An entry of a list group: either an item or a nested list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListEntry {
    Item { text: String, prov: Provenance },
    Nested(ListGroup),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListGroup {
    pub ordered: bool,
    pub entries: Vec<ListEntry>,
}

/// One anchor cell of a table; merged positions point back to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCell {
    pub text: String,
    pub row: usize,
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
    pub column_header: bool,
    pub row_header: bool,
    pub row_section: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableData {
    pub num_rows: usize,
    pub num_cols: usize,
    pub cells: Vec<TableCell>,
    /// `grid[row][col]` is an index into `cells`.
    pub grid: Vec<Vec<usize>>,
}

impl TableData {
    /// Cell covering `(row, col)`, following merges to their anchor.
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.grid
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|&idx| self.cells.get(idx))
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0 || self.num_cols == 0
    }
}

/// A top-level element of a structured document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocItem {
    Text {
        label: TextLabel,
        text: String,
        prov: Provenance,
    },
    SectionHeader {
        level: u8,
        text: String,
        prov: Provenance,
    },
    Formula {
        text: String,
        prov: Provenance,
    },
    Code {
        language: Option<String>,
        text: String,
        prov: Provenance,
    },
    List(ListGroup),
    Table {
        data: TableData,
        caption: Option<String>,
        prov: Provenance,
    },
    Picture {
        kind: PictureKind,
        caption: Option<String>,
        prov: Provenance,
    },
}

/// Document tree parsed from one or more DocTags pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub name: String,
    /// Number of pages covered, including pages opened by `<page_break>`.
    pub num_pages: usize,
    pub items: Vec<DocItem>,
}

impl StructuredDocument {
    /// Parse every page of `doctags` into one document.
    ///
    /// Fails on the first grammar violation; no partial document is returned.
    pub fn load_from_doctags(
        doctags: &DocTagsDocument,
        name: impl Into<String>,
    ) -> Result<Self, DocTagsParseError> {
        let mut items = Vec::new();
        let mut page_no = 0;

        for page in &doctags.pages {
            page_no += 1;
            let parsed = parser::parse_page(&page.doctags, page_no, page.size)?;
            page_no = parsed.last_page;
            items.extend(parsed.items);
        }

        Ok(Self {
            name: name.into(),
            num_pages: page_no,
            items,
        })
    }

    /// Render with default [`MarkdownOptions`].
    pub fn export_to_markdown(&self) -> String {
        MarkdownExporter::default().export(self)
    }

    pub fn export_to_markdown_with(&self, options: &MarkdownOptions) -> String {
        MarkdownExporter::new(options.clone()).export(self)
    }
}
