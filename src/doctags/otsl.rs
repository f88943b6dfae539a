//! OTSL table grids.
//!
//! Tables arrive as a row-major stream of cell tokens separated by `<nl>`.
//! Merge tokens (`lcel`, `ucel`, `xcel`) carry no text of their own and extend
//! the span of the anchor cell to their left, above, or both.

use super::document::{TableCell, TableData};
use crate::error::DocTagsParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellKind {
    /// Filled cell.
    Fcel,
    /// Empty cell.
    Ecel,
    /// Column header.
    Ched,
    /// Row header.
    Rhed,
    /// Section row.
    Srow,
    /// Merged with the cell to the left.
    Lcel,
    /// Merged with the cell above.
    Ucel,
    /// Merged both ways.
    Xcel,
}

impl CellKind {
    pub(crate) fn from_tag(name: &str) -> Option<Self> {
        Some(match name {
            "fcel" => CellKind::Fcel,
            "ecel" => CellKind::Ecel,
            "ched" => CellKind::Ched,
            "rhed" => CellKind::Rhed,
            "srow" => CellKind::Srow,
            "lcel" => CellKind::Lcel,
            "ucel" => CellKind::Ucel,
            "xcel" => CellKind::Xcel,
            _ => return None,
        })
    }
}

#[derive(Debug)]
struct RawCell {
    kind: CellKind,
    text: String,
}

/// Collects cell tokens while the parser walks an `<otsl>` element.
#[derive(Debug, Default)]
pub(crate) struct OtslBuilder {
    rows: Vec<Vec<RawCell>>,
    current: Vec<RawCell>,
}

impl OtslBuilder {
    pub(crate) fn has_cells(&self) -> bool {
        !self.rows.is_empty() || !self.current.is_empty()
    }

    pub(crate) fn start_cell(&mut self, kind: CellKind) {
        self.current.push(RawCell {
            kind,
            text: String::new(),
        });
    }

    pub(crate) fn push_text(&mut self, text: &str, offset: usize) -> Result<(), DocTagsParseError> {
        match self.current.last_mut() {
            Some(cell) => {
                cell.text.push_str(text);
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(DocTagsParseError::MalformedTable {
                detail: "text outside any cell".into(),
                offset,
            }),
        }
    }

    pub(crate) fn end_row(&mut self) {
        self.rows.push(std::mem::take(&mut self.current));
    }

    /// Resolve merges into anchor cells and a full grid.
    ///
    /// Short rows are padded with empty cells up to the widest row.
    pub(crate) fn finish(mut self, offset: usize) -> Result<TableData, DocTagsParseError> {
        if !self.current.is_empty() {
            self.end_row();
        }
        let rows: Vec<Vec<RawCell>> = self.rows.into_iter().filter(|r| !r.is_empty()).collect();

        let num_rows = rows.len();
        let num_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        if num_rows == 0 {
            return Ok(TableData::default());
        }

        let malformed = |detail: &str| DocTagsParseError::MalformedTable {
            detail: detail.to_string(),
            offset,
        };

        let mut cells: Vec<TableCell> = Vec::new();
        let mut grid: Vec<Vec<usize>> = Vec::with_capacity(num_rows);

        for (r, row) in rows.iter().enumerate() {
            let mut line: Vec<usize> = Vec::with_capacity(num_cols);
            for c in 0..num_cols {
                let (kind, text) = row
                    .get(c)
                    .map_or((CellKind::Ecel, ""), |cell| (cell.kind, cell.text.as_str()));

                let idx = match kind {
                    CellKind::Lcel => {
                        if c == 0 {
                            return Err(malformed("left-merge in the first column"));
                        }
                        let idx = line[c - 1];
                        let anchor = &mut cells[idx];
                        anchor.col_span = anchor.col_span.max(c - anchor.col + 1);
                        idx
                    }
                    CellKind::Ucel => {
                        if r == 0 {
                            return Err(malformed("up-merge in the first row"));
                        }
                        let idx = grid[r - 1][c];
                        let anchor = &mut cells[idx];
                        anchor.row_span = anchor.row_span.max(r - anchor.row + 1);
                        idx
                    }
                    CellKind::Xcel => {
                        if r == 0 || c == 0 {
                            return Err(malformed("cross-merge on the table edge"));
                        }
                        let idx = grid[r - 1][c];
                        let anchor = &mut cells[idx];
                        anchor.row_span = anchor.row_span.max(r - anchor.row + 1);
                        anchor.col_span = anchor.col_span.max(c - anchor.col + 1);
                        idx
                    }
                    _ => {
                        cells.push(TableCell {
                            text: text.split_whitespace().collect::<Vec<_>>().join(" "),
                            row: r,
                            col: c,
                            row_span: 1,
                            col_span: 1,
                            column_header: kind == CellKind::Ched,
                            row_header: kind == CellKind::Rhed,
                            row_section: kind == CellKind::Srow,
                        });
                        cells.len() - 1
                    }
                };
                line.push(idx);
            }
            grid.push(line);
        }

        Ok(TableData {
            num_rows,
            num_cols,
            cells,
            grid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(rows: &[&[(CellKind, &str)]]) -> Result<TableData, DocTagsParseError> {
        let mut b = OtslBuilder::default();
        for row in rows {
            for (kind, text) in row.iter() {
                b.start_cell(*kind);
                b.push_text(text, 0).unwrap();
            }
            b.end_row();
        }
        b.finish(0)
    }

    use CellKind::*;

    #[test]
    fn plain_grid() {
        let t = build(&[&[(Ched, "A"), (Ched, "B")], &[(Fcel, "1"), (Fcel, "2")]]).unwrap();
        assert_eq!((t.num_rows, t.num_cols), (2, 2));
        assert_eq!(t.cell_at(0, 1).unwrap().text, "B");
        assert!(t.cell_at(0, 0).unwrap().column_header);
        assert!(!t.cell_at(1, 0).unwrap().column_header);
    }

    #[test]
    fn left_merge_extends_col_span() {
        let t = build(&[&[(Fcel, "wide"), (Lcel, ""), (Fcel, "x")]]).unwrap();
        let anchor = t.cell_at(0, 1).unwrap();
        assert_eq!(anchor.text, "wide");
        assert_eq!(anchor.col_span, 2);
        assert_eq!(t.cells.len(), 2);
    }

    #[test]
    fn up_and_cross_merge_extend_both_spans() {
        let t = build(&[
            &[(Fcel, "block"), (Lcel, "")],
            &[(Ucel, ""), (Xcel, "")],
        ])
        .unwrap();
        let anchor = t.cell_at(1, 1).unwrap();
        assert_eq!(anchor.text, "block");
        assert_eq!((anchor.row_span, anchor.col_span), (2, 2));
    }

    #[test]
    fn ragged_rows_are_padded() {
        let t = build(&[&[(Fcel, "a"), (Fcel, "b"), (Fcel, "c")], &[(Fcel, "d")]]).unwrap();
        assert_eq!(t.num_cols, 3);
        assert_eq!(t.cell_at(1, 2).unwrap().text, "");
    }

    #[test]
    fn merge_on_edge_is_malformed() {
        assert!(build(&[&[(Lcel, "")]]).is_err());
        assert!(build(&[&[(Ucel, "")]]).is_err());
        assert!(build(&[&[(Fcel, "a")], &[(Xcel, "")]]).is_err());
    }

    #[test]
    fn text_before_first_cell_is_malformed() {
        let mut b = OtslBuilder::default();
        assert!(b.push_text("  \n", 3).is_ok());
        assert!(matches!(
            b.push_text("stray", 5),
            Err(DocTagsParseError::MalformedTable { offset: 5, .. })
        ));
    }

    #[test]
    fn empty_table_has_no_rows() {
        let t = OtslBuilder::default().finish(0).unwrap();
        assert!(t.is_empty());
    }
}
