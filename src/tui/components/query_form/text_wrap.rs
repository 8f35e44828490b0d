//! Pure text layout helpers and dimensional constants for the QueryForm.
//!
//! The query is hard-wrapped by display width (no word wrapping) so that the
//! cursor's screen position can be computed exactly from a byte offset.

use std::ops::Range;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Border (2) + padding (2) consumed horizontally by the text box
pub(super) const HORIZONTAL_OVERHEAD: u16 = 4;
/// Top + bottom borders consumed vertically
pub(super) const VERTICAL_OVERHEAD: u16 = 2;
/// Maximum visible query lines before internal scrolling kicks in
pub(super) const MAX_VISIBLE_LINES: u16 = 5;
/// Offset from area edge to text (border + padding)
pub(super) const CONTENT_OFFSET_X: u16 = 2;
pub(super) const CONTENT_OFFSET_Y: u16 = 1;

/// Inner text width after subtracting border/padding. Returns 0 if too narrow.
pub(super) fn inner_width(area_width: u16) -> u16 {
    area_width.saturating_sub(HORIZONTAL_OVERHEAD)
}

/// Split `text` into visual rows as byte ranges. A `\n` ends a row (and is not
/// part of it); a row that would exceed `width` columns continues on the next.
/// Always returns at least one row.
pub(super) fn visual_rows(text: &str, width: u16) -> Vec<Range<usize>> {
    let width = usize::from(width.max(1));
    let mut rows = Vec::new();
    let mut start = 0;
    let mut col = 0;

    for (i, c) in text.char_indices() {
        if c == '\n' {
            rows.push(start..i);
            start = i + 1;
            col = 0;
            continue;
        }
        let w = c.width().unwrap_or(0);
        if col > 0 && col + w > width {
            rows.push(start..i);
            start = i;
            col = 0;
        }
        col += w;
    }
    rows.push(start..text.len());
    rows
}

/// Row index and column of byte offset `pos` within `rows`.
pub(super) fn cursor_row_col(text: &str, rows: &[Range<usize>], pos: usize) -> (usize, u16) {
    let row = rows
        .iter()
        .rposition(|r| r.start <= pos)
        .unwrap_or(0);
    let start = rows.get(row).map(|r| r.start).unwrap_or(0);
    let col = text[start..pos].width() as u16;
    (row, col)
}

/// Find the byte offset of the previous character boundary before `pos` in `text`.
pub(super) fn prev_char_boundary(text: &str, pos: usize) -> usize {
    text[..pos]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Find the byte offset of the next character boundary after `pos` in `text`.
pub(super) fn next_char_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .char_indices()
        .nth(1)
        .map(|(i, _)| pos + i)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_one_row() {
        assert_eq!(visual_rows("", 10), vec![0..0]);
    }

    #[test]
    fn newline_splits_rows() {
        assert_eq!(visual_rows("ab\ncd", 10), vec![0..2, 3..5]);
        assert_eq!(visual_rows("ab\n", 10), vec![0..2, 3..3]);
    }

    #[test]
    fn long_row_wraps_at_width() {
        assert_eq!(visual_rows("abcdefg", 3), vec![0..3, 3..6, 6..7]);
    }

    #[test]
    fn wide_chars_count_double() {
        // Each of these occupies two columns
        let text = "日本語";
        assert_eq!(visual_rows(text, 4), vec![0..6, 6..9]);
    }

    #[test]
    fn cursor_at_wrap_point_moves_to_next_row() {
        let text = "abcdef";
        let rows = visual_rows(text, 3);
        assert_eq!(cursor_row_col(text, &rows, 3), (1, 0));
        assert_eq!(cursor_row_col(text, &rows, 2), (0, 2));
        assert_eq!(cursor_row_col(text, &rows, 6), (1, 3));
    }

    #[test]
    fn cursor_after_trailing_newline() {
        let text = "ab\n";
        let rows = visual_rows(text, 10);
        assert_eq!(cursor_row_col(text, &rows, 3), (1, 0));
        assert_eq!(cursor_row_col(text, &rows, 2), (0, 2));
    }

    #[test]
    fn char_boundaries_respect_utf8() {
        let text = "aé";
        assert_eq!(next_char_boundary(text, 1), 3);
        assert_eq!(prev_char_boundary(text, 3), 1);
        assert_eq!(prev_char_boundary(text, 0), 0);
    }
}
