//! Selection and copy: reconstructing the selected text from a node range.
//!
//! A rendered diff interleaves both sides' lines, line numbers, and comment
//! threads, so the host's raw selection covers far more than the user means
//! to copy. This module takes the selection's two anchors, decides what kind
//! of content is selected, and rebuilds the copy text from the diff content
//! itself rather than from the painted nodes. All column arithmetic is in
//! code points, so trimming never lands inside a surrogate pair.

use crate::domain::{DiffInfo, Side};
use crate::render::doc::{Anchor, CellKind, NodeKind, RenderedDoc};

/// A raw selection: two anchors in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: Anchor,
    pub end: Anchor,
}

/// What a selection gesture is selecting, decided from the node under the
/// pointer when the gesture starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionClass {
    /// Line content on one side; copy reconstructs from the diff.
    Line(Side),
    /// Inside a comment thread; copy takes the thread's text.
    Comment,
    /// Inside an editable region; copy is left to the host's native
    /// handling.
    Editable,
}

/// Classifies the gesture target. Nodes outside any content cell or thread
/// default to right-side line selection.
pub fn selection_class(doc: &RenderedDoc, node: usize) -> SelectionClass {
    if doc.is_in_editable(node) {
        return SelectionClass::Editable;
    }
    if doc.is_in_comment_thread(node) {
        return SelectionClass::Comment;
    }
    let side = doc
        .cell_of(node)
        .and_then(|cell| match doc.kind(cell) {
            NodeKind::Cell(CellKind::Content(side)) | NodeKind::Cell(CellKind::LineNumber(side)) => {
                Some(*side)
            }
            _ => None,
        })
        .unwrap_or(Side::Right);
    SelectionClass::Line(side)
}

/// The text a copy should produce for the given selection. Returns an empty
/// string when the selection cannot be resolved to diff content.
pub fn selected_text(
    doc: &RenderedDoc,
    diff: &DiffInfo,
    range: SelectionRange,
    class: SelectionClass,
) -> String {
    let range = normalize(doc, range);
    match class {
        SelectionClass::Editable => String::new(),
        SelectionClass::Comment => comment_text(doc, range),
        SelectionClass::Line(side) => line_text(doc, diff, range, side),
    }
}

/// Orders the anchors by document position.
fn normalize(doc: &RenderedDoc, range: SelectionRange) -> SelectionRange {
    let ordering = doc
        .cmp_document_order(range.start.node, range.end.node)
        .then(range.start.offset.cmp(&range.end.offset));
    if ordering == std::cmp::Ordering::Greater {
        SelectionRange {
            start: range.end,
            end: range.start,
        }
    } else {
        range
    }
}

fn line_text(doc: &RenderedDoc, diff: &DiffInfo, range: SelectionRange, side: Side) -> String {
    if doc.is_in_editable(range.start.node) || doc.is_in_editable(range.end.node) {
        return String::new();
    }
    // A triple-click in side-by-side mode can land one anchor at offset 0 of
    // the empty filler cell on the other side; the selection then means the
    // whole line under the other anchor. Normalization can put the filler
    // anchor at either end (the filler cell may precede the content cell in
    // document order), so both endpoints are checked.
    let (content_start, filler_end) = if ends_at_other_empty_side(doc, range.start, side) {
        (range.end, true)
    } else {
        (range.start, ends_at_other_empty_side(doc, range.end, side))
    };

    let Some(start_row) = doc.row_of(content_start.node) else {
        return String::new();
    };
    let Some(start_line) = doc.row_line(start_row, side) else {
        return String::new();
    };
    let start_column = column_in_side(doc, content_start, side).unwrap_or(0);

    let (end_line, end_column) = if filler_end {
        (start_line + 1, 0)
    } else {
        match end_position(doc, diff, range.end, side) {
            Some(end) => end,
            None => return String::new(),
        }
    };
    if end_line < start_line {
        return String::new();
    }

    let mut lines: Vec<(u32, String)> = (start_line..=end_line)
        .filter_map(|n| diff.line_text(side, n).map(|t| (n, t.to_string())))
        .collect();
    // Trim the last line only if the end anchor's line exists; past-the-end
    // lines (the triple-click case on the final line) just fall away.
    if let Some((n, last)) = lines.last_mut() {
        if *n == end_line {
            *last = take_code_points(last, end_column);
        }
    }
    if let Some((_, first)) = lines.first_mut() {
        *first = skip_code_points(first, start_column);
    }
    lines
        .into_iter()
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolves the end anchor to a line and column on the requested side.
fn end_position(
    doc: &RenderedDoc,
    diff: &DiffInfo,
    end: Anchor,
    side: Side,
) -> Option<(u32, u32)> {
    let row = doc.row_of(end.node)?;
    let line = doc.row_line(row, side)?;
    let column = match column_in_side(doc, end, side) {
        Some(column) => column,
        // The end anchor sits outside this side's content (the other side's
        // cell, or a line-number cell): take the whole line.
        None => diff
            .line_text(side, line)
            .map_or(0, |text| text.chars().count() as u32),
    };
    Some((line, column))
}

/// The anchor's column if it points into this side's content cell.
fn column_in_side(doc: &RenderedDoc, anchor: Anchor, side: Side) -> Option<u32> {
    let cell = doc.cell_of(anchor.node)?;
    match doc.kind(cell) {
        NodeKind::Cell(CellKind::Content(s)) if *s == side => {}
        _ => return None,
    }
    // Content cells hold one text node; its offset is the column. An anchor
    // on the cell itself means column 0.
    match doc.kind(anchor.node) {
        NodeKind::Text(_) => Some(anchor.offset),
        _ => Some(0),
    }
}

fn ends_at_other_empty_side(doc: &RenderedDoc, end: Anchor, side: Side) -> bool {
    if end.offset != 0 {
        return false;
    }
    let Some(cell) = doc.cell_of(end.node) else {
        return false;
    };
    matches!(doc.kind(cell), NodeKind::Cell(CellKind::Content(s)) if *s == side.opposite())
        && doc.cell_is_empty(cell)
}

/// Copy text for a selection inside a comment thread: the thread's text
/// nodes between the anchors, paragraphs joined with newlines, first and
/// last trimmed by the anchor offsets.
fn comment_text(doc: &RenderedDoc, range: SelectionRange) -> String {
    let nodes: Vec<usize> = doc
        .descendant_text_nodes(doc.root())
        .into_iter()
        .filter(|&n| doc.is_in_comment_thread(n) && !doc.is_in_editable(n))
        .filter(|&n| {
            doc.cmp_document_order(n, range.start.node) != std::cmp::Ordering::Less
                && doc.cmp_document_order(n, range.end.node) != std::cmp::Ordering::Greater
        })
        .collect();
    let mut parts: Vec<String> = Vec::with_capacity(nodes.len());
    for &node in &nodes {
        let Some(text) = doc.text(node) else { continue };
        let mut text = text.to_string();
        if node == range.end.node {
            text = take_code_points(&text, range.end.offset);
        }
        if node == range.start.node {
            text = skip_code_points(&text, range.start.offset);
        }
        parts.push(text);
    }
    parts.join("\n")
}

/// First `n` code points of `s`.
fn take_code_points(s: &str, n: u32) -> String {
    s.chars().take(n as usize).collect()
}

/// `s` without its first `n` code points.
fn skip_code_points(s: &str, n: u32) -> String {
    s.chars().skip(n as usize).collect()
}
