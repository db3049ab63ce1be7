//! Presentation-facing data: column layout and table rows.
//!
//! Nothing in here draws. The host's rendering substrate consumes these
//! plain-data descriptions and paints them however it likes; the structures
//! only fix what the core algorithms depend on (per-row line markers, the
//! split between line-number and content columns).

pub mod cache;
pub mod doc;

use crate::context::{self, ShowConfig};
use crate::domain::prefs::{DiffPreferences, DiffViewMode, RenderPreferences};
use crate::domain::Side;
use crate::group::{DiffLine, DiffLineType, GroupType, Highlight, LineGroup};

/// Which columns the diff table shows and how wide they are, derived purely
/// from preferences and view mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    pub show_left_numbers: bool,
    pub show_right_numbers: bool,
    pub show_sign_cols: bool,
    /// One content column in unified mode, two side-by-side (one when the
    /// left side is hidden).
    pub content_columns: u8,
    /// Width of a line-number column in characters.
    pub number_width_ch: u8,
    /// Content column width in characters; `None` when line wrapping makes
    /// the column responsive.
    pub content_width_ch: Option<u32>,
}

/// Computes the column layout. `max_line_number` is the larger of the two
/// sides' line counts and sizes the number columns.
pub fn column_layout(
    prefs: &DiffPreferences,
    render_prefs: &RenderPreferences,
    max_line_number: u32,
) -> ColumnLayout {
    let side_by_side = render_prefs.view_mode == DiffViewMode::SideBySide;
    let hide_left = render_prefs.hide_left_side && side_by_side;
    let digits = max_line_number.max(1).ilog10() as u8 + 1;
    ColumnLayout {
        show_left_numbers: !hide_left,
        show_right_numbers: true,
        show_sign_cols: side_by_side && render_prefs.show_sign_col,
        content_columns: if side_by_side && !hide_left { 2 } else { 1 },
        number_width_ch: digits.max(2),
        content_width_ch: if prefs.line_wrapping {
            None
        } else {
            Some(prefs.line_length)
        },
    }
}

/// One slot of a table row: a line's text plus its per-side numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSlot {
    pub before_number: Option<u32>,
    pub after_number: Option<u32>,
    pub text: String,
    pub line_type: DiffLineType,
    pub highlights: Vec<Highlight>,
}

impl RowSlot {
    fn from_line(line: &DiffLine) -> Self {
        Self {
            before_number: line.before_number,
            after_number: line.after_number,
            text: line.text.clone(),
            line_type: line.line_type,
            highlights: line.highlights.clone(),
        }
    }

    /// The slot for a side-by-side cell; `None` when the line does not exist
    /// on that side.
    fn for_side(line: &DiffLine, side: Side) -> Option<Self> {
        line.number(side)?;
        Some(Self::from_line(line))
    }

    pub fn number(&self, side: Side) -> Option<u32> {
        match side {
            Side::Left => self.before_number,
            Side::Right => self.after_number,
        }
    }
}

/// A row of the diff table, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRow {
    /// Paired cells; `None` marks the empty filler cell opposite an
    /// unbalanced add or remove.
    SideBySide {
        left: Option<RowSlot>,
        right: Option<RowSlot>,
    },
    Unified { slot: RowSlot },
    /// The expand-affordance row standing in for a collapsed region.
    /// `group_index` points back into the group sequence for expansion.
    ContextControl {
        group_index: usize,
        hidden_lines: u32,
        show: ShowConfig,
        /// Expansion requires fetching more diff data first.
        needs_load: bool,
    },
}

/// Produces the table rows for a group sequence. `line_count_left` is the
/// file's left-side line count, used to pick expand affordances for controls
/// touching the file boundaries.
pub fn build_rows(
    groups: &[LineGroup],
    view_mode: DiffViewMode,
    line_count_left: u32,
) -> Vec<TableRow> {
    let mut rows = Vec::new();
    for (group_index, group) in groups.iter().enumerate() {
        if group.group_type == GroupType::ContextControl || group.skip.is_some() {
            rows.push(TableRow::ContextControl {
                group_index,
                hidden_lines: context::num_lines(group).max(group.skip.unwrap_or(0)),
                show: context::show_config(group, line_count_left),
                needs_load: group.has_skip_group(),
            });
            continue;
        }
        match view_mode {
            DiffViewMode::Unified => {
                // Remove-then-add ordering within a delta group falls out of
                // the line order the grouper produced.
                for line in &group.lines {
                    rows.push(TableRow::Unified {
                        slot: RowSlot::from_line(line),
                    });
                }
            }
            DiffViewMode::SideBySide => {
                if group.group_type == GroupType::Both {
                    for line in &group.lines {
                        rows.push(TableRow::SideBySide {
                            left: RowSlot::for_side(line, Side::Left),
                            right: RowSlot::for_side(line, Side::Right),
                        });
                    }
                } else {
                    let removes: Vec<&DiffLine> = group
                        .lines
                        .iter()
                        .filter(|l| l.line_type == DiffLineType::Remove)
                        .collect();
                    let adds: Vec<&DiffLine> = group
                        .lines
                        .iter()
                        .filter(|l| l.line_type == DiffLineType::Add)
                        .collect();
                    for i in 0..removes.len().max(adds.len()) {
                        rows.push(TableRow::SideBySide {
                            left: removes.get(i).and_then(|l| RowSlot::for_side(l, Side::Left)),
                            right: adds.get(i).and_then(|l| RowSlot::for_side(l, Side::Right)),
                        });
                    }
                }
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::LineGroup;

    fn delta_group() -> LineGroup {
        LineGroup::new(
            GroupType::Delta,
            vec![
                DiffLine::remove("old 1", 5),
                DiffLine::remove("old 2", 6),
                DiffLine::add("new 1", 5),
            ],
        )
    }

    #[test]
    fn side_by_side_pairs_removes_with_adds() {
        let rows = build_rows(&[delta_group()], DiffViewMode::SideBySide, 10);
        assert_eq!(rows.len(), 2);
        match &rows[1] {
            TableRow::SideBySide { left, right } => {
                assert_eq!(left.as_ref().unwrap().number(Side::Left), Some(6));
                assert!(right.is_none());
            }
            other => panic!("unexpected row {other:?}"),
        }
    }

    #[test]
    fn unified_emits_removes_then_adds() {
        let rows = build_rows(&[delta_group()], DiffViewMode::Unified, 10);
        assert_eq!(rows.len(), 3);
        let types: Vec<DiffLineType> = rows
            .iter()
            .map(|r| match r {
                TableRow::Unified { slot } => slot.line_type,
                other => panic!("unexpected row {other:?}"),
            })
            .collect();
        assert_eq!(
            types,
            vec![DiffLineType::Remove, DiffLineType::Remove, DiffLineType::Add]
        );
    }

    #[test]
    fn context_control_becomes_one_row() {
        let hidden = LineGroup::new(
            GroupType::Both,
            (10..20).map(|i| DiffLine::both(format!("l{i}"), i, i)).collect(),
        );
        let control = LineGroup::new_context_control(vec![hidden]);
        let rows = build_rows(&[control], DiffViewMode::SideBySide, 100);
        assert_eq!(rows.len(), 1);
        match &rows[0] {
            TableRow::ContextControl {
                hidden_lines,
                show,
                needs_load,
                ..
            } => {
                assert_eq!(*hidden_lines, 10);
                assert_eq!(*show, ShowConfig::Both);
                assert!(!needs_load);
            }
            other => panic!("unexpected row {other:?}"),
        }
    }

    #[test]
    fn layout_follows_view_mode_and_prefs() {
        let prefs = DiffPreferences::default();
        let mut render_prefs = RenderPreferences::default();
        let layout = column_layout(&prefs, &render_prefs, 4321);
        assert_eq!(layout.content_columns, 2);
        assert_eq!(layout.number_width_ch, 4);
        assert_eq!(layout.content_width_ch, Some(100));

        render_prefs.view_mode = DiffViewMode::Unified;
        let layout = column_layout(&prefs, &render_prefs, 7);
        assert_eq!(layout.content_columns, 1);
        assert_eq!(layout.number_width_ch, 2);

        render_prefs.view_mode = DiffViewMode::SideBySide;
        render_prefs.hide_left_side = true;
        let layout = column_layout(&prefs, &render_prefs, 7);
        assert_eq!(layout.content_columns, 1);
        assert!(!layout.show_left_numbers);
    }
}
