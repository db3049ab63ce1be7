//! Line groups: the unit of diff rendering.
//!
//! The grouper turns the flat chunk list of a [`DiffInfo`](crate::domain::DiffInfo)
//! into an ordered sequence of [`LineGroup`]s: runs of unchanged, added,
//! removed, or collapsed lines. Groups partition the file on both sides with
//! no gaps or overlaps; they are replaced, never mutated, when inputs change.

pub mod processor;

use crate::domain::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineType {
    Both,
    Add,
    Remove,
}

/// Intraline highlight within one line, in code points. `end == None` means
/// the highlight runs to the end of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub start: u32,
    pub end: Option<u32>,
}

/// One rendered line with its per-side line numbers. Added lines have no
/// left number, removed lines no right number.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffLine {
    pub line_type: DiffLineType,
    pub text: String,
    pub before_number: Option<u32>,
    pub after_number: Option<u32>,
    pub highlights: Vec<Highlight>,
}

impl DiffLine {
    pub fn both(text: impl Into<String>, before: u32, after: u32) -> Self {
        Self {
            line_type: DiffLineType::Both,
            text: text.into(),
            before_number: Some(before),
            after_number: Some(after),
            highlights: Vec::new(),
        }
    }

    pub fn add(text: impl Into<String>, after: u32) -> Self {
        Self {
            line_type: DiffLineType::Add,
            text: text.into(),
            before_number: None,
            after_number: Some(after),
            highlights: Vec::new(),
        }
    }

    pub fn remove(text: impl Into<String>, before: u32) -> Self {
        Self {
            line_type: DiffLineType::Remove,
            text: text.into(),
            before_number: Some(before),
            after_number: None,
            highlights: Vec::new(),
        }
    }

    pub fn number(&self, side: Side) -> Option<u32> {
        match side {
            Side::Left => self.before_number,
            Side::Right => self.after_number,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupType {
    /// Lines common to both sides, including server-elided (`skip`) regions.
    Both,
    /// A run of removed lines paired with a run of added lines.
    Delta,
    /// Collapsed common lines, carrying the hidden groups for expansion.
    ContextControl,
}

/// Inclusive 1-based line range on one side; `(0, 0)` when the group has no
/// lines on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn len(&self) -> u32 {
        if self.start == 0 {
            return 0;
        }
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideRanges {
    pub left: LineRange,
    pub right: LineRange,
}

impl SideRanges {
    pub fn side(&self, side: Side) -> LineRange {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// A run of lines of one kind, ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGroup {
    pub group_type: GroupType,
    pub lines: Vec<DiffLine>,
    /// Set when the group stands in for a server-elided region.
    pub skip: Option<u32>,
    /// For `ContextControl` groups: the groups hidden behind the control, in
    /// order. Replacing the control with these reveals the region.
    pub context_groups: Vec<LineGroup>,
    pub ignored_whitespace_only: bool,
    pub due_to_rebase: bool,
    pub key_location: bool,
    pub line_range: SideRanges,
}

impl LineGroup {
    pub fn new(group_type: GroupType, lines: Vec<DiffLine>) -> Self {
        let line_range = range_of_lines(&lines);
        Self {
            group_type,
            lines,
            skip: None,
            context_groups: Vec::new(),
            ignored_whitespace_only: false,
            due_to_rebase: false,
            key_location: false,
            line_range,
        }
    }

    /// A group standing in for `count` server-elided common lines starting
    /// at the given per-side offsets.
    pub fn new_skip(count: u32, offset_left: u32, offset_right: u32) -> Self {
        let line_range = if count == 0 {
            SideRanges::default()
        } else {
            SideRanges {
                left: LineRange {
                    start: offset_left,
                    end: offset_left + count - 1,
                },
                right: LineRange {
                    start: offset_right,
                    end: offset_right + count - 1,
                },
            }
        };
        Self {
            group_type: GroupType::Both,
            lines: Vec::new(),
            skip: Some(count),
            context_groups: Vec::new(),
            ignored_whitespace_only: false,
            due_to_rebase: false,
            key_location: false,
            line_range,
        }
    }

    /// A collapsed-region group hiding `context_groups`.
    pub fn new_context_control(context_groups: Vec<LineGroup>) -> Self {
        debug_assert!(!context_groups.is_empty());
        let first = context_groups.first().map(|g| g.line_range);
        let last = context_groups.last().map(|g| g.line_range);
        let line_range = match (first, last) {
            (Some(first), Some(last)) => SideRanges {
                left: LineRange {
                    start: first.left.start,
                    end: last.left.end,
                },
                right: LineRange {
                    start: first.right.start,
                    end: last.right.end,
                },
            },
            _ => SideRanges::default(),
        };
        Self {
            group_type: GroupType::ContextControl,
            lines: Vec::new(),
            skip: None,
            context_groups,
            ignored_whitespace_only: false,
            due_to_rebase: false,
            key_location: false,
            line_range,
        }
    }

    pub fn start_line(&self, side: Side) -> u32 {
        self.line_range.side(side).start
    }

    pub fn end_line(&self, side: Side) -> u32 {
        self.line_range.side(side).end
    }

    /// Whether this group, or any group hidden behind it, is skip-backed and
    /// therefore cannot be expanded from already-available data.
    pub fn has_skip_group(&self) -> bool {
        self.skip.is_some() || self.context_groups.iter().any(|g| g.skip.is_some())
    }

    pub fn has_delta_group(&self) -> bool {
        self.group_type == GroupType::Delta
            || self
                .context_groups
                .iter()
                .any(|g| g.group_type == GroupType::Delta)
    }

    /// Hidden line count for a context control (same on both sides).
    pub fn hidden_line_count(&self) -> u32 {
        self.line_range.left.len()
    }
}

fn range_of_lines(lines: &[DiffLine]) -> SideRanges {
    let mut ranges = SideRanges::default();
    for side in [Side::Left, Side::Right] {
        let mut numbers = lines.iter().filter_map(|l| l.number(side));
        if let Some(first) = numbers.next() {
            let last = numbers.last().unwrap_or(first);
            let range = LineRange {
                start: first,
                end: last,
            };
            match side {
                Side::Left => ranges.left = range,
                Side::Right => ranges.right = range,
            }
        }
    }
    ranges
}

/// Splits a run of common groups at `hidden_start` and `hidden_end` (line
/// offsets relative to the run's first line) and wraps the middle in a
/// `ContextControl` group. Offsets are clamped; an empty hidden range
/// returns the groups unchanged.
pub fn hide_in_context_control(
    groups: Vec<LineGroup>,
    hidden_start: i64,
    hidden_end: i64,
) -> Vec<LineGroup> {
    if groups.is_empty() {
        return groups;
    }
    let hidden_start = hidden_start.max(0) as u32;
    let hidden_end = hidden_end.max(hidden_start as i64) as u32;
    let num_hidden = hidden_end - hidden_start;
    if num_hidden == 0 {
        return groups;
    }

    // A skip group straddling either boundary lands in the hidden middle:
    // server-elided regions are always collapsed whole.
    let (before, rest) = split_common_groups(groups, hidden_start, false);
    let (hidden, after) = split_common_groups(rest, num_hidden, true);

    let mut result = before;
    if !hidden.is_empty() {
        result.push(LineGroup::new_context_control(hidden));
    }
    result.extend(after);
    result
}

/// Splits common groups at the given per-side line offset relative to the
/// first group's start. Skip groups are never split mid-group; one straddling
/// the boundary lands whole in the half `skip_into_first` selects.
fn split_common_groups(
    groups: Vec<LineGroup>,
    split: u32,
    skip_into_first: bool,
) -> (Vec<LineGroup>, Vec<LineGroup>) {
    if split == 0 || groups.is_empty() {
        return (Vec::new(), groups);
    }
    let left_split = groups[0].line_range.left.start + split;
    let right_split = groups[0].line_range.right.start + split;
    let mut before = Vec::new();
    let mut after = Vec::new();

    for group in groups {
        if group.line_range.left.end < left_split || group.line_range.right.end < right_split {
            before.push(group);
        } else if left_split <= group.line_range.left.start
            || right_split <= group.line_range.right.start
        {
            after.push(group);
        } else if group.skip.is_some() {
            if skip_into_first {
                before.push(group);
            } else {
                after.push(group);
            }
        } else {
            let (first, second) = split_group_in_two(group, left_split, right_split);
            if let Some(first) = first {
                before.push(first);
            }
            if let Some(second) = second {
                after.push(second);
            }
        }
    }
    (before, after)
}

fn split_group_in_two(
    group: LineGroup,
    left_split: u32,
    right_split: u32,
) -> (Option<LineGroup>, Option<LineGroup>) {
    let mut first_lines = Vec::new();
    let mut second_lines = Vec::new();
    for line in &group.lines {
        let in_first = line.before_number.is_some_and(|n| n < left_split)
            || line.after_number.is_some_and(|n| n < right_split);
        if in_first {
            first_lines.push(line.clone());
        } else {
            second_lines.push(line.clone());
        }
    }
    let make = |lines: Vec<DiffLine>| {
        if lines.is_empty() {
            return None;
        }
        let mut g = LineGroup::new(group.group_type, lines);
        g.ignored_whitespace_only = group.ignored_whitespace_only;
        g.due_to_rebase = group.due_to_rebase;
        g.key_location = group.key_location;
        Some(g)
    };
    (make(first_lines), make(second_lines))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both_group(start_left: u32, start_right: u32, count: u32) -> LineGroup {
        let lines = (0..count)
            .map(|i| {
                DiffLine::both(
                    format!("line {}", start_left + i),
                    start_left + i,
                    start_right + i,
                )
            })
            .collect();
        LineGroup::new(GroupType::Both, lines)
    }

    #[test]
    fn line_range_is_derived_from_lines() {
        let group = both_group(5, 7, 3);
        assert_eq!(group.start_line(Side::Left), 5);
        assert_eq!(group.end_line(Side::Left), 7);
        assert_eq!(group.start_line(Side::Right), 7);
        assert_eq!(group.end_line(Side::Right), 9);
    }

    #[test]
    fn hide_middle_of_single_group() {
        let groups = vec![both_group(1, 1, 10)];
        let result = hide_in_context_control(groups, 3, 7);
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].lines.len(), 3);
        assert_eq!(result[1].group_type, GroupType::ContextControl);
        assert_eq!(result[1].hidden_line_count(), 4);
        assert_eq!(result[1].start_line(Side::Left), 4);
        assert_eq!(result[1].end_line(Side::Left), 7);
        assert_eq!(result[2].lines.len(), 3);
        assert_eq!(result[2].start_line(Side::Left), 8);
    }

    #[test]
    fn hide_everything_leaves_single_control() {
        let groups = vec![both_group(1, 1, 6)];
        let result = hide_in_context_control(groups, 0, 6);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].group_type, GroupType::ContextControl);
        assert_eq!(result[0].context_groups.len(), 1);
        assert_eq!(result[0].hidden_line_count(), 6);
    }

    #[test]
    fn empty_hidden_range_is_identity() {
        let groups = vec![both_group(1, 1, 4)];
        let result = hide_in_context_control(groups.clone(), 2, 2);
        assert_eq!(result, groups);
    }

    #[test]
    fn clamps_negative_offsets() {
        let groups = vec![both_group(1, 1, 4)];
        let result = hide_in_context_control(groups, -5, 2);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].group_type, GroupType::ContextControl);
        assert_eq!(result[0].hidden_line_count(), 2);
    }

    #[test]
    fn skip_groups_are_not_split() {
        let groups = vec![both_group(1, 1, 2), LineGroup::new_skip(100, 3, 3)];
        // Split lands inside the skip region; the skip group must stay whole.
        let result = hide_in_context_control(groups, 1, 50);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].lines.len(), 1);
        let control = &result[1];
        assert_eq!(control.group_type, GroupType::ContextControl);
        assert!(control.has_skip_group());
        assert_eq!(control.context_groups.len(), 2);
    }

    #[test]
    fn spanning_group_is_split_in_two() {
        let groups = vec![both_group(1, 1, 10)];
        let (before, after) = split_common_groups(groups, 4, false);
        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 1);
        assert_eq!(before[0].end_line(Side::Left), 4);
        assert_eq!(after[0].start_line(Side::Left), 5);
    }
}
