//! Context-control behavior: which expand affordances a collapsed region
//! offers, and how an expansion request rewrites the group sequence.
//!
//! A control starts collapsed. Expanding it replaces the one control group
//! with revealed groups (and, for partial expansion, a smaller control over
//! what remains). Regions backed by server-elided (`skip`) data cannot be
//! expanded locally; they surface a content-load request instead.

use crate::group::{GroupType, LineGroup, SideRanges, hide_in_context_control};

/// How many lines a partial ("+10") expansion reveals.
pub const PARTIAL_CONTEXT_AMOUNT: u32 = 10;

/// Which edges of a collapsed region offer directional expansion.
///
/// `Above`: only expand upward, because the region touches the end of the
/// file (or spans the whole file). `Below`: only expand downward, because
/// the region touches the start of the file. `Both`: a mid-file region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowConfig {
    Above,
    Below,
    Both,
}

/// The expansion affordance the user invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextButtonType {
    /// Reveal the entire hidden region.
    All,
    /// Reveal a batch from the top of the hidden region.
    Above,
    /// Reveal a batch from the bottom of the hidden region.
    Below,
}

/// Outcome of an expansion request.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionOutcome {
    /// The control group at the given index was replaced by these groups.
    Replaced(Vec<LineGroup>),
    /// The region is skip-backed; the host must fetch this range and feed a
    /// new diff through `update_state`.
    ContentLoadNeeded { line_range: SideRanges },
    /// Nothing to do (not a control, or no hidden lines remain).
    Noop,
}

/// Number of hidden lines (same on both sides by construction).
pub fn num_lines(group: &LineGroup) -> u32 {
    let left = group.line_range.left;
    if left.start == 0 {
        return 0;
    }
    left.end - left.start + 1
}

fn show_above(group: &LineGroup, line_count_left: u32) -> bool {
    if group.group_type != GroupType::ContextControl {
        return false;
    }
    let left_start = group.line_range.left.start;
    let first_is_skip = group.context_groups.first().is_some_and(|g| g.skip.is_some());
    if left_start > 1 && !first_is_skip {
        return true;
    }
    let left_end = group.line_range.left.end;
    // A control spanning the whole file still allows expanding upward.
    line_count_left == left_end - left_start + 1
}

fn show_below(group: &LineGroup, line_count_left: u32) -> bool {
    if group.group_type != GroupType::ContextControl {
        return false;
    }
    let left_end = group.line_range.left.end;
    let last_is_skip = group.context_groups.last().is_some_and(|g| g.skip.is_some());
    left_end < line_count_left && !last_is_skip
}

/// Which directional affordances to offer for a control, given the file's
/// left-side line count. A control spanning the whole file expands upward.
pub fn show_config(group: &LineGroup, line_count_left: u32) -> ShowConfig {
    let above = show_above(group, line_count_left);
    let below = show_below(group, line_count_left);
    if above && !below {
        return ShowConfig::Above;
    }
    if !above && below {
        return ShowConfig::Below;
    }
    ShowConfig::Both
}

/// Whether the partial ("+10") affordances are worth offering.
pub fn show_partial_links(group: &LineGroup) -> bool {
    num_lines(group) > PARTIAL_CONTEXT_AMOUNT
}

/// The groups that replace a control when the given button is pressed.
/// Partial expansion re-hides the remainder behind a smaller control.
pub fn expansion_groups(group: &LineGroup, button: ContextButtonType) -> Vec<LineGroup> {
    let total = num_lines(group);
    match button {
        ContextButtonType::All => group.context_groups.clone(),
        ContextButtonType::Above => hide_in_context_control(
            group.context_groups.clone(),
            i64::from(PARTIAL_CONTEXT_AMOUNT.min(total)),
            i64::from(total),
        ),
        ContextButtonType::Below => hide_in_context_control(
            group.context_groups.clone(),
            0,
            i64::from(total.saturating_sub(PARTIAL_CONTEXT_AMOUNT)),
        ),
    }
}

/// Applies an expansion request to the group at `index`, replacing it in
/// place. Requests against non-control groups or empty regions are no-ops.
pub fn expand_in(
    groups: &mut Vec<LineGroup>,
    index: usize,
    button: ContextButtonType,
) -> ExpansionOutcome {
    let Some(group) = groups.get(index) else {
        return ExpansionOutcome::Noop;
    };
    if group.group_type != GroupType::ContextControl {
        // A bare skip group (revealed by a partial expansion over a run
        // containing one) has no local lines either; its affordance must
        // still resolve to a content load.
        if group.skip.is_some() {
            return ExpansionOutcome::ContentLoadNeeded {
                line_range: group.line_range,
            };
        }
        return ExpansionOutcome::Noop;
    }
    if num_lines(group) == 0 {
        return ExpansionOutcome::Noop;
    }
    if button == ContextButtonType::All && group.has_skip_group() {
        return ExpansionOutcome::ContentLoadNeeded {
            line_range: group.line_range,
        };
    }
    let replacement = expansion_groups(group, button);
    let outcome = ExpansionOutcome::Replaced(replacement.clone());
    groups.splice(index..=index, replacement);
    outcome
}
