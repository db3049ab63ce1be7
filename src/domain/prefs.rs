//! User and host preferences that drive the diff rendering pipeline.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Sentinel context value meaning "show the whole file".
pub const WHOLE_FILE: i32 = -1;

/// Whitespace handling requested from the diff producer. The grouper treats
/// `common` chunks as unchanged whichever mode produced them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IgnoreWhitespace {
    #[default]
    IgnoreNone,
    IgnoreTrailing,
    IgnoreLeadingAndTrailing,
    IgnoreAll,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffViewMode {
    #[default]
    SideBySide,
    Unified,
}

/// Per-user diff preferences, as supplied by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffPreferences {
    /// Unchanged lines shown around each change; `WHOLE_FILE` (−1) disables
    /// collapsing entirely.
    pub context: i32,
    pub ignore_whitespace: IgnoreWhitespace,
    pub tab_size: u32,
    pub line_length: u32,
    pub font_size: u32,
    pub syntax_highlighting: bool,
    pub line_wrapping: bool,
}

impl DiffPreferences {
    pub fn is_whole_file(&self) -> bool {
        self.context == WHOLE_FILE
    }

    /// Context clamped to a non-negative line count.
    pub fn context_lines(&self) -> u32 {
        self.context.max(0) as u32
    }
}

impl Default for DiffPreferences {
    fn default() -> Self {
        Self {
            context: 3,
            ignore_whitespace: IgnoreWhitespace::IgnoreNone,
            tab_size: 8,
            line_length: 100,
            font_size: 12,
            syntax_highlighting: true,
            line_wrapping: false,
        }
    }
}

static DEFAULT_PREFS: Lazy<DiffPreferences> = Lazy::new(DiffPreferences::default);

/// Shared default preferences, used when the host has not supplied any yet.
pub fn default_prefs() -> &'static DiffPreferences {
    &DEFAULT_PREFS
}

/// Host-controlled rendering options, distinct from per-user preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderPreferences {
    pub view_mode: DiffViewMode,
    pub can_comment: bool,
    pub show_sign_col: bool,
    pub hide_left_side: bool,
    pub disable_context_control_buttons: bool,
    pub show_newline_warning_left: bool,
    pub show_newline_warning_right: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_file_sentinel() {
        let mut prefs = DiffPreferences::default();
        assert!(!prefs.is_whole_file());
        prefs.context = WHOLE_FILE;
        assert!(prefs.is_whole_file());
        assert_eq!(prefs.context_lines(), 0);
    }

    #[test]
    fn serializes_screaming_snake_case() {
        let json = serde_json::to_string(&IgnoreWhitespace::IgnoreAll).unwrap();
        assert_eq!(json, "\"IGNORE_ALL\"");
        let mode: DiffViewMode = serde_json::from_str("\"SIDE_BY_SIDE\"").unwrap();
        assert_eq!(mode, DiffViewMode::SideBySide);
    }
}
