pub mod diff;
pub mod error;
pub mod prefs;

pub use diff::{DiffContentChunk, DiffInfo, FileMeta, IntralineInfo, IntralineStatus, Side};
pub use error::DiffError;
pub use prefs::{
    DiffPreferences, DiffViewMode, IgnoreWhitespace, RenderPreferences, WHOLE_FILE, default_prefs,
};
