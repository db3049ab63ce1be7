//! Wire-level diff data model.
//!
//! These types mirror the structured diff payload produced by the review
//! backend for a single file: an ordered list of content chunks plus file
//! metadata. A `DiffInfo` is immutable once received; a reload replaces it
//! wholesale.

use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

/// One side of a diff: base/parent revision on the left, patch-set revision
/// on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Intraline edit marker: `(skip, mark)` counts in code points over the
/// chunk's concatenated text, one character per line break.
pub type IntralineInfo = (u32, u32);

/// Whether the diff producer managed to compute intraline edit markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntralineStatus {
    Ok,
    Timeout,
    Failure,
}

/// One hunk of the diff.
///
/// Exactly one of `{a and/or b}`, `{ab}`, `{skip}` meaningfully describes a
/// chunk's content. A chunk with both `a` and `b` is a replace; `common`
/// marks a chunk whose only differences are ignorable whitespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffContentChunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ab: Option<Vec<String>>,
    /// Count of common lines elided by the server for very large unchanged
    /// regions. Expanding these requires fetching more diff data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_a: Option<Vec<IntralineInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_b: Option<Vec<IntralineInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_to_rebase: Option<bool>,
}

impl DiffContentChunk {
    /// Lines this chunk contributes to the left side.
    pub fn lines_left(&self) -> &[String] {
        self.ab
            .as_deref()
            .or(self.a.as_deref())
            .unwrap_or_default()
    }

    /// Lines this chunk contributes to the right side.
    pub fn lines_right(&self) -> &[String] {
        self.ab
            .as_deref()
            .or(self.b.as_deref())
            .unwrap_or_default()
    }
}

/// Metadata for one side of the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    #[serde(default)]
    pub content_type: String,
    /// Total number of lines in the file on this side.
    #[serde(default)]
    pub lines: u32,
}

/// The full diff for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffInfo {
    #[serde(default)]
    pub content: Vec<DiffContentChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_a: Option<FileMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_b: Option<FileMeta>,
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub diff_header: Vec<String>,
    /// `None` when the producer reports nothing; highlights are only
    /// trustworthy under `Ok`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intraline_status: Option<IntralineStatus>,
}

impl DiffInfo {
    /// Diff header lines worth surfacing to the user. Drops the boilerplate
    /// that is already communicated by the file metadata.
    pub fn display_header(&self) -> Vec<&str> {
        self.diff_header
            .iter()
            .map(String::as_str)
            .filter(|item| {
                !(item.starts_with("diff --git ")
                    || item.starts_with("index ")
                    || item.starts_with("+++ ")
                    || item.starts_with("--- ")
                    || *item == "Binary files differ")
            })
            .collect()
    }

    /// Total rendered line count, counting a delta chunk once at its longer
    /// side and including server-elided regions.
    pub fn total_line_count(&self) -> u32 {
        self.content
            .iter()
            .map(|chunk| {
                if let Some(skip) = chunk.skip {
                    skip
                } else if let Some(ab) = &chunk.ab {
                    ab.len() as u32
                } else {
                    let a = chunk.a.as_ref().map_or(0, Vec::len);
                    let b = chunk.b.as_ref().map_or(0, Vec::len);
                    a.max(b) as u32
                }
            })
            .sum()
    }

    /// Number of lines the given side contributes to the file, preferring
    /// file metadata and falling back to the chunk walk.
    pub fn line_count(&self, side: Side) -> u32 {
        let meta = match side {
            Side::Left => &self.meta_a,
            Side::Right => &self.meta_b,
        };
        if let Some(meta) = meta
            && meta.lines > 0
        {
            return meta.lines;
        }
        self.content
            .iter()
            .map(|chunk| match side {
                _ if chunk.skip.is_some() => chunk.skip.unwrap_or(0),
                Side::Left => chunk.lines_left().len() as u32,
                Side::Right => chunk.lines_right().len() as u32,
            })
            .sum()
    }

    /// The text of line `line_number` (1-based) on the given side, or `None`
    /// if the line falls inside a server-elided (`skip`) region or past the
    /// end of the file.
    pub fn line_text(&self, side: Side, line_number: u32) -> Option<&str> {
        if line_number == 0 {
            return None;
        }
        let mut current = 1u32;
        for chunk in &self.content {
            if let Some(skip) = chunk.skip {
                if line_number < current + skip {
                    return None;
                }
                current += skip;
                continue;
            }
            let lines = match side {
                Side::Left => chunk.lines_left(),
                Side::Right => chunk.lines_right(),
            };
            let len = lines.len() as u32;
            if line_number < current + len {
                return Some(&lines[(line_number - current) as usize]);
            }
            current += len;
        }
        None
    }

    /// Stable hash over the diff content, used to suppress redundant
    /// recomputation when an identical diff is re-submitted.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write_u8(self.binary as u8);
        for chunk in &self.content {
            for lines in [&chunk.a, &chunk.b, &chunk.ab].into_iter().flatten() {
                for line in lines {
                    hasher.write(line.as_bytes());
                    hasher.write_u8(b'\n');
                }
            }
            hasher.write_u32(chunk.skip.unwrap_or(0));
            hasher.write_u8(chunk.common.unwrap_or(false) as u8);
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_ab(lines: &[&str]) -> DiffContentChunk {
        DiffContentChunk {
            ab: Some(lines.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    fn chunk_delta(a: &[&str], b: &[&str]) -> DiffContentChunk {
        DiffContentChunk {
            a: Some(a.iter().map(|s| s.to_string()).collect()),
            b: Some(b.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn deserializes_rest_payload() {
        let json = r#"{
            "meta_a": {"name": "lib.rs", "content_type": "text/x-rust", "lines": 4},
            "meta_b": {"name": "lib.rs", "content_type": "text/x-rust", "lines": 4},
            "content": [
                {"ab": ["fn main() {"]},
                {"a": ["    old();"], "b": ["    new();"], "edit_a": [[4, 3]], "edit_b": [[4, 3]]},
                {"ab": ["}"]}
            ],
            "diff_header": ["diff --git a/lib.rs b/lib.rs", "index 123..456 100644"]
        }"#;
        let diff: DiffInfo = serde_json::from_str(json).unwrap();
        assert_eq!(diff.content.len(), 3);
        assert_eq!(diff.content[1].edit_a.as_deref(), Some(&[(4, 3)][..]));
        assert!(!diff.binary);
        assert!(diff.display_header().is_empty());
    }

    #[test]
    fn line_text_walks_both_sides() {
        let diff = DiffInfo {
            content: vec![
                chunk_ab(&["shared 1"]),
                chunk_delta(&["left only"], &["right a", "right b"]),
                chunk_ab(&["shared 2"]),
            ],
            ..Default::default()
        };
        assert_eq!(diff.line_text(Side::Left, 1), Some("shared 1"));
        assert_eq!(diff.line_text(Side::Left, 2), Some("left only"));
        assert_eq!(diff.line_text(Side::Left, 3), Some("shared 2"));
        assert_eq!(diff.line_text(Side::Right, 3), Some("right b"));
        assert_eq!(diff.line_text(Side::Right, 4), Some("shared 2"));
        assert_eq!(diff.line_text(Side::Right, 5), None);
    }

    #[test]
    fn skip_regions_have_no_text() {
        let diff = DiffInfo {
            content: vec![
                chunk_ab(&["first"]),
                DiffContentChunk {
                    skip: Some(100),
                    ..Default::default()
                },
                chunk_ab(&["last"]),
            ],
            ..Default::default()
        };
        assert_eq!(diff.line_text(Side::Left, 50), None);
        assert_eq!(diff.line_text(Side::Left, 102), Some("last"));
        assert_eq!(diff.total_line_count(), 102);
    }

    #[test]
    fn content_hash_is_stable_and_discriminating() {
        let a = DiffInfo {
            content: vec![chunk_ab(&["x"])],
            ..Default::default()
        };
        let b = DiffInfo {
            content: vec![chunk_ab(&["y"])],
            ..Default::default()
        };
        assert_eq!(a.content_hash(), a.clone().content_hash());
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
