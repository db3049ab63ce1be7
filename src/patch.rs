//! Turns unified-diff text into the structured [`DiffInfo`] payload.
//!
//! This is the offline stand-in for the review backend: hunks become content
//! chunks (context runs to `ab`, paired remove/add runs to `a`/`b`), the
//! unchanged gaps between hunks become `skip` chunks, and intraline edit
//! markers are recovered with a character diff when the two sides of a
//! replace are similar enough for the markers to be meaningful.

use similar::{ChangeTag, TextDiff};
use unidiff::{Hunk, PatchSet, PatchedFile};

use crate::domain::{
    DiffContentChunk, DiffError, DiffInfo, FileMeta, IntralineInfo, IntralineStatus,
};

const MAX_INLINE_LEN: usize = 600;
const MIN_INLINE_SIMILARITY: f32 = 0.3;

fn should_do_inline(old: &str, new: &str) -> bool {
    old.len() <= MAX_INLINE_LEN && new.len() <= MAX_INLINE_LEN
}

fn strip_git_prefix(path: &str) -> String {
    path.trim_start_matches("a/")
        .trim_start_matches("b/")
        .to_string()
}

/// Parses a unified diff into one `DiffInfo` per file. Text files come out
/// with content chunks; binary files (which carry no hunks) come out with
/// `binary` set and a header only.
pub fn parse_patch(diff_text: &str) -> Result<Vec<DiffInfo>, DiffError> {
    let trimmed = diff_text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let mut patch = PatchSet::new();
    patch
        .parse(trimmed)
        .map_err(|e| DiffError::InvalidFormat(e.to_string()))?;

    let mut diffs: Vec<DiffInfo> = patch.files().iter().map(file_to_diff).collect();
    diffs.extend(binary_file_diffs(trimmed));
    Ok(diffs)
}

/// Binary files have no `---`/`+++` lines and never register as patched
/// files; their `Binary files ... differ` notices are scanned separately.
fn binary_file_diffs(text: &str) -> Vec<DiffInfo> {
    let mut result = Vec::new();
    let mut git_header: Option<&str> = None;
    for line in text.lines() {
        if line.starts_with("diff --git ") {
            git_header = Some(line);
            continue;
        }
        let Some(names) = line
            .strip_prefix("Binary files ")
            .and_then(|rest| rest.strip_suffix(" differ"))
        else {
            continue;
        };
        let (source, target) = match names.split_once(" and ") {
            Some((source, target)) => (strip_git_prefix(source), strip_git_prefix(target)),
            None => (String::new(), String::new()),
        };
        let mut diff_header = Vec::new();
        if let Some(header) = git_header.take() {
            diff_header.push(header.to_string());
        }
        diff_header.push(line.to_string());
        result.push(DiffInfo {
            content: Vec::new(),
            meta_a: Some(FileMeta {
                name: source,
                ..Default::default()
            }),
            meta_b: Some(FileMeta {
                name: target,
                ..Default::default()
            }),
            binary: true,
            diff_header,
            intraline_status: None,
        });
    }
    result
}

fn file_to_diff(file: &PatchedFile) -> DiffInfo {
    let source = strip_git_prefix(&file.source_file);
    let target = strip_git_prefix(&file.target_file);
    let diff_header = vec![format!("diff --git a/{source} b/{target}")];

    let mut content = Vec::new();
    let mut next_source = 1u32;
    let mut next_target = 1u32;
    for hunk in file.hunks() {
        let source_start = hunk.source_start.max(1) as u32;
        if source_start > next_source {
            content.push(DiffContentChunk {
                skip: Some(source_start - next_source),
                ..Default::default()
            });
        }
        chunks_for_hunk(hunk, &mut content);
        next_source = source_start + hunk.source_length as u32;
        next_target = (hunk.target_start.max(1) as u32) + hunk.target_length as u32;
    }

    DiffInfo {
        content,
        meta_a: Some(FileMeta {
            name: source,
            content_type: String::new(),
            lines: next_source.saturating_sub(1),
        }),
        meta_b: Some(FileMeta {
            name: target,
            content_type: String::new(),
            lines: next_target.saturating_sub(1),
        }),
        binary: false,
        diff_header,
        intraline_status: Some(IntralineStatus::Ok),
    }
}

fn chunks_for_hunk(hunk: &Hunk, out: &mut Vec<DiffContentChunk>) {
    let lines = hunk.lines();
    let mut i = 0usize;

    while i < lines.len() {
        if lines[i].is_context() {
            let mut ab = Vec::new();
            while i < lines.len() && lines[i].is_context() {
                ab.push(lines[i].value.clone());
                i += 1;
            }
            out.push(DiffContentChunk {
                ab: Some(ab),
                ..Default::default()
            });
            continue;
        }

        let remove_start = i;
        while i < lines.len() && lines[i].is_removed() {
            i += 1;
        }
        let insert_start = i;
        while i < lines.len() && lines[i].is_added() {
            i += 1;
        }

        let removed: Vec<String> = lines[remove_start..insert_start]
            .iter()
            .map(|l| l.value.clone())
            .collect();
        let added: Vec<String> = lines[insert_start..i]
            .iter()
            .map(|l| l.value.clone())
            .collect();

        let (edit_a, edit_b) = intraline_edits(&removed, &added);
        out.push(DiffContentChunk {
            a: (!removed.is_empty()).then_some(removed),
            b: (!added.is_empty()).then_some(added),
            edit_a,
            edit_b,
            ..Default::default()
        });
    }
}

/// Recovers intraline edit markers for a replace chunk. Only balanced chunks
/// whose paired lines are actually similar get markers; a wholesale rewrite
/// highlights nothing.
fn intraline_edits(
    removed: &[String],
    added: &[String],
) -> (Option<Vec<IntralineInfo>>, Option<Vec<IntralineInfo>>) {
    if removed.is_empty() || added.is_empty() || removed.len() != added.len() {
        return (None, None);
    }
    let has_similar = removed.iter().zip(added).any(|(old, new)| {
        should_do_inline(old, new)
            && TextDiff::from_chars(old.as_str(), new.as_str()).ratio() > MIN_INLINE_SIMILARITY
    });
    if !has_similar {
        return (None, None);
    }

    let mut marks_a = Vec::new();
    let mut marks_b = Vec::new();
    // Positions are code points over the chunk's concatenated text, one per
    // line break.
    let mut offset_a = 0u32;
    let mut offset_b = 0u32;
    for (old, new) in removed.iter().zip(added) {
        let old_len = old.chars().count() as u32;
        let new_len = new.chars().count() as u32;
        if should_do_inline(old, new) {
            let diff = TextDiff::from_chars(old.as_str(), new.as_str());
            if diff.ratio() > MIN_INLINE_SIMILARITY {
                collect_marks(&diff, offset_a, offset_b, &mut marks_a, &mut marks_b);
            }
        }
        offset_a += old_len + 1;
        offset_b += new_len + 1;
    }

    (
        ranges_to_infos(&marks_a),
        ranges_to_infos(&marks_b),
    )
}

/// Collects `(start, len)` mark ranges for one line pair, in chunk
/// coordinates. Adjacent marked characters merge into one range.
fn collect_marks<'a>(
    diff: &TextDiff<'a, 'a, 'a, str>,
    offset_a: u32,
    offset_b: u32,
    marks_a: &mut Vec<(u32, u32)>,
    marks_b: &mut Vec<(u32, u32)>,
) {
    let mut pos_a = offset_a;
    let mut pos_b = offset_b;
    for change in diff.iter_all_changes() {
        let len = change.value().chars().count() as u32;
        match change.tag() {
            ChangeTag::Equal => {
                pos_a += len;
                pos_b += len;
            }
            ChangeTag::Delete => {
                push_mark(marks_a, pos_a, len);
                pos_a += len;
            }
            ChangeTag::Insert => {
                push_mark(marks_b, pos_b, len);
                pos_b += len;
            }
        }
    }
}

fn push_mark(marks: &mut Vec<(u32, u32)>, start: u32, len: u32) {
    if len == 0 {
        return;
    }
    if let Some(last) = marks.last_mut()
        && last.0 + last.1 == start
    {
        last.1 += len;
        return;
    }
    marks.push((start, len));
}

/// Converts absolute `(start, len)` ranges into the `(skip, mark)` pairs the
/// chunk format carries.
fn ranges_to_infos(marks: &[(u32, u32)]) -> Option<Vec<IntralineInfo>> {
    if marks.is_empty() {
        return None;
    }
    let mut infos = Vec::with_capacity(marks.len());
    let mut position = 0u32;
    for &(start, len) in marks {
        infos.push((start - position, len));
        position = start + len;
    }
    Some(infos)
}
