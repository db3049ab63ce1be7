//! Converts the diff's chunk list into renderable [`LineGroup`]s.
//!
//! The processor walks chunks in order with independent left/right line
//! counters, coalesces collapsible runs (unchanged, whitespace-only, or
//! server-elided chunks without key locations) and applies the context
//! preference: a visible head, a context control over the hidden middle,
//! and a visible tail. Key locations are split out of common chunks first
//! so they can never end up hidden.

use std::collections::HashSet;

use crate::domain::prefs::WHOLE_FILE;
use crate::domain::{DiffContentChunk, DiffError, IntralineInfo, Side};

use super::{DiffLine, DiffLineType, GroupType, Highlight, LineGroup, hide_in_context_control};

/// The maximum size for an addition or removal chunk before it is broken
/// down into a series of chunks of at most this size, so a renderer can
/// paint incrementally.
pub const MAX_GROUP_SIZE: usize = 128;

/// Lines that must stay visible regardless of the context preference, e.g.
/// comment anchors or the permalink target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyLocations {
    pub left: HashSet<u32>,
    pub right: HashSet<u32>,
}

impl KeyLocations {
    pub fn insert(&mut self, side: Side, line: u32) {
        match side {
            Side::Left => self.left.insert(line),
            Side::Right => self.right.insert(line),
        };
    }

    pub fn contains(&self, side: Side, line: u32) -> bool {
        match side {
            Side::Left => self.left.contains(&line),
            Side::Right => self.right.contains(&line),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Unchanged lines to keep visible around each change; `WHOLE_FILE` (−1)
    /// disables collapsing (except for server-elided regions).
    pub context: i32,
    pub key_locations: KeyLocations,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            context: 3,
            key_locations: KeyLocations::default(),
        }
    }
}

/// A chunk annotated with whether it carries a key location, the working
/// unit of the splitting passes.
#[derive(Debug, Clone, Default)]
struct WorkChunk {
    a: Option<Vec<String>>,
    b: Option<Vec<String>>,
    ab: Option<Vec<String>>,
    skip: Option<u32>,
    common: bool,
    edit_a: Option<Vec<IntralineInfo>>,
    edit_b: Option<Vec<IntralineInfo>>,
    due_to_rebase: bool,
    key_location: bool,
}

impl WorkChunk {
    fn from_content(chunk: &DiffContentChunk) -> Self {
        Self {
            a: chunk.a.clone(),
            b: chunk.b.clone(),
            ab: chunk.ab.clone(),
            skip: chunk.skip,
            common: chunk.common.unwrap_or(false),
            edit_a: chunk.edit_a.clone(),
            edit_b: chunk.edit_b.clone(),
            due_to_rebase: chunk.due_to_rebase.unwrap_or(false),
            key_location: false,
        }
    }

    fn lines_left(&self) -> &[String] {
        self.ab.as_deref().or(self.a.as_deref()).unwrap_or_default()
    }

    fn lines_right(&self) -> &[String] {
        self.ab.as_deref().or(self.b.as_deref()).unwrap_or_default()
    }

    fn is_common(&self) -> bool {
        self.ab.is_some() || self.skip.is_some() || self.common
    }

    fn is_collapsible(&self) -> bool {
        self.is_common() && !self.key_location
    }

    /// Per-side line count for a common chunk. Whitespace-only chunks must
    /// have the same number of lines on both sides.
    fn common_len(&self) -> Result<u32, DiffError> {
        if let Some(skip) = self.skip {
            return Ok(skip);
        }
        if self.common {
            let a = self.a.as_ref().map_or(0, Vec::len);
            let b = self.b.as_ref().map_or(0, Vec::len);
            if a != b {
                return Err(DiffError::InvalidChunk(format!(
                    "whitespace-only chunk needs equal line counts, got {a} vs {b}"
                )));
            }
        }
        Ok(self.lines_left().len() as u32)
    }
}

/// Pure grouping function: `(content, options) -> groups`.
///
/// The caller is responsible for the binary bypass and the oversized-diff
/// guard; this function assumes grouping has been decided on.
pub fn process(
    content: &[DiffContentChunk],
    options: &ProcessorOptions,
) -> Result<Vec<LineGroup>, DiffError> {
    let chunks = split_large_chunks(content, options.context);
    let chunks = split_common_chunks_with_key_locations(chunks, &options.key_locations)?;

    let mut groups: Vec<LineGroup> = Vec::new();
    let mut left = 0u32;
    let mut right = 0u32;
    let mut index = 0;

    while index < chunks.len() {
        let run_end = first_uncollapsible_index(&chunks, index);
        if run_end == index {
            let chunk = &chunks[index];
            let group = chunk_to_group(chunk, left + 1, right + 1)?;
            left += chunk.lines_left().len() as u32;
            right += chunk.lines_right().len() as u32;
            if let Some(skip) = chunk.skip {
                left += skip;
                right += skip;
            }
            groups.push(group);
            index += 1;
            continue;
        }

        let run = &chunks[index..run_end];
        let mut line_count = 0u32;
        for chunk in run {
            line_count += chunk.common_len()?;
        }
        let mut run_groups = chunks_to_groups(run, left + 1, right + 1)?;

        let has_skip = run_groups.iter().any(|g| g.skip.is_some());
        if options.context != WHOLE_FILE || has_skip {
            let context_lines = i64::from(options.context.max(0));
            let hidden_start = if index == 0 { 0 } else { context_lines };
            let hidden_end = i64::from(line_count)
                - if run_end == chunks.len() {
                    0
                } else {
                    i64::from(options.context)
                };
            run_groups = hide_in_context_control(run_groups, hidden_start, hidden_end);
        }

        groups.extend(run_groups);
        left += line_count;
        right += line_count;
        index = run_end;
    }

    log::debug!(
        "processed {} chunks into {} groups ({left} left / {right} right lines)",
        chunks.len(),
        groups.len()
    );
    Ok(groups)
}

fn first_uncollapsible_index(chunks: &[WorkChunk], offset: usize) -> usize {
    let mut index = offset;
    while index < chunks.len() && chunks[index].is_collapsible() {
        index += 1;
    }
    index
}

fn chunks_to_groups(
    chunks: &[WorkChunk],
    mut offset_left: u32,
    mut offset_right: u32,
) -> Result<Vec<LineGroup>, DiffError> {
    let mut groups = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let group = chunk_to_group(chunk, offset_left, offset_right)?;
        let len = chunk.common_len()?;
        offset_left += len;
        offset_right += len;
        groups.push(group);
    }
    Ok(groups)
}

fn chunk_to_group(
    chunk: &WorkChunk,
    offset_left: u32,
    offset_right: u32,
) -> Result<LineGroup, DiffError> {
    if let Some(skip) = chunk.skip {
        let mut group = LineGroup::new_skip(skip, offset_left, offset_right);
        group.key_location = chunk.key_location;
        return Ok(group);
    }
    let group_type = if chunk.ab.is_some() {
        GroupType::Both
    } else {
        GroupType::Delta
    };
    let lines = lines_from_chunk(chunk, offset_left, offset_right);
    let mut group = LineGroup::new(group_type, lines);
    group.ignored_whitespace_only = chunk.common;
    group.due_to_rebase = chunk.due_to_rebase;
    group.key_location = chunk.key_location;
    Ok(group)
}

fn lines_from_chunk(chunk: &WorkChunk, offset_left: u32, offset_right: u32) -> Vec<DiffLine> {
    if let Some(ab) = &chunk.ab {
        return ab
            .iter()
            .enumerate()
            .map(|(i, row)| DiffLine::both(row.clone(), offset_left + i as u32, offset_right + i as u32))
            .collect();
    }
    let mut lines = Vec::new();
    if let Some(a) = &chunk.a {
        lines.extend(lines_from_rows(
            DiffLineType::Remove,
            a,
            offset_left,
            chunk.edit_a.as_deref(),
        ));
    }
    if let Some(b) = &chunk.b {
        lines.extend(lines_from_rows(
            DiffLineType::Add,
            b,
            offset_right,
            chunk.edit_b.as_deref(),
        ));
    }
    lines
}

fn lines_from_rows(
    line_type: DiffLineType,
    rows: &[String],
    offset: u32,
    intraline: Option<&[IntralineInfo]>,
) -> Vec<DiffLine> {
    let highlights = intraline.map(|infos| convert_intraline_infos(rows, infos));
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let mut line = match line_type {
                DiffLineType::Remove => DiffLine::remove(row.clone(), offset + i as u32),
                DiffLineType::Add => DiffLine::add(row.clone(), offset + i as u32),
                DiffLineType::Both => unreachable!("ab rows handled by caller"),
            };
            if let Some(highlights) = &highlights {
                line.highlights = highlights
                    .iter()
                    .filter(|h| h.content_index == i)
                    .map(|h| h.highlight)
                    .collect();
            }
            line
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct LineHighlight {
    content_index: usize,
    highlight: Highlight,
}

/// Converts `(skip, mark)` intraline markers into per-line highlights.
/// Positions count code points, with one code point per line break, so
/// characters outside the BMP are never split.
fn convert_intraline_infos(rows: &[String], infos: &[IntralineInfo]) -> Vec<LineHighlight> {
    let line_lengths: Vec<u32> = rows.iter().map(|r| r.chars().count() as u32 + 1).collect();
    let mut normalized = Vec::new();
    let mut row_index = 0usize;
    let mut idx = 0u32;

    'infos: for &(skip_len, mark_len) in infos {
        let mut line_length = match line_lengths.get(row_index) {
            Some(len) => *len,
            None => break,
        };
        let mut j = 0;
        while j < skip_len {
            if idx == line_length {
                idx = 0;
                row_index += 1;
                line_length = match line_lengths.get(row_index) {
                    Some(len) => *len,
                    None => break 'infos,
                };
                continue;
            }
            idx += 1;
            j += 1;
        }

        let mut current = LineHighlight {
            content_index: row_index,
            highlight: Highlight {
                start: idx,
                end: None,
            },
        };
        j = 0;
        while line_length > 0 && j < mark_len {
            if idx == line_length {
                idx = 0;
                row_index += 1;
                normalized.push(current);
                line_length = match line_lengths.get(row_index) {
                    Some(len) => *len,
                    None => break 'infos,
                };
                current = LineHighlight {
                    content_index: row_index,
                    highlight: Highlight {
                        start: idx,
                        end: None,
                    },
                };
                continue;
            }
            idx += 1;
            j += 1;
        }
        current.highlight.end = Some(idx);
        normalized.push(current);
    }
    normalized
}

/// Breaks addition/removal chunks into sub-chunks of at most
/// [`MAX_GROUP_SIZE`] lines, and under whole-file context splits oversized
/// shared chunks in two so they can be rendered incrementally.
fn split_large_chunks(content: &[DiffContentChunk], context: i32) -> Vec<WorkChunk> {
    let mut out = Vec::with_capacity(content.len());
    for chunk in content {
        let mut work = WorkChunk::from_content(chunk);
        if work.ab.is_none() {
            out.extend(breakdown_chunk(work));
            continue;
        }
        if context == WHOLE_FILE
            && let Some(mut head) = work.ab.take_if(|ab| ab.len() > MAX_GROUP_SIZE * 2)
        {
            let tail = head.split_off(MAX_GROUP_SIZE);
            out.push(WorkChunk {
                ab: Some(head),
                ..Default::default()
            });
            out.push(WorkChunk {
                ab: Some(tail),
                ..Default::default()
            });
        } else {
            out.push(work);
        }
    }
    out
}

/// If a chunk is a pure addition or removal, break it into smaller chunks of
/// the same kind. Replace chunks are returned as-is so intraline markers
/// stay aligned.
fn breakdown_chunk(mut chunk: WorkChunk) -> Vec<WorkChunk> {
    let key_is_a = chunk.a.as_ref().is_some_and(|a| !a.is_empty())
        && chunk.b.as_ref().is_none_or(|b| b.is_empty());
    let key_is_b = chunk.b.as_ref().is_some_and(|b| !b.is_empty())
        && chunk.a.as_ref().is_none_or(|a| a.is_empty());
    if !key_is_a && !key_is_b {
        return vec![chunk];
    }
    let rows = if key_is_a { chunk.a.take() } else { chunk.b.take() };
    let Some(rows) = rows else {
        return vec![chunk];
    };
    breakdown(&rows, MAX_GROUP_SIZE)
        .into_iter()
        .map(|sub| WorkChunk {
            a: key_is_a.then(|| sub.clone()),
            b: key_is_b.then_some(sub),
            due_to_rebase: chunk.due_to_rebase,
            ..Default::default()
        })
        .collect()
}

/// Splits `rows` into runs no larger than `size`, preserving order. The
/// remainder, if any, comes first so the final run is always full.
fn breakdown(rows: &[String], size: usize) -> Vec<Vec<String>> {
    if rows.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut start = rows.len() % size;
    if start > 0 {
        out.push(rows[..start].to_vec());
    }
    while start < rows.len() {
        out.push(rows[start..start + size].to_vec());
        start += size;
    }
    out
}

/// Splits common chunks so that lines at key locations land in their own
/// single-line chunks, which the grouping walk then refuses to collapse.
fn split_common_chunks_with_key_locations(
    chunks: Vec<WorkChunk>,
    key_locations: &KeyLocations,
) -> Result<Vec<WorkChunk>, DiffError> {
    let mut result = Vec::with_capacity(chunks.len());
    let mut left_line = 1u32;
    let mut right_line = 1u32;

    for chunk in chunks {
        if !chunk.is_common() {
            left_line += chunk.a.as_ref().map_or(0, Vec::len) as u32;
            right_line += chunk.b.as_ref().map_or(0, Vec::len) as u32;
            result.push(chunk);
            continue;
        }

        let num_lines = chunk.common_len()?;
        let chunk_ends = find_chunk_ends_at_key_locations(num_lines, left_line, right_line, key_locations);
        left_line += num_lines;
        right_line += num_lines;

        if chunk.skip.is_some() {
            result.push(WorkChunk {
                key_location: false,
                ..chunk
            });
        } else if let Some(ab) = &chunk.ab {
            for piece in split_at_chunk_ends(ab, &chunk_ends) {
                result.push(WorkChunk {
                    ab: Some(piece.lines),
                    key_location: piece.key_location,
                    ..Default::default()
                });
            }
        } else if chunk.common {
            let a = chunk.a.as_deref().unwrap_or_default();
            let b = chunk.b.as_deref().unwrap_or_default();
            let a_pieces = split_at_chunk_ends(a, &chunk_ends);
            let b_pieces = split_at_chunk_ends(b, &chunk_ends);
            for (a_piece, b_piece) in a_pieces.into_iter().zip(b_pieces) {
                result.push(WorkChunk {
                    a: Some(a_piece.lines),
                    b: Some(b_piece.lines),
                    common: true,
                    due_to_rebase: chunk.due_to_rebase,
                    key_location: a_piece.key_location,
                    ..Default::default()
                });
            }
        }
    }
    Ok(result)
}

#[derive(Debug, Clone, Copy)]
struct ChunkEnd {
    offset: u32,
    key_location: bool,
}

fn find_chunk_ends_at_key_locations(
    num_lines: u32,
    left_offset: u32,
    right_offset: u32,
    key_locations: &KeyLocations,
) -> Vec<ChunkEnd> {
    let mut result = Vec::new();
    let mut last_chunk_end = 0u32;
    for i in 0..num_lines {
        if key_locations.contains(Side::Left, left_offset + i)
            || key_locations.contains(Side::Right, right_offset + i)
        {
            if i > last_chunk_end {
                result.push(ChunkEnd {
                    offset: i,
                    key_location: false,
                });
            }
            result.push(ChunkEnd {
                offset: i + 1,
                key_location: true,
            });
            last_chunk_end = i + 1;
        }
    }
    if num_lines > last_chunk_end {
        result.push(ChunkEnd {
            offset: num_lines,
            key_location: false,
        });
    }
    result
}

struct ChunkPiece {
    lines: Vec<String>,
    key_location: bool,
}

fn split_at_chunk_ends(lines: &[String], chunk_ends: &[ChunkEnd]) -> Vec<ChunkPiece> {
    let mut result = Vec::new();
    let mut last_offset = 0usize;
    for end in chunk_ends {
        let offset = end.offset as usize;
        if offset == last_offset {
            continue;
        }
        result.push(ChunkPiece {
            lines: lines[last_offset..offset].to_vec(),
            key_location: end.key_location,
        });
        last_offset = offset;
    }
    result
}
