//! LRU cache for formatted line content.
//!
//! Formatting a line (tab expansion today, syntax decoration in hosts that
//! layer it on) is cheap per line but shows up when the same lines re-render
//! across expansions and view-mode flips. Entries are keyed by the diff's
//! content hash so a new diff never serves stale lines.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::domain::Side;

const DEFAULT_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LineKey {
    content_hash: u64,
    side: Side,
    line: u32,
}

/// Shared cache of formatted lines. Cloning is cheap and all clones share
/// the same entries.
#[derive(Clone)]
pub struct RenderedLineCache {
    entries: Arc<Mutex<LruCache<LineKey, Arc<str>>>>,
}

impl RenderedLineCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Returns the formatted form of a line, computing and caching it on
    /// first use.
    pub fn get_or_format(
        &self,
        content_hash: u64,
        side: Side,
        line: u32,
        raw: &str,
        tab_size: u32,
    ) -> Arc<str> {
        let key = LineKey {
            content_hash,
            side,
            line,
        };
        let mut entries = self.entries.lock();
        if let Some(found) = entries.get(&key) {
            return Arc::clone(found);
        }
        let formatted: Arc<str> = Arc::from(expand_tabs(raw, tab_size));
        entries.put(key, Arc::clone(&formatted));
        formatted
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for RenderedLineCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Expands tabs to the next tab stop, counting columns in code points.
pub fn expand_tabs(text: &str, tab_size: u32) -> String {
    let tab_size = tab_size.max(1) as usize;
    let mut out = String::with_capacity(text.len());
    let mut column = 0usize;
    for ch in text.chars() {
        if ch == '\t' {
            let pad = tab_size - column % tab_size;
            out.extend(std::iter::repeat_n(' ', pad));
            column += pad;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}
