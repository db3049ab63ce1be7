//! The diff model: one shared, observable state container per rendered diff.
//!
//! Hosts push inputs in through [`DiffModel::update_state`] and read derived
//! output (line groups, a render plan) back out. Grouping reruns only when an
//! input that affects it actually changed; a new diff payload hashing to the
//! same content as the current one is dropped. State is never handed out
//! mutably, so observers always see a consistent snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::context::{self, ContextButtonType, ExpansionOutcome};
use crate::domain::{
    DiffError, DiffInfo, DiffPreferences, RenderPreferences, Side, WHOLE_FILE, default_prefs,
};
use crate::group::processor::{self, KeyLocations, ProcessorOptions};
use crate::group::{LineGroup, SideRanges};
use crate::render::cache::RenderedLineCache;
use crate::render::{self, ColumnLayout, TableRow};

/// Diffs at or past this many total lines are not rendered whole-file
/// without an explicit bypass.
pub const LARGE_DIFF_THRESHOLD_LINES: u32 = 10_000;

/// Context used when the user collapses an oversized whole-file diff and the
/// preference itself is whole-file.
const DEFAULT_COLLAPSE_CONTEXT: i32 = 10;

/// Partial update to the model's inputs; `None` fields keep their value.
#[derive(Default)]
pub struct DiffStatePatch {
    pub diff: Option<Arc<DiffInfo>>,
    pub prefs: Option<DiffPreferences>,
    pub render_prefs: Option<RenderPreferences>,
    pub line_of_interest: Option<Option<(Side, u32)>>,
    pub comment_lines: Option<Vec<(Side, u32)>>,
}

/// Notifications pushed to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// Derived state changed; the host should rebuild its view.
    RenderRequired,
    /// The host reported that painting finished.
    Rendered,
    /// Expansion needs diff data the current payload elides; fetch this
    /// range and push a new diff through `update_state`.
    ContentLoadNeeded { line_range: SideRanges },
    /// A copy was produced from the diff.
    CopyPerformed { side: Side, code_points: usize },
}

/// How the host should render the current state.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPlan {
    /// No diff loaded yet.
    NoDiff,
    /// Binary file: show the header lines, no table.
    Binary { header: Vec<String> },
    /// Oversized whole-file render was refused; offer the two bypasses.
    TooLarge { total_lines: u32 },
    Render {
        rows: Vec<TableRow>,
        layout: ColumnLayout,
    },
}

struct ModelState {
    diff: Option<Arc<DiffInfo>>,
    last_hash: u64,
    prefs: DiffPreferences,
    render_prefs: RenderPreferences,
    line_of_interest: Option<(Side, u32)>,
    comment_lines: Vec<(Side, u32)>,
    groups: Vec<LineGroup>,
    /// Context override from a guard bypass; cleared when a new diff loads.
    safety_bypass: Option<i32>,
}

impl Default for ModelState {
    fn default() -> Self {
        Self {
            diff: None,
            last_hash: 0,
            prefs: default_prefs().clone(),
            render_prefs: RenderPreferences::default(),
            line_of_interest: None,
            comment_lines: Vec::new(),
            groups: Vec::new(),
            safety_bypass: None,
        }
    }
}

impl ModelState {
    fn effective_context(&self) -> i32 {
        self.safety_bypass.unwrap_or(self.prefs.context)
    }

    fn key_locations(&self) -> KeyLocations {
        let mut locations = KeyLocations::default();
        if let Some((side, line)) = self.line_of_interest {
            locations.insert(side, line);
        }
        for &(side, line) in &self.comment_lines {
            locations.insert(side, line);
        }
        locations
    }

    fn render_guard_trips(&self) -> bool {
        let Some(diff) = &self.diff else {
            return false;
        };
        self.effective_context() == WHOLE_FILE
            && self.safety_bypass.is_none()
            && diff.total_line_count() >= LARGE_DIFF_THRESHOLD_LINES
    }
}

type Subscriber = Box<dyn Fn(&ModelEvent) + Send + Sync>;

/// Shared observable model. Clones refer to the same state.
#[derive(Clone)]
pub struct DiffModel {
    state: Arc<RwLock<ModelState>>,
    subscribers: Arc<Mutex<HashMap<usize, Subscriber>>>,
    next_subscriber: Arc<Mutex<usize>>,
    line_cache: RenderedLineCache,
}

impl DiffModel {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ModelState::default())),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_subscriber: Arc::new(Mutex::new(0)),
            line_cache: RenderedLineCache::new(),
        }
    }

    pub fn subscribe(&self, f: impl Fn(&ModelEvent) + Send + Sync + 'static) -> usize {
        let mut next = self.next_subscriber.lock();
        let id = *next;
        *next += 1;
        self.subscribers.lock().insert(id, Box::new(f));
        id
    }

    pub fn unsubscribe(&self, id: usize) {
        self.subscribers.lock().remove(&id);
    }

    fn emit(&self, event: ModelEvent) {
        log::debug!("model event: {event:?}");
        for subscriber in self.subscribers.lock().values() {
            subscriber(&event);
        }
    }

    /// Applies a patch and regroups if anything grouping depends on changed.
    pub fn update_state(&self, patch: DiffStatePatch) -> Result<(), DiffError> {
        let mut regroup = false;
        let mut notify = false;
        {
            let mut state = self.state.write();
            if let Some(diff) = patch.diff {
                let hash = diff.content_hash();
                if hash != state.last_hash {
                    state.diff = Some(diff);
                    state.last_hash = hash;
                    state.safety_bypass = None;
                    regroup = true;
                } else {
                    log::debug!("diff update dropped: content unchanged");
                }
            }
            if let Some(prefs) = patch.prefs {
                if prefs != state.prefs {
                    state.prefs = prefs;
                    regroup = true;
                }
            }
            if let Some(render_prefs) = patch.render_prefs {
                if render_prefs != state.render_prefs {
                    state.render_prefs = render_prefs;
                    notify = true;
                }
            }
            if let Some(line_of_interest) = patch.line_of_interest {
                if line_of_interest != state.line_of_interest {
                    state.line_of_interest = line_of_interest;
                    regroup = true;
                }
            }
            if let Some(comment_lines) = patch.comment_lines {
                if comment_lines != state.comment_lines {
                    state.comment_lines = comment_lines;
                    regroup = true;
                }
            }
        }
        let grouped = if regroup {
            self.line_cache.clear();
            self.regroup()
        } else {
            Ok(())
        };
        if regroup || notify {
            self.emit(ModelEvent::RenderRequired);
        }
        grouped
    }

    /// Regroups the current diff. A malformed payload resets the model to
    /// the empty state instead of leaving a half-applied one: the host gets
    /// the error plus a `NoDiff` plan, never the previous diff's groups
    /// presented as the new payload's.
    fn regroup(&self) -> Result<(), DiffError> {
        let mut state = self.state.write();
        let Some(diff) = state.diff.clone() else {
            state.groups.clear();
            return Ok(());
        };
        if diff.binary || state.render_guard_trips() {
            state.groups.clear();
            return Ok(());
        }
        let options = ProcessorOptions {
            context: state.effective_context(),
            key_locations: state.key_locations(),
        };
        match processor::process(&diff.content, &options) {
            Ok(groups) => {
                state.groups = groups;
                Ok(())
            }
            Err(error) => {
                state.diff = None;
                state.last_hash = 0;
                state.safety_bypass = None;
                state.groups.clear();
                Err(error)
            }
        }
    }

    /// Current group sequence (empty until a diff is loaded and grouped).
    pub fn groups(&self) -> Vec<LineGroup> {
        self.state.read().groups.clone()
    }

    pub fn diff(&self) -> Option<Arc<DiffInfo>> {
        self.state.read().diff.clone()
    }

    pub fn prefs(&self) -> DiffPreferences {
        self.state.read().prefs.clone()
    }

    /// Line count of the loaded diff on one side; 0 with no diff.
    pub fn line_count(&self, side: Side) -> u32 {
        self.state
            .read()
            .diff
            .as_ref()
            .map_or(0, |diff| diff.line_count(side))
    }

    /// The lines currently pinned visible: the line of interest plus comment
    /// anchors.
    pub fn key_locations(&self) -> KeyLocations {
        self.state.read().key_locations()
    }

    /// Column layout for the current preferences and view mode, independent
    /// of whether a render plan is available.
    pub fn column_layout(&self) -> ColumnLayout {
        let state = self.state.read();
        let max_line = state.diff.as_ref().map_or(0, |diff| {
            diff.line_count(Side::Left).max(diff.line_count(Side::Right))
        });
        render::column_layout(&state.prefs, &state.render_prefs, max_line)
    }

    /// What the host should render right now.
    pub fn render_plan(&self) -> RenderPlan {
        let state = self.state.read();
        let Some(diff) = &state.diff else {
            return RenderPlan::NoDiff;
        };
        if diff.binary {
            return RenderPlan::Binary {
                header: diff
                    .display_header()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            };
        }
        if state.render_guard_trips() {
            return RenderPlan::TooLarge {
                total_lines: diff.total_line_count(),
            };
        }
        let max_line = diff.line_count(Side::Left).max(diff.line_count(Side::Right));
        RenderPlan::Render {
            rows: render::build_rows(
                &state.groups,
                state.render_prefs.view_mode,
                diff.line_count(Side::Left),
            ),
            layout: render::column_layout(&state.prefs, &state.render_prefs, max_line),
        }
    }

    /// Oversized-diff bypass: render the whole file anyway.
    pub fn bypass_full_render(&self) -> Result<(), DiffError> {
        self.set_bypass(WHOLE_FILE)
    }

    /// Oversized-diff bypass: render with collapsed context instead. Uses the
    /// preferred context when one is set, a small default otherwise.
    pub fn collapse_context(&self) -> Result<(), DiffError> {
        let context = {
            let state = self.state.read();
            if state.prefs.context > 0 {
                state.prefs.context
            } else {
                DEFAULT_COLLAPSE_CONTEXT
            }
        };
        self.set_bypass(context)
    }

    fn set_bypass(&self, context: i32) -> Result<(), DiffError> {
        self.state.write().safety_bypass = Some(context);
        self.regroup()?;
        self.emit(ModelEvent::RenderRequired);
        Ok(())
    }

    /// Applies an expansion request against the control group at `index`.
    pub fn expand_context(&self, index: usize, button: ContextButtonType) -> ExpansionOutcome {
        let outcome = {
            let mut state = self.state.write();
            let mut groups = std::mem::take(&mut state.groups);
            let outcome = context::expand_in(&mut groups, index, button);
            state.groups = groups;
            outcome
        };
        match &outcome {
            ExpansionOutcome::Replaced(_) => self.emit(ModelEvent::RenderRequired),
            ExpansionOutcome::ContentLoadNeeded { line_range } => {
                self.emit(ModelEvent::ContentLoadNeeded {
                    line_range: *line_range,
                })
            }
            ExpansionOutcome::Noop => {}
        }
        outcome
    }

    /// Tab-expanded text for one line, cached across re-renders. `None` for
    /// lines inside server-elided regions or past the end of the file.
    pub fn formatted_line(&self, side: Side, line: u32) -> Option<Arc<str>> {
        let state = self.state.read();
        let diff = state.diff.as_ref()?;
        let raw = diff.line_text(side, line)?;
        Some(self.line_cache.get_or_format(
            state.last_hash,
            side,
            line,
            raw,
            state.prefs.tab_size,
        ))
    }

    /// The host finished painting.
    pub fn rendered(&self) {
        self.emit(ModelEvent::Rendered);
    }

    /// Reports a completed copy so observers (shortcut hints, telemetry) can
    /// react.
    pub fn copied(&self, side: Side, text: &str) {
        self.emit(ModelEvent::CopyPerformed {
            side,
            code_points: text.chars().count(),
        });
    }
}

impl Default for DiffModel {
    fn default() -> Self {
        Self::new()
    }
}
