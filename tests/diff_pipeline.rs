//! End-to-end tests for the diff pipeline: patch text in, groups, rows and
//! copy text out, with the model driving regrouping and expansion.

use std::sync::{Arc, Once};

use parking_lot::Mutex;

use reviewdiff::context::ContextButtonType;
use reviewdiff::domain::prefs::{DiffViewMode, RenderPreferences};
use reviewdiff::domain::{DiffContentChunk, DiffInfo, DiffPreferences, Side, WHOLE_FILE};
use reviewdiff::group::GroupType;
use reviewdiff::model::{DiffModel, DiffStatePatch, ModelEvent, RenderPlan};
use reviewdiff::patch::parse_patch;
use reviewdiff::render::doc::{Anchor, RenderedDoc};
use reviewdiff::select::{selected_text, SelectionClass, SelectionRange};

static LOGGER: Once = Once::new();

fn init() {
    LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

const SAMPLE_PATCH: &str = include_str!("../testdata/sample.patch");

fn load(model: &DiffModel, diff: DiffInfo) {
    model
        .update_state(DiffStatePatch {
            diff: Some(Arc::new(diff)),
            ..Default::default()
        })
        .unwrap();
}

fn rendered_rows(model: &DiffModel) -> Vec<reviewdiff::render::TableRow> {
    match model.render_plan() {
        RenderPlan::Render { rows, .. } => rows,
        other => panic!("expected a render plan, got {other:?}"),
    }
}

#[test]
fn patch_to_copy_text_round_trip() {
    init();
    let diffs = parse_patch(SAMPLE_PATCH).unwrap();
    assert_eq!(diffs.len(), 1);
    let diff = diffs.into_iter().next().unwrap();

    let model = DiffModel::new();
    load(&model, diff.clone());
    let rows = rendered_rows(&model);
    let doc = RenderedDoc::from_rows(&rows);

    // Select right side from the struct line through the changed field.
    let start = Anchor {
        node: doc.content_text_node(Side::Right, 3).unwrap(),
        offset: 0,
    };
    let end = Anchor {
        node: doc.content_text_node(Side::Right, 4).unwrap(),
        offset: 21,
    };
    let text = selected_text(
        &doc,
        &diff,
        SelectionRange { start, end },
        SelectionClass::Line(Side::Right),
    );
    assert_eq!(text, "pub struct Config {\n    pub retries: u32,");

    // The left side still reads the old field type.
    let start = Anchor {
        node: doc.content_text_node(Side::Left, 4).unwrap(),
        offset: 4,
    };
    let end = Anchor {
        node: doc.content_text_node(Side::Left, 4).unwrap(),
        offset: 19,
    };
    let text = selected_text(
        &doc,
        &diff,
        SelectionRange { start, end },
        SelectionClass::Line(Side::Left),
    );
    assert_eq!(text, "pub retries: u8");
}

#[test]
fn expanding_every_control_matches_whole_file_grouping() {
    init();
    let diff = DiffInfo {
        content: vec![
            DiffContentChunk {
                ab: Some((1..=50).map(|i| format!("head {i}")).collect()),
                ..Default::default()
            },
            DiffContentChunk {
                a: Some(vec!["removed".into()]),
                b: Some(vec!["added".into()]),
                ..Default::default()
            },
            DiffContentChunk {
                ab: Some((1..=50).map(|i| format!("tail {i}")).collect()),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let collapsed = DiffModel::new();
    load(&collapsed, diff.clone());
    assert!(collapsed
        .groups()
        .iter()
        .any(|g| g.group_type == GroupType::ContextControl));

    // Expand controls until none remain.
    loop {
        let Some(index) = collapsed
            .groups()
            .iter()
            .position(|g| g.group_type == GroupType::ContextControl)
        else {
            break;
        };
        collapsed.expand_context(index, ContextButtonType::All);
    }

    let whole_file = DiffModel::new();
    whole_file
        .update_state(DiffStatePatch {
            diff: Some(Arc::new(diff)),
            prefs: Some(DiffPreferences {
                context: WHOLE_FILE,
                ..Default::default()
            }),
            ..Default::default()
        })
        .unwrap();

    let lines = |model: &DiffModel, side: Side| -> Vec<(u32, String)> {
        model
            .groups()
            .iter()
            .flat_map(|g| g.lines.iter())
            .filter_map(|l| l.number(side).map(|n| (n, l.text.clone())))
            .collect::<Vec<_>>()
    };
    for side in [Side::Left, Side::Right] {
        assert_eq!(lines(&collapsed, side), lines(&whole_file, side));
    }
}

#[test]
fn oversized_diff_needs_a_bypass() {
    init();
    let diff = DiffInfo {
        content: vec![DiffContentChunk {
            ab: Some((0..15_000).map(|i| format!("line {i}")).collect()),
            ..Default::default()
        }],
        ..Default::default()
    };
    let model = DiffModel::new();
    model
        .update_state(DiffStatePatch {
            diff: Some(Arc::new(diff)),
            prefs: Some(DiffPreferences {
                context: WHOLE_FILE,
                ..Default::default()
            }),
            ..Default::default()
        })
        .unwrap();
    assert!(matches!(model.render_plan(), RenderPlan::TooLarge { total_lines: 15_000 }));

    // Collapsing renders with controls instead of refusing.
    model.collapse_context().unwrap();
    let rows = rendered_rows(&model);
    assert!(rows
        .iter()
        .any(|r| matches!(r, reviewdiff::render::TableRow::ContextControl { .. })));
}

#[test]
fn binary_patch_renders_header_only() {
    init();
    let text = "\
diff --git a/logo.png b/logo.png
index 83db48f..bf269f4 100644
Binary files a/logo.png and b/logo.png differ
";
    let diffs = parse_patch(text).unwrap();
    assert_eq!(diffs.len(), 1);
    let model = DiffModel::new();
    load(&model, diffs.into_iter().next().unwrap());
    match model.render_plan() {
        RenderPlan::Binary { header } => {
            assert_eq!(header, vec!["Binary files a/logo.png and b/logo.png differ"]);
        }
        other => panic!("expected binary plan, got {other:?}"),
    }
    assert!(model.groups().is_empty());
}

#[test]
fn skip_regions_request_content_and_render_after_reload() {
    init();
    let text = "\
diff --git a/big.rs b/big.rs
--- a/big.rs
+++ b/big.rs
@@ -1,2 +1,2 @@
 top
-first
+FIRST
@@ -500,2 +500,2 @@
 bottom
-last
+LAST
";
    let diff = parse_patch(text).unwrap().into_iter().next().unwrap();
    let model = DiffModel::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    model.subscribe(move |e| sink.lock().push(e.clone()));
    load(&model, diff);

    let control = model
        .groups()
        .iter()
        .position(|g| g.group_type == GroupType::ContextControl && g.has_skip_group())
        .expect("skip region collapses into a control");
    model.expand_context(control, ContextButtonType::All);
    let requested = events
        .lock()
        .iter()
        .find_map(|e| match e {
            ModelEvent::ContentLoadNeeded { line_range } => Some(*line_range),
            _ => None,
        })
        .expect("skip expansion requests a content load");
    assert!(requested.left.len() > 0);

    // The host fetches the full file and pushes a complete diff; the skip
    // region disappears.
    let full = DiffInfo {
        content: vec![
            DiffContentChunk {
                ab: Some((1..=501).map(|i| format!("line {i}")).collect()),
                ..Default::default()
            },
            DiffContentChunk {
                a: Some(vec!["last".into()]),
                b: Some(vec!["LAST".into()]),
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    load(&model, full);
    assert!(model.groups().iter().all(|g| !g.has_skip_group()));
    assert!(matches!(model.render_plan(), RenderPlan::Render { .. }));
}

#[test]
fn unified_and_side_by_side_agree_on_content() {
    init();
    let diff = parse_patch(SAMPLE_PATCH).unwrap().into_iter().next().unwrap();
    let model = DiffModel::new();
    load(&model, diff);

    // Right-side content with line numbers, independent of arrangement:
    // side-by-side reads it from the right slots, unified from every
    // non-removed slot.
    let right_lines = |rows: &[reviewdiff::render::TableRow]| -> Vec<(u32, String)> {
        rows.iter()
            .filter_map(|row| match row {
                reviewdiff::render::TableRow::SideBySide { right, .. } => right
                    .as_ref()
                    .and_then(|s| s.number(Side::Right).map(|n| (n, s.text.clone()))),
                reviewdiff::render::TableRow::Unified { slot } => slot
                    .number(Side::Right)
                    .map(|n| (n, slot.text.clone())),
                _ => None,
            })
            .collect()
    };

    let side_by_side = right_lines(&rendered_rows(&model));
    model
        .update_state(DiffStatePatch {
            render_prefs: Some(RenderPreferences {
                view_mode: DiffViewMode::Unified,
                ..Default::default()
            }),
            ..Default::default()
        })
        .unwrap();
    let unified = right_lines(&rendered_rows(&model));

    assert!(!side_by_side.is_empty());
    assert_eq!(side_by_side, unified);
}
