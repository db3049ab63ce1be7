//! Core engine for rendering code-review diffs.
//!
//! The crate is host-agnostic: it owns the data model, grouping, context
//! collapsing, selection reconstruction, and hovercard behavior of a diff
//! view, and leaves painting to the embedding UI. The usual flow:
//!
//! 1. Obtain a [`domain::DiffInfo`], either from the review backend's structured
//!    payload, or from raw patch text via [`patch::parse_patch`].
//! 2. Push it into a [`model::DiffModel`] together with
//!    [`domain::DiffPreferences`], and subscribe for
//!    [`model::ModelEvent`]s.
//! 3. Ask the model for a [`model::RenderPlan`] and paint its rows; feed
//!    expand clicks back through [`model::DiffModel::expand_context`].
//! 4. Route selection gestures through [`select::selected_text`] and hover
//!    gestures through [`hover`].

pub mod context;
pub mod domain;
pub mod group;
pub mod hover;
pub mod model;
pub mod patch;
pub mod render;
pub mod select;

pub use domain::{DiffContentChunk, DiffError, DiffInfo, DiffPreferences, Side, WHOLE_FILE};
pub use model::{DiffModel, DiffStatePatch, ModelEvent, RenderPlan};
