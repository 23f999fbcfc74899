//! # Kumi
//!
//! An inline layout engine: Unicode-aware line breaking, greedy line flow,
//! and ruby annotation placement.
//!
//! Given a tree of styled text content, kumi decides where lines may
//! legally break, packs runs of text into lines bounded by a maximum
//! width, and positions ruby annotations above their base text, splitting
//! an annotation across multiple lines when its base wraps.
//!
//! ## Architecture
//!
//! ```text
//! Input (markup / JSON / API)
//!       ↓
//!   [model]    — Content tree: text and element nodes
//!       ↓
//!   [style]    — Resolve font properties through the cascade
//!       ↓
//!   [text]     — Break classes and incremental break opportunities
//!       ↓
//!   [layout]   — Segment, measure, and flow into lines;
//!                ruby pairing, overhang, and annotation distribution
//!       ↓
//!   Lines of placed segments, rendered by the caller
//! ```
//!
//! Measurement is an external collaborator: the engine asks a
//! [`measure::TextMeasurer`] for the extents of short text runs and never
//! touches glyph data. Element semantics come from a caller-owned
//! [`layout::LayoutRegistry`]; `layout::RubyLayout` is registered for
//! `ruby` by default, everything else is a transparent inline container.
//!
//! Out of scope: bidirectional text, hyphenation, justification, vertical
//! writing modes, and incremental relayout.

pub mod error;
pub mod layout;
pub mod measure;
pub mod model;
pub mod style;
pub mod text;

use error::LayoutError;
use layout::{layout_nodes, LayoutRegistry, Line};
use measure::TextMeasurer;
use model::Document;

/// Lay out a document into lines bounded by `max_width`.
///
/// This is the primary entry point. The pass is atomic: it returns the
/// complete set of lines, or an error with nothing placed.
pub fn layout(
    document: &Document,
    max_width: f64,
    measurer: &dyn TextMeasurer,
    registry: &LayoutRegistry,
) -> Result<Vec<Line>, LayoutError> {
    layout_nodes(
        &document.children,
        &document.style,
        max_width,
        measurer,
        registry,
    )
}

/// Lay out a document described as JSON.
pub fn layout_json(
    json: &str,
    max_width: f64,
    measurer: &dyn TextMeasurer,
    registry: &LayoutRegistry,
) -> Result<Vec<Line>, LayoutError> {
    let document: Document = serde_json::from_str(json)?;
    layout(&document, max_width, measurer, registry)
}

/// Lay out a well-formed markup fragment (e.g. `a<ruby>漢<rt>かん</rt></ruby>`).
pub fn layout_markup(
    markup: &str,
    max_width: f64,
    measurer: &dyn TextMeasurer,
    registry: &LayoutRegistry,
) -> Result<Vec<Line>, LayoutError> {
    let document = Document {
        children: model::from_markup(markup)?,
        style: style::Style::default(),
    };
    layout(&document, max_width, measurer, registry)
}
