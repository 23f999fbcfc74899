//! Structured error types for the layout engine.
//!
//! Structural violations (malformed ruby markup) and unsupported constructs
//! abort the pass. Overflow conditions never appear here; they are accepted
//! degradations handled inside the flow algorithm.

use thiserror::Error;

/// The unified error type returned by all public layout API functions.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A ruby annotation marker (`rt`) appeared before any base content.
    #[error("ruby annotation has no preceding base to attach to")]
    AnnotationWithoutBase,

    /// A ruby pair ended up without annotation content (`rt` missing or empty).
    #[error("ruby pair is missing its annotation")]
    MissingAnnotation,

    /// A ruby pair's base produced no segments (empty `rb` or whitespace-only base).
    #[error("ruby base produced no content")]
    EmptyRubyBase,

    /// Out-of-flow content was added before any in-flow segment existed.
    #[error("out-of-flow content requires an in-flow anchor")]
    NoInFlowAnchor,

    /// A construct the engine deliberately does not handle (e.g. `rtc`).
    #[error("unsupported construct: {0}")]
    Unsupported(&'static str),

    /// JSON input failed to parse as a valid document.
    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Markup input failed to parse.
    #[error("failed to parse markup: {0}")]
    Markup(#[from] quick_xml::Error),
}
