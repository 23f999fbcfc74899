//! # Inline Layout Engine
//!
//! The heart of the crate. Content flows through four phases:
//!
//! 1. **segment**: walk the content tree and emit a flat, ordered list of
//!    [`Segment`]s, each tagged with the break opportunity after it. A
//!    shared [`BreakCursor`] keeps break state continuous across text runs
//!    and element boundaries.
//! 2. **measure**: an external [`TextMeasurer`] assigns width/height to
//!    every text segment.
//! 3. **flow**: a greedy [`LineBuilder`] packs segments into lines bounded
//!    by the available width, splitting at the most recent break
//!    opportunity on overflow.
//! 4. specialized strategies (ruby) attach out-of-flow content and
//!    reconcile widths between paired segment groups.
//!
//! Element tags map to strategies through a caller-owned
//! [`LayoutRegistry`]; unregistered elements are transparent inline
//! containers.

pub mod line;
pub mod ruby;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::LayoutError;
use crate::measure::TextMeasurer;
use crate::model::{Node, NodeKind};
use crate::style::{FontSpec, Style};
use crate::text::{BreakCursor, BreakOpportunity};

pub use line::{LineBuilder, PendingAdjustment};
pub use ruby::RubyLayout;

use ruby::RubyData;

/// Fixed gap inserted between words joined by a space-consuming break.
pub const WORD_SPACING: f64 = 10.0;

/// Break opportunity recorded after a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BreakAfter {
    /// Soft break that consumed an inter-word space.
    Space,
    /// Soft break between ideographs; no space consumed.
    Ideographic,
    /// Hard break; always taken.
    Forced,
}

impl BreakAfter {
    pub(crate) fn from_opportunity(opportunity: BreakOpportunity) -> Option<Self> {
        match opportunity {
            BreakOpportunity::None => None,
            BreakOpportunity::Space => Some(Self::Space),
            BreakOpportunity::NoSpace => Some(Self::Ideographic),
        }
    }
}

/// What a segment carries: a run of text, or the delegated output of a
/// registered strategy (kept nested so the strategy also controls flow).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentContent {
    Text(String),
    Nested {
        tag: String,
        children: Vec<Segment>,
    },
}

/// Atomic layout unit.
///
/// Created once by segmentation, sized by measurement, positioned by flow,
/// and immutable after it is committed into a [`Line`], except for
/// out-of-flow attachments, which never alter in-flow metrics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub content: SegmentContent,
    /// Break opportunity after this segment; `None` forbids breaking here.
    pub break_after: Option<BreakAfter>,
    /// Resolved font driving measurement.
    pub font: FontSpec,
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
    /// Out-of-flow boxes anchored to this segment (ruby annotations),
    /// positioned relative to this segment's top-left corner.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub out_of_flow: Vec<Segment>,
    /// True for every segment belonging to a ruby base group. Adjacent
    /// rubies must not overhang into each other.
    #[serde(skip)]
    pub ruby_base: bool,
    /// Ruby bookkeeping, stored on the first base segment of a pair and
    /// consumed during flow.
    #[serde(skip)]
    pub(crate) ruby: Option<RubyData>,
    /// Neighbor-dependent width correction, resolved by the line builder
    /// once the segment to the right is known.
    #[serde(skip)]
    pub pending_adjustment: Option<PendingAdjustment>,
}

impl Segment {
    /// A text segment with no size yet.
    pub fn text(text: impl Into<String>, font: FontSpec) -> Self {
        Self {
            content: SegmentContent::Text(text.into()),
            break_after: None,
            font,
            width: 0.0,
            height: 0.0,
            left: 0.0,
            top: 0.0,
            out_of_flow: Vec::new(),
            ruby_base: false,
            ruby: None,
            pending_adjustment: None,
        }
    }

    /// A nested run produced by a registered strategy.
    pub fn nested(tag: impl Into<String>, children: Vec<Segment>, font: FontSpec) -> Self {
        Self {
            content: SegmentContent::Nested {
                tag: tag.into(),
                children,
            },
            ..Self::text("", font)
        }
    }

    /// A pre-sized segment, for callers that measure elsewhere.
    pub fn sized(width: f64, break_after: Option<BreakAfter>) -> Self {
        let mut segment = Self::text("", FontSpec::default());
        segment.width = width;
        segment.break_after = break_after;
        segment
    }

    /// The text of this segment, if it is a text segment.
    pub fn text_content(&self) -> Option<&str> {
        match &self.content {
            SegmentContent::Text(text) => Some(text),
            SegmentContent::Nested { .. } => None,
        }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self.content, SegmentContent::Nested { .. })
    }

    /// Record a break opportunity after this segment.
    ///
    /// For a nested run the break belongs after its last inner segment, so
    /// it participates in the inner flow.
    pub(crate) fn set_break_after(&mut self, break_after: BreakAfter) {
        match &mut self.content {
            SegmentContent::Nested { children, .. } if !children.is_empty() => {
                children
                    .last_mut()
                    .expect("non-empty children")
                    .set_break_after(break_after);
            }
            _ => self.break_after = Some(break_after),
        }
    }

    /// Attach an out-of-flow box at an explicit offset relative to this
    /// segment. Out-of-flow content consumes no horizontal space.
    pub fn attach_out_of_flow(&mut self, mut segment: Segment, x: f64, y: f64) {
        segment.left = x;
        segment.top = y;
        self.out_of_flow.push(segment);
    }
}

/// Sum of segment widths, ignoring inter-word gaps and offsets.
pub(crate) fn total_width(segments: &[Segment]) -> f64 {
    segments.iter().map(|s| s.width).sum()
}

/// An ordered run of placed segments sharing a vertical band.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Line {
    pub segments: Vec<Segment>,
}

impl Line {
    /// Seal segments into a line. Unresolved width adjustments die here:
    /// once committed there is no right neighbor to resolve against.
    pub(crate) fn new(mut segments: Vec<Segment>) -> Self {
        for segment in &mut segments {
            segment.pending_adjustment = None;
        }
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Rightmost in-flow edge.
    pub fn width(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.left + s.width)
            .fold(0.0, f64::max)
    }

    /// Height of the tallest in-flow segment.
    pub fn height(&self) -> f64 {
        self.segments.iter().map(|s| s.height).fold(0.0, f64::max)
    }
}

/// The capability set a layout strategy provides for the subtree of an
/// element tag it is registered for.
pub trait LayoutStrategy {
    /// Turn the element's subtree into segments. Base-level content shares
    /// `cursor` so break state stays continuous with the surrounding text.
    fn segment(
        &self,
        element: &Node,
        style: &FontSpec,
        cursor: &mut BreakCursor,
        registry: &LayoutRegistry,
    ) -> Result<Vec<Segment>, LayoutError>;

    /// Assign sizes to the segments this strategy produced.
    fn measure(
        &self,
        segments: &mut [Segment],
        measurer: &dyn TextMeasurer,
        registry: &LayoutRegistry,
    );

    /// Flow the segments into the shared line builder.
    fn flow(
        &self,
        segments: Vec<Segment>,
        builder: &mut LineBuilder,
        lines: &mut Vec<Line>,
        registry: &LayoutRegistry,
    ) -> Result<(), LayoutError>;
}

/// Caller-owned mapping from element tag to layout strategy.
///
/// Populated before a layout pass and read-only during it. There is no
/// process-wide registry; every pass receives the registry it should use.
#[derive(Default)]
pub struct LayoutRegistry {
    strategies: HashMap<String, Box<dyn LayoutStrategy>>,
}

impl LayoutRegistry {
    /// An empty registry: every element is a transparent inline container.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in strategies: `ruby`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("ruby", Box::new(RubyLayout::new()));
        registry
    }

    pub fn register(&mut self, tag: &str, strategy: Box<dyn LayoutStrategy>) {
        self.strategies.insert(tag.to_string(), strategy);
    }

    pub fn get(&self, tag: &str) -> Option<&dyn LayoutStrategy> {
        self.strategies.get(tag).map(|s| s.as_ref())
    }
}

/// The default inline strategy: tokenize text, recurse through transparent
/// elements, delegate registered tags, flow greedily.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineLayout;

impl InlineLayout {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn segment_nodes(
        &self,
        nodes: &[Node],
        parent: &FontSpec,
        cursor: &mut BreakCursor,
        registry: &LayoutRegistry,
        out: &mut Vec<Segment>,
    ) -> Result<(), LayoutError> {
        for node in nodes {
            self.segment_node(node, parent, cursor, registry, out)?;
        }
        Ok(())
    }

    pub(crate) fn segment_node(
        &self,
        node: &Node,
        parent: &FontSpec,
        cursor: &mut BreakCursor,
        registry: &LayoutRegistry,
        out: &mut Vec<Segment>,
    ) -> Result<(), LayoutError> {
        let spec = node.style.resolve(parent);
        match &node.kind {
            NodeKind::Text { content } => {
                self.segment_str(content, &spec, cursor, out);
                Ok(())
            }
            NodeKind::Element { tag } if tag == "br" => {
                // A hard break binds to the previous segment; one before any
                // content has nothing to bind to and is dropped.
                if let Some(last) = out.last_mut() {
                    last.set_break_after(BreakAfter::Forced);
                }
                cursor.reset();
                Ok(())
            }
            NodeKind::Element { tag } => {
                if let Some(strategy) = registry.get(tag) {
                    let children = strategy.segment(node, &spec, cursor, registry)?;
                    out.push(Segment::nested(tag.clone(), children, spec));
                    Ok(())
                } else {
                    self.segment_nodes(&node.children, &spec, cursor, registry, out)
                }
            }
        }
    }

    /// Tokenize one string into segments, continuing the cursor's state.
    ///
    /// Consecutive non-separator characters group into one segment up to
    /// (but not including) the run of trailing separators; the break
    /// decision for a boundary is recorded on the segment *before* it.
    /// A break found on the very first character tags the last segment of a
    /// previous call, since segmentation runs repeatedly across sibling
    /// nodes.
    pub(crate) fn segment_str(
        &self,
        s: &str,
        font: &FontSpec,
        cursor: &mut BreakCursor,
        out: &mut Vec<Segment>,
    ) {
        if s.is_empty() {
            return;
        }
        let chars: Vec<(usize, char)> = s.char_indices().collect();
        let n = chars.len();
        let byte_at = |k: usize| if k < n { chars[k].0 } else { s.len() };

        // Leading scan: consume word separators; a break opportunity here
        // belongs to whatever segment came before this string.
        let mut i = 0;
        while i < n {
            let opportunity = cursor.break_before(chars[i].1);
            if opportunity != BreakOpportunity::None {
                if let (Some(last), Some(break_after)) =
                    (out.last_mut(), BreakAfter::from_opportunity(opportunity))
                {
                    last.set_break_after(break_after);
                }
                break;
            }
            if !cursor.at_word_separator() {
                break;
            }
            i += 1;
        }
        if i >= n {
            return;
        }

        let mut begin = i;
        let mut last_space: Option<usize> = None;
        i += 1;
        while i < n {
            let opportunity = cursor.break_before(chars[i].1);
            if opportunity == BreakOpportunity::None {
                if !cursor.at_word_separator() {
                    last_space = None;
                } else if last_space.is_none() {
                    last_space = Some(i);
                }
                i += 1;
                continue;
            }
            // Cut the segment at the separator run if there was one.
            let end = last_space.unwrap_or(i);
            debug_assert!(end > begin, "segments carry non-empty text");
            let mut segment = Segment::text(&s[byte_at(begin)..byte_at(end)], font.clone());
            segment.break_after = BreakAfter::from_opportunity(opportunity);
            out.push(segment);
            begin = i;
            last_space = None;
            i += 1;
        }

        // Trailing segment; separators after the last word collapse and no
        // break is recorded until the next string decides one exists.
        let end = last_space.unwrap_or(n);
        debug_assert!(end > begin, "segments carry non-empty text");
        out.push(Segment::text(&s[byte_at(begin)..byte_at(end)], font.clone()));
    }
}

impl LayoutStrategy for InlineLayout {
    fn segment(
        &self,
        element: &Node,
        style: &FontSpec,
        cursor: &mut BreakCursor,
        registry: &LayoutRegistry,
    ) -> Result<Vec<Segment>, LayoutError> {
        let mut out = Vec::new();
        self.segment_nodes(&element.children, style, cursor, registry, &mut out)?;
        Ok(out)
    }

    fn measure(
        &self,
        segments: &mut [Segment],
        measurer: &dyn TextMeasurer,
        registry: &LayoutRegistry,
    ) {
        for segment in segments.iter_mut() {
            match &mut segment.content {
                SegmentContent::Nested { tag, children } => match registry.get(tag) {
                    Some(strategy) => strategy.measure(children, measurer, registry),
                    None => self.measure(children, measurer, registry),
                },
                SegmentContent::Text(text) => {
                    let extents = measurer.measure(text, &segment.font);
                    segment.width = extents.width;
                    segment.height = extents.height;
                }
            }
        }
    }

    fn flow(
        &self,
        segments: Vec<Segment>,
        builder: &mut LineBuilder,
        lines: &mut Vec<Line>,
        registry: &LayoutRegistry,
    ) -> Result<(), LayoutError> {
        for segment in segments {
            if segment.is_nested() {
                let SegmentContent::Nested { tag, children } = segment.content else {
                    unreachable!("checked by is_nested");
                };
                match registry.get(&tag) {
                    Some(strategy) => strategy.flow(children, builder, lines, registry)?,
                    None => self.flow(children, builder, lines, registry)?,
                }
                continue;
            }
            let forced = segment.break_after == Some(BreakAfter::Forced);
            flow_segment(segment, 0.0, builder, lines);
            if forced {
                lines.push(builder.commit_forced_break());
            }
        }
        Ok(())
    }
}

/// Place one segment, committing lines as needed.
///
/// On overflow the builder commits at its most recent break opportunity and
/// the segment retries on the carried-over remainder. A run with no break
/// opportunity commits wholesale (emergency break at the overflow point),
/// and a lone segment wider than the line is placed as accepted overflow.
pub(crate) fn flow_segment(
    segment: Segment,
    extra_offset: f64,
    builder: &mut LineBuilder,
    lines: &mut Vec<Line>,
) {
    let mut segment = segment;
    loop {
        match builder.add(segment, extra_offset) {
            Ok(()) => return,
            Err(rejected) => {
                if builder.is_empty() {
                    builder.force_add(rejected, extra_offset);
                    return;
                }
                let line = if builder.has_break_opportunity() {
                    builder.commit()
                } else {
                    builder.commit_forced_break()
                };
                lines.push(line);
                segment = rejected;
            }
        }
    }
}

/// Lay out a block of content: segment, measure, and flow into lines.
///
/// This is atomic from the caller's point of view: it either returns the
/// full set of lines or an error, with nothing partially placed.
pub fn layout_nodes(
    nodes: &[Node],
    base: &Style,
    max_width: f64,
    measurer: &dyn TextMeasurer,
    registry: &LayoutRegistry,
) -> Result<Vec<Line>, LayoutError> {
    let root = base.resolve(&FontSpec::default());
    let inline = InlineLayout::new();

    let mut cursor = BreakCursor::new();
    let mut segments = Vec::new();
    inline.segment_nodes(nodes, &root, &mut cursor, registry, &mut segments)?;
    inline.measure(&mut segments, measurer, registry);

    let mut builder = LineBuilder::new(max_width);
    let mut lines = Vec::new();
    inline.flow(segments, &mut builder, &mut lines, registry)?;
    let last = builder.commit_forced_break();
    if !last.is_empty() {
        lines.push(last);
    }
    log::debug!("laid out {} line(s) at max width {max_width}", lines.len());
    Ok(lines)
}
