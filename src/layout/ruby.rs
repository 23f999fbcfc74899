//! # Ruby Layout
//!
//! Pairs base text with its phonetic/glossing annotation and reconciles the
//! two widths during flow. The base participates in normal line breaking;
//! the annotation is out-of-flow, raised above the base, and partitioned
//! across the resulting base lines when the base group wraps.
//!
//! Pairing is positional, mirroring `<ruby>` markup: an `rb` element starts
//! a pair, a run of non-marker content before any marker is an implicit
//! base, and each `rt` attaches to the earliest still-unpaired base in
//! declaration order.

use std::collections::VecDeque;

use super::line::{LineBuilder, PendingAdjustment};
use super::{flow_segment, total_width, InlineLayout, LayoutRegistry, LayoutStrategy, Line, Segment, SegmentContent};
use crate::error::LayoutError;
use crate::measure::TextMeasurer;
use crate::model::{Node, NodeKind};
use crate::style::FontSpec;
use crate::text::BreakCursor;

/// Vertical offset of the annotation row above its base.
pub const RUBY_ANNOTATION_RAISE: f64 = -6.0;

/// Annotation font size as a fraction of the base font size.
pub const RUBY_ANNOTATION_SCALE: f64 = 0.5;

/// Base/annotation relationship, stored on the first base segment of a
/// pair and consumed during flow.
#[derive(Debug, Clone)]
pub(crate) struct RubyData {
    /// How many consecutive segments (starting here) form the base group.
    pub(crate) base_count: usize,
    /// Annotation segments, segmented with an isolated break context.
    pub(crate) annotation: Vec<Segment>,
}

/// One base group paired with exactly one annotation node.
pub(crate) struct RubyPair<'a> {
    pub(crate) base_nodes: Vec<&'a Node>,
    pub(crate) annotation_node: &'a Node,
}

struct PairInProgress<'a> {
    bases: Vec<&'a Node>,
    annotation: Option<&'a Node>,
}

impl<'a> RubyPair<'a> {
    /// Pair up the children of a `ruby` element.
    ///
    /// Structural violations (an `rt` with no base to attach to, or a base
    /// left without any annotation) abort the pass; content is never
    /// silently dropped. `rp` fallback parentheses are skipped; a second
    /// annotation tier (`rtc`) is rejected as unsupported.
    pub(crate) fn from_children(nodes: &'a [Node]) -> Result<Vec<RubyPair<'a>>, LayoutError> {
        let mut pairs: Vec<PairInProgress<'a>> = Vec::new();
        let mut implicit: Vec<&'a Node> = Vec::new();
        let mut annotation_index = 0usize;

        fn flush<'a>(pairs: &mut Vec<PairInProgress<'a>>, implicit: &mut Vec<&'a Node>) {
            if !implicit.is_empty() {
                pairs.push(PairInProgress {
                    bases: std::mem::take(implicit),
                    annotation: None,
                });
            }
        }

        for node in nodes {
            match &node.kind {
                NodeKind::Text { .. } => implicit.push(node),
                NodeKind::Element { tag } => match tag.as_str() {
                    "rb" => {
                        flush(&mut pairs, &mut implicit);
                        pairs.push(PairInProgress {
                            bases: vec![node],
                            annotation: None,
                        });
                    }
                    "rt" => {
                        flush(&mut pairs, &mut implicit);
                        let pair = pairs
                            .get_mut(annotation_index)
                            .ok_or(LayoutError::AnnotationWithoutBase)?;
                        pair.annotation = Some(node);
                        annotation_index += 1;
                    }
                    "rp" => {}
                    "rtc" => {
                        return Err(LayoutError::Unsupported(
                            "rtc (stacked annotation tiers)",
                        ))
                    }
                    _ => implicit.push(node),
                },
            }
        }
        flush(&mut pairs, &mut implicit);

        pairs
            .into_iter()
            .map(|pair| {
                Ok(RubyPair {
                    base_nodes: pair.bases,
                    annotation_node: pair.annotation.ok_or(LayoutError::MissingAnnotation)?,
                })
            })
            .collect()
    }
}

/// Layout strategy for `ruby` elements.
///
/// Composes the default inline strategy: bases and annotations are
/// segmented, measured, and row-packed by delegation, with the ruby rules
/// layered on top.
#[derive(Debug, Default)]
pub struct RubyLayout {
    inline: InlineLayout,
}

impl RubyLayout {
    pub fn new() -> Self {
        Self {
            inline: InlineLayout::new(),
        }
    }
}

impl LayoutStrategy for RubyLayout {
    fn segment(
        &self,
        element: &Node,
        style: &FontSpec,
        cursor: &mut BreakCursor,
        registry: &LayoutRegistry,
    ) -> Result<Vec<Segment>, LayoutError> {
        let pairs = RubyPair::from_children(&element.children)?;
        let mut segments: Vec<Segment> = Vec::new();
        for pair in &pairs {
            let base_start = segments.len();
            // The base is in-flow: it continues the surrounding break
            // context, and whatever follows the ruby continues after it.
            for base in &pair.base_nodes {
                self.inline
                    .segment_node(base, style, cursor, registry, &mut segments)?;
            }
            let base_count = segments.len() - base_start;
            if base_count == 0 {
                return Err(LayoutError::EmptyRubyBase);
            }

            // The annotation is out-of-flow: its internal breaking is
            // isolated in a fresh cursor, and it renders smaller.
            let annotation_spec = pair
                .annotation_node
                .style
                .resolve(style)
                .scaled(RUBY_ANNOTATION_SCALE);
            let mut annotation_cursor = BreakCursor::new();
            let mut annotation = Vec::new();
            self.inline.segment_nodes(
                &pair.annotation_node.children,
                &annotation_spec,
                &mut annotation_cursor,
                registry,
                &mut annotation,
            )?;
            if annotation.is_empty() {
                return Err(LayoutError::MissingAnnotation);
            }

            for segment in &mut segments[base_start..] {
                segment.ruby_base = true;
            }
            segments[base_start].ruby = Some(RubyData {
                base_count,
                annotation,
            });
        }
        Ok(segments)
    }

    fn measure(
        &self,
        segments: &mut [Segment],
        measurer: &dyn TextMeasurer,
        registry: &LayoutRegistry,
    ) {
        // Bases measure like any inline content.
        self.inline.measure(segments, measurer, registry);

        // Annotation totals and overhang are computed in flow, so the
        // bases' effective widths can still change there.
        for segment in segments.iter_mut() {
            if let Some(ruby) = segment.ruby.as_mut() {
                self.inline.measure(&mut ruby.annotation, measurer, registry);
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
        let mut remaining = segments;
        while !remaining.is_empty() {
            let Some(RubyData {
                base_count,
                annotation,
            }) = remaining[0].ruby.take()
            else {
                debug_assert!(false, "ruby segments flow in base groups");
                let stray = remaining.remove(0);
                flow_segment(stray, 0.0, builder, lines);
                continue;
            };
            let mut bases: Vec<Segment> = remaining.drain(..base_count).collect();

            let base_width = total_width(&bases);
            let annotation_width = total_width(&annotation);
            let base_margin = (annotation_width - base_width) / 2.0;

            // A wider annotation overhangs: half the excess pads the first
            // base's offset and the last base's width. Each side may
            // encroach into a non-ruby neighbor by up to a third of that
            // neighbor's font size; the right neighbor is not known yet, so
            // that side resolves through a deferred adjustment.
            let mut first_offset = 0.0;
            if base_margin > 0.0 {
                first_offset = match builder.last_pending() {
                    Some(prev) if !prev.ruby_base => {
                        (base_margin - prev.font.size / 3.0).max(0.0)
                    }
                    _ => base_margin,
                };
                let last = bases.last_mut().expect("base_count > 0");
                last.width += base_margin;
                last.pending_adjustment =
                    Some(PendingAdjustment::RubyOverhang { margin: base_margin });
            }

            let pending_before = builder.len();
            let line_count_before = lines.len();
            for (k, base) in bases.into_iter().enumerate() {
                let extra = if k == 0 { first_offset } else { 0.0 };
                if base.is_nested() {
                    // A registered element inside the base (nested ruby)
                    // keeps its own flow.
                    let SegmentContent::Nested { tag, children } = base.content else {
                        unreachable!("checked by is_nested");
                    };
                    match registry.get(&tag) {
                        Some(strategy) => strategy.flow(children, builder, lines, registry)?,
                        None => self.inline.flow(children, builder, lines, registry)?,
                    }
                } else {
                    flow_segment(base, extra, builder, lines);
                }
            }

            let committed_during: usize = lines[line_count_before..]
                .iter()
                .map(|line| line.len())
                .sum();
            let mut annotation: VecDeque<Segment> = annotation.into();

            if committed_during <= pending_before {
                // No break landed inside the pair: the whole annotation row
                // anchors above the first base.
                let mut row = LineBuilder::unbounded();
                row.indent(-base_margin);
                fill_annotation_row(&mut row, &mut annotation);
                let placed = row.commit_forced_break();
                let anchor_index = builder.len().saturating_sub(base_count);
                let anchor = builder.pending_segment_mut(anchor_index);
                for segment in placed.segments {
                    let x = segment.left;
                    anchor.attach_out_of_flow(segment, x, RUBY_ANNOTATION_RAISE);
                }
            } else {
                // The base group split across lines: give each base line as
                // much of the annotation as fits over that line's bases.
                self.distribute_annotation(
                    annotation,
                    base_margin,
                    pending_before,
                    line_count_before,
                    builder,
                    lines,
                );
            }
        }
        Ok(())
    }
}

impl RubyLayout {
    fn distribute_annotation(
        &self,
        mut annotation: VecDeque<Segment>,
        base_margin: f64,
        pending_before: usize,
        line_count_before: usize,
        builder: &mut LineBuilder,
        lines: &mut Vec<Line>,
    ) {
        enum RowAnchor {
            Committed { line: usize, start: usize },
            Pending,
        }

        // Collect the base rows: the tail of each committed line past any
        // pre-ruby content, plus the still-pending remainder.
        let mut rows: Vec<(RowAnchor, f64)> = Vec::new();
        let mut skip = pending_before;
        for index in line_count_before..lines.len() {
            let count = lines[index].len();
            if skip >= count {
                skip -= count;
                continue;
            }
            let width = total_width(&lines[index].segments[skip..]);
            rows.push((
                RowAnchor::Committed {
                    line: index,
                    start: skip,
                },
                width,
            ));
            skip = 0;
        }
        if !builder.is_empty() {
            rows.push((RowAnchor::Pending, total_width(builder.pending())));
        }

        let row_count = rows.len();
        let mut placed_rows = 0usize;
        for (row_index, (anchor, width)) in rows.into_iter().enumerate() {
            if annotation.is_empty() {
                break;
            }
            let last_row = row_index + 1 == row_count;
            let mut row = if last_row {
                LineBuilder::unbounded()
            } else {
                LineBuilder::new(width)
            };
            if row_index == 0 {
                row.indent(-base_margin);
            }
            fill_annotation_row(&mut row, &mut annotation);
            let placed = row.commit_forced_break();
            if placed.is_empty() {
                continue;
            }
            placed_rows += 1;
            let anchor_segment = match anchor {
                RowAnchor::Committed { line, start } => &mut lines[line].segments[start],
                RowAnchor::Pending => builder.pending_segment_mut(0),
            };
            for segment in placed.segments {
                let x = segment.left;
                anchor_segment.attach_out_of_flow(segment, x, RUBY_ANNOTATION_RAISE);
            }
        }
        log::debug!("distributed ruby annotation across {placed_rows} base line(s)");
        if !annotation.is_empty() {
            log::warn!(
                "dropping {} ruby annotation segment(s) that fit no base line",
                annotation.len()
            );
        }
    }
}

/// Move annotation segments into a row until one no longer fits.
fn fill_annotation_row(row: &mut LineBuilder, annotation: &mut VecDeque<Segment>) {
    while let Some(segment) = annotation.pop_front() {
        if let Err(rejected) = row.add(segment, 0.0) {
            annotation.push_front(rejected);
            break;
        }
    }
}
