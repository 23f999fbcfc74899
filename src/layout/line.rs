//! # Line Builder
//!
//! Greedy packing of segments into a line of bounded width. The builder
//! accepts segments one at a time, tracks the running horizontal offset and
//! the most recent break opportunity, and on commit splits the pending run
//! into a finished line and a carried-over remainder.
//!
//! A segment's width may not be final until its right neighbor is known
//! (ruby overhang). Such segments carry a [`PendingAdjustment`] descriptor;
//! the builder resolves all descriptors in the window between two confirmed
//! breaks exactly once, propagating any width delta into the positions of
//! later pending segments.

use super::{BreakAfter, Line, Segment, WORD_SPACING};
use crate::error::LayoutError;

/// Neighbor-dependent width correction attached to a pending segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PendingAdjustment {
    /// The segment reserved `margin` of trailing ruby overhang. If the
    /// right neighbor turns out not to be a ruby base, the annotation may
    /// encroach into the neighbor's space by up to a third of the
    /// neighbor's font size, shrinking the reservation.
    RubyOverhang { margin: f64 },
}

/// Greedy line packing state.
#[derive(Debug)]
pub struct LineBuilder {
    pending: Vec<Segment>,
    cursor_x: f64,
    max_width: f64,
    word_spacing: f64,
    last_break_index: Option<usize>,
    /// Pending indices below this are already adjustment-resolved.
    adjusted_up_to: usize,
}

impl LineBuilder {
    pub fn new(max_width: f64) -> Self {
        Self {
            pending: Vec::new(),
            cursor_x: 0.0,
            max_width,
            word_spacing: WORD_SPACING,
            last_break_index: None,
            adjusted_up_to: 0,
        }
    }

    /// A builder that never overflows. Ruby annotation rows use this.
    pub fn unbounded() -> Self {
        Self::new(f64::INFINITY)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn cursor_x(&self) -> f64 {
        self.cursor_x
    }

    /// Is there a boundary a plain `commit` could split at?
    pub fn has_break_opportunity(&self) -> bool {
        self.last_break_index.is_some()
    }

    pub fn pending(&self) -> &[Segment] {
        &self.pending
    }

    /// The most recently added in-flow segment, if any.
    pub fn last_pending(&self) -> Option<&Segment> {
        self.pending.last()
    }

    pub(crate) fn pending_segment_mut(&mut self, index: usize) -> &mut Segment {
        &mut self.pending[index]
    }

    /// Shift the cursor before anything is placed. Ruby annotation rows
    /// start at `-overhang/2` so the annotation centers over its base.
    pub fn indent(&mut self, dx: f64) {
        debug_assert!(self.pending.is_empty(), "indent applies to an empty line");
        self.cursor_x += dx;
    }

    /// Try to place a segment at the cursor (plus `extra_offset`).
    ///
    /// On overflow the segment is handed back untouched and the builder is
    /// unchanged. On success the segment is positioned, the cursor advances
    /// past it (plus the inter-word gap for a space break), and a recorded
    /// break opportunity triggers adjustment resolution for the segments
    /// whose right neighbor is now known.
    pub fn add(&mut self, segment: Segment, extra_offset: f64) -> Result<(), Segment> {
        if self.cursor_x + extra_offset + segment.width > self.max_width {
            return Err(segment);
        }
        self.push(segment, extra_offset);
        Ok(())
    }

    /// Place a segment even if it overflows the line.
    ///
    /// Accepted-overflow policy for a segment that alone exceeds the
    /// available width; there is no forced character break.
    pub fn force_add(&mut self, segment: Segment, extra_offset: f64) {
        if self.cursor_x + extra_offset + segment.width > self.max_width {
            log::warn!(
                "segment wider than available width ({:.1} > {:.1}); placing with overflow",
                self.cursor_x + extra_offset + segment.width,
                self.max_width
            );
        }
        self.push(segment, extra_offset);
    }

    fn push(&mut self, mut segment: Segment, extra_offset: f64) {
        self.place(&mut segment, extra_offset);
        let index = self.pending.len();
        let breaks = segment.break_after.is_some();
        self.pending.push(segment);
        if breaks {
            self.last_break_index = Some(index);
            self.resolve_adjustments(index);
        }
    }

    fn place(&mut self, segment: &mut Segment, extra_offset: f64) {
        segment.left = self.cursor_x + extra_offset;
        segment.top = 0.0;
        self.cursor_x += extra_offset + segment.width;
        if segment.break_after == Some(BreakAfter::Space) {
            self.cursor_x += self.word_spacing;
        }
    }

    /// Resolve every pending adjustment whose right neighbor became known
    /// when the break at `confirmed` was recorded. Each descriptor fires
    /// exactly once; width deltas shift later segments and the cursor.
    fn resolve_adjustments(&mut self, confirmed: usize) {
        for index in self.adjusted_up_to..confirmed {
            let Some(adjustment) = self.pending[index].pending_adjustment.take() else {
                continue;
            };
            let (neighbor_is_ruby, neighbor_font_size) = {
                let neighbor = &self.pending[index + 1];
                (neighbor.ruby_base, neighbor.font.size)
            };
            let delta = match adjustment {
                PendingAdjustment::RubyOverhang { margin } => {
                    if neighbor_is_ruby {
                        0.0
                    } else {
                        -margin.min(neighbor_font_size / 3.0)
                    }
                }
            };
            if delta != 0.0 {
                self.pending[index].width += delta;
                for later in &mut self.pending[index + 1..] {
                    later.left += delta;
                }
                self.cursor_x += delta;
                log::trace!("resolved deferred width at index {index}: delta {delta:.2}");
            }
        }
        self.adjusted_up_to = confirmed;
    }

    /// Commit up to (and including) the most recent break opportunity.
    ///
    /// The remainder stays pending, re-anchored to start at zero. With no
    /// recorded break nothing leaves the builder and the returned line is
    /// empty; when the break is the final pending segment this behaves as
    /// [`Self::commit_forced_break`].
    pub fn commit(&mut self) -> Line {
        let Some(break_index) = self.last_break_index else {
            return Line::default();
        };
        if break_index + 1 == self.pending.len() {
            return self.commit_forced_break();
        }
        let remainder = self.pending.split_off(break_index + 1);
        let committed = std::mem::take(&mut self.pending);
        self.reset_flow_state();
        for mut segment in remainder {
            // Remainder segments sit after the last break, so none re-adds
            // an inter-word gap here.
            self.place(&mut segment, 0.0);
            self.pending.push(segment);
        }
        log::debug!(
            "committed {} segment(s); {} carried over",
            committed.len(),
            self.pending.len()
        );
        Line::new(committed)
    }

    /// Take every pending segment unconditionally (end of content, or a
    /// hard break) and reset.
    pub fn commit_forced_break(&mut self) -> Line {
        let committed = std::mem::take(&mut self.pending);
        self.reset_flow_state();
        Line::new(committed)
    }

    /// Attach an out-of-flow box to the most recently added in-flow
    /// segment at an explicit offset. Consumes no horizontal space.
    pub fn add_out_of_flow(
        &mut self,
        segment: Segment,
        x: f64,
        y: f64,
    ) -> Result<(), LayoutError> {
        let anchor = self
            .pending
            .last_mut()
            .ok_or(LayoutError::NoInFlowAnchor)?;
        anchor.attach_out_of_flow(segment, x, y);
        Ok(())
    }

    fn reset_flow_state(&mut self) {
        self.cursor_x = 0.0;
        self.last_break_index = None;
        self.adjusted_up_to = 0;
    }
}
