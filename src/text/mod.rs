//! # Line Breaking
//!
//! Decides where text may legally break. Code points are bucketed into a
//! small set of classes via the UAX#14 property table from the
//! `unicode-linebreak` crate, then a fixed rule table decides whether a
//! break opportunity exists between two successive classes and whether
//! taking it consumes an inter-word space.
//!
//! The stateful [`BreakCursor`] lets the segmenter compute breaks
//! incrementally, character by character, across segment and element
//! boundaries without re-scanning prior text.

use unicode_linebreak::{break_property, BreakClass as UnicodeClass};

/// Line-break category of a code point, reduced to the classes the flow
/// algorithm distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakClass {
    /// Sentinel for "no character seen yet on this line".
    BeginningOfLine,
    /// Word separator.
    Space,
    /// Opening bracket or quote; no break after.
    OpenPunctuation,
    /// Closing bracket, comma, full stop; no break before.
    ClosePunctuation,
    /// CJK ideograph or kana; breaks freely on both sides.
    Ideographic,
    /// Everything else.
    Alphabetic,
}

/// Result of comparing two successive break classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakOpportunity {
    /// No break allowed here.
    None,
    /// Break allowed; an inter-word space is consumed by the break.
    Space,
    /// Break allowed with no space consumed (between adjacent ideographs).
    NoSpace,
}

/// Classify a single code point.
///
/// Table lookup through the UAX#14 property data, collapsed onto the small
/// class set above with `Alphabetic` as the fallback for anything unmapped.
pub fn classify(ch: char) -> BreakClass {
    match break_property(ch as u32) {
        UnicodeClass::Space => BreakClass::Space,
        UnicodeClass::OpenPunctuation => BreakClass::OpenPunctuation,
        UnicodeClass::ClosePunctuation | UnicodeClass::CloseParenthesis => {
            BreakClass::ClosePunctuation
        }
        UnicodeClass::Ideographic | UnicodeClass::ConditionalJapaneseStarter => {
            BreakClass::Ideographic
        }
        _ => BreakClass::Alphabetic,
    }
}

/// Decide whether a break opportunity exists between `prev` and `next`.
///
/// First-match rule table:
/// - nothing breaks at the beginning of a line;
/// - a space allows a break before anything except another space;
/// - no break after an opening bracket;
/// - ideographs break against anything except closing punctuation;
/// - anything else breaks before an ideograph.
pub fn break_opportunity(prev: BreakClass, next: BreakClass) -> BreakOpportunity {
    match prev {
        BreakClass::BeginningOfLine => BreakOpportunity::None,
        BreakClass::Space => {
            if next == BreakClass::Space {
                BreakOpportunity::None
            } else {
                BreakOpportunity::Space
            }
        }
        BreakClass::OpenPunctuation => BreakOpportunity::None,
        BreakClass::Ideographic => {
            if next == BreakClass::ClosePunctuation {
                BreakOpportunity::None
            } else {
                BreakOpportunity::NoSpace
            }
        }
        _ => {
            if next == BreakClass::Ideographic {
                BreakOpportunity::NoSpace
            } else {
                BreakOpportunity::None
            }
        }
    }
}

/// Can a line break between these two adjacent characters?
pub fn can_break_between(a: char, b: char) -> bool {
    break_opportunity(classify(a), classify(b)) != BreakOpportunity::None
}

/// Incremental break-state machine.
///
/// Holds the class of the last character examined so breaks can be decided
/// one character at a time. Segmentation passes a cursor explicitly through
/// every call; ruby annotations get a fresh cursor so their internal breaking
/// is isolated from the surrounding paragraph.
#[derive(Debug, Clone)]
pub struct BreakCursor {
    last: BreakClass,
}

impl Default for BreakCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakCursor {
    pub fn new() -> Self {
        Self {
            last: BreakClass::BeginningOfLine,
        }
    }

    /// Is there a break opportunity before `ch`?
    ///
    /// Advances the cursor: `ch` becomes the last seen character.
    pub fn break_before(&mut self, ch: char) -> BreakOpportunity {
        let class = classify(ch);
        let opportunity = break_opportunity(self.last, class);
        self.last = class;
        opportunity
    }

    /// Convenience wrapper over [`Self::break_before`].
    pub fn can_break_before(&mut self, ch: char) -> bool {
        self.break_before(ch) != BreakOpportunity::None
    }

    /// Was the last examined character a word separator?
    pub fn at_word_separator(&self) -> bool {
        self.last == BreakClass::Space
    }

    /// Forget all state, as if at the start of a fresh line.
    pub fn reset(&mut self) {
        self.last = BreakClass::BeginningOfLine;
    }
}
