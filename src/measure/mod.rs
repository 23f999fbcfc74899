//! # Text Measurement
//!
//! Measurement is an external collaborator: the engine asks for the extents
//! of a short, single-line run of text under a resolved font and never
//! touches glyph data itself. Real consumers implement [`TextMeasurer`] on
//! top of whatever font stack they render with.
//!
//! [`FallbackMetrics`] provides deterministic average-advance measurement so
//! the engine is usable (and testable) without any font stack, the same way
//! a renderer falls back to built-in metrics when no face is available.

use crate::style::FontSpec;

/// Measured extents of a single-line run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub width: f64,
    pub height: f64,
}

/// Width/height provider for short text runs.
///
/// The run is assumed not to wrap; multi-rectangle results are out of scope.
pub trait TextMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> Extents;
}

/// Deterministic measurement from built-in average advances.
///
/// Advances are em fractions scaled by the font size: fullwidth East Asian
/// characters take a full em, everything else an average Latin advance.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackMetrics;

impl FallbackMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Advance of a single character as a fraction of an em.
    fn char_advance_em(ch: char) -> f64 {
        if is_fullwidth(ch) {
            1.0
        } else if ch == ' ' {
            0.28
        } else if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
            0.6
        } else {
            0.5
        }
    }
}

impl TextMeasurer for FallbackMetrics {
    fn measure(&self, text: &str, font: &FontSpec) -> Extents {
        let width: f64 = text
            .chars()
            .map(|ch| Self::char_advance_em(ch) * font.size)
            .sum();
        Extents {
            width,
            height: font.size,
        }
    }
}

/// Does this character occupy a full em cell?
///
/// Covers the CJK ideograph, kana, hangul, and fullwidth-forms blocks.
fn is_fullwidth(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x2FFFD
        | 0x30000..=0x3FFFD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullwidth_takes_one_em() {
        let font = FontSpec {
            family: "sans-serif".to_string(),
            size: 20.0,
        };
        let extents = FallbackMetrics::new().measure("漢字", &font);
        assert_eq!(extents.width, 40.0);
        assert_eq!(extents.height, 20.0);
    }

    #[test]
    fn test_latin_narrower_than_cjk() {
        let font = FontSpec::default();
        let metrics = FallbackMetrics::new();
        let latin = metrics.measure("ab", &font);
        let cjk = metrics.measure("ああ", &font);
        assert!(latin.width < cjk.width);
    }

    #[test]
    fn test_scales_with_font_size() {
        let metrics = FallbackMetrics::new();
        let small = FontSpec {
            family: "sans-serif".to_string(),
            size: 10.0,
        };
        let large = FontSpec {
            family: "sans-serif".to_string(),
            size: 20.0,
        };
        assert_eq!(
            metrics.measure("あ", &small).width * 2.0,
            metrics.measure("あ", &large).width
        );
    }
}
