//! Integration tests for the full layout pipeline.
//!
//! These tests exercise the path from markup (or JSON) input to placed
//! lines. They verify:
//! - segmentation keeps break state continuous across node boundaries
//! - greedy flow splits lines at break opportunities and re-anchors carry-over
//! - ruby pairs attach annotations out-of-flow, with overhang reconciliation
//! - annotations split across base lines when the base wraps
//! - structural violations abort the pass

use kumi::error::LayoutError;
use kumi::layout::{LayoutRegistry, Line};
use kumi::measure::{Extents, TextMeasurer};
use kumi::model::{Document, Node};
use kumi::style::FontSpec;

// ─── Helpers ────────────────────────────────────────────────────

/// Monospace em grid: every character advances one em. Keeps expected
/// positions trivial to compute by hand.
struct Mono;

impl TextMeasurer for Mono {
    fn measure(&self, text: &str, font: &FontSpec) -> Extents {
        Extents {
            width: text.chars().count() as f64 * font.size,
            height: font.size,
        }
    }
}

fn lay(markup: &str, max_width: f64) -> Vec<Line> {
    let registry = LayoutRegistry::with_defaults();
    kumi::layout_markup(markup, max_width, &Mono, &registry).expect("layout should succeed")
}

fn lay_err(markup: &str, max_width: f64) -> LayoutError {
    let registry = LayoutRegistry::with_defaults();
    kumi::layout_markup(markup, max_width, &Mono, &registry)
        .err()
        .expect("layout should fail")
}

fn texts(line: &Line) -> Vec<&str> {
    line.segments
        .iter()
        .map(|s| s.text_content().unwrap_or("<nested>"))
        .collect()
}

// ─── Plain text flow ────────────────────────────────────────────

#[test]
fn test_two_words_on_one_line() {
    let lines = lay("aa bb", 200.0);
    assert_eq!(lines.len(), 1);
    assert_eq!(texts(&lines[0]), vec!["aa", "bb"]);
    assert_eq!(lines[0].segments[0].left, 0.0);
    // 40 wide plus the 10-unit inter-word gap.
    assert_eq!(lines[0].segments[1].left, 50.0);
}

#[test]
fn test_words_wrap_one_per_line() {
    let lines = lay("The quick brown fox", 100.0);
    assert_eq!(lines.len(), 4, "every word needs its own line at width 100");
    for line in &lines {
        assert_eq!(line.len(), 1);
        assert_eq!(line.segments[0].left, 0.0);
    }
}

#[test]
fn test_break_state_continues_across_elements() {
    // The space before the element boundary must still produce a break
    // between "ab" and "c".
    let lines = lay("ab <span>c</span>", 500.0);
    assert_eq!(lines.len(), 1);
    assert_eq!(texts(&lines[0]), vec!["ab", "c"]);
    assert_eq!(lines[0].segments[1].left, 50.0);
}

#[test]
fn test_ideographs_wrap_without_gaps() {
    let lines = lay("ああああ", 50.0);
    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert_eq!(line.len(), 2);
        assert_eq!(line.segments[0].left, 0.0);
        // No inter-word gap between ideographs.
        assert_eq!(line.segments[1].left, 20.0);
    }
}

#[test]
fn test_closing_punctuation_stays_with_ideograph() {
    let lines = lay("あ。あ", 500.0);
    assert_eq!(lines.len(), 1);
    assert_eq!(texts(&lines[0]), vec!["あ。", "あ"]);
    assert_eq!(lines[0].segments[1].left, 40.0);
}

#[test]
fn test_forced_break() {
    let lines = lay("aa<br/>bb", 500.0);
    assert_eq!(lines.len(), 2);
    assert_eq!(texts(&lines[0]), vec!["aa"]);
    assert_eq!(texts(&lines[1]), vec!["bb"]);
}

#[test]
fn test_oversized_word_is_accepted_overflow() {
    let lines = lay("internationalization", 120.0);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].len(), 1);
    assert!(lines[0].width() > 120.0);
}

#[test]
fn test_committed_lines_respect_max_width() {
    let lines = lay(
        "words of fairly even size wrap into tidy rows あいうえおかきくけこ and more",
        120.0,
    );
    assert!(lines.len() > 2);
    for line in &lines {
        assert!(
            line.width() <= 120.0 || line.len() == 1,
            "line {:?} wider than the limit",
            texts(line)
        );
    }
}

#[test]
fn test_line_height_follows_font() {
    let lines = lay("aa bb", 500.0);
    assert_eq!(lines[0].height(), 20.0);
}

#[test]
fn test_fallback_metrics_end_to_end() {
    use kumi::measure::FallbackMetrics;
    let registry = LayoutRegistry::with_defaults();
    let lines =
        kumi::layout_markup("Latin ああ", 500.0, &FallbackMetrics::new(), &registry).unwrap();
    assert_eq!(lines.len(), 1);
    // 'L' at 0.6 em, the rest at 0.5 em, at font size 20.
    assert!((lines[0].segments[0].width - 52.0).abs() < 1.0e-9);
    // Ideographs take a full em each.
    assert!((lines[0].segments[1].width - 20.0).abs() < 1.0e-9);
}

// ─── Ruby ───────────────────────────────────────────────────────

#[test]
fn test_ruby_annotation_attaches_above_first_base() {
    let lines = lay("<ruby>漢字<rt>かんじ</rt></ruby>", 500.0);
    assert_eq!(lines.len(), 1);
    // Two base segments flow like normal ideographs.
    assert_eq!(texts(&lines[0]), vec!["漢", "字"]);
    let first_base = &lines[0].segments[0];
    assert_eq!(first_base.out_of_flow.len(), 3);
    // Annotation is narrower than the base (30 vs 40): centered by
    // starting half the difference in.
    assert_eq!(first_base.out_of_flow[0].left, 5.0);
    assert!(first_base.out_of_flow[0].top < 0.0, "annotation sits above");
    // Annotation renders at half the base font size.
    assert_eq!(first_base.out_of_flow[0].font.size, 10.0);
    assert_eq!(lines[0].segments[1].out_of_flow.len(), 0);
}

#[test]
fn test_ruby_wider_annotation_overhangs_base() {
    let lines = lay("<ruby>字<rt>かんじ</rt></ruby>", 500.0);
    assert_eq!(lines.len(), 1);
    let base = &lines[0].segments[0];
    // Annotation 30 vs base 20: 5 of offset, 5 folded into the width.
    assert_eq!(base.left, 5.0);
    assert_eq!(base.width, 25.0);
    assert_eq!(base.out_of_flow[0].left, -5.0);
}

#[test]
fn test_ruby_overhang_shrinks_into_following_text() {
    let lines = lay("<ruby>字<rt>かんじ</rt></ruby>やや まま", 500.0);
    assert_eq!(lines.len(), 1);
    let base = &lines[0].segments[0];
    // The trailing reservation gave way once the neighbor turned out to be
    // plain text: shrink by min(margin, neighbor font size / 3) = 5.
    assert_eq!(base.left, 5.0);
    assert_eq!(base.width, 20.0);
    // The following ideograph starts right after the shrunk base.
    assert_eq!(lines[0].segments[1].left, 25.0);
    // Annotation still overhangs the base on both sides.
    assert_eq!(base.out_of_flow[0].left, -5.0);
}

#[test]
fn test_ruby_annotation_distributes_across_wrapped_base() {
    let lines = lay(
        "<ruby>ああああああ<rt>かかかかかか</rt></ruby>",
        50.0,
    );
    assert_eq!(lines.len(), 3);
    let annotated: Vec<usize> = lines
        .iter()
        .map(|line| {
            line.segments
                .iter()
                .map(|s| s.out_of_flow.len())
                .sum::<usize>()
        })
        .collect();
    let placed: usize = annotated.iter().sum();
    assert_eq!(placed, 6, "all six annotation segments are placed");
    assert!(
        annotated.iter().filter(|&&n| n > 0).count() >= 2,
        "annotation must split across base lines, got {annotated:?}"
    );
    // Annotations anchor only to the first base of each line.
    for line in &lines {
        for segment in &line.segments[1..] {
            assert!(segment.out_of_flow.is_empty());
        }
    }
}

#[test]
fn test_ruby_inside_running_text() {
    let lines = lay(
        "これは<ruby>漢字<rt>かんじ</rt></ruby>です",
        500.0,
    );
    assert_eq!(lines.len(), 1);
    assert_eq!(
        texts(&lines[0]),
        vec!["こ", "れ", "は", "漢", "字", "で", "す"]
    );
    // The pair is annotation-narrower, so bases sit flush.
    assert_eq!(lines[0].segments[3].left, 60.0);
    assert_eq!(lines[0].segments[3].out_of_flow.len(), 3);
}

#[test]
fn test_ruby_explicit_rb_rt_pairs() {
    let lines = lay(
        "<ruby><rb>東</rb><rb>京</rb><rt>とう</rt><rt>きょう</rt></ruby>",
        500.0,
    );
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert_eq!(texts(line), vec!["東", "京"]);
    // Each base carries its own annotation.
    assert_eq!(line.segments[0].out_of_flow.len(), 2);
    assert!(!line.segments[1].out_of_flow.is_empty());
}

#[test]
fn test_ruby_rp_fallback_is_ignored() {
    let lines = lay(
        "<ruby>漢<rp>(</rp><rt>かん</rt><rp>)</rp></ruby>",
        500.0,
    );
    assert_eq!(lines.len(), 1);
    assert_eq!(texts(&lines[0]), vec!["漢"]);
}

// ─── Error taxonomy ─────────────────────────────────────────────

#[test]
fn test_orphan_annotation_aborts() {
    assert!(matches!(
        lay_err("<ruby><rt>かん</rt></ruby>", 500.0),
        LayoutError::AnnotationWithoutBase
    ));
}

#[test]
fn test_base_without_annotation_aborts() {
    assert!(matches!(
        lay_err("<ruby>漢字</ruby>", 500.0),
        LayoutError::MissingAnnotation
    ));
}

#[test]
fn test_empty_annotation_aborts() {
    assert!(matches!(
        lay_err("<ruby>漢<rt></rt></ruby>", 500.0),
        LayoutError::MissingAnnotation
    ));
}

#[test]
fn test_stacked_annotation_tier_is_unsupported() {
    assert!(matches!(
        lay_err("<ruby>漢<rt>かん</rt><rtc>カン</rtc></ruby>", 500.0),
        LayoutError::Unsupported(_)
    ));
}

// ─── JSON frontend ──────────────────────────────────────────────

#[test]
fn test_layout_json() {
    let json = r#"{
        "children": [
            { "kind": { "type": "Text", "content": "aa bb" } }
        ]
    }"#;
    let registry = LayoutRegistry::with_defaults();
    let lines = kumi::layout_json(json, 500.0, &Mono, &registry).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(texts(&lines[0]), vec!["aa", "bb"]);
}

#[test]
fn test_layout_json_rejects_malformed_input() {
    let registry = LayoutRegistry::with_defaults();
    let result = kumi::layout_json("{ not json", 500.0, &Mono, &registry);
    assert!(matches!(result, Err(LayoutError::Parse(_))));
}

#[test]
fn test_style_cascade_scales_measurement() {
    use kumi::style::Style;
    let document = Document {
        children: vec![
            Node::text("ab"),
            Node::text("cd").styled(Style {
                font_size: Some(40.0),
                ..Style::default()
            }),
        ],
        style: Default::default(),
    };
    let registry = LayoutRegistry::with_defaults();
    let lines = kumi::layout(&document, 500.0, &Mono, &registry).unwrap();
    assert_eq!(lines.len(), 1);
    // No break opportunity between the runs; they sit flush.
    assert_eq!(lines[0].segments[0].width, 40.0);
    assert_eq!(lines[0].segments[1].width, 80.0);
    assert_eq!(lines[0].segments[1].left, 40.0);
    assert_eq!(lines[0].height(), 40.0);
}

#[test]
fn test_layout_api_document() {
    let document = Document {
        children: vec![
            Node::text("aa "),
            Node::element(
                "ruby",
                vec![
                    Node::text("字"),
                    Node::element("rt", vec![Node::text("じ")]),
                ],
            ),
        ],
        style: Default::default(),
    };
    let registry = LayoutRegistry::with_defaults();
    let lines = kumi::layout(&document, 500.0, &Mono, &registry).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(texts(&lines[0]), vec!["aa", "字"]);
    assert_eq!(lines[0].segments[1].out_of_flow.len(), 1);
}
