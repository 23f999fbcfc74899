//! # Style System
//!
//! A deliberately small style model: the only properties that influence
//! inline layout are the font parameters driving measurement. Every property
//! is optional on a node and resolves against the parent, CSS-inheritance
//! style.

use serde::{Deserialize, Serialize};

/// Font size used when nothing in the tree specifies one.
pub const DEFAULT_FONT_SIZE: f64 = 20.0;

/// Font family used when nothing in the tree specifies one.
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

/// Style properties attached to a content node. All optional; unset
/// properties inherit from the parent node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    /// Font family name.
    pub font_family: Option<String>,
    /// Font size in layout units.
    pub font_size: Option<f64>,
}

impl Style {
    /// Resolve this style against the parent's resolved font.
    pub fn resolve(&self, parent: &FontSpec) -> FontSpec {
        FontSpec {
            family: self
                .font_family
                .clone()
                .unwrap_or_else(|| parent.family.clone()),
            size: self.font_size.unwrap_or(parent.size),
        }
    }
}

/// Fully resolved font parameters, sufficient to drive measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSpec {
    pub family: String,
    pub size: f64,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: DEFAULT_FONT_FAMILY.to_string(),
            size: DEFAULT_FONT_SIZE,
        }
    }
}

impl FontSpec {
    /// A copy of this spec with the size multiplied by `factor`.
    /// Ruby annotations use this to shrink relative to their base.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            family: self.family.clone(),
            size: self.size * factor,
        }
    }
}
