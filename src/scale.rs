//! Scale specifications and their resolution against font metrics.

use crate::error::{Error, Result};

/// The four named vertical references of a font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalMetric {
    CapHeight,
    Ascender,
    XHeight,
    Descender,
}

/// Named vertical metrics, read once per master and immutable afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub cap_height: f64,
    pub ascender: f64,
    pub x_height: f64,
    pub descender: f64,
}

impl Metrics {
    pub fn get(&self, metric: VerticalMetric) -> f64 {
        match metric {
            VerticalMetric::CapHeight => self.cap_height,
            VerticalMetric::Ascender => self.ascender,
            VerticalMetric::XHeight => self.x_height,
            VerticalMetric::Descender => self.descender,
        }
    }
}

/// A height reference used in a proportional scale specification.
#[derive(Debug, Clone, PartialEq)]
pub enum HeightRef {
    /// A plain numeric value.
    Value(f64),
    /// One of the named vertical metrics.
    Metric(VerticalMetric),
    /// The bounding-box height of a named glyph.
    Glyph(String),
}

/// How a font should be scaled.
///
/// Either explicit per-axis factors, or a width factor plus a pair of
/// height references whose ratio becomes the vertical factor.
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleSpec {
    Factors { x: f64, y: f64 },
    Reference { width: f64, target: HeightRef, reference: HeightRef },
}

impl ScaleSpec {
    /// Resolve to a concrete `(x, y)` factor pair.
    ///
    /// Height resolution is best-effort: a glyph that measures nothing
    /// makes the target default to the resolved reference, and a reference
    /// that resolves to zero (or not at all) degrades the ratio to 1
    /// rather than failing, so one unresolvable master never aborts a
    /// batch of glyph extractions.
    pub fn resolve(&self, metrics: &Metrics, glyph_height: impl Fn(&str) -> Option<f64>) -> (f64, f64) {
        match self {
            ScaleSpec::Factors { x, y } => (*x, *y),
            ScaleSpec::Reference { width, target, reference } => {
                let reference_value = match reference {
                    HeightRef::Value(v) => Some(*v),
                    HeightRef::Metric(m) => Some(metrics.get(*m)),
                    HeightRef::Glyph(name) => glyph_height(name),
                };
                let target_value = match target {
                    HeightRef::Value(v) => Some(*v),
                    HeightRef::Metric(m) => Some(metrics.get(*m)),
                    HeightRef::Glyph(name) => glyph_height(name).or(reference_value),
                };
                let xy = match (target_value, reference_value) {
                    (Some(t), Some(r)) if r != 0.0 && (t / r).is_finite() => t / r,
                    _ => 1.0,
                };
                (width * xy, xy)
            }
        }
    }

    /// Check that resolved factors are usable for scaling.
    pub fn validate(&self, metrics: &Metrics, glyph_height: impl Fn(&str) -> Option<f64>) -> Result<(f64, f64)> {
        let (x, y) = self.resolve(metrics, glyph_height);
        if !x.is_finite() || !y.is_finite() || x == 0.0 || y == 0.0 {
            return Err(Error::InvalidScale { x, y });
        }
        Ok((x, y))
    }
}
