//! Master font access: the host capability trait and the scaling wrappers.

use std::collections::BTreeMap;

use kurbo::{Line, ParamCurve, Point};
use log::warn;

use crate::{
    error::{Error, Result},
    glyph::{Outline, OutlineSink, scale_outline},
    scale::{Metrics, ScaleSpec},
};

/// Capability set a host font object must provide to serve as a master.
///
/// Any storage backend works: the engine never sees the host's glyph
/// representation, only [`Outline`] values and the metadata below.
pub trait FontSource {
    fn family_name(&self) -> &str;
    fn style_name(&self) -> &str;
    fn glyph_names(&self) -> Vec<String>;
    fn glyph(&self, name: &str) -> Option<&Outline>;
    fn metrics(&self) -> Metrics;
    /// Italic angle in degrees, positive for a forward lean.
    fn italic_angle(&self) -> f64;

    fn has_glyph(&self, name: &str) -> bool {
        self.glyph(name).is_some()
    }
}

/// In-memory font backend, used by hosts that already hold outlines
/// and by tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFont {
    family_name: String,
    style_name: String,
    metrics: Metrics,
    italic_angle: f64,
    glyphs: BTreeMap<String, Outline>,
}

impl InMemoryFont {
    pub fn new(family_name: impl Into<String>, style_name: impl Into<String>) -> Self {
        Self {
            family_name: family_name.into(),
            style_name: style_name.into(),
            ..Default::default()
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_italic_angle(mut self, degrees: f64) -> Self {
        self.italic_angle = degrees;
        self
    }

    pub fn with_glyph(mut self, name: impl Into<String>, outline: Outline) -> Self {
        self.glyphs.insert(name.into(), outline);
        self
    }

    pub fn insert_glyph(&mut self, name: impl Into<String>, outline: Outline) {
        self.glyphs.insert(name.into(), outline);
    }
}

impl FontSource for InMemoryFont {
    fn family_name(&self) -> &str {
        &self.family_name
    }
    fn style_name(&self) -> &str {
        &self.style_name
    }
    fn glyph_names(&self) -> Vec<String> {
        self.glyphs.keys().cloned().collect()
    }
    fn glyph(&self, name: &str) -> Option<&Outline> {
        self.glyphs.get(name)
    }
    fn metrics(&self) -> Metrics {
        self.metrics
    }
    fn italic_angle(&self) -> f64 {
        self.italic_angle
    }
}

/// One master font with a resolved scale, serving scaled glyphs.
#[derive(Debug, Clone)]
pub struct ScaleFont<F> {
    source: F,
    name: String,
    metrics: Metrics,
    italic_angle: f64,
    scale: Option<(f64, f64)>,
}

impl<F: FontSource> ScaleFont<F> {
    pub fn new(source: F) -> Self {
        let name = format!("{} {}", source.family_name(), source.style_name());
        let metrics = source.metrics();
        let italic_angle = source.italic_angle();
        Self { source, name, metrics, italic_angle, scale: None }
    }

    pub fn with_scale(source: F, spec: &ScaleSpec) -> Result<Self> {
        let mut font = Self::new(source);
        font.set_scale(spec)?;
        Ok(font)
    }

    /// Stable display name, derived from family and style.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn italic_angle(&self) -> f64 {
        self.italic_angle
    }

    pub fn scale(&self) -> Option<(f64, f64)> {
        self.scale
    }

    /// Resolve a scale specification against this font without storing it.
    pub fn resolve_scale(&self, spec: &ScaleSpec) -> Result<(f64, f64)> {
        spec.validate(&self.metrics, |name| self.glyph_height(name))
    }

    /// Resolve and store a scale specification.
    pub fn set_scale(&mut self, spec: &ScaleSpec) -> Result<()> {
        self.scale = Some(self.resolve_scale(spec)?);
        Ok(())
    }

    pub fn has_glyph(&self, name: &str) -> bool {
        self.source.has_glyph(name)
    }

    pub fn glyph_names(&self) -> Vec<String> {
        self.source.glyph_names()
    }

    /// Names of glyphs that carry an outline, spacing glyphs excluded.
    pub fn non_empty_glyph_names(&self) -> Vec<String> {
        self.source
            .glyph_names()
            .into_iter()
            .filter(|name| !name.contains("space"))
            .filter(|name| self.source.glyph(name).is_some_and(|g| !g.is_empty()))
            .collect()
    }

    /// Return the named glyph scaled by the current settings, with
    /// slant correction.
    pub fn glyph(&self, name: &str) -> Result<Outline> {
        let outline = self
            .source
            .glyph(name)
            .ok_or_else(|| Error::GlyphNotFound(name.to_string()))?;
        let scale = self.scale.unwrap_or((1.0, 1.0));
        Ok(scale_outline(outline, scale, self.italic_angle))
    }

    /// Draw the scaled glyph into a caller-supplied sink.
    pub fn extract_glyph(&self, name: &str, sink: &mut dyn OutlineSink) -> Result<()> {
        self.glyph(name)?.draw(sink);
        Ok(())
    }

    /// Bounding-box height of a glyph, unscaled. Used as a height
    /// reference during scale resolution.
    fn glyph_height(&self, name: &str) -> Option<f64> {
        let bounds = self.source.glyph(name)?.bounds()?;
        Some(bounds.height())
    }
}

/// Reference glyphs for stem measurement.
const VSTEM_GLYPH: &str = "I";
const HSTEM_GLYPH: &str = "H";

/// A [`ScaleFont`] carrying reference stem widths, ready to be placed in
/// an interpolation design space.
///
/// Stems are measured on "I" (vertical) and "H" (horizontal) at
/// construction unless explicit values are supplied; an override wins
/// per axis independently.
#[derive(Debug, Clone)]
pub struct StemFont<F> {
    pub font: ScaleFont<F>,
    pub vstem: f64,
    pub hstem: f64,
}

impl<F: FontSource> StemFont<F> {
    pub fn new(source: F) -> Self {
        Self::with_stems(source, None, None)
    }

    pub fn with_stems(source: F, vstem: Option<f64>, hstem: Option<f64>) -> Self {
        let font = ScaleFont::new(source);
        let vstem = vstem.or_else(|| measure_vstem(&font)).unwrap_or_else(|| {
            warn!("no vertical stem measured for '{}', using 0", font.name());
            0.0
        });
        let hstem = hstem.or_else(|| measure_hstem(&font)).unwrap_or_else(|| {
            warn!("no horizontal stem measured for '{}', using 0", font.name());
            0.0
        });
        Self { font, vstem, hstem }
    }

    pub fn stems(&self) -> (f64, f64) {
        (self.vstem, self.hstem)
    }

    pub fn set_stems(&mut self, (vstem, hstem): (f64, f64)) {
        self.vstem = vstem;
        self.hstem = hstem;
    }
}

/// Vertical stem width of "I": horizontal scan line at half the x-height.
fn measure_vstem<F: FontSource>(font: &ScaleFont<F>) -> Option<f64> {
    let glyph = font.source.glyph(VSTEM_GLYPH)?;
    let bounds = glyph.bounds()?;
    let y = font.metrics().x_height / 2.0;
    let line = Line::new(
        Point::new(bounds.x0 - 1.0, y),
        Point::new(bounds.x1 + 1.0, y),
    );
    stem_width(glyph, line, |p| p.x)
}

/// Horizontal stem width of "H": vertical scan line at the outline's
/// horizontal midpoint, crossing only the bar.
fn measure_hstem<F: FontSource>(font: &ScaleFont<F>) -> Option<f64> {
    let glyph = font.source.glyph(HSTEM_GLYPH)?;
    let bounds = glyph.bounds()?;
    let x = (bounds.x0 + bounds.x1) / 2.0;
    let line = Line::new(
        Point::new(x, bounds.y0 - 1.0),
        Point::new(x, bounds.y1 + 1.0),
    );
    stem_width(glyph, line, |p| p.y)
}

/// Distance between the first two crossings of a scan line with the
/// outline, measured along `coord`.
fn stem_width(glyph: &Outline, line: Line, coord: impl Fn(Point) -> f64) -> Option<f64> {
    let path = glyph.to_path();
    let mut crossings: Vec<f64> = Vec::new();
    for seg in path.segments() {
        for hit in seg.intersect_line(line) {
            crossings.push(coord(seg.eval(hit.segment_t)));
        }
    }
    crossings.sort_by(|a, b| a.total_cmp(b));
    crossings.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
    if crossings.len() < 2 {
        return None;
    }
    Some(crossings[1] - crossings[0])
}

#[cfg(test)]
mod tests {
    use kurbo::Affine;

    use super::*;
    use crate::{
        glyph::{Component, Contour},
        scale::{HeightRef, VerticalMetric},
    };

    /// Letter "I": a plain 60-unit stem.
    fn glyph_i() -> Outline {
        Outline::new(vec![Contour::rect(100.0, 0.0, 160.0, 700.0)], Vec::new())
    }

    /// Letter "H": two 80-unit stems and a 40-unit bar.
    fn glyph_h() -> Outline {
        Outline::new(
            vec![
                Contour::rect(0.0, 0.0, 80.0, 700.0),
                Contour::rect(320.0, 0.0, 400.0, 700.0),
                Contour::rect(80.0, 330.0, 320.0, 370.0),
            ],
            Vec::new(),
        )
    }

    fn test_font() -> InMemoryFont {
        InMemoryFont::new("Test", "Regular")
            .with_metrics(Metrics {
                cap_height: 700.0,
                ascender: 750.0,
                x_height: 500.0,
                descender: -250.0,
            })
            .with_glyph("I", glyph_i())
            .with_glyph("H", glyph_h())
            .with_glyph("space", Outline::default())
            .with_glyph("empty", Outline::default())
            .with_glyph(
                "Iacute",
                Outline::new(
                    Vec::new(),
                    vec![Component::new("I", Affine::IDENTITY)],
                ),
            )
    }

    #[test]
    fn scale_font_name_combines_family_and_style() {
        let font = ScaleFont::new(test_font());
        assert_eq!(font.name(), "Test Regular");
    }

    #[test]
    fn unscaled_glyph_passes_through() {
        let font = ScaleFont::new(test_font());
        assert_eq!(font.glyph("I").unwrap(), glyph_i());
    }

    #[test]
    fn scaled_glyph_is_scaled() {
        let mut font = ScaleFont::new(test_font());
        font.set_scale(&ScaleSpec::Factors { x: 0.5, y: 0.5 }).unwrap();
        let glyph = font.glyph("I").unwrap();
        let bounds = glyph.bounds().unwrap();
        assert_eq!((bounds.width(), bounds.height()), (30.0, 350.0));
    }

    #[test]
    fn missing_glyph_is_an_explicit_error() {
        let font = ScaleFont::new(test_font());
        assert!(matches!(font.glyph("Q"), Err(Error::GlyphNotFound(_))));
    }

    #[test]
    fn non_empty_names_exclude_empty_and_space_glyphs() {
        let font = ScaleFont::new(test_font());
        let names = font.non_empty_glyph_names();
        assert!(names.contains(&"I".to_string()));
        assert!(names.contains(&"Iacute".to_string()));
        assert!(!names.contains(&"space".to_string()));
        assert!(!names.contains(&"empty".to_string()));
    }

    #[test]
    fn reference_scale_uses_font_metrics() {
        let mut font = ScaleFont::new(test_font());
        font.set_scale(&ScaleSpec::Reference {
            width: 1.0,
            target: HeightRef::Value(490.0),
            reference: HeightRef::Metric(VerticalMetric::CapHeight),
        })
        .unwrap();
        let (x, y) = font.scale().unwrap();
        assert!((x - 0.7).abs() < 1e-9);
        assert!((y - 0.7).abs() < 1e-9);
    }

    #[test]
    fn stems_are_measured_from_reference_glyphs() {
        let font = StemFont::new(test_font());
        assert!((font.vstem - 60.0).abs() < 1e-6);
        assert!((font.hstem - 40.0).abs() < 1e-6);
    }

    #[test]
    fn stem_overrides_win_per_axis() {
        let font = StemFont::with_stems(test_font(), Some(100.0), None);
        assert!((font.vstem - 100.0).abs() < 1e-6);
        assert!((font.hstem - 40.0).abs() < 1e-6);
    }

    #[test]
    fn missing_reference_glyphs_default_to_zero() {
        let font = StemFont::new(InMemoryFont::new("Bare", "Regular"));
        assert_eq!(font.stems(), (0.0, 0.0));
    }
}
