//! Glyph outline model and geometric transforms.
//!
//! Outlines are UFO-style point lists: each contour is an ordered list of
//! points tagged with a segment kind, and components reference another glyph
//! by name through an affine matrix. All transforms return or mutate plain
//! in-memory values; no storage format is involved.

use kurbo::{Affine, BezPath, Point, Rect, Shape};

/// Segment kind of a contour point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    /// Start of an open contour.
    Move,
    /// On-curve point ending a straight segment.
    Line,
    /// Control point.
    OffCurve,
    /// On-curve point ending a cubic segment.
    Curve,
    /// On-curve point ending a quadratic segment.
    QCurve,
}

impl PointKind {
    fn is_on_curve(self) -> bool {
        !matches!(self, PointKind::OffCurve)
    }
}

/// A single point in a contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourPoint {
    pub point: Point,
    pub kind: PointKind,
    pub smooth: bool,
}

impl ContourPoint {
    pub fn new(x: f64, y: f64, kind: PointKind) -> Self {
        Self { point: Point::new(x, y), kind, smooth: false }
    }
}

/// An ordered list of points forming one contour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contour {
    pub points: Vec<ContourPoint>,
}

impl Contour {
    pub fn new(points: Vec<ContourPoint>) -> Self {
        Self { points }
    }

    /// A closed rectangular contour of four line points.
    pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::new(vec![
            ContourPoint::new(x0, y0, PointKind::Line),
            ContourPoint::new(x1, y0, PointKind::Line),
            ContourPoint::new(x1, y1, PointKind::Line),
            ContourPoint::new(x0, y1, PointKind::Line),
        ])
    }

    fn is_open(&self) -> bool {
        self.points.first().map(|p| p.kind) == Some(PointKind::Move)
    }

    fn draw(&self, sink: &mut dyn OutlineSink) {
        if self.points.is_empty() {
            return;
        }

        if self.is_open() {
            sink.move_to(self.points[0].point);
            emit_segments(self.points[1..].iter().copied(), sink);
            return;
        }

        match self.points.iter().rposition(|p| p.kind.is_on_curve()) {
            Some(start) => {
                sink.move_to(self.points[start].point);
                let reordered = self.points[start + 1..]
                    .iter()
                    .chain(self.points[..=start].iter())
                    .copied();
                emit_segments(reordered, sink);
                sink.close();
            }
            None => {
                // All-off-curve quadratic contour: implied on-curve points
                // sit midway between consecutive controls.
                let first = self.points[0].point;
                let last = self.points[self.points.len() - 1].point;
                sink.move_to(last.midpoint(first));
                for pair in self.points.windows(2) {
                    sink.quad_to(pair[0].point, pair[0].point.midpoint(pair[1].point));
                }
                sink.quad_to(last, last.midpoint(first));
                sink.close();
            }
        }
    }
}

fn emit_segments(points: impl Iterator<Item = ContourPoint>, sink: &mut dyn OutlineSink) {
    let mut off_curves: Vec<Point> = Vec::new();
    for p in points {
        match p.kind {
            PointKind::OffCurve => off_curves.push(p.point),
            PointKind::Curve => {
                match off_curves.len() {
                    0 => sink.line_to(p.point),
                    1 => sink.quad_to(off_curves[0], p.point),
                    _ => sink.curve_to(off_curves[0], off_curves[1], p.point),
                }
                off_curves.clear();
            }
            PointKind::QCurve => {
                for pair in off_curves.windows(2) {
                    sink.quad_to(pair[0], pair[0].midpoint(pair[1]));
                }
                match off_curves.last() {
                    Some(&c) => sink.quad_to(c, p.point),
                    None => sink.line_to(p.point),
                }
                off_curves.clear();
            }
            PointKind::Line | PointKind::Move => {
                sink.line_to(p.point);
                off_curves.clear();
            }
        }
    }
}

/// A reference to another glyph, carrying its placement matrix
/// `(xx, yx, xy, yy, dx, dy)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub base: String,
    pub transform: Affine,
}

impl Component {
    pub fn new(base: impl Into<String>, transform: Affine) -> Self {
        Self { base: base.into(), transform }
    }
}

/// Minimal draw protocol for consuming an outline.
pub trait OutlineSink {
    fn move_to(&mut self, p: Point);
    fn line_to(&mut self, p: Point);
    fn quad_to(&mut self, c: Point, p: Point);
    fn curve_to(&mut self, c1: Point, c2: Point, p: Point);
    fn close(&mut self);
    fn component(&mut self, base: &str, transform: Affine) {
        let _ = (base, transform);
    }
}

/// Sink that collects contour segments into a [`kurbo::BezPath`],
/// ignoring components.
#[derive(Debug, Default)]
pub struct PathSink(pub BezPath);

impl OutlineSink for PathSink {
    fn move_to(&mut self, p: Point) {
        self.0.move_to(p);
    }
    fn line_to(&mut self, p: Point) {
        self.0.line_to(p);
    }
    fn quad_to(&mut self, c: Point, p: Point) {
        self.0.quad_to(c, p);
    }
    fn curve_to(&mut self, c1: Point, c2: Point, p: Point) {
        self.0.curve_to(c1, c2, p);
    }
    fn close(&mut self) {
        self.0.close_path();
    }
}

/// A glyph outline: contours, components, and the glyph's code points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    pub contours: Vec<Contour>,
    pub components: Vec<Component>,
    pub unicodes: Vec<u32>,
}

impl Outline {
    pub fn new(contours: Vec<Contour>, components: Vec<Component>) -> Self {
        Self { contours, components, unicodes: Vec::new() }
    }

    pub fn with_unicodes(mut self, unicodes: impl Into<Vec<u32>>) -> Self {
        self.unicodes = unicodes.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty() && self.components.is_empty()
    }

    /// Draw contours and components into a sink.
    pub fn draw(&self, sink: &mut dyn OutlineSink) {
        for contour in &self.contours {
            contour.draw(sink);
        }
        for component in &self.components {
            sink.component(&component.base, component.transform);
        }
    }

    /// Contour geometry as a bezier path, components excluded.
    pub fn to_path(&self) -> BezPath {
        let mut sink = PathSink::default();
        self.draw(&mut sink);
        sink.0
    }

    /// Bounding box of the contour geometry, `None` for empty outlines.
    pub fn bounds(&self) -> Option<Rect> {
        if self.contours.is_empty() {
            return None;
        }
        Some(self.to_path().bounding_box())
    }

    /// Horizontal shear `x' = x + y * tan(degrees)` applied to every point
    /// and every component offset.
    pub fn skew_x(&mut self, degrees: f64) {
        let t = degrees.to_radians().tan();
        for contour in &mut self.contours {
            for p in &mut contour.points {
                p.point.x += p.point.y * t;
            }
        }
        for component in &mut self.components {
            let mut m = component.transform.as_coeffs();
            m[4] += m[5] * t;
            component.transform = Affine::new(m);
        }
    }

    /// Scale every point and every component offset. Component linear
    /// parts are left untouched.
    pub fn scale(&mut self, (sx, sy): (f64, f64)) {
        for contour in &mut self.contours {
            for p in &mut contour.points {
                p.point.x *= sx;
                p.point.y *= sy;
            }
        }
        for component in &mut self.components {
            let mut m = component.transform.as_coeffs();
            m[4] *= sx;
            m[5] *= sy;
            component.transform = Affine::new(m);
        }
    }

    /// Round all coordinates to integers.
    pub fn round(&mut self) {
        for contour in &mut self.contours {
            for p in &mut contour.points {
                p.point.x = p.point.x.round();
                p.point.y = p.point.y.round();
            }
        }
        for component in &mut self.components {
            let mut m = component.transform.as_coeffs();
            m[4] = m[4].round();
            m[5] = m[5].round();
            component.transform = Affine::new(m);
        }
    }
}

/// Scale an outline, correcting for the font's slant.
///
/// When `italic_angle_deg` is nonzero the outline is sheared upright first,
/// so axis-aligned scaling does not change the apparent slant, and sheared
/// back afterwards. Component linear parts are reset to identity: a
/// reference resolves against its own scaled base glyph, so re-scaling the
/// matrix would apply the scale twice, but the offset still has to move
/// with the outer glyph.
pub fn scale_outline(outline: &Outline, scale: (f64, f64), italic_angle_deg: f64) -> Outline {
    let mut scaled = outline.clone();
    if italic_angle_deg != 0.0 {
        scaled.skew_x(-italic_angle_deg);
    }
    scaled.scale(scale);
    for component in &mut scaled.components {
        let [.., dx, dy] = component.transform.as_coeffs();
        component.transform = Affine::new([1.0, 0.0, 0.0, 1.0, dx, dy]);
    }
    if italic_angle_deg != 0.0 {
        scaled.skew_x(italic_angle_deg);
    }
    scaled
}

/// The fixed placeholder outline returned when interpolation fails:
/// a hollow box, visible in any glyph grid.
pub fn placeholder_glyph() -> Outline {
    let outer = Contour::rect(30.0, 0.0, 470.0, 700.0);
    let mut inner = Contour::rect(70.0, 40.0, 430.0, 660.0);
    inner.points.reverse();
    Outline::new(vec![outer, inner], Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_outline() -> Outline {
        Outline::new(vec![Contour::rect(0.0, 0.0, 100.0, 200.0)], Vec::new())
    }

    fn composite_outline() -> Outline {
        Outline::new(
            vec![Contour::rect(0.0, 0.0, 100.0, 200.0)],
            vec![Component::new("acute", Affine::new([2.0, 0.0, 0.0, 2.0, 50.0, 80.0]))],
        )
    }

    #[test]
    fn identity_scale_is_a_noop() {
        let outline = box_outline();
        let scaled = scale_outline(&outline, (1.0, 1.0), 0.0);
        assert_eq!(scaled.contours, outline.contours);
    }

    #[test]
    fn identity_scale_with_slant_preserves_coordinates() {
        let outline = box_outline();
        let scaled = scale_outline(&outline, (1.0, 1.0), 12.0);
        for (a, b) in scaled.contours[0].points.iter().zip(&outline.contours[0].points) {
            assert!((a.point.x - b.point.x).abs() < 1e-9);
            assert!((a.point.y - b.point.y).abs() < 1e-9);
        }
    }

    #[test]
    fn component_linear_part_resets_to_identity() {
        let scaled = scale_outline(&composite_outline(), (0.5, 0.5), 0.0);
        let [xx, yx, xy, yy, dx, dy] = scaled.components[0].transform.as_coeffs();
        assert_eq!((xx, yx, xy, yy), (1.0, 0.0, 0.0, 1.0));
        assert_eq!((dx, dy), (25.0, 40.0));
    }

    #[test]
    fn component_offset_scales_with_top_level_coordinates() {
        let scaled = scale_outline(&composite_outline(), (2.0, 0.5), 0.0);
        let [.., dx, dy] = scaled.components[0].transform.as_coeffs();
        assert_eq!((dx, dy), (100.0, 40.0));
        let top = &scaled.contours[0].points[1].point;
        assert_eq!((top.x, top.y), (200.0, 0.0));
    }

    #[test]
    fn skew_shears_points_and_component_offsets() {
        let mut outline = composite_outline();
        outline.skew_x(45.0);
        // tan(45°) == 1, so x shifts by y.
        let p = outline.contours[0].points[2].point;
        assert!((p.x - 300.0).abs() < 1e-9);
        let [.., dx, _] = outline.components[0].transform.as_coeffs();
        assert!((dx - 130.0).abs() < 1e-9);
    }

    #[test]
    fn round_produces_integral_coordinates() {
        let mut outline = box_outline();
        outline.scale((0.333, 0.333));
        outline.round();
        for p in &outline.contours[0].points {
            assert_eq!(p.point.x, p.point.x.trunc());
            assert_eq!(p.point.y, p.point.y.trunc());
        }
    }

    #[test]
    fn scale_does_not_mutate_the_input() {
        let outline = box_outline();
        let _ = scale_outline(&outline, (0.5, 0.5), 8.0);
        assert_eq!(outline, box_outline());
    }

    #[test]
    fn bounds_of_rectangle() {
        let bounds = box_outline().bounds().unwrap();
        assert_eq!((bounds.x0, bounds.y0, bounds.x1, bounds.y1), (0.0, 0.0, 100.0, 200.0));
    }

    #[test]
    fn empty_outline_has_no_bounds() {
        assert!(Outline::default().bounds().is_none());
        assert!(Outline::default().is_empty());
    }

    #[test]
    fn draw_closed_contour_starts_on_last_on_curve_point() {
        #[derive(Default)]
        struct Log(Vec<String>);
        impl OutlineSink for Log {
            fn move_to(&mut self, p: Point) {
                self.0.push(format!("M {} {}", p.x, p.y));
            }
            fn line_to(&mut self, p: Point) {
                self.0.push(format!("L {} {}", p.x, p.y));
            }
            fn quad_to(&mut self, _: Point, p: Point) {
                self.0.push(format!("Q {} {}", p.x, p.y));
            }
            fn curve_to(&mut self, _: Point, _: Point, p: Point) {
                self.0.push(format!("C {} {}", p.x, p.y));
            }
            fn close(&mut self) {
                self.0.push("Z".into());
            }
        }

        let mut log = Log::default();
        box_outline().draw(&mut log);
        assert_eq!(log.0, vec!["M 0 200", "L 0 0", "L 100 0", "L 100 200", "L 0 200", "Z"]);
    }

    #[test]
    fn placeholder_is_a_hollow_box() {
        let glyph = placeholder_glyph();
        assert_eq!(glyph.contours.len(), 2);
        assert!(glyph.components.is_empty());
        assert!(glyph.unicodes.is_empty());
    }
}
