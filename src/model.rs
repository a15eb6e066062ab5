//! Design-space locations and the interpolation model.
//!
//! Masters are placed in a design space by named axis values; the model
//! normalizes their locations, derives a tent region per non-default
//! master and accumulates outline deltas, so an instance at any location
//! is the default outline plus scalar-weighted deltas. A location value
//! may be anisotropic: its x part weights x coordinates and its y part
//! weights y coordinates independently.

use std::collections::BTreeMap;

use kurbo::{Point, Vec2};
use log::debug;

use crate::{
    error::{Error, Result},
    glyph::Outline,
};

const COORD_EPS: f64 = 1e-6;

/// One axis value, possibly split per coordinate direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn iso(v: f64) -> Self {
        Self { x: v, y: v }
    }

    pub fn aniso(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<f64> for Coord {
    fn from(v: f64) -> Self {
        Self::iso(v)
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Self::aniso(x, y)
    }
}

/// A design-space location: axis name to coordinate value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    axes: BTreeMap<String, Coord>,
}

impl Location {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, axis: &str, coord: impl Into<Coord>) -> Self {
        self.axes.insert(axis.to_string(), coord.into());
        self
    }

    pub fn set(&mut self, axis: &str, coord: impl Into<Coord>) {
        self.axes.insert(axis.to_string(), coord.into());
    }

    /// Value on an axis; unnamed axes sit at 0.
    pub fn get(&self, axis: &str) -> Coord {
        self.axes.get(axis).copied().unwrap_or(Coord::iso(0.0))
    }

    pub fn axis_names(&self) -> impl Iterator<Item = &str> {
        self.axes.keys().map(String::as_str)
    }
}

/// Span of one axis over the master set, in design units.
#[derive(Debug, Clone)]
struct AxisSpan {
    name: String,
    minimum: f64,
    default: f64,
    maximum: f64,
}

impl AxisSpan {
    /// Normalize a design-space value to [-1, 1] around the default.
    /// Values beyond the master span clamp to the nearest extreme.
    fn normalize(&self, value: f64) -> f64 {
        let n = if value < self.default {
            if self.default == self.minimum {
                0.0
            } else {
                -((self.default - value) / (self.default - self.minimum))
            }
        } else if value > self.default {
            if self.default == self.maximum {
                0.0
            } else {
                (value - self.default) / (self.maximum - self.default)
            }
        } else {
            0.0
        };
        n.clamp(-1.0, 1.0)
    }
}

/// A region in normalized space: a (min, peak, max) tent per axis.
/// Contribution is 0 at min, 1 at peak, 0 at max.
#[derive(Debug, Clone, PartialEq)]
struct Region {
    axes: Vec<(f64, f64, f64)>,
}

impl Region {
    /// Tent boundaries from a peak location and all master locations:
    /// min is the previous master's peak on the axis (or the axis start),
    /// max is the axis end, so on-axis interpolation is piecewise linear
    /// between consecutive masters.
    fn from_peak_with_neighbors(peak: &[f64], all_locations: &[Vec<f64>]) -> Self {
        let axes = peak
            .iter()
            .enumerate()
            .map(|(axis_idx, &p)| {
                if p == 0.0 {
                    (0.0, 0.0, 0.0)
                } else {
                    let mut positions: Vec<f64> = all_locations
                        .iter()
                        .map(|loc| loc.get(axis_idx).copied().unwrap_or(0.0))
                        .collect();
                    positions.push(0.0);
                    positions.sort_by(|a, b| a.total_cmp(b));
                    positions.dedup_by(|a, b| (*a - *b).abs() < COORD_EPS);

                    if p > 0.0 {
                        let pos: Vec<f64> =
                            positions.iter().filter(|&&x| x >= 0.0).copied().collect();
                        match pos.iter().position(|&x| (x - p).abs() < COORD_EPS) {
                            Some(i) => {
                                let min = if i == 0 { 0.0 } else { pos[i - 1] };
                                (min, p, 1.0)
                            }
                            None => (0.0, p, 1.0),
                        }
                    } else {
                        let neg: Vec<f64> =
                            positions.iter().filter(|&&x| x <= 0.0).copied().collect();
                        match neg.iter().position(|&x| (x - p).abs() < COORD_EPS) {
                            Some(i) => {
                                let max = if i >= neg.len() - 1 { 0.0 } else { neg[i + 1] };
                                (-1.0, p, max)
                            }
                            None => (-1.0, p, 0.0),
                        }
                    }
                }
            })
            .collect();
        Self { axes }
    }

    /// Scalar contribution of this region at a normalized location,
    /// between 0 and 1.
    fn scalar_at(&self, location: &[f64]) -> f64 {
        let mut scalar = 1.0;

        for (i, &(min, peak, max)) in self.axes.iter().enumerate() {
            let loc = location.get(i).copied().unwrap_or(0.0);

            if peak == 0.0 {
                continue;
            }
            if loc < min || loc > max {
                return 0.0;
            }
            if loc == peak {
                continue;
            }
            if loc < peak {
                scalar *= (loc - min) / (peak - min);
            } else {
                scalar *= (max - loc) / (max - peak);
            }
        }

        scalar
    }
}

/// Interpolation model over a set of compatible master outlines.
#[derive(Debug, Clone)]
pub struct Model {
    axes: Vec<AxisSpan>,
    neutral: Outline,
    neutral_coords: Vec<Point>,
    regions: Vec<Region>,
    deltas: Vec<Vec<Vec2>>,
}

impl Model {
    /// Build a model from `(location, outline)` master pairs.
    ///
    /// The default location is derived per axis from the most frequent
    /// master value (first-seen value wins ties); the master closest to
    /// that location anchors the model as its neutral. Fails when the
    /// master outlines are not structurally compatible.
    pub fn build(masters: &[(Location, Outline)]) -> Result<Self> {
        if masters.is_empty() {
            return Err(Error::EmptyDesignSpace);
        }

        let mut names: Vec<&str> = masters
            .iter()
            .flat_map(|(loc, _)| loc.axis_names())
            .collect();
        names.sort_unstable();
        names.dedup();

        // Raw design-unit locations, one row per master.
        let raw: Vec<Vec<f64>> = masters
            .iter()
            .map(|(loc, _)| names.iter().map(|n| loc.get(n).x).collect())
            .collect();

        let modes: Vec<f64> = (0..names.len())
            .map(|axis| most_frequent(raw.iter().map(|row| row[axis])))
            .collect();

        // The master matching the per-axis modes on the most axes becomes
        // the neutral; its location is the default for normalization.
        let neutral_idx = (0..masters.len())
            .max_by_key(|&i| {
                raw[i]
                    .iter()
                    .zip(&modes)
                    .filter(|(v, m)| (**v - **m).abs() < COORD_EPS)
                    .count()
            })
            .unwrap_or(0);
        let defaults = raw[neutral_idx].clone();

        let axes: Vec<AxisSpan> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let minimum = raw.iter().map(|row| row[i]).fold(f64::INFINITY, f64::min);
                let maximum = raw.iter().map(|row| row[i]).fold(f64::NEG_INFINITY, f64::max);
                AxisSpan { name: name.to_string(), minimum, default: defaults[i], maximum }
            })
            .collect();

        let normalized: Vec<Vec<f64>> = raw
            .iter()
            .map(|row| row.iter().zip(&axes).map(|(v, a)| a.normalize(*v)).collect())
            .collect();

        let neutral = masters[neutral_idx].1.clone();
        let neutral_coords = flatten(&neutral);
        for (i, (_, outline)) in masters.iter().enumerate() {
            if i != neutral_idx {
                check_compatible(&neutral, outline, i)?;
            }
        }

        // Regions per non-neutral master, ordered by support count so
        // deltas accumulate from single-axis masters outwards.
        let mut regions_with_idx: Vec<(usize, Region)> = (0..masters.len())
            .filter(|&i| i != neutral_idx)
            .map(|i| (i, Region::from_peak_with_neighbors(&normalized[i], &normalized)))
            .collect();
        regions_with_idx.sort_by_key(|(_, region)| {
            region.axes.iter().filter(|(_, peak, _)| *peak != 0.0).count()
        });

        let mut regions: Vec<Region> = Vec::with_capacity(regions_with_idx.len());
        let mut deltas: Vec<Vec<Vec2>> = Vec::with_capacity(regions_with_idx.len());

        for (master_idx, region) in regions_with_idx {
            let coords = flatten(&masters[master_idx].1);
            let mut delta: Vec<Vec2> = coords
                .iter()
                .zip(&neutral_coords)
                .map(|(c, n)| *c - *n)
                .collect();

            let peak: Vec<f64> = region.axes.iter().map(|(_, p, _)| *p).collect();
            for (prev_region, prev_delta) in regions.iter().zip(&deltas) {
                let scalar = prev_region.scalar_at(&peak);
                if scalar != 0.0 {
                    for (d, p) in delta.iter_mut().zip(prev_delta) {
                        *d -= *p * scalar;
                    }
                }
            }

            regions.push(region);
            deltas.push(delta);
        }

        debug!(
            "interpolation model: {} masters, {} axes, {} regions",
            masters.len(),
            axes.len(),
            regions.len()
        );

        Ok(Self { axes, neutral, neutral_coords, regions, deltas })
    }

    /// Instantiate an outline at a location. Code points come from the
    /// neutral master.
    pub fn instance_at(&self, location: &Location) -> Outline {
        let nx: Vec<f64> = self
            .axes
            .iter()
            .map(|a| a.normalize(location.get(&a.name).x))
            .collect();
        let ny: Vec<f64> = self
            .axes
            .iter()
            .map(|a| a.normalize(location.get(&a.name).y))
            .collect();

        let mut coords = self.neutral_coords.clone();
        for (region, delta) in self.regions.iter().zip(&self.deltas) {
            let sx = region.scalar_at(&nx);
            let sy = region.scalar_at(&ny);
            if sx == 0.0 && sy == 0.0 {
                continue;
            }
            for (c, d) in coords.iter_mut().zip(delta) {
                c.x += sx * d.x;
                c.y += sy * d.y;
            }
        }

        rebuild(&self.neutral, &coords)
    }
}

/// All interpolable coordinates of an outline in a fixed order:
/// contour points first, then component offsets.
fn flatten(outline: &Outline) -> Vec<Point> {
    let mut coords: Vec<Point> = outline
        .contours
        .iter()
        .flat_map(|c| c.points.iter().map(|p| p.point))
        .collect();
    for component in &outline.components {
        let [.., dx, dy] = component.transform.as_coeffs();
        coords.push(Point::new(dx, dy));
    }
    coords
}

/// Write interpolated coordinates back onto the reference structure.
fn rebuild(reference: &Outline, coords: &[Point]) -> Outline {
    let mut outline = reference.clone();
    let mut iter = coords.iter();
    for contour in &mut outline.contours {
        for p in &mut contour.points {
            if let Some(c) = iter.next() {
                p.point = *c;
            }
        }
    }
    for component in &mut outline.components {
        if let Some(c) = iter.next() {
            let mut m = component.transform.as_coeffs();
            m[4] = c.x;
            m[5] = c.y;
            component.transform = kurbo::Affine::new(m);
        }
    }
    outline
}

fn check_compatible(reference: &Outline, other: &Outline, master: usize) -> Result<()> {
    if other.contours.len() != reference.contours.len() {
        return Err(Error::ContourCountMismatch {
            master,
            expected: reference.contours.len(),
            actual: other.contours.len(),
        });
    }
    for (contour, (a, b)) in reference.contours.iter().zip(&other.contours).enumerate() {
        if a.points.len() != b.points.len() {
            return Err(Error::PointCountMismatch {
                master,
                contour,
                expected: a.points.len(),
                actual: b.points.len(),
            });
        }
    }
    let bases = |o: &Outline| {
        o.components
            .iter()
            .map(|c| c.base.clone())
            .collect::<Vec<_>>()
            .join(", ")
    };
    if reference.components.len() != other.components.len()
        || reference
            .components
            .iter()
            .zip(&other.components)
            .any(|(a, b)| a.base != b.base)
    {
        return Err(Error::ComponentMismatch {
            master,
            expected: bases(reference),
            actual: bases(other),
        });
    }
    Ok(())
}

/// Most frequent value, first-seen value winning ties.
fn most_frequent(values: impl Iterator<Item = f64>) -> f64 {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for v in values {
        match counts.iter_mut().find(|(u, _)| (*u - v).abs() < COORD_EPS) {
            Some(entry) => entry.1 += 1,
            None => counts.push((v, 1)),
        }
    }
    let mut best = (0.0, 0);
    for &(v, n) in &counts {
        if n > best.1 {
            best = (v, n);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::Contour;

    fn rect_outline(width: f64, height: f64) -> Outline {
        Outline::new(vec![Contour::rect(0.0, 0.0, width, height)], Vec::new())
    }

    fn stem_masters() -> Vec<(Location, Outline)> {
        vec![
            (Location::new().with("stem", 50.0), rect_outline(100.0, 700.0)),
            (Location::new().with("stem", 70.0), rect_outline(200.0, 900.0)),
        ]
    }

    #[test]
    fn region_scalar_at_peak() {
        let region = Region { axes: vec![(0.0, 1.0, 1.0)] };
        assert_eq!(region.scalar_at(&[1.0]), 1.0);
    }

    #[test]
    fn region_scalar_interpolated() {
        let region = Region { axes: vec![(0.0, 1.0, 1.0)] };
        assert!((region.scalar_at(&[0.5]) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn region_scalar_outside_is_zero() {
        let region = Region { axes: vec![(0.0, 0.5, 1.0)] };
        assert_eq!(region.scalar_at(&[-0.5]), 0.0);
    }

    #[test]
    fn two_master_midpoint() {
        let model = Model::build(&stem_masters()).unwrap();
        let instance = model.instance_at(&Location::new().with("stem", 60.0));
        let bounds = instance.bounds().unwrap();
        assert!((bounds.width() - 150.0).abs() < 1e-9);
        assert!((bounds.height() - 800.0).abs() < 1e-9);
    }

    #[test]
    fn master_locations_reproduce_masters() {
        let masters = stem_masters();
        let model = Model::build(&masters).unwrap();
        for (loc, outline) in &masters {
            let instance = model.instance_at(loc);
            assert_eq!(instance.contours, outline.contours);
        }
    }

    #[test]
    fn target_beyond_span_clamps_to_extreme_master() {
        let masters = stem_masters();
        let model = Model::build(&masters).unwrap();
        let instance = model.instance_at(&Location::new().with("stem", 200.0));
        assert_eq!(instance.contours, masters[1].1.contours);
    }

    #[test]
    fn anisotropic_location_splits_x_and_y() {
        let model = Model::build(&stem_masters()).unwrap();
        // x coordinates fully at the second master, y at the first.
        let instance = model.instance_at(&Location::new().with("stem", (70.0, 50.0)));
        let bounds = instance.bounds().unwrap();
        assert!((bounds.width() - 200.0).abs() < 1e-9);
        assert!((bounds.height() - 700.0).abs() < 1e-9);
    }

    #[test]
    fn intermediate_master_keeps_interpolation_piecewise() {
        let masters = vec![
            (Location::new().with("stem", 50.0), rect_outline(100.0, 700.0)),
            (Location::new().with("stem", 60.0), rect_outline(180.0, 700.0)),
            (Location::new().with("stem", 70.0), rect_outline(200.0, 700.0)),
        ];
        let model = Model::build(&masters).unwrap();
        let at_55 = model.instance_at(&Location::new().with("stem", 55.0));
        assert!((at_55.bounds().unwrap().width() - 140.0).abs() < 1e-6);
        let at_65 = model.instance_at(&Location::new().with("stem", 65.0));
        assert!((at_65.bounds().unwrap().width() - 190.0).abs() < 1e-6);
    }

    #[test]
    fn two_axis_masters_interpolate_independently() {
        let masters = vec![
            (
                Location::new().with("vstem", 50.0).with("hstem", 20.0),
                rect_outline(100.0, 400.0),
            ),
            (
                Location::new().with("vstem", 70.0).with("hstem", 20.0),
                rect_outline(200.0, 400.0),
            ),
            (
                Location::new().with("vstem", 70.0).with("hstem", 30.0),
                rect_outline(200.0, 600.0),
            ),
        ];
        let model = Model::build(&masters).unwrap();
        let instance = model
            .instance_at(&Location::new().with("vstem", 60.0).with("hstem", 20.0));
        let bounds = instance.bounds().unwrap();
        assert!((bounds.width() - 150.0).abs() < 1e-6);
        assert!((bounds.height() - 400.0).abs() < 1e-6);
    }

    #[test]
    fn incompatible_masters_fail_to_build() {
        let mut masters = stem_masters();
        masters[1].1.contours[0].points.pop();
        assert!(matches!(
            Model::build(&masters),
            Err(Error::PointCountMismatch { .. })
        ));
    }

    #[test]
    fn single_master_model_returns_that_master() {
        let masters = vec![(Location::new().with("stem", 50.0), rect_outline(100.0, 700.0))];
        let model = Model::build(&masters).unwrap();
        let instance = model.instance_at(&Location::new().with("stem", 120.0));
        assert_eq!(instance.contours, masters[0].1.contours);
    }

    #[test]
    fn no_masters_is_an_error() {
        assert!(matches!(Model::build(&[]), Err(Error::EmptyDesignSpace)));
    }

    #[test]
    fn most_frequent_prefers_first_seen_on_ties() {
        assert_eq!(most_frequent([10.0, 20.0, 30.0].into_iter()), 10.0);
        assert_eq!(most_frequent([10.0, 20.0, 20.0].into_iter()), 20.0);
    }
}
