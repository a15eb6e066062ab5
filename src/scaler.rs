//! The interpolated-scaling engine.
//!
//! A [`ScaleEngine`] owns a named collection of stem-aware masters,
//! decides whether independent vstem/hstem axes are usable, and serves
//! scaled, interpolated glyphs at requested stem targets. Interpolation
//! failures never abort a batch: the failing glyph comes back as a
//! placeholder and the failure is recorded in the error log.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use log::{info, warn};

use crate::{
    error::{Error, Result},
    font::{FontSource, StemFont},
    glyph::{Outline, placeholder_glyph},
    model::{Location, Model},
    scale::{HeightRef, ScaleSpec},
};

/// Single-axis stem location, used when two-axis interpolation is not
/// structurally possible.
const STEM_AXIS: &str = "stem";
const VSTEM_AXIS: &str = "vstem";
const HSTEM_AXIS: &str = "hstem";

/// Scaling parameters accepted by [`ScaleEngine::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleParams {
    /// Explicit per-axis factors.
    Factors { x: f64, y: f64 },
    /// One factor for both axes.
    Uniform(f64),
    /// Width factor only; the height ratio stays at 1.
    Width(f64),
    /// Width factor plus a target/reference height pair.
    Height { width: f64, target: HeightRef, reference: HeightRef },
}

impl ScaleParams {
    fn into_spec(self) -> ScaleSpec {
        match self {
            ScaleParams::Factors { x, y } => ScaleSpec::Factors { x, y },
            ScaleParams::Uniform(s) => ScaleSpec::Factors { x: s, y: s },
            ScaleParams::Width(w) => ScaleSpec::Factors { x: w, y: 1.0 },
            ScaleParams::Height { width, target, reference } => {
                ScaleSpec::Reference { width, target, reference }
            }
        }
    }
}

/// Requested stem widths for a scaled glyph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StemTarget {
    /// Vertical stem only.
    Single(f64),
    /// Vertical and horizontal stems.
    Pair(f64, f64),
}

impl From<f64> for StemTarget {
    fn from(v: f64) -> Self {
        StemTarget::Single(v)
    }
}

impl From<(f64, f64)> for StemTarget {
    fn from((v, h): (f64, f64)) -> Self {
        StemTarget::Pair(v, h)
    }
}

/// One recorded interpolation failure: the glyph, the masters that went
/// into the design space, and the underlying cause.
#[derive(Debug, Clone)]
pub struct InterpolationFailure {
    pub glyph: String,
    pub masters: Vec<String>,
    pub cause: Error,
}

/// Interpolated scaling over a collection of master fonts.
///
/// Masters are keyed by their display name and kept in insertion order;
/// the two-axis capability rule depends on that order.
#[derive(Debug)]
pub struct ScaleEngine<F> {
    masters: IndexMap<String, StemFont<F>>,
    current_scale: Option<ScaleSpec>,
    two_axes: bool,
    available: BTreeSet<String>,
    errors: Vec<InterpolationFailure>,
}

impl<F: FontSource> ScaleEngine<F> {
    /// Create an engine from an explicit (possibly empty) list of
    /// master fonts. Stems are measured from the reference glyphs.
    pub fn new(fonts: impl IntoIterator<Item = F>) -> Self {
        let mut engine = Self {
            masters: IndexMap::new(),
            current_scale: None,
            two_axes: false,
            available: BTreeSet::new(),
            errors: Vec::new(),
        };
        for font in fonts {
            engine.insert_master(StemFont::new(font));
        }
        engine
    }

    pub fn len(&self) -> usize {
        self.masters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masters.is_empty()
    }

    pub fn contains(&self, master_name: &str) -> bool {
        self.masters.contains_key(master_name)
    }

    pub fn master(&self, master_name: &str) -> Option<&StemFont<F>> {
        self.masters.get(master_name)
    }

    pub fn master_mut(&mut self, master_name: &str) -> Option<&mut StemFont<F>> {
        self.masters.get_mut(master_name)
    }

    pub fn masters(&self) -> impl Iterator<Item = &StemFont<F>> {
        self.masters.values()
    }

    /// Whether every master carries a non-empty glyph of this name.
    pub fn has_glyph(&self, glyph_name: &str) -> bool {
        self.available.contains(glyph_name)
    }

    /// Glyph names present and non-empty in every master.
    pub fn available_glyphs(&self) -> &BTreeSet<String> {
        &self.available
    }

    /// Whether independent vstem/hstem axes are structurally usable.
    pub fn two_axes(&self) -> bool {
        self.two_axes
    }

    /// Define scaling parameters and apply them to every master; future
    /// masters inherit them. A specification one master rejects is
    /// rejected whole: no master changes scale.
    pub fn set(&mut self, params: ScaleParams) -> Result<()> {
        let spec = params.into_spec();
        for master in self.masters.values() {
            master.font.resolve_scale(&spec)?;
        }
        for master in self.masters.values_mut() {
            master.font.set_scale(&spec)?;
        }
        self.current_scale = Some(spec);
        Ok(())
    }

    /// Add a master, measuring its stems from the reference glyphs.
    pub fn add_master(&mut self, font: F) -> Result<()> {
        self.add_master_with_stems(font, None, None)
    }

    /// Add a master with explicit stem overrides; an axis left `None` is
    /// measured.
    pub fn add_master_with_stems(
        &mut self,
        font: F,
        vstem: Option<f64>,
        hstem: Option<f64>,
    ) -> Result<()> {
        let mut master = StemFont::with_stems(font, vstem, hstem);
        if let Some(spec) = &self.current_scale {
            master.font.set_scale(spec)?;
        }
        self.insert_master(master);
        Ok(())
    }

    /// Remove a master by name. Returns whether it was present.
    pub fn remove_master(&mut self, master_name: &str) -> bool {
        let removed = self.masters.shift_remove(master_name).is_some();
        if removed {
            info!("removed master '{master_name}'");
            self.rebuild_available();
            self.two_axes = self.check_two_axes();
        }
        removed
    }

    /// Recorded interpolation failures, oldest first.
    pub fn error_report(&self) -> &[InterpolationFailure] {
        &self.errors
    }

    /// Return a scaled glyph interpolated to the requested stem widths.
    ///
    /// Returns `None` with fewer than two masters (a documented no-op,
    /// not an error). A target beyond the masters' scaled stem span is
    /// not extrapolated: it clamps to the nearest extreme master. On
    /// interpolation failure the placeholder outline is returned and the
    /// failure is appended to the error log. The result always has
    /// integral coordinates.
    pub fn get_scaled_glyph(
        &mut self,
        glyph_name: &str,
        target: impl Into<StemTarget>,
        slant_correction: bool,
    ) -> Option<Outline> {
        if self.masters.len() < 2 {
            return None;
        }

        let two_axes = self.two_axes;
        let mut design_masters: Vec<(Location, Outline)> = Vec::new();
        let mut master_names: Vec<String> = Vec::new();
        let mut y_scales: Vec<f64> = Vec::new();
        let mut angles: Vec<f64> = Vec::new();
        let mut x_scale = 1.0;

        for master in self.masters.values() {
            let (sx, sy) = master.font.scale().unwrap_or((1.0, 1.0));
            x_scale = sx;
            y_scales.push(sy);

            if !master.font.has_glyph(glyph_name) {
                continue;
            }
            let Ok(mut outline) = master.font.glyph(glyph_name) else {
                continue;
            };

            let location = if two_axes {
                Location::new()
                    .with(VSTEM_AXIS, master.vstem * sx)
                    .with(HSTEM_AXIS, master.hstem * sy)
            } else {
                if slant_correction {
                    // Mixing slanted outlines on a single linear axis
                    // distorts the interpolation, so masters are skewed
                    // upright first and the instance re-slanted after.
                    let angle = master.font.italic_angle();
                    if angle != 0.0 {
                        outline.skew_x(-angle);
                        angles.push(angle);
                    }
                }
                Location::new().with(STEM_AXIS, master.vstem * sx)
            };

            master_names.push(master.font.name().to_string());
            design_masters.push((location, outline));
        }

        let median_angle = if slant_correction && !angles.is_empty() {
            angles.iter().sum::<f64>() / angles.len() as f64
        } else {
            0.0
        };
        let y_scale = y_scales.iter().sum::<f64>() / y_scales.len() as f64;

        let target_location = self.target_location(target.into(), two_axes, x_scale, y_scale);

        let mut instance = match Model::build(&design_masters) {
            Ok(model) => model.instance_at(&target_location),
            Err(cause) => {
                warn!("interpolation failed for '{glyph_name}': {cause}");
                let mut placeholder = placeholder_glyph();
                if self.has_glyph(glyph_name)
                    && let Some(master) = self.masters.values().next()
                    && let Ok(original) = master.font.glyph(glyph_name)
                {
                    placeholder.unicodes = original.unicodes;
                }
                self.errors.push(InterpolationFailure {
                    glyph: glyph_name.to_string(),
                    masters: master_names,
                    cause,
                });
                placeholder
            }
        };

        if slant_correction && median_angle != 0.0 {
            instance.skew_x(median_angle);
        }
        instance.round();
        Some(instance)
    }

    /// Design-space location for a stem target.
    ///
    /// In single-axis mode with both stems given, the hstem target is
    /// linearly remapped from the masters' hstem span into their vstem
    /// span and rides the stem axis as the anisotropic y part. This
    /// assumes hstem varies monotonically with vstem across the masters.
    fn target_location(
        &self,
        target: StemTarget,
        two_axes: bool,
        x_scale: f64,
        y_scale: f64,
    ) -> Location {
        match target {
            StemTarget::Single(vstem) => Location::new().with(STEM_AXIS, vstem),
            StemTarget::Pair(vstem, hstem) => {
                if two_axes {
                    return Location::new()
                        .with(VSTEM_AXIS, vstem)
                        .with(HSTEM_AXIS, hstem);
                }
                let v_stems: Vec<f64> =
                    self.masters.values().map(|m| m.vstem * x_scale).collect();
                let h_stems: Vec<f64> =
                    self.masters.values().map(|m| m.hstem * y_scale).collect();
                match extremes(&v_stems) {
                    Some(((min_v, min_idx), (max_v, max_idx))) => {
                        let h_span = (h_stems[min_idx], h_stems[max_idx]);
                        let new_hstem = map_value(hstem, h_span, (min_v, max_v));
                        Location::new().with(STEM_AXIS, (vstem, new_hstem))
                    }
                    None => Location::new().with(STEM_AXIS, vstem),
                }
            }
        }
    }

    /// Two-axis interpolation needs more than two masters, at least one
    /// adjacent pair of equal hstems (to anchor the second axis) and at
    /// least one differing adjacent pair (to give it a differential).
    /// Only adjacent-in-collection pairs are scanned.
    fn check_two_axes(&self) -> bool {
        if self.masters.len() <= 2 {
            return false;
        }
        let hstems: Vec<f64> = self.masters.values().map(|m| m.hstem).collect();
        let mut identical = false;
        let mut different = false;
        for pair in hstems.windows(2) {
            if pair[1] == pair[0] {
                identical = true;
            } else {
                different = true;
            }
        }
        identical && different
    }

    fn insert_master(&mut self, master: StemFont<F>) {
        let name = master.font.name().to_string();
        let names: BTreeSet<String> =
            master.font.non_empty_glyph_names().into_iter().collect();
        info!("added master '{name}'");
        let replaced = self.masters.insert(name, master).is_some();
        if replaced {
            self.rebuild_available();
        } else if self.masters.len() == 1 {
            self.available = names;
        } else {
            self.available = self.available.intersection(&names).cloned().collect();
        }
        self.two_axes = self.check_two_axes();
    }

    fn rebuild_available(&mut self) {
        let mut masters = self.masters.values();
        let mut available: BTreeSet<String> = match masters.next() {
            Some(m) => m.font.non_empty_glyph_names().into_iter().collect(),
            None => BTreeSet::new(),
        };
        for master in masters {
            let names: BTreeSet<String> =
                master.font.non_empty_glyph_names().into_iter().collect();
            available = available.intersection(&names).cloned().collect();
        }
        self.available = available;
    }
}

/// Minimum and maximum of a list with their indices. The first element
/// seeds both extremes; a later value ties the maximum (`>=`) while the
/// minimum only moves on a strict `<`, so tied maxima keep the later
/// index and tied minima the earlier one. That asymmetry decides which
/// master anchors each end of the stem span.
fn extremes(values: &[f64]) -> Option<((f64, usize), (f64, usize))> {
    if values.len() < 2 {
        return None;
    }
    let mut smallest = (values[0], 0);
    let mut largest = (values[0], 0);
    for (i, &value) in values.iter().enumerate().skip(1) {
        if value >= largest.0 {
            largest = (value, i);
        } else if value < smallest.0 {
            smallest = (value, i);
        }
    }
    Some((smallest, largest))
}

/// Linearly remap `value` from `from` into `to`.
fn map_value(value: f64, from: (f64, f64), to: (f64, f64)) -> f64 {
    let (a0, a1) = from;
    let (b0, b1) = to;
    if a1 == a0 {
        return b0;
    }
    b0 + (value - a0) * (b1 - b0) / (a1 - a0)
}
