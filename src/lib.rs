//! # glyph-scaler
//!
//! Scaled, interpolated glyph outlines from a set of compatible font
//! masters: every master is scaled by the requested factors, placed in a
//! design space by its reference stem widths, and an instance is
//! interpolated so the result keeps the requested vertical and horizontal
//! stems at the new size.
//!
//! Hosts plug in by implementing [`FontSource`] for whatever holds their
//! glyphs; masters are assumed to be outline-compatible, as interpolation
//! requires.
//!
//! ## Example
//!
//! ```no_run
//! use glyph_scaler::{InMemoryFont, ScaleEngine, ScaleParams};
//!
//! # fn load(_: &str) -> InMemoryFont { unimplemented!() }
//! let mut scaler = ScaleEngine::new(vec![load("Light"), load("Bold")]);
//! scaler.set(ScaleParams::Factors { x: 0.85, y: 0.8 }).unwrap();
//!
//! // A small-caps "H" with stems interpolated to (55, 23).
//! let glyph = scaler.get_scaled_glyph("H", (55.0, 23.0), true);
//! ```

mod error;
mod font;
mod glyph;
mod model;
mod scale;
mod scaler;

pub use error::{Error, Result};
pub use font::{FontSource, InMemoryFont, ScaleFont, StemFont};
pub use glyph::{
    Component, Contour, ContourPoint, Outline, OutlineSink, PathSink, PointKind,
    placeholder_glyph, scale_outline,
};
pub use model::{Coord, Location, Model};
pub use scale::{HeightRef, Metrics, ScaleSpec, VerticalMetric};
pub use scaler::{InterpolationFailure, ScaleEngine, ScaleParams, StemTarget};
