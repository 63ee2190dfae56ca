// ============================================================================
// TRANSFORM: inverse-mapped geometric resampling (rotation)
// ============================================================================
//
// For every destination pixel the centre point is mapped back into source
// space and sampled there; nothing is forward-scattered. Sources outside the
// buffer follow the chosen `EdgeAction`.

use rayon::prelude::*;

use super::params::{
    ParamDefault, ParamDescriptor, ParamKind, SettingError, bad_value, parse_angle, parse_bool,
};
use crate::buffer::{PixelBuffer, prepare_destination};
use crate::error::{FilterError, FilterResult};
use crate::math;

/// Sampling method for resampling filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    NearestNeighbour,
    #[default]
    Bilinear,
}

impl Interpolation {
    pub fn key(&self) -> &'static str {
        match self {
            Interpolation::NearestNeighbour => "nearest",
            Interpolation::Bilinear => "bilinear",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "nearest" | "nearest-neighbour" | "nearest-neighbor" => {
                Some(Interpolation::NearestNeighbour)
            }
            "bilinear" => Some(Interpolation::Bilinear),
            _ => None,
        }
    }
}

/// What a read outside the source buffer returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EdgeAction {
    /// Transparent black.
    #[default]
    Zero,
    /// Nearest edge pixel.
    Clamp,
    /// Tile the source.
    Wrap,
}

impl EdgeAction {
    pub fn key(&self) -> &'static str {
        match self {
            EdgeAction::Zero => "zero",
            EdgeAction::Clamp => "clamp",
            EdgeAction::Wrap => "wrap",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "zero" => Some(EdgeAction::Zero),
            "clamp" => Some(EdgeAction::Clamp),
            "wrap" => Some(EdgeAction::Wrap),
            _ => None,
        }
    }

    /// Map a possibly out-of-range index into `0..n`, or `None` for `Zero`.
    #[inline]
    pub fn resolve(self, i: isize, n: usize) -> Option<usize> {
        if i >= 0 && (i as usize) < n {
            return Some(i as usize);
        }
        match self {
            EdgeAction::Zero => None,
            EdgeAction::Clamp => Some(i.clamp(0, n as isize - 1) as usize),
            EdgeAction::Wrap => Some(i.rem_euclid(n as isize) as usize),
        }
    }

    #[inline]
    pub fn fetch(self, src: &PixelBuffer, x: i32, y: i32) -> u32 {
        let w = src.width() as usize;
        let h = src.height() as usize;
        match (self.resolve(x as isize, w), self.resolve(y as isize, h)) {
            (Some(sx), Some(sy)) => src.pixels()[sy * w + sx],
            _ => 0,
        }
    }
}

/// Integer rectangle in pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// A geometric mapping that can be resampled by inverse lookup.
pub trait InverseTransform {
    /// Destination rectangle produced from a source rectangle. Destination
    /// pixel `(0, 0)` corresponds to the returned rectangle's origin.
    fn transform_space(&self, src: Rect) -> Rect;

    /// Map a destination point (in the space of `transform_space`) back to
    /// a continuous source coordinate.
    fn transform_inverse(&self, x: f32, y: f32) -> (f32, f32);
}

/// Resample `src` through `mapping`, sampling at destination pixel centres.
pub fn resample<T>(
    src: &PixelBuffer,
    mapping: &T,
    interpolation: Interpolation,
    edge: EdgeAction,
    dst: Option<PixelBuffer>,
) -> FilterResult<PixelBuffer>
where
    T: InverseTransform + Sync,
{
    let space = mapping.transform_space(Rect {
        x: 0,
        y: 0,
        width: src.width(),
        height: src.height(),
    });
    if space.width == 0 || space.height == 0 {
        return Err(FilterError::InvalidDimensions {
            width: space.width,
            height: space.height,
        });
    }

    let mut out = prepare_destination(dst, space.width, space.height)?;
    let dw = space.width as usize;

    out.pixels_mut()
        .par_chunks_mut(dw)
        .enumerate()
        .for_each(|(y, row_out)| {
            let py = space.y as f32 + y as f32 + 0.5;
            for (x, px) in row_out.iter_mut().enumerate() {
                let (sx, sy) = mapping.transform_inverse(space.x as f32 + x as f32 + 0.5, py);
                let (sx, sy) = (sx - 0.5, sy - 0.5);
                *px = match interpolation {
                    Interpolation::NearestNeighbour => sample_nearest(src, sx, sy, edge),
                    Interpolation::Bilinear => sample_bilinear(src, sx, sy, edge),
                };
            }
        });

    Ok(out)
}

#[inline]
fn sample_nearest(src: &PixelBuffer, sx: f32, sy: f32, edge: EdgeAction) -> u32 {
    edge.fetch(src, (sx + 0.5).floor() as i32, (sy + 0.5).floor() as i32)
}

#[inline]
fn sample_bilinear(src: &PixelBuffer, sx: f32, sy: f32, edge: EdgeAction) -> u32 {
    let x0 = sx.floor();
    let y0 = sy.floor();
    let xw = sx - x0;
    let yw = sy - y0;
    let (x0, y0) = (x0 as i32, y0 as i32);
    let nw = edge.fetch(src, x0, y0);
    let ne = edge.fetch(src, x0 + 1, y0);
    let sw = edge.fetch(src, x0, y0 + 1);
    let se = edge.fetch(src, x0 + 1, y0 + 1);
    math::bilinear_interpolate(xw, yw, nw, ne, sw, se)
}

// --- Rotate ---

/// Fixed point of a rotation that keeps the source size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Pivot {
    /// The top-left pixel stays in place.
    #[default]
    Origin,
    /// The buffer centre stays in place.
    Centre,
}

impl Pivot {
    pub fn key(&self) -> &'static str {
        match self {
            Pivot::Origin => "origin",
            Pivot::Centre => "centre",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "origin" | "top-left" => Some(Pivot::Origin),
            "centre" | "center" => Some(Pivot::Centre),
            _ => None,
        }
    }
}

/// Rotation by `angle` radians.
///
/// With `resize` the destination grows to the bounding box of the rotated
/// source; without it the destination keeps the source size and the image
/// turns about `pivot`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotateParams {
    pub angle: f32,
    pub resize: bool,
    pub interpolation: Interpolation,
    pub edge_action: EdgeAction,
    /// Ignored when `resize` is set.
    pub pivot: Pivot,
}

impl Default for RotateParams {
    fn default() -> Self {
        Self {
            angle: std::f32::consts::PI,
            resize: true,
            interpolation: Interpolation::Bilinear,
            edge_action: EdgeAction::Zero,
            pivot: Pivot::Origin,
        }
    }
}

impl RotateParams {
    pub const DESCRIPTORS: &'static [ParamDescriptor] = &[
        ParamDescriptor {
            name: "angle",
            label: "Angle",
            kind: ParamKind::Angle,
            min: -std::f32::consts::TAU,
            max: std::f32::consts::TAU,
            default: ParamDefault::Float(std::f32::consts::PI),
        },
        ParamDescriptor {
            name: "resize",
            label: "Resize to fit",
            kind: ParamKind::Bool,
            min: 0.0,
            max: 0.0,
            default: ParamDefault::Bool(true),
        },
        ParamDescriptor {
            name: "interpolation",
            label: "Interpolation",
            kind: ParamKind::Choice(&["nearest", "bilinear"]),
            min: 0.0,
            max: 0.0,
            default: ParamDefault::Choice("bilinear"),
        },
        ParamDescriptor {
            name: "edge_action",
            label: "Edges",
            kind: ParamKind::Choice(&["zero", "clamp", "wrap"]),
            min: 0.0,
            max: 0.0,
            default: ParamDefault::Choice("zero"),
        },
        ParamDescriptor {
            name: "pivot",
            label: "Pivot",
            kind: ParamKind::Choice(&["origin", "centre"]),
            min: 0.0,
            max: 0.0,
            default: ParamDefault::Choice("origin"),
        },
    ];

    pub fn new(angle: f32, resize: bool) -> Self {
        Self { angle, resize, ..Self::default() }
    }

    pub fn validate(&self) -> FilterResult<()> {
        if !self.angle.is_finite() {
            return Err(FilterError::param("angle", format!("must be finite, got {}", self.angle)));
        }
        Ok(())
    }

    pub fn filter(&self, src: &PixelBuffer, dst: Option<PixelBuffer>) -> FilterResult<PixelBuffer> {
        self.validate()?;

        // Whole turns are an exact copy; resampling would only add blur.
        if math::is_full_turn(self.angle) {
            let mut out = prepare_destination(dst, src.width(), src.height())?;
            out.pixels_mut().copy_from_slice(src.pixels());
            return Ok(out);
        }

        let rotation = Rotation::new(self.angle, self.resize, self.pivot, src.width(), src.height());
        resample(src, &rotation, self.interpolation, self.edge_action, dst)
    }

    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        match key {
            "angle" | "angle_deg" => self.angle = parse_angle(key, value)?,
            "resize" => self.resize = parse_bool(key, value)?,
            "interpolation" => {
                self.interpolation =
                    Interpolation::from_key(value).ok_or_else(|| bad_value(key, value))?;
            }
            "edge_action" => {
                self.edge_action = EdgeAction::from_key(value).ok_or_else(|| bad_value(key, value))?;
            }
            "pivot" => self.pivot = Pivot::from_key(value).ok_or_else(|| bad_value(key, value))?,
            _ => return Err(SettingError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn to_settings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("angle", self.angle.to_string()),
            ("resize", self.resize.to_string()),
            ("interpolation", self.interpolation.key().to_string()),
            ("edge_action", self.edge_action.key().to_string()),
            ("pivot", self.pivot.key().to_string()),
        ]
    }
}

/// Rotation mapping: forward `x' = x·cos + y·sin`, `y' = y·cos − x·sin`.
struct Rotation {
    cos: f32,
    sin: f32,
    /// Fixed point in continuous coordinates. The origin pivot sits on the
    /// centre of pixel (0, 0), so that pixel maps onto itself.
    cx: f32,
    cy: f32,
    resize: bool,
}

impl Rotation {
    fn new(angle: f32, resize: bool, pivot: Pivot, width: u32, height: u32) -> Self {
        let (cx, cy) = match (resize, pivot) {
            (true, _) => (0.0, 0.0),
            (false, Pivot::Origin) => (0.5, 0.5),
            (false, Pivot::Centre) => (width as f32 / 2.0, height as f32 / 2.0),
        };
        Self { cos: angle.cos(), sin: angle.sin(), cx, cy, resize }
    }

    fn forward(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.cos + y * self.sin, y * self.cos - x * self.sin)
    }
}

/// Snap values that are an integer up to float noise.
fn snap(v: f32) -> f32 {
    let r = v.round();
    if (v - r).abs() < 1e-3 { r } else { v }
}

impl InverseTransform for Rotation {
    fn transform_space(&self, src: Rect) -> Rect {
        if !self.resize {
            return src;
        }
        let (x0, y0) = (src.x as f32, src.y as f32);
        let (x1, y1) = (x0 + src.width as f32, y0 + src.height as f32);
        let corners = [
            self.forward(x0, y0),
            self.forward(x1, y0),
            self.forward(x0, y1),
            self.forward(x1, y1),
        ];
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for (x, y) in corners {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let min_x = snap(min_x).floor() as i32;
        let min_y = snap(min_y).floor() as i32;
        let max_x = snap(max_x).ceil() as i32;
        let max_y = snap(max_y).ceil() as i32;
        Rect {
            x: min_x,
            y: min_y,
            width: (max_x - min_x).max(0) as u32,
            height: (max_y - min_y).max(0) as u32,
        }
    }

    fn transform_inverse(&self, x: f32, y: f32) -> (f32, f32) {
        let (x, y) = (x - self.cx, y - self.cy);
        (
            x * self.cos - y * self.sin + self.cx,
            y * self.cos + x * self.sin + self.cy,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI, TAU};

    fn gradient(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::from_fn(w, h, |x, y| 0xff00_0000 | (x * 16) << 16 | (y * 16) << 8 | 0x40).unwrap()
    }

    #[test]
    fn zero_angle_without_resize_is_identity_for_both_samplers() {
        let src = gradient(5, 3);
        for interp in [Interpolation::NearestNeighbour, Interpolation::Bilinear] {
            let params = RotateParams { angle: 0.0, resize: false, interpolation: interp, ..Default::default() };
            assert_eq!(params.filter(&src, None).unwrap(), src);
        }
    }

    #[test]
    fn small_angle_nearest_neighbour_keeps_centre() {
        let src = gradient(9, 9);
        let params = RotateParams {
            angle: 0.01,
            resize: false,
            interpolation: Interpolation::NearestNeighbour,
            pivot: Pivot::Centre,
            ..Default::default()
        };
        let out = params.filter(&src, None).unwrap();
        assert_eq!(out.get(4, 4), src.get(4, 4));
    }

    #[test]
    fn quarter_turn_with_resize_swaps_dimensions_and_permutes_pixels() {
        let src = gradient(6, 4);
        let params = RotateParams {
            angle: FRAC_PI_2,
            resize: true,
            interpolation: Interpolation::NearestNeighbour,
            ..Default::default()
        };
        let out = params.filter(&src, None).unwrap();
        assert_eq!(out.dimensions(), (4, 6));
        // dst (x, y) samples src (w - 1 - y, x)
        for y in 0..6 {
            for x in 0..4 {
                assert_eq!(out.get(x, y), src.get(5 - y, x), "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn half_turn_in_place_reverses_the_buffer() {
        let src = gradient(4, 3);
        let params = RotateParams {
            angle: PI,
            resize: false,
            interpolation: Interpolation::NearestNeighbour,
            pivot: Pivot::Centre,
            ..Default::default()
        };
        let out = params.filter(&src, None).unwrap();
        let mut reversed = src.pixels().to_vec();
        reversed.reverse();
        assert_eq!(out.pixels(), &reversed[..]);
    }

    #[test]
    fn quarter_turn_in_place_keeps_the_top_left_pixel() {
        let src = PixelBuffer::from_fn(4, 4, |x, y| 0xff00_0000 | x << 8 | y).unwrap();
        let params = RotateParams {
            angle: FRAC_PI_2,
            resize: false,
            interpolation: Interpolation::NearestNeighbour,
            ..Default::default()
        };
        let out = params.filter(&src, None).unwrap();
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.get(0, 0), Ok(0xff00_0000));
        // dst (x, y) samples src (-y, x): only the top row stays inside.
        for x in 0..4 {
            assert_eq!(out.get(x, 0), src.get(0, x), "at ({x}, 0)");
            for y in 1..4 {
                assert_eq!(out.get(x, y), Ok(0), "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn full_turn_matches_zero() {
        let src = gradient(7, 5);
        let a = RotateParams::new(TAU, false).filter(&src, None).unwrap();
        let b = RotateParams::new(-2.0 * TAU, true).filter(&src, None).unwrap();
        assert_eq!(a, src);
        assert_eq!(b, src);
    }

    #[test]
    fn corners_fall_outside_under_zero_edges() {
        let src = PixelBuffer::filled(8, 8, 0xffff_ffff).unwrap();
        let out = RotateParams::new(PI / 4.0, true).filter(&src, None).unwrap();
        assert!(out.width() > 8 && out.height() > 8);
        assert_eq!(out.get(0, 0), Ok(0));
        let (cx, cy) = (out.width() as i64 / 2, out.height() as i64 / 2);
        assert_eq!(out.get(cx, cy), Ok(0xffff_ffff));
    }

    #[test]
    fn clamp_and_wrap_never_leave_holes() {
        let src = PixelBuffer::filled(6, 6, 0xff20_4060).unwrap();
        for edge in [EdgeAction::Clamp, EdgeAction::Wrap] {
            let params = RotateParams { angle: 0.7, resize: true, edge_action: edge, ..Default::default() };
            let out = params.filter(&src, None).unwrap();
            assert!(out.pixels().iter().all(|&p| p == 0xff20_4060), "{:?}", edge);
        }
    }

    #[test]
    fn edge_resolve() {
        assert_eq!(EdgeAction::Zero.resolve(-1, 4), None);
        assert_eq!(EdgeAction::Clamp.resolve(-1, 4), Some(0));
        assert_eq!(EdgeAction::Clamp.resolve(9, 4), Some(3));
        assert_eq!(EdgeAction::Wrap.resolve(-1, 4), Some(3));
        assert_eq!(EdgeAction::Wrap.resolve(5, 4), Some(1));
    }

    #[test]
    fn non_finite_angle_is_rejected() {
        let src = gradient(2, 2);
        let err = RotateParams::new(f32::NAN, true).filter(&src, None);
        assert!(matches!(err, Err(FilterError::InvalidParameter { name: "angle", .. })));
    }

    #[test]
    fn settings_accept_degrees_and_choices() {
        let mut p = RotateParams::default();
        p.apply_setting("angle_deg", "90").unwrap();
        p.apply_setting("interpolation", "nearest").unwrap();
        p.apply_setting("edge_action", "wrap").unwrap();
        p.apply_setting("resize", "false").unwrap();
        p.apply_setting("pivot", "center").unwrap();
        assert_eq!(p.pivot, Pivot::Centre);
        assert!(p.apply_setting("pivot", "middle").is_err());
        assert!((p.angle - FRAC_PI_2).abs() < 1e-6);
        assert_eq!(p.interpolation, Interpolation::NearestNeighbour);
        assert_eq!(p.edge_action, EdgeAction::Wrap);
        assert!(!p.resize);
    }
}
