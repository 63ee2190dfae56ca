// ============================================================================
// GAUSSIAN BLUR: separable, rayon-parallel, premultiplied
// ============================================================================

use rayon::prelude::*;

use super::params::{
    ParamDefault, ParamDescriptor, ParamKind, SettingError, bad_value, parse_bool, parse_f32,
};
use super::transform::EdgeAction;
use crate::buffer::{PixelBuffer, prepare_destination};
use crate::color;
use crate::error::{FilterError, FilterResult};

/// Largest accepted blur radius, in pixels.
pub const MAX_RADIUS: f32 = 1000.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlurParams {
    /// Kernel half-width in pixels; σ = radius / 3.
    pub radius: f32,
    /// Blur premultiplied colour so transparent pixels do not bleed.
    pub premultiply: bool,
    pub edge_action: EdgeAction,
}

impl Default for BlurParams {
    fn default() -> Self {
        Self { radius: 2.0, premultiply: true, edge_action: EdgeAction::Clamp }
    }
}

impl BlurParams {
    pub const DESCRIPTORS: &'static [ParamDescriptor] = &[
        ParamDescriptor {
            name: "radius",
            label: "Radius",
            kind: ParamKind::Float,
            min: 0.1,
            max: MAX_RADIUS,
            default: ParamDefault::Float(2.0),
        },
        ParamDescriptor {
            name: "premultiply",
            label: "Premultiply alpha",
            kind: ParamKind::Bool,
            min: 0.0,
            max: 0.0,
            default: ParamDefault::Bool(true),
        },
        ParamDescriptor {
            name: "edge_action",
            label: "Edges",
            kind: ParamKind::Choice(&["zero", "clamp", "wrap"]),
            min: 0.0,
            max: 0.0,
            default: ParamDefault::Choice("clamp"),
        },
    ];

    pub fn new(radius: f32) -> Self {
        Self { radius, ..Self::default() }
    }

    pub fn validate(&self) -> FilterResult<()> {
        if !(self.radius > 0.0 && self.radius <= MAX_RADIUS) {
            return Err(FilterError::param(
                "radius",
                format!("must be within (0, {}], got {}", MAX_RADIUS, self.radius),
            ));
        }
        Ok(())
    }

    pub fn filter(&self, src: &PixelBuffer, dst: Option<PixelBuffer>) -> FilterResult<PixelBuffer> {
        self.validate()?;
        let out = prepare_destination(dst, src.width(), src.height())?;
        Ok(gaussian_blur_into(src, self.radius, self.premultiply, self.edge_action, out))
    }

    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        match key {
            "radius" => self.radius = parse_f32(key, value)?,
            "premultiply" => self.premultiply = parse_bool(key, value)?,
            "edge_action" => {
                self.edge_action = EdgeAction::from_key(value).ok_or_else(|| bad_value(key, value))?;
            }
            _ => return Err(SettingError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn to_settings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("radius", self.radius.to_string()),
            ("premultiply", self.premultiply.to_string()),
            ("edge_action", self.edge_action.key().to_string()),
        ]
    }
}

/// Build a normalised 1-D Gaussian kernel of half-width `ceil(radius)`, σ = radius / 3.
fn build_gaussian_kernel(radius: f32) -> Vec<f32> {
    let half = radius.ceil().max(0.0) as usize;
    if half == 0 {
        return vec![1.0];
    }
    let sigma = radius / 3.0;
    let s2 = 2.0 * sigma * sigma;
    let len = half * 2 + 1;
    let mut kernel = vec![0.0f32; len];
    let mut sum = 0.0f32;
    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - half as f32;
        let v = (-x * x / s2).exp();
        *k = v;
        sum += v;
    }
    let inv = 1.0 / sum;
    for v in &mut kernel {
        *v *= inv;
    }
    kernel
}

/// Blur `src` into a freshly allocated buffer of the same size.
pub(crate) fn gaussian_blur(
    src: &PixelBuffer,
    radius: f32,
    premultiply: bool,
    edge: EdgeAction,
) -> PixelBuffer {
    let out = src.clone();
    gaussian_blur_into(src, radius, premultiply, edge, out)
}

/// Separable blur: horizontal pass into an f32 scratch buffer, then a
/// vertical pass written straight into `out` (which must match `src` in size).
fn gaussian_blur_into(
    src: &PixelBuffer,
    radius: f32,
    premultiply: bool,
    edge: EdgeAction,
    mut out: PixelBuffer,
) -> PixelBuffer {
    let w = src.width() as usize;
    let h = src.height() as usize;
    let kernel = build_gaussian_kernel(radius);
    let half = (kernel.len() / 2) as isize;

    let buf_in: Vec<[f32; 4]> = src
        .pixels()
        .par_iter()
        .map(|&p| {
            if premultiply {
                color::premultiplied(p)
            } else {
                color::unpack(p).map(f32::from)
            }
        })
        .collect();

    // --- Horizontal pass (parallel by row) ---
    let mut buf_h = vec![[0.0f32; 4]; w * h];
    buf_h.par_chunks_mut(w).enumerate().for_each(|(y, row_out)| {
        let row_in = &buf_in[y * w..(y + 1) * w];
        for (x, px) in row_out.iter_mut().enumerate() {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let Some(sx) = edge.resolve(x as isize + ki as isize - half, w) else {
                    continue;
                };
                let p = row_in[sx];
                for c in 0..4 {
                    acc[c] += p[c] * kv;
                }
            }
            *px = acc;
        }
    });

    // --- Vertical pass (parallel by row) ---
    out.pixels_mut().par_chunks_mut(w).enumerate().for_each(|(y, row_out)| {
        for (x, px) in row_out.iter_mut().enumerate() {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let Some(sy) = edge.resolve(y as isize + ki as isize - half, h) else {
                    continue;
                };
                let p = buf_h[sy * w + x];
                for c in 0..4 {
                    acc[c] += p[c] * kv;
                }
            }
            *px = if premultiply {
                color::unpremultiplied(acc)
            } else {
                let [a, r, g, b] = acc.map(|v| v.round().clamp(0.0, 255.0) as u8);
                color::pack(a, r, g, b)
            };
        }
    });

    out
}
