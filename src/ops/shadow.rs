// ============================================================================
// DROP SHADOW: blurred alpha silhouette composited behind the source
// ============================================================================

use rayon::prelude::*;

use super::blur::gaussian_blur;
use super::composite::{draw_with, src_over};
use super::params::{
    ParamDefault, ParamDescriptor, ParamKind, SettingError, parse_angle, parse_bool, parse_color,
    parse_f32,
};
use super::transform::EdgeAction;
use crate::buffer::{PixelBuffer, prepare_destination};
use crate::color;
use crate::error::{FilterError, FilterResult};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowParams {
    /// Direction the shadow falls, radians, counter-clockwise from +x.
    pub angle: f32,
    /// Offset length in pixels.
    pub distance: f32,
    /// Blur radius in pixels.
    pub radius: f32,
    /// 0..=1
    pub opacity: f32,
    /// Packed ARGB; only the colour channels are used.
    pub shadow_color: u32,
    /// Grow the canvas so the shadow is not clipped.
    pub add_margins: bool,
    /// Leave the source out and output the shadow alone.
    pub shadow_only: bool,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            angle: std::f32::consts::PI * 7.0 / 8.0,
            distance: 5.0,
            radius: 5.0,
            opacity: 0.5,
            shadow_color: 0xff00_0000,
            add_margins: false,
            shadow_only: false,
        }
    }
}

/// Upper bound for `distance` and `radius`, in pixels.
pub const MAX_EXTENT: f32 = super::blur::MAX_RADIUS;

impl ShadowParams {
    pub const DESCRIPTORS: &'static [ParamDescriptor] = &[
        ParamDescriptor {
            name: "angle",
            label: "Angle",
            kind: ParamKind::Angle,
            min: 0.0,
            max: std::f32::consts::TAU,
            default: ParamDefault::Float(std::f32::consts::PI * 7.0 / 8.0),
        },
        ParamDescriptor {
            name: "distance",
            label: "Distance",
            kind: ParamKind::Float,
            min: 0.0,
            max: MAX_EXTENT,
            default: ParamDefault::Float(5.0),
        },
        ParamDescriptor {
            name: "radius",
            label: "Blur radius",
            kind: ParamKind::Float,
            min: 0.0,
            max: MAX_EXTENT,
            default: ParamDefault::Float(5.0),
        },
        ParamDescriptor {
            name: "opacity",
            label: "Opacity",
            kind: ParamKind::Float,
            min: 0.0,
            max: 1.0,
            default: ParamDefault::Float(0.5),
        },
        ParamDescriptor {
            name: "shadow_color",
            label: "Shadow colour",
            kind: ParamKind::Color,
            min: 0.0,
            max: 0.0,
            default: ParamDefault::Color(0xff00_0000),
        },
        ParamDescriptor {
            name: "add_margins",
            label: "Add margins",
            kind: ParamKind::Bool,
            min: 0.0,
            max: 0.0,
            default: ParamDefault::Bool(false),
        },
        ParamDescriptor {
            name: "shadow_only",
            label: "Shadow only",
            kind: ParamKind::Bool,
            min: 0.0,
            max: 0.0,
            default: ParamDefault::Bool(false),
        },
    ];

    /// Build from a blur radius and an explicit `(dx, dy)` pixel offset
    /// (+y down), so that [`ShadowParams::offset`] returns `(dx, dy)`.
    pub fn from_offsets(radius: f32, dx: f32, dy: f32, opacity: f32) -> Self {
        Self {
            radius,
            angle: (-dy).atan2(dx),
            distance: (dx * dx + dy * dy).sqrt(),
            opacity,
            ..Self::default()
        }
    }

    /// Shadow displacement in image space (+y down).
    pub fn offset(&self) -> (f32, f32) {
        (
            self.distance * self.angle.cos(),
            -self.distance * self.angle.sin(),
        )
    }

    pub fn validate(&self) -> FilterResult<()> {
        for (name, v) in [
            ("angle", self.angle),
            ("distance", self.distance),
            ("radius", self.radius),
            ("opacity", self.opacity),
        ] {
            if !v.is_finite() {
                return Err(FilterError::param(name, format!("must be finite, got {}", v)));
            }
        }
        for (name, v) in [("distance", self.distance), ("radius", self.radius)] {
            if !(0.0..=MAX_EXTENT).contains(&v) {
                return Err(FilterError::param(
                    name,
                    format!("must be within 0..={}, got {}", MAX_EXTENT, v),
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(FilterError::param(
                "opacity",
                format!("must be within 0..=1, got {}", self.opacity),
            ));
        }
        Ok(())
    }

    /// Output canvas size for a `width × height` source.
    pub fn output_size(&self, width: u32, height: u32) -> FilterResult<(u32, u32)> {
        if !self.add_margins {
            return Ok((width, height));
        }
        let (xo, yo) = self.offset();
        let grow = |side: u32, extra: f32| {
            side.checked_add(extra as u32)
                .ok_or_else(|| FilterError::param("distance", "margins overflow the canvas size"))
        };
        Ok((grow(width, xo.abs() + self.radius)?, grow(height, yo.abs() + self.radius)?))
    }

    pub fn filter(&self, src: &PixelBuffer, dst: Option<PixelBuffer>) -> FilterResult<PixelBuffer> {
        self.validate()?;
        let (w, h) = self.output_size(src.width(), src.height())?;
        let mut out = prepare_destination(dst, w, h)?;

        let (xo, yo) = self.offset();
        let (left, top) = if self.add_margins {
            let r2 = self.radius / 2.0;
            ((r2 - xo).max(0.0), (r2 - yo).max(0.0))
        } else {
            (0.0, 0.0)
        };

        let pad = self.radius.ceil() as u32;
        let mut shadow = self.silhouette(src, pad)?;
        if self.radius >= 0.5 {
            shadow = gaussian_blur(&shadow, self.radius, true, EdgeAction::Zero);
        }

        let opacity = self.opacity;
        let sx = (left + xo).round() as i32 - pad as i32;
        let sy = (top + yo).round() as i32 - pad as i32;
        draw_with(&shadow, &mut out, sx, sy, |s, d| src_over(s, d, opacity));

        if !self.shadow_only {
            draw_with(src, &mut out, left.round() as i32, top.round() as i32, |s, d| {
                src_over(s, d, 1.0)
            });
        }
        Ok(out)
    }

    /// Shadow-coloured copy of the source's alpha channel, inset in a
    /// transparent border of `pad` pixels so the blur has room to spread.
    fn silhouette(&self, src: &PixelBuffer, pad: u32) -> FilterResult<PixelBuffer> {
        let [_, sr, sg, sb] = color::unpack(self.shadow_color).map(|c| c as f32 / 255.0);
        let opacity = self.opacity;
        let (sw, sh) = src.dimensions();
        let padded = |side: u32| {
            pad.checked_mul(2)
                .and_then(|p| side.checked_add(p))
                .ok_or_else(|| FilterError::param("radius", "blur padding overflows the canvas size"))
        };
        let mut shadow = PixelBuffer::new(padded(sw)?, padded(sh)?)?;
        let stride = shadow.width() as usize;

        shadow
            .pixels_mut()
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row_out)| {
                let Some(y) = (y as u32).checked_sub(pad).filter(|&y| y < sh) else {
                    return;
                };
                let row_in = src.row(y);
                let row_out = &mut row_out[pad as usize..pad as usize + sw as usize];
                for (o, &p) in row_out.iter_mut().zip(row_in) {
                    let a = color::alpha(p) as f32;
                    let ch = |f: f32| (f * a).round().clamp(0.0, 255.0) as u8;
                    *o = color::pack(ch(opacity), ch(sr), ch(sg), ch(sb));
                }
            });
        Ok(shadow)
    }

    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        match key {
            "angle" | "angle_deg" => self.angle = parse_angle(key, value)?,
            "distance" => self.distance = parse_f32(key, value)?,
            "radius" => self.radius = parse_f32(key, value)?,
            "opacity" => self.opacity = parse_f32(key, value)?,
            "shadow_color" | "color" => self.shadow_color = parse_color(key, value)?,
            "add_margins" => self.add_margins = parse_bool(key, value)?,
            "shadow_only" => self.shadow_only = parse_bool(key, value)?,
            _ => return Err(SettingError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn to_settings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("angle", self.angle.to_string()),
            ("distance", self.distance.to_string()),
            ("radius", self.radius.to_string()),
            ("opacity", self.opacity.to_string()),
            ("shadow_color", color::format(self.shadow_color)),
            ("add_margins", self.add_margins.to_string()),
            ("shadow_only", self.shadow_only.to_string()),
        ]
    }
}
