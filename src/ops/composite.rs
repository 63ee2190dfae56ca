// ============================================================================
// COMPOSITE: blend-mode engine over packed ARGB samples
// ============================================================================
//
// Every mode shares one shape: a per-channel `combine(src, dst)` in 8-bit
// integer arithmetic, then a mix with the original destination driven by
// the effective alpha `extra_alpha * src_alpha / 255`. Final values are
// truncated, not rounded, so results match 8-bit fixed-point references.

use std::time::Instant;

use rayon::prelude::*;

use super::params::{
    ParamDefault, ParamDescriptor, ParamKind, SettingError, bad_value, parse_f32,
};
use crate::buffer::PixelBuffer;
use crate::color;
use crate::error::{FilterError, FilterResult};
use crate::logger;
use crate::math::multiply255;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    #[default]
    HardLight,
    SoftLight,
    Darken,
    Lighten,
    Difference,
    Exclusion,
    Add,
    Subtract,
    ColorDodge,
    ColorBurn,
    Negation,
}

impl BlendMode {
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::HardLight,
            BlendMode::SoftLight,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::Difference,
            BlendMode::Exclusion,
            BlendMode::Add,
            BlendMode::Subtract,
            BlendMode::ColorDodge,
            BlendMode::ColorBurn,
            BlendMode::Negation,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::HardLight => "Hard Light",
            BlendMode::SoftLight => "Soft Light",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::Difference => "Difference",
            BlendMode::Exclusion => "Exclusion",
            BlendMode::Add => "Add",
            BlendMode::Subtract => "Subtract",
            BlendMode::ColorDodge => "Color Dodge",
            BlendMode::ColorBurn => "Color Burn",
            BlendMode::Negation => "Negation",
        }
    }

    /// Stable lower-case key used in presets and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::HardLight => "hard-light",
            BlendMode::SoftLight => "soft-light",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::Difference => "difference",
            BlendMode::Exclusion => "exclusion",
            BlendMode::Add => "add",
            BlendMode::Subtract => "subtract",
            BlendMode::ColorDodge => "color-dodge",
            BlendMode::ColorBurn => "color-burn",
            BlendMode::Negation => "negation",
        }
    }

    /// Accepts the key, with `_` or spaces in place of `-`, any case.
    pub fn from_key(s: &str) -> Option<Self> {
        let norm = s.trim().to_lowercase().replace(['_', ' '], "-");
        Self::all().iter().copied().find(|m| m.key() == norm)
    }

    /// Combine one source channel with one destination channel (both 0..=255).
    #[inline]
    pub fn combine(self, s: i32, d: i32) -> i32 {
        match self {
            BlendMode::Normal => s,
            BlendMode::Multiply => multiply255(s, d),
            BlendMode::Screen => 255 - multiply255(255 - s, 255 - d),
            BlendMode::Overlay => {
                if d > 127 {
                    255 - 2 * multiply255(255 - s, 255 - d)
                } else {
                    2 * multiply255(s, d)
                }
            }
            BlendMode::HardLight => {
                if s > 127 {
                    255 - 2 * multiply255(255 - s, 255 - d)
                } else {
                    2 * multiply255(s, d)
                }
            }
            BlendMode::SoftLight => {
                let m = multiply255(s, d);
                m + multiply255(d, 255 - multiply255(255 - d, 255 - s) - m)
            }
            BlendMode::Darken => s.min(d),
            BlendMode::Lighten => s.max(d),
            BlendMode::Difference => (d - s).abs(),
            BlendMode::Exclusion => s + d - 2 * multiply255(s, d),
            BlendMode::Add => (s + d).min(255),
            BlendMode::Subtract => (d - s).max(0),
            BlendMode::ColorDodge => {
                if s == 255 {
                    255
                } else {
                    ((d << 8) / (255 - s)).min(255)
                }
            }
            BlendMode::ColorBurn => {
                if s == 0 {
                    0
                } else {
                    (255 - (((255 - d) << 8) / s)).max(0)
                }
            }
            BlendMode::Negation => 255 - (255 - s - d).abs(),
        }
    }
}

/// Blend `src` over `dst` under `mode`, scaled by the global `extra_alpha`.
///
/// With `extra_alpha == 0` the destination is returned unchanged.
pub fn blend(mode: BlendMode, src: u32, dst: u32, extra_alpha: f32) -> u32 {
    let [sa, sr, sg, sb] = color::unpack(src).map(i32::from);
    let [da, dr, dg, db] = color::unpack(dst).map(i32::from);

    let or = mode.combine(sr, dr).clamp(0, 255);
    let og = mode.combine(sg, dg).clamp(0, 255);
    let ob = mode.combine(sb, db).clamp(0, 255);

    let a = extra_alpha * sa as f32 / 255.0;
    let ac = 1.0 - a;

    let mix = |blended: i32, orig: i32| (a * blended as f32 + ac * orig as f32) as i32;
    let out_a = (sa as f32 * extra_alpha + da as f32 * ac) as i32;

    color::pack(
        out_a.clamp(0, 255) as u8,
        mix(or, dr).clamp(0, 255) as u8,
        mix(og, dg).clamp(0, 255) as u8,
        mix(ob, db).clamp(0, 255) as u8,
    )
}

/// Standard non-premultiplied source-over with a global opacity.
///
/// A transparent destination receives the source colour unchanged.
pub fn src_over(src: u32, dst: u32, extra_alpha: f32) -> u32 {
    let sa = color::alpha(src) as f32 / 255.0 * extra_alpha;
    if sa <= 0.0 {
        return dst;
    }
    let da = color::alpha(dst) as f32 / 255.0;
    if da <= 0.0 && extra_alpha >= 1.0 {
        return src;
    }

    let out_a = sa + da * (1.0 - sa);
    let s = color::unpack(src);
    let d = color::unpack(dst);
    let mut out = [0u8; 4];
    out[0] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    for c in 1..4 {
        let v = (s[c] as f32 * sa + d[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    color::pack(out[0], out[1], out[2], out[3])
}

/// Draw `src` onto `dst` with its top-left corner at `(dx, dy)`, combining
/// each overlapping pair with `op(src_px, dst_px)`. Parallel by row.
pub(crate) fn draw_with<F>(src: &PixelBuffer, dst: &mut PixelBuffer, dx: i32, dy: i32, op: F)
where
    F: Fn(u32, u32) -> u32 + Sync,
{
    let dw = dst.width() as i32;
    let sw = src.width() as i32;
    let sh = src.height() as i32;
    let x0 = dx.max(0);
    let x1 = (dx + sw).min(dw);
    if x0 >= x1 {
        return;
    }

    dst.pixels_mut()
        .par_chunks_mut(dw as usize)
        .enumerate()
        .for_each(|(y, row_out)| {
            let sy = y as i32 - dy;
            if sy < 0 || sy >= sh {
                return;
            }
            let row_in = src.row(sy as u32);
            for x in x0..x1 {
                let s = row_in[(x - dx) as usize];
                let d = &mut row_out[x as usize];
                *d = op(s, *d);
            }
        });
}

/// Blend-mode composite of one buffer onto another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Composite {
    pub mode: BlendMode,
    /// Global opacity multiplier, 0..=1.
    pub extra_alpha: f32,
}

impl Default for Composite {
    fn default() -> Self {
        Self { mode: BlendMode::HardLight, extra_alpha: 1.0 }
    }
}

const MODE_KEYS: &[&str] = &[
    "normal", "multiply", "screen", "overlay", "hard-light", "soft-light", "darken",
    "lighten", "difference", "exclusion", "add", "subtract", "color-dodge", "color-burn",
    "negation",
];

impl Composite {
    pub const DESCRIPTORS: &'static [ParamDescriptor] = &[
        ParamDescriptor {
            name: "mode",
            label: "Blend mode",
            kind: ParamKind::Choice(MODE_KEYS),
            min: 0.0,
            max: 0.0,
            default: ParamDefault::Choice("hard-light"),
        },
        ParamDescriptor {
            name: "extra_alpha",
            label: "Opacity",
            kind: ParamKind::Float,
            min: 0.0,
            max: 1.0,
            default: ParamDefault::Float(1.0),
        },
    ];

    pub fn new(mode: BlendMode, extra_alpha: f32) -> Self {
        Self { mode, extra_alpha }
    }

    pub fn validate(&self) -> FilterResult<()> {
        if !(0.0..=1.0).contains(&self.extra_alpha) {
            return Err(FilterError::param(
                "extra_alpha",
                format!("must be within 0..=1, got {}", self.extra_alpha),
            ));
        }
        Ok(())
    }

    /// Composite `src` onto `dst` over their overlapping top-left region.
    pub fn compose(&self, src: &PixelBuffer, dst: &mut PixelBuffer) -> FilterResult<()> {
        self.compose_at(src, dst, 0, 0)
    }

    /// Composite `src` onto `dst` with the source's origin at `(dx, dy)`.
    /// Pixels of `dst` outside the placed source are left untouched.
    pub fn compose_at(
        &self,
        src: &PixelBuffer,
        dst: &mut PixelBuffer,
        dx: i32,
        dy: i32,
    ) -> FilterResult<()> {
        self.validate()?;
        let start = Instant::now();
        let (mode, extra) = (self.mode, self.extra_alpha);
        draw_with(src, dst, dx, dy, |s, d| blend(mode, s, d, extra));
        if logger::is_enabled() {
            let mut settings = self.to_settings();
            settings.push(("at", format!("{},{}", dx, dy)));
            logger::run("composite", src.dimensions(), dst.dimensions(), start.elapsed(), &settings);
        }
        Ok(())
    }

    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        match key {
            "mode" => {
                self.mode = BlendMode::from_key(value).ok_or_else(|| bad_value(key, value))?;
            }
            "extra_alpha" | "opacity" => self.extra_alpha = parse_f32(key, value)?,
            _ => return Err(SettingError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn to_settings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("mode", self.mode.key().to_string()),
            ("extra_alpha", self.extra_alpha.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [u32; 6] = [
        0xff00_0000,
        0xffff_ffff,
        0x8012_3456,
        0x00ab_cdef,
        0xff80_8080,
        0x40ff_0080,
    ];

    #[test]
    fn zero_extra_alpha_is_a_no_op_for_every_mode() {
        for &mode in BlendMode::all() {
            for &s in &SAMPLES {
                for &d in &SAMPLES {
                    assert_eq!(blend(mode, s, d, 0.0), d, "{:?} {:08x} {:08x}", mode, s, d);
                }
            }
        }
    }

    #[test]
    fn hard_light_matches_fixed_point_formula() {
        // s = 200 > 127: 255 - 2 * (55 * 155 / 255) = 255 - 2 * 33 = 189
        assert_eq!(BlendMode::HardLight.combine(200, 100), 189);
        // s = 100 <= 127: 2 * (100 * 200 / 255) = 2 * 78 = 156
        assert_eq!(BlendMode::HardLight.combine(100, 200), 156);

        let out = blend(BlendMode::HardLight, 0xffc8_6400, 0xff64_c832, 1.0);
        assert_eq!(color::unpack(out), [255, 189, 156, 0]);
    }

    #[test]
    fn hard_light_self_blend_of_mid_grey_is_near_identity() {
        let grey = 0xff80_8080;
        let out = blend(BlendMode::HardLight, grey, grey, 1.0);
        for c in 1..4 {
            let v = color::unpack(out)[c] as i32;
            assert!((v - 128).abs() <= 1, "channel {} = {}", c, v);
        }
        assert_eq!(color::alpha(out), 255);
    }

    #[test]
    fn half_extra_alpha_truncates() {
        // a = 0.5, blended R = 255, dest R = 0 -> trunc(127.5) = 127
        let out = blend(BlendMode::Normal, 0xffff_0000, 0xff00_0000, 0.5);
        assert_eq!(color::red(out), 127);
        // alpha = trunc(255 * 0.5 + 255 * 0.5) = 255
        assert_eq!(color::alpha(out), 255);
    }

    #[test]
    fn mode_keys_round_trip() {
        for &m in BlendMode::all() {
            assert_eq!(BlendMode::from_key(m.key()), Some(m));
        }
        assert_eq!(BlendMode::from_key("Hard_Light"), Some(BlendMode::HardLight));
        assert_eq!(BlendMode::from_key("sparkle"), None);
        assert_eq!(MODE_KEYS.len(), BlendMode::all().len());
    }

    #[test]
    fn src_over_basics() {
        let red = 0xffff_0000;
        assert_eq!(src_over(red, 0, 1.0), red);
        assert_eq!(src_over(0, 0xff00_ff00, 1.0), 0xff00_ff00);
        let half = src_over(red, 0xff00_0000, 0.5);
        assert_eq!(color::unpack(half), [255, 128, 0, 0]);
    }

    #[test]
    fn compose_at_only_touches_the_overlap() {
        let src = PixelBuffer::filled(2, 2, 0xffff_ffff).unwrap();
        let mut dst = PixelBuffer::filled(4, 4, 0xff00_0000).unwrap();
        Composite::new(BlendMode::Normal, 1.0).compose_at(&src, &mut dst, 3, -1).unwrap();
        assert_eq!(dst.get(3, 0), Ok(0xffff_ffff));
        assert_eq!(dst.get(3, 1), Ok(0xff00_0000));
        assert_eq!(dst.get(2, 0), Ok(0xff00_0000));
    }

    #[test]
    fn out_of_range_opacity_is_rejected() {
        let src = PixelBuffer::new(1, 1).unwrap();
        let mut dst = PixelBuffer::new(1, 1).unwrap();
        let err = Composite::new(BlendMode::Screen, 1.5).compose(&src, &mut dst);
        assert!(matches!(err, Err(FilterError::InvalidParameter { name: "extra_alpha", .. })));
    }

    #[test]
    fn settings_parse_into_typed_fields() {
        let mut c = Composite::default();
        c.apply_setting("mode", "color-dodge").unwrap();
        c.apply_setting("opacity", "0.25").unwrap();
        assert_eq!(c, Composite::new(BlendMode::ColorDodge, 0.25));
        assert!(c.apply_setting("mode", "sparkle").is_err());
        assert_eq!(
            c.apply_setting("bogus", "1"),
            Err(SettingError::UnknownKey("bogus".into()))
        );
    }
}
