// ============================================================================
// COLOR HALFTONE: per-channel angled dot screens
// ============================================================================
//
// Each of the R, G and B lanes gets its own rotated dot grid (the cyan,
// magenta and yellow screens). A dot's radius grows as the channel gets
// darker; the output lane is 255 outside every dot and falls to 0 inside.

use rayon::prelude::*;

use super::params::{
    ParamDefault, ParamDescriptor, ParamKind, SettingError, parse_angle, parse_f32,
};
use crate::buffer::{PixelBuffer, prepare_destination};
use crate::error::{FilterError, FilterResult};
use crate::math::{clamp_int, modulo, smooth_step};

const SQRT_2: f32 = 1.414;

/// Offsets of the snapped cell and its four axis neighbours, in grid units.
const NEIGHBOURS_X: [f32; 5] = [0.0, -1.0, 1.0, 0.0, 0.0];
const NEIGHBOURS_Y: [f32; 5] = [0.0, 0.0, 0.0, -1.0, 1.0];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalftoneParams {
    /// Screen angle of the red lane, radians.
    pub cyan_angle: f32,
    /// Screen angle of the green lane, radians.
    pub magenta_angle: f32,
    /// Screen angle of the blue lane, radians.
    pub yellow_angle: f32,
    /// Maximum dot radius in pixels.
    pub dot_radius: f32,
}

impl Default for HalftoneParams {
    fn default() -> Self {
        Self {
            cyan_angle: 108f32.to_radians(),
            magenta_angle: 162f32.to_radians(),
            yellow_angle: 90f32.to_radians(),
            dot_radius: 2.0,
        }
    }
}

impl HalftoneParams {
    pub const DESCRIPTORS: &'static [ParamDescriptor] = &[
        ParamDescriptor {
            name: "cyan_angle",
            label: "Cyan screen angle",
            kind: ParamKind::Angle,
            min: 0.0,
            max: std::f32::consts::TAU,
            default: ParamDefault::Float(108.0 * std::f32::consts::PI / 180.0),
        },
        ParamDescriptor {
            name: "magenta_angle",
            label: "Magenta screen angle",
            kind: ParamKind::Angle,
            min: 0.0,
            max: std::f32::consts::TAU,
            default: ParamDefault::Float(162.0 * std::f32::consts::PI / 180.0),
        },
        ParamDescriptor {
            name: "yellow_angle",
            label: "Yellow screen angle",
            kind: ParamKind::Angle,
            min: 0.0,
            max: std::f32::consts::TAU,
            default: ParamDefault::Float(std::f32::consts::FRAC_PI_2),
        },
        ParamDescriptor {
            name: "dot_radius",
            label: "Dot radius",
            kind: ParamKind::Float,
            min: 1.0,
            max: 100.0,
            default: ParamDefault::Float(2.0),
        },
    ];

    pub fn validate(&self) -> FilterResult<()> {
        if !(self.dot_radius.is_finite() && self.dot_radius > 0.0) {
            return Err(FilterError::param(
                "dot_radius",
                format!("must be a positive number, got {}", self.dot_radius),
            ));
        }
        for (name, a) in [
            ("cyan_angle", self.cyan_angle),
            ("magenta_angle", self.magenta_angle),
            ("yellow_angle", self.yellow_angle),
        ] {
            if !a.is_finite() {
                return Err(FilterError::param(name, format!("must be finite, got {}", a)));
            }
        }
        Ok(())
    }

    pub fn filter(&self, src: &PixelBuffer, dst: Option<PixelBuffer>) -> FilterResult<PixelBuffer> {
        self.validate()?;
        let (width, height) = src.dimensions();
        let mut out = prepare_destination(dst, width, height)?;

        let grid = 2.0 * self.dot_radius * SQRT_2;
        let screens = [
            Screen::new(self.cyan_angle, 16),
            Screen::new(self.magenta_angle, 8),
            Screen::new(self.yellow_angle, 0),
        ];

        out.pixels_mut()
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, row_out)| {
                let row_in = src.row(y as u32);
                for (o, &p) in row_out.iter_mut().zip(row_in) {
                    *o = p & 0xff00_0000 | 0x00ff_ffff;
                }
                for screen in &screens {
                    let mask = 0xffu32 << screen.shift;
                    for (x, o) in row_out.iter_mut().enumerate() {
                        let f = screen.coverage(src, x as f32, y as f32, grid);
                        let v = ((255.0 * f) as u32) << screen.shift;
                        *o &= v ^ !mask | 0xff00_0000;
                    }
                }
            });

        Ok(out)
    }

    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        match key {
            "cyan_angle" | "cyan_angle_deg" => self.cyan_angle = parse_angle(key, value)?,
            "magenta_angle" | "magenta_angle_deg" => self.magenta_angle = parse_angle(key, value)?,
            "yellow_angle" | "yellow_angle_deg" => self.yellow_angle = parse_angle(key, value)?,
            "dot_radius" | "radius" => self.dot_radius = parse_f32(key, value)?,
            _ => return Err(SettingError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn to_settings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("cyan_angle", self.cyan_angle.to_string()),
            ("magenta_angle", self.magenta_angle.to_string()),
            ("yellow_angle", self.yellow_angle.to_string()),
            ("dot_radius", self.dot_radius.to_string()),
        ]
    }
}

/// One channel's rotated dot grid.
struct Screen {
    sin: f32,
    cos: f32,
    /// Bit offset of the channel's byte lane.
    shift: u32,
}

impl Screen {
    fn new(angle: f32, shift: u32) -> Self {
        Self { sin: angle.sin(), cos: angle.cos(), shift }
    }

    /// Lane value in `0..=1` at `(x, y)`: 1 is paper, 0 is fully inked.
    ///
    /// Dots from adjacent cells can reach into this pixel, so the snapped
    /// cell and its four neighbours are all tested and the minimum wins.
    fn coverage(&self, src: &PixelBuffer, x: f32, y: f32, grid: f32) -> f32 {
        let half = grid / 2.0;
        let (w, h) = (src.width() as i32, src.height() as i32);
        let pixels = src.pixels();

        // Into screen space, then onto the nearest grid point.
        let tx = x * self.cos + y * self.sin;
        let ty = -x * self.sin + y * self.cos;
        let tx = tx - modulo(tx - half, grid) + half;
        let ty = ty - modulo(ty - half, grid) + half;

        let mut f = 1.0f32;
        for i in 0..5 {
            let ttx = tx + NEIGHBOURS_X[i] * grid;
            let tty = ty + NEIGHBOURS_Y[i] * grid;
            // Back into image space.
            let ntx = ttx * self.cos - tty * self.sin;
            let nty = ttx * self.sin + tty * self.cos;

            let nx = clamp_int(ntx as i32, 0, w - 1);
            let ny = clamp_int(nty as i32, 0, h - 1);
            let argb = pixels[(ny * w + nx) as usize];
            let l = ((argb >> self.shift) & 0xff) as f32 / 255.0;
            let dot = (1.0 - l * l) * half * SQRT_2;

            let dx = x - ntx;
            let dy = y - nty;
            let r = (dx * dx + dy * dy).sqrt();
            let f2 = 1.0 - smooth_step(r, r + 1.0, dot);
            f = f.min(f2);
        }
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color;

    #[test]
    fn white_stays_white_and_keeps_alpha() {
        let src = PixelBuffer::filled(16, 12, 0x80ff_ffff).unwrap();
        let out = HalftoneParams::default().filter(&src, None).unwrap();
        assert!(out.pixels().iter().all(|&p| p == 0x80ff_ffff));
    }

    #[test]
    fn black_is_mostly_inked() {
        let src = PixelBuffer::filled(32, 32, 0xff00_0000).unwrap();
        let out = HalftoneParams::default().filter(&src, None).unwrap();
        for lane in [color::red, color::green, color::blue] {
            let mean = out.pixels().iter().map(|&p| lane(p) as f32).sum::<f32>() / 1024.0;
            assert!(mean < 64.0, "mean lane value {}", mean);
        }
        assert!(out.pixels().iter().all(|&p| color::alpha(p) == 255));
    }

    #[test]
    fn single_channel_only_inks_its_own_lane() {
        // Red lane is full, green/blue empty: only the magenta and yellow
        // screens should draw dots.
        let src = PixelBuffer::filled(24, 24, 0xffff_0000).unwrap();
        let out = HalftoneParams::default().filter(&src, None).unwrap();
        assert!(out.pixels().iter().all(|&p| color::red(p) == 255));
        assert!(out.pixels().iter().any(|&p| color::green(p) < 255));
    }

    #[test]
    fn darker_input_means_more_ink() {
        let light = PixelBuffer::filled(32, 32, 0xffc0_c0c0).unwrap();
        let dark = PixelBuffer::filled(32, 32, 0xff40_4040).unwrap();
        let params = HalftoneParams { dot_radius: 3.0, ..Default::default() };
        let sum = |b: &PixelBuffer| b.pixels().iter().map(|&p| color::green(p) as u64).sum::<u64>();
        let l = params.filter(&light, None).unwrap();
        let d = params.filter(&dark, None).unwrap();
        assert!(sum(&d) < sum(&l));
    }

    /// Lane value at `(x, y)` computed directly from the dot formula, taking
    /// the minimum over the given grid-cell offsets.
    fn lane_by_formula(
        src: &PixelBuffer,
        angle: f32,
        shift: u32,
        radius: f32,
        (x, y): (f32, f32),
        cells: &[(f32, f32)],
    ) -> u32 {
        let grid = 2.0 * radius * SQRT_2;
        let half = grid / 2.0;
        let (sin, cos) = (angle.sin(), angle.cos());
        let snap = |t: f32| t - modulo(t - half, grid) + half;
        let tx = snap(x * cos + y * sin);
        let ty = snap(-x * sin + y * cos);

        let mut f = 1.0f32;
        for &(cx, cy) in cells {
            let (gx, gy) = (tx + cx * grid, ty + cy * grid);
            let (ix, iy) = (gx * cos - gy * sin, gx * sin + gy * cos);
            let px = src.pixel_clamped(ix as i32, iy as i32);
            let l = ((px >> shift) & 0xff) as f32 / 255.0;
            let dot = (1.0 - l * l) * half * SQRT_2;
            let (dx, dy) = (x - ix, y - iy);
            let r = (dx * dx + dy * dy).sqrt();
            f = f.min(1.0 - smooth_step(r, r + 1.0, dot));
        }
        (255.0 * f) as u32
    }

    #[test]
    fn dots_from_neighbouring_cells_reach_across_a_step_edge() {
        // Black on the left, white on the right.
        let src = PixelBuffer::from_fn(24, 16, |x, _| if x < 12 { 0xff00_0000 } else { 0xffff_ffff })
            .unwrap();
        let params = HalftoneParams { dot_radius: 2.0, ..Default::default() };
        let out = params.filter(&src, None).unwrap();

        let five = [(0.0, 0.0), (-1.0, 0.0), (1.0, 0.0), (0.0, -1.0), (0.0, 1.0)];
        let lanes = [(params.cyan_angle, 16), (params.magenta_angle, 8), (params.yellow_angle, 0)];
        let mut bleeds = 0;
        for y in 0..16u32 {
            for x in 0..24u32 {
                let p = out.get(x as i64, y as i64).unwrap();
                for &(angle, shift) in &lanes {
                    let at = (x as f32, y as f32);
                    let expected = lane_by_formula(&src, angle, shift, 2.0, at, &five);
                    let centre_only = lane_by_formula(&src, angle, shift, 2.0, at, &five[..1]);
                    let actual = (p >> shift) & 0xff;
                    assert!(
                        actual.abs_diff(expected) <= 1,
                        "({x}, {y}) lane {shift}: got {actual}, expected {expected}"
                    );
                    if centre_only.abs_diff(expected) > 8 {
                        bleeds += 1;
                    }
                }
            }
        }
        // The edge only shows up correctly when neighbour dots are included.
        assert!(bleeds > 0);
    }

    #[test]
    fn output_keeps_source_size_even_with_a_mismatched_destination() {
        let src = PixelBuffer::filled(5, 3, 0xff80_8080).unwrap();
        let dst = PixelBuffer::new(9, 9).unwrap();
        let out = HalftoneParams::default().filter(&src, Some(dst)).unwrap();
        assert_eq!(out.dimensions(), (5, 3));
    }

    #[test]
    fn non_positive_radius_is_rejected() {
        let src = PixelBuffer::new(2, 2).unwrap();
        for r in [0.0, -2.0] {
            let params = HalftoneParams { dot_radius: r, ..Default::default() };
            assert!(matches!(
                params.filter(&src, None),
                Err(FilterError::InvalidParameter { name: "dot_radius", .. })
            ));
        }
    }
}
