//! Scalar helpers shared by the filters.

use crate::color;

/// True modulo: the result lies in `[0, n)` for every `a` and positive `n`,
/// including negative `a` (`modulo(-3.0, 10.0) == 7.0`).
#[inline]
pub fn modulo(a: f32, n: f32) -> f32 {
    let k = (a / n).trunc();
    let r = a - k * n;
    let r = if r < 0.0 { r + n } else { r };
    // -tiny + n can round up to exactly n.
    if r >= n { 0.0 } else { r }
}

#[inline]
pub fn clamp_int(v: i32, lo: i32, hi: i32) -> i32 {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}

/// Cubic Hermite step: 0 below `edge0`, 1 at or above `edge1`.
#[inline]
pub fn smooth_step(edge0: f32, edge1: f32, x: f32) -> f32 {
    if x < edge0 {
        return 0.0;
    }
    if x >= edge1 {
        return 1.0;
    }
    let t = (x - edge0) / (edge1 - edge0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
pub fn lerp(t: f32, a: f32, b: f32) -> f32 {
    a + t * (b - a)
}

/// 8-bit fixed-point multiply, `a * b / 255` with integer division.
#[inline]
pub fn multiply255(a: i32, b: i32) -> i32 {
    a * b / 255
}

/// Bilinear blend of four packed ARGB samples, per channel, rounded.
///
/// `x_weight`/`y_weight` are the fractional position inside the
/// `nw, ne / sw, se` square.
pub fn bilinear_interpolate(x_weight: f32, y_weight: f32, nw: u32, ne: u32, sw: u32, se: u32) -> u32 {
    let cx = 1.0 - x_weight;
    let cy = 1.0 - y_weight;
    let nw = color::unpack(nw);
    let ne = color::unpack(ne);
    let sw = color::unpack(sw);
    let se = color::unpack(se);
    let mut out = [0u8; 4];
    for c in 0..4 {
        let m0 = cx * nw[c] as f32 + x_weight * ne[c] as f32;
        let m1 = cx * sw[c] as f32 + x_weight * se[c] as f32;
        out[c] = (cy * m0 + y_weight * m1).round().clamp(0.0, 255.0) as u8;
    }
    color::pack(out[0], out[1], out[2], out[3])
}

/// Whether `angle` is (within float noise) a whole number of turns.
#[inline]
pub fn is_full_turn(angle: f32) -> bool {
    let tau = std::f32::consts::TAU;
    let r = modulo(angle, tau);
    r < 1e-6 || tau - r < 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulo_is_non_negative() {
        assert_eq!(modulo(-3.0, 10.0), 7.0);
        assert_eq!(modulo(13.0, 10.0), 3.0);
        assert_eq!(modulo(0.0, 10.0), 0.0);
        assert_eq!(modulo(-10.0, 10.0), 0.0);
        for i in -200..200 {
            let x = i as f32 * 0.37 - 1e-7;
            let r = modulo(x, 5.657);
            assert!((0.0..5.657).contains(&r), "modulo({x}) = {r}");
        }
        let r = modulo(-1e-9, 3.0);
        assert!((0.0..3.0).contains(&r));
    }

    #[test]
    fn smooth_step_edges_and_midpoint() {
        assert_eq!(smooth_step(1.0, 2.0, 0.5), 0.0);
        assert_eq!(smooth_step(1.0, 2.0, 2.0), 1.0);
        assert!((smooth_step(1.0, 2.0, 1.5) - 0.5).abs() < 1e-6);
        assert!((smooth_step(0.0, 1.0, 0.25) - 0.15625).abs() < 1e-6);
    }

    #[test]
    fn clamp_and_multiply() {
        assert_eq!(clamp_int(-4, 0, 9), 0);
        assert_eq!(clamp_int(12, 0, 9), 9);
        assert_eq!(clamp_int(5, 0, 9), 5);
        assert_eq!(multiply255(255, 255), 255);
        assert_eq!(multiply255(127, 127), 63);
        assert_eq!(multiply255(0, 200), 0);
    }

    #[test]
    fn bilinear_corners_and_centre() {
        let black = 0xff00_0000;
        let white = 0xffff_ffff;
        assert_eq!(bilinear_interpolate(0.0, 0.0, white, black, black, black), white);
        let mid = bilinear_interpolate(0.5, 0.0, white, black, white, black);
        assert_eq!(color::red(mid), 128);
        assert_eq!(color::alpha(mid), 255);
    }

    #[test]
    fn full_turns() {
        assert!(is_full_turn(0.0));
        assert!(is_full_turn(std::f32::consts::TAU));
        assert!(is_full_turn(-2.0 * std::f32::consts::TAU));
        assert!(!is_full_turn(std::f32::consts::FRAC_PI_2));
    }
}
