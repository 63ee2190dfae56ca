//! Packed `0xAARRGGBB` colour helpers.
//!
//! Channels are extracted and combined exactly; no rounding happens here.

#[inline]
pub fn alpha(argb: u32) -> u8 {
    (argb >> 24) as u8
}

#[inline]
pub fn red(argb: u32) -> u8 {
    (argb >> 16) as u8
}

#[inline]
pub fn green(argb: u32) -> u8 {
    (argb >> 8) as u8
}

#[inline]
pub fn blue(argb: u32) -> u8 {
    argb as u8
}

/// Pack four channels into one sample.
#[inline]
pub fn pack(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Split a sample into `[a, r, g, b]`.
#[inline]
pub fn unpack(argb: u32) -> [u8; 4] {
    [alpha(argb), red(argb), green(argb), blue(argb)]
}

/// Convert to the `[r, g, b, a]` byte order used by `image::Rgba`.
#[inline]
pub fn to_rgba(argb: u32) -> [u8; 4] {
    [red(argb), green(argb), blue(argb), alpha(argb)]
}

#[inline]
pub fn from_rgba(p: [u8; 4]) -> u32 {
    pack(p[3], p[0], p[1], p[2])
}

/// Channels as f32 `[a, r, g, b]` with colour premultiplied by alpha.
#[inline]
pub fn premultiplied(argb: u32) -> [f32; 4] {
    let [a, r, g, b] = unpack(argb);
    let af = a as f32 / 255.0;
    [a as f32, r as f32 * af, g as f32 * af, b as f32 * af]
}

/// Inverse of [`premultiplied`], rounding and clamping back to 8 bits.
#[inline]
pub fn unpremultiplied(px: [f32; 4]) -> u32 {
    let a = px[0].round().clamp(0.0, 255.0);
    if a <= 0.0 {
        return 0;
    }
    // Divide by the unrounded alpha so colour survives exactly.
    let inv = 255.0 / px[0];
    pack(
        a as u8,
        (px[1] * inv).round().clamp(0.0, 255.0) as u8,
        (px[2] * inv).round().clamp(0.0, 255.0) as u8,
        (px[3] * inv).round().clamp(0.0, 255.0) as u8,
    )
}

/// Parse `#AARRGGBB`, `#RRGGBB` (opaque) or `a,r,g,b`.
pub fn parse(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let v = u32::from_str_radix(hex, 16).ok()?;
        return match hex.len() {
            8 => Some(v),
            6 => Some(0xff00_0000 | v),
            _ => None,
        };
    }
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() == 4 {
        let a = parts[0].trim().parse::<u8>().ok()?;
        let r = parts[1].trim().parse::<u8>().ok()?;
        let g = parts[2].trim().parse::<u8>().ok()?;
        let b = parts[3].trim().parse::<u8>().ok()?;
        Some(pack(a, r, g, b))
    } else {
        None
    }
}

/// Format as `#AARRGGBB`.
pub fn format(argb: u32) -> String {
    format!("#{:08X}", argb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_is_exact() {
        let c = pack(0x12, 0x34, 0x56, 0x78);
        assert_eq!(c, 0x1234_5678);
        assert_eq!(unpack(c), [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(from_rgba(to_rgba(c)), c);
    }

    #[test]
    fn parse_accepts_hex_and_csv() {
        assert_eq!(parse("#80FF0000"), Some(0x80ff_0000));
        assert_eq!(parse("#00ff00"), Some(0xff00_ff00));
        assert_eq!(parse("255, 0, 0, 255"), Some(0xff00_00ff));
        assert_eq!(parse("#abc"), None);
        assert_eq!(parse("#+1234567"), None);
        assert_eq!(parse("#-12345"), None);
        assert_eq!(parse("1,2,3"), None);
    }

    #[test]
    fn premultiply_round_trip_keeps_opaque_colours() {
        let c = pack(255, 10, 200, 33);
        assert_eq!(unpremultiplied(premultiplied(c)), c);
        assert_eq!(unpremultiplied(premultiplied(pack(0, 9, 9, 9))), 0);
    }
}
