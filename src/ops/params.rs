// ============================================================================
// PARAMETER DESCRIPTORS: static tables a host UI can enumerate
// ============================================================================
//
// Each filter declares its tunables as plain struct fields plus one
// `DESCRIPTORS` table. Hosts read the table to build editors and then write
// the typed fields directly; nothing here inspects structs at runtime.
// `apply_setting` on each params struct is the only place textual keys are
// resolved, and it is only used by the preset/CLI layer.

use crate::color;

/// Value type of a filter parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamKind {
    /// Plain number.
    Float,
    /// Angle in radians (editors usually show degrees).
    Angle,
    Bool,
    /// Packed `0xAARRGGBB`.
    Color,
    /// One of a fixed list of names.
    Choice(&'static [&'static str]),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamDefault {
    Float(f32),
    Bool(bool),
    Color(u32),
    Choice(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: ParamKind,
    /// Inclusive range for numeric kinds; ignored otherwise.
    pub min: f32,
    pub max: f32,
    pub default: ParamDefault,
}

impl ParamDescriptor {
    /// Human-readable one-line summary, e.g. for `--list-params`.
    pub fn describe(&self) -> String {
        let range = match self.kind {
            ParamKind::Float => format!("{} .. {}", self.min, self.max),
            ParamKind::Angle => format!(
                "{}° .. {}°",
                self.min.to_degrees().round(),
                self.max.to_degrees().round()
            ),
            ParamKind::Bool => "true | false".to_string(),
            ParamKind::Color => "#AARRGGBB".to_string(),
            ParamKind::Choice(options) => options.join(" | "),
        };
        let default = match self.default {
            ParamDefault::Float(v) if self.kind == ParamKind::Angle => {
                format!("{}°", v.to_degrees().round())
            }
            ParamDefault::Float(v) => format!("{}", v),
            ParamDefault::Bool(v) => format!("{}", v),
            ParamDefault::Color(c) => color::format(c),
            ParamDefault::Choice(c) => c.to_string(),
        };
        format!(
            "{:<16} {:<22} [{}] default {}",
            self.name, self.label, range, default
        )
    }
}

/// Error returned when a textual setting cannot be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingError {
    UnknownKey(String),
    BadValue { key: String, value: String },
}

impl std::fmt::Display for SettingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingError::UnknownKey(k) => write!(f, "unknown parameter '{}'", k),
            SettingError::BadValue { key, value } => {
                write!(f, "cannot parse '{}' for parameter '{}'", value, key)
            }
        }
    }
}

impl std::error::Error for SettingError {}

pub(crate) fn bad_value(key: &str, value: &str) -> SettingError {
    SettingError::BadValue { key: key.to_string(), value: value.to_string() }
}

pub(crate) fn parse_f32(key: &str, value: &str) -> Result<f32, SettingError> {
    value.trim().parse::<f32>().map_err(|_| bad_value(key, value))
}

/// Keys ending in `_deg` carry degrees; everything else is radians.
pub(crate) fn parse_angle(key: &str, value: &str) -> Result<f32, SettingError> {
    let v = parse_f32(key, value)?;
    Ok(if key.ends_with("_deg") { v.to_radians() } else { v })
}

pub(crate) fn parse_bool(key: &str, value: &str) -> Result<bool, SettingError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(bad_value(key, value)),
    }
}

pub(crate) fn parse_color(key: &str, value: &str) -> Result<u32, SettingError> {
    color::parse(value).ok_or_else(|| bad_value(key, value))
}

/// Numeric default of a descriptor, for tests and editors.
pub fn default_f32(table: &[ParamDescriptor], name: &str) -> Option<f32> {
    table.iter().find(|d| d.name == name).and_then(|d| match d.default {
        ParamDefault::Float(v) => Some(v),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{BlurParams, ShadowParams};

    #[test]
    fn numeric_defaults_come_from_the_table() {
        let shadow = ShadowParams::default();
        assert_eq!(default_f32(ShadowParams::DESCRIPTORS, "radius"), Some(shadow.radius));
        assert_eq!(default_f32(ShadowParams::DESCRIPTORS, "opacity"), Some(shadow.opacity));
        assert_eq!(default_f32(BlurParams::DESCRIPTORS, "radius"), Some(BlurParams::default().radius));
        // Non-numeric and unknown entries have no float default.
        assert_eq!(default_f32(ShadowParams::DESCRIPTORS, "shadow_only"), None);
        assert_eq!(default_f32(ShadowParams::DESCRIPTORS, "wobble"), None);
    }

    #[test]
    fn angle_keys_accept_degrees() {
        let r = parse_angle("angle_deg", "90").unwrap();
        assert!((r - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(parse_angle("angle", "1.5").unwrap(), 1.5);
        assert!(parse_angle("angle", "abc").is_err());
    }

    #[test]
    fn bools_and_colours() {
        assert_eq!(parse_bool("k", "Yes"), Ok(true));
        assert_eq!(parse_bool("k", "off"), Ok(false));
        assert!(parse_bool("k", "maybe").is_err());
        assert_eq!(parse_color("c", "#FF000000"), Ok(0xff00_0000));
    }

    #[test]
    fn describe_shows_degrees_for_angles() {
        let d = ParamDescriptor {
            name: "angle",
            label: "Angle",
            kind: ParamKind::Angle,
            min: 0.0,
            max: std::f32::consts::TAU,
            default: ParamDefault::Float(std::f32::consts::PI),
        };
        let line = d.describe();
        assert!(line.contains("0° .. 360°"), "{line}");
        assert!(line.ends_with("default 180°"), "{line}");
    }
}
