// ============================================================================
// OPS: pixel-buffer filters and the closed set that dispatches them
// ============================================================================

pub mod blur;
pub mod composite;
pub mod halftone;
pub mod params;
pub mod shadow;
pub mod transform;

use std::time::Instant;

pub use blur::BlurParams;
pub use composite::{BlendMode, Composite, blend, src_over};
pub use halftone::HalftoneParams;
pub use params::{ParamDefault, ParamDescriptor, ParamKind, SettingError};
pub use shadow::ShadowParams;
pub use transform::{EdgeAction, Interpolation, InverseTransform, Pivot, Rect, RotateParams, resample};

use crate::buffer::PixelBuffer;
use crate::error::FilterResult;
use crate::logger;

/// Every single-input filter, each carrying its own parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Filter {
    Rotate(RotateParams),
    Halftone(HalftoneParams),
    Shadow(ShadowParams),
    Blur(BlurParams),
}

impl Filter {
    pub fn all_names() -> &'static [&'static str] {
        &["rotate", "halftone", "shadow", "blur"]
    }

    /// The filter named `name`, with default parameters.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "rotate" => Some(Filter::Rotate(RotateParams::default())),
            "halftone" | "color-halftone" => Some(Filter::Halftone(HalftoneParams::default())),
            "shadow" | "drop-shadow" => Some(Filter::Shadow(ShadowParams::default())),
            "blur" | "gaussian-blur" => Some(Filter::Blur(BlurParams::default())),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Filter::Rotate(_) => "rotate",
            Filter::Halftone(_) => "halftone",
            Filter::Shadow(_) => "shadow",
            Filter::Blur(_) => "blur",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Filter::Rotate(_) => "Rotate",
            Filter::Halftone(_) => "Color Halftone",
            Filter::Shadow(_) => "Drop Shadow",
            Filter::Blur(_) => "Gaussian Blur",
        }
    }

    pub fn descriptors(&self) -> &'static [ParamDescriptor] {
        match self {
            Filter::Rotate(_) => RotateParams::DESCRIPTORS,
            Filter::Halftone(_) => HalftoneParams::DESCRIPTORS,
            Filter::Shadow(_) => ShadowParams::DESCRIPTORS,
            Filter::Blur(_) => BlurParams::DESCRIPTORS,
        }
    }

    pub fn validate(&self) -> FilterResult<()> {
        match self {
            Filter::Rotate(p) => p.validate(),
            Filter::Halftone(p) => p.validate(),
            Filter::Shadow(p) => p.validate(),
            Filter::Blur(p) => p.validate(),
        }
    }

    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        match self {
            Filter::Rotate(p) => p.apply_setting(key, value),
            Filter::Halftone(p) => p.apply_setting(key, value),
            Filter::Shadow(p) => p.apply_setting(key, value),
            Filter::Blur(p) => p.apply_setting(key, value),
        }
    }

    pub fn to_settings(&self) -> Vec<(&'static str, String)> {
        match self {
            Filter::Rotate(p) => p.to_settings(),
            Filter::Halftone(p) => p.to_settings(),
            Filter::Shadow(p) => p.to_settings(),
            Filter::Blur(p) => p.to_settings(),
        }
    }

    /// Run the filter. `dst` is reused when given; see each filter for how
    /// it is resized.
    pub fn filter(&self, src: &PixelBuffer, dst: Option<PixelBuffer>) -> FilterResult<PixelBuffer> {
        let start = Instant::now();
        let result = match self {
            Filter::Rotate(p) => p.filter(src, dst),
            Filter::Halftone(p) => p.filter(src, dst),
            Filter::Shadow(p) => p.filter(src, dst),
            Filter::Blur(p) => p.filter(src, dst),
        };
        match &result {
            Ok(out) => logger::run(
                self.name(),
                src.dimensions(),
                out.dimensions(),
                start.elapsed(),
                &self.to_settings(),
            ),
            Err(e) => {
                crate::log_warn!("{} rejected: {}", self.name(), e);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for name in Filter::all_names() {
            let f = Filter::from_name(name).unwrap();
            assert_eq!(f.name(), *name);
        }
        assert_eq!(Filter::from_name("sharpen"), None);
    }

    #[test]
    fn descriptor_defaults_match_default_params() {
        for name in Filter::all_names() {
            let f = Filter::from_name(name).unwrap();
            let settings = f.to_settings();
            for d in f.descriptors() {
                let (_, value) = settings
                    .iter()
                    .find(|(k, _)| *k == d.name)
                    .unwrap_or_else(|| panic!("{} has no setting for {}", name, d.name));
                match d.default {
                    ParamDefault::Float(v) => {
                        let actual: f32 = value.parse().unwrap();
                        assert!((actual - v).abs() < 1e-5, "{}.{}", name, d.name);
                    }
                    ParamDefault::Bool(v) => assert_eq!(value, &v.to_string()),
                    ParamDefault::Color(c) => assert_eq!(value, &crate::color::format(c)),
                    ParamDefault::Choice(c) => assert_eq!(value, c),
                }
            }
        }
    }

    #[test]
    fn dispatch_runs_the_selected_filter() {
        let src = PixelBuffer::filled(6, 4, 0xff80_8080).unwrap();
        let mut f = Filter::from_name("rotate").unwrap();
        f.apply_setting("angle_deg", "90").unwrap();
        assert_eq!(f.filter(&src, None).unwrap().dimensions(), (4, 6));

        let bad = Filter::Blur(BlurParams::new(0.0));
        assert!(bad.filter(&src, None).is_err());
    }
}
