//! Pixel-buffer image filters over packed 8-bit ARGB bitmaps.
//!
//! Every single-input filter follows the same contract:
//! `params.filter(&src, Option<dst>) -> Result<PixelBuffer, FilterError>`.
//! Two-input blending lives on [`ops::Composite`].
//!
//! ```no_run
//! use pixelops::{PixelBuffer, ops::RotateParams};
//!
//! let src = PixelBuffer::filled(64, 32, 0xff20_80c0)?;
//! let rotated = RotateParams::new(std::f32::consts::FRAC_PI_2, true).filter(&src, None)?;
//! assert_eq!(rotated.dimensions(), (32, 64));
//! # Ok::<(), pixelops::FilterError>(())
//! ```

pub mod buffer;
pub mod cli;
pub mod color;
pub mod config;
pub mod error;
pub mod io;
pub mod logger;
pub mod math;
pub mod ops;

pub use buffer::PixelBuffer;
pub use config::{ConfigError, Operation};
pub use error::{FilterError, FilterResult};
pub use io::IoError;
pub use ops::{BlendMode, BlurParams, Composite, Filter, HalftoneParams, RotateParams, ShadowParams};
