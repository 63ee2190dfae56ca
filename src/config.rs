// ============================================================================
// PRESETS: `key=value` files that select and configure one operation
// ============================================================================
//
//   # soft drop shadow, down and to the right
//   filter=shadow
//   angle_deg=-45
//   distance=8
//   radius=6
//   shadow_color=#FF202040
//
// One `filter=` line names the operation; every other line sets one of its
// parameters. Blank lines and `#` comments are ignored.

use std::path::Path;

use crate::ops::params::{ParamDescriptor, SettingError};
use crate::ops::{Composite, Filter};

/// Anything a preset can describe: a single-input filter or a composite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operation {
    Filter(Filter),
    Composite(Composite),
}

impl Operation {
    pub fn all_names() -> &'static [&'static str] {
        &["rotate", "halftone", "shadow", "blur", "composite"]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let norm = name.trim().to_lowercase();
        if norm == "composite" {
            return Some(Operation::Composite(Composite::default()));
        }
        Filter::from_name(&norm).map(Operation::Filter)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Filter(f) => f.name(),
            Operation::Composite(_) => "composite",
        }
    }

    pub fn descriptors(&self) -> &'static [ParamDescriptor] {
        match self {
            Operation::Filter(f) => f.descriptors(),
            Operation::Composite(_) => Composite::DESCRIPTORS,
        }
    }

    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        match self {
            Operation::Filter(f) => f.apply_setting(key, value),
            Operation::Composite(c) => c.apply_setting(key, value),
        }
    }

    /// Apply `key=value` overrides, e.g. from repeated `--set` flags.
    pub fn apply_overrides<S: AsRef<str>>(&mut self, pairs: &[S]) -> Result<(), ConfigError> {
        for (i, pair) in pairs.iter().enumerate() {
            let pair = pair.as_ref();
            let Some((key, value)) = pair.split_once('=') else {
                return Err(ConfigError::Malformed { line: i + 1, text: pair.to_string() });
            };
            self.apply_setting(key.trim(), value.trim())
                .map_err(|error| ConfigError::Setting { line: i + 1, error })?;
        }
        Ok(())
    }

    pub fn to_settings(&self) -> Vec<(&'static str, String)> {
        match self {
            Operation::Filter(f) => f.to_settings(),
            Operation::Composite(c) => c.to_settings(),
        }
    }

    /// Render as a preset file that [`parse_preset`] reads back unchanged.
    pub fn to_preset(&self) -> String {
        let mut out = format!("filter={}\n", self.name());
        for (key, value) in self.to_settings() {
            out.push_str(&format!("{}={}\n", key, value));
        }
        out
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    MissingFilter,
    UnknownFilter(String),
    /// A line that is neither blank, a comment, nor `key=value`.
    Malformed { line: usize, text: String },
    Setting { line: usize, error: SettingError },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::MissingFilter => write!(f, "preset has no 'filter=' line"),
            ConfigError::UnknownFilter(name) => write!(
                f,
                "unknown filter '{}' (expected one of: {})",
                name,
                Operation::all_names().join(", ")
            ),
            ConfigError::Malformed { line, text } => {
                write!(f, "line {}: expected key=value, got '{}'", line, text)
            }
            ConfigError::Setting { line, error } => write!(f, "line {}: {}", line, error),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Parse preset text. The `filter=` line may appear anywhere; parameter
/// lines are applied in file order.
pub fn parse_preset(content: &str) -> Result<Operation, ConfigError> {
    let mut entries = Vec::new();
    let mut op = None;

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, val)) = line.split_once('=') else {
            return Err(ConfigError::Malformed { line: idx + 1, text: line.to_string() });
        };
        let key = key.trim();
        let val = val.trim();
        if key == "filter" {
            op = Some(Operation::from_name(val).ok_or_else(|| ConfigError::UnknownFilter(val.to_string()))?);
        } else {
            entries.push((idx + 1, key, val));
        }
    }

    let mut op = op.ok_or(ConfigError::MissingFilter)?;
    for (line, key, val) in entries {
        op.apply_setting(key, val)
            .map_err(|error| ConfigError::Setting { line, error })?;
    }
    Ok(op)
}

pub fn load_preset(path: &Path) -> Result<Operation, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let op = parse_preset(&content)?;
    crate::log_info!("preset {} loaded: {}", path.display(), op.name());
    Ok(op)
}
