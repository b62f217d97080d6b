//! Tunable parameters of the conversion.
//!
//! Defaults match the typesetter's marker conventions. A TOML file can
//! override any of them; missing keys keep their default.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{Coord, Nanos};

/// Length given to each grace note when there is room for it (125 ms).
pub const DEFAULT_GRACE_NOTE_UNIT: Nanos = 125_000_000;

/// Largest amount a release is moved earlier to separate it from a
/// re-press of the same key (75 ms).
pub const DEFAULT_RELEASE_SHORTENING_CAP: Nanos = 75_000_000;

/// Slack around a system skyline when collecting its staves (0.1 unit).
pub const DEFAULT_SYSTEM_TOLERANCE: Coord = 1000;

/// Colours of the `<g color=...>` groups the typesetter uses to draw skylines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SkylineColors {
    pub system_top: String,
    pub system_bottom: String,
    pub staff_top: String,
    pub staff_bottom: String,
}

impl Default for SkylineColors {
    fn default() -> Self {
        Self {
            system_top: "#ff0000".into(),
            system_bottom: "#00ff00".into(),
            staff_top: "#0000ff".into(),
            staff_bottom: "#ff00ff".into(),
        }
    }
}

/// Options controlling the conversion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    pub grace_note_unit_ns: Nanos,
    pub release_shortening_cap_ns: Nanos,
    pub system_tolerance: Coord,
    pub skyline_colors: SkylineColors,
    /// Directory receiving JSON dumps of every intermediate stage.
    pub debug_dump_dir: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            grace_note_unit_ns: DEFAULT_GRACE_NOTE_UNIT,
            release_shortening_cap_ns: DEFAULT_RELEASE_SHORTENING_CAP,
            system_tolerance: DEFAULT_SYSTEM_TOLERANCE,
            skyline_colors: SkylineColors::default(),
            debug_dump_dir: None,
        }
    }
}

impl Options {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: Options =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let options: Options = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grace_note_unit_ns == 0 {
            return Err(Error::Config("grace_note_unit_ns must be positive".into()));
        }
        if self.system_tolerance < 0 {
            return Err(Error::Config("system_tolerance can't be negative".into()));
        }
        let c = &self.skyline_colors;
        let mut colors = [
            c.system_top.trim().to_ascii_lowercase(),
            c.system_bottom.trim().to_ascii_lowercase(),
            c.staff_top.trim().to_ascii_lowercase(),
            c.staff_bottom.trim().to_ascii_lowercase(),
        ];
        colors.sort();
        if colors.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::Config("skyline colors must be distinct".into()));
        }
        Ok(())
    }
}
