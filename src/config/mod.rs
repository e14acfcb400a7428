//! Scene and run configuration.
//!
//! Values come from, highest priority first:
//! 1. CLI flags (`--width`, `--height`, `--delay-ms`, `--no-draw`)
//! 2. a JSON file given with `--config`
//! 3. built-in defaults
//!
//! ```json
//! {
//!   "width": 26,
//!   "height": 16,
//!   "start": { "x": 1, "y": 1, "heading": 2 },
//!   "drawingEnabled": true,
//!   "stepDelayMs": 0
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actions::MovementOptions;
use crate::movement::{CharacterState, Direction, Pose, SceneBounds};
use crate::program::{ProgramBlock, ProgramError, ProgramSequence};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("scene bounds {width}x{height} are empty")]
    InvalidBounds { width: i32, height: i32 },
    #[error(transparent)]
    Program(#[from] ProgramError),
}

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SceneConfig {
    #[serde(default = "default_width")]
    pub width: i32,
    #[serde(default = "default_height")]
    pub height: i32,
    /// Clamped into the scene when the character is created.
    #[serde(default = "default_start")]
    pub start: Pose,
    #[serde(default = "default_drawing_enabled")]
    pub drawing_enabled: bool,
    #[serde(default)]
    pub step_delay_ms: u64,
}

fn default_width() -> i32 {
    26
}
fn default_height() -> i32 {
    16
}
fn default_start() -> Pose {
    Pose::new(1, 1, Direction::East)
}
fn default_drawing_enabled() -> bool {
    true
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            width: default_width(),
            height: default_height(),
            start: default_start(),
            drawing_enabled: default_drawing_enabled(),
            step_delay_ms: 0,
        }
    }
}

/// Per-field replacements, typically from CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneOverrides {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub step_delay_ms: Option<u64>,
    pub no_draw: bool,
}

impl SceneConfig {
    pub fn load(path: &Path) -> Result<Self> {
        SceneConfig::read_file(path)?.validate()
    }

    /// Defaults, or `path` if given, with `overrides` on top. Bounds are
    /// checked once, after the overrides apply.
    pub fn resolve(path: Option<&Path>, overrides: &SceneOverrides) -> Result<Self> {
        let base = match path {
            Some(p) => SceneConfig::read_file(p)?,
            None => SceneConfig::default(),
        };
        base.with_overrides(overrides).validate()
    }

    fn read_file(path: &Path) -> Result<Self> {
        let text = read(path)?;
        parse(path, &text)
    }

    pub fn with_overrides(mut self, overrides: &SceneOverrides) -> Self {
        if let Some(w) = overrides.width {
            self.width = w;
        }
        if let Some(h) = overrides.height {
            self.height = h;
        }
        if let Some(ms) = overrides.step_delay_ms {
            self.step_delay_ms = ms;
        }
        if overrides.no_draw {
            self.drawing_enabled = false;
        }
        self
    }

    pub fn validate(self) -> Result<Self> {
        if self.width < 1 || self.height < 1 {
            return Err(ConfigError::InvalidBounds { width: self.width, height: self.height });
        }
        Ok(self)
    }

    pub fn bounds(&self) -> SceneBounds {
        SceneBounds::new(self.width, self.height)
    }

    pub fn initial_character(&self) -> CharacterState {
        CharacterState::new(self.start, self.bounds())
    }

    pub fn movement_options(&self) -> MovementOptions {
        MovementOptions {
            drawing_enabled: self.drawing_enabled,
            step_delay: Duration::from_millis(self.step_delay_ms),
        }
    }
}

/// Read a program file: a JSON array of blocks.
pub fn load_program(path: &Path) -> Result<ProgramSequence> {
    let text = read(path)?;
    let blocks: Vec<ProgramBlock> = parse(path, &text)?;
    Ok(ProgramSequence::from_blocks(blocks)?)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}
