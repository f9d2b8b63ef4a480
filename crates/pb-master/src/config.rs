//! YAML configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pb_engine::DEFAULT_MASTER_VOLUME;
use pb_ir::{FxParams, BLOCK_FRAMES};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typed error so callers can tell a missing file from a bad document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_yml::Error),
}

fn default_tempo() -> f32 {
    110.0
}

fn default_presets() -> bool {
    true
}

fn default_block_frames() -> usize {
    BLOCK_FRAMES
}

fn default_master_volume() -> u8 {
    DEFAULT_MASTER_VOLUME
}

fn default_source_volume() -> u8 {
    100
}

/// Session configuration. Every field is optional; out-of-range values are
/// clamped when applied.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_tempo")]
    pub tempo: f32,

    /// Pattern selected at start.
    #[serde(default)]
    pub pattern: usize,

    /// Load the stock grooves into the first pattern slots.
    #[serde(default = "default_presets")]
    pub presets: bool,

    /// Advance to the next preset every this many bars.
    #[serde(default)]
    pub cycle_bars: Option<u32>,

    #[serde(default = "default_block_frames")]
    pub block_frames: usize,

    #[serde(default = "default_master_volume")]
    pub master_volume: u8,

    #[serde(default = "default_source_volume")]
    pub sequencer_volume: u8,

    #[serde(default = "default_source_volume")]
    pub live_volume: u8,

    /// Pad index to WAV file, relative to the config file.
    #[serde(default)]
    pub pads: BTreeMap<u8, PathBuf>,

    #[serde(default)]
    pub fx: FxParams,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tempo: default_tempo(),
            pattern: 0,
            presets: default_presets(),
            cycle_bars: None,
            block_frames: default_block_frames(),
            master_volume: default_master_volume(),
            sequencer_volume: default_source_volume(),
            live_volume: default_source_volume(),
            pads: BTreeMap::new(),
            fx: FxParams::default(),
            base_dir: None,
        }
    }
}

impl Config {
    /// Parse a YAML document. Relative pad paths resolve against the
    /// working directory.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Load from a file. Relative pad paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&text)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Pad sample paths with relative entries resolved.
    pub fn pad_paths(&self) -> impl Iterator<Item = (u8, PathBuf)> + '_ {
        self.pads.iter().map(|(&pad, file)| {
            let path = match &self.base_dir {
                Some(dir) if file.is_relative() => dir.join(file),
                _ => file.clone(),
            };
            (pad, path)
        })
    }

    /// Render block size, bounded to what the engine accepts in one pass.
    pub fn block_frames(&self) -> usize {
        self.block_frames.clamp(16, pb_ir::MAX_BLOCK_FRAMES)
    }
}
