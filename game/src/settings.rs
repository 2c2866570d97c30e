use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine::input::DIFF_REFIRE_DELAY;
use engine::stepper::{DEFAULT_INTERVAL, INTERVAL_STEP, clamp_interval};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::blocks::DEFAULT_MAX_EVALUATIONS;

pub const MIN_MAZE_SIZE: usize = 2;
pub const MAX_MAZE_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunnerSettings {
    #[serde(with = "millis")]
    pub initial_interval: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INTERVAL,
        }
    }
}

impl RunnerSettings {
    /// Clamps to the runner's range and snaps to its speed increments.
    pub fn sanitized(mut self) -> Self {
        let step = INTERVAL_STEP.as_millis();
        let millis = clamp_interval(self.initial_interval).as_millis();
        let snapped = (millis + step / 2) / step * step;
        self.initial_interval = clamp_interval(Duration::from_millis(snapped as u64));
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputSettings {
    #[serde(with = "millis")]
    pub refire_delay: Duration,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            refire_delay: DIFF_REFIRE_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MazeSettings {
    pub size: usize,
    pub seed: u64,
}

impl Default for MazeSettings {
    fn default() -> Self {
        Self { size: 8, seed: 1 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockSettings {
    pub max_evaluations_per_step: usize,
}

impl Default for BlockSettings {
    fn default() -> Self {
        Self {
            max_evaluations_per_step: DEFAULT_MAX_EVALUATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Settings {
    #[serde(default)]
    pub runner: RunnerSettings,
    #[serde(default)]
    pub input: InputSettings,
    #[serde(default)]
    pub maze: MazeSettings,
    #[serde(default)]
    pub blocks: BlockSettings,
}

impl Settings {
    pub fn sanitized(mut self) -> Self {
        self.runner = self.runner.sanitized();
        self.maze.size = self.maze.size.clamp(MIN_MAZE_SIZE, MAX_MAZE_SIZE);
        self.blocks.max_evaluations_per_step = self.blocks.max_evaluations_per_step.max(1);
        self
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed settings at {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("MAZEWALK_SETTINGS_PATH") {
            return Self::new(explicit);
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));

        Self::new(base.join("mazewalk").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads settings, falling back to defaults when the file is missing or
    /// unreadable.
    pub fn load(&self) -> Settings {
        match self.try_load() {
            Ok(settings) => settings,
            Err(SettingsError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Settings::default()
            }
            Err(err) => {
                warn!(error = %err, "using default settings");
                Settings::default()
            }
        }
    }

    pub fn try_load(&self) -> Result<Settings, SettingsError> {
        let bytes = fs::read(&self.path).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_slice(&bytes).map_err(|source| SettingsError::Json {
                path: self.path.clone(),
                source,
            })?;
        Ok(settings.sanitized())
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let text = serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text).map_err(io_err)
    }
}

/// Durations as whole milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
