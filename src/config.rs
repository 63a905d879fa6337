use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables of the mesh pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Render distance in columns (Chebyshev).
    pub view_distance: i32,
    /// Scheduling pauses while this many built meshes wait for upload.
    pub max_meshes_to_load: usize,
    pub upload_budget_moving_ms: u64,
    pub upload_budget_still_ms: u64,
    /// Cap on concurrently building sections; defaults to workers - 1.
    pub max_preparing_tasks: Option<usize>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            view_distance: 10,
            max_meshes_to_load: 100,
            upload_budget_moving_ms: 20,
            upload_budget_still_ms: 50,
            max_preparing_tasks: None,
        }
    }
}

impl RendererConfig {
    pub fn frame_budget(&self, moving: bool) -> Duration {
        Duration::from_millis(if moving {
            self.upload_budget_moving_ms
        } else {
            self.upload_budget_still_ms
        })
    }

    pub fn preparing_cap(&self, worker_count: usize) -> usize {
        self.max_preparing_tasks
            .unwrap_or(worker_count.saturating_sub(1))
            .max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.view_distance < 0 {
            return Err(ConfigError::Invalid(format!(
                "view_distance must be >= 0, got {}",
                self.view_distance
            )));
        }
        if self.max_meshes_to_load == 0 {
            return Err(ConfigError::Invalid("max_meshes_to_load must be >= 1".into()));
        }
        if self.upload_budget_moving_ms == 0 || self.upload_budget_still_ms == 0 {
            return Err(ConfigError::Invalid("upload budgets must be >= 1 ms".into()));
        }
        Ok(())
    }
}

/// Headless demo settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub seed: i32,
    /// Columns streamed in around the origin.
    pub radius: i32,
    pub frames: u32,
    /// Camera speed in blocks per frame.
    pub camera_speed: f32,
    /// Simulated network delay between column arrivals.
    pub column_interval_ms: u64,
    /// Random block edits applied per frame once the world is in.
    pub edits_per_frame: u32,
    pub stats_every: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            radius: 8,
            frames: 600,
            camera_speed: 0.4,
            column_interval_ms: 2,
            edits_per_frame: 2,
            stats_every: 60,
        }
    }
}

/// Top-level config file: `[renderer]` and `[demo]` tables, both optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodeConfig {
    pub renderer: RendererConfig,
    pub demo: DemoConfig,
}

impl LodeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: LodeConfig = toml::from_str(text)?;
        cfg.renderer.validate()?;
        Ok(cfg)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
