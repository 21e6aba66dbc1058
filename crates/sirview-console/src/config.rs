use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sirview_network::TransportConfig;
use sirview_protocol::{
    SimulationParams, AGENT_RADIUS, CANVAS_HEIGHT, CANVAS_WIDTH, DEFAULT_BASE_URL,
    LIVE_HISTORY_CAPACITY, PLAYBACK_TICK_MS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 60,
        }
    }
}

/// Parameters sent with every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub population_size: u32,
    pub duration: u32,
    pub transmission_rate: f64,
    pub recovery_rate: f64,
    pub movement_speed: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let p = SimulationParams::default();
        Self {
            population_size: p.population_size,
            duration: p.duration,
            transmission_rate: p.transmission_rate,
            recovery_rate: p.recovery_rate,
            movement_speed: p.movement_speed,
        }
    }
}

impl SimulationConfig {
    pub fn to_params(&self) -> SimulationParams {
        SimulationParams {
            population_size: self.population_size,
            duration: self.duration,
            transmission_rate: self.transmission_rate,
            recovery_rate: self.recovery_rate,
            movement_speed: self.movement_speed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Batch replay clock period.
    pub tick_ms: u64,
    /// Samples kept on the chart while streaming.
    pub live_history: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_ms: PLAYBACK_TICK_MS,
            live_history: LIVE_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
    pub agent_radius: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            agent_radius: AGENT_RADIUS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Log file for the interactive console. Defaults to the user data dir.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn file_path(&self) -> Option<PathBuf> {
        self.file.clone().or_else(default_log_path)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub server: ServerConfig,
    pub simulation: SimulationConfig,
    pub playback: PlaybackConfig,
    pub canvas: CanvasConfig,
    pub logging: LoggingConfig,
}

impl ViewerConfig {
    /// Load from an explicit path (which must exist), or from the default
    /// location when present, or fall back to defaults. Not validated:
    /// call [`ViewerConfig::validate`] once command-line overrides are in.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation
            .to_params()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.server.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("server.base_url is empty".into()));
        }
        if self.playback.tick_ms == 0 {
            return Err(ConfigError::Invalid("playback.tick_ms must be positive".into()));
        }
        if self.playback.live_history == 0 {
            return Err(ConfigError::Invalid(
                "playback.live_history must be positive".into(),
            ));
        }
        if !(self.canvas.width > 0.0 && self.canvas.height > 0.0 && self.canvas.agent_radius > 0.0)
        {
            return Err(ConfigError::Invalid(
                "canvas dimensions and agent_radius must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            base_url: self.server.base_url.clone(),
            connect_timeout: Duration::from_secs(self.server.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.server.request_timeout_secs),
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.playback.tick_ms)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sirview").join("config.toml"))
}

pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("sirview").join("sirview.log"))
}
