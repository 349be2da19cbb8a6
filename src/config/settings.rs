//! Settings document
//!
//! All configurable options for a bot run. Loaded once from a TOML file at
//! startup; not hot-reloaded.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::strategy::GameState;

/// Errors raised while loading or validating the settings document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Target device platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

/// Which strategy implementation drives decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Stateless indicator scan, first match wins.
    Simple,
    /// Transition-table variant with debounced state changes.
    StateMachine,
}

/// Main settings structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub device: DeviceSettings,
    pub model: ModelSettings,
    pub runtime: RuntimeSettings,
    pub strategy: StrategySettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load and validate settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the run loop cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.fps_limit <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "runtime.fps_limit must be positive, got {}",
                self.runtime.fps_limit
            )));
        }
        if !(0.0..=1.0).contains(&self.model.conf_threshold) {
            return Err(ConfigError::Invalid(format!(
                "model.conf_threshold must be in [0, 1], got {}",
                self.model.conf_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.model.iou_threshold) {
            return Err(ConfigError::Invalid(format!(
                "model.iou_threshold must be in [0, 1], got {}",
                self.model.iou_threshold
            )));
        }
        if self.strategy.action_cooldown < 0.0 {
            return Err(ConfigError::Invalid(
                "strategy.action_cooldown must not be negative".into(),
            ));
        }
        if self.runtime.screenshot_interval == 0 || self.runtime.status_interval == 0 {
            return Err(ConfigError::Invalid(
                "runtime intervals must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Look up a bundled preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "speed" => Some(Self::speed_preset()),
            "stealthy" => Some(Self::stealthy_preset()),
            _ => None,
        }
    }

    /// Preset tuned for throughput: faster loop, short cooldown.
    pub fn speed_preset() -> Self {
        Self {
            runtime: RuntimeSettings {
                fps_limit: 15.0,
                enable_visualization: false,
                save_screenshots: false,
                ..Default::default()
            },
            strategy: StrategySettings {
                action_cooldown: 0.2,
                tap_jitter_radius: 3,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Preset tuned to look less mechanical: slow loop, wide jitter,
    /// debounced state machine.
    pub fn stealthy_preset() -> Self {
        Self {
            runtime: RuntimeSettings {
                fps_limit: 5.0,
                ..Default::default()
            },
            strategy: StrategySettings {
                kind: StrategyKind::StateMachine,
                action_cooldown: 1.2,
                tap_jitter_radius: 8,
                swipe_curve_offset: 80,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Device connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Which driver to use.
    pub platform: Platform,
    /// Device serial for adb; `None` picks the only connected device.
    pub serial: Option<String>,
    /// adb binary to invoke.
    pub adb_path: String,
    /// WebDriverAgent base URL for iOS devices.
    pub wda_url: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            platform: Platform::Android,
            serial: None,
            adb_path: "adb".into(),
            wda_url: "http://localhost:8100".into(),
        }
    }
}

/// Detection model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Path to the ONNX artifact.
    pub path: PathBuf,
    /// Detections below this confidence are discarded.
    pub conf_threshold: f32,
    /// IOU threshold for duplicate suppression.
    pub iou_threshold: f32,
    /// Square input size the model was exported with.
    pub input_size: u32,
    /// Class vocabulary, in model output order. The ONNX artifact does not
    /// carry names; an empty list falls back to `class_<id>` labels.
    pub class_names: Vec<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/best.onnx"),
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            input_size: 640,
            class_names: Vec::new(),
        }
    }
}

/// Run-loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Upper bound on loop iterations per second.
    pub fps_limit: f32,
    /// Render the detection overlay each iteration.
    pub enable_visualization: bool,
    /// Where the latest overlay frame is written.
    pub visualization_path: PathBuf,
    /// Persist a raw frame every `screenshot_interval` iterations.
    pub save_screenshots: bool,
    pub screenshot_interval: u64,
    pub screenshot_dir: PathBuf,
    /// Emit a status log line every this many frames.
    pub status_interval: u64,
    /// Optional TTF font for overlay text labels.
    pub overlay_font: Option<PathBuf>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            fps_limit: 10.0,
            enable_visualization: false,
            visualization_path: PathBuf::from("logs/overlay.png"),
            save_screenshots: false,
            screenshot_interval: 30,
            screenshot_dir: PathBuf::from("logs/screenshots"),
            status_interval: 30,
            overlay_font: None,
        }
    }
}

/// Strategy tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    pub kind: StrategyKind,
    /// Minimum seconds between two emitted decisions.
    pub action_cooldown: f32,
    /// Maximum uniform offset applied to tap targets, in pixels.
    pub tap_jitter_radius: i32,
    /// Segment count for smooth swipes.
    pub swipe_steps: u32,
    /// Maximum perpendicular control-point offset for smooth swipes.
    pub swipe_curve_offset: i32,
    /// State indicator table in priority order: the first entry whose
    /// indicator list matches a detection wins.
    pub states: Vec<StateIndicators>,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            kind: StrategyKind::Simple,
            action_cooldown: 0.5,
            tap_jitter_radius: 5,
            swipe_steps: 20,
            swipe_curve_offset: 50,
            states: default_state_table(),
        }
    }
}

/// One row of the indicator table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateIndicators {
    pub state: GameState,
    pub indicators: Vec<String>,
}

pub(crate) fn default_state_table() -> Vec<StateIndicators> {
    vec![
        StateIndicators {
            state: GameState::Menu,
            indicators: vec!["start_button".into(), "menu_bg".into()],
        },
        StateIndicators {
            state: GameState::Battle,
            indicators: vec!["enemy".into(), "hp_bar".into(), "skill_button".into()],
        },
        StateIndicators {
            state: GameState::Reward,
            indicators: vec!["reward_icon".into(), "claim_button".into()],
        },
        StateIndicators {
            state: GameState::Loading,
            indicators: vec!["loading_icon".into()],
        },
    ]
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter, e.g. "info" or "autotap=debug".
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}
