//! Configuration module
//!
//! Handles the settings document loaded at startup: device selection,
//! model parameters, runtime behavior and strategy tuning.

pub mod settings;

pub use settings::{ConfigError, DeviceSettings, Platform, Settings, StrategyKind};
