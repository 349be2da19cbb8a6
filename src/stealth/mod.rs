//! Input humanization module
//!
//! Synthetic input that always lands on the exact same pixel with the exact
//! same timing is a detection signature. This module adds bounded randomness
//! to positions, hold durations and gesture paths.

pub mod humanize;

pub use humanize::{smooth_path, Humanizer};
