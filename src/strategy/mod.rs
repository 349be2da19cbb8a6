//! Game strategy module
//!
//! Maps frames and detections to a symbolic game state, and states to
//! requested actions. The [`Policy`] wrapper owns run-state (current state,
//! cooldown clock) and rate-limits action emission so perception can run
//! faster than input without spamming the device.

pub mod machine;
pub mod simple;

use std::fmt;
use std::time::{Duration, Instant};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::config::settings::StrategySettings;
use crate::config::StrategyKind;
use crate::vision::Detection;

pub use machine::StateMachineStrategy;
pub use simple::SimpleStrategy;

/// Symbolic game states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    Idle,
    Menu,
    Battle,
    Loading,
    Reward,
    Dialogue,
    Unknown,
}

impl GameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameState::Idle => "idle",
            GameState::Menu => "menu",
            GameState::Battle => "battle",
            GameState::Loading => "loading",
            GameState::Reward => "reward",
            GameState::Dialogue => "dialogue",
            GameState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single requested action, consumed by the orchestrator and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Tap at a screen coordinate.
    Tap { x: i32, y: i32 },
    /// Swipe between two points.
    Swipe {
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
    },
    /// Do nothing this round.
    Wait,
}

/// Decision logic: state classification plus per-state action choice.
pub trait Strategy {
    fn name(&self) -> &str;

    /// Classify the current frame. Called every iteration, never gated.
    fn analyze_state(&mut self, frame: &RgbImage, detections: &[Detection]) -> GameState;

    /// Choose an action for the classified state.
    fn make_decision(
        &mut self,
        frame: &RgbImage,
        detections: &[Detection],
        state: GameState,
    ) -> Action;
}

/// Owns a strategy and its run-state, and enforces the action cooldown.
pub struct Policy {
    strategy: Box<dyn Strategy>,
    current_state: GameState,
    frame_count: u64,
    last_action: Option<Instant>,
    action_cooldown: Duration,
}

impl Policy {
    pub fn new(strategy: Box<dyn Strategy>, action_cooldown: Duration) -> Self {
        Self {
            strategy,
            current_state: GameState::Unknown,
            frame_count: 0,
            last_action: None,
            action_cooldown,
        }
    }

    /// Build the strategy selected by the settings.
    pub fn from_settings(settings: &StrategySettings) -> Self {
        let strategy: Box<dyn Strategy> = match settings.kind {
            StrategyKind::Simple => {
                Box::new(SimpleStrategy::with_table(settings.states.clone()))
            }
            StrategyKind::StateMachine => {
                Box::new(StateMachineStrategy::with_table(settings.states.clone()))
            }
        };
        Self::new(
            strategy,
            Duration::from_secs_f32(settings.action_cooldown.max(0.0)),
        )
    }

    /// One perception round: always reclassify, then decide unless the
    /// cooldown window since the last emitted decision is still open.
    pub fn update(&mut self, frame: &RgbImage, detections: &[Detection]) -> Option<Action> {
        self.frame_count += 1;
        self.current_state = self.strategy.analyze_state(frame, detections);

        if let Some(last) = self.last_action {
            if last.elapsed() < self.action_cooldown {
                return None;
            }
        }

        let action = self
            .strategy
            .make_decision(frame, detections, self.current_state);
        self.last_action = Some(Instant::now());
        Some(action)
    }

    pub fn current_state(&self) -> GameState {
        self.current_state
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }
}
