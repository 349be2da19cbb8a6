//! Indicator-scan strategy
//!
//! Classifies the game state by scanning a priority-ordered indicator table:
//! the first state with any of its indicator class names present among the
//! detections wins, even when later states' indicators are also visible.
//! The table order is load-bearing — downstream behavior depends on it, so
//! the scan must stay a plain first-match walk.

use image::RgbImage;

use super::{Action, GameState, Strategy};
use crate::config::settings::{default_state_table, StateIndicators};
use crate::vision::{first_of_class, has_class, Detection};

/// Stateless first-match strategy. Reclassifies from the current frame
/// alone; no history, no smoothing.
pub struct SimpleStrategy {
    indicators: Vec<StateIndicators>,
}

impl Default for SimpleStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleStrategy {
    pub fn new() -> Self {
        Self::with_table(default_state_table())
    }

    /// Use a custom indicator table. Row order is the priority order.
    pub fn with_table(indicators: Vec<StateIndicators>) -> Self {
        Self { indicators }
    }
}

impl Strategy for SimpleStrategy {
    fn name(&self) -> &str {
        "simple"
    }

    fn analyze_state(&mut self, _frame: &RgbImage, detections: &[Detection]) -> GameState {
        scan_indicators(&self.indicators, detections)
    }

    fn make_decision(
        &mut self,
        _frame: &RgbImage,
        detections: &[Detection],
        state: GameState,
    ) -> Action {
        decide_for_state(detections, state)
    }
}

/// First-match walk over the indicator table.
pub(crate) fn scan_indicators(
    table: &[StateIndicators],
    detections: &[Detection],
) -> GameState {
    for row in table {
        for indicator in &row.indicators {
            if has_class(detections, indicator) {
                return row.state;
            }
        }
    }
    GameState::Unknown
}

/// Per-state action choice, shared by both strategy variants.
pub(crate) fn decide_for_state(detections: &[Detection], state: GameState) -> Action {
    match state {
        GameState::Menu => tap_first(detections, "start_button"),
        GameState::Battle => {
            if has_class(detections, "enemy") {
                tap_first(detections, "enemy")
            } else {
                tap_first(detections, "skill_button")
            }
        }
        GameState::Reward => tap_first(detections, "claim_button"),
        GameState::Loading => Action::Wait,
        _ => Action::Wait,
    }
}

/// Tap the center of the first instance of `class_name`, or wait if absent.
fn tap_first(detections: &[Detection], class_name: &str) -> Action {
    match first_of_class(detections, class_name) {
        Some(det) => Action::Tap {
            x: det.center.0,
            y: det.center.1,
        },
        None => Action::Wait,
    }
}
