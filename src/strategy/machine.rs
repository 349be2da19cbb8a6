//! Transition-table strategy
//!
//! Same indicator scan as the simple strategy, but with a legal-transition
//! table and a bounded state history. An observed state that is not a legal
//! successor of the current one must be seen on several consecutive frames
//! before it is adopted, which filters out single-frame flicker during UI
//! transition animations.

use std::collections::{HashMap, VecDeque};

use image::RgbImage;

use super::simple::{decide_for_state, scan_indicators};
use super::{Action, GameState, Strategy};
use crate::config::settings::{default_state_table, StateIndicators};
use crate::vision::Detection;

const MAX_HISTORY: usize = 10;
const CONFIRM_FRAMES: u32 = 3;

/// Debounced strategy variant with a legal-transition table.
pub struct StateMachineStrategy {
    indicators: Vec<StateIndicators>,
    transitions: HashMap<GameState, Vec<GameState>>,
    history: VecDeque<GameState>,
    /// Pending off-table observation and how many consecutive frames it has
    /// been seen.
    candidate: Option<(GameState, u32)>,
    stable_state: GameState,
    confirm_frames: u32,
}

impl Default for StateMachineStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachineStrategy {
    pub fn new() -> Self {
        Self::with_table(default_state_table())
    }

    pub fn with_table(indicators: Vec<StateIndicators>) -> Self {
        Self {
            indicators,
            transitions: default_transitions(),
            history: VecDeque::with_capacity(MAX_HISTORY),
            candidate: None,
            stable_state: GameState::Unknown,
            confirm_frames: CONFIRM_FRAMES,
        }
    }

    /// Override how many consecutive frames an off-table observation needs.
    pub fn with_confirm_frames(mut self, frames: u32) -> Self {
        self.confirm_frames = frames.max(1);
        self
    }

    /// Recent states, oldest first, at most ten entries.
    pub fn history(&self) -> impl Iterator<Item = GameState> + '_ {
        self.history.iter().copied()
    }

    /// States with no table entry accept any successor.
    fn can_transition(&self, from: GameState, to: GameState) -> bool {
        match self.transitions.get(&from) {
            Some(successors) => successors.contains(&to),
            None => true,
        }
    }

    fn record(&mut self, state: GameState) {
        if self.history.len() == MAX_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(state);
    }
}

impl Strategy for StateMachineStrategy {
    fn name(&self) -> &str {
        "state_machine"
    }

    fn analyze_state(&mut self, _frame: &RgbImage, detections: &[Detection]) -> GameState {
        let observed = scan_indicators(&self.indicators, detections);

        if observed == self.stable_state {
            self.candidate = None;
        } else if self.can_transition(self.stable_state, observed) {
            self.candidate = None;
            self.stable_state = observed;
        } else {
            let seen = match self.candidate {
                Some((state, count)) if state == observed => count + 1,
                _ => 1,
            };
            if seen >= self.confirm_frames {
                self.candidate = None;
                self.stable_state = observed;
            } else {
                self.candidate = Some((observed, seen));
            }
        }

        self.record(self.stable_state);
        self.stable_state
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

fn default_transitions() -> HashMap<GameState, Vec<GameState>> {
    HashMap::from([
        (GameState::Menu, vec![GameState::Loading, GameState::Battle]),
        (GameState::Loading, vec![GameState::Battle, GameState::Menu]),
        (GameState::Battle, vec![GameState::Reward, GameState::Loading]),
        (GameState::Reward, vec![GameState::Menu, GameState::Battle]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> RgbImage {
        RgbImage::new(8, 8)
    }

    fn det(name: &str) -> Detection {
        Detection::new(0, name, 0.9, (0, 0, 10, 10))
    }

    #[test]
    fn test_first_observation_adopted_immediately() {
        // Unknown has no table entry, so any successor is legal
        let mut strategy = StateMachineStrategy::new();
        assert_eq!(
            strategy.analyze_state(&frame(), &[det("start_button")]),
            GameState::Menu
        );
    }

    #[test]
    fn test_legal_transition_is_immediate() {
        let mut strategy = StateMachineStrategy::new();
        strategy.analyze_state(&frame(), &[det("start_button")]);
        assert_eq!(
            strategy.analyze_state(&frame(), &[det("enemy")]),
            GameState::Battle
        );
    }

    #[test]
    fn test_illegal_transition_is_debounced() {
        let mut strategy = StateMachineStrategy::new();
        strategy.analyze_state(&frame(), &[det("start_button")]);

        // Menu -> reward is not in the table: two sightings keep menu
        assert_eq!(
            strategy.analyze_state(&frame(), &[det("claim_button")]),
            GameState::Menu
        );
        assert_eq!(
            strategy.analyze_state(&frame(), &[det("claim_button")]),
            GameState::Menu
        );
        // Third consecutive sighting adopts it
        assert_eq!(
            strategy.analyze_state(&frame(), &[det("claim_button")]),
            GameState::Reward
        );
    }

    #[test]
    fn test_flicker_resets_debounce() {
        let mut strategy = StateMachineStrategy::new();
        strategy.analyze_state(&frame(), &[det("start_button")]);

        strategy.analyze_state(&frame(), &[det("claim_button")]);
        // Back to menu: the reward candidate is discarded
        strategy.analyze_state(&frame(), &[det("start_button")]);
        strategy.analyze_state(&frame(), &[det("claim_button")]);
        assert_eq!(
            strategy.analyze_state(&frame(), &[det("claim_button")]),
            GameState::Menu
        );
    }

    #[test]
    fn test_detection_dropout_keeps_state() {
        let mut strategy = StateMachineStrategy::new();
        strategy.analyze_state(&frame(), &[det("enemy")]);

        // Battle -> unknown is off-table; brief dropouts don't reset
        assert_eq!(strategy.analyze_state(&frame(), &[]), GameState::Battle);
        assert_eq!(strategy.analyze_state(&frame(), &[]), GameState::Battle);
        // Sustained absence eventually does
        assert_eq!(strategy.analyze_state(&frame(), &[]), GameState::Unknown);
    }

    #[test]
    fn test_confirm_frames_override() {
        let mut strategy = StateMachineStrategy::new().with_confirm_frames(1);
        strategy.analyze_state(&frame(), &[det("start_button")]);
        // With a threshold of one frame, off-table observations adopt
        // immediately
        assert_eq!(
            strategy.analyze_state(&frame(), &[det("claim_button")]),
            GameState::Reward
        );
    }

    #[test]
    fn test_history_is_bounded() {
        let mut strategy = StateMachineStrategy::new();
        for _ in 0..25 {
            strategy.analyze_state(&frame(), &[det("enemy")]);
        }
        let history: Vec<_> = strategy.history().collect();
        assert_eq!(history.len(), 10);
        assert!(history.iter().all(|&s| s == GameState::Battle));
    }

    #[test]
    fn test_decisions_match_simple_strategy() {
        let mut strategy = StateMachineStrategy::new();
        let detections = vec![Detection::new(0, "enemy", 0.9, (10, 10, 50, 50))];
        assert_eq!(
            strategy.make_decision(&frame(), &detections, GameState::Battle),
            Action::Tap { x: 30, y: 30 }
        );
    }
}
