//! Human behavior simulation
//!
//! Adds realistic variance to automated actions: positional jitter, hold
//! durations, delay variance and curved gesture paths.

use std::time::Duration;

use rand::Rng;

/// Tap duration range (how long the finger stays on screen)
const MIN_TAP_DURATION_MS: u64 = 50;
const MAX_TAP_DURATION_MS: u64 = 150;

/// Micro-pause duration range
const MIN_MICRO_PAUSE_MS: u64 = 500;
const MAX_MICRO_PAUSE_MS: u64 = 2000;

/// Generates randomized timing and positions for input dispatch.
pub struct Humanizer {
    rng: rand::rngs::ThreadRng,
}

impl Default for Humanizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Humanizer {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Uniform pixel offset within `radius` on each axis.
    pub fn jitter(&mut self, radius: i32) -> (i32, i32) {
        if radius <= 0 {
            return (0, 0);
        }
        (
            self.rng.gen_range(-radius..=radius),
            self.rng.gen_range(-radius..=radius),
        )
    }

    /// Tap hold duration.
    pub fn tap_duration(&mut self) -> Duration {
        Duration::from_millis(
            self.rng
                .gen_range(MIN_TAP_DURATION_MS..=MAX_TAP_DURATION_MS),
        )
    }

    /// Apply bounded variance to a base delay.
    pub fn humanize_delay(&mut self, base: Duration, variance_percent: u32) -> Duration {
        if variance_percent == 0 {
            return base;
        }

        let base_ms = base.as_millis() as i64;
        let variance = base_ms * variance_percent as i64 / 100;
        let offset = self.rng.gen_range(-variance..=variance);

        Duration::from_millis((base_ms + offset).max(50) as u64)
    }

    /// Whether an attention-drift pause should occur.
    pub fn should_micro_pause(&mut self, probability: f32) -> bool {
        self.rng.gen::<f32>() < probability
    }

    /// Duration of a micro-pause.
    pub fn micro_pause(&mut self) -> Duration {
        Duration::from_millis(self.rng.gen_range(MIN_MICRO_PAUSE_MS..=MAX_MICRO_PAUSE_MS))
    }

    /// Uniform wait in `[min, max]`, for pacing between unrelated actions.
    pub fn wait_random(&mut self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let span = (max - min).as_millis() as u64;
        min + Duration::from_millis(self.rng.gen_range(0..=span))
    }

    /// Sampled perpendicular control-point offset for a gesture curve.
    fn curve_offset(&mut self, max_offset: i32) -> f32 {
        if max_offset <= 0 {
            return 0.0;
        }
        self.rng.gen_range(-max_offset..=max_offset) as f32
    }
}

/// Build a curved swipe path from `start` to `end`.
///
/// Samples `steps + 1` points on a quadratic Bézier whose control point is
/// the stroke midpoint pushed sideways (perpendicular to the stroke) by a
/// random amount bounded by `max_offset`. Progress along the stroke axis
/// itself stays linear, so the gesture never doubles back.
pub fn smooth_path(
    humanizer: &mut Humanizer,
    start: (i32, i32),
    end: (i32, i32),
    steps: u32,
    max_offset: i32,
) -> Vec<(i32, i32)> {
    let steps = steps.max(1);
    let (x1, y1) = (start.0 as f32, start.1 as f32);
    let (x2, y2) = (end.0 as f32, end.1 as f32);

    let dx = x2 - x1;
    let dy = y2 - y1;
    let len = (dx * dx + dy * dy).sqrt();

    let (mut cx, mut cy) = ((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    if len > f32::EPSILON {
        let offset = humanizer.curve_offset(max_offset);
        // Unit perpendicular of the stroke direction
        cx += -dy / len * offset;
        cy += dx / len * offset;
    }

    (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            let u = 1.0 - t;
            let x = u * u * x1 + 2.0 * u * t * cx + t * t * x2;
            let y = u * u * y1 + 2.0 * u * t * cy + t * t * y2;
            (x.round() as i32, y.round() as i32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_bounds() {
        let mut humanizer = Humanizer::new();
        for _ in 0..200 {
            let (dx, dy) = humanizer.jitter(5);
            assert!((-5..=5).contains(&dx));
            assert!((-5..=5).contains(&dy));
        }
    }

    #[test]
    fn test_zero_radius_is_exact() {
        let mut humanizer = Humanizer::new();
        assert_eq!(humanizer.jitter(0), (0, 0));
    }

    #[test]
    fn test_humanize_delay_variance() {
        let mut humanizer = Humanizer::new();
        let base = Duration::from_millis(500);

        let mut min_seen = base;
        let mut max_seen = base;
        for _ in 0..1000 {
            let delay = humanizer.humanize_delay(base, 30);
            min_seen = min_seen.min(delay);
            max_seen = max_seen.max(delay);
        }

        assert!(min_seen < base);
        assert!(max_seen > base);
    }

    #[test]
    fn test_zero_variance_returns_base() {
        let mut humanizer = Humanizer::new();
        let base = Duration::from_millis(500);
        for _ in 0..10 {
            assert_eq!(humanizer.humanize_delay(base, 0), base);
        }
    }

    #[test]
    fn test_smooth_path_endpoints_and_length() {
        let mut humanizer = Humanizer::new();
        let path = smooth_path(&mut humanizer, (10, 20), (300, 400), 20, 50);
        assert_eq!(path.len(), 21);
        assert_eq!(path[0], (10, 20));
        assert_eq!(path[20], (300, 400));
    }

    #[test]
    fn test_smooth_path_monotonic_along_stroke() {
        // Horizontal stroke: all curvature goes into y, so x must never
        // move backwards no matter what offset was sampled.
        let mut humanizer = Humanizer::new();
        for _ in 0..50 {
            let path = smooth_path(&mut humanizer, (0, 0), (100, 0), 20, 50);
            for pair in path.windows(2) {
                assert!(pair[1].0 >= pair[0].0, "x went backwards: {pair:?}");
            }
        }
    }

    #[test]
    fn test_smooth_path_curvature_bounded() {
        let mut humanizer = Humanizer::new();
        for _ in 0..50 {
            let path = smooth_path(&mut humanizer, (0, 0), (100, 0), 20, 40);
            // The curve apex sits at half the control offset
            for (_, y) in path {
                assert!(y.abs() <= 21, "curvature escaped bound: y={y}");
            }
        }
    }

    #[test]
    fn test_smooth_path_degenerate_stroke() {
        let mut humanizer = Humanizer::new();
        let path = smooth_path(&mut humanizer, (50, 50), (50, 50), 10, 30);
        assert!(path.iter().all(|&p| p == (50, 50)));
    }

    #[test]
    fn test_wait_random_bounds() {
        let mut humanizer = Humanizer::new();
        let min = Duration::from_millis(100);
        let max = Duration::from_millis(200);
        for _ in 0..100 {
            let wait = humanizer.wait_random(min, max);
            assert!(wait >= min && wait <= max);
        }
        assert_eq!(humanizer.wait_random(max, min), max);
    }
}
