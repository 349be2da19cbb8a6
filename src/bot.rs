//! Bot orchestrator
//!
//! Drives the perception-to-action loop: pull a frame, detect, decide, act,
//! pace. Owns process-lifetime state (frame counter, FPS, phase) and the
//! stop flag the interrupt handler sets. Everything runs on one thread;
//! iteration N+1 starts only after iteration N finished dispatching.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use image::RgbImage;

use crate::capture::{CaptureError, CaptureManager};
use crate::config::Settings;
use crate::control::ControllerManager;
use crate::strategy::{Action, Policy};
use crate::vision::{Overlay, VisionError, YoloDetector};

/// Sleep after a failed frame fetch before retrying.
const FRAME_RETRY_DELAY: Duration = Duration::from_millis(500);
/// Duration for dispatched swipe actions.
const SWIPE_DURATION: Duration = Duration::from_millis(500);

/// Fatal orchestrator errors. Everything here aborts startup; transient
/// per-iteration failures never surface as these.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Vision(#[from] VisionError),
}

/// Orchestrator lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotPhase {
    Stopped,
    Initializing,
    Running,
}

/// Everything initialized per run; dropped (and disconnected) on exit.
struct Components {
    capture: CaptureManager,
    detector: YoloDetector,
    controller: ControllerManager,
    overlay: Option<Overlay>,
}

/// The bot itself: configuration, policy and loop state.
pub struct GameBot {
    settings: Settings,
    policy: Policy,
    phase: BotPhase,
    stop_flag: Arc<AtomicBool>,
    frame_count: u64,
    fps: f32,
}

impl GameBot {
    pub fn new(settings: Settings) -> Self {
        let policy = Policy::from_settings(&settings.strategy);
        Self {
            settings,
            policy,
            phase: BotPhase::Stopped,
            stop_flag: Arc::new(AtomicBool::new(false)),
            frame_count: 0,
            fps: 0.0,
        }
    }

    /// Flag that stops the loop at the next iteration boundary. Safe to
    /// store from a signal handler.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    /// Request a graceful stop.
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    pub fn phase(&self) -> BotPhase {
        self.phase
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Bring up device connection, model and controller. Any failure here
    /// is fatal and leaves the bot stopped.
    fn initialize(&mut self) -> Result<Components, BotError> {
        log::info!("initializing screen capture...");
        let mut capture = CaptureManager::new(&self.settings.device);
        capture.connect()?;
        let (width, height) = capture.screen_size()?;

        log::info!("initializing detector...");
        let mut detector = YoloDetector::from_settings(&self.settings.model);
        if let Err(e) = detector.load() {
            capture.disconnect();
            return Err(e.into());
        }

        log::info!("initializing controller...");
        let mut controller = ControllerManager::new(&self.settings.device).with_gesture(
            self.settings.strategy.swipe_steps,
            self.settings.strategy.swipe_curve_offset,
        );
        controller.set_screen_size(width, height);

        let overlay = if self.settings.runtime.enable_visualization {
            Some(self.build_overlay())
        } else {
            None
        };

        log::info!("all components ready");
        Ok(Components {
            capture,
            detector,
            controller,
            overlay,
        })
    }

    /// Overlay renderer; a missing font downgrades to tag-only labels.
    fn build_overlay(&self) -> Overlay {
        match &self.settings.runtime.overlay_font {
            Some(path) => match Overlay::new().with_font_file(path) {
                Ok(overlay) => overlay,
                Err(e) => {
                    log::warn!("overlay font unavailable, labels will be tags only: {e}");
                    Overlay::new()
                }
            },
            None => Overlay::new(),
        }
    }

    /// Run until interrupted or stopped. The frame source is disconnected on
    /// every exit path.
    pub fn run(&mut self) -> Result<(), BotError> {
        self.phase = BotPhase::Initializing;
        let mut components = match self.initialize() {
            Ok(components) => components,
            Err(e) => {
                log::error!("initialization failed: {e}");
                self.phase = BotPhase::Stopped;
                return Err(e);
            }
        };

        self.phase = BotPhase::Running;
        log::info!(
            "bot running ({} strategy, {:.1} fps cap); interrupt to stop",
            self.policy.strategy_name(),
            self.settings.runtime.fps_limit
        );

        self.run_loop(&mut components);

        components.capture.disconnect();
        self.phase = BotPhase::Stopped;
        log::info!("total frames processed: {}", self.frame_count);
        Ok(())
    }

    fn run_loop(&mut self, components: &mut Components) {
        let frame_period = Duration::from_secs_f32(1.0 / self.settings.runtime.fps_limit.max(0.1));
        let mut last_iteration = Instant::now();

        while !self.stop_flag.load(Ordering::Relaxed) {
            let loop_start = Instant::now();

            let frame = match components.capture.frame() {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("frame capture failed: {e}");
                    thread::sleep(FRAME_RETRY_DELAY);
                    continue;
                }
            };

            let detections = match components.detector.detect(&frame, None) {
                Ok(detections) => detections,
                Err(e) => {
                    log::warn!("detection failed: {e}");
                    thread::sleep(frame_period);
                    continue;
                }
            };

            if let Some(action) = self.policy.update(&frame, &detections) {
                Self::dispatch(
                    &mut components.controller,
                    self.settings.strategy.tap_jitter_radius,
                    &action,
                );
            }

            if let Some(overlay) = &components.overlay {
                let rendered = overlay.draw(&frame, &detections);
                if let Err(e) = save_image(&rendered, &self.settings.runtime.visualization_path) {
                    log::warn!("failed to write overlay frame: {e}");
                }
            }

            if self.settings.runtime.save_screenshots
                && self.frame_count % self.settings.runtime.screenshot_interval == 0
            {
                let path = self
                    .settings
                    .runtime
                    .screenshot_dir
                    .join(format!("frame_{:06}.jpg", self.frame_count));
                if let Err(e) = save_image(&frame, &path) {
                    log::warn!("failed to save screenshot: {e}");
                }
            }

            self.frame_count += 1;
            let now = Instant::now();
            let delta = now.duration_since(last_iteration).as_secs_f32();
            if delta > 0.0 {
                self.fps = 1.0 / delta;
            }
            last_iteration = now;

            if self.frame_count % self.settings.runtime.status_interval == 0 {
                log::info!(
                    "frame {} | fps {:.1} | {} detections | state {}",
                    self.frame_count,
                    self.fps,
                    detections.len(),
                    self.policy.current_state()
                );
            }

            let elapsed = loop_start.elapsed();
            if elapsed < frame_period {
                thread::sleep(frame_period - elapsed);
            }
        }
    }

    /// Send one decision to the controller. Wait is a no-op; taps carry the
    /// configured jitter.
    fn dispatch(controller: &mut ControllerManager, jitter_radius: i32, action: &Action) {
        match action {
            Action::Tap { x, y } => {
                log::debug!("tap ({x}, {y})");
                controller.tap_random(*x, *y, jitter_radius);
            }
            Action::Swipe {
                start_x,
                start_y,
                end_x,
                end_y,
            } => {
                log::debug!("swipe ({start_x}, {start_y}) -> ({end_x}, {end_y})");
                controller.swipe(*start_x, *start_y, *end_x, *end_y, SWIPE_DURATION);
            }
            Action::Wait => {}
        }
    }
}

/// Write an image, creating parent directories as needed.
fn save_image(image: &RgbImage, path: &Path) -> image::ImageResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(image::ImageError::IoError)?;
    }
    image.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::StateIndicators;
    use crate::control::testing::{InputEvent, RecordingController};
    use crate::strategy::{GameState, SimpleStrategy};

    #[test]
    fn test_new_bot_is_stopped() {
        let bot = GameBot::new(Settings::default());
        assert_eq!(bot.phase(), BotPhase::Stopped);
        assert_eq!(bot.frame_count(), 0);
    }

    #[test]
    fn test_stop_handle_sets_flag() {
        let bot = GameBot::new(Settings::default());
        let handle = bot.stop_handle();
        handle.store(true, Ordering::Relaxed);
        assert!(bot.stop_flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_request_stop_sets_flag() {
        let bot = GameBot::new(Settings::default());
        bot.request_stop();
        assert!(bot.stop_flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_dispatch_wait_is_noop() {
        let (backend, events) = RecordingController::new();
        let mut controller = ControllerManager::from_backend(Box::new(backend));
        GameBot::dispatch(&mut controller, 5, &Action::Wait);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_dispatch_swipe() {
        let (backend, events) = RecordingController::new();
        let mut controller = ControllerManager::from_backend(Box::new(backend));
        GameBot::dispatch(
            &mut controller,
            0,
            &Action::Swipe {
                start_x: 100,
                start_y: 200,
                end_x: 300,
                end_y: 400,
            },
        );
        assert_eq!(
            events.borrow()[0],
            InputEvent::Swipe {
                x1: 100,
                y1: 200,
                x2: 300,
                y2: 400
            }
        );
    }

    #[test]
    fn test_detections_to_tap_end_to_end() {
        // Indicators {battle: [enemy]}; one enemy at (10,10,50,50) must
        // classify as battle and land a tap within the jitter radius of the
        // box center (30, 30).
        let table = vec![StateIndicators {
            state: GameState::Battle,
            indicators: vec!["enemy".into()],
        }];
        let mut policy = Policy::new(
            Box::new(SimpleStrategy::with_table(table)),
            Duration::from_secs(0),
        );

        let frame = RgbImage::new(64, 64);
        let detections = vec![crate::vision::Detection::new(0, "enemy", 0.9, (10, 10, 50, 50))];

        let action = policy.update(&frame, &detections).unwrap();
        assert_eq!(policy.current_state(), GameState::Battle);
        assert_eq!(action, Action::Tap { x: 30, y: 30 });

        let (backend, events) = RecordingController::new();
        let mut controller = ControllerManager::from_backend(Box::new(backend));
        let jitter = 5;
        GameBot::dispatch(&mut controller, jitter, &action);

        let events = events.borrow();
        let InputEvent::Tap { x, y } = events[0] else {
            panic!("expected tap, got {:?}", events[0]);
        };
        assert!((x - 30).abs() <= jitter);
        assert!((y - 30).abs() <= jitter);
    }

    #[test]
    fn test_save_image_creates_directories() {
        let dir = std::env::temp_dir().join("autotap_test_screenshots");
        let _ = std::fs::remove_dir_all(&dir);

        let path = dir.join("nested").join("frame_000000.jpg");
        let frame = RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]));
        save_image(&frame, &path).unwrap();
        assert!(path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
