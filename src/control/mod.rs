//! Game controller module
//!
//! Replays decisions as synthetic touch input. Backends wrap the same device
//! drivers the capture layer uses; the manager layers humanization on top:
//! jittered taps, curved swipes and randomized hold times.
//!
//! Dispatch is fire-and-forget: a failed injection is logged and dropped, it
//! never aborts the caller's loop.

pub mod android;
pub mod ios;

use std::thread;
use std::time::Duration;

use crate::config::{DeviceSettings, Platform};
use crate::device::DeviceError;
use crate::stealth::{smooth_path, Humanizer};

pub use android::AndroidController;
pub use ios::IosController;

/// Control layer errors.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error(transparent)]
    Driver(#[from] DeviceError),
}

/// Injects touch input on a device.
pub trait InputController {
    fn tap(&mut self, x: i32, y: i32, duration: Duration) -> Result<(), ControlError>;

    fn swipe(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration: Duration,
    ) -> Result<(), ControlError>;

    fn long_press(&mut self, x: i32, y: i32, duration: Duration) -> Result<(), ControlError>;
}

/// Direction for convenience swipes from screen center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Unified front over the platform backends, with humanized dispatch.
pub struct ControllerManager {
    backend: Box<dyn InputController>,
    humanizer: Humanizer,
    screen_width: u32,
    screen_height: u32,
    swipe_steps: u32,
    swipe_curve_offset: i32,
}

impl ControllerManager {
    /// Build the backend selected by the device settings.
    pub fn new(settings: &DeviceSettings) -> Self {
        let backend: Box<dyn InputController> = match settings.platform {
            Platform::Android => Box::new(AndroidController::new(
                &settings.adb_path,
                settings.serial.clone(),
            )),
            Platform::Ios => Box::new(IosController::new(&settings.wda_url)),
        };
        Self::from_backend(backend)
    }

    /// Wrap an arbitrary input backend.
    pub fn from_backend(backend: Box<dyn InputController>) -> Self {
        Self {
            backend,
            humanizer: Humanizer::new(),
            screen_width: 0,
            screen_height: 0,
            swipe_steps: 20,
            swipe_curve_offset: 50,
        }
    }

    /// Tune the smooth-swipe segmenting.
    pub fn with_gesture(mut self, steps: u32, curve_offset: i32) -> Self {
        self.swipe_steps = steps.max(1);
        self.swipe_curve_offset = curve_offset;
        self
    }

    /// Record the device screen bounds for target validation.
    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.screen_width = width;
        self.screen_height = height;
    }

    /// Best-effort bounds check. Out-of-range targets are still dispatched;
    /// the driver may clamp or ignore them.
    fn check_bounds(&self, x: i32, y: i32) {
        if self.screen_width == 0 || self.screen_height == 0 {
            return;
        }
        if x < 0 || y < 0 || x >= self.screen_width as i32 || y >= self.screen_height as i32 {
            log::debug!(
                "target ({x}, {y}) outside screen {}x{}",
                self.screen_width,
                self.screen_height
            );
        }
    }

    /// Tap at exact coordinates.
    pub fn tap(&mut self, x: i32, y: i32) {
        self.check_bounds(x, y);
        let hold = self.humanizer.tap_duration();
        if let Err(e) = self.backend.tap(x, y, hold) {
            log::error!("tap ({x}, {y}) failed: {e}");
        }
    }

    /// Tap with a uniform random offset within `radius` of the target.
    pub fn tap_random(&mut self, x: i32, y: i32, radius: i32) {
        let (dx, dy) = self.humanizer.jitter(radius);
        self.tap(x + dx, y + dy);
    }

    /// Tap at a position relative to the screen, `rx`/`ry` in `[0, 1]`.
    pub fn tap_relative(&mut self, rx: f32, ry: f32) {
        let x = (rx * self.screen_width as f32) as i32;
        let y = (ry * self.screen_height as f32) as i32;
        self.tap(x, y);
    }

    /// Straight swipe between two points.
    pub fn swipe(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, duration: Duration) {
        self.check_bounds(x1, y1);
        self.check_bounds(x2, y2);
        if let Err(e) = self.backend.swipe(x1, y1, x2, y2, duration) {
            log::error!("swipe ({x1}, {y1}) -> ({x2}, {y2}) failed: {e}");
        }
    }

    /// Curved swipe: a quadratic Bézier path issued as short linear segments
    /// whose total time matches `duration`.
    pub fn swipe_smooth(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, duration: Duration) {
        self.check_bounds(x1, y1);
        self.check_bounds(x2, y2);

        let path = smooth_path(
            &mut self.humanizer,
            (x1, y1),
            (x2, y2),
            self.swipe_steps,
            self.swipe_curve_offset,
        );
        let segment_time = duration / self.swipe_steps;

        for pair in path.windows(2) {
            let (sx, sy) = pair[0];
            let (ex, ey) = pair[1];
            if let Err(e) = self.backend.swipe(sx, sy, ex, ey, segment_time) {
                log::error!("smooth swipe segment failed: {e}");
                return;
            }
        }
    }

    /// Swipe from screen center in a direction.
    pub fn swipe_direction(&mut self, direction: SwipeDirection, distance: i32, duration: Duration) {
        let cx = self.screen_width as i32 / 2;
        let cy = self.screen_height as i32 / 2;
        let (ex, ey) = match direction {
            SwipeDirection::Up => (cx, cy - distance),
            SwipeDirection::Down => (cx, cy + distance),
            SwipeDirection::Left => (cx - distance, cy),
            SwipeDirection::Right => (cx + distance, cy),
        };
        self.swipe(cx, cy, ex, ey, duration);
    }

    /// Press and hold.
    pub fn long_press(&mut self, x: i32, y: i32, duration: Duration) {
        self.check_bounds(x, y);
        if let Err(e) = self.backend.long_press(x, y, duration) {
            log::error!("long press ({x}, {y}) failed: {e}");
        }
    }

    /// Tap a sequence of points with a fixed interval between them.
    pub fn multi_tap(&mut self, points: &[(i32, i32)], interval: Duration) {
        for &(x, y) in points {
            self.tap(x, y);
            thread::sleep(interval);
        }
    }

    /// Sleep a random interval, for pacing between unrelated actions.
    pub fn wait_random(&mut self, min: Duration, max: Duration) {
        thread::sleep(self.humanizer.wait_random(min, max));
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Everything a backend was asked to do, in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum InputEvent {
        Tap { x: i32, y: i32 },
        Swipe { x1: i32, y1: i32, x2: i32, y2: i32 },
        LongPress { x: i32, y: i32 },
    }

    /// Backend that records instead of dispatching.
    pub struct RecordingController {
        pub events: Rc<RefCell<Vec<InputEvent>>>,
        pub fail: bool,
    }

    impl RecordingController {
        pub fn new() -> (Self, Rc<RefCell<Vec<InputEvent>>>) {
            let events = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    events: Rc::clone(&events),
                    fail: false,
                },
                events,
            )
        }
    }

    impl InputController for RecordingController {
        fn tap(&mut self, x: i32, y: i32, _duration: Duration) -> Result<(), ControlError> {
            if self.fail {
                return Err(DeviceError::NotConnected.into());
            }
            self.events.borrow_mut().push(InputEvent::Tap { x, y });
            Ok(())
        }

        fn swipe(
            &mut self,
            x1: i32,
            y1: i32,
            x2: i32,
            y2: i32,
            _duration: Duration,
        ) -> Result<(), ControlError> {
            if self.fail {
                return Err(DeviceError::NotConnected.into());
            }
            self.events
                .borrow_mut()
                .push(InputEvent::Swipe { x1, y1, x2, y2 });
            Ok(())
        }

        fn long_press(&mut self, x: i32, y: i32, _duration: Duration) -> Result<(), ControlError> {
            if self.fail {
                return Err(DeviceError::NotConnected.into());
            }
            self.events.borrow_mut().push(InputEvent::LongPress { x, y });
            Ok(())
        }
    }
}
