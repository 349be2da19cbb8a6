//! Android input backend backed by adb.

use std::thread;
use std::time::Duration;

use super::{ControlError, InputController};
use crate::device::AdbConnection;

/// Injects input with `adb shell input`.
pub struct AndroidController {
    adb: AdbConnection,
}

impl AndroidController {
    pub fn new(adb_path: &str, serial: Option<String>) -> Self {
        Self {
            adb: AdbConnection::new(adb_path, serial),
        }
    }
}

impl InputController for AndroidController {
    fn tap(&mut self, x: i32, y: i32, duration: Duration) -> Result<(), ControlError> {
        self.adb.input_tap(x, y)?;
        // `input tap` has no hold parameter; pace the follow-up instead
        thread::sleep(duration);
        Ok(())
    }

    fn swipe(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration: Duration,
    ) -> Result<(), ControlError> {
        self.adb.input_swipe(x1, y1, x2, y2, duration)?;
        Ok(())
    }

    fn long_press(&mut self, x: i32, y: i32, duration: Duration) -> Result<(), ControlError> {
        self.adb.input_long_press(x, y, duration)?;
        Ok(())
    }
}
