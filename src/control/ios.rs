//! iOS input backend backed by WebDriverAgent.

use std::time::Duration;

use super::{ControlError, InputController};
use crate::device::WdaClient;

/// Injects input over the WebDriverAgent HTTP API.
///
/// Runs its own WDA session, created lazily on the first dispatch so the
/// controller can be constructed before the agent is reachable.
pub struct IosController {
    wda: WdaClient,
}

impl IosController {
    pub fn new(wda_url: &str) -> Self {
        Self {
            wda: WdaClient::new(wda_url),
        }
    }

    fn ensure_session(&mut self) -> Result<(), ControlError> {
        if !self.wda.has_session() {
            self.wda.create_session()?;
        }
        Ok(())
    }
}

impl InputController for IosController {
    fn tap(&mut self, x: i32, y: i32, duration: Duration) -> Result<(), ControlError> {
        self.ensure_session()?;
        self.wda.tap(x, y)?;
        std::thread::sleep(duration);
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
        self.ensure_session()?;
        self.wda.drag(x1, y1, x2, y2, duration)?;
        Ok(())
    }

    fn long_press(&mut self, x: i32, y: i32, duration: Duration) -> Result<(), ControlError> {
        self.ensure_session()?;
        self.wda.touch_and_hold(x, y, duration)?;
        Ok(())
    }
}
