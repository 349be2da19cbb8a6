//! iOS frame source backed by WebDriverAgent.

use image::RgbImage;

use super::{decode_frame, CaptureError, FrameSource};
use crate::device::WdaClient;

/// Captures frames over the WebDriverAgent HTTP API.
pub struct IosCapture {
    wda: WdaClient,
    connected: bool,
    screen_size: Option<(u32, u32)>,
}

impl IosCapture {
    pub fn new(wda_url: &str) -> Self {
        Self {
            wda: WdaClient::new(wda_url),
            connected: false,
            screen_size: None,
        }
    }

    /// Driver handle, shared with the controller side.
    pub fn client(&self) -> &WdaClient {
        &self.wda
    }
}

impl FrameSource for IosCapture {
    fn connect(&mut self) -> Result<(), CaptureError> {
        self.wda.status()?;
        self.wda.create_session()?;
        let size = self.wda.window_size()?;
        self.screen_size = Some(size);
        self.connected = true;
        log::info!("iOS device connected, screen {}x{}", size.0, size.1);
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            log::info!("iOS device disconnected");
        }
        self.wda.close_session();
        self.connected = false;
    }

    fn screenshot(&mut self) -> Result<RgbImage, CaptureError> {
        if !self.connected {
            return Err(CaptureError::NotConnected);
        }
        let png = self.wda.screenshot_png()?;
        decode_frame(&png)
    }

    fn screen_size(&mut self) -> Result<(u32, u32), CaptureError> {
        if let Some(size) = self.screen_size {
            return Ok(size);
        }
        let size = self.wda.window_size()?;
        self.screen_size = Some(size);
        Ok(size)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screenshot_requires_connect() {
        let mut capture = IosCapture::new("http://localhost:8100");
        assert!(matches!(
            capture.screenshot(),
            Err(CaptureError::NotConnected)
        ));
    }
}
