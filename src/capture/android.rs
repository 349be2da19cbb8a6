//! Android frame source backed by adb.

use image::RgbImage;

use super::{decode_frame, CaptureError, FrameSource};
use crate::device::AdbConnection;

/// Captures frames with `adb exec-out screencap`.
pub struct AndroidCapture {
    adb: AdbConnection,
    connected: bool,
    screen_size: Option<(u32, u32)>,
}

impl AndroidCapture {
    pub fn new(adb_path: &str, serial: Option<String>) -> Self {
        Self {
            adb: AdbConnection::new(adb_path, serial),
            connected: false,
            screen_size: None,
        }
    }

    /// Driver handle, shared with the controller side.
    pub fn connection(&self) -> &AdbConnection {
        &self.adb
    }
}

impl FrameSource for AndroidCapture {
    fn connect(&mut self) -> Result<(), CaptureError> {
        self.adb.check_device()?;
        let size = self.adb.window_size()?;
        self.screen_size = Some(size);
        self.connected = true;
        log::info!("Android device connected, screen {}x{}", size.0, size.1);
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            log::info!("Android device disconnected");
        }
        self.connected = false;
    }

    fn screenshot(&mut self) -> Result<RgbImage, CaptureError> {
        if !self.connected {
            return Err(CaptureError::NotConnected);
        }
        let png = self.adb.screencap_png()?;
        decode_frame(&png)
    }

    fn screen_size(&mut self) -> Result<(u32, u32), CaptureError> {
        if let Some(size) = self.screen_size {
            return Ok(size);
        }
        let size = self.adb.window_size()?;
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
        let mut capture = AndroidCapture::new("adb", None);
        assert!(!capture.is_connected());
        assert!(matches!(
            capture.screenshot(),
            Err(CaptureError::NotConnected)
        ));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut capture = AndroidCapture::new("adb", Some("serial".into()));
        capture.disconnect();
        capture.disconnect();
        assert!(!capture.is_connected());
    }
}
