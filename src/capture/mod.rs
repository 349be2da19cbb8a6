//! Screen capture module
//!
//! Pulls still frames from the controlled device. Each backend wraps one
//! device-automation driver; anything that can connect, report a screen size
//! and return a decoded frame can serve as a frame source.

pub mod android;
pub mod ios;

use image::RgbImage;

use crate::config::{DeviceSettings, Platform};
use crate::device::DeviceError;

pub use android::AndroidCapture;
pub use ios::IosCapture;

/// Capture layer errors.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("device not connected")]
    NotConnected,
    #[error(transparent)]
    Driver(#[from] DeviceError),
    #[error("failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
}

/// A source of device screen frames.
pub trait FrameSource {
    /// Establish the device connection and cache the screen geometry.
    fn connect(&mut self) -> Result<(), CaptureError>;

    /// Release the connection. Idempotent.
    fn disconnect(&mut self);

    /// Capture and decode one frame.
    fn screenshot(&mut self) -> Result<RgbImage, CaptureError>;

    /// Screen dimensions in pixels, `(width, height)`.
    fn screen_size(&mut self) -> Result<(u32, u32), CaptureError>;

    fn is_connected(&self) -> bool;
}

/// Unified front over the platform backends.
pub struct CaptureManager {
    source: Box<dyn FrameSource>,
}

impl CaptureManager {
    /// Build the backend selected by the device settings.
    pub fn new(settings: &DeviceSettings) -> Self {
        let source: Box<dyn FrameSource> = match settings.platform {
            Platform::Android => Box::new(AndroidCapture::new(
                &settings.adb_path,
                settings.serial.clone(),
            )),
            Platform::Ios => Box::new(IosCapture::new(&settings.wda_url)),
        };
        Self { source }
    }

    /// Wrap an arbitrary frame source.
    pub fn from_source(source: Box<dyn FrameSource>) -> Self {
        Self { source }
    }

    pub fn connect(&mut self) -> Result<(), CaptureError> {
        self.source.connect()
    }

    pub fn disconnect(&mut self) {
        self.source.disconnect();
    }

    /// Fetch a single frame.
    pub fn frame(&mut self) -> Result<RgbImage, CaptureError> {
        self.source.screenshot()
    }

    pub fn screen_size(&mut self) -> Result<(u32, u32), CaptureError> {
        self.source.screen_size()
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_connected()
    }
}

/// Decode PNG bytes from a driver into an RGB frame.
pub(crate) fn decode_frame(png: &[u8]) -> Result<RgbImage, CaptureError> {
    Ok(image::load_from_memory(png)?.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource {
        connected: bool,
        frame: RgbImage,
    }

    impl FrameSource for StaticSource {
        fn connect(&mut self) -> Result<(), CaptureError> {
            self.connected = true;
            Ok(())
        }

        fn disconnect(&mut self) {
            self.connected = false;
        }

        fn screenshot(&mut self) -> Result<RgbImage, CaptureError> {
            if !self.connected {
                return Err(CaptureError::NotConnected);
            }
            Ok(self.frame.clone())
        }

        fn screen_size(&mut self) -> Result<(u32, u32), CaptureError> {
            Ok(self.frame.dimensions())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    #[test]
    fn test_manager_delegates_to_source() {
        let mut manager = CaptureManager::from_source(Box::new(StaticSource {
            connected: false,
            frame: RgbImage::new(4, 8),
        }));

        assert!(!manager.is_connected());
        assert!(matches!(manager.frame(), Err(CaptureError::NotConnected)));

        manager.connect().unwrap();
        assert!(manager.is_connected());
        assert_eq!(manager.screen_size().unwrap(), (4, 8));
        assert_eq!(manager.frame().unwrap().dimensions(), (4, 8));

        manager.disconnect();
        assert!(!manager.is_connected());
    }

    #[test]
    fn test_decode_frame_roundtrip() {
        let img = RgbImage::from_pixel(6, 3, image::Rgb([10, 20, 30]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(img.clone())
            .write_to(
                &mut std::io::Cursor::new(&mut png),
                image::ImageFormat::Png,
            )
            .unwrap();

        let decoded = decode_frame(&png).unwrap();
        assert_eq!(decoded.dimensions(), (6, 3));
        assert_eq!(decoded.get_pixel(0, 0), &image::Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_frame_rejects_garbage() {
        assert!(decode_frame(b"not a png").is_err());
    }
}
