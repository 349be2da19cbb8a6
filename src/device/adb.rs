//! adb driver
//!
//! Shells out to the adb binary for screenshots, display geometry and input
//! injection. One connection per device serial; commands are synchronous.

use std::process::Command;
use std::time::Duration;

use super::DeviceError;

/// Handle to a single adb-reachable device.
#[derive(Debug, Clone)]
pub struct AdbConnection {
    adb_path: String,
    serial: Option<String>,
}

impl AdbConnection {
    /// Create a connection handle. No I/O happens until a command runs.
    pub fn new(adb_path: impl Into<String>, serial: Option<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
            serial,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, DeviceError> {
        let output = self
            .command()
            .args(args)
            .output()
            .map_err(|source| DeviceError::Spawn {
                tool: self.adb_path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                tool: self.adb_path.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    /// Verify the device is attached and in the `device` state.
    pub fn check_device(&self) -> Result<(), DeviceError> {
        let out = self.run(&["get-state"])?;
        let state = String::from_utf8_lossy(&out).trim().to_string();
        if state == "device" {
            Ok(())
        } else {
            Err(DeviceError::UnexpectedOutput(format!(
                "adb get-state returned {state:?}"
            )))
        }
    }

    /// Query the display size via `wm size`.
    pub fn window_size(&self) -> Result<(u32, u32), DeviceError> {
        let out = self.run(&["shell", "wm", "size"])?;
        let text = String::from_utf8_lossy(&out);
        parse_wm_size(&text)
            .ok_or_else(|| DeviceError::UnexpectedOutput(format!("wm size output: {text:?}")))
    }

    /// Capture the screen as PNG bytes via `exec-out screencap -p`.
    pub fn screencap_png(&self) -> Result<Vec<u8>, DeviceError> {
        let png = self.run(&["exec-out", "screencap", "-p"])?;
        if png.len() < 8 || png[..8] != [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'] {
            return Err(DeviceError::UnexpectedOutput(
                "screencap did not return a PNG stream".into(),
            ));
        }
        Ok(png)
    }

    /// Inject a tap at absolute pixel coordinates.
    pub fn input_tap(&self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.run(&["shell", "input", "tap", &x.to_string(), &y.to_string()])?;
        Ok(())
    }

    /// Inject a swipe between two points over `duration`.
    pub fn input_swipe(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration: Duration,
    ) -> Result<(), DeviceError> {
        self.run(&[
            "shell",
            "input",
            "swipe",
            &x1.to_string(),
            &y1.to_string(),
            &x2.to_string(),
            &y2.to_string(),
            &duration.as_millis().to_string(),
        ])?;
        Ok(())
    }

    /// Long press is a zero-length swipe held for `duration`.
    pub fn input_long_press(&self, x: i32, y: i32, duration: Duration) -> Result<(), DeviceError> {
        self.input_swipe(x, y, x, y, duration)
    }
}

/// Parse `wm size` output, preferring an override size when present.
///
/// Typical output:
/// ```text
/// Physical size: 1080x2340
/// Override size: 720x1560
/// ```
fn parse_wm_size(text: &str) -> Option<(u32, u32)> {
    let mut parsed = None;
    for line in text.lines() {
        let Some((_, dims)) = line.split_once("size:") else {
            continue;
        };
        let (w, h) = dims.trim().split_once('x')?;
        let size = (w.trim().parse().ok()?, h.trim().parse().ok()?);
        parsed = Some(size);
    }
    parsed
}
