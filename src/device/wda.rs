//! WebDriverAgent driver
//!
//! Talks to a WebDriverAgent instance over HTTP for iOS devices. A session is
//! created on connect and reused for all input and geometry calls.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};

use super::DeviceError;

/// Client for one WebDriverAgent endpoint.
#[derive(Debug, Clone)]
pub struct WdaClient {
    http: reqwest::blocking::Client,
    base_url: String,
    session_id: Option<String>,
}

impl WdaClient {
    /// Create a client for the given base URL (e.g. `http://localhost:8100`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_id: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn session_url(&self, path: &str) -> Result<String, DeviceError> {
        let session = self.session_id.as_ref().ok_or(DeviceError::NotConnected)?;
        Ok(format!("{}/session/{session}{path}", self.base_url))
    }

    fn get(&self, url: String) -> Result<Value, DeviceError> {
        let value = self
            .http
            .get(url)
            .send()?
            .error_for_status()?
            .json::<Value>()?;
        Ok(value)
    }

    fn post(&self, url: String, body: Value) -> Result<Value, DeviceError> {
        let value = self
            .http
            .post(url)
            .json(&body)
            .send()?
            .error_for_status()?
            .json::<Value>()?;
        Ok(value)
    }

    /// Check the agent is reachable.
    pub fn status(&self) -> Result<(), DeviceError> {
        self.get(self.url("/status"))?;
        Ok(())
    }

    /// Establish the session used by input and geometry endpoints.
    pub fn create_session(&mut self) -> Result<(), DeviceError> {
        let response = self.post(
            self.url("/session"),
            json!({ "capabilities": {} }),
        )?;
        let session_id = response
            .pointer("/value/sessionId")
            .or_else(|| response.get("sessionId"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DeviceError::UnexpectedOutput(format!("no sessionId in {response}"))
            })?;
        self.session_id = Some(session_id.to_string());
        Ok(())
    }

    /// Drop the session handle. The agent cleans up on its own.
    pub fn close_session(&mut self) {
        self.session_id = None;
    }

    pub fn has_session(&self) -> bool {
        self.session_id.is_some()
    }

    /// Capture the screen; WDA returns base64-encoded PNG.
    pub fn screenshot_png(&self) -> Result<Vec<u8>, DeviceError> {
        let response = self.get(self.url("/screenshot"))?;
        let encoded = response
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DeviceError::UnexpectedOutput(format!("no screenshot payload in {response}"))
            })?;
        BASE64
            .decode(encoded.trim())
            .map_err(|e| DeviceError::Decode(e.to_string()))
    }

    /// Query the window size in points.
    pub fn window_size(&self) -> Result<(u32, u32), DeviceError> {
        let response = self.get(self.session_url("/window/size")?)?;
        let width = response.pointer("/value/width").and_then(Value::as_f64);
        let height = response.pointer("/value/height").and_then(Value::as_f64);
        match (width, height) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Ok((w as u32, h as u32)),
            _ => Err(DeviceError::UnexpectedOutput(format!(
                "bad window size payload: {response}"
            ))),
        }
    }

    /// Tap at absolute coordinates.
    pub fn tap(&self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.post(
            self.session_url("/wda/tap/0")?,
            json!({ "x": x, "y": y }),
        )?;
        Ok(())
    }

    /// Drag between two points over `duration`.
    pub fn drag(
        &self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        duration: Duration,
    ) -> Result<(), DeviceError> {
        self.post(
            self.session_url("/wda/dragfromtoforduration")?,
            json!({
                "fromX": x1,
                "fromY": y1,
                "toX": x2,
                "toY": y2,
                "duration": duration.as_secs_f64(),
            }),
        )?;
        Ok(())
    }

    /// Press and hold at a point for `duration`.
    pub fn touch_and_hold(&self, x: i32, y: i32, duration: Duration) -> Result<(), DeviceError> {
        self.post(
            self.session_url("/wda/touchAndHold")?,
            json!({
                "x": x,
                "y": y,
                "duration": duration.as_secs_f64(),
            }),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let client = WdaClient::new("http://localhost:8100/");
        assert_eq!(client.url("/status"), "http://localhost:8100/status");
    }

    #[test]
    fn test_session_required_for_input_urls() {
        let client = WdaClient::new("http://localhost:8100");
        assert!(!client.has_session());
        assert!(matches!(
            client.session_url("/wda/tap/0"),
            Err(DeviceError::NotConnected)
        ));
    }

    #[test]
    fn test_session_url_shape() {
        let mut client = WdaClient::new("http://localhost:8100");
        client.session_id = Some("abc-123".into());
        assert_eq!(
            client.session_url("/wda/tap/0").unwrap(),
            "http://localhost:8100/session/abc-123/wda/tap/0"
        );
    }
}
