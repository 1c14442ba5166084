//! Process configuration types shared by the client and the reconciler.
//!
//! These mirror the core v3 process document. A `ProcessConfig` is an
//! immutable value: the reconciler builds a fresh one per stream and never
//! edits one in place.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::result::Result;

/// Identity of a managed process, derived from a descriptor filename.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Validate and wrap a stream identity.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidStreamId` when the value is empty or contains
    /// whitespace or path separators.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::invalid_stream_id(value, "must not be empty"));
        }
        if value.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
            return Err(Error::invalid_stream_id(
                value,
                "must not contain whitespace or path separators",
            ));
        }
        Ok(Self(value))
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StreamId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for StreamId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StreamId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One input or output endpoint of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessIo {
    pub id: String,
    pub address: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl ProcessIo {
    /// Create an endpoint from its parts.
    pub fn new<I, S>(id: impl Into<String>, address: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            address: address.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

/// Resource limits. Zero disables a limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessLimits {
    pub cpu_usage: u64,
    pub memory_mbytes: u64,
    pub waitfor_seconds: u64,
}

impl ProcessLimits {
    /// All limits disabled.
    pub const fn disabled() -> Self {
        Self {
            cpu_usage: 0,
            memory_mbytes: 0,
            waitfor_seconds: 0,
        }
    }
}

/// Full configuration of a managed process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub id: StreamId,
    #[serde(rename = "type")]
    pub kind: String,
    pub reference: String,
    pub input: Vec<ProcessIo>,
    pub output: Vec<ProcessIo>,
    pub options: Vec<String>,
    pub reconnect: bool,
    pub reconnect_delay_seconds: u64,
    pub autostart: bool,
    pub stale_timeout_seconds: u64,
    pub limits: ProcessLimits,
}

impl ProcessConfig {
    /// Render the config as a JSON document, the shape the core service stores.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if serialization fails.
    pub fn to_document(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &StreamId) -> ProcessConfig {
        ProcessConfig {
            id: id.clone(),
            kind: "ffmpeg".to_string(),
            reference: "streamfile".to_string(),
            input: vec![ProcessIo::new("0", "rtsp://cam/1", ["-re"])],
            output: vec![ProcessIo::new(
                "0",
                "{memfs}/cam.m3u8",
                ["-c", "copy", "-f", "hls"],
            )],
            options: vec!["-loglevel".to_string(), "info".to_string()],
            reconnect: true,
            reconnect_delay_seconds: 2,
            autostart: true,
            stale_timeout_seconds: 20,
            limits: ProcessLimits::disabled(),
        }
    }

    #[test]
    fn test_stream_id_rejects_empty() {
        assert!(StreamId::new("").is_err());
    }

    #[test]
    fn test_stream_id_rejects_separators() {
        assert!(StreamId::new("a/b").is_err());
        assert!(StreamId::new("a b").is_err());
        assert!(StreamId::new("cam-01").is_ok());
    }

    #[test]
    fn test_document_uses_core_field_names() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let id = StreamId::new("cam")?;
        let doc = sample(&id).to_document()?;

        assert_eq!(doc.get("type"), Some(&serde_json::json!("ffmpeg")));
        assert_eq!(doc.get("id"), Some(&serde_json::json!("cam")));
        assert_eq!(
            doc.pointer("/limits/cpu_usage"),
            Some(&serde_json::json!(0))
        );
        assert_eq!(
            doc.pointer("/input/0/options"),
            Some(&serde_json::json!(["-re"]))
        );
        Ok(())
    }
}
