//! Wire types of the core API.

use serde::{Deserialize, Serialize};

/// A process as listed by `GET /api/v3/process`.
///
/// `config` stays an untyped document: core adds runtime fields the client
/// does not model, and callers compare against the document as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub id: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_tolerates_missing_fields() -> Result<(), serde_json::Error> {
        let process: Process = serde_json::from_str(r#"{"id":"cam"}"#)?;
        assert_eq!(process.id, "cam");
        assert!(process.reference.is_empty());
        assert!(process.config.is_none());
        Ok(())
    }

    #[test]
    fn test_process_keeps_unknown_config_fields() -> Result<(), serde_json::Error> {
        let process: Process = serde_json::from_str(
            r#"{"id":"cam","reference":"streamfile","type":"ffmpeg","config":{"id":"cam","ports":[8000]},"state":{"order":"start"}}"#,
        )?;
        assert_eq!(process.reference, "streamfile");
        assert_eq!(
            process.config.and_then(|c| c.get("ports").cloned()),
            Some(serde_json::json!([8000]))
        );
        Ok(())
    }
}
