//! Download/upload format for a playground.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::CodeState;

pub const SNAPSHOT_VERSION: u32 = 1;
pub const DEFAULT_SNAPSHOT_NAME: &str = "Vibe Coder Project";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    pub version: u32,
    /// RFC 3339.
    pub timestamp: String,
    pub code: CodeState,
}

impl Snapshot {
    #[must_use]
    pub fn new(name: impl Into<String>, code: CodeState) -> Self {
        Self::at(name, code, Utc::now())
    }

    #[must_use]
    pub fn at(name: impl Into<String>, code: CodeState, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            version: SNAPSHOT_VERSION,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            code,
        }
    }

    /// Parses a snapshot. Only `code` is required; `name`, `version` and
    /// `timestamp` fall back to defaults so older exports still load.
    /// Input without a usable `code` object is rejected as a whole.
    pub fn from_json(input: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| Error::Snapshot(format!("not JSON: {e}")))?;

        let Some(code) = value.get("code").filter(|c| c.is_object()) else {
            return Err(Error::Snapshot("missing `code` object".to_string()));
        };
        let code: CodeState = serde_json::from_value(code.clone())
            .map_err(|e| Error::Snapshot(format!("malformed `code`: {e}")))?;

        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SNAPSHOT_NAME)
            .to_string();
        let version = value
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(SNAPSHOT_VERSION);
        let timestamp = value
            .get("timestamp")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default();

        Ok(Self {
            name,
            version,
            timestamp,
            code,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Snapshot(e.to_string()))
    }
}

/// What a fresh playground starts with.
#[must_use]
pub fn starter_code() -> CodeState {
    CodeState::new(
        "<h1>Welkom bij Vibe Coder!</h1>\n<p>Begin met bouwen!</p>\n<button id=\"myButton\">Klik hier!</button>",
        "body {\n  font-family: Arial, sans-serif;\n  padding: 20px;\n  background: linear-gradient(to right, #667eea, #764ba2);\n  color: white;\n}\n\nbutton {\n  background-color: #ff6b6b;\n  color: white;\n  padding: 10px 20px;\n  border: none;\n  border-radius: 5px;\n  cursor: pointer;\n  font-size: 16px;\n}\n\nbutton:hover {\n  background-color: #ff5252;\n}",
        "// Klik event toevoegen\nconst button = document.getElementById('myButton');\nif (button) {\n  button.addEventListener('click', () => {\n    alert('Je hebt geklikt!');\n  });\n}",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_import_round_trip() {
        let code = CodeState::new("<p>a</p>", "p { color: red; }", "console.log('x');");
        let snapshot = Snapshot::new("Mijn site", code.clone());
        let parsed = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(parsed.code, code);
        assert_eq!(parsed.name, "Mijn site");
        assert_eq!(parsed.version, SNAPSHOT_VERSION);
    }

    #[test]
    fn test_wire_format() {
        let at = DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let snapshot = Snapshot::at("p", CodeState::new("h", "c", "j"), at);
        let json: Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(json["version"], 1);
        assert_eq!(json["timestamp"], "2025-01-02T03:04:05.000Z");
        assert_eq!(json["code"]["html"], "h");
        assert_eq!(json["code"]["css"], "c");
        assert_eq!(json["code"]["javascript"], "j");
    }

    #[test]
    fn test_missing_code_is_rejected() {
        let err = Snapshot::from_json(r#"{"name":"x","version":1}"#).unwrap_err();
        assert!(matches!(err, Error::Snapshot(_)));

        assert!(Snapshot::from_json(r#"{"code":"<p>"}"#).is_err());
        assert!(Snapshot::from_json(r#"{"code":{"html":1}}"#).is_err());
        assert!(Snapshot::from_json("not json").is_err());
    }

    #[test]
    fn test_partial_code_defaults_to_empty() {
        let snapshot = Snapshot::from_json(r#"{"code":{"html":"<p>only</p>"}}"#).unwrap();
        assert_eq!(snapshot.code.markup, "<p>only</p>");
        assert_eq!(snapshot.code.style, "");
        assert_eq!(snapshot.name, DEFAULT_SNAPSHOT_NAME);
    }

    #[test]
    fn test_starter_code_wires_button() {
        let code = starter_code();
        assert!(code.markup.contains("id=\"myButton\""));
        assert!(code.script.contains("getElementById('myButton')"));
    }
}
