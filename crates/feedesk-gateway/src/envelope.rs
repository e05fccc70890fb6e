//! Wire types of the spreadsheet API
//!
//! Reads answer `{success, data}` or `{success: false, error | message}`.
//! Writes send `{action, sheet, payload, id?}` and answer `{success, error | message}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::GatewayError;

/// One spreadsheet row as delivered by the API
pub type Record = serde_json::Map<String, Value>;

/// Read the `id` column of a row, if the server sent one
pub fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Response envelope shared by reads and writes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    /// Server supplied failure text, `error` first
    pub fn failure_text(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }

    /// Rows of a successful read; non-object entries are dropped
    pub fn into_records(self) -> Result<Vec<Record>, GatewayError> {
        if !self.success {
            return Err(GatewayError::Server {
                message: self.failure_text(),
            });
        }
        let rows = match self.data {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        };
        Ok(rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect())
    }
}

/// Write actions understood by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeAction::Create => write!(f, "create"),
            ChangeAction::Update => write!(f, "update"),
            ChangeAction::Delete => write!(f, "delete"),
        }
    }
}

/// Request body of a write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetChange {
    pub action: ChangeAction,
    pub sheet: String,
    pub payload: Record,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SheetChange {
    pub fn create(sheet: &str, payload: Record) -> Self {
        Self {
            action: ChangeAction::Create,
            sheet: sheet.to_string(),
            payload,
            id: None,
        }
    }

    pub fn update(sheet: &str, id: &str, payload: Record) -> Self {
        Self {
            action: ChangeAction::Update,
            sheet: sheet.to_string(),
            payload,
            id: Some(id.to_string()),
        }
    }

    pub fn delete(sheet: &str, id: &str) -> Self {
        Self {
            action: ChangeAction::Delete,
            sheet: sheet.to_string(),
            payload: Record::new(),
            id: Some(id.to_string()),
        }
    }
}

/// Result of a write, never an `Err`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChangeOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }

    /// Failure text for display
    pub fn error_text(&self) -> String {
        self.error.clone().unwrap_or_else(|| "Unknown error".to_string())
    }
}

impl From<Envelope> for ChangeOutcome {
    fn from(envelope: Envelope) -> Self {
        if envelope.success {
            ChangeOutcome::ok()
        } else {
            ChangeOutcome::failed(envelope.failure_text())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_envelope_success() {
        let envelope: Envelope = serde_json::from_value(json!({
            "success": true,
            "data": [{"Name": "Asha", "Roll": 5}, "stray", {"Name": "Ravi"}]
        }))
        .unwrap();
        let rows = envelope.into_records().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Name"], json!("Asha"));
    }

    #[test]
    fn test_read_envelope_failure_prefers_error() {
        let envelope: Envelope = serde_json::from_value(json!({
            "success": false, "error": "Sheet not found", "message": "ignored"
        }))
        .unwrap();
        match envelope.into_records() {
            Err(GatewayError::Server { message }) => assert_eq!(message, "Sheet not found"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_write_envelope_uses_message_fallback() {
        let envelope: Envelope =
            serde_json::from_value(json!({"success": false, "message": "Locked"})).unwrap();
        let outcome = ChangeOutcome::from(envelope);
        assert!(!outcome.success);
        assert_eq!(outcome.error_text(), "Locked");
    }

    #[test]
    fn test_change_body_shape() {
        let mut payload = Record::new();
        payload.insert("Advance".to_string(), json!(500));
        let body = serde_json::to_value(SheetChange::update("Staff", "3", payload)).unwrap();
        assert_eq!(
            body,
            json!({"action": "update", "sheet": "Staff", "payload": {"Advance": 500}, "id": "3"})
        );

        let body = serde_json::to_value(SheetChange::create("Expenses", Record::new())).unwrap();
        assert!(body.get("id").is_none());
    }

    #[test]
    fn test_record_id() {
        let row: Record = serde_json::from_value(json!({"id": 7})).unwrap();
        assert_eq!(record_id(&row).as_deref(), Some("7"));
        let row: Record = serde_json::from_value(json!({"id": " "})).unwrap();
        assert_eq!(record_id(&row), None);
    }
}
