//! Messages exchanged with the extension's background context.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::anchor::Anchor;
use crate::engine::ReconcileReport;
use crate::error::ReformaError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Command {
    #[serde(rename = "reforma-reload-highlights")]
    Reload,

    #[serde(rename = "reforma-show-highlight-hint")]
    ShowHint,

    #[serde(rename = "reforma-show-page-toast")]
    ShowToast {
        #[serde(default)]
        text: Option<String>,
    },

    #[serde(rename = "reforma-list-highlights")]
    List,

    #[serde(rename = "reforma-delete-highlight")]
    Delete { id: String },

    #[serde(rename = "reforma-update-comment")]
    UpdateComment {
        id: String,
        #[serde(default)]
        comment: String,
    },

    #[serde(rename = "reforma-export-restore-code")]
    ExportCode,

    #[serde(rename = "reforma-import-restore-code")]
    ImportCode { code: String },
}

impl Command {
    /// Parse a raw message. Unknown or malformed actions come back as the
    /// response to send instead.
    pub fn from_message(message: &Value) -> std::result::Result<Self, Response> {
        let action = message
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        serde_json::from_value(message.clone()).map_err(|e| {
            if action.starts_with("reforma-") && is_known_action(&action) {
                Response::error("invalid_message", e.to_string())
            } else {
                Response::error("unknown_action", format!("Unknown action: {}", action))
            }
        })
    }
}

fn is_known_action(action: &str) -> bool {
    matches!(
        action,
        "reforma-reload-highlights"
            | "reforma-show-highlight-hint"
            | "reforma-show-page-toast"
            | "reforma-list-highlights"
            | "reforma-delete-highlight"
            | "reforma-update-comment"
            | "reforma-export-restore-code"
            | "reforma-import-restore-code"
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors: Option<Vec<Anchor>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<ReconcileReport>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(kind.to_string()),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_anchors(mut self, anchors: Vec<Anchor>) -> Self {
        self.anchors = Some(anchors);
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn with_code(mut self, code: String) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_report(mut self, report: ReconcileReport) -> Self {
        self.report = Some(report);
        self
    }
}

impl From<ReformaError> for Response {
    fn from(err: ReformaError) -> Self {
        let kind = match &err {
            ReformaError::AnchorNotFound(_) => "anchor_not_found",
            ReformaError::InvalidSelection(_) => "invalid_selection",
            ReformaError::InvalidRestoreCode(_) => "invalid_restore_code",
            ReformaError::RestoreCodeUrlMismatch { .. } => "restore_code_url_mismatch",
            ReformaError::StorageError(_) | ReformaError::IoError(_) => "storage_error",
            _ => "internal_error",
        };
        Response::error(kind, err.to_string())
    }
}
