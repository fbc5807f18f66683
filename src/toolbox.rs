//! Toolbox — the external capability set for acting on a user's mailbox
//! and drive.
//!
//! Every capability returns a uniform [`ToolResult`] instead of a Rust
//! error: the agent pipeline never aborts on a capability failure, it
//! records the failure and moves on. `NullToolbox` is the conforming
//! no-op implementation used for plan-only runs with no backend wired.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Uniform result envelope for toolbox calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// A successful result carrying a data payload.
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed result carrying an error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// External capabilities for acting on a user's mailbox and drive.
///
/// Implementations are pure I/O adapters; retry policy and timeouts
/// belong to the implementation, not to the agent pipeline.
#[async_trait]
pub trait Toolbox: Send + Sync {
    /// Fetch one message by id.
    async fn get_message(&self, user_id: &str, message_id: &str) -> ToolResult;

    /// Mark a message as read.
    async fn mark_as_read(&self, user_id: &str, message_id: &str) -> ToolResult;

    /// Create a draft reply.
    async fn create_draft(&self, user_id: &str, to: &str, subject: &str, body: &str)
    -> ToolResult;

    /// Create a drive folder, returning its id in `data.id`.
    async fn create_drive_folder(&self, user_id: &str, name: &str) -> ToolResult;

    /// Upload a local file into a drive folder.
    async fn upload_file(
        &self,
        user_id: &str,
        path: &str,
        name: &str,
        parent_id: Option<&str>,
        mime_type: &str,
    ) -> ToolResult;

    /// Save a message's attachments into drive.
    async fn save_attachments_to_folder(
        &self,
        user_id: &str,
        message_id: &str,
        attachment_ids: &[String],
    ) -> ToolResult;
}

/// Toolbox that reports "not configured" for every capability.
pub struct NullToolbox {
    reason: String,
}

impl NullToolbox {
    pub fn new() -> Self {
        Self {
            reason: "not configured".to_string(),
        }
    }

    /// Use a custom unavailability reason.
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn unavailable(&self) -> ToolResult {
        ToolResult::failure(self.reason.clone())
    }
}

impl Default for NullToolbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Toolbox for NullToolbox {
    async fn get_message(&self, _user_id: &str, _message_id: &str) -> ToolResult {
        self.unavailable()
    }

    async fn mark_as_read(&self, _user_id: &str, _message_id: &str) -> ToolResult {
        self.unavailable()
    }

    async fn create_draft(
        &self,
        _user_id: &str,
        _to: &str,
        _subject: &str,
        _body: &str,
    ) -> ToolResult {
        self.unavailable()
    }

    async fn create_drive_folder(&self, _user_id: &str, _name: &str) -> ToolResult {
        self.unavailable()
    }

    async fn upload_file(
        &self,
        _user_id: &str,
        _path: &str,
        _name: &str,
        _parent_id: Option<&str>,
        _mime_type: &str,
    ) -> ToolResult {
        self.unavailable()
    }

    async fn save_attachments_to_folder(
        &self,
        _user_id: &str,
        _message_id: &str,
        _attachment_ids: &[String],
    ) -> ToolResult {
        self.unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_toolbox_reports_not_configured() {
        let toolbox = NullToolbox::new();
        let result = toolbox.get_message("user-1", "msg-1").await;
        assert!(!result.ok);
        assert!(result.data.is_none());
        assert_eq!(result.error.as_deref(), Some("not configured"));
    }

    #[tokio::test]
    async fn null_toolbox_custom_reason() {
        let toolbox = NullToolbox::with_reason("offline mode");
        let result = toolbox.mark_as_read("user-1", "msg-1").await;
        assert_eq!(result.error.as_deref(), Some("offline mode"));
    }

    #[test]
    fn tool_result_serialization_omits_absent_fields() {
        let result = ToolResult::failure("boom");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn tool_result_success_carries_data() {
        let result = ToolResult::success(serde_json::json!({"id": "folder-1"}));
        assert!(result.ok);
        assert_eq!(result.data.unwrap()["id"], "folder-1");
        assert!(result.error.is_none());
    }
}
