//! Shared types for the email agent pipeline.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::classify::Categorization;

// ── Email input ─────────────────────────────────────────────────────

/// An inbound email as supplied by the caller or fetched via the toolbox.
///
/// Read-only for the duration of a run. Every field is optional — the
/// pipeline treats absent fields as empty and degrades gracefully.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailEnvelope {
    pub subject: Option<String>,
    pub snippet: Option<String>,
    pub body: Option<String>,
    /// Fallback body field used by some message sources.
    pub plain_text: Option<String>,
    pub from: Option<String>,
    /// Fallback sender field used by some message sources.
    pub sender: Option<String>,
    pub sender_domain: Option<String>,
    pub reply_to: Option<String>,
    pub attachments: Vec<AttachmentRef>,
}

impl EmailEnvelope {
    /// True when no field carries any content.
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.snippet.is_none()
            && self.body.is_none()
            && self.plain_text.is_none()
            && self.from.is_none()
            && self.sender.is_none()
            && self.reply_to.is_none()
            && self.attachments.is_empty()
    }
}

/// A reference to one attachment on an email.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentRef {
    pub filename: Option<String>,
    pub attachment_id: Option<String>,
    pub mime_type: Option<String>,
}

// ── Extracted artifacts ─────────────────────────────────────────────

/// Signals extracted once per email, immutable after the summarize stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Artifacts {
    /// Deduplicated URLs in first-seen order.
    pub links: Vec<String>,
    /// Deduplicated, upper-cased discount codes.
    pub discount_codes: Vec<String>,
    /// Deduplicated date-like strings, original formatting preserved.
    pub dates: Vec<String>,
}

// ── Planned actions ─────────────────────────────────────────────────

/// The closed set of action kinds the planner can emit.
///
/// Adding a kind is a compile-time-checked change: the controller
/// matches on this enum exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    StoreDiscount,
    CreateCalendarEvent,
    SaveArticle,
    SaveAttachments,
    DraftReply,
    MarkRead,
}

impl ActionKind {
    /// Short label for logging and result records.
    pub fn label(&self) -> &'static str {
        match self {
            Self::StoreDiscount => "store_discount",
            Self::CreateCalendarEvent => "create_calendar_event",
            Self::SaveArticle => "save_article",
            Self::SaveAttachments => "save_attachments",
            Self::DraftReply => "draft_reply",
            Self::MarkRead => "mark_read",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A candidate action with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlannedAction {
    StoreDiscount {
        codes: Vec<String>,
        summary: String,
    },
    CreateCalendarEvent {
        dates: Vec<String>,
        summary: String,
    },
    SaveArticle {
        folder: String,
        links: Vec<String>,
        summary: String,
    },
    SaveAttachments {
        attachment_ids: Vec<String>,
    },
    DraftReply {
        summary: String,
    },
    MarkRead,
}

impl PlannedAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::StoreDiscount { .. } => ActionKind::StoreDiscount,
            Self::CreateCalendarEvent { .. } => ActionKind::CreateCalendarEvent,
            Self::SaveArticle { .. } => ActionKind::SaveArticle,
            Self::SaveAttachments { .. } => ActionKind::SaveAttachments,
            Self::DraftReply { .. } => ActionKind::DraftReply,
            Self::MarkRead => ActionKind::MarkRead,
        }
    }
}

/// A planned action with the planner's assessment attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    #[serde(flatten)]
    pub action: PlannedAction,
    pub reason: String,
    pub confidence: f32,
    pub requires_review: bool,
}

impl ActionPlan {
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }
}

// ── Action results ──────────────────────────────────────────────────

/// Outcome status for one planned action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Dry-run: the handler reported its intent without side effects.
    Planned,
    /// Not enough information to act; a human should look.
    NeedsReview,
    /// The external capability reported a failure.
    Error,
    /// Article artifact uploaded to drive.
    Uploaded,
    /// Reply draft created.
    Drafted,
    /// Attachments saved to drive.
    Saved,
    /// Message marked as read.
    Done,
    /// Discount codes recorded for downstream persistence.
    Captured,
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Planned => "planned",
            Self::NeedsReview => "needs_review",
            Self::Error => "error",
            Self::Uploaded => "uploaded",
            Self::Drafted => "drafted",
            Self::Saved => "saved",
            Self::Done => "done",
            Self::Captured => "captured",
        };
        f.write_str(s)
    }
}

/// The recorded outcome of one planned action, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub status: ActionStatus,
    pub details: serde_json::Value,
}

// ── Run state ───────────────────────────────────────────────────────

/// The full working state of one agent run.
///
/// Created fresh per invocation, owned by exactly one pipeline run, and
/// returned to the caller as the final snapshot. Stages mutate it in
/// place; the controller is the only place routing decisions are made.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub user_id: String,
    pub message_id: String,
    pub execute_actions: bool,
    pub categorize_with_llm: bool,
    /// Category supplied by the caller (not the classifier's suggestion).
    pub sender_category: Option<String>,
    /// The classifier's suggestion, if one was produced.
    pub suggestion: Option<Categorization>,
    pub email: EmailEnvelope,
    pub summary: String,
    pub artifacts: Artifacts,
    /// Actions not yet dispatched, head next.
    pub pending_actions: VecDeque<ActionPlan>,
    /// The action currently being handled.
    pub current_action: Option<ActionPlan>,
    /// One result per planned action, in execution order.
    pub results: Vec<ActionResult>,
    /// Fetch and classification problems; handler failures land in
    /// per-action statuses instead.
    pub errors: Vec<String>,
}

impl AgentRun {
    pub(crate) fn new(
        user_id: String,
        message_id: String,
        execute_actions: bool,
        categorize_with_llm: bool,
        sender_category: Option<String>,
        email: EmailEnvelope,
    ) -> Self {
        Self {
            user_id,
            message_id,
            execute_actions,
            categorize_with_llm,
            sender_category,
            suggestion: None,
            email,
            summary: String::new(),
            artifacts: Artifacts::default(),
            pending_actions: VecDeque::new(),
            current_action: None,
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Append the single result for the action currently being handled.
    pub(crate) fn record(&mut self, kind: ActionKind, status: ActionStatus, details: serde_json::Value) {
        tracing::debug!(action = %kind, status = %status, "Recording action result");
        self.results.push(ActionResult {
            kind,
            status,
            details,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_partial_payload() {
        let value = serde_json::json!({
            "subject": "Hello",
            "from": "Alice <alice@example.com>",
            "unknown_field": 42,
        });
        let email: EmailEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(email.subject.as_deref(), Some("Hello"));
        assert_eq!(email.from.as_deref(), Some("Alice <alice@example.com>"));
        assert!(email.body.is_none());
        assert!(email.attachments.is_empty());
    }

    #[test]
    fn envelope_empty_detection() {
        assert!(EmailEnvelope::default().is_empty());
        let email = EmailEnvelope {
            snippet: Some("hi".into()),
            ..Default::default()
        };
        assert!(!email.is_empty());
    }

    #[test]
    fn planned_action_kinds() {
        assert_eq!(PlannedAction::MarkRead.kind(), ActionKind::MarkRead);
        assert_eq!(
            PlannedAction::DraftReply {
                summary: "x".into()
            }
            .kind(),
            ActionKind::DraftReply
        );
    }

    #[test]
    fn action_kind_labels() {
        assert_eq!(ActionKind::StoreDiscount.label(), "store_discount");
        assert_eq!(ActionKind::CreateCalendarEvent.to_string(), "create_calendar_event");
    }

    #[test]
    fn action_plan_serializes_with_type_tag() {
        let plan = ActionPlan {
            action: PlannedAction::StoreDiscount {
                codes: vec!["SAVE20".into()],
                summary: "promo".into(),
            },
            reason: "Detected discount language or codes.".into(),
            confidence: 0.65,
            requires_review: false,
        };
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["type"], "store_discount");
        assert_eq!(json["codes"][0], "SAVE20");
        assert_eq!(json["requires_review"], false);
    }

    #[test]
    fn action_status_serde() {
        let json = serde_json::to_string(&ActionStatus::NeedsReview).unwrap();
        assert_eq!(json, "\"needs_review\"");
        let parsed: ActionStatus = serde_json::from_str("\"captured\"").unwrap();
        assert_eq!(parsed, ActionStatus::Captured);
    }

    #[test]
    fn action_result_serializes_kind_as_type() {
        let result = ActionResult {
            kind: ActionKind::MarkRead,
            status: ActionStatus::Done,
            details: serde_json::json!({}),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "mark_read");
        assert_eq!(json["status"], "done");
    }
}
