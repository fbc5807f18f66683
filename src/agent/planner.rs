//! Action planner — turns an email plus its extracted artifacts into an
//! ordered list of candidate actions.
//!
//! Pure function of its inputs: no external calls, no hidden state, and
//! conditions are evaluated in a fixed order so the plan list is stable
//! for a given (email, summary, artifacts) triple. A terminal `mark_read`
//! plan is always appended last.

use crate::agent::signals::{contains_any, email_text, infer_folder, resolve_sender_domain};
use crate::agent::types::{ActionPlan, Artifacts, EmailEnvelope, PlannedAction};

/// Newsletter-style language.
const NEWSLETTER_HINTS: &[&str] = &[
    "newsletter",
    "digest",
    "substack",
    "medium",
    "read time",
    "top stories",
];

/// Event/scheduling language.
const CALENDAR_HINTS: &[&str] = &[
    "invite",
    "calendar",
    "meeting",
    "appointment",
    "schedule",
    "reservation",
    "event",
];

/// Promotion language.
const DISCOUNT_HINTS: &[&str] = &[
    "promo code",
    "coupon",
    "discount",
    "use code",
    "save",
    "deal",
];

/// Language suggesting the sender expects a response. A bare question
/// mark counts.
const REPLY_HINTS: &[&str] = &[
    "please reply",
    "let me know",
    "can you",
    "could you",
    "need your",
    "?",
];

/// Produce the ordered candidate-action list for one email.
pub fn plan_actions(email: &EmailEnvelope, summary: &str, artifacts: &Artifacts) -> Vec<ActionPlan> {
    let text = email_text(email);
    let sender_domain = resolve_sender_domain(email);

    let mut actions = Vec::new();

    let codes = &artifacts.discount_codes;
    let dates = &artifacts.dates;
    let links = &artifacts.links;
    let attachments = &email.attachments;

    if !codes.is_empty() || contains_any(&text, DISCOUNT_HINTS) {
        actions.push(ActionPlan {
            action: PlannedAction::StoreDiscount {
                codes: codes.clone(),
                summary: summary.to_string(),
            },
            reason: "Detected discount language or codes.".to_string(),
            confidence: if codes.is_empty() { 0.4 } else { 0.65 },
            requires_review: codes.is_empty(),
        });
    }

    if !dates.is_empty() || contains_any(&text, CALENDAR_HINTS) {
        actions.push(ActionPlan {
            action: PlannedAction::CreateCalendarEvent {
                dates: dates.clone(),
                summary: summary.to_string(),
            },
            reason: "Detected date/event signals.".to_string(),
            confidence: if dates.is_empty() { 0.35 } else { 0.55 },
            requires_review: true,
        });
    }

    if contains_any(&text, NEWSLETTER_HINTS) || links.len() >= 3 {
        actions.push(ActionPlan {
            action: PlannedAction::SaveArticle {
                folder: infer_folder(&text, sender_domain.as_deref()),
                links: links.clone(),
                summary: summary.to_string(),
            },
            reason: "Newsletter-style content or multiple links detected.".to_string(),
            confidence: 0.6,
            requires_review: false,
        });
    }

    if !attachments.is_empty() {
        let attachment_ids: Vec<String> = attachments
            .iter()
            .filter_map(|a| a.attachment_id.clone())
            .filter(|id| !id.is_empty())
            .collect();
        let has_ids = !attachment_ids.is_empty();
        actions.push(ActionPlan {
            action: PlannedAction::SaveAttachments { attachment_ids },
            reason: "Email includes attachments.".to_string(),
            confidence: if has_ids { 0.7 } else { 0.4 },
            requires_review: !has_ids,
        });
    }

    if contains_any(&text, REPLY_HINTS) {
        actions.push(ActionPlan {
            action: PlannedAction::DraftReply {
                summary: summary.to_string(),
            },
            reason: "Email appears to request a response.".to_string(),
            confidence: 0.4,
            requires_review: true,
        });
    }

    actions.push(ActionPlan {
        action: PlannedAction::MarkRead,
        reason: "Processed by the assistant.".to_string(),
        confidence: 0.9,
        requires_review: false,
    });

    actions
}
