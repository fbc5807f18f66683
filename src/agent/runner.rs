//! Action executor / controller — the per-email state machine.
//!
//! States: fetch_email → summarize → categorize → plan → controller ⇄
//! handlers → finalize → done. The controller is the single dispatch
//! hub: it pops the head of the pending queue and routes to the handler
//! for that action kind; every handler appends exactly one result and
//! hands control back.
//!
//! Nothing escapes a run as an unhandled failure. Fetch and
//! classification problems land in the run's error list; handler
//! problems land in per-action statuses; the run always returns its
//! final snapshot.

use std::io::Write;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::agent::planner::plan_actions;
use crate::agent::signals::{
    build_summary, email_text, extract_dates, extract_discount_codes, extract_email_address,
    extract_links,
};
use crate::agent::types::{
    ActionKind, ActionStatus, AgentRun, Artifacts, EmailEnvelope, PlannedAction,
};
use crate::classify::categorize_email;
use crate::config::default_categories;
use crate::labels::SenderLabelBuffer;
use crate::llm::LlmProvider;
use crate::toolbox::{NullToolbox, ToolResult, Toolbox};

/// File name for the uploaded article artifact.
const ARTICLE_FILE_NAME: &str = "email_summary.md";

/// Mime type for the uploaded article artifact.
const ARTICLE_MIME_TYPE: &str = "text/markdown";

/// Pipeline states. The controller is revisited after every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    FetchEmail,
    Summarize,
    Categorize,
    Plan,
    Controller,
    Handle(ActionKind),
    Finalize,
    Done,
}

/// Parameters for one agent run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub user_id: String,
    pub message_id: String,
    /// When false (dry run), handlers report intent without side effects.
    pub execute_actions: bool,
    /// When false, the classifier stage is skipped entirely.
    pub categorize_with_llm: bool,
    /// Pre-fetched email; when absent the toolbox fetch capability is used.
    pub email: Option<EmailEnvelope>,
    /// Caller-supplied sender category, recorded at finalize.
    pub sender_category: Option<String>,
}

impl RunRequest {
    pub fn new(user_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message_id: message_id.into(),
            execute_actions: false,
            categorize_with_llm: true,
            email: None,
            sender_category: None,
        }
    }

    pub fn execute_actions(mut self, execute: bool) -> Self {
        self.execute_actions = execute;
        self
    }

    pub fn categorize_with_llm(mut self, categorize: bool) -> Self {
        self.categorize_with_llm = categorize;
        self
    }

    pub fn with_email(mut self, email: EmailEnvelope) -> Self {
        self.email = Some(email);
        self
    }

    pub fn with_sender_category(mut self, category: impl Into<String>) -> Self {
        self.sender_category = Some(category.into());
        self
    }
}

/// The email agent — wires extraction, planning, classification, and
/// action execution into one request/response pipeline.
pub struct EmailAgent {
    toolbox: Arc<dyn Toolbox>,
    llm: Option<Arc<dyn LlmProvider>>,
    categories: Vec<String>,
    labels: Option<Arc<SenderLabelBuffer>>,
}

impl EmailAgent {
    /// Create an agent over a toolbox, with the classifier disabled.
    pub fn new(toolbox: Arc<dyn Toolbox>) -> Self {
        Self {
            toolbox,
            llm: None,
            categories: default_categories(),
            labels: None,
        }
    }

    /// Enable the LLM classifier with a category list.
    pub fn with_classifier(mut self, llm: Arc<dyn LlmProvider>, categories: Vec<String>) -> Self {
        self.llm = Some(llm);
        self.categories = categories;
        self
    }

    /// Attach a sender-label buffer for caller-supplied categorizations.
    pub fn with_label_buffer(mut self, buffer: Arc<SenderLabelBuffer>) -> Self {
        self.labels = Some(buffer);
        self
    }

    /// Run the full pipeline for one (user, message) pair.
    ///
    /// Always returns a snapshot; inspect `errors` and per-action
    /// `status` values to determine overall success.
    pub async fn run(&self, request: RunRequest) -> AgentRun {
        let email_supplied = request.email.is_some();
        let mut run = AgentRun::new(
            request.user_id,
            request.message_id,
            request.execute_actions,
            request.categorize_with_llm,
            request.sender_category,
            request.email.unwrap_or_default(),
        );

        info!(
            user_id = %run.user_id,
            message_id = %run.message_id,
            execute = run.execute_actions,
            "Starting email agent run"
        );

        let mut stage = Stage::FetchEmail;
        loop {
            stage = match stage {
                Stage::FetchEmail => {
                    self.fetch_email(&mut run, email_supplied).await;
                    Stage::Summarize
                }
                Stage::Summarize => {
                    self.summarize(&mut run);
                    Stage::Categorize
                }
                Stage::Categorize => {
                    self.categorize(&mut run).await;
                    Stage::Plan
                }
                Stage::Plan => {
                    self.plan(&mut run);
                    Stage::Controller
                }
                Stage::Controller => self.controller(&mut run),
                Stage::Handle(kind) => {
                    self.handle(kind, &mut run).await;
                    Stage::Controller
                }
                Stage::Finalize => {
                    self.finalize(&mut run).await;
                    Stage::Done
                }
                Stage::Done => break,
            };
        }

        info!(
            user_id = %run.user_id,
            message_id = %run.message_id,
            results = run.results.len(),
            errors = run.errors.len(),
            "Email agent run complete"
        );
        run
    }

    // ── Stages ──────────────────────────────────────────────────────

    async fn fetch_email(&self, run: &mut AgentRun, email_supplied: bool) {
        if email_supplied {
            return;
        }
        let result = self
            .toolbox
            .get_message(&run.user_id, &run.message_id)
            .await;
        if !result.ok || result.data.is_none() {
            let reason = result
                .error
                .unwrap_or_else(|| "Failed to fetch email.".to_string());
            warn!(message_id = %run.message_id, reason = %reason, "Email fetch failed");
            run.errors.push(reason);
            return;
        }
        run.email = parse_message_payload(result.data.unwrap_or_default());
    }

    fn summarize(&self, run: &mut AgentRun) {
        let text = email_text(&run.email);
        run.artifacts = Artifacts {
            links: extract_links(&text),
            discount_codes: extract_discount_codes(&text),
            dates: extract_dates(&text),
        };
        run.summary = build_summary(&run.email);
        debug!(
            links = run.artifacts.links.len(),
            codes = run.artifacts.discount_codes.len(),
            dates = run.artifacts.dates.len(),
            "Extracted artifacts"
        );
    }

    async fn categorize(&self, run: &mut AgentRun) {
        if !run.categorize_with_llm {
            return;
        }
        let Some(llm) = &self.llm else {
            debug!("Categorization requested but no classifier is wired; skipping");
            return;
        };
        match categorize_email(
            llm.as_ref(),
            &run.email,
            Some(run.summary.as_str()),
            &self.categories,
        )
        .await
        {
            Ok(Some(suggestion)) => {
                debug!(
                    category = %suggestion.category,
                    confidence = suggestion.confidence,
                    "Classifier suggestion"
                );
                run.suggestion = Some(suggestion);
            }
            // Empty email or malformed response — best-effort enrichment,
            // absent without an error entry.
            Ok(None) => {}
            Err(e) => run.errors.push(format!("Categorization failed: {e}")),
        }
    }

    fn plan(&self, run: &mut AgentRun) {
        run.pending_actions = plan_actions(&run.email, &run.summary, &run.artifacts).into();
        debug!(planned = run.pending_actions.len(), "Planned actions");
    }

    /// Dispatch hub: pop the next action or route to finalize.
    fn controller(&self, run: &mut AgentRun) -> Stage {
        match run.pending_actions.pop_front() {
            None => {
                run.current_action = None;
                Stage::Finalize
            }
            Some(plan) => {
                let kind = plan.kind();
                debug!(action = %kind, "Dispatching action");
                run.current_action = Some(plan);
                Stage::Handle(kind)
            }
        }
    }

    async fn handle(&self, kind: ActionKind, run: &mut AgentRun) {
        match kind {
            ActionKind::StoreDiscount => self.handle_discount(run),
            ActionKind::CreateCalendarEvent => self.handle_calendar(run),
            ActionKind::SaveArticle => self.handle_article(run).await,
            ActionKind::SaveAttachments => self.handle_attachments(run).await,
            ActionKind::DraftReply => self.handle_reply(run).await,
            ActionKind::MarkRead => self.handle_mark_read(run).await,
        }
    }

    async fn finalize(&self, run: &mut AgentRun) {
        let Some(buffer) = &self.labels else { return };
        let Some(category) = run.sender_category.clone().filter(|c| !c.is_empty()) else {
            return;
        };
        let raw_sender = run.email.from.as_deref().or(run.email.sender.as_deref());
        let Some(sender_email) = extract_email_address(raw_sender) else {
            return;
        };
        buffer
            .record(
                &run.user_id,
                &sender_email,
                run.email.sender_domain.as_deref(),
                &category,
                "user",
            )
            .await;
    }

    // ── Handlers — exactly one result each ──────────────────────────

    fn handle_discount(&self, run: &mut AgentRun) {
        let (codes, summary) = match &run.current_action {
            Some(plan) => match &plan.action {
                PlannedAction::StoreDiscount { codes, summary } => {
                    (codes.clone(), summary.clone())
                }
                _ => (Vec::new(), run.summary.clone()),
            },
            None => (Vec::new(), run.summary.clone()),
        };
        // No external call: a pure recording decision for downstream
        // persistence.
        let status = if codes.is_empty() {
            ActionStatus::NeedsReview
        } else {
            ActionStatus::Captured
        };
        run.record(
            ActionKind::StoreDiscount,
            status,
            json!({"codes": codes, "summary": summary}),
        );
    }

    fn handle_calendar(&self, run: &mut AgentRun) {
        let (dates, summary) = match &run.current_action {
            Some(plan) => match &plan.action {
                PlannedAction::CreateCalendarEvent { dates, summary } => {
                    (dates.clone(), summary.clone())
                }
                _ => (Vec::new(), run.summary.clone()),
            },
            None => (Vec::new(), run.summary.clone()),
        };
        if dates.is_empty() {
            run.record(
                ActionKind::CreateCalendarEvent,
                ActionStatus::NeedsReview,
                json!({"reason": "No dates parsed."}),
            );
            return;
        }
        if !run.execute_actions {
            run.record(
                ActionKind::CreateCalendarEvent,
                ActionStatus::Planned,
                json!({"dates": dates, "summary": summary}),
            );
            return;
        }
        // Calendar creation needs interpretation the extractor cannot
        // verify, so even execute mode defers to review.
        run.record(
            ActionKind::CreateCalendarEvent,
            ActionStatus::NeedsReview,
            json!({"dates": dates, "summary": summary}),
        );
    }

    async fn handle_article(&self, run: &mut AgentRun) {
        let (folder, links, summary) = match &run.current_action {
            Some(plan) => match &plan.action {
                PlannedAction::SaveArticle {
                    folder,
                    links,
                    summary,
                } => (folder.clone(), links.clone(), summary.clone()),
                _ => ("Unsorted".to_string(), Vec::new(), run.summary.clone()),
            },
            None => ("Unsorted".to_string(), Vec::new(), run.summary.clone()),
        };

        if !run.execute_actions {
            run.record(
                ActionKind::SaveArticle,
                ActionStatus::Planned,
                json!({"folder": folder, "links": links}),
            );
            return;
        }

        let folder_result = self
            .toolbox
            .create_drive_folder(&run.user_id, &folder)
            .await;
        if !folder_result.ok {
            run.record(
                ActionKind::SaveArticle,
                ActionStatus::Error,
                json!({"error": folder_result.error}),
            );
            return;
        }
        let folder_id = folder_result
            .data
            .as_ref()
            .and_then(|d| d.get("id"))
            .and_then(|v| v.as_str())
            .map(String::from);

        let document = compose_article_markdown(&folder, &summary, &links);
        let upload = self
            .upload_article(&run.user_id, &document, folder_id.as_deref())
            .await;
        let status = if upload.ok {
            ActionStatus::Uploaded
        } else {
            ActionStatus::Error
        };
        run.record(
            ActionKind::SaveArticle,
            status,
            json!({"folder_id": folder_id, "upload": tool_result_json(&upload)}),
        );
    }

    /// Stage the article document in a temp file and hand its path to
    /// the upload capability.
    async fn upload_article(
        &self,
        user_id: &str,
        document: &str,
        folder_id: Option<&str>,
    ) -> ToolResult {
        let staged = tempfile::NamedTempFile::new().and_then(|mut file| {
            file.write_all(document.as_bytes())?;
            file.flush()?;
            Ok(file)
        });
        let file = match staged {
            Ok(file) => file,
            Err(e) => return ToolResult::failure(format!("Failed to stage article file: {e}")),
        };
        let path = file.path().to_string_lossy().to_string();
        self.toolbox
            .upload_file(user_id, &path, ARTICLE_FILE_NAME, folder_id, ARTICLE_MIME_TYPE)
            .await
    }

    async fn handle_attachments(&self, run: &mut AgentRun) {
        let attachment_ids = match &run.current_action {
            Some(plan) => match &plan.action {
                PlannedAction::SaveAttachments { attachment_ids } => attachment_ids.clone(),
                _ => Vec::new(),
            },
            None => Vec::new(),
        };
        if attachment_ids.is_empty() {
            run.record(
                ActionKind::SaveAttachments,
                ActionStatus::NeedsReview,
                json!({"reason": "No attachment IDs were parsed."}),
            );
            return;
        }
        if !run.execute_actions {
            run.record(
                ActionKind::SaveAttachments,
                ActionStatus::Planned,
                json!({"attachment_ids": attachment_ids}),
            );
            return;
        }
        let result = self
            .toolbox
            .save_attachments_to_folder(&run.user_id, &run.message_id, &attachment_ids)
            .await;
        let status = if result.ok {
            ActionStatus::Saved
        } else {
            ActionStatus::Error
        };
        run.record(
            ActionKind::SaveAttachments,
            status,
            json!({"result": tool_result_json(&result)}),
        );
    }

    async fn handle_reply(&self, run: &mut AgentRun) {
        let raw = run.email.reply_to.as_deref().or(run.email.from.as_deref());
        let to_address = extract_email_address(raw);
        let subject = run
            .email
            .subject
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Re: your email".to_string());

        let Some(to_address) = to_address else {
            run.record(
                ActionKind::DraftReply,
                ActionStatus::NeedsReview,
                json!({"reason": "No reply-to address found."}),
            );
            return;
        };
        if !run.execute_actions {
            run.record(
                ActionKind::DraftReply,
                ActionStatus::Planned,
                json!({"to": to_address, "subject": subject}),
            );
            return;
        }
        let body = format!(
            "Thanks for the note! I reviewed the details and will follow up shortly.\n\n\
             Summary: {}",
            run.summary
        );
        let result = self
            .toolbox
            .create_draft(&run.user_id, &to_address, &format!("Re: {subject}"), &body)
            .await;
        let status = if result.ok {
            ActionStatus::Drafted
        } else {
            ActionStatus::Error
        };
        run.record(
            ActionKind::DraftReply,
            status,
            json!({"draft": tool_result_json(&result)}),
        );
    }

    async fn handle_mark_read(&self, run: &mut AgentRun) {
        if !run.execute_actions {
            run.record(ActionKind::MarkRead, ActionStatus::Planned, json!({}));
            return;
        }
        let result = self
            .toolbox
            .mark_as_read(&run.user_id, &run.message_id)
            .await;
        let status = if result.ok {
            ActionStatus::Done
        } else {
            ActionStatus::Error
        };
        run.record(
            ActionKind::MarkRead,
            status,
            json!({"result": tool_result_json(&result)}),
        );
    }
}

/// Run the email agent with an optional toolbox and label buffer,
/// defaulting to the no-op toolbox for plan-only operation.
pub async fn run_email_agent(
    request: RunRequest,
    toolbox: Option<Arc<dyn Toolbox>>,
    labels: Option<Arc<SenderLabelBuffer>>,
) -> AgentRun {
    let mut agent = EmailAgent::new(toolbox.unwrap_or_else(|| Arc::new(NullToolbox::new())));
    if let Some(buffer) = labels {
        agent = agent.with_label_buffer(buffer);
    }
    agent.run(request).await
}

/// Unwrap a `get_message` payload: either `{"email": ..,
/// "attachments": [..]}` or the email mapping itself.
fn parse_message_payload(data: serde_json::Value) -> EmailEnvelope {
    if let Some(inner) = data.get("email") {
        let mut email: EmailEnvelope =
            serde_json::from_value(inner.clone()).unwrap_or_default();
        email.attachments = data
            .get("attachments")
            .cloned()
            .map(|v| serde_json::from_value(v).unwrap_or_default())
            .unwrap_or_default();
        email
    } else {
        serde_json::from_value(data).unwrap_or_default()
    }
}

/// Title, summary, and link list as a small markdown document.
fn compose_article_markdown(folder: &str, summary: &str, links: &[String]) -> String {
    let mut document = format!("# {folder}\n\n{summary}\n\n");
    if !links.is_empty() {
        document.push_str("Links:\n");
        for link in links {
            document.push_str(&format!("- {link}\n"));
        }
    }
    document
}

fn tool_result_json(result: &ToolResult) -> serde_json::Value {
    serde_json::to_value(result).unwrap_or(serde_json::Value::Null)
}
