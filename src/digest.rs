//! Daily summary workflow.
//!
//! Two stages: gather context items from whatever sources are wired,
//! then draft a short plain-text summary. A failing source is skipped
//! with a logged warning rather than failing the day's summary.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ContextError;

/// One item of daily context (an appointment, a task, an app signal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    /// Which source produced this item.
    pub source: String,
    pub detail: String,
}

/// A source of daily context items.
#[async_trait]
pub trait ContextSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, user_id: &str, date: NaiveDate)
    -> Result<Vec<ContextItem>, ContextError>;
}

/// Produce the daily summary for one user and date.
pub async fn run_daily_summary(
    user_id: &str,
    date: NaiveDate,
    sources: &[Arc<dyn ContextSource>],
) -> String {
    let mut items = Vec::new();
    for source in sources {
        match source.fetch(user_id, date).await {
            Ok(mut fetched) => items.append(&mut fetched),
            Err(e) => {
                warn!(source = source.name(), error = %e, "Context source failed; skipping");
            }
        }
    }
    draft_summary(user_id, date, &items)
}

fn draft_summary(user_id: &str, date: NaiveDate, items: &[ContextItem]) -> String {
    if items.is_empty() {
        return format!(
            "Daily summary for {user_id} on {date}: no context sources reported anything today."
        );
    }
    let mut summary = format!(
        "Daily summary for {user_id} on {date} ({} item{}):\n",
        items.len(),
        if items.len() == 1 { "" } else { "s" },
    );
    for item in items {
        summary.push_str(&format!("- {}: {}\n", item.source, item.detail));
    }
    summary.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource {
        name: String,
        items: Vec<ContextItem>,
    }

    #[async_trait]
    impl ContextSource for FixedSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(
            &self,
            _user_id: &str,
            _date: NaiveDate,
        ) -> Result<Vec<ContextItem>, ContextError> {
            Ok(self.items.clone())
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl ContextSource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }

        async fn fetch(
            &self,
            _user_id: &str,
            _date: NaiveDate,
        ) -> Result<Vec<ContextItem>, ContextError> {
            Err(ContextError::FetchFailed {
                name: "broken".to_string(),
                reason: "backend offline".to_string(),
            })
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 3).unwrap()
    }

    #[tokio::test]
    async fn summary_with_no_sources() {
        let summary = run_daily_summary("user-1", date(), &[]).await;
        assert_eq!(
            summary,
            "Daily summary for user-1 on 2026-02-03: no context sources reported anything today."
        );
    }

    #[tokio::test]
    async fn summary_lists_items_from_all_sources() {
        let sources: Vec<Arc<dyn ContextSource>> = vec![
            Arc::new(FixedSource {
                name: "calendar".into(),
                items: vec![ContextItem {
                    source: "calendar".into(),
                    detail: "Dentist at 9am".into(),
                }],
            }),
            Arc::new(FixedSource {
                name: "tasks".into(),
                items: vec![ContextItem {
                    source: "tasks".into(),
                    detail: "File expense report".into(),
                }],
            }),
        ];
        let summary = run_daily_summary("user-1", date(), &sources).await;
        assert!(summary.contains("(2 items)"));
        assert!(summary.contains("- calendar: Dentist at 9am"));
        assert!(summary.contains("- tasks: File expense report"));
    }

    #[tokio::test]
    async fn failing_source_is_skipped() {
        let sources: Vec<Arc<dyn ContextSource>> = vec![
            Arc::new(BrokenSource),
            Arc::new(FixedSource {
                name: "calendar".into(),
                items: vec![ContextItem {
                    source: "calendar".into(),
                    detail: "Standup at 10".into(),
                }],
            }),
        ];
        let summary = run_daily_summary("user-1", date(), &sources).await;
        assert!(summary.contains("(1 item)"));
        assert!(summary.contains("Standup at 10"));
    }
}
