//! Sender-categorization event buffer.
//!
//! Runs record one event per user-supplied categorization; the buffer
//! accumulates them in memory and flushes batches to an object store as
//! JSON Lines for offline aggregation. Appends are safe under concurrent
//! runs. User ids are HMAC-hashed before they enter an event so raw ids
//! never reach storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::LabelSettings;
use crate::error::LabelSinkError;

type HmacSha256 = Hmac<Sha256>;

/// One recorded categorization event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderCategoryEvent {
    pub sender_email: String,
    pub sender_domain: String,
    pub category: String,
    /// HMAC-SHA256 of the user id, hex-encoded. Empty when no hash
    /// secret is configured.
    pub user_id_hash: String,
    pub recorded_at: DateTime<Utc>,
    /// Who produced the label ("user" for caller-supplied categories).
    pub source: String,
}

/// Where flushed batches go — one object per flush.
#[async_trait]
pub trait LabelStore: Send + Sync {
    async fn put_object(&self, path: &str, payload: Vec<u8>) -> Result<(), LabelSinkError>;
}

/// Outcome of one flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReceipt {
    /// Number of events written.
    pub count: usize,
    /// Object path of the written batch; `None` when there was nothing
    /// to write.
    pub object_path: Option<String>,
}

/// In-memory buffer of categorization events with batch flush.
pub struct SenderLabelBuffer {
    prefix: String,
    user_hash_secret: String,
    events: RwLock<Vec<SenderCategoryEvent>>,
}

impl SenderLabelBuffer {
    pub fn new(settings: &LabelSettings) -> Self {
        Self {
            prefix: settings.prefix.clone(),
            user_hash_secret: settings.user_hash_secret.clone(),
            events: RwLock::new(Vec::new()),
        }
    }

    /// Append one event. The sender domain falls back to the part after
    /// `@` in the sender email when not supplied.
    pub async fn record(
        &self,
        user_id: &str,
        sender_email: &str,
        sender_domain: Option<&str>,
        category: &str,
        source: &str,
    ) {
        let domain = sender_domain
            .filter(|d| !d.is_empty())
            .map(String::from)
            .unwrap_or_else(|| parse_domain(sender_email));
        let event = SenderCategoryEvent {
            sender_email: sender_email.to_string(),
            sender_domain: domain,
            category: category.to_string(),
            user_id_hash: hash_user_id(user_id, &self.user_hash_secret),
            recorded_at: Utc::now(),
            source: source.to_string(),
        };
        debug!(
            sender = %event.sender_email,
            category = %event.category,
            source = %event.source,
            "Recorded sender categorization event"
        );
        self.events.write().await.push(event);
    }

    /// Number of buffered events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }

    /// Copy of the buffered events, for inspection.
    pub async fn snapshot(&self) -> Vec<SenderCategoryEvent> {
        self.events.read().await.clone()
    }

    /// Write all buffered events to the store as one JSON Lines object
    /// and clear the buffer. On failure the events are retained for a
    /// later retry.
    pub async fn flush(&self, store: &dyn LabelStore) -> Result<FlushReceipt, LabelSinkError> {
        let mut events = self.events.write().await;
        if events.is_empty() {
            return Ok(FlushReceipt {
                count: 0,
                object_path: None,
            });
        }

        let run_id = Uuid::new_v4().simple().to_string();
        let path = object_path(&self.prefix, &run_id, Utc::now());

        let mut payload = Vec::new();
        for event in events.iter() {
            let line = serde_json::to_vec(event)?;
            payload.extend_from_slice(&line);
            payload.push(b'\n');
        }

        store.put_object(&path, payload).await?;

        let count = events.len();
        events.clear();
        info!(count, path = %path, "Flushed sender categorization events");
        Ok(FlushReceipt {
            count,
            object_path: Some(path),
        })
    }
}

fn hash_user_id(user_id: &str, secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(user_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn parse_domain(sender_email: &str) -> String {
    match sender_email.split_once('@') {
        Some((_, domain)) => domain.trim().to_lowercase(),
        None => String::new(),
    }
}

fn object_path(prefix: &str, run_id: &str, timestamp: DateTime<Utc>) -> String {
    let date_part = timestamp.format("%Y-%m-%d");
    format!("{prefix}/ingest_date={date_part}/run_id={run_id}/sender_labels_{run_id}.jsonl")
}
