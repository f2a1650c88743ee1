/// Result delivery by email
///
/// This module handles:
/// - Building the notification message for a finished batch
/// - Encoding attachments (base64)
/// - POSTing the message to a transactional-email HTTP API
use crate::types::{BatchSummary, DeliveryOutcome, PostProcessReport, StepKind};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use serde_json::json;
use std::fs;
use std::path::Path;
use thiserror::Error;

const USER_AGENT: &str = concat!("deckmill/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding the API key for the mail endpoint
pub const API_KEY_ENV: &str = "DECKMILL_MAIL_API_KEY";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("cannot read attachment {path}: {source}")]
    Attachment { path: String, source: std::io::Error },

    #[error("mail endpoint rejected the message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("mail endpoint unreachable: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn from_path(path: &Path) -> Result<Self, NotifyError> {
        let bytes = fs::read(path)
            .map_err(|source| NotifyError::Attachment { path: path.display().to_string(), source })?;
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        Ok(Attachment { content_type: content_type_for(&file_name), file_name, bytes })
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".pptx") {
        "application/vnd.openxmlformats-officedocument.presentationml.presentation"
    } else if lower.ends_with(".zip") {
        "application/zip"
    } else if lower.ends_with(".tar.gz") {
        "application/gzip"
    } else if lower.ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Standard message for a finished batch
    pub fn for_batch(summary: &BatchSummary, attachments: Vec<Attachment>) -> Self {
        let subject = format!("deckmill: {} presentations generated", summary.generated);
        let body = format!(
            "Batch finished.\n\nGenerated: {}\nSkipped: {}\nFailed: {}\n",
            summary.generated, summary.skipped, summary.failed
        );
        Message { subject, body, attachments }
    }
}

/// Sends a message; returns the provider's message id
pub trait Notifier {
    fn send(&self, message: &Message) -> Result<String, NotifyError>;

    /// Recipients, used to label the delivery in reports
    fn recipients(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MailerConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub from: String,
    pub to: Vec<String>,
}

/// JSON-over-HTTP mail API client
pub struct HttpMailer {
    config: MailerConfig,
}

impl HttpMailer {
    pub fn new(config: MailerConfig) -> Self {
        HttpMailer { config }
    }

    /// Request body sent to the endpoint
    pub fn payload(&self, message: &Message) -> serde_json::Value {
        let attachments: Vec<serde_json::Value> = message
            .attachments
            .iter()
            .map(|a| {
                json!({
                    "filename": a.file_name,
                    "content_type": a.content_type,
                    "content": STANDARD.encode(&a.bytes),
                })
            })
            .collect();

        json!({
            "from": self.config.from,
            "to": self.config.to,
            "subject": message.subject,
            "text": message.body,
            "attachments": attachments,
        })
    }
}

impl Notifier for HttpMailer {
    fn send(&self, message: &Message) -> Result<String, NotifyError> {
        debug!("Sending notification to {:?} via {}", self.config.to, self.config.endpoint);

        let mut request = ureq::post(&self.config.endpoint)
            .set("User-Agent", USER_AGENT)
            .set("Content-Type", "application/json");
        if let Some(key) = &self.config.api_key {
            request = request.set("Authorization", &format!("Bearer {}", key));
        }

        let response = match request.send_string(&self.payload(message).to_string()) {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(NotifyError::Rejected { status, body });
            }
            Err(e) => return Err(NotifyError::Transport(e.to_string())),
        };

        let status = response.status();
        let body = response.into_string().map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(message_id(&body).unwrap_or_else(|| format!("HTTP {}", status)))
    }

    fn recipients(&self) -> Vec<String> {
        self.config.to.clone()
    }
}

/// Pull a message id out of a provider response, if it has one
fn message_id(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["id", "message_id", "messageId"]
        .iter()
        .find_map(|k| value.get(*k).and_then(|v| v.as_str()).map(|s| s.to_string()))
}

/// Send `message` and record the outcome
pub fn deliver(notifier: &dyn Notifier, message: &Message, report: &mut PostProcessReport) {
    let target = notifier.recipients().join(", ");
    let outcome = match notifier.send(message) {
        Ok(id) => DeliveryOutcome::Delivered(id),
        Err(e) => {
            warn!("Notification to {} failed: {}", target, e);
            DeliveryOutcome::Failed(e.to_string())
        }
    };
    report.record(StepKind::Notify, target, outcome);
}
