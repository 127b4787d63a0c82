//! Alert delivery.
//!
//! The driver hands each rendered alert to an `AlertSink`. Delivery is best
//! effort: a failed send is logged by the driver and never rolls back the state
//! transition that produced the alert.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AlertsConfig;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("delivery refused: {0}")]
    Refused(String),
}

pub trait AlertSink {
    fn name(&self) -> &str;

    /// Deliver one message to every subscriber of the channel.
    fn deliver(&self, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct BroadcastBody<'a> {
    messages: [TextMessage<'a>; 1],
}

/// Messaging-API broadcast: POST `{"messages":[{"type":"text","text":...}]}`
/// with a bearer token.
pub struct LineBroadcastSink {
    client: reqwest::blocking::Client,
    endpoint: String,
    token: String,
}

impl LineBroadcastSink {
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token: token.to_string(),
        })
    }
}

impl AlertSink for LineBroadcastSink {
    fn name(&self) -> &str {
        "line_broadcast"
    }

    fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        let body = BroadcastBody {
            messages: [TextMessage { kind: "text", text }],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body: String = resp.text().unwrap_or_default().chars().take(200).collect();
        Err(DeliveryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Writes alerts to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogSink {
    /// Logged at info when set (dry runs), warn otherwise (token missing).
    pub intentional: bool,
}

impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        let preview = text.replace('\n', " | ");
        if self.intentional {
            info!(text = %preview, "alert (dry run, not sent)");
        } else {
            warn!(text = %preview, "no access token configured, alert not sent");
        }
        Ok(())
    }
}

/// Keeps every message in memory. Tests only.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records and then reports every delivery as failed.
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl AlertSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        if self.fail {
            return Err(DeliveryError::Refused("recording sink set to fail".into()));
        }
        Ok(())
    }
}

/// Broadcast sink when the token variable is set and non-empty, log sink otherwise.
pub fn sink_from_config(alerts: &AlertsConfig) -> Result<Box<dyn AlertSink>, DeliveryError> {
    match std::env::var(&alerts.token_env) {
        Ok(token) if !token.trim().is_empty() => Ok(Box::new(LineBroadcastSink::new(
            &alerts.endpoint,
            token.trim(),
            Duration::from_secs(alerts.timeout_secs),
        )?)),
        _ => {
            warn!(env = %alerts.token_env, "access token not set, alerts will only be logged");
            Ok(Box::new(LogSink::default()))
        }
    }
}
