//! Operator alerts.
//!
//! Conditions that persist (a halted chain, an unreachable endpoint) go through a three-state
//! hysteresis so that a flapping condition produces one alert, and the recovery notice is only
//! sent once the condition has stayed healthy for the grace period. One-off events are sent
//! directly with [`AlertManager::notify`].
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

mod webhook;
pub use webhook::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Alert,
    Recovery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    /// Condition the alert belongs to, absent for one-off events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Webhook responded with {status}: {body}")]
    WebhookError { status: u16, body: String },
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<(), AlertError>;
}

/// Writes alerts to the log.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        match alert.level {
            AlertLevel::Alert => log::error!(target: "alerts", "ALERT: {}", alert.message),
            AlertLevel::Recovery => log::info!(target: "alerts", "RECOVERED: {}", alert.message),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Normal,
    Alerting,
    /// Healthy since the given instant, recovery not yet announced.
    Recovering(Instant),
}

pub struct AlertManager {
    sinks: Vec<Arc<dyn AlertSink>>,
    grace_period: Duration,
    states: Mutex<HashMap<String, AlertState>>,
}

impl AlertManager {
    pub fn new(sinks: Vec<Arc<dyn AlertSink>>, grace_period: Duration) -> Self {
        Self {
            sinks,
            grace_period,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Log sink, plus a webhook sink when a URL is configured.
    pub fn from_webhook_url(webhook_url: Option<String>, grace_period: Duration) -> Self {
        let mut sinks: Vec<Arc<dyn AlertSink>> = vec![Arc::new(LogAlertSink)];
        if let Some(url) = webhook_url {
            sinks.push(Arc::new(WebhookAlertSink::new(url)));
        }
        Self::new(sinks, grace_period)
    }

    pub fn state(&self, condition: &str) -> AlertState {
        self.states
            .lock()
            .get(condition)
            .copied()
            .unwrap_or(AlertState::Normal)
    }

    /// Sends a one-off alert.
    pub async fn notify(&self, message: impl Into<String>) {
        self.dispatch(Alert {
            level: AlertLevel::Alert,
            condition: None,
            message: message.into(),
        })
        .await;
    }

    /// The condition is currently bad. Alerts only on the transition out of `Normal`.
    pub async fn report_unhealthy(&self, condition: &str, message: impl Into<String>) {
        let should_alert = {
            let mut states = self.states.lock();
            let state = states
                .entry(condition.to_string())
                .or_insert(AlertState::Normal);
            let was_normal = *state == AlertState::Normal;
            *state = AlertState::Alerting;
            was_normal
        };
        if should_alert {
            self.dispatch(Alert {
                level: AlertLevel::Alert,
                condition: Some(condition.to_string()),
                message: message.into(),
            })
            .await;
        }
    }

    /// The condition is currently fine. Announces recovery once it has been fine for the
    /// whole grace period.
    pub async fn report_healthy(&self, condition: &str, message: impl Into<String>) {
        let recovered = {
            let mut states = self.states.lock();
            let Some(current) = states.get(condition).copied() else {
                return;
            };
            match current {
                AlertState::Normal => false,
                AlertState::Alerting => {
                    states.insert(
                        condition.to_string(),
                        AlertState::Recovering(Instant::now()),
                    );
                    false
                }
                AlertState::Recovering(since) if since.elapsed() >= self.grace_period => {
                    states.remove(condition);
                    true
                }
                AlertState::Recovering(_) => false,
            }
        };
        if recovered {
            self.dispatch(Alert {
                level: AlertLevel::Recovery,
                condition: Some(condition.to_string()),
                message: message.into(),
            })
            .await;
        }
    }

    async fn dispatch(&self, alert: Alert) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(&alert).await {
                log::warn!(target: "alerts", "Failed to deliver alert '{}': {}", alert.message, e);
            }
        }
    }
}
