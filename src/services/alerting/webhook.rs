//! Delivers alerts as JSON `POST` requests.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Alert, AlertError, AlertSink};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct WebhookAlertSink {
    client: Client,
    webhook_url: String,
}

impl WebhookAlertSink {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .timeout(WEBHOOK_TIMEOUT)
            .json(alert)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(AlertError::WebhookError {
            status: status.as_u16(),
            body: response.text().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::AlertLevel;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alert() -> Alert {
        Alert {
            level: AlertLevel::Alert,
            condition: Some("block_production_halted".to_string()),
            message: "No new block for 60s".to_string(),
        }
    }

    #[tokio::test]
    async fn test_posts_alert_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(json!({
                "level": "alert",
                "condition": "block_production_halted",
                "message": "No new block for 60s",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sink = WebhookAlertSink::new(format!("{}/hook", server.uri()));
        sink.send(&alert()).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let sink = WebhookAlertSink::new(server.uri());
        let result = sink.send(&alert()).await;
        assert!(matches!(
            result,
            Err(AlertError::WebhookError { status: 503, body }) if body == "maintenance"
        ));
    }
}
