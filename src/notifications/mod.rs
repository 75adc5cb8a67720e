//! Best-effort alert delivery to email/SMS webhook gateways.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumIter, EnumString};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::alerts::{Alert, RelatedEntities, Severity};
use crate::config::NotificationConfig;
use crate::errors::ServiceError;

pub const SIGNATURE_HEADER: &str = "X-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Timestamp";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

/// JSON body posted to every channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEnvelope {
    pub channel: Channel,
    pub id: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub triggered_at: DateTime<Utc>,
    pub related: RelatedEntities,
}

impl AlertEnvelope {
    pub fn new(channel: Channel, alert: &Alert) -> Self {
        Self {
            channel,
            id: alert.id.clone(),
            title: alert.title.clone(),
            message: alert.message.clone(),
            severity: alert.severity,
            triggered_at: alert.triggered_at,
            related: alert.related.clone(),
        }
    }
}

/// Sink for raised and escalated alerts.
///
/// Implementations must not fail the caller: delivery problems are logged
/// and dropped.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alerts: &[Alert]);
}

/// HMAC signature generator for webhook authentication
pub struct SignatureGenerator {
    secret: String,
}

impl SignatureGenerator {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Hex HMAC-SHA256 over `"{timestamp}.{body}"`
    pub fn sign_payload(&self, timestamp: &str, body: &str) -> Result<String, ServiceError> {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        type HmacSha256 = Hmac<Sha256>;

        let signed_payload = format!("{}.{}", timestamp, body);
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| ServiceError::InternalError(format!("invalid webhook key: {e}")))?;
        mac.update(signed_payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Posts each alert to every configured channel, one spawned task per delivery.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoints: Vec<(Channel, String)>,
    signature_generator: Option<Arc<SignatureGenerator>>,
    min_severity: Severity,
}

impl WebhookNotifier {
    pub fn from_config(config: &NotificationConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let endpoints = [
            (Channel::Email, config.email_webhook_url.as_ref()),
            (Channel::Sms, config.sms_webhook_url.as_ref()),
        ]
        .into_iter()
        .filter_map(|(channel, url)| url.map(|u| (channel, u.clone())))
        .collect();

        Ok(Self {
            client,
            endpoints,
            signature_generator: config
                .webhook_secret
                .clone()
                .map(|secret| Arc::new(SignatureGenerator::new(secret))),
            min_severity: config.min_severity,
        })
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.endpoints.iter().map(|(c, _)| *c).collect()
    }

    /// Single POST, no retry. Returns the error so the spawned task can log it.
    #[instrument(skip(self, envelope), fields(alert_id = %envelope.id, channel = %envelope.channel))]
    pub async fn deliver(&self, url: &str, envelope: &AlertEnvelope) -> Result<(), ServiceError> {
        let body = serde_json::to_string(envelope)?;
        let timestamp = Utc::now().to_rfc3339();

        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header(TIMESTAMP_HEADER, &timestamp);

        if let Some(gen) = &self.signature_generator {
            request = request.header(SIGNATURE_HEADER, gen.sign_payload(&timestamp, &body)?);
        }

        let response = request.body(body).send().await?;
        if response.status().is_success() {
            info!("alert notification delivered");
            Ok(())
        } else {
            Err(ServiceError::ExternalServiceError(format!(
                "webhook returned {}",
                response.status()
            )))
        }
    }

    /// Fire-and-forget delivery; the returned handles are only awaited in tests.
    pub fn dispatch(&self, alerts: &[Alert]) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();
        for alert in alerts.iter().filter(|a| a.severity >= self.min_severity) {
            for (channel, url) in &self.endpoints {
                let notifier = self.clone();
                let url = url.clone();
                let envelope = AlertEnvelope::new(*channel, alert);
                handles.push(tokio::spawn(async move {
                    if let Err(e) = notifier.deliver(&url, &envelope).await {
                        warn!(
                            alert_id = %envelope.id,
                            channel = %envelope.channel,
                            error = %e,
                            "alert notification failed"
                        );
                    }
                }));
            }
        }
        if handles.is_empty() && !alerts.is_empty() {
            debug!(count = alerts.len(), "no notification channel selected these alerts");
        }
        handles
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, alerts: &[Alert]) {
        self.dispatch(alerts);
    }
}

/// Drops everything; used when no channel is configured.
#[derive(Debug, Default, Clone)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, alerts: &[Alert]) {
        if !alerts.is_empty() {
            debug!(count = alerts.len(), "notifications disabled");
        }
    }
}

/// Keeps every dispatched alert in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Alert>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Alert> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, alerts: &[Alert]) {
        self.sent.lock().await.extend_from_slice(alerts);
    }
}

/// Webhook notifier when any channel is configured, otherwise a no-op.
pub fn build_notifier(config: &NotificationConfig) -> Result<Arc<dyn Notifier>, ServiceError> {
    let webhook = WebhookNotifier::from_config(config)?;
    if webhook.endpoints.is_empty() {
        info!("no notification webhooks configured");
        Ok(Arc::new(NoopNotifier))
    } else {
        info!(channels = ?webhook.channels(), "alert notifications enabled");
        Ok(Arc::new(webhook))
    }
}
