use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::info;

use fuelbid_core::config::{NotifierConfig, NotifierMode};

use crate::message::{AwardMessage, RenderError};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook endpoint rejected the notice: status {0}")]
    Rejected(u16),
    #[error("notifier misconfigured: {0}")]
    Config(String),
}

#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    async fn deliver(&self, message: &AwardMessage) -> Result<(), NotifyError>;
}

/// Builds the transport the configuration asks for. Webhook mode without an
/// endpoint is a configuration error, not a silent noop.
pub fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config.mode {
        NotifierMode::Noop => Ok(Arc::new(NoopNotifier)),
        NotifierMode::Webhook => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                NotifyError::Config("webhook mode requires notifier.endpoint".to_string())
            })?;
            let notifier = WebhookNotifier::new(
                endpoint,
                config.auth_token.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(notifier))
        }
    }
}

/// Logs the notice instead of sending it. Default transport for local runs
/// and test environments without a webhook endpoint.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn deliver(&self, message: &AwardMessage) -> Result<(), NotifyError> {
        info!(
            subject = %message.subject,
            payload_hash = %message.payload_hash,
            "award notice suppressed by noop notifier"
        );
        Ok(())
    }
}

#[derive(Debug)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
    auth_token: Option<SecretString>,
}

impl WebhookNotifier {
    /// The client timeout bounds the whole send. A slow endpoint fails the
    /// single delivery attempt instead of stalling the selection response.
    pub fn new(
        endpoint: impl Into<String>,
        auth_token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint: endpoint.into(), auth_token })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, message: &AwardMessage) -> Result<(), NotifyError> {
        let envelope = serde_json::json!({
            "subject": message.subject,
            "body": message.body,
            "payload_hash": message.payload_hash,
            "payload": message.payload,
        });

        let mut request = self.client.post(&self.endpoint).json(&envelope);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}
