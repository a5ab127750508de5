//! Resend delivery (`POST /emails`).

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MailError;

pub const DEFAULT_BASE_URL: &str = "https://api.resend.com";

#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

/// A fully addressed message, serialized as the Resend request body.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub tags: Vec<Tag>,
    pub headers: BTreeMap<String, String>,
}

/// Delivers one message and returns the provider's message id.
pub trait MailTransport: Send + Sync {
    fn name(&self) -> &str;

    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> BoxFuture<'a, Result<String, MailError>>;
}

pub struct ResendTransport {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl ResendTransport {
    pub fn new(api_key: SecretString) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn deliver(&self, email: &OutgoingEmail) -> Result<String, MailError> {
        let resp = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(email)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!("Resend rejected email with {}", status);
            return Err(MailError::Provider(provider_message(status.as_u16(), &body)));
        }

        let accepted: SendResponse = serde_json::from_str(&body)
            .map_err(|e| MailError::Provider(format!("unexpected response: {}", e)))?;
        debug!("Resend accepted email {}", accepted.id);
        Ok(accepted.id)
    }
}

impl MailTransport for ResendTransport {
    fn name(&self) -> &str {
        "resend"
    }

    fn send<'a>(&'a self, email: &'a OutgoingEmail) -> BoxFuture<'a, Result<String, MailError>> {
        Box::pin(self.deliver(email))
    }
}

/// Stands in when no API key is configured. Every send fails with a
/// configuration error instead of reaching the network.
pub struct UnconfiguredTransport;

impl MailTransport for UnconfiguredTransport {
    fn name(&self) -> &str {
        "unconfigured"
    }

    fn send<'a>(&'a self, _email: &'a OutgoingEmail) -> BoxFuture<'a, Result<String, MailError>> {
        Box::pin(async { Err(MailError::NotConfigured) })
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

fn provider_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => err.message,
        Err(_) if body.trim().is_empty() => format!("provider returned {}", status),
        Err(_) => format!("provider returned {}: {}", status, body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_matches_resend_shape() {
        let email = OutgoingEmail {
            from: "Nguma <notifications@nguma.org>".into(),
            to: vec!["awa@example.com".into()],
            reply_to: "support@nguma.org".into(),
            subject: "Code de vérification".into(),
            html: "<p>x</p>".into(),
            text: "x".into(),
            tags: vec![Tag {
                name: "category".into(),
                value: "withdrawal_otp".into(),
            }],
            headers: BTreeMap::from([("X-Entity-Ref-ID".to_string(), "abc".to_string())]),
        };
        let value = serde_json::to_value(&email).unwrap();
        assert_eq!(value["to"][0], "awa@example.com");
        assert_eq!(value["reply_to"], "support@nguma.org");
        assert_eq!(value["tags"][0]["name"], "category");
        assert_eq!(value["headers"]["X-Entity-Ref-ID"], "abc");
    }

    #[test]
    fn provider_errors_prefer_message_field() {
        assert_eq!(
            provider_message(
                422,
                r#"{"statusCode":422,"message":"Invalid `to` field","name":"validation_error"}"#
            ),
            "Invalid `to` field"
        );
        assert_eq!(provider_message(503, ""), "provider returned 503");
        assert_eq!(provider_message(500, "boom"), "provider returned 500: boom");
    }

    #[tokio::test]
    async fn unconfigured_transport_refuses() {
        let email = OutgoingEmail {
            from: String::new(),
            to: vec![],
            reply_to: String::new(),
            subject: String::new(),
            html: String::new(),
            text: String::new(),
            tags: vec![],
            headers: BTreeMap::new(),
        };
        assert!(matches!(
            UnconfiguredTransport.send(&email).await,
            Err(MailError::NotConfigured)
        ));
    }
}
