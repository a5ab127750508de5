use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::error::MailError;
use crate::helpers::Helpers;
use crate::layout::Renderer;
use crate::notification::NotificationEmail;
use crate::params::EmailParams;
use crate::resend::{MailTransport, OutgoingEmail, Tag};
use crate::templates::{self, EmailTemplate};

/// Category tag on forwarded notifications.
pub const NOTIFICATION_CATEGORY: &str = "notification";

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub site_url: String,
    /// Sender domain, e.g. `updates.nguma.org`.
    pub from_domain: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedEmail {
    pub subject: String,
    pub preview_text: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub id: String,
    pub template_id: String,
}

pub struct Mailer {
    renderer: Renderer,
    transport: Arc<dyn MailTransport>,
    settings: MailSettings,
}

impl Mailer {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        settings: MailSettings,
    ) -> Result<Self, MailError> {
        Ok(Self {
            renderer: Renderer::new()?,
            transport,
            settings,
        })
    }

    /// Look up `template_id`, check its required fields and render it.
    pub fn prepare(
        &self,
        template_id: &str,
        params: &EmailParams,
    ) -> Result<(&'static EmailTemplate, RenderedEmail), MailError> {
        let template = templates::find(template_id)
            .ok_or_else(|| MailError::UnknownTemplate(template_id.to_string()))?;

        let missing = template.missing_fields(params);
        if !missing.is_empty() {
            return Err(MailError::MissingFields {
                template_id: template_id.to_string(),
                fields: missing,
            });
        }

        let helpers = Helpers::new(&self.settings.site_url);
        let draft = (template.render)(params, &helpers);
        let html = self
            .renderer
            .render(&draft.body, &draft.preview_text, &helpers.site_url)?;

        Ok((
            template,
            RenderedEmail {
                subject: draft.subject,
                preview_text: draft.preview_text,
                text: draft.text,
                html,
            },
        ))
    }

    /// Send a relay payload: `template_id`, `to` and the template's fields
    /// at the top level.
    pub async fn send(&self, payload: Map<String, Value>) -> Result<SentEmail, MailError> {
        let template_id = payload
            .get("template_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or(MailError::MissingRecipient)?
            .to_string();

        let params = EmailParams::new(payload);
        let to = params
            .str("to")
            .filter(|to| !to.trim().is_empty())
            .ok_or(MailError::MissingRecipient)?;

        let (template, rendered) = self.prepare(&template_id, &params)?;
        let email = self.envelope(template.id, to, rendered);
        let id = self.transport.send(&email).await?;

        info!(
            "Sent {} email via {} (id {})",
            template_id,
            self.transport.name(),
            id
        );
        Ok(SentEmail { id, template_id })
    }

    /// Send with the recipient and template given separately, as queued jobs
    /// store them.
    pub async fn send_template(
        &self,
        template_id: &str,
        to: &str,
        mut params: Map<String, Value>,
    ) -> Result<SentEmail, MailError> {
        params.insert("template_id".into(), Value::from(template_id));
        params.insert("to".into(), Value::from(to));
        self.send(params).await
    }

    /// Email a single in-app notification to `to`.
    pub async fn send_notification(
        &self,
        to: &str,
        notification: &NotificationEmail,
    ) -> Result<SentEmail, MailError> {
        if to.trim().is_empty() {
            return Err(MailError::MissingRecipient);
        }

        let draft = notification.draft(&self.settings.site_url);
        let site_url = self.settings.site_url.trim_end_matches('/');
        let html = self
            .renderer
            .render(&draft.body, &draft.preview_text, site_url)?;
        let rendered = RenderedEmail {
            subject: draft.subject,
            preview_text: draft.preview_text,
            text: draft.text,
            html,
        };

        let email = self.envelope(NOTIFICATION_CATEGORY, to.to_string(), rendered);
        let id = self.transport.send(&email).await?;
        info!("Sent notification email via {} (id {})", self.transport.name(), id);
        Ok(SentEmail {
            id,
            template_id: NOTIFICATION_CATEGORY.to_string(),
        })
    }

    fn envelope(&self, category: &str, to: String, rendered: RenderedEmail) -> OutgoingEmail {
        let domain = &self.settings.from_domain;
        let site_url = self.settings.site_url.trim_end_matches('/');

        let headers = BTreeMap::from([
            (
                "List-Unsubscribe".to_string(),
                format!("<{}/settings/notifications>", site_url),
            ),
            ("X-Entity-Ref-ID".to_string(), Uuid::new_v4().to_string()),
        ]);

        OutgoingEmail {
            from: format!("Nguma <notifications@{}>", domain),
            to: vec![to],
            reply_to: format!("support@{}", domain),
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
            tags: vec![
                Tag {
                    name: "category".into(),
                    value: category.to_string(),
                },
                Tag {
                    name: "app".into(),
                    value: "nguma".into(),
                },
            ],
            headers,
        }
    }
}
