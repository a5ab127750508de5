//! Forwards one in-app notification to the recipient's inbox, styled by its
//! type and priority.

use reqwest::Url;

use crate::components::{Badge, EmailBody, Tone, info_card};
use crate::templates::Draft;

pub const NOTIFICATION_SUBJECT: &str = "Nouvelle notification de Nguma";

/// The notification fields that shape the email.
#[derive(Debug, Clone, Default)]
pub struct NotificationEmail {
    pub message: String,
    pub link_to: Option<String>,
    pub kind: Option<String>,
    pub priority: Option<String>,
}

fn icon(kind: Option<&str>) -> &'static str {
    match kind {
        Some("transaction") => "💰",
        Some("profit") => "📈",
        Some("contract") => "📄",
        Some("admin") => "⚙️",
        _ => "🔔",
    }
}

fn priority_color(priority: Option<&str>) -> &'static str {
    match priority {
        Some("urgent") => "#EF4444",
        Some("high") => "#F59E0B",
        Some("low") => "#6B7280",
        _ => "#3B82F6",
    }
}

/// Only urgent and high priorities carry a badge.
fn priority_badge(priority: Option<&str>) -> Option<Badge> {
    let (label, tone) = match priority {
        Some("urgent") => ("URGENT", Tone::Error),
        Some("high") => ("IMPORTANT", Tone::Warning),
        _ => return None,
    };
    Some(Badge {
        label: label.to_string(),
        tone,
        background: priority_color(priority),
        color: "#ffffff",
    })
}

/// Relative links resolve against the site; absolute links are kept.
pub fn resolve_link(site_url: &str, link: &str) -> Option<String> {
    let base = Url::parse(&format!("{}/", site_url.trim_end_matches('/'))).ok()?;
    base.join(link).ok().map(String::from)
}

impl NotificationEmail {
    pub(crate) fn draft(&self, site_url: &str) -> Draft {
        let kind = self.kind.as_deref();
        let priority = self.priority.as_deref();
        let link = self
            .link_to
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .and_then(|l| resolve_link(site_url, l));

        let mut card = info_card(Tone::Default).note(self.message.clone());
        card.border = priority_color(priority);

        let mut body = EmailBody::new(format!("{} Nouvelle notification", icon(kind))).card(card);
        body.badge = priority_badge(priority);
        if let Some(href) = &link {
            body = body.action("Voir les détails", href.clone());
        }

        let text = match &link {
            Some(href) => format!("{}\n\nVoir les détails : {}", self.message, href),
            None => self.message.clone(),
        };

        Draft {
            subject: NOTIFICATION_SUBJECT.to_string(),
            preview_text: self.message.clone(),
            text,
            body,
        }
    }
}
