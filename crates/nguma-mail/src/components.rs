//! Structured email body. Templates describe *what* goes in the message;
//! `html/body.html` decides how it is laid out.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Default,
    Success,
    Error,
    Info,
    Warning,
}

impl Tone {
    /// (background, text) colours for a status badge.
    fn badge_colors(self) -> (&'static str, &'static str) {
        match self {
            Tone::Success => ("#D1FAE5", "#065F46"),
            Tone::Error => ("#FEE2E2", "#991B1B"),
            Tone::Warning => ("#FEF3C7", "#92400E"),
            Tone::Info | Tone::Default => ("#DBEAFE", "#1E40AF"),
        }
    }

    /// (background, border) colours for an info card.
    fn card_colors(self) -> (&'static str, &'static str) {
        match self {
            Tone::Default => ("#F8FAFC", "#E2E8F0"),
            Tone::Success => ("#F0FDF4", "#BBF7D0"),
            Tone::Error => ("#FEF2F2", "#FECACA"),
            Tone::Info => ("#DBEAFE", "#BFDBFE"),
            Tone::Warning => ("#FFFBEB", "#FDE68A"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Badge {
    pub label: String,
    pub tone: Tone,
    pub background: &'static str,
    pub color: &'static str,
}

pub fn status_badge(tone: Tone, label: &str) -> Badge {
    let (background, color) = tone.badge_colors();
    Badge {
        label: label.to_string(),
        tone,
        background,
        color,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    Plain,
    Strong,
    Code,
    AmountSuccess,
    AmountHighlight,
    Rejection,
}

#[derive(Debug, Clone, Serialize)]
pub struct Row {
    pub label: String,
    pub value: String,
    pub class: Option<&'static str>,
    pub strong: bool,
    pub code: bool,
}

impl Row {
    fn new(label: &str, value: String, style: RowStyle) -> Self {
        let class = match style {
            RowStyle::AmountSuccess => Some("amount-success"),
            RowStyle::AmountHighlight => Some("amount-highlight"),
            RowStyle::Rejection => Some("rejection-reason"),
            _ => None,
        };
        Self {
            label: label.to_string(),
            value,
            class,
            strong: style == RowStyle::Strong,
            code: style == RowStyle::Code,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoCard {
    pub tone: Tone,
    pub background: &'static str,
    pub border: &'static str,
    pub title: Option<String>,
    pub rows: Vec<Row>,
    pub notes: Vec<String>,
}

pub fn info_card(tone: Tone) -> InfoCard {
    let (background, border) = tone.card_colors();
    InfoCard {
        tone,
        background,
        border,
        title: None,
        rows: Vec::new(),
        notes: Vec::new(),
    }
}

impl InfoCard {
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn row(self, label: &str, value: impl Into<String>) -> Self {
        self.styled(label, value, RowStyle::Plain)
    }

    pub fn styled(mut self, label: &str, value: impl Into<String>, style: RowStyle) -> Self {
        self.rows.push(Row::new(label, value.into(), style));
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Link {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Bullet {
    pub link: Option<Link>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Action {
    pub label: String,
    pub href: String,
    pub secondary: bool,
}

/// Everything between the layout header and footer.
///
/// Text fields are escaped when rendered. Link targets, `extra_html` and
/// `support_html` are inserted verbatim and must be built from escaped values.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmailBody {
    pub badge: Option<Badge>,
    pub heading: String,
    pub lead: Vec<String>,
    pub cards: Vec<InfoCard>,
    pub extra_html: Vec<String>,
    pub paragraphs: Vec<String>,
    pub bullets: Vec<Bullet>,
    pub actions: Vec<Action>,
    pub support_html: String,
}

impl EmailBody {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            ..Default::default()
        }
    }

    pub fn badge(mut self, tone: Tone, label: &str) -> Self {
        self.badge = Some(status_badge(tone, label));
        self
    }

    pub fn lead(mut self, text: impl Into<String>) -> Self {
        self.lead.push(text.into());
        self
    }

    pub fn card(mut self, card: InfoCard) -> Self {
        self.cards.push(card);
        self
    }

    pub fn html(mut self, html: String) -> Self {
        self.extra_html.push(html);
        self
    }

    pub fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.paragraphs.push(text.into());
        self
    }

    pub fn bullet(mut self, text: impl Into<String>) -> Self {
        self.bullets.push(Bullet {
            link: None,
            text: text.into(),
        });
        self
    }

    pub fn linked_bullet(mut self, label: &str, href: String, text: impl Into<String>) -> Self {
        self.bullets.push(Bullet {
            link: Some(Link {
                label: label.to_string(),
                href,
            }),
            text: text.into(),
        });
        self
    }

    pub fn action(mut self, label: &str, href: String) -> Self {
        self.actions.push(Action {
            label: label.to_string(),
            href,
            secondary: false,
        });
        self
    }

    pub fn secondary_action(mut self, label: &str, href: String) -> Self {
        self.actions.push(Action {
            label: label.to_string(),
            href,
            secondary: true,
        });
        self
    }

    pub fn support(mut self, html: String) -> Self {
        self.support_html = html;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_styles_map_to_classes() {
        let card = info_card(Tone::Success)
            .styled("Montant :", "100,00 $", RowStyle::AmountSuccess)
            .styled("Réf :", "TX-1", RowStyle::Code)
            .row("Statut :", "Envoyé");

        assert_eq!(card.background, "#F0FDF4");
        assert_eq!(card.rows[0].class, Some("amount-success"));
        assert!(card.rows[1].code && !card.rows[1].strong);
        assert_eq!(card.rows[2].class, None);
    }

    #[test]
    fn badge_picks_palette() {
        let badge = status_badge(Tone::Error, "Transfert annulé");
        assert_eq!(badge.background, "#FEE2E2");
        assert_eq!(badge.color, "#991B1B");
        let value = serde_json::to_value(&badge).unwrap();
        assert_eq!(value["tone"], "error");
    }
}
