use super::{Category, Draft, EmailTemplate};
use crate::components::{EmailBody, RowStyle, Tone, info_card};
use crate::helpers::{Helpers, escape_html};
use crate::params::EmailParams;

pub(super) const TEMPLATES: &[EmailTemplate] = &[
    EmailTemplate {
        id: "support_request_received_user",
        category: Category::System,
        required_fields: &["to", "name", "support_request_id", "subject"],
        render: request_received,
    },
    EmailTemplate {
        id: "new_support_request_admin",
        category: Category::Admin,
        required_fields: &[
            "to",
            "name",
            "email",
            "userId",
            "support_request_id",
            "subject",
            "message",
        ],
        render: new_request_admin,
    },
];

fn request_received(p: &EmailParams, h: &Helpers) -> Draft {
    let request_id = p.text_or("support_request_id", "N/A");
    let topic = p.text_or("subject", "Votre demande");
    Draft {
        subject: format!("Votre demande de support #{} a bien été reçue", request_id),
        preview_text: format!("Nous avons bien reçu votre demande concernant \"{}\".", topic),
        text: format!(
            "Bonjour {}, nous avons bien reçu votre demande de support #{} concernant \"{}\". Notre équipe vous répondra bientôt.",
            p.text("name"),
            request_id,
            topic
        ),
        body: EmailBody::new("Confirmation de votre demande de support")
            .badge(Tone::Success, "Demande Reçue")
            .lead(format!(
                "Bonjour {}, nous avons bien reçu votre demande. Notre équipe vous répondra dans les plus brefs délais.",
                p.text("name")
            ))
            .card(
                info_card(Tone::Default)
                    .styled("Référence :", format!("#{}", request_id), RowStyle::Strong)
                    .row("Sujet :", topic),
            )
            .action(
                "Voir ma demande",
                h.link(&format!("/support/tickets/{}", escape_html(&p.text("support_request_id")))),
            ),
    }
}

fn new_request_admin(p: &EmailParams, h: &Helpers) -> Draft {
    let request_id = p.text_or("support_request_id", "N/A");
    let who = p
        .str("name")
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| p.text("email"));
    let topic = p.text_or("subject", "N/A");
    Draft {
        subject: format!("[ADMIN] Nouvelle demande de support : #{}", request_id),
        preview_text: format!("De : {} | Sujet : {}", who, topic),
        text: format!(
            "Nouvelle demande de support #{} de {} ({}). Sujet: {}. Message: {}.",
            request_id,
            p.text("name"),
            p.text("email"),
            topic,
            p.text("message")
        ),
        body: EmailBody::new("Nouvelle demande de support reçue")
            .badge(Tone::Info, "Nouvelle Demande")
            .lead("Un utilisateur a ouvert une nouvelle demande de support.")
            .card(
                info_card(Tone::Default)
                    .styled("Référence :", format!("#{}", request_id), RowStyle::Strong)
                    .row(
                        "Utilisateur :",
                        format!("{} ({})", p.text_or("name", "N/A"), p.text_or("email", "N/A")),
                    )
                    .row("ID Utilisateur :", p.text_or("userId", "N/A"))
                    .styled("Sujet :", topic, RowStyle::Strong)
                    .row("Message :", p.text_or("message", "N/A"))
                    .row("Date :", h.date(None)),
            )
            .action(
                "Voir la demande",
                h.link(&format!(
                    "/admin/support/tickets/{}",
                    escape_html(&p.text("support_request_id"))
                )),
            ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::tests::helpers;
    use serde_json::{Value, json};

    #[test]
    fn user_confirmation_quotes_subject() {
        let params = match json!({
            "name": "Awa",
            "support_request_id": 1024,
            "subject": "Retrait bloqué"
        }) {
            Value::Object(map) => EmailParams::new(map),
            _ => unreachable!(),
        };
        let draft = request_received(&params, &helpers());
        assert_eq!(draft.subject, "Votre demande de support #1024 a bien été reçue");
        assert_eq!(
            draft.preview_text,
            "Nous avons bien reçu votre demande concernant \"Retrait bloqué\"."
        );
        assert_eq!(draft.body.actions[0].href, "https://nguma.org/support/tickets/1024");
    }
}
