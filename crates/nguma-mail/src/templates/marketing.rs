use super::{Category, Draft, EmailTemplate, money};
use crate::components::{EmailBody, RowStyle, Tone, info_card};
use crate::helpers::{Helpers, support_html};
use crate::params::EmailParams;

pub(super) const TEMPLATES: &[EmailTemplate] = &[
    EmailTemplate {
        id: "welcome_new_user",
        category: Category::Marketing,
        required_fields: &["to", "name"],
        render: welcome,
    },
    EmailTemplate {
        id: "dormant_funds_reminder",
        category: Category::Marketing,
        required_fields: &["to", "name", "amount"],
        render: dormant_funds,
    },
    EmailTemplate {
        id: "notification_preferences_updated",
        category: Category::Marketing,
        required_fields: &["to", "name"],
        render: preferences_updated,
    },
    EmailTemplate {
        id: "deposit_availability_reminder",
        category: Category::Marketing,
        required_fields: &["to", "name"],
        render: deposits_open,
    },
    EmailTemplate {
        id: "test_mail_tester",
        category: Category::System,
        required_fields: &["to", "name"],
        render: deliverability_test,
    },
];

fn welcome(p: &EmailParams, h: &Helpers) -> Draft {
    let name = p.text("name");
    Draft {
        subject: "Bienvenue chez Nguma !".into(),
        preview_text: "Votre aventure d'investissement commence maintenant.".into(),
        text: format!(
            "Bienvenue, {} ! Votre compte a été créé. Accédez à votre tableau de bord: {}",
            name,
            h.link("/dashboard")
        ),
        body: EmailBody::new(format!("Bienvenue, {} !", name))
            .lead("Nous sommes ravis de vous compter parmi nous. Votre compte a été créé avec succès.")
            .paragraph("Nguma est votre partenaire de confiance pour faire fructifier votre capital en toute sérénité. Voici quelques étapes pour bien commencer :")
            .linked_bullet(
                "Complétez votre profil",
                h.link("/profile"),
                "pour une expérience personnalisée.",
            )
            .linked_bullet(
                "Découvrez notre fonctionnement",
                h.link("/how-it-works"),
                "et nos stratégies d'investissement.",
            )
            .bullet("Effectuez votre premier dépôt et commencez à investir.")
            .action("Accéder à mon tableau de bord", h.link("/dashboard")),
    }
}

fn dormant_funds(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    Draft {
        subject: "Votre capital dort... réveillez-le !".into(),
        preview_text: format!("Vous avez {} prêts à être investis.", amount),
        text: format!(
            "Bonjour {}, vous avez des fonds disponibles ({}) sur votre compte Nguma.",
            p.text("name"),
            amount
        ),
        body: EmailBody::new("Votre argent n'attend que vous")
            .badge(Tone::Info, "Opportunité")
            .lead(format!(
                "Bonjour {}, des fonds disponibles sur votre compte pourraient déjà travailler pour vous.",
                p.text("name")
            ))
            .card(
                info_card(Tone::Default)
                    .styled("Solde disponible :", amount, RowStyle::AmountHighlight)
                    .row("Rendement estimé :", "15% / mois"),
            )
            .action("Créer un contrat maintenant", h.link("/contracts"))
            .support(support_html(p.str("support_phone").as_deref())),
    }
}

fn preferences_updated(p: &EmailParams, h: &Helpers) -> Draft {
    let date = h.date(p.str("date").as_deref());
    Draft {
        subject: "Confirmation : Vos préférences de notification ont été mises à jour".into(),
        preview_text: "Vos préférences pour les notifications par e-mail ont été modifiées."
            .into(),
        text: format!(
            "Bonjour {}, vos préférences de notification pour votre compte Nguma ont été mises à jour le {}.",
            p.text("name"),
            date
        ),
        body: EmailBody::new("Mise à jour de vos préférences de notification")
            .badge(Tone::Info, "Préférences Mises à Jour")
            .lead(format!(
                "Bonjour {}, vos choix de notifications par e-mail ont bien été enregistrés.",
                p.text("name")
            ))
            .card(info_card(Tone::Default).row("Date et heure :", date))
            .action("Gérer mes préférences", h.link("/settings/notifications")),
    }
}

fn deposits_open(p: &EmailParams, h: &Helpers) -> Draft {
    Draft {
        subject: "🔔 Les dépôts sont de nouveau ouverts !".into(),
        preview_text: "Vous pouvez maintenant effectuer un nouveau dépôt sur votre compte Nguma."
            .into(),
        text: format!(
            "Bonjour {}, les dépôts sont de nouveau ouverts. Vous pouvez vous connecter à votre tableau de bord pour effectuer un dépôt.",
            p.text("name")
        ),
        body: EmailBody::new("Bonne nouvelle !")
            .badge(Tone::Info, "Dépôts Ouverts")
            .lead(format!(
                "Bonjour {}, les dépôts sont de nouveau ouverts sur Nguma.",
                p.text("name")
            ))
            .action("Effectuer un dépôt", h.link("/dashboard")),
    }
}

fn deliverability_test(p: &EmailParams, _h: &Helpers) -> Draft {
    Draft {
        subject: "Email de Test pour Nguma".into(),
        preview_text: "Ceci est un test de délivrabilité.".into(),
        text: format!(
            "Bonjour {}, ceci est un e-mail de test envoyé depuis le système Nguma pour vérifier la configuration de l'envoi.",
            p.text("name")
        ),
        body: EmailBody::new("Vérification du système d'envoi")
            .badge(Tone::Info, "Test Technique")
            .lead("Cet e-mail a été envoyé pour vérifier la configuration du serveur (SPF, DKIM, DMARC) et la qualité du template HTML.")
            .card(
                info_card(Tone::Default)
                    .note("Si vous recevez cet e-mail, la partie \"envoi\" fonctionne correctement.")
                    .note("Merci de vérifier le score sur mail-tester.com."),
            ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::tests::helpers;
    use serde_json::{Value, json};

    #[test]
    fn welcome_greets_by_name() {
        let params = match json!({ "name": "Awa" }) {
            Value::Object(map) => EmailParams::new(map),
            _ => unreachable!(),
        };
        let draft = welcome(&params, &helpers());
        assert_eq!(draft.body.heading, "Bienvenue, Awa !");
        assert_eq!(draft.body.bullets.len(), 3);
        assert!(draft.text.ends_with("https://nguma.org/dashboard"));
    }
}
