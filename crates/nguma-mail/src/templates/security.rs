use super::{Category, Draft, EmailTemplate, money};
use crate::components::{EmailBody, RowStyle, Tone, info_card};
use crate::helpers::{Helpers, escape_html};
use crate::params::EmailParams;

pub(super) const TEMPLATES: &[EmailTemplate] = &[
    EmailTemplate {
        id: "withdrawal_otp",
        category: Category::Security,
        required_fields: &["to", "name", "amount", "otp_code"],
        render: withdrawal_otp,
    },
    EmailTemplate {
        id: "password_changed",
        category: Category::Security,
        required_fields: &["to", "name"],
        render: password_changed,
    },
    EmailTemplate {
        id: "email_changed_old_address",
        category: Category::Security,
        required_fields: &["to", "name", "old_email", "new_email"],
        render: email_changed_old_address,
    },
    EmailTemplate {
        id: "email_changed_new_address",
        category: Category::Security,
        required_fields: &["to", "name", "new_email"],
        render: email_changed_new_address,
    },
    EmailTemplate {
        id: "2fa_setup_confirmed",
        category: Category::Security,
        required_fields: &["to", "name"],
        render: two_factor_enabled,
    },
    EmailTemplate {
        id: "2fa_disabled_confirmed",
        category: Category::Security,
        required_fields: &["to", "name"],
        render: two_factor_disabled,
    },
    EmailTemplate {
        id: "security_alert",
        category: Category::Security,
        required_fields: &["to", "name", "activityType", "ipAddress"],
        render: security_alert,
    },
    EmailTemplate {
        id: "backup_codes_generated",
        category: Category::Security,
        required_fields: &["to", "name"],
        render: backup_codes_generated,
    },
    EmailTemplate {
        id: "profile_updated_by_user",
        category: Category::Security,
        required_fields: &["to", "name"],
        render: profile_updated_by_user,
    },
    EmailTemplate {
        id: "profile_updated_by_admin",
        category: Category::Security,
        required_fields: &["to", "name"],
        render: profile_updated_by_admin,
    },
];

const NOT_YOU: &str =
    "Si vous n'êtes pas à l'origine de ce changement, contactez immédiatement le support.";

fn otp_box(code: &str) -> String {
    format!(
        concat!(
            r#"<div style="background: white; border: 2px solid #667eea; border-radius: 12px; padding: 20px; text-align: center; margin: 30px 0;">"#,
            r#"<span style="display:block; font-size: 14px; color: #666; margin-bottom: 8px;">Code de validation</span>"#,
            r#"<span style="display:block; font-size: 32px; color: #1F2937; letter-spacing: 8px; font-weight: 700; font-family: monospace;">{}</span>"#,
            "</div>"
        ),
        escape_html(code)
    )
}

fn withdrawal_otp(p: &EmailParams, _h: &Helpers) -> Draft {
    let code = p.text("otp_code");
    Draft {
        subject: "Code de vérification".into(),
        preview_text: format!("Votre code de sécurité est {}.", code),
        text: format!("Votre code est {}.", code),
        body: EmailBody::new("Vérification d'identité")
            .badge(Tone::Info, "Sécurité")
            .lead(format!(
                "Vous avez initié un retrait de {}. Utilisez ce code unique pour valider l'opération.",
                money(p, "amount")
            ))
            .html(otp_box(&code))
            .paragraph("Si vous n'êtes pas à l'origine de cette demande, changez immédiatement votre mot de passe."),
    }
}

fn password_changed(p: &EmailParams, h: &Helpers) -> Draft {
    let date = h.date(p.str("date").as_deref());
    Draft {
        subject: "Votre mot de passe a été modifié".into(),
        preview_text: "La modification de votre mot de passe a été enregistrée avec succès."
            .into(),
        text: format!(
            "Bonjour {}, votre mot de passe a été modifié le {}. {}",
            p.text("name"),
            date,
            NOT_YOU
        ),
        body: EmailBody::new("Modification de votre mot de passe")
            .badge(Tone::Info, "Mot de passe modifié")
            .lead(format!(
                "Bonjour {}, le mot de passe de votre compte Nguma vient d'être modifié.",
                p.text("name")
            ))
            .card(info_card(Tone::Default).row("Date et heure :", date))
            .paragraph(NOT_YOU)
            .action("Contacter le support", h.link("/support")),
    }
}

fn email_changed_old_address(p: &EmailParams, h: &Helpers) -> Draft {
    let date = h.date(p.str("date").as_deref());
    let old_email = p.text_or("old_email", "N/A");
    let new_email = p.text_or("new_email", "N/A");
    Draft {
        subject: "Alerte de sécurité : Votre adresse e-mail a été modifiée".into(),
        preview_text: format!(
            "L'adresse e-mail associée à votre compte a été modifiée de {} à {}.",
            old_email, new_email
        ),
        text: format!(
            "Bonjour {}, l'adresse e-mail de votre compte Nguma a été modifiée de {} à {} le {}. {}",
            p.text("name"),
            old_email,
            new_email,
            date,
            NOT_YOU
        ),
        body: EmailBody::new("Modification de votre adresse e-mail")
            .badge(Tone::Error, "Alerte de Sécurité")
            .lead(format!(
                "Bonjour {}, l'adresse e-mail de votre compte Nguma a été modifiée.",
                p.text("name")
            ))
            .card(
                info_card(Tone::Error)
                    .styled("Ancienne adresse :", old_email, RowStyle::Strong)
                    .styled("Nouvelle adresse :", new_email, RowStyle::Strong)
                    .row("Date et heure :", date),
            )
            .paragraph(NOT_YOU)
            .action("Contacter le support", h.link("/support")),
    }
}

fn email_changed_new_address(p: &EmailParams, h: &Helpers) -> Draft {
    let date = h.date(p.str("date").as_deref());
    let new_email = p.text_or("new_email", "N/A");
    Draft {
        subject: "Confirmation : Votre adresse e-mail a été mise à jour".into(),
        preview_text: format!(
            "Votre nouvelle adresse e-mail, {}, a été vérifiée et associée à votre compte.",
            new_email
        ),
        text: format!(
            "Bonjour {}, votre adresse e-mail de compte Nguma a été mise à jour à {} le {}.",
            p.text("name"),
            new_email,
            date
        ),
        body: EmailBody::new("Confirmation de modification d'adresse e-mail")
            .badge(Tone::Success, "Adresse e-mail mise à jour")
            .lead(format!(
                "Bonjour {}, cette adresse est désormais celle de votre compte Nguma.",
                p.text("name")
            ))
            .card(
                info_card(Tone::Success)
                    .styled("Nouvelle adresse :", new_email, RowStyle::Strong)
                    .row("Date et heure :", date),
            )
            .action("Accéder à mon compte", h.link("/dashboard")),
    }
}

fn two_factor_enabled(p: &EmailParams, h: &Helpers) -> Draft {
    let date = h.date(p.str("date").as_deref());
    Draft {
        subject: "Confirmation : L'authentification à deux facteurs est activée".into(),
        preview_text: "L'authentification à deux facteurs (2FA) a été activée sur votre compte Nguma."
            .into(),
        text: format!(
            "Bonjour {}, l'authentification à deux facteurs (2FA) a été activée sur votre compte Nguma le {}.",
            p.text("name"),
            date
        ),
        body: EmailBody::new("Authentification à deux facteurs (2FA) activée")
            .badge(Tone::Success, "2FA Activée")
            .lead(format!(
                "Bonjour {}, votre compte est maintenant protégé par une seconde étape de vérification.",
                p.text("name")
            ))
            .card(
                info_card(Tone::Success)
                    .styled("Statut :", "Activée", RowStyle::Strong)
                    .row("Date et heure :", date),
            )
            .action("Gérer ma sécurité", h.link("/settings")),
    }
}

fn two_factor_disabled(p: &EmailParams, h: &Helpers) -> Draft {
    let date = h.date(p.str("date").as_deref());
    Draft {
        subject: "Alerte de sécurité : L'authentification à deux facteurs est désactivée"
            .into(),
        preview_text:
            "L'authentification à deux facteurs (2FA) a été désactivée sur votre compte Nguma."
                .into(),
        text: format!(
            "Bonjour {}, l'authentification à deux facteurs (2FA) a été désactivée sur votre compte Nguma le {}. {}",
            p.text("name"),
            date,
            NOT_YOU
        ),
        body: EmailBody::new("Authentification à deux facteurs (2FA) désactivée")
            .badge(Tone::Error, "2FA Désactivée")
            .lead(format!(
                "Bonjour {}, la seconde étape de vérification a été retirée de votre compte.",
                p.text("name")
            ))
            .card(
                info_card(Tone::Error)
                    .styled("Statut :", "Désactivée", RowStyle::Strong)
                    .row("Date et heure :", date),
            )
            .paragraph(NOT_YOU)
            .action("Contacter le support", h.link("/support")),
    }
}

fn security_alert(p: &EmailParams, h: &Helpers) -> Draft {
    let date = h.date(p.str("date").as_deref());
    let activity = p.text_or("activityType", "N/A");
    let ip = p.text_or("ipAddress", "N/A");
    Draft {
        subject: "⚠️ Alerte de Sécurité".into(),
        preview_text: "Une activité inhabituelle a été détectée sur votre compte.".into(),
        text: format!(
            "Bonjour {}, une activité inhabituelle a été détectée sur votre compte. Détails: Date: {}, Type: {}, IP: {}.",
            p.text("name"),
            date,
            activity,
            ip
        ),
        body: EmailBody::new("Activité Inhabituelle Détectée")
            .badge(Tone::Error, "Alerte de Sécurité")
            .lead("Une activité inhabituelle a été détectée sur votre compte. Veuillez examiner les détails ci-dessous.")
            .card(
                info_card(Tone::Error)
                    .row("Date :", date)
                    .row("Type d'activité :", activity)
                    .row("Adresse IP :", ip),
            )
            .paragraph("Si vous n'êtes pas à l'origine de cette activité, veuillez contacter immédiatement le support.")
            .action("Contacter le support", h.link("/support")),
    }
}

fn backup_codes_generated(p: &EmailParams, h: &Helpers) -> Draft {
    Draft {
        subject: "[Sécurité] Nouveaux codes de secours générés".into(),
        preview_text: "De nouveaux codes de secours pour la 2FA ont été générés pour votre compte."
            .into(),
        text: format!(
            "Bonjour {}, de nouveaux codes de secours 2FA ont été générés pour votre compte. Si vous n'êtes pas à l'origine de cette action, contactez le support.",
            p.text("name")
        ),
        body: EmailBody::new("Alerte de sécurité")
            .lead(format!("Bonjour {},", p.text("name")))
            .lead(format!(
                "De nouveaux codes de secours pour l'authentification à deux facteurs (2FA) ont été générés pour votre compte le {}.",
                h.date(p.str("date").as_deref())
            ))
            .paragraph("Si vous n'êtes pas à l'origine de cette action, votre compte est peut-être compromis. Veuillez changer votre mot de passe immédiatement et contacter le support.")
            .action("Contacter le support", h.link("/support")),
    }
}

fn profile_updated_by_user(p: &EmailParams, h: &Helpers) -> Draft {
    Draft {
        subject: "Mise à jour de votre profil".into(),
        preview_text: "Les informations de votre profil ont été modifiées.".into(),
        text: format!("Bonjour {}, votre profil a été mis à jour.", p.text("name")),
        body: EmailBody::new("Mise à jour de votre profil")
            .lead(format!("Bonjour {},", p.text("name")))
            .lead(format!(
                "Nous vous confirmons que les informations de votre profil ont été mises à jour le {}.",
                h.date(p.str("date").as_deref())
            ))
            .paragraph("Si vous n'êtes pas à l'origine de cette modification, veuillez contacter immédiatement notre support.")
            .action("Contacter le support", h.link("/support")),
    }
}

fn profile_updated_by_admin(p: &EmailParams, h: &Helpers) -> Draft {
    let preview_text = "Un administrateur a mis à jour certaines informations de votre profil.";
    Draft {
        subject: "Mise à jour de votre profil".into(),
        preview_text: preview_text.into(),
        text: preview_text.into(),
        body: EmailBody::new("Mise à jour administrative")
            .badge(Tone::Warning, "Profil Mis à Jour")
            .lead(format!(
                "Bonjour {}, un administrateur a mis à jour les informations de votre profil pour garantir l'exactitude de votre dossier.",
                p.text("name")
            ))
            .card(
                info_card(Tone::Warning)
                    .row("Date :", h.date(p.str("date").as_deref()))
                    .title("Champs mis à jour")
                    .note(p.text_or("updatedFields", "Informations générales")),
            )
            .paragraph("Assurez-vous de vérifier ces informations lors de votre prochaine connexion.")
            .action("Voir mon profil", h.link("/settings")),
    }
}
