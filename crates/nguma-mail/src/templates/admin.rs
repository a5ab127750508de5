//! Administrative actions on a user's account, and alerts sent to admins.

use super::{Category, Draft, EmailTemplate, money};
use crate::components::{EmailBody, RowStyle, Tone, info_card};
use crate::helpers::{Helpers, escape_html, format_currency};
use crate::params::EmailParams;

pub(super) const TEMPLATES: &[EmailTemplate] = &[
    EmailTemplate {
        id: "admin_manual_credit",
        category: Category::Admin,
        required_fields: &["to", "name", "amount", "reason"],
        render: manual_credit,
    },
    EmailTemplate {
        id: "admin_manual_debit",
        category: Category::Admin,
        required_fields: &["to", "name", "amount", "reason"],
        render: manual_debit,
    },
    EmailTemplate {
        id: "new_deposit_request",
        category: Category::Admin,
        required_fields: &["to", "amount", "email", "userName", "transactionId", "paymentMethod"],
        render: new_deposit_request,
    },
    EmailTemplate {
        id: "new_withdrawal_request",
        category: Category::Admin,
        required_fields: &[
            "to",
            "amount",
            "email",
            "userName",
            "transactionId",
            "withdrawalMethod",
            "recipientName",
        ],
        render: new_withdrawal_request,
    },
    EmailTemplate {
        id: "account_suspended",
        category: Category::Admin,
        required_fields: &["to", "name", "reason"],
        render: account_suspended,
    },
    EmailTemplate {
        id: "account_reactivated",
        category: Category::Admin,
        required_fields: &["to", "name"],
        render: account_reactivated,
    },
    EmailTemplate {
        id: "new_user_registered_admin",
        category: Category::Admin,
        required_fields: &["to", "name", "email", "userId"],
        render: new_user_registered,
    },
    EmailTemplate {
        id: "new_contract_admin",
        category: Category::Admin,
        required_fields: &["to", "userName", "email", "amount", "duration", "rate", "contractId"],
        render: new_contract,
    },
];

const DEFAULT_REASON: &str = "Correction administrative";

fn manual_credit(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    let reason = p.text_or("reason", DEFAULT_REASON);
    Draft {
        subject: "Information : Votre compte a été crédité".into(),
        preview_text: format!(
            "Un montant de {} a été ajouté à votre compte par un administrateur.",
            amount
        ),
        text: format!(
            "Bonjour {}, un administrateur a crédité votre compte de {}. Raison : {}.",
            p.text("name"),
            amount,
            reason
        ),
        body: EmailBody::new("Votre compte a été crédité")
            .badge(Tone::Info, "Action Administrative")
            .lead(format!(
                "Bonjour {}, un administrateur a effectué un crédit manuel sur votre compte.",
                p.text("name")
            ))
            .card(
                info_card(Tone::Success)
                    .styled("Type d'opération :", "Crédit manuel", RowStyle::Strong)
                    .styled("Montant ajouté :", amount, RowStyle::AmountSuccess)
                    .row("Raison :", reason)
                    .row("Date :", h.date(p.str("date").as_deref())),
            )
            .action("Consulter mon solde", h.link("/wallet")),
    }
}

fn manual_debit(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    let reason = p.text_or("reason", DEFAULT_REASON);
    Draft {
        subject: "Information : Un débit a été effectué sur votre compte".into(),
        preview_text: format!(
            "Un montant de {} a été retiré de votre compte par un administrateur.",
            amount
        ),
        text: format!(
            "Bonjour {}, un administrateur a débité votre compte de {}. Raison : {}.",
            p.text("name"),
            amount,
            reason
        ),
        body: EmailBody::new("Un débit a été effectué sur votre compte")
            .badge(Tone::Error, "Action Administrative")
            .lead(format!(
                "Bonjour {}, un administrateur a effectué un débit manuel sur votre compte.",
                p.text("name")
            ))
            .card(
                info_card(Tone::Error)
                    .styled("Type d'opération :", "Débit manuel", RowStyle::Strong)
                    .styled("Montant retiré :", amount, RowStyle::Rejection)
                    .row("Raison :", reason)
                    .row("Date :", h.date(p.str("date").as_deref())),
            )
            .action("Contacter le support", h.link("/support")),
    }
}

/// Admin console link, with `?id=` when a transaction reference is known.
fn review_link(h: &Helpers, path: &str, transaction_id: &str) -> String {
    if transaction_id.is_empty() {
        h.link(path)
    } else {
        format!("{}?id={}", h.link(path), escape_html(transaction_id))
    }
}

fn requester(p: &EmailParams) -> String {
    p.str("userName")
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| p.text("email"))
}

fn new_deposit_request(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    let who = requester(p);
    let transaction_id = p.text("transactionId");
    let proof = if p.is_present("proofUrl") {
        "✅ Uploadée"
    } else {
        "❌ Absente"
    };
    Draft {
        subject: format!("[ADMIN] Nouveau Dépôt : {} - {}", amount, who),
        preview_text: format!("{} demande un dépôt de {}", who, amount),
        text: format!(
            "Nouveau dépôt de {} par {}. Ref: {}",
            amount, who, transaction_id
        ),
        body: EmailBody::new("Nouvelle Demande de Dépôt")
            .badge(Tone::Info, "Nouveau Dépôt")
            .lead("Un utilisateur a soumis une demande de dépôt qui attend votre validation.")
            .card(
                info_card(Tone::Default)
                    .title("Utilisateur")
                    .styled("Nom :", p.text_or("userName", "N/A"), RowStyle::Strong)
                    .row("Email :", p.text("email")),
            )
            .card(
                info_card(Tone::Info)
                    .title("Transaction")
                    .styled("Montant :", amount, RowStyle::AmountHighlight)
                    .row("Méthode :", p.text_or("paymentMethod", "Non spécifiée"))
                    .styled(
                        "Réf. Transaction :",
                        p.text_or("transactionId", "N/A"),
                        RowStyle::Code,
                    )
                    .row("Date :", h.date(None))
                    .row("Preuve :", proof),
            )
            .action(
                "Traiter la demande",
                review_link(h, "/admin/deposits", &transaction_id),
            ),
    }
}

fn new_withdrawal_request(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    let who = requester(p);
    let transaction_id = p.text("transactionId");
    Draft {
        subject: format!("[ADMIN] Nouveau Retrait : {} - {}", amount, who),
        preview_text: format!("{} demande un retrait de {}", who, amount),
        text: format!(
            "Nouveau retrait de {} par {}. PREUVE REQUISE. Ref: {}",
            amount, who, transaction_id
        ),
        body: EmailBody::new("Nouvelle Demande de Retrait")
            .badge(Tone::Warning, "Nouveau Retrait")
            .lead("Un utilisateur a demandé un retrait. Une preuve de transfert sera requise lors de l'approbation.")
            .card(
                info_card(Tone::Default)
                    .title("Utilisateur")
                    .styled("Nom :", p.text_or("userName", "N/A"), RowStyle::Strong)
                    .row("Email :", p.text("email")),
            )
            .card(
                info_card(Tone::Warning)
                    .title("Retrait")
                    .styled("Montant :", amount, RowStyle::AmountHighlight)
                    .row("Méthode :", p.text_or("withdrawalMethod", "Non spécifiée"))
                    .row("Bénéficiaire :", p.text_or("recipientName", "Non spécifié"))
                    .styled(
                        "Réf. Transaction :",
                        p.text_or("transactionId", "N/A"),
                        RowStyle::Code,
                    )
                    .row("Date :", h.date(None)),
            )
            .action(
                "Traiter la demande",
                review_link(h, "/admin/withdrawals", &transaction_id),
            ),
    }
}

fn account_suspended(p: &EmailParams, h: &Helpers) -> Draft {
    let reason = p.text_or("reason", "Vérification de sécurité requise");
    Draft {
        subject: "Alerte : Votre compte a été suspendu".into(),
        preview_text: "L'accès à votre compte Nguma a été temporairement restreint.".into(),
        text: format!(
            "Bonjour {}, votre compte a été suspendu. Raison : {}.",
            p.text("name"),
            reason
        ),
        body: EmailBody::new("Votre accès a été restreint")
            .badge(Tone::Error, "Compte Suspendu")
            .lead(format!(
                "Bonjour {}, l'accès à votre compte a été temporairement suspendu.",
                p.text("name")
            ))
            .card(
                info_card(Tone::Error)
                    .styled("Statut du compte :", "Suspendu", RowStyle::Strong)
                    .row("Raison :", reason)
                    .row("Date :", h.date(p.str("date").as_deref())),
            )
            .action("Contacter le support", h.link("/support")),
    }
}

fn account_reactivated(p: &EmailParams, h: &Helpers) -> Draft {
    Draft {
        subject: "Information : Votre compte a été réactivé".into(),
        preview_text: "L'accès à votre compte Nguma a été restauré.".into(),
        text: format!(
            "Bonjour {}, votre compte est de nouveau pleinement fonctionnel.",
            p.text("name")
        ),
        body: EmailBody::new("Accès restauré")
            .badge(Tone::Success, "Compte Réactivé")
            .lead(format!(
                "Bonjour {}, votre compte est de nouveau pleinement fonctionnel.",
                p.text("name")
            ))
            .card(
                info_card(Tone::Success)
                    .styled("Statut du compte :", "Actif", RowStyle::Strong)
                    .row("Date :", h.date(p.str("date").as_deref())),
            )
            .action("Accéder à mon compte", h.link("/dashboard")),
    }
}

fn new_user_registered(p: &EmailParams, h: &Helpers) -> Draft {
    let who = p
        .str("name")
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| p.text("email"));
    let user_id = p.text("userId");
    Draft {
        subject: format!("[ADMIN] Nouvel utilisateur inscrit : {}", who),
        preview_text: format!("Un nouvel utilisateur, {}, s'est inscrit sur Nguma.", who),
        text: format!(
            "Un nouvel utilisateur {} ({}) s'est inscrit. ID: {}.",
            p.text("name"),
            p.text("email"),
            user_id
        ),
        body: EmailBody::new("Nouvel utilisateur sur Nguma")
            .badge(Tone::Info, "Nouvelle Inscription")
            .lead("Un nouveau compte vient d'être créé sur la plateforme.")
            .card(
                info_card(Tone::Default)
                    .styled("Nom :", p.text_or("name", "N/A"), RowStyle::Strong)
                    .row("Email :", p.text_or("email", "N/A"))
                    .row("User ID :", p.text_or("userId", "N/A"))
                    .row("Date d'inscription :", h.date(None)),
            )
            .action(
                "Voir le profil utilisateur",
                h.link(&format!("/admin/users/{}", escape_html(&user_id))),
            ),
    }
}

fn new_contract(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    let user_name = p.text("userName");
    let duration = p.text("duration");
    let rate = p.text("rate");
    let contract_id = p.text("contractId");
    let monthly = match (p.amount("amount"), p.amount("rate")) {
        (Some(a), Some(r)) => format_currency(Some(a * r / 100.0)),
        _ => format_currency(None),
    };
    Draft {
        subject: format!("[ADMIN] Nouveau Contrat : {} - {}", amount, user_name),
        preview_text: format!(
            "{} a créé un contrat de {} pour {} mois",
            user_name, amount, duration
        ),
        text: format!(
            "{} a créé un contrat de {} pour {} mois à {}%. ID: {}",
            user_name, amount, duration, rate, contract_id
        ),
        body: EmailBody::new("Nouveau Contrat d'Investissement")
            .badge(Tone::Success, "Nouveau Contrat")
            .lead("Un investisseur vient d'activer un nouveau contrat.")
            .card(
                info_card(Tone::Default)
                    .title("Investisseur")
                    .styled("Nom :", user_name, RowStyle::Strong)
                    .row("Email :", p.text("email")),
            )
            .card(
                info_card(Tone::Success)
                    .title("Contrat")
                    .styled("Montant :", amount, RowStyle::AmountSuccess)
                    .row("Durée :", format!("{} mois", duration))
                    .styled("Taux :", format!("{}%", rate), RowStyle::Strong)
                    .styled("ID Contrat :", contract_id.clone(), RowStyle::Code)
                    .row("Date début :", h.date(p.str("startDate").as_deref()))
                    .styled("Profit mensuel estimé :", monthly, RowStyle::AmountSuccess),
            )
            .action(
                "Voir le contrat",
                h.link(&format!("/admin/contracts?id={}", escape_html(&contract_id))),
            )
            .secondary_action(
                "Profil investisseur",
                h.link(&format!("/admin/users?email={}", escape_html(&p.text("email")))),
            ),
    }
}
