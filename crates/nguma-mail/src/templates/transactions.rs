//! Deposits, withdrawals, contracts and refunds.

use super::{Category, Draft, EmailTemplate, money};
use crate::components::{EmailBody, RowStyle, Tone, info_card};
use crate::helpers::{Helpers, escape_html, format_currency, support_html};
use crate::params::EmailParams;

pub(super) const TEMPLATES: &[EmailTemplate] = &[
    EmailTemplate {
        id: "deposit_approved",
        category: Category::Transaction,
        required_fields: &["to", "name", "amount"],
        render: deposit_approved,
    },
    EmailTemplate {
        id: "deposit_rejected",
        category: Category::Transaction,
        required_fields: &["to", "name", "amount"],
        render: deposit_rejected,
    },
    EmailTemplate {
        id: "deposit_pending",
        category: Category::Transaction,
        required_fields: &["to", "name", "amount"],
        render: deposit_pending,
    },
    EmailTemplate {
        id: "withdrawal_approved",
        category: Category::Transaction,
        required_fields: &["to", "name", "amount"],
        render: withdrawal_approved,
    },
    EmailTemplate {
        id: "withdrawal_rejected",
        category: Category::Transaction,
        required_fields: &["to", "name", "amount"],
        render: withdrawal_rejected,
    },
    EmailTemplate {
        id: "withdrawal_pending",
        category: Category::Transaction,
        required_fields: &["to", "name", "amount"],
        render: withdrawal_pending,
    },
    EmailTemplate {
        id: "withdrawal_approved_with_proof",
        category: Category::Transaction,
        required_fields: &["to", "name", "amount", "proof_url"],
        render: withdrawal_approved_with_proof,
    },
    EmailTemplate {
        id: "monthly_profit",
        category: Category::Transaction,
        required_fields: &["to", "name", "amount"],
        render: monthly_profit,
    },
    EmailTemplate {
        id: "new_investment",
        category: Category::Transaction,
        required_fields: &["to", "name", "amount"],
        render: new_investment,
    },
    EmailTemplate {
        id: "contract_ended",
        category: Category::Transaction,
        required_fields: &[
            "to",
            "name",
            "contractId",
            "amount",
            "startDate",
            "endDate",
            "totalProfits",
        ],
        render: contract_ended,
    },
    EmailTemplate {
        id: "reinvestment_confirmed",
        category: Category::Transaction,
        required_fields: &["to", "name", "amount"],
        render: reinvestment_confirmed,
    },
    EmailTemplate {
        id: "contract_expiring_soon",
        category: Category::Transaction,
        required_fields: &["to", "name", "contractId", "amount", "endDate"],
        render: contract_expiring_soon,
    },
    EmailTemplate {
        id: "refund_requested",
        category: Category::Transaction,
        required_fields: &["to", "name", "amount", "contractId"],
        render: refund_requested,
    },
    EmailTemplate {
        id: "new_refund_request",
        category: Category::Admin,
        required_fields: &["to", "userName", "userEmail", "amount", "contractId"],
        render: new_refund_request,
    },
    EmailTemplate {
        id: "refund_approved",
        category: Category::Transaction,
        required_fields: &["to", "name", "amount", "contractId"],
        render: refund_approved,
    },
    EmailTemplate {
        id: "refund_rejected",
        category: Category::Transaction,
        required_fields: &["to", "name", "contractId"],
        render: refund_rejected,
    },
];

// -- Deposits --

fn deposit_approved(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    Draft {
        subject: "Crédit confirmé sur votre compte".into(),
        preview_text: format!("Les fonds de {} sont disponibles.", amount),
        text: format!("Bonjour {}, votre dépôt de {} est confirmé.", p.text("name"), amount),
        body: EmailBody::new("Fonds disponibles")
            .badge(Tone::Success, "Opération validée")
            .lead("Votre transaction récente a été traitée avec succès. Le montant a été crédité sur votre balance.")
            .card(
                info_card(Tone::Success)
                    .styled("Montant crédité :", amount, RowStyle::AmountSuccess)
                    .row("Référence :", "Dépôt")
                    .row("Date :", h.date(None)),
            )
            .action("Consulter mon solde", h.link("/wallet"))
            .support(support_html(p.str("support_phone").as_deref())),
    }
}

fn deposit_rejected(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    Draft {
        subject: "Mise à jour concernant votre transaction".into(),
        preview_text: format!("Nous ne pouvons pas valider votre opération de {}.", amount),
        text: format!("Bonjour {}, votre transaction n'a pas pu aboutir.", p.text("name")),
        body: EmailBody::new("Information importante")
            .badge(Tone::Error, "Opération non aboutie")
            .lead("Nous avons analysé votre demande de dépôt. Pour des raisons de sécurité ou de conformité, elle n'a pas pu être validée.")
            .card(
                info_card(Tone::Error)
                    .row("Montant :", amount)
                    .styled(
                        "Motif :",
                        p.text_or("reason", "Vérification incomplète"),
                        RowStyle::Rejection,
                    ),
            )
            .action("Contacter le support", h.link("/support")),
    }
}

fn deposit_pending(p: &EmailParams, _h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    Draft {
        subject: "Réception de votre demande".into(),
        preview_text: format!("Votre demande de {} est en cours d'analyse.", amount),
        text: format!("Bonjour {}, nous analysons votre demande.", p.text("name")),
        body: EmailBody::new("Demande reçue")
            .badge(Tone::Info, "En cours de traitement")
            .lead("Nous avons bien reçu les détails de votre transaction. Nos services procèdent actuellement aux vérifications d'usage.")
            .card(
                info_card(Tone::Default)
                    .styled("Montant :", amount, RowStyle::AmountHighlight)
                    .row("Délai estimé :", "24h ouvrées"),
            ),
    }
}

// -- Withdrawals --

fn withdrawal_approved(p: &EmailParams, _h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    Draft {
        subject: "Validation de votre transfert sortant".into(),
        preview_text: format!("Le retrait de {} a été approuvé.", amount),
        text: format!("Bonjour {}, votre retrait est validé.", p.text("name")),
        body: EmailBody::new("Opération confirmée")
            .badge(Tone::Success, "Transfert validé")
            .lead("Votre demande de retrait a été validée par nos services financiers. Les fonds sont en route vers votre compte de destination.")
            .card(
                info_card(Tone::Default)
                    .styled("Montant retiré :", amount, RowStyle::AmountSuccess)
                    .row("Statut :", "Envoyé"),
            ),
    }
}

fn withdrawal_rejected(p: &EmailParams, _h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    Draft {
        subject: "Information sur votre demande de retrait".into(),
        preview_text: format!("Impossible de traiter le retrait de {}.", amount),
        text: format!("Bonjour {}, votre retrait n'a pas pu être traité.", p.text("name")),
        body: EmailBody::new("Action requise")
            .badge(Tone::Error, "Transfert annulé")
            .lead("Votre demande de retrait n'a pas pu être finalisée. Aucun montant n'a été débité de votre solde.")
            .card(
                info_card(Tone::Error)
                    .row("Montant :", amount)
                    .styled(
                        "Raison :",
                        p.text_or("reason", "Données incorrectes"),
                        RowStyle::Rejection,
                    ),
            ),
    }
}

fn withdrawal_pending(p: &EmailParams, _h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    Draft {
        subject: "Demande de retrait enregistrée".into(),
        preview_text: format!("Confirmation de votre demande de {}.", amount),
        text: format!("Bonjour {}, votre demande est enregistrée.", p.text("name")),
        body: EmailBody::new("Demande enregistrée")
            .badge(Tone::Info, "Vérification en cours")
            .lead("Vous avez initié une demande de retrait. Pour votre sécurité, notre équipe va valider cette opération manuellement.")
            .card(
                info_card(Tone::Default)
                    .styled("Montant demandé :", amount, RowStyle::AmountHighlight)
                    .row("Délai :", "24-48h"),
            ),
    }
}

fn proof_block(proof_url: &str) -> String {
    let url = escape_html(proof_url);
    format!(
        concat!(
            r#"<div class="info-card" style="margin-top: 30px; background: #F0FDF4; border: 1px solid #BBF7D0; border-radius: 8px; padding: 20px;">"#,
            r#"<h3 style="margin-top:0; color: #059669;">📑 Preuve de Transfert</h3>"#,
            "<p>Voici la confirmation officielle de votre transfert :</p>",
            r#"<div style="text-align: center; margin: 20px 0; background: white; padding: 15px; border-radius: 8px;">"#,
            r#"<img src="{url}" alt="Preuve de transfert" style="max-width: 100%; height: auto; border-radius: 8px; border: 2px solid #D1FAE5;" />"#,
            "</div>",
            r#"<div class="cta-buttons"><a href="{url}" download class="btn btn-primary" style="background-color: #059669;">📥 Télécharger la preuve</a></div>"#,
            r#"<p style="font-size: 12px; color: #059669; margin-top: 15px; text-align: center;">💡 Conservez cette preuve pour vos archives personnelles.</p>"#,
            "</div>"
        ),
        url = url
    )
}

fn withdrawal_approved_with_proof(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    let proof_url = p.text("proof_url");
    Draft {
        subject: format!("Confirmation de transfert - {}", amount),
        preview_text: "Votre retrait a été transféré. Preuve jointe.".into(),
        text: format!(
            "Bonjour {}, votre retrait de {} a été transféré. Preuve disponible : {}",
            p.text("name"),
            amount,
            proof_url
        ),
        body: EmailBody::new("Opération Confirmée")
            .badge(Tone::Success, "Transfert Effectué ✅")
            .lead("Votre demande de retrait a été approuvée et transférée vers votre compte. Vous trouverez ci-dessous la preuve officielle du transfert.")
            .card(
                info_card(Tone::Success)
                    .title("📋 Détails du Transfert")
                    .styled("Méthode :", p.text_or("method", "N/A"), RowStyle::Strong)
                    .styled("Montant net :", amount, RowStyle::AmountSuccess)
                    .row("Date :", h.date(p.str("date").as_deref()))
                    .row("Statut :", "✓ Envoyé"),
            )
            .html(proof_block(&proof_url))
            .action("Voir mon historique", h.link("/wallet")),
    }
}

// -- Contracts --

fn monthly_profit(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    Draft {
        subject: "Relevé mensuel : Nouveau crédit".into(),
        preview_text: format!("Un montant de {} a été ajouté à votre solde.", amount),
        text: format!("Bonjour {}, votre solde a été mis à jour.", p.text("name")),
        body: EmailBody::new("Relevé mensuel")
            .badge(Tone::Success, "Solde mis à jour")
            .lead("Le rendement mensuel de votre plan actif a été crédité sur votre compte.")
            .card(
                info_card(Tone::Success)
                    .styled("Montant crédité :", amount, RowStyle::AmountSuccess)
                    .row("Origine :", "Rendement mensuel")
                    .row("Date :", h.date(None)),
            )
            .action("Voir mon tableau de bord", h.link("/wallet")),
    }
}

fn new_investment(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    Draft {
        subject: "Confirmation d'activation de contrat".into(),
        preview_text: format!("Votre plan de {} est maintenant actif.", amount),
        text: format!("Félicitations {}, votre contrat est actif.", p.text("name")),
        body: EmailBody::new("Activation confirmée")
            .badge(Tone::Success, "Contrat Actif")
            .lead("Votre souscription a bien été prise en compte. Votre capital commence à travailler dès aujourd'hui selon les termes prévus.")
            .card(
                info_card(Tone::Success)
                    .styled("Capital initial :", amount, RowStyle::AmountSuccess)
                    .row("Durée :", "12 mois")
                    .row("Taux appliqué :", "Standard (15%)"),
            )
            .action("Gérer mon contrat", h.link("/dashboard"))
            .support(support_html(p.str("support_phone").as_deref())),
    }
}

fn contract_ended(p: &EmailParams, h: &Helpers) -> Draft {
    let contract_id = p.text("contractId");
    let capital = p.amount("amount").unwrap_or(0.0);
    let profits = p.amount("totalProfits").unwrap_or(0.0);
    let total = format_currency(Some(capital + profits));
    let capital = format_currency(Some(capital));
    let profits = format_currency(Some(profits));

    Draft {
        subject: format!("🏁 Contrat Terminé - {}", contract_id),
        preview_text: format!("Votre contrat (ID: {}) est maintenant terminé.", contract_id),
        text: format!(
            "Bonjour {}, votre contrat (ID: {}) est terminé. Capital: {}, Profits: {}, Total transféré: {}.",
            p.text("name"),
            contract_id,
            capital,
            profits,
            total
        ),
        body: EmailBody::new("Votre contrat a pris fin")
            .badge(Tone::Info, "Contrat Terminé")
            .lead(format!(
                "Votre contrat d'investissement (ID: {}) est maintenant terminé. Voici un récapitulatif de votre investissement.",
                contract_id
            ))
            .card(
                info_card(Tone::Success)
                    .title("📊 Récapitulatif Financier")
                    .row("💰 Capital initial :", capital)
                    .styled("📈 Total profits générés :", profits, RowStyle::AmountSuccess)
                    .styled(
                        "💵 Montant total transféré au solde :",
                        total,
                        RowStyle::AmountSuccess,
                    ),
            )
            .card(
                info_card(Tone::Default)
                    .title("📅 Informations du Contrat")
                    .row(
                        "Période :",
                        format!(
                            "{} à {}",
                            p.text_or("startDate", "N/A"),
                            p.text_or("endDate", "N/A")
                        ),
                    )
                    .row("Méthode :", p.text_or("method", "N/A")),
            )
            .paragraph("Le montant total (capital + profits) a été automatiquement transféré sur votre solde principal. Vous pouvez maintenant réinvestir vos profits pour continuer à faire fructifier votre capital.")
            .action("💎 Réinvestir mes profits", h.link("/contracts/new"))
            .secondary_action("Voir mon solde", h.link("/wallet")),
    }
}

fn reinvestment_confirmed(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    Draft {
        subject: "Confirmation de votre réinvestissement".into(),
        preview_text: format!("Votre réinvestissement de {} a été activé.", amount),
        text: format!(
            "Bonjour {}, nous confirmons votre réinvestissement de {}.",
            p.text("name"),
            amount
        ),
        body: EmailBody::new("Opération confirmée")
            .badge(Tone::Success, "Réinvestissement Activé")
            .lead("Votre demande de réinvestissement de vos profits a été traitée avec succès. Votre capital continue de croître !")
            .card(
                info_card(Tone::Success)
                    .styled("Montant réinvesti :", amount, RowStyle::AmountSuccess)
                    .row("Origine :", "Solde de profits")
                    .row("Statut :", "Actif sur un nouveau contrat"),
            )
            .paragraph("Vous pouvez suivre la performance de tous vos contrats depuis votre tableau de bord.")
            .action("Voir mes contrats", h.link("/contracts")),
    }
}

fn contract_expiring_soon(p: &EmailParams, h: &Helpers) -> Draft {
    let contract_id = p.text("contractId");
    let end_date = p.text("endDate");
    Draft {
        subject: "Rappel : Votre contrat arrive à expiration".into(),
        preview_text: format!("Votre contrat {} se termine le {}.", contract_id, end_date),
        text: format!(
            "Bonjour {}, votre contrat (ID: {}) arrive à expiration le {}.",
            p.text("name"),
            contract_id,
            end_date
        ),
        body: EmailBody::new("Votre contrat arrive à son terme")
            .badge(Tone::Info, "Rappel d'Expiration")
            .lead("Ceci est un rappel pour vous informer que l'un de vos contrats d'investissement arrive bientôt à expiration.")
            .card(
                info_card(Tone::Default)
                    .styled("ID du Contrat :", contract_id, RowStyle::Strong)
                    .row("Montant initial :", money(p, "amount"))
                    .styled("Date de fin :", end_date, RowStyle::Strong),
            )
            .paragraph("À la date de fin, le capital et les profits générés seront transférés sur votre solde principal. Pensez à vos prochaines actions :")
            .bullet("Préparer un retrait.")
            .bullet("Planifier un nouveau réinvestissement pour continuer à faire fructifier votre capital.")
            .action("Gérer mes contrats", h.link("/contracts")),
    }
}

// -- Refunds --

fn refund_requested(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    let contract_id = p.text("contractId");
    let preview_text = format!(
        "Nous avons bien reçu votre demande de remboursement de {}.",
        amount
    );
    Draft {
        subject: format!("Demande de Remboursement Reçue - Contrat #{}", contract_id),
        text: preview_text.clone(),
        preview_text,
        body: EmailBody::new("Demande en cours de traitement")
            .badge(Tone::Info, "Demande Reçue")
            .lead(format!("Bonjour {},", p.text("name")))
            .lead(format!(
                "Nous avons bien reçu votre demande de remboursement pour le contrat #{}.",
                contract_id
            ))
            .card(
                info_card(Tone::Info)
                    .row("Montant demandé :", amount)
                    .row("Date :", h.date(p.str("date").as_deref()))
                    .row("Motif :", p.text_or("reason", "Non spécifié")),
            )
            .paragraph("Votre demande est en cours d'examen par notre équipe administrative. Vous serez notifié dès qu'une décision sera prise (généralement sous 24-48h).")
            .action("Voir mes contrats", h.link("/contracts")),
    }
}

fn new_refund_request(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    let contract_id = p.text("contractId");
    let user_name = p.text("userName");
    let preview_text = format!(
        "{} a demandé un remboursement pour le contrat #{}.",
        user_name, contract_id
    );
    Draft {
        subject: format!("🔔 Nouvelle demande de remboursement: {}", amount),
        text: preview_text.clone(),
        preview_text,
        body: EmailBody::new("Nouvelle Demande de Remboursement")
            .badge(Tone::Warning, "Action Requise")
            .lead("Une nouvelle demande nécessite votre attention.")
            .card(
                info_card(Tone::Warning)
                    .row(
                        "Utilisateur :",
                        format!("{} ({})", user_name, p.text("userEmail")),
                    )
                    .row("Contrat :", format!("#{}", contract_id))
                    .row("Montant :", amount)
                    .row("Motif :", p.text_or("reason", "Non spécifié"))
                    .row("Date :", h.date(p.str("date").as_deref())),
            )
            .action("Gérer la demande", h.link("/admin/refunds")),
    }
}

fn refund_approved(p: &EmailParams, h: &Helpers) -> Draft {
    let amount = money(p, "amount");
    let contract_id = p.text("contractId");
    let preview_text = format!(
        "Votre demande de remboursement de {} a été approuvée.",
        amount
    );
    Draft {
        subject: format!("✅ Remboursement Approuvé - Contrat #{}", contract_id),
        text: preview_text.clone(),
        preview_text,
        body: EmailBody::new("Bonne nouvelle !")
            .badge(Tone::Success, "Remboursement Approuvé")
            .lead(format!("Bonjour {},", p.text("name")))
            .lead(format!(
                "Votre demande de remboursement pour le contrat #{} a été validée.",
                contract_id
            ))
            .card(
                info_card(Tone::Success)
                    .row("Montant remboursé :", amount)
                    .row("Date de validation :", h.date(p.str("date").as_deref()))
                    .styled("Statut :", "Crédité sur votre solde", RowStyle::Strong),
            )
            .paragraph("Les fonds ont été ajoutés à votre solde disponible. Vous pouvez maintenant effectuer un retrait ou réinvestir.")
            .action("Voir mon solde", h.link("/wallet")),
    }
}

fn refund_rejected(p: &EmailParams, h: &Helpers) -> Draft {
    let contract_id = p.text("contractId");
    let preview_text = format!(
        "Votre demande de remboursement pour le contrat #{} a été refusée.",
        contract_id
    );
    Draft {
        subject: format!("❌ Mise à jour concernant votre demande - Contrat #{}", contract_id),
        text: preview_text.clone(),
        preview_text,
        body: EmailBody::new("Mise à jour de votre demande")
            .badge(Tone::Error, "Demande Refusée")
            .lead(format!("Bonjour {},", p.text("name")))
            .lead(format!(
                "Après examen, nous ne pouvons pas donner suite à votre demande de remboursement pour le contrat #{}.",
                contract_id
            ))
            .card(
                info_card(Tone::Error)
                    .title("Motif du refus :")
                    .note(p.text_or("reason", "Non respect des conditions générales de vente.")),
            )
            .paragraph("Si vous pensez qu'il s'agit d'une erreur, vous pouvez contacter notre support.")
            .secondary_action("Contacter le support", h.link("/support")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::find;
    use crate::templates::tests::helpers;
    use serde_json::{Value, json};

    fn params(value: Value) -> EmailParams {
        match value {
            Value::Object(map) => EmailParams::new(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn rejected_deposit_defaults_reason() {
        let draft = deposit_rejected(&params(json!({ "name": "Awa", "amount": 50 })), &helpers());
        let card = &draft.body.cards[0];
        assert_eq!(card.rows[1].value, "Vérification incomplète");
        assert_eq!(card.rows[1].class, Some("rejection-reason"));
    }

    #[test]
    fn contract_ended_sums_capital_and_profits() {
        let draft = contract_ended(
            &params(json!({
                "name": "Awa",
                "contractId": "C-12",
                "amount": 1000,
                "totalProfits": "150.5",
                "startDate": "2025-10-01",
                "endDate": "2026-10-01"
            })),
            &helpers(),
        );
        assert_eq!(draft.subject, "🏁 Contrat Terminé - C-12");
        assert!(draft.text.contains("Total transféré: 1\u{202f}150,50\u{a0}$"));
        assert_eq!(draft.body.cards[0].rows[2].value, "1\u{202f}150,50\u{a0}$");
    }

    #[test]
    fn proof_url_is_escaped() {
        let draft = withdrawal_approved_with_proof(
            &params(json!({
                "name": "Awa",
                "amount": 200,
                "proof_url": "https://cdn.nguma.org/p.png\"><script>"
            })),
            &helpers(),
        );
        let html = &draft.body.extra_html[0];
        assert!(html.contains("https://cdn.nguma.org/p.png&quot;&gt;&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn refund_request_for_admins_is_admin_category() {
        let template = find("new_refund_request").unwrap();
        assert_eq!(template.category, Category::Admin);
    }

    #[test]
    fn support_phone_is_optional() {
        let without = deposit_approved(&params(json!({ "name": "Awa", "amount": 10 })), &helpers());
        assert!(without.body.support_html.is_empty());

        let with = new_investment(
            &params(json!({ "name": "Awa", "amount": 10, "support_phone": "+243 800" })),
            &helpers(),
        );
        assert!(with.body.support_html.contains("wa.me/243800"));
    }
}
