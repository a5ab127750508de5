//! The fixed template catalogue, keyed by `template_id`.

mod admin;
mod marketing;
mod security;
mod support;
mod transactions;

use serde::Serialize;

use crate::components::EmailBody;
use crate::helpers::{Helpers, format_currency};
use crate::params::EmailParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Transaction,
    Security,
    Admin,
    Marketing,
    System,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Transaction => "transaction",
            Category::Security => "security",
            Category::Admin => "admin",
            Category::Marketing => "marketing",
            Category::System => "system",
        }
    }
}

/// A rendered template before it is wrapped in the shared layout.
#[derive(Debug, Clone)]
pub struct Draft {
    pub subject: String,
    pub preview_text: String,
    pub text: String,
    pub body: EmailBody,
}

pub type RenderFn = fn(&EmailParams, &Helpers) -> Draft;

pub struct EmailTemplate {
    pub id: &'static str,
    pub category: Category,
    /// Includes `to`. Checked before rendering; a template may assume these
    /// fields are present.
    pub required_fields: &'static [&'static str],
    pub render: RenderFn,
}

impl EmailTemplate {
    pub fn missing_fields(&self, params: &EmailParams) -> Vec<&'static str> {
        self.required_fields
            .iter()
            .copied()
            .filter(|field| !params.is_present(field))
            .collect()
    }
}

static CATALOG: &[&[EmailTemplate]] = &[
    transactions::TEMPLATES,
    security::TEMPLATES,
    admin::TEMPLATES,
    support::TEMPLATES,
    marketing::TEMPLATES,
];

pub fn all() -> impl Iterator<Item = &'static EmailTemplate> {
    CATALOG.iter().flat_map(|group| group.iter())
}

pub fn find(id: &str) -> Option<&'static EmailTemplate> {
    all().find(|t| t.id == id)
}

fn money(params: &EmailParams, key: &str) -> String {
    format_currency(params.amount(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use chrono::NaiveDate;
    use serde_json::{Value, json};

    pub(super) fn helpers() -> Helpers {
        Helpers {
            site_url: "https://nguma.org".into(),
            today: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        }
    }

    /// Fills every required field with a plausible value.
    fn sample_params(template: &EmailTemplate) -> EmailParams {
        let mut map = serde_json::Map::new();
        for field in template.required_fields {
            let value = match *field {
                "to" => json!("awa@example.com"),
                "amount" | "totalProfits" => json!(1500),
                "duration" => json!(12),
                "rate" => json!(15),
                "email" | "userEmail" | "old_email" | "new_email" => json!("awa@example.com"),
                _ => json!(format!("val-{}", field)),
            };
            map.insert(field.to_string(), value);
        }
        map.insert("name".into(), Value::from("Awa Mbuyi"));
        EmailParams::new(map)
    }

    #[test]
    fn ids_are_unique() {
        let mut seen = HashSet::new();
        for template in all() {
            assert!(seen.insert(template.id), "duplicate template id {}", template.id);
        }
        assert_eq!(seen.len(), 41);
    }

    #[test]
    fn every_template_requires_a_recipient() {
        for template in all() {
            assert!(template.required_fields.contains(&"to"), "{}", template.id);
        }
    }

    #[test]
    fn every_template_renders_non_empty_parts() {
        let h = helpers();
        for template in all() {
            let draft = (template.render)(&sample_params(template), &h);
            assert!(!draft.subject.is_empty(), "{} subject", template.id);
            assert!(!draft.preview_text.is_empty(), "{} preview", template.id);
            assert!(!draft.text.is_empty(), "{} text", template.id);
            assert!(!draft.body.heading.is_empty(), "{} heading", template.id);
        }
    }

    #[test]
    fn lookup_by_id() {
        let otp = find("withdrawal_otp").unwrap();
        assert_eq!(otp.category, Category::Security);
        assert_eq!(otp.required_fields, &["to", "name", "amount", "otp_code"]);
        assert!(find("2fa_setup_confirmed").is_some());
        assert!(find("does_not_exist").is_none());
    }

    #[test]
    fn missing_fields_treats_null_as_absent() {
        let template = find("contract_expiring_soon").unwrap();
        let params = match json!({
            "to": "a@b.c",
            "name": "Awa",
            "amount": 10,
            "contractId": null
        }) {
            Value::Object(map) => EmailParams::new(map),
            _ => unreachable!(),
        };
        assert_eq!(template.missing_fields(&params), vec!["contractId", "endDate"]);
    }
}
