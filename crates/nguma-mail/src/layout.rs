use chrono::{Datelike, Utc};
use minijinja::{Environment, context};

use crate::components::EmailBody;
use crate::error::MailError;

const BASE_LAYOUT: &str = include_str!("html/base.html");
const BODY: &str = include_str!("html/body.html");

/// Holds the compiled layout templates. Built once at startup.
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, MailError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("base.html", BASE_LAYOUT)?;
        env.add_template("body.html", BODY)?;
        Ok(Self { env })
    }

    /// Wrap a body in the shared layout: hidden preheader, brand header,
    /// and a footer with the current year and the preferences link.
    pub fn render(
        &self,
        body: &EmailBody,
        preview_text: &str,
        site_url: &str,
    ) -> Result<String, MailError> {
        let content = self.env.get_template("body.html")?.render(body)?;
        let html = self.env.get_template("base.html")?.render(context! {
            content => content,
            preview_text => preview_text,
            site_url => site_url,
            year => Utc::now().year(),
        })?;
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{RowStyle, Tone, info_card};

    #[test]
    fn layout_wraps_body() {
        let renderer = Renderer::new().unwrap();
        let body = EmailBody::new("Fonds disponibles")
            .badge(Tone::Success, "Opération validée")
            .card(info_card(Tone::Success).styled("Montant :", "100,00 $", RowStyle::AmountSuccess))
            .action("Consulter mon solde", "https://nguma.org/wallet".into());

        let html = renderer
            .render(&body, "Les fonds sont disponibles.", "https://nguma.org")
            .unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Les fonds sont disponibles."));
        assert!(html.contains("<h2>Fonds disponibles</h2>"));
        assert!(html.contains(r#"class="amount-success">100,00 $</td>"#));
        assert!(html.contains(r#"href="https://nguma.org/wallet" class="btn btn-primary""#));
        assert!(html.contains(r#"href="https://nguma.org/settings/notifications""#));
        assert!(html.contains(&Utc::now().year().to_string()));
    }

    #[test]
    fn text_fields_are_escaped() {
        let renderer = Renderer::new().unwrap();
        let body = EmailBody::new("Alerte").lead("<script>alert(1)</script>");
        let html = renderer.render(&body, "x", "https://nguma.org").unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
