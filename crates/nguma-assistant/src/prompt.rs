use minijinja::{Environment, context};
use serde::Serialize;
use tracing::warn;

use nguma_types::models::{ChatMessage, KnowledgeMatch, UserProfile};

const SUPPORT_PROMPT_TEMPLATE: &str = include_str!("prompts/support_prompt.j2");

pub struct PromptContext<'a> {
    pub role: &'a str,
    pub question: &'a str,
    pub documents: &'a [KnowledgeMatch],
    pub history: &'a [ChatMessage],
    pub profile: Option<&'a UserProfile>,
}

#[derive(Serialize)]
struct ProfileView {
    subscription_tier: String,
    total_invested: String,
    risk_profile: String,
    investment_goals: String,
}

impl ProfileView {
    fn from_profile(p: &UserProfile) -> Self {
        Self {
            subscription_tier: non_empty(&p.subscription_tier).unwrap_or("standard").to_string(),
            total_invested: format!("{}", p.total_invested.unwrap_or(0.0)),
            risk_profile: non_empty(&p.risk_profile).unwrap_or("non défini").to_string(),
            investment_goals: non_empty(&p.investment_goals).unwrap_or("non définis").to_string(),
        }
    }
}

#[derive(Serialize)]
struct HistoryLine<'a> {
    speaker: &'static str,
    text: &'a str,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.trim().is_empty())
}

fn history_lines(history: &[ChatMessage]) -> Vec<HistoryLine<'_>> {
    history
        .iter()
        .map(|m| HistoryLine {
            speaker: if m.is_from_assistant() { "Assistant" } else { "Utilisateur" },
            text: &m.message,
        })
        .collect()
}

pub fn render_support_prompt(ctx: &PromptContext<'_>) -> String {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    if let Err(e) = env.add_template("support_prompt", SUPPORT_PROMPT_TEMPLATE) {
        warn!("Support prompt template failed to load: {}", e);
        return fallback_prompt(ctx);
    }

    let Ok(template) = env.get_template("support_prompt") else {
        return fallback_prompt(ctx);
    };

    template
        .render(context! {
            role => ctx.role,
            question => ctx.question,
            documents => ctx.documents,
            history => history_lines(ctx.history),
            profile => ctx.profile.map(ProfileView::from_profile),
        })
        .unwrap_or_else(|e| {
            warn!("Support prompt failed to render: {}", e);
            fallback_prompt(ctx)
        })
}

fn fallback_prompt(ctx: &PromptContext<'_>) -> String {
    let mut prompt = format!(
        "Tu es {} chez Nguma, une plateforme d'investissement fiable. Réponds UNIQUEMENT en français.\n\n",
        ctx.role
    );
    for doc in ctx.documents {
        prompt.push_str(&format!("**{}**\n{}\n\n", doc.title, doc.content));
    }
    for line in history_lines(ctx.history) {
        prompt.push_str(&format!("{} : {}\n", line.speaker, line.text));
    }
    prompt.push_str(&format!("\nQuestion de l'utilisateur : \"{}\"\n", ctx.question));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nguma_types::models::AI_SENDER_ID;
    use uuid::Uuid;

    fn message(sender: Uuid, text: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            conversation_id: Uuid::nil(),
            sender_id: sender,
            message: text.into(),
            is_admin: false,
            created_at: Utc::now(),
            read_at: None,
        }
    }

    #[test]
    fn prompt_includes_documents_history_and_profile() {
        let docs = vec![
            KnowledgeMatch {
                id: Uuid::new_v4(),
                title: "Délais de retrait".into(),
                content: "Les retraits sont traités sous 48h.".into(),
                similarity: 0.9,
            },
            KnowledgeMatch {
                id: Uuid::new_v4(),
                title: "Frais".into(),
                content: "Aucun frais de retrait.".into(),
                similarity: 0.7,
            },
        ];
        let history = vec![
            message(Uuid::new_v4(), "Bonjour"),
            message(AI_SENDER_ID, "Salut !"),
        ];
        let profile = UserProfile {
            subscription_tier: Some("gold".into()),
            total_invested: Some(2500.0),
            ..Default::default()
        };

        let prompt = render_support_prompt(&PromptContext {
            role: "un conseiller",
            question: "Combien de temps pour un retrait ?",
            documents: &docs,
            history: &history,
            profile: Some(&profile),
        });

        assert!(prompt.starts_with("Tu es un conseiller chez Nguma"));
        assert!(prompt.contains("**Délais de retrait**"));
        assert!(prompt.contains("Aucun frais de retrait."));
        assert!(prompt.contains("Utilisateur : Bonjour"));
        assert!(prompt.contains("Assistant : Salut !"));
        assert!(prompt.contains("Niveau d'abonnement : gold"));
        assert!(prompt.contains("Profil de risque : non défini"));
        assert!(prompt.contains("\"Combien de temps pour un retrait ?\""));
    }

    #[test]
    fn empty_history_is_labelled() {
        let prompt = render_support_prompt(&PromptContext {
            role: "un conseiller",
            question: "Question",
            documents: &[],
            history: &[],
            profile: None,
        });
        assert!(prompt.contains("Aucun historique"));
        assert!(!prompt.contains("Contexte utilisateur"));
    }
}
