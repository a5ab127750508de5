use std::path::PathBuf;

use anyhow::{Context, bail};
use secrecy::SecretString;

use nguma_assistant::AssistantConfig;
use nguma_assistant::config::parse_phrase_list;
use nguma_assistant::gemini::DEFAULT_MODEL;

/// Secret values that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-service-role-key",
    "your-cron-secret",
];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,

    pub jwt_secret: String,
    pub service_key: SecretString,
    pub internal_secret: Option<SecretString>,
    pub cron_secret: SecretString,

    pub gemini_api_key: SecretString,
    pub gemini_base_url: Option<String>,
    pub gemini_model: String,

    /// Without a key every send fails with a configuration error.
    pub resend_api_key: Option<SecretString>,
    pub resend_from_domain: String,
    pub site_url: String,

    pub assistant: AssistantConfig,
    pub auto_reply: bool,

    /// Zero disables the in-process queue worker.
    pub queue_interval_secs: u64,
    pub queue_batch_size: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let optional = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let secret = |key: &str| -> anyhow::Result<String> {
            let value = get(key).unwrap_or_default();
            if value.is_empty() || PLACEHOLDER_SECRETS.contains(&value.as_str()) {
                bail!("{} is unset or still a placeholder.", key);
            }
            Ok(value)
        };

        let port: u16 = var("NGUMA_PORT", "3000")
            .parse()
            .context("NGUMA_PORT must be a port number")?;

        let mut assistant = AssistantConfig::default();
        if let Some(v) = optional("NGUMA_ESCALATION_THRESHOLD") {
            assistant.escalation_threshold = v
                .parse()
                .context("NGUMA_ESCALATION_THRESHOLD must be a number")?;
        }
        if let Some(v) = optional("NGUMA_MATCH_COUNT") {
            assistant.match_count = v.parse().context("NGUMA_MATCH_COUNT must be an integer")?;
        }
        if let Some(v) = optional("NGUMA_HISTORY_LIMIT") {
            assistant.history_limit = v.parse().context("NGUMA_HISTORY_LIMIT must be an integer")?;
        }
        if let Some(v) = optional("NGUMA_GREETING_PHRASES") {
            assistant.greeting_phrases = parse_phrase_list(&v);
        }
        if let Some(v) = optional("NGUMA_POLITE_PHRASES") {
            assistant.polite_phrases = parse_phrase_list(&v);
        }

        Ok(Self {
            host: var("NGUMA_HOST", "0.0.0.0"),
            port,
            db_path: var("NGUMA_DB_PATH", "nguma.db").into(),

            jwt_secret: secret("NGUMA_JWT_SECRET")?,
            service_key: SecretString::from(secret("NGUMA_SERVICE_ROLE_KEY")?),
            internal_secret: optional("NGUMA_INTERNAL_SECRET").map(SecretString::from),
            cron_secret: SecretString::from(secret("NGUMA_CRON_SECRET")?),

            gemini_api_key: SecretString::from(secret("GEMINI_API_KEY")?),
            gemini_base_url: optional("GEMINI_BASE_URL"),
            gemini_model: var("GEMINI_MODEL", DEFAULT_MODEL),

            resend_api_key: optional("RESEND_API_KEY").map(SecretString::from),
            resend_from_domain: var("RESEND_FROM_DOMAIN", "nguma.org"),
            site_url: var("SITE_URL", "https://nguma.org"),

            assistant,
            auto_reply: var("NGUMA_AUTO_REPLY", "true") != "false",

            queue_interval_secs: var("NGUMA_QUEUE_INTERVAL_SECS", "60")
                .parse()
                .context("NGUMA_QUEUE_INTERVAL_SECS must be an integer")?,
            queue_batch_size: var("NGUMA_QUEUE_BATCH_SIZE", "50")
                .parse()
                .context("NGUMA_QUEUE_BATCH_SIZE must be an integer")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("NGUMA_JWT_SECRET", "jwt"),
        ("NGUMA_SERVICE_ROLE_KEY", "service"),
        ("NGUMA_CRON_SECRET", "cron"),
        ("GEMINI_API_KEY", "gemini"),
    ];

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.db_path, PathBuf::from("nguma.db"));
        assert_eq!(cfg.gemini_model, "gemini-flash-latest");
        assert_eq!(cfg.resend_from_domain, "nguma.org");
        assert!(cfg.resend_api_key.is_none());
        assert!(cfg.internal_secret.is_none());
        assert!(cfg.auto_reply);
        assert_eq!(cfg.queue_batch_size, 50);
        assert_eq!(cfg.assistant.escalation_threshold, 0.5);
        assert_eq!(cfg.cron_secret.expose_secret(), "cron");
    }

    #[test]
    fn placeholder_secrets_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("NGUMA_JWT_SECRET", "dev-secret-change-me");
        let err = Config::from_lookup(lookup(&pairs)).err().unwrap();
        assert!(err.to_string().contains("NGUMA_JWT_SECRET"));

        let err = Config::from_lookup(lookup(&REQUIRED[..3])).err().unwrap();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn assistant_tuning_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("NGUMA_ESCALATION_THRESHOLD", "0.72"));
        pairs.push(("NGUMA_MATCH_COUNT", "5"));
        pairs.push(("NGUMA_GREETING_PHRASES", "Mbote, salut ,"));
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.assistant.escalation_threshold, 0.72);
        assert_eq!(cfg.assistant.match_count, 5);
        assert_eq!(cfg.assistant.greeting_phrases, vec!["mbote", "salut"]);
        assert_eq!(cfg.assistant.history_limit, 6);
    }
}
