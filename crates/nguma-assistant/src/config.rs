/// Tunables for the escalation decision.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Minimum cosine similarity for a knowledge document to count as an answer.
    pub escalation_threshold: f32,
    /// How many documents to retrieve for the prompt.
    pub match_count: usize,
    /// How many recent messages are replayed as conversation history.
    pub history_limit: usize,
    pub greeting_phrases: Vec<String>,
    pub polite_phrases: Vec<String>,
}

pub const DEFAULT_GREETINGS: &[&str] = &[
    "salut", "slt", "bonjour", "hey", "coucou", "hello", "bonsoir",
];

pub const DEFAULT_POLITE: &[&str] = &[
    "merci",
    "ok",
    "d'accord",
    "super",
    "parfait",
    "cool",
    "top",
    "ok merci",
    "c'est bon",
    "compris",
    "ça marche",
];

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            escalation_threshold: 0.5,
            match_count: 3,
            history_limit: 6,
            greeting_phrases: DEFAULT_GREETINGS.iter().map(|s| s.to_string()).collect(),
            polite_phrases: DEFAULT_POLITE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Parse a comma-separated phrase list, lower-casing and dropping blanks.
pub fn parse_phrase_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}
