use crate::config::AssistantConfig;

pub const GREETING_REPLY: &str =
    "Salut ! 👋 Je suis là pour vous aider avec vos questions sur Nguma. Comment puis-je vous aider ?";

pub const POLITE_REPLY: &str = "Je vous en prie ! N'hésitez pas si vous avez d'autres questions. 😊";

pub const ESCALATION_REPLY: &str = "Je ne trouve pas la réponse dans ma base de connaissances. \
     Je vous mets en attente et transfère votre demande à un administrateur. \
     Vous recevrez une réponse dès que possible.";

pub const TRUNCATION_NOTICE: &str = "\n\n[... La réponse a été tronquée. Veuillez reformuler votre question \
     pour plus de détails ou précisez votre demande.]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleMessage {
    Greeting,
    Politeness,
}

impl SimpleMessage {
    pub fn reply(&self) -> &'static str {
        match self {
            Self::Greeting => GREETING_REPLY,
            Self::Politeness => POLITE_REPLY,
        }
    }
}

/// Lower-case, trim, and drop one trailing "!" or " !". Any other spacing
/// before the "!" is kept so the message no longer matches a phrase.
pub fn normalize(message: &str) -> String {
    let lowered = message.trim().to_lowercase();
    match lowered
        .strip_suffix(" !")
        .or_else(|| lowered.strip_suffix('!'))
    {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// Classify a message as a whitelisted greeting or politeness phrase.
/// Anything else, including phrases embedded in longer text, is `None`.
pub fn classify(message: &str, config: &AssistantConfig) -> Option<SimpleMessage> {
    let normalized = normalize(message);
    if normalized.is_empty() {
        return None;
    }

    if config.greeting_phrases.iter().any(|p| *p == normalized) {
        Some(SimpleMessage::Greeting)
    } else if config.polite_phrases.iter().any(|p| *p == normalized) {
        Some(SimpleMessage::Politeness)
    } else {
        None
    }
}

/// How the assistant introduces itself in the prompt.
pub fn persona(message: &str) -> &'static str {
    let lowered = message.to_lowercase();
    if lowered.contains("qui es-tu") || lowered.contains("qui êtes-vous") {
        "l'assistant virtuel de Nguma"
    } else {
        "un conseiller"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greetings_and_politeness() {
        let cfg = AssistantConfig::default();
        assert_eq!(classify("Bonjour", &cfg), Some(SimpleMessage::Greeting));
        assert_eq!(classify("  SALUT !", &cfg), Some(SimpleMessage::Greeting));
        assert_eq!(classify("hello!", &cfg), Some(SimpleMessage::Greeting));
        assert_eq!(classify("Ok merci", &cfg), Some(SimpleMessage::Politeness));
        assert_eq!(classify("ça marche !", &cfg), Some(SimpleMessage::Politeness));
    }

    #[test]
    fn longer_messages_are_not_simple() {
        let cfg = AssistantConfig::default();
        assert_eq!(classify("bonjour, comment retirer mes fonds ?", &cfg), None);
        assert_eq!(classify("merci!!", &cfg), None);
        assert_eq!(classify("   ", &cfg), None);
    }

    #[test]
    fn only_one_space_before_bang() {
        let cfg = AssistantConfig::default();
        assert_eq!(classify("merci !", &cfg), Some(SimpleMessage::Politeness));
        assert_eq!(classify("merci!", &cfg), Some(SimpleMessage::Politeness));
        assert_eq!(classify("merci   !", &cfg), None);
        assert_eq!(classify("merci\t!", &cfg), None);
    }

    #[test]
    fn custom_phrase_lists() {
        let cfg = AssistantConfig {
            greeting_phrases: vec!["mbote".into()],
            polite_phrases: vec![],
            ..Default::default()
        };
        assert_eq!(classify("Mbote !", &cfg), Some(SimpleMessage::Greeting));
        assert_eq!(classify("merci", &cfg), None);
    }

    #[test]
    fn persona_switches_on_identity_question() {
        assert_eq!(persona("Qui es-tu ?"), "l'assistant virtuel de Nguma");
        assert_eq!(persona("Quels sont les frais ?"), "un conseiller");
    }
}
