use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::OpsError;

/// Conversational stage inferred from a Sofia response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateTag {
    AskName,
    AskService,
    ProposeConsult,
    AskChannel,
    AskSlot,
    AskPayment,
    Confirmed,
    Unknown,
    Error,
}

impl StateTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AskName => "ASK_NAME",
            Self::AskService => "ASK_SERVICE",
            Self::ProposeConsult => "PROPOSE_CONSULT",
            Self::AskChannel => "ASK_CHANNEL",
            Self::AskSlot => "ASK_SLOT",
            Self::AskPayment => "ASK_PAYMENT",
            Self::Confirmed => "CONFIRMED",
            Self::Unknown => "UNKNOWN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for StateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scripted user message plus the state the response is expected to land in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationStep {
    pub message: String,
    pub expected: StateTag,
}

impl ConversationStep {
    pub fn new(message: impl Into<String>, expected: StateTag) -> Self {
        Self {
            message: message.into(),
            expected,
        }
    }
}

/// The canonical seven-step Sofia Lite booking conversation.
pub fn conversation_flow() -> Vec<ConversationStep> {
    vec![
        ConversationStep::new("Ciao", StateTag::AskName),
        ConversationStep::new("Mi chiamo Mario Rossi", StateTag::AskService),
        ConversationStep::new("Ho bisogno di un permesso di soggiorno", StateTag::ProposeConsult),
        ConversationStep::new("Sì, voglio prenotare", StateTag::AskChannel),
        ConversationStep::new("Online", StateTag::AskSlot),
        ConversationStep::new("Domani alle 15:00", StateTag::AskPayment),
        ConversationStep::new("Sì, confermo", StateTag::Confirmed),
    ]
}

/// Loads a custom flow from a YAML file (a sequence of `{message, expected}` entries).
pub fn load_flow(path: impl AsRef<Path>) -> Result<Vec<ConversationStep>, OpsError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// One classification rule: a body containing any of the keywords maps to the tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierRule {
    pub tag: StateTag,
    pub keywords: Vec<String>,
}

impl ClassifierRule {
    pub fn new(tag: StateTag, keywords: &[&str]) -> Self {
        Self {
            tag,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn matches(&self, body: &str) -> bool {
        self.keywords.iter().any(|k| body.contains(k.as_str()))
    }
}

/// Ordered first-match substring classifier.
///
/// Rule order is the priority order: when a body matches several rules the
/// earliest one wins, so more specific keywords must precede more general
/// ones. This tie-break is deliberate, not incidental.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<ClassifierRule>,
}

impl Classifier {
    pub fn new(rules: Vec<ClassifierRule>) -> Self {
        Self { rules }
    }

    /// The keyword set Sofia Lite responds with, Italian phrasing first with
    /// the English counterpart where the service emits one.
    pub fn sofia_default() -> Self {
        Self::new(vec![
            ClassifierRule::new(StateTag::AskName, &["Come ti chiami", "What's your name"]),
            ClassifierRule::new(
                StateTag::AskService,
                &["permesso di soggiorno", "cittadinanza", "ricongiungimento"],
            ),
            ClassifierRule::new(StateTag::ProposeConsult, &["60€", "consulenza"]),
            ClassifierRule::new(StateTag::AskChannel, &["online", "in presenza"]),
            ClassifierRule::new(StateTag::AskSlot, &["orari", "disponibilità"]),
            ClassifierRule::new(StateTag::AskPayment, &["pagamento", "IBAN"]),
            ClassifierRule::new(StateTag::Confirmed, &["confermata", "prenotazione"]),
        ])
    }

    pub fn classify(&self, body: &str) -> StateTag {
        for rule in &self.rules {
            if rule.matches(body) {
                return rule.tag;
            }
        }
        StateTag::Unknown
    }

    /// A phrase guaranteed to classify as `tag`, used to fabricate scripted
    /// responses. `None` for tags without keywords (`Unknown`, `Error`).
    pub fn example_phrase(&self, tag: StateTag) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.tag == tag)
            .and_then(|r| r.keywords.first())
            .map(String::as_str)
    }
}
