// Core debate types shared by the sequencer, store and moderator

use serde::{Deserialize, Serialize};

/// Speaking side of a turn. `User` marks a moderator interjection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Pro,
    Con,
    User,
}

impl Side {
    /// Debater side for a zero-based turn index: even turns argue pro,
    /// odd turns argue con. Interjections never shift this parity.
    pub fn for_turn(index: usize) -> Self {
        if index % 2 == 0 {
            Side::Pro
        } else {
            Side::Con
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Side::Pro => "Pro",
            Side::Con => "Con",
            Side::User => "Moderator",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Pro => write!(f, "pro"),
            Side::Con => write!(f, "con"),
            Side::User => write!(f, "user"),
        }
    }
}

/// One attributed utterance in a debate. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub side: Side,
    pub content: String,
}

impl Turn {
    pub fn new(side: Side, content: impl Into<String>) -> Self {
        Self {
            side,
            content: content.into(),
        }
    }
}

/// Rhetorical register for generated turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebateStyle {
    Emotional,
    #[default]
    Logical,
    Philosophical,
}

impl DebateStyle {
    /// Parse a style tag, falling back to `Logical` for unknown input
    /// rather than failing the request.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "emotional" => DebateStyle::Emotional,
            "philosophical" => DebateStyle::Philosophical,
            _ => DebateStyle::Logical,
        }
    }
}

/// Moderator summary of one side's case. Regenerated on demand from the
/// stored transcript; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideSummary {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub core_claim: String,
    #[serde(default)]
    pub main_argument: String,
    #[serde(default)]
    pub supporting_example: String,
    #[serde(default)]
    pub closing_statement: String,
}

/// Which side the evaluator found more persuasive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pro,
    Con,
    #[default]
    Undetermined,
}

impl Verdict {
    /// Map free-text model output onto the closed verdict set. Anything
    /// that is not recognizably one side is `Undetermined`.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "pro" => Verdict::Pro,
            "con" => Verdict::Con,
            _ => Verdict::Undetermined,
        }
    }
}

/// Moderator evaluation of the whole exchange. Derived, not persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default)]
    pub overall: String,
    #[serde(default)]
    pub pro: String,
    #[serde(default)]
    pub con: String,
    #[serde(default)]
    pub verdict: Verdict,
    #[serde(default)]
    pub reasoning: String,
}
