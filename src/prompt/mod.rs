// Prompt composition for every Gemini call site
//
// Prompts are plain concatenated text: a rule block, a truncated recent
// history, the optional interjection, and a trailing cue. A hard character
// ceiling guards against request failures on runaway history — truncation
// is blunt and may cut mid-sentence, which is accepted.

use crate::debate::{DebateStyle, Side, Turn};

/// Hard ceiling on composed prompt length, in characters. Oversized prompts
/// cause upstream request failures, so we cut from the end.
pub const MAX_PROMPT_CHARS: usize = 8000;

/// Only the most recent turns are included; full history inflates latency
/// and timeouts without improving rebuttals.
pub const HISTORY_WINDOW: usize = 4;

/// Inputs for one debater turn prompt.
pub struct TurnPrompt<'a> {
    pub topic: &'a str,
    pub side: Side,
    pub character: &'a str,
    pub style: DebateStyle,
    pub history: &'a [Turn],
    pub intervention: Option<&'a str>,
    pub is_final: bool,
}

fn style_instruction(style: DebateStyle) -> &'static str {
    match style {
        DebateStyle::Emotional => {
            "Argue through empathy and emotion, drawing on human stories and emotive language."
        }
        DebateStyle::Logical => {
            "Argue through logic and evidence, using data, statistics and counterexamples systematically."
        }
        DebateStyle::Philosophical => {
            "Argue through philosophical questions and the exploration of values, thinking in depth."
        }
    }
}

fn stance_word(side: Side) -> &'static str {
    match side {
        Side::Pro => "in favor of",
        Side::Con => "against",
        Side::User => "moderating",
    }
}

impl TurnPrompt<'_> {
    /// Compose the full prompt, ceiling-enforced.
    pub fn compose(&self) -> String {
        let stance = stance_word(self.side);

        let mut prompt = format!(
            "You are a debater arguing {stance} the topic \"{topic}\".\n\n\
             Character: {character}\n\n\
             Debate style: {style}\n\n\
             Rules (follow strictly):\n\
             1. Answer in 2-3 sentences and at most 100 words; be very concise.\n\
             2. Skip filler and verbosity; deliver only the core argument.\n\
             3. Rebut or build on the previous speaker's point.\n\
             4. Cite 1-2 concrete pieces of evidence or examples only in your opening argument.\n\
             5. If no evidence is available and the claim stands on its own, omit it.\n\
             6. Hold your {stance_short} position consistently.\n\
             7. Minimize deliberation and get straight to the answer.",
            stance = stance,
            topic = self.topic,
            character = self.character,
            style = style_instruction(self.style),
            stance_short = stance,
        );

        if self.is_final {
            prompt.push_str(
                "\n8. This is the final turn: summarize your case and close with strong persuasion.",
            );
        }

        let start = self.history.len().saturating_sub(HISTORY_WINDOW);
        let recent = &self.history[start..];
        if !recent.is_empty() {
            prompt.push_str("\n\nConversation so far:\n");
            for turn in recent {
                prompt.push_str(turn.side.label());
                prompt.push_str(": ");
                prompt.push_str(&turn.content);
                prompt.push('\n');
            }
        }

        if let Some(intervention) = self.intervention {
            prompt.push_str("\n\nModerator interjection: ");
            prompt.push_str(intervention);
            prompt.push_str("\nAddress the interjection from your own position.");
        }

        prompt.push_str("\n\nIt is now your turn. Make your argument:");

        enforce_ceiling(prompt)
    }
}

/// Stance-derivation prompt: one short sentence per side, JSON only.
pub fn stance_prompt(topic: &str) -> String {
    let prompt = format!(
        "You are a debate analyst who distills the core contention of a topic.\n\
         For the topic below, define the pro side's and the con side's central claim,\n\
         each as one very concise sentence.\n\n\
         Return only JSON in exactly this shape:\n\
         {{\n  \"pro\": \"the pro side's central claim (one sentence)\",\n  \"con\": \"the con side's central claim (one sentence)\"\n}}\n\n\
         Example:\n\
         Topic: \"Does AI take human jobs?\"\n\
         {{\n  \"pro\": \"AI takes jobs away\",\n  \"con\": \"AI does not take jobs away\"\n}}\n\n\
         Topic: \"{topic}\""
    );
    enforce_ceiling(prompt)
}

/// Per-side summary prompt for the moderator. The model must answer with the
/// five-field JSON object only.
pub fn side_summary_prompt(side: Side, character: &str, statements: &[String]) -> String {
    let label = side.label();
    let body = if statements.is_empty() {
        "(no statements)".to_string()
    } else {
        statements.join("\n---\n")
    };
    let prompt = format!(
        "You are a debate moderator.\n\
         Below are the statements made by the {label} side.\n\
         Analyze them and summarize in the JSON shape below.\n\
         Output nothing but JSON.\n\n\
         {{\n  \"label\": \"{label} ({character})\",\n  \"coreClaim\": \"the side's central claim in at most 2 sentences\",\n  \"mainArgument\": \"the key reasoning or evidence in 2-3 sentences\",\n  \"supportingExample\": \"a concrete example in 1-2 sentences\",\n  \"closingStatement\": \"a one-sentence closing summary\"\n}}\n\n\
         Statements:\n{body}"
    );
    enforce_ceiling(prompt)
}

/// Evaluation prompt over both side summaries. Verdict is constrained to
/// the closed set; anything else is coerced downstream.
pub fn evaluation_prompt(topic: &str, pro_summary: &str, con_summary: &str) -> String {
    let prompt = format!(
        "You are a debate moderator judging the exchange on \"{topic}\".\n\
         Below are summaries of each side's case. Evaluate the debate and\n\
         answer in the JSON shape below. Output nothing but JSON.\n\n\
         {{\n  \"overall\": \"strengths, weaknesses and logical completeness of the debate, 3-4 sentences\",\n  \"pro\": \"clarity, evidence and examples of the pro side, 2-3 sentences\",\n  \"con\": \"clarity, evidence and examples of the con side, 2-3 sentences\",\n  \"verdict\": \"pro, con or undetermined - which side was more persuasive\",\n  \"reasoning\": \"justification for the verdict, 1-2 sentences\"\n}}\n\n\
         Pro summary:\n{pro_summary}\n\n\
         Con summary:\n{con_summary}"
    );
    enforce_ceiling(prompt)
}

/// Truncate from the end when the composed prompt exceeds the ceiling.
/// Counts chars, not bytes, so the cut never lands inside a code point.
fn enforce_ceiling(prompt: String) -> String {
    if prompt.chars().count() <= MAX_PROMPT_CHARS {
        return prompt;
    }
    tracing::warn!(
        "prompt exceeded {} chars, truncating from the end",
        MAX_PROMPT_CHARS
    );
    prompt.chars().take(MAX_PROMPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::Turn;

    fn base_prompt(history: &[Turn]) -> TurnPrompt<'_> {
        TurnPrompt {
            topic: "Should remote work be the standard?",
            side: Side::Pro,
            character: "a systematic analyst",
            style: DebateStyle::Logical,
            history,
            intervention: None,
            is_final: false,
        }
    }

    #[test]
    fn test_turn_prompt_contains_topic_and_rules() {
        let prompt = base_prompt(&[]).compose();
        assert!(prompt.contains("Should remote work be the standard?"));
        assert!(prompt.contains("at most 100 words"));
        assert!(prompt.ends_with("Make your argument:"));
    }

    #[test]
    fn test_final_turn_adds_closing_rule() {
        let mut input = base_prompt(&[]);
        assert!(!input.compose().contains("final turn"));
        input.is_final = true;
        assert!(input.compose().contains("final turn"));
    }

    #[test]
    fn test_history_window_keeps_last_four() {
        let history: Vec<Turn> = (0..6)
            .map(|i| Turn::new(Side::for_turn(i), format!("argument-{i}")))
            .collect();
        let prompt = base_prompt(&history).compose();
        assert!(!prompt.contains("argument-0"));
        assert!(!prompt.contains("argument-1"));
        for i in 2..6 {
            assert!(prompt.contains(&format!("argument-{i}")));
        }
    }

    #[test]
    fn test_intervention_included() {
        let mut input = base_prompt(&[]);
        input.intervention = Some("give a real-world example");
        let prompt = input.compose();
        assert!(prompt.contains("Moderator interjection: give a real-world example"));
    }

    #[test]
    fn test_ceiling_enforced_for_pathological_inputs() {
        let huge = "word ".repeat(10_000);
        let history: Vec<Turn> = (0..4).map(|i| Turn::new(Side::for_turn(i), huge.clone())).collect();
        let mut input = base_prompt(&history);
        input.intervention = Some(&huge);
        let prompt = input.compose();
        assert!(prompt.chars().count() <= MAX_PROMPT_CHARS);
    }

    #[test]
    fn test_ceiling_respects_char_boundaries() {
        // Multibyte content near the cut must not panic
        let huge = "토론 주제와 매우 긴 발언 ".repeat(2_000);
        let history = vec![Turn::new(Side::Pro, huge)];
        let prompt = base_prompt(&history).compose();
        assert!(prompt.chars().count() <= MAX_PROMPT_CHARS);
    }

    #[test]
    fn test_stance_prompt_mentions_topic_and_shape() {
        let prompt = stance_prompt("Is basic income feasible?");
        assert!(prompt.contains("Is basic income feasible?"));
        assert!(prompt.contains("\"pro\""));
        assert!(prompt.contains("\"con\""));
    }

    #[test]
    fn test_summary_prompt_handles_empty_statements() {
        let prompt = side_summary_prompt(Side::Con, "a critic", &[]);
        assert!(prompt.contains("(no statements)"));
        assert!(prompt.contains("coreClaim"));
    }
}
