// Moderator reductions over the stored transcript
//
// Two independent derivations: a per-side five-field summary and an overall
// evaluation with a constrained verdict. Both are pure functions of
// persisted state plus model nondeterminism, and both degrade to
// empty-but-well-typed structures on any gateway or parse failure — a
// moderator that cannot parse the model must never fail the request.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::debate::{Evaluation, Side, SideSummary, Turn, Verdict};
use crate::extract::extract_into;
use crate::gemini::{GenerationOptions, TextGenerator};
use crate::prompt;

/// Wire shape the evaluation prompt asks the model for; verdict arrives as
/// free text and is coerced onto the closed set.
#[derive(Debug, Default, serde::Deserialize)]
struct RawEvaluation {
    #[serde(default)]
    overall: String,
    #[serde(default)]
    pro: String,
    #[serde(default)]
    con: String,
    #[serde(default)]
    verdict: String,
    #[serde(default)]
    reasoning: String,
}

pub struct Moderator {
    generator: Arc<dyn TextGenerator>,
}

impl Moderator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Summarize one side's case from the full transcript. Empty default on
    /// any failure.
    pub async fn summarize_side(
        &self,
        side: Side,
        character: &str,
        turns: &[Turn],
    ) -> SideSummary {
        let statements: Vec<String> = turns
            .iter()
            .filter(|turn| turn.side == side)
            .map(|turn| turn.content.clone())
            .collect();

        let prompt = prompt::side_summary_prompt(side, character, &statements);
        let cancel = CancellationToken::new();
        let reply = self
            .generator
            .generate(&prompt, &GenerationOptions::moderator(), &cancel)
            .await;

        if !reply.ok {
            tracing::warn!(%side, status = reply.status, "side summary generation failed");
            return SideSummary::default();
        }

        extract_into::<SideSummary>(&reply.text).unwrap_or_else(|| {
            tracing::warn!(%side, "side summary parse failed, returning defaults");
            SideSummary::default()
        })
    }

    /// Summaries for both sides, generated concurrently.
    pub async fn summarize(
        &self,
        pro_character: &str,
        con_character: &str,
        turns: &[Turn],
    ) -> (SideSummary, SideSummary) {
        tokio::join!(
            self.summarize_side(Side::Pro, pro_character, turns),
            self.summarize_side(Side::Con, con_character, turns),
        )
    }

    /// Judge the exchange from the two side summaries. On failure the
    /// verdict is `Undetermined` with empty assessments.
    pub async fn evaluate(
        &self,
        topic: &str,
        pro_summary: &SideSummary,
        con_summary: &SideSummary,
    ) -> Evaluation {
        let prompt = prompt::evaluation_prompt(
            topic,
            &render_summary(pro_summary),
            &render_summary(con_summary),
        );
        let cancel = CancellationToken::new();
        let reply = self
            .generator
            .generate(&prompt, &GenerationOptions::moderator(), &cancel)
            .await;

        if !reply.ok {
            tracing::warn!(status = reply.status, "evaluation generation failed");
            return Evaluation::default();
        }

        let raw = extract_into::<RawEvaluation>(&reply.text).unwrap_or_else(|| {
            tracing::warn!("evaluation parse failed, returning defaults");
            RawEvaluation::default()
        });

        Evaluation {
            overall: raw.overall,
            pro: raw.pro,
            con: raw.con,
            verdict: Verdict::parse(&raw.verdict),
            reasoning: raw.reasoning,
        }
    }
}

fn render_summary(summary: &SideSummary) -> String {
    format!(
        "core claim: {}\nmain argument: {}\nsupporting example: {}\nclosing statement: {}",
        summary.core_claim,
        summary.main_argument,
        summary.supporting_example,
        summary.closing_statement
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::GenerateReply;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted generator: returns canned replies in order.
    struct ScriptedGenerator {
        replies: Mutex<Vec<GenerateReply>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<GenerateReply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
            })
        }

        fn ok(text: &str) -> GenerateReply {
            GenerateReply {
                ok: true,
                status: 200,
                text: text.to_string(),
                finish_reason: Some("STOP".to_string()),
                cancelled: false,
                raw: serde_json::Value::Null,
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
            _cancel: &CancellationToken,
        ) -> GenerateReply {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                GenerateReply::transport_failure("script exhausted".into())
            } else {
                replies.remove(0)
            }
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn sample_turns() -> Vec<Turn> {
        vec![
            Turn::new(Side::Pro, "remote work boosts productivity"),
            Turn::new(Side::Con, "remote work erodes collaboration"),
            Turn::new(Side::User, "what about junior staff?"),
        ]
    }

    #[tokio::test]
    async fn test_summarize_side_parses_model_json() {
        let generator = ScriptedGenerator::new(vec![ScriptedGenerator::ok(
            r#"Here you go: {"label": "Pro", "coreClaim": "productivity wins", "mainArgument": "fewer interruptions", "supportingExample": "2020 studies", "closingStatement": "make it standard"}"#,
        )]);
        let moderator = Moderator::new(generator);

        let summary = moderator
            .summarize_side(Side::Pro, "analyst", &sample_turns())
            .await;
        assert_eq!(summary.core_claim, "productivity wins");
        assert_eq!(summary.closing_statement, "make it standard");
    }

    #[tokio::test]
    async fn test_summarize_side_defaults_on_garbage() {
        let generator =
            ScriptedGenerator::new(vec![ScriptedGenerator::ok("not json in any form")]);
        let moderator = Moderator::new(generator);

        let summary = moderator
            .summarize_side(Side::Con, "critic", &sample_turns())
            .await;
        assert_eq!(summary, SideSummary::default());
    }

    #[tokio::test]
    async fn test_summarize_side_defaults_on_gateway_failure() {
        let generator = ScriptedGenerator::new(vec![GenerateReply::transport_failure(
            "connection refused".into(),
        )]);
        let moderator = Moderator::new(generator);

        let summary = moderator
            .summarize_side(Side::Pro, "analyst", &sample_turns())
            .await;
        assert_eq!(summary, SideSummary::default());
    }

    #[tokio::test]
    async fn test_evaluate_maps_verdict() {
        let generator = ScriptedGenerator::new(vec![ScriptedGenerator::ok(
            r#"{"overall": "solid debate", "pro": "clear", "con": "vague", "verdict": "Pro", "reasoning": "better evidence"}"#,
        )]);
        let moderator = Moderator::new(generator);

        let evaluation = moderator
            .evaluate("topic", &SideSummary::default(), &SideSummary::default())
            .await;
        assert_eq!(evaluation.verdict, Verdict::Pro);
        assert_eq!(evaluation.reasoning, "better evidence");
    }

    #[tokio::test]
    async fn test_evaluate_unknown_verdict_is_undetermined() {
        let generator = ScriptedGenerator::new(vec![ScriptedGenerator::ok(
            r#"{"overall": "ok", "pro": "a", "con": "b", "verdict": "tie, honestly", "reasoning": "even"}"#,
        )]);
        let moderator = Moderator::new(generator);

        let evaluation = moderator
            .evaluate("topic", &SideSummary::default(), &SideSummary::default())
            .await;
        assert_eq!(evaluation.verdict, Verdict::Undetermined);
    }

    #[tokio::test]
    async fn test_evaluate_defaults_on_failure() {
        let generator = ScriptedGenerator::new(vec![]);
        let moderator = Moderator::new(generator);

        let evaluation = moderator
            .evaluate("topic", &SideSummary::default(), &SideSummary::default())
            .await;
        assert_eq!(evaluation.verdict, Verdict::Undetermined);
        assert!(evaluation.overall.is_empty());
    }
}
