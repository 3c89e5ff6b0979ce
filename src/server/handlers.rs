// HTTP handlers for the debate API

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use super::error::AppError;
use super::AppState;
use crate::debate::{DebateRunner, DebateStyle, SequencerError, Side, SideSummary, Turn};
use crate::gemini::{GenerateReply, GenerationOptions};
use crate::prompt::{self, TurnPrompt};

const DEFAULT_PRO_CHARACTER: &str =
    "a systematic analyst who argues from structure and evidence";
const DEFAULT_CON_CHARACTER: &str =
    "a critical debater who sharply probes objections and weak points";

/// Built-in topics for the shuffle endpoint.
const SAMPLE_TOPICS: &[&str] = &[
    "Does AI take human jobs?",
    "Does social media connect society or divide it?",
    "Is universal basic income feasible?",
    "Should remote work be the standard?",
    "Should massive budgets be invested in space exploration?",
    "Can animal testing be ethically justified?",
];

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/topics/random", get(handle_random_topic))
        .route("/api/stances", post(handle_stances))
        .route("/api/debate/turn", post(handle_turn))
        .route("/api/debate/interject", post(handle_interject))
        .route("/api/moderator/summary", post(handle_summary))
        .route("/api/moderator/evaluate", post(handle_evaluate))
        .with_state(state)
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_random_topic() -> Json<Value> {
    let mut rng = SmallRng::from_entropy();
    let topic = SAMPLE_TOPICS[rng.gen_range(0..SAMPLE_TOPICS.len())];
    Json(json!({ "topic": topic }))
}

// ---------------------------------------------------------------------------
// Stance derivation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct StancesRequest {
    #[serde(default)]
    topic: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StancesResponse {
    pro_stance: String,
    con_stance: String,
}

/// Wire shape the stance prompt requests from the model.
#[derive(Debug, Deserialize)]
struct StancesWire {
    #[serde(default)]
    pro: String,
    #[serde(default)]
    con: String,
}

async fn handle_stances(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StancesRequest>,
) -> Result<Json<StancesResponse>, AppError> {
    let start = Instant::now();
    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(AppError::InvalidRequest(
            "Invalid or missing topic".to_string(),
        ));
    }
    state.require_credential()?;

    let prompt = prompt::stance_prompt(topic);
    let cancel = tokio_util::sync::CancellationToken::new();
    let reply = state
        .generator
        .generate(&prompt, &GenerationOptions::stances(), &cancel)
        .await;

    state.log_metric("/api/stances", topic, start, &reply);
    ensure_reply_ok(&reply)?;

    let stances: StancesWire = crate::extract::extract_into(&reply.text).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("stance response had no parseable JSON"))
    })?;

    Ok(Json(StancesResponse {
        pro_stance: stances.pro,
        con_stance: stances.con,
    }))
}

// ---------------------------------------------------------------------------
// Turn generation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TurnRequest {
    #[serde(default)]
    topic: String,
    side: Side,
    #[serde(default)]
    character: Option<String>,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    conversation_history: Option<Vec<Turn>>,
    #[serde(default)]
    debate_id: Option<String>,
    #[serde(default)]
    user_intervention: Option<String>,
    #[serde(default)]
    turn: Option<TurnMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TurnMeta {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    total: usize,
    #[serde(default)]
    is_final: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TurnResponse {
    text: String,
    debate_id: String,
}

async fn handle_turn(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let start = Instant::now();
    let topic = request.topic.trim().to_string();
    if topic.is_empty() {
        return Err(AppError::InvalidRequest("topic is required".to_string()));
    }
    if request.side == Side::User {
        return Err(AppError::InvalidRequest(
            "side must be pro or con; interjections go to /api/debate/interject".to_string(),
        ));
    }
    state.require_credential()?;

    let max_turns = state.config.debate.max_turns;
    if let Some(meta) = &request.turn {
        // The configured budget is authoritative; a mismatched client total
        // is logged and ignored.
        if meta.total != 0 && meta.total != max_turns {
            tracing::warn!(
                requested = meta.total,
                configured = max_turns,
                index = meta.index,
                is_final = meta.is_final,
                "client turn total differs from configured budget"
            );
        }
    }

    // Resolve the session: known debates restore their runner from the
    // stored transcript, new debates get a fresh one registered only after
    // the first turn persists.
    let (runner, stored_history, existing_id) = match &request.debate_id {
        Some(id) => {
            let turns = state
                .store
                .turns(id)
                .await?
                .ok_or_else(|| AppError::DebateNotFound(id.clone()))?;
            let generated = turns.iter().filter(|t| t.side != Side::User).count();
            let runner = state
                .sessions
                .get_or_restore(id, max_turns, generated)
                .map_err(|_| AppError::SessionsFull)?;
            (runner, Some(turns), Some(id.clone()))
        }
        None => {
            // Stateless variant: the client carries the history, so the
            // runner is seeded from its generated-turn count to keep parity.
            let generated = request
                .conversation_history
                .as_deref()
                .map(|turns| turns.iter().filter(|t| t.side != Side::User).count())
                .unwrap_or(0);
            (
                Arc::new(Mutex::new(DebateRunner::restore(max_turns, generated))),
                None,
                None,
            )
        }
    };

    // Claim the single-flight slot and get the token an interjection
    // cancels. The lock is dropped before the network call so interjections
    // can reach the runner while generation is in flight.
    let (side, token, is_final) = {
        let mut guard = runner.lock().await;
        let (side, token) = guard.begin_generation_for(request.side).map_err(map_sequencer)?;
        let is_final = guard.next_is_final();
        (side, token, is_final)
    };

    let history = stored_history
        .or(request.conversation_history)
        .unwrap_or_default();
    let intervention = request
        .user_intervention
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty());
    let character = request.character.as_deref().unwrap_or(match side {
        Side::Pro => DEFAULT_PRO_CHARACTER,
        _ => DEFAULT_CON_CHARACTER,
    });

    let prompt = TurnPrompt {
        topic: &topic,
        side,
        character,
        style: DebateStyle::parse(request.style.as_deref().unwrap_or("logical")),
        history: &history,
        intervention,
        is_final,
    }
    .compose();

    let reply = state
        .generator
        .generate(&prompt, &GenerationOptions::turn(), &token)
        .await;

    state.log_metric("/api/debate/turn", &topic, start, &reply);

    if reply.cancelled || !reply.ok {
        // Free the single-flight slot before reporting; a cancelled or
        // failed generation never becomes a transcript entry.
        runner.lock().await.generation_cancelled();
        return Err(reply_failure(&reply));
    }

    if reply.truncated() {
        tracing::warn!("turn response truncated at MAX_TOKENS, returning partial text");
    }

    let turn = {
        let mut guard = runner.lock().await;
        // An interjection may have cancelled the generation while the reply
        // was in transit; the late result is dropped, never appended.
        let Some(turn) = guard.commit_generated(&reply.text) else {
            return Err(AppError::Cancelled);
        };
        // No server-side typing animation; the state matters, the delay
        // does not.
        guard.finish_typing();
        turn
    };

    let debate_id = match existing_id {
        Some(id) => {
            state.store.append(&id, &turn).await?;
            id
        }
        None => {
            let id = state.store.create(&topic, &turn).await?;
            if let Err(e) = state.sessions.insert(&id, Arc::clone(&runner)) {
                // The transcript is durable either way; the runner will be
                // restored on the next request.
                tracing::warn!("could not register session {}: {}", id, e);
            }
            id
        }
    };

    Ok(Json(TurnResponse {
        text: reply.text,
        debate_id,
    }))
}

// ---------------------------------------------------------------------------
// Interjection
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InterjectRequest {
    #[serde(default)]
    debate_id: String,
    #[serde(default)]
    content: String,
}

async fn handle_interject(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InterjectRequest>,
) -> Result<Json<Value>, AppError> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::InvalidRequest("content is required".to_string()));
    }

    let turns = state
        .store
        .turns(&request.debate_id)
        .await?
        .ok_or_else(|| AppError::DebateNotFound(request.debate_id.clone()))?;
    let generated = turns.iter().filter(|t| t.side != Side::User).count();
    let runner = state
        .sessions
        .get_or_restore(&request.debate_id, state.config.debate.max_turns, generated)
        .map_err(|_| AppError::SessionsFull)?;

    // Cancels any in-flight generation; the turn counter is untouched, so
    // the interjection consumes no turn slot.
    let turn = runner
        .lock()
        .await
        .interject(content)
        .map_err(map_sequencer)?;
    state.store.append(&request.debate_id, &turn).await?;

    Ok(Json(json!({ "ok": true, "side": "user" })))
}

// ---------------------------------------------------------------------------
// Moderator
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRequest {
    #[serde(default)]
    debate_id: String,
    #[serde(default)]
    pro_character: Option<String>,
    #[serde(default)]
    con_character: Option<String>,
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    topic: String,
    pro: SideSummary,
    con: SideSummary,
}

async fn handle_summary(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError> {
    if request.debate_id.is_empty() {
        return Err(AppError::InvalidRequest("debateId is required".to_string()));
    }
    state.require_credential()?;

    let turns = state
        .store
        .turns(&request.debate_id)
        .await?
        .ok_or_else(|| AppError::DebateNotFound(request.debate_id.clone()))?;
    let topic = state
        .store
        .topic(&request.debate_id)
        .await?
        .unwrap_or_default();

    let (pro, con) = state
        .moderator()
        .summarize(
            request.pro_character.as_deref().unwrap_or(DEFAULT_PRO_CHARACTER),
            request.con_character.as_deref().unwrap_or(DEFAULT_CON_CHARACTER),
            &turns,
        )
        .await;

    Ok(Json(SummaryResponse { topic, pro, con }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateRequest {
    #[serde(default)]
    debate_id: String,
}

async fn handle_evaluate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<crate::debate::Evaluation>, AppError> {
    if request.debate_id.is_empty() {
        return Err(AppError::InvalidRequest("debateId is required".to_string()));
    }
    state.require_credential()?;

    let turns = state
        .store
        .turns(&request.debate_id)
        .await?
        .ok_or_else(|| AppError::DebateNotFound(request.debate_id.clone()))?;
    let topic = state
        .store
        .topic(&request.debate_id)
        .await?
        .unwrap_or_default();

    let moderator = state.moderator();
    let (pro_summary, con_summary) = moderator
        .summarize(DEFAULT_PRO_CHARACTER, DEFAULT_CON_CHARACTER, &turns)
        .await;
    let evaluation = moderator.evaluate(&topic, &pro_summary, &con_summary).await;

    Ok(Json(evaluation))
}

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

/// Translate a non-ok gateway reply into the error taxonomy.
fn reply_failure(reply: &GenerateReply) -> AppError {
    if reply.cancelled {
        return AppError::Cancelled;
    }
    if !(200..300).contains(&reply.status) {
        return AppError::Upstream {
            status: reply.status,
            details: reply.raw.clone(),
        };
    }
    // 2xx without usable text: distinguish truncation from an empty or
    // malformed candidate list.
    if reply.finish_reason.is_some() {
        AppError::NoText {
            finish_reason: reply.finish_reason.clone(),
        }
    } else {
        AppError::NoCandidates {
            raw: reply.raw.clone(),
        }
    }
}

fn ensure_reply_ok(reply: &GenerateReply) -> Result<(), AppError> {
    if reply.ok {
        Ok(())
    } else {
        Err(reply_failure(reply))
    }
}

fn map_sequencer(error: SequencerError) -> AppError {
    match error {
        SequencerError::Complete => {
            AppError::Conflict("debate is complete, no further generation permitted".to_string())
        }
        other => AppError::Conflict(other.to_string()),
    }
}
