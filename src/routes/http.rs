//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{rejection::JsonRejection, Path, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::achievements::AchievementId;
use crate::errors::ApiError;
use crate::logic::*;
use crate::protocol::*;
use crate::session::{QuizSession, SessionRefusal};
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

#[instrument(level = "info")]
pub async fn http_root() -> &'static str {
  "EduBot - AI-Powered Educational Assistant Backend is running!"
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_generate_quiz(
  State(state): State<Arc<AppState>>,
  body: Result<Json<GenerateQuizIn>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
  let Json(body) = body?;
  let req = validate_quiz_request(&body)?;
  let questions = generate_quiz(&state, &req).await?;
  info!(target: "quiz", topic = %req.topic, count = questions.len(), "HTTP quiz served");
  Ok(Json(questions))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_chatbot(
  State(state): State<Arc<AppState>>,
  body: Result<Json<ChatIn>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
  let Json(body) = body?;
  let message = validate_chat_request(&body)?;
  let response = chat_reply(&state, &message).await?;
  info!(target: "edubot_backend", response_len = response.len(), "HTTP chat reply served");
  Ok(Json(ChatOut { response }))
}

// -------- Sessions --------

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_session(
  State(state): State<Arc<AppState>>,
  body: Result<Json<GenerateQuizIn>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
  let Json(body) = body?;
  let req = validate_quiz_request(&body)?;
  let (session_id, session) = start_session(&state, &req).await?;
  Ok((StatusCode::CREATED, Json(SessionCreatedOut { session_id, session: to_view(&session) })))
}

fn not_found(id: &str) -> ApiError {
  ApiError::NotFound(format!("Unknown session: {id}"))
}

/// Apply one engine operation and answer with the updated view.
async fn mutate_session(
  state: &AppState,
  id: &str,
  op: impl FnOnce(&mut QuizSession) -> Result<(), SessionRefusal>,
) -> ApiResult<Json<SessionView>> {
  let view = state
    .with_session(id, |s| op(s).map(|_| to_view(s)))
    .await
    .ok_or_else(|| not_found(id))??;
  Ok(Json(view))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> ApiResult<Json<SessionView>> {
  let view = state.with_session(&id, |s| to_view(s)).await.ok_or_else(|| not_found(&id))?;
  Ok(Json(view))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> ApiResult<StatusCode> {
  if state.remove_session(&id).await {
    info!(target: "quiz", session_id = %id, "Session discarded");
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(not_found(&id))
  }
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_select(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  body: Result<Json<SelectIn>, JsonRejection>,
) -> ApiResult<Json<SessionView>> {
  let Json(body) = body?;
  mutate_session(&state, &id, |s| s.select_option(body.index, &body.option)).await
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_hint(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  body: Result<Json<IndexIn>, JsonRejection>,
) -> ApiResult<Json<SessionView>> {
  let Json(body) = body?;
  mutate_session(&state, &id, |s| s.reveal_hint(body.index).map(|_| ())).await
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_eliminate(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  body: Result<Json<IndexIn>, JsonRejection>,
) -> ApiResult<Json<SessionView>> {
  let Json(body) = body?;
  mutate_session(&state, &id, |s| s.eliminate_two(body.index, &mut rand::thread_rng()).map(|_| ())).await
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_skip(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  body: Result<Json<IndexIn>, JsonRejection>,
) -> ApiResult<Json<SessionView>> {
  let Json(body) = body?;
  mutate_session(&state, &id, |s| s.skip_question(body.index)).await
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
  let (tracker, ledger) = (state.tracker(), state.ledger());
  let summary = state
    .with_session(&id, |s| s.submit(&mut rand::thread_rng(), &tracker, &ledger))
    .await
    .ok_or_else(|| not_found(&id))?;
  info!(target: "quiz", session_id = %id, percentage = summary.score.percentage, "HTTP submit evaluated");
  Ok(Json(summary))
}

// -------- Achievements & suggestions --------

#[instrument(level = "info", skip(state))]
pub async fn http_get_achievements(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let list: Vec<AchievementOut> = state
    .ledger()
    .snapshot()
    .into_iter()
    .map(|(id, unlocked): (AchievementId, bool)| AchievementOut {
      id,
      name: id.name(),
      description: id.description(),
      unlocked,
    })
    .collect();
  Json(list)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_suggestion(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(SuggestionOut { topic: state.tracker().suggest_topic() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_performance(State(state): State<Arc<AppState>>) -> StatusCode {
  state.tracker().clear();
  info!(target: "edubot_backend", "Performance log cleared");
  StatusCode::NO_CONTENT
}
