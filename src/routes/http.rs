//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, http::StatusCode, Json, response::{IntoResponse, Response}};
use tracing::{info, instrument};

use crate::error::TutorError;
use crate::protocol::*;
use crate::state::AppState;
use crate::logic::*;

/// Maps core errors onto HTTP statuses with a JSON body.
pub struct ApiError(pub TutorError);

impl From<TutorError> for ApiError {
  fn from(e: TutorError) -> Self { ApiError(e) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self.0 {
      TutorError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      TutorError::NotFound { .. } => StatusCode::NOT_FOUND,
      TutorError::UnexpectedIntent { .. } => StatusCode::CONFLICT,
      TutorError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
      TutorError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    tracing::warn!(target: "counter_tutor", %status, error = %self.0, "Request failed");
    (status, Json(ErrorOut { error: self.0.to_string() })).into_response()
  }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state), fields(user_id = %body.user_id))]
pub async fn http_post_user(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UserIn>,
) -> ApiResult<crate::domain::UserRecord> {
  Ok(Json(state.ensure_user(&body.user_id).await?))
}

/// One conversational turn. Configuration/store failures become the spoken
/// failure message; an intent that does not fit the stage is a 409.
#[instrument(level = "info", skip(state, body), fields(user_id = %body.user_id, intent = body.intent.name()))]
pub async fn http_post_turn(
  State(state): State<Arc<AppState>>,
  Json(body): Json<TurnIn>,
) -> ApiResult<SpeechResponse> {
  match handle_turn(&state, &body.user_id, body.intent, body.session).await {
    Ok(resp) => Ok(Json(resp)),
    Err(e @ TutorError::UnexpectedIntent { .. }) => Err(e.into()),
    Err(e) => Ok(Json(failure_response(&state, &e))),
  }
}

#[instrument(level = "info", skip(state), fields(user_id = %body.user_id))]
pub async fn http_post_question(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UserIn>,
) -> ApiResult<QuestionOut> {
  let (level, question) = next_question(&state, &body.user_id).await?;
  info!(target: "tutor", user_id = %body.user_id, level, kind = %question.kind(), "HTTP question served");
  Ok(Json(QuestionOut { level, question }))
}

#[instrument(level = "info", skip(state, body), fields(user_id = %body.user_id, answer_len = body.answer.len()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswerIn>,
) -> ApiResult<crate::tracker::Verdict> {
  let verdict = answer_question(&state, &body.user_id, &body.question, &body.answer).await?;
  info!(target: "tutor", user_id = %body.user_id, correct = verdict.correct, "HTTP answer evaluated");
  Ok(Json(verdict))
}

#[instrument(level = "info", skip(state), fields(user_id = %q.user_id))]
pub async fn http_get_feedback(
  State(state): State<Arc<AppState>>,
  Query(q): Query<UserQuery>,
) -> ApiResult<crate::tracker::Feedback> {
  Ok(Json(feedback(&state, &q.user_id).await?))
}

#[instrument(level = "info", skip(state), fields(user_id = %body.user_id))]
pub async fn http_post_tutor_next(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UserIn>,
) -> ApiResult<crate::tutoring::TutorStep> {
  Ok(Json(tutor_next(&state, &body.user_id).await?))
}

#[instrument(level = "info", skip(state), fields(user_id = %body.user_id))]
pub async fn http_post_level(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UserIn>,
) -> ApiResult<LevelOut> {
  Ok(Json(LevelOut { level: refresh_level(&state, &body.user_id).await? }))
}

#[instrument(level = "info", skip(state), fields(user_id = %body.user_id))]
pub async fn http_post_reset(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UserIn>,
) -> ApiResult<ResetOut> {
  reset_user(&state, &body.user_id).await?;
  Ok(Json(ResetOut { ok: true }))
}
