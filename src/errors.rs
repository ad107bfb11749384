//! HTTP-facing error type. Every failure leaves the API as `{ "error": "..." }`.

use axum::{
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};

use crate::protocol::ErrorOut;
use crate::session::SessionRefusal;

pub const KEY_NOT_FOUND: &str = "Gemini API key not found.";
pub const QUIZ_GENERATION_FAILED: &str = "Failed to generate quiz. Please check the API key and try again.";
pub const QUIZ_PARSE_FAILED: &str = "Failed to parse the quiz data from the API.";
pub const CHAT_FAILED: &str = "Failed to get response from AI.";
pub const CHAT_UNREACHABLE: &str = "Failed to communicate with the AI service.";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),
  #[error("{0}")]
  NotFound(String),
  #[error("{0}")]
  Conflict(String),
  #[error("{0}")]
  BadGateway(String),
  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  pub fn bad_request(message: impl Into<String>) -> Self {
    ApiError::BadRequest(message.into())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
  }
}

impl From<SessionRefusal> for ApiError {
  fn from(refusal: SessionRefusal) -> Self {
    if refusal.is_bad_input() {
      ApiError::BadRequest(refusal.to_string())
    } else {
      ApiError::Conflict(refusal.to_string())
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    (status, Json(ErrorOut { error: self.to_string() })).into_response()
  }
}
