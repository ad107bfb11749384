//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Validating quiz generation and chat requests
//!   - Building prompts from the configured templates
//!   - Calling Gemini and turning its text into validated questions
//!   - Creating sessions from freshly generated quizzes

use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{validate_questions, Difficulty, Question, Quiz};
use crate::errors::{ApiError, CHAT_FAILED, CHAT_UNREACHABLE, KEY_NOT_FOUND, QUIZ_GENERATION_FAILED, QUIZ_PARSE_FAILED};
use crate::gemini::GenerationError;
use crate::protocol::{ChatIn, GenerateQuizIn};
use crate::session::QuizSession;
use crate::state::AppState;
use crate::util::{fill_template, strip_code_fences, trunc_for_log};

/// A generation request that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizRequest {
  pub topic: String,
  pub num_questions: u64,
  pub difficulty: Difficulty,
}

/// JavaScript-style truthiness for the "field is present" check.
fn is_truthy(v: &Option<Value>) -> bool {
  match v {
    None | Some(Value::Null) => false,
    Some(Value::Bool(b)) => *b,
    Some(Value::String(s)) => !s.is_empty(),
    Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
    Some(_) => true,
  }
}

/// A JSON number with no fractional part, greater than zero.
fn positive_integer(v: &Value) -> Option<u64> {
  let Value::Number(n) = v else {
    return None;
  };
  if let Some(u) = n.as_u64() {
    return (u > 0).then_some(u);
  }
  let f = n.as_f64()?;
  (f > 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

pub fn validate_quiz_request(body: &GenerateQuizIn) -> Result<QuizRequest, ApiError> {
  if !is_truthy(&body.topic) || !is_truthy(&body.num_questions) || !is_truthy(&body.difficulty) {
    return Err(ApiError::bad_request("Missing required fields: topic, numQuestions, difficulty"));
  }

  let topic = match &body.topic {
    Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
    _ => return Err(ApiError::bad_request("Topic must be a non-empty string.")),
  };

  let num_questions = body
    .num_questions
    .as_ref()
    .and_then(positive_integer)
    .ok_or_else(|| ApiError::bad_request("Number of questions must be a positive integer."))?;

  let difficulty = body
    .difficulty
    .as_ref()
    .and_then(Value::as_str)
    .and_then(|s| s.parse::<Difficulty>().ok())
    .ok_or_else(|| ApiError::bad_request("Difficulty must be one of: easy, medium, hard."))?;

  Ok(QuizRequest { topic, num_questions, difficulty })
}

/// Any truthy message is accepted; whitespace is passed through as typed.
pub fn validate_chat_request(body: &ChatIn) -> Result<String, ApiError> {
  match &body.message {
    Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
    Some(other) if is_truthy(&body.message) => Ok(other.to_string()),
    _ => Err(ApiError::bad_request("Message is required.")),
  }
}

pub fn build_quiz_prompt(prompts: &Prompts, req: &QuizRequest) -> String {
  let n = req.num_questions.to_string();
  let difficulty = req.difficulty.to_string();
  fill_template(
    &prompts.quiz_template,
    &[("topic", req.topic.as_str()), ("num_questions", n.as_str()), ("difficulty", difficulty.as_str())],
  )
}

pub fn build_chat_prompt(prompts: &Prompts, message: &str) -> String {
  fill_template(&prompts.chat_template, &[("message", message)])
}

/// Turn raw model text into validated questions.
pub fn parse_quiz_text(text: &str) -> Result<Vec<Question>, GenerationError> {
  let cleaned = strip_code_fences(text);
  let questions: Vec<Question> =
    serde_json::from_str(&cleaned).map_err(|e| GenerationError::Parse(format!("invalid quiz JSON: {e}")))?;
  validate_questions(&questions).map_err(|e| GenerationError::Parse(e.to_string()))?;
  Ok(questions)
}

fn quiz_error_to_api(e: GenerationError) -> ApiError {
  match e {
    GenerationError::Parse(_) => ApiError::BadGateway(QUIZ_PARSE_FAILED.into()),
    _ => ApiError::BadGateway(QUIZ_GENERATION_FAILED.into()),
  }
}

/// The service answered with an error, or never answered usefully.
fn chat_error_to_api(e: GenerationError) -> ApiError {
  match e {
    GenerationError::Transport(_) => ApiError::BadGateway(CHAT_UNREACHABLE.into()),
    _ => ApiError::BadGateway(CHAT_FAILED.into()),
  }
}

#[instrument(level = "info", skip(state, req), fields(topic = %req.topic, n = req.num_questions, difficulty = %req.difficulty))]
pub async fn generate_quiz(state: &AppState, req: &QuizRequest) -> Result<Vec<Question>, ApiError> {
  let Some(gemini) = &state.gemini else {
    error!(target: "edubot_backend", "GEMINI_API_KEY not set; cannot generate quiz");
    return Err(ApiError::Internal(KEY_NOT_FOUND.into()));
  };

  let prompt = build_quiz_prompt(&state.prompts, req);
  let text = gemini.generate_text(&prompt).await.map_err(|e| {
    error!(target: "quiz", error = %e, "Quiz generation failed");
    quiz_error_to_api(e)
  })?;

  let questions = parse_quiz_text(&text).map_err(|e| {
    warn!(target: "quiz", error = %e, raw = %trunc_for_log(&text, 400), "Model output rejected");
    quiz_error_to_api(e)
  })?;

  if questions.len() as u64 != req.num_questions {
    warn!(target: "quiz", requested = req.num_questions, received = questions.len(), "Model returned a different question count");
  }
  info!(target: "quiz", topic = %req.topic, count = questions.len(), "Quiz generated");
  Ok(questions)
}

/// Generate a quiz and open a session for it. Nothing is stored unless generation succeeds.
#[instrument(level = "info", skip(state, req), fields(topic = %req.topic))]
pub async fn start_session(state: &AppState, req: &QuizRequest) -> Result<(String, QuizSession), ApiError> {
  let questions = generate_quiz(state, req).await?;
  let quiz = Quiz::new(req.topic.clone(), questions).map_err(|e| {
    error!(target: "quiz", error = %e, "Generated quiz failed validation");
    ApiError::BadGateway(QUIZ_PARSE_FAILED.into())
  })?;
  let session = QuizSession::new(quiz);
  let id = state.insert_session(session.clone()).await;
  info!(target: "quiz", session_id = %id, "Session started");
  Ok((id, session))
}

#[instrument(level = "info", skip(state, message), fields(message_len = message.len()))]
pub async fn chat_reply(state: &AppState, message: &str) -> Result<String, ApiError> {
  let Some(gemini) = &state.gemini else {
    error!(target: "edubot_backend", "GEMINI_API_KEY not set; cannot answer chat");
    return Err(ApiError::Internal(KEY_NOT_FOUND.into()));
  };
  let prompt = build_chat_prompt(&state.prompts, message);
  gemini.generate_text(&prompt).await.map_err(|e| {
    error!(target: "gemini", error = %e, "Chat reply failed");
    chat_error_to_api(e)
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn req(v: Value) -> GenerateQuizIn {
    serde_json::from_value(v).unwrap()
  }

  fn err_text(r: Result<QuizRequest, ApiError>) -> String {
    r.unwrap_err().to_string()
  }

  #[test]
  fn valid_request_is_normalized() {
    let r = validate_quiz_request(&req(json!({"topic": " Volcanoes ", "numQuestions": 5, "difficulty": "MEDIUM"}))).unwrap();
    assert_eq!(r, QuizRequest { topic: "Volcanoes".into(), num_questions: 5, difficulty: Difficulty::Medium });
  }

  #[test]
  fn missing_or_falsy_fields_are_reported_together() {
    let missing = "Missing required fields: topic, numQuestions, difficulty";
    assert_eq!(err_text(validate_quiz_request(&req(json!({"topic": "x", "numQuestions": 3})))), missing);
    assert_eq!(err_text(validate_quiz_request(&req(json!({"topic": "", "numQuestions": 3, "difficulty": "easy"})))), missing);
    assert_eq!(err_text(validate_quiz_request(&req(json!({"topic": "x", "numQuestions": 0, "difficulty": "easy"})))), missing);
  }

  #[test]
  fn field_type_errors() {
    assert_eq!(
      err_text(validate_quiz_request(&req(json!({"topic": "   ", "numQuestions": 3, "difficulty": "easy"})))),
      "Topic must be a non-empty string."
    );
    assert_eq!(
      err_text(validate_quiz_request(&req(json!({"topic": 42, "numQuestions": 3, "difficulty": "easy"})))),
      "Topic must be a non-empty string."
    );
    for n in [json!(2.5), json!(-1), json!("5")] {
      assert_eq!(
        err_text(validate_quiz_request(&req(json!({"topic": "x", "numQuestions": n, "difficulty": "easy"})))),
        "Number of questions must be a positive integer."
      );
    }
    assert_eq!(
      err_text(validate_quiz_request(&req(json!({"topic": "x", "numQuestions": 3, "difficulty": "insane"})))),
      "Difficulty must be one of: easy, medium, hard."
    );
  }

  #[test]
  fn integral_floats_and_large_counts_are_accepted() {
    let r = validate_quiz_request(&req(json!({"topic": "x", "numQuestions": 4.0, "difficulty": "hard"}))).unwrap();
    assert_eq!(r.num_questions, 4);
    let r = validate_quiz_request(&req(json!({"topic": "x", "numQuestions": 500, "difficulty": "hard"}))).unwrap();
    assert_eq!(r.num_questions, 500);
  }

  #[test]
  fn chat_message_is_required() {
    let body: ChatIn = serde_json::from_value(json!({"message": ""})).unwrap();
    assert!(validate_chat_request(&body).is_err());
    let body: ChatIn = serde_json::from_value(json!({})).unwrap();
    assert!(validate_chat_request(&body).is_err());
    let body: ChatIn = serde_json::from_value(json!({"message": null})).unwrap();
    assert!(validate_chat_request(&body).is_err());
    let body: ChatIn = serde_json::from_value(json!({"message": "What is a monad?"})).unwrap();
    assert_eq!(validate_chat_request(&body).unwrap(), "What is a monad?");
  }

  #[test]
  fn chat_message_is_passed_through_as_typed() {
    let body: ChatIn = serde_json::from_value(json!({"message": "   "})).unwrap();
    assert_eq!(validate_chat_request(&body).unwrap(), "   ");
    let body: ChatIn = serde_json::from_value(json!({"message": 42})).unwrap();
    assert_eq!(validate_chat_request(&body).unwrap(), "42");
  }

  #[test]
  fn chat_errors_distinguish_unreachable_service() {
    let upstream = GenerationError::Upstream { status: 503, message: "overloaded".into() };
    assert_eq!(chat_error_to_api(upstream).to_string(), CHAT_FAILED);
    let empty = GenerationError::EmptyResponse("SAFETY".into());
    assert_eq!(chat_error_to_api(empty).to_string(), CHAT_FAILED);
  }

  #[test]
  fn quiz_prompt_embeds_parameters() {
    let r = QuizRequest { topic: "Ancient Rome".into(), num_questions: 7, difficulty: Difficulty::Hard };
    let prompt = build_quiz_prompt(&Prompts::default(), &r);
    assert!(prompt.contains("\"Ancient Rome\""));
    assert!(prompt.contains("7 questions of hard difficulty"));
    assert!(!prompt.contains("{num_questions}"));
    assert!(prompt.contains("\"options\""));
  }

  #[test]
  fn quiz_prompt_keeps_topic_verbatim() {
    let r = QuizRequest { topic: "CSS {difficulty} selectors".into(), num_questions: 3, difficulty: Difficulty::Easy };
    let prompt = build_quiz_prompt(&Prompts::default(), &r);
    assert!(prompt.contains("on the topic of \"CSS {difficulty} selectors\" with 3 questions of easy difficulty."));
  }

  #[test]
  fn parses_fenced_model_output() {
    let text = "```json\n[{\"question\":\"Q\",\"options\":[\"a\",\"b\",\"c\",\"d\"],\"answer\":\"c\",\"hint\":\"h\",\"explanation\":\"e\"}]\n```";
    let qs = parse_quiz_text(text).unwrap();
    assert_eq!(qs.len(), 1);
    assert_eq!(qs[0].answer, "c");
  }

  #[test]
  fn rejects_prose_and_bad_shapes() {
    assert!(matches!(parse_quiz_text("Sure! Here is your quiz:"), Err(GenerationError::Parse(_))));
    let wrong_answer = r#"[{"question":"Q","options":["a","b","c","d"],"answer":"z"}]"#;
    assert!(matches!(parse_quiz_text(wrong_answer), Err(GenerationError::Parse(_))));
    assert!(matches!(parse_quiz_text("[]"), Err(GenerationError::Parse(_))));
  }
}
