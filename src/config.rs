//! Loading prompt configuration from TOML.
//!
//! See `AppConfig` and `Prompts` for the expected schema. Every field is optional;
//! anything missing falls back to the built-in defaults.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompt templates sent to the completion API.
///
/// Placeholders:
///   quiz_template : {topic}, {num_questions}, {difficulty}
///   chat_template : {message}
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub quiz_template: String,
  pub chat_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_template: r#"Generate a multiple-choice quiz on the topic of "{topic}" with {num_questions} questions of {difficulty} difficulty.
Each question should have four options and one correct answer.

IMPORTANT: You must return the quiz as a valid JSON array. Each object in the array represents a question and MUST have the following structure: { "question": "...", "options": [...], "answer": "...", "hint": "...", "explanation": "..." }.
The "options" array must contain exactly four distinct strings and "answer" must be exactly one of them.

Here is an example of the required format for a single question object:
{
  "question": "What is the powerhouse of the cell?",
  "options": ["Nucleus", "Ribosome", "Mitochondrion", "Golgi apparatus"],
  "answer": "Mitochondrion",
  "hint": "This organelle generates most of the cell's supply of adenosine triphosphate (ATP).",
  "explanation": "The mitochondrion is called the powerhouse of the cell because it produces most of the ATP the cell uses for chemical energy."
}

Now generate the full quiz with {num_questions} questions in a single JSON array. Do not include any text, markdown, or any other characters outside of the JSON array itself."#
        .into(),
      chat_template: "You are a helpful learning assistant. Please answer the following question. Use markdown for formatting, including paragraphs, bullet points, and code blocks where appropriate: {message}".into(),
    }
  }
}

/// Attempt to load `AppConfig` from EDUBOT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("EDUBOT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "edubot_backend", %path, "Loaded prompt config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "edubot_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "edubot_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
