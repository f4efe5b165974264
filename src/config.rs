//! Loading tutor configuration (spoken prompts, quiz options and optional content tables) from TOML.
//!
//! See `TutorConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{info, error};

use crate::domain::{Fact, QuestionType, Template, TutoringStatement};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TutorConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub quiz: QuizConfig,
  /// A non-empty table replaces the built-in one.
  #[serde(default)]
  pub facts: Vec<Fact>,
  #[serde(default)]
  pub templates: Vec<Template>,
  #[serde(default)]
  pub statements: Vec<TutoringStatement>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
  /// Pool the shell draws the next question type from, uniformly.
  pub question_types: Vec<QuestionType>,
}

impl Default for QuizConfig {
  fn default() -> Self {
    Self {
      question_types: vec![QuestionType::TrueFalse, QuestionType::SelectPart, QuestionType::SelectValue],
    }
  }
}

/// Spoken texts used by the conversational shell. Any subset can be overridden in TOML.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub welcome: String,
  pub welcome_reprompt: String,
  pub goodbye: String,
  pub another_question: String,
  pub help_true_false: String,
  pub help_select_part: String,
  pub help_select_value: String,
  pub help_general: String,
  pub retry: String,
  pub failure: String,
  pub affirmation: String,
  pub feedback_intro: String,
  pub tutoring_more: String,
  pub tutoring_complete: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      welcome: "Welcome to the PLC counter instruction tutor. Ask me for a question by saying quiz me, or say teach me to learn about counters.".into(),
      welcome_reprompt: "Say quiz me, give me a question, or teach me.".into(),
      goodbye: "Thanks for practicing counter instructions. Have a nice day!".into(),
      another_question: "Do you want another question?".into(),
      help_true_false: "For a true or false question, reply with the word true or the word false.".into(),
      help_select_part: "For a which-instruction question, reply with CTU, CTD, or both.".into(),
      help_select_value: "For a short answer question, reply with the answer itself and I will check it.".into(),
      help_general: "Say quiz me for a question, teach me for a lesson, or how am I doing for feedback.".into(),
      retry: "I'm not sure what your answer is. Please try again.".into(),
      failure: "Sorry, something went wrong on my side. Please try again later.".into(),
      affirmation: "You have not missed any questions so far. Keep it up!".into(),
      feedback_intro: "Here is what to review.".into(),
      tutoring_more: "Say yes to continue the lesson.".into(),
      tutoring_complete: "That is everything I have to teach about counters. Say quiz me to test yourself.".into(),
    }
  }
}

/// Attempt to load `TutorConfig` from TUTOR_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_tutor_config_from_env() -> Option<TutorConfig> {
  let path = std::env::var("TUTOR_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<TutorConfig>(&s) {
      Ok(cfg) => {
        info!(target: "counter_tutor", %path, facts = cfg.facts.len(), templates = cfg.templates.len(), statements = cfg.statements.len(), "Loaded tutor config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "counter_tutor", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "counter_tutor", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
