//! Error taxonomy shared by the core and the conversational shell.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TutorError {
  /// Missing or inconsistent seed content (empty template/fact pools). Never retried.
  #[error("Configuration error: {0}")]
  Configuration(String),

  /// The user record is absent; the shell creates users, the core never does.
  #[error("User record not found: {user_id}")]
  NotFound { user_id: String },

  /// Learner input that cannot be graded. Not a system fault.
  #[error("Unrecognized answer: {0}")]
  Validation(String),

  /// Raised by networked stores; the bundled in-memory store cannot fail this way.
  #[allow(dead_code)]
  #[error("Store unavailable: {0}")]
  StoreUnavailable(String),

  #[error("Intent '{intent}' is not valid at stage '{stage}'")]
  UnexpectedIntent { intent: String, stage: String },
}

impl TutorError {
  pub fn config(msg: impl Into<String>) -> Self {
    TutorError::Configuration(msg.into())
  }

  pub fn not_found(user_id: &str) -> Self {
    TutorError::NotFound { user_id: user_id.to_string() }
  }
}

pub type Result<T> = std::result::Result<T, TutorError>;
