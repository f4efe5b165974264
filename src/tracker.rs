//! Proficiency tracking: per-attribute correct/incorrect tallies, answer grading and
//! weakest-attribute feedback.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::{AcceptedAnswer, Attribute, CounterBucket, PartAnswer, Question};
use crate::error::{Result, TutorError};
use crate::store::{TutoringContent, UserStore};
use crate::util::normalize_answer;

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Verdict {
  pub correct: bool,
  /// The accepted answer, as it would be spoken.
  pub expected: String,
  /// True statement or correction; empty when there is nothing to add.
  pub explanation: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Feedback {
  /// No incorrect answers recorded.
  AllClear { message: String },
  /// Every attribute tied at the highest incorrect count, with its review text.
  NeedsReview { misses: u64, attributes: BTreeMap<Attribute, String> },
}

#[instrument(level = "debug", skip(users))]
pub async fn record_correct(users: &dyn UserStore, user_id: &str, attribute: &str) -> Result<u64> {
  users.increment_counter(user_id, CounterBucket::Correct, attribute).await
}

#[instrument(level = "debug", skip(users))]
pub async fn record_incorrect(users: &dyn UserStore, user_id: &str, attribute: &str) -> Result<u64> {
  users.increment_counter(user_id, CounterBucket::Incorrect, attribute).await
}

/// Pure check of a learner answer against a question. Unrecognized input is a
/// validation error so the caller can re-prompt without scoring.
pub fn check_answer(question: &Question, answer: &str) -> Result<Verdict> {
  let given = normalize_answer(answer);
  if given.is_empty() {
    return Err(TutorError::Validation("empty answer".into()));
  }

  match &question.answer {
    AcceptedAnswer::TrueFalse { truth, statement } => {
      let said = match given.as_str() {
        "true" => true,
        "false" => false,
        _ => return Err(TutorError::Validation(format!("expected true or false, got '{given}'"))),
      };
      Ok(Verdict {
        correct: said == *truth,
        expected: if *truth { "True".into() } else { "False".into() },
        explanation: statement.clone().unwrap_or_default(),
      })
    }
    AcceptedAnswer::SelectPart { part } => {
      let said = PartAnswer::parse(&given)
        .ok_or_else(|| TutorError::Validation(format!("expected CTU, CTD or both, got '{given}'")))?;
      let explanation = match part {
        PartAnswer::Both => "Both instructions share this.".to_string(),
        p => format!("Only the {} instruction has this.", p.as_str()),
      };
      Ok(Verdict { correct: said == *part, expected: part.as_str().to_string(), explanation })
    }
    AcceptedAnswer::SelectValue { values } => Ok(Verdict {
      correct: values.contains(&given),
      expected: values.join(" or "),
      explanation: String::new(),
    }),
  }
}

/// Grade an answer and record the outcome for the question's attribute.
/// Nothing is written when the answer cannot be graded.
#[instrument(level = "info", skip(users, question, answer), fields(attribute = %question.attribute, kind = %question.kind(), answer_len = answer.len()))]
pub async fn grade(users: &dyn UserStore, user_id: &str, question: &Question, answer: &str) -> Result<Verdict> {
  let rec = users.get(user_id).await?;
  let verdict = check_answer(question, answer)?;
  // The question travels through the client; a stale or forged attribute is not gradable.
  if !rec.correct_by_attribute.contains_key(&question.attribute) {
    return Err(TutorError::Validation(format!("unknown attribute '{}'", question.attribute)));
  }
  let tally = if verdict.correct {
    record_correct(users, user_id, &question.attribute).await?
  } else {
    record_incorrect(users, user_id, &question.attribute).await?
  };
  info!(target: "tutor", %user_id, attribute = %question.attribute, correct = verdict.correct, tally, "Answer graded");
  Ok(verdict)
}

/// Attributes with the most incorrect answers, all ties included.
#[instrument(level = "info", skip(users, content, affirmation))]
pub async fn worst_attributes(
  users: &dyn UserStore,
  content: &dyn TutoringContent,
  user_id: &str,
  affirmation: &str,
) -> Result<Feedback> {
  let rec = users.get(user_id).await?;
  let misses = rec.incorrect_by_attribute.values().copied().max().unwrap_or(0);
  if misses == 0 {
    return Ok(Feedback::AllClear { message: affirmation.to_string() });
  }

  let mut attributes = BTreeMap::new();
  for (attribute, _) in rec.incorrect_by_attribute.iter().filter(|(_, n)| **n == misses) {
    let statements = content.statements_for(attribute).await?;
    let text = if statements.is_empty() {
      format!("Review the {attribute} of the CTU and CTD instructions.")
    } else {
      statements.join(" ")
    };
    attributes.insert(attribute.clone(), text);
  }
  Ok(Feedback::NeedsReview { misses, attributes })
}
