//! Domain models: parts, facts, templates, tutoring statements, user records and questions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Names one testable fact about a counter instruction (e.g. "counts", "DN bit is set").
pub type Attribute = String;

pub const MIN_LEVEL: i32 = 1;
pub const MAX_LEVEL: i32 = 4;

/// The two counter instruction variants.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Part {
  Ctu,
  Ctd,
}

impl Part {
  pub const ALL: [Part; 2] = [Part::Ctu, Part::Ctd];

  pub fn as_str(&self) -> &'static str {
    match self {
      Part::Ctu => "CTU",
      Part::Ctd => "CTD",
    }
  }
}

impl fmt::Display for Part {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Ground-truth (part, attribute, value) triple. Several facts may share a (part, attribute).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fact {
  pub part: Part,
  pub attribute: Attribute,
  pub value: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
  TrueFalse,
  SelectPart,
  SelectValue,
}

impl QuestionType {
  pub fn as_str(&self) -> &'static str {
    match self {
      QuestionType::TrueFalse => "true_false",
      QuestionType::SelectPart => "select_part",
      QuestionType::SelectValue => "select_value",
    }
  }
}

impl fmt::Display for QuestionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Question template with `{PART}`, `{ATTRIBUTE}` and `{VALUE}` slots.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Template {
  pub kind: QuestionType,
  pub attribute: Attribute,
  pub level: i32,
  pub text: String,
}

/// One teaching fragment. (statement_level, order_level) gives the total order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TutoringStatement {
  pub statement_level: u32,
  pub order_level: u32,
  #[serde(default)]
  pub attribute: Option<Attribute>,
  pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterBucket {
  Correct,
  Incorrect,
}

/// Durable per-learner state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
  pub user_id: String,
  /// Kept signed so that out-of-range stored values can still be clamped back.
  pub level: i32,
  pub correct_by_attribute: BTreeMap<Attribute, u64>,
  pub incorrect_by_attribute: BTreeMap<Attribute, u64>,
  pub previous_total_correct: u64,
  pub previous_total_incorrect: u64,
  pub tutoring_statement_level: u32,
  pub tutoring_order_level: u32,
}

impl UserRecord {
  /// Creation state: level 1, every known attribute at zero, cursor at (1, 1).
  pub fn new<'a>(user_id: &str, attributes: impl IntoIterator<Item = &'a Attribute>) -> Self {
    let zeroed: BTreeMap<Attribute, u64> = attributes.into_iter().map(|a| (a.clone(), 0)).collect();
    Self {
      user_id: user_id.to_string(),
      level: MIN_LEVEL,
      correct_by_attribute: zeroed.clone(),
      incorrect_by_attribute: zeroed,
      previous_total_correct: 0,
      previous_total_incorrect: 0,
      tutoring_statement_level: 1,
      tutoring_order_level: 1,
    }
  }

  pub fn total_correct(&self) -> u64 {
    self.correct_by_attribute.values().sum()
  }

  pub fn total_incorrect(&self) -> u64 {
    self.incorrect_by_attribute.values().sum()
  }

  pub fn counters_mut(&mut self, bucket: CounterBucket) -> &mut BTreeMap<Attribute, u64> {
    match bucket {
      CounterBucket::Correct => &mut self.correct_by_attribute,
      CounterBucket::Incorrect => &mut self.incorrect_by_attribute,
    }
  }
}

/// Answer to a select-part question: one instruction, or both of them.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartAnswer {
  Ctu,
  Ctd,
  Both,
}

impl PartAnswer {
  pub fn as_str(&self) -> &'static str {
    match self {
      PartAnswer::Ctu => "CTU",
      PartAnswer::Ctd => "CTD",
      PartAnswer::Both => "Both",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_lowercase().as_str() {
      "ctu" | "count up" => Some(PartAnswer::Ctu),
      "ctd" | "count down" => Some(PartAnswer::Ctd),
      "both" => Some(PartAnswer::Both),
      _ => None,
    }
  }
}

impl From<Part> for PartAnswer {
  fn from(p: Part) -> Self {
    match p {
      Part::Ctu => PartAnswer::Ctu,
      Part::Ctd => PartAnswer::Ctd,
    }
  }
}

/// What the learner must say to be graded correct.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AcceptedAnswer {
  /// `statement` is the rendered text when true, or the nearest valid statement when false.
  TrueFalse { truth: bool, statement: Option<String> },
  SelectPart { part: PartAnswer },
  /// Lower-cased literal values.
  SelectValue { values: Vec<String> },
}

/// Ephemeral generated question, carried by the client between generate and grade.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
  pub id: String,
  pub prompt: String,
  pub attribute: Attribute,
  pub answer: AcceptedAnswer,
}

impl Question {
  pub fn kind(&self) -> QuestionType {
    match self.answer {
      AcceptedAnswer::TrueFalse { .. } => QuestionType::TrueFalse,
      AcceptedAnswer::SelectPart { .. } => QuestionType::SelectPart,
      AcceptedAnswer::SelectValue { .. } => QuestionType::SelectValue,
    }
  }
}
