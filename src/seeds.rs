//! Built-in reference content: the CTU/CTD fact table, question templates and tutoring statements.
//! Guarantees the tutor is useful without any external config.

use crate::domain::{Fact, Part, QuestionType, Template, TutoringStatement};

const BOTH: &[Part] = &[Part::Ctu, Part::Ctd];
const CTU: &[Part] = &[Part::Ctu];
const CTD: &[Part] = &[Part::Ctd];

// How an attribute reads inside a sentence; picks the template wording.
#[derive(Clone, Copy)]
enum Shape {
  Verb,
  Noun,
  Clause,
  Member,
}

struct Row {
  attribute: &'static str,
  level: i32,
  shape: Shape,
  facts: &'static [(&'static [Part], &'static str)],
  lesson: &'static str,
}

const ROWS: &[Row] = &[
  Row {
    attribute: "counts",
    level: 1,
    shape: Shape::Verb,
    facts: &[(CTU, "up"), (CTD, "down")],
    lesson: "A CTU instruction counts up, and a CTD instruction counts down.",
  },
  Row {
    attribute: "enable bit",
    level: 1,
    shape: Shape::Noun,
    facts: &[(CTU, "CU"), (CTD, "CD")],
    lesson: "The enable bit is CU for a CTU instruction and CD for a CTD instruction. It follows the rung condition.",
  },
  Row {
    attribute: "done bit",
    level: 1,
    shape: Shape::Noun,
    facts: &[(BOTH, "DN")],
    lesson: "Both counters use DN as the done bit.",
  },
  Row {
    attribute: "accumulated value word",
    level: 1,
    shape: Shape::Noun,
    facts: &[(BOTH, "ACC")],
    lesson: "The running count of either counter lives in its ACC word.",
  },
  Row {
    attribute: "preset value word",
    level: 1,
    shape: Shape::Noun,
    facts: &[(BOTH, "PRE")],
    lesson: "The target count of either counter lives in its PRE word.",
  },
  Row {
    attribute: "changes the accumulated value by",
    level: 2,
    shape: Shape::Verb,
    facts: &[(BOTH, "one")],
    lesson: "Each counted transition changes the accumulated value by exactly one.",
  },
  Row {
    attribute: "counts on",
    level: 2,
    shape: Shape::Verb,
    facts: &[(BOTH, "a false-to-true rung transition")],
    lesson: "Counters act only on a false-to-true rung transition, not while the rung stays true.",
  },
  Row {
    attribute: "DN bit is set",
    level: 2,
    shape: Shape::Clause,
    facts: &[(BOTH, "when the accumulated value is greater than or equal to the preset value")],
    lesson: "The DN bit is set when the accumulated value is greater than or equal to the preset value.",
  },
  Row {
    attribute: "DN bit is cleared",
    level: 2,
    shape: Shape::Clause,
    facts: &[(BOTH, "when the accumulated value is less than the preset value")],
    lesson: "The DN bit is cleared when the accumulated value drops below the preset value.",
  },
  Row {
    attribute: "overflow bit",
    level: 3,
    shape: Shape::Noun,
    facts: &[(CTU, "OV")],
    lesson: "Only the CTU instruction has an overflow bit, called OV.",
  },
  Row {
    attribute: "underflow bit",
    level: 3,
    shape: Shape::Noun,
    facts: &[(CTD, "UN")],
    lesson: "Only the CTD instruction has an underflow bit, called UN.",
  },
  Row {
    attribute: "overflow occurs",
    level: 3,
    shape: Shape::Clause,
    facts: &[(CTU, "when the accumulated value goes above 32767")],
    lesson: "A CTU overflows when its accumulated value goes above 32767.",
  },
  Row {
    attribute: "underflow occurs",
    level: 3,
    shape: Shape::Clause,
    facts: &[(CTD, "when the accumulated value goes below -32768")],
    lesson: "A CTD underflows when its accumulated value goes below -32768.",
  },
  Row {
    attribute: "is reset by",
    level: 3,
    shape: Shape::Verb,
    facts: &[(BOTH, "a RES instruction")],
    lesson: "A RES instruction with the same address resets a counter's accumulated value and status bits.",
  },
  Row {
    attribute: "status bits",
    level: 4,
    shape: Shape::Member,
    facts: &[(CTU, "CU"), (CTU, "OV"), (CTD, "CD"), (CTD, "UN"), (BOTH, "DN"), (BOTH, "UA")],
    lesson: "CTU status bits are CU, DN, OV and UA. CTD status bits are CD, DN, UN and UA.",
  },
  Row {
    attribute: "retains the accumulated value",
    level: 4,
    shape: Shape::Verb,
    facts: &[(BOTH, "when the rung goes false"), (BOTH, "through a power cycle")],
    lesson: "Counters are retentive: the accumulated value survives a false rung and a power cycle.",
  },
  Row {
    attribute: "can share an address with",
    level: 4,
    shape: Shape::Verb,
    facts: &[(CTU, "a CTD instruction"), (CTD, "a CTU instruction")],
    lesson: "A CTU and a CTD can share one counter address to build an up/down counter.",
  },
  Row {
    attribute: "data file type",
    level: 4,
    shape: Shape::Noun,
    facts: &[(BOTH, "C")],
    lesson: "On an SLC 500, counters live in a C data file such as C5.",
  },
];

/// The built-in (part, attribute, value) table, one fact per listed part.
pub fn seed_facts() -> Vec<Fact> {
  let mut out = Vec::new();
  for row in ROWS {
    for (parts, value) in row.facts {
      for part in parts.iter() {
        out.push(Fact {
          part: *part,
          attribute: row.attribute.to_string(),
          value: value.to_string(),
        });
      }
    }
  }
  out
}

/// Templates for every attribute: true/false and select-part at the attribute's level,
/// select-value for every attribute.
pub fn seed_templates() -> Vec<Template> {
  let mut out = Vec::new();
  for row in ROWS {
    let (true_false, select_part, select_value) = match row.shape {
      Shape::Verb => (
        "The {PART} instruction {ATTRIBUTE} {VALUE}.",
        "Which instruction {ATTRIBUTE} {VALUE}: CTU, CTD, or both?",
        "Complete the statement: the {PART} instruction {ATTRIBUTE} what?",
      ),
      Shape::Noun => (
        "The {ATTRIBUTE} of the {PART} instruction is {VALUE}.",
        "Which instruction has {VALUE} as its {ATTRIBUTE}: CTU, CTD, or both?",
        "What is the {ATTRIBUTE} of the {PART} instruction?",
      ),
      Shape::Clause => (
        "For the {PART} instruction, the {ATTRIBUTE} {VALUE}.",
        "For which instruction is it true that the {ATTRIBUTE} {VALUE}: CTU, CTD, or both?",
        "For the {PART} instruction, when is it true that the {ATTRIBUTE}?",
      ),
      Shape::Member => (
        "{VALUE} is one of the {ATTRIBUTE} of the {PART} instruction.",
        "Which instruction has {VALUE} among its {ATTRIBUTE}: CTU, CTD, or both?",
        "Name one of the {ATTRIBUTE} of the {PART} instruction.",
      ),
    };
    for (kind, text) in [
      (QuestionType::TrueFalse, true_false),
      (QuestionType::SelectPart, select_part),
      (QuestionType::SelectValue, select_value),
    ] {
      out.push(Template {
        kind,
        attribute: row.attribute.to_string(),
        level: row.level,
        text: text.to_string(),
      });
    }
  }
  out
}

/// Ordered teaching statements. Level 1 opens with an introduction; each attribute
/// then gets one statement at its difficulty level, which doubles as its feedback text.
pub fn seed_statements() -> Vec<TutoringStatement> {
  let mut out = vec![TutoringStatement {
    statement_level: 1,
    order_level: 1,
    attribute: None,
    text: "Counters are output instructions that count rung transitions. There are two: CTU counts up and CTD counts down.".into(),
  }];
  for row in ROWS {
    let statement_level = row.level as u32;
    let order_level = out.iter().filter(|s| s.statement_level == statement_level).count() as u32 + 1;
    out.push(TutoringStatement {
      statement_level,
      order_level,
      attribute: Some(row.attribute.to_string()),
      text: row.lesson.to_string(),
    });
  }
  out
}
