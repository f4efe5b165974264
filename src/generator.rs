//! Question generation from templates and the fact table.
//!
//! True/false questions pair a random part with a random value drawn from *both*
//! parts' facts, so roughly half of them are false. Every question is checked
//! against the fact table before it is labelled, and a false statement carries the
//! closest valid statement as its correction.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::{AcceptedAnswer, Part, PartAnswer, Question, QuestionType};
use crate::error::{Result, TutorError};
use crate::store::{FactRepository, TemplateCatalog};
use crate::util::{closest_match, fill_template, normalize_answer};

/// Minimum similarity for a valid statement to be offered as the correction.
pub const SIMILARITY_CUTOFF: f32 = 0.8;

fn render(template: &str, part: Option<Part>, attribute: &str, value: &str) -> String {
  match part {
    Some(p) => fill_template(template, &[("PART", p.as_str()), ("ATTRIBUTE", attribute), ("VALUE", value)]),
    None => fill_template(template, &[("ATTRIBUTE", attribute), ("VALUE", value)]),
  }
}

fn pick_template<R: Rng>(pool: &[(String, String)], rng: &mut R, what: &str) -> Result<(String, String)> {
  pool
    .choose(rng)
    .cloned()
    .ok_or_else(|| TutorError::config(format!("no {what} templates available")))
}

fn random_part<R: Rng>(rng: &mut R) -> Part {
  Part::ALL[rng.gen_range(0..Part::ALL.len())]
}

fn new_question(prompt: String, attribute: String, answer: AcceptedAnswer) -> Question {
  Question { id: Uuid::new_v4().to_string(), prompt, attribute, answer }
}

/// Generate a true/false statement at `level`.
#[instrument(level = "debug", skip(facts, templates, rng))]
pub async fn generate_true_false<R: Rng + Send>(
  facts: &dyn FactRepository,
  templates: &dyn TemplateCatalog,
  level: i32,
  rng: &mut R,
) -> Result<Question> {
  let pool = templates.templates_at(QuestionType::TrueFalse, level).await?;
  let (attribute, template) = pick_template(&pool, rng, &format!("true/false level {level}"))?;

  let pairs = facts.facts_for(&attribute).await?;
  if pairs.is_empty() {
    return Err(TutorError::config(format!("no facts for attribute '{attribute}'")));
  }

  // Part and value are drawn independently; the value pool spans both parts.
  let part = random_part(rng);
  let value = pairs
    .choose(rng)
    .map(|(_, v)| v.clone())
    .ok_or_else(|| TutorError::config(format!("no values for attribute '{attribute}'")))?;
  let prompt = render(&template, Some(part), &attribute, &value);

  let truth = facts.values_for(part, &attribute).await?.contains(&value);
  let statement = if truth {
    Some(prompt.clone())
  } else {
    let valid: Vec<String> = pairs
      .iter()
      .map(|(p, v)| render(&template, Some(*p), &attribute, v))
      .collect();
    let correction = closest_match(&prompt, &valid, SIMILARITY_CUTOFF).map(str::to_string);
    if correction.is_none() {
      warn!(target: "tutor", %attribute, %part, "No valid statement close enough to offer as correction");
    }
    correction
  };

  debug!(target: "tutor", %attribute, %part, %truth, "Generated true/false question");
  Ok(new_question(prompt, attribute, AcceptedAnswer::TrueFalse { truth, statement }))
}

/// Generate a "which instruction ...?" question at `level`.
#[instrument(level = "debug", skip(facts, templates, rng))]
pub async fn generate_select_part<R: Rng + Send>(
  facts: &dyn FactRepository,
  templates: &dyn TemplateCatalog,
  level: i32,
  rng: &mut R,
) -> Result<Question> {
  let pool = templates.templates_at(QuestionType::SelectPart, level).await?;
  let (attribute, template) = pick_template(&pool, rng, &format!("select-part level {level}"))?;

  let pairs = facts.facts_for(&attribute).await?;
  let (anchor_part, anchor_value) = pairs
    .choose(rng)
    .cloned()
    .ok_or_else(|| TutorError::config(format!("no facts for attribute '{attribute}'")))?;

  let shared = pairs.iter().any(|(p, v)| *p != anchor_part && *v == anchor_value);
  let part = if shared { PartAnswer::Both } else { PartAnswer::from(anchor_part) };

  let prompt = render(&template, None, &attribute, &anchor_value);
  debug!(target: "tutor", %attribute, answer = part.as_str(), "Generated select-part question");
  Ok(new_question(prompt, attribute, AcceptedAnswer::SelectPart { part }))
}

/// Generate a short-answer question. Not levelled: any attribute with a template qualifies.
#[instrument(level = "debug", skip(facts, templates, rng))]
pub async fn generate_select_value<R: Rng + Send>(
  facts: &dyn FactRepository,
  templates: &dyn TemplateCatalog,
  rng: &mut R,
) -> Result<Question> {
  let pool = templates.templates_for(QuestionType::SelectValue).await?;
  let (attribute, template) = pick_template(&pool, rng, "select-value")?;

  let ctu = facts.values_for(Part::Ctu, &attribute).await?;
  let ctd = facts.values_for(Part::Ctd, &attribute).await?;
  let part = match (ctu.is_empty(), ctd.is_empty()) {
    (false, false) => random_part(rng),
    (false, true) => Part::Ctu,
    (true, false) => Part::Ctd,
    (true, true) => {
      return Err(TutorError::config(format!("no facts for attribute '{attribute}'")));
    }
  };

  let mut values: Vec<String> = match part {
    Part::Ctu => ctu,
    Part::Ctd => ctd,
  }
  .iter()
  .map(|v| normalize_answer(v))
  .collect();
  values.sort();
  values.dedup();

  let prompt = render(&template, Some(part), &attribute, "");
  debug!(target: "tutor", %attribute, %part, accepted = values.len(), "Generated select-value question");
  Ok(new_question(prompt, attribute, AcceptedAnswer::SelectValue { values }))
}

/// Dispatch on question type. Select-value ignores the level.
pub async fn generate<R: Rng + Send>(
  kind: QuestionType,
  facts: &dyn FactRepository,
  templates: &dyn TemplateCatalog,
  level: i32,
  rng: &mut R,
) -> Result<Question> {
  match kind {
    QuestionType::TrueFalse => generate_true_false(facts, templates, level, rng).await,
    QuestionType::SelectPart => generate_select_part(facts, templates, level, rng).await,
    QuestionType::SelectValue => generate_select_value(facts, templates, rng).await,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Fact, Template};
  use crate::seeds::{seed_facts, seed_statements, seed_templates};
  use crate::store::ContentTables;
  use rand::{rngs::StdRng, SeedableRng};

  fn seeded() -> ContentTables {
    ContentTables::new(seed_facts(), seed_templates(), seed_statements())
  }

  fn fact(part: Part, attribute: &str, value: &str) -> Fact {
    Fact { part, attribute: attribute.into(), value: value.into() }
  }

  fn template(kind: QuestionType, attribute: &str, level: i32, text: &str) -> Template {
    Template { kind, attribute: attribute.into(), level, text: text.into() }
  }

  #[tokio::test]
  async fn true_false_labels_match_ground_truth() {
    let t = seeded();
    let mut rng = StdRng::seed_from_u64(11);
    let mut seen = (0, 0);
    for level in 1..=4 {
      for _ in 0..150 {
        let q = generate_true_false(&t, &t, level, &mut rng).await.unwrap();
        let AcceptedAnswer::TrueFalse { truth, statement } = &q.answer else {
          panic!("wrong answer kind");
        };
        assert!(!q.prompt.contains('{'), "unrendered slot in {}", q.prompt);
        // Recover the (part, value) the prompt was rendered from.
        let rendered_from_fact = t.facts.iter().any(|f| {
          f.attribute == q.attribute && {
            let tpl = &t.templates.iter().find(|x| x.kind == QuestionType::TrueFalse && x.attribute == q.attribute).unwrap().text;
            render(tpl, Some(f.part), &f.attribute, &f.value) == q.prompt
          }
        });
        assert_eq!(*truth, rendered_from_fact, "{}", q.prompt);
        if *truth {
          seen.0 += 1;
          assert_eq!(statement.as_deref(), Some(q.prompt.as_str()));
        } else {
          seen.1 += 1;
          if let Some(s) = statement {
            assert_ne!(s, &q.prompt);
          }
        }
      }
    }
    assert!(seen.0 > 0 && seen.1 > 0, "expected both labels, got {seen:?}");
  }

  #[tokio::test]
  async fn false_statement_is_corrected_to_nearest_fact() {
    let t = ContentTables::new(
      vec![fact(Part::Ctu, "counts", "up"), fact(Part::Ctd, "counts", "down")],
      vec![template(QuestionType::TrueFalse, "counts", 1, "The {PART} instruction {ATTRIBUTE} {VALUE}.")],
      vec![],
    );
    let mut rng = StdRng::seed_from_u64(3);
    let mut corrected = 0;
    for _ in 0..100 {
      let q = generate_true_false(&t, &t, 1, &mut rng).await.unwrap();
      match (q.prompt.as_str(), &q.answer) {
        ("The CTU instruction counts down.", AcceptedAnswer::TrueFalse { truth, statement }) => {
          assert!(!truth);
          assert_eq!(statement.as_deref(), Some("The CTD instruction counts down."));
          corrected += 1;
        }
        ("The CTD instruction counts up.", AcceptedAnswer::TrueFalse { truth, statement }) => {
          assert!(!truth);
          assert_eq!(statement.as_deref(), Some("The CTU instruction counts up."));
          corrected += 1;
        }
        (_, AcceptedAnswer::TrueFalse { truth, .. }) => assert!(*truth),
        _ => panic!("wrong answer kind"),
      }
    }
    assert!(corrected > 0);
  }

  #[tokio::test]
  async fn select_part_answers_both_only_for_shared_values() {
    let t = seeded();
    let mut rng = StdRng::seed_from_u64(5);
    for level in 1..=4 {
      for _ in 0..150 {
        let q = generate_select_part(&t, &t, level, &mut rng).await.unwrap();
        let AcceptedAnswer::SelectPart { part } = q.answer else {
          panic!("wrong answer kind");
        };
        // Which facts of this attribute could have produced the prompt?
        let tpl = &t.templates.iter().find(|x| x.kind == QuestionType::SelectPart && x.attribute == q.attribute).unwrap().text;
        let holders: Vec<Part> = t
          .facts
          .iter()
          .filter(|f| f.attribute == q.attribute && render(tpl, None, &f.attribute, &f.value) == q.prompt)
          .map(|f| f.part)
          .collect();
        match holders.as_slice() {
          [only] => assert_eq!(part, PartAnswer::from(*only), "{}", q.prompt),
          [_, _] => assert_eq!(part, PartAnswer::Both, "{}", q.prompt),
          other => panic!("unexpected holders {other:?} for {}", q.prompt),
        }
      }
    }
  }

  #[tokio::test]
  async fn select_part_shared_value_is_always_both() {
    let t = ContentTables::new(
      vec![fact(Part::Ctu, "done bit", "DN"), fact(Part::Ctd, "done bit", "DN")],
      vec![template(QuestionType::SelectPart, "done bit", 2, "Which uses {VALUE}?")],
      vec![],
    );
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..20 {
      let q = generate_select_part(&t, &t, 2, &mut rng).await.unwrap();
      assert_eq!(q.prompt, "Which uses DN?");
      assert_eq!(q.answer, AcceptedAnswer::SelectPart { part: PartAnswer::Both });
    }
  }

  #[tokio::test]
  async fn select_value_prefers_the_part_with_facts() {
    let t = ContentTables::new(
      vec![fact(Part::Ctu, "overflow bit", "OV")],
      vec![template(QuestionType::SelectValue, "overflow bit", 3, "What is the {ATTRIBUTE} of the {PART} instruction?")],
      vec![],
    );
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..20 {
      let q = generate_select_value(&t, &t, &mut rng).await.unwrap();
      assert_eq!(q.prompt, "What is the overflow bit of the CTU instruction?");
      assert_eq!(q.answer, AcceptedAnswer::SelectValue { values: vec!["ov".into()] });
    }
  }

  #[tokio::test]
  async fn select_value_covers_seeded_attributes() {
    let t = seeded();
    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..200 {
      let q = generate_select_value(&t, &t, &mut rng).await.unwrap();
      let AcceptedAnswer::SelectValue { values } = &q.answer else {
        panic!("wrong answer kind");
      };
      assert!(!values.is_empty());
      assert!(q.prompt.contains("CTU") || q.prompt.contains("CTD"));
    }
  }

  #[tokio::test]
  async fn empty_pools_are_configuration_errors() {
    let t = ContentTables::new(
      vec![],
      vec![
        template(QuestionType::TrueFalse, "ghost", 1, "{PART} {VALUE}"),
        template(QuestionType::SelectValue, "ghost", 1, "{PART}?"),
      ],
      vec![],
    );
    let mut rng = StdRng::seed_from_u64(0);
    assert!(matches!(generate_true_false(&t, &t, 2, &mut rng).await, Err(TutorError::Configuration(_))));
    assert!(matches!(generate_true_false(&t, &t, 1, &mut rng).await, Err(TutorError::Configuration(_))));
    assert!(matches!(generate_select_part(&t, &t, 1, &mut rng).await, Err(TutorError::Configuration(_))));
    assert!(matches!(generate_select_value(&t, &t, &mut rng).await, Err(TutorError::Configuration(_))));
  }
}
