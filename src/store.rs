//! Repository contracts used by the core, plus the bundled in-memory implementations.
//!
//! The core only sees the traits; every operation receives its stores explicitly.
//! Reference data (facts, templates, tutoring statements) is read-only; user records
//! are the only mutable state.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::{Attribute, CounterBucket, Fact, Part, QuestionType, Template, TutoringStatement, UserRecord};
use crate::error::{Result, TutorError};

#[async_trait]
pub trait FactRepository: Send + Sync {
  /// Values recorded for one (part, attribute) pair.
  async fn values_for(&self, part: Part, attribute: &str) -> Result<Vec<String>>;
  /// All (part, value) pairs recorded for an attribute, across both parts.
  async fn facts_for(&self, attribute: &str) -> Result<Vec<(Part, String)>>;
}

#[async_trait]
pub trait TemplateCatalog: Send + Sync {
  /// (attribute, template text) pairs of one type at one level.
  async fn templates_at(&self, kind: QuestionType, level: i32) -> Result<Vec<(Attribute, String)>>;
  /// Same, unfiltered by level.
  async fn templates_for(&self, kind: QuestionType) -> Result<Vec<(Attribute, String)>>;
}

#[async_trait]
pub trait TutoringContent: Send + Sync {
  async fn statements_at(&self, statement_level: u32, order_level: u32) -> Result<Vec<String>>;
  async fn statements_for(&self, attribute: &str) -> Result<Vec<String>>;
  async fn count_at_level(&self, statement_level: u32) -> Result<u32>;
  async fn max_level(&self) -> Result<u32>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
  async fn get(&self, user_id: &str) -> Result<UserRecord>;
  async fn create(&self, user_id: &str) -> Result<UserRecord>;
  /// Back to creation state. NotFound for unknown users; never creates.
  async fn reset(&self, user_id: &str) -> Result<()>;
  /// Single atomic increment; returns the new counter value.
  async fn increment_counter(&self, user_id: &str, bucket: CounterBucket, attribute: &str) -> Result<u64>;
  async fn set_level(&self, user_id: &str, level: i32) -> Result<()>;
  async fn set_cursor(&self, user_id: &str, statement_level: u32, order_level: u32) -> Result<()>;
  async fn set_previous_totals(&self, user_id: &str, correct: u64, incorrect: u64) -> Result<()>;

  /// Level plus previous-total snapshot. The fallback issues two writes and is not
  /// atomic; stores that can write both fields in one operation override it.
  async fn set_level_and_totals(&self, user_id: &str, level: i32, correct: u64, incorrect: u64) -> Result<()> {
    self.set_previous_totals(user_id, correct, incorrect).await?;
    self.set_level(user_id, level).await
  }
}

/// Immutable reference tables held in memory.
#[derive(Clone, Debug, Default)]
pub struct ContentTables {
  pub facts: Vec<Fact>,
  pub templates: Vec<Template>,
  pub statements: Vec<TutoringStatement>,
}

impl ContentTables {
  pub fn new(facts: Vec<Fact>, templates: Vec<Template>, statements: Vec<TutoringStatement>) -> Self {
    Self { facts, templates, statements }
  }

  /// Distinct attributes in first-seen order across facts.
  pub fn attribute_set(&self) -> Vec<Attribute> {
    let mut seen = BTreeSet::new();
    self
      .facts
      .iter()
      .filter(|f| seen.insert(f.attribute.clone()))
      .map(|f| f.attribute.clone())
      .collect()
  }

  fn select_templates(&self, kind: QuestionType, level: Option<i32>) -> Vec<(Attribute, String)> {
    self
      .templates
      .iter()
      .filter(|t| t.kind == kind && level.map_or(true, |l| t.level == l))
      .map(|t| (t.attribute.clone(), t.text.clone()))
      .collect()
  }
}

#[async_trait]
impl FactRepository for ContentTables {
  async fn values_for(&self, part: Part, attribute: &str) -> Result<Vec<String>> {
    Ok(
      self
        .facts
        .iter()
        .filter(|f| f.part == part && f.attribute == attribute)
        .map(|f| f.value.clone())
        .collect(),
    )
  }

  async fn facts_for(&self, attribute: &str) -> Result<Vec<(Part, String)>> {
    Ok(
      self
        .facts
        .iter()
        .filter(|f| f.attribute == attribute)
        .map(|f| (f.part, f.value.clone()))
        .collect(),
    )
  }
}

#[async_trait]
impl TemplateCatalog for ContentTables {
  async fn templates_at(&self, kind: QuestionType, level: i32) -> Result<Vec<(Attribute, String)>> {
    Ok(self.select_templates(kind, Some(level)))
  }

  async fn templates_for(&self, kind: QuestionType) -> Result<Vec<(Attribute, String)>> {
    Ok(self.select_templates(kind, None))
  }
}

#[async_trait]
impl TutoringContent for ContentTables {
  async fn statements_at(&self, statement_level: u32, order_level: u32) -> Result<Vec<String>> {
    Ok(
      self
        .statements
        .iter()
        .filter(|s| s.statement_level == statement_level && s.order_level == order_level)
        .map(|s| s.text.clone())
        .collect(),
    )
  }

  async fn statements_for(&self, attribute: &str) -> Result<Vec<String>> {
    Ok(
      self
        .statements
        .iter()
        .filter(|s| s.attribute.as_deref() == Some(attribute))
        .map(|s| s.text.clone())
        .collect(),
    )
  }

  async fn count_at_level(&self, statement_level: u32) -> Result<u32> {
    let orders: BTreeSet<u32> = self
      .statements
      .iter()
      .filter(|s| s.statement_level == statement_level)
      .map(|s| s.order_level)
      .collect();
    Ok(orders.len() as u32)
  }

  async fn max_level(&self) -> Result<u32> {
    Ok(self.statements.iter().map(|s| s.statement_level).max().unwrap_or(0))
  }
}

/// In-memory user records keyed by user id. Each mutation holds the write lock for
/// its whole read-modify-write, so single-field updates are atomic.
pub struct MemoryUserStore {
  attributes: Vec<Attribute>,
  users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
  pub fn new(attributes: Vec<Attribute>) -> Self {
    Self { attributes, users: RwLock::new(HashMap::new()) }
  }

  fn fresh(&self, user_id: &str) -> UserRecord {
    UserRecord::new(user_id, &self.attributes)
  }

  async fn update<F>(&self, user_id: &str, f: F) -> Result<()>
  where
    F: FnOnce(&mut UserRecord) -> Result<()> + Send,
  {
    let mut users = self.users.write().await;
    let rec = users.get_mut(user_id).ok_or_else(|| TutorError::not_found(user_id))?;
    f(rec)
  }
}

#[async_trait]
impl UserStore for MemoryUserStore {
  async fn get(&self, user_id: &str) -> Result<UserRecord> {
    self
      .users
      .read()
      .await
      .get(user_id)
      .cloned()
      .ok_or_else(|| TutorError::not_found(user_id))
  }

  #[instrument(level = "debug", skip(self))]
  async fn create(&self, user_id: &str) -> Result<UserRecord> {
    let mut users = self.users.write().await;
    let rec = users.entry(user_id.to_string()).or_insert_with(|| self.fresh(user_id));
    debug!(target: "tutor", %user_id, "User record ready");
    Ok(rec.clone())
  }

  #[instrument(level = "debug", skip(self))]
  async fn reset(&self, user_id: &str) -> Result<()> {
    let fresh = self.fresh(user_id);
    self.update(user_id, |rec| {
      *rec = fresh;
      Ok(())
    })
    .await
  }

  async fn increment_counter(&self, user_id: &str, bucket: CounterBucket, attribute: &str) -> Result<u64> {
    let mut users = self.users.write().await;
    let rec = users.get_mut(user_id).ok_or_else(|| TutorError::not_found(user_id))?;
    let counter = rec
      .counters_mut(bucket)
      .get_mut(attribute)
      .ok_or_else(|| TutorError::config(format!("unknown attribute '{attribute}'")))?;
    *counter += 1;
    Ok(*counter)
  }

  async fn set_level(&self, user_id: &str, level: i32) -> Result<()> {
    self
      .update(user_id, |rec| {
        rec.level = level;
        Ok(())
      })
      .await
  }

  async fn set_cursor(&self, user_id: &str, statement_level: u32, order_level: u32) -> Result<()> {
    self
      .update(user_id, |rec| {
        rec.tutoring_statement_level = statement_level;
        rec.tutoring_order_level = order_level;
        Ok(())
      })
      .await
  }

  async fn set_previous_totals(&self, user_id: &str, correct: u64, incorrect: u64) -> Result<()> {
    self
      .update(user_id, |rec| {
        rec.previous_total_correct = correct;
        rec.previous_total_incorrect = incorrect;
        Ok(())
      })
      .await
  }

  async fn set_level_and_totals(&self, user_id: &str, level: i32, correct: u64, incorrect: u64) -> Result<()> {
    self
      .update(user_id, |rec| {
        rec.level = level;
        rec.previous_total_correct = correct;
        rec.previous_total_incorrect = incorrect;
        Ok(())
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::{seed_facts, seed_statements, seed_templates};

  fn tables() -> ContentTables {
    ContentTables::new(seed_facts(), seed_templates(), seed_statements())
  }

  #[tokio::test]
  async fn facts_are_looked_up_by_part_and_attribute() {
    let t = tables();
    assert_eq!(t.values_for(Part::Ctu, "counts").await.unwrap(), vec!["up".to_string()]);
    assert_eq!(t.values_for(Part::Ctd, "overflow bit").await.unwrap(), Vec::<String>::new());
    let both = t.facts_for("done bit").await.unwrap();
    assert_eq!(both, vec![(Part::Ctu, "DN".to_string()), (Part::Ctd, "DN".to_string())]);
  }

  #[tokio::test]
  async fn templates_filter_by_level() {
    let t = tables();
    let all = t.templates_for(QuestionType::TrueFalse).await.unwrap();
    let l1 = t.templates_at(QuestionType::TrueFalse, 1).await.unwrap();
    assert!(!l1.is_empty() && l1.len() < all.len());
    assert!(t.templates_at(QuestionType::TrueFalse, 9).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn tutoring_counts_and_max_level() {
    let t = tables();
    assert_eq!(t.max_level().await.unwrap(), 4);
    assert_eq!(t.count_at_level(1).await.unwrap(), 6);
    assert_eq!(t.statements_at(1, 1).await.unwrap().len(), 1);
    assert_eq!(t.statements_for("counts").await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn unknown_user_is_not_found() {
    let users = MemoryUserStore::new(tables().attribute_set());
    assert_eq!(users.get("ghost").await, Err(TutorError::not_found("ghost")));
    assert!(users.set_level("ghost", 2).await.is_err());
  }

  #[tokio::test]
  async fn increment_and_reset() {
    let users = MemoryUserStore::new(tables().attribute_set());
    users.create("u").await.unwrap();
    assert_eq!(users.increment_counter("u", CounterBucket::Correct, "counts").await.unwrap(), 1);
    assert_eq!(users.increment_counter("u", CounterBucket::Correct, "counts").await.unwrap(), 2);
    assert!(matches!(
      users.increment_counter("u", CounterBucket::Incorrect, "colour").await,
      Err(TutorError::Configuration(_))
    ));
    users.set_level("u", 3).await.unwrap();

    users.reset("u").await.unwrap();
    let once = users.get("u").await.unwrap();
    users.reset("u").await.unwrap();
    let twice = users.get("u").await.unwrap();
    assert_eq!(once, twice);
    assert_eq!(once, UserRecord::new("u", &tables().attribute_set()));
  }

  #[tokio::test]
  async fn reset_never_creates() {
    let users = MemoryUserStore::new(tables().attribute_set());
    assert_eq!(users.reset("ghost").await, Err(TutorError::not_found("ghost")));
    assert!(matches!(users.get("ghost").await, Err(TutorError::NotFound { .. })));
  }

  #[tokio::test]
  async fn level_and_totals_are_written_together() {
    let users = MemoryUserStore::new(tables().attribute_set());
    assert!(users.set_level_and_totals("ghost", 3, 4, 1).await.is_err());
    users.create("u").await.unwrap();
    users.set_level_and_totals("u", 3, 4, 1).await.unwrap();
    let rec = users.get("u").await.unwrap();
    assert_eq!((rec.level, rec.previous_total_correct, rec.previous_total_incorrect), (3, 4, 1));
  }

  #[tokio::test]
  async fn create_keeps_existing_progress() {
    let users = MemoryUserStore::new(tables().attribute_set());
    users.create("u").await.unwrap();
    users.set_level("u", 2).await.unwrap();
    assert_eq!(users.create("u").await.unwrap().level, 2);
  }
}
