//! Difficulty controller.
//!
//! Levels run 1..=4. Every 4th cumulative correct answer nudges the level up, every
//! 3rd cumulative incorrect answer nudges it down. Totals are compared with the
//! snapshot taken at the previous call so a learner who has not crossed a new
//! threshold since then keeps the same level. Branches are evaluated in a fixed
//! order and the first match wins.

use tracing::{debug, info, instrument};

use crate::domain::{UserRecord, MAX_LEVEL, MIN_LEVEL};
use crate::error::Result;
use crate::store::UserStore;

pub const CORRECT_MILESTONE: u64 = 4;
pub const INCORRECT_MILESTONE: u64 = 3;

/// Everything the level decision depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelInputs {
  pub level: i32,
  pub current_correct: u64,
  pub current_incorrect: u64,
  pub previous_correct: u64,
  pub previous_incorrect: u64,
}

impl LevelInputs {
  pub fn from_record(rec: &UserRecord) -> Self {
    Self {
      level: rec.level,
      current_correct: rec.total_correct(),
      current_incorrect: rec.total_incorrect(),
      previous_correct: rec.previous_total_correct,
      previous_incorrect: rec.previous_total_incorrect,
    }
  }
}

/// Result of a level decision, not yet written to the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelUpdate {
  pub level: i32,
  pub total_correct: u64,
  pub total_incorrect: u64,
}

pub fn clamp_level(level: i32) -> i32 {
  level.clamp(MIN_LEVEL, MAX_LEVEL)
}

/// Pure level decision.
pub fn next_level(inputs: LevelInputs) -> i32 {
  let level = clamp_level(inputs.level);
  let correct = inputs.current_correct;
  let incorrect = inputs.current_incorrect;
  let correct_hit = correct % CORRECT_MILESTONE == 0;
  let incorrect_hit = incorrect % INCORRECT_MILESTONE == 0;

  let delta = match (correct, incorrect) {
    (0, 0) => 0,
    (_, 0) => i32::from(correct_hit),
    (0, _) => {
      if incorrect_hit && level > MIN_LEVEL { -1 } else { 0 }
    }
    _ => {
      let stuck = (inputs.previous_correct == correct && !incorrect_hit)
        || (inputs.previous_incorrect == incorrect && !correct_hit);
      if stuck {
        0
      } else if correct_hit && incorrect_hit {
        -1
      } else if correct_hit {
        1
      } else if incorrect_hit {
        -1
      } else {
        0
      }
    }
  };

  clamp_level(level + delta)
}

/// Decide the new level for a record without touching the store.
pub fn plan(rec: &UserRecord) -> LevelUpdate {
  let inputs = LevelInputs::from_record(rec);
  LevelUpdate {
    level: next_level(inputs),
    total_correct: inputs.current_correct,
    total_incorrect: inputs.current_incorrect,
  }
}

/// Persist a decided level and resync the previous-total snapshot.
#[instrument(level = "debug", skip(users))]
pub async fn commit(users: &dyn UserStore, user_id: &str, update: LevelUpdate) -> Result<()> {
  users
    .set_level_and_totals(user_id, update.level, update.total_correct, update.total_incorrect)
    .await
}

/// Read the record, decide, and persist. Returns the new level.
#[instrument(level = "info", skip(users))]
pub async fn update_level(users: &dyn UserStore, user_id: &str) -> Result<i32> {
  let rec = users.get(user_id).await?;
  let update = plan(&rec);
  commit(users, user_id, update).await?;
  if update.level != rec.level {
    info!(target: "tutor", %user_id, from = rec.level, to = update.level, "Level changed");
  } else {
    debug!(target: "tutor", %user_id, level = update.level, "Level unchanged");
  }
  Ok(update.level)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::CounterBucket;
  use crate::error::TutorError;
  use crate::store::MemoryUserStore;
  use rand::{rngs::StdRng, Rng, SeedableRng};

  fn inputs(level: i32, c: u64, i: u64, pc: u64, pi: u64) -> LevelInputs {
    LevelInputs {
      level,
      current_correct: c,
      current_incorrect: i,
      previous_correct: pc,
      previous_incorrect: pi,
    }
  }

  #[test]
  fn no_history_keeps_level() {
    assert_eq!(next_level(inputs(1, 0, 0, 0, 0)), 1);
    assert_eq!(next_level(inputs(3, 0, 0, 0, 0)), 3);
  }

  #[test]
  fn correct_only_milestone_increments() {
    assert_eq!(next_level(inputs(2, 8, 0, 4, 0)), 3);
    assert_eq!(next_level(inputs(2, 7, 0, 4, 0)), 2);
    assert_eq!(next_level(inputs(4, 12, 0, 8, 0)), 4);
  }

  #[test]
  fn incorrect_only_respects_floor() {
    assert_eq!(next_level(inputs(3, 0, 3, 0, 2)), 2);
    assert_eq!(next_level(inputs(1, 0, 3, 0, 2)), 1);
    assert_eq!(next_level(inputs(3, 0, 4, 0, 3)), 3);
  }

  #[test]
  fn general_case_without_plateau_decrements_on_incorrect_milestone() {
    // stuck: (5 == 5 && 3 % 3 != 0) is false, (1 == 3) is false -> not stuck;
    // 5 % 4 != 0 and 3 % 3 == 0 -> decrement.
    assert_eq!(next_level(inputs(3, 5, 3, 5, 1)), 2);
  }

  #[test]
  fn both_milestones_at_once_decrement() {
    assert_eq!(next_level(inputs(3, 4, 3, 3, 2)), 2);
  }

  #[test]
  fn correct_milestone_in_general_case_increments() {
    assert_eq!(next_level(inputs(2, 4, 1, 3, 2)), 3);
  }

  #[test]
  fn plateau_does_not_oscillate() {
    for incorrect in [1u64, 2, 4, 5, 7, 11] {
      for level in MIN_LEVEL..=MAX_LEVEL {
        assert_eq!(next_level(inputs(level, 6, incorrect, 6, 0)), level);
      }
    }
  }

  #[test]
  fn out_of_range_levels_are_clamped() {
    assert_eq!(next_level(inputs(9, 0, 0, 0, 0)), MAX_LEVEL);
    assert_eq!(next_level(inputs(-2, 0, 0, 0, 0)), MIN_LEVEL);
    assert_eq!(next_level(inputs(0, 0, 3, 0, 0)), MIN_LEVEL);
  }

  #[test]
  fn level_stays_bounded_for_random_histories() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..2_000 {
      let i = inputs(
        rng.gen_range(-3..8),
        rng.gen_range(0..40),
        rng.gen_range(0..40),
        rng.gen_range(0..40),
        rng.gen_range(0..40),
      );
      let out = next_level(i);
      assert!((MIN_LEVEL..=MAX_LEVEL).contains(&out), "{i:?} -> {out}");
      assert_eq!(out, next_level(i));
    }
  }

  #[tokio::test]
  async fn first_update_is_a_no_op_and_snapshots_zero() {
    let users = MemoryUserStore::new(vec!["counts".into()]);
    users.create("u").await.unwrap();
    assert_eq!(update_level(&users, "u").await.unwrap(), 1);
    let rec = users.get("u").await.unwrap();
    assert_eq!((rec.previous_total_correct, rec.previous_total_incorrect), (0, 0));
  }

  #[tokio::test]
  async fn stored_level_follows_answer_stream() {
    let users = MemoryUserStore::new(vec!["counts".into(), "enable bit".into()]);
    users.create("u").await.unwrap();
    for n in 1..=4 {
      users.increment_counter("u", CounterBucket::Correct, "counts").await.unwrap();
      let level = update_level(&users, "u").await.unwrap();
      assert_eq!(level, if n == 4 { 2 } else { 1 });
    }
    let rec = users.get("u").await.unwrap();
    assert_eq!(rec.level, 2);
    assert_eq!(rec.previous_total_correct, 4);

    for _ in 0..3 {
      users.increment_counter("u", CounterBucket::Incorrect, "enable bit").await.unwrap();
      update_level(&users, "u").await.unwrap();
    }
    assert_eq!(users.get("u").await.unwrap().level, 1);
  }

  /// Refuses the single-field setters so any split write shows up as an error.
  struct SingleWriteOnly(MemoryUserStore);

  #[async_trait::async_trait]
  impl UserStore for SingleWriteOnly {
    async fn get(&self, user_id: &str) -> Result<UserRecord> { self.0.get(user_id).await }
    async fn create(&self, user_id: &str) -> Result<UserRecord> { self.0.create(user_id).await }
    async fn reset(&self, user_id: &str) -> Result<()> { self.0.reset(user_id).await }
    async fn increment_counter(&self, user_id: &str, bucket: CounterBucket, attribute: &str) -> Result<u64> {
      self.0.increment_counter(user_id, bucket, attribute).await
    }
    async fn set_level(&self, _: &str, _: i32) -> Result<()> {
      Err(TutorError::StoreUnavailable("split write".into()))
    }
    async fn set_cursor(&self, user_id: &str, s: u32, o: u32) -> Result<()> { self.0.set_cursor(user_id, s, o).await }
    async fn set_previous_totals(&self, _: &str, _: u64, _: u64) -> Result<()> {
      Err(TutorError::StoreUnavailable("split write".into()))
    }
    async fn set_level_and_totals(&self, user_id: &str, level: i32, c: u64, i: u64) -> Result<()> {
      self.0.set_level_and_totals(user_id, level, c, i).await
    }
  }

  #[tokio::test]
  async fn commit_is_one_store_write() {
    let users = SingleWriteOnly(MemoryUserStore::new(vec!["counts".into()]));
    users.create("u").await.unwrap();
    for _ in 0..4 {
      users.increment_counter("u", CounterBucket::Correct, "counts").await.unwrap();
    }
    assert_eq!(update_level(&users, "u").await.unwrap(), 2);
    let rec = users.get("u").await.unwrap();
    assert_eq!((rec.level, rec.previous_total_correct), (2, 4));
  }

  #[tokio::test]
  async fn missing_user_propagates_not_found() {
    let users = MemoryUserStore::new(vec![]);
    assert!(matches!(
      update_level(&users, "ghost").await,
      Err(crate::error::TutorError::NotFound { .. })
    ));
  }
}
