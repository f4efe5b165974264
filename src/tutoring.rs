//! Teaching mode: a per-user (statement level, order level) cursor that walks the
//! tutoring statements in order and wraps to the start once everything was said.

use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{Result, TutorError};
use crate::store::{TutoringContent, UserStore};

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TutorStep {
  pub statement_level: u32,
  pub order_level: u32,
  pub statements: Vec<String>,
  /// Set on the step that exhausted the last level; the cursor is back at (1, 1).
  pub complete: bool,
}

#[instrument(level = "info", skip(users, content))]
pub async fn advance(users: &dyn UserStore, content: &dyn TutoringContent, user_id: &str) -> Result<TutorStep> {
  let rec = users.get(user_id).await?;
  let max_level = content.max_level().await?;
  if max_level == 0 {
    return Err(TutorError::config("no tutoring statements"));
  }

  let (mut level, mut order) = (rec.tutoring_statement_level.max(1), rec.tutoring_order_level.max(1));
  // A cursor left behind by a content change restarts from the top.
  if level > max_level || order > content.count_at_level(level).await? {
    info!(target: "tutor", %user_id, level, order, "Stale tutoring cursor; restarting");
    (level, order) = (1, 1);
  }

  let statements = content.statements_at(level, order).await?;
  if statements.is_empty() {
    return Err(TutorError::config(format!("no tutoring statement at ({level}, {order})")));
  }

  let mut next = (level, order + 1);
  if next.1 > content.count_at_level(level).await? {
    next = (level + 1, 1);
  }
  let complete = next.0 > max_level;
  if complete {
    next = (1, 1);
  }

  users.set_cursor(user_id, next.0, next.1).await?;
  if complete {
    info!(target: "tutor", %user_id, "Tutoring complete; cursor reset");
  }
  Ok(TutorStep { statement_level: level, order_level: order, statements, complete })
}
