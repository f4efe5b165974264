//! Application state: content repositories, the user record store, prompts and quiz options.
//!
//! This module owns:
//!   - the reference content (facts, templates, tutoring statements), from TOML or built-in seeds
//!   - the user record store
//!   - the prompts struct (from TOML or defaults)
//!   - the question-type pool used by the conversational shell
//!
//! Every core operation receives the stores it needs from here explicitly.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::config::{load_tutor_config_from_env, Prompts, QuizConfig, TutorConfig};
use crate::domain::{QuestionType, UserRecord, MAX_LEVEL, MIN_LEVEL};
use crate::error::{Result, TutorError};
use crate::seeds::{seed_facts, seed_statements, seed_templates};
use crate::store::{ContentTables, FactRepository, MemoryUserStore, TemplateCatalog, TutoringContent, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub facts: Arc<dyn FactRepository>,
    pub templates: Arc<dyn TemplateCatalog>,
    pub tutoring: Arc<dyn TutoringContent>,
    pub users: Arc<dyn UserStore>,
    pub prompts: Prompts,
    pub quiz: QuizConfig,
}

impl AppState {
    /// Build state from env: load config, pick content tables, build the user store.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        Self::from_config(load_tutor_config_from_env())
    }

    pub fn from_config(cfg: Option<TutorConfig>) -> Self {
        let cfg = cfg.unwrap_or_default();

        // Config tables replace the built-in seeds one table at a time.
        let facts = if cfg.facts.is_empty() { seed_facts() } else { cfg.facts };
        let templates = if cfg.templates.is_empty() { seed_templates() } else { cfg.templates };
        let statements = if cfg.statements.is_empty() { seed_statements() } else { cfg.statements };
        let content = Arc::new(ContentTables::new(facts, templates, statements));

        log_inventory(&content);

        let mut quiz = cfg.quiz;
        if quiz.question_types.is_empty() {
            warn!(target: "counter_tutor", "Empty question_types in config; enabling all question types");
            quiz = QuizConfig::default();
        }

        let users = Arc::new(MemoryUserStore::new(content.attribute_set()));
        Self {
            facts: content.clone(),
            templates: content.clone(),
            tutoring: content,
            users,
            prompts: cfg.prompts,
            quiz,
        }
    }

    /// Fetch the user's record, creating it on first contact.
    #[instrument(level = "debug", skip(self))]
    pub async fn ensure_user(&self, user_id: &str) -> Result<UserRecord> {
        match self.users.get(user_id).await {
            Ok(rec) => Ok(rec),
            Err(TutorError::NotFound { .. }) => {
                info!(target: "tutor", %user_id, "New learner");
                self.users.create(user_id).await
            }
            Err(e) => Err(e),
        }
    }

    /// Uniform pick from the enabled question types.
    pub fn pick_question_type<R: Rng>(&self, rng: &mut R) -> QuestionType {
        self.quiz
            .question_types
            .choose(rng)
            .copied()
            .unwrap_or(QuestionType::TrueFalse)
    }
}

/// Startup summary of the content, with a warning for every level a levelled
/// question type cannot serve.
fn log_inventory(content: &ContentTables) {
    let mut by_kind: BTreeMap<(&'static str, i32), usize> = BTreeMap::new();
    for t in &content.templates {
        *by_kind.entry((t.kind.as_str(), t.level)).or_default() += 1;
    }
    for ((kind, level), count) in &by_kind {
        info!(target: "counter_tutor", %kind, level, count, "Template inventory");
    }
    for kind in [QuestionType::TrueFalse, QuestionType::SelectPart] {
        for level in MIN_LEVEL..=MAX_LEVEL {
            if !by_kind.contains_key(&(kind.as_str(), level)) {
                warn!(target: "counter_tutor", %kind, level, "No templates for this level; requests at it will fail");
            }
        }
    }
    info!(
        target: "counter_tutor",
        facts = content.facts.len(),
        attributes = content.attribute_set().len(),
        statements = content.statements.len(),
        "Content loaded"
    );
}
