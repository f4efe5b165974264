//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Serving a question (level update + generation, committed only on success)
//!   - Grading answers, weakest-attribute feedback, tutoring steps and resets
//!   - The conversational turn: intent + stage dispatch and speech/card rendering

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, instrument, warn};

use crate::difficulty;
use crate::domain::{Question, QuestionType};
use crate::error::{Result, TutorError};
use crate::generator;
use crate::protocol::{Intent, SessionState, Spoken, SpeechResponse, Stage};
use crate::state::AppState;
use crate::tracker::{self, Feedback, Verdict};
use crate::tutoring::{self, TutorStep};
use crate::util::{escape_ssml, ssml};

/// Recompute the level, then generate a question at it. The level and the
/// previous-total snapshot are written only if generation succeeded.
#[instrument(level = "info", skip(state))]
pub async fn next_question(state: &AppState, user_id: &str) -> Result<(i32, Question)> {
  let rec = state.users.get(user_id).await?;
  let update = difficulty::plan(&rec);

  let mut rng = StdRng::from_entropy();
  let kind = state.pick_question_type(&mut rng);
  let question = generator::generate(kind, state.facts.as_ref(), state.templates.as_ref(), update.level, &mut rng).await?;

  difficulty::commit(state.users.as_ref(), user_id, update).await?;
  info!(target: "tutor", %user_id, level = update.level, %kind, attribute = %question.attribute, "Question served");
  Ok((update.level, question))
}

pub async fn answer_question(state: &AppState, user_id: &str, question: &Question, answer: &str) -> Result<Verdict> {
  tracker::grade(state.users.as_ref(), user_id, question, answer).await
}

pub async fn feedback(state: &AppState, user_id: &str) -> Result<Feedback> {
  tracker::worst_attributes(state.users.as_ref(), state.tutoring.as_ref(), user_id, &state.prompts.affirmation).await
}

pub async fn tutor_next(state: &AppState, user_id: &str) -> Result<TutorStep> {
  tutoring::advance(state.users.as_ref(), state.tutoring.as_ref(), user_id).await
}

/// Recompute and store the level outside of question generation.
pub async fn refresh_level(state: &AppState, user_id: &str) -> Result<i32> {
  difficulty::update_level(state.users.as_ref(), user_id).await
}

#[instrument(level = "info", skip(state))]
pub async fn reset_user(state: &AppState, user_id: &str) -> Result<()> {
  state.users.reset(user_id).await?;
  info!(target: "tutor", %user_id, "User record reset");
  Ok(())
}

// -------- Conversational turns --------

/// Handle one turn. Unknown (intent, stage) combinations are errors, not no-ops.
#[instrument(level = "info", skip(state, intent, session), fields(intent = intent.name(), stage = session.stage.as_str()))]
pub async fn handle_turn(state: &AppState, user_id: &str, intent: Intent, session: SessionState) -> Result<SpeechResponse> {
  state.ensure_user(user_id).await?;

  match (intent, session.stage) {
    (Intent::Launch, _) => Ok(welcome(state)),
    (Intent::Question, _)
    | (Intent::Yes, Stage::CheckedAnswer | Stage::Help | Stage::Feedback) => ask_question(state, user_id).await,
    (Intent::Tutor, _) | (Intent::Yes, Stage::Tutoring) => teach(state, user_id).await,
    (Intent::Answer { value }, Stage::AwaitingAnswer) => check(state, user_id, value, session).await,
    (Intent::Help, _) => Ok(help(state, session)),
    (Intent::Repeat, _) => Ok(repeat(state, session)),
    (Intent::Feedback, _) => give_feedback(state, user_id).await,
    (Intent::StartOver, _) => {
      reset_user(state, user_id).await?;
      Ok(welcome(state))
    }
    (Intent::Stop | Intent::Cancel, _)
    | (Intent::No, Stage::CheckedAnswer | Stage::Help | Stage::Feedback | Stage::Tutoring) => {
      reset_user(state, user_id).await?;
      Ok(goodbye(state))
    }
    (intent, stage) => {
      error!(target: "tutor", %user_id, intent = intent.name(), stage = stage.as_str(), "Unhandled intent for stage");
      Err(TutorError::UnexpectedIntent { intent: intent.name().into(), stage: stage.as_str().into() })
    }
  }
}

/// Speech for configuration/store failures: apologize and end the session.
pub fn failure_response(state: &AppState, err: &TutorError) -> SpeechResponse {
  warn!(target: "tutor", error = %err, "Ending session after failure");
  respond(
    "Error",
    &state.prompts.failure,
    None,
    true,
    SessionState::default(),
  )
}

async fn ask_question(state: &AppState, user_id: &str) -> Result<SpeechResponse> {
  let (_, question) = next_question(state, user_id).await?;
  let (title, lead) = match question.kind() {
    QuestionType::TrueFalse => ("True or False Question", "True or false? "),
    QuestionType::SelectPart => ("Which Instruction Question", ""),
    QuestionType::SelectValue => ("Short Answer Question", ""),
  };
  let text = format!("{lead}{}", question.prompt);
  let reprompt = format!("I didn't get your answer. Please answer the following: {}", question.prompt);
  let session = SessionState { stage: Stage::AwaitingAnswer, question: Some(question), last: None };
  Ok(respond_ssml(
    title,
    &ssml(&format!("<prosody rate=\"slow\">{}</prosody>", escape_ssml(&text))),
    &text,
    Some(reprompt),
    false,
    session,
  ))
}

async fn check(state: &AppState, user_id: &str, value: Option<String>, session: SessionState) -> Result<SpeechResponse> {
  let Some(question) = session.question.clone() else {
    return Err(TutorError::UnexpectedIntent { intent: "answer".into(), stage: "no_question".into() });
  };
  let Some(answer) = value else {
    return Ok(retry(state, session));
  };

  let verdict = match answer_question(state, user_id, &question, &answer).await {
    Ok(v) => v,
    Err(TutorError::Validation(reason)) => {
      info!(target: "tutor", %user_id, %reason, "Ungradable answer; re-prompting");
      return Ok(retry(state, session));
    }
    Err(e) => return Err(e),
  };

  let headline = match (question.kind(), verdict.correct) {
    (QuestionType::TrueFalse, true) => format!("{} is correct.", verdict.expected),
    (_, true) => "Your answer is correct.".to_string(),
    (_, false) => format!("Sorry, the correct answer is {}.", verdict.expected),
  };
  let text = [headline.as_str(), verdict.explanation.as_str(), state.prompts.another_question.as_str()]
    .iter()
    .filter(|s| !s.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" ");
  let body = format!(
    "{} {}<break time=\"2s\"/>{}",
    escape_ssml(&headline),
    escape_ssml(&verdict.explanation),
    escape_ssml(&state.prompts.another_question)
  );
  let session = SessionState { stage: Stage::CheckedAnswer, question: Some(question), last: None };
  Ok(respond_ssml("Answer Response", &ssml(&body), &text, None, false, session))
}

async fn teach(state: &AppState, user_id: &str) -> Result<SpeechResponse> {
  let step = tutor_next(state, user_id).await?;
  let (stage, closing) = if step.complete {
    (Stage::Welcome, &state.prompts.tutoring_complete)
  } else {
    (Stage::Tutoring, &state.prompts.tutoring_more)
  };
  let text = format!("{} {}", step.statements.join(" "), closing);
  let session = SessionState { stage, question: None, last: None };
  Ok(respond("Lesson", &text, Some(closing.clone()), false, session))
}

async fn give_feedback(state: &AppState, user_id: &str) -> Result<SpeechResponse> {
  let text = match feedback(state, user_id).await? {
    Feedback::AllClear { message } => message,
    Feedback::NeedsReview { attributes, .. } => {
      let mut parts = vec![state.prompts.feedback_intro.clone()];
      parts.extend(attributes.into_values());
      parts.join(" ")
    }
  };
  let text = format!("{} {}", text, state.prompts.another_question);
  let session = SessionState { stage: Stage::Feedback, question: None, last: None };
  Ok(respond("Feedback", &text, None, false, session))
}

fn welcome(state: &AppState) -> SpeechResponse {
  respond(
    "Welcome",
    &state.prompts.welcome,
    Some(state.prompts.welcome_reprompt.clone()),
    false,
    SessionState::default(),
  )
}

fn goodbye(state: &AppState) -> SpeechResponse {
  respond("Session Ended", &state.prompts.goodbye, None, true, SessionState::default())
}

/// Help for the pending question keeps it pending; otherwise general help.
fn help(state: &AppState, session: SessionState) -> SpeechResponse {
  let p = &state.prompts;
  let pending = match session.stage {
    Stage::AwaitingAnswer => session.question.clone(),
    _ => None,
  };
  match pending {
    Some(q) => {
      let tip = match q.kind() {
        QuestionType::TrueFalse => &p.help_true_false,
        QuestionType::SelectPart => &p.help_select_part,
        QuestionType::SelectValue => &p.help_select_value,
      };
      let text = format!("{} {}", tip, q.prompt);
      respond("Help", &text, Some(q.prompt), false, session)
    }
    None => {
      let text = format!("{} {}", p.help_general, p.another_question);
      let session = SessionState { stage: Stage::Help, question: None, last: None };
      respond("Help", &text, None, false, session)
    }
  }
}

fn repeat(state: &AppState, session: SessionState) -> SpeechResponse {
  match session.last.clone() {
    Some(last) => {
      let card_text = last.ssml.clone();
      SpeechResponse {
        title: last.title.clone(),
        ssml: last.ssml.clone(),
        card_text,
        reprompt: last.reprompt.clone(),
        should_end_session: false,
        session,
      }
    }
    None => welcome(state),
  }
}

fn retry(state: &AppState, session: SessionState) -> SpeechResponse {
  respond("Answer Response", &state.prompts.retry, Some(state.prompts.retry.clone()), false, session)
}

fn respond(title: &str, text: &str, reprompt: Option<String>, end: bool, session: SessionState) -> SpeechResponse {
  respond_ssml(title, &ssml(&escape_ssml(text)), text, reprompt, end, session)
}

/// Build the response and remember it in the session for "repeat".
fn respond_ssml(
  title: &str,
  speech: &str,
  card_text: &str,
  reprompt: Option<String>,
  end: bool,
  mut session: SessionState,
) -> SpeechResponse {
  session.last = Some(Spoken { title: title.to_string(), ssml: speech.to_string(), reprompt: reprompt.clone() });
  SpeechResponse {
    title: title.to_string(),
    ssml: speech.to_string(),
    card_text: card_text.to_string(),
    reprompt,
    should_end_session: end,
    session,
  }
}
