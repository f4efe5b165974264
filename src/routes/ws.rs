//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::error::TutorError;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::logic::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "counter_tutor", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "counter_tutor", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "counter_tutor", bytes = txt.len(), "WS message received");
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "counter_tutor", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "counter_tutor", "WebSocket disconnected");
}

fn ws_error(err: TutorError) -> ServerWsMessage {
  ServerWsMessage::Error { message: err.to_string() }
}

#[instrument(level = "info", skip_all)]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Turn { user_id, intent, session } => {
      match handle_turn(state, &user_id, intent, session).await {
        Ok(response) => ServerWsMessage::Speech { response },
        Err(e @ TutorError::UnexpectedIntent { .. }) => ws_error(e),
        Err(e) => ServerWsMessage::Speech { response: failure_response(state, &e) },
      }
    }

    ClientWsMessage::NewQuestion { user_id } => match next_question(state, &user_id).await {
      Ok((level, question)) => {
        info!(target: "tutor", %user_id, level, id = %question.id, "WS new_question served");
        ServerWsMessage::Question { level, question }
      }
      Err(e) => ws_error(e),
    },

    ClientWsMessage::SubmitAnswer { user_id, question, answer } => {
      match answer_question(state, &user_id, &question, &answer).await {
        Ok(verdict) => {
          info!(target: "tutor", %user_id, id = %question.id, correct = verdict.correct, "WS submit_answer evaluated");
          ServerWsMessage::AnswerResult { verdict }
        }
        Err(e) => ws_error(e),
      }
    }

    ClientWsMessage::Feedback { user_id } => match feedback(state, &user_id).await {
      Ok(feedback) => ServerWsMessage::Feedback { feedback },
      Err(e) => ws_error(e),
    },

    ClientWsMessage::TutorNext { user_id } => match tutor_next(state, &user_id).await {
      Ok(step) => ServerWsMessage::TutorStep { step },
      Err(e) => ws_error(e),
    },

    ClientWsMessage::Reset { user_id } => match reset_user(state, &user_id).await {
      Ok(()) => ServerWsMessage::Reset { ok: true },
      Err(e) => ws_error(e),
    },
  }
}
