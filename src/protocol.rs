//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and clients independently.

use serde::{Deserialize, Serialize};

use crate::domain::Question;
use crate::tracker::{Feedback, Verdict};
use crate::tutoring::TutorStep;

/// What the learner asked for in one conversational turn.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Intent {
    Launch,
    Question,
    Answer {
        #[serde(default)]
        value: Option<String>,
    },
    Help,
    Repeat,
    StartOver,
    Yes,
    No,
    Stop,
    Cancel,
    Feedback,
    Tutor,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::Launch => "launch",
            Intent::Question => "question",
            Intent::Answer { .. } => "answer",
            Intent::Help => "help",
            Intent::Repeat => "repeat",
            Intent::StartOver => "start_over",
            Intent::Yes => "yes",
            Intent::No => "no",
            Intent::Stop => "stop",
            Intent::Cancel => "cancel",
            Intent::Feedback => "feedback",
            Intent::Tutor => "tutor",
        }
    }
}

/// Where the conversation is. Decides how yes/no/answer are interpreted.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Welcome,
    AwaitingAnswer,
    CheckedAnswer,
    Help,
    Tutoring,
    Feedback,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Welcome => "welcome",
            Stage::AwaitingAnswer => "awaiting_answer",
            Stage::CheckedAnswer => "checked_answer",
            Stage::Help => "help",
            Stage::Tutoring => "tutoring",
            Stage::Feedback => "feedback",
        }
    }
}

/// Last thing said, kept for "repeat".
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Spoken {
    pub title: String,
    pub ssml: String,
    pub reprompt: Option<String>,
}

/// Opaque session state the client hands back on every turn.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SessionState {
    #[serde(default)]
    pub stage: Stage,
    #[serde(default)]
    pub question: Option<Question>,
    #[serde(default)]
    pub last: Option<Spoken>,
}

/// Speech + card output for one turn.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SpeechResponse {
    pub title: String,
    pub ssml: String,
    pub card_text: String,
    pub reprompt: Option<String>,
    pub should_end_session: bool,
    pub session: SessionState,
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Turn {
        #[serde(rename = "userId")]
        user_id: String,
        intent: Intent,
        #[serde(default)]
        session: SessionState,
    },
    NewQuestion {
        #[serde(rename = "userId")]
        user_id: String,
    },
    SubmitAnswer {
        #[serde(rename = "userId")]
        user_id: String,
        question: Question,
        answer: String,
    },
    Feedback {
        #[serde(rename = "userId")]
        user_id: String,
    },
    TutorNext {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Reset {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Speech {
        response: SpeechResponse,
    },
    Question {
        level: i32,
        question: Question,
    },
    AnswerResult {
        verdict: Verdict,
    },
    Feedback {
        feedback: Feedback,
    },
    TutorStep {
        step: TutorStep,
    },
    Reset {
        ok: bool,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct UserIn {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TurnIn {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub intent: Intent,
    #[serde(default)]
    pub session: SessionState,
}

#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub level: i32,
    pub question: Question,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub question: Question,
    pub answer: String,
}

#[derive(Serialize)]
pub struct LevelOut {
    pub level: i32,
}

#[derive(Serialize)]
pub struct ResetOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_payload_parses_with_default_session() {
        let t: TurnIn = serde_json::from_str(r#"{"userId":"u","intent":{"name":"answer","value":"true"}}"#).unwrap();
        assert_eq!(t.intent, Intent::Answer { value: Some("true".into()) });
        assert_eq!(t.session, SessionState::default());

        let t: TurnIn = serde_json::from_str(r#"{"userId":"u","intent":{"name":"start_over"}}"#).unwrap();
        assert_eq!(t.intent.name(), "start_over");
    }

    #[test]
    fn ws_messages_are_tagged() {
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"tutor_next","userId":"u"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::TutorNext { .. }));
        let out = serde_json::to_value(ServerWsMessage::Reset { ok: true }).unwrap();
        assert_eq!(out["type"], "reset");
    }
}
