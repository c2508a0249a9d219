use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    error::OpsError,
    flow::{Classifier, ConversationStep},
    verifier::{ChatResponse, ChatTransport},
};

/// One canned answer for the scripted transport.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// HTTP 200 with this body.
    Ok(String),
    /// Arbitrary status and body.
    Http(u16, String),
    /// Simulated transport failure (timeout, connection refused).
    Down,
}

/// Offline stand-in for the webhook: replays canned answers in order and logs
/// every message it was given. Used by the test suite and by the load CLI's
/// `--scripted` smoke mode.
pub struct ScriptedTransport {
    replies: Vec<ScriptedReply>,
    cursor: Mutex<usize>,
    sent: Mutex<Vec<(String, String)>>,
    health_status: u16,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies,
            cursor: Mutex::new(0),
            sent: Mutex::new(Vec::new()),
            health_status: 200,
        }
    }

    /// Canned answers that echo a phrase classifying as each step's expected
    /// state, so a verifier run against this transport passes cleanly.
    pub fn echoing(flow: &[ConversationStep], classifier: &Classifier) -> Self {
        Self::new(Self::echo_replies(flow, classifier))
    }

    pub fn echo_replies(flow: &[ConversationStep], classifier: &Classifier) -> Vec<ScriptedReply> {
        flow.iter()
            .map(|step| {
                let phrase = classifier
                    .example_phrase(step.expected)
                    .unwrap_or("nessuna risposta prevista");
                ScriptedReply::Ok(format!("Sofia: {phrase}"))
            })
            .collect()
    }

    pub fn with_health(mut self, status: u16) -> Self {
        self.health_status = status;
        self
    }

    /// Every `(from, body)` pair delivered so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        let mut cursor = self.cursor.lock().unwrap();
        let reply = self.replies.get(*cursor).cloned();
        if reply.is_some() {
            *cursor += 1;
        }
        reply
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send_message(&self, from: &str, body: &str) -> Result<ChatResponse, OpsError> {
        self.sent
            .lock()
            .unwrap()
            .push((from.to_string(), body.to_string()));

        match self.next_reply() {
            Some(ScriptedReply::Ok(body)) => Ok(ChatResponse { status: 200, body }),
            Some(ScriptedReply::Http(status, body)) => Ok(ChatResponse { status, body }),
            Some(ScriptedReply::Down) => {
                Err(OpsError::Upstream("scripted transport failure".to_string()))
            }
            None => Err(OpsError::Upstream("no more scripted replies".to_string())),
        }
    }

    async fn health(&self) -> Result<u16, OpsError> {
        Ok(self.health_status)
    }
}
