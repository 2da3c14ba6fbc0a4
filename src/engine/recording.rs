//! In-memory engine for deterministic tests

use super::{Container, Engine, EngineError, EngineHealth, ImageReference};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// What the engine was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAction {
    Stdout,
    Publish { address: String },
}

/// A single evaluation request, in call order
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub action: RecordedAction,
    pub container: Container,
}

/// Result to hand back for the next evaluation
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Output(String),
    Failure(String),
}

impl ScriptedResponse {
    pub fn output(content: impl Into<String>) -> Self {
        ScriptedResponse::Output(content.into())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ScriptedResponse::Failure(message.into())
    }
}

/// Engine that records calls and replays scripted responses in FIFO order.
///
/// With an empty script, `stdout` returns an empty string and `publish`
/// returns `<address>@sha256:<container digest>`.
pub struct RecordingEngine {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<VecDeque<ScriptedResponse>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn add_response(&self, response: ScriptedResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = ScriptedResponse>) {
        let mut queue = self.responses.lock().unwrap();
        queue.extend(responses);
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, action: RecordedAction, container: &Container) -> Option<ScriptedResponse> {
        self.calls.lock().unwrap().push(RecordedCall {
            action,
            container: container.clone(),
        });
        self.responses.lock().unwrap().pop_front()
    }
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Engine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    async fn check(&self) -> EngineHealth {
        EngineHealth::available(self.name(), "In-memory engine")
    }

    async fn stdout(&self, container: &Container) -> Result<String, EngineError> {
        container.validate()?;
        match self.record(RecordedAction::Stdout, container) {
            Some(ScriptedResponse::Output(content)) => Ok(content),
            Some(ScriptedResponse::Failure(message)) => Err(EngineError::Scripted(message)),
            None => Ok(String::new()),
        }
    }

    async fn publish(&self, container: &Container, address: &str) -> Result<String, EngineError> {
        container.validate()?;
        ImageReference::parse(address)?;
        let action = RecordedAction::Publish {
            address: address.to_string(),
        };
        match self.record(action, container) {
            Some(ScriptedResponse::Output(content)) => Ok(content),
            Some(ScriptedResponse::Failure(message)) => Err(EngineError::Scripted(message)),
            None => Ok(format!("{}@sha256:{}", address, container.digest())),
        }
    }
}
