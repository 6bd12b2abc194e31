//! In-memory test doubles for the transport and review strategies.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use relay_core::RelayError;

use crate::llm::{HttpResponse, Transport};
use crate::review::ReviewStrategy;

/// One scripted transport outcome.
pub enum Reply {
    Status(u16, String),
    Transport(String),
}

impl Reply {
    pub fn status(status: u16, body: &str) -> Self {
        Reply::Status(status, body.to_string())
    }

    pub fn transport(message: &str) -> Self {
        Reply::Transport(message.to_string())
    }
}

/// Transport that plays back replies in order and records what it was sent.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
    bodies: Mutex<Vec<serde_json::Value>>,
    headers: Mutex<Vec<Vec<(String, String)>>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
            headers: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().unwrap().clone()
    }

    pub fn headers(&self) -> Vec<Vec<(String, String)>> {
        self.headers.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(
        &self,
        _url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(body.clone());
        self.headers.lock().unwrap().push(
            headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Status(status, body)) => Ok(HttpResponse { status, body }),
            Some(Reply::Transport(message)) => Err(RelayError::Transport(message)),
            None => panic!("scripted transport ran out of replies"),
        }
    }
}

/// Review strategy with a fixed outcome and a shared call counter.
pub struct FixedStrategy {
    name: &'static str,
    outcome: Result<String, String>,
    calls: Arc<AtomicUsize>,
}

impl FixedStrategy {
    pub fn ok(name: &'static str, output: &str) -> (Self, Arc<AtomicUsize>) {
        Self::build(name, Ok(output.to_string()))
    }

    pub fn failing(name: &'static str, message: &str) -> (Self, Arc<AtomicUsize>) {
        Self::build(name, Err(message.to_string()))
    }

    fn build(name: &'static str, outcome: Result<String, String>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = Self {
            name,
            outcome,
            calls: Arc::clone(&calls),
        };
        (strategy, calls)
    }
}

#[async_trait]
impl ReviewStrategy for FixedStrategy {
    fn name(&self) -> &str {
        self.name
    }

    async fn review(&self, _prompt: &str) -> Result<String, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(output) => Ok(output.clone()),
            Err(message) => Err(RelayError::Subprocess(message.clone())),
        }
    }
}
