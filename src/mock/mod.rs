//! Mock implementations for testing
//!
//! [`MockLiquidCheckClient`] replays a script of responses, records every call
//! and can delay responses to exercise overlapping refreshes.

use crate::client::{ClientFactory, LiquidCheckClient, DEFAULT_TIMEOUT};
use crate::error::{Result, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Scripted response of the mock device
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// HTTP 200 with this status document
    Document(Value),
    /// Non-200 HTTP status
    HttpStatus(u16),
    /// Request timed out
    Timeout,
    /// Body that is not JSON
    Malformed,
    /// The fetch panics
    Panic,
}

/// Mock Liquid-Check client for testing
#[derive(Debug)]
pub struct MockLiquidCheckClient {
    host: String,
    /// Pending status responses; the last one repeats
    status_responses: Mutex<VecDeque<MockResponse>>,
    /// Response to every command
    command_response: Mutex<MockResponse>,
    delay: Option<Duration>,
    fetch_calls: AtomicUsize,
    commands: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockLiquidCheckClient {
    /// Create new mock client answering every fetch with `{}`
    pub fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            status_responses: Mutex::new(VecDeque::from([MockResponse::Document(
                serde_json::json!({}),
            )])),
            command_response: Mutex::new(MockResponse::Document(Value::Null)),
            delay: None,
            fetch_calls: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Replace the status script
    pub fn with_responses(self, responses: impl IntoIterator<Item = MockResponse>) -> Self {
        *lock(&self.status_responses) = responses.into_iter().collect();
        self
    }

    /// Delay every call by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer every command with `response`
    pub fn with_command_response(self, response: MockResponse) -> Self {
        *lock(&self.command_response) = response;
        self
    }

    /// Append to the status script
    pub fn push_response(&self, response: MockResponse) {
        lock(&self.status_responses).push_back(response);
    }

    /// Number of status fetches performed
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Command names received, in order
    pub fn commands(&self) -> Vec<String> {
        lock(&self.commands).clone()
    }

    fn next_status_response(&self) -> MockResponse {
        let mut responses = lock(&self.status_responses);
        if responses.len() > 1 {
            responses.pop_front().unwrap_or(MockResponse::HttpStatus(500))
        } else {
            responses
                .front()
                .cloned()
                .unwrap_or(MockResponse::HttpStatus(500))
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.host, path)
    }

    fn respond(
        &self,
        response: MockResponse,
        url: String,
    ) -> std::result::Result<Value, TransportError> {
        match response {
            MockResponse::Document(document) => Ok(document),
            MockResponse::HttpStatus(status) => Err(TransportError::Status { url, status }),
            MockResponse::Timeout => Err(TransportError::Timeout {
                url,
                timeout: DEFAULT_TIMEOUT,
            }),
            MockResponse::Malformed => {
                let source = serde_json::from_str::<Value>("<html>").unwrap_err();
                Err(TransportError::MalformedBody { url, source })
            }
            MockResponse::Panic => panic!("mock device panicked"),
        }
    }
}

#[async_trait]
impl LiquidCheckClient for MockLiquidCheckClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn fetch_status(&self) -> std::result::Result<Value, TransportError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let response = self.next_status_response();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.respond(response, self.url("infos.json"))
    }

    async fn send_command(&self, command_name: &str) -> std::result::Result<(), TransportError> {
        lock(&self.commands).push(command_name.to_string());
        let response = lock(&self.command_response).clone();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.respond(response, self.url("command")).map(|_| ())
    }
}

/// Factory handing out pre-registered mock clients by host
#[derive(Debug, Default)]
pub struct MockClientFactory {
    clients: Mutex<HashMap<String, Arc<MockLiquidCheckClient>>>,
    created: AtomicUsize,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the client returned for its host
    pub fn register(&self, client: Arc<MockLiquidCheckClient>) {
        lock(&self.clients).insert(client.host().to_string(), client);
    }

    /// Number of clients created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ClientFactory for MockClientFactory {
    fn create_client(&self, host: &str) -> Result<Arc<dyn LiquidCheckClient>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let client: Arc<dyn LiquidCheckClient> = lock(&self.clients)
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(MockLiquidCheckClient::new(host)))
            .clone();
        Ok(client)
    }
}
