//! In-memory transport for tests: replays canned responses in order and
//! records every request it receives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use couchlink_core::ClientConfig;
use reqwest::Method;
use serde_json::Value;

use crate::transport::{Response, Transport};
use crate::{Client, ClientError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Response>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response
    pub fn respond(self, status: u16, json: Value) -> Self {
        self.push(Response::new(status, Some(json)));
        self
    }

    pub fn push(&self, response: Response) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request was made")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::Connection {
                message: "connection refused".to_string(),
            })
    }
}

/// Client wired to `mock`
pub fn client(mock: &Arc<MockTransport>) -> Client {
    Client::with_transport(ClientConfig::default(), mock.clone())
}
