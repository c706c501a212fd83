//! Recording fakes for the port traits.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use events::{DispatchResult, HttpSink, Mailer, OutcomeRecorder, RequestId, SinkError, SinkResponse};
use serde_json::Value;

/// Records every POST and answers with a fixed status.
pub struct RecordingSink {
    pub status_code: u16,
    pub status_text: String,
    pub delay: Duration,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl RecordingSink {
    pub fn answering(status_code: u16, status_text: &str) -> Self {
        Self {
            status_code,
            status_text: status_text.to_string(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn ok() -> Self {
        Self::answering(200, "OK")
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpSink for RecordingSink {
    async fn post(&self, url: &str, body: &Value) -> Result<SinkResponse, SinkError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), body.clone()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(SinkResponse {
            status_code: self.status_code,
            status_text: self.status_text.clone(),
        })
    }
}

/// Records every send and succeeds, or fails with a fixed reason.
#[derive(Default)]
pub struct RecordingMailer {
    pub failure: Option<String>,
    pub panics: bool,
    pub delay: Duration,
    pub calls: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMailer {
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<u16, SinkError> {
        self.calls
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), html.to_string()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panics {
            panic!("mailer exploded");
        }
        match &self.failure {
            Some(reason) => Err(SinkError::Transport {
                reason: reason.clone(),
            }),
            None => Ok(200),
        }
    }
}

/// Collects background settlements.
#[derive(Default)]
pub struct CollectingRecorder {
    pub results: Mutex<Vec<(RequestId, DispatchResult)>>,
}

impl CollectingRecorder {
    pub fn results(&self) -> Vec<(RequestId, DispatchResult)> {
        self.results.lock().unwrap().clone()
    }

    /// Polls until `count` settlements arrived or a second has passed.
    pub async fn wait_for(&self, count: usize) -> Vec<(RequestId, DispatchResult)> {
        for _ in 0..100 {
            let results = self.results();
            if results.len() >= count {
                return results;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.results()
    }
}

impl OutcomeRecorder for CollectingRecorder {
    fn record(&self, request_id: RequestId, result: &DispatchResult) {
        self.results
            .lock()
            .unwrap()
            .push((request_id, result.clone()));
    }
}
