//! Shared helpers for integration tests.
//!
//! `ScriptedTransport` replays a fixed script of outcomes, one per request,
//! and records every request it sees.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use storefront_client::api::{ApiClient, ApiRequest, ApiResponse, Transport};
use storefront_client::cache::{ManualClock, ResponseCache};
use storefront_client::error::{ApiError, Result};

/// What the transport does for one request.
pub enum Step {
    Reply(Result<ApiResponse>),
    /// Reply after a delay (tokio time, so paused tests advance it).
    Delayed(Duration, Result<ApiResponse>),
    /// Never answer; only cancellation or dropping ends the call.
    Hang,
}

pub fn ok(data: Value) -> Step {
    Step::Reply(Ok(ApiResponse::ok(data)))
}

pub fn fail(status: StatusCode) -> Step {
    Step::Reply(Err(ApiError::status(status, None)))
}

pub fn fail_with(status: StatusCode, message: &str) -> Step {
    Step::Reply(Err(ApiError::status(status, Some(message.to_string()))))
}

pub fn busy() -> Step {
    fail(StatusCode::SERVICE_UNAVAILABLE)
}

#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ApiRequest>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn push(&self, step: Step) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        let step = self.script.lock().unwrap().pop_front();

        match step {
            Some(Step::Reply(result)) => result,
            Some(Step::Delayed(delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            Some(Step::Hang) => std::future::pending().await,
            None => Err(ApiError::Other("transport script exhausted".to_string())),
        }
    }
}

/// Client over a scripted transport with a manual clock and a short base delay.
pub fn client(steps: impl IntoIterator<Item = Step>) -> (ApiClient<ScriptedTransport>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let cache = ResponseCache::in_memory().with_clock(clock.clone());
    let client = ApiClient::new(ScriptedTransport::new(steps), cache)
        .with_base_delay(Duration::from_millis(100));
    (client, clock)
}
