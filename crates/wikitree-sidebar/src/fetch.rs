use std::collections::VecDeque;
use std::sync::mpsc::{self, TryRecvError};
use std::thread;

use anyhow::Context;
use reqwest::{StatusCode, Url, header};
use tracing::debug;
use wikitree_core::wire::{CSRF_TOKEN_HEADER, REMOTE_USER_HEADER, SidebarResponse};

/// Why the tree could not be loaded. Every variant means "no sidebar".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("invalid sidebar url {0}")]
    InvalidUrl(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("failed to fetch tree: {0}")]
    Transport(String),
    #[error("failed to parse response: {0}")]
    Parse(String),
}

pub type FetchResult = Result<SidebarResponse, FetchError>;

/// One read-only request for the page tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRequest {
    pub url: Url,
    pub remote_user: Option<String>,
    pub csrf_token: Option<String>,
}

/// A non-blocking source of page trees. `request` returns immediately; the
/// result is picked up later by `poll` on the UI thread.
pub trait TreeSource {
    fn request(&mut self, request: TreeRequest);
    fn poll(&mut self) -> Option<FetchResult>;
}

/// Parse an endpoint body.
pub fn parse_response(body: &str) -> FetchResult {
    serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))
}

// ── HTTP source ──────────────────────────────────────────────────────

/// Fetches trees over HTTP on a background thread with its own tokio runtime.
pub struct HttpTreeSource {
    sender: mpsc::Sender<TreeRequest>,
    receiver: mpsc::Receiver<FetchResult>,
}

impl HttpTreeSource {
    /// Spawn the background fetch thread.
    pub fn spawn() -> anyhow::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<TreeRequest>();
        let (result_tx, result_rx) = mpsc::channel::<FetchResult>();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?;

        thread::spawn(move || {
            rt.block_on(async move {
                let client = reqwest::Client::new();
                while let Ok(request) = request_rx.recv() {
                    let result = execute_request(&client, request).await;
                    if result_tx.send(result).is_err() {
                        break; // The page was navigated away from
                    }
                }
            });
        });

        Ok(Self {
            sender: request_tx,
            receiver: result_rx,
        })
    }
}

impl TreeSource for HttpTreeSource {
    fn request(&mut self, request: TreeRequest) {
        if self.sender.send(request).is_err() {
            debug!("Fetch thread is gone; dropping tree request");
        }
    }

    fn poll(&mut self) -> Option<FetchResult> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(FetchError::Transport(
                "fetch thread stopped".to_string(),
            ))),
        }
    }
}

/// Execute a tree request using reqwest.
async fn execute_request(client: &reqwest::Client, request: TreeRequest) -> FetchResult {
    let mut builder = client
        .get(request.url)
        .header(header::ACCEPT, "application/json")
        .header("X-Requested-With", "XMLHttpRequest");

    if let Some(login) = &request.remote_user {
        builder = builder.header(REMOTE_USER_HEADER, login);
    }
    if let Some(token) = &request.csrf_token {
        builder = builder.header(CSRF_TOKEN_HEADER, token);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status(status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Transport(format!("failed to read response body: {e}")))?;

    parse_response(&body)
}

// ── Static source ────────────────────────────────────────────────────

/// Answers every request with the same canned result. Used for offline
/// rendering and tests.
#[derive(Debug)]
pub struct StaticTreeSource {
    response: FetchResult,
    pending: VecDeque<FetchResult>,
    requests: Vec<TreeRequest>,
}

impl StaticTreeSource {
    pub fn new(response: FetchResult) -> Self {
        Self {
            response,
            pending: VecDeque::new(),
            requests: Vec::new(),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> &[TreeRequest] {
        &self.requests
    }
}

impl TreeSource for StaticTreeSource {
    fn request(&mut self, request: TreeRequest) {
        self.requests.push(request);
        self.pending.push_back(self.response.clone());
    }

    fn poll(&mut self) -> Option<FetchResult> {
        self.pending.pop_front()
    }
}
