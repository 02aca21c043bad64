//! Scripted and recording fakes for the collaborator seams
//!
//! Used by unit tests and by the integration tests under `tests/`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::integrations::{ChatAdapter, ChatMessage, DocumentStore, IssueRecord, IssueRequest, IssueTracker};
use crate::planning::{OracleError, PlanOracle, PlanRun};
use crate::review::{PromptError, Prompter};

fn locked<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Planning oracle that replays a fixed list of results, then returns `Ok(None)`
#[derive(Default)]
pub struct ScriptedOracle {
    results: Mutex<VecDeque<Result<Option<PlanRun>, OracleError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(results: Vec<Result<Option<PlanRun>, OracleError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        locked(&self.prompts).len()
    }

    /// Prompts received, in call order
    pub fn prompts(&self) -> Vec<String> {
        locked(&self.prompts).clone()
    }
}

#[async_trait]
impl PlanOracle for ScriptedOracle {
    async fn run(&self, prompt: &str) -> Result<Option<PlanRun>, OracleError> {
        locked(&self.prompts).push(prompt.to_string());
        locked(&self.results).pop_front().unwrap_or(Ok(None))
    }
}

/// Prompter that answers from a fixed list of lines, then reports EOF
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    lines: VecDeque<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Lines not yet consumed
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn read_line(&mut self, _prompt: &str) -> Result<String, PromptError> {
        self.lines.pop_front().ok_or(PromptError::Eof)
    }
}

/// Chat adapter serving canned messages and recording what was sent
#[derive(Default)]
pub struct RecordingChat {
    messages: Vec<ChatMessage>,
    fetches: Mutex<Vec<(String, u32)>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingChat {
    /// Serve `(user, text, timestamp)` messages on every channel
    pub fn with_messages(messages: Vec<(&str, &str, &str)>) -> Self {
        Self {
            messages: messages
                .into_iter()
                .map(|(user, text, timestamp)| ChatMessage {
                    user: user.to_string(),
                    text: text.to_string(),
                    timestamp: timestamp.to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }

    /// `(channel, limit)` of each fetch
    pub fn fetches(&self) -> Vec<(String, u32)> {
        locked(&self.fetches).clone()
    }

    /// `(channel, text)` of each sent message
    pub fn sent(&self) -> Vec<(String, String)> {
        locked(&self.sent).clone()
    }
}

#[async_trait]
impl ChatAdapter for RecordingChat {
    async fn fetch_channel_messages(&self, channel: &str, limit: u32) -> Vec<ChatMessage> {
        locked(&self.fetches).push((channel.to_string(), limit));
        self.messages.iter().take(limit as usize).cloned().collect()
    }

    async fn send_message(&self, channel: &str, text: &str) -> bool {
        locked(&self.sent).push((channel.to_string(), text.to_string()));
        true
    }
}

/// Document store keeping pages in memory
#[derive(Default)]
pub struct RecordingDocs {
    fail: bool,
    pages: Mutex<Vec<(String, String)>>,
    contents: Mutex<Vec<(String, String)>>,
}

impl RecordingDocs {
    /// A store whose page creation always fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(title, priority)` of each created page
    pub fn pages(&self) -> Vec<(String, String)> {
        locked(&self.pages).clone()
    }

    /// `(page_id, text)` of each append
    pub fn contents(&self) -> Vec<(String, String)> {
        locked(&self.contents).clone()
    }
}

#[async_trait]
impl DocumentStore for RecordingDocs {
    async fn create_page(&self, title: &str, priority: &str) -> Option<String> {
        if self.fail {
            return None;
        }
        let mut pages = locked(&self.pages);
        pages.push((title.to_string(), priority.to_string()));
        Some(format!("page-{}", pages.len()))
    }

    async fn append_content(&self, page_id: &str, text: &str) -> bool {
        locked(&self.contents).push((page_id.to_string(), text.to_string()));
        true
    }
}

/// Issue tracker keeping issues in memory
#[derive(Default)]
pub struct RecordingIssues {
    requests: Mutex<Vec<IssueRequest>>,
}

impl RecordingIssues {
    pub fn requests(&self) -> Vec<IssueRequest> {
        locked(&self.requests).clone()
    }
}

#[async_trait]
impl IssueTracker for RecordingIssues {
    async fn create_issue(&self, request: IssueRequest) -> Option<IssueRecord> {
        let mut requests = locked(&self.requests);
        let number = requests.len() as u64 + 1;
        let record = IssueRecord {
            id: number,
            number,
            title: request.title.clone(),
            url: format!("https://example.test/issues/{}", number),
            state: "open".to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        requests.push(request);
        Some(record)
    }
}

/// Local HTTP server answering every request with one canned status and JSON body
pub struct StubHttpServer {
    addr: std::net::SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl StubHttpServer {
    pub async fn start(status: u16, body: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let hits = Arc::new(AtomicUsize::new(0));
        let response = Arc::new(format!(
            "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\nretry-after: 0\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        ));

        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = counter.clone();
                let response = response.clone();
                tokio::spawn(async move {
                    if read_request(&mut socket, &counter, &response).await.is_err() {
                        tracing::debug!("StubHttpServer: connection dropped");
                    }
                });
            }
        });

        Ok(Self { addr, hits })
    }

    /// Absolute URL for `path` on this server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Requests received so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Read one request (headers plus `content-length` body), count it, reply
async fn read_request(socket: &mut TcpStream, counter: &AtomicUsize, response: &str) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    counter.fetch_add(1, Ordering::SeqCst);
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}
