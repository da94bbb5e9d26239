//! Shared helpers: a scripted HTTP/1.1 server on localhost and a surface
//! that records everything shown to the user.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use combiner::config::{Config, JoinPolicy, TransportKind};
use combiner::surface::Surface;

// ---------------------------------------------------------------------------
// Mock server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// True for the combining call (its system prompt mentions synthesizing).
    pub fn is_synthesis(&self) -> bool {
        self.json()["messages"][0]["content"]
            .as_str()
            .is_some_and(|s| s.contains("synthesizing"))
    }
}

pub enum Reply {
    Body {
        status: u16,
        content_type: &'static str,
        body: Vec<u8>,
        delay: Duration,
    },
    /// Chunked body; without `terminate` the socket closes before the final
    /// zero-length chunk.
    Chunked {
        chunks: Vec<Vec<u8>>,
        pause: Duration,
        terminate: bool,
    },
    /// Read the request, then close the socket without answering.
    Hangup,
}

impl Reply {
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Reply::Body {
            status,
            content_type: "application/json",
            body: value.to_string().into_bytes(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Reply::Body {
            status,
            content_type: "text/plain",
            body: body.as_bytes().to_vec(),
            delay: Duration::ZERO,
        }
    }

    /// OpenAI-style chat completion carrying `content`.
    pub fn completion(content: &str) -> Self {
        Self::json(
            200,
            serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            }),
        )
    }

    pub fn chunks(chunks: &[&[u8]]) -> Self {
        Reply::Chunked {
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            pause: Duration::from_millis(20),
            terminate: true,
        }
    }

    pub fn text_chunks(chunks: &[&str]) -> Self {
        Reply::Chunked {
            chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            pause: Duration::from_millis(20),
            terminate: true,
        }
    }

    /// Send some chunks, then drop the connection mid-body.
    pub fn broken_after(chunks: &[&str]) -> Self {
        match Self::text_chunks(chunks) {
            Reply::Chunked { chunks, pause, .. } => Reply::Chunked {
                chunks,
                pause,
                terminate: false,
            },
            other => other,
        }
    }

    pub fn delayed(self, by: Duration) -> Self {
        match self {
            Reply::Body {
                status,
                content_type,
                body,
                ..
            } => Reply::Body {
                status,
                content_type,
                body,
                delay: by,
            },
            other => other,
        }
    }
}

type Handler = dyn Fn(&RecordedRequest) -> Reply + Send + Sync;

pub struct MockServer {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    accept_loop: JoinHandle<()>,
}

impl MockServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let recorded = requests.clone();
        let accept_loop = tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    serve_connection(socket, handler, recorded).await;
                });
            }
        });

        Self {
            url: format!("http://127.0.0.1:{port}"),
            requests,
            accept_loop,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

async fn serve_connection(
    mut socket: TcpStream,
    handler: Arc<Handler>,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    let reply = handler(&request);
    recorded.lock().unwrap().push(request);

    match reply {
        Reply::Body {
            status,
            content_type,
            body,
            delay,
        } => {
            tokio::time::sleep(delay).await;
            let head = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                reason(status),
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
        }
        Reply::Chunked {
            chunks,
            pause,
            terminate,
        } => {
            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
            let _ = socket.write_all(head.as_bytes()).await;
            for chunk in chunks {
                let _ = socket
                    .write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
                    .await;
                let _ = socket.write_all(&chunk).await;
                let _ = socket.write_all(b"\r\n").await;
                let _ = socket.flush().await;
                tokio::time::sleep(pause).await;
            }
            if terminate {
                let _ = socket.write_all(b"0\r\n\r\n").await;
            }
        }
        Reply::Hangup => {}
    }
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    }

    Some(RecordedRequest {
        method,
        path,
        headers,
        body: buf[header_end..header_end + content_length].to_vec(),
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// A localhost URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

// ---------------------------------------------------------------------------
// Config shortcuts
// ---------------------------------------------------------------------------

pub fn proxy_config(url: &str, transport: TransportKind) -> Config {
    Config {
        transport,
        backend_url: url.to_string(),
        ..Config::default()
    }
}

pub fn direct_config(url: &str, join_policy: JoinPolicy) -> Config {
    let mut config = Config {
        transport: TransportKind::Direct,
        join_policy,
        ..Config::default()
    };
    config.provider.endpoint = format!("{url}/openai/v1/chat/completions");
    config.provider.api_key = Some("test-key".to_string());
    config
}

pub fn models(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Recording surface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Alert(String),
    Loading(bool),
    Render(String),
    Clear,
}

#[derive(Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<Event>>,
}

impl RecordingSurface {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl Surface for RecordingSurface {
    fn alert(&self, message: &str) {
        self.push(Event::Alert(message.to_string()));
    }

    fn set_loading(&self, visible: bool) {
        self.push(Event::Loading(visible));
    }

    fn render(&self, text: &str) {
        self.push(Event::Render(text.to_string()));
    }

    fn clear(&self) {
        self.push(Event::Clear);
    }
}
