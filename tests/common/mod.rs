//! Shared test helpers: a minimal scripted HTTP server and record builders.
#![allow(dead_code)]

use chrono::Utc;
use scanferry::{FileRecord, HashAlgorithm};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// One captured POST: raw header lines plus the body bytes.
#[derive(Clone, Debug)]
pub struct CapturedRequest {
    pub headers: Vec<String>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<String> {
        let want = format!("{}:", name.to_ascii_lowercase());
        self.headers.iter().find_map(|line| {
            let lower = line.to_ascii_lowercase();
            lower
                .strip_prefix(&want)
                .map(|_| line[want.len()..].trim().to_string())
        })
    }

    pub fn json_records(&self) -> Vec<FileRecord> {
        serde_json::from_slice(&self.body).expect("request body should be a record array")
    }
}

struct ServerState {
    responses: Mutex<VecDeque<u16>>,
    requests: Mutex<Vec<CapturedRequest>>,
    shutdown: AtomicBool,
}

/// Scripted HTTP sink bound to an ephemeral port. Each request pops the next
/// status code from the script (200 once exhausted) and is captured for
/// inspection.
pub struct MockServer {
    pub url: String,
    state: Arc<ServerState>,
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    pub fn start(script: &[u16]) -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        listener
            .set_nonblocking(true)
            .expect("set mock server non-blocking");
        let port = listener.local_addr().unwrap().port();

        let state = Arc::new(ServerState {
            responses: Mutex::new(script.iter().copied().collect()),
            requests: Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
        });

        let thread_state = Arc::clone(&state);
        let handle = thread::spawn(move || {
            while !thread_state.shutdown.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let _ = handle_connection(stream, &thread_state);
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        MockServer {
            url: format!("http://127.0.0.1:{}", port),
            state,
            handle: Some(handle),
        }
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// All records across every captured request, in arrival order.
    pub fn records_received(&self) -> Vec<FileRecord> {
        self.requests()
            .iter()
            .flat_map(|r| r.json_records())
            .collect()
    }

    /// Poll until at least `n` requests arrived or `timeout` passes.
    pub fn wait_for_requests(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.request_count() >= n {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        self.request_count() >= n
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.state.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_connection(stream: TcpStream, state: &ServerState) -> std::io::Result<()> {
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    if request_line.is_empty() {
        return Ok(());
    }

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        if line == "\r\n" || line == "\n" || line.is_empty() {
            break;
        }
        let trimmed = line.trim_end().to_string();
        let lower = trimmed.to_ascii_lowercase();
        if let Some(v) = lower.strip_prefix("content-length:") {
            content_length = v.trim().parse().unwrap_or(0);
        }
        headers.push(trimmed);
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;

    let status = state
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(200);
    state
        .requests
        .lock()
        .unwrap()
        .push(CapturedRequest { headers, body });

    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {} {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        status, reason
    )?;
    stream.flush()
}

/// Well-formed record with a given path and hash, sha256 by default.
pub fn test_record(path: &str, hash: &str) -> FileRecord {
    let name = path.rsplit('/').next().unwrap_or(path).to_string();
    FileRecord {
        path: path.to_string(),
        name,
        size: 5,
        mod_time: Utc::now(),
        hash: hash.to_string(),
        hash_algorithm: HashAlgorithm::Sha256,
        mime_type: String::new(),
        strings: None,
        error: String::new(),
        is_executable: false,
        processed_at: Utc::now(),
    }
}

/// Record that carries only a processing error.
pub fn error_record(path: &str, error: &str) -> FileRecord {
    let mut record = test_record(path, "");
    record.error = error.to_string();
    record
}
