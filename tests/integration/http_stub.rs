//! Minimal HTTP stub for exercising the remote action client.
//!
//! Serves canned JSON bodies by path prefix and records every request
//! line, all in-memory with no external dependencies. Just enough
//! HTTP/1.1 to satisfy reqwest: one response per connection, then
//! close.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A recorded request: method and path (with query).
pub type RecordedRequest = (String, String);

pub struct StubServer {
    /// Base URL (`http://127.0.0.1:port`) to hand to the client.
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    /// Start a stub serving `routes`: the first entry whose path prefix
    /// matches the request path supplies the response body. Unmatched
    /// paths get a `status:false` envelope.
    pub async fn start(routes: Vec<(&'static str, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let Some((method, path)) = read_request(&mut socket).await else {
                        return;
                    };
                    recorded.lock().unwrap().push((method, path.clone()));

                    let body = routes
                        .iter()
                        .find(|(prefix, _)| path.starts_with(prefix))
                        .map(|(_, body)| body.clone())
                        .unwrap_or_else(|| {
                            r#"{"status": false, "msg": "unknown endpoint"}"#.to_string()
                        });
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body,
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { base_url, requests }
    }

    /// All requests seen so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Read one request (head plus any Content-Length body) and return the
/// request line's method and path.
async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<(String, String)> {
    let mut buf = vec![0u8; 16 * 1024];
    let mut read = 0;

    // Head first.
    let head_end = loop {
        let n = socket.read(&mut buf[read..]).await.ok()?;
        if n == 0 {
            return None;
        }
        read += n;
        if let Some(pos) = buf[..read].windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        if read == buf.len() {
            return None;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();

    // Drain the body so the client never sees a reset mid-write.
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    let total = (head_end + content_length).min(buf.len());
    while read < total {
        let n = socket.read(&mut buf[read..]).await.ok()?;
        if n == 0 {
            break;
        }
        read += n;
    }

    let request_line = head.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();
    Some((method, path))
}
