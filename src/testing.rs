//! Test helpers shared by unit tests

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Canned response: status, extra headers, body
pub type Route = (u16, Vec<(&'static str, String)>, String);

pub fn route(status: u16, body: &str) -> Route {
    (status, Vec::new(), body.to_string())
}

/// Minimal HTTP/1.1 server answering by exact request target.
///
/// Unknown targets get a `NoSuchBucket` 404. Every raw request head is kept
/// for assertions.
pub struct StubServer {
    pub endpoint: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(routes: HashMap<String, Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        let routes = Arc::new(routes);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        let n = socket.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            return;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                    }

                    let request = String::from_utf8_lossy(&buf).to_string();
                    let target = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    log.lock().push(request);

                    let (status, headers, body) = routes.get(&target).cloned().unwrap_or_else(|| {
                        route(404, "<Error><Code>NoSuchBucket</Code></Error>")
                    });

                    let mut response = format!(
                        "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n",
                        status,
                        body.len()
                    );
                    for (name, value) in headers {
                        response.push_str(&format!("{}: {}\r\n", name, value));
                    }
                    response.push_str("\r\n");
                    response.push_str(&body);
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            endpoint: format!("http://{}", addr),
            requests,
        }
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}
