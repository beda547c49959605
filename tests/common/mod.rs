//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Paths requested from a mock configuration server, in arrival order.
pub type RequestLog = Arc<Mutex<Vec<String>>>;

/// Start a mock configuration server that serves one fixed JSON document.
///
/// Returns the bound address and a log of every requested path.
pub async fn start_mock_config_server(document: String) -> (SocketAddr, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let log = requests.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let document = document.clone();
                    let log = log.clone();
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 4096];
                        let read = socket.read(&mut buf).await.unwrap_or(0);
                        if let Some(path) = request_path(&buf[..read]) {
                            log.lock().unwrap().push(path);
                        }

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            document.len(),
                            document
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, requests)
}

/// Extract the request path from a raw HTTP request head.
fn request_path(head: &[u8]) -> Option<String> {
    let head = std::str::from_utf8(head).ok()?;
    let mut parts = head.lines().next()?.split_whitespace();
    let _method = parts.next()?;
    parts.next().map(str::to_string)
}

/// Render a configuration-server document with one property source.
pub fn config_document(source: serde_json::Value) -> String {
    json!({
        "name": "vipservice",
        "profiles": ["test"],
        "label": "master",
        "version": "0ab1c2d",
        "propertySources": [
            { "name": "vipservice-test.yml", "source": source }
        ]
    })
    .to_string()
}
