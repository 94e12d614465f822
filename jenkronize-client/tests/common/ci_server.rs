//! Minimal HTTP/1.1 server standing in for a Jenkins instance in tests.
//!
//! Serves a fixed set of routes (matched on path, query ignored). Binary
//! routes honor `Range: bytes=X-` with 206 / 416 responses like a real server.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Route {
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Bytes sent before the connection is dropped on the first GET
    pub cut_first_response_at: Option<usize>,
}

impl Route {
    pub fn json(body: &str) -> Self {
        Self {
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
            cut_first_response_at: None,
        }
    }

    pub fn html(body: &str) -> Self {
        Self {
            content_type: "text/html",
            body: body.as_bytes().to_vec(),
            cut_first_response_at: None,
        }
    }

    pub fn file(body: Vec<u8>) -> Self {
        Self {
            content_type: "application/octet-stream",
            body,
            cut_first_response_at: None,
        }
    }

    pub fn cut_first_response_at(mut self, bytes: usize) -> Self {
        self.cut_first_response_at = Some(bytes);
        self
    }
}

/// Handle to a running server
#[derive(Clone)]
pub struct CiServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CiServer {
    /// Raw request heads received so far, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> CiServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Route>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, route)| (path.to_string(), route))
            .collect(),
    );
    let requests = Arc::new(Mutex::new(Vec::new()));
    let served = Arc::new(AtomicUsize::new(0));

    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let log = Arc::clone(&log);
            let served = Arc::clone(&served);
            thread::spawn(move || handle(stream, &routes, &log, &served));
        }
    });

    CiServer {
        base_url: format!("http://127.0.0.1:{}", port),
        requests,
    }
}

/// Returns a URL on a port nothing listens on
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn handle(
    mut stream: std::net::TcpStream,
    routes: &HashMap<String, Route>,
    log: &Mutex<Vec<String>>,
    served: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s.to_string(),
        Err(_) => return,
    };
    log.lock().unwrap().push(request.clone());

    let (path, range) = parse_request(&request);
    let Some(route) = routes.get(path) else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\n\r\nnot found");
        return;
    };

    let body = &route.body;
    let total = body.len() as u64;

    if let Some(start) = range {
        if start >= total {
            let response = format!(
                "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Length: 0\r\nContent-Range: bytes */{}\r\n\r\n",
                total
            );
            let _ = stream.write_all(response.as_bytes());
            return;
        }
        let slice = &body[start as usize..];
        let response = format!(
            "HTTP/1.1 206 Partial Content\r\nContent-Type: {}\r\nContent-Length: {}\r\nContent-Range: bytes {}-{}/{}\r\n\r\n",
            route.content_type,
            slice.len(),
            start,
            total.saturating_sub(1),
            total
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(slice);
        return;
    }

    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nAccept-Ranges: bytes\r\n\r\n",
        route.content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());

    let cut = route
        .cut_first_response_at
        .filter(|_| served.fetch_add(1, Ordering::SeqCst) == 0);
    match cut {
        Some(cut) => {
            let _ = stream.write_all(&body[..cut.min(body.len())]);
            let _ = stream.flush();
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        _ => {
            let _ = stream.write_all(body);
        }
    }
}

/// Returns (path without query, optional range start for `Range: bytes=X-`).
fn parse_request(request: &str) -> (&str, Option<u64>) {
    let mut path = "";
    let mut range = None;
    for (i, line) in request.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if i == 0 {
            let target = line.split_whitespace().nth(1).unwrap_or("");
            path = target.split('?').next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if let Some(spec) = value.strip_prefix("bytes=") {
                    if let Some((a, _)) = spec.split_once('-') {
                        range = a.trim().parse::<u64>().ok();
                    }
                }
            }
        }
    }
    (path, range)
}
