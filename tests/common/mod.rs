//! Minimal threaded HTTP/1.1 server serving canned routes for integration tests.
//!
//! Every response closes the connection. Unknown paths get a 404. Requests are
//! counted per path, `Referer` and `Origin` are recorded, and the peak number of
//! requests being served at once is tracked.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub location: Option<String>,
    pub delay: Option<Duration>,
}

impl Route {
    pub fn ok(content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.into(),
            location: None,
            delay: None,
        }
    }

    pub fn html(body: &str) -> Self {
        Self::ok("text/html; charset=utf-8", body)
    }

    pub fn css(body: &str) -> Self {
        Self::ok("text/css", body)
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: b"error".to_vec(),
            location: None,
            delay: None,
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self {
            status: 302,
            content_type: "text/plain",
            body: Vec::new(),
            location: Some(location.to_string()),
            delay: None,
        }
    }

    /// Holds the response back for `millis` before answering.
    pub fn delayed(mut self, millis: u64) -> Self {
        self.delay = Some(Duration::from_millis(millis));
        self
    }
}

#[derive(Default)]
struct State {
    hits: HashMap<String, usize>,
    referers: HashMap<String, String>,
    origins: HashMap<String, String>,
    in_flight: usize,
    peak_in_flight: usize,
}

pub struct TestServer {
    pub base: String,
    state: Arc<Mutex<State>>,
}

impl TestServer {
    /// Serves `routes` (keyed by path, query included) until the process exits.
    pub fn start(routes: Vec<(&str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );
        let state = Arc::new(Mutex::new(State::default()));

        let server_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                let state = Arc::clone(&server_state);
                thread::spawn(move || handle(stream, &routes, &state));
            }
        });

        Self {
            base: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.lock().unwrap().hits.get(path).copied().unwrap_or(0)
    }

    pub fn referer(&self, path: &str) -> Option<String> {
        self.state.lock().unwrap().referers.get(path).cloned()
    }

    pub fn origin(&self, path: &str) -> Option<String> {
        self.state.lock().unwrap().origins.get(path).cloned()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.state.lock().unwrap().peak_in_flight
    }
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Route>, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let request = String::from_utf8_lossy(&buf);
    let mut lines = request.lines();
    let path = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    {
        let mut state = state.lock().unwrap();
        *state.hits.entry(path.clone()).or_insert(0) += 1;
        state.in_flight += 1;
        state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim();
                if name.eq_ignore_ascii_case("referer") {
                    state.referers.insert(path.clone(), value.trim().to_string());
                } else if name.eq_ignore_ascii_case("origin") {
                    state.origins.insert(path.clone(), value.trim().to_string());
                }
            }
        }
    }

    let route = routes.get(&path).cloned().unwrap_or_else(|| Route::status(404));
    if let Some(delay) = route.delay {
        thread::sleep(delay);
    }
    // Released before the response goes out, so a client that reuses its slot
    // for the next request is never counted twice.
    state.lock().unwrap().in_flight -= 1;

    let reason = match route.status {
        200 => "OK",
        302 => "Found",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let location = route
        .location
        .as_ref()
        .map(|l| format!("Location: {}\r\n", l))
        .unwrap_or_default();
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        route.status,
        reason,
        route.content_type,
        route.body.len(),
        location
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&route.body);
    let _ = stream.flush();
}
