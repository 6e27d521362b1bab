//! Shared fixtures for integration tests.
//!
//! - [`Entry`] / [`Fixture`]: describe a remote tree and get matching manifest
//!   JSON plus the file bodies a server would serve
//! - [`StaticManifest`] / [`MemoryFetcher`]: in-memory engine doubles
//! - [`TestServer`]: a tiny blocking HTTP/1.1 server on a loopback port

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use assetsync::manifest::parse_manifest;
use assetsync::sync::{FileFetcher, ManifestSource, ProgressEvent};
use assetsync::{EngineResult, Manifest, SyncError};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Remote tree fixtures
// ============================================================================

/// A node of a remote tree.
#[derive(Debug, Clone)]
pub enum Entry {
    File {
        name: String,
        body: Vec<u8>,
        sync: bool,
    },
    Dir {
        name: String,
        sync: bool,
        children: Vec<Entry>,
    },
}

/// Server-managed file (checksummed).
pub fn file(name: &str, body: &[u8]) -> Entry {
    Entry::File {
        name: name.to_string(),
        body: body.to_vec(),
        sync: true,
    }
}

/// Unmanaged file: fetched once if missing, never verified.
pub fn loose_file(name: &str, body: &[u8]) -> Entry {
    Entry::File {
        name: name.to_string(),
        body: body.to_vec(),
        sync: false,
    }
}

pub fn dir(name: &str, sync: bool, children: Vec<Entry>) -> Entry {
    Entry::Dir {
        name: name.to_string(),
        sync,
        children,
    }
}

/// A remote tree rendered as a manifest plus the bodies behind each URL.
pub struct Fixture {
    pub manifest_json: String,
    /// Full file URL → body.
    pub bodies: HashMap<String, Vec<u8>>,
    /// Relative path → body, for sync files only.
    pub sync_files: HashMap<String, Vec<u8>>,
    pub total_size: u64,
}

impl Fixture {
    pub fn new(base_url: &str, target: &str, entries: Vec<Entry>) -> Self {
        let prefix = if target.is_empty() {
            format!("{}/public/", base_url)
        } else {
            format!("{}/public/{}/", base_url, target)
        };

        let mut bodies = HashMap::new();
        let mut sync_files = HashMap::new();
        let mut total_size = 0;
        let files: Vec<Value> = entries
            .iter()
            .map(|e| {
                let (node, size) = render(e, "", &prefix, &mut bodies, &mut sync_files);
                total_size += size;
                node
            })
            .collect();

        let manifest = json!({
            "status": "ok",
            "total_size": total_size,
            "target": target,
            "base_url": base_url,
            "files": files,
        });

        Self {
            manifest_json: manifest.to_string(),
            bodies,
            sync_files,
            total_size,
        }
    }

    pub fn manifest(&self) -> StaticManifest {
        StaticManifest::new(&self.manifest_json)
    }

    pub fn fetcher(&self) -> MemoryFetcher {
        MemoryFetcher::new(self.bodies.clone())
    }
}

fn render(
    entry: &Entry,
    parent: &str,
    prefix: &str,
    bodies: &mut HashMap<String, Vec<u8>>,
    sync_files: &mut HashMap<String, Vec<u8>>,
) -> (Value, u64) {
    match entry {
        Entry::File { name, body, sync } => {
            let path = join(parent, name);
            bodies.insert(format!("{}{}", prefix, path), body.clone());
            let mut node = json!({
                "type": "file",
                "name": name,
                "size": body.len(),
                "sync": sync,
            });
            if *sync {
                node["checksum"] = json!(sha256_hex(body));
                sync_files.insert(path, body.clone());
            }
            (node, body.len() as u64)
        }
        Entry::Dir {
            name,
            sync,
            children,
        } => {
            let path = join(parent, name);
            let mut size = 0;
            let children: Vec<Value> = children
                .iter()
                .map(|c| {
                    let (node, child_size) = render(c, &path, prefix, bodies, sync_files);
                    size += child_size;
                    node
                })
                .collect();
            let node = json!({
                "type": "dir",
                "name": name,
                "size": size,
                "sync": sync,
                "children": children,
            });
            (node, size)
        }
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Write `body` at `root/rel`, creating parents.
pub fn write_local(root: &Path, rel: &str, body: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

// ============================================================================
// In-memory doubles
// ============================================================================

/// Serves one manifest body for any package id.
pub struct StaticManifest {
    body: String,
    pub requests: Mutex<Vec<Option<String>>>,
}

impl StaticManifest {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ManifestSource for StaticManifest {
    fn fetch(&self, package_id: Option<&str>) -> EngineResult<Manifest> {
        self.requests
            .lock()
            .unwrap()
            .push(package_id.map(str::to_string));
        parse_manifest(&self.body)
    }
}

/// Writes bodies from a map, answering 404 for unknown URLs.
///
/// Tracks how many fetches run at once and can cancel a token after a given
/// number of completed fetches.
pub struct MemoryFetcher {
    bodies: HashMap<String, Vec<u8>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    requests: Mutex<Vec<String>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl MemoryFetcher {
    pub fn new(bodies: HashMap<String, Vec<u8>>) -> Self {
        Self {
            bodies,
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            cancel_after: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn cancel_after(mut self, fetches: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((fetches, token));
        self
    }

    /// Serve different bytes for `url` than the manifest advertises.
    pub fn corrupt(&mut self, url: &str, body: &[u8]) {
        self.bodies.insert(url.to_string(), body.to_vec());
    }

    pub fn remove(&mut self, url: &str) {
        self.bodies.remove(url);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.requests.lock().unwrap().clear();
    }
}

impl FileFetcher for MemoryFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> EngineResult<u64> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let result = match self.bodies.get(url) {
            Some(body) => {
                fs::create_dir_all(dest.parent().unwrap()).unwrap();
                fs::write(dest, body).unwrap();
                Ok(body.len() as u64)
            }
            None => Err(SyncError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let done = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(url.to_string());
            requests.len()
        };
        if let Some((after, token)) = &self.cancel_after {
            if done >= *after {
                token.cancel();
            }
        }

        result
    }
}

/// Collects every event a run emits.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn percents_are_monotonic(&self) -> bool {
        let events = self.events();
        events.windows(2).all(|w| w[0].percent <= w[1].percent)
    }
}

impl assetsync::ProgressSink for RecordingSink {
    fn on_event(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// Loopback HTTP server
// ============================================================================

/// A canned response.
#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Minimal HTTP/1.1 server answering GETs from a route table keyed by path
/// (query string excluded). Unknown paths get 404.
pub struct TestServer {
    addr: String,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::default();
        let requests: Arc<Mutex<Vec<String>>> = Arc::default();

        let (routes_bg, requests_bg) = (Arc::clone(&routes), Arc::clone(&requests));
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes_bg);
                let requests = Arc::clone(&requests_bg);
                thread::spawn(move || handle(stream, &routes, &requests));
            }
        });

        Self {
            addr,
            routes,
            requests,
        }
    }

    /// `http://127.0.0.1:<port>`
    pub fn base_url(&self) -> &str {
        &self.addr
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    pub fn route(&self, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.routes.lock().unwrap().insert(
            path.to_string(),
            Route {
                status,
                body: body.into(),
            },
        );
    }

    /// Serve every body of `fixture` at its URL path.
    pub fn serve_fixture(&self, fixture: &Fixture) {
        for (url, body) in &fixture.bodies {
            let path = url.strip_prefix(&self.addr).unwrap_or(url);
            self.route(path, 200, body.clone());
        }
    }

    /// Request targets (path and query) in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn handle(
    stream: TcpStream,
    routes: &Mutex<HashMap<String, Route>>,
    requests: &Mutex<Vec<String>>,
) {
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    });

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) => break,
            Ok(_) if header == "\r\n" || header == "\n" => break,
            Ok(_) => continue,
            Err(_) => return,
        }
    }

    let target = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();
    requests.lock().unwrap().push(target.clone());
    let path = target.split('?').next().unwrap_or("/");

    let route = routes.lock().unwrap().get(path).cloned().unwrap_or(Route {
        status: 404,
        body: b"not found".to_vec(),
    });

    let mut stream = stream;
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        reason(route.status),
        route.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&route.body);
    let _ = stream.flush();
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
