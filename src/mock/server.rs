//! Mock HTTP server
//!
//! A deliberately small HTTP/1.1 responder: one request per connection,
//! `Connection: close` on every answer.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::MockServerConfig;
use super::routes::{MockRequest, RequestInfo, ResponseConfig, Route};
use super::user_service::UserService;
use crate::data::DEFAULT_DATA_PATH;
use crate::errors::{HarnessError, Result};

const MAX_HEADER_BYTES: usize = 64 * 1024;
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

type RequestLog = Arc<RwLock<Vec<RequestInfo>>>;

/// Everything a connection needs to answer, shared read-only
struct Responder {
    config: MockServerConfig,
    routes: Vec<Route>,
    users: Option<UserService>,
}

pub struct MockServer {
    responder: Arc<Responder>,
    request_log: RequestLog,
}

impl MockServer {
    pub fn new(config: MockServerConfig) -> Result<Self> {
        config.validate()?;

        let mut routes: Vec<Route> = config
            .routes
            .iter()
            .map(|rc| Route::new(rc.clone()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| HarnessError::Config(format!("Invalid route: {}", e)))?;
        routes.sort_by(|a, b| b.config.priority.cmp(&a.config.priority));

        let users = if config.user_service {
            let path = config
                .users_file
                .clone()
                .unwrap_or_else(|| DEFAULT_DATA_PATH.into());
            Some(UserService::from_file(&path)?)
        } else {
            None
        };

        Ok(Self {
            responder: Arc::new(Responder { config, routes, users }),
            request_log: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Replace the user service, e.g. with fixed users in tests
    pub fn with_user_service(mut self, users: UserService) -> Self {
        if let Some(responder) = Arc::get_mut(&mut self.responder) {
            responder.users = Some(users);
        }
        self
    }

    /// Bind and serve in the background
    pub async fn start(self) -> Result<MockHandle> {
        let address = self.responder.config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| HarnessError::MockServer(format!("Cannot bind {}: {}", address, e)))?;
        let addr = listener.local_addr()?;

        info!(addr = %addr, routes = self.responder.routes.len(), user_service = self.responder.users.is_some(), "Mock server listening");
        for route in &self.responder.routes {
            debug!(
                method = route.config.method.as_str(),
                path = %route.config.path,
                status = route.config.response.status,
                name = route.config.name.as_deref().unwrap_or(""),
                "Route"
            );
        }

        let responder = Arc::clone(&self.responder);
        let log = Arc::clone(&self.request_log);
        let task = tokio::spawn(accept_loop(listener, responder, log));

        Ok(MockHandle {
            addr,
            task,
            request_log: self.request_log,
        })
    }
}

async fn accept_loop(listener: TcpListener, responder: Arc<Responder>, log: RequestLog) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let responder = Arc::clone(&responder);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, peer_addr, &responder, log).await {
                        warn!(peer = %peer_addr, error = %e, "Mock connection error");
                    }
                });
            }
            Err(e) => warn!(error = %e, "Mock accept error"),
        }
    }
}

/// A running mock server; stops accepting when dropped
pub struct MockHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
    request_log: RequestLog,
}

impl MockHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:8081`
    pub fn uri(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn requests(&self) -> Vec<RequestInfo> {
        self.request_log.read().await.clone()
    }

    pub async fn clear_requests(&self) {
        self.request_log.write().await.clear();
    }

    /// Serve until the accept loop ends
    pub async fn wait(mut self) -> Result<()> {
        (&mut self.task)
            .await
            .map_err(|e| HarnessError::MockServer(format!("Accept loop ended: {}", e)))
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    responder: &Responder,
    log: RequestLog,
) -> Result<()> {
    let Some(request) = read_request(&mut stream).await? else {
        return Ok(());
    };

    let response = responder.respond(&request);

    if let Some((min, max)) = responder.config.latency {
        let delay = if min == max {
            min
        } else {
            use rand::Rng;
            rand::rng().random_range(min..=max)
        };
        tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
    }
    if response.delay_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(response.delay_ms)).await;
    }

    let mut headers = response.headers.clone();
    if responder.config.cors {
        headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
        headers.insert(
            "Access-Control-Allow-Methods".to_string(),
            "GET, POST, PUT, DELETE, PATCH, OPTIONS".to_string(),
        );
        headers.insert("Access-Control-Allow-Headers".to_string(), "*".to_string());
    }

    let body = if response.template {
        apply_template(&response.get_body(), &request, &responder.params_for(&request))
    } else {
        response.get_body()
    };
    headers.insert("Content-Length".to_string(), body.len().to_string());
    headers.insert("Connection".to_string(), "close".to_string());

    let mut head = format!("HTTP/1.1 {} {}\r\n", response.status, http_status_text(response.status));
    for (name, value) in &headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");

    // logged before the response is written
    if responder.config.log_requests {
        info!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            peer = %peer_addr,
            "Mock request"
        );
        log.write()
            .await
            .push(RequestInfo::new(request, response.status, peer_addr.ip().to_string()));
    }

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await?;

    Ok(())
}

impl Responder {
    /// User service first, then static routes, then the default answer
    fn respond(&self, request: &MockRequest) -> ResponseConfig {
        if let Some(response) = self.users.as_ref().and_then(|users| users.handle(request)) {
            return response;
        }
        for route in &self.routes {
            if route.matches(&request.method, &request.path).is_some() {
                return route.config.response.clone();
            }
        }
        self.config
            .default_response
            .clone()
            .unwrap_or_else(|| ResponseConfig::envelope(404, "not found", serde_json::Value::Null).with_status(404))
    }

    fn params_for(&self, request: &MockRequest) -> HashMap<String, String> {
        self.routes
            .iter()
            .find_map(|route| route.matches(&request.method, &request.path))
            .unwrap_or_default()
    }
}

/// Read one request: headers up to the blank line, then `Content-Length` bytes
async fn read_request(stream: &mut TcpStream) -> Result<Option<MockRequest>> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(HarnessError::MockServer("Connection closed mid-request".to_string()));
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
        if buf.len() > MAX_HEADER_BYTES {
            return Err(HarnessError::MockServer("Request headers too large".to_string()));
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut request = parse_head(&head)?;

    let content_length = request
        .header("content-length")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    if content_length > MAX_BODY_BYTES {
        return Err(HarnessError::MockServer("Request body too large".to_string()));
    }

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = (body_start + content_length).min(buf.len());
    request.body = String::from_utf8_lossy(&buf[body_start..body_end]).into_owned();

    Ok(Some(request))
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Request line and headers
fn parse_head(head: &str) -> Result<MockRequest> {
    let mut lines = head.lines();

    let request_line = lines
        .next()
        .ok_or_else(|| HarnessError::MockServer("Empty request".to_string()))?;
    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(HarnessError::MockServer(format!("Invalid request line: {}", request_line)));
    }

    let (path, query_str) = parts[1].split_once('?').unwrap_or((parts[1], ""));

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    Ok(MockRequest {
        method: parts[0].to_string(),
        path: path.to_string(),
        query: parse_query_string(query_str),
        headers,
        body: String::new(),
    })
}

fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| {
            (
                urlencoding::decode(key).map(|k| k.into_owned()).unwrap_or_else(|_| key.to_string()),
                urlencoding::decode(value).map(|v| v.into_owned()).unwrap_or_else(|_| value.to_string()),
            )
        })
        .collect()
}

fn apply_template(body: &[u8], request: &MockRequest, params: &HashMap<String, String>) -> Vec<u8> {
    let mut result = String::from_utf8_lossy(body).into_owned();

    for (key, value) in params {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    for (key, value) in &request.query {
        result = result.replace(&format!("{{{{query.{}}}}}", key), value);
    }
    for (key, value) in &request.headers {
        result = result.replace(&format!("{{{{header.{}}}}}", key), value);
    }

    result = result.replace("{{method}}", &request.method);
    result = result.replace("{{path}}", &request.path);
    result = result.replace("{{body}}", &request.body);

    result.into_bytes()
}

fn http_status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}
