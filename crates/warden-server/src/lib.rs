//! HTTP surface for warden.
//!
//! Serves the readiness probe consumed by the container orchestrator's
//! health check, a small JSON status document, and the operator's lifecycle
//! triggers:
//!
//! - `GET /health`: `200 ok` once the readiness gate is released, `503 starting` before
//! - `GET /status`: `{"ready": bool, "pipeline_running": bool}`
//! - `POST /lifecycle/start`, `POST /lifecycle/restart`: run a pipeline and return its report
//!
//! Lifecycle requests run on their own thread, so probes keep being answered
//! while a pipeline is stopping or starting the server. Those threads are
//! tracked; call [`AppState::join_workers`] after [`run_server`] returns so a
//! cancelled pipeline finishes its cleanup before the process exits.
//!
//! The [`TestServer`] helper starts a server on a random port for integration testing.

use serde::Serialize;
use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};
use warden_core::{
    CollectingSink, CoreError, Orchestrator, PipelineKind, PipelineReport, ReadinessGate,
};
use warden_mods::CancelToken;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },
}

/// Everything a request handler can see.
pub struct AppState {
    gate: ReadinessGate,
    orchestrator: Option<Arc<Orchestrator>>,
    trigger_token: Option<String>,
    cancel: CancelToken,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl AppState {
    /// Health and status only; lifecycle routes answer 404 until an
    /// orchestrator is attached.
    pub fn new(gate: ReadinessGate) -> Self {
        Self {
            gate,
            orchestrator: None,
            trigger_token: None,
            cancel: CancelToken::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_orchestrator(mut self, orchestrator: Arc<Orchestrator>) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    /// Require `Authorization: Bearer <token>` on lifecycle routes.
    #[must_use]
    pub fn with_trigger_token(mut self, token: Option<String>) -> Self {
        self.trigger_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Token handed to every pipeline this server starts.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn pipeline_running(&self) -> bool {
        self.orchestrator.as_ref().is_some_and(|o| o.is_running())
    }

    fn track(&self, handle: thread::JoinHandle<()>) {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        workers.retain(|h| !h.is_finished());
        workers.push(handle);
    }

    /// Wait for every lifecycle thread started so far. Pipelines observe the
    /// cancel token, so cancel first for a prompt return.
    pub fn join_workers(&self) {
        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if !workers.is_empty() {
            info!("waiting for {} lifecycle worker(s)", workers.len());
        }
        for handle in workers {
            if handle.join().is_err() {
                warn!("lifecycle worker panicked");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Health,
    Status,
    Lifecycle(PipelineKind),
}

impl Route {
    fn method(self) -> Method {
        match self {
            Route::Health | Route::Status => Method::Get,
            Route::Lifecycle(_) => Method::Post,
        }
    }
}

/// Map a request target to a route, ignoring any query string.
pub fn parse_route(url: &str) -> Option<Route> {
    let path = url.split_once('?').map_or(url, |(path, _)| path);
    match path.trim_end_matches('/') {
        "/health" => Some(Route::Health),
        "/status" => Some(Route::Status),
        "/lifecycle/start" => Some(Route::Lifecycle(PipelineKind::Start)),
        "/lifecycle/restart" => Some(Route::Lifecycle(PipelineKind::Restart)),
        _ => None,
    }
}

#[derive(Serialize)]
struct StatusBody {
    ready: bool,
    pipeline_running: bool,
}

#[derive(Serialize)]
struct TriggerBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a PipelineReport>,
    progress: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn text(code: u16, body: &str) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(body).with_status_code(StatusCode(code))
}

fn json(code: u16, body: &impl Serialize) -> Response<Cursor<Vec<u8>>> {
    let data = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let mut resp = Response::from_data(data).with_status_code(StatusCode(code));
    if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
        resp.add_header(header);
    }
    resp
}

fn trigger_error(code: u16, message: String) -> Response<Cursor<Vec<u8>>> {
    json(
        code,
        &TriggerBody {
            report: None,
            progress: Vec::new(),
            error: Some(message),
        },
    )
}

fn authorized(state: &AppState, req: &Request) -> bool {
    let Some(token) = &state.trigger_token else {
        return true;
    };
    let expected = format!("Bearer {token}");
    req.headers()
        .iter()
        .any(|h| h.field.equiv("Authorization") && h.value.as_str() == expected)
}

fn handle_lifecycle(state: &Arc<AppState>, req: Request, kind: PipelineKind) {
    if !authorized(state, &req) {
        warn!("rejected {kind} trigger: bad or missing bearer token");
        let _ = req.respond(trigger_error(401, "unauthorized".to_owned()));
        return;
    }
    let Some(orchestrator) = state.orchestrator.clone() else {
        let _ = req.respond(trigger_error(404, "lifecycle control not enabled".to_owned()));
        return;
    };
    let cancel = state.cancel.clone();

    info!("{kind} triggered over HTTP");
    let handle = thread::spawn(move || {
        let sink = CollectingSink::new();
        let resp = match orchestrator.run(kind, &sink, &cancel) {
            Ok(report) => {
                let code = if report.is_done() { 200 } else { 500 };
                json(
                    code,
                    &TriggerBody {
                        report: Some(&report),
                        progress: sink.lines(),
                        error: None,
                    },
                )
            }
            Err(e @ CoreError::PipelineBusy) => trigger_error(409, e.to_string()),
            Err(e) => trigger_error(500, e.to_string()),
        };
        let _ = req.respond(resp);
    });
    state.track(handle);
}

/// Handle a single HTTP request, dispatching to the appropriate route handler.
pub fn handle_request(state: &Arc<AppState>, req: Request) {
    let method = req.method().clone();
    debug!("{method} {}", req.url());

    let Some(route) = parse_route(req.url()) else {
        let _ = req.respond(text(404, "not found"));
        return;
    };
    if method != route.method() {
        let _ = req.respond(text(405, "method not allowed"));
        return;
    }

    match route {
        Route::Health => {
            let resp = if state.gate.is_ready() {
                text(200, "ok")
            } else {
                text(503, "starting")
            };
            let _ = req.respond(resp);
        }
        Route::Status => {
            let body = StatusBody {
                ready: state.gate.is_ready(),
                pipeline_running: state.pipeline_running(),
            };
            let _ = req.respond(json(200, &body));
        }
        Route::Lifecycle(kind) => handle_lifecycle(state, req, kind),
    }
}

pub fn bind(addr: &str) -> Result<Server, ServerError> {
    Server::http(addr).map_err(|e| ServerError::Bind {
        addr: addr.to_owned(),
        reason: e.to_string(),
    })
}

/// Serve requests until `server` is unblocked, blocking the current thread.
pub fn run_server(server: &Server, state: &Arc<AppState>) {
    for request in server.incoming_requests() {
        handle_request(state, request);
    }
    info!("HTTP server stopped");
}

/// A test helper that serves an [`AppState`] on a random local port in a
/// background thread. Dropping it stops the server and joins every lifecycle
/// worker it started.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    server: Arc<Server>,
    state: Arc<AppState>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    pub fn start(state: AppState) -> Result<Self, ServerError> {
        let server = Arc::new(bind("127.0.0.1:0")?);
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| ServerError::Bind {
                addr: "127.0.0.1:0".to_owned(),
                reason: "not an IP listener".to_owned(),
            })?;

        let state = Arc::new(state);
        let srv = Arc::clone(&server);
        let shared = Arc::clone(&state);
        let handle = thread::spawn(move || run_server(&srv, &shared));

        Ok(Self {
            url: format!("http://127.0.0.1:{port}"),
            port,
            server,
            state,
            handle: Some(handle),
        })
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.state.join_workers();
    }
}
