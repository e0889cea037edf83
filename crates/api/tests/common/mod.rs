#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use remedy_core::catalog::DirectoryCatalog;
use remedy_core::checkpoint::MemoryCheckpointStore;
use remedy_core::error::CoreError;
use remedy_core::flow::{FlowEntry, FlowResolver, FlowTable};
use remedy_core::scripting::{RuntimeConfig, ScriptRunner};
use remedy_core::ticket::{TicketRef, TicketState, TicketSync};
use remedy_pipeline::FlowEngine;
use tempfile::TempDir;
use tower::ServiceExt;

use remedy_api::config::ServerConfig;
use remedy_api::state::AppState;

pub const CLASSIFICATION: &str = "Create shared mailbox";
pub const FLOW_NAME: &str = "SharedMailbox";
pub const FALLBACK_GROUP: &str = "Messaging Team";

/// Ticket sync double recording `(ticket number, call)` pairs.
#[derive(Debug, Default)]
pub struct FakeTicketSync {
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeTicketSync {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, ticket: &TicketRef, call: String) {
        self.calls.lock().unwrap().push((ticket.number.clone(), call));
    }
}

#[async_trait]
impl TicketSync for FakeTicketSync {
    async fn set_status(&self, ticket: &TicketRef, state: TicketState) -> Result<(), CoreError> {
        self.push(ticket, format!("state={}", state.code()));
        Ok(())
    }

    async fn append_note(&self, ticket: &TicketRef, text: &str) -> Result<(), CoreError> {
        self.push(ticket, format!("note={text}"));
        Ok(())
    }

    async fn reassign(&self, ticket: &TicketRef, group: &str) -> Result<(), CoreError> {
        self.push(ticket, format!("group={group}"));
        Ok(())
    }
}

/// A test application plus the fixtures it runs against.
pub struct TestApp {
    pub dir: TempDir,
    pub sync: Arc<FakeTicketSync>,
    pub state: AppState,
}

impl TestApp {
    /// Use-case tree with one flow directory and no scripts yet.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let use_cases = dir.path().join("UseCases");
        std::fs::create_dir_all(use_cases.join(FLOW_NAME)).expect("create flow dir");

        let resolver = FlowResolver::new(FlowTable {
            flows: vec![FlowEntry {
                short_description: Some(CLASSIFICATION.into()),
                flow_name: Some(FLOW_NAME.into()),
                reassignment_group: Some(FALLBACK_GROUP.into()),
            }],
        });
        let runtime = RuntimeConfig {
            python_bin: "bash".into(),
            node_bin: "bash".into(),
            ..RuntimeConfig::default()
        };
        let sync = Arc::new(FakeTicketSync::default());

        let engine = FlowEngine::new(
            resolver,
            Arc::new(DirectoryCatalog::new(&use_cases)),
            ScriptRunner::new(&runtime),
            sync.clone(),
            Arc::new(MemoryCheckpointStore::new()),
        );

        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            request_timeout_secs: 30,
            use_cases_dir: use_cases,
            ..ServerConfig::default()
        };

        let state = AppState {
            engine: Arc::new(engine),
            config: Arc::new(config),
            pool: None,
        };

        Self { dir, sync, state }
    }

    pub fn script(&self, name: &str, body: &str) -> &Self {
        let path = self.dir.path().join("UseCases").join(FLOW_NAME).join(name);
        std::fs::write(path, body).expect("write script");
        self
    }

    /// A fresh router over the shared state.
    pub fn router(&self) -> Router {
        remedy_api::build_app(self.state.clone())
    }
}

/// Inbound payload in the ticketing system's shape.
pub fn payload(number: &str, classification: &str) -> serde_json::Value {
    serde_json::json!({
        "result": [{
            "sys_id": format!("sys-{number}"),
            "number": number,
            "short_description": classification,
            "sys_class_name": "sc_task",
            "state": "1",
            "priority": "4",
        }]
    })
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
