use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::{json, Value};
use shared::protocol::{Envelope, Pagination};

use crate::{
    error::TransportError,
    messages::MessageCatalog,
    transport::{ApiRequest, ApiTransport, Method},
};

/// In-memory transport: records requests and replays queued responses.
/// An empty queue answers with an empty successful page.
#[derive(Default)]
pub struct ScriptedTransport {
    requests: Mutex<Vec<ApiRequest>>,
    responses: Mutex<VecDeque<Result<Envelope<Value>, TransportError>>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: Result<Envelope<Value>, TransportError>) {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(response);
    }

    pub fn push_ok(&self, envelope: Envelope<Value>) {
        self.push(Ok(envelope));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn requests_with(&self, method: Method) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == method)
            .collect()
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<Envelope<Value>, TransportError> {
        self.requests.lock().expect("requests lock").push(request);
        let next = self.responses.lock().expect("responses lock").pop_front();
        next.unwrap_or_else(|| Ok(Envelope::ok(json!([]))))
    }
}

pub fn catalog() -> Arc<MessageCatalog> {
    Arc::new(MessageCatalog::new(
        "Something went wrong",
        [("identification", "Identification number"), ("email", "Email address")],
    ))
}

pub fn company_json(id: i64, name: &str, identification: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "identificationType": "ruc",
        "identification": identification,
        "email": format!("ops{id}@example.com"),
    })
}

pub fn page_of(items: Vec<Value>, current_page: u32, page_size: u32, total: u64) -> Envelope<Value> {
    let total_pages = u32::try_from(total.div_ceil(u64::from(page_size.max(1)))).unwrap_or(u32::MAX);
    Envelope::ok(Value::Array(items)).with_pagination(Pagination {
        current_page,
        page_size,
        total_pages,
        total_records: total,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: Option<Value>,
}

/// Scripted HTTP API served by axum on an ephemeral port.
#[derive(Clone, Default)]
pub struct MockApi {
    pub recorded: Arc<tokio::sync::Mutex<Vec<Recorded>>>,
    responses: Arc<tokio::sync::Mutex<VecDeque<(axum::http::StatusCode, String)>>>,
    gate: Option<Arc<tokio::sync::Notify>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request waits for one `notify_one` on the returned handle.
    pub fn gated(mut self) -> (Self, Arc<tokio::sync::Notify>) {
        let gate = Arc::new(tokio::sync::Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub async fn respond(&self, status: u16, body: impl Into<String>) {
        let status = axum::http::StatusCode::from_u16(status).expect("status code");
        self.responses.lock().await.push_back((status, body.into()));
    }

    pub async fn respond_json(&self, status: u16, body: &Value) {
        self.respond(status, body.to_string()).await;
    }

    pub async fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().await.clone()
    }

    pub async fn wait_for_requests(&self, count: usize) {
        for _ in 0..200 {
            if self.recorded.lock().await.len() >= count {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("mock api never received {count} request(s)");
    }

    /// Returns the base url, including an `/api` prefix.
    pub async fn spawn(self) -> String {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock api");
        let addr = listener.local_addr().expect("mock api addr");
        let app = axum::Router::new()
            .fallback(handle_mock_request)
            .with_state(self);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}/api")
    }
}

async fn handle_mock_request(
    axum::extract::State(api): axum::extract::State<MockApi>,
    method: axum::http::Method,
    uri: axum::http::Uri,
    body: axum::body::Bytes,
) -> (axum::http::StatusCode, String) {
    api.recorded.lock().await.push(Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        body: serde_json::from_slice(&body).ok(),
    });
    if let Some(gate) = &api.gate {
        gate.notified().await;
    }
    api.responses.lock().await.pop_front().unwrap_or_else(|| {
        let empty = serde_json::to_string(&Envelope::ok(json!([]))).expect("serialize envelope");
        (axum::http::StatusCode::OK, empty)
    })
}

/// An address nothing listens on.
pub async fn closed_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}/api")
}

pub fn http_transport(base_url: &str) -> Arc<crate::transport::HttpTransport> {
    Arc::new(
        crate::transport::HttpTransport::new(
            url::Url::parse(base_url).expect("base url"),
            std::time::Duration::from_secs(5),
        )
        .expect("http transport"),
    )
}
