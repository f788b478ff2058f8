#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use touchlink_datasource::core::transport::{ApiRequest, RawResponse, TransportFailure};
use touchlink_datasource::{ApiClient, DataSourceSession, DatasourceApi, Notifier, Transport};

pub const PREFIX: &str = "/api/v1";

pub enum Reply {
    Respond(RawResponse),
    Fail(TransportFailure),
    /// Held back until the sender fires.
    Gated(oneshot::Receiver<()>, RawResponse),
}

/// Scripted backend: replies are queued per (method, path) and every request is recorded.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, method: Method, path: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, format!("{}{}", PREFIX, path)))
            .or_default()
            .push_back(reply);
    }

    pub fn json(&self, method: Method, path: &str, status: u16, body: Value) {
        self.on(method, path, Reply::Respond(RawResponse::json(status, &body)));
    }

    /// Returns the sender that releases the reply.
    pub fn gated(&self, method: Method, path: &str, body: Value) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.on(method, path, Reply::Gated(rx, RawResponse::json(200, &body)));
        tx
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        let full = format!("{}{}", PREFIX, path);
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == full)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportFailure> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&(request.method.clone(), request.path.clone()))
            .and_then(|queue| queue.pop_front());

        match reply {
            Some(Reply::Respond(raw)) => Ok(raw),
            Some(Reply::Fail(failure)) => Err(failure),
            Some(Reply::Gated(rx, raw)) => {
                let _ = rx.await;
                Ok(raw)
            }
            None => Ok(RawResponse::json(404, &json!({"detail": "Not Found"}))),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_error(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

pub fn session(transport: &Arc<MockTransport>) -> (DataSourceSession, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let client = ApiClient::new(transport.clone(), notifier.clone(), PREFIX);
    (DataSourceSession::new(DatasourceApi::new(client)), notifier)
}

pub fn mysql_config() -> touchlink_datasource::DataSourceConfig {
    touchlink_datasource::DataSourceConfig::Mysql(touchlink_datasource::RelationalConfig {
        host: "db1".into(),
        port: 3306,
        user: "root".into(),
        password: "secret".into(),
        database: "sales".into(),
    })
}

pub fn connect_ok() -> Value {
    json!({"type": "mysql", "name": "db1:3306/sales", "status": "success", "message": "Connected"})
}

pub fn orders_schema(key: &str) -> Value {
    json!({
        "table_name": "orders",
        "columns": [
            {"name": key, "type": "INT", "nullable": false, "primary_key": true},
            {"name": "total", "type": "DECIMAL(10,2)", "nullable": true, "default": null, "primary_key": false}
        ]
    })
}
