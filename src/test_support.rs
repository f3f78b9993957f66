// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process fake Chroma server for tests.
//!
//! Serves the subset of the v2 API the client uses, keeps every request line
//! for assertions and can require a bearer token or delay record reads.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

const COLLECTIONS: &str = "/api/v2/tenants/{tenant}/databases/{database}/collections";

#[derive(Debug, Clone)]
struct FakeRecord {
    id: String,
    document: String,
    metadata: Value,
}

#[derive(Debug, Clone)]
struct FakeCollection {
    id: String,
    name: String,
}

#[derive(Default)]
struct FakeData {
    required_token: Option<String>,
    collections: Vec<FakeCollection>,
    records: HashMap<String, Vec<FakeRecord>>,
    read_delays: HashMap<String, Duration>,
    fail_next: Option<(StatusCode, Value)>,
    requests: Vec<String>,
}

type Shared = Arc<Mutex<FakeData>>;

fn lock(data: &Shared) -> MutexGuard<'_, FakeData> {
    data.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Running fake server. The server task lives as long as the test runtime.
pub struct FakeChroma {
    addr: SocketAddr,
    data: Shared,
}

impl FakeChroma {
    pub async fn start() -> Self {
        let data: Shared = Arc::default();
        let app = Router::new()
            .route("/api/v2/heartbeat", get(heartbeat))
            .route(COLLECTIONS, get(list_collections).post(create_collection))
            .route(&format!("{COLLECTIONS}/{{collection}}"), delete(delete_collection))
            .route(&format!("{COLLECTIONS}/{{collection}}/get"), post(get_records))
            .route(&format!("{COLLECTIONS}/{{collection}}/add"), post(add_records))
            .route(&format!("{COLLECTIONS}/{{collection}}/delete"), post(delete_records))
            .layer(middleware::from_fn_with_state(data.clone(), gate))
            .with_state(data.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake chroma");
        let addr = listener.local_addr().expect("fake chroma address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake chroma server");
        });

        Self { addr, data }
    }

    /// `host:port` as entered in the login form.
    pub fn server_url(&self) -> String {
        self.addr.to_string()
    }

    pub fn require_token(&self, token: &str) {
        lock(&self.data).required_token = Some(token.to_string());
    }

    /// Add a collection and return its id.
    pub fn add_collection(&self, name: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut data = lock(&self.data);
        data.collections.push(FakeCollection {
            id: id.clone(),
            name: name.to_string(),
        });
        data.records.insert(id.clone(), Vec::new());
        id
    }

    pub fn add_record(&self, collection: &str, id: &str, document: &str, metadata: Value) {
        let mut data = lock(&self.data);
        let collection_id = find_id(&data, collection).expect("unknown fake collection");
        data.records
            .entry(collection_id)
            .or_default()
            .push(FakeRecord {
                id: id.to_string(),
                document: document.to_string(),
                metadata,
            });
    }

    /// Slow down record reads for one collection.
    pub fn delay_reads(&self, collection: &str, delay: Duration) {
        let mut data = lock(&self.data);
        let collection_id = find_id(&data, collection).expect("unknown fake collection");
        data.read_delays.insert(collection_id, delay);
    }

    /// Answer the next request with `status` and a Chroma error body.
    pub fn fail_next(&self, status: StatusCode, message: &str) {
        lock(&self.data).fail_next = Some((
            status,
            json!({ "error": "InternalError", "message": message }),
        ));
    }

    pub fn collection_names(&self) -> Vec<String> {
        lock(&self.data)
            .collections
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn record_ids(&self, collection: &str) -> Vec<String> {
        let data = lock(&self.data);
        find_id(&data, collection)
            .and_then(|id| data.records.get(&id))
            .map(|records| records.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn record_metadata(&self, collection: &str, record: &str) -> Option<Value> {
        let data = lock(&self.data);
        let id = find_id(&data, collection)?;
        data.records
            .get(&id)?
            .iter()
            .find(|r| r.id == record)
            .map(|r| r.metadata.clone())
    }

    /// `METHOD /path` lines in arrival order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.data).requests.clone()
    }
}

fn find_id(data: &FakeData, name: &str) -> Option<String> {
    data.collections
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.id.clone())
}

fn error(status: StatusCode, kind: &str, message: String) -> Response {
    (status, Json(json!({ "error": kind, "message": message }))).into_response()
}

async fn gate(State(data): State<Shared>, request: Request, next: Next) -> Response {
    let rejection = {
        let mut data = lock(&data);
        data.requests
            .push(format!("{} {}", request.method(), request.uri().path()));

        if let Some((status, body)) = data.fail_next.take() {
            Some((status, Json(body)).into_response())
        } else if let Some(token) = &data.required_token {
            let expected = format!("Bearer {token}");
            let presented = request
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok());
            (presented != Some(expected.as_str())).then(|| StatusCode::UNAUTHORIZED.into_response())
        } else {
            None
        }
    };

    match rejection {
        Some(response) => response,
        None => next.run(request).await,
    }
}

async fn heartbeat() -> Json<Value> {
    Json(json!({ "nanosecond heartbeat": 1_700_000_000_000_000_000u64 }))
}

async fn list_collections(
    State(data): State<Shared>,
    Path((tenant, database)): Path<(String, String)>,
) -> Json<Value> {
    let data = lock(&data);
    let collections: Vec<Value> = data
        .collections
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "metadata": null,
                "tenant": tenant,
                "database": database,
            })
        })
        .collect();
    Json(Value::Array(collections))
}

async fn create_collection(
    State(data): State<Shared>,
    Path((tenant, database)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let Some(name) = body.get("name").and_then(Value::as_str) else {
        return error(StatusCode::BAD_REQUEST, "InvalidArgumentError", "name is required".into());
    };

    let mut data = lock(&data);
    if find_id(&data, name).is_some() {
        return error(
            StatusCode::CONFLICT,
            "UniqueConstraintError",
            format!("Collection {name} already exists"),
        );
    }

    let id = uuid::Uuid::new_v4().to_string();
    data.collections.push(FakeCollection {
        id: id.clone(),
        name: name.to_string(),
    });
    data.records.insert(id.clone(), Vec::new());

    Json(json!({
        "id": id,
        "name": name,
        "metadata": null,
        "tenant": tenant,
        "database": database,
    }))
    .into_response()
}

async fn delete_collection(
    State(data): State<Shared>,
    Path((_tenant, _database, name)): Path<(String, String, String)>,
) -> Response {
    let mut data = lock(&data);
    let Some(id) = find_id(&data, &name) else {
        return error(
            StatusCode::NOT_FOUND,
            "NotFoundError",
            format!("Collection [{name}] does not exist"),
        );
    };
    data.collections.retain(|c| c.id != id);
    data.records.remove(&id);
    Json(json!({})).into_response()
}

async fn get_records(
    State(data): State<Shared>,
    Path((_tenant, _database, id)): Path<(String, String, String)>,
) -> Response {
    let delay = lock(&data).read_delays.get(&id).copied();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let data = lock(&data);
    let Some(records) = data.records.get(&id) else {
        return error(
            StatusCode::NOT_FOUND,
            "NotFoundError",
            format!("Collection [{id}] does not exist"),
        );
    };

    Json(json!({
        "ids": records.iter().map(|r| r.id.clone()).collect::<Vec<_>>(),
        "documents": records.iter().map(|r| r.document.clone()).collect::<Vec<_>>(),
        "metadatas": records.iter().map(|r| r.metadata.clone()).collect::<Vec<_>>(),
        "embeddings": null,
        "include": ["documents", "metadatas"],
    }))
    .into_response()
}

async fn add_records(
    State(data): State<Shared>,
    Path((_tenant, _database, id)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut data = lock(&data);
    let Some(records) = data.records.get_mut(&id) else {
        return error(
            StatusCode::NOT_FOUND,
            "NotFoundError",
            format!("Collection [{id}] does not exist"),
        );
    };

    let ids = body["ids"].as_array().cloned().unwrap_or_default();
    for (index, record_id) in ids.iter().enumerate() {
        let record_id = record_id.as_str().unwrap_or_default().to_string();
        records.retain(|r| r.id != record_id);
        records.push(FakeRecord {
            id: record_id,
            document: body["documents"][index].as_str().unwrap_or_default().to_string(),
            metadata: body["metadatas"][index].clone(),
        });
    }

    (StatusCode::CREATED, Json(json!({}))).into_response()
}

async fn delete_records(
    State(data): State<Shared>,
    Path((_tenant, _database, id)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut data = lock(&data);
    let Some(records) = data.records.get_mut(&id) else {
        return error(
            StatusCode::NOT_FOUND,
            "NotFoundError",
            format!("Collection [{id}] does not exist"),
        );
    };

    let ids: Vec<&str> = body["ids"]
        .as_array()
        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    records.retain(|r| !ids.contains(&r.id.as_str()));
    Json(json!({})).into_response()
}
