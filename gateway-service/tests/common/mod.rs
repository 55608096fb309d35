use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use gateway_service::config::{Config, ServerConfig, SupabaseConfig};
use gateway_service::Application;
use secrecy::Secret;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-process stand-in for the Supabase REST surface: filtered selects and
/// conflict-merging upserts over an in-memory table map. Unknown tables
/// produce an error response, which is also how tests exercise the
/// gateway's upstream-failure path.
#[derive(Clone, Default)]
struct MockStore {
    tables: Arc<Mutex<HashMap<String, TableData>>>,
    hits: Arc<AtomicUsize>,
}

struct TableData {
    conflict_key: String,
    rows: Vec<Map<String, Value>>,
}

pub struct MockSupabase {
    pub url: String,
    store: MockStore,
}

impl MockSupabase {
    pub async fn spawn() -> Self {
        let store = MockStore::default();

        let router = Router::new()
            .route("/rest/v1/:table", get(select_rows).post(upsert_rows))
            .with_state(store.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock Supabase listener");
        let url = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Self { url, store }
    }

    /// Register a table with the column used to resolve upsert conflicts.
    pub fn create_table(&self, name: &str, conflict_key: &str) {
        self.store.tables.lock().unwrap().insert(
            name.to_string(),
            TableData {
                conflict_key: conflict_key.to_string(),
                rows: Vec::new(),
            },
        );
    }

    pub fn insert_row(&self, table: &str, row: Value) {
        let mut tables = self.store.tables.lock().unwrap();
        let data = tables.get_mut(table).expect("table not created");
        data.rows
            .push(row.as_object().expect("row must be an object").clone());
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        let tables = self.store.tables.lock().unwrap();
        tables
            .get(table)
            .map(|data| data.rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Number of REST requests the mock has received.
    pub fn request_count(&self) -> usize {
        self.store.hits.load(Ordering::SeqCst)
    }
}

async fn select_rows(
    State(store): State<MockStore>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    store.hits.fetch_add(1, Ordering::SeqCst);

    let tables = store.tables.lock().unwrap();
    let Some(data) = tables.get(&table) else {
        return missing_table(&table);
    };

    let select: Vec<&str> = params
        .get("select")
        .map(|s| s.split(',').collect())
        .unwrap_or_else(|| vec!["*"]);

    let filter = params.iter().find_map(|(column, value)| {
        if column == "select" {
            return None;
        }
        value
            .strip_prefix("eq.")
            .map(|v| (column.clone(), v.to_string()))
    });

    let rows: Vec<Value> = data
        .rows
        .iter()
        .filter(|row| match &filter {
            Some((column, value)) => row
                .get(column)
                .map(|v| value_matches(v, value))
                .unwrap_or(false),
            None => true,
        })
        .map(|row| project(row, &select))
        .collect();

    (StatusCode::OK, Json(Value::Array(rows))).into_response()
}

async fn upsert_rows(
    State(store): State<MockStore>,
    Path(table): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    store.hits.fetch_add(1, Ordering::SeqCst);

    let mut tables = store.tables.lock().unwrap();
    let Some(data) = tables.get_mut(&table) else {
        return missing_table(&table);
    };

    let Some(incoming) = body.as_array() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "expected an array of rows" })),
        )
            .into_response();
    };

    for row in incoming {
        let Some(obj) = row.as_object() else {
            continue;
        };
        let key = data.conflict_key.clone();
        match obj.get(&key) {
            Some(key_value) => {
                if let Some(existing) = data
                    .rows
                    .iter_mut()
                    .find(|existing| existing.get(&key) == Some(key_value))
                {
                    *existing = obj.clone();
                } else {
                    data.rows.push(obj.clone());
                }
            }
            None => data.rows.push(obj.clone()),
        }
    }

    (StatusCode::CREATED, Json(json!([]))).into_response()
}

fn missing_table(table: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "message": format!("relation \"{}\" does not exist", table)
        })),
    )
        .into_response()
}

fn value_matches(value: &Value, filter: &str) -> bool {
    match value {
        Value::String(s) => s == filter,
        other => other.to_string() == filter,
    }
}

fn project(row: &Map<String, Value>, select: &[&str]) -> Value {
    if select.contains(&"*") {
        return Value::Object(row.clone());
    }
    Value::Object(
        select
            .iter()
            .filter_map(|column| {
                row.get(*column)
                    .map(|value| (column.to_string(), value.clone()))
            })
            .collect(),
    )
}

pub struct TestApp {
    pub address: String,
    pub supabase: MockSupabase,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let supabase = MockSupabase::spawn().await;

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            supabase: SupabaseConfig {
                url: supabase.url.clone(),
                key: Secret::new("test-key".to_string()),
            },
            service_name: "gateway-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the HTTP server to accept requests
        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client
                .get(format!("{}/health", address))
                .send()
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Self { address, supabase }
    }
}
