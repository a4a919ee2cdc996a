//! In-process fake of the backend API for tests.
//!
//! Enabled with the `test-support` feature. The fake keeps stores in memory,
//! counts requests per route and can be switched to answer every store
//! request with HTTP 500. Like the real backend, the losses calculation
//! rejects requests without a valid `operation`.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::config::PersistenceConfig;
use crate::merge::{JsonObject, shallow_merge};
use crate::store::TRANSFORMER_INPUTS_STORE;

type Reply = std::result::Result<Json<Value>, StatusCode>;

#[derive(Debug, Default)]
struct FakeState {
    stores: Mutex<BTreeMap<String, Value>>,
    requests: Mutex<Vec<String>>,
    failing: AtomicBool,
    unhealthy: AtomicBool,
}

impl FakeState {
    fn stores(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `route` and decide whether to fail it.
    fn hit(&self, route: String) -> std::result::Result<(), StatusCode> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
        if self.failing.load(Ordering::SeqCst) {
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        } else {
            Ok(())
        }
    }
}

/// A running fake backend bound to an ephemeral local port.
#[derive(Debug)]
pub struct FakeBackend {
    addr: SocketAddr,
    state: Arc<FakeState>,
    server: tokio::task::JoinHandle<()>,
}

impl FakeBackend {
    /// Start serving on `127.0.0.1:0`.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(FakeState::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Fake backend stopped");
            }
        });
        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// Data API base URL of this backend.
    pub fn base_url(&self) -> String {
        format!("http://{}/api/data", self.addr)
    }

    /// Config pointing at this backend with the given cache TTL.
    pub fn config(&self, cache_ttl_ms: u64) -> PersistenceConfig {
        PersistenceConfig {
            cache_ttl_ms,
            request_timeout_secs: 5,
            ..PersistenceConfig::with_base_url(self.base_url())
        }
    }

    /// Answer every store request (not the health probe) with HTTP 500.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Make the health probe answer HTTP 503.
    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.state.unhealthy.store(unhealthy, Ordering::SeqCst);
    }

    pub fn seed(&self, store_id: &str, value: Value) {
        self.state.stores().insert(store_id.to_string(), value);
    }

    pub fn stored(&self, store_id: &str) -> Option<Value> {
        self.state.stores().get(store_id).cloned()
    }

    /// Number of requests recorded for `route`, e.g. `"GET /stores/losses"`.
    pub fn request_count(&self, route: &str) -> usize {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|recorded| recorded.as_str() == route)
            .count()
    }

    /// Total number of requests received.
    pub fn total_requests(&self) -> usize {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A config whose backend refuses connections.
pub async fn unreachable_config() -> std::io::Result<PersistenceConfig> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(PersistenceConfig {
        request_timeout_secs: 2,
        ..PersistenceConfig::with_base_url(format!("http://{addr}/api/data"))
    })
}

fn router(state: Arc<FakeState>) -> Router {
    Router::new()
        .route("/api/data/health", get(health))
        .route("/api/data/stores", get(list_stores).delete(delete_all))
        .route(
            "/api/data/stores/:id",
            get(get_store)
                .patch(patch_store)
                .put(put_store)
                .delete(delete_store),
        )
        .route("/api/data/stores/:id/export", get(export_store))
        .route("/api/data/stores/:id/import", post(import_store))
        .route("/api/data/backup", get(backup))
        .route("/api/data/restore", post(restore))
        .route("/api/transformer/inputs", post(transformer_inputs))
        .route("/api/transformer/modules/:module/process", post(process_module))
        .with_state(state)
}

const TIMESTAMP: &str = "2024-05-01T10:00:00.000000";

async fn health(State(state): State<Arc<FakeState>>) -> Reply {
    state
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push("GET /health".to_string());
    if state.unhealthy.load(Ordering::SeqCst) {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({"status": "healthy"})))
}

async fn list_stores(State(state): State<Arc<FakeState>>) -> Reply {
    state.hit("GET /stores".to_string())?;
    let stores: Vec<String> = state.stores().keys().cloned().collect();
    Ok(Json(json!({ "stores": stores })))
}

async fn delete_all(State(state): State<Arc<FakeState>>) -> Reply {
    state.hit("DELETE /stores".to_string())?;
    state.stores().clear();
    Ok(Json(json!({"message": "All stores cleared"})))
}

async fn get_store(State(state): State<Arc<FakeState>>, Path(id): Path<String>) -> Reply {
    state.hit(format!("GET /stores/{id}"))?;
    let value = state.stores().get(&id).cloned().unwrap_or_else(|| json!({}));
    Ok(Json(value))
}

async fn patch_store(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    Json(partial): Json<JsonObject>,
) -> Reply {
    state.hit(format!("PATCH /stores/{id}"))?;
    let mut stores = state.stores();
    let current = stores.get(&id).cloned().unwrap_or_else(|| json!({}));
    let merged = shallow_merge(&current, &partial);
    stores.insert(id, merged.clone());
    Ok(Json(merged))
}

async fn put_store(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    Json(value): Json<Value>,
) -> Reply {
    state.hit(format!("PUT /stores/{id}"))?;
    state.stores().insert(id, value.clone());
    Ok(Json(value))
}

async fn delete_store(State(state): State<Arc<FakeState>>, Path(id): Path<String>) -> Reply {
    state.hit(format!("DELETE /stores/{id}"))?;
    state.stores().remove(&id);
    Ok(Json(json!({"message": format!("Store {id} cleared")})))
}

async fn export_store(State(state): State<Arc<FakeState>>, Path(id): Path<String>) -> Reply {
    state.hit(format!("GET /stores/{id}/export"))?;
    let data = state.stores().get(&id).cloned().unwrap_or_else(|| json!({}));
    Ok(Json(json!({"store_id": id, "data": data, "exported_at": TIMESTAMP})))
}

async fn import_store(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    state.hit(format!("POST /stores/{id}/import"))?;
    let data = body.get("data").cloned().unwrap_or(body);
    state.stores().insert(id.clone(), data.clone());
    Ok(Json(json!({"message": format!("Store {id} imported"), "data": data})))
}

async fn backup(State(state): State<Arc<FakeState>>) -> Reply {
    state.hit("GET /backup".to_string())?;
    let stores = state.stores().clone();
    Ok(Json(json!({"backup_timestamp": TIMESTAMP, "stores": stores})))
}

async fn restore(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Reply {
    state.hit("POST /restore".to_string())?;
    let Some(Value::Object(backup)) = body.get("stores").cloned() else {
        return Err(StatusCode::BAD_REQUEST);
    };
    let mut stores = state.stores();
    let restored: Vec<String> = backup.keys().cloned().collect();
    for (id, value) in backup {
        stores.insert(id, value);
    }
    Ok(Json(json!({
        "restored_stores": restored,
        "total_stores": stores.len(),
    })))
}

/// Stores the inputs and derives the three-phase nominal currents in amperes.
async fn transformer_inputs(
    State(state): State<Arc<FakeState>>,
    Json(form_data): Json<JsonObject>,
) -> Reply {
    state.hit("POST /transformer/inputs".to_string())?;

    let number = |key: &str| -> Option<f64> {
        match form_data.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    };

    let mut updated = form_data.clone();
    if let Some(power_mva) = number("potencia_mva") {
        for (voltage, current) in [
            ("tensao_at", "corrente_nominal_at"),
            ("tensao_bt", "corrente_nominal_bt"),
            ("tensao_terciario", "corrente_nominal_terciario"),
        ] {
            if let Some(kv) = number(voltage).filter(|kv| *kv > 0.0) {
                let amps = power_mva * 1000.0 / (3f64.sqrt() * kv);
                updated.insert(current.to_string(), json!((amps * 100.0).round() / 100.0));
            }
        }
    }

    let mut stores = state.stores();
    let current = stores
        .get(TRANSFORMER_INPUTS_STORE)
        .cloned()
        .unwrap_or_else(|| json!({}));
    let mut patch = JsonObject::new();
    patch.insert("formData".to_string(), Value::Object(updated.clone()));
    stores.insert(
        TRANSFORMER_INPUTS_STORE.to_string(),
        shallow_merge(&current, &patch),
    );

    Ok(Json(json!({
        "status": "success",
        "message": "Transformer inputs updated",
        "updated_data": updated,
    })))
}

async fn process_module(
    State(state): State<Arc<FakeState>>,
    Path(module): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    state.hit(format!("POST /transformer/modules/{module}/process"))?;
    let operation = body.get("operation").and_then(Value::as_str);
    if module == "losses" && !matches!(operation, Some("no_load_losses" | "load_losses")) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let data_fields = body
        .get("data")
        .and_then(Value::as_object)
        .map_or(0, serde_json::Map::len);
    let basic_fields = body
        .get("basicData")
        .and_then(Value::as_object)
        .map_or(0, serde_json::Map::len);
    let module_fields = body
        .get("moduleData")
        .and_then(Value::as_object)
        .map_or(0, serde_json::Map::len);
    Ok(Json(json!({
        "results": {
            "module": module,
            "basic_fields": basic_fields,
            "module_fields": module_fields,
            "operation": operation,
            "data_fields": data_fields,
        }
    })))
}
