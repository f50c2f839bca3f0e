//! HTTP routes for the devnet gateway

use axum::{
    extract::{MatchedPath, Path, Query, Request, State},
    http::{Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use pado_client::wire::{
    amount128, Blob, CompletedTaskResponse, DataIdResponse, ListQuery, PriceResponse, Signed,
    TaskIdResponse, TransactionResponse, TransferRequest,
};
use pado_client::{PreparedRegistry, RegisterData, SubmitTask};
use pado_core::{DataRecord, EncryptionSchema};

use crate::error::{DevnetError, Result};
use crate::metrics;
use crate::state::{DevnetStats, SharedState, TaskReport};

/// Router state: ledger plus the optional Prometheus handle
#[derive(Clone)]
pub struct AppState {
    pub ledger: SharedState,
    pub prometheus: Option<PrometheusHandle>,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub stats: DevnetStats,
}

/// Mint tokens to an address
#[derive(Serialize, Deserialize)]
pub struct FaucetRequest {
    pub token: String,
    pub address: String,
    #[serde(with = "amount128")]
    pub amount: u128,
}

#[derive(Serialize, Deserialize)]
pub struct BalanceResponse {
    #[serde(with = "amount128")]
    pub balance: u128,
}

/// Reject bodies without a usable owner and signature
///
/// The devnet records the signer but does not verify signatures.
fn signer_of<T>(body: &Signed<T>) -> Result<&str> {
    if body.owner.is_empty() {
        return Err(DevnetError::InvalidRequest("missing owner".into()));
    }
    match hex::decode(&body.signature) {
        Ok(sig) if !sig.is_empty() => Ok(&body.owner),
        _ => Err(DevnetError::InvalidRequest("missing or malformed signature".into())),
    }
}

async fn health(State(app): State<AppState>) -> Json<HealthResponse> {
    let ledger = app.ledger.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        stats: ledger.stats(),
    })
}

async fn prepare(
    State(app): State<AppState>,
    Json(schema): Json<EncryptionSchema>,
) -> Result<Json<PreparedRegistry>> {
    let ledger = app.ledger.read().await;
    Ok(Json(ledger.prepare(schema)?))
}

async fn register(
    State(app): State<AppState>,
    Json(body): Json<Signed<RegisterData>>,
) -> Result<Json<DataIdResponse>> {
    let owner = signer_of(&body)?.to_string();
    let data_id = app.ledger.write().await.register(body.payload, &owner)?;
    Ok(Json(DataIdResponse { data_id }))
}

async fn list_data(
    State(app): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<DataRecord>> {
    Json(app.ledger.read().await.list_records(query.status))
}

async fn get_data(State(app): State<AppState>, Path(data_id): Path<String>) -> Result<Json<DataRecord>> {
    Ok(Json(app.ledger.read().await.get_record(&data_id)?))
}

async fn invalidate_data(State(app): State<AppState>, Path(data_id): Path<String>) -> Result<StatusCode> {
    app.ledger.write().await.invalidate(&data_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn price(State(app): State<AppState>, Path(symbol): Path<String>) -> Result<Json<PriceResponse>> {
    let (symbol, price) = app.ledger.read().await.price(&symbol)?;
    Ok(Json(PriceResponse {
        symbol: symbol.to_string(),
        price,
    }))
}

async fn transfer(
    State(app): State<AppState>,
    Json(body): Json<Signed<TransferRequest>>,
) -> Result<Json<BalanceResponse>> {
    let owner = signer_of(&body)?.to_string();
    let request = body.payload;
    let mut ledger = app.ledger.write().await;
    ledger.transfer(&request.from, &owner, &request.to, request.amount)?;
    Ok(Json(BalanceResponse {
        balance: ledger.balance(&request.from, &owner),
    }))
}

async fn faucet(
    State(app): State<AppState>,
    Json(request): Json<FaucetRequest>,
) -> Result<Json<BalanceResponse>> {
    let balance = app
        .ledger
        .write()
        .await
        .mint(&request.token, &request.address, request.amount)?;
    Ok(Json(BalanceResponse { balance }))
}

async fn balance(
    State(app): State<AppState>,
    Path((token, address)): Path<(String, String)>,
) -> Json<BalanceResponse> {
    Json(BalanceResponse {
        balance: app.ledger.read().await.balance(&token, &address),
    })
}

async fn submit_task(
    State(app): State<AppState>,
    Json(body): Json<Signed<SubmitTask>>,
) -> Result<Json<TaskIdResponse>> {
    let owner = signer_of(&body)?.to_string();
    let mut ledger = app.ledger.write().await;
    let task_id = ledger.submit_task(body.payload, &owner)?;
    metrics::set_pending_tasks(ledger.stats().pending_tasks);
    Ok(Json(TaskIdResponse { task_id }))
}

async fn completed_task(
    State(app): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<CompletedTaskResponse>> {
    let task = app.ledger.read().await.completed_task(&task_id)?;
    Ok(Json(CompletedTaskResponse { task }))
}

/// Post node results for a task, standing in for the compute nodes
async fn complete_task(
    State(app): State<AppState>,
    Path(task_id): Path<String>,
    Json(report): Json<TaskReport>,
) -> Result<Json<TaskIdResponse>> {
    let mut ledger = app.ledger.write().await;
    ledger.complete_task(&task_id, report)?;
    metrics::set_pending_tasks(ledger.stats().pending_tasks);
    Ok(Json(TaskIdResponse { task_id }))
}

async fn put_blob(
    State(app): State<AppState>,
    Json(body): Json<Signed<Blob>>,
) -> Result<Json<TransactionResponse>> {
    signer_of(&body)?;
    let transaction_id = app.ledger.write().await.put_blob(body.payload.data);
    Ok(Json(TransactionResponse { transaction_id }))
}

async fn get_blob(State(app): State<AppState>, Path(transaction_id): Path<String>) -> Result<Json<Blob>> {
    let data = app.ledger.read().await.get_blob(&transaction_id)?;
    Ok(Json(Blob { data }))
}

async fn prometheus(State(app): State<AppState>) -> Response {
    match &app.prometheus {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let start = Instant::now();
    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16(), start.elapsed());
    response
}

/// Create the router with all routes
pub fn create_router(app: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/data/prepare", post(prepare))
        .route("/data", get(list_data).post(register))
        .route("/data/:id", get(get_data))
        .route("/data/:id/invalidate", post(invalidate_data))
        .route("/price/:symbol", get(price))
        .route("/transfer", post(transfer))
        .route("/faucet", post(faucet))
        .route("/balance/:token/:address", get(balance))
        .route("/tasks", post(submit_task))
        .route("/tasks/:id/completed", get(completed_task))
        .route("/tasks/:id/complete", post(complete_task))
        .route("/storage", post(put_blob))
        .route("/storage/:id", get(get_blob))
        .route("/metrics", get(prometheus))
        .route_layer(middleware::from_fn(track_requests))
        .layer(cors)
        .with_state(app)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed(owner: &str, signature: &str) -> Signed<()> {
        Signed {
            payload: (),
            owner: owner.into(),
            signature: signature.into(),
        }
    }

    #[test]
    fn test_signer_of() {
        assert_eq!(signer_of(&signed("0xabc", "beef")).unwrap(), "0xabc");
        assert!(signer_of(&signed("", "beef")).is_err());
        assert!(signer_of(&signed("0xabc", "")).is_err());
        assert!(signer_of(&signed("0xabc", "not-hex")).is_err());
    }
}
