//! HTTP surface of the Harvest Flow bookkeeping service.

use axum::{
    Json, Router,
    extract::{FromRequest, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use harvestflow_bookkeeping::{
    AppendEvent, Bookkeeping, BulkEntry, EventQuery, MintFlow, MintRequest, SetHighest,
    StatusUpdate,
};
use harvestflow_core::AppError;
use harvestflow_storage::models::{NftStatusRecord, PolicyCounter, ProjectStats, TokenEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state.
pub struct AppState {
    pub books: Bookkeeping,
    /// `None` when no wallet is configured.
    pub minter: Option<MintFlow>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/counters", get(list_counters).post(set_counter))
        .route("/api/v1/counters/bulk", post(bulk_initialize))
        .route("/api/v1/counters/:policy_id", get(get_counter))
        .route(
            "/api/v1/projects/:project_id/nfts/:token_id",
            get(get_nft).put(update_nft),
        )
        .route("/api/v1/projects/:project_id/stats", get(project_stats))
        .route("/api/v1/projects/:project_id/mint", post(mint))
        .route("/api/v1/owners/:owner/nfts", get(owner_nfts))
        .route("/api/v1/events", get(query_events).post(append_event))
        .route("/api/v1/wallet", get(wallet_info))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─── Request / Response Types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BulkRequest {
    #[serde(default)]
    records: Vec<Value>,
}

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CounterResponse {
    policy_id: String,
    highest_token_id: u64,
    next_token_id: u64,
}

#[derive(Serialize)]
struct BulkResponse {
    updated: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WalletResponse {
    change_address: String,
    balance: String,
}

fn json_ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

/// Maps the shared error taxonomy onto HTTP status codes. Storage failures
/// are logged and reported without detail.
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

/// Malformed or mistyped bodies are validation failures.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_client_error() {
            tracing::debug!(error = %self.0, "Rejected request");
        }
        let (status, message) = match &self.0 {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            AppError::Wallet(msg) => {
                tracing::warn!(error = %msg, "Wallet request failed");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Config(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Storage(_) | AppError::Other(_) => {
                tracing::error!(error = %self.0, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(ApiResponse {
                success: false,
                data: message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// JSON body extractor whose rejections use the response envelope.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct ApiJson<T>(T);

fn parse_token_id(raw: &str) -> Result<u64, ApiError> {
    harvestflow_bookkeeping::parse_token_id(raw).ok_or_else(|| {
        AppError::validation(format!("token id `{raw}` is not a non-negative integer")).into()
    })
}

fn minter(state: &AppState) -> Result<&MintFlow, ApiError> {
    state
        .minter
        .as_ref()
        .ok_or_else(|| AppError::Config("wallet is not configured".into()).into())
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

/// GET /api/v1/counters — every policy counter.
async fn list_counters(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<PolicyCounter>> {
    Ok(json_ok(state.books.counters.list_counters().await?))
}

/// GET /api/v1/counters/:policy_id — highest and next token id.
async fn get_counter(
    State(state): State<Arc<AppState>>,
    Path(policy_id): Path<String>,
) -> ApiResult<CounterResponse> {
    let highest_token_id = state.books.counters.get_highest(&policy_id).await?;
    Ok(json_ok(CounterResponse {
        policy_id,
        highest_token_id,
        next_token_id: highest_token_id.saturating_add(1),
    }))
}

/// POST /api/v1/counters — raise one policy counter.
async fn set_counter(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<SetHighest>,
) -> ApiResult<CounterResponse> {
    let highest_token_id = state.books.counters.set_from_request(&body).await?;
    Ok(json_ok(CounterResponse {
        policy_id: body.policy_id.unwrap_or_default().trim().to_string(),
        highest_token_id,
        next_token_id: highest_token_id.saturating_add(1),
    }))
}

/// POST /api/v1/counters/bulk — seed counters from observed token ids.
async fn bulk_initialize(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<BulkRequest>,
) -> ApiResult<BulkResponse> {
    let entries: Vec<BulkEntry> = body
        .records
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap_or_default())
        .collect();
    let updated = state.books.counters.bulk_initialize(&entries).await?;
    Ok(json_ok(BulkResponse { updated }))
}

/// GET /api/v1/projects/:project_id/nfts/:token_id — one NFT's mint status.
async fn get_nft(
    State(state): State<Arc<AppState>>,
    Path((project_id, token_id)): Path<(String, String)>,
) -> ApiResult<NftStatusRecord> {
    let token_id = parse_token_id(&token_id)?;
    Ok(json_ok(state.books.statuses.find(&project_id, token_id).await?))
}

/// PUT /api/v1/projects/:project_id/nfts/:token_id — merge a status update.
async fn update_nft(
    State(state): State<Arc<AppState>>,
    Path((project_id, token_id)): Path<(String, String)>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> ApiResult<NftStatusRecord> {
    let token_id = parse_token_id(&token_id)?;
    Ok(json_ok(
        state
            .books
            .statuses
            .upsert(&project_id, token_id, update)
            .await?,
    ))
}

/// GET /api/v1/projects/:project_id/stats — mint totals for a project.
async fn project_stats(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> ApiResult<ProjectStats> {
    Ok(json_ok(state.books.statuses.project_stats(&project_id).await?))
}

/// GET /api/v1/owners/:owner/nfts — NFTs recorded for an owner.
async fn owner_nfts(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> ApiResult<Vec<NftStatusRecord>> {
    Ok(json_ok(state.books.statuses.find_by_owner(&owner).await?))
}

/// POST /api/v1/events — append a token event.
async fn append_event(
    State(state): State<Arc<AppState>>,
    ApiJson(event): ApiJson<AppendEvent>,
) -> Result<impl IntoResponse, ApiError> {
    let stored = state.books.events.append(event).await?;
    Ok((StatusCode::CREATED, json_ok(stored)))
}

/// GET /api/v1/events — a wallet's events, newest first.
async fn query_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventQuery>,
) -> ApiResult<Vec<TokenEvent>> {
    Ok(json_ok(state.books.events.query(query).await?))
}

/// GET /api/v1/wallet — the server wallet's address and balance.
async fn wallet_info(State(state): State<Arc<AppState>>) -> ApiResult<WalletResponse> {
    let wallet = minter(&state)?.wallet();
    Ok(json_ok(WalletResponse {
        change_address: wallet.get_change_address().await?,
        balance: wallet.get_balance().await?,
    }))
}

/// POST /api/v1/projects/:project_id/mint — mint the next token of a policy.
async fn mint(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    ApiJson(request): ApiJson<MintRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = minter(&state)?.mint(&project_id, request).await?;
    Ok((StatusCode::CREATED, json_ok(receipt)))
}
