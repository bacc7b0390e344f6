//! REST API for CitizenChain
//!
//! Thin JSON adapter over [`Chain`]: every handler validates its input,
//! calls one chain operation and wraps the outcome in an [`ApiResponse`]
//! envelope. Routes are served under `/api`.

use axum::{
    extract::{Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::{Block, Chain};
use crate::citizen::Citizen;
use crate::election::{Candidate, Election};
use crate::error::ChainError;
use crate::node::{Node, NodeState};
use crate::transaction::Transaction;

#[derive(Clone)]
struct AppState {
    node: Arc<Node>,
    stats: Arc<RwLock<ApiStats>>,
}

impl AppState {
    fn chain(&self) -> &Chain {
        &self.node.chain
    }
}

/// API statistics and monitoring
#[derive(Debug)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    transactions_submitted: u64,
    start_time: Instant,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            transactions_submitted: 0,
            start_time: Instant::now(),
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

// ============================================================================
// Response Envelope & Error Handling
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        })
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    Chain(ChainError),
    InvalidInput(String),
    NotFound(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Chain(e) if e.is_internal() => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Chain(e) => match e {
                ChainError::NotAuthorized(_) => StatusCode::FORBIDDEN,
                ChainError::NotFound(_) => StatusCode::NOT_FOUND,
                ChainError::AlreadyRegistered(_)
                | ChainError::AlreadyProcessed(_)
                | ChainError::ElectionInProgress
                | ChainError::NoActiveElection
                | ChainError::AlreadyVoted(_)
                | ChainError::AlreadyCandidate(_)
                | ChainError::DuplicateTransaction(_) => StatusCode::CONFLICT,
                ChainError::InvalidBlock(_) | ChainError::Config(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Chain(e) => e.kind(),
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = match self {
            ApiError::Chain(e) => e.to_string(),
            ApiError::InvalidInput(msg) | ApiError::NotFound(msg) => msg,
        };

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
            kind: Some(kind.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::Chain(err)
    }
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCitizenRequest {
    pub name: String,
    pub date_of_birth: String,
    pub public_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessCitizenRequest {
    pub citizen_id: String,
    pub approver_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartElectionRequest {
    pub name: String,
    pub duration_days: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCandidateRequest {
    pub name: String,
    pub public_key: String,
    #[serde(default)]
    pub platform: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub citizen_public_key: String,
    pub candidate_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelElectionRequest {
    pub approver_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub node_state: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub height: usize,
    pub pool_size: usize,
    pub citizens: usize,
    pub approved_citizens: usize,
    pub election_in_progress: bool,
    pub past_elections: usize,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub transactions_submitted: u64,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub height: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MempoolResponse {
    pub count: usize,
    pub transactions: Vec<Transaction>,
}

// ============================================================================
// Middleware
// ============================================================================

async fn stats_middleware(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    app.stats.write().await.record_request(success);

    response
}

/// Logs method, path, status, duration and the current `NodeState`.
async fn logging_middleware(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();
    let node_state = app.node.state().await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        node_state = ?node_state,
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

pub fn build_api_router(node: Arc<Node>) -> Router {
    let app = AppState {
        node,
        stats: Arc::new(RwLock::new(ApiStats::new())),
    };

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true);

    let api_routes = Router::new()
        // Chain endpoints
        .route("/blocks", get(get_blocks))
        .route("/blocks/latest", get(get_latest_block))
        .route("/blocks/cut", post(cut_block))
        .route("/blocks/validate", get(validate_chain))
        .route("/blocks/:index", get(get_block_by_index))
        // Transaction endpoints
        .route("/transactions", post(submit_transfer))
        .route("/transactions/signed", post(submit_signed_transaction))
        .route("/transactions/:id", get(get_transaction))
        .route("/mempool", get(get_mempool))
        // Citizen endpoints
        .route("/citizens", get(get_citizens))
        .route("/citizens/register", post(register_citizen))
        .route("/citizens/approve", post(approve_citizen))
        .route("/citizens/reject", post(reject_citizen))
        .route("/citizens/:public_key", get(get_citizen))
        // Election endpoints
        .route("/elections/start", post(start_election))
        .route("/elections/candidates", post(register_candidate))
        .route("/elections/vote", post(cast_vote))
        .route("/elections/end", post(end_election))
        .route("/elections/cancel", post(cancel_election))
        .route("/elections/current", get(get_current_election))
        .route("/elections/current/candidates", get(get_current_candidates))
        .route("/elections/history", get(get_election_history))
        // System endpoints
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        // logging before stats so we always record timing and node-state
        .layer(middleware::from_fn_with_state(app.clone(), logging_middleware))
        .layer(middleware::from_fn_with_state(app.clone(), stats_middleware))
        .with_state(app);

    Router::new().nest("/api", api_routes).layer(cors)
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(app): State<AppState>) -> Response {
    let state = app.node.state().await;
    let ready = state == NodeState::Ready;
    let health = HealthResponse {
        status: if ready { "healthy" } else { "unhealthy" }.to_string(),
        node_id: app.node.config.node.node_id.clone(),
        node_state: format!("{:?}", state),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ApiResponse {
        success: ready,
        data: Some(health),
        error: None,
        kind: None,
    };
    (status, Json(body)).into_response()
}

async fn get_stats(State(app): State<AppState>) -> Json<ApiResponse<StatsResponse>> {
    let chain = app.chain();
    let citizens = chain.all_citizens();
    let stats = app.stats.read().await;

    ApiResponse::ok(StatsResponse {
        height: chain.height(),
        pool_size: chain.pool_size(),
        citizens: citizens.len(),
        approved_citizens: citizens.iter().filter(|c| c.is_approved()).count(),
        election_in_progress: chain.current_election().is_some(),
        past_elections: chain.past_elections().len(),
        total_requests: stats.total_requests,
        successful_requests: stats.successful_requests,
        failed_requests: stats.failed_requests,
        transactions_submitted: stats.transactions_submitted,
        uptime_seconds: stats.start_time.elapsed().as_secs(),
    })
}

async fn get_blocks(State(app): State<AppState>) -> Json<ApiResponse<Vec<Block>>> {
    ApiResponse::ok(app.chain().blocks())
}

async fn get_latest_block(State(app): State<AppState>) -> ApiResult<Block> {
    Ok(ApiResponse::ok(app.chain().latest_block()?))
}

async fn get_block_by_index(
    State(app): State<AppState>,
    Path(index): Path<u64>,
) -> ApiResult<Block> {
    app.chain()
        .block(index)
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::NotFound(format!("Block {} not found", index)))
}

async fn cut_block(State(app): State<AppState>) -> ApiResult<Block> {
    Ok(ApiResponse::ok(app.chain().cut_block()?))
}

async fn validate_chain(State(app): State<AppState>) -> Json<ApiResponse<ValidationResponse>> {
    let chain = app.chain();
    let outcome = chain.verify();
    ApiResponse::ok(ValidationResponse {
        valid: outcome.is_ok(),
        height: chain.height(),
        error: outcome.err().map(|e| e.to_string()),
    })
}

async fn submit_transfer(
    State(app): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<Transaction> {
    require("from", &req.from)?;
    require("to", &req.to)?;

    let tx = app.chain().add_transaction(&req.from, &req.to, req.amount)?;
    app.stats.write().await.transactions_submitted += 1;
    Ok(ApiResponse::ok(tx))
}

async fn submit_signed_transaction(
    State(app): State<AppState>,
    Json(tx): Json<Transaction>,
) -> ApiResult<Transaction> {
    let tx = app.chain().submit_signed_transaction(tx)?;
    app.stats.write().await.transactions_submitted += 1;
    Ok(ApiResponse::ok(tx))
}

async fn get_transaction(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Transaction> {
    app.chain()
        .find_transaction(&id)
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::NotFound(format!("Transaction {} not found", id)))
}

async fn get_mempool(State(app): State<AppState>) -> Json<ApiResponse<MempoolResponse>> {
    let transactions = app.chain().pending_transactions();
    ApiResponse::ok(MempoolResponse {
        count: transactions.len(),
        transactions,
    })
}

async fn get_citizens(State(app): State<AppState>) -> Json<ApiResponse<Vec<Citizen>>> {
    ApiResponse::ok(app.chain().all_citizens())
}

async fn get_citizen(
    State(app): State<AppState>,
    Path(public_key): Path<String>,
) -> ApiResult<Citizen> {
    app.chain()
        .get_citizen(&public_key)
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::NotFound(format!("Citizen {} not found", public_key)))
}

async fn register_citizen(
    State(app): State<AppState>,
    Json(req): Json<RegisterCitizenRequest>,
) -> ApiResult<Transaction> {
    require("name", &req.name)?;
    require("dateOfBirth", &req.date_of_birth)?;
    require("publicKey", &req.public_key)?;

    let tx = app
        .chain()
        .add_citizen_registration(&req.name, &req.date_of_birth, &req.public_key)?;
    Ok(ApiResponse::ok(tx))
}

async fn approve_citizen(
    State(app): State<AppState>,
    Json(req): Json<ProcessCitizenRequest>,
) -> ApiResult<Transaction> {
    require("citizenId", &req.citizen_id)?;
    require("approverKey", &req.approver_key)?;
    Ok(ApiResponse::ok(
        app.chain().approve_citizen(&req.citizen_id, &req.approver_key)?,
    ))
}

async fn reject_citizen(
    State(app): State<AppState>,
    Json(req): Json<ProcessCitizenRequest>,
) -> ApiResult<Transaction> {
    require("citizenId", &req.citizen_id)?;
    require("approverKey", &req.approver_key)?;
    Ok(ApiResponse::ok(
        app.chain().reject_citizen(&req.citizen_id, &req.approver_key)?,
    ))
}

async fn start_election(
    State(app): State<AppState>,
    Json(req): Json<StartElectionRequest>,
) -> ApiResult<Transaction> {
    require("name", &req.name)?;
    if req.duration_days == 0 {
        return Err(ApiError::InvalidInput(
            "durationDays must be at least 1".to_string(),
        ));
    }
    Ok(ApiResponse::ok(
        app.chain().start_election(&req.name, req.duration_days)?,
    ))
}

async fn register_candidate(
    State(app): State<AppState>,
    Json(req): Json<RegisterCandidateRequest>,
) -> ApiResult<Transaction> {
    require("name", &req.name)?;
    require("publicKey", &req.public_key)?;
    Ok(ApiResponse::ok(app.chain().register_candidate(
        &req.name,
        &req.public_key,
        &req.platform,
    )?))
}

async fn cast_vote(
    State(app): State<AppState>,
    Json(req): Json<CastVoteRequest>,
) -> ApiResult<Transaction> {
    require("citizenPublicKey", &req.citizen_public_key)?;
    require("candidateId", &req.candidate_id)?;
    Ok(ApiResponse::ok(
        app.chain()
            .cast_vote(&req.citizen_public_key, &req.candidate_id)?,
    ))
}

async fn end_election(State(app): State<AppState>) -> ApiResult<Transaction> {
    Ok(ApiResponse::ok(app.chain().end_election()?))
}

async fn cancel_election(
    State(app): State<AppState>,
    Json(req): Json<CancelElectionRequest>,
) -> ApiResult<Transaction> {
    require("approverKey", &req.approver_key)?;
    Ok(ApiResponse::ok(app.chain().cancel_election(&req.approver_key)?))
}

async fn get_current_election(State(app): State<AppState>) -> ApiResult<Election> {
    app.chain()
        .current_election()
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::NotFound("No active election".to_string()))
}

async fn get_current_candidates(State(app): State<AppState>) -> Json<ApiResponse<Vec<Candidate>>> {
    ApiResponse::ok(app.chain().current_candidates())
}

async fn get_election_history(State(app): State<AppState>) -> Json<ApiResponse<Vec<Election>>> {
    ApiResponse::ok(app.chain().past_elections())
}
