//! # HTTP API
//!
//! The axum router served by `real-digital serve`. Reads are open; every
//! state change arrives as a signed envelope:
//!
//! ```json
//! { "request": { ... }, "caller": "<identity hex>", "signature": "<hex>" }
//! ```
//!
//! The signature must cover `request.signing_payload()`, and the request
//! must carry `expected_sequence`. A captured envelope therefore cannot be
//! replayed: the sequence moves on with every commit.
//!
//! ## Endpoints
//!
//! | Method | Path                     | Description                         |
//! |--------|--------------------------|-------------------------------------|
//! | GET    | `/health`                | Liveness probe                      |
//! | GET    | `/reserve`               | Current reserve record              |
//! | GET    | `/audit`                 | Audit report; 503 when unhealthy    |
//! | GET    | `/accounts/:holder`      | Balance of a holder identity        |
//! | GET    | `/deposits/:reference`   | Mint that consumed a reference      |
//! | GET    | `/receipts`              | Recent receipts, newest first       |
//! | GET    | `/receipts/:sequence`    | One receipt                         |
//! | POST   | `/mint`                  | Signed mint (authority)             |
//! | POST   | `/burn`                  | Signed burn (holder)                |
//! | POST   | `/pause`                 | Signed pause/unpause (authority)    |
//! | POST   | `/authority`             | Signed authority transfer           |

use axum::{
    extract::{Path, Query, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use real_digital_protocol::amount::format_minor;
use real_digital_protocol::config::DEFAULT_HISTORY_LIMIT;
use real_digital_protocol::crypto::keys::Signature;
use real_digital_protocol::ledger::{
    AuthorityTransferRequest, BurnRequest, Caller, Ledger, LedgerError, MintRequest,
    PauseRequest, Receipt, Transition,
};
use real_digital_protocol::{Address, Identity};

use crate::metrics::SharedMetrics;

/// Largest page `/receipts` will return.
const MAX_HISTORY_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state for all handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Build the API router with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/reserve", get(reserve_handler))
        .route("/audit", get(audit_handler))
        .route("/accounts/:holder", get(account_handler))
        .route("/deposits/:reference", get(deposit_handler))
        .route("/receipts", get(receipts_handler))
        .route("/receipts/:sequence", get(receipt_handler))
        .route("/mint", post(mint_handler))
        .route("/burn", post(burn_handler))
        .route("/pause", post(pause_handler))
        .route("/authority", post(authority_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Wire Types
// ---------------------------------------------------------------------------

/// A request plus the caller's signature over its signing payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedEnvelope<R> {
    pub request: R,
    pub caller: Identity,
    pub signature: Signature,
}

/// JSON error body: `{ "error": kind, "message": text, "retryable": bool }`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// The same envelope may succeed if resubmitted unchanged.
    pub retryable: bool,
}

/// Response payload for `GET /reserve`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReserveResponse {
    pub address: Address,
    pub authority: Identity,
    pub total_supply: u64,
    pub brl_reserve: u64,
    pub total_minted: u64,
    pub total_burned: u64,
    pub is_paused: bool,
    pub sequence: u64,
    /// `total_supply` as a BRL string, e.g. `"100.50"`.
    pub total_supply_brl: String,
    pub brl_reserve_brl: String,
}

/// Response payload for `GET /accounts/:holder`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub holder: Identity,
    pub address: Address,
    pub balance: u64,
    pub balance_brl: String,
    /// False if the holder was never credited.
    pub exists: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An HTTP error carrying a ledger error kind.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    retryable: bool,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "bad_request",
            message: message.into(),
            retryable: false,
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message: message.into(),
            retryable: false,
        }
    }
}

/// `Retry-After` sent with retryable errors.
const RETRY_AFTER_SECS: &str = "1";

/// One status code per error kind.
pub fn status_for(error: &LedgerError) -> StatusCode {
    match error {
        LedgerError::Unauthorized(_) => StatusCode::FORBIDDEN,
        LedgerError::LedgerPaused => StatusCode::LOCKED,
        LedgerError::InvalidAmount(_)
        | LedgerError::AmountTooLarge { .. }
        | LedgerError::InvalidReference(_)
        | LedgerError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::DuplicateReference(_)
        | LedgerError::Conflict { .. }
        | LedgerError::AlreadyInitialized => StatusCode::CONFLICT,
        LedgerError::AccountNotFound(_) | LedgerError::NotInitialized => StatusCode::NOT_FOUND,
        LedgerError::TransportFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Overflow(_)
        | LedgerError::InvariantViolation(_)
        | LedgerError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<LedgerError> for ApiError {
    fn from(error: LedgerError) -> Self {
        Self {
            status: status_for(&error),
            kind: error.kind(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retryable = self.retryable;
        let body = ErrorResponse {
            error: self.kind.to_string(),
            message: self.message,
            retryable,
        };
        if retryable {
            (
                self.status,
                [(header::RETRY_AFTER, RETRY_AFTER_SECS)],
                Json(body),
            )
                .into_response()
        } else {
            (self.status, Json(body)).into_response()
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Read Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: liveness only; does not touch the ledger.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /reserve`
async fn reserve_handler(State(state): State<AppState>) -> ApiResult<Json<ReserveResponse>> {
    let reserve = state.ledger.fetch()?;
    state.metrics.observe_reserve(&reserve);
    Ok(Json(ReserveResponse {
        address: Address::reserve(),
        authority: reserve.authority,
        total_supply: reserve.total_supply,
        brl_reserve: reserve.brl_reserve,
        total_minted: reserve.total_minted,
        total_burned: reserve.total_burned,
        is_paused: reserve.is_paused,
        sequence: reserve.sequence,
        total_supply_brl: format_minor(reserve.total_supply),
        brl_reserve_brl: format_minor(reserve.brl_reserve),
    }))
}

/// `GET /audit`: the report, with 503 when any check fails.
async fn audit_handler(State(state): State<AppState>) -> ApiResult<Response> {
    let report = state.ledger.audit()?;
    state.metrics.record_audit(&report);
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((status, Json(report)).into_response())
}

/// `GET /accounts/:holder`: unknown holders report a zero balance.
async fn account_handler(
    Path(holder): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<AccountResponse>> {
    let holder: Identity = holder
        .parse()
        .map_err(|e| ApiError::bad_request(format!("invalid holder identity: {e}")))?;
    let account = state.ledger.account(&holder)?;
    let balance = account.as_ref().map_or(0, |a| a.balance);
    Ok(Json(AccountResponse {
        holder,
        address: Address::account(&holder),
        balance,
        balance_brl: format_minor(balance),
        exists: account.is_some(),
    }))
}

/// `GET /deposits/:reference`
async fn deposit_handler(
    Path(reference): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Response> {
    match state.ledger.deposit(&reference)? {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(ApiError::not_found(format!(
            "deposit reference {reference:?} was never minted"
        ))),
    }
}

/// `GET /receipts?limit=N`
async fn receipts_handler(
    Query(query): Query<HistoryQuery>,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Receipt>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    Ok(Json(state.ledger.receipts(limit)?))
}

/// `GET /receipts/:sequence`
async fn receipt_handler(
    Path(sequence): Path<u64>,
    State(state): State<AppState>,
) -> ApiResult<Json<Receipt>> {
    state
        .ledger
        .receipt(sequence)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no receipt at sequence {sequence}")))
}

// ---------------------------------------------------------------------------
// Signed Submissions
// ---------------------------------------------------------------------------

/// Authenticate the envelope and insist on a pinned sequence.
fn authenticate(
    state: &AppState,
    payload: &[u8],
    expected_sequence: Option<u64>,
    caller: Identity,
    signature: &Signature,
) -> ApiResult<Caller> {
    let outcome = match expected_sequence {
        None => Err(ApiError::bad_request(
            "request must set expected_sequence; read it from GET /reserve",
        )),
        Some(_) => Caller::from_signature(caller, payload, signature).map_err(ApiError::from),
    };
    if let Err(e) = &outcome {
        state.metrics.record_rejection(e.kind);
    }
    outcome
}

/// Apply a transition on the blocking pool and record metrics.
async fn submit<F>(state: &AppState, apply: F) -> ApiResult<Json<Receipt>>
where
    F: FnOnce(&Ledger) -> Result<Receipt, LedgerError> + Send + 'static,
{
    let started = Instant::now();
    let ledger = Arc::clone(&state.ledger);
    let outcome = tokio::task::spawn_blocking(move || apply(ledger.as_ref()))
        .await
        .map_err(|e| LedgerError::TransportFailure(format!("ledger task failed: {e}")))?;
    state
        .metrics
        .transition_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    match outcome {
        Ok(receipt) => {
            match receipt.transition {
                Transition::Mint { .. } => state.metrics.mints_total.inc(),
                Transition::Burn { .. } => state.metrics.burns_total.inc(),
                _ => {}
            }
            state.metrics.observe_reserve(&receipt.reserve);
            Ok(Json(receipt))
        }
        Err(e) => {
            state.metrics.record_rejection(e.kind());
            Err(e.into())
        }
    }
}

/// `POST /mint`
async fn mint_handler(
    State(state): State<AppState>,
    Json(envelope): Json<SignedEnvelope<MintRequest>>,
) -> ApiResult<Json<Receipt>> {
    let request = envelope.request;
    let caller = authenticate(
        &state,
        &request.signing_payload(),
        request.expected_sequence,
        envelope.caller,
        &envelope.signature,
    )?;
    submit(&state, move |ledger| ledger.mint(&request, &caller)).await
}

/// `POST /burn`
async fn burn_handler(
    State(state): State<AppState>,
    Json(envelope): Json<SignedEnvelope<BurnRequest>>,
) -> ApiResult<Json<Receipt>> {
    let request = envelope.request;
    let caller = authenticate(
        &state,
        &request.signing_payload(),
        request.expected_sequence,
        envelope.caller,
        &envelope.signature,
    )?;
    submit(&state, move |ledger| ledger.burn(&request, &caller)).await
}

/// `POST /pause`
async fn pause_handler(
    State(state): State<AppState>,
    Json(envelope): Json<SignedEnvelope<PauseRequest>>,
) -> ApiResult<Json<Receipt>> {
    let request = envelope.request;
    let caller = authenticate(
        &state,
        &request.signing_payload(),
        request.expected_sequence,
        envelope.caller,
        &envelope.signature,
    )?;
    submit(&state, move |ledger| ledger.set_paused(&request, &caller)).await
}

/// `POST /authority`
async fn authority_handler(
    State(state): State<AppState>,
    Json(envelope): Json<SignedEnvelope<AuthorityTransferRequest>>,
) -> ApiResult<Json<Receipt>> {
    let request = envelope.request;
    let caller = authenticate(
        &state,
        &request.signing_payload(),
        request.expected_sequence,
        envelope.caller,
        &envelope.signature,
    )?;
    submit(&state, move |ledger| ledger.transfer_authority(&request, &caller)).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
