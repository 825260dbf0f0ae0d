//! HTTP routes over a shared VaultNode. Adapters only; every rule lives in the node.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::Key;
use crate::core::paths;
use crate::enrollment::EnrollmentSnapshot;
use crate::error::VaultError;
use crate::ledger::{Notification, StatusFilter, Transaction, ASSET};
use crate::session::{SessionView, SetupKind};
use crate::VaultNode;

#[derive(Clone)]
pub struct NodeState { pub node: VaultNode, pub app_name: String }

impl NodeState {
    pub fn new(node: VaultNode, app_name: impl Into<String>) -> Self {
        Self { node, app_name: app_name.into() }
    }
}

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(e: VaultError) -> ApiError {
    let status = match &e {
        VaultError::Validation(_) | VaultError::PinMismatch => StatusCode::BAD_REQUEST,
        VaultError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        VaultError::AuthRejected | VaultError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        VaultError::IllegalTransition { .. } => StatusCode::CONFLICT,
        VaultError::EnclaveUnreachable(_) => StatusCode::BAD_GATEWAY,
        VaultError::CameraAccessDenied => StatusCode::SERVICE_UNAVAILABLE,
        VaultError::Storage(_) | VaultError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": e.to_string(), "code": e.code()})))
}

pub fn create_router(node: VaultNode) -> Router { create_router_with_name(node, "mimivault") }

pub fn create_router_with_name(node: VaultNode, app_name: &str) -> Router {
    Router::new()
        .route(paths::HEALTH, get(health))
        .route(paths::session::VIEW, get(session_view))
        .route(paths::session::BOOT, post(session_boot))
        .route(paths::session::KEYPAD, post(session_keypad))
        .route(paths::session::PIN, post(session_pin))
        .route(paths::session::LOGOUT, post(session_logout))
        .route(paths::session::RESET, post(session_reset))
        .route(paths::onboarding::SETUP, post(onboarding_setup))
        .route(paths::onboarding::IDENTITY_ACK, post(onboarding_identity_ack))
        .route(paths::onboarding::SEED_ACK, post(onboarding_seed_ack))
        .route(paths::onboarding::RECOVER, post(onboarding_recover))
        .route(paths::onboarding::RECOVER_SUBMIT, post(onboarding_recover_submit))
        .route(paths::onboarding::RECOVER_CANCEL, post(onboarding_recover_cancel))
        .route(paths::enrollment::STATUS, get(enrollment_status))
        .route(paths::enrollment::START, post(enrollment_start))
        .route(paths::enrollment::STOP, post(enrollment_stop))
        .route(paths::ledger::BALANCE, get(ledger_balance))
        .route(paths::ledger::TRANSACTIONS, get(ledger_transactions))
        .route(paths::ledger::TRANSACTION, get(ledger_transaction))
        .route(paths::ledger::NOTIFICATIONS, get(ledger_notifications))
        .route(paths::ledger::NOTIFICATIONS_READ_ALL, post(ledger_read_all))
        .route(paths::ledger::NOTIFICATION_READ, post(ledger_read))
        .route(paths::ledger::NOTIFICATION_TRANSACTION, get(ledger_notification_transaction))
        .route(paths::ledger::TRANSFER, post(transfer_draft).delete(transfer_cancel))
        .route(paths::ledger::TRANSFER_CONFIRM, post(transfer_confirm))
        .route(paths::ledger::TRANSFER_BACK, post(transfer_back))
        .route(paths::ledger::TRANSFER_AUTHORIZE, post(transfer_authorize))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(NodeState::new(node, app_name))
}

async fn health(State(s): State<NodeState>) -> impl IntoResponse {
    Json(json!({"status": "ok", "service": s.app_name}))
}

// -----------------------------------------------------------------------------
// Session
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct KeyRequest { key: String }

#[derive(Deserialize)]
struct PinRequest { pin: String }

async fn session_view(State(s): State<NodeState>) -> Json<SessionView> {
    Json(s.node.view().await)
}

async fn session_boot(State(s): State<NodeState>) -> ApiResult<SessionView> {
    s.node.boot().await.map(Json).map_err(api_error)
}

async fn session_keypad(State(s): State<NodeState>, Json(req): Json<KeyRequest>) -> ApiResult<SessionView> {
    let key = Key::parse(&req.key).ok_or_else(|| api_error(VaultError::validation(format!("unknown key: {}", req.key))))?;
    s.node.press(key).await.map_err(api_error)?;
    Ok(Json(s.node.view().await))
}

async fn session_pin(State(s): State<NodeState>, Json(req): Json<PinRequest>) -> ApiResult<SessionView> {
    s.node.enter_pin(&req.pin).await.map_err(api_error)?;
    Ok(Json(s.node.view().await))
}

async fn session_logout(State(s): State<NodeState>) -> ApiResult<SessionView> {
    s.node.logout().await.map(Json).map_err(api_error)
}

async fn session_reset(State(s): State<NodeState>) -> ApiResult<SessionView> {
    s.node.factory_reset().await.map(Json).map_err(api_error)
}

// -----------------------------------------------------------------------------
// Onboarding
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct SetupRequest { kind: SetupKind }

#[derive(Deserialize)]
struct RecoveryRequest { vault_id: String }

async fn onboarding_setup(State(s): State<NodeState>, Json(req): Json<SetupRequest>) -> ApiResult<SessionView> {
    s.node.begin_setup(req.kind).await.map(Json).map_err(api_error)
}

async fn onboarding_identity_ack(State(s): State<NodeState>) -> ApiResult<SessionView> {
    s.node.acknowledge_identity().await.map(Json).map_err(api_error)
}

async fn onboarding_seed_ack(State(s): State<NodeState>) -> ApiResult<SessionView> {
    s.node.acknowledge_seed().await.map(Json).map_err(api_error)
}

async fn onboarding_recover(State(s): State<NodeState>) -> ApiResult<SessionView> {
    s.node.begin_recovery().await.map(Json).map_err(api_error)
}

async fn onboarding_recover_submit(State(s): State<NodeState>, Json(req): Json<RecoveryRequest>) -> ApiResult<SessionView> {
    s.node.submit_recovery(&req.vault_id).await.map(Json).map_err(api_error)
}

async fn onboarding_recover_cancel(State(s): State<NodeState>) -> ApiResult<SessionView> {
    s.node.cancel_recovery().await.map(Json).map_err(api_error)
}

// -----------------------------------------------------------------------------
// Enrollment
// -----------------------------------------------------------------------------

#[derive(Serialize)]
struct EnrollmentResponse {
    #[serde(flatten)]
    snapshot: EnrollmentSnapshot,
    progress: f32,
    instruction: &'static str,
}

impl From<EnrollmentSnapshot> for EnrollmentResponse {
    fn from(snapshot: EnrollmentSnapshot) -> Self {
        Self { progress: snapshot.progress(), instruction: snapshot.instruction(), snapshot }
    }
}

async fn enrollment_status(State(s): State<NodeState>) -> ApiResult<EnrollmentResponse> {
    s.node
        .enrollment_status()
        .await
        .map(|snap| Json(snap.into()))
        .ok_or_else(|| api_error(VaultError::validation("No enrollment running")))
}

async fn enrollment_start(State(s): State<NodeState>) -> ApiResult<EnrollmentResponse> {
    s.node.start_enrollment().await.map(|snap| Json(snap.into())).map_err(api_error)
}

async fn enrollment_stop(State(s): State<NodeState>) -> ApiResult<EnrollmentResponse> {
    s.node
        .stop_enrollment()
        .await
        .map(|snap| Json(snap.into()))
        .ok_or_else(|| api_error(VaultError::validation("No enrollment running")))
}

// -----------------------------------------------------------------------------
// Ledger
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct HistoryQuery { #[serde(default)] status: Option<String> }

#[derive(Serialize)]
struct ListResponse<T> { items: Vec<T>, count: usize }

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self { Self { count: items.len(), items } }
}

async fn ledger_balance(State(s): State<NodeState>) -> ApiResult<Value> {
    let balance = s.node.balance().await.map_err(api_error)?;
    Ok(Json(json!({"balance": format!("{:.2}", balance), "asset": ASSET})))
}

async fn ledger_transactions(State(s): State<NodeState>, Query(q): Query<HistoryQuery>) -> ApiResult<ListResponse<Transaction>> {
    let raw = q.status.unwrap_or_default();
    let filter = StatusFilter::from_str(&raw)
        .ok_or_else(|| api_error(VaultError::validation(format!("unknown status filter: {raw}"))))?;
    let items = s.node.transactions(filter).await.map_err(api_error)?;
    Ok(Json(items.into()))
}

async fn ledger_transaction(State(s): State<NodeState>, Path(id): Path<String>) -> ApiResult<Transaction> {
    match s.node.transaction(&id).await.map_err(api_error)? {
        Some(tx) => Ok(Json(tx)),
        None => Err((StatusCode::NOT_FOUND, Json(json!({"error": format!("not found: {id}"), "code": "not_found"})))),
    }
}

async fn ledger_notifications(State(s): State<NodeState>) -> ApiResult<ListResponse<Notification>> {
    let items = s.node.notifications().await.map_err(api_error)?;
    Ok(Json(items.into()))
}

async fn ledger_read(State(s): State<NodeState>, Path(id): Path<u64>) -> ApiResult<Value> {
    let found = s.node.mark_read(id).await.map_err(api_error)?;
    Ok(Json(json!({"found": found})))
}

async fn ledger_read_all(State(s): State<NodeState>) -> ApiResult<Value> {
    let changed = s.node.mark_all_read().await.map_err(api_error)?;
    Ok(Json(json!({"changed": changed})))
}

async fn ledger_notification_transaction(State(s): State<NodeState>, Path(id): Path<u64>) -> ApiResult<Transaction> {
    match s.node.linked_transaction(id).await.map_err(api_error)? {
        Some(tx) => Ok(Json(tx)),
        None => Err((StatusCode::NOT_FOUND, Json(json!({"error": format!("no linked transaction: {id}"), "code": "not_found"})))),
    }
}

// -----------------------------------------------------------------------------
// Transfer
// -----------------------------------------------------------------------------

#[derive(Deserialize)]
struct DraftRequest { amount: String, recipient: String }

#[derive(Deserialize)]
struct AuthorizeRequest { #[serde(default)] password: String }

async fn transfer_draft(State(s): State<NodeState>, Json(req): Json<DraftRequest>) -> ApiResult<SessionView> {
    s.node.draft_transfer(&req.amount, &req.recipient).await.map(Json).map_err(api_error)
}

async fn transfer_confirm(State(s): State<NodeState>) -> ApiResult<SessionView> {
    s.node.confirm_transfer().await.map(Json).map_err(api_error)
}

async fn transfer_back(State(s): State<NodeState>) -> ApiResult<SessionView> {
    s.node.transfer_back().await.map(Json).map_err(api_error)
}

async fn transfer_cancel(State(s): State<NodeState>) -> Json<SessionView> {
    Json(s.node.cancel_transfer().await)
}

async fn transfer_authorize(State(s): State<NodeState>, Json(req): Json<AuthorizeRequest>) -> ApiResult<Transaction> {
    s.node.authorize_transfer(&req.password).await.map(Json).map_err(api_error)
}
