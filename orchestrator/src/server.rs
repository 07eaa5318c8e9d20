//! The HTTP API of the orchestrator

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use deploy_common::{
    constants::{ADDRESSES_ROUTE, DEPLOY_V1_ROUTE, STATUS_ROUTE, UPGRADE_TO_V2_ROUTE},
    types::{AddressesResponse, ApiError, DeployResponse, StatusResponse, UpgradeResponse},
};
use tokio::{net::TcpListener, sync::watch};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::{
    commands::Orchestrator, constants::BIND_ALL_INTERFACES, errors::OrchestratorError,
    health::ChainHealth,
};

/// The error message returned when upgrading before deploying
const V1_NOT_DEPLOYED_MESSAGE: &str = "V1 not deployed";

/// The state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// The orchestrator
    pub orchestrator: Arc<Orchestrator>,
    /// The last observed chain health
    pub chain_health: watch::Receiver<ChainHealth>,
}

// ----------
// | Errors |
// ----------

/// An error response: a status code & a JSON body
pub struct ApiErrorResponse(StatusCode, ApiError);

impl ApiErrorResponse {
    /// A 500 response describing the error
    fn internal(err: &OrchestratorError) -> Self {
        error!("request failed: {}", err);
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), err)
    }

    /// A response with the given status & message, carrying the error's logs
    fn with_status(status: StatusCode, message: String, err: &OrchestratorError) -> Self {
        Self(status, ApiError { error: message, logs: err.logs().map(str::to_string) })
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

// ------------
// | Handlers |
// ------------

/// Deploy the V1 implementation behind a fresh proxy
async fn deploy_v1(
    State(state): State<AppState>,
) -> Result<Json<DeployResponse>, ApiErrorResponse> {
    state.orchestrator.deploy_initial().await.map(Json).map_err(|e| ApiErrorResponse::internal(&e))
}

/// Upgrade the active proxy to the V2 implementation
async fn upgrade_to_v2(
    State(state): State<AppState>,
) -> Result<Json<UpgradeResponse>, ApiErrorResponse> {
    state.orchestrator.upgrade_to_next().await.map(Json).map_err(|e| match e {
        OrchestratorError::NotDeployed => ApiErrorResponse::with_status(
            StatusCode::BAD_REQUEST,
            V1_NOT_DEPLOYED_MESSAGE.to_string(),
            &e,
        ),
        e => ApiErrorResponse::internal(&e),
    })
}

/// The active deployment
async fn addresses(
    State(state): State<AppState>,
) -> Result<Json<AddressesResponse>, ApiErrorResponse> {
    state.orchestrator.get_addresses().await.map(Json).map_err(|e| match e {
        OrchestratorError::NotDeployed => {
            ApiErrorResponse::with_status(StatusCode::NOT_FOUND, e.to_string(), &e)
        }
        e => ApiErrorResponse::internal(&e),
    })
}

/// A snapshot of the orchestrator's state
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let chain_health = *state.chain_health.borrow();
    Json(state.orchestrator.status(chain_health).await)
}

// ----------
// | Server |
// ----------

/// Build the router serving the API
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(DEPLOY_V1_ROUTE, post(deploy_v1))
        .route(UPGRADE_TO_V2_ROUTE, post(upgrade_to_v2))
        .route(ADDRESSES_ROUTE, get(addresses))
        .route(STATUS_ROUTE, get(status))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on `port` until `cancel` fires
pub async fn run_server(
    port: u16,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), OrchestratorError> {
    let addr: SocketAddr = format!("{}:{}", BIND_ALL_INTERFACES, port)
        .parse()
        .map_err(|e: std::net::AddrParseError| OrchestratorError::Server(e.to_string()))?;
    let listener =
        TcpListener::bind(addr).await.map_err(|e| OrchestratorError::Server(e.to_string()))?;
    info!("server running on http://localhost:{}", port);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| OrchestratorError::Server(e.to_string()))
}
