//! HTTP front for an [`AccountProvider`].
//!
//! Every route builds its own [`RequestContext`], so the provider logs each
//! request under a fresh id. Failures come back as [`ErrorResponse`] bodies
//! with the status chosen by [`status_for`].

use crate::errors::AcquisitionError;
use crate::provider::{AccountProvider, RequestContext};
use crate::types::{AccountDetails, AccountDetailsResponse, AccountsResponse, ErrorResponse};
use axum::extract::{Path, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub type SharedProvider = Arc<dyn AccountProvider>;

/// Build the router with all account endpoints.
pub fn router(provider: SharedProvider) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/v1/accounts", get(list_accounts))
        .route("/api/v1/accounts/:account_id", get(account_details))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(provider)
}

/// Bind on all interfaces and serve until Ctrl-C.
pub async fn serve(port: u16, provider: SharedProvider) -> anyhow::Result<()> {
    let name = provider.name();
    let app = router(provider);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, provider = name, "Account API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Account API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Authentication failures are 401, a missing account is 404, and every
/// other failure means the portal could not be used right now.
pub fn status_for(err: &AcquisitionError) -> StatusCode {
    match err {
        AcquisitionError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
        AcquisitionError::AccountNotFound(_) => StatusCode::NOT_FOUND,
        AcquisitionError::Timeout { .. } | AcquisitionError::TransientUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub struct ApiError(AcquisitionError);

impl From<AcquisitionError> for ApiError {
    fn from(err: AcquisitionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!(code = self.0.code(), error = %self.0, "Request failed");
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

async fn root() -> &'static str {
    "NAB account API is running.\n"
}

async fn health() -> &'static str {
    "OK\n"
}

async fn list_accounts(
    State(provider): State<SharedProvider>,
) -> Result<Json<AccountsResponse>, ApiError> {
    let ctx = RequestContext::new();
    info!(request_id = %ctx.request_id, "GET accounts");

    let accounts = provider.list_accounts(&ctx).await?;
    Ok(Json(AccountsResponse::new(accounts)))
}

async fn account_details(
    State(provider): State<SharedProvider>,
    Path(account_id): Path<String>,
) -> Result<Json<AccountDetailsResponse>, ApiError> {
    let ctx = RequestContext::new();
    info!(request_id = %ctx.request_id, %account_id, "GET account details");

    let (account, transactions) = provider
        .fetch_account_with_transactions(&ctx, &account_id)
        .await?;
    Ok(Json(AccountDetails::new(account, transactions).into()))
}
