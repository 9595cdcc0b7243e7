//! HTTP control plane.
//!
//! Clients publish and retract bindings here; consumers resolve them
//! over DNS. Hostnames in non-wildcard positions are FQDN-normalised
//! (lowercase, trailing dot); IPs must parse as dotted-quad IPv4 unless
//! they are the `*` wildcard on DELETE.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::warn;

use crate::entry::fqdn;
use crate::error::NameError;
use crate::nameserver::Nameserver;

/// Shared state for the control plane handlers.
#[derive(Clone)]
pub struct AppState {
    /// The nameserver all routes read from and write to.
    pub ns: Arc<Nameserver>,
    /// The domain suffix this cluster serves.
    pub domain: String,
}

/// Build the control plane router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/name/{hostname}/{ip}/{container}",
            put(put_name).delete(delete_name),
        )
        .route("/name/{hostname}", get(get_name))
        .route("/domain", get(get_domain))
        .with_state(state)
}

struct ApiError(NameError);

impl From<NameError> for ApiError {
    fn from(err: NameError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            NameError::NotFound => StatusCode::NOT_FOUND,
            NameError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status != StatusCode::NOT_FOUND {
            warn!(error = %self.0, "control plane request failed");
        }
        (status, self.0.to_string()).into_response()
    }
}

fn parse_ipv4(ip: &str) -> Result<Ipv4Addr, NameError> {
    ip.parse()
        .map_err(|_| NameError::InvalidAddress(ip.to_string()))
}

async fn put_name(
    State(state): State<AppState>,
    Path((hostname, ip, container)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let addr = parse_ipv4(&ip)?;

    state.ns.add_entry(&hostname, &container, addr).await?;

    Ok(StatusCode::NO_CONTENT)
}

// Deletion works by hostname, ip, container id, or any combination;
// `*` stands for the dimensions the caller does not know.
async fn delete_name(
    State(state): State<AppState>,
    Path((hostname, ip, container)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let addr = match ip.as_str() {
        "*" => None,
        ip => Some(parse_ipv4(ip)?),
    };
    let hostname = match hostname.as_str() {
        "*" => None,
        hostname => Some(fqdn(hostname)),
    };
    let container = match container.as_str() {
        "*" => None,
        container => Some(container),
    };

    state.ns.delete(hostname.as_deref(), container, addr);

    Ok(StatusCode::NO_CONTENT)
}

async fn get_name(
    State(state): State<AppState>,
    Path(hostname): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let addrs = state.ns.lookup(&fqdn(&hostname));
    if addrs.is_empty() {
        return Err(NameError::NotFound.into());
    }

    Ok(Json(addrs.iter().map(Ipv4Addr::to_string).collect()))
}

async fn get_domain(State(state): State<AppState>) -> String {
    state.domain.clone()
}
