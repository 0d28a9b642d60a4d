//! Request plumbing shared by the route modules: actor identity read from
//! headers, the `{error, code}` response envelope, and best-effort audit
//! writes.
//!
//! Identity is asserted by the application in front of this service and
//! carried on `X-Actor-Id`, `X-Actor-Role` and an optional `X-Branch-Id`.
//! Requests without an actor are rejected with 401 before any handler
//! logic runs. Bid submission binds the supplier from this context, never
//! from request bodies.

use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use fuelbid_core::audit::AuditEvent;
use fuelbid_core::domain::context::{RequestContext, Role};
use fuelbid_core::errors::DomainError;
use fuelbid_db::repositories::{AuditRepository, RepositoryError, SqlAuditRepository};
use fuelbid_db::DbPool;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const BRANCH_ID_HEADER: &str = "x-branch-id";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Error body returned by every route. `code` is machine-readable so a UI
/// can tell `no_bids` apart from `no_qualifying_bid` and explain each
/// conflict without parsing the message.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: &'static str,
}

pub fn require_context(
    headers: &HeaderMap,
) -> Result<RequestContext, (StatusCode, Json<ApiError>)> {
    let actor_id =
        header_value(headers, ACTOR_ID_HEADER).ok_or_else(|| unauthenticated(ACTOR_ID_HEADER))?;
    let role_raw = header_value(headers, ACTOR_ROLE_HEADER)
        .ok_or_else(|| unauthenticated(ACTOR_ROLE_HEADER))?;
    let role = Role::parse(&role_raw).ok_or_else(|| {
        domain_error(DomainError::validation(
            "x-actor-role",
            "must be one of admin|manager|supplier",
        ))
    })?;

    let branch_id = header_value(headers, BRANCH_ID_HEADER);
    let correlation_id = header_value(headers, CORRELATION_ID_HEADER)
        .unwrap_or_else(|| format!("req-{}", &Uuid::new_v4().simple().to_string()[..12]));

    Ok(RequestContext { actor_id, role, branch_id, correlation_id })
}

pub fn domain_error(error: DomainError) -> (StatusCode, Json<ApiError>) {
    let status = match &error {
        DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
        DomainError::NotFound { .. }
        | DomainError::NoBids(_)
        | DomainError::NoQualifyingBid(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) | DomainError::InvalidBoqTransition { .. } => {
            StatusCode::CONFLICT
        }
    };

    (status, Json(ApiError { error: error.to_string(), code: error.code() }))
}

/// Domain failures keep their taxonomy; infrastructure failures collapse to
/// an opaque 500 so response bodies never leak SQL details.
pub fn repository_error(error: RepositoryError) -> (StatusCode, Json<ApiError>) {
    match error {
        RepositoryError::Domain(domain) => domain_error(domain),
        other => {
            error!(error = %other, "repository error while serving a procurement request");
            internal_error()
        }
    }
}

pub fn internal_error() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError { error: "an internal error occurred".to_string(), code: "internal" }),
    )
}

/// Writes one audit row after the operation it describes. Failures are
/// logged and never fail the request.
pub async fn record_audit(pool: &DbPool, event: AuditEvent) {
    let event_type = event.event_type.clone();
    let correlation_id = event.correlation_id.clone();

    let repository = SqlAuditRepository::new(pool.clone());
    if let Err(error) = repository.record(event).await {
        error!(
            event_name = "audit.write_failed",
            correlation_id = %correlation_id,
            audit_event_type = %event_type,
            error = %error,
            "failed to record audit event"
        );
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

fn unauthenticated(header: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiError {
            error: format!("missing `{header}` header: requests must carry an authenticated actor"),
            code: "unauthenticated",
        }),
    )
}
