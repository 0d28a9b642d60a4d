//! Evaluation and selection routes: the decision half of a procurement round.
//!
//! - `POST /api/v1/bids/evaluate` ranks a BOQ's active bids and recommends
//!   a winner without touching any state
//! - `POST /api/v1/boq/{id}/select` commits the award and runs the single
//!   notice delivery attempt
//! - `GET /api/v1/boq/{id}/selection` returns the committed award with its
//!   notice outcome

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use fuelbid_core::audit::{event_types, AuditEvent, AuditOutcome};
use fuelbid_core::domain::bid::BidStatus;
use fuelbid_core::domain::boq::BoqId;
use fuelbid_core::domain::context::RequestContext;
use fuelbid_core::domain::selection::{
    AwardNotice, AwardNoticeId, AwardNoticeState, Selection, SelectionId,
};
use fuelbid_core::domain::supplier::{SupplierId, SupplierSnapshot};
use fuelbid_core::errors::{ConflictReason, DomainError, ResourceKind};
use fuelbid_core::evaluation::{evaluate, EvaluationCriteria};
use fuelbid_db::repositories::{
    AwardNoticeRepository, BidRepository, BoqRepository, BudgetRepository, SelectionRepository,
    SqlBidRepository, SqlBoqRepository, SqlBudgetRepository, SqlSelectionRepository,
    SqlSupplierRepository, SupplierRepository,
};
use fuelbid_db::retry::with_read_retries;
use fuelbid_db::DbPool;
use fuelbid_notify::message::{render_award_message, AwardMessage, AwardNoticeContext};
use fuelbid_notify::notifier::Notifier;

use crate::bidding::{bid_response, BidResponse};
use crate::context::{
    domain_error, internal_error, record_audit, repository_error, require_context, ApiError,
};

#[derive(Clone)]
pub struct AwardsState {
    pub db_pool: DbPool,
    pub notifier: Arc<dyn Notifier>,
    pub currency: String,
}

pub fn router(db_pool: DbPool, notifier: Arc<dyn Notifier>, currency: String) -> Router {
    let state = AwardsState { db_pool, notifier, currency };

    Router::new()
        .route("/api/v1/bids/evaluate", post(evaluate_bids))
        .route("/api/v1/boq/{id}/select", post(select_supplier))
        .route("/api/v1/boq/{id}/selection", get(get_selection))
        .with_state(state)
}

// ---- Request / Response types ----

/// Criteria for one evaluation pass. Every field except the BOQ id is
/// optional; an omitted ceiling falls back to the stored budget for the
/// BOQ's fuel type.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub boq_id: String,
    #[serde(default)]
    pub required_qualifications: Vec<String>,
    #[serde(default)]
    pub required_quality_certificates: Vec<String>,
    pub max_price_per_unit: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub boq_id: String,
    pub winning_bid: BidResponse,
    pub supplier: SupplierSnapshot,
    pub submitted_count: usize,
    pub qualifying_count: usize,
    pub applied_max_price_per_unit: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub supplier_id: String,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub selection_id: String,
    pub boq_id: String,
    pub bid_id: String,
    pub supplier_id: String,
    pub decided_by: String,
    pub decided_at: String,
    pub notice_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SelectionRecordResponse {
    pub selection_id: String,
    pub boq_id: String,
    pub bid_id: String,
    pub supplier_id: String,
    pub decided_by: String,
    pub decided_at: String,
    pub award_notice: Option<AwardNoticeSummary>,
}

#[derive(Debug, Serialize)]
pub struct AwardNoticeSummary {
    pub notice_id: String,
    pub state: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

// ---- Handlers ----

async fn evaluate_bids(
    State(state): State<AwardsState>,
    headers: HeaderMap,
    Json(payload): Json<EvaluateRequest>,
) -> Result<Json<EvaluationResponse>, (StatusCode, Json<ApiError>)> {
    let ctx = require_context(&headers)?;
    let now = Utc::now();

    let boq_repo = SqlBoqRepository::new(state.db_pool.clone());
    let boq_id = BoqId(payload.boq_id);
    let boq = with_read_retries(|| boq_repo.find_by_id(&boq_id))
        .await
        .map_err(repository_error)?
        .ok_or_else(|| domain_error(DomainError::not_found(ResourceKind::Boq, boq_id.0.clone())))?;

    let bid_repo = SqlBidRepository::new(state.db_pool.clone());
    let ledger =
        with_read_retries(|| bid_repo.list_for_boq(&boq.id)).await.map_err(repository_error)?;
    // Won and lost bids stay on the ledger for the record; only active
    // ones compete.
    let active: Vec<_> =
        ledger.into_iter().filter(|bid| bid.status == BidStatus::Active).collect();

    let ceiling = match payload.max_price_per_unit {
        Some(ceiling) => Some(ceiling),
        None => {
            let budget_repo = SqlBudgetRepository::new(state.db_pool.clone());
            with_read_retries(|| budget_repo.find_for_fuel_type(boq.fuel_type))
                .await
                .map_err(repository_error)?
                .map(|budget| budget.max_price_per_unit)
        }
    };

    let criteria = EvaluationCriteria {
        required_qualifications: payload.required_qualifications,
        required_quality_certificates: payload.required_quality_certificates,
        max_price_per_unit: ceiling,
    };

    let report = match evaluate(&boq.id, &active, &criteria) {
        Ok(report) => report,
        Err(outcome) => {
            record_audit(
                &state.db_pool,
                AuditEvent::new(
                    &ctx,
                    Some(boq.id.clone()),
                    event_types::BOQ_EVALUATED,
                    AuditOutcome::Rejected,
                    now,
                )
                .with_metadata("reason", outcome.code()),
            )
            .await;
            return Err(domain_error(outcome));
        }
    };

    let supplier_repo = SqlSupplierRepository::new(state.db_pool.clone());
    let supplier = with_read_retries(|| supplier_repo.find_by_id(&report.winner.supplier_id))
        .await
        .map_err(repository_error)?
        .ok_or_else(|| {
            domain_error(DomainError::not_found(
                ResourceKind::Supplier,
                report.winner.supplier_id.0.clone(),
            ))
        })?;

    record_audit(
        &state.db_pool,
        AuditEvent::new(
            &ctx,
            Some(boq.id.clone()),
            event_types::BOQ_EVALUATED,
            AuditOutcome::Success,
            now,
        )
        .with_metadata("winning_bid_id", report.winner.id.0.clone())
        .with_metadata("qualifying_count", report.qualifying_count.to_string()),
    )
    .await;

    info!(
        event_name = "boq.evaluated",
        correlation_id = %ctx.correlation_id,
        boq_id = %boq.id,
        winning_bid_id = %report.winner.id,
        submitted_count = report.submitted_count,
        qualifying_count = report.qualifying_count,
        "evaluated the bid ledger"
    );

    Ok(Json(EvaluationResponse {
        boq_id: boq.id.0.clone(),
        winning_bid: bid_response(&report.winner),
        supplier: supplier.snapshot(),
        submitted_count: report.submitted_count,
        qualifying_count: report.qualifying_count,
        applied_max_price_per_unit: criteria.max_price_per_unit,
    }))
}

async fn select_supplier(
    State(state): State<AwardsState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<SelectRequest>,
) -> Result<(StatusCode, Json<SelectionResponse>), (StatusCode, Json<ApiError>)> {
    let ctx = require_context(&headers)?;
    let now = Utc::now();
    let boq_id = BoqId(id);
    let supplier_id = SupplierId(payload.supplier_id);

    let boq_repo = SqlBoqRepository::new(state.db_pool.clone());
    let boq = boq_repo
        .find_by_id(&boq_id)
        .await
        .map_err(repository_error)?
        .ok_or_else(|| domain_error(DomainError::not_found(ResourceKind::Boq, boq_id.0.clone())))?;

    // A concluded round answers with the conflict, not with "no active
    // bid"; the transaction re-checks this for racing selects.
    let selection_repo = SqlSelectionRepository::new(state.db_pool.clone());
    if selection_repo.find_by_boq(&boq.id).await.map_err(repository_error)?.is_some() {
        return Err(domain_error(ConflictReason::AlreadySelected.into()));
    }

    let supplier_repo = SqlSupplierRepository::new(state.db_pool.clone());
    let supplier =
        supplier_repo.find_by_id(&supplier_id).await.map_err(repository_error)?.ok_or_else(
            || domain_error(DomainError::not_found(ResourceKind::Supplier, supplier_id.0.clone())),
        )?;

    let bid_repo = SqlBidRepository::new(state.db_pool.clone());
    let bid = bid_repo
        .find_active_for_supplier(&boq.id, &supplier.id)
        .await
        .map_err(repository_error)?
        .ok_or_else(|| {
            domain_error(DomainError::not_found(
                ResourceKind::Bid,
                format!("{}:{}", boq.id.0, supplier.id.0),
            ))
        })?;

    let selection = Selection {
        id: SelectionId::generate(),
        boq_id: boq.id.clone(),
        bid_id: bid.id.clone(),
        supplier_id: supplier.id.clone(),
        decided_by: ctx.actor_id.clone(),
        decided_at: now,
    };
    let notice_id = AwardNoticeId::generate();

    // Rendered before the transaction so the payload digest lands on the
    // notice row it describes.
    let message = render_award_message(&AwardNoticeContext {
        notice_id: notice_id.0.clone(),
        boq_id: boq.id.0.clone(),
        supplier_id: supplier.id.0.clone(),
        supplier_name: supplier.name.clone(),
        supplier_email: supplier.email.clone(),
        fuel_type: boq.fuel_type.as_str().to_string(),
        description: boq.description.clone(),
        quantity: boq.quantity,
        unit: boq.unit.clone(),
        price_per_unit: bid.price_per_unit,
        total_price: bid.total_price,
        currency: state.currency.clone(),
        decided_at: now.to_rfc3339(),
    })
    .map_err(|render_error| {
        error!(
            correlation_id = %ctx.correlation_id,
            boq_id = %boq.id,
            error = %render_error,
            "failed to render the award notice"
        );
        internal_error()
    })?;

    let notice = AwardNotice {
        id: notice_id,
        selection_id: selection.id.clone(),
        boq_id: boq.id.clone(),
        supplier_id: supplier.id.clone(),
        payload_hash: message.payload_hash.clone(),
        state: AwardNoticeState::Pending,
        attempts: 0,
        last_error: None,
        created_at: now,
        updated_at: now,
    };

    selection_repo.create(selection.clone(), notice.clone()).await.map_err(repository_error)?;

    record_audit(
        &state.db_pool,
        AuditEvent::new(
            &ctx,
            Some(boq.id.clone()),
            event_types::SUPPLIER_SELECTED,
            AuditOutcome::Success,
            now,
        )
        .with_metadata("selection_id", selection.id.0.clone())
        .with_metadata("bid_id", bid.id.0.clone())
        .with_metadata("supplier_id", supplier.id.0.clone()),
    )
    .await;

    info!(
        event_name = "supplier.selected",
        correlation_id = %ctx.correlation_id,
        boq_id = %boq.id,
        selection_id = %selection.id,
        bid_id = %bid.id,
        supplier_id = %supplier.id,
        "committed the procurement award"
    );

    let (notice_state, warning) =
        dispatch_award_notice(&state, &ctx, &selection, &notice.id, &message, now).await;

    Ok((
        StatusCode::CREATED,
        Json(SelectionResponse {
            selection_id: selection.id.0,
            boq_id: selection.boq_id.0,
            bid_id: selection.bid_id.0,
            supplier_id: selection.supplier_id.0,
            decided_by: selection.decided_by,
            decided_at: selection.decided_at.to_rfc3339(),
            notice_state: notice_state.as_str().to_string(),
            warning,
        }),
    ))
}

async fn get_selection(
    State(state): State<AwardsState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<SelectionRecordResponse>, (StatusCode, Json<ApiError>)> {
    require_context(&headers)?;
    let boq_id = BoqId(id);

    let boq_repo = SqlBoqRepository::new(state.db_pool.clone());
    with_read_retries(|| boq_repo.find_by_id(&boq_id))
        .await
        .map_err(repository_error)?
        .ok_or_else(|| domain_error(DomainError::not_found(ResourceKind::Boq, boq_id.0.clone())))?;

    let selection_repo = SqlSelectionRepository::new(state.db_pool.clone());
    let selection = with_read_retries(|| selection_repo.find_by_boq(&boq_id))
        .await
        .map_err(repository_error)?
        .ok_or_else(|| {
            domain_error(DomainError::not_found(ResourceKind::Selection, boq_id.0.clone()))
        })?;

    let notice = with_read_retries(|| selection_repo.find_notice_for_selection(&selection.id))
        .await
        .map_err(repository_error)?;

    Ok(Json(SelectionRecordResponse {
        selection_id: selection.id.0.clone(),
        boq_id: selection.boq_id.0.clone(),
        bid_id: selection.bid_id.0.clone(),
        supplier_id: selection.supplier_id.0.clone(),
        decided_by: selection.decided_by.clone(),
        decided_at: selection.decided_at.to_rfc3339(),
        award_notice: notice.map(|notice| AwardNoticeSummary {
            notice_id: notice.id.0,
            state: notice.state.as_str().to_string(),
            attempts: notice.attempts,
            last_error: notice.last_error,
        }),
    }))
}

// ---- Helpers ----

/// Single delivery attempt for the freshly enqueued notice. The selection
/// is already committed; a failed send marks the notice and surfaces as a
/// warning on the response, never as an error.
async fn dispatch_award_notice(
    state: &AwardsState,
    ctx: &RequestContext,
    selection: &Selection,
    notice_id: &AwardNoticeId,
    message: &AwardMessage,
    now: DateTime<Utc>,
) -> (AwardNoticeState, Option<String>) {
    let repo = SqlSelectionRepository::new(state.db_pool.clone());

    match state.notifier.deliver(message).await {
        Ok(()) => {
            if let Err(mark_error) = repo.mark_notice_sent(notice_id, now).await {
                warn!(
                    correlation_id = %ctx.correlation_id,
                    boq_id = %selection.boq_id,
                    notice_id = %notice_id,
                    error = %mark_error,
                    "delivered the award notice but could not record it"
                );
            }
            record_audit(
                &state.db_pool,
                AuditEvent::new(
                    ctx,
                    Some(selection.boq_id.clone()),
                    event_types::AWARD_NOTICE_SENT,
                    AuditOutcome::Success,
                    now,
                )
                .with_metadata("notice_id", notice_id.0.clone()),
            )
            .await;
            info!(
                event_name = "award_notice.sent",
                correlation_id = %ctx.correlation_id,
                boq_id = %selection.boq_id,
                notice_id = %notice_id,
                "delivered the award notice"
            );
            (AwardNoticeState::Sent, None)
        }
        Err(delivery_error) => {
            warn!(
                event_name = "award_notice.failed",
                correlation_id = %ctx.correlation_id,
                boq_id = %selection.boq_id,
                notice_id = %notice_id,
                error = %delivery_error,
                "award notice delivery failed; the selection stands"
            );
            if let Err(mark_error) =
                repo.mark_notice_failed(notice_id, &delivery_error.to_string(), now).await
            {
                warn!(
                    correlation_id = %ctx.correlation_id,
                    notice_id = %notice_id,
                    error = %mark_error,
                    "could not record the failed delivery"
                );
            }
            record_audit(
                &state.db_pool,
                AuditEvent::new(
                    ctx,
                    Some(selection.boq_id.clone()),
                    event_types::AWARD_NOTICE_FAILED,
                    AuditOutcome::Failed,
                    now,
                )
                .with_metadata("notice_id", notice_id.0.clone())
                .with_metadata("error", delivery_error.to_string()),
            )
            .await;
            (
                AwardNoticeState::Failed,
                Some(format!("award notice delivery failed: {delivery_error}")),
            )
        }
    }
}
