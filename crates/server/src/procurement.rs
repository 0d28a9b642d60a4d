//! BOQ registry and budget routes.
//!
//! - `POST /api/v1/boq` registers a fuel requirement
//! - `GET /api/v1/boq` lists entries, filterable by fuel type and status
//! - `GET /api/v1/boq/{id}` fetches one entry
//! - `PUT /api/v1/boq/{id}` replaces an entry (economic fields lock after selection)
//! - `DELETE /api/v1/boq/{id}` removes an entry with an empty bid ledger
//! - `PUT /api/v1/procurement/budget` sets the price ceiling for a fuel type
//! - `GET /api/v1/procurement/budget` reads the ceiling for a fuel type

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use fuelbid_core::audit::{event_types, AuditEvent, AuditOutcome};
use fuelbid_core::config::ProcurementConfig;
use fuelbid_core::domain::boq::{Boq, BoqDraft, BoqId, BoqStatus, FuelType};
use fuelbid_core::errors::{DomainError, ResourceKind};
use fuelbid_core::ProcurementBudget;
use fuelbid_db::repositories::{
    BoqRepository, BudgetRepository, SqlBoqRepository, SqlBudgetRepository,
};
use fuelbid_db::retry::with_read_retries;
use fuelbid_db::DbPool;

use crate::context::{domain_error, record_audit, repository_error, require_context, ApiError};

#[derive(Clone)]
pub struct ProcurementState {
    pub db_pool: DbPool,
    pub procurement: ProcurementConfig,
}

pub fn router(db_pool: DbPool, procurement: ProcurementConfig) -> Router {
    let state = ProcurementState { db_pool, procurement };

    Router::new()
        .route("/api/v1/boq", get(list_boqs).post(create_boq))
        .route("/api/v1/boq/{id}", get(get_boq).put(update_boq).delete(delete_boq))
        .route("/api/v1/procurement/budget", get(get_budget).put(set_budget))
        .with_state(state)
}

// ---- Request / Response types ----

/// Body for creating or replacing a BOQ entry. `unit` falls back to the
/// configured default; totals are derived server-side and never accepted
/// from the wire.
#[derive(Debug, Deserialize)]
pub struct BoqPayload {
    pub fuel_type: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub estimated_price_per_unit: Decimal,
    pub deadline: String,
}

#[derive(Debug, Serialize)]
pub struct BoqResponse {
    pub id: String,
    pub fuel_type: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub estimated_price_per_unit: Decimal,
    pub deadline: String,
    pub branch_id: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BoqListQuery {
    pub fuel_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetBudgetRequest {
    pub fuel_type: String,
    pub max_price_per_unit: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct BudgetQuery {
    pub fuel_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    pub fuel_type: String,
    pub max_price_per_unit: Decimal,
    pub currency: String,
    pub set_by: String,
    pub updated_at: String,
}

// ---- Handlers ----

async fn create_boq(
    State(state): State<ProcurementState>,
    headers: HeaderMap,
    Json(payload): Json<BoqPayload>,
) -> Result<(StatusCode, Json<BoqResponse>), (StatusCode, Json<ApiError>)> {
    let ctx = require_context(&headers)?;
    let now = Utc::now();
    let draft = draft_from_payload(&payload, &state.procurement)?;

    let boq = Boq::create(BoqId::generate(), draft, ctx.branch_id.clone(), now.date_naive(), now)
        .map_err(domain_error)?;

    let repo = SqlBoqRepository::new(state.db_pool.clone());
    repo.create(boq.clone()).await.map_err(repository_error)?;

    record_audit(
        &state.db_pool,
        AuditEvent::new(
            &ctx,
            Some(boq.id.clone()),
            event_types::BOQ_CREATED,
            AuditOutcome::Success,
            now,
        )
        .with_metadata("fuel_type", boq.fuel_type.as_str()),
    )
    .await;

    info!(
        event_name = "boq.created",
        correlation_id = %ctx.correlation_id,
        boq_id = %boq.id,
        fuel_type = %boq.fuel_type,
        "registered a new BOQ entry"
    );

    Ok((StatusCode::CREATED, Json(boq_response(&boq))))
}

async fn get_boq(
    State(state): State<ProcurementState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BoqResponse>, (StatusCode, Json<ApiError>)> {
    require_context(&headers)?;
    let repo = SqlBoqRepository::new(state.db_pool.clone());
    let boq_id = BoqId(id);

    let boq = with_read_retries(|| repo.find_by_id(&boq_id))
        .await
        .map_err(repository_error)?
        .ok_or_else(|| domain_error(DomainError::not_found(ResourceKind::Boq, boq_id.0.clone())))?;

    Ok(Json(boq_response(&boq)))
}

async fn list_boqs(
    State(state): State<ProcurementState>,
    headers: HeaderMap,
    Query(query): Query<BoqListQuery>,
) -> Result<Json<Vec<BoqResponse>>, (StatusCode, Json<ApiError>)> {
    require_context(&headers)?;
    let fuel_type = query.fuel_type.as_deref().map(parse_fuel_type).transpose()?;
    let status = query.status.as_deref().map(parse_boq_status).transpose()?;

    let repo = SqlBoqRepository::new(state.db_pool.clone());
    let boqs =
        with_read_retries(|| repo.list(fuel_type, status)).await.map_err(repository_error)?;

    Ok(Json(boqs.iter().map(boq_response).collect()))
}

async fn update_boq(
    State(state): State<ProcurementState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<BoqPayload>,
) -> Result<Json<BoqResponse>, (StatusCode, Json<ApiError>)> {
    let ctx = require_context(&headers)?;
    let now = Utc::now();
    let draft = draft_from_payload(&payload, &state.procurement)?;

    let repo = SqlBoqRepository::new(state.db_pool.clone());
    let boq_id = BoqId(id);
    let mut boq = repo
        .find_by_id(&boq_id)
        .await
        .map_err(repository_error)?
        .ok_or_else(|| domain_error(DomainError::not_found(ResourceKind::Boq, boq_id.0.clone())))?;

    // Detected against the stored entry before the draft is applied; the
    // repository refuses economic changes once a selection exists.
    let economic_change = boq.update_touches_locked_fields(&draft);
    boq.apply_update(draft, now.date_naive(), now).map_err(domain_error)?;
    repo.update(&boq, economic_change).await.map_err(repository_error)?;

    record_audit(
        &state.db_pool,
        AuditEvent::new(
            &ctx,
            Some(boq.id.clone()),
            event_types::BOQ_UPDATED,
            AuditOutcome::Success,
            now,
        )
        .with_metadata("economic_change", economic_change.to_string()),
    )
    .await;

    info!(
        event_name = "boq.updated",
        correlation_id = %ctx.correlation_id,
        boq_id = %boq.id,
        economic_change,
        "replaced a BOQ entry"
    );

    Ok(Json(boq_response(&boq)))
}

async fn delete_boq(
    State(state): State<ProcurementState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let ctx = require_context(&headers)?;
    let repo = SqlBoqRepository::new(state.db_pool.clone());
    let boq_id = BoqId(id);

    repo.delete(&boq_id).await.map_err(repository_error)?;

    record_audit(
        &state.db_pool,
        AuditEvent::new(
            &ctx,
            Some(boq_id.clone()),
            event_types::BOQ_DELETED,
            AuditOutcome::Success,
            Utc::now(),
        ),
    )
    .await;

    info!(
        event_name = "boq.deleted",
        correlation_id = %ctx.correlation_id,
        boq_id = %boq_id,
        "removed a BOQ entry with an empty bid ledger"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn set_budget(
    State(state): State<ProcurementState>,
    headers: HeaderMap,
    Json(payload): Json<SetBudgetRequest>,
) -> Result<Json<BudgetResponse>, (StatusCode, Json<ApiError>)> {
    let ctx = require_context(&headers)?;
    let now = Utc::now();
    let fuel_type = parse_fuel_type(&payload.fuel_type)?;

    let budget =
        ProcurementBudget::set(fuel_type, payload.max_price_per_unit, ctx.actor_id.clone(), now)
            .map_err(domain_error)?;

    let repo = SqlBudgetRepository::new(state.db_pool.clone());
    repo.set(budget.clone()).await.map_err(repository_error)?;

    record_audit(
        &state.db_pool,
        AuditEvent::new(&ctx, None, event_types::BUDGET_SET, AuditOutcome::Success, now)
            .with_metadata("fuel_type", fuel_type.as_str())
            .with_metadata("max_price_per_unit", budget.max_price_per_unit.to_string()),
    )
    .await;

    info!(
        event_name = "budget.set",
        correlation_id = %ctx.correlation_id,
        boq_id = "unknown",
        fuel_type = %fuel_type,
        "set the procurement price ceiling"
    );

    Ok(Json(budget_response(&budget, &state.procurement)))
}

async fn get_budget(
    State(state): State<ProcurementState>,
    headers: HeaderMap,
    Query(query): Query<BudgetQuery>,
) -> Result<Json<BudgetResponse>, (StatusCode, Json<ApiError>)> {
    require_context(&headers)?;
    let raw = query.fuel_type.as_deref().ok_or_else(|| {
        domain_error(DomainError::validation("fuel_type", "query parameter is required"))
    })?;
    let fuel_type = parse_fuel_type(raw)?;

    let repo = SqlBudgetRepository::new(state.db_pool.clone());
    let budget = with_read_retries(|| repo.find_for_fuel_type(fuel_type))
        .await
        .map_err(repository_error)?
        .ok_or_else(|| {
            domain_error(DomainError::not_found(ResourceKind::Budget, fuel_type.as_str()))
        })?;

    Ok(Json(budget_response(&budget, &state.procurement)))
}

// ---- Helpers ----

fn draft_from_payload(
    payload: &BoqPayload,
    procurement: &ProcurementConfig,
) -> Result<BoqDraft, (StatusCode, Json<ApiError>)> {
    let fuel_type = parse_fuel_type(&payload.fuel_type)?;
    let deadline = NaiveDate::parse_from_str(payload.deadline.trim(), "%Y-%m-%d").map_err(|_| {
        domain_error(DomainError::validation("deadline", "must be a YYYY-MM-DD calendar date"))
    })?;
    let unit = payload
        .unit
        .clone()
        .filter(|unit| !unit.trim().is_empty())
        .unwrap_or_else(|| procurement.default_unit.clone());

    Ok(BoqDraft {
        fuel_type,
        description: payload.description.clone(),
        quantity: payload.quantity,
        unit,
        estimated_price_per_unit: payload.estimated_price_per_unit,
        deadline,
    })
}

fn parse_fuel_type(value: &str) -> Result<FuelType, (StatusCode, Json<ApiError>)> {
    FuelType::parse(value).ok_or_else(|| {
        domain_error(DomainError::validation("fuel_type", "must be one of petrol|diesel|gasoline"))
    })
}

fn parse_boq_status(value: &str) -> Result<BoqStatus, (StatusCode, Json<ApiError>)> {
    BoqStatus::parse(value).ok_or_else(|| {
        domain_error(DomainError::validation("status", "must be one of open|selected"))
    })
}

fn boq_response(boq: &Boq) -> BoqResponse {
    BoqResponse {
        id: boq.id.0.clone(),
        fuel_type: boq.fuel_type.as_str().to_string(),
        description: boq.description.clone(),
        quantity: boq.quantity,
        unit: boq.unit.clone(),
        estimated_price_per_unit: boq.estimated_price_per_unit,
        deadline: boq.deadline.format("%Y-%m-%d").to_string(),
        branch_id: boq.branch_id.clone(),
        status: boq.status.as_str().to_string(),
        created_at: boq.created_at.to_rfc3339(),
        updated_at: boq.updated_at.to_rfc3339(),
    }
}

fn budget_response(budget: &ProcurementBudget, procurement: &ProcurementConfig) -> BudgetResponse {
    BudgetResponse {
        fuel_type: budget.fuel_type.as_str().to_string(),
        max_price_per_unit: budget.max_price_per_unit,
        currency: procurement.currency.clone(),
        set_by: budget.set_by.clone(),
        updated_at: budget.updated_at.to_rfc3339(),
    }
}
