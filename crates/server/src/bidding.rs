//! Bid ledger and supplier profile routes.
//!
//! - `POST /api/v1/bids/submit` records a bid for the authenticated supplier
//! - `GET /api/v1/bids` lists every bid with supplier and BOQ context
//! - `GET /api/v1/boq/{id}/bids` lists the ledger for one BOQ
//! - `GET /api/v1/suppliers` lists registered suppliers
//! - `GET /api/v1/suppliers/me` fetches the calling supplier's profile
//! - `PUT /api/v1/suppliers/me` registers or replaces that profile

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use fuelbid_core::audit::{event_types, AuditEvent, AuditOutcome};
use fuelbid_core::domain::bid::{Bid, BidId};
use fuelbid_core::domain::boq::BoqId;
use fuelbid_core::domain::supplier::{Supplier, SupplierProfile};
use fuelbid_core::errors::{DomainError, ResourceKind};
use fuelbid_db::repositories::{
    BidOverview, BidRepository, BoqRepository, SqlBidRepository, SqlBoqRepository,
    SqlSupplierRepository, SupplierRepository,
};
use fuelbid_db::retry::with_read_retries;
use fuelbid_db::DbPool;

use crate::context::{domain_error, record_audit, repository_error, require_context, ApiError};

#[derive(Clone)]
pub struct BiddingState {
    pub db_pool: DbPool,
}

pub fn router(db_pool: DbPool) -> Router {
    let state = BiddingState { db_pool };

    Router::new()
        .route("/api/v1/bids/submit", post(submit_bid))
        .route("/api/v1/bids", get(list_all_bids))
        .route("/api/v1/boq/{id}/bids", get(list_bids_for_boq))
        .route("/api/v1/suppliers", get(list_suppliers))
        .route("/api/v1/suppliers/me", get(get_my_profile).put(save_my_profile))
        .with_state(state)
}

// ---- Request / Response types ----

/// Body for submitting a bid. The supplier identity comes from the
/// authenticated actor headers, and the total is derived from the BOQ
/// quantity; neither is accepted from the wire.
#[derive(Debug, Deserialize)]
pub struct SubmitBidRequest {
    pub boq_id: String,
    pub bid_price_per_unit: Decimal,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub quality_certificates: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BidResponse {
    pub id: String,
    pub boq_id: String,
    pub supplier_id: String,
    pub price_per_unit: Decimal,
    pub total_price: Decimal,
    pub qualifications: Vec<String>,
    pub quality_certificates: Vec<String>,
    pub status: String,
    pub submitted_at: String,
}

#[derive(Debug, Serialize)]
pub struct BidOverviewResponse {
    pub bid: BidResponse,
    pub supplier_name: String,
    pub supplier_email: String,
    pub fuel_type: String,
    pub branch_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SupplierProfilePayload {
    pub name: String,
    pub email: String,
    pub contact_details: Option<String>,
    pub certification: Option<String>,
    pub performance_history: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SupplierResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub contact_details: Option<String>,
    pub certification: Option<String>,
    pub performance_history: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// ---- Handlers ----

async fn submit_bid(
    State(state): State<BiddingState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitBidRequest>,
) -> Result<(StatusCode, Json<BidResponse>), (StatusCode, Json<ApiError>)> {
    let ctx = require_context(&headers)?;
    let now = Utc::now();
    let supplier_id = ctx.supplier_id();

    let boq_repo = SqlBoqRepository::new(state.db_pool.clone());
    let boq_id = BoqId(payload.boq_id);
    let boq = boq_repo
        .find_by_id(&boq_id)
        .await
        .map_err(repository_error)?
        .ok_or_else(|| domain_error(DomainError::not_found(ResourceKind::Boq, boq_id.0.clone())))?;

    let supplier_repo = SqlSupplierRepository::new(state.db_pool.clone());
    supplier_repo.find_by_id(&supplier_id).await.map_err(repository_error)?.ok_or_else(|| {
        domain_error(DomainError::not_found(ResourceKind::Supplier, supplier_id.0.clone()))
    })?;

    let bid = Bid::submit(
        BidId::generate(),
        &boq,
        supplier_id,
        payload.bid_price_per_unit,
        payload.qualifications,
        payload.quality_certificates,
        now,
    )
    .map_err(domain_error)?;

    let bid_repo = SqlBidRepository::new(state.db_pool.clone());
    bid_repo.submit(bid.clone()).await.map_err(repository_error)?;

    record_audit(
        &state.db_pool,
        AuditEvent::new(
            &ctx,
            Some(boq.id.clone()),
            event_types::BID_SUBMITTED,
            AuditOutcome::Success,
            now,
        )
        .with_metadata("bid_id", bid.id.0.clone())
        .with_metadata("supplier_id", bid.supplier_id.0.clone()),
    )
    .await;

    info!(
        event_name = "bid.submitted",
        correlation_id = %ctx.correlation_id,
        boq_id = %boq.id,
        bid_id = %bid.id,
        supplier_id = %bid.supplier_id,
        "recorded a bid on the ledger"
    );

    Ok((StatusCode::CREATED, Json(bid_response(&bid))))
}

async fn list_bids_for_boq(
    State(state): State<BiddingState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<BidResponse>>, (StatusCode, Json<ApiError>)> {
    require_context(&headers)?;
    let boq_id = BoqId(id);

    let boq_repo = SqlBoqRepository::new(state.db_pool.clone());
    with_read_retries(|| boq_repo.find_by_id(&boq_id))
        .await
        .map_err(repository_error)?
        .ok_or_else(|| domain_error(DomainError::not_found(ResourceKind::Boq, boq_id.0.clone())))?;

    let bid_repo = SqlBidRepository::new(state.db_pool.clone());
    let bids =
        with_read_retries(|| bid_repo.list_for_boq(&boq_id)).await.map_err(repository_error)?;

    Ok(Json(bids.iter().map(bid_response).collect()))
}

async fn list_all_bids(
    State(state): State<BiddingState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BidOverviewResponse>>, (StatusCode, Json<ApiError>)> {
    require_context(&headers)?;
    let repo = SqlBidRepository::new(state.db_pool.clone());
    let overviews = with_read_retries(|| repo.list_all()).await.map_err(repository_error)?;

    Ok(Json(overviews.iter().map(overview_response).collect()))
}

async fn get_my_profile(
    State(state): State<BiddingState>,
    headers: HeaderMap,
) -> Result<Json<SupplierResponse>, (StatusCode, Json<ApiError>)> {
    let ctx = require_context(&headers)?;
    let supplier_id = ctx.supplier_id();

    let repo = SqlSupplierRepository::new(state.db_pool.clone());
    let supplier = with_read_retries(|| repo.find_by_id(&supplier_id))
        .await
        .map_err(repository_error)?
        .ok_or_else(|| {
            domain_error(DomainError::not_found(ResourceKind::Supplier, supplier_id.0.clone()))
        })?;

    Ok(Json(supplier_response(&supplier)))
}

async fn save_my_profile(
    State(state): State<BiddingState>,
    headers: HeaderMap,
    Json(payload): Json<SupplierProfilePayload>,
) -> Result<Json<SupplierResponse>, (StatusCode, Json<ApiError>)> {
    let ctx = require_context(&headers)?;
    let now = Utc::now();
    let supplier_id = ctx.supplier_id();
    let profile = SupplierProfile {
        name: payload.name,
        email: payload.email,
        contact_details: payload.contact_details,
        certification: payload.certification,
        performance_history: payload.performance_history,
    };

    let repo = SqlSupplierRepository::new(state.db_pool.clone());
    let supplier = match repo.find_by_id(&supplier_id).await.map_err(repository_error)? {
        Some(mut existing) => {
            existing.apply_profile(profile, now).map_err(domain_error)?;
            existing
        }
        None => Supplier::register(supplier_id, profile, now).map_err(domain_error)?,
    };
    repo.upsert(supplier.clone()).await.map_err(repository_error)?;

    record_audit(
        &state.db_pool,
        AuditEvent::new(&ctx, None, event_types::SUPPLIER_PROFILE_SAVED, AuditOutcome::Success, now)
            .with_metadata("supplier_id", supplier.id.0.clone()),
    )
    .await;

    info!(
        event_name = "supplier.profile_saved",
        correlation_id = %ctx.correlation_id,
        boq_id = "unknown",
        supplier_id = %supplier.id,
        "saved a supplier profile"
    );

    Ok(Json(supplier_response(&supplier)))
}

async fn list_suppliers(
    State(state): State<BiddingState>,
    headers: HeaderMap,
) -> Result<Json<Vec<SupplierResponse>>, (StatusCode, Json<ApiError>)> {
    require_context(&headers)?;
    let repo = SqlSupplierRepository::new(state.db_pool.clone());
    let suppliers = with_read_retries(|| repo.list()).await.map_err(repository_error)?;

    Ok(Json(suppliers.iter().map(supplier_response).collect()))
}

// ---- Helpers ----

pub(crate) fn bid_response(bid: &Bid) -> BidResponse {
    BidResponse {
        id: bid.id.0.clone(),
        boq_id: bid.boq_id.0.clone(),
        supplier_id: bid.supplier_id.0.clone(),
        price_per_unit: bid.price_per_unit,
        total_price: bid.total_price,
        qualifications: bid.qualifications.clone(),
        quality_certificates: bid.quality_certificates.clone(),
        status: bid.status.as_str().to_string(),
        submitted_at: bid.submitted_at.to_rfc3339(),
    }
}

fn overview_response(overview: &BidOverview) -> BidOverviewResponse {
    BidOverviewResponse {
        bid: bid_response(&overview.bid),
        supplier_name: overview.supplier_name.clone(),
        supplier_email: overview.supplier_email.clone(),
        fuel_type: overview.fuel_type.as_str().to_string(),
        branch_id: overview.branch_id.clone(),
    }
}

fn supplier_response(supplier: &Supplier) -> SupplierResponse {
    SupplierResponse {
        id: supplier.id.0.clone(),
        name: supplier.name.clone(),
        email: supplier.email.clone(),
        contact_details: supplier.contact_details.clone(),
        certification: supplier.certification.clone(),
        performance_history: supplier.performance_history.clone(),
        created_at: supplier.created_at.to_rfc3339(),
        updated_at: supplier.updated_at.to_rfc3339(),
    }
}
