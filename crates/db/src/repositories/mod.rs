use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use fuelbid_core::audit::AuditEvent;
use fuelbid_core::domain::bid::Bid;
use fuelbid_core::domain::boq::{Boq, BoqId, BoqStatus, FuelType};
use fuelbid_core::domain::budget::ProcurementBudget;
use fuelbid_core::domain::selection::{AwardNotice, AwardNoticeId, Selection, SelectionId};
use fuelbid_core::domain::supplier::{Supplier, SupplierId};
use fuelbid_core::errors::DomainError;

pub mod audit;
pub mod bid;
pub mod boq;
pub mod budget;
pub mod selection;
pub mod supplier;

pub use audit::SqlAuditRepository;
pub use bid::{BidOverview, SqlBidRepository};
pub use boq::SqlBoqRepository;
pub use budget::SqlBudgetRepository;
pub use selection::SqlSelectionRepository;
pub use supplier::SqlSupplierRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[async_trait]
pub trait BoqRepository: Send + Sync {
    async fn create(&self, boq: Boq) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &BoqId) -> Result<Option<Boq>, RepositoryError>;

    async fn list(
        &self,
        fuel_type: Option<FuelType>,
        status: Option<BoqStatus>,
    ) -> Result<Vec<Boq>, RepositoryError>;

    /// Persists an updated BOQ and recomputes stored bid totals against its
    /// quantity in the same transaction. When `economic_change` is set, the
    /// write is refused with a conflict if a selection already exists.
    async fn update(&self, boq: &Boq, economic_change: bool) -> Result<(), RepositoryError>;

    /// Refused with a conflict while any bid references the BOQ.
    async fn delete(&self, id: &BoqId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait BidRepository: Send + Sync {
    /// Inserts the bid, re-checking inside the transaction that no
    /// selection has closed the window and that the supplier has not
    /// already bid on this BOQ.
    async fn submit(&self, bid: Bid) -> Result<(), RepositoryError>;

    async fn find_active_for_supplier(
        &self,
        boq_id: &BoqId,
        supplier_id: &SupplierId,
    ) -> Result<Option<Bid>, RepositoryError>;

    async fn list_for_boq(&self, boq_id: &BoqId) -> Result<Vec<Bid>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<BidOverview>, RepositoryError>;
}

#[async_trait]
pub trait SupplierRepository: Send + Sync {
    async fn upsert(&self, supplier: Supplier) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &SupplierId) -> Result<Option<Supplier>, RepositoryError>;

    async fn list(&self) -> Result<Vec<Supplier>, RepositoryError>;
}

#[async_trait]
pub trait SelectionRepository: Send + Sync {
    /// Commits the selection atomically: inserts the selection row, marks
    /// the winning bid `won` and every other bid `lost`, moves the BOQ to
    /// `selected`, and enqueues the award notice. The UNIQUE(boq_id)
    /// constraint admits exactly one selection under concurrent calls.
    async fn create(
        &self,
        selection: Selection,
        notice: AwardNotice,
    ) -> Result<(), RepositoryError>;

    async fn find_by_boq(&self, boq_id: &BoqId) -> Result<Option<Selection>, RepositoryError>;
}

#[async_trait]
pub trait AwardNoticeRepository: Send + Sync {
    async fn find_notice_for_selection(
        &self,
        selection_id: &SelectionId,
    ) -> Result<Option<AwardNotice>, RepositoryError>;

    /// Claims a pending notice as delivered. Returns false when the notice
    /// was already claimed, which is what bounds delivery to one attempt.
    async fn mark_notice_sent(
        &self,
        id: &AwardNoticeId,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    async fn mark_notice_failed(
        &self,
        id: &AwardNoticeId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait BudgetRepository: Send + Sync {
    async fn set(&self, budget: ProcurementBudget) -> Result<(), RepositoryError>;

    async fn find_for_fuel_type(
        &self,
        fuel_type: FuelType,
    ) -> Result<Option<ProcurementBudget>, RepositoryError>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), RepositoryError>;

    async fn list_for_boq(&self, boq_id: &BoqId) -> Result<Vec<AuditEvent>, RepositoryError>;
}

pub(crate) fn parse_decimal(column: &str, value: String) -> Result<Decimal, RepositoryError> {
    value.parse::<Decimal>().map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_date(column: &str, value: String) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|error| {
        RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

pub(crate) fn parse_string_list(
    column: &str,
    value: String,
) -> Result<Vec<String>, RepositoryError> {
    serde_json::from_str(&value).map_err(|error| {
        RepositoryError::Decode(format!("invalid JSON list in `{column}`: {error}"))
    })
}

pub(crate) fn encode_string_list(values: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(values).map_err(|error| RepositoryError::Decode(error.to_string()))
}

pub(crate) fn unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}
