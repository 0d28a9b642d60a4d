use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::boq::{Boq, BoqId};
use crate::domain::supplier::SupplierId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BidId(pub String);

impl BidId {
    pub fn generate() -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("BID-{}", &token[..12]))
    }
}

impl fmt::Display for BidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome mark applied during selection. Bids are never deleted; losing
/// bids stay on the ledger with a `Lost` mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Active,
    Won,
    Lost,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "won" => Some(Self::Won),
            "lost" => Some(Self::Lost),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub boq_id: BoqId,
    pub supplier_id: SupplierId,
    pub price_per_unit: Decimal,
    pub total_price: Decimal,
    pub qualifications: Vec<String>,
    pub quality_certificates: Vec<String>,
    pub status: BidStatus,
    pub submitted_at: DateTime<Utc>,
}

impl Bid {
    /// Builds a validated bid against `boq`. The total is always derived
    /// here; any client-supplied total is ignored upstream.
    pub fn submit(
        id: BidId,
        boq: &Boq,
        supplier_id: SupplierId,
        price_per_unit: Decimal,
        qualifications: Vec<String>,
        quality_certificates: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if price_per_unit <= Decimal::ZERO {
            return Err(DomainError::validation(
                "price_per_unit",
                "must be greater than zero",
            ));
        }

        Ok(Self {
            id,
            boq_id: boq.id.clone(),
            supplier_id,
            price_per_unit,
            total_price: Self::total_for(price_per_unit, boq.quantity),
            qualifications: normalize_terms(qualifications),
            quality_certificates: normalize_terms(quality_certificates),
            status: BidStatus::Active,
            submitted_at: now,
        })
    }

    /// Canonical derived total: unit price times requested quantity.
    pub fn total_for(price_per_unit: Decimal, quantity: Decimal) -> Decimal {
        price_per_unit * quantity
    }
}

fn normalize_terms(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}
