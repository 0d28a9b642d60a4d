use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoqId(pub String);

impl BoqId {
    /// Mints an identifier of the form `BOQ-1f9a30c2b4d7`.
    pub fn generate() -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("BOQ-{}", &token[..12]))
    }
}

impl fmt::Display for BoqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Petrol,
    Diesel,
    Gasoline,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Petrol => "petrol",
            Self::Diesel => "diesel",
            Self::Gasoline => "gasoline",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "petrol" => Some(Self::Petrol),
            "diesel" => Some(Self::Diesel),
            "gasoline" => Some(Self::Gasoline),
            _ => None,
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoqStatus {
    Open,
    Selected,
}

impl BoqStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Selected => "selected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Self::Open),
            "selected" => Some(Self::Selected),
            _ => None,
        }
    }
}

/// Fields a buyer supplies when creating or replacing a BOQ entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoqDraft {
    pub fuel_type: FuelType,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub estimated_price_per_unit: Decimal,
    pub deadline: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Boq {
    pub id: BoqId,
    pub fuel_type: FuelType,
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub estimated_price_per_unit: Decimal,
    pub deadline: NaiveDate,
    pub branch_id: Option<String>,
    pub status: BoqStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Boq {
    /// Builds a validated BOQ from buyer input. The deadline is a calendar
    /// date and must not be in the past relative to `today`.
    pub fn create(
        id: BoqId,
        draft: BoqDraft,
        branch_id: Option<String>,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_draft(&draft)?;
        if draft.deadline < today {
            return Err(DomainError::validation("deadline", "must not be in the past"));
        }

        Ok(Self {
            id,
            fuel_type: draft.fuel_type,
            description: draft.description.trim().to_string(),
            quantity: draft.quantity,
            unit: draft.unit.trim().to_string(),
            estimated_price_per_unit: draft.estimated_price_per_unit,
            deadline: draft.deadline,
            branch_id,
            status: BoqStatus::Open,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a full replacement draft. An unchanged deadline is accepted
    /// even when it has already passed; a new deadline must not be in the
    /// past.
    pub fn apply_update(
        &mut self,
        draft: BoqDraft,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        validate_draft(&draft)?;
        if draft.deadline != self.deadline && draft.deadline < today {
            return Err(DomainError::validation("deadline", "must not be in the past"));
        }

        self.fuel_type = draft.fuel_type;
        self.description = draft.description.trim().to_string();
        self.quantity = draft.quantity;
        self.unit = draft.unit.trim().to_string();
        self.estimated_price_per_unit = draft.estimated_price_per_unit;
        self.deadline = draft.deadline;
        self.updated_at = now;
        Ok(())
    }

    /// True when the draft would change a field that is locked once a
    /// supplier has been selected.
    pub fn update_touches_locked_fields(&self, draft: &BoqDraft) -> bool {
        draft.quantity != self.quantity
            || draft.estimated_price_per_unit != self.estimated_price_per_unit
    }

    pub fn can_transition_to(&self, next: BoqStatus) -> bool {
        matches!((&self.status, next), (BoqStatus::Open, BoqStatus::Selected))
    }

    pub fn transition_to(&mut self, next: BoqStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidBoqTransition { from: self.status, to: next })
    }
}

fn validate_draft(draft: &BoqDraft) -> Result<(), DomainError> {
    if draft.description.trim().is_empty() {
        return Err(DomainError::validation("description", "must not be empty"));
    }
    if draft.unit.trim().is_empty() {
        return Err(DomainError::validation("unit", "must not be empty"));
    }
    if draft.quantity <= Decimal::ZERO {
        return Err(DomainError::validation("quantity", "must be greater than zero"));
    }
    if draft.estimated_price_per_unit <= Decimal::ZERO {
        return Err(DomainError::validation(
            "estimated_price_per_unit",
            "must be greater than zero",
        ));
    }
    Ok(())
}
