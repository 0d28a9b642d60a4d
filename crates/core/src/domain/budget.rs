use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::boq::FuelType;
use crate::errors::DomainError;

/// Buyer-set price ceiling for one fuel type, used as the fallback
/// evaluation ceiling when a request does not carry an explicit one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcurementBudget {
    pub fuel_type: FuelType,
    pub max_price_per_unit: Decimal,
    pub set_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcurementBudget {
    pub fn set(
        fuel_type: FuelType,
        max_price_per_unit: Decimal,
        set_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if max_price_per_unit <= Decimal::ZERO {
            return Err(DomainError::validation(
                "max_price_per_unit",
                "must be greater than zero",
            ));
        }

        Ok(Self {
            fuel_type,
            max_price_per_unit,
            set_by: set_by.into(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::boq::FuelType;
    use crate::errors::DomainError;

    use super::ProcurementBudget;

    #[test]
    fn set_accepts_positive_ceiling() {
        let budget =
            ProcurementBudget::set(FuelType::Diesel, Decimal::new(1300, 0), "U-1", Utc::now())
                .expect("valid ceiling");
        assert_eq!(budget.fuel_type, FuelType::Diesel);
        assert_eq!(budget.max_price_per_unit, Decimal::new(1300, 0));
    }

    #[test]
    fn set_rejects_non_positive_ceiling() {
        let error =
            ProcurementBudget::set(FuelType::Diesel, Decimal::ZERO, "U-1", Utc::now())
                .expect_err("zero ceiling should fail");
        assert!(matches!(error, DomainError::Validation { field: "max_price_per_unit", .. }));
    }
}
