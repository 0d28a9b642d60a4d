use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SupplierId(pub String);

impl fmt::Display for SupplierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Profile a supplier registers before bidding. Identity comes from the
/// surrounding application; this record carries the procurement-facing
/// details that end up in evaluation snapshots and award notices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub email: String,
    pub contact_details: Option<String>,
    pub certification: Option<String>,
    pub performance_history: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierProfile {
    pub name: String,
    pub email: String,
    pub contact_details: Option<String>,
    pub certification: Option<String>,
    pub performance_history: Option<String>,
}

/// The subset of supplier data embedded in evaluation responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierSnapshot {
    pub id: SupplierId,
    pub name: String,
    pub email: String,
    pub contact_details: Option<String>,
    pub certification: Option<String>,
}

impl Supplier {
    pub fn register(
        id: SupplierId,
        profile: SupplierProfile,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_profile(&profile)?;

        Ok(Self {
            id,
            name: profile.name.trim().to_string(),
            email: profile.email.trim().to_string(),
            contact_details: normalize_optional(profile.contact_details),
            certification: normalize_optional(profile.certification),
            performance_history: normalize_optional(profile.performance_history),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_profile(
        &mut self,
        profile: SupplierProfile,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        validate_profile(&profile)?;

        self.name = profile.name.trim().to_string();
        self.email = profile.email.trim().to_string();
        self.contact_details = normalize_optional(profile.contact_details);
        self.certification = normalize_optional(profile.certification);
        self.performance_history = normalize_optional(profile.performance_history);
        self.updated_at = now;
        Ok(())
    }

    pub fn snapshot(&self) -> SupplierSnapshot {
        SupplierSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            contact_details: self.contact_details.clone(),
            certification: self.certification.clone(),
        }
    }
}

fn validate_profile(profile: &SupplierProfile) -> Result<(), DomainError> {
    if profile.name.trim().is_empty() {
        return Err(DomainError::validation("name", "must not be empty"));
    }
    let email = profile.email.trim();
    if email.is_empty() {
        return Err(DomainError::validation("email", "must not be empty"));
    }
    if !email.contains('@') {
        return Err(DomainError::validation("email", "must be a valid email address"));
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::errors::DomainError;

    use super::{Supplier, SupplierId, SupplierProfile};

    fn profile() -> SupplierProfile {
        SupplierProfile {
            name: "Kigali Fuels Ltd".to_string(),
            email: "bids@kigalifuels.example".to_string(),
            contact_details: Some("+250 788 000 111".to_string()),
            certification: Some("ISO 9001".to_string()),
            performance_history: None,
        }
    }

    #[test]
    fn register_accepts_valid_profile() {
        let supplier =
            Supplier::register(SupplierId("SUP-1".to_string()), profile(), Utc::now())
                .expect("valid profile");
        assert_eq!(supplier.name, "Kigali Fuels Ltd");
        assert_eq!(supplier.certification.as_deref(), Some("ISO 9001"));
    }

    #[test]
    fn register_rejects_blank_name() {
        let mut bad = profile();
        bad.name = "  ".to_string();

        let error = Supplier::register(SupplierId("SUP-1".to_string()), bad, Utc::now())
            .expect_err("blank name should fail");
        assert!(matches!(error, DomainError::Validation { field: "name", .. }));
    }

    #[test]
    fn register_rejects_malformed_email() {
        let mut bad = profile();
        bad.email = "not-an-email".to_string();

        let error = Supplier::register(SupplierId("SUP-1".to_string()), bad, Utc::now())
            .expect_err("malformed email should fail");
        assert!(matches!(error, DomainError::Validation { field: "email", .. }));
    }

    #[test]
    fn snapshot_carries_contact_fields_only() {
        let supplier =
            Supplier::register(SupplierId("SUP-1".to_string()), profile(), Utc::now())
                .expect("valid profile");
        let snapshot = supplier.snapshot();

        assert_eq!(snapshot.id, supplier.id);
        assert_eq!(snapshot.email, supplier.email);
        assert_eq!(snapshot.contact_details.as_deref(), Some("+250 788 000 111"));
    }

    #[test]
    fn blank_optional_fields_collapse_to_none() {
        let mut sparse = profile();
        sparse.contact_details = Some("   ".to_string());

        let supplier =
            Supplier::register(SupplierId("SUP-1".to_string()), sparse, Utc::now())
                .expect("valid profile");
        assert!(supplier.contact_details.is_none());
    }
}
