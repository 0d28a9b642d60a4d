use serde::{Deserialize, Serialize};

use crate::domain::supplier::SupplierId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Supplier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Supplier => "supplier",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "supplier" => Some(Self::Supplier),
            _ => None,
        }
    }
}

/// Identity asserted by the surrounding application, carried explicitly
/// into every operation instead of being read from ambient state. Bid
/// submission binds the supplier id from here, never from request bodies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub actor_id: String,
    pub role: Role,
    pub branch_id: Option<String>,
    pub correlation_id: String,
}

impl RequestContext {
    pub fn supplier_id(&self) -> SupplierId {
        SupplierId(self.actor_id.clone())
    }
}
