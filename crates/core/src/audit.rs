use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::boq::BoqId;
use crate::domain::context::RequestContext;

pub mod event_types {
    pub const BOQ_CREATED: &str = "boq.created";
    pub const BOQ_UPDATED: &str = "boq.updated";
    pub const BOQ_DELETED: &str = "boq.deleted";
    pub const BID_SUBMITTED: &str = "bid.submitted";
    pub const BOQ_EVALUATED: &str = "boq.evaluated";
    pub const SUPPLIER_SELECTED: &str = "supplier.selected";
    pub const AWARD_NOTICE_SENT: &str = "award_notice.sent";
    pub const AWARD_NOTICE_FAILED: &str = "award_notice.failed";
    pub const SUPPLIER_PROFILE_SAVED: &str = "supplier.profile_saved";
    pub const BUDGET_SET: &str = "budget.set";
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => Some(Self::Success),
            "rejected" => Some(Self::Rejected),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One row of the procurement audit trail. Events are written best-effort
/// after the operation they describe; a failed write is logged, never
/// surfaced to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub boq_id: Option<BoqId>,
    pub correlation_id: String,
    pub event_type: String,
    pub actor: String,
    pub actor_role: String,
    pub outcome: AuditOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        ctx: &RequestContext,
        boq_id: Option<BoqId>,
        event_type: impl Into<String>,
        outcome: AuditOutcome,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self {
            event_id: format!("AE-{}", &token[..12]),
            boq_id,
            correlation_id: ctx.correlation_id.clone(),
            event_type: event_type.into(),
            actor: ctx.actor_id.clone(),
            actor_role: ctx.role.as_str().to_string(),
            outcome,
            metadata: BTreeMap::new(),
            occurred_at,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
