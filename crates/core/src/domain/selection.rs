use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::bid::BidId;
use crate::domain::boq::BoqId;
use crate::domain::supplier::SupplierId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionId(pub String);

impl SelectionId {
    pub fn generate() -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("SEL-{}", &token[..12]))
    }
}

impl fmt::Display for SelectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AwardNoticeId(pub String);

impl AwardNoticeId {
    pub fn generate() -> Self {
        let token = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("AN-{}", &token[..12]))
    }
}

impl fmt::Display for AwardNoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The irrevocable record of which bid won a BOQ's procurement round.
/// At most one selection exists per BOQ.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub id: SelectionId,
    pub boq_id: BoqId,
    pub bid_id: BidId,
    pub supplier_id: SupplierId,
    pub decided_by: String,
    pub decided_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardNoticeState {
    Pending,
    Sent,
    Failed,
}

impl AwardNoticeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Ledger row backing the one-time notification to the winning supplier.
/// Created in the same transaction as the selection; a dispatcher later
/// claims it pending -> sent/failed, which is what bounds delivery to a
/// single attempt per notice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardNotice {
    pub id: AwardNoticeId,
    pub selection_id: SelectionId,
    pub boq_id: BoqId,
    pub supplier_id: SupplierId,
    pub payload_hash: String,
    pub state: AwardNoticeState,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::AwardNoticeState;

    #[test]
    fn notice_state_round_trips_through_storage_encoding() {
        for state in [AwardNoticeState::Pending, AwardNoticeState::Sent, AwardNoticeState::Failed]
        {
            assert_eq!(AwardNoticeState::parse(state.as_str()), Some(state));
        }
        assert_eq!(AwardNoticeState::parse("retrying"), None);
    }
}
