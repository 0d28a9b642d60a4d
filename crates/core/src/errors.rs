use thiserror::Error;

use crate::domain::boq::BoqStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Boq,
    Bid,
    Supplier,
    Selection,
    Budget,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boq => "BOQ",
            Self::Bid => "bid",
            Self::Supplier => "supplier",
            Self::Selection => "selection",
            Self::Budget => "budget",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a mutating call violated a single-writer invariant. The message is
/// what the UI shows; `code` is the machine-readable discriminator.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConflictReason {
    #[error("bidding closed: a supplier has already been selected for this BOQ")]
    BiddingClosed,
    #[error("this supplier has already submitted a bid for this BOQ")]
    DuplicateBid,
    #[error("a supplier has already been selected for this BOQ")]
    AlreadySelected,
    #[error("bids have been submitted against this BOQ; it can no longer be deleted")]
    BidsExist,
    #[error("quantity and estimated price are locked once a supplier is selected")]
    EconomicFieldsLocked,
}

impl ConflictReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BiddingClosed => "bidding_closed",
            Self::DuplicateBid => "duplicate_bid",
            Self::AlreadySelected => "already_selected",
            Self::BidsExist => "bids_exist",
            Self::EconomicFieldsLocked => "economic_fields_locked",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid value for `{field}`: {message}")]
    Validation { field: &'static str, message: String },
    #[error("{kind} `{id}` was not found")]
    NotFound { kind: ResourceKind, id: String },
    #[error(transparent)]
    Conflict(#[from] ConflictReason),
    #[error("no bids have been submitted for BOQ `{0}`")]
    NoBids(String),
    #[error("no submitted bid meets the evaluation criteria for BOQ `{0}`")]
    NoQualifyingBid(String),
    #[error("invalid BOQ transition from {from:?} to {to:?}")]
    InvalidBoqTransition { from: BoqStatus, to: BoqStatus },
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { field, message: message.into() }
    }

    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    /// Stable machine-readable code carried on error response bodies so a
    /// UI can distinguish "no bids yet" from a failed evaluation and can
    /// explain each conflict.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(reason) => reason.code(),
            Self::NoBids(_) => "no_bids",
            Self::NoQualifyingBid(_) => "no_qualifying_bid",
            Self::InvalidBoqTransition { .. } => "invalid_transition",
        }
    }
}
