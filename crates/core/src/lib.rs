pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod evaluation;

pub use audit::{AuditEvent, AuditOutcome};
pub use domain::bid::{Bid, BidId, BidStatus};
pub use domain::boq::{Boq, BoqDraft, BoqId, BoqStatus, FuelType};
pub use domain::budget::ProcurementBudget;
pub use domain::context::{RequestContext, Role};
pub use domain::selection::{
    AwardNotice, AwardNoticeId, AwardNoticeState, Selection, SelectionId,
};
pub use domain::supplier::{Supplier, SupplierId, SupplierProfile, SupplierSnapshot};
pub use errors::{ConflictReason, DomainError, ResourceKind};
pub use evaluation::{evaluate, EvaluationCriteria, EvaluationReport};
