//! Retention core: eligibility, object deletion, record finalization and the
//! batch reconciler that drives them.

mod eligibility;
mod finalization;
mod object_deletion;
mod outcome;
mod reconciler;

pub use eligibility::{
    CriteriaSummary, EligibilityCriteria, EligibilityStats, STAGE_COLUMNS, count_eligible, cutoff,
    eligibility_stats, fetch_candidates,
};
pub use finalization::{
    HardDeleteFinalizer, RecordFinalizer, TombstoneFinalizer, create_finalizer,
};
pub use object_deletion::{DeletionOutcome, delete_object};
pub use outcome::{BatchOutcome, FailedFile};
pub use reconciler::{BatchReconciler, ReconcileError, ReconcilerSettings};
