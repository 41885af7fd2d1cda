use crate::calendar::MonthWindow;
use crate::model::{Assignment, OrganizationId, ShiftId, WorkerId};
use chrono::NaiveDate;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Nombre maximal de jours travaillés par soignant et par semaine.
pub const WEEKLY_CAP: u32 = 3;

/// Drapeau d'annulation coopérative, vérifié une fois par jour généré.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options de génération
#[derive(Debug, Clone, Default)]
pub struct AssignOptions {
    pub cancel: Option<CancelFlag>,
}

impl AssignOptions {
    pub fn with_cancel(cancel: CancelFlag) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }
}

/// Couple (créneau, jour) resté sans soignant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnfilledSlot {
    pub shift: ShiftId,
    pub date: NaiveDate,
}

/// Résultat d'une génération.
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub month: MonthWindow,
    /// Gardes attribuées, dans l'ordre (jour, créneau).
    pub assignments: Vec<Assignment>,
    pub unfilled: Vec<UnfilledSlot>,
    /// Gardes du mois précédent injectées dans l'état initial.
    pub seeded: usize,
}

impl ScheduleOutcome {
    pub fn is_unfilled(&self, shift: &ShiftId, date: NaiveDate) -> bool {
        self.unfilled
            .iter()
            .any(|u| &u.shift == shift && u.date == date)
    }

    pub fn assigned_to(&self, shift: &ShiftId, date: NaiveDate) -> Option<&WorkerId> {
        self.assignments
            .iter()
            .find(|a| &a.shift == shift && a.date == date)
            .map(|a| &a.worker)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    DoubleBooking,
    WeeklyCapExceeded,
    Unavailable,
    NotEligible,
    UnknownWorker,
    UnknownShift,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::DoubleBooking => "double",
            ViolationKind::WeeklyCapExceeded => "weekly_cap",
            ViolationKind::Unavailable => "unavailable",
            ViolationKind::NotEligible => "not_eligible",
            ViolationKind::UnknownWorker => "unknown_worker",
            ViolationKind::UnknownShift => "unknown_shift",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Violation {
    pub worker: WorkerId,
    pub shift: ShiftId,
    pub date: NaiveDate,
    pub kind: ViolationKind,
}

/// Étape de chargement qui a échoué.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Shifts,
    Workers,
    Memberships,
    BoundaryAssignments,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FetchStage::Shifts => "shifts",
            FetchStage::Workers => "workers",
            FetchStage::Memberships => "worker-clinic memberships",
            FetchStage::BoundaryAssignments => "boundary-week assignments",
        })
    }
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("could not delete assignments of {org} from {first} to {last}")]
    DeleteFailed {
        org: OrganizationId,
        first: NaiveDate,
        last: NaiveDate,
        #[source]
        source: anyhow::Error,
    },
    #[error("assignments of {org} from {first} to {last} were deleted but the new schedule was not inserted; the period is now empty")]
    PartiallyApplied {
        org: OrganizationId,
        first: NaiveDate,
        last: NaiveDate,
        #[source]
        source: anyhow::Error,
    },
}

impl PersistenceError {
    pub fn is_partial(&self) -> bool {
        matches!(self, PersistenceError::PartiallyApplied { .. })
    }
}

#[derive(Error, Debug)]
pub enum SchedError {
    #[error("failed to fetch {stage}")]
    DataFetch {
        stage: FetchStage,
        #[source]
        source: anyhow::Error,
    },
    #[error("schedule for {} computed but not saved", .outcome.month)]
    Persistence {
        #[source]
        source: PersistenceError,
        outcome: Box<ScheduleOutcome>,
    },
    #[error("generation cancelled before {0}")]
    Cancelled(NaiveDate),
    #[error("no month follows {0}")]
    InvalidDate(NaiveDate),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SchedError {
    /// Planning calculé mais non enregistré, disponible pour un nouvel essai.
    pub fn computed_outcome(&self) -> Option<&ScheduleOutcome> {
        match self {
            SchedError::Persistence { outcome, .. } => Some(outcome),
            _ => None,
        }
    }
}
