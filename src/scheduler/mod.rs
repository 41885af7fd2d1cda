mod assignment;
mod audit;
mod boundary;
mod pool;
mod state;
mod types;

pub use pool::{CandidatePool, ClinicWorkerIndex};
pub use state::AssignmentState;
pub use types::{
    AssignOptions, CancelFlag, FetchStage, PersistenceError, SchedError, ScheduleOutcome,
    UnfilledSlot, Violation, ViolationKind, WEEKLY_CAP,
};

use crate::calendar::MonthWindow;
use crate::model::{Assignment, BoundaryAssignment, Membership, Organization, Shift, Worker};
use rand::Rng;

/// Scheduler : instantané en lecture seule d'une organisation
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    shifts: Vec<Shift>,
    workers: Vec<Worker>,
    index: ClinicWorkerIndex,
}

impl Scheduler {
    pub fn new(shifts: Vec<Shift>, workers: Vec<Worker>, memberships: &[Membership]) -> Self {
        Self {
            shifts,
            workers,
            index: ClinicWorkerIndex::from_memberships(memberships),
        }
    }

    pub fn from_organization(org: &Organization) -> Self {
        Self::new(org.shifts.clone(), org.workers.clone(), &org.memberships)
    }

    pub fn shifts(&self) -> &[Shift] {
        &self.shifts
    }
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }
    pub fn index(&self) -> &ClinicWorkerIndex {
        &self.index
    }

    /// Candidats éligibles d'un créneau, par statut.
    pub fn candidate_pool(&self, shift: &Shift) -> CandidatePool<'_> {
        pool::candidate_pool(shift, &self.index, &self.workers)
    }

    /// Remplit chaque (jour, créneau) du mois : temps pleins d'abord, puis
    /// temps partiels, chaque statut dans un ordre tiré au sort par `rng`.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        month: MonthWindow,
        prior: &[BoundaryAssignment],
        rng: &mut R,
        opts: &AssignOptions,
    ) -> Result<ScheduleOutcome, SchedError> {
        let mut state = AssignmentState::new();
        let seeded = boundary::seed_boundary(&mut state, &month, prior);
        log_debug!(seeded, "boundary week seeded");
        assignment::assign_month(self, month, state, seeded, rng, opts)
    }

    /// Vérifie une liste de gardes ; `prior` = gardes de la semaine frontière.
    pub fn audit(
        &self,
        assignments: &[Assignment],
        prior: &[BoundaryAssignment],
    ) -> Vec<Violation> {
        audit::audit(self, assignments, prior)
    }
}
