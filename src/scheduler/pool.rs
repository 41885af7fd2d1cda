use crate::model::{ClinicId, Membership, Shift, Tier, Worker, WorkerId};
use std::collections::HashMap;

/// Soignants rattachés à chaque clinique, dans l'ordre des rattachements.
#[derive(Debug, Clone, Default)]
pub struct ClinicWorkerIndex {
    by_clinic: HashMap<ClinicId, Vec<WorkerId>>,
}

impl ClinicWorkerIndex {
    pub fn from_memberships(memberships: &[Membership]) -> Self {
        let mut by_clinic: HashMap<ClinicId, Vec<WorkerId>> = HashMap::new();
        for m in memberships {
            let workers = by_clinic.entry(m.clinic.clone()).or_default();
            if !workers.contains(&m.worker) {
                workers.push(m.worker.clone());
            }
        }
        Self { by_clinic }
    }

    pub fn eligible(&self, clinic: &ClinicId) -> &[WorkerId] {
        self.by_clinic.get(clinic).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_eligible(&self, clinic: &ClinicId, worker: &WorkerId) -> bool {
        self.eligible(clinic).contains(worker)
    }
}

/// Candidats d'un créneau, séparés par statut, dans l'ordre de l'effectif.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool<'a> {
    pub full_time: Vec<&'a Worker>,
    pub part_time: Vec<&'a Worker>,
}

impl CandidatePool<'_> {
    pub fn is_empty(&self) -> bool {
        self.full_time.is_empty() && self.part_time.is_empty()
    }
}

pub(super) fn candidate_pool<'a>(
    shift: &Shift,
    index: &ClinicWorkerIndex,
    workers: &'a [Worker],
) -> CandidatePool<'a> {
    let eligible = index.eligible(&shift.clinic);
    let mut pool = CandidatePool::default();
    if eligible.is_empty() {
        return pool;
    }
    for worker in workers.iter().filter(|w| eligible.contains(&w.id)) {
        match worker.tier {
            Tier::FullTime => pool.full_time.push(worker),
            Tier::PartTime => pool.part_time.push(worker),
        }
    }
    pool
}
