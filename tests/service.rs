#![forbid(unsafe_code)]
use anyhow::anyhow;
use chrono::NaiveDate;
use garde::{
    calendar::FixedClock,
    lock::OrgLocks,
    model::{
        Assignment, BoundaryAssignment, ClinicId, Membership, Organization, OrganizationId,
        Roster, Shift, Tier, Worker,
    },
    scheduler::{AssignOptions, FetchStage, PersistenceError, SchedError},
    service, JsonStorage, ScheduleSink, ScheduleSource,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::{Cell, RefCell};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Organisation minimale : une clinique, un créneau, trois temps pleins.
fn sample_org() -> Organization {
    let clinic = ClinicId::new("north");
    let mut org = Organization::new(OrganizationId::new("org"), "Clinique du Nord");
    org.shifts.push(Shift::new("matin", clinic.clone()));
    for name in ["Ana", "Ben", "Cam"] {
        let w = Worker::new(name, "X", Tier::FullTime);
        org.memberships.push(Membership {
            worker: w.id.clone(),
            clinic: clinic.clone(),
        });
        org.workers.push(w);
    }
    org
}

#[derive(Default)]
struct MemoryStore {
    org: RefCell<Option<Organization>>,
    fail_fetch: Option<FetchStage>,
    fail_delete: bool,
    fail_insert: bool,
    boundary_queries: Cell<usize>,
    writes: Cell<usize>,
}

impl MemoryStore {
    fn with(org: Organization) -> Self {
        Self {
            org: RefCell::new(Some(org)),
            ..Self::default()
        }
    }

    fn check(&self, stage: FetchStage) -> anyhow::Result<Organization> {
        if self.fail_fetch == Some(stage) {
            return Err(anyhow!("connection reset"));
        }
        self.org.borrow().clone().ok_or_else(|| anyhow!("no organization"))
    }

    fn stored(&self) -> Vec<Assignment> {
        self.org.borrow().as_ref().unwrap().assignments.clone()
    }
}

impl ScheduleSource for MemoryStore {
    fn shifts(&self, _org: &OrganizationId) -> anyhow::Result<Vec<Shift>> {
        Ok(self.check(FetchStage::Shifts)?.shifts)
    }
    fn workers(&self, _org: &OrganizationId) -> anyhow::Result<Vec<Worker>> {
        Ok(self.check(FetchStage::Workers)?.workers)
    }
    fn memberships(&self, _org: &OrganizationId) -> anyhow::Result<Vec<Membership>> {
        Ok(self.check(FetchStage::Memberships)?.memberships)
    }
    fn assignments_between(
        &self,
        _org: &OrganizationId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<BoundaryAssignment>> {
        self.boundary_queries.set(self.boundary_queries.get() + 1);
        let org = self.check(FetchStage::BoundaryAssignments)?;
        Ok(org
            .assignments_between(start, end)
            .into_iter()
            .map(BoundaryAssignment::from)
            .collect())
    }
}

impl ScheduleSink for MemoryStore {
    fn delete_range(
        &self,
        _org: &OrganizationId,
        first: NaiveDate,
        last: NaiveDate,
    ) -> anyhow::Result<usize> {
        self.writes.set(self.writes.get() + 1);
        if self.fail_delete {
            return Err(anyhow!("delete refused"));
        }
        let mut guard = self.org.borrow_mut();
        let org = guard.as_mut().unwrap();
        let before = org.assignments.len();
        org.assignments.retain(|a| a.date < first || a.date > last);
        Ok(before - org.assignments.len())
    }

    fn insert_assignments(
        &self,
        _org: &OrganizationId,
        assignments: &[Assignment],
    ) -> anyhow::Result<()> {
        self.writes.set(self.writes.get() + 1);
        if self.fail_insert {
            return Err(anyhow!("insert refused"));
        }
        let mut guard = self.org.borrow_mut();
        guard.as_mut().unwrap().assignments.extend_from_slice(assignments);
        Ok(())
    }
}

fn run(
    store: &MemoryStore,
    now: NaiveDate,
    seed: u64,
) -> Result<garde::ScheduleOutcome, SchedError> {
    let mut rng = StdRng::seed_from_u64(seed);
    service::generate_and_persist(
        store,
        &OrgLocks::new(),
        &OrganizationId::new("org"),
        &FixedClock(now),
        &mut rng,
        &AssignOptions::default(),
    )
}

#[test]
fn fetch_failure_aborts_before_any_write() {
    for stage in [
        FetchStage::Shifts,
        FetchStage::Workers,
        FetchStage::Memberships,
        FetchStage::BoundaryAssignments,
    ] {
        let store = MemoryStore {
            fail_fetch: Some(stage),
            ..MemoryStore::with(sample_org())
        };
        let err = run(&store, d(2024, 2, 10), 1).unwrap_err();
        assert!(matches!(err, SchedError::DataFetch { stage: s, .. } if s == stage));
        assert!(err.computed_outcome().is_none());
        assert_eq!(store.writes.get(), 0);
        assert!(store.stored().is_empty());
    }
}

#[test]
fn boundary_query_skipped_when_month_starts_on_sunday() {
    // septembre 2024 commence un dimanche
    let store = MemoryStore {
        fail_fetch: Some(FetchStage::BoundaryAssignments),
        ..MemoryStore::with(sample_org())
    };
    let outcome = run(&store, d(2024, 8, 20), 1).unwrap();
    assert_eq!(store.boundary_queries.get(), 0);
    assert_eq!(outcome.month.first, d(2024, 9, 1));
    assert_eq!(outcome.seeded, 0);
}

#[test]
fn generation_replaces_only_target_month() {
    let mut org = sample_org();
    let shift = org.shifts[0].id.clone();
    let worker = org.workers[0].id.clone();
    let stale = |date| Assignment {
        shift: shift.clone(),
        worker: worker.clone(),
        date,
    };
    org.assignments = vec![
        stale(d(2024, 2, 27)),
        stale(d(2024, 2, 28)),
        stale(d(2024, 2, 29)),
        stale(d(2024, 3, 10)),
        stale(d(2024, 4, 1)),
    ];
    let store = MemoryStore::with(org);

    let outcome = run(&store, d(2024, 2, 10), 5).unwrap();
    assert_eq!(outcome.seeded, 3);
    assert_eq!(outcome.assignments.len(), 31);
    assert!(outcome.unfilled.is_empty());
    // le soignant déjà à 3 jours ne revient pas avant dimanche
    assert_ne!(outcome.assigned_to(&shift, d(2024, 3, 1)), Some(&worker));
    assert_ne!(outcome.assigned_to(&shift, d(2024, 3, 2)), Some(&worker));

    let stored = store.stored();
    assert_eq!(stored.len(), 3 + 31 + 1);
    assert!(stored.contains(&stale(d(2024, 4, 1))));
    let march: Vec<_> = stored
        .iter()
        .filter(|a| a.date.to_string().starts_with("2024-03"))
        .collect();
    assert_eq!(march.len(), 31);
}

#[test]
fn failed_insert_is_reported_as_partial_with_outcome() {
    let store = MemoryStore {
        fail_insert: true,
        ..MemoryStore::with(sample_org())
    };
    let err = run(&store, d(2024, 2, 10), 2).unwrap_err();
    let SchedError::Persistence { source, outcome } = &err else {
        panic!("expected persistence error, got {err:?}");
    };
    assert!(source.is_partial());
    assert_eq!(outcome.assignments.len(), 31);
    assert_eq!(err.computed_outcome().map(|o| o.month.first), Some(d(2024, 3, 1)));
}

#[test]
fn failed_delete_is_not_partial() {
    let store = MemoryStore {
        fail_delete: true,
        ..MemoryStore::with(sample_org())
    };
    let err = run(&store, d(2024, 2, 10), 2).unwrap_err();
    match err {
        SchedError::Persistence { source, .. } => {
            assert!(matches!(source, PersistenceError::DeleteFailed { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.writes.get(), 1);
}

#[test]
fn dry_generation_writes_nothing() {
    let store = MemoryStore::with(sample_org());
    let mut rng = StdRng::seed_from_u64(0);
    let outcome = service::generate_schedule(
        &store,
        &OrganizationId::new("org"),
        &FixedClock(d(2024, 12, 3)),
        &mut rng,
        &AssignOptions::default(),
    )
    .unwrap();
    assert_eq!(outcome.month.first, d(2025, 1, 1));
    assert_eq!(store.writes.get(), 0);
}

#[test]
fn json_storage_chains_months_and_clears() {
    let dir = tempfile::tempdir().unwrap();
    let storage = JsonStorage::open(dir.path().join("roster.json")).unwrap();
    let org = sample_org();
    let org_id = org.id.clone();
    storage
        .save(&Roster {
            organizations: vec![org],
        })
        .unwrap();
    let locks = OrgLocks::new();

    for (now, seed) in [(d(2024, 2, 10), 1), (d(2024, 3, 10), 2)] {
        let mut rng = StdRng::seed_from_u64(seed);
        service::generate_and_persist(
            &storage,
            &locks,
            &org_id,
            &FixedClock(now),
            &mut rng,
            &AssignOptions::default(),
        )
        .unwrap();
    }

    let reloaded = storage.organization(&org_id).unwrap();
    assert_eq!(reloaded.assignments.len(), 31 + 30);

    // avril commence un lundi : le 31 mars compte dans la même semaine
    let scheduler = garde::Scheduler::from_organization(&reloaded);
    let prior: Vec<_> = reloaded
        .assignments_between(d(2024, 3, 31), d(2024, 4, 1))
        .into_iter()
        .map(BoundaryAssignment::from)
        .collect();
    let april: Vec<_> = reloaded
        .assignments
        .iter()
        .filter(|a| a.date >= d(2024, 4, 1))
        .cloned()
        .collect();
    assert!(scheduler.audit(&april, &prior).is_empty());

    let removed =
        service::clear_month(&storage, &locks, &org_id, &FixedClock(d(2024, 3, 10))).unwrap();
    assert_eq!(removed, 30);
    assert_eq!(storage.organization(&org_id).unwrap().assignments.len(), 31);

    assert_eq!(service::clear_all(&storage, &locks, &org_id).unwrap(), 31);
    assert!(storage.organization(&org_id).unwrap().assignments.is_empty());
}

#[test]
fn persist_reports_replaced_rows() {
    let mut org = sample_org();
    let shift = org.shifts[0].id.clone();
    let worker = org.workers[0].id.clone();
    org.assignments = [d(2024, 2, 29), d(2024, 3, 4), d(2024, 3, 20)]
        .into_iter()
        .map(|date| Assignment {
            shift: shift.clone(),
            worker: worker.clone(),
            date,
        })
        .collect();
    let store = MemoryStore::with(org);
    let mut rng = StdRng::seed_from_u64(4);
    let org_id = OrganizationId::new("org");
    let outcome = service::generate_schedule(
        &store,
        &org_id,
        &FixedClock(d(2024, 2, 10)),
        &mut rng,
        &AssignOptions::default(),
    )
    .unwrap();

    assert_eq!(service::persist_schedule(&store, &org_id, &outcome).unwrap(), 2);
    assert_eq!(store.stored().len(), 1 + 31);
}

#[test]
fn unknown_organization_is_a_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let storage = JsonStorage::open(dir.path().join("roster.json")).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let err = service::generate_schedule(
        &storage,
        &OrganizationId::new("ghost"),
        &FixedClock(d(2024, 2, 10)),
        &mut rng,
        &AssignOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SchedError::DataFetch { stage: FetchStage::Shifts, .. }));
}
