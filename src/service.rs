//! Une génération complète : chargement, calcul, remplacement du mois cible.
use crate::calendar::{target_month, Clock, MonthWindow};
use crate::lock::OrgLocks;
use crate::model::{BoundaryAssignment, OrganizationId};
use crate::scheduler::{
    AssignOptions, FetchStage, PersistenceError, SchedError, ScheduleOutcome, Scheduler,
};
use crate::storage::{ScheduleSink, ScheduleSource};
use chrono::NaiveDate;
use rand::Rng;

fn fetch<T>(stage: FetchStage, res: anyhow::Result<T>) -> Result<T, SchedError> {
    res.map_err(|source| {
        log_warn!(%stage, error = %source, "data fetch failed");
        SchedError::DataFetch { stage, source }
    })
}

fn month_for<C: Clock + ?Sized>(clock: &C) -> Result<MonthWindow, SchedError> {
    let now = clock.today();
    target_month(now).ok_or(SchedError::InvalidDate(now))
}

/// Gardes existantes de la semaine frontière ; pas de requête si le mois
/// commence un dimanche.
fn fetch_boundary<S: ScheduleSource + ?Sized>(
    source: &S,
    org: &OrganizationId,
    month: &MonthWindow,
) -> Result<Vec<BoundaryAssignment>, SchedError> {
    match month.boundary_range() {
        Some((start, end)) => fetch(
            FetchStage::BoundaryAssignments,
            source.assignments_between(org, start, end),
        ),
        None => Ok(Vec::new()),
    }
}

/// Calcule le planning du mois suivant `clock.today()` sans rien écrire.
pub fn generate_schedule<S, C, R>(
    source: &S,
    org: &OrganizationId,
    clock: &C,
    rng: &mut R,
    opts: &AssignOptions,
) -> Result<ScheduleOutcome, SchedError>
where
    S: ScheduleSource + ?Sized,
    C: Clock + ?Sized,
    R: Rng + ?Sized,
{
    let month = month_for(clock)?;
    log_info!(%org, %month, "generating schedule");

    let shifts = fetch(FetchStage::Shifts, source.shifts(org))?;
    let workers = fetch(FetchStage::Workers, source.workers(org))?;
    let memberships = fetch(FetchStage::Memberships, source.memberships(org))?;
    let boundary = fetch_boundary(source, org, &month)?;

    let scheduler = Scheduler::new(shifts, workers, &memberships);
    let outcome = scheduler.generate(month, &boundary, rng, opts)?;
    log_info!(
        %org,
        %month,
        assigned = outcome.assignments.len(),
        unfilled = outcome.unfilled.len(),
        seeded = outcome.seeded,
        "schedule computed"
    );
    Ok(outcome)
}

/// Remplace les gardes de `[month.first, month.last]` par `outcome` ; renvoie
/// le nombre de gardes supprimées.
pub fn persist_schedule<K: ScheduleSink + ?Sized>(
    sink: &K,
    org: &OrganizationId,
    outcome: &ScheduleOutcome,
) -> Result<usize, PersistenceError> {
    let MonthWindow { first, last } = outcome.month;
    let removed = sink
        .delete_range(org, first, last)
        .map_err(|source| PersistenceError::DeleteFailed {
            org: org.clone(),
            first,
            last,
            source,
        })?;
    log_debug!(%org, removed, "previous assignments deleted");

    sink.insert_assignments(org, &outcome.assignments)
        .map_err(|source| PersistenceError::PartiallyApplied {
            org: org.clone(),
            first,
            last,
            source,
        })?;
    Ok(removed)
}

/// Génère puis enregistre, sous le verrou de l'organisation.
///
/// En cas d'échec d'écriture, le planning calculé reste disponible via
/// [`SchedError::computed_outcome`].
pub fn generate_and_persist<S, C, R>(
    store: &S,
    locks: &OrgLocks,
    org: &OrganizationId,
    clock: &C,
    rng: &mut R,
    opts: &AssignOptions,
) -> Result<ScheduleOutcome, SchedError>
where
    S: ScheduleSource + ScheduleSink + ?Sized,
    C: Clock + ?Sized,
    R: Rng + ?Sized,
{
    locks.with_lock(org, || {
        let outcome = generate_schedule(store, org, clock, rng, opts)?;
        match persist_schedule(store, org, &outcome) {
            Ok(_) => Ok(outcome),
            Err(source) => {
                log_warn!(
                    %org,
                    partial = source.is_partial(),
                    error = %source,
                    "schedule not persisted"
                );
                Err(SchedError::Persistence {
                    source,
                    outcome: Box::new(outcome),
                })
            }
        }
    })
}

/// Efface les gardes du mois cible.
pub fn clear_month<K, C>(
    sink: &K,
    locks: &OrgLocks,
    org: &OrganizationId,
    clock: &C,
) -> Result<usize, SchedError>
where
    K: ScheduleSink + ?Sized,
    C: Clock + ?Sized,
{
    let month = month_for(clock)?;
    locks.with_lock(org, || {
        sink.delete_range(org, month.first, month.last)
            .map_err(|source| {
                SchedError::from(source.context(format!("clearing {month} for {org}")))
            })
    })
}

/// Efface toutes les gardes de l'organisation, quel que soit le mois.
pub fn clear_all<K: ScheduleSink + ?Sized>(
    sink: &K,
    locks: &OrgLocks,
    org: &OrganizationId,
) -> Result<usize, SchedError> {
    locks.with_lock(org, || {
        let removed = sink
            .delete_range(org, NaiveDate::MIN, NaiveDate::MAX)
            .map_err(|source| SchedError::from(source.context(format!("clearing {org}"))))?;
        log_info!(%org, removed, "all assignments cleared");
        Ok(removed)
    })
}
