use super::pool::{candidate_pool, CandidatePool};
use super::state::AssignmentState;
use super::{AssignOptions, SchedError, ScheduleOutcome, Scheduler, UnfilledSlot};
use crate::calendar::{week_key, MonthWindow, WeekKey};
use crate::model::{Assignment, Worker};
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;

/// Premier candidat admissible dans l'ordre donné ; l'attribution est
/// enregistrée dans `state`.
pub(super) fn try_assign<'a>(
    candidates: &[&'a Worker],
    date: NaiveDate,
    week: WeekKey,
    state: &mut AssignmentState,
) -> Option<&'a Worker> {
    let chosen = candidates
        .iter()
        .copied()
        .find(|w| state.can_assign(w, date, week))?;
    state.record(&chosen.id, date, week);
    Some(chosen)
}

/// Tire un ordre neuf pour un statut puis tente l'attribution.
fn shuffled_attempt<'a, R: Rng + ?Sized>(
    tier: &[&'a Worker],
    date: NaiveDate,
    week: WeekKey,
    state: &mut AssignmentState,
    rng: &mut R,
) -> Option<&'a Worker> {
    if tier.is_empty() {
        return None;
    }
    let mut order = tier.to_vec();
    order.shuffle(rng);
    try_assign(&order, date, week, state)
}

pub(super) fn assign_month<R: Rng + ?Sized>(
    scheduler: &Scheduler,
    month: MonthWindow,
    mut state: AssignmentState,
    seeded: usize,
    rng: &mut R,
    opts: &AssignOptions,
) -> Result<ScheduleOutcome, SchedError> {
    // Les pools ne dépendent que de l'instantané : calculés une fois par créneau.
    let pools: Vec<CandidatePool<'_>> = scheduler
        .shifts
        .iter()
        .map(|shift| candidate_pool(shift, &scheduler.index, &scheduler.workers))
        .collect();

    let mut assignments = Vec::new();
    let mut unfilled = Vec::new();

    for date in month.days() {
        if opts.cancelled() {
            log_warn!(%date, "generation cancelled");
            return Err(SchedError::Cancelled(date));
        }
        let week = week_key(date);

        for (shift, pool) in scheduler.shifts.iter().zip(&pools) {
            let chosen = shuffled_attempt(&pool.full_time, date, week, &mut state, rng)
                .or_else(|| shuffled_attempt(&pool.part_time, date, week, &mut state, rng));

            match chosen {
                Some(worker) => assignments.push(Assignment {
                    shift: shift.id.clone(),
                    worker: worker.id.clone(),
                    date,
                }),
                None => {
                    log_debug!(shift = %shift.id, %date, "no eligible worker left, slot unfilled");
                    unfilled.push(UnfilledSlot {
                        shift: shift.id.clone(),
                        date,
                    });
                }
            }
        }
    }

    Ok(ScheduleOutcome {
        month,
        assignments,
        unfilled,
        seeded,
    })
}
