use super::state::AssignmentState;
use crate::calendar::{week_key, MonthWindow};
use crate::model::BoundaryAssignment;

/// Injecte dans l'état les gardes du mois précédent qui partagent la semaine
/// du 1er. Les entrées hors de `[WeekKey(1er), 1er)` sont ignorées.
pub(super) fn seed_boundary(
    state: &mut AssignmentState,
    month: &MonthWindow,
    boundary: &[BoundaryAssignment],
) -> usize {
    let Some((start, end)) = month.boundary_range() else {
        return 0;
    };

    let mut seeded = 0usize;
    for prior in boundary {
        if prior.date < start || prior.date >= end {
            log_debug!(
                worker = %prior.worker,
                date = %prior.date,
                "ignoring assignment outside boundary week"
            );
            continue;
        }
        state.record(&prior.worker, prior.date, week_key(prior.date));
        seeded += 1;
    }
    seeded
}
