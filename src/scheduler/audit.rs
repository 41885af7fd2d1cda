use super::{Scheduler, Violation, ViolationKind, WEEKLY_CAP};
use crate::calendar::{week_key, WeekKey};
use crate::model::{Assignment, BoundaryAssignment, WorkerId};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Vérifie une liste de gardes contre les règles du moteur. `prior` compte
/// pour le plafond hebdomadaire mais n'est jamais signalé lui-même.
pub(super) fn audit(
    scheduler: &Scheduler,
    assignments: &[Assignment],
    prior: &[BoundaryAssignment],
) -> Vec<Violation> {
    let mut out = Vec::new();
    let mut days: BTreeMap<(&WorkerId, NaiveDate), usize> = BTreeMap::new();
    let mut weeks: BTreeMap<(&WorkerId, WeekKey), BTreeSet<NaiveDate>> = BTreeMap::new();

    for p in prior {
        weeks
            .entry((&p.worker, week_key(p.date)))
            .or_default()
            .insert(p.date);
    }

    for a in assignments {
        let violation = |kind| Violation {
            worker: a.worker.clone(),
            shift: a.shift.clone(),
            date: a.date,
            kind,
        };

        let Some(worker) = scheduler.workers.iter().find(|w| w.id == a.worker) else {
            out.push(violation(ViolationKind::UnknownWorker));
            continue;
        };
        match scheduler.shifts.iter().find(|s| s.id == a.shift) {
            Some(shift) if !scheduler.index.is_eligible(&shift.clinic, &a.worker) => {
                out.push(violation(ViolationKind::NotEligible));
            }
            Some(_) => {}
            None => out.push(violation(ViolationKind::UnknownShift)),
        }
        if worker.is_unavailable(a.date) {
            out.push(violation(ViolationKind::Unavailable));
        }

        let seen = days.entry((&a.worker, a.date)).or_insert(0);
        *seen += 1;
        if *seen == 2 {
            out.push(violation(ViolationKind::DoubleBooking));
        }

        let week = weeks.entry((&a.worker, week_key(a.date))).or_default();
        if week.insert(a.date) && week.len() == WEEKLY_CAP as usize + 1 {
            out.push(violation(ViolationKind::WeeklyCapExceeded));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClinicId, Membership, Shift, Tier, Worker};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn flags_each_kind_once() {
        let clinic = ClinicId::new("c");
        let shift = Shift::new("matin", clinic.clone());
        let other = Shift::new("soir", clinic.clone());
        let w = Worker::new("Ana", "D", Tier::FullTime).unavailable_on([d(8)]);
        let scheduler = Scheduler::new(
            vec![shift.clone(), other.clone()],
            vec![w.clone()],
            &[Membership {
                worker: w.id.clone(),
                clinic,
            }],
        );
        let at = |s: &Shift, day| Assignment {
            shift: s.id.clone(),
            worker: w.id.clone(),
            date: d(day),
        };
        // dimanche 3 → samedi 9
        let list = vec![
            at(&shift, 4),
            at(&other, 4),
            at(&shift, 5),
            at(&shift, 6),
            at(&shift, 7),
            at(&shift, 8),
        ];
        let kinds: Vec<_> = audit(&scheduler, &list, &[]).into_iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ViolationKind::DoubleBooking,
                ViolationKind::WeeklyCapExceeded,
                ViolationKind::Unavailable,
            ]
        );
    }

    #[test]
    fn prior_days_count_toward_cap() {
        let clinic = ClinicId::new("c");
        let shift = Shift::new("matin", clinic.clone());
        let w = Worker::new("Ana", "D", Tier::FullTime);
        let scheduler = Scheduler::new(
            vec![shift.clone()],
            vec![w.clone()],
            &[Membership {
                worker: w.id.clone(),
                clinic,
            }],
        );
        let feb = |day| NaiveDate::from_ymd_opt(2024, 2, day).unwrap();
        let prior: Vec<_> = [26, 27, 28]
            .into_iter()
            .map(|day| BoundaryAssignment {
                worker: w.id.clone(),
                date: feb(day),
            })
            .collect();
        let list = vec![Assignment {
            shift: shift.id.clone(),
            worker: w.id.clone(),
            date: d(1),
        }];
        let violations = audit(&scheduler, &list, &prior);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::WeeklyCapExceeded);
    }
}
