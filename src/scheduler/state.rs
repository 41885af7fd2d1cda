use super::WEEKLY_CAP;
use crate::calendar::WeekKey;
use crate::model::{Worker, WorkerId};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// État accumulé pendant une génération : charge hebdomadaire et jours déjà
/// pris de chaque soignant. Ne fait que croître.
#[derive(Debug, Clone, Default)]
pub struct AssignmentState {
    weekly: HashMap<WorkerId, HashMap<WeekKey, u32>>,
    daily: HashMap<WorkerId, BTreeSet<NaiveDate>>,
}

impl AssignmentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weekly_load(&self, worker: &WorkerId, week: WeekKey) -> u32 {
        self.weekly
            .get(worker)
            .and_then(|weeks| weeks.get(&week))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_booked(&self, worker: &WorkerId, date: NaiveDate) -> bool {
        self.daily
            .get(worker)
            .is_some_and(|days| days.contains(&date))
    }

    /// Disponible, pas déjà de garde ce jour-là, sous le plafond hebdomadaire.
    pub fn can_assign(&self, worker: &Worker, date: NaiveDate, week: WeekKey) -> bool {
        !worker.is_unavailable(date)
            && !self.is_booked(&worker.id, date)
            && self.weekly_load(&worker.id, week) < WEEKLY_CAP
    }

    pub fn record(&mut self, worker: &WorkerId, date: NaiveDate, week: WeekKey) {
        *self
            .weekly
            .entry(worker.clone())
            .or_default()
            .entry(week)
            .or_insert(0) += 1;
        self.daily.entry(worker.clone()).or_default().insert(date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::week_key;
    use crate::model::Tier;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn record_increments_week_and_books_day() {
        let w = Worker::new("Ana", "Diaz", Tier::FullTime);
        let mut state = AssignmentState::new();
        state.record(&w.id, d(4), week_key(d(4)));
        assert_eq!(state.weekly_load(&w.id, week_key(d(5))), 1);
        assert!(state.is_booked(&w.id, d(4)));
        assert!(!state.can_assign(&w, d(4), week_key(d(4))));
        assert!(state.can_assign(&w, d(5), week_key(d(5))));
    }

    #[test]
    fn cap_blocks_fourth_day_of_week() {
        let w = Worker::new("Ana", "Diaz", Tier::FullTime);
        let mut state = AssignmentState::new();
        for day in 3..6 {
            state.record(&w.id, d(day), week_key(d(day)));
        }
        assert!(!state.can_assign(&w, d(6), week_key(d(6))));
        // semaine suivante (dimanche 10)
        assert!(state.can_assign(&w, d(10), week_key(d(10))));
    }

    #[test]
    fn unavailable_day_is_rejected() {
        let w = Worker::new("Ana", "Diaz", Tier::PartTime).unavailable_on([d(2)]);
        let state = AssignmentState::new();
        assert!(!state.can_assign(&w, d(2), week_key(d(2))));
    }
}
