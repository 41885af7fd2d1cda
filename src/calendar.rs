//! Fenêtres de semaine (ancrées au dimanche) et fenêtre du mois cible.
//!
//! La semaine sert de clé pour le plafond hebdomadaire ; elle ignore les
//! frontières de mois.
use chrono::{Datelike, Days, Months, NaiveDate, Utc};
use std::fmt;

/// Dimanche (inclus) qui ouvre la semaine d'une date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey(NaiveDate);

impl WeekKey {
    pub fn sunday(self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Calcule la clé de semaine : le dimanche identique ou précédent.
pub fn week_key(date: NaiveDate) -> WeekKey {
    let back = u64::from(date.weekday().num_days_from_sunday());
    WeekKey(date - Days::new(back))
}

/// Mois calendaire, bornes incluses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl MonthWindow {
    pub fn of(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
        Some(Self { first, last })
    }

    /// Mois qui contient `date`.
    pub fn containing(date: NaiveDate) -> Option<Self> {
        Self::of(date.year(), date.month())
    }

    /// Tous les jours du mois, en ordre croissant.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.first.iter_days().take_while(move |d| *d <= self.last)
    }

    pub fn len_days(&self) -> usize {
        (self.last - self.first).num_days() as usize + 1
    }

    /// Plage `[WeekKey(1er), 1er)` des jours du mois précédent partageant la
    /// semaine du 1er ; `None` quand le mois commence un dimanche.
    pub fn boundary_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = week_key(self.first).sunday();
        (start < self.first).then_some((start, self.first))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first && date <= self.last
    }
}

impl fmt::Display for MonthWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first.format("%Y-%m"))
    }
}

/// Mois qui suit celui contenant `now`.
pub fn target_month(now: NaiveDate) -> Option<MonthWindow> {
    let next = now.with_day(1)?.checked_add_months(Months::new(1))?;
    MonthWindow::containing(next)
}

/// Source de temps injectable.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Horloge système (UTC).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Horloge figée, pour les tests et `--now`.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
