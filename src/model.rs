use crate::calendar::MonthWindow;
use anyhow::bail;
use chrono::{NaiveDate, NaiveTime};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        impl $name {
            pub fn new<S: AsRef<str>>(s: S) -> Self {
                Self(s.as_ref().to_owned())
            }
            pub fn random() -> Self {
                Self(Uuid::new_v4().to_string())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifiant fort pour une organisation
    OrganizationId
);
string_id!(
    /// Identifiant fort pour une clinique
    ClinicId
);
string_id!(
    /// Identifiant fort pour un créneau récurrent
    ShiftId
);
string_id!(
    /// Identifiant fort pour un soignant
    WorkerId
);

/// Statut d'emploi : les temps pleins passent toujours avant les temps partiels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Tier {
    FullTime,
    PartTime,
}

impl Tier {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "full_time" | "full-time" | "fulltime" | "ft" | "true" | "temps_plein" => {
                Some(Tier::FullTime)
            }
            "part_time" | "part-time" | "parttime" | "pt" | "false" | "temps_partiel" => {
                Some(Tier::PartTime)
            }
            _ => None,
        }
    }
}

/// Créneau récurrent d'une clinique, répété chaque jour du mois.
///
/// Les heures ne servent qu'à l'affichage : le moteur n'autorise qu'une garde
/// par soignant et par jour, quelle que soit l'heure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shift {
    pub id: ShiftId,
    pub clinic: ClinicId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub start_time: Option<NaiveTime>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub end_time: Option<NaiveTime>,
}

impl Shift {
    pub fn new<N: Into<String>>(name: N, clinic: ClinicId) -> Self {
        Self {
            id: ShiftId::random(),
            clinic,
            name: name.into(),
            start_time: None,
            end_time: None,
        }
    }

    pub fn with_hours(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }
}

/// Soignant d'une organisation
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Worker {
    pub id: WorkerId,
    pub first_name: String,
    pub last_name: String,
    pub tier: Tier,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "BTreeSet::is_empty")
    )]
    pub unavailable: BTreeSet<NaiveDate>,
}

impl Worker {
    pub fn new<F: Into<String>, L: Into<String>>(first_name: F, last_name: L, tier: Tier) -> Self {
        Self {
            id: WorkerId::random(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            tier,
            unavailable: BTreeSet::new(),
        }
    }

    pub fn unavailable_on<I: IntoIterator<Item = NaiveDate>>(mut self, dates: I) -> Self {
        self.unavailable.extend(dates);
        self
    }

    pub fn is_unavailable(&self, date: NaiveDate) -> bool {
        self.unavailable.contains(&date)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Remplace les indisponibilités du mois à partir des jours cochés.
    ///
    /// Temps plein : les jours cochés sont ceux où il est absent. Temps
    /// partiel : les jours cochés sont ceux où il travaille, tous les autres
    /// deviennent indisponibles. Les autres mois ne sont pas touchés.
    pub fn set_month_availability(
        &mut self,
        month: &MonthWindow,
        selected: &BTreeSet<NaiveDate>,
    ) -> anyhow::Result<usize> {
        if let Some(out) = selected.iter().find(|d| !month.contains(**d)) {
            bail!("{out} is not in {month}");
        }
        self.unavailable.retain(|d| !month.contains(*d));
        let off: Vec<NaiveDate> = month
            .days()
            .filter(|d| match self.tier {
                Tier::FullTime => selected.contains(d),
                Tier::PartTime => !selected.contains(d),
            })
            .collect();
        let count = off.len();
        self.unavailable.extend(off);
        Ok(count)
    }
}

/// Rattachement d'un soignant à une clinique.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Membership {
    pub worker: WorkerId,
    pub clinic: ClinicId,
}

/// Garde attribuée : (créneau, soignant, jour).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Assignment {
    pub shift: ShiftId,
    pub worker: WorkerId,
    pub date: NaiveDate,
}

/// Garde déjà en base sur les jours du mois précédent partageant la semaine du 1er.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryAssignment {
    pub worker: WorkerId,
    pub date: NaiveDate,
}

impl From<&Assignment> for BoundaryAssignment {
    fn from(a: &Assignment) -> Self {
        Self {
            worker: a.worker.clone(),
            date: a.date,
        }
    }
}

/// Instantané complet d'une organisation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub shifts: Vec<Shift>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub workers: Vec<Worker>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub memberships: Vec<Membership>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub assignments: Vec<Assignment>,
}

impl Organization {
    pub fn new<N: Into<String>>(id: OrganizationId, name: N) -> Self {
        Self {
            id,
            name: name.into(),
            shifts: Vec::new(),
            workers: Vec::new(),
            memberships: Vec::new(),
            assignments: Vec::new(),
        }
    }

    pub fn find_worker<'a>(&'a self, id: &WorkerId) -> Option<&'a Worker> {
        self.workers.iter().find(|w| &w.id == id)
    }
    pub fn find_shift<'a>(&'a self, id: &ShiftId) -> Option<&'a Shift> {
        self.shifts.iter().find(|s| &s.id == id)
    }

    /// Ajoute un rattachement s'il n'existe pas déjà.
    pub fn attach(&mut self, worker: WorkerId, clinic: ClinicId) -> bool {
        let exists = self
            .memberships
            .iter()
            .any(|m| m.worker == worker && m.clinic == clinic);
        if !exists {
            self.memberships.push(Membership { worker, clinic });
        }
        !exists
    }

    /// Ajoute un soignant, ou met à jour celui qui porte déjà le même nom
    /// (statut remplacé, indisponibilités fusionnées). Renvoie l'identifiant
    /// retenu et `true` s'il s'agit d'un nouveau soignant.
    pub fn upsert_worker(&mut self, worker: Worker) -> (WorkerId, bool) {
        let existing = self.workers.iter_mut().find(|w| {
            w.first_name.eq_ignore_ascii_case(&worker.first_name)
                && w.last_name.eq_ignore_ascii_case(&worker.last_name)
        });
        match existing {
            Some(w) => {
                w.tier = worker.tier;
                w.unavailable.extend(worker.unavailable);
                (w.id.clone(), false)
            }
            None => {
                let id = worker.id.clone();
                self.workers.push(worker);
                (id, true)
            }
        }
    }

    /// Supprime une clinique : ses créneaux, les gardes de ces créneaux et
    /// les rattachements des soignants. Renvoie le nombre de créneaux retirés.
    pub fn remove_clinic(&mut self, clinic: &ClinicId) -> usize {
        let removed: BTreeSet<ShiftId> = self
            .shifts
            .iter()
            .filter(|s| &s.clinic == clinic)
            .map(|s| s.id.clone())
            .collect();
        self.shifts.retain(|s| &s.clinic != clinic);
        self.assignments.retain(|a| !removed.contains(&a.shift));
        self.memberships.retain(|m| &m.clinic != clinic);
        removed.len()
    }

    /// Gardes stockées dont la date tombe dans `[start, end)`.
    pub fn assignments_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.date >= start && a.date < end)
            .collect()
    }
}

/// Document complet : toutes les organisations gérées par un même fichier.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Roster {
    #[cfg_attr(feature = "serde", serde(default))]
    pub organizations: Vec<Organization>,
}

impl Roster {
    pub fn find_org<'a>(&'a self, id: &OrganizationId) -> Option<&'a Organization> {
        self.organizations.iter().find(|o| &o.id == id)
    }
    pub fn find_org_mut(&mut self, id: &OrganizationId) -> Option<&mut Organization> {
        self.organizations.iter_mut().find(|o| &o.id == id)
    }
}
