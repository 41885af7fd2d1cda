#![forbid(unsafe_code)]
//! Garde — génération du planning mensuel des gardes en clinique (sans BD).
//!
//! - Stockage fichiers (JSON/CSV).
//! - Remplissage glouton jour par jour, départage aléatoire injectable.
//! - Plafond de 3 jours par semaine (dimanche → samedi), continuité avec la
//!   fin du mois précédent.
//! - Une seule garde par soignant et par jour, toutes cliniques confondues.

#[macro_use]
mod logging;

pub mod calendar;
#[cfg(feature = "serde")]
pub mod io;
pub mod lock;
pub mod model;
pub mod scheduler;
pub mod service;
pub mod storage;

pub use calendar::{target_month, week_key, Clock, FixedClock, MonthWindow, SystemClock, WeekKey};
pub use lock::{LockFile, OrgLocks};
pub use model::{
    Assignment, BoundaryAssignment, ClinicId, Membership, Organization, OrganizationId, Roster,
    Shift, ShiftId, Tier, Worker, WorkerId,
};
pub use scheduler::{
    AssignOptions, CancelFlag, CandidatePool, ClinicWorkerIndex, PersistenceError, SchedError,
    ScheduleOutcome, Scheduler, UnfilledSlot, Violation, ViolationKind, WEEKLY_CAP,
};
pub use service::{
    clear_all, clear_month, generate_and_persist, generate_schedule, persist_schedule,
};
#[cfg(feature = "serde")]
pub use storage::JsonStorage;
pub use storage::{ScheduleSink, ScheduleSource};
