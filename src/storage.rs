use crate::model::{Assignment, BoundaryAssignment, Membership, OrganizationId, Shift, Worker};
use chrono::NaiveDate;

/// Lecture des données d'une organisation.
pub trait ScheduleSource {
    fn shifts(&self, org: &OrganizationId) -> anyhow::Result<Vec<Shift>>;
    fn workers(&self, org: &OrganizationId) -> anyhow::Result<Vec<Worker>>;
    fn memberships(&self, org: &OrganizationId) -> anyhow::Result<Vec<Membership>>;
    /// Gardes déjà stockées dont la date est dans `[start, end)`.
    fn assignments_between(
        &self,
        org: &OrganizationId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<BoundaryAssignment>>;
}

/// Écriture des gardes : suppression d'une plage puis insertion en bloc.
pub trait ScheduleSink {
    /// Supprime les gardes de `[first, last]` (bornes incluses), renvoie le nombre supprimé.
    fn delete_range(
        &self,
        org: &OrganizationId,
        first: NaiveDate,
        last: NaiveDate,
    ) -> anyhow::Result<usize>;
    fn insert_assignments(
        &self,
        org: &OrganizationId,
        assignments: &[Assignment],
    ) -> anyhow::Result<()>;
}

#[cfg(feature = "serde")]
pub use json::JsonStorage;

#[cfg(feature = "serde")]
mod json {
    use super::{ScheduleSink, ScheduleSource};
    use crate::model::{
        Assignment, BoundaryAssignment, Membership, Organization, OrganizationId, Roster, Shift,
        Worker,
    };
    use anyhow::Context;
    use chrono::NaiveDate;
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::NamedTempFile;

    /// Roster complet dans un fichier JSON, réécrit de manière atomique.
    #[derive(Debug, Clone)]
    pub struct JsonStorage {
        path: PathBuf,
    }

    impl JsonStorage {
        pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
            Ok(Self {
                path: path.as_ref().to_path_buf(),
            })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        /// Charge le roster ; un fichier absent donne un roster vide.
        pub fn load(&self) -> anyhow::Result<Roster> {
            if !self.path.exists() {
                return Ok(Roster::default());
            }
            let data = fs::read(&self.path)
                .with_context(|| format!("reading {}", self.path.display()))?;
            let roster: Roster = serde_json::from_slice(&data)
                .with_context(|| format!("parsing {}", self.path.display()))?;
            Ok(roster)
        }

        pub fn save(&self, roster: &Roster) -> anyhow::Result<()> {
            let json = serde_json::to_vec_pretty(roster)?;
            let dir = match self.path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            let mut tmp = NamedTempFile::new_in(dir).with_context(|| "creating temp file")?;
            tmp.write_all(&json)?;
            tmp.flush()?;
            tmp.as_file().sync_all()?;
            tmp.persist(&self.path).with_context(|| "atomic rename")?;
            Ok(())
        }

        pub fn organization(&self, org: &OrganizationId) -> anyhow::Result<Organization> {
            self.load()?
                .find_org(org)
                .cloned()
                .with_context(|| format!("unknown organization: {org}"))
        }

        /// Charge, modifie l'organisation puis réécrit le fichier.
        pub fn update<T, F>(&self, org: &OrganizationId, f: F) -> anyhow::Result<T>
        where
            F: FnOnce(&mut Organization) -> anyhow::Result<T>,
        {
            let mut roster = self.load()?;
            let target = roster
                .find_org_mut(org)
                .with_context(|| format!("unknown organization: {org}"))?;
            let out = f(target)?;
            self.save(&roster)?;
            Ok(out)
        }
    }

    impl ScheduleSource for JsonStorage {
        fn shifts(&self, org: &OrganizationId) -> anyhow::Result<Vec<Shift>> {
            Ok(self.organization(org)?.shifts)
        }

        fn workers(&self, org: &OrganizationId) -> anyhow::Result<Vec<Worker>> {
            Ok(self.organization(org)?.workers)
        }

        fn memberships(&self, org: &OrganizationId) -> anyhow::Result<Vec<Membership>> {
            Ok(self.organization(org)?.memberships)
        }

        fn assignments_between(
            &self,
            org: &OrganizationId,
            start: NaiveDate,
            end: NaiveDate,
        ) -> anyhow::Result<Vec<BoundaryAssignment>> {
            let org = self.organization(org)?;
            Ok(org
                .assignments_between(start, end)
                .into_iter()
                .map(BoundaryAssignment::from)
                .collect())
        }
    }

    impl ScheduleSink for JsonStorage {
        fn delete_range(
            &self,
            org: &OrganizationId,
            first: NaiveDate,
            last: NaiveDate,
        ) -> anyhow::Result<usize> {
            self.update(org, |o| {
                let before = o.assignments.len();
                o.assignments.retain(|a| a.date < first || a.date > last);
                Ok(before - o.assignments.len())
            })
        }

        fn insert_assignments(
            &self,
            org: &OrganizationId,
            assignments: &[Assignment],
        ) -> anyhow::Result<()> {
            self.update(org, |o| {
                o.assignments.extend_from_slice(assignments);
                o.assignments.sort_by(|a, b| a.date.cmp(&b.date));
                Ok(())
            })
        }
    }
}
