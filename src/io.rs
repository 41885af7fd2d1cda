use crate::model::{Assignment, ClinicId, Membership, Organization, Shift, Tier, Worker, WorkerId};
use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveTime};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::path::Path;

/// Soignants importés et leurs rattachements aux cliniques.
#[derive(Debug, Default)]
pub struct ImportedWorkers {
    pub workers: Vec<Worker>,
    pub memberships: Vec<Membership>,
}

/// Import de soignants: header `first_name,last_name,tier[,unavailable_days][,clinics]`
///
/// `unavailable_days` et `clinics` sont des listes séparées par `;`.
pub fn import_workers_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<ImportedWorkers> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut out = ImportedWorkers::default();
    for rec in rdr.records() {
        let rec = rec?;
        let first = rec.get(0).context("missing first_name")?.trim();
        let last = rec.get(1).context("missing last_name")?.trim();
        if first.is_empty() || last.is_empty() {
            bail!("invalid worker row (empty name)");
        }
        let tier_raw = rec.get(2).context("missing tier")?;
        let tier = Tier::parse(tier_raw)
            .with_context(|| format!("invalid tier {tier_raw:?} for {first} {last}"))?;
        let mut worker = Worker::new(first, last, tier);
        if let Some(days) = rec.get(3) {
            worker.unavailable = split_list(days)
                .map(parse_date)
                .collect::<anyhow::Result<_>>()
                .with_context(|| format!("invalid unavailable_days for {first} {last}"))?;
        }
        if let Some(clinics) = rec.get(4) {
            out.memberships.extend(split_list(clinics).map(|c| Membership {
                worker: worker.id.clone(),
                clinic: ClinicId::new(c),
            }));
        }
        out.workers.push(worker);
    }
    Ok(out)
}

/// Import de créneaux: header `name,clinic[,start_time,end_time]` (HH:MM)
pub fn import_shifts_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Shift>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let name = rec.get(0).context("missing name")?.trim();
        let clinic = rec.get(1).context("missing clinic")?.trim();
        if name.is_empty() || clinic.is_empty() {
            bail!("invalid shift row (empty)");
        }
        let mut shift = Shift::new(name, ClinicId::new(clinic));
        let start = rec.get(2).map(str::trim).filter(|s| !s.is_empty());
        let end = rec.get(3).map(str::trim).filter(|s| !s.is_empty());
        match (start, end) {
            (Some(s), Some(e)) => {
                shift = shift.with_hours(parse_time(s)?, parse_time(e)?);
            }
            (None, None) => {}
            _ => bail!("shift {name}: start_time and end_time go together"),
        }
        out.push(shift);
    }
    Ok(out)
}

/// Import de rattachements: header `worker_id,clinic_id`
pub fn import_memberships_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Membership>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let worker = rec.get(0).context("missing worker_id")?.trim();
        let clinic = rec.get(1).context("missing clinic_id")?.trim();
        if worker.is_empty() || clinic.is_empty() {
            bail!("invalid membership row (empty)");
        }
        out.push(Membership {
            worker: WorkerId::new(worker),
            clinic: ClinicId::new(clinic),
        });
    }
    Ok(out)
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(';').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date: {raw}"))
}

fn parse_time(raw: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .with_context(|| format!("invalid time: {raw}"))
}

/// Export JSON des gardes (jolie mise en forme)
pub fn export_assignments_json<P: AsRef<Path>>(
    path: P,
    assignments: &[Assignment],
) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(assignments)?;
    fs::write(path, s)?;
    Ok(())
}

/// Export CSV: header `date,shift_id,shift_name,clinic_id,worker_id,worker_name`
pub fn export_assignments_csv<P: AsRef<Path>>(
    path: P,
    org: &Organization,
    assignments: &[Assignment],
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record([
        "date",
        "shift_id",
        "shift_name",
        "clinic_id",
        "worker_id",
        "worker_name",
    ])?;
    for a in assignments {
        let shift = org.find_shift(&a.shift);
        let worker_name = org
            .find_worker(&a.worker)
            .map(Worker::display_name)
            .unwrap_or_default();
        let date = a.date.format("%Y-%m-%d").to_string();
        w.write_record([
            date.as_str(),
            a.shift.as_str(),
            shift.map(|s| s.name.as_str()).unwrap_or(""),
            shift.map(|s| s.clinic.as_str()).unwrap_or(""),
            a.worker.as_str(),
            worker_name.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
