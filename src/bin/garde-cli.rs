#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use clap::{Parser, Subcommand};
use garde::{
    calendar::{Clock, FixedClock, MonthWindow, SystemClock},
    io,
    lock::{LockFile, OrgLocks},
    model::{Assignment, BoundaryAssignment, ClinicId, Organization, OrganizationId, WorkerId},
    scheduler::{AssignOptions, SchedError, ScheduleOutcome, Scheduler},
    service,
    storage::JsonStorage,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de planification mensuelle des gardes (sans base de données)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON contenant les organisations
    #[arg(long, global = true, default_value = "roster.json")]
    store: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Créer une organisation vide
    InitOrg {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },

    /// Importer des soignants depuis un CSV
    ImportWorkers {
        #[arg(long)]
        org: String,
        #[arg(long)]
        csv: String,
    },

    /// Importer des créneaux depuis un CSV
    ImportShifts {
        #[arg(long)]
        org: String,
        #[arg(long)]
        csv: String,
    },

    /// Importer des rattachements soignant/clinique depuis un CSV
    ImportMemberships {
        #[arg(long)]
        org: String,
        #[arg(long)]
        csv: String,
    },

    /// Saisir les disponibilités d'un soignant pour un mois
    ///
    /// Temps plein : jours d'absence. Temps partiel : jours travaillés.
    SetAvailability {
        #[arg(long)]
        org: String,
        #[arg(long)]
        worker: String,
        /// Mois (YYYY-MM)
        #[arg(long)]
        month: String,
        /// Jours cochés (YYYY-MM-DD), séparés par des virgules
        #[arg(long, value_delimiter = ',')]
        days: Vec<String>,
    },

    /// Supprimer une clinique avec ses créneaux, gardes et rattachements
    DeleteClinic {
        #[arg(long)]
        org: String,
        #[arg(long)]
        clinic: String,
    },

    /// Générer le planning du mois suivant et remplacer celui en place
    Generate {
        #[arg(long)]
        org: String,
        /// Date du jour (YYYY-MM-DD) ; le mois généré est le suivant
        #[arg(long)]
        now: Option<String>,
        /// Graine du tirage pour un résultat reproductible
        #[arg(long)]
        seed: Option<u64>,
        /// Calcule sans écrire dans le fichier
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        out_json: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Lister les gardes
    List {
        #[arg(long)]
        org: String,
        /// Mois (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
    },

    /// Vérifier les gardes stockées (doublons, plafond, indisponibilités)
    Check {
        #[arg(long)]
        org: String,
        /// Mois (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        /// Export CSV des violations (optionnel)
        #[arg(long)]
        report: Option<String>,
    },

    /// Effacer le planning du mois suivant (ou tout, avec `--all`)
    Clear {
        #[arg(long)]
        org: String,
        #[arg(long)]
        now: Option<String>,
        #[arg(long, conflicts_with = "now")]
        all: bool,
    },
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date: {raw}"))
}

fn parse_month(raw: &str) -> Result<MonthWindow> {
    let first = parse_day(&format!("{raw}-01")).with_context(|| format!("invalid month: {raw}"))?;
    MonthWindow::containing(first).context("month out of range")
}

fn clock_for(now: Option<&str>) -> Result<Box<dyn Clock>> {
    let clock: Box<dyn Clock> = match now {
        Some(raw) => Box::new(FixedClock(parse_day(raw)?)),
        None => Box::new(SystemClock),
    };
    Ok(clock)
}

fn export(
    org: &Organization,
    outcome: &ScheduleOutcome,
    json: Option<&str>,
    csv: Option<&str>,
) -> Result<()> {
    if let Some(path) = json {
        io::export_assignments_json(path, &outcome.assignments)?;
    }
    if let Some(path) = csv {
        io::export_assignments_csv(path, org, &outcome.assignments)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let storage = JsonStorage::open(&cli.store)?;

    let code = match cli.cmd {
        Commands::InitOrg { id, name } => {
            let mut roster = storage.load()?;
            let id = OrganizationId::new(id);
            if roster.find_org(&id).is_some() {
                bail!("organization {id} already exists");
            }
            roster.organizations.push(Organization::new(id, name));
            storage.save(&roster)?;
            0
        }
        Commands::ImportWorkers { org, csv } => {
            let imported = io::import_workers_csv(csv)?;
            let (added, updated) = storage.update(&OrganizationId::new(org), |o| {
                let mut ids: HashMap<WorkerId, WorkerId> = HashMap::new();
                let mut added = 0usize;
                for w in imported.workers {
                    let csv_id = w.id.clone();
                    let (id, created) = o.upsert_worker(w);
                    added += usize::from(created);
                    ids.insert(csv_id, id);
                }
                let updated = ids.len() - added;
                for m in imported.memberships {
                    let worker = ids.get(&m.worker).cloned().unwrap_or(m.worker);
                    o.attach(worker, m.clinic);
                }
                Ok((added, updated))
            })?;
            println!("{added} worker(s) imported, {updated} updated");
            0
        }
        Commands::ImportShifts { org, csv } => {
            let shifts = io::import_shifts_csv(csv)?;
            let count = shifts.len();
            storage.update(&OrganizationId::new(org), |o| {
                o.shifts.extend(shifts);
                Ok(())
            })?;
            println!("{count} shift(s) imported");
            0
        }
        Commands::ImportMemberships { org, csv } => {
            let memberships = io::import_memberships_csv(csv)?;
            let added = storage.update(&OrganizationId::new(org), |o| {
                let mut added = 0usize;
                for m in memberships {
                    if o.find_worker(&m.worker).is_none() {
                        bail!("unknown worker: {}", m.worker);
                    }
                    if o.attach(m.worker, m.clinic) {
                        added += 1;
                    }
                }
                Ok(added)
            })?;
            println!("{added} membership(s) added");
            0
        }
        Commands::SetAvailability {
            org,
            worker,
            month,
            days,
        } => {
            let window = parse_month(&month)?;
            let selected = days
                .iter()
                .map(|raw| parse_day(raw.trim()))
                .collect::<Result<BTreeSet<_>>>()?;
            let worker = WorkerId::new(worker);
            let (name, off) = storage.update(&OrganizationId::new(org), |o| {
                let target = o
                    .workers
                    .iter_mut()
                    .find(|w| w.id == worker)
                    .with_context(|| format!("unknown worker: {worker}"))?;
                let off = target.set_month_availability(&window, &selected)?;
                Ok((target.display_name(), off))
            })?;
            println!("{name}: {off} unavailable day(s) in {window}");
            0
        }
        Commands::DeleteClinic { org, clinic } => {
            let clinic = ClinicId::new(clinic);
            let removed =
                storage.update(&OrganizationId::new(org), |o| Ok(o.remove_clinic(&clinic)))?;
            println!("clinic {clinic} deleted with {removed} shift(s)");
            0
        }
        Commands::Generate {
            org,
            now,
            seed,
            dry_run,
            out_json,
            out_csv,
        } => {
            let org = OrganizationId::new(org);
            let clock = clock_for(now.as_deref())?;
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_os_rng(),
            };
            let opts = AssignOptions::default();
            let snapshot = storage.organization(&org)?;

            let result = if dry_run {
                service::generate_schedule(&storage, &org, clock.as_ref(), &mut rng, &opts)
            } else {
                let _lock = LockFile::acquire(storage.path(), &org)?;
                let locks = OrgLocks::new();
                service::generate_and_persist(
                    &storage,
                    &locks,
                    &org,
                    clock.as_ref(),
                    &mut rng,
                    &opts,
                )
            };

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err) => {
                    if let SchedError::Persistence { outcome, .. } = &err {
                        export(&snapshot, outcome, out_json.as_deref(), out_csv.as_deref())?;
                    }
                    return Err(err.into());
                }
            };
            export(&snapshot, &outcome, out_json.as_deref(), out_csv.as_deref())?;

            println!(
                "{} assignment(s) for {}{}",
                outcome.assignments.len(),
                outcome.month,
                if dry_run { " (dry run)" } else { "" }
            );
            // créneaux non pourvus : signalés, mais la génération a réussi
            if !outcome.unfilled.is_empty() {
                eprintln!("{} slot(s) left unfilled", outcome.unfilled.len());
                for slot in &outcome.unfilled {
                    let name = snapshot
                        .find_shift(&slot.shift)
                        .map(|s| s.name.as_str())
                        .unwrap_or("?");
                    eprintln!("  {} | {}", slot.date, name);
                }
            }
            0
        }
        Commands::List { org, month } => {
            let org = storage.organization(&OrganizationId::new(org))?;
            let window = month.as_deref().map(parse_month).transpose()?;
            let mut rows: Vec<&Assignment> = org
                .assignments
                .iter()
                .filter(|a| window.map_or(true, |m| m.contains(a.date)))
                .collect();
            rows.sort_by_key(|a| a.date);
            for a in rows {
                let shift = org.find_shift(&a.shift);
                let worker = org
                    .find_worker(&a.worker)
                    .map(|w| w.display_name())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{} | {} ({}) | {}",
                    a.date,
                    shift.map(|s| s.name.as_str()).unwrap_or("?"),
                    shift.map(|s| s.clinic.as_str()).unwrap_or("?"),
                    worker
                );
            }
            0
        }
        Commands::Check { org, month, report } => {
            let org = storage.organization(&OrganizationId::new(org))?;
            let scheduler = Scheduler::from_organization(&org);
            let (list, prior): (Vec<Assignment>, Vec<BoundaryAssignment>) =
                match month.as_deref().map(parse_month).transpose()? {
                    Some(m) => {
                        let list = org
                            .assignments
                            .iter()
                            .filter(|a| m.contains(a.date))
                            .cloned()
                            .collect::<Vec<_>>();
                        let prior = m
                            .boundary_range()
                            .map(|(start, end)| {
                                org.assignments_between(start, end)
                                    .into_iter()
                                    .map(BoundaryAssignment::from)
                                    .collect::<Vec<_>>()
                            })
                            .unwrap_or_default();
                        (list, prior)
                    }
                    None => (org.assignments.clone(), Vec::new()),
                };

            let violations = scheduler.audit(&list, &prior);
            if violations.is_empty() {
                println!("OK: no violations");
                0
            } else {
                eprintln!("Found {} violation(s)", violations.len());
                if let Some(path) = report {
                    let mut w = csv::Writer::from_path(path)?;
                    w.write_record(["date", "worker_id", "shift_id", "kind"])?;
                    for v in &violations {
                        let date = v.date.to_string();
                        w.write_record([
                            date.as_str(),
                            v.worker.as_str(),
                            v.shift.as_str(),
                            v.kind.as_str(),
                        ])?;
                    }
                    w.flush()?;
                }
                2
            }
        }
        Commands::Clear { org, now, all } => {
            let org = OrganizationId::new(org);
            let clock = clock_for(now.as_deref())?;
            let _lock = LockFile::acquire(storage.path(), &org)?;
            let locks = OrgLocks::new();
            let removed = if all {
                service::clear_all(&storage, &locks, &org)?
            } else {
                service::clear_month(&storage, &locks, &org, clock.as_ref())?
            };
            println!("{removed} assignment(s) removed");
            0
        }
    };

    std::process::exit(code);
}
