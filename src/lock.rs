//! Verrous consultatifs par organisation : deux générations concurrentes
//! entrelaceraient leurs suppressions/insertions.
use crate::model::OrganizationId;
use anyhow::Context;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Registre de verrous en mémoire, un mutex par organisation.
#[derive(Debug, Default)]
pub struct OrgLocks {
    inner: Mutex<HashMap<OrganizationId, Arc<Mutex<()>>>>,
}

impl OrgLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, org: &OrganizationId) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(org.clone()).or_default())
    }

    /// Exécute `f` en tenant le verrou de `org`.
    pub fn with_lock<T, F: FnOnce() -> T>(&self, org: &OrganizationId, f: F) -> T {
        let handle = self.handle(org);
        let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }
}

/// Verrou inter-processus : fichier créé en exclusif, supprimé au drop.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    _file: File,
}

impl LockFile {
    /// Prend le verrou `<store>.<org>.lock` ou échoue s'il est déjà tenu.
    ///
    /// Un verrou laissé par un processus disparu (PID absent de `/proc`) est
    /// repris. Ailleurs qu'à Linux, supprimer le fichier à la main quand
    /// aucune génération ne tourne.
    pub fn acquire<P: AsRef<Path>>(store: P, org: &OrganizationId) -> anyhow::Result<Self> {
        let store = store.as_ref();
        let name = format!(
            "{}.{}.lock",
            store
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "roster".to_string()),
            org
        );
        let path = store.with_file_name(name);
        if is_stale(&path) {
            log_warn!(%org, path = %path.display(), "removing stale lock file");
            match fs::remove_file(&path) {
                Err(e) if e.kind() != ErrorKind::NotFound => {
                    return Err(e)
                        .with_context(|| format!("removing stale lock {}", path.display()));
                }
                _ => {}
            }
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| {
                format!(
                    "organization {org} is locked by another run ({}); \
                     delete this file if no run is in progress",
                    path.display()
                )
            })?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { path, _file: file })
    }
}

/// Verrou dont le PID ne correspond plus à aucun processus vivant.
fn is_stale(path: &Path) -> bool {
    let proc_root = Path::new("/proc/self");
    if !proc_root.exists() {
        return false;
    }
    let Ok(raw) = fs::read_to_string(path) else {
        return false;
    };
    match raw.trim().parse::<u32>() {
        Ok(pid) => !Path::new("/proc").join(pid.to_string()).exists(),
        // fichier vide : l'autre processus n'a peut-être pas encore écrit
        Err(_) => false,
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
