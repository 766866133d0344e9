//! Corefile operator service
//!
//! Keeps two Corefiles in the state store: the deployed one and a pending one
//! that collects edits. `update` promotes pending to deployed and restarts the
//! workload.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::commands::{self, Command, NoChange};
use crate::application::parser::{default_params, Params, DEFAULT_CONVERSIONS, GENERIC_DEFAULTS};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt, StoredState};
use crate::config::Settings;
use crate::domain::{Corefile, DomainError, Node, Record, ZoneFile};
use crate::infrastructure::traits::{FileSystem, StateStore, Workload};

/// Result text of `update` when pending and deployed are equal.
pub const UNCHANGED: &str = "Corefile not changed, nothing to do";

/// Status reported by the operator after a lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    Active(String),
    Maintenance(String),
    Blocked(String),
}

impl UnitStatus {
    pub fn message(&self) -> &str {
        match self {
            UnitStatus::Active(m) | UnitStatus::Maintenance(m) | UnitStatus::Blocked(m) => m,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, UnitStatus::Blocked(_))
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            UnitStatus::Active(_) => "active",
            UnitStatus::Maintenance(_) => "maintenance",
            UnitStatus::Blocked(_) => "blocked",
        };
        write!(f, "{}: {}", kind, self.message())
    }
}

/// Outcome of `update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Unchanged,
    /// Status transitions, in order.
    Deployed(Vec<UnitStatus>),
}

/// Which of the two stored Corefiles to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    Current,
    Pending,
}

impl Revision {
    pub fn from_current(current: bool) -> Self {
        if current {
            Revision::Current
        } else {
            Revision::Pending
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Current => f.write_str("current"),
            Revision::Pending => f.write_str("new"),
        }
    }
}

/// Operator logic over the stored Corefiles and zone files.
pub struct CorefileService {
    fs: Arc<dyn FileSystem>,
    store: Arc<dyn StateStore>,
    workload: Arc<dyn Workload>,
    settings: Arc<Settings>,
}

impl CorefileService {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn StateStore>,
        workload: Arc<dyn Workload>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            fs,
            store,
            workload,
            settings,
        }
    }

    // ============================================================
    // State
    // ============================================================

    /// Stored state, or the default state if nothing was saved yet.
    pub fn state(&self) -> ApplicationResult<StoredState> {
        let state = self
            .store
            .load()
            .with_path_context("load state", &self.settings.state_file)?;
        Ok(state.unwrap_or_else(|| {
            debug!("no stored state, using defaults");
            StoredState::default()
        }))
    }

    fn save(&self, state: &StoredState) -> ApplicationResult<()> {
        self.store
            .save(state)
            .with_path_context("save state", &self.settings.state_file)
    }

    pub fn corefile(&self, revision: Revision) -> ApplicationResult<Corefile> {
        let state = self.state()?;
        let plain = match revision {
            Revision::Current => &state.corefile,
            Revision::Pending => &state.new_corefile,
        };
        Ok(Corefile::from_plain(plain)?)
    }

    fn ensure_not_empty(corefile: &Corefile) -> ApplicationResult<()> {
        if corefile.is_empty() {
            return Err(DomainError::EmptyCorefile.into());
        }
        Ok(())
    }

    // ============================================================
    // Lifecycle
    // ============================================================

    /// Build the Corefile from the configured script, deploy it and start the workload.
    ///
    /// A missing script, or a script that fails on any line, falls back to the
    /// default Corefile. Read failures are returned. Returns the status
    /// transitions, in order.
    #[instrument(level = "debug", skip(self))]
    pub fn start(&self) -> ApplicationResult<Vec<UnitStatus>> {
        let mut statuses = Vec::new();
        let mut state = self.state()?;
        let mut corefile = Corefile::from_plain(&state.corefile)?;

        match self.script_path() {
            None => {
                statuses.push(UnitStatus::Maintenance(
                    "Resource 'script-file' not found. Using default Corefile".to_string(),
                ));
                corefile = Corefile::default();
            }
            Some(path) => {
                let outcome = commands::exec_file(&mut corefile, self.fs.as_ref(), &path)
                    .and_then(|_| Self::ensure_not_empty(&corefile));
                match outcome {
                    Ok(()) => {}
                    Err(e @ ApplicationError::OperationFailed { .. }) => return Err(e),
                    Err(e) => {
                        warn!("script rejected: {}", e);
                        statuses.push(UnitStatus::Maintenance(format!(
                            "Errors occurred while reading actions file: {}. Using default Corefile",
                            e
                        )));
                        corefile = Corefile::default();
                    }
                }
            }
        }

        state.new_corefile = corefile.to_plain();

        // Deployed revision only moves once the push went through.
        if let Some(blocked) = self.deploy(&corefile, &state) {
            self.save(&state)?;
            statuses.push(blocked);
            return Ok(statuses);
        }
        state.corefile = state.new_corefile.clone();
        state.deployed_zonefiles = state.zonefiles.clone();
        self.save(&state)?;

        self.workload
            .start()
            .with_context("start workload")?;

        info!("workload started");
        statuses.push(UnitStatus::Active("Ready".to_string()));
        Ok(statuses)
    }

    /// Configured script, if it exists.
    fn script_path(&self) -> Option<PathBuf> {
        let path = self.settings.script_file.as_ref()?;
        if self.fs.exists(path) {
            Some(path.clone())
        } else {
            debug!("script {} not found", path.display());
            None
        }
    }

    /// Push the Corefile and every zone file; a push failure blocks the unit.
    fn deploy(&self, corefile: &Corefile, state: &StoredState) -> Option<UnitStatus> {
        let path = &self.settings.corefile_path;
        if let Err(e) = self.workload.push(path, &corefile.render()) {
            warn!("push failed: {}", e);
            return Some(UnitStatus::Blocked(format!(
                "Failed to create {}: {}",
                path.display(),
                e
            )));
        }

        let Some(dir) = &self.settings.zonefile_dir else {
            return None;
        };
        for (name, plain) in &state.zonefiles {
            let target = zonefile_path(dir, name);
            let rendered = ZoneFile::from_plain(plain).render();
            if let Err(e) = self.workload.push(&target, &rendered) {
                warn!("push failed: {}", e);
                return Some(UnitStatus::Blocked(format!(
                    "Failed to create {}: {}",
                    target.display(),
                    e
                )));
            }
        }
        None
    }

    /// Promote the pending Corefile and zone files, then restart the workload.
    ///
    /// A blocked push leaves both pending, so the next `update` retries it.
    #[instrument(level = "debug", skip(self))]
    pub fn update(&self) -> ApplicationResult<UpdateOutcome> {
        let mut state = self.state()?;
        let pending = Corefile::from_plain(&state.new_corefile)?;
        let current = Corefile::from_plain(&state.corefile)?;

        if pending == current && !state.has_pending_zonefiles() {
            info!("{}", UNCHANGED);
            return Ok(UpdateOutcome::Unchanged);
        }
        Self::ensure_not_empty(&pending)?;

        let mut statuses = vec![UnitStatus::Maintenance("Updating Corefile".to_string())];
        if let Some(blocked) = self.deploy(&pending, &state) {
            statuses.push(blocked);
            return Ok(UpdateOutcome::Deployed(statuses));
        }

        state.corefile = state.new_corefile.clone();
        state.deployed_zonefiles = state.zonefiles.clone();
        self.save(&state)?;

        info!("restarting workload");
        self.workload
            .stop()
            .with_context("stop workload")?;
        self.workload
            .start()
            .with_context("start workload")?;

        statuses.push(UnitStatus::Active("Ready".to_string()));
        Ok(UpdateOutcome::Deployed(statuses))
    }

    // ============================================================
    // Corefile edits
    // ============================================================

    /// Run one command against the pending Corefile and persist it.
    ///
    /// Errors leave the stored state untouched.
    #[instrument(level = "debug", skip(self, command, params), fields(command = %command))]
    pub fn apply(&self, command: Command, mut params: Params) -> ApplicationResult<String> {
        let mut state = self.state()?;
        let mut corefile = Corefile::from_plain(&state.new_corefile)?;

        default_params(&mut params, &GENERIC_DEFAULTS, &DEFAULT_CONVERSIONS)?;
        let result = command.apply(&mut corefile, &mut params)?;
        Self::ensure_not_empty(&corefile)?;

        state.new_corefile = corefile.to_plain();
        self.save(&state)?;
        Ok(result)
    }

    /// Run a script against the pending Corefile; persisted only if every line succeeds.
    pub fn exec_script(&self, path: &Path) -> ApplicationResult<usize> {
        let mut state = self.state()?;
        let mut corefile = Corefile::from_plain(&state.new_corefile)?;

        let executed = commands::exec_file(&mut corefile, self.fs.as_ref(), path)?;
        Self::ensure_not_empty(&corefile)?;

        state.new_corefile = corefile.to_plain();
        self.save(&state)?;
        Ok(executed)
    }

    pub fn print_corefile(&self, revision: Revision) -> ApplicationResult<String> {
        debug!("outputting {} Corefile", revision);
        Ok(self.corefile(revision)?.render())
    }

    pub fn print_zone(&self, zone: &str, revision: Revision) -> ApplicationResult<String> {
        debug!("outputting zone from {} Corefile", revision);
        let corefile = self.corefile(revision)?;
        corefile
            .zone(zone)
            .map(|z| z.render())
            .ok_or_else(|| ApplicationError::validation(format!("Could not find zone {}", zone)))
    }

    // ============================================================
    // Zone files
    // ============================================================

    pub fn print_zonefile(&self, name: &str) -> ApplicationResult<String> {
        let state = self.state()?;
        state
            .zonefiles
            .get(name)
            .map(|plain| ZoneFile::from_plain(plain).render())
            .ok_or_else(|| ApplicationError::validation(format!("Zone file {} not found", name)))
    }

    /// Add a record to `zonefile`, creating the zone file on demand.
    ///
    /// The change stays pending until the next `update`.
    pub fn add_record(
        &self,
        zonefile: &str,
        name: Option<&str>,
        record: Record,
        replace: bool,
    ) -> ApplicationResult<String> {
        let mut state = self.state()?;
        let mut zone = state
            .zonefiles
            .get(zonefile)
            .map(ZoneFile::from_plain)
            .unwrap_or_default();

        let result = zone
            .add_record_from_instance(record, name, replace)
            .map(Record::render)
            .unwrap_or_else(|| NoChange::NotReplaced.to_string());

        state.zonefiles.insert(zonefile.to_string(), zone.to_plain());
        self.save(&state)?;
        Ok(result)
    }

    pub fn remove_record(&self, zonefile: &str, name: &str) -> ApplicationResult<String> {
        let mut state = self.state()?;
        let Some(plain) = state.zonefiles.get(zonefile) else {
            return Err(ApplicationError::validation(format!(
                "Zone file {} not found",
                zonefile
            )));
        };
        let mut zone = ZoneFile::from_plain(plain);

        let Some(removed) = zone.remove_record(name) else {
            return Ok(NoChange::NotFound.to_string());
        };
        state.zonefiles.insert(zonefile.to_string(), zone.to_plain());
        self.save(&state)?;
        Ok(removed.render())
    }
}

/// Location of a deployed zone file, `db.<name>` under `dir`.
pub fn zonefile_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("db.{}", name))
}
