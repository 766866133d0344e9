//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::CorefileService;
use crate::config::Settings;
use crate::infrastructure::traits::{
    CommandRunner, FileSystem, ProcessWorkload, RealCommandRunner, RealFileSystem, StateStore,
    TomlStateStore, Workload,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Command runner abstraction
    pub cmd: Arc<dyn CommandRunner>,

    pub store: Arc<dyn StateStore>,

    pub workload: Arc<dyn Workload>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let cmd: Arc<dyn CommandRunner> = Arc::new(RealCommandRunner);
        let store = Arc::new(TomlStateStore::new(fs.clone(), settings.state_file.clone()));
        let workload = Arc::new(ProcessWorkload::new(
            fs.clone(),
            cmd.clone(),
            settings.workload.start_command.clone(),
            settings.workload.stop_command.clone(),
        ));
        Self::with_deps(settings, fs, cmd, store, workload)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
        store: Arc<dyn StateStore>,
        workload: Arc<dyn Workload>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            cmd,
            store,
            workload,
        }
    }

    pub fn corefile_service(&self) -> CorefileService {
        CorefileService::new(
            self.fs.clone(),
            self.store.clone(),
            self.workload.clone(),
            self.settings.clone(),
        )
    }
}
