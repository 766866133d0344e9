//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::application::StoredState;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Run a command with arguments.
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output>;
}

/// Persisted state store, initialized by the caller on first access.
pub trait StateStore: Send + Sync {
    /// Load the state, `None` if nothing was saved yet.
    fn load(&self) -> io::Result<Option<StoredState>>;

    fn save(&self, state: &StoredState) -> io::Result<()>;
}

/// The managed DNS server process.
pub trait Workload: Send + Sync {
    /// Write rendered configuration where the server reads it.
    fn push(&self, path: &Path, content: &str) -> io::Result<()>;

    fn start(&self) -> io::Result<()>;

    fn stop(&self) -> io::Result<()>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

/// Real command runner implementation.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        std::process::Command::new(cmd).args(args).output()
    }
}

/// State kept as a TOML document on disk.
pub struct TomlStateStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl TomlStateStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for TomlStateStore {
    fn load(&self) -> io::Result<Option<StoredState>> {
        if !self.fs.exists(&self.path) {
            debug!("no state at {}", self.path.display());
            return Ok(None);
        }
        let content = self.fs.read_to_string(&self.path)?;
        toml::from_str(&content)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn save(&self, state: &StoredState) -> io::Result<()> {
        let content = toml::to_string_pretty(state)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.fs.ensure_parent(&self.path)?;
        self.fs.write(&self.path, &content)
    }
}

/// Process-local state, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<StoredState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StoredState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

fn poisoned<T>(_: T) -> io::Error {
    io::Error::new(io::ErrorKind::Other, "state lock poisoned")
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> io::Result<Option<StoredState>> {
        Ok(self.state.lock().map_err(poisoned)?.clone())
    }

    fn save(&self, state: &StoredState) -> io::Result<()> {
        *self.state.lock().map_err(poisoned)? = Some(state.clone());
        Ok(())
    }
}

/// Workload driven by configured shell commands.
///
/// An empty command means the step is skipped.
pub struct ProcessWorkload {
    fs: Arc<dyn FileSystem>,
    cmd: Arc<dyn CommandRunner>,
    start_command: Vec<String>,
    stop_command: Vec<String>,
}

impl ProcessWorkload {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
        start_command: Vec<String>,
        stop_command: Vec<String>,
    ) -> Self {
        Self {
            fs,
            cmd,
            start_command,
            stop_command,
        }
    }

    fn run(&self, argv: &[String]) -> io::Result<()> {
        let Some((program, rest)) = argv.split_first() else {
            debug!("no command configured, skipping");
            return Ok(());
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        debug!("running {} {:?}", program, args);

        let output = self.cmd.run(program, &args)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "'{}' exited with {}: {}",
                    program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ))
        }
    }
}

impl Workload for ProcessWorkload {
    fn push(&self, path: &Path, content: &str) -> io::Result<()> {
        self.fs.ensure_parent(path)?;
        self.fs.write(path, content)
    }

    fn start(&self) -> io::Result<()> {
        self.run(&self.start_command)
    }

    fn stop(&self) -> io::Result<()> {
        self.run(&self.stop_command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn given_missing_file_when_loading_state_then_none() {
        let temp = TempDir::new().unwrap();
        let store = TomlStateStore::new(Arc::new(RealFileSystem), temp.path().join("state.toml"));

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn given_saved_state_when_loading_then_same_state() {
        let temp = TempDir::new().unwrap();
        let store = TomlStateStore::new(
            Arc::new(RealFileSystem),
            temp.path().join("nested").join("state.toml"),
        );
        let state = StoredState::default();

        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap(), Some(state));
    }

    #[test]
    fn given_empty_commands_when_starting_workload_then_noop() {
        let workload = ProcessWorkload::new(
            Arc::new(RealFileSystem),
            Arc::new(RealCommandRunner),
            vec![],
            vec![],
        );
        assert!(workload.start().is_ok());
        assert!(workload.stop().is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn given_failing_command_when_starting_workload_then_error() {
        let workload = ProcessWorkload::new(
            Arc::new(RealFileSystem),
            Arc::new(RealCommandRunner),
            vec!["false".to_string()],
            vec![],
        );
        assert!(workload.start().is_err());
    }
}
