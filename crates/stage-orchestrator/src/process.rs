//! Locating and launching the controlled process
//!
//! The controlled application is identified by the work directory on its
//! command line: locating means scanning the process table for a live
//! process whose arguments mention that directory, launching means spawning
//! the executable with the directory passed explicitly. The
//! [`ProcessManager`] trait is the seam the driver tests fake out.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use stage_core::LaunchError;

/// Executable names considered a plausible controlled-process binary
const DEFAULT_EXECUTABLE_NAMES: &[&str] = &["app-editor"];

/// A located or launched controlled process
#[derive(Debug)]
pub struct ProcessHandle {
    pub pid: u32,
    /// Known only when we launched the process ourselves
    pub executable: Option<PathBuf>,
    /// Present when launched; lets the driver wait for exit directly
    pub child: Option<Child>,
}

impl ProcessHandle {
    /// Handle for a process found already running
    pub fn located(pid: u32) -> Self {
        Self {
            pid,
            executable: None,
            child: None,
        }
    }
}

/// Finds and starts controlled processes
pub trait ProcessManager: Send + Sync {
    /// Find a live process whose command line mentions the work directory.
    ///
    /// When several match, the most recently started wins.
    fn locate(&self, work_directory: &Path) -> Option<ProcessHandle>;

    /// Spawn the executable against the work directory
    fn launch(
        &self,
        executable: &Path,
        work_directory: &Path,
    ) -> Result<ProcessHandle, LaunchError>;

    /// Whether the process is still alive
    fn is_alive(&self, pid: u32) -> bool;
}

/// [`ProcessManager`] backed by the operating system's process table
pub struct SystemProcessManager {
    system: Mutex<System>,
    executable_names: Vec<String>,
}

impl SystemProcessManager {
    pub fn new() -> Self {
        Self::with_executable_names(
            DEFAULT_EXECUTABLE_NAMES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        )
    }

    /// A manager that only attaches to processes whose executable name
    /// matches one of the given names (compared case-insensitively)
    pub fn with_executable_names(executable_names: Vec<String>) -> Self {
        Self {
            system: Mutex::new(System::new()),
            executable_names: executable_names
                .into_iter()
                .map(|name| name.to_ascii_lowercase())
                .collect(),
        }
    }

    fn plausible_name(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.executable_names
            .iter()
            .any(|candidate| name.contains(candidate))
    }
}

impl Default for SystemProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a path for cross-platform command-line comparison
fn normalize(path: &str) -> String {
    path.replace('\\', "/").to_ascii_lowercase()
}

impl ProcessManager for SystemProcessManager {
    fn locate(&self, work_directory: &Path) -> Option<ProcessHandle> {
        let needle = normalize(&work_directory.to_string_lossy());
        let own_pid = std::process::id();

        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        // Command lines are only populated when asked for explicitly
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new().with_cmd(UpdateKind::Always),
        );

        let found = system
            .processes()
            .iter()
            .filter(|(pid, process)| {
                pid.as_u32() != own_pid
                    && self.plausible_name(&process.name().to_string_lossy())
                    && process
                        .cmd()
                        .iter()
                        .any(|arg| normalize(&arg.to_string_lossy()).contains(&needle))
            })
            .max_by_key(|(_, process)| process.start_time())
            .map(|(pid, _)| pid.as_u32());

        if let Some(pid) = found {
            tracing::debug!(pid, work_directory = %needle, "Located running process");
            Some(ProcessHandle::located(pid))
        } else {
            None
        }
    }

    fn launch(
        &self,
        executable: &Path,
        work_directory: &Path,
    ) -> Result<ProcessHandle, LaunchError> {
        if !executable.exists() {
            return Err(LaunchError::ExecutableNotFound(executable.to_path_buf()));
        }

        let child = Command::new(executable)
            .arg("-projectPath")
            .arg(work_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(LaunchError::SpawnFailed)?;

        let pid = child.id();
        tracing::info!(pid, executable = %executable.display(), "Launched process");

        Ok(ProcessHandle {
            pid,
            executable: Some(executable.to_path_buf()),
            child: Some(child),
        })
    }

    fn is_alive(&self, pid: u32) -> bool {
        let target = Pid::from_u32(pid);
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
        system.process(target).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A long-lived child whose command line carries the work directory
    /// as a trailing argument
    #[cfg(unix)]
    fn spawn_marked_sleeper(work_directory: &Path) -> Child {
        let child = Command::new("sh")
            .arg("-c")
            .arg("sleep 30")
            .arg(work_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn sleeper");
        // Let the process table catch up
        std::thread::sleep(std::time::Duration::from_millis(100));
        child
    }

    #[test]
    fn test_launch_missing_executable() {
        let manager = SystemProcessManager::new();
        let result = manager.launch(
            Path::new("/nonexistent/app-editor"),
            Path::new("/tmp/project"),
        );
        assert!(matches!(result, Err(LaunchError::ExecutableNotFound(_))));
    }

    #[test]
    fn test_own_process_is_alive() {
        let manager = SystemProcessManager::new();
        assert!(manager.is_alive(std::process::id()));
    }

    #[test]
    fn test_dead_pid_is_not_alive() {
        let manager = SystemProcessManager::new();
        // PIDs near the max are effectively never allocated in tests
        assert!(!manager.is_alive(u32::MAX - 1));
    }

    #[test]
    fn test_normalize_separators_and_case() {
        assert_eq!(normalize(r"C:\Work\Project"), "c:/work/project");
        assert_eq!(normalize("/srv/Project"), "/srv/project");
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_finds_process_mentioning_work_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut child = spawn_marked_sleeper(dir.path());

        let manager = SystemProcessManager::with_executable_names(vec!["sh".to_string()]);
        let located = manager.locate(dir.path());

        let _ = child.kill();
        let _ = child.wait();

        let handle = located.expect("sleeper should be located by its command line");
        assert_eq!(handle.pid, child.id());
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_rejects_implausible_executable_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut child = spawn_marked_sleeper(dir.path());

        // The sleeper mentions the directory, but `sh` is not a plausible
        // controlled-process binary under the default name set
        let manager = SystemProcessManager::new();
        let located = manager.locate(dir.path());

        let _ = child.kill();
        let _ = child.wait();

        assert!(located.is_none());
    }

    #[test]
    fn test_locate_skips_own_process() {
        // Even a directory the test binary's own command line could mention
        // must never resolve to the orchestrator itself.
        let manager = SystemProcessManager::new();
        let dir = format!("/definitely-not-a-real-dir-{}", std::process::id());
        assert!(manager.locate(Path::new(&dir)).is_none());
    }
}
