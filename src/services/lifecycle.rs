//! Runs the web service as a child process and periodically restores its
//! persisted state from a pristine snapshot.
//!
//! Each cycle is a two-state machine: **Running** until the reset timer fires
//! or an interrupt arrives, then **Resetting** (stop child, restore database,
//! empty uploads) before the next cycle relaunches the child. An interrupt
//! stops the child and ends the loop without a reset.

use crate::config::SupervisorConfig;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::fs;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

/// SQLite side files that must not outlive the database they belong to
const SQLITE_SIDECARS: &[&str] = &["-wal", "-shm", "-journal"];

/// Starts the supervised process
pub trait Launcher: Send + Sync {
    fn launch(&self) -> std::io::Result<Child>;
}

/// Launches an executable with fixed arguments
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Launcher for CommandLauncher {
    fn launch(&self) -> std::io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .spawn()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Timer fired; the child was stopped and state restored
    Reset,
    /// Interrupt received; the child was stopped, state left as is
    Stopped,
    /// The child could not be started
    LaunchFailed,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResetReport {
    pub database_restored: bool,
    pub removed_entries: usize,
    pub failures: usize,
}

enum Wake {
    Interrupt,
    Timer,
    ChildExited(std::io::Result<ExitStatus>),
}

pub struct Supervisor<L> {
    config: SupervisorConfig,
    launcher: L,
    shutdown: watch::Receiver<bool>,
}

impl<L: Launcher> Supervisor<L> {
    pub fn new(config: SupervisorConfig, launcher: L, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            config,
            launcher,
            shutdown,
        }
    }

    /// Cycles until an interrupt arrives
    pub async fn run(mut self) {
        info!(
            "🚀 Supervisor started (reset every {:?}, grace {:?})",
            self.config.reset_interval, self.config.shutdown_grace
        );

        loop {
            match self.run_cycle().await {
                CycleOutcome::Reset => info!("🔁 Restarting cycle..."),
                CycleOutcome::LaunchFailed => {
                    let retry = self.config.shutdown_grace;
                    tokio::select! {
                        _ = interrupted(&mut self.shutdown) => break,
                        _ = sleep(retry) => info!("🔁 Retrying launch..."),
                    }
                }
                CycleOutcome::Stopped => break,
            }
        }

        info!("🛑 Supervisor stopped");
    }

    /// One Running phase followed, when the timer fires, by a Resetting phase
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if *self.shutdown.borrow() {
            return CycleOutcome::Stopped;
        }

        info!("▶️  Launching web service...");
        let mut child = match self.launcher.launch() {
            Ok(child) => child,
            Err(e) => {
                error!("❌ Failed to launch web service: {}", e);
                return CycleOutcome::LaunchFailed;
            }
        };

        info!(
            "✅ Web service running (PID: {}). Next reset in {:?}",
            child.id().map(|p| p.to_string()).unwrap_or_default(),
            self.config.reset_interval
        );

        let timer = sleep(self.config.reset_interval);
        tokio::pin!(timer);
        let mut exited = false;

        loop {
            let wake = tokio::select! {
                _ = interrupted(&mut self.shutdown) => Wake::Interrupt,
                _ = &mut timer => Wake::Timer,
                status = child.wait(), if !exited => Wake::ChildExited(status),
            };

            match wake {
                Wake::Interrupt => {
                    info!("⌨️  Manual interrupt received. Stopping web service...");
                    stop_child(&mut child, self.config.shutdown_grace).await;
                    return CycleOutcome::Stopped;
                }
                Wake::Timer => break,
                Wake::ChildExited(status) => {
                    exited = true;
                    match status {
                        Ok(status) => warn!("⚠️  Web service exited early with {}", status),
                        Err(e) => warn!("⚠️  Lost track of web service: {}", e),
                    }
                }
            }
        }

        info!("⏰ Reset interval reached. Stopping web service...");
        stop_child(&mut child, self.config.shutdown_grace).await;

        let report = reset_environment(&self.config).await;
        info!(
            "🧹 Reset finished: database restored={}, removed {} upload entries, {} failures",
            report.database_restored, report.removed_entries, report.failures
        );

        CycleOutcome::Reset
    }
}

/// Resolves once shutdown is requested. A dropped sender means nobody can
/// ask anymore, so that never resolves.
async fn interrupted(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Graceful terminate, then kill once `grace` has passed
pub async fn stop_child(child: &mut Child, grace: Duration) {
    match child.try_wait() {
        Ok(Some(status)) => {
            info!("Web service already exited ({})", status);
            return;
        }
        Ok(None) => {}
        Err(e) => warn!("Could not poll web service status: {}", e),
    }

    request_terminate(child).await;

    match timeout(grace, child.wait()).await {
        Ok(Ok(status)) => info!("Web service stopped ({})", status),
        Ok(Err(e)) => warn!("Waiting for web service failed: {}", e),
        Err(_) => {
            warn!("💀 Web service did not stop within {:?}, forcing kill...", grace);
            if let Err(e) = child.kill().await {
                error!("Failed to kill web service: {}", e);
            }
        }
    }
}

#[cfg(unix)]
async fn request_terminate(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };

    match Command::new("kill")
        .arg("-TERM")
        .arg(pid.to_string())
        .status()
        .await
    {
        Ok(status) if status.success() => {}
        Ok(status) => warn!("kill -TERM {} exited with {}", pid, status),
        Err(e) => warn!("Could not send SIGTERM to {}: {}", pid, e),
    }
}

#[cfg(not(unix))]
async fn request_terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!("Could not terminate web service: {}", e);
    }
}

/// Restores the database from the pristine backup and empties the upload
/// folder. Every failed step is logged and skipped.
pub async fn reset_environment(config: &SupervisorConfig) -> ResetReport {
    info!("🧹 Starting maintenance...");
    let mut report = ResetReport::default();

    // 1. Remove the live database and its side files
    remove_database(&config.database_path, &mut report).await;

    // 2. Copy the pristine snapshot into place
    match fs::try_exists(&config.backup_path).await {
        Ok(true) => match fs::copy(&config.backup_path, &config.database_path).await {
            Ok(_) => {
                info!(
                    "Restored {} from {}",
                    config.database_path.display(),
                    config.backup_path.display()
                );
                report.database_restored = true;
            }
            Err(e) => {
                error!("Error copying database: {}", e);
                report.failures += 1;
            }
        },
        Ok(false) => {
            error!(
                "🚨 ALERT: {} does not exist. Database could not be restored.",
                config.backup_path.display()
            );
            report.failures += 1;
        }
        Err(e) => {
            error!("Could not check {}: {}", config.backup_path.display(), e);
            report.failures += 1;
        }
    }

    // 3. Empty the upload folder
    clear_directory(&config.upload_folder, &mut report).await;

    info!("✅ Maintenance completed.");
    report
}

async fn remove_database(path: &Path, report: &mut ResetReport) {
    match fs::remove_file(path).await {
        Ok(()) => info!("Removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => info!("{} does not exist.", path.display()),
        Err(e) => {
            error!("Error removing {}: {}", path.display(), e);
            report.failures += 1;
        }
    }

    for suffix in SQLITE_SIDECARS {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(suffix);
        match fs::remove_file(&sidecar).await {
            Ok(()) => info!("Removed {}", Path::new(&sidecar).display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                error!("Error removing {}: {}", Path::new(&sidecar).display(), e);
                report.failures += 1;
            }
        }
    }
}

async fn clear_directory(dir: &Path, report: &mut ResetReport) {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("Folder {} does not exist. Creating it...", dir.display());
            if let Err(e) = fs::create_dir_all(dir).await {
                error!("Error creating {}: {}", dir.display(), e);
                report.failures += 1;
            }
            return;
        }
        Err(e) => {
            error!("Error reading {}: {}", dir.display(), e);
            report.failures += 1;
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                error!("Error listing {}: {}", dir.display(), e);
                report.failures += 1;
                break;
            }
        };

        let path = entry.path();
        // file_type does not follow symlinks, so links are unlinked, never traversed
        let result = match entry.file_type().await {
            Ok(kind) if kind.is_dir() => fs::remove_dir_all(&path).await,
            Ok(_) => fs::remove_file(&path).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("Deleted {}", path.display());
                report.removed_entries += 1;
            }
            Err(e) => {
                error!("Error deleting {}: {}", path.display(), e);
                report.failures += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(root: &Path) -> SupervisorConfig {
        SupervisorConfig {
            database_path: root.join("app.db"),
            backup_path: root.join("app_pristine.db"),
            upload_folder: root.join("uploads"),
            reset_interval: Duration::from_millis(200),
            shutdown_grace: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_reset_restores_database_and_empties_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.database_path, b"live").unwrap();
        std::fs::write(dir.path().join("app.db-wal"), b"stale wal").unwrap();
        std::fs::write(&config.backup_path, b"pristine").unwrap();
        std::fs::create_dir_all(config.upload_folder.join("nested")).unwrap();
        std::fs::write(config.upload_folder.join("a.txt"), b"a").unwrap();
        std::fs::write(config.upload_folder.join("nested").join("b.txt"), b"b").unwrap();

        let report = reset_environment(&config).await;

        assert_eq!(
            report,
            ResetReport {
                database_restored: true,
                removed_entries: 2,
                failures: 0
            }
        );
        assert_eq!(std::fs::read(&config.database_path).unwrap(), b"pristine");
        assert!(!dir.path().join("app.db-wal").exists());
        assert!(config.upload_folder.is_dir());
        assert_eq!(std::fs::read_dir(&config.upload_folder).unwrap().count(), 0);
        // The backup itself is never consumed
        assert_eq!(std::fs::read(&config.backup_path).unwrap(), b"pristine");
    }

    #[tokio::test]
    async fn test_reset_without_backup_still_clears_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.database_path, b"live").unwrap();
        std::fs::create_dir_all(&config.upload_folder).unwrap();
        std::fs::write(config.upload_folder.join("a.txt"), b"a").unwrap();

        let report = reset_environment(&config).await;

        assert!(!report.database_restored);
        assert_eq!(report.failures, 1);
        assert_eq!(report.removed_entries, 1);
        assert!(!config.database_path.exists());
        assert_eq!(std::fs::read_dir(&config.upload_folder).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_reset_creates_missing_upload_folder() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.backup_path, b"pristine").unwrap();

        let report = reset_environment(&config).await;

        assert!(report.database_restored);
        assert_eq!(report.failures, 0);
        assert!(config.upload_folder.is_dir());
        assert_eq!(std::fs::read(&config.database_path).unwrap(), b"pristine");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reset_unlinks_symlinks_without_following_them() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::write(&config.backup_path, b"pristine").unwrap();

        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("keep.txt"), b"keep").unwrap();

        std::fs::create_dir_all(&config.upload_folder).unwrap();
        let link = config.upload_folder.join("linked");
        std::os::unix::fs::symlink(&outside, &link).unwrap();

        let report = reset_environment(&config).await;

        assert_eq!(report.removed_entries, 1);
        assert_eq!(report.failures, 0);
        assert!(std::fs::symlink_metadata(&link).is_err());
        assert_eq!(std::fs::read(outside.join("keep.txt")).unwrap(), b"keep");
    }

    struct FailingLauncher;

    impl Launcher for FailingLauncher {
        fn launch(&self) -> std::io::Result<Child> {
            Err(std::io::Error::new(ErrorKind::NotFound, "no such binary"))
        }
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (_tx, rx) = watch::channel(false);
        let mut supervisor = Supervisor::new(config_in(dir.path()), FailingLauncher, rx);

        assert_eq!(supervisor.run_cycle().await, CycleOutcome::LaunchFailed);
    }

    #[tokio::test]
    async fn test_pending_interrupt_skips_launch() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let mut supervisor = Supervisor::new(config_in(dir.path()), FailingLauncher, rx);

        assert_eq!(supervisor.run_cycle().await, CycleOutcome::Stopped);
    }
}
