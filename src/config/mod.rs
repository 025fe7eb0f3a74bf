use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Maximum upload size in bytes (5 MB)
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 5 * 1024 * 1024;

/// Web service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Key used to sign session tokens (default: "dev-key-change-me")
    pub secret_key: String,

    /// SQLite connection URL (default: "sqlite://app.db?mode=rwc")
    pub database_url: String,

    /// Directory holding uploaded files (default: "uploads")
    pub upload_folder: PathBuf,

    /// Maximum request/file size in bytes (default: 5 MB)
    pub max_content_length: usize,

    /// Listen address (default: 0.0.0.0:5000)
    pub bind_addr: SocketAddr,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            secret_key: "dev-key-change-me".to_string(),
            database_url: sqlite_url("app.db"),
            upload_folder: PathBuf::from("uploads"),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        // Ephemeral deployments only have a writable /tmp
        let (database_url, upload_folder) = if env::var("VERCEL").is_ok() {
            (sqlite_url("/tmp/app.db"), PathBuf::from("/tmp/uploads"))
        } else {
            (
                env::var("DATABASE_URL").unwrap_or(default.database_url),
                env::var("UPLOAD_FOLDER")
                    .map(PathBuf::from)
                    .unwrap_or(default.upload_folder),
            )
        };

        Self {
            secret_key: env::var("SECRET_KEY")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(default.secret_key),

            database_url,
            upload_folder,

            max_content_length: env::var("MAX_CONTENT_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_content_length),

            bind_addr: env::var("BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.bind_addr),
        }
    }

    /// Config for tests: everything lives under `root`
    pub fn development(root: &std::path::Path) -> Self {
        Self {
            secret_key: "development-secret".to_string(),
            database_url: sqlite_url(&root.join("app.db").to_string_lossy()),
            upload_folder: root.join("uploads"),
            ..Self::default()
        }
    }
}

/// Builds a read-write-create SQLite URL for a database file
pub fn sqlite_url(path: &str) -> String {
    format!("sqlite://{}?mode=rwc", path)
}

/// Lifecycle supervisor configuration
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Live database file (default: "app.db")
    pub database_path: PathBuf,

    /// Pristine snapshot copied over the live database on reset (default: "app_pristine.db")
    pub backup_path: PathBuf,

    /// Upload directory emptied on reset (default: "uploads")
    pub upload_folder: PathBuf,

    /// Time the child runs between resets (default: 24 hours)
    pub reset_interval: Duration,

    /// Time granted to the child after SIGTERM before it is killed (default: 10 s)
    pub shutdown_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("app.db"),
            backup_path: PathBuf::from("app_pristine.db"),
            upload_folder: PathBuf::from("uploads"),
            reset_interval: Duration::from_secs(24 * 60 * 60),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl SupervisorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            database_path: env::var("APP_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.database_path),

            backup_path: env::var("BACKUP_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.backup_path),

            upload_folder: env::var("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(default.upload_folder),

            reset_interval: env::var("RESET_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.reset_interval),

            shutdown_grace: env::var("SHUTDOWN_GRACE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.shutdown_grace),
        }
    }
}
