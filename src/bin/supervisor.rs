use clap::Parser;
use dotenvy::dotenv;
use rust_blog_backend::config::SupervisorConfig;
use rust_blog_backend::services::lifecycle::{CommandLauncher, Supervisor};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs the blog server and periodically resets its state")]
struct Args {
    /// Seconds between resets
    #[arg(long, env = "RESET_INTERVAL_SECS")]
    interval: Option<u64>,

    /// Seconds granted to the server after SIGTERM before it is killed
    #[arg(long, env = "SHUTDOWN_GRACE_SECS")]
    grace: Option<u64>,

    /// Live database file
    #[arg(long, env = "APP_DB_PATH")]
    database: Option<PathBuf>,

    /// Pristine database snapshot
    #[arg(long, env = "BACKUP_DB_PATH")]
    backup: Option<PathBuf>,

    /// Upload directory emptied on reset
    #[arg(long, env = "UPLOAD_FOLDER")]
    uploads: Option<PathBuf>,

    /// Command to supervise (default: the rust-blog-backend binary next to this one)
    #[arg(last = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "supervisor=info,rust_blog_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = SupervisorConfig::from_env();
    if let Some(secs) = args.interval {
        config.reset_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = args.grace {
        config.shutdown_grace = Duration::from_secs(secs);
    }
    if let Some(path) = args.database {
        config.database_path = path;
    }
    if let Some(path) = args.backup {
        config.backup_path = path;
    }
    if let Some(path) = args.uploads {
        config.upload_folder = path;
    }

    let launcher = match args.command.split_first() {
        Some((program, rest)) => CommandLauncher::new(program, rest.to_vec()),
        None => CommandLauncher::new(default_server_path()?, Vec::new()),
    };
    info!("🧭 Supervising {:?}", launcher);

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_interrupt().await;
        let _ = tx.send(true);
    });

    Supervisor::new(config, launcher, rx).run().await;
    Ok(())
}

fn default_server_path() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let name = format!("rust-blog-backend{}", std::env::consts::EXE_SUFFIX);
    Ok(exe.with_file_name(name))
}

async fn wait_for_interrupt() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
