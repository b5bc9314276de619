//! GatePass operator CLI
//!
//! Drives the access store and QR tokens from a terminal:
//! - Seeding and resetting the demo dataset
//! - Listing users, access levels and areas
//! - Login/logout against the local secret store
//! - Issuing and verifying QR tokens

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use gatepass_core::storage::{Database, FileSecretStore};
use gatepass_core::{AccessService, GatePassConfig};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(name = "gatepass")]
#[command(about = "Venue access records and signed QR tokens", long_about = None)]
struct Cli {
    /// Directory holding the database and secret store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON config file (defaults are used when absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema and seed demo users on first run
    Init,

    /// Delete every user and the stored seed, then reseed
    Reset,

    /// List active users
    Users {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List distinct access levels
    Levels,

    /// List distinct areas
    Areas,

    /// Log in by email
    Login {
        /// Account email
        email: String,
    },

    /// End the current session
    Logout {
        /// Also forget the remembered email
        #[arg(long)]
        forget: bool,
    },

    /// Show the user of the current session
    Whoami,

    /// Issue a QR token (defaults to the logged-in user)
    Issue {
        /// Account email
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Verify a QR token; reads stdin when no token is given
    Verify {
        /// Envelope JSON text, or `-` for stdin
        token: Option<String>,
    },

    /// Print this device's fingerprint
    Fingerprint,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &cli.data_dir {
        return Ok(dir.clone());
    }
    ProjectDirs::from("com", "GatePass", "GatePass")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .context("no home directory; pass --data-dir")
}

fn load_config(cli: &Cli) -> anyhow::Result<GatePassConfig> {
    match &cli.config {
        Some(path) => GatePassConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(GatePassConfig::default()),
    }
}

fn open_service(cli: &Cli) -> anyhow::Result<AccessService> {
    let dir = data_dir(cli)?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating data dir {}", dir.display()))?;
    debug!("Data dir: {}", dir.display());

    let db = Database::open(dir.join("gatepass.db")).context("opening access store")?;
    let secrets = Arc::new(FileSecretStore::new(dir.join("secrets.json")));
    Ok(AccessService::new(db, secrets, load_config(cli)?)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let service = open_service(&cli)?;
    if !matches!(cli.command, Commands::Init | Commands::Reset) {
        service.initialize().context("initializing access store")?;
    }
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Init => commands::init(&service, &mut out)?,
        Commands::Reset => commands::reset(&service, &mut out)?,
        Commands::Users { json } => commands::users(&service, json, &mut out)?,
        Commands::Levels => commands::levels(&service, &mut out)?,
        Commands::Areas => commands::areas(&service, &mut out)?,
        Commands::Login { email } => commands::login(&service, &email, &mut out)?,
        Commands::Logout { forget } => commands::logout(&service, forget, &mut out)?,
        Commands::Whoami => commands::whoami(&service, &mut out)?,
        Commands::Issue { email } => commands::issue(&service, email.as_deref(), &mut out)?,
        Commands::Verify { token } => {
            let text = match token.as_deref() {
                None | Some("-") => commands::read_stdin()?,
                Some(text) => text.to_string(),
            };
            if !commands::verify(&service, &text, &mut out)? {
                out.flush()?;
                std::process::exit(2);
            }
        }
        Commands::Fingerprint => commands::fingerprint(&service, &mut out)?,
    }

    Ok(())
}
