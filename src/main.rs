mod console;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use clipcontrol_guard::api::{ApiClient, Backend};
use clipcontrol_guard::checkin::CheckInDriver;
use clipcontrol_guard::config::{self, Config};
use clipcontrol_guard::error::CheckInError;
use clipcontrol_guard::model::BenefitCategory;
use clipcontrol_guard::session::{CheckInContext, SessionStore, StoredSession};
use clipcontrol_guard::stats::StatsPoller;
use clipcontrol_guard::token;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "clipcontrol-guard", version, about = "ClipControl guard check-in client")]
struct Cli {
    /// Config file (defaults to config.json in the app data dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in as a guard
    Login {
        #[arg(long)]
        username: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in guard
    Whoami,
    /// Show or select the benefit being delivered
    Benefit { category: Option<BenefitCategory> },
    /// Show the active delivery period
    Period,
    /// Today's deliveries by this guard
    Stats {
        /// Keep refreshing
        #[arg(long)]
        watch: bool,
    },
    /// Scan, photograph and record deliveries
    CheckIn {
        /// Notes attached to each delivery
        #[arg(long)]
        notes: Option<String>,
        /// Stop after one recorded delivery
        #[arg(long)]
        once: bool,
    },
    /// Decode a token string without contacting the server
    Decode { raw: String },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

// Server errors carry text meant for the guard; show that rather than the
// internal description
fn shown(e: CheckInError) -> anyhow::Error {
    anyhow!(e.user_message())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Works offline and without a config
    if let Command::Decode { raw } = &cli.command {
        return print_token(raw);
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let store = SessionStore::in_dir(config::data_dir()?);
    let client = ApiClient::new(config.api_base_url.clone()).map_err(shown)?;
    info!(api = %config.api_base_url, "starting");

    match cli.command {
        Command::Login { username } => {
            console::sign_in::login(&client, &store, username)?;
        }
        Command::Logout => {
            store.clear().context("Failed to clear session")?;
            println!("Logged out");
        }
        Command::Whoami => {
            let session = require_session(&store)?;
            let client = client.with_session(&session);
            let guard = &session.guard;
            println!("{} ({}) - {}", guard.full_name, guard.username, guard.role.to_uppercase());
            let branch = match guard.branch_id {
                Some(branch_id) => match client.branches() {
                    Ok(branches) => branches
                        .into_iter()
                        .find(|b| b.id == branch_id)
                        .map(|b| b.name)
                        .unwrap_or_else(|| format!("#{}", branch_id)),
                    Err(e) => {
                        tracing::warn!("could not load branches: {}", e);
                        "not available".to_owned()
                    }
                },
                None => "none".to_owned(),
            };
            println!("Branch:  {}", branch);
            println!("Benefit: {}", session.benefit);
        }
        Command::Benefit { category } => match category {
            Some(category) => {
                store
                    .save_benefit(category)
                    .context("Failed to save benefit selection")?;
                println!("Benefit set to {}", category);
            }
            None => {
                let session = require_session(&store)?;
                for category in BenefitCategory::ALL {
                    let marker = if category == session.benefit { "*" } else { " " };
                    println!("{} {}", marker, category);
                }
            }
        },
        Command::Period => {
            let session = require_session(&store)?;
            let period = client.with_session(&session).active_period().map_err(shown)?;
            println!("{} (#{})", period.name, period.id);
            println!("{} to {}", period.starts_on, period.ends_on);
            if let Some(description) = &period.description {
                println!("{}", description);
            }
        }
        Command::Stats { watch } => {
            let session = require_session(&store)?;
            let client = client.with_session(&session);
            let guard_id = session.guard.guard_id;
            if !watch {
                let stats = client.guard_stats(guard_id).map_err(shown)?;
                console::print_stats(&stats);
                return Ok(());
            }
            let (_poller, updates) = StatsPoller::spawn(
                Duration::from_secs(config.stats_refresh_secs),
                move || client.guard_stats(guard_id),
            );
            for update in updates {
                match update {
                    Ok(stats) => {
                        println!();
                        console::print_stats(&stats);
                    }
                    Err(e) => eprintln!("Could not refresh statistics: {}", e.user_message()),
                }
            }
        }
        Command::CheckIn { notes, once } => {
            let session = require_session(&store)?;
            let client = client.with_session(&session);
            let period = client
                .active_period()
                .map_err(shown)
                .context("Could not load the active period")?;
            let context = CheckInContext::new(&session, period, config.device_id.clone());
            let scanner = config.scanner.build()?;
            let camera = config.camera.build()?;
            let mut driver = CheckInDriver::new(
                context,
                client,
                scanner,
                camera,
                config.camera.capture_config(),
            );
            console::check_in::run(&mut driver, notes, once)?;
        }
        Command::Decode { raw } => print_token(&raw)?,
    }

    Ok(())
}

fn print_token(raw: &str) -> Result<()> {
    let token = token::decode(raw).map_err(|e| anyhow!("{}", e))?;
    println!("scheme:       {}", token.scheme());
    println!("secret:       {}", token.secret());
    println!("auxiliary id: {}", token.auxiliary_id());
    Ok(())
}

fn require_session(store: &SessionStore) -> Result<StoredSession> {
    store
        .load()
        .context("Failed to read session")?
        .ok_or_else(|| anyhow!("not logged in; run `clipcontrol-guard login` first"))
}
