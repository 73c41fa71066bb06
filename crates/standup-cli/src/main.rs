mod cmd;
mod output;
mod root;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, report::ReportSubcommand, roster::RosterSubcommand,
    runs::RunsSubcommand,
};
use standup_core::schedule_run::RunKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "standup",
    about = "Daily standup collection with timezone-aware reminders and escalation",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .standup/)
    #[arg(long, global = true, env = "STANDUP_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .standup/ with a default config and an empty roster
    Init {
        /// Team name written to config.yaml
        #[arg(long, default_value = "team")]
        team: String,
        /// IANA timezone for the daily schedule
        #[arg(long, default_value = "UTC")]
        timezone: String,
    },

    /// Run the scheduler daemon and the dashboard API
    Serve {
        #[arg(long, default_value_t = 3150)]
        port: u16,
    },

    /// Execute one run now: prompt, reminder:<slot> or weekly_summary
    Run {
        kind: RunKind,
        /// Business date (default: today in the configured timezone)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Re-run even if the run already completed or was skipped
        #[arg(long)]
        force: bool,
        /// Print what would be sent without sending or recording anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show triggers, missing members and escalations for a date
    Status {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Inspect schedule runs
    Runs {
        #[command(subcommand)]
        subcommand: RunsSubcommand,
    },

    /// Manage the member roster
    Roster {
        #[command(subcommand)]
        subcommand: RosterSubcommand,
    },

    /// Submit and list reports
    Report {
        #[command(subcommand)]
        subcommand: ReportSubcommand,
    },

    /// Check whether a date is a working day
    Calendar {
        /// Date to check (default: today in the configured timezone)
        date: Option<NaiveDate>,
    },

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } | Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { team, timezone } => cmd::init::run(&root, &team, &timezone, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
        Commands::Run {
            kind,
            date,
            force,
            dry_run,
        } => cmd::run::run(&root, kind, date, force, dry_run, cli.json),
        Commands::Status { date } => cmd::status::run(&root, date, cli.json),
        Commands::Runs { subcommand } => cmd::runs::run(&root, subcommand, cli.json),
        Commands::Roster { subcommand } => cmd::roster::run(&root, subcommand, cli.json),
        Commands::Report { subcommand } => cmd::report::run(&root, subcommand, cli.json),
        Commands::Calendar { date } => cmd::calendar::run(&root, date, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
