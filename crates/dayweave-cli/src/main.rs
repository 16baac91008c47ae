use clap::{Parser, Subcommand};
use dayweave_core::calendar::{EventId, UserId};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "dayweave", version, about = "Dayweave calendar and travel-time planner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User management
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Event management
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Backlog task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Travel segments between events
    Travel {
        #[command(subcommand)]
        action: commands::travel::TravelAction,
    },
    /// Ranked focus slots for a day
    Focus {
        /// User ID
        user: UserId,
        /// Day (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Committed load against the daily budget
    Load {
        /// User ID
        user: UserId,
        /// Day (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Cancel an event and schedule a backlog task in its place
    Reshuffle {
        /// Event ID
        event: EventId,
    },
    /// Audit a user's timeline
    Check {
        /// User ID
        user: UserId,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Recalculate travel segments for every user
    Reconcile {
        #[command(subcommand)]
        action: commands::reconcile::ReconcileAction,
    },
}

fn main() {
    // stdout carries the JSON output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dayweave=info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::User { action } => commands::user::run(action),
        Commands::Event { action } => commands::event::run(action),
        Commands::Task { action } => commands::task::run(action),
        Commands::Travel { action } => commands::travel::run(action),
        Commands::Focus { user, date } => commands::focus::run(user, date),
        Commands::Load { user, date } => commands::load::run(user, date),
        Commands::Reshuffle { event } => commands::reshuffle::run(event),
        Commands::Check { user } => commands::check::run(user),
        Commands::Config { action } => commands::config::run(action),
        Commands::Reconcile { action } => commands::reconcile::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
