#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tether_core::{CascadeError, ErrorCode, ProjectStore, StoreError};
use tether_core::config::{load_user_config, resolve_config};

use cmd::Session;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tether: tasks and waits with cascading dependencies",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format (pretty, text, json).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Data directory holding project files (overrides TETHER_DIR).
    #[arg(long, global = true, value_name = "PATH")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Projects",
        about = "Create a project",
        long_about = "Create an empty project file named after its prefix.",
        after_help = "EXAMPLES:\n    # Create a project with prefix OPS\n    tt init ops \"Operations\"\n\n    # Emit machine-readable output\n    tt init ops \"Operations\" --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Items",
        about = "Add a task or a wait",
        long_about = "Add a task or a wait to a project, optionally blocked by existing items.",
        after_help = "EXAMPLES:\n    # Add a task\n    tt add task ops \"Rotate keys\" -p 1\n\n    # Add a task that completes itself when its blockers resolve\n    tt add task ops \"Release\" --blocked-by OPS-001 --auto-complete\n\n    # Add a manual wait\n    tt add wait ops \"Vendor signed the contract?\"\n\n    # Add a time-based wait\n    tt add wait ops --after 2026-04-01T09:00:00Z"
    )]
    Add(cmd::add::AddArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show a project's items",
        long_about = "List every item in a project with its effective state.",
        after_help = "EXAMPLES:\n    # Show a project\n    tt status ops\n\n    # Tab-separated output for scripts\n    tt status ops --format text"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show an item's dependencies",
        long_about = "Show what blocks an item and what it blocks.",
        after_help = "EXAMPLES:\n    # Direct neighbors\n    tt deps OPS-003\n\n    # Everything upstream and downstream\n    tt deps OPS-003 --transitive"
    )]
    Deps(cmd::deps::DepsArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Complete items",
        long_about = "Complete one or more items and cascade to their dependents.",
        after_help = "EXAMPLES:\n    # Complete a task\n    tt done OPS-001\n\n    # Resolve a wait with an answer\n    tt done OPS-2W --resolution \"signed\"\n\n    # Complete despite open blockers\n    tt done OPS-004 --force"
    )]
    Done(cmd::done::DoneArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Drop an item",
        long_about = "Drop an item. Items with dependents need --drop-deps or --remove-deps.",
        after_help = "EXAMPLES:\n    # Drop with a reason\n    tt drop OPS-003 -r \"superseded\"\n\n    # Drop along with everything that depends on it\n    tt drop OPS-003 --drop-deps\n\n    # Drop and release its dependents\n    tt drop OPS-003 --remove-deps"
    )]
    Drop(cmd::drop::DropArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Reopen a done or dropped item",
        long_about = "Return a done or dropped item to open. Dependents are not changed.",
        after_help = "EXAMPLES:\n    # Reopen an item\n    tt reopen OPS-001"
    )]
    Reopen(cmd::reopen::ReopenArgs),

    #[command(
        next_help_heading = "Dependencies",
        about = "Add blockers to an item",
        long_about = "Add blocking edges. Rejected edges (unknown item, other project, cycle) leave the project unchanged.",
        after_help = "EXAMPLES:\n    # OPS-004 waits on OPS-001 and a wait\n    tt block OPS-004 --by OPS-001 --by OPS-2W"
    )]
    Block(cmd::block::BlockArgs),

    #[command(
        next_help_heading = "Dependencies",
        about = "Remove blockers from an item",
        long_about = "Remove blocking edges and cascade to anything that becomes unblocked.",
        after_help = "EXAMPLES:\n    # Remove one blocker\n    tt unblock OPS-004 --by OPS-001"
    )]
    Unblock(cmd::block::UnblockArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Resolve due time-based waits",
        long_about = "Resolve every time-based wait whose instant has passed and cascade.",
        after_help = "EXAMPLES:\n    # Sweep every project\n    tt check\n\n    # Sweep one project\n    tt check ops --resolution \"elapsed\""
    )]
    Check(cmd::check::CheckArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Check projects for structural defects",
        long_about = "Report orphan blockers, cross-project edges, duplicate IDs and cycles.",
        after_help = "EXAMPLES:\n    # Validate every project\n    tt validate\n\n    # Emit machine-readable output\n    tt validate ops --json"
    )]
    Validate(cmd::validate::ValidateArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TETHER_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "tether=debug,tt=debug,info"
        } else {
            "tether=info,tt=info,warn"
        })
    });

    let format = env::var("TETHER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let user = match load_user_config() {
        Ok(user) => user,
        Err(err) => {
            let mode = output::resolve_output_mode(cli.format, cli.json, None);
            output::render_error(
                mode,
                &CliError::coded(format!("{err:#}"), ErrorCode::ConfigParseError),
            )?;
            std::process::exit(1);
        }
    };
    let output = output::resolve_output_mode(cli.format, cli.json, user.output.as_deref());
    let config = resolve_config(user, cli.dir.as_deref())?;

    let session = Session {
        store: ProjectStore::new(config.data_dir),
        engine: config.engine,
        sweep_on_load: config.user.checks.sweep_on_load,
        output,
    };

    let command_result = match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, &session),
        Commands::Add(args) => cmd::add::run_add(args, &session),
        Commands::Status(args) => cmd::status::run_status(args, &session),
        Commands::Deps(args) => cmd::deps::run_deps(args, &session),
        Commands::Done(args) => cmd::done::run_done(args, &session),
        Commands::Drop(args) => cmd::drop::run_drop(args, &session),
        Commands::Reopen(args) => cmd::reopen::run_reopen(args, &session),
        Commands::Block(args) => cmd::block::run_block(args, &session),
        Commands::Unblock(args) => cmd::block::run_unblock(args, &session),
        Commands::Check(args) => cmd::check::run_check(args, &session),
        Commands::Validate(args) => cmd::validate::run_validate(args, &session),
    };

    if let Err(err) = command_result {
        // Engine and store errors were already rendered on stderr.
        if already_reported(&err) {
            std::process::exit(1);
        }
        if output.is_json() {
            output::render_error(output, &CliError::new(format!("{err:#}")))?;
            std::process::exit(1);
        }
        return Err(err);
    }
    Ok(())
}

fn already_reported(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CascadeError>().is_some() || err.downcast_ref::<StoreError>().is_some()
}
