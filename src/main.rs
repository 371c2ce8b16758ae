use clap::Parser;
use color_eyre::Result;
use habitrack::{
    Config, Database, Problem, Profile,
    cli::{Cli, CliError, Commands},
};
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    // Structured logs go to stderr; RUST_LOG overrides the default level
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    // Load configuration with the determined profile
    let config = Config::load_with_profile(profile)?;

    // Initialize database
    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;

    // Owner id stands in for an authenticated user
    let owner_id = cli.owner.unwrap_or(config.default_owner_id);

    // Dispatch to appropriate command handler. Any failure that reaches
    // this boundary leaves as a problem document, never as a bare error.
    if let Err(err) = run_command(cli.command, owner_id, &db, &config) {
        match err {
            // Service failures were already rendered by the handler
            CliError::OperationFailed(_) => {}
            other => {
                let problem = Problem::from_unexpected(&other, "/");
                eprintln!("{}", problem.to_json());
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_command(
    command: Commands,
    owner_id: i64,
    db: &Database,
    config: &Config,
) -> Result<(), CliError> {
    match command {
        Commands::Add {
            name,
            description,
            frequency,
            target,
        } => habitrack::cli::handle_add(owner_id, name, description, frequency, target, db, config),
        Commands::List { all } => habitrack::cli::handle_list(owner_id, all, db, config),
        Commands::Track {
            habit_id,
            date,
            count,
            notes,
        } => habitrack::cli::handle_track(owner_id, habit_id, date, count, notes, db, config),
        Commands::Stats { habit_id, period } => {
            habitrack::cli::handle_stats(owner_id, habit_id, period, db, config)
        }
        Commands::Update {
            habit_id,
            name,
            description,
            frequency,
            target,
            activate,
            deactivate,
        } => habitrack::cli::handle_update(
            owner_id,
            habit_id,
            name,
            description,
            frequency,
            target,
            activate,
            deactivate,
            db,
            config,
        ),
    }
}
