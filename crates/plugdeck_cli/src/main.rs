//! `plugdeck` command line entry point.
//!
//! # Responsibility
//! - Load the built-in apps and any selected entry point group.
//! - Synchronize discovered plugins into a SQLite plugin table.
//! - Report the frontend toolchain the settings select.

use clap::{Args, Parser, Subcommand};
use log::error;
use plugdeck_core::db::open_db;
use plugdeck_core::frontend::{
    current_engine, current_package_manager, frontend_settings, SelectionError, FRONTEND_DIR,
};
use plugdeck_core::{
    builtin_apps, core_version, default_log_level, init_logging, init_stderr_logging, ping,
    sync_hooks, sync_plugins, PluginListQuery, PluginManager, PluginRepository, PluginSettings,
    Registry, SqlitePluginRepository,
};
use semver::Version;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Plugin discovery and bookkeeping for plugdeck hosts.
#[derive(Parser, Debug)]
#[command(name = "plugdeck", version, about, long_about = None)]
struct Cli {
    /// Write rolling log files into this absolute directory instead of stderr.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// One of trace, debug, info, warn, error.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the core library is linked.
    Ping,
    /// Synchronize discovered plugins into the plugin table.
    Sync(SyncArgs),
    /// List the plugins stored in the plugin table.
    List(ListArgs),
    /// Show the selected package manager and frontend engine.
    Frontend(FrontendArgs),
}

#[derive(Args, Debug)]
struct SyncArgs {
    /// SQLite database file.
    #[arg(long)]
    db: PathBuf,

    /// Entry point group to search for plugins.
    #[arg(long)]
    group: Option<String>,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// SQLite database file.
    #[arg(long)]
    db: PathBuf,

    /// Include hidden plugins.
    #[arg(long)]
    all: bool,
}

#[derive(Args, Debug)]
struct FrontendArgs {
    /// TOML file with a `[PLUGDECK]` table.
    #[arg(long)]
    config: Option<PathBuf>,
}

type CliResult = Result<(), Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = setup_logging(&cli) {
        eprintln!("plugdeck: {err}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Ping => {
            println!("plugdeck_core ping={}", ping());
            println!("plugdeck_core version={}", core_version());
            Ok(())
        }
        Commands::Sync(args) => run_sync(&args),
        Commands::List(args) => run_list(&args),
        Commands::Frontend(args) => run_frontend(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("plugdeck: {err}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(cli: &Cli) -> CliResult {
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    match &cli.log_dir {
        Some(dir) => init_logging(level, &dir.to_string_lossy())?,
        None => init_stderr_logging(level)?,
    }
    Ok(())
}

fn load_registry(group: Option<&str>) -> Result<(Registry, PluginManager), Box<dyn Error>> {
    let registry = Registry::new();
    let mut manager = PluginManager::new();
    for app in builtin_apps() {
        manager.install(app);
    }
    if let Some(group) = group {
        manager.find_plugins(group)?;
    }
    manager.load(&registry)?;
    Ok((registry, manager))
}

fn run_sync(args: &SyncArgs) -> CliResult {
    let (registry, manager) = load_registry(args.group.as_deref())?;
    let host_version = Version::parse(core_version())?;
    let mut conn = open_db(&args.db)?;

    let report = sync_plugins(
        &mut conn,
        &manager.plugins(),
        &sync_hooks(&registry),
        &host_version,
    )?;

    if report.is_noop() {
        println!("plugins up to date");
    }
    for name in &report.created {
        println!("created  {name}");
    }
    for name in &report.updated {
        let marker = if report.upgraded.contains(name) { " (upgraded)" } else { "" };
        println!("updated  {name}{marker}");
    }
    for name in &report.removed {
        println!("removed  {name}");
    }
    Ok(())
}

fn run_list(args: &ListArgs) -> CliResult {
    let conn = open_db(&args.db)?;
    let query = PluginListQuery {
        visible_only: !args.all,
        ..PluginListQuery::default()
    };
    for record in SqlitePluginRepository::new(&conn).list_plugins(&query)? {
        let state = if record.enabled { "enabled" } else { "disabled" };
        println!(
            "{:<32} {:<10} {:<9} {}",
            record.name, record.version, state, record.verbose_name
        );
    }
    Ok(())
}

fn run_frontend(args: &FrontendArgs) -> CliResult {
    let (registry, _) = load_registry(None)?;
    let settings = load_frontend_settings(args.config.as_deref())?;

    let manager = current_package_manager(&settings, &registry)?;
    println!("package manager: {}", manager.name());

    match current_engine(&settings, &registry) {
        Ok(engine) => {
            let frontend_dir = settings.get_str(FRONTEND_DIR)?.unwrap_or("frontend");
            println!("engine: {}", engine.name());
            for command in engine.init_commands(frontend_dir, manager.as_ref()) {
                println!("  {}", command.join(" "));
            }
        }
        Err(SelectionError::NotConfigured { key }) => println!("engine: not configured ({key})"),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn load_frontend_settings(config: Option<&Path>) -> Result<PluginSettings, Box<dyn Error>> {
    let mut settings = frontend_settings();
    if let Some(path) = config {
        settings.load_toml_file(path)?;
    }
    Ok(settings)
}
