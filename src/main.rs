//! GeoDistro CLI Entry Point
//!
//! Provides the command-line interface for installing and checking the
//! geospatial distribution.
//!
//! # Usage
//!
//! ```bash
//! # Install everything into the default environment
//! geodistro install
//!
//! # Custom environment, no launcher, stream package-manager output
//! geodistro install --env-name gis --no-shortcuts -v
//!
//! # Check that the libraries import
//! geodistro verify --env-name gis
//!
//! # Remove the environment again
//! geodistro uninstall --env-name gis
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use dialoguer::Confirm;
use log::{error, info};

use geodistro::catalog::{catalog_to_yaml, load_catalog, CatalogError, PackageCatalog};
use geodistro::config::{InstallConfig, DEFAULT_ENV_NAME};
use geodistro::environment::{EnvironmentManager, PackageManager};
use geodistro::execution::{InstallError, InstallOrchestrator, SystemRunner};
use geodistro::verification::Verifier;
use geodistro::{APP_NAME, VERSION};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "geodistro",
    version,
    about = "One-click setup for geospatial libraries",
    long_about = None
)]
struct Cli {
    /// Stream package-manager output and enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install the complete geospatial distribution
    Install(InstallArgs),

    /// Verify that the expected libraries import
    Verify(VerifyArgs),

    /// Remove the distribution's environment
    Uninstall(UninstallArgs),

    /// Show what the distribution contains
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct InstallArgs {
    /// Environment name
    #[arg(long, default_value = DEFAULT_ENV_NAME, env = "GEO_DISTRO_ENV")]
    env_name: String,

    /// Skip creating the launcher shortcut
    #[arg(long)]
    no_shortcuts: bool,

    /// YAML catalog replacing the built-in package list
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Kill any single package-manager command after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Pause between categories in milliseconds
    #[arg(long, value_name = "MS")]
    pause_ms: Option<u64>,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Environment to check
    #[arg(long, default_value = DEFAULT_ENV_NAME, env = "GEO_DISTRO_ENV")]
    env_name: String,

    /// Print the results as JSON
    #[arg(long)]
    json: bool,

    /// Kill any single import probe after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Args, Debug)]
struct UninstallArgs {
    /// Environment to remove
    #[arg(long, default_value = DEFAULT_ENV_NAME, env = "GEO_DISTRO_ENV")]
    env_name: String,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Describe this YAML catalog instead of the built-in one
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Print the catalog as YAML (a template for --catalog)
    #[arg(long)]
    yaml: bool,

    /// List the packages of one category
    #[arg(long, value_name = "NAME", conflicts_with = "yaml")]
    category: Option<String>,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("One-click setup for geospatial libraries");
    println!();
}

/// Returns the catalog at `path`, or the built-in one.
fn resolve_catalog(path: Option<&Path>) -> Result<PackageCatalog, CatalogError> {
    match path {
        Some(path) => load_catalog(path),
        None => Ok(PackageCatalog::default()),
    }
}

/// Builds the run configuration shared by every subcommand.
fn base_config(verbose: bool, timeout: Option<u64>) -> InstallConfig {
    InstallConfig {
        verbose,
        command_timeout: timeout.map(Duration::from_secs),
        ..InstallConfig::default()
    }
}

fn print_manager_hint() {
    eprintln!("Conda/Mamba not found. Please install Miniconda or Anaconda first.");
    eprintln!("Download from: https://docs.conda.io/en/latest/miniconda.html");
}

/// Detects the package manager or explains how to get one.
fn require_manager(environments: &EnvironmentManager<'_>) -> Result<PackageManager, InstallError> {
    environments.detect_manager().cloned().ok_or_else(|| {
        print_manager_hint();
        InstallError::NoPackageManager(environments.candidates().to_vec())
    })
}

fn install(args: InstallArgs, verbose: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut config = base_config(verbose, args.timeout);
    if let Some(ms) = args.pause_ms {
        config.category_pause = Duration::from_millis(ms);
    }

    let catalog = resolve_catalog(args.catalog.as_deref())?;
    info!(
        "Catalog: {} categories, {} packages",
        catalog.len(),
        catalog.total_packages()
    );

    if let Some(limit) = config.command_timeout {
        info!("Command timeout: {:?}", limit);
    }

    let runner = SystemRunner::with_timeout(config.command_timeout);
    let orchestrator = InstallOrchestrator::new(&runner, &catalog, &config);

    let report = match orchestrator.install_all(&args.env_name, !args.no_shortcuts) {
        Ok(report) => report,
        Err(e @ InstallError::NoPackageManager(_)) => {
            print_manager_hint();
            return Err(e.into());
        }
        Err(e) => {
            error!("Installation aborted: {}", e);
            return Err(e.into());
        }
    };

    println!("{}", report);

    if config.verbose {
        println!("{}", report.timeline.chart());
    }

    Ok(ExitCode::SUCCESS)
}

fn verify(args: VerifyArgs, verbose: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = base_config(verbose, args.timeout);
    let runner = SystemRunner::with_timeout(config.command_timeout);
    let environments = EnvironmentManager::new(&runner, &config);
    let manager = require_manager(&environments)?;

    let report = Verifier::new(&runner, &manager, &args.env_name).verify_installation();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    Ok(if report.all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn uninstall(args: UninstallArgs, verbose: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Are you sure you want to remove the '{}' environment?",
                args.env_name
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Cancelled");
            return Ok(ExitCode::SUCCESS);
        }
    }

    let config = base_config(verbose, None);
    let runner = SystemRunner::new();
    let environments = EnvironmentManager::new(&runner, &config);
    require_manager(&environments)?;

    if environments.remove_environment(&args.env_name) {
        println!("{} Environment '{}' removed successfully", "✓".green(), args.env_name);
        Ok(ExitCode::SUCCESS)
    } else {
        Err(format!("Failed to remove environment '{}'", args.env_name).into())
    }
}

fn show_info(args: InfoArgs, verbose: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let catalog = resolve_catalog(args.catalog.as_deref())?;

    if args.yaml {
        print!("{}", catalog_to_yaml(&catalog)?);
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(name) = args.category.as_deref() {
        let category = catalog
            .get(name)
            .ok_or_else(|| format!("Unknown category '{}'", name))?;
        println!(
            "{} ({} packages via {}):",
            category.name.bold(),
            category.len(),
            category.install_method
        );
        for package in &category.packages {
            println!("  {} {}", "•".cyan(), package);
        }
        return Ok(ExitCode::SUCCESS);
    }

    println!("A one-click installation of geospatial libraries,");
    println!("similar to the Anaconda distribution.");
    println!();
    println!("Includes:");
    for category in catalog.categories() {
        println!(
            "  {} {:<20} {:>2} packages via {}",
            "•".cyan(),
            category.name,
            category.len(),
            category.install_method
        );
    }
    println!();

    let config = base_config(verbose, None);
    let runner = SystemRunner::new();
    let environments = EnvironmentManager::new(&runner, &config);
    match environments.detect_manager() {
        Some(manager) => println!("Package manager: {}", manager),
        None => println!("Package manager: {}", "not found".yellow()),
    }
    println!("Shortcuts directory: {}", config.shortcuts_dir.display());

    Ok(ExitCode::SUCCESS)
}

/// Main application entry point.
fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    setup_logging(cli.verbose);

    let json_output = matches!(&cli.command, Commands::Verify(args) if args.json)
        || matches!(&cli.command, Commands::Info(args) if args.yaml);
    if !json_output {
        print_banner();
    }

    match cli.command {
        Commands::Install(args) => install(args, cli.verbose),
        Commands::Verify(args) => verify(args, cli.verbose),
        Commands::Uninstall(args) => uninstall(args, cli.verbose),
        Commands::Info(args) => show_info(args, cli.verbose),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
