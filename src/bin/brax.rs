//! BRAX engine CLI
//!
//! Command-line interface for configuring, simulating and inspecting the
//! BRAX collateral-ratio engine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::{style, Term};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use brax::core::config::EngineConfig;
use brax::protocol::controller::BraxInfo;
use brax::protocol::rebalancer::Adjustment;
use brax::sim::{Deployment, SimStep, Simulation, SimulationParams};
use brax::storage::Snapshot;
use brax::utils::constants::ONE_TOKEN;
use brax::utils::math::{format_units, to_decimal};

/// BRAX engine CLI - collateral ratio rebalancing for a BTC-pegged stablecoin
#[derive(Parser)]
#[command(name = "brax")]
#[command(author = "BRAX Team")]
#[command(version = brax::VERSION)]
#[command(about = "Command-line interface for the BRAX collateral-ratio engine", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the engine configuration file
    #[arg(short, long, env = "BRAX_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration without asking
        #[arg(short, long)]
        force: bool,
    },

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Warm up a standard deployment and print its state
    Status {
        /// Simulated start time (unix seconds)
        #[arg(long, default_value_t = 1_700_000_000)]
        start: u64,
    },

    /// Run a seeded random-walk simulation
    Simulate {
        /// Number of steps
        #[arg(short = 'n', long, default_value_t = 48)]
        steps: u64,

        /// RNG seed
        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        /// Largest swap, in basis points of the input reserve
        #[arg(short = 'b', long, default_value_t = 100)]
        max_swap_bps: u128,

        /// Simulated seconds per step
        #[arg(short = 't', long, default_value_t = 3_600)]
        step_secs: u64,

        /// Simulated start time (unix seconds)
        #[arg(long, default_value_t = 1_700_000_000)]
        start: u64,

        /// Print every n-th step
        #[arg(short, long, default_value_t = 1)]
        every: u64,

        /// Save the final deployment to this snapshot file
        #[arg(short = 'o', long)]
        snapshot: Option<PathBuf>,
    },

    /// Show the state stored in a snapshot
    Inspect {
        /// Snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let term = Term::stdout();

    if let Err(e) = run_command(&cli, &term) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init { force } => cmd_init(cli, *force, term),
        Commands::Config(cmd) => cmd_config(cli, cmd, term),
        Commands::Status { start } => cmd_status(cli, *start, term),
        Commands::Simulate {
            steps,
            seed,
            max_swap_bps,
            step_secs,
            start,
            every,
            snapshot,
        } => {
            let params = SimulationParams {
                seed: *seed,
                max_swap_bps: *max_swap_bps,
                step_secs: *step_secs,
            };
            cmd_simulate(cli, params, *steps, *start, *every, snapshot.as_deref(), term)
        }
        Commands::Inspect { snapshot } => cmd_inspect(snapshot, term),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_init(cli: &Cli, force: bool, term: &Term) -> anyhow::Result<()> {
    let _ = term.write_line(&format!(
        "{} Initializing BRAX configuration...",
        style("→").cyan()
    ));

    let path = config_path(cli);
    if path.exists() && !force {
        if !term.is_term() {
            anyhow::bail!(
                "Configuration already exists: {}. Use --force to overwrite.",
                path.display()
            );
        }
        let overwrite = Confirm::new()
            .with_prompt(format!("Overwrite {}?", path.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            let _ = term.write_line(&format!("{} Left unchanged", style("ℹ").blue()));
            return Ok(());
        }
    }

    EngineConfig::default().save(&path)?;

    let _ = term.write_line(&format!(
        "{} Configuration created at: {}",
        style("✓").green(),
        path.display()
    ));

    Ok(())
}

fn cmd_config(cli: &Cli, cmd: &ConfigCommands, term: &Term) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let config = load_config(cli)?;
            if cli.verbose {
                let path = config_path(cli);
                let source = if path.exists() { "file" } else { "defaults" };
                let _ = term.write_line(&format!(
                    "{} Source: {} ({})",
                    style("ℹ").blue(),
                    path.display(),
                    source
                ));
            }
            let _ = term.write_line(&serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Path => {
            let _ = term.write_line(&config_path(cli).display().to_string());
        }
    }
    Ok(())
}

fn cmd_status(cli: &Cli, start: u64, term: &Term) -> anyhow::Result<()> {
    let config = load_config(cli)?;

    let spinner = create_spinner("Deploying and warming up oracles...")?;
    let mut deployment = Deployment::standard(config, start)?;
    deployment.deploy_oracles()?;
    spinner.finish_and_clear();

    let now = deployment.now();
    let info = deployment.controller.brax_info(now)?;

    let _ = term.write_line(&format!("\n{}", style("BRAX Deployment").bold().underlined()));
    print_info(&info, term);
    let _ = term.write_line(&format!(
        "  Oracles:          BRAX {}  BXS {}",
        deployment.brax_oracle.short(),
        deployment.bxs_oracle.short()
    ));
    let _ = term.write_line(&format!(
        "  Pools:            {}",
        deployment.controller.registry().active().count()
    ));
    Ok(())
}

fn cmd_simulate(
    cli: &Cli,
    params: SimulationParams,
    steps: u64,
    start: u64,
    every: u64,
    snapshot: Option<&Path>,
    term: &Term,
) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let _ = term.write_line(&format!(
        "{} Simulating {} steps (seed {}, {}s per step)...",
        style("→").cyan(),
        steps,
        params.seed,
        params.step_secs
    ));

    let mut deployment = Deployment::standard(config, start)?;
    deployment.deploy_oracles()?;
    let mut sim = Simulation::new(deployment, params);

    let pb = ProgressBar::new(steps);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut rows = Vec::with_capacity(steps as usize);
    for _ in 0..steps {
        let row = sim.step()?;
        pb.set_message(format!("GCR {}%", ratio_percent(row.global_collateral_ratio)));
        pb.inc(1);
        rows.push(row);
    }
    pb.finish_and_clear();

    let _ = term.write_line(&format!(
        "\n{:>6}  {:>12}  {:>10}  {:<10}  {}",
        style("Step").bold(),
        style("BRAX (BTC)").bold(),
        style("GCR %").bold(),
        style("Move").bold(),
        style("Swap").bold()
    ));
    let every = every.max(1);
    for row in rows.iter().filter(|r| r.step % every == 0) {
        print_step(row, term);
    }

    let stats = sim.keeper().stats();
    let _ = term.write_line(&format!(
        "\n{} {} ticks: {} adjustments, {} in band, {} oracle updates, {} rejected",
        style("✓").green(),
        stats.ticks,
        stats.adjustments,
        stats.in_band,
        stats.oracle_updates,
        stats.failures
    ));

    let deployment = sim.into_deployment();
    match deployment.controller.brax_info(deployment.now()) {
        Ok(info) => print_info(&info, term),
        Err(e) => {
            let _ = term.write_line(&format!("{} Final state unreadable: {}", style("⚠").yellow(), e));
        }
    }

    if let Some(path) = snapshot {
        let snapshot = Snapshot::capture(&deployment);
        snapshot.save(path)?;
        let _ = term.write_line(&format!(
            "{} Snapshot saved to {} ({})",
            style("✓").green(),
            path.display(),
            &snapshot.state_hash()?[..16]
        ));
    }

    Ok(())
}

fn cmd_inspect(path: &Path, term: &Term) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("No snapshot found at {}", path.display());
    }
    let snapshot = Snapshot::load(path)?;
    let deployment = &snapshot.deployment;
    let controller = &deployment.controller;

    let _ = term.write_line(&format!("\n{}", style("Snapshot").bold().underlined()));
    let _ = term.write_line(&format!("  Version:          {}", snapshot.version));
    let _ = term.write_line(&format!("  Saved at:         {}", snapshot.saved_at.to_rfc3339()));
    let _ = term.write_line(&format!("  State hash:       {}", snapshot.state_hash()?));
    let _ = term.write_line(&format!("  Simulated time:   {}", deployment.now()));

    let _ = term.write_line(&format!("\n{}", style("Engine").bold().underlined()));
    match controller.brax_info(deployment.now()) {
        Ok(info) => print_info(&info, term),
        Err(e) => {
            let _ = term.write_line(&format!("{} Prices unavailable: {}", style("⚠").yellow(), e));
            let _ = term.write_line(&format!(
                "  Collateral ratio: {}%",
                ratio_percent(controller.global_collateral_ratio())
            ));
        }
    }
    let _ = term.write_line(&format!(
        "  Ratio paused:     {}",
        controller.collateral_ratio_paused()
    ));

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for recorded in controller.events().iter() {
        *counts.entry(recorded.event.event_type()).or_default() += 1;
    }
    let _ = term.write_line(&format!(
        "\n{} ({})",
        style("Events").bold().underlined(),
        controller.events().len()
    ));
    for (event_type, count) in counts {
        let _ = term.write_line(&format!("  {:<26} {}", event_type, count));
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(EngineConfig::default_path)
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let path = config_path(cli);
    let mut config = if path.exists() {
        EngineConfig::load(&path)?
    } else {
        EngineConfig::default()
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}

fn ratio_percent(ratio: u64) -> String {
    to_decimal(u128::from(ratio) * 100).round_dp(4).to_string()
}

fn print_info(info: &BraxInfo, term: &Term) {
    let _ = term.write_line(&format!("  BRAX price:       {} BTC", to_decimal(info.brax_price)));
    let _ = term.write_line(&format!("  BXS price:        {} BTC", to_decimal(info.bxs_price)));
    let _ = term.write_line(&format!(
        "  BRAX supply:      {}",
        format_units(info.total_supply, 18)
    ));
    let _ = term.write_line(&format!(
        "  Collateral ratio: {}%",
        ratio_percent(info.global_collateral_ratio)
    ));
    let _ = term.write_line(&format!(
        "  Collateral value: {} BTC",
        format_units(info.global_collateral_value, 18)
    ));
    if info.total_supply >= ONE_TOKEN {
        let backing = info.global_collateral_value.saturating_mul(100) / info.total_supply;
        let _ = term.write_line(&format!("  Backing:          ~{}%", backing));
    }
    let _ = term.write_line(&format!(
        "  Fees (mint/redeem): {}% / {}%",
        ratio_percent(info.minting_fee),
        ratio_percent(info.redemption_fee)
    ));
}

fn print_step(row: &SimStep, term: &Term) {
    let price = row
        .brax_price
        .map(|p| to_decimal(p).round_dp(6).to_string())
        .unwrap_or_else(|| "-".into());
    let movement = match row.adjustment {
        Some(Adjustment::Decreased { .. }) => style("down").red().to_string(),
        Some(Adjustment::Increased { .. }) => style("up").green().to_string(),
        Some(Adjustment::Unchanged { .. }) => style("hold").dim().to_string(),
        None => style("-").dim().to_string(),
    };
    let swap = row
        .swap
        .as_ref()
        .map(|(pair, amount)| format!("{} ({})", pair, amount))
        .unwrap_or_default();
    let _ = term.write_line(&format!(
        "{:>6}  {:>12}  {:>10}  {:<10}  {}",
        row.step,
        price,
        ratio_percent(row.global_collateral_ratio),
        movement,
        swap
    ));
}

fn create_spinner(message: &str) -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")?,
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(spinner)
}
