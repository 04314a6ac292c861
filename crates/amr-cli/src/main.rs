mod scenario;
mod session;
mod simulate;

use std::path::{Path, PathBuf};

use amr_assets::Config;
use amr_core::{LocalOffset, OverlayRecipe};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::scenario::Scenario;
use crate::session::{Report, Session};

/// Overrides `loader.asset_dir` from the config file.
const ASSET_DIR_ENV: &str = "AMR_ASSET_DIR";

#[derive(Parser)]
#[command(name = "amr", about = "Augmented marker registry: replay and simulate tracker sessions")]
struct Cli {
    /// Config file (default: $AMR_CONFIG, then ./amr.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted tracker session
    Replay {
        /// Scenario file (.toml)
        scenario: PathBuf,

        /// Print the final registry snapshot as JSON
        #[arg(long)]
        json: bool,

        /// Asset directory (overrides config and $AMR_ASSET_DIR)
        #[arg(long)]
        assets: Option<PathBuf>,
    },

    /// Drive the registry with a seeded random tracker
    Simulate {
        #[arg(long, default_value_t = 200)]
        frames: usize,

        #[arg(long, default_value_t = 6)]
        markers: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the label → overlay table
    Catalog,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Replay {
            scenario,
            json,
            assets,
        } => cmd_replay(&cli, scenario, *json, assets.as_deref()),
        Commands::Simulate {
            frames,
            markers,
            seed,
            json,
        } => cmd_simulate(&cli, *frames, *markers, *seed, *json),
        Commands::Catalog => cmd_catalog(&cli),
    }
}

fn load_config(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    let what = match &cli.config {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration".to_string(),
    };
    let (config, used) = Config::resolve(cli.config.as_deref()).context(what)?;
    if let Some(path) = &used {
        tracing::info!("using config {}", path.display());
    }
    Ok((config, used))
}

/// Pick the asset directory for a replay.
///
/// `--assets` beats `AMR_ASSET_DIR`, which beats the config file. Without a
/// config file a relative directory is taken relative to the scenario.
fn replay_asset_dir(
    flag: Option<&Path>,
    env_value: Option<String>,
    config_dir: &Path,
    from_file: bool,
    scenario: &Path,
) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    if let Some(value) = env_value
        && !value.trim().is_empty()
    {
        return PathBuf::from(value);
    }
    if !from_file
        && config_dir.is_relative()
        && let Some(parent) = scenario.parent()
    {
        return parent.join(config_dir);
    }
    config_dir.to_path_buf()
}

fn cmd_replay(cli: &Cli, path: &Path, json: bool, assets: Option<&Path>) -> Result<()> {
    let (mut config, used) = load_config(cli)?;
    config.loader.asset_dir = replay_asset_dir(
        assets,
        std::env::var(ASSET_DIR_ENV).ok(),
        &config.loader.asset_dir,
        used.is_some(),
        path,
    );

    let scenario = Scenario::load(path)?;
    let mut session = Session::new(&config, !json)?;
    for frame in &scenario.frames {
        session.step(&frame.to_frame(), frame.settle);
    }
    let report = session.finish();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &Report) {
    let counters = report.registry.counters;
    println!("session: {}", report.session);
    println!("frames: {} ({} skipped)", report.frames, report.skipped_frames);
    println!("entries: {}", report.registry.entries.len());
    println!("detected: {}", counters.detected);
    println!("tracking: {}", counters.tracking);
    println!("attached: {}", report.attach_calls);
    println!("detached: {}", report.detach_calls);
    for entry in &report.registry.entries {
        let status = if entry.attached {
            "attached"
        } else if entry.pending {
            "loading"
        } else {
            "waiting"
        };
        println!("  {} {} {} {} [{status}]", entry.marker, entry.label, entry.kind, entry.asset);
    }
    if !report.registry.failed.is_empty() {
        let failed: Vec<String> = report.registry.failed.iter().map(|m| m.to_string()).collect();
        println!("failed: {}", failed.join(", "));
    }
}

fn cmd_simulate(cli: &Cli, frames: usize, markers: usize, seed: u64, json: bool) -> Result<()> {
    let (config, _) = load_config(cli)?;
    let catalog = config.catalog().context("invalid overlay table")?;
    let report = simulate::run(catalog, frames, markers, seed)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("tracking: {}", report.tracking);
    println!("detected: {}", report.detected);
    println!("attached: {}", report.attached);
    println!("failed loads: {}", report.failed_loads);
    println!("late completions: {}", report.late_completions);
    println!("invariant held for {} frames", report.frames);
    Ok(())
}

fn cmd_catalog(cli: &Cli) -> Result<()> {
    let (config, _) = load_config(cli)?;
    let catalog = config.catalog().context("invalid overlay table")?;
    println!("{} overlays", catalog.len());
    for (label, recipe) in catalog.iter() {
        println!("  {label:<10} {}", describe(recipe));
    }
    Ok(())
}

fn describe(recipe: &OverlayRecipe) -> String {
    match recipe {
        OverlayRecipe::Flat(flat) => {
            let offset = match flat.offset {
                LocalOffset::Fixed(v) => format!("offset [{}, {}, {}]", v.x, v.y, v.z),
                LocalOffset::ExtentZ(factor) => format!("offset {factor} x extent_z"),
            };
            format!("flat    {} {}x{} {offset}", recipe.asset(), flat.size_x, flat.size_z)
        }
        OverlayRecipe::Dynamic(_) => format!("dynamic {}", recipe.asset()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_dir_flag_wins() {
        let dir = replay_asset_dir(
            Some(Path::new("/flag")),
            Some("/env".into()),
            Path::new("assets"),
            false,
            Path::new("/s/scenario.toml"),
        );
        assert_eq!(dir, PathBuf::from("/flag"));
    }

    #[test]
    fn test_asset_dir_env_over_config() {
        let dir = replay_asset_dir(
            None,
            Some("/env".into()),
            Path::new("/cfg"),
            true,
            Path::new("/s/scenario.toml"),
        );
        assert_eq!(dir, PathBuf::from("/env"));
    }

    #[test]
    fn test_default_asset_dir_beside_scenario() {
        let dir = replay_asset_dir(
            None,
            None,
            Path::new("assets"),
            false,
            Path::new("/s/scenario.toml"),
        );
        assert_eq!(dir, PathBuf::from("/s/assets"));

        // A config file already resolved its own relative paths.
        let dir = replay_asset_dir(
            None,
            None,
            Path::new("/cfg/assets"),
            true,
            Path::new("/s/x.toml"),
        );
        assert_eq!(dir, PathBuf::from("/cfg/assets"));
    }

    #[test]
    fn test_describe() {
        let text = describe(
            &OverlayRecipe::flat("wall", 0.5, 0.8).with_offset(LocalOffset::ExtentZ(1.05)),
        );
        assert_eq!(text, "flat    texture:wall 0.5x0.8 offset 1.05 x extent_z");
        assert_eq!(describe(&OverlayRecipe::dynamic("diya")), "dynamic model:diya");
    }
}
