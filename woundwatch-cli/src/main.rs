//! Woundwatch CLI - healing trajectory and risk classification for post-operative wounds

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Simulation output only when --simulate is passed
// - Identical input yields byte-for-byte identical output

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use woundwatch_core::config::{self, ResolvedConfig};
use woundwatch_core::input::CaseFile;
use woundwatch_core::report::render_history_json;
use woundwatch_core::risk::{render_threshold_table, Band};
use woundwatch_core::trajectory::expected_curve;
use woundwatch_core::AnalysisRequest;
use woundwatch_core::{analyze_day, history, render_history_text, render_json, render_text};

#[derive(Parser)]
#[command(name = "woundwatch")]
#[command(about = "Healing trajectory and risk classification for post-operative wounds")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one day of a case file
    Analyze {
        /// Path to case file (JSON)
        case: PathBuf,

        /// Day to analyze (default: latest observation)
        #[arg(long)]
        day: Option<u32>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Include the hypothetical simulation layer
        #[arg(long)]
        simulate: bool,
    },
    /// Show deviation and risk for every observed day
    History {
        /// Path to case file (JSON)
        case: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print an expected healing curve
    Expected {
        /// Day-1 wound area in cm²
        #[arg(long)]
        initial_area: f64,

        /// Number of days
        #[arg(long, default_value = "7")]
        days: usize,

        /// Daily reduction rate (0 < rate < 1)
        #[arg(long, default_value = "0.10")]
        rate: f64,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running analysis
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            case,
            day,
            format,
            config: config_path,
            simulate,
        } => {
            let resolved = load_config(config_path.as_deref())?;
            let case_file = load_case(&case)?;
            let store = case_file
                .to_store()
                .with_context(|| format!("invalid observations in {}", case.display()))?;
            let snapshot = store.snapshot();
            let expected = case_file.expected_curve(&resolved);

            let day = match day {
                Some(d) => d,
                None => snapshot
                    .latest()
                    .map(|o| o.day)
                    .context("case file has no observations")?,
            };

            let mut request = AnalysisRequest::for_day(day);
            if simulate {
                match case_file.context {
                    Some(context) => request = request.with_simulation(context),
                    None => eprintln!("Note: --simulate ignored, case file has no context"),
                }
            }

            let analysis = analyze_day(&snapshot, &expected, &request, &resolved)
                .with_context(|| format!("failed to analyze day {}", day))?;

            if simulate && request.enable_simulation && analysis.simulation.is_none() {
                eprintln!("Note: simulation unavailable for this context and factor table");
            }

            match format {
                OutputFormat::Text => print!("{}", render_text(&analysis)),
                OutputFormat::Json => println!("{}", render_json(&analysis)),
            }
        }
        Commands::History {
            case,
            format,
            config: config_path,
        } => {
            let resolved = load_config(config_path.as_deref())?;
            let case_file = load_case(&case)?;
            let store = case_file
                .to_store()
                .with_context(|| format!("invalid observations in {}", case.display()))?;
            let expected = case_file.expected_curve(&resolved);

            let rows = history(&store.snapshot(), &expected, &resolved)
                .context("failed to compute history")?;

            match format {
                OutputFormat::Text => print!("{}", render_history_text(&rows)),
                OutputFormat::Json => println!("{}", render_history_json(&rows)),
            }
        }
        Commands::Expected {
            initial_area,
            days,
            rate,
        } => {
            if !initial_area.is_finite() || initial_area <= 0.0 {
                anyhow::bail!("--initial-area must be positive (got {})", initial_area);
            }
            if rate.is_nan() || rate <= 0.0 || rate >= 1.0 {
                anyhow::bail!("--rate must be within (0, 1) (got {})", rate);
            }

            let curve = expected_curve(initial_area, days, rate);
            let json = serde_json::to_string(&curve).context("failed to serialize curve")?;
            println!("{}", json);
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let root = std::env::current_dir()?;
                match config::load_and_resolve(&root, path.as_deref()) {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&root, path.as_deref())
                    .context("failed to load configuration")?;
                print!("{}", render_config(&resolved));
            }
        },
    }

    Ok(())
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let root = std::env::current_dir()?;
    let resolved =
        config::load_and_resolve(&root, config_path).context("failed to load configuration")?;

    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }
    Ok(resolved)
}

fn load_case(path: &Path) -> anyhow::Result<CaseFile> {
    let case_file = CaseFile::load(path)?;
    log::debug!(
        "loaded {} observation(s) from {} (expected curve {})",
        case_file.observations.len(),
        path.display(),
        if case_file.expected.is_some() {
            "supplied"
        } else {
            "generated"
        }
    );
    Ok(case_file)
}

fn band_line(name: &str, band: &Band) -> String {
    format!(
        "  {}: amber above {}, red above {}\n",
        name, band.amber_above, band.red_above
    )
}

fn render_config(resolved: &ResolvedConfig) -> String {
    let mut output = String::from("Configuration:\n");
    match resolved.config_path {
        Some(ref p) => output.push_str(&format!("  Source: {}\n", p.display())),
        None => output.push_str("  Source: defaults (no config file found)\n"),
    }

    let table = &resolved.thresholds;
    output.push('\n');
    output.push_str(&render_threshold_table(table));

    output.push_str("\nAlerts:\n");
    output.push_str(&band_line("|area deviation| (cm²)", &table.area_deviation));
    output.push_str(&format!(
        "  exudate: red above {}%\n",
        table.alerts.exudate_alert_pct
    ));

    output.push_str("\nTrajectory:\n");
    output.push_str(&format!(
        "  trend window: {} day(s)\n",
        resolved.trend_window_days
    ));
    output.push_str(&format!(
        "  generated expected curve: {} days at {} per day\n",
        resolved.expected_horizon_days, resolved.expected_healing_rate
    ));

    output.push_str("\nSimulation:\n");
    match resolved.simulation {
        Some(ref sim) => {
            output.push_str(&format!("  table version: {}\n", sim.version));
            output.push_str(&format!("  healed at: <= {} cm²\n", sim.healed_area_cm2));
            output.push_str(&format!(
                "  window margin: {} day(s), horizon: {} days\n",
                sim.window_margin_days, sim.horizon_days
            ));
            output.push_str(&format!(
                "  factor entries: diabetes {}, smoking {}, age {}, surgery {}\n",
                sim.factors.diabetes.len(),
                sim.factors.smoking.len(),
                sim.factors.age.len(),
                sim.factors.surgery.len()
            ));
        }
        None => output.push_str("  unavailable (no factor table configured)\n"),
    }

    output
}
