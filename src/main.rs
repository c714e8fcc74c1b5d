use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use perfgate::alerts::{
    render_console_summary, render_notification, ConsoleChannel, DebugReport, Notification,
    Notifier,
};
use perfgate::config::{ChannelTargets, Config, RunMetadata};
use perfgate::error::ConfigError;
use perfgate::pipeline::build_report_from_path;
use perfgate::report::{Report, ReportAssembler};
use std::path::{Path, PathBuf};

/// Command-line arguments for the k6 performance gate
#[derive(Parser)]
#[command(
    name = "perfgate",
    about = "k6 load-test gate - summarize results, enforce thresholds, notify CI",
    long_about = "Reads the JSON line output of a k6 run, summarizes every metric, judges the run \
                  against performance thresholds, and reports the verdict through the exit code \
                  and optional chat notifications."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        global = true,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a k6 results file and evaluate thresholds
    ParseResults {
        /// k6 JSON line output (`k6 run --out json=<file>`)
        input: PathBuf,

        /// Where to write the summary report
        #[arg(default_value = "k6-summary.json")]
        output: PathBuf,
    },

    /// Send notifications for a summary report
    Notify {
        /// Summary report written by `parse-results`
        report: PathBuf,
    },
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        match &self.command {
            Command::ParseResults { input, output } => {
                if input.is_dir() {
                    return Err(format!("Input path is a directory: {}", input.display()));
                }
                if output.is_dir() {
                    return Err(format!("Output path is a directory: {}", output.display()));
                }
            }
            Command::Notify { report } => {
                if report.is_dir() {
                    return Err(format!("Report path is a directory: {}", report.display()));
                }
            }
        }

        Ok(())
    }
}

/// Load configuration, falling back to defaults when the file is unusable
///
/// A missing or invalid configuration never aborts a run; the problem is
/// reported and the built-in defaults are used instead.
fn load_config(config_path: Option<&Path>) -> Config {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            match Config::from_file(path) {
                Ok(config) => config,
                Err(ConfigError::ReadError(_)) => {
                    warn!(
                        "Configuration file '{}' not found or unreadable, using defaults",
                        path.display()
                    );
                    Config::default()
                }
                Err(e) => {
                    error!("Configuration error in '{}': {}", path.display(), e);
                    warn!("Using default configuration due to invalid config file");
                    Config::default()
                }
            }
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    }
}

/// Summarize a k6 run, persist the report, and return the exit code
fn parse_results(config: &Config, input: &Path, output: &Path) -> anyhow::Result<i32> {
    info!("Parsing k6 results from: {}", input.display());

    let assembler = ReportAssembler::new(config.thresholds);
    let outcome = build_report_from_path(input, &assembler)
        .with_context(|| format!("Error parsing k6 results from {}", input.display()))?;

    if !outcome.warnings.is_empty() {
        warn!("Skipped {} invalid record(s)", outcome.warnings.len());
    }

    let report = outcome.report;
    println!("{}", render_console_summary(&report));

    report
        .save(output)
        .with_context(|| format!("Error writing summary to {}", output.display()))?;
    println!("📄 Summary exported to: {}", output.display());

    if report.passed() {
        println!("\n✅ All thresholds passed!");
    } else {
        println!(
            "\n❌ {} threshold(s) failed. Exiting with error code.",
            report.errors.len()
        );
    }

    Ok(report.exit_code())
}

/// Notify every channel about a persisted report and return the exit code
///
/// Delivery problems are logged; only the report's own verdict decides the
/// exit code.
fn notify(
    config: &Config,
    report_path: &Path,
    targets: &ChannelTargets,
    metadata: &RunMetadata,
) -> anyhow::Result<i32> {
    let report = Report::load(report_path).context("Error in notification script")?;

    let notification = Notification {
        message: render_notification(&report, metadata),
        has_failures: !report.passed(),
    };

    let notifier = Notifier::from_config(&config.notifications, targets);

    match tokio::runtime::Runtime::new() {
        Ok(runtime) => {
            let summary = runtime.block_on(notifier.dispatch(notification));
            if !summary.all_delivered() {
                warn!(
                    "{} notification channel(s) failed: {}",
                    summary.failed.len(),
                    summary
                        .failed
                        .iter()
                        .map(|(name, _)| name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
        Err(e) => {
            error!("Failed to start async runtime, notifying console only: {}", e);
            ConsoleChannel::print(&notification);
        }
    }

    if report.passed() {
        println!("✅ All tests passed. No failures to report.");
    } else {
        let debug_dir = &config.notifications.debug_report_dir;
        match DebugReport::new(&report, metadata).write_to(debug_dir) {
            Ok(path) => println!("📄 Debug report saved to: {}", path.display()),
            Err(e) => error!("Failed to write debug report: {}", e),
        }
        println!("❌ Test failures detected. Exiting with error code.");
    }

    Ok(report.exit_code())
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config = load_config(cli.config.as_deref());

    let result = match &cli.command {
        Command::ParseResults { input, output } => parse_results(&config, input, output),
        Command::Notify { report } => notify(
            &config,
            report,
            &ChannelTargets::from_env(),
            &RunMetadata::from_env(),
        ),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            1
        }
    };

    std::process::exit(code);
}
