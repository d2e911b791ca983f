use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use strict_qa::dashboard::{DashboardConfig, DashboardServer};
use strict_qa::data::{DataKind, DataProvider};
use strict_qa::report::ReportFormat;
use strict_qa::runner::exit_codes;
use strict_qa::runner::registry::{self, Preset};
use strict_qa::runner::{ConsoleEventListener, Orchestrator};
use strict_qa::utils::url::{normalize_base_url, DEFAULT_BASE_URL};
use strict_qa::utils::HarnessConfig;

#[derive(Parser)]
#[command(name = "strict-qa")]
#[command(version)]
#[command(about = "Browser and API driven QA harness for web applications", long_about = None)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run suites against a target and write a report
    Run {
        /// Base URL of the application under test
        #[arg(default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Suite ids to run (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        suites: Option<Vec<String>>,

        /// Named suite selection (e2e, smoke, integration)
        #[arg(short, long, conflicts_with = "suites")]
        preset: Option<Preset>,

        /// Leave the API suite out
        #[arg(long, default_value = "false")]
        no_api: bool,

        /// Run suites concurrently
        #[arg(long, default_value = "false")]
        concurrent: bool,

        /// Seed for generated test data
        #[arg(long)]
        seed: Option<u64>,

        /// Show the browser window
        #[arg(long, default_value = "false")]
        headed: bool,

        /// Directory for report files
        #[arg(long)]
        reports_dir: Option<PathBuf>,

        /// Report format (csv, xlsx, json, junit)
        #[arg(short, long)]
        format: Option<ReportFormat>,
    },

    /// Start the dashboard service
    Serve {
        /// Server port
        #[arg(long, default_value = "5000")]
        port: u16,

        /// Directory for report files
        #[arg(long)]
        reports_dir: Option<PathBuf>,
    },

    /// List registered suites and their checks
    Suites,

    /// Print a generated data record as JSON
    Sample {
        /// Record kind (valid-user, invalid-user, edge-case, api-payload, ...)
        #[arg(short, long, default_value = "valid-user")]
        kind: DataKind,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Run {
            base_url,
            suites,
            preset,
            no_api,
            concurrent,
            seed,
            headed,
            reports_dir,
            format,
        } => {
            let mut config = HarnessConfig::load(cli.config.as_deref())?;
            if concurrent {
                config.concurrent_suites = true;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            if headed {
                config.headless = false;
            }
            if let Some(dir) = reports_dir {
                config.reports_dir = dir;
            }
            if let Some(format) = format {
                config.auto_report = Some(format);
            }

            let selection = select_suites(suites, preset, no_api);
            let code = run(config, &base_url, selection).await;
            std::process::exit(code);
        }

        Commands::Serve { port, reports_dir } => {
            let mut config = HarnessConfig::load(cli.config.as_deref())?;
            if let Some(dir) = reports_dir {
                config.reports_dir = dir;
            }

            let orchestrator = Orchestrator::new(config);
            tokio::spawn(ConsoleEventListener::listen(orchestrator.subscribe()));

            let stopper = orchestrator.clone();
            ctrlc::set_handler(move || {
                stopper.request_stop();
                std::process::exit(exit_codes::INTERRUPTED);
            })?;

            DashboardServer::new(DashboardConfig { port }, orchestrator)
                .start()
                .await?;
        }

        Commands::Suites => {
            println!("{} Registered suites:", "📋".blue());
            for suite in registry::describe() {
                println!(
                    "\n  {} {} ({}, {} checks)",
                    suite.id.cyan().bold(),
                    suite.title,
                    suite.adapter,
                    suite.checks.len()
                );
                for check in suite.checks {
                    println!("    - {}", check);
                }
            }
        }

        Commands::Sample { kind, seed } => {
            let record = DataProvider::new(seed).generate(kind, None);
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
    }

    Ok(())
}

/// Suite ids for a run; `None` runs every registered suite.
fn select_suites(
    suites: Option<Vec<String>>,
    preset: Option<Preset>,
    no_api: bool,
) -> Option<Vec<String>> {
    if let Some(ids) = suites {
        return Some(ids);
    }
    if let Some(preset) = preset {
        return Some(preset.suites(!no_api));
    }
    if no_api {
        return Some(
            registry::ids()
                .into_iter()
                .filter(|id| *id != "api")
                .map(String::from)
                .collect(),
        );
    }
    None
}

/// Execute one run with console output and return the process exit code.
async fn run(config: HarnessConfig, base_url: &str, suites: Option<Vec<String>>) -> i32 {
    let base_url = normalize_base_url(base_url);
    let orchestrator = Orchestrator::new(config);
    let listener = tokio::spawn(ConsoleEventListener::listen(orchestrator.subscribe()));

    if orchestrator.config().concurrent_suites {
        println!("  Concurrent: {}", "Enabled".yellow());
    }

    let handle = match orchestrator.start_run(&base_url, suites) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            return exit_codes::INFRASTRUCTURE_FAILED;
        }
    };

    // First Ctrl+C stops cooperatively, a second one exits at once. The
    // orchestrator clone lives in `stop_task` so the event channel can close
    // once the run is over.
    let (stop_tx, mut stop_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    let stopper = orchestrator.clone();
    let stop_task = tokio::spawn(async move {
        while stop_rx.recv().await.is_some() {
            stopper.request_stop();
        }
    });
    let interrupted = Arc::new(AtomicBool::new(false));
    let handler = ctrlc::set_handler(move || {
        if interrupted.swap(true, Ordering::SeqCst) {
            std::process::exit(exit_codes::INTERRUPTED);
        }
        println!("\n{} Stopping after the current check...", "⏹".yellow());
        let _ = stop_tx.send(());
    });
    if let Err(e) = handler {
        log::warn!("cannot install Ctrl+C handler: {}", e);
    }

    let outcome = handle.wait().await;
    stop_task.abort();
    let _ = stop_task.await;
    drop(orchestrator);
    if let Err(e) = listener.await {
        log::debug!("console listener ended abnormally: {}", e);
    }

    for fault in &outcome.faults {
        eprintln!("{} {}", "✗".red().bold(), fault);
    }
    outcome.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "strict-qa",
            "run",
            "http://shop.test",
            "--suites",
            "login,api",
            "--seed",
            "9",
            "--format",
            "junit",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                base_url,
                suites,
                seed,
                format,
                ..
            } => {
                assert_eq!(base_url, "http://shop.test");
                assert_eq!(suites, Some(vec!["login".to_string(), "api".to_string()]));
                assert_eq!(seed, Some(9));
                assert_eq!(format, Some(ReportFormat::Junit));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_suites_and_preset_conflict() {
        assert!(Cli::try_parse_from([
            "strict-qa", "run", "--suites", "login", "--preset", "smoke"
        ])
        .is_err());
    }

    #[test]
    fn test_select_suites() {
        assert_eq!(select_suites(None, None, false), None);
        let without_api = select_suites(None, None, true).unwrap();
        assert!(!without_api.contains(&"api".to_string()));
        assert_eq!(without_api.len(), 4);
        assert_eq!(
            select_suites(None, Some(Preset::Smoke), true),
            Some(vec!["navigation".into(), "forms".into(), "api".into()])
        );
    }
}
