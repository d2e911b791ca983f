use super::state::RunState;
use crate::report::{Outcome, RunSummary, TestResult};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Run events for real-time console output
#[derive(Debug, Clone)]
pub enum TestEvent {
    // Run events
    RunStarted {
        run_id: String,
        base_url: String,
        suites: Vec<String>,
    },
    RunFinished {
        run_id: String,
        state: RunState,
        summary: RunSummary,
        report_file: Option<PathBuf>,
    },

    // Suite events
    SuiteStarted {
        suite_id: String,
        check_count: usize,
    },
    SuiteFinished {
        suite_id: String,
        cases_run: usize,
        cases_failed: usize,
    },

    // Case events
    CaseStarted {
        suite_id: String,
        case_name: String,
    },
    CaseRecorded {
        result: TestResult,
        total: usize,
    },
}

/// Event emitter for broadcasting run events
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener printing one status block per recorded case
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            // Piped output gets no spinner escape codes.
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let mut spinners: HashMap<String, ProgressBar> = HashMap::new();

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("console listener skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                TestEvent::RunStarted {
                    run_id,
                    base_url,
                    suites,
                } => {
                    println!(
                        "\n{} Run {} started against {}",
                        "▶".green().bold(),
                        run_id.cyan(),
                        base_url.white().bold()
                    );
                    println!("  Suites: {}", suites.join(", ").cyan());
                }

                TestEvent::SuiteStarted {
                    suite_id,
                    check_count,
                } => {
                    println!(
                        "\n  {} Suite: {} ({} checks)",
                        "→".blue(),
                        suite_id.white().bold(),
                        check_count
                    );
                }

                TestEvent::CaseStarted {
                    suite_id,
                    case_name,
                } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    let style = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner());
                    pb.set_style(style);
                    pb.set_message(format!("[{}] {}... ", suite_id, case_name.dimmed()));
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinners.insert(case_name, pb);
                }

                TestEvent::CaseRecorded { result, total } => {
                    if let Some(pb) = spinners.remove(&result.case_name) {
                        pb.finish_and_clear();
                    }
                    let badge = match result.outcome {
                        Outcome::Pass => "PASS".green().bold(),
                        Outcome::Fail => "FAIL".red().bold(),
                        Outcome::Bug => "BUG".yellow().bold(),
                    };
                    println!("    [{}] {} (#{})", badge, result.case_name, total);
                    println!(
                        "        Type: {}  Severity: {}",
                        result.test_type, result.severity
                    );
                    if !result.details.is_empty() {
                        println!("        Details: {}", result.details.dimmed());
                    }
                }

                TestEvent::SuiteFinished {
                    suite_id,
                    cases_run,
                    cases_failed,
                } => {
                    let status = if cases_failed == 0 {
                        "CLEAN".green().bold()
                    } else {
                        format!("{} WEAK", cases_failed).yellow().bold()
                    };
                    println!(
                        "  {} Suite {} [{}] {} cases",
                        "←".blue(),
                        suite_id,
                        status,
                        cases_run
                    );
                }

                TestEvent::RunFinished {
                    run_id,
                    state,
                    summary,
                    report_file,
                } => {
                    for (_, pb) in spinners.drain() {
                        pb.finish_and_clear();
                    }
                    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

                    println!("\n{} Run {} {}", "■".blue().bold(), run_id, state);
                    println!("  Total cases: {}", summary.total);
                    println!(
                        "  {} passed, {} failed, {} bugs ({:.1}% pass rate)",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.bugs.to_string().yellow(),
                        summary.pass_rate
                    );
                    if let Some(duration) = summary.duration_ms {
                        println!("  Duration: {}ms", duration);
                    }
                    if let Some(path) = report_file {
                        println!("  Report: {}", path.display().to_string().cyan());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TestType;

    #[tokio::test]
    async fn test_emitter_fans_out_to_subscribers() {
        let emitter = EventEmitter::default();
        let mut first = emitter.subscribe();
        let mut second = emitter.subscribe();

        emitter.emit(TestEvent::CaseRecorded {
            result: TestResult::pass("Footer Links", "", TestType::Ui),
            total: 1,
        });

        for rx in [&mut first, &mut second] {
            match rx.recv().await.unwrap() {
                TestEvent::CaseRecorded { total, result } => {
                    assert_eq!(total, 1);
                    assert_eq!(result.case_name, "Footer Links");
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_emit_without_listeners_is_silent() {
        let emitter = EventEmitter::default();
        emitter.emit(TestEvent::SuiteStarted {
            suite_id: "forms".into(),
            check_count: 0,
        });
    }
}
