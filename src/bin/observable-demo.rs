//! observable-demo - walk through the observable contract from the command line
//!
//! `scenario` replays the documented behaviours (ordering, removal, duplicates,
//! failure isolation, re-entrancy) and checks each delivery log against the
//! expected one. `replay` fans stdin lines out to a set of subscribers.

use clap::{Parser, Subcommand, ValueEnum};
use observable::{
    subscriber, DuplicatePolicy, EventBus, LoggingObserver, Metrics, MetricsObserver, Observable,
    ObservableConfig, SubscriptionId,
};
use serde::Serialize;
use std::io::{self, BufRead};
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

/// observable-demo - ordered publish/subscribe walkthrough
#[derive(Parser)]
#[command(name = "observable-demo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON configuration file for the observable
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for CLI responses
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for programmatic use
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one or all of the built-in scenarios
    Scenario {
        #[arg(value_enum, default_value = "all")]
        name: ScenarioName,
    },

    /// Notify every stdin line to a set of numbered subscribers
    Replay {
        /// Number of subscribers to register
        #[arg(short, long, default_value = "2")]
        subscribers: usize,

        /// Collect bus metrics and print them in Prometheus format
        #[arg(long)]
        metrics: bool,
    },
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum ScenarioName {
    Ordering,
    Unsubscribe,
    Empty,
    Duplicates,
    Isolation,
    Reentrant,
    All,
}

impl ScenarioName {
    const EACH: [ScenarioName; 6] = [
        Self::Ordering,
        Self::Unsubscribe,
        Self::Empty,
        Self::Duplicates,
        Self::Isolation,
        Self::Reentrant,
    ];
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
struct ScenarioReport {
    name: &'static str,
    description: &'static str,
    log: Vec<String>,
    expected: Vec<String>,
    passed: bool,
}

#[derive(Serialize)]
struct ScenarioSummary {
    scenarios: Vec<ScenarioReport>,
    passed: usize,
    failed: usize,
}

#[derive(Serialize)]
struct ReplayReport {
    observable: String,
    subscribers: usize,
    notifications: u64,
    log: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<String>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(io::stderr)
        .init();

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            eprintln!("Error: A subcommand is required. Use --help for usage.");
            return ExitCode::from(2);
        }
    };

    let config = match cli.config {
        Some(path) => match ObservableConfig::from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ObservableConfig::default(),
    };

    let result = match command {
        Commands::Scenario { name } => execute_scenario(cli.format, &config, name),
        Commands::Replay {
            subscribers,
            metrics,
        } => execute_replay(cli.format, config, subscribers, metrics),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

fn execute_scenario(
    format: OutputFormat,
    config: &ObservableConfig,
    name: ScenarioName,
) -> Result<(), String> {
    let selected: Vec<ScenarioName> = if name == ScenarioName::All {
        ScenarioName::EACH.to_vec()
    } else {
        vec![name]
    };

    let scenarios: Vec<ScenarioReport> = selected
        .into_iter()
        .map(|name| run_scenario(config, name))
        .collect();
    let passed = scenarios.iter().filter(|s| s.passed).count();
    let failed = scenarios.len() - passed;

    output_response(
        format,
        &ScenarioSummary {
            scenarios,
            passed,
            failed,
        },
    )?;

    if failed > 0 {
        return Err(format!("{} scenario(s) did not match", failed));
    }
    Ok(())
}

fn execute_replay(
    format: OutputFormat,
    config: ObservableConfig,
    subscribers: usize,
    with_metrics: bool,
) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;

    let bus_capacity = config.bus_capacity;
    let observable: Observable<String> = Observable::with_config(config);
    let log = Arc::new(Mutex::new(Vec::new()));

    for i in 0..subscribers {
        let sink = Arc::clone(&log);
        observable.subscribe(move |line: &String| push(&sink, format!("sub{}:{}", i, line)));
    }
    LoggingObserver::new(observable.name()).attach(&observable);

    let metrics = runtime.block_on(notify_lines(&observable, bus_capacity, with_metrics))?;

    let log = log
        .lock()
        .map_err(|_| "Delivery log lock poisoned".to_string())?
        .clone();
    output_response(
        format,
        &ReplayReport {
            observable: observable.name().to_string(),
            subscribers,
            notifications: observable.stats().notifications,
            log,
            metrics,
        },
    )
}

/// Notify every stdin line, optionally counting them through an event bus
async fn notify_lines(
    observable: &Observable<String>,
    bus_capacity: usize,
    with_metrics: bool,
) -> Result<Option<String>, String> {
    let collector = if with_metrics {
        let bus = EventBus::new(bus_capacity);
        let observer = MetricsObserver::new(&bus, |line: &String| {
            line.split_whitespace().next().unwrap_or("empty").to_string()
        });
        let metrics = observer.metrics();
        let handle = tokio::spawn(observer.run());
        let token = bus.attach(observable);
        Some((bus, token, metrics, handle))
    } else {
        None
    };

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| format!("Failed to read stdin: {}", e))?;
        observable.notify(&line);
        if with_metrics {
            // Single-threaded runtime: let the observer drain before the bus fills up
            tokio::task::yield_now().await;
        }
    }

    let Some((bus, token, metrics, handle)) = collector else {
        return Ok(None);
    };
    // Closing every sender lets the observer drain and stop
    observable.unsubscribe(token);
    drop(bus);
    handle
        .await
        .map_err(|e| format!("Metrics observer failed: {}", e))?;

    let mut metrics: Metrics = metrics
        .lock()
        .map_err(|_| "Metrics lock poisoned".to_string())?
        .clone();
    metrics.absorb_stats(&observable.stats());
    Ok(Some(metrics.to_prometheus(observable.name())))
}

// ============================================================================
// Scenarios
// ============================================================================

fn run_scenario(config: &ObservableConfig, name: ScenarioName) -> ScenarioReport {
    let observable: Observable<i32> = Observable::with_config(config.clone());
    let log = Arc::new(Mutex::new(Vec::new()));
    let tagged = |tag: &'static str| {
        let sink = Arc::clone(&log);
        subscriber(move |v: &i32| push(&sink, format!("{}:{}", tag, v)))
    };

    let (name, description, expected): (&'static str, &'static str, Vec<&str>) = match name {
        ScenarioName::Ordering => {
            observable.subscribe_shared(tagged("A"));
            observable.subscribe_shared(tagged("B"));
            observable.notify(&1);
            (
                "ordering",
                "subscribers run once each, in subscription order",
                vec!["A:1", "B:1"],
            )
        }

        ScenarioName::Unsubscribe => {
            let f = observable.subscribe_shared(tagged("f"));
            observable.subscribe_shared(tagged("g"));
            observable.unsubscribe(f);
            observable.unsubscribe(f);
            observable.notify(&2);
            (
                "unsubscribe",
                "a removed subscriber is skipped; removing twice is a no-op",
                vec!["g:2"],
            )
        }

        ScenarioName::Empty => {
            observable.notify(&0);
            ("empty", "notify with no subscribers does nothing", vec![])
        }

        ScenarioName::Duplicates => {
            let f = tagged("f");
            let first = observable.subscribe_shared(Arc::clone(&f));
            observable.subscribe_shared(Arc::clone(&f));
            observable.notify(&1);
            observable.unsubscribe(first);
            observable.notify(&2);
            observable.unsubscribe_callback(&f);
            observable.notify(&3);
            let expected = match config.duplicates {
                DuplicatePolicy::Allow => vec!["f:1", "f:1", "f:2"],
                // The second registration hands back the first token
                DuplicatePolicy::Reject => vec!["f:1"],
            };
            (
                "duplicates",
                "tokens remove one registration; the handle removes all of them",
                expected,
            )
        }

        ScenarioName::Isolation => {
            observable.subscribe_shared(tagged("A"));
            observable.subscribe(|_: &i32| panic!("subscriber B failed"));
            observable.subscribe_shared(tagged("C"));

            // Keep the default hook from printing the expected panic
            let previous = panic::take_hook();
            panic::set_hook(Box::new(|_| {}));
            let result = observable.notify_isolated(&5);
            panic::set_hook(previous);

            if let Err(e) = result {
                for failure in e.failures() {
                    push(&log, format!("failed:{}", failure.id));
                }
            }
            (
                "isolation",
                "isolated notification reaches every subscriber and reports failures",
                vec!["A:5", "C:5", "failed:sub-1"],
            )
        }

        ScenarioName::Reentrant => {
            let observable = Arc::new(observable);
            let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
            let weak = Arc::downgrade(&observable);
            let own = Arc::clone(&slot);
            let sink = Arc::clone(&log);
            let id = observable.subscribe(move |v: &i32| {
                push(&sink, format!("once:{}", v));
                let id = own.lock().ok().and_then(|guard| *guard);
                if let (Some(obs), Some(id)) = (weak.upgrade(), id) {
                    obs.unsubscribe(id);
                }
            });
            if let Ok(mut guard) = slot.lock() {
                *guard = Some(id);
            }
            observable.subscribe_shared(tagged("B"));
            observable.notify(&1);
            observable.notify(&2);
            (
                "reentrant",
                "a subscriber removing itself mid-notify does not disturb the round",
                vec!["once:1", "B:1", "B:2"],
            )
        }

        ScenarioName::All => unreachable!("expanded before dispatch"),
    };

    let log = log.lock().map(|l| l.clone()).unwrap_or_default();
    let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    ScenarioReport {
        name,
        description,
        passed: log == expected,
        log,
        expected,
    }
}

fn push(log: &Mutex<Vec<String>>, entry: String) {
    if let Ok(mut log) = log.lock() {
        log.push(entry);
    }
}

// ============================================================================
// Output Helpers
// ============================================================================

/// Human-readable rendering of a command response
trait TextReport {
    fn render_text(&self) -> String;
}

impl TextReport for ScenarioSummary {
    fn render_text(&self) -> String {
        let mut out = String::new();
        for scenario in &self.scenarios {
            let mark = if scenario.passed { "ok" } else { "MISMATCH" };
            out.push_str(&format!("[{}] {}: {}\n", mark, scenario.name, scenario.description));
            out.push_str(&format!("  log:      [{}]\n", scenario.log.join(", ")));
            if !scenario.passed {
                out.push_str(&format!("  expected: [{}]\n", scenario.expected.join(", ")));
            }
        }
        out.push_str(&format!("\n{} passed, {} failed\n", self.passed, self.failed));
        out
    }
}

impl TextReport for ReplayReport {
    fn render_text(&self) -> String {
        let mut out = format!(
            "{}: {} notification(s) to {} subscriber(s)\n",
            self.observable, self.notifications, self.subscribers
        );
        for entry in &self.log {
            out.push_str(&format!("  {}\n", entry));
        }
        if let Some(metrics) = &self.metrics {
            out.push('\n');
            out.push_str(metrics);
        }
        out
    }
}

/// Print a response in the requested format
fn output_response<T: Serialize + TextReport>(
    format: OutputFormat,
    response: &T,
) -> Result<(), String> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(response)
                .map_err(|e| format!("Failed to serialize response: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", response.render_text()),
    }
    Ok(())
}
