/*!
 * bodytrack CLI
 *
 * Runs the tracker against the simulated detector backend. In multi-body
 * mode, live body ids are read from stdin, one complete update per line.
 */

use bodytrack::{
    config::{DiagnosticsOutput, LogLevel, TrackerConfig},
    error::{Result, TrackerError, EXIT_SUCCESS},
    logging,
    simulator::SimulatedFactory,
    telemetry::{DiagnosticSink, JsonLinesSink, LogSink},
    IdAllocator, LiveIdFeed, Tracker,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Parser)]
#[command(name = "bodytrack")]
#[command(version, about = "Per-body detector registry with periodic health diagnostics", long_about = None)]
struct Cli {
    /// Configuration file (TOML); command-line flags override its values
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Follow live body ids from stdin instead of tracking a single body
    #[arg(long, global = true)]
    multi_body: bool,

    /// Ask detectors to use depth frames
    #[arg(long, global = true)]
    use_depth: bool,

    /// Run detectors in debug mode
    #[arg(long, global = true)]
    debug: bool,

    /// Diagnostic period in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    period_ms: Option<u64>,

    /// Combined processing time that triggers a WARN record, in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    slow_threshold_ms: Option<u64>,

    /// Frame source for single-body mode
    #[arg(long, value_name = "TOPIC", global = true)]
    image_topic: Option<String>,

    /// Where diagnostic records go
    #[arg(long, value_enum, global = true)]
    output: Option<OutputArg>,

    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Log file path (logs go to stderr otherwise)
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Verbose logging (same as --log-level debug)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Mean processing time of simulated detectors, in milliseconds
    #[arg(long, default_value = "30", global = true)]
    sim_latency_ms: u64,

    /// Simulated detectors stop responding after this many milliseconds
    #[arg(long, value_name = "MS", global = true)]
    sim_stall_after_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tracker (default)
    Run,

    /// Print generated body identifiers
    GenId {
        /// Number of identifiers to print
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Print the effective configuration as TOML
    PrintConfig,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputArg {
    Log,
    Json,
}

impl From<OutputArg> for DiagnosticsOutput {
    fn from(output: OutputArg) -> Self {
        match output {
            OutputArg::Log => DiagnosticsOutput::Log,
            OutputArg::Json => DiagnosticsOutput::Json,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    match cli.command {
        Some(Commands::GenId { count }) => {
            let allocator = IdAllocator::new();
            for _ in 0..count {
                println!("{}", allocator.generate());
            }
            Ok(())
        }
        Some(Commands::PrintConfig) => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Some(Commands::Run) | None => {
            if let Err(e) = logging::init_logging(&config) {
                eprintln!("Warning: Failed to initialize logging: {}", e);
            }
            run_tracker(config, &cli)
        }
    }
}

/// Load the config file (if any) and apply command-line overrides
fn build_config(cli: &Cli) -> Result<TrackerConfig> {
    let mut config = match cli.config {
        Some(ref path) => TrackerConfig::from_file(path)?,
        None => TrackerConfig::default(),
    };

    if cli.multi_body {
        config.single_body = false;
    }
    if cli.use_depth {
        config.use_depth = true;
    }
    if cli.debug {
        config.debug = true;
    }
    if let Some(period) = cli.period_ms {
        config.diagnostic_period_ms = period;
    }
    if let Some(threshold) = cli.slow_threshold_ms {
        config.slow_processing_threshold_ms = threshold;
    }
    if let Some(ref topic) = cli.image_topic {
        config.image_topic = topic.clone();
    }
    if let Some(output) = cli.output {
        config.diagnostics_output = output.into();
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    if cli.verbose {
        config.verbose = true;
    }

    config.validate()?;
    Ok(config)
}

fn simulated_factory(config: &TrackerConfig, cli: &Cli) -> SimulatedFactory {
    SimulatedFactory {
        image_topic: config.image_topic.clone(),
        latency: Duration::from_millis(cli.sim_latency_ms),
        jitter: Duration::from_millis(cli.sim_latency_ms / 3),
        stall_after: cli.sim_stall_after_ms.map(Duration::from_millis),
        ..Default::default()
    }
}

fn run_tracker(config: TrackerConfig, cli: &Cli) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(TrackerError::Io)?;

    let sink: Arc<dyn DiagnosticSink> = match config.diagnostics_output {
        DiagnosticsOutput::Log => Arc::new(LogSink::new()),
        DiagnosticsOutput::Json => Arc::new(JsonLinesSink::stdout()),
    };
    let factory = Arc::new(simulated_factory(&config, cli));
    let single_body = config.single_body;

    run_to_completion(runtime, async move {
        let tracker = Tracker::new(config, factory, sink)?;

        let feed = if single_body {
            None
        } else {
            Some(LiveIdFeed::new(tokio::io::BufReader::new(tokio::io::stdin())))
        };

        tracker.run(feed, shutdown_signal()).await
    })
}

/// Drive `future` to completion, then drop the runtime without waiting on
/// blocking tasks. A pending stdin read cannot be cancelled and would
/// otherwise keep the process alive after shutdown.
fn run_to_completion<F: Future>(runtime: tokio::runtime::Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    output
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for ctrl-c ({}), running until killed", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_without_flags() {
        let cli = Cli::try_parse_from(["bodytrack"]).unwrap();
        let config = build_config(&cli).unwrap();

        assert_eq!(config, TrackerConfig::default());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "bodytrack",
            "--multi-body",
            "--use-depth",
            "--period-ms",
            "250",
            "--output",
            "json",
            "--log-level",
            "warn",
            "run",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();

        assert!(!config.single_body);
        assert!(config.use_depth);
        assert_eq!(config.diagnostic_period_ms, 250);
        assert_eq!(config.diagnostics_output, DiagnosticsOutput::Json);
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let cli = Cli::try_parse_from(["bodytrack", "--period-ms", "0"]).unwrap();
        assert!(matches!(build_config(&cli), Err(TrackerError::Config(_))));
    }

    #[test]
    fn test_gen_id_subcommand() {
        let cli = Cli::try_parse_from(["bodytrack", "gen-id", "-n", "3"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::GenId { count: 3 })));
    }

    #[test]
    fn test_runtime_exit_does_not_wait_for_blocking_reads() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let started = std::time::Instant::now();

        let value = run_to_completion(runtime, async {
            // Stands in for a stdin read that never completes
            let _read =
                tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(30)));
            7
        });

        assert_eq!(value, 7);
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
