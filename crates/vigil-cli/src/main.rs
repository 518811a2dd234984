use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use vigil_client::HttpSessionFactory;
use vigil_core::traits::SessionFactory;
use vigil_core::{
    CheckSpec, OutcomeStatus, RunConfig, RunReport, Runner, Scenario, SessionMode, SuiteConfig,
    SuiteGroup, TracingRunReporter, WaitPolicy, build_suite,
};

#[derive(Parser)]
#[command(name = "vigil", version, about = "Content invariant verifier for documentation sites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scenario suite against a site
    Run(RunArgs),

    /// List scenarios and their checks without running them
    List {
        #[command(flatten)]
        suite: SuiteArgs,
    },

    /// Print the effective suite configuration as JSON
    Config {
        #[command(flatten)]
        suite: SuiteArgs,
    },
}

#[derive(Args)]
struct SuiteArgs {
    /// Suite configuration file (JSON); built-in defaults when omitted
    #[arg(short, long, env = "VIGIL_SUITE")]
    suite: Option<PathBuf>,

    /// Only run these groups (repeatable)
    #[arg(short, long = "group", value_parser = parse_group)]
    groups: Vec<SuiteGroup>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    suite: SuiteArgs,

    /// Site root (overrides VIGIL_BASE_URL / BASE_URL)
    #[arg(short, long)]
    base_url: Option<String>,

    /// Rendering engine
    #[arg(short, long, value_enum, env = "VIGIL_ENGINE", default_value_t = Engine::Http)]
    engine: Engine,

    /// Scenarios in flight at once
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Run every scenario sequentially on one session
    #[arg(long, default_value_t = false)]
    shared_session: bool,

    /// Budget for each element probe, in milliseconds
    #[arg(long)]
    probe_timeout_ms: Option<u64>,

    /// Budget for each navigation, in seconds
    #[arg(long)]
    navigation_timeout_secs: Option<u64>,

    /// Cancel the run after this many seconds
    #[arg(long)]
    run_timeout_secs: Option<u64>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Engine {
    /// Static HTML over HTTP; no JavaScript, no computed styles
    Http,
    /// Headless Chromium (requires the `browser` feature)
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
    Csv,
}

fn parse_group(raw: &str) -> Result<SuiteGroup, String> {
    raw.parse()
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vigil=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::List { suite } => {
            cmd_list(&suite)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { suite } => {
            let config = load_suite(suite.suite.as_deref())?;
            println!("{}", config.to_json_pretty()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_suite(path: Option<&Path>) -> Result<SuiteConfig> {
    match path {
        Some(path) => SuiteConfig::from_json_file(path)
            .with_context(|| format!("Failed to load suite file: {}", path.display())),
        None => Ok(SuiteConfig::default()),
    }
}

fn scenarios(args: &SuiteArgs) -> Result<Vec<Scenario>> {
    let config = load_suite(args.suite.as_deref())?;
    build_suite(&config, &args.groups).context("Failed to build scenario suite")
}

/// Environment first, then command-line overrides.
fn run_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = RunConfig::from_env().context("Invalid environment configuration")?;

    if let Some(url) = &args.base_url {
        config = config.with_base_url(url)?;
    }
    if let Some(n) = args.concurrency {
        config = config.with_concurrency(n)?;
    }
    if args.shared_session {
        config = config.with_session_mode(SessionMode::Shared);
    }
    if let Some(ms) = args.probe_timeout_ms {
        let poll_interval = config.wait.poll_interval;
        config = config.with_wait(
            WaitPolicy::new(Duration::from_millis(ms)).with_poll_interval(poll_interval),
        );
    }
    if let Some(secs) = args.navigation_timeout_secs {
        anyhow::ensure!(secs > 0, "--navigation-timeout-secs must be at least 1");
        config = config.with_navigation_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.run_timeout_secs {
        config = config.with_run_timeout(Duration::from_secs(secs));
    }
    config.validate()?;
    Ok(config)
}

async fn cmd_run(args: RunArgs) -> Result<ExitCode> {
    let scenarios = scenarios(&args.suite)?;
    let config = run_config(&args)?;

    tracing::info!(
        base_url = %config.base_url,
        engine = ?args.engine,
        scenarios = scenarios.len(),
        "Verifying site"
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling run");
            interrupt.cancel();
        }
    });

    let report = match args.engine {
        Engine::Http => {
            let factory = HttpSessionFactory::with_timeout(config.navigation_timeout)
                .context("Failed to create HTTP client")?;
            execute(factory, config, &scenarios, cancel).await
        }
        Engine::Browser => run_browser(config, &scenarios, cancel).await?,
    };

    write_report(&report, args.format, args.output.as_deref())?;

    let summary = report.summary();
    eprintln!("{summary}");
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn execute<F: SessionFactory>(
    factory: F,
    config: RunConfig,
    scenarios: &[Scenario],
    cancel: CancellationToken,
) -> RunReport {
    Runner::new(factory, config)
        .run(scenarios, cancel, &TracingRunReporter)
        .await
}

#[cfg(feature = "browser")]
async fn run_browser(
    config: RunConfig,
    scenarios: &[Scenario],
    cancel: CancellationToken,
) -> Result<RunReport> {
    let options = vigil_client::BrowserOptions::from_env()
        .context("Invalid browser configuration")?
        .with_navigation_timeout(config.navigation_timeout);
    let factory = vigil_client::BrowserSessionFactory::launch_with(options)
        .await
        .context("Failed to launch browser")?;
    Ok(execute(factory, config, scenarios, cancel).await)
}

#[cfg(not(feature = "browser"))]
async fn run_browser(
    _config: RunConfig,
    _scenarios: &[Scenario],
    _cancel: CancellationToken,
) -> Result<RunReport> {
    anyhow::bail!("the browser engine requires building with `--features browser`")
}

fn write_report(report: &RunReport, format: Format, output: Option<&Path>) -> Result<()> {
    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };

    match format {
        Format::Table => render_table(report, &mut out)?,
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(report)?)?,
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for outcome in report.sorted() {
                writer.serialize(outcome)?;
            }
            writer.flush()?;
            return Ok(());
        }
    }
    out.flush()?;
    Ok(())
}

fn render_table(report: &RunReport, out: &mut dyn Write) -> Result<()> {
    let rows = report.sorted();
    let scenario_width = rows
        .iter()
        .map(|o| o.group.len() + o.scenario.len() + 1)
        .max()
        .unwrap_or(0);
    let target_width = rows.iter().map(|o| o.target.len()).max().unwrap_or(0);

    for outcome in rows {
        let marker = match outcome.status {
            OutcomeStatus::Passed => "PASS",
            OutcomeStatus::Failed => "FAIL",
            OutcomeStatus::Skipped => "SKIP",
            OutcomeStatus::Incomplete => "INCOMPLETE",
        };
        writeln!(
            out,
            "{marker:<10}  {:<scenario_width$}  {:<target_width$}  {}: {}",
            format!("{}/{}", outcome.group, outcome.scenario),
            outcome.target,
            outcome.check,
            outcome.message,
        )?;
    }
    writeln!(
        out,
        "\nRun {} finished in {} ms{}",
        report.run_id,
        report.duration().num_milliseconds(),
        if report.cancelled { " (cancelled)" } else { "" }
    )?;
    Ok(())
}

fn cmd_list(args: &SuiteArgs) -> Result<()> {
    let scenarios = scenarios(args)?;
    if scenarios.is_empty() {
        println!("No scenarios selected");
        return Ok(());
    }

    let mut checks = 0;
    for scenario in &scenarios {
        println!("{} @ {}", scenario.qualified_name(), scenario.target);
        for check in scenario.checks() {
            checks += 1;
            let detail = match &check.spec {
                CheckSpec::Element {
                    chain, invariant, ..
                } => format!("{chain}: {invariant}"),
                CheckSpec::Location(invariant) => invariant.to_string(),
                CheckSpec::Response(invariant) => invariant.to_string(),
            };
            println!("    - {} ({detail})", check.label);
        }
    }
    println!("\nTotal: {} scenarios, {checks} checks", scenarios.len());
    Ok(())
}
