use std::future::Future;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dpdp_audit_core::{
    render_report_with, service::parse_timeout, ColorToken, HttpScanTransport, OutputFormat,
    ScanController, ScanOutcome, ScanState, ScoreBand, ServiceSettings, SeverityClass,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "dpdp-audit",
    author,
    version,
    about = "Scan public repositories for DPDP compliance violations"
)]
struct Cli {
    /// Optional config file with a `[service]` table (endpoint, timeout)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Base URL of the scanning service (overrides DPDP_AUDIT_ENDPOINT)
    #[arg(long, value_name = "URL", global = true)]
    endpoint: Option<String>,

    /// Give up on a scan after this long, e.g. `90s` (overrides DPDP_AUDIT_TIMEOUT)
    #[arg(long, value_name = "DURATION", global = true, value_parser = parse_timeout_arg)]
    timeout: Option<Duration>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a single repository and print the findings
    Scan {
        /// Public repository URL, e.g. https://github.com/pallets/flask
        repo_url: String,
        /// Emit the report as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Read repository URLs from stdin and scan them one at a time
    Session {
        #[arg(long)]
        json: bool,
    },
    /// Show how a score or severity is classified
    Classify {
        #[arg(long, allow_negative_numbers = true)]
        score: Option<i64>,
        #[arg(long)]
        severity: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    service: ServiceSection,
}

#[derive(Debug, Default, Deserialize)]
struct ServiceSection {
    endpoint: Option<String>,
    timeout: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    if cli.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    match &cli.command {
        Commands::Scan { repo_url, json } => {
            let settings = resolve_settings(&cli)?;
            scan(&settings, repo_url, *json).await
        }
        Commands::Session { json } => {
            let settings = resolve_settings(&cli)?;
            session(&settings, *json).await
        }
        Commands::Classify {
            score,
            severity,
            json,
        } => classify(*score, severity.as_deref(), *json),
    }
}

/// Defaults, then the config file, then the environment, then flags.
fn resolve_settings(cli: &Cli) -> Result<ServiceSettings> {
    let mut settings = ServiceSettings::default();
    if let Some(path) = &cli.config {
        let file = load_file_config(path)?;
        if let Some(endpoint) = file.service.endpoint {
            settings.endpoint = endpoint;
        }
        if let Some(timeout) = file.service.timeout {
            settings.timeout = parse_timeout(&timeout)
                .with_context(|| format!("invalid service.timeout in {}", path.display()))?;
        }
    }
    let mut settings = settings.with_env()?;
    if let Some(endpoint) = &cli.endpoint {
        settings.endpoint = endpoint.clone();
    }
    if let Some(timeout) = cli.timeout {
        settings.timeout = timeout;
    }
    Ok(settings)
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .and_then(|cfg| cfg.try_deserialize::<FileConfig>())
        .with_context(|| format!("failed to load config from {}", path.display()))
}

fn controller(settings: &ServiceSettings) -> Result<ScanController<HttpScanTransport>> {
    let transport = HttpScanTransport::new(settings)?;
    info!(
        url = transport.url(),
        timeout = %humantime::format_duration(settings.timeout),
        "scan service configured"
    );
    Ok(ScanController::with_timeout(Arc::new(transport), settings.timeout))
}

async fn scan(settings: &ServiceSettings, repo_url: &str, json: bool) -> Result<ExitCode> {
    let controller = controller(settings)?;
    let outcome = controller.submit(repo_url).await?;
    let state = match outcome {
        ScanOutcome::Settled(state) => state,
        ScanOutcome::Abandoned => bail!("scan was abandoned before it completed"),
    };
    print!("{}", render(&state, json)?);
    Ok(exit_code(&state))
}

async fn session(settings: &ServiceSettings, json: bool) -> Result<ExitCode> {
    let controller = controller(settings)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut last = ScanState::Idle;
    if !json {
        println!("Enter a repository URL per line (try https://github.com/pallets/flask).");
    }

    while stdin_open {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read repository URL from stdin")?,
            () = interrupted() => None,
        };
        let Some(line) = line else { break };

        let pending = match controller.begin(line.trim()) {
            Ok(pending) => pending,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };
        if !json {
            println!("⏳ Scanning {}...", pending.request().repo_url);
        }

        let resolve = pending.resolve();
        let interrupt = async {
            interrupted().await;
            controller.close();
        };
        tokio::pin!(resolve, interrupt);
        let outcome = loop {
            tokio::select! {
                biased;
                outcome = &mut resolve => break outcome,
                () = &mut interrupt => break ScanOutcome::Abandoned,
                line = lines.next_line(), if stdin_open => {
                    match line.context("failed to read repository URL from stdin")? {
                        // The running scan holds Loading, so this submission is refused.
                        Some(line) => {
                            if let Err(err) = controller.begin(line.trim()) {
                                eprintln!("{err}");
                            }
                        }
                        None => stdin_open = false,
                    }
                }
            }
        };
        match outcome {
            ScanOutcome::Settled(state) => {
                print!("{}", render(&state, json)?);
                last = state;
            }
            ScanOutcome::Abandoned => {
                warn!("interrupted; in-flight scan abandoned");
                break;
            }
        }
    }

    controller.teardown();
    Ok(exit_code(&last))
}

async fn interrupted() {
    wait_for_interrupt(tokio::signal::ctrl_c()).await;
}

/// Resolves when `signal` fires. Never resolves if the handler could not be installed.
async fn wait_for_interrupt(signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(err) = signal.await {
        warn!(error = %err, "failed to listen for Ctrl-C; interrupts are disabled");
        std::future::pending::<()>().await;
    }
}

fn render(state: &ScanState, json: bool) -> Result<String> {
    if json {
        let mut out = render_report_with(state, OutputFormat::Json, &paint)?;
        out.push('\n');
        return Ok(out);
    }
    render_report_with(state, OutputFormat::Human, &paint)
}

fn paint(text: &str, color: ColorToken) -> String {
    let (r, g, b) = color.rgb();
    text.truecolor(r, g, b).bold().to_string()
}

fn exit_code(state: &ScanState) -> ExitCode {
    match state {
        ScanState::Failed(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

#[derive(Debug, Serialize)]
struct Classification<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<ScoreClassification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<SeverityClassification<'a>>,
}

#[derive(Debug, Serialize)]
struct ScoreClassification {
    value: i64,
    band: ScoreBand,
    label: &'static str,
    color: ColorToken,
}

#[derive(Debug, Serialize)]
struct SeverityClassification<'a> {
    value: &'a str,
    class: SeverityClass,
    marker: &'static str,
    color: ColorToken,
}

fn classify(score: Option<i64>, severity: Option<&str>, json: bool) -> Result<ExitCode> {
    if score.is_none() && severity.is_none() {
        bail!("nothing to classify: pass --score and/or --severity");
    }
    let classification = Classification {
        score: score.map(|value| {
            let band = ScoreBand::from_score(value);
            ScoreClassification {
                value,
                band,
                label: band.label(),
                color: band.color(),
            }
        }),
        severity: severity.map(|value| {
            let class = SeverityClass::from_label(value);
            SeverityClassification {
                value,
                class,
                marker: class.marker(),
                color: class.color(),
            }
        }),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
        return Ok(ExitCode::SUCCESS);
    }
    if let Some(score) = &classification.score {
        println!(
            "score {value:>4} :: {label} ({band}, {color})",
            value = score.value,
            label = paint(score.label, score.color),
            band = score.band.as_str(),
            color = score.color.hex()
        );
    }
    if let Some(severity) = &classification.severity {
        println!(
            "severity {value:?} :: {marker} {class:?} ({color})",
            value = severity.value,
            marker = severity.marker,
            class = severity.class,
            color = severity.color.hex()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn parse_timeout_arg(raw: &str) -> std::result::Result<Duration, String> {
    parse_timeout(raw).map_err(|err| format!("{err:#}"))
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[tokio::test]
    async fn interrupt_fires_when_signal_arrives() {
        let fired = tokio::time::timeout(
            Duration::from_millis(200),
            wait_for_interrupt(async { Ok(()) }),
        )
        .await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn failed_signal_registration_never_interrupts() {
        let signal = async { Err(io::Error::new(io::ErrorKind::Other, "no handler")) };
        let fired =
            tokio::time::timeout(Duration::from_millis(50), wait_for_interrupt(signal)).await;
        assert!(fired.is_err(), "a failed handler must not abandon the scan");
    }
}
