//! CLI entrypoint for the TLS API conformance harness.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tlsapi_core::{ClientTrustPolicy, ModelLibrary, ModelOptions};
use tlsapi_harness::structured_log::{
    ArtifactIndex, LogEmitter, LogEntry, LogLevel, validate_log_file,
};
use tlsapi_harness::{ApiTestRunner, HarnessConfig};

/// Conformance tooling for the TLS lifecycle API.
#[derive(Debug, Parser)]
#[command(name = "tlsapi-harness")]
#[command(about = "Conformance harness for the TLS configuration/session lifecycle API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run all API tests against the reference library.
    Run {
        /// Harness config JSON (overrides --fixture-root).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Fixture tree used when no config file is given.
        #[arg(long, default_value = "tests/fixtures")]
        fixture_root: PathBuf,
        /// Output report path (`.json` for JSON, anything else for markdown).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Artifact index path linking the log and report.
        #[arg(long)]
        artifact_index: Option<PathBuf>,
        /// Client trust policy of the reference library (`enforce` or `permissive`).
        #[arg(long)]
        client_trust: Option<String>,
        /// Cap on live contexts in the reference library.
        #[arg(long)]
        max_contexts: Option<usize>,
        /// Exit non-zero when any sub-test failed.
        #[arg(long)]
        fail_on_failure: bool,
    },
    /// Validate a structured JSONL log.
    ValidateLog {
        #[arg(long)]
        log: PathBuf,
    },
    /// Print the default config for a fixture tree.
    PrintConfig {
        #[arg(long, default_value = "tests/fixtures")]
        fixture_root: PathBuf,
    },
}

#[allow(clippy::too_many_arguments)]
fn run(
    config: Option<PathBuf>,
    fixture_root: &Path,
    report: Option<PathBuf>,
    log: Option<PathBuf>,
    artifact_index: Option<PathBuf>,
    client_trust: Option<String>,
    max_contexts: Option<usize>,
    fail_on_failure: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config {
        Some(path) => HarnessConfig::from_file(&path)?,
        None => HarnessConfig::for_root(fixture_root),
    };
    config.ensure_fixtures()?;

    let mut options = ModelOptions::from_env();
    if let Some(policy) = client_trust {
        options = options.with_client_trust(ClientTrustPolicy::from_str_loose(&policy));
    }
    if max_contexts.is_some() {
        options = options.with_max_contexts(max_contexts);
    }
    let library = ModelLibrary::with_options(options);
    eprintln!(
        "Running API tests: suite={} client_trust={}",
        config.suite,
        options.client_trust.as_str()
    );

    let runner = ApiTestRunner::new(config.clone());
    let run_id = format!(
        "run-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    );
    let mut emitter = match &log {
        Some(path) => Some(LogEmitter::to_file(path, &config.suite, &run_id)?),
        None => None,
    };
    let report_doc = match emitter.as_mut() {
        Some(emitter) => runner.run_logged(&library, emitter)?,
        None => runner.run(&library),
    };

    print!("{}", report_doc.render_plain());

    if let Some(path) = &report {
        let body = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            report_doc.to_json()
        } else {
            report_doc.to_markdown()
        };
        std::fs::write(path, body)?;
        eprintln!("Report written to {}", path.display());
    }

    if let Some(emitter) = emitter.as_mut() {
        let refs: Vec<String> = report
            .iter()
            .chain(artifact_index.iter())
            .map(|path| path.display().to_string())
            .collect();
        if !refs.is_empty() {
            emitter.emit_entry(LogEntry::new("", LogLevel::Info, "artifacts").with_artifacts(refs))?;
        }
        emitter.flush()?;
    }

    // The index hashes the log, so the log must be complete first.
    if let Some(index_path) = &artifact_index {
        let mut index = ArtifactIndex::new(&run_id, &config.suite);
        if let Some(path) = &log {
            index.add_file(path, "log")?;
        }
        if let Some(path) = &report {
            index.add_file(path, "report")?;
        }
        std::fs::write(index_path, index.to_json()?)?;
        eprintln!("Artifact index written to {}", index_path.display());
    }

    eprintln!(
        "API tests complete: total={}, passed={}, failed={}, undefined={}, quirks={}",
        report_doc.summary.total,
        report_doc.summary.passed,
        report_doc.summary.failed,
        report_doc.summary.undefined,
        report_doc.quirks.len()
    );
    if fail_on_failure && !report_doc.summary.all_passed() {
        return Err(format!("{} sub-test(s) failed", report_doc.summary.failed).into());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            fixture_root,
            report,
            log,
            artifact_index,
            client_trust,
            max_contexts,
            fail_on_failure,
        } => run(
            config,
            &fixture_root,
            report,
            log,
            artifact_index,
            client_trust,
            max_contexts,
            fail_on_failure,
        )?,
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            for err in &errors {
                eprintln!("{err}");
            }
            if !errors.is_empty() {
                return Err(format!(
                    "{} violation(s) in {} line(s) of {}",
                    errors.len(),
                    lines,
                    log.display()
                )
                .into());
            }
            eprintln!("{}: {lines} valid line(s)", log.display());
        }
        Command::PrintConfig { fixture_root } => {
            println!("{}", HarnessConfig::for_root(&fixture_root).to_json()?);
        }
    }
    Ok(())
}
