// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// certgen — generate one certificate from a JSON job description.
//
// Usage: certgen [--output-dir DIR] [--converter BIN] [--timeout-ms MS] <job.json>
//
// Signing and converter settings come from CERTGEN_* environment variables;
// the flags override the converter settings.
//
// The exit code tells an orchestrator whether a retry can help: 0 success,
// 75 converter timeout (retryable), 1 any other failure.

mod job;
mod storage;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use certgen_core::error::Result;
use certgen_core::{CertgenError, EngineConfig};
use certgen_document::DocumentEngine;
use clap::Parser;

use job::Job;

/// `EX_TEMPFAIL` from sysexits.h.
const EXIT_RETRYABLE: u8 = 75;

/// Generate one certificate from a JSON job description.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Job file describing template, variables, fields and output path
    job: PathBuf,

    /// Write the output into this directory instead of the job's output path
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Office converter binary used for DOCX to PDF
    #[arg(long)]
    converter: Option<PathBuf>,

    /// Conversion deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl Cli {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = EngineConfig::from_env()?;
        if let Some(binary) = &self.converter {
            config.converter.binary = binary.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.converter.timeout_ms = timeout_ms;
        }
        Ok(config)
    }

    fn output_path(&self, planned: PathBuf) -> PathBuf {
        match (&self.output_dir, planned.file_name()) {
            (Some(dir), Some(name)) => dir.join(name),
            _ => planned,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(output) => {
            println!("{}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, class = ?e.class(), "generation failed");
            eprintln!("certgen: {e}");
            if e.is_retryable() {
                ExitCode::from(EXIT_RETRYABLE)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: &Cli) -> Result<PathBuf> {
    let job = Job::load(&cli.job)?;
    let base_dir = cli.job.parent().unwrap_or_else(|| Path::new("."));
    let desired = job.output_format;

    let engine = DocumentEngine::new(cli.engine_config()?)?;
    let (ctx, planned) = job.into_context(base_dir)?;
    let output = cli.output_path(planned);
    tracing::info!(job = %cli.job.display(), output = %output.display(), "certgen starting");

    let document = engine.generate(desired, &ctx).await?;
    for diagnostic in &document.diagnostics {
        eprintln!("warning: {diagnostic}");
    }

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(&output, &document.buffer)
        .await
        .map_err(CertgenError::Io)?;
    tracing::info!(
        mime_type = document.mime_type,
        bytes = document.buffer.len(),
        diagnostics = document.diagnostics.len(),
        "output written"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_apply_on_top_of_environment() {
        let cli = Cli::try_parse_from([
            "certgen",
            "jobs/ana.json",
            "--output-dir",
            "/tmp/out",
            "--converter",
            "/opt/office/soffice",
            "--timeout-ms",
            "90000",
        ])
        .unwrap();
        assert_eq!(cli.job, PathBuf::from("jobs/ana.json"));
        assert_eq!(cli.output_path(PathBuf::from("jobs/out/ana.pdf")), PathBuf::from("/tmp/out/ana.pdf"));

        let config = cli.engine_config().unwrap();
        assert_eq!(config.converter.binary, PathBuf::from("/opt/office/soffice"));
        assert_eq!(config.converter.timeout_ms, 90_000);
    }

    #[test]
    fn job_path_is_required_and_flags_are_checked() {
        assert!(Cli::try_parse_from(["certgen"]).is_err());
        assert!(Cli::try_parse_from(["certgen", "job.json", "--no-such-flag"]).is_err());
        let cli = Cli::try_parse_from(["certgen", "job.json"]).unwrap();
        assert_eq!(cli.output_path(PathBuf::from("out/a.pdf")), PathBuf::from("out/a.pdf"));
    }
}
