// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format conversion through a headless office suite.
//
// This is the only place the engine leaves the process. Every call runs under
// a hard deadline in its own process group with a throwaway user profile, and
// never leaves a stale or partial output file behind.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use certgen_core::error::{CertgenError, Result};
use certgen_core::{ConverterConfig, Orientation, OutputFormat, OutputOptions, PageSetup};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// How long to wait for the converter's stderr to drain once it has exited.
const STDERR_GRACE: Duration = Duration::from_secs(2);

/// Per-call conversion options.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Target extension understood by the converter, e.g. `pdf`.
    pub format: String,
    /// Defaults to the source file's directory.
    pub output_dir: Option<PathBuf>,
    /// Raw export filter, passed through as `<format>:<filters>`.
    pub filters: Option<String>,
    pub page_setup: Option<PageSetup>,
    /// Overrides the converter's configured deadline.
    pub timeout_ms: Option<u64>,
}

impl ConvertOptions {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            output_dir: None,
            filters: None,
            page_setup: None,
            timeout_ms: None,
        }
    }

    /// Options for producing `format` with the caller's output settings.
    pub fn for_output(format: OutputFormat, output: &OutputOptions) -> Self {
        Self {
            format: format.extension().to_string(),
            output_dir: None,
            filters: output.filters.clone(),
            page_setup: output.page_setup.clone(),
            timeout_ms: output.timeout_ms,
        }
    }
}

fn export_filter(format: &str) -> &'static str {
    match format {
        "pdf" => "writer_pdf_Export",
        "docx" => "MS Word 2007 XML",
        _ => "",
    }
}

/// Page setup as converter filter data. Lengths are in 1/100 mm.
fn page_setup_filter_data(setup: &PageSetup) -> serde_json::Value {
    let (mut width, mut height) = setup.paper_size.dimensions_mm();
    if setup.orientation == Orientation::Landscape {
        std::mem::swap(&mut width, &mut height);
    }
    let hmm = |mm: f32| serde_json::json!({ "type": "long", "value": ((mm * 100.0).round() as i64).to_string() });

    let mut data = serde_json::json!({
        "PaperFormat": { "type": "string", "value": setup.paper_size.name() },
        "PaperOrientation": {
            "type": "string",
            "value": match setup.orientation {
                Orientation::Portrait => "portrait",
                Orientation::Landscape => "landscape",
            }
        },
        "PaperWidth": hmm(width as f32),
        "PaperHeight": hmm(height as f32),
    });
    if let (Some(margins), Some(map)) = (setup.margins, data.as_object_mut()) {
        map.insert("MarginTop".into(), hmm(margins.top));
        map.insert("MarginRight".into(), hmm(margins.right));
        map.insert("MarginBottom".into(), hmm(margins.bottom));
        map.insert("MarginLeft".into(), hmm(margins.left));
    }
    data
}

/// The `--convert-to` argument.
///
/// An explicit filter string wins; otherwise page setup is sent as filter data.
pub fn convert_to_arg(options: &ConvertOptions) -> String {
    if let Some(filters) = options.filters.as_deref().filter(|f| !f.is_empty()) {
        if options.page_setup.is_some() {
            warn!("explicit export filter given, page setup ignored");
        }
        return format!("{}:{}", options.format, filters);
    }
    match &options.page_setup {
        Some(setup) if !export_filter(&options.format).is_empty() => format!(
            "{}:{}:{}",
            options.format,
            export_filter(&options.format),
            page_setup_filter_data(setup)
        ),
        _ => options.format.clone(),
    }
}

fn profile_url(dir: &Path) -> String {
    format!("file://{}", dir.display())
}

/// Kill every process left in the converter's process group.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) => debug!(pgid = pid, "converter process group killed"),
        Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid = pid, error = %e, "could not kill converter process group"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

fn read_stderr(child: &mut Child) -> Option<JoinHandle<Vec<u8>>> {
    let mut pipe = child.stderr.take()?;
    Some(tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!(error = %e, "converter stderr read interrupted");
        }
        buf
    }))
}

async fn collect_stderr(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    let Some(reader) = reader else {
        return String::new();
    };
    match tokio::time::timeout(STDERR_GRACE, reader).await {
        Ok(Ok(buf)) => String::from_utf8_lossy(&buf).trim().to_string(),
        _ => String::new(),
    }
}

async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed converter output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove converter output"),
    }
}

/// Bridge to the external converter.
#[derive(Debug, Clone)]
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert `source` and return the path of the produced file.
    ///
    /// Timeouts are reported as [`CertgenError::ConversionTimeout`], distinct
    /// from a converter that ran and failed.
    #[instrument(skip(self, options), fields(source = %source.display(), format = %options.format))]
    pub async fn convert(&self, source: &Path, options: &ConvertOptions) -> Result<PathBuf> {
        let stem = source
            .file_stem()
            .ok_or_else(|| CertgenError::Configuration(format!("no file name in {}", source.display())))?;
        let output_dir = match &options.output_dir {
            Some(dir) => dir.clone(),
            None => source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        let expected = output_dir.join(format!("{}.{}", stem.to_string_lossy(), options.format));

        // A leftover from an earlier attempt must not pass for this run's output.
        remove_if_present(&expected).await;

        let profile = tempfile::tempdir()?;
        let timeout_ms = options.timeout_ms.unwrap_or(self.config.timeout_ms);

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("--headless")
            .arg("--norestore")
            .arg("--convert-to")
            .arg(convert_to_arg(options))
            .arg("--outdir")
            .arg(&output_dir)
            .arg(format!("-env:UserInstallation={}", profile_url(profile.path())))
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        info!(binary = %self.config.binary.display(), timeout_ms, "starting conversion");

        let mut child = cmd.spawn().map_err(|e| CertgenError::ConversionFailed {
            exit_code: None,
            stderr: format!("failed to start {}: {e}", self.config.binary.display()),
        })?;
        let pid = child.id();
        let stderr_reader = read_stderr(&mut child);

        let waited = tokio::time::timeout(Duration::from_millis(timeout_ms), child.wait()).await;
        // Workers forked by the converter share its group and must not outlive the call.
        kill_process_group(pid);

        let status = match waited {
            Err(_) => {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "converter already gone");
                }
                let stderr = collect_stderr(stderr_reader).await;
                warn!(timeout_ms, "conversion deadline exceeded, converter killed");
                remove_if_present(&expected).await;
                return Err(CertgenError::ConversionTimeout { timeout_ms, stderr });
            }
            Ok(Err(e)) => {
                remove_if_present(&expected).await;
                return Err(CertgenError::ConversionFailed {
                    exit_code: None,
                    stderr: format!("failed waiting for {}: {e}", self.config.binary.display()),
                });
            }
            Ok(Ok(status)) => status,
        };

        let stderr = collect_stderr(stderr_reader).await;
        if !status.success() {
            warn!(exit_code = ?status.code(), "converter failed");
            remove_if_present(&expected).await;
            return Err(CertgenError::ConversionFailed {
                exit_code: status.code(),
                stderr,
            });
        }
        if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            return Err(CertgenError::ConversionOutputMissing { expected, stderr });
        }

        debug!(output = %expected.display(), "conversion complete");
        Ok(expected)
    }

    /// Convert an in-memory document inside a private working directory.
    pub async fn convert_bytes(
        &self,
        input: &[u8],
        source_extension: &str,
        options: &ConvertOptions,
    ) -> Result<Vec<u8>> {
        let work = tempfile::tempdir()?;
        let source = work.path().join(format!("document.{source_extension}"));
        tokio::fs::write(&source, input).await?;

        let out_dir = work.path().join("out");
        tokio::fs::create_dir(&out_dir).await?;
        let mut options = options.clone();
        options.output_dir = Some(out_dir);

        let produced = self.convert(&source, &options).await?;
        let bytes = tokio::fs::read(&produced).await?;
        info!(input_bytes = input.len(), output_bytes = bytes.len(), "converted document");
        Ok(bytes)
    }
}
