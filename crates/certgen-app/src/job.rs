// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job files: one JSON document describing one generation.

use std::path::{Path, PathBuf};

use certgen_core::error::{CertgenError, Result};
use certgen_core::{
    DocxQrCodeConfig, MIME_DOCX, MIME_PDF, MIME_PPTX, OutputFormat, OutputOptions, TemplateField,
    VariableMap,
};
use certgen_document::{GenerationContext, Storage, StorageLinks};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::storage::LocalStorage;

/// A generation job as written by the caller.
///
/// Relative paths are resolved against the job file's directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub template: PathBuf,
    /// Inferred from the template extension when absent.
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default = "default_format")]
    pub output_format: OutputFormat,
    pub output: PathBuf,
    #[serde(default)]
    pub variables: VariableMap,
    #[serde(default)]
    pub fields: Vec<TemplateField>,
    #[serde(default)]
    pub docx_qr_codes: Vec<DocxQrCodeConfig>,
    #[serde(default)]
    pub output_options: OutputOptions,
    /// Public URL the output directory is served from, for storage-link QR codes.
    #[serde(default)]
    pub storage_base_url: Option<String>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
}

fn default_format() -> OutputFormat {
    OutputFormat::Pdf
}

/// MIME type for a template file name.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "pdf" => MIME_PDF,
        "docx" => MIME_DOCX,
        "pptx" => MIME_PPTX,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => return None,
    })
}

impl Job {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn mime_type(&self) -> Result<String> {
        match &self.mime_type {
            Some(mime) => Ok(mime.clone()),
            None => mime_from_extension(&self.template)
                .map(str::to_string)
                .ok_or_else(|| {
                    CertgenError::UnsupportedTemplate(format!(
                        "cannot infer a MIME type for {}",
                        self.template.display()
                    ))
                }),
        }
    }

    /// Build the generation context, reading the template from `base_dir`.
    pub fn into_context(self, base_dir: &Path) -> Result<(GenerationContext, PathBuf)> {
        let mime_type = self.mime_type()?;
        let template_path = base_dir.join(&self.template);
        let (Some(template_dir), Some(template_name)) = (template_path.parent(), template_path.file_name())
        else {
            return Err(CertgenError::Configuration(format!(
                "template is not a file path: {}",
                self.template.display()
            )));
        };
        let template = LocalStorage::new(template_dir, None).get_buffer(&template_name.to_string_lossy())?;

        let output = base_dir.join(&self.output);
        let output_dir = output.parent().unwrap_or(base_dir).to_path_buf();
        let output_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut ctx = GenerationContext::new(template, mime_type, self.variables)
            .with_fields(self.fields)
            .with_docx_qr_codes(self.docx_qr_codes)
            .with_output(self.output_options);
        if let Some(issued_at) = self.issued_at {
            ctx = ctx.with_issued_at(issued_at);
        }
        if let Some(base_url) = self.storage_base_url {
            let storage = LocalStorage::new(output_dir, Some(base_url));
            ctx = ctx.with_storage_url_resolver(StorageLinks::new(storage, output_name));
        }
        Ok((ctx, output))
    }
}
