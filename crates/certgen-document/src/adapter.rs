// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format adapters, one per family of template types.

use certgen_core::error::{CertgenError, Result};
use certgen_core::{FieldType, MIME_DOCX, MIME_PDF, OutputFormat, QrContentType, TemplateType};
use lopdf::Document;
use tracing::{debug, info, instrument};

use crate::context::{GeneratedDocument, GenerationContext};
use crate::convert::{ConvertOptions, Converter};
use crate::docx::{DocxQrImage, process_package};
use crate::format::{format_value, resolve_pattern};
use crate::payload::QrPayloadResolver;
use crate::qr::{DEFAULT_QR_WIDTH, encode_png, render_qr};
use crate::render::background::image_page;
use crate::render::canvas::pdf_error;
use crate::render::{FieldContent, ResolvedField, render_fields};

/// Which kind of page a canvas template starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasSource {
    Pdf,
    /// A raster image, turned into a one-page PDF first.
    Image,
}

/// Renders coordinate fields onto PDF and image templates. Always emits PDF.
#[derive(Debug, Clone, Copy)]
pub struct CanvasAdapter {
    source: CanvasSource,
}

impl CanvasAdapter {
    pub fn new(source: CanvasSource) -> Self {
        Self { source }
    }

    fn load(&self, template: &[u8]) -> Result<Document> {
        match self.source {
            CanvasSource::Image => image_page(template),
            CanvasSource::Pdf => {
                Document::load_mem(template).map_err(|e| pdf_error("failed to load PDF template", e))
            }
        }
    }

    #[instrument(skip_all, fields(source = ?self.source, fields = ctx.fields.len()))]
    pub fn generate(
        &self,
        desired: OutputFormat,
        ctx: &GenerationContext,
        payloads: &QrPayloadResolver<'_>,
    ) -> Result<GeneratedDocument> {
        if desired != OutputFormat::Pdf {
            debug!(?desired, "canvas templates only produce PDF, requested format ignored");
        }

        let mut doc = self.load(&ctx.template)?;
        let resolved = ctx
            .fields
            .iter()
            .map(|field| {
                let value = || {
                    format_value(
                        ctx.variables.get(&field.key),
                        field.field_type,
                        field.format.as_deref(),
                    )
                };
                let content = match field.field_type {
                    FieldType::Qrcode => FieldContent::Qr(payloads.resolve(
                        &field.key,
                        field.qrcode_auth.as_ref(),
                        field.qrcode_storage_url.as_ref(),
                        value,
                    )?),
                    _ => FieldContent::Text(value()),
                };
                Ok::<_, CertgenError>(ResolvedField { field, content })
            })
            .collect::<Result<Vec<_>>>()?;

        render_fields(&mut doc, &resolved)?;

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| CertgenError::Pdf(format!("failed to serialise PDF: {e}")))?;
        info!(output_bytes = buffer.len(), "PDF generated");
        Ok(GeneratedDocument {
            buffer,
            mime_type: MIME_PDF,
            diagnostics: Vec::new(),
        })
    }
}

/// Substitutes variables into DOCX templates, converting to PDF on request.
#[derive(Debug, Clone)]
pub struct DocxAdapter {
    converter: Converter,
}

impl DocxAdapter {
    pub fn new(converter: Converter) -> Self {
        Self { converter }
    }

    fn qr_images(&self, ctx: &GenerationContext, payloads: &QrPayloadResolver<'_>) -> Result<Vec<DocxQrImage>> {
        let mut images = Vec::with_capacity(ctx.docx_qr_codes.len());
        for config in &ctx.docx_qr_codes {
            let mut content = payloads.resolve(
                &config.placeholder,
                config.auth.as_ref(),
                config.storage_url.as_ref(),
                || resolve_pattern(&config.content_pattern, &ctx.variables),
            )?;
            if config.content_type == Some(QrContentType::Url) {
                content = content.trim().to_string();
            }
            if content.is_empty() {
                debug!(placeholder = %config.placeholder, "empty QR content, placeholder left in place");
                continue;
            }

            let options = config.options.clone().unwrap_or_default();
            let image = render_qr(&config.placeholder, &content, &options)?;
            images.push(DocxQrImage {
                placeholder: config.placeholder.clone(),
                png: encode_png(&image)?,
                size_px: options.width.unwrap_or(DEFAULT_QR_WIDTH),
            });
        }
        Ok(images)
    }

    #[instrument(skip_all, fields(qr_codes = ctx.docx_qr_codes.len(), desired = ?desired))]
    pub async fn generate(
        &self,
        desired: OutputFormat,
        ctx: &GenerationContext,
        payloads: &QrPayloadResolver<'_>,
    ) -> Result<GeneratedDocument> {
        let images = self.qr_images(ctx, payloads)?;
        let output = process_package(&ctx.template, &ctx.variables, &images)?;

        match desired {
            OutputFormat::Docx => Ok(GeneratedDocument {
                buffer: output.buffer,
                mime_type: MIME_DOCX,
                diagnostics: output.diagnostics,
            }),
            OutputFormat::Pdf => {
                let options = ConvertOptions::for_output(OutputFormat::Pdf, &ctx.output);
                let buffer = self
                    .converter
                    .convert_bytes(&output.buffer, OutputFormat::Docx.extension(), &options)
                    .await?;
                Ok(GeneratedDocument {
                    buffer,
                    mime_type: MIME_PDF,
                    diagnostics: output.diagnostics,
                })
            }
        }
    }
}

/// A strategy able to produce documents from one family of template types.
#[derive(Debug, Clone)]
pub enum Adapter {
    Docx(DocxAdapter),
    Canvas(CanvasAdapter),
}

impl Adapter {
    pub fn supports(&self, template_type: TemplateType) -> bool {
        match self {
            Self::Docx(_) => template_type == TemplateType::Docx,
            Self::Canvas(canvas) => matches!(
                (canvas.source, template_type),
                (CanvasSource::Pdf, TemplateType::Pdf) | (CanvasSource::Image, TemplateType::Image)
            ),
        }
    }

    pub async fn generate(
        &self,
        desired: OutputFormat,
        ctx: &GenerationContext,
        payloads: &QrPayloadResolver<'_>,
    ) -> Result<GeneratedDocument> {
        match self {
            Self::Docx(docx) => docx.generate(desired, ctx, payloads).await,
            Self::Canvas(canvas) => canvas.generate(desired, ctx, payloads),
        }
    }
}

/// Pick the adapter for `template_type`.
pub fn dispatch(template_type: TemplateType, converter: &Converter) -> Result<Adapter> {
    let adapter = match template_type {
        TemplateType::Pdf => Adapter::Canvas(CanvasAdapter::new(CanvasSource::Pdf)),
        TemplateType::Image => Adapter::Canvas(CanvasAdapter::new(CanvasSource::Image)),
        TemplateType::Docx => Adapter::Docx(DocxAdapter::new(converter.clone())),
        TemplateType::Pptx => {
            return Err(CertgenError::NoAdapter {
                template_type: template_type.to_string(),
            });
        }
    };
    debug!(%template_type, "adapter selected");
    Ok(adapter)
}
