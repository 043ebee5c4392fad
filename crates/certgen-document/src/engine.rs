// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document engine: the entry point callers use to generate one document.

use certgen_core::error::{CertgenError, Result};
use certgen_core::{EngineConfig, OutputFormat, TemplateType};
use certgen_security::CertificateAuthenticator;
use tracing::{info, instrument};

use crate::adapter::{Adapter, dispatch};
use crate::context::{GeneratedDocument, GenerationContext};
use crate::convert::Converter;
use crate::payload::QrPayloadResolver;

/// Holds process-scoped configuration. Holds no per-document state, so one
/// engine can serve any number of concurrent generations.
pub struct DocumentEngine {
    authenticator: Option<CertificateAuthenticator>,
    converter: Converter,
}

impl DocumentEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let authenticator = config
            .certificate_auth
            .map(CertificateAuthenticator::new)
            .transpose()?;
        info!(
            signing = authenticator.is_some(),
            converter = %config.converter.binary.display(),
            timeout_ms = config.converter.timeout_ms,
            "document engine ready"
        );
        Ok(Self {
            authenticator,
            converter: Converter::new(config.converter),
        })
    }

    pub fn authenticator(&self) -> Option<&CertificateAuthenticator> {
        self.authenticator.as_ref()
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn dispatch(&self, template_type: TemplateType) -> Result<Adapter> {
        dispatch(template_type, &self.converter)
    }

    /// Generate a document, classifying the template from `ctx.mime_type`.
    pub async fn generate(&self, desired: OutputFormat, ctx: &GenerationContext) -> Result<GeneratedDocument> {
        let template_type = TemplateType::from_mime_type(&ctx.mime_type)
            .ok_or_else(|| CertgenError::UnsupportedTemplate(ctx.mime_type.clone()))?;
        self.generate_as(template_type, desired, ctx).await
    }

    /// Generate a document from a template of a known type.
    #[instrument(skip(self, ctx), fields(template_len = ctx.template.len()))]
    pub async fn generate_as(
        &self,
        template_type: TemplateType,
        desired: OutputFormat,
        ctx: &GenerationContext,
    ) -> Result<GeneratedDocument> {
        let adapter = self.dispatch(template_type)?;
        let payloads = QrPayloadResolver {
            authenticator: self.authenticator.as_ref(),
            storage: ctx.storage_url_resolver.as_deref(),
            template: &ctx.template,
            variables: &ctx.variables,
            issued_at: ctx.issued_at(),
        };
        let document = adapter.generate(desired, ctx, &payloads).await?;
        info!(
            mime_type = document.mime_type,
            output_bytes = document.buffer.len(),
            diagnostics = document.diagnostics.len(),
            "document generated"
        );
        Ok(document)
    }
}

impl std::fmt::Debug for DocumentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentEngine")
            .field("signing", &self.authenticator.is_some())
            .field("converter", &self.converter)
            .finish()
    }
}
