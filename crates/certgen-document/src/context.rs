// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-call generation input and output, plus the storage collaborator traits.
//
// A `GenerationContext` is built fresh for every document and owned by that
// call alone, so documents can be generated in parallel without locking.

use certgen_core::error::Result;
use certgen_core::{DocxQrCodeConfig, OutputOptions, TemplateField, VariableMap};
use chrono::{DateTime, Utc};

use crate::docx::SubstitutionDiagnostic;

/// Object storage the surrounding application writes documents to.
pub trait Storage {
    /// Read the object at `path`.
    fn get_buffer(&self, path: &str) -> Result<Vec<u8>>;

    /// Stable public link to `path`.
    fn get_url(&self, path: &str) -> Result<String>;

    /// Time-limited link to `path`.
    fn get_signed_url(&self, path: &str, ttl_seconds: u64) -> Result<String>;
}

/// Turns a storage path into the link a QR code should carry.
///
/// Called before the document is stored, so the link points at where the
/// document *will* be.
pub trait StorageUrlResolver: Send + Sync {
    fn resolve(&self, path: Option<&str>, expires_in: Option<u64>) -> Result<String>;
}

impl<F> StorageUrlResolver for F
where
    F: Fn(Option<&str>, Option<u64>) -> Result<String> + Send + Sync,
{
    fn resolve(&self, path: Option<&str>, expires_in: Option<u64>) -> Result<String> {
        self(path, expires_in)
    }
}

/// Resolves QR storage links through a [`Storage`] backend.
///
/// A missing path falls back to `default_path`; an expiry selects a signed URL.
#[derive(Debug, Clone)]
pub struct StorageLinks<S> {
    storage: S,
    default_path: String,
}

impl<S: Storage> StorageLinks<S> {
    pub fn new(storage: S, default_path: impl Into<String>) -> Self {
        Self {
            storage,
            default_path: default_path.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: Storage + Send + Sync> StorageUrlResolver for StorageLinks<S> {
    fn resolve(&self, path: Option<&str>, expires_in: Option<u64>) -> Result<String> {
        let path = path.filter(|p| !p.is_empty()).unwrap_or(&self.default_path);
        match expires_in {
            Some(ttl) => self.storage.get_signed_url(path, ttl),
            None => self.storage.get_url(path),
        }
    }
}

/// Everything needed to produce one document.
pub struct GenerationContext {
    pub template: Vec<u8>,
    pub mime_type: String,
    pub variables: VariableMap,
    /// Coordinate fields, rendered in order. PDF and image templates only.
    pub fields: Vec<TemplateField>,
    /// QR codes to splice into a DOCX template.
    pub docx_qr_codes: Vec<DocxQrCodeConfig>,
    pub storage_url_resolver: Option<Box<dyn StorageUrlResolver>>,
    pub output: OutputOptions,
    /// Issuance time stamped into signed claims. Defaults to now.
    pub issued_at: Option<DateTime<Utc>>,
}

impl GenerationContext {
    pub fn new(template: Vec<u8>, mime_type: impl Into<String>, variables: VariableMap) -> Self {
        Self {
            template,
            mime_type: mime_type.into(),
            variables,
            fields: Vec::new(),
            docx_qr_codes: Vec::new(),
            storage_url_resolver: None,
            output: OutputOptions::default(),
            issued_at: None,
        }
    }

    pub fn with_fields(mut self, fields: Vec<TemplateField>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_docx_qr_codes(mut self, configs: Vec<DocxQrCodeConfig>) -> Self {
        self.docx_qr_codes = configs;
        self
    }

    pub fn with_storage_url_resolver(mut self, resolver: impl StorageUrlResolver + 'static) -> Self {
        self.storage_url_resolver = Some(Box::new(resolver));
        self
    }

    pub fn with_output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }

    pub fn with_issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at.unwrap_or_else(Utc::now)
    }
}

impl std::fmt::Debug for GenerationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationContext")
            .field("template_len", &self.template.len())
            .field("mime_type", &self.mime_type)
            .field("variables", &self.variables.len())
            .field("fields", &self.fields.len())
            .field("docx_qr_codes", &self.docx_qr_codes.len())
            .field("storage_url_resolver", &self.storage_url_resolver.is_some())
            .field("output", &self.output)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// A generated document and anything worth telling the caller about it.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub buffer: Vec<u8>,
    pub mime_type: &'static str,
    pub diagnostics: Vec<SubstitutionDiagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use certgen_core::CertgenError;

    struct MemoryStorage;

    impl Storage for MemoryStorage {
        fn get_buffer(&self, path: &str) -> Result<Vec<u8>> {
            Err(CertgenError::Configuration(format!("{path} not stored")))
        }

        fn get_url(&self, path: &str) -> Result<String> {
            Ok(format!("https://files.example/{path}"))
        }

        fn get_signed_url(&self, path: &str, ttl_seconds: u64) -> Result<String> {
            Ok(format!("https://files.example/{path}?ttl={ttl_seconds}"))
        }
    }

    #[test]
    fn storage_links_pick_signed_url_on_expiry() {
        let links = StorageLinks::new(MemoryStorage, "certs/default.pdf");
        assert_eq!(
            links.resolve(Some("certs/ana.pdf"), None).unwrap(),
            "https://files.example/certs/ana.pdf"
        );
        assert_eq!(
            links.resolve(None, Some(600)).unwrap(),
            "https://files.example/certs/default.pdf?ttl=600"
        );
        assert!(links.storage().get_buffer("x").is_err());
    }

    #[test]
    fn closures_are_resolvers() {
        let ctx = GenerationContext::new(vec![1, 2, 3], "application/pdf", VariableMap::new())
            .with_storage_url_resolver(|path: Option<&str>, _: Option<u64>| -> Result<String> {
                Ok(format!("s3://bucket/{}", path.unwrap_or("none")))
            });
        let resolver = ctx.storage_url_resolver.as_ref().unwrap();
        assert_eq!(resolver.resolve(Some("a.pdf"), None).unwrap(), "s3://bucket/a.pdf");
        assert!(format!("{ctx:?}").contains("template_len: 3"));
    }
}
