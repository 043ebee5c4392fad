// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for certgen.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all generation operations.
///
/// Verification outcomes live in `certgen_security::VerificationError`.
#[derive(Debug, Error)]
pub enum CertgenError {
    // -- Configuration errors --
    #[error("unsupported template type: {0}")]
    UnsupportedTemplate(String),

    #[error("no adapter supports template type {template_type}")]
    NoAdapter { template_type: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    // -- Rendering errors --
    #[error("field `{field}`: {reason}")]
    Render { field: String, reason: String },

    #[error("field `{field}` has invalid geometry (x={x}, y={y}, w={w}, h={h})")]
    InvalidGeometry {
        field: String,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },

    #[error("field `{field}` requests unknown font family `{font}`")]
    UnknownFont { field: String, font: String },

    #[error("field `{field}` has invalid color `{value}`")]
    InvalidColor { field: String, value: String },

    #[error("QR code for `{field}` could not be encoded: {reason}")]
    QrEncoding { field: String, reason: String },

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("DOCX package error: {0}")]
    Docx(String),

    // -- Conversion errors --
    #[error("conversion exceeded its {timeout_ms} ms deadline")]
    ConversionTimeout { timeout_ms: u64, stderr: String },

    #[error("converter exited with {exit_code:?}: {stderr}")]
    ConversionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("converter produced no output at {expected}: {stderr}")]
    ConversionOutputMissing { expected: PathBuf, stderr: String },

    // -- Certificate signing --
    #[error("certificate signing failed: {0}")]
    Certificate(String),

    // -- I/O --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification an orchestrating caller uses to decide on retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Unsupported input or missing setup. Never retried.
    Configuration,
    /// The document itself cannot be produced. Other documents are unaffected.
    Rendering,
    /// The converter failed outright.
    Conversion,
    /// The converter ran out of time. The only class worth retrying.
    ConversionTimeout,
}

impl CertgenError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnsupportedTemplate(_)
            | Self::NoAdapter { .. }
            | Self::Configuration(_)
            | Self::Certificate(_) => ErrorClass::Configuration,

            Self::Render { .. }
            | Self::InvalidGeometry { .. }
            | Self::UnknownFont { .. }
            | Self::InvalidColor { .. }
            | Self::QrEncoding { .. }
            | Self::Pdf(_)
            | Self::Image(_)
            | Self::Docx(_)
            | Self::Serialization(_) => ErrorClass::Rendering,

            Self::ConversionTimeout { .. } => ErrorClass::ConversionTimeout,
            Self::ConversionFailed { .. } | Self::ConversionOutputMissing { .. } => {
                ErrorClass::Conversion
            }

            Self::Io(io_err) => match io_err.kind() {
                std::io::ErrorKind::TimedOut => ErrorClass::ConversionTimeout,
                _ => ErrorClass::Rendering,
            },
        }
    }

    /// Whether an orchestrator may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::ConversionTimeout
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CertgenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_are_retryable() {
        let timeout = CertgenError::ConversionTimeout {
            timeout_ms: 10,
            stderr: String::new(),
        };
        let failed = CertgenError::ConversionFailed {
            exit_code: Some(1),
            stderr: "boom".into(),
        };
        assert!(timeout.is_retryable());
        assert!(!failed.is_retryable());
        assert_eq!(failed.class(), ErrorClass::Conversion);
    }

    #[test]
    fn render_errors_name_the_field() {
        let err = CertgenError::UnknownFont {
            field: "holder".into(),
            font: "Comic".into(),
        };
        assert_eq!(err.class(), ErrorClass::Rendering);
        assert!(err.to_string().contains("holder"));
    }

    #[test]
    fn missing_adapter_is_configuration() {
        let err = CertgenError::NoAdapter {
            template_type: "pptx".into(),
        };
        assert_eq!(err.class(), ErrorClass::Configuration);
    }
}
