// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CertgenError, Result};
use crate::types::{CertificateAuthConfig, HmacAlgorithm};

/// Default deadline for a single converter invocation.
pub const DEFAULT_CONVERT_TIMEOUT_MS: u64 = 60_000;

/// How the external office converter is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Converter executable (headless office suite).
    pub binary: PathBuf,
    /// Deadline used when a request does not carry its own.
    pub timeout_ms: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("soffice"),
            timeout_ms: DEFAULT_CONVERT_TIMEOUT_MS,
        }
    }
}

/// Process-wide settings handed to the engine at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Signing material. `None` disables signed QR codes.
    pub certificate_auth: Option<CertificateAuthConfig>,
    pub converter: ConverterConfig,
}

impl EngineConfig {
    /// Build the configuration from `CERTGEN_*` environment variables.
    ///
    /// Signing is enabled only when `CERTGEN_SECRET_KEY` is set, in which case
    /// `CERTGEN_VERIFICATION_URL` becomes mandatory.
    pub fn from_env() -> Result<Self> {
        let certificate_auth = match std::env::var("CERTGEN_SECRET_KEY") {
            Ok(secret_key) if !secret_key.is_empty() => {
                let verification_base_url = std::env::var("CERTGEN_VERIFICATION_URL")
                    .map_err(|_| {
                        CertgenError::Configuration(
                            "CERTGEN_VERIFICATION_URL must be set when CERTGEN_SECRET_KEY is".into(),
                        )
                    })?;
                let algorithm = match std::env::var("CERTGEN_HMAC_ALGORITHM") {
                    Ok(raw) => raw
                        .parse::<HmacAlgorithm>()
                        .map_err(CertgenError::Configuration)?,
                    Err(_) => HmacAlgorithm::default(),
                };
                Some(CertificateAuthConfig {
                    secret_key,
                    verification_base_url,
                    algorithm,
                })
            }
            _ => None,
        };

        let mut converter = ConverterConfig::default();
        if let Ok(bin) = std::env::var("CERTGEN_CONVERTER_BIN") {
            converter.binary = PathBuf::from(bin);
        }
        if let Ok(raw) = std::env::var("CERTGEN_CONVERT_TIMEOUT_MS") {
            converter.timeout_ms = raw.parse().map_err(|_| {
                CertgenError::Configuration(format!("CERTGEN_CONVERT_TIMEOUT_MS is not a number: {raw}"))
            })?;
        }

        Ok(Self {
            certificate_auth,
            converter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_signing() {
        let cfg = EngineConfig::default();
        assert!(cfg.certificate_auth.is_none());
        assert_eq!(cfg.converter.timeout_ms, DEFAULT_CONVERT_TIMEOUT_MS);
        assert_eq!(cfg.converter.binary, PathBuf::from("soffice"));
    }
}
