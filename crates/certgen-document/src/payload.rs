// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR payload selection.
//
// A QR code carries, in order of preference: a signed verification link, a
// link to the stored document, or the plain field value.

use certgen_core::error::{CertgenError, Result};
use certgen_core::{QrCodeAuth, QrStorageUrl, VariableMap};
use certgen_security::{CertificateAuthenticator, CertificateData, content_fingerprint};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::context::StorageUrlResolver;

/// Everything a QR payload may draw on for one document.
pub struct QrPayloadResolver<'a> {
    pub authenticator: Option<&'a CertificateAuthenticator>,
    pub storage: Option<&'a dyn StorageUrlResolver>,
    pub template: &'a [u8],
    pub variables: &'a VariableMap,
    pub issued_at: DateTime<Utc>,
}

impl QrPayloadResolver<'_> {
    /// Payload for the QR code identified by `subject` (field key or placeholder).
    pub fn resolve(
        &self,
        subject: &str,
        auth: Option<&QrCodeAuth>,
        storage_url: Option<&QrStorageUrl>,
        value: impl FnOnce() -> String,
    ) -> Result<String> {
        if let Some(auth) = auth.filter(|a| a.enabled) {
            return self.signed_link(subject, auth);
        }
        if let Some(storage_url) = storage_url.filter(|s| s.enabled) {
            let resolver = self.storage.ok_or_else(|| {
                CertgenError::Configuration(format!(
                    "QR code `{subject}` wants a storage URL but no storage resolver was supplied"
                ))
            })?;
            let url = resolver.resolve(storage_url.path.as_deref(), storage_url.expires_in)?;
            debug!(subject, signed = storage_url.expires_in.is_some(), "QR carries storage URL");
            return Ok(url);
        }
        Ok(value())
    }

    fn signed_link(&self, subject: &str, auth: &QrCodeAuth) -> Result<String> {
        let authenticator = self.authenticator.ok_or_else(|| {
            CertgenError::Configuration(format!(
                "QR code `{subject}` requests certificate authentication but no signing key is configured"
            ))
        })?;

        let mut data = CertificateData::from_variables(&auth.certificate_fields, self.variables);
        if auth.simple {
            if auth.expires_in.is_some() || auth.include_document_hash {
                return Err(CertgenError::Configuration(format!(
                    "QR code `{subject}`: a simple token carries only the certificate id, \
                     so expiresIn and includeDocumentHash cannot be used with it"
                )));
            }
            let id = data
                .certificate_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            debug!(subject, "QR carries simple certificate token");
            return Ok(authenticator.issue_simple_url(&id));
        }

        if auth.include_document_hash {
            data.document_hash = Some(content_fingerprint(self.template, self.variables));
        }
        let issued = authenticator.issue(data, self.issued_at, auth.expires_in)?;
        debug!(
            subject,
            hash_bound = auth.include_document_hash,
            expires = auth.expires_in.is_some(),
            "QR carries signed certificate"
        );
        Ok(issued.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certgen_core::{CertificateAuthConfig, CertificateFieldMapping, HmacAlgorithm, VariableValue};
    use chrono::TimeZone;

    fn authenticator() -> CertificateAuthenticator {
        CertificateAuthenticator::new(CertificateAuthConfig {
            secret_key: "K1".into(),
            verification_base_url: "https://verify.example/check".into(),
            algorithm: HmacAlgorithm::Sha256,
        })
        .unwrap()
    }

    fn variables() -> VariableMap {
        [
            ("id", "CERT-7"),
            ("holder", "Ana"),
            ("course", "Rust"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), VariableValue::from(v)))
        .collect()
    }

    fn auth() -> QrCodeAuth {
        QrCodeAuth {
            enabled: true,
            certificate_fields: CertificateFieldMapping {
                certificate_id: Some("id".into()),
                holder_name: Some("holder".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn plain_value_without_options() {
        let vars = variables();
        let resolver = QrPayloadResolver {
            authenticator: None,
            storage: None,
            template: b"tpl",
            variables: &vars,
            issued_at: issued_at(),
        };
        let payload = resolver.resolve("qr", None, None, || "hello".into()).unwrap();
        assert_eq!(payload, "hello");
    }

    #[test]
    fn signed_link_takes_precedence_and_verifies() {
        let vars = variables();
        let auth_module = authenticator();
        let storage = |_: Option<&str>, _: Option<u64>| -> Result<String> { Ok("https://files/x".into()) };
        let resolver = QrPayloadResolver {
            authenticator: Some(&auth_module),
            storage: Some(&storage),
            template: b"tpl",
            variables: &vars,
            issued_at: issued_at(),
        };
        let mut config = auth();
        config.include_document_hash = true;
        let enabled_storage = QrStorageUrl {
            enabled: true,
            ..Default::default()
        };
        let url = resolver
            .resolve("qr", Some(&config), Some(&enabled_storage), || "plain".into())
            .unwrap();
        assert!(url.starts_with("https://verify.example/check?data="));

        let fingerprint = content_fingerprint(b"tpl", &vars);
        let verified = auth_module
            .verify_url_with_document(&url, &fingerprint, issued_at())
            .unwrap();
        assert_eq!(verified.data.holder_name.as_deref(), Some("Ana"));
        assert_eq!(verified.data.certificate_id.as_deref(), Some("CERT-7"));
    }

    #[test]
    fn simple_token_uses_certificate_id() {
        let vars = variables();
        let auth_module = authenticator();
        let resolver = QrPayloadResolver {
            authenticator: Some(&auth_module),
            storage: None,
            template: b"",
            variables: &vars,
            issued_at: issued_at(),
        };
        let mut config = auth();
        config.simple = true;
        let url = resolver.resolve("qr", Some(&config), None, String::new).unwrap();
        assert!(url.starts_with("https://verify.example/check?t="));
        assert_eq!(auth_module.verify_simple(&url).unwrap(), "CERT-7");
    }

    #[test]
    fn simple_token_refuses_claims_it_cannot_carry() {
        let vars = variables();
        let auth_module = authenticator();
        let resolver = QrPayloadResolver {
            authenticator: Some(&auth_module),
            storage: None,
            template: b"",
            variables: &vars,
            issued_at: issued_at(),
        };
        let mut expiring = auth();
        expiring.simple = true;
        expiring.expires_in = Some(60);
        let err = resolver.resolve("qr", Some(&expiring), None, String::new).unwrap_err();
        assert_eq!(err.class(), certgen_core::ErrorClass::Configuration);

        let mut hashed = auth();
        hashed.simple = true;
        hashed.include_document_hash = true;
        assert!(resolver.resolve("qr", Some(&hashed), None, String::new).is_err());
    }

    #[test]
    fn auth_without_key_is_configuration_error() {
        let vars = variables();
        let resolver = QrPayloadResolver {
            authenticator: None,
            storage: None,
            template: b"",
            variables: &vars,
            issued_at: issued_at(),
        };
        let err = resolver.resolve("badge", Some(&auth()), None, String::new).unwrap_err();
        assert_eq!(err.class(), certgen_core::ErrorClass::Configuration);
        assert!(err.to_string().contains("badge"));
    }

    #[test]
    fn storage_url_is_resolved_with_expiry() {
        let vars = variables();
        let storage = |path: Option<&str>, ttl: Option<u64>| -> Result<String> {
            Ok(format!("https://files/{}?ttl={}", path.unwrap_or("-"), ttl.unwrap_or(0)))
        };
        let resolver = QrPayloadResolver {
            authenticator: None,
            storage: Some(&storage),
            template: b"",
            variables: &vars,
            issued_at: issued_at(),
        };
        let config = QrStorageUrl {
            enabled: true,
            path: Some("out/ana.pdf".into()),
            expires_in: Some(3600),
        };
        let url = resolver.resolve("qr", None, Some(&config), String::new).unwrap();
        assert_eq!(url, "https://files/out/ana.pdf?ttl=3600");

        let missing = QrPayloadResolver { storage: None, ..resolver };
        assert!(missing.resolve("qr", None, Some(&config), String::new).is_err());
    }
}
