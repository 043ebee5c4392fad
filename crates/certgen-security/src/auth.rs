// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Certificate authentication — HMAC-signed verification links.
//
// Two link shapes are issued:
//
//   full:   <base>?data=<b64url(canonical claims)>&sig=<b64url(hmac)>
//   simple: <base>?t=<b64url(certificate id)>.<b64url(hmac(id)[..16])>
//
// The full link is self-contained: a verifier recomputes the canonical bytes
// from the decoded claims and checks the HMAC. The simple link only proves the
// identifier was issued by the key holder; the verifier looks the claims up
// elsewhere. It exists because the full link can outgrow a small QR code.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use certgen_core::error::{CertgenError, Result};
use certgen_core::{CertificateAuthConfig, HmacAlgorithm};
use chrono::{DateTime, Utc};
use ring::hmac;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::claims::{CertificateData, SignedClaims};

/// Bytes of the HMAC tag kept in a simple token.
const SIMPLE_TAG_LEN: usize = 16;

/// Domain separator so a simple-token tag can never double as a full-link tag.
const SIMPLE_TOKEN_CONTEXT: &[u8] = b"certgen-simple-token:";

/// Why a verification link was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("signature does not match the certificate claims")]
    SignatureMismatch,

    #[error("certificate expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    #[error("document hash mismatch: expected {expected}, certificate carries {actual:?}")]
    DocumentHashMismatch {
        expected: String,
        actual: Option<String>,
    },

    #[error("malformed verification link: {0}")]
    Malformed(String),
}

/// Output of signing one certificate.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    /// Link to encode into the QR code.
    pub url: String,
    pub claims: SignedClaims,
}

/// A link that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCertificate {
    pub data: CertificateData,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Signs and verifies certificate links with the deployment HMAC key.
///
/// The key is only turned into an HMAC context for the duration of a single
/// sign or verify call.
pub struct CertificateAuthenticator {
    config: CertificateAuthConfig,
}

impl CertificateAuthenticator {
    /// Validate the configuration and wrap it.
    pub fn new(config: CertificateAuthConfig) -> Result<Self> {
        if config.secret_key.is_empty() {
            return Err(CertgenError::Configuration(
                "certificate secret key must not be empty".into(),
            ));
        }
        let base = config.verification_base_url.trim();
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(CertgenError::Configuration(format!(
                "verification base URL must be http(s): {base}"
            )));
        }
        Ok(Self { config })
    }

    pub fn algorithm(&self) -> HmacAlgorithm {
        self.config.algorithm
    }

    fn key(&self) -> hmac::Key {
        let algorithm = match self.config.algorithm {
            HmacAlgorithm::Sha256 => hmac::HMAC_SHA256,
            HmacAlgorithm::Sha512 => hmac::HMAC_SHA512,
        };
        hmac::Key::new(algorithm, self.config.secret_key.as_bytes())
    }

    /// Raw HMAC tag over `payload`.
    pub fn sign(&self, payload: &[u8]) -> Vec<u8> {
        hmac::sign(&self.key(), payload).as_ref().to_vec()
    }

    fn link(&self, query: &str) -> String {
        let base = self.config.verification_base_url.trim();
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{base}{separator}{query}")
    }

    // -- Issuing -------------------------------------------------------------

    /// Sign `data` and build the full verification link.
    ///
    /// A missing `certificate_id` is filled with a fresh UUID so every issued
    /// certificate can be referred to.
    #[instrument(skip(self, data), fields(algorithm = ?self.config.algorithm))]
    pub fn issue(
        &self,
        mut data: CertificateData,
        issued_at: DateTime<Utc>,
        expires_in_secs: Option<u64>,
    ) -> Result<IssuedCertificate> {
        if data.certificate_id.is_none() {
            data.certificate_id = Some(uuid::Uuid::new_v4().to_string());
        }

        let iat = issued_at.timestamp();
        let expires_at = expires_in_secs
            .map(|secs| {
                i64::try_from(secs)
                    .ok()
                    .and_then(|secs| iat.checked_add(secs))
                    .ok_or_else(|| {
                        CertgenError::Certificate(format!("expiry of {secs} seconds is out of range"))
                    })
            })
            .transpose()?;
        let claims = SignedClaims {
            data,
            issued_at: iat,
            expires_at,
        };

        let canonical = claims.canonical_bytes()?;
        let signature = self.sign(&canonical);
        let url = self.link(&format!(
            "data={}&sig={}",
            URL_SAFE_NO_PAD.encode(&canonical),
            URL_SAFE_NO_PAD.encode(&signature)
        ));

        debug!(
            certificate_id = claims.data.certificate_id.as_deref().unwrap_or_default(),
            payload_len = canonical.len(),
            hash_bound = claims.data.document_hash.is_some(),
            "certificate issued"
        );

        Ok(IssuedCertificate { url, claims })
    }

    fn simple_tag(&self, certificate_id: &str) -> Vec<u8> {
        let mut message = SIMPLE_TOKEN_CONTEXT.to_vec();
        message.extend_from_slice(certificate_id.as_bytes());
        let mut tag = self.sign(&message);
        tag.truncate(SIMPLE_TAG_LEN);
        tag
    }

    /// Short opaque token for space-constrained QR codes.
    pub fn issue_simple_token(&self, certificate_id: &str) -> String {
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(certificate_id.as_bytes()),
            URL_SAFE_NO_PAD.encode(self.simple_tag(certificate_id))
        )
    }

    /// Link carrying only the simple token.
    pub fn issue_simple_url(&self, certificate_id: &str) -> String {
        self.link(&format!("t={}", self.issue_simple_token(certificate_id)))
    }

    // -- Verification --------------------------------------------------------

    /// Check a full verification link at time `now`.
    ///
    /// The signature is checked first; expiry is only reported for claims
    /// whose signature holds.
    pub fn verify_url(
        &self,
        url: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<VerifiedCertificate, VerificationError> {
        let data = query_param(url, "data")
            .ok_or_else(|| VerificationError::Malformed("missing `data` parameter".into()))?;
        let sig = query_param(url, "sig")
            .ok_or_else(|| VerificationError::Malformed("missing `sig` parameter".into()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(data)
            .map_err(|e| VerificationError::Malformed(format!("payload encoding: {e}")))?;
        let signature = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(|e| VerificationError::Malformed(format!("signature encoding: {e}")))?;
        let claims = SignedClaims::from_json(&payload)
            .map_err(|e| VerificationError::Malformed(format!("payload: {e}")))?;

        let canonical = claims
            .canonical_bytes()
            .map_err(|e| VerificationError::Malformed(format!("canonical form: {e}")))?;
        if hmac::verify(&self.key(), &canonical, &signature).is_err() {
            warn!("certificate signature mismatch");
            return Err(VerificationError::SignatureMismatch);
        }

        let issued_at = timestamp(claims.issued_at)?;
        let expires_at = claims.expires_at.map(timestamp).transpose()?;
        if let Some(expired_at) = expires_at {
            if now >= expired_at {
                warn!(%expired_at, "certificate expired");
                return Err(VerificationError::Expired { expired_at });
            }
        }

        Ok(VerifiedCertificate {
            data: claims.data,
            issued_at,
            expires_at,
        })
    }

    /// Check a full link and additionally require the bound document hash.
    pub fn verify_url_with_document(
        &self,
        url: &str,
        expected_hash: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<VerifiedCertificate, VerificationError> {
        let verified = self.verify_url(url, now)?;
        match verified.data.document_hash.as_deref() {
            Some(actual) if actual.eq_ignore_ascii_case(expected_hash) => Ok(verified),
            actual => {
                warn!("certificate document hash mismatch");
                Err(VerificationError::DocumentHashMismatch {
                    expected: expected_hash.to_owned(),
                    actual: actual.map(str::to_owned),
                })
            }
        }
    }

    /// Check a simple token (bare, or inside a link's `t` parameter) and
    /// return the certificate identifier it vouches for.
    pub fn verify_simple(&self, token_or_url: &str) -> std::result::Result<String, VerificationError> {
        let token = query_param(token_or_url, "t").unwrap_or(token_or_url);
        let (id_part, tag_part) = token
            .split_once('.')
            .ok_or_else(|| VerificationError::Malformed("token has no separator".into()))?;

        let id_bytes = URL_SAFE_NO_PAD
            .decode(id_part)
            .map_err(|e| VerificationError::Malformed(format!("identifier encoding: {e}")))?;
        let certificate_id = String::from_utf8(id_bytes)
            .map_err(|_| VerificationError::Malformed("identifier is not UTF-8".into()))?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag_part)
            .map_err(|e| VerificationError::Malformed(format!("tag encoding: {e}")))?;

        let expected = self.simple_tag(&certificate_id);
        if !bool::from(tag.as_slice().ct_eq(expected.as_slice())) {
            warn!("simple token signature mismatch");
            return Err(VerificationError::SignatureMismatch);
        }
        Ok(certificate_id)
    }
}

/// Value of `name` in the query string of `url`, if present.
fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then_some(value)
    })
}

fn timestamp(secs: i64) -> std::result::Result<DateTime<Utc>, VerificationError> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| VerificationError::Malformed(format!("timestamp out of range: {secs}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn authenticator(key: &str, algorithm: HmacAlgorithm) -> CertificateAuthenticator {
        CertificateAuthenticator::new(CertificateAuthConfig {
            secret_key: key.into(),
            verification_base_url: "https://verify.example/check".into(),
            algorithm,
        })
        .expect("valid config")
    }

    fn sample() -> CertificateData {
        CertificateData {
            holder_name: Some("A".into()),
            issue_date: Some("2024-01-01".into()),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn rejects_empty_key_and_bad_url() {
        let bad_key = CertificateAuthenticator::new(CertificateAuthConfig {
            secret_key: String::new(),
            verification_base_url: "https://v.example".into(),
            algorithm: HmacAlgorithm::Sha256,
        });
        assert!(bad_key.is_err());

        let bad_url = CertificateAuthenticator::new(CertificateAuthConfig {
            secret_key: "k".into(),
            verification_base_url: "ftp://v.example".into(),
            algorithm: HmacAlgorithm::Sha256,
        });
        assert!(bad_url.is_err());
    }

    #[test]
    fn sign_then_verify_with_same_key() {
        for algorithm in [HmacAlgorithm::Sha256, HmacAlgorithm::Sha512] {
            let auth = authenticator("K1", algorithm);
            let issued = auth.issue(sample(), now(), None).unwrap();
            assert!(issued.url.starts_with("https://verify.example/check?data="));

            let verified = auth.verify_url(&issued.url, now()).unwrap();
            assert_eq!(verified.data.holder_name.as_deref(), Some("A"));
            assert!(verified.data.certificate_id.is_some());
        }
    }

    #[test]
    fn other_key_is_a_signature_mismatch() {
        let issued = authenticator("K1", HmacAlgorithm::Sha256)
            .issue(sample(), now(), None)
            .unwrap();
        let result = authenticator("K2", HmacAlgorithm::Sha256).verify_url(&issued.url, now());
        assert_eq!(result, Err(VerificationError::SignatureMismatch));
    }

    #[test]
    fn other_algorithm_is_a_signature_mismatch() {
        let issued = authenticator("K1", HmacAlgorithm::Sha256)
            .issue(sample(), now(), None)
            .unwrap();
        let result = authenticator("K1", HmacAlgorithm::Sha512).verify_url(&issued.url, now());
        assert_eq!(result, Err(VerificationError::SignatureMismatch));
    }

    #[test]
    fn tampered_claim_is_rejected() {
        let auth = authenticator("K1", HmacAlgorithm::Sha256);
        let issued = auth.issue(sample(), now(), None).unwrap();

        let mut claims = issued.claims.clone();
        claims.data.holder_name = Some("B".into());
        let forged_payload = URL_SAFE_NO_PAD.encode(claims.canonical_bytes().unwrap());
        let sig = query_param(&issued.url, "sig").unwrap();
        let forged = format!("https://verify.example/check?data={forged_payload}&sig={sig}");

        assert_eq!(
            auth.verify_url(&forged, now()),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn identical_records_sign_identically() {
        let auth = authenticator("K1", HmacAlgorithm::Sha256);
        let mut data = sample();
        data.certificate_id = Some("C-1".into());
        let a = auth.issue(data.clone(), now(), Some(60)).unwrap();
        let b = auth.issue(data, now(), Some(60)).unwrap();
        assert_eq!(a.url, b.url);
    }

    #[test]
    fn expiry_is_distinct_from_signature_failure() {
        let auth = authenticator("K1", HmacAlgorithm::Sha256);
        let issued = auth.issue(sample(), now(), Some(3600)).unwrap();

        assert!(auth.verify_url(&issued.url, now() + Duration::minutes(59)).is_ok());
        match auth.verify_url(&issued.url, now() + Duration::hours(2)) {
            Err(VerificationError::Expired { expired_at }) => {
                assert_eq!(expired_at, now() + Duration::hours(1));
            }
            other => panic!("expected expiry, got {other:?}"),
        }
    }

    #[test]
    fn document_hash_binding() {
        let auth = authenticator("K1", HmacAlgorithm::Sha256);
        let mut data = sample();
        data.document_hash = Some("abc123".into());
        let issued = auth.issue(data, now(), None).unwrap();

        assert!(auth.verify_url_with_document(&issued.url, "abc123", now()).is_ok());
        assert_eq!(
            auth.verify_url_with_document(&issued.url, "def456", now()),
            Err(VerificationError::DocumentHashMismatch {
                expected: "def456".into(),
                actual: Some("abc123".into()),
            })
        );
    }

    #[test]
    fn garbage_links_are_malformed() {
        let auth = authenticator("K1", HmacAlgorithm::Sha256);
        assert!(matches!(
            auth.verify_url("https://verify.example/check", now()),
            Err(VerificationError::Malformed(_))
        ));
        assert!(matches!(
            auth.verify_url("https://verify.example/check?data=!!&sig=AA", now()),
            Err(VerificationError::Malformed(_))
        ));
    }

    #[test]
    fn base_url_with_query_keeps_it() {
        let auth = CertificateAuthenticator::new(CertificateAuthConfig {
            secret_key: "K1".into(),
            verification_base_url: "https://verify.example/?tenant=7".into(),
            algorithm: HmacAlgorithm::Sha256,
        })
        .unwrap();
        let issued = auth.issue(sample(), now(), None).unwrap();
        assert!(issued.url.starts_with("https://verify.example/?tenant=7&data="));
        assert!(auth.verify_url(&issued.url, now()).is_ok());
    }

    #[test]
    fn simple_token_round_trip_and_forgery() {
        let auth = authenticator("K1", HmacAlgorithm::Sha256);
        let url = auth.issue_simple_url("CERT-42");
        assert!(url.len() < 80);
        assert_eq!(auth.verify_simple(&url).unwrap(), "CERT-42");

        let other = authenticator("K2", HmacAlgorithm::Sha256);
        assert_eq!(
            other.verify_simple(&url),
            Err(VerificationError::SignatureMismatch)
        );
        assert!(matches!(
            auth.verify_simple("no-separator"),
            Err(VerificationError::Malformed(_))
        ));
    }

    #[test]
    fn truncated_simple_tag_is_rejected() {
        let auth = authenticator("K1", HmacAlgorithm::Sha256);
        let token = auth.issue_simple_token("CERT-42");
        let (id, tag) = token.split_once('.').unwrap();
        let short = format!("{id}.{}", &tag[..tag.len() - 6]);
        assert_eq!(auth.verify_simple(&short), Err(VerificationError::SignatureMismatch));
    }

    #[test]
    fn out_of_range_expiry_is_an_error() {
        let auth = authenticator("K1", HmacAlgorithm::Sha256);
        let err = auth.issue(sample(), now(), Some(u64::MAX)).unwrap_err();
        assert!(matches!(err, CertgenError::Certificate(_)));
        let err = auth.issue(sample(), now(), Some(i64::MAX as u64)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
