// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Certificate claims and their canonical byte form.
//
// Canonical form: compact JSON object, keys in lexicographic order, absent
// claims omitted entirely. It is the only thing ever signed, so it must stay
// byte-identical across releases and reimplementations.

use std::collections::BTreeMap;

use certgen_core::{CertificateFieldMapping, VariableMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sparse claim record for one generated document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_hash: Option<String>,
}

impl CertificateData {
    /// Pull each mapped claim out of the recipient's variables.
    ///
    /// Claims without a mapping, or whose variable is missing or null, are
    /// left out of the record.
    pub fn from_variables(mapping: &CertificateFieldMapping, variables: &VariableMap) -> Self {
        let lookup = |key: &Option<String>| -> Option<String> {
            let value = variables.get(key.as_deref()?)?;
            if value.is_null() {
                None
            } else {
                Some(value.as_display())
            }
        };

        Self {
            certificate_id: lookup(&mapping.certificate_id),
            holder_name: lookup(&mapping.holder_name),
            title: lookup(&mapping.title),
            issue_date: lookup(&mapping.issue_date),
            issuer: lookup(&mapping.issuer),
            grade: lookup(&mapping.grade),
            expiry_date: lookup(&mapping.expiry_date),
            document_hash: None,
        }
    }

    fn entries(&self) -> [(&'static str, &Option<String>); 8] {
        [
            ("certificateId", &self.certificate_id),
            ("documentHash", &self.document_hash),
            ("expiryDate", &self.expiry_date),
            ("grade", &self.grade),
            ("holderName", &self.holder_name),
            ("issueDate", &self.issue_date),
            ("issuer", &self.issuer),
            ("title", &self.title),
        ]
    }
}

/// Claims plus issuance metadata: exactly what gets signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedClaims {
    pub data: CertificateData,
    /// Issuance time, unix seconds.
    pub issued_at: i64,
    /// Expiry time, unix seconds.
    pub expires_at: Option<i64>,
}

/// Wire shape used when reading claims back out of a verification link.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct WireClaims {
    #[serde(default)]
    certificate_id: Option<String>,
    #[serde(default)]
    holder_name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    issue_date: Option<String>,
    #[serde(default)]
    issuer: Option<String>,
    #[serde(default)]
    grade: Option<String>,
    #[serde(default)]
    expiry_date: Option<String>,
    #[serde(default)]
    document_hash: Option<String>,
    iat: i64,
    #[serde(default)]
    exp: Option<i64>,
}

impl SignedClaims {
    /// Serialise into the canonical byte string.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut map: BTreeMap<&'static str, Value> = BTreeMap::new();
        for (key, value) in self.data.entries() {
            if let Some(v) = value {
                map.insert(key, Value::String(v.clone()));
            }
        }
        map.insert("iat", Value::from(self.issued_at));
        if let Some(exp) = self.expires_at {
            map.insert("exp", Value::from(exp));
        }
        serde_json::to_vec(&map)
    }

    /// Parse claims from a (possibly non-canonical) JSON payload.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let wire: WireClaims = serde_json::from_slice(bytes)?;
        Ok(Self {
            data: CertificateData {
                certificate_id: wire.certificate_id,
                holder_name: wire.holder_name,
                title: wire.title,
                issue_date: wire.issue_date,
                issuer: wire.issuer,
                grade: wire.grade,
                expiry_date: wire.expiry_date,
                document_hash: wire.document_hash,
            },
            issued_at: wire.iat,
            expires_at: wire.exp,
        })
    }
}
