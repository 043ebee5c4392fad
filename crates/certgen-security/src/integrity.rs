// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document integrity — SHA-256 fingerprints for certificate hash binding.
//
// The QR code carrying a certificate is embedded before the enclosing
// document's final bytes exist, so a certificate cannot cover its own output.
// What it binds to instead is the *content fingerprint*: the template bytes
// followed by the recipient's variables in sorted-key order. Anyone holding
// the template and the recipient record can recompute it.

use std::collections::BTreeMap;

use certgen_core::VariableMap;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Fingerprint of everything fixed before a QR image is embedded.
///
/// Variables are fed as `key=value` lines in lexicographic key order, each
/// value in its plain display form, so map iteration order never matters.
pub fn content_fingerprint(template: &[u8], variables: &VariableMap) -> String {
    let sorted: BTreeMap<&str, String> = variables
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_display()))
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(template);
    // Separator so template bytes can never run into the first key.
    hasher.update([0u8]);
    for (key, value) in sorted {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
