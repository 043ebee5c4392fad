// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! certgen-security — Cryptographic side of certificate generation.
//!
//! Builds the canonical claim record embedded in a certificate's QR code,
//! signs it with a deployment HMAC key, issues verification links, and checks
//! them again. Also provides the SHA-256 fingerprints used for document hash
//! binding. Everything here is pure computation and safe to share across
//! threads.

pub mod auth;
pub mod claims;
pub mod integrity;

pub use auth::{CertificateAuthenticator, IssuedCertificate, VerificationError, VerifiedCertificate};
pub use claims::{CertificateData, SignedClaims};
pub use integrity::{content_fingerprint, hash_bytes};
