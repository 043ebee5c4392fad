// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for certificate signing and verification.
//
// Batch generation signs one certificate per recipient, so issuing cost is
// paid thousands of times per job.

use certgen_core::{CertificateAuthConfig, HmacAlgorithm};
use certgen_security::{CertificateAuthenticator, CertificateData, content_fingerprint};
use chrono::{TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn authenticator(algorithm: HmacAlgorithm) -> CertificateAuthenticator {
    CertificateAuthenticator::new(CertificateAuthConfig {
        secret_key: "bench-secret-key".into(),
        verification_base_url: "https://verify.example/c".into(),
        algorithm,
    })
    .expect("bench config is valid")
}

fn sample() -> CertificateData {
    CertificateData {
        certificate_id: Some("CERT-0001".into()),
        holder_name: Some("Ana Example".into()),
        title: Some("Advanced Rust".into()),
        issue_date: Some("2024-01-01".into()),
        issuer: Some("Example Academy".into()),
        ..Default::default()
    }
}

fn bench_issue_and_verify(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    for (name, algorithm) in [("sha256", HmacAlgorithm::Sha256), ("sha512", HmacAlgorithm::Sha512)] {
        let auth = authenticator(algorithm);
        c.bench_function(&format!("issue ({name})"), |b| {
            b.iter(|| black_box(auth.issue(black_box(sample()), now, Some(3600)).unwrap()));
        });

        let url = auth.issue(sample(), now, Some(3600)).unwrap().url;
        c.bench_function(&format!("verify ({name})"), |b| {
            b.iter(|| black_box(auth.verify_url(black_box(&url), now).unwrap()));
        });
    }
}

fn bench_fingerprint(c: &mut Criterion) {
    let template = vec![0x5Au8; 512 * 1024];
    let mut vars = certgen_core::VariableMap::new();
    vars.insert("name".into(), "Ana".into());
    vars.insert("course".into(), "Rust".into());

    c.bench_function("content_fingerprint (512 KiB)", |b| {
        b.iter(|| black_box(content_fingerprint(black_box(&template), &vars)));
    });
}

criterion_group!(benches, bench_issue_and_verify, bench_fingerprint);
criterion_main!(benches);
