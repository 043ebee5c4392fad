// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for DOCX substitution and field rendering.
//
// Both run once per recipient in a batch, so they dominate generation time
// whenever no conversion is involved.

use std::io::Cursor;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use docx_rs::{Docx, Paragraph, Run};

use certgen_core::{TemplateField, VariableMap, VariableValue};
use certgen_document::docx::process_package;
use certgen_document::render::background::image_page;
use certgen_document::render::{ResolvedField, render_fields};

/// Fifty paragraphs, each with a token split over three runs.
fn split_docx() -> Vec<u8> {
    let mut docx = Docx::new();
    for _ in 0..50 {
        docx = docx.add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text("Presented to {{ho"))
                .add_run(Run::new().add_text("lder_na").bold())
                .add_run(Run::new().add_text("me}} on {{date}}")),
        );
    }
    let mut out = Cursor::new(Vec::new());
    docx.build().pack(&mut out).expect("fixture packs");
    out.into_inner()
}

fn bench_docx_substitution(c: &mut Criterion) {
    let template = split_docx();
    let mut vars = VariableMap::new();
    vars.insert("holder_name".into(), VariableValue::from("Ana Example"));
    vars.insert("date".into(), VariableValue::from("2024-01-01"));

    c.bench_function("docx substitution (50 split tokens)", |b| {
        b.iter(|| black_box(process_package(black_box(&template), &vars, &[]).unwrap()));
    });
}

fn bench_field_rendering(c: &mut Criterion) {
    let img = image::RgbImage::from_pixel(842, 595, image::Rgb([255, 255, 255]));
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png).expect("fixture encodes");
    let png = png.into_inner();

    let fields: Vec<TemplateField> = (0..20)
        .map(|i| TemplateField::text(format!("f{i}"), 40.0, 20.0 + i as f32 * 25.0, 300.0, 20.0))
        .collect();

    c.bench_function("render 20 text fields on image template", |b| {
        b.iter(|| {
            let mut doc = image_page(&png).unwrap();
            let resolved: Vec<ResolvedField<'_>> = fields
                .iter()
                .map(|f| ResolvedField::text(f, "Certificate holder"))
                .collect();
            render_fields(&mut doc, &resolved).unwrap();
            black_box(doc);
        });
    });
}

criterion_group!(benches, bench_docx_substitution, bench_field_rendering);
criterion_main!(benches);
