// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DOCX variable substitution and QR embedding.

pub mod drawing;
pub mod package;
pub mod runs;
pub mod substitute;

use serde::Serialize;

pub use package::{DocxOutput, DocxQrImage, process_package};

/// Why a token was left in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No value in the variable map.
    MissingVariable,
    /// The token's runs cannot be merged, e.g. it crosses a paragraph.
    UnisolatedRun,
}

/// A non-fatal substitution problem, reported next to a best-effort document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutionDiagnostic {
    pub token: String,
    /// Package path of the part, e.g. `word/header1.xml`.
    pub part: String,
    pub kind: DiagnosticKind,
    pub split_across_runs: bool,
    pub run_count: usize,
}

impl std::fmt::Display for SubstitutionDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self.kind {
            DiagnosticKind::MissingVariable => "no value supplied",
            DiagnosticKind::UnisolatedRun => "runs could not be isolated",
        };
        write!(
            f,
            "{{{{{}}}}} in {}: {reason} ({} run{}{})",
            self.token,
            self.part,
            self.run_count,
            if self.run_count == 1 { "" } else { "s" },
            if self.split_across_runs { ", split" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certgen_core::{VariableMap, VariableValue};
    use std::io::{Cursor, Read, Write};
    use zip::write::SimpleFileOptions;
    use zip::{ZipArchive, ZipWriter};

    const CONTENT_TYPES: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="xml" ContentType="application/xml"/></Types>"#
    );

    fn package(document: &str, footer: Option<&str>) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let mut entries = vec![
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("word/styles.xml", "<w:styles/>".to_string()),
            ("word/document.xml", document.to_string()),
        ];
        if let Some(footer) = footer {
            entries.push(("word/footer1.xml", footer.to_string()));
        }
        for (name, body) in entries {
            writer.start_file(name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn entry(buffer: &[u8], name: &str) -> Option<Vec<u8>> {
        let mut archive = ZipArchive::new(Cursor::new(buffer)).unwrap();
        let mut file = archive.by_name(name).ok()?;
        let mut out = Vec::new();
        file.read_to_end(&mut out).unwrap();
        Some(out)
    }

    fn text(buffer: &[u8], name: &str) -> String {
        String::from_utf8(entry(buffer, name).unwrap()).unwrap()
    }

    #[test]
    fn substitutes_document_and_footer() {
        let doc = r#"<w:document><w:body><w:p><w:r><w:t>{{na</w:t></w:r><w:r><w:t>me}}</w:t></w:r></w:p></w:body></w:document>"#;
        let footer = r#"<w:ftr><w:p><w:r><w:t>{{missing}}</w:t></w:r></w:p></w:ftr>"#;
        let mut vars = VariableMap::new();
        vars.insert("name".into(), VariableValue::from("Ana"));

        let out = process_package(&package(doc, Some(footer)), &vars, &[]).unwrap();
        let body = runs::RunIndex::build(&text(&out.buffer, "word/document.xml")).text;
        assert_eq!(body, "Ana");
        assert_eq!(text(&out.buffer, "word/footer1.xml"), footer);
        assert_eq!(text(&out.buffer, "word/styles.xml"), "<w:styles/>");

        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].part, "word/footer1.xml");
        assert_eq!(out.diagnostics[0].to_string(), "{{missing}} in word/footer1.xml: no value supplied (1 run)");
    }

    #[test]
    fn embeds_qr_media_and_relationship() {
        let doc = r#"<w:document><w:body><w:p><w:r><w:t>Verify: [Q</w:t></w:r><w:r><w:t>R]</w:t></w:r></w:p></w:body></w:document>"#;
        let qr = DocxQrImage {
            placeholder: "[QR]".into(),
            png: vec![0x89, b'P', b'N', b'G'],
            size_px: 120,
        };
        let out = process_package(&package(doc, None), &VariableMap::new(), &[qr]).unwrap();

        let body = text(&out.buffer, "word/document.xml");
        assert!(body.contains("<w:drawing>"));
        assert!(body.contains(r#"r:embed="rIdCertgenQr1""#));
        assert!(!runs::RunIndex::build(&body).text.contains("[QR]"));

        assert_eq!(
            entry(&out.buffer, "word/media/certgen_qr_1.png").unwrap(),
            vec![0x89, b'P', b'N', b'G']
        );
        let rels = text(&out.buffer, "word/_rels/document.xml.rels");
        assert!(rels.contains(r#"Target="media/certgen_qr_1.png""#));
        assert!(text(&out.buffer, "[Content_Types].xml").contains(r#"Extension="png""#));
    }

    #[test]
    fn unused_qr_config_is_inert() {
        let doc = r#"<w:document><w:body><w:p><w:r><w:t>plain</w:t></w:r></w:p></w:body></w:document>"#;
        let qr = DocxQrImage {
            placeholder: "{{qr}}".into(),
            png: vec![1, 2, 3],
            size_px: 50,
        };
        let out = process_package(&package(doc, None), &VariableMap::new(), &[qr]).unwrap();
        assert!(entry(&out.buffer, "word/media/certgen_qr_1.png").is_none());
        assert_eq!(text(&out.buffer, "[Content_Types].xml"), CONTENT_TYPES);
    }

    #[test]
    fn output_is_deterministic() {
        let doc = r#"<w:document><w:body><w:p><w:r><w:t>{{name}}</w:t></w:r></w:p></w:body></w:document>"#;
        let mut vars = VariableMap::new();
        vars.insert("name".into(), VariableValue::from("Ana"));
        let template = package(doc, None);
        let a = process_package(&template, &vars, &[]).unwrap();
        let b = process_package(&template, &vars, &[]).unwrap();
        assert_eq!(a.buffer, b.buffer);
    }

    #[test]
    fn rejects_non_docx() {
        assert!(process_package(b"plain text", &VariableMap::new(), &[]).is_err());
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("hello.txt", SimpleFileOptions::default()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert!(matches!(
            process_package(&bytes, &VariableMap::new(), &[]),
            Err(certgen_core::CertgenError::Docx(_))
        ));
    }
}
