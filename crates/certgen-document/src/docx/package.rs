// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DOCX package rewrite: read the zip, substitute the text parts, add QR media,
// write a new zip.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read, Write};
use std::sync::LazyLock;

use certgen_core::VariableMap;
use certgen_core::error::{CertgenError, Result};
use regex::Regex;
use tracing::{debug, info, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::SubstitutionDiagnostic;
use super::drawing::{
    InlinePicture, add_image_relationship, embed_picture, ensure_png_content_type, max_doc_pr_id,
    rels_path,
};
use super::substitute::substitute_part;

pub const MAIN_PART: &str = "word/document.xml";
const CONTENT_TYPES: &str = "[Content_Types].xml";

static TEXT_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^word/(?:document|header\d*|footer\d*)\.xml$").expect("part pattern is valid")
});

fn docx_error(context: &str, err: impl std::fmt::Display) -> CertgenError {
    CertgenError::Docx(format!("{context}: {err}"))
}

/// A rendered QR code to place wherever `placeholder` appears.
#[derive(Debug, Clone)]
pub struct DocxQrImage {
    pub placeholder: String,
    pub png: Vec<u8>,
    /// Displayed edge length in pixels.
    pub size_px: u32,
}

#[derive(Debug, Clone)]
pub struct DocxOutput {
    pub buffer: Vec<u8>,
    pub diagnostics: Vec<SubstitutionDiagnostic>,
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| docx_error(&format!("missing {name}"), e))?;
    let mut text = String::new();
    file.read_to_string(&mut text)
        .map_err(|e| docx_error(&format!("{name} is not UTF-8 XML"), e))?;
    Ok(text)
}

/// Substitute `variables` and embed `qr_images` into a DOCX template.
///
/// Entries that are not rewritten are copied compressed as-is, so styles,
/// media and relationships the template already carries pass through intact.
#[instrument(skip_all, fields(bytes_len = template.len(), qr_images = qr_images.len()))]
pub fn process_package(
    template: &[u8],
    variables: &VariableMap,
    qr_images: &[DocxQrImage],
) -> Result<DocxOutput> {
    let mut archive =
        ZipArchive::new(Cursor::new(template)).map_err(|e| docx_error("not a zip archive", e))?;
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let existing: BTreeSet<&str> = names.iter().map(String::as_str).collect();
    if !existing.contains(MAIN_PART) {
        return Err(CertgenError::Docx(format!("package has no {MAIN_PART}")));
    }

    let mut parts: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|n| TEXT_PART_RE.is_match(n))
        .collect();
    parts.sort_unstable();

    let mut sources: BTreeMap<&str, String> = BTreeMap::new();
    for part in &parts {
        sources.insert(*part, read_entry(&mut archive, part)?);
    }

    let placeholders: Vec<&str> = qr_images.iter().map(|q| q.placeholder.as_str()).collect();
    let mut next_doc_pr = sources.values().map(|xml| max_doc_pr_id(xml)).max().unwrap_or(0) + 1;

    // Rewritten or added entries, keyed by archive path.
    let mut updates: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    let mut diagnostics = Vec::new();
    let mut media: BTreeMap<usize, String> = BTreeMap::new();
    let mut replaced_total = 0;

    for (part, source) in &sources {
        let outcome = substitute_part(part, source, variables, &placeholders);
        diagnostics.extend(outcome.diagnostics);
        replaced_total += outcome.replaced;
        let mut xml = outcome.xml;

        for (n, qr) in qr_images.iter().enumerate() {
            let media_name = format!("certgen_qr_{}.png", n + 1);
            let rels_name = rels_path(part);
            let rels_source = match updates.get(&rels_name) {
                Some(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
                None if existing.contains(rels_name.as_str()) => {
                    Some(read_entry(&mut archive, &rels_name)?)
                }
                None => None,
            };
            let (rels, rel_id) =
                add_image_relationship(rels_source.as_deref(), &format!("media/{media_name}"));

            let picture = InlinePicture {
                rel_id: &rel_id,
                file_name: &media_name,
                size_px: qr.size_px,
            };
            let (embedded, count) = embed_picture(&xml, &qr.placeholder, &picture, &mut next_doc_pr);
            if count == 0 {
                continue;
            }
            xml = embedded;
            updates.insert(rels_name, rels.into_bytes());
            media.insert(n, media_name);
            debug!(part, placeholder = %qr.placeholder, count, "QR code embedded");
        }

        if xml != *source {
            updates.insert((*part).to_string(), xml.into_bytes());
        }
    }

    for (n, media_name) in &media {
        updates.insert(format!("word/media/{media_name}"), qr_images[*n].png.clone());
    }
    if !media.is_empty() {
        let types = read_entry(&mut archive, CONTENT_TYPES)?;
        if let Some(updated) = ensure_png_content_type(&types) {
            updates.insert(CONTENT_TYPES.to_string(), updated.into_bytes());
        }
    }
    for (n, qr) in qr_images.iter().enumerate() {
        if !media.contains_key(&n) {
            debug!(placeholder = %qr.placeholder, "QR placeholder not found, config inert");
        }
    }

    let buffer = write_package(&mut archive, &names, &mut updates)?;
    info!(
        parts = parts.len(),
        replaced = replaced_total,
        qr_embedded = media.len(),
        diagnostics = diagnostics.len(),
        output_bytes = buffer.len(),
        "DOCX substitution complete"
    );
    Ok(DocxOutput { buffer, diagnostics })
}

fn write_package(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    names: &[String],
    updates: &mut BTreeMap<String, Vec<u8>>,
) -> Result<Vec<u8>> {
    // Fixed timestamps keep output byte-identical across runs.
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (i, name) in names.iter().enumerate() {
        if let Some(bytes) = updates.remove(name) {
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| docx_error(&format!("failed to write {name}"), e))?;
            writer.write_all(&bytes)?;
        } else {
            let entry = archive
                .by_index_raw(i)
                .map_err(|e| docx_error(&format!("failed to read {name}"), e))?;
            writer
                .raw_copy_file(entry)
                .map_err(|e| docx_error(&format!("failed to copy {name}"), e))?;
        }
    }
    // Whatever is left did not exist in the template.
    for (name, bytes) in std::mem::take(updates) {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| docx_error(&format!("failed to write {name}"), e))?;
        writer.write_all(&bytes)?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| docx_error("failed to finish archive", e))?;
    Ok(cursor.into_inner())
}
