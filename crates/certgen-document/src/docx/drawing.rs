// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Inline picture markup, part relationships and content types for QR images.

use std::sync::LazyLock;

use regex::Regex;

use super::runs::{RunIndex, text_element};

/// EMU per pixel at 96 DPI.
pub const EMU_PER_PX: u64 = 9525;

pub const IMAGE_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const EMPTY_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#,
);

static REL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bId="([^"]+)""#).expect("relationship id pattern is valid"));

static DOC_PR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<wp:docPr\s[^>]*?\bid="(\d+)""#).expect("docPr pattern is valid"));

static PNG_DEFAULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<Default\s[^>]*Extension="png""#).expect("content type pattern is valid")
});

/// A picture to splice in wherever its placeholder text appears.
#[derive(Debug, Clone)]
pub struct InlinePicture<'a> {
    pub rel_id: &'a str,
    pub file_name: &'a str,
    pub size_px: u32,
}

impl InlinePicture<'_> {
    /// `<w:drawing>` for one occurrence; `doc_pr_id` must be unique in the package.
    pub fn markup(&self, doc_pr_id: u32) -> String {
        let emu = u64::from(self.size_px) * EMU_PER_PX;
        format!(
            concat!(
                r#"<w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0" "#,
                r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">"#,
                r#"<wp:extent cx="{emu}" cy="{emu}"/>"#,
                r#"<wp:effectExtent l="0" t="0" r="0" b="0"/>"#,
                r#"<wp:docPr id="{id}" name="QR Code {id}"/>"#,
                r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks "#,
                r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/>"#,
                r#"</wp:cNvGraphicFramePr>"#,
                r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
                r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:nvPicPr><pic:cNvPr id="0" name="{file}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip r:embed="{rel}" "#,
                r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"/>"#,
                r#"<a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{emu}" cy="{emu}"/></a:xfrm>"#,
                r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
                r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>"#,
            ),
            emu = emu,
            id = doc_pr_id,
            file = self.file_name,
            rel = self.rel_id,
        )
    }
}

/// Replace each run-local occurrence of `placeholder` with the picture.
///
/// The owning `<w:t>` is split around the drawing, which stays inside the same
/// `<w:r>` so the run's properties still apply to the text on either side.
/// Returns the new markup and how many occurrences were replaced.
pub fn embed_picture(
    xml: &str,
    placeholder: &str,
    picture: &InlinePicture<'_>,
    next_doc_pr: &mut u32,
) -> (String, usize) {
    if placeholder.is_empty() {
        return (xml.to_string(), 0);
    }
    let index = RunIndex::build(xml);
    let hits: Vec<usize> = index
        .runs
        .iter()
        .enumerate()
        .filter(|(_, run)| run.text.contains(placeholder))
        .map(|(i, _)| i)
        .collect();
    if hits.is_empty() {
        return (xml.to_string(), 0);
    }

    let mut count = 0;
    let out = index.rewrite(xml, &hits, |idx| {
        let pieces: Vec<&str> = index.runs[idx].text.split(placeholder).collect();
        let mut markup = String::new();
        for (n, piece) in pieces.iter().enumerate() {
            if n > 0 {
                markup.push_str(&picture.markup(*next_doc_pr));
                *next_doc_pr += 1;
                count += 1;
            }
            if !piece.is_empty() {
                markup.push_str(&text_element(piece));
            }
        }
        markup
    });
    (out, count)
}

/// Highest `wp:docPr` id in `xml`, or 0.
pub fn max_doc_pr_id(xml: &str) -> u32 {
    DOC_PR_RE
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .max()
        .unwrap_or(0)
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`.
pub fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Relationships document with an image entry appended.
///
/// `existing` is `None` when the part had no relationships yet. Returns the
/// updated XML and the id assigned.
pub fn add_image_relationship(existing: Option<&str>, target: &str) -> (String, String) {
    let rels = existing.unwrap_or(EMPTY_RELS);
    let taken: Vec<&str> = REL_ID_RE
        .captures_iter(rels)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let rel_id = (1..)
        .map(|n| format!("rIdCertgenQr{n}"))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| "rIdCertgenQr".to_string());

    let entry = format!(r#"<Relationship Id="{rel_id}" Type="{IMAGE_RELATIONSHIP}" Target="{target}"/>"#);
    let updated = match (rels.rfind("</Relationships>"), rels.rfind("/>")) {
        (Some(pos), _) => format!("{}{entry}{}", &rels[..pos], &rels[pos..]),
        // Self-closing root.
        (None, Some(pos)) => format!("{}>{entry}</Relationships>{}", &rels[..pos], &rels[pos + 2..]),
        (None, None) => format!("{}{entry}</Relationships>", EMPTY_RELS.trim_end_matches("</Relationships>")),
    };
    (updated, rel_id)
}

/// Register the `png` extension in `[Content_Types].xml` when missing.
pub fn ensure_png_content_type(content_types: &str) -> Option<String> {
    if PNG_DEFAULT_RE.is_match(content_types) {
        return None;
    }
    let pos = content_types.rfind("</Types>")?;
    Some(format!(
        r#"{}<Default Extension="png" ContentType="image/png"/>{}"#,
        &content_types[..pos],
        &content_types[pos..]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picture() -> InlinePicture<'static> {
        InlinePicture {
            rel_id: "rIdCertgenQr1",
            file_name: "certgen_qr_1.png",
            size_px: 100,
        }
    }

    #[test]
    fn splits_text_around_drawing() {
        let xml = r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Scan {{qr}} now</w:t></w:r></w:p>"#;
        let mut next = 7;
        let (out, count) = embed_picture(xml, "{{qr}}", &picture(), &mut next);
        assert_eq!(count, 1);
        assert_eq!(next, 8);
        assert!(out.contains(r#"<w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Scan </w:t><w:drawing>"#));
        assert!(out.contains(r#"</w:drawing><w:t xml:space="preserve"> now</w:t></w:r>"#));
        assert!(out.contains(r#"<wp:docPr id="7""#));
        assert!(out.contains(r#"r:embed="rIdCertgenQr1""#));
        assert!(out.contains(r#"cx="952500""#));
        assert!(!RunIndex::build(&out).text.contains("{{qr}}"));
    }

    #[test]
    fn absent_placeholder_is_inert() {
        let xml = "<w:p><w:r><w:t>nothing here</w:t></w:r></w:p>";
        let mut next = 1;
        let (out, count) = embed_picture(xml, "{{qr}}", &picture(), &mut next);
        assert_eq!((out.as_str(), count, next), (xml, 0, 1));
    }

    #[test]
    fn relationship_ids_do_not_collide() {
        let existing = concat!(
            r#"<Relationships xmlns="x">"#,
            r#"<Relationship Id="rIdCertgenQr1" Type="t" Target="media/a.png"/>"#,
            "</Relationships>"
        );
        let (updated, id) = add_image_relationship(Some(existing), "media/certgen_qr_2.png");
        assert_eq!(id, "rIdCertgenQr2");
        assert!(updated.ends_with(
            r#"Target="media/certgen_qr_2.png"/></Relationships>"#
        ));

        let (fresh, id) = add_image_relationship(None, "media/q.png");
        assert_eq!(id, "rIdCertgenQr1");
        assert!(fresh.starts_with("<?xml"));
        assert!(fresh.contains(r#"Id="rIdCertgenQr1""#));
    }

    #[test]
    fn rels_path_for_parts() {
        assert_eq!(rels_path("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(rels_path("word/header2.xml"), "word/_rels/header2.xml.rels");
    }

    #[test]
    fn png_content_type_added_once() {
        let types = r#"<Types xmlns="t"><Default Extension="xml" ContentType="application/xml"/></Types>"#;
        let updated = ensure_png_content_type(types).unwrap();
        assert!(updated.contains(r#"<Default Extension="png" ContentType="image/png"/></Types>"#));
        assert!(ensure_png_content_type(&updated).is_none());
    }

    #[test]
    fn finds_highest_doc_pr() {
        let xml = r#"<wp:docPr id="3" name="a"/><wp:docPr name="b" id="12"/>"#;
        assert_eq!(max_doc_pr_id(xml), 12);
        assert_eq!(max_doc_pr_id("<w:p/>"), 0);
    }
}
