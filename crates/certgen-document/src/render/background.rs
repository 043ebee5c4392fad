// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image templates become a one-page PDF with the image as the page background,
// so they composite through exactly the same path as PDF templates.

use certgen_core::error::{CertgenError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use tracing::{debug, instrument};

use super::canvas::{image_stream, pdf_error};

/// Build a PDF whose single page is the image, one pixel per point.
#[instrument(skip_all, fields(bytes_len = image_bytes.len()))]
pub fn image_page(image_bytes: &[u8]) -> Result<Document> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| CertgenError::Image(format!("failed to decode template image: {e}")))?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(CertgenError::Image("template image is empty".into()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut background = image_stream(decoded.to_rgb8());
    if decoded.color().has_alpha() {
        let alpha: Vec<u8> = decoded.to_rgba8().pixels().map(|p| p[3]).collect();
        let smask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));
        background.dict.set("SMask", smask_id);
    }
    let background_id = doc.add_object(background);

    let (w, h) = (width as f32, height as f32);
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("cm", vec![w.into(), 0.into(), 0.into(), h.into(), 0.into(), 0.into()]),
            Operation::new("Do", vec![Object::Name(b"CgBg".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| pdf_error("failed to encode background content", e))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), (width as i64).into(), (height as i64).into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "CgBg" => background_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    debug!(width, height, "image template wrapped as PDF page");
    Ok(doc)
}
