// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pending page content and its commit onto a lopdf page.
//
// Drawing calls only append to an in-memory operation list. Nothing touches
// the `Document` until `PageCanvas::commit`, so a field that fails halfway
// through a template leaves the page exactly as it was loaded.

use std::collections::BTreeSet;

use certgen_core::error::{CertgenError, Result};
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::debug;

use super::fonts::{FontFamily, encode_win_ansi};
use super::layout::PageRect;
use crate::color::Rgb;

/// Fallback when a page tree carries no MediaBox at all (A4 in points).
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 595.0, 842.0];

/// Guard against malformed, cyclic `/Parent` chains.
const MAX_TREE_DEPTH: usize = 32;

pub(crate) fn pdf_error(context: &str, err: lopdf::Error) -> CertgenError {
    CertgenError::Pdf(format!("{context}: {err}"))
}

/// The page that fields are composited onto.
#[derive(Debug, Clone, Copy)]
pub struct PageInfo {
    pub id: ObjectId,
    pub media_box: [f32; 4],
}

impl PageInfo {
    /// First page of `doc`, with its (possibly inherited) MediaBox.
    pub fn first(doc: &Document) -> Result<Self> {
        let id = doc
            .get_pages()
            .into_values()
            .next()
            .ok_or_else(|| CertgenError::Pdf("template has no pages".into()))?;
        let media_box = inherited(doc, id, b"MediaBox")
            .and_then(|obj| rect_from(doc, obj))
            .unwrap_or_else(|| {
                debug!("page has no MediaBox, assuming A4");
                DEFAULT_MEDIA_BOX
            });
        Ok(Self { id, media_box })
    }

    pub fn width(&self) -> f32 {
        self.media_box[2] - self.media_box[0]
    }

    pub fn height(&self) -> f32 {
        self.media_box[3] - self.media_box[1]
    }
}

struct PendingImage {
    name: String,
    image: RgbImage,
}

/// Operations and resources waiting to be written onto one page.
#[derive(Default)]
pub struct PageCanvas {
    ops: Vec<Operation>,
    fonts: BTreeSet<FontFamily>,
    images: Vec<PendingImage>,
}

impl PageCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill_rect(&mut self, rect: &PageRect, color: Rgb) {
        let [r, g, b] = color.to_unit();
        self.ops.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            rect_op(rect),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    pub fn stroke_rect(&mut self, rect: &PageRect, color: Rgb, line_width: f32) {
        let [r, g, b] = color.to_unit();
        self.ops.extend([
            Operation::new("q", vec![]),
            Operation::new("RG", vec![r.into(), g.into(), b.into()]),
            Operation::new("w", vec![line_width.into()]),
            rect_op(rect),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// One line of text with its baseline origin at `origin`.
    pub fn text(&mut self, font: FontFamily, size: f32, color: Rgb, origin: (f32, f32), text: &str) {
        self.fonts.insert(font);
        let [r, g, b] = color.to_unit();
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("Tf", vec![Object::Name(font.resource_name().as_bytes().to_vec()), size.into()]),
            Operation::new("Td", vec![origin.0.into(), origin.1.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Hexadecimal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Scale `image` into `rect`.
    pub fn image(&mut self, rect: &PageRect, image: RgbImage) {
        let name = format!("CgQr{}", self.images.len() + 1);
        self.ops.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    rect.width.into(),
                    0.into(),
                    0.into(),
                    rect.height.into(),
                    rect.x.into(),
                    rect.y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        self.images.push(PendingImage { name, image });
    }

    /// Write the pending content onto `page`.
    ///
    /// Existing content is bracketed by `q`/`Q`, then our operations run in a
    /// fresh graphics state translated to the MediaBox origin.
    pub fn commit(self, doc: &mut Document, page: &PageInfo) -> Result<()> {
        if self.ops.is_empty() {
            return Ok(());
        }

        let existing = doc.get_page_contents(page.id);
        let mut operations = Vec::with_capacity(self.ops.len() + 4);
        if !existing.is_empty() {
            operations.push(Operation::new("Q", vec![]));
        }
        operations.push(Operation::new("q", vec![]));
        let [llx, lly, ..] = page.media_box;
        if llx != 0.0 || lly != 0.0 {
            operations.push(Operation::new(
                "cm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), llx.into(), lly.into()],
            ));
        }
        operations.extend(self.ops);
        operations.push(Operation::new("Q", vec![]));
        let encoded = Content { operations }
            .encode()
            .map_err(|e| pdf_error("failed to encode field content", e))?;

        // Resources are copied onto the page so inherited or shared
        // dictionaries are never modified in place.
        let mut resources = inherited(doc, page.id, b"Resources")
            .and_then(|obj| resolve(doc, obj).as_dict().ok())
            .cloned()
            .unwrap_or_else(Dictionary::new);
        let mut fonts = sub_dictionary(doc, &resources, b"Font");
        let mut xobjects = sub_dictionary(doc, &resources, b"XObject");

        for font in &self.fonts {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), font_id);
        }
        for pending in self.images {
            let image_id = doc.add_object(image_stream(pending.image));
            xobjects.set(pending.name.as_str(), image_id);
        }
        if !fonts.is_empty() {
            resources.set("Font", fonts);
        }
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }

        let mut contents: Vec<Object> = Vec::with_capacity(existing.len() + 2);
        if !existing.is_empty() {
            let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            contents.push(open_id.into());
            contents.extend(existing.iter().map(|id| Object::Reference(*id)));
        }
        let ours = doc.add_object(Stream::new(Dictionary::new(), encoded));
        contents.push(ours.into());

        let page_dict = doc
            .get_object_mut(page.id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| pdf_error("page is not a dictionary", e))?;
        page_dict.set("Resources", resources);
        page_dict.set("Contents", contents);

        debug!(
            page = ?page.id,
            wrapped_streams = existing.len(),
            "field content committed"
        );
        Ok(())
    }
}

fn rect_op(rect: &PageRect) -> Operation {
    Operation::new(
        "re",
        vec![
            rect.x.into(),
            rect.y.into(),
            rect.width.into(),
            rect.height.into(),
        ],
    )
}

pub(crate) fn image_stream(image: RgbImage) -> Stream {
    let (width, height) = image.dimensions();
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        image.into_raw(),
    )
}

/// Look `key` up on the page, then up the `/Parent` chain.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current?).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn sub_dictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

fn rect_from(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let values = resolve(doc, obj).as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = number(resolve(doc, value))?;
    }
    // Normalise so [0] <= [2] and [1] <= [3].
    let (x0, x1) = (out[0].min(out[2]), out[0].max(out[2]));
    let (y0, y1) = (out[1].min(out[3]), out[1].max(out[3]));
    Some([x0, y0, x1, y1])
}
