// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinate-based field rendering onto the first page of a PDF.

pub mod background;
pub mod canvas;
pub mod fonts;
pub mod layout;

use certgen_core::error::{CertgenError, Result};
use certgen_core::TemplateField;
use lopdf::Document;
use tracing::{debug, info, instrument};

use crate::color::Rgb;
use crate::qr::render_qr;

pub use canvas::{PageCanvas, PageInfo};
pub use fonts::FontFamily;
pub use layout::{PageRect, page_rect, text_origin};

/// What a field should show once its value has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldContent {
    Text(String),
    /// Payload to encode as a QR code.
    Qr(String),
}

#[derive(Debug, Clone)]
pub struct ResolvedField<'a> {
    pub field: &'a TemplateField,
    pub content: FieldContent,
}

impl<'a> ResolvedField<'a> {
    pub fn text(field: &'a TemplateField, text: impl Into<String>) -> Self {
        Self {
            field,
            content: FieldContent::Text(text.into()),
        }
    }
}

fn field_color(field: &TemplateField, value: Option<&str>) -> Result<Option<Rgb>> {
    value
        .map(|raw| {
            Rgb::parse(raw).ok_or_else(|| CertgenError::InvalidColor {
                field: field.key.clone(),
                value: raw.to_owned(),
            })
        })
        .transpose()
}

/// Queue one field's drawing operations.
pub fn draw_field(canvas: &mut PageCanvas, page_height: f32, resolved: &ResolvedField<'_>) -> Result<()> {
    let field = resolved.field;
    let rect = page_rect(field, page_height)?;

    match &resolved.content {
        FieldContent::Qr(payload) => {
            if payload.is_empty() {
                debug!(field = %field.key, "empty QR payload, field skipped");
                return Ok(());
            }
            let options = field.qrcode_options.clone().unwrap_or_default();
            let image = render_qr(&field.key, payload, &options)?;
            canvas.image(&rect, image);
        }
        FieldContent::Text(text) => {
            if let Some(background) = field_color(field, field.background_color.as_deref())? {
                canvas.fill_rect(&rect, background);
            }
            let border = field_color(field, field.border_color.as_deref())?;
            let border_width = field.border_width.filter(|w| *w > 0.0);
            if border.is_some() || border_width.is_some() {
                canvas.stroke_rect(&rect, border.unwrap_or(Rgb::BLACK), border_width.unwrap_or(1.0));
            }

            let font = FontFamily::resolve(&field.key, field.font_family.as_deref())?;
            let color = field_color(field, field.text_color.as_deref())?.unwrap_or(Rgb::BLACK);
            if text.is_empty() {
                return Ok(());
            }
            let size = field
                .font_size
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(layout::DEFAULT_FONT_SIZE);
            let width = font.text_width(text, size);
            let origin = text_origin(&rect, width, size, field.align.unwrap_or_default());
            canvas.text(font, size, color, origin, text);
        }
    }
    Ok(())
}

/// Render `fields` in order onto the first page of `doc`.
///
/// All fields are laid out before the page is touched; the first failing
/// field aborts with the page unchanged.
#[instrument(skip_all, fields(fields = fields.len()))]
pub fn render_fields(doc: &mut Document, fields: &[ResolvedField<'_>]) -> Result<()> {
    let page = PageInfo::first(doc)?;
    let mut canvas = PageCanvas::new();
    for resolved in fields {
        draw_field(&mut canvas, page.height(), resolved)?;
    }
    canvas.commit(doc, &page)?;
    info!(
        fields = fields.len(),
        page_width = page.width(),
        page_height = page.height(),
        "fields rendered"
    );
    Ok(())
}
