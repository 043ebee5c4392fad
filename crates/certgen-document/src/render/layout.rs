// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Editor-space to page-space geometry.
//
// The template editor measures from the top-left corner with Y growing down;
// PDF user space measures from the bottom-left with Y growing up. Every field
// goes through `page_rect` exactly once.

use certgen_core::error::{CertgenError, Result};
use certgen_core::{TemplateField, TextAlign};

/// Horizontal padding applied to left- and right-aligned text.
pub const TEXT_PADDING: f32 = 2.0;

pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// A field box in page space, relative to the page's MediaBox origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Flip `field` into page space: `y' = page_height - y - h`, X unchanged.
pub fn page_rect(field: &TemplateField, page_height: f32) -> Result<PageRect> {
    if !field.has_valid_geometry() {
        return Err(CertgenError::InvalidGeometry {
            field: field.key.clone(),
            x: field.x,
            y: field.y,
            w: field.w,
            h: field.h,
        });
    }
    Ok(PageRect {
        x: field.x,
        y: page_height - field.y - field.h,
        width: field.w,
        height: field.h,
    })
}

/// Baseline origin for a single line of text inside `rect`.
pub fn text_origin(rect: &PageRect, text_width: f32, font_size: f32, align: TextAlign) -> (f32, f32) {
    let x = match align {
        TextAlign::Left => rect.x + TEXT_PADDING,
        TextAlign::Center => rect.x + (rect.width - text_width) / 2.0,
        TextAlign::Right => rect.x + rect.width - text_width - TEXT_PADDING,
    };
    let y = rect.y + (rect.height - font_size) / 2.0;
    (x, y)
}
