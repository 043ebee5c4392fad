// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR encoding — payload to RGB raster (for PDF pages) or PNG (for DOCX media).

use std::io::Cursor;

use certgen_core::error::{CertgenError, Result};
use certgen_core::{QrCodeOptions, QrErrorCorrection};
use image::{ImageFormat, Rgb as Pixel, RgbImage};
use qrcode::types::Color;
use qrcode::{EcLevel, QrCode};
use tracing::{debug, instrument};

use crate::color::Rgb;

pub const DEFAULT_QR_WIDTH: u32 = 200;
pub const DEFAULT_QR_MARGIN: u32 = 1;
/// Largest raster edge, in pixels, a QR code may be rendered at.
pub const MAX_QR_WIDTH: u32 = 4096;

fn ec_level(level: QrErrorCorrection) -> EcLevel {
    match level {
        QrErrorCorrection::L => EcLevel::L,
        QrErrorCorrection::M => EcLevel::M,
        QrErrorCorrection::Q => EcLevel::Q,
        QrErrorCorrection::H => EcLevel::H,
    }
}

fn option_color(field: &str, value: Option<&str>, fallback: Rgb) -> Result<Rgb> {
    match value {
        None => Ok(fallback),
        Some(raw) => Rgb::parse(raw).ok_or_else(|| CertgenError::InvalidColor {
            field: field.to_owned(),
            value: raw.to_owned(),
        }),
    }
}

/// Encode `content` as a square RGB raster.
///
/// The quiet zone is `options.margin` modules wide and every module is a whole
/// number of pixels, so the result is at most `options.width` pixels across
/// (never less than one pixel per module).
#[instrument(skip(content, options), fields(content_len = content.len()))]
pub fn render_qr(field: &str, content: &str, options: &QrCodeOptions) -> Result<RgbImage> {
    let level = ec_level(options.error_correction_level.unwrap_or_default());
    let code = QrCode::with_error_correction_level(content.as_bytes(), level).map_err(|e| {
        CertgenError::QrEncoding {
            field: field.to_owned(),
            reason: e.to_string(),
        }
    })?;

    let colors = options.color.clone().unwrap_or_default();
    let dark = option_color(field, colors.dark.as_deref(), Rgb::BLACK)?;
    let light = option_color(field, colors.light.as_deref(), Rgb::WHITE)?;

    let modules = code.width() as u32;
    let margin = options.margin.unwrap_or(DEFAULT_QR_MARGIN);
    let target = options.width.unwrap_or(DEFAULT_QR_WIDTH);
    let too_large = || CertgenError::QrEncoding {
        field: field.to_owned(),
        reason: format!(
            "width {target} with margin {margin} exceeds the {MAX_QR_WIDTH} px limit"
        ),
    };
    if target > MAX_QR_WIDTH {
        return Err(too_large());
    }
    let total = margin
        .checked_mul(2)
        .and_then(|m| m.checked_add(modules))
        .ok_or_else(too_large)?;
    let module_px = (target / total).max(1);
    let size = total
        .checked_mul(module_px)
        .filter(|size| *size <= MAX_QR_WIDTH)
        .ok_or_else(too_large)?;

    let cells = code.to_colors();
    let mut image = RgbImage::from_pixel(size, size, Pixel([light.0, light.1, light.2]));
    let dark_px = Pixel([dark.0, dark.1, dark.2]);
    for (index, cell) in cells.iter().enumerate() {
        if *cell != Color::Dark {
            continue;
        }
        let mx = index as u32 % modules + margin;
        let my = index as u32 / modules + margin;
        for dy in 0..module_px {
            for dx in 0..module_px {
                image.put_pixel(mx * module_px + dx, my * module_px + dy, dark_px);
            }
        }
    }

    debug!(modules, module_px, size, "QR code rendered");
    Ok(image)
}

/// PNG bytes for a rendered QR raster.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| CertgenError::Image(format!("failed to encode QR PNG: {e}")))?;
    Ok(buf.into_inner())
}
