// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The six fixed font families and their text metrics.
//
// All six are PDF base-14 fonts, so nothing is embedded: viewers supply the
// glyphs and we only need the advance widths (from the Adobe AFM files, in
// 1/1000 em) to measure text for alignment. Text is encoded as WinAnsi, which
// matches Latin-1 for the printable range we emit.

use certgen_core::error::{CertgenError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontFamily {
    #[default]
    Helvetica,
    HelveticaBold,
    TimesRoman,
    TimesBold,
    Courier,
    CourierBold,
}

impl FontFamily {
    pub const ALL: [FontFamily; 6] = [
        Self::Helvetica,
        Self::HelveticaBold,
        Self::TimesRoman,
        Self::TimesBold,
        Self::Courier,
        Self::CourierBold,
    ];

    /// Resolve an editor font name. `None` means the default sans-serif.
    pub fn resolve(field: &str, name: Option<&str>) -> Result<Self> {
        let Some(raw) = name else {
            return Ok(Self::default());
        };
        let normalized: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_'))
            .collect();
        let family = match normalized.as_str() {
            "" | "helvetica" | "sans-serif" | "sansserif" | "sans" | "arial" => Self::Helvetica,
            "helvetica-bold" | "helveticabold" | "sans-serif-bold" | "arial-bold" | "arialbold" => {
                Self::HelveticaBold
            }
            "times" | "times-roman" | "timesroman" | "timesnewroman" | "serif" => Self::TimesRoman,
            "times-bold" | "timesbold" | "times-roman-bold" | "timesromanbold" | "serif-bold" => {
                Self::TimesBold
            }
            "courier" | "couriernew" | "monospace" | "mono" => Self::Courier,
            "courier-bold" | "courierbold" | "monospace-bold" | "mono-bold" => Self::CourierBold,
            _ => {
                return Err(CertgenError::UnknownFont {
                    field: field.to_owned(),
                    font: raw.to_owned(),
                });
            }
        };
        Ok(family)
    }

    /// PostScript name used as the PDF `/BaseFont`.
    pub fn base_font(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
        }
    }

    /// Page resource name for this family.
    pub fn resource_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "CgF1",
            Self::HelveticaBold => "CgF2",
            Self::TimesRoman => "CgF3",
            Self::TimesBold => "CgF4",
            Self::Courier => "CgF5",
            Self::CourierBold => "CgF6",
        }
    }

    fn ascii_widths(&self) -> Option<&'static [u16; 95]> {
        match self {
            Self::Helvetica => Some(&HELVETICA),
            Self::HelveticaBold => Some(&HELVETICA_BOLD),
            Self::TimesRoman => Some(&TIMES_ROMAN),
            Self::TimesBold => Some(&TIMES_BOLD),
            Self::Courier | Self::CourierBold => None,
        }
    }

    /// Advance width of one WinAnsi byte, in 1/1000 em.
    fn glyph_width(&self, byte: u8) -> u16 {
        match self.ascii_widths() {
            None => 600,
            Some(table) => match byte {
                32..=126 => table[(byte - 32) as usize],
                // Latin-1 letters and symbols: close to a lowercase average.
                _ => table[(b'n' - 32) as usize],
            },
        }
    }

    /// Width of `text` at `font_size` points.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .iter()
            .map(|b| u32::from(self.glyph_width(*b)))
            .sum();
        units as f32 * font_size / 1000.0
    }
}

/// Encode for a WinAnsi simple font. Characters outside Latin-1 become `?`,
/// control characters become spaces.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            0x00..=0x1F | 0x7F => b' ',
            _ => b'?',
        })
        .collect()
}

// AFM advance widths for characters 32..=126.

#[rustfmt::skip]
static HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
static HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
static TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
static TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_aliases_and_default() {
        assert_eq!(FontFamily::resolve("f", None).unwrap(), FontFamily::Helvetica);
        assert_eq!(FontFamily::resolve("f", Some("sans-serif")).unwrap(), FontFamily::Helvetica);
        assert_eq!(FontFamily::resolve("f", Some("Times New Roman")).unwrap(), FontFamily::TimesRoman);
        assert_eq!(FontFamily::resolve("f", Some("Courier-Bold")).unwrap(), FontFamily::CourierBold);
    }

    #[test]
    fn unknown_font_is_a_render_error() {
        match FontFamily::resolve("title", Some("Comic Sans")) {
            Err(CertgenError::UnknownFont { field, font }) => {
                assert_eq!(field, "title");
                assert_eq!(font, "Comic Sans");
            }
            other => panic!("expected unknown font, got {other:?}"),
        }
    }

    #[test]
    fn measures_known_widths() {
        // "Ana" in Helvetica: 667 + 556 + 556 = 1779 units.
        let w = FontFamily::Helvetica.text_width("Ana", 10.0);
        assert!((w - 17.79).abs() < 1e-3);
        // Courier is monospaced.
        assert!((FontFamily::Courier.text_width("iiii", 10.0) - 24.0).abs() < 1e-3);
    }

    #[test]
    fn win_ansi_encoding() {
        assert_eq!(encode_win_ansi("Zoë"), vec![b'Z', b'o', 0xEB]);
        assert_eq!(encode_win_ansi("日\n"), vec![b'?', b' ']);
    }

    #[test]
    fn every_family_has_distinct_resource() {
        let mut names: Vec<_> = FontFamily::ALL.iter().map(|f| f.resource_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 6);
    }
}
