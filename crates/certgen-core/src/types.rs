// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for certificate generation.
//
// Field names follow the camelCase layout templates are authored in, so a
// template exported by the editor deserialises without translation.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Declared kind of an uploaded template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Pdf,
    Image,
    Docx,
    Pptx,
}

impl TemplateType {
    /// Classify a template from its MIME type.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        match mime.as_str() {
            MIME_PDF => Some(Self::Pdf),
            MIME_DOCX => Some(Self::Docx),
            MIME_PPTX => Some(Self::Pptx),
            m if m.starts_with("image/") => Some(Self::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
        }
    }
}

impl std::fmt::Display for TemplateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format the caller would like to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Docx,
}

impl OutputFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => MIME_PDF,
            Self::Docx => MIME_DOCX,
        }
    }

    /// Extension used when handing files to the converter.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

/// A single per-recipient value.
///
/// JSON strings always deserialise as `Text`, date-looking or not, so the
/// supplied calendar day is what gets rendered and signed. `Date` is for
/// callers building variables in code and keeps its own offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<FixedOffset>),
}

impl VariableValue {
    /// Plain string form, used when no type-aware formatting applies.
    pub fn as_display(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => display_number(*n),
            Self::Date(d) => {
                if d.time() == NaiveTime::MIN {
                    d.format("%Y-%m-%d").to_string()
                } else {
                    d.to_rfc3339()
                }
            }
            Self::Text(s) => s.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for VariableValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for VariableValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for VariableValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<DateTime<Utc>> for VariableValue {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for VariableValue {
    fn from(d: DateTime<FixedOffset>) -> Self {
        Self::Date(d)
    }
}

/// Integers print without a fractional part.
fn display_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Flat key → value record for one recipient.
pub type VariableMap = HashMap<String, VariableValue>;

// ---------------------------------------------------------------------------
// Template fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Qrcode,
    Date,
    Number,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A rectangle placed on the template in editor space (origin top-left).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateField {
    pub key: String,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub align: Option<TextAlign>,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
    #[serde(default)]
    pub border_width: Option<f32>,
    #[serde(default)]
    pub qrcode_options: Option<QrCodeOptions>,
    #[serde(default)]
    pub qrcode_auth: Option<QrCodeAuth>,
    #[serde(default)]
    pub qrcode_storage_url: Option<QrStorageUrl>,
}

impl TemplateField {
    /// A plain text field at the given editor-space rectangle.
    pub fn text(key: impl Into<String>, x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            key: key.into(),
            x,
            y,
            w,
            h,
            font_size: None,
            align: None,
            field_type: FieldType::Text,
            format: None,
            font_family: None,
            text_color: None,
            background_color: None,
            border_color: None,
            border_width: None,
            qrcode_options: None,
            qrcode_auth: None,
            qrcode_storage_url: None,
        }
    }

    /// `w > 0`, `h > 0`, `x >= 0`, `y >= 0`, all finite.
    pub fn has_valid_geometry(&self) -> bool {
        [self.x, self.y, self.w, self.h].iter().all(|v| v.is_finite())
            && self.w > 0.0
            && self.h > 0.0
            && self.x >= 0.0
            && self.y >= 0.0
    }
}

// ---------------------------------------------------------------------------
// QR codes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QrErrorCorrection {
    #[serde(alias = "low")]
    L,
    #[default]
    #[serde(alias = "medium")]
    M,
    #[serde(alias = "quartile")]
    Q,
    #[serde(alias = "high")]
    H,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QrColors {
    #[serde(default)]
    pub dark: Option<String>,
    #[serde(default)]
    pub light: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeOptions {
    /// Target raster width in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// Quiet zone in modules.
    #[serde(default)]
    pub margin: Option<u32>,
    #[serde(default)]
    pub error_correction_level: Option<QrErrorCorrection>,
    #[serde(default)]
    pub color: Option<QrColors>,
}

/// Which variables feed each certificate claim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateFieldMapping {
    #[serde(default)]
    pub certificate_id: Option<String>,
    #[serde(default)]
    pub holder_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
}

/// Per-QR-code request to carry a signed verification link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeAuth {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub certificate_fields: CertificateFieldMapping,
    #[serde(default)]
    pub include_document_hash: bool,
    /// Seconds after issuance at which verification starts failing.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Emit the short identifier-plus-signature token instead of the full URL.
    #[serde(default)]
    pub simple: bool,
}

/// Per-QR-code request to link to the stored copy of the generated document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrStorageUrl {
    #[serde(default)]
    pub enabled: bool,
    /// Storage path the document will be written to.
    #[serde(default)]
    pub path: Option<String>,
    /// When set, a signed URL with this lifetime (seconds) is issued.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrContentType {
    #[default]
    Text,
    Url,
}

/// A QR image to splice into a DOCX template at `placeholder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocxQrCodeConfig {
    pub placeholder: String,
    pub content_pattern: String,
    #[serde(default)]
    pub content_type: Option<QrContentType>,
    #[serde(default)]
    pub options: Option<QrCodeOptions>,
    #[serde(default)]
    pub auth: Option<QrCodeAuth>,
    #[serde(default)]
    pub storage_url: Option<QrStorageUrl>,
}

// ---------------------------------------------------------------------------
// Certificate authentication
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HmacAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl std::str::FromStr for HmacAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha512" | "sha-512" => Ok(Self::Sha512),
            other => Err(format!("unsupported HMAC algorithm `{other}`")),
        }
    }
}

/// Deployment secret used to sign certificate payloads.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAuthConfig {
    pub secret_key: String,
    pub verification_base_url: String,
    #[serde(default)]
    pub algorithm: HmacAlgorithm,
}

impl std::fmt::Debug for CertificateAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAuthConfig")
            .field("secret_key", &"<redacted>")
            .field("verification_base_url", &self.verification_base_url)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Conversion output options
// ---------------------------------------------------------------------------

/// Standard paper sizes understood by the converter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    A4,
    A3,
    Letter,
    Legal,
    Tabloid,
}

impl PaperSize {
    /// Dimensions in millimetres (width, height), portrait.
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Tabloid => (279, 432),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::A3 => "A3",
            Self::Letter => "Letter",
            Self::Legal => "Legal",
            Self::Tabloid => "Tabloid",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSetup {
    #[serde(default)]
    pub paper_size: PaperSize,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub margins: Option<Margins>,
}

/// Options that only matter when the output goes through the converter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    #[serde(default)]
    pub page_setup: Option<PageSetup>,
    /// Raw export filter appended after `<format>:` on the converter command line.
    #[serde(default)]
    pub filters: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn classifies_mime_types() {
        assert_eq!(TemplateType::from_mime_type("application/pdf"), Some(TemplateType::Pdf));
        assert_eq!(TemplateType::from_mime_type("image/png"), Some(TemplateType::Image));
        assert_eq!(TemplateType::from_mime_type(MIME_DOCX), Some(TemplateType::Docx));
        assert_eq!(TemplateType::from_mime_type(MIME_PPTX), Some(TemplateType::Pptx));
        assert_eq!(TemplateType::from_mime_type("text/plain"), None);
    }

    #[test]
    fn variable_values_deserialise_untagged() {
        let map: VariableMap = serde_json::from_str(
            r#"{"name":"Ana","score":9.5,"count":3,"missing":null,"when":"2024-01-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(map["name"], VariableValue::Text("Ana".into()));
        assert_eq!(map["score"], VariableValue::Number(9.5));
        assert_eq!(map["count"].as_display(), "3");
        assert!(map["missing"].is_null());
        assert_eq!(map["when"], VariableValue::Text("2024-01-01T10:00:00Z".into()));
    }

    #[test]
    fn offset_date_strings_are_kept_verbatim() {
        let map: VariableMap = serde_json::from_str(r#"{"issued":"2024-03-05T00:30:00+01:00"}"#).unwrap();
        assert_eq!(map["issued"], VariableValue::Text("2024-03-05T00:30:00+01:00".into()));
        assert_eq!(map["issued"].as_display(), "2024-03-05T00:30:00+01:00");
    }

    #[test]
    fn midnight_dates_display_without_time() {
        let d = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(VariableValue::from(d).as_display(), "2024-01-01");

        let paris = FixedOffset::east_opt(3600).unwrap();
        let local = paris.with_ymd_and_hms(2024, 3, 5, 0, 30, 0).unwrap();
        assert_eq!(VariableValue::Date(local).as_display(), "2024-03-05T00:30:00+01:00");
    }

    #[test]
    fn field_geometry_invariants() {
        assert!(TemplateField::text("a", 0.0, 0.0, 1.0, 1.0).has_valid_geometry());
        assert!(!TemplateField::text("a", 0.0, 0.0, 0.0, 1.0).has_valid_geometry());
        assert!(!TemplateField::text("a", -1.0, 0.0, 1.0, 1.0).has_valid_geometry());
        assert!(!TemplateField::text("a", 0.0, f32::NAN, 1.0, 1.0).has_valid_geometry());
    }

    #[test]
    fn field_deserialises_from_editor_json() {
        let json = r##"{"key":"holder","x":10,"y":20,"w":100,"h":30,"type":"qrcode",
            "qrcodeAuth":{"enabled":true,"certificateFields":{"holderName":"holder"}}}"##;
        let field: TemplateField = serde_json::from_str(json).unwrap();
        assert_eq!(field.field_type, FieldType::Qrcode);
        let auth = field.qrcode_auth.unwrap();
        assert!(auth.enabled);
        assert_eq!(auth.certificate_fields.holder_name.as_deref(), Some("holder"));
    }

    #[test]
    fn auth_config_debug_hides_key() {
        let cfg = CertificateAuthConfig {
            secret_key: "super-secret".into(),
            verification_base_url: "https://verify.example".into(),
            algorithm: HmacAlgorithm::Sha512,
        };
        assert!(!format!("{cfg:?}").contains("super-secret"));
        assert_eq!("SHA-512".parse::<HmacAlgorithm>().unwrap(), HmacAlgorithm::Sha512);
    }
}
