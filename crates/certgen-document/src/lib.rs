// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// certgen-document — Document generation for certgen.
//
// Renders coordinate fields onto PDF and image templates, substitutes
// variables and QR codes into DOCX templates, and converts DOCX output to PDF
// through a headless office converter. `DocumentEngine` ties these together
// behind a single `generate` call.

pub mod adapter;
pub mod color;
pub mod context;
pub mod convert;
pub mod docx;
pub mod engine;
pub mod format;
pub mod payload;
pub mod qr;
pub mod render;

// Re-export the primary types so callers can use `certgen_document::DocumentEngine` etc.
pub use adapter::{Adapter, CanvasAdapter, CanvasSource, DocxAdapter, dispatch};
pub use context::{GeneratedDocument, GenerationContext, Storage, StorageLinks, StorageUrlResolver};
pub use convert::{ConvertOptions, Converter};
pub use docx::{DiagnosticKind, SubstitutionDiagnostic};
pub use engine::DocumentEngine;
pub use payload::QrPayloadResolver;
