// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bildwerk transcoding pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Target container formats a conversion request may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
    Pdf,
}

impl OutputFormat {
    /// MIME type string for the HTTP Content-Type header.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Pdf => "application/pdf",
        }
    }

    /// File extension used for output filenames and zip entries.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Pdf => "pdf",
        }
    }

    /// Parse a request-supplied format string. `jpg` and `jpeg` are synonyms.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Classification of an input file by extension, deciding which pipeline
/// (raster or document) handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Decodable raster image.
    Raster,
    /// Existing PDF document.
    Pdf,
    /// No pipeline defined for this extension.
    Unsupported,
}

impl SourceKind {
    /// Classify a filename by its extension.
    pub fn from_name(name: &str) -> Self {
        let ext = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "avif" | "jfif" | "bmp" | "tif" | "tiff" => {
                Self::Raster
            }
            "pdf" => Self::Pdf,
            _ => Self::Unsupported,
        }
    }
}

/// Pixel-space crop rectangle associated with one input file.
///
/// Coordinates arrive as floats from the client-side selection UI; they are
/// rounded and clamped against the decoded source before use. A region that
/// clamps to zero area is treated as "no crop", never as an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// What a conversion request asks the pipeline to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingTarget {
    pub format: OutputFormat,
    /// Fit-inside width bound in pixels; absent means unbounded on this axis.
    pub width: Option<u32>,
    /// Fit-inside height bound in pixels; absent means unbounded on this axis.
    pub height: Option<u32>,
    /// Requested lossy quality (1-100); defaults are format-dependent.
    pub quality: Option<u8>,
    /// Approximate byte budget for the adaptive encoder. Best-effort: the
    /// returned buffer may still exceed it once the attempt cap is reached.
    pub target_bytes: Option<u64>,
    /// Structural re-save for PDF-to-PDF requests.
    pub pdf_compress: bool,
}

impl EncodingTarget {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            width: None,
            height: None,
            quality: None,
            target_bytes: None,
            pdf_compress: false,
        }
    }
}

/// One successfully converted input, ready to be flushed in a response.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

/// An uploaded file spooled to temporary storage, identified by its original
/// client-supplied name. The temp file itself is owned (and deleted) by the
/// transport layer; the pipeline only reads through this path.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub original_name: String,
    pub path: PathBuf,
}

/// Derive an output filename from the original name's stem and the target
/// extension. Directory segments are discarded.
pub fn output_filename(original_name: &str, format: OutputFormat) -> String {
    let stem = std::path::Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("converted");
    format!("{}.{}", stem, format.extension())
}
