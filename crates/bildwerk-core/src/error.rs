// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bildwerk.

use thiserror::Error;

/// Top-level error type for all Bildwerk operations.
///
/// Per-file errors (`DecodeFailed`, `UnsupportedConversion`) are recovered
/// locally by the batch orchestrator and excluded from results; they only
/// surface to the caller when every input in a request fails.
#[derive(Debug, Error)]
pub enum BildwerkError {
    // -- Upload boundary --
    #[error("upload rejected: {0}")]
    UploadRejected(String),

    // -- Per-file pipeline errors --
    #[error("failed to decode input: {0}")]
    DecodeFailed(String),

    #[error("unsupported conversion: {0}")]
    UnsupportedConversion(String),

    #[error("required capability unavailable: {0}")]
    CapabilityUnavailable(String),

    // -- Encoding / container errors --
    #[error("image encoding failed: {0}")]
    EncodeFailed(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    // -- Aggregate --
    #[error("processing failed for all inputs")]
    AllInputsFailed,

    // -- Infrastructure --
    #[error("archive packaging failed: {0}")]
    Archive(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BildwerkError>;
