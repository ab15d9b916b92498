// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adaptive encoder — per-format quality encoders and the size-target driver.
//
// Each raster format implements the same encode-at-quality contract so the
// search loop stays format-agnostic. PNG has no native lossy quality knob;
// its "quality" is approximated by palette quantization plus maximum deflate
// compression.

pub mod search;

use std::io::Cursor;

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::{OutputFormat, SearchTuning};
use color_quant::NeuQuant;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use tracing::{debug, instrument, warn};

use crate::resize::scale_down;
use self::search::{SearchState, next_state};

/// Floor for the lossy encoders' native quality parameter; below this the
/// output degenerates without meaningful size wins.
const LOSSY_QUALITY_MIN: u8 = 5;

/// Initial search quality when the request does not specify one.
const SEARCH_START_QUALITY: u8 = 80;

/// A format-specific encoder with a single quality knob (1-100).
pub trait QualityEncoder {
    fn format(&self) -> OutputFormat;

    /// Quality used for the single-pass path when the request names none.
    fn default_quality(&self) -> u8 {
        90
    }

    /// Encode the image at the given quality, returning the encoded bytes.
    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>>;
}

/// JPEG via the image crate's baseline encoder.
pub struct Jpeg;

impl QualityEncoder for Jpeg {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = image.to_rgb8();
        let encoder = JpegEncoder::new_with_quality(
            Cursor::new(&mut buffer),
            quality.max(LOSSY_QUALITY_MIN),
        );
        rgb.write_with_encoder(encoder)
            .map_err(|err| BildwerkError::EncodeFailed(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

/// WebP via libwebp bindings, with a fixed high effort setting for a better
/// size/quality tradeoff at the cost of encode time.
pub struct Webp;

impl QualityEncoder for Webp {
    fn format(&self) -> OutputFormat {
        OutputFormat::Webp
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let rgba = image.to_rgba8();
        let encoder = webp::Encoder::from_rgba(rgba.as_raw(), image.width(), image.height());

        let mut config = webp::WebPConfig::new()
            .map_err(|_| BildwerkError::EncodeFailed("WebP config init failed".to_string()))?;
        config.lossless = 0;
        config.quality = f32::from(quality.max(LOSSY_QUALITY_MIN));
        config.method = 6;

        let memory = encoder.encode_advanced(&config).map_err(|err| {
            BildwerkError::EncodeFailed(format!("WebP encoding failed: {:?}", err))
        })?;
        Ok(memory.to_vec())
    }
}

/// PNG: lossless container, so quality maps to a reduced color palette of
/// `max(16, round(256 * quality/100))` entries, remapped via NeuQuant, then
/// deflated at maximum compression. Quality 100 skips quantization entirely.
pub struct Png;

impl QualityEncoder for Png {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn default_quality(&self) -> u8 {
        100
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
        let mut rgba = image.to_rgba8();

        if quality < 100 {
            let colors = ((256.0 * f64::from(quality) / 100.0).round() as usize).clamp(16, 256);
            quantize_palette(&mut rgba, colors);
        }

        let mut buffer = Vec::new();
        let encoder = PngEncoder::new_with_quality(
            Cursor::new(&mut buffer),
            CompressionType::Best,
            PngFilter::Adaptive,
        );
        encoder
            .write_image(
                rgba.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|err| BildwerkError::EncodeFailed(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

/// Remap an RGBA buffer in place onto a NeuQuant palette of `colors` entries.
/// Fewer distinct colors make the subsequent deflate pass far more effective.
fn quantize_palette(data: &mut [u8], colors: usize) {
    let quantizer = NeuQuant::new(10, colors, data);
    let palette = quantizer.color_map_rgba();
    for pixel in data.chunks_exact_mut(4) {
        let index = quantizer.index_of(pixel);
        pixel.copy_from_slice(&palette[index * 4..index * 4 + 4]);
    }
}

/// Look up the encoder for a raster output format. `Pdf` has no quality
/// encoder of its own; the container adapter re-encodes through [`Jpeg`].
pub fn encoder_for(format: OutputFormat) -> Option<Box<dyn QualityEncoder>> {
    match format {
        OutputFormat::Png => Some(Box::new(Png)),
        OutputFormat::Jpeg => Some(Box::new(Jpeg)),
        OutputFormat::Webp => Some(Box::new(Webp)),
        OutputFormat::Pdf => None,
    }
}

/// Encode `image`, searching (quality, scale) space when a byte target is set.
///
/// Without a target this is a single encode at the requested or default
/// quality. With a target, each attempt derives its working image from the
/// original at the current scale factor (avoiding compounded rounding and
/// repeated lossy round-trips), encodes, and either stops at or below the
/// target or steps the state via the ratio-tiered policy.
///
/// Best-effort contract: when the attempt cap is reached the buffer from the
/// last completed attempt is returned even if it exceeds the target. Callers
/// that care must check the returned size themselves.
#[instrument(skip_all, fields(format = ?encoder.format(), target = ?target_bytes))]
pub fn encode_to_target(
    image: &DynamicImage,
    encoder: &dyn QualityEncoder,
    requested_quality: Option<u8>,
    target_bytes: Option<u64>,
    tuning: &SearchTuning,
) -> Result<Vec<u8>> {
    let Some(target) = target_bytes.filter(|t| *t > 0) else {
        // Common fast path.
        return encoder.encode(
            image,
            requested_quality.unwrap_or_else(|| encoder.default_quality()),
        );
    };

    let mut state = SearchState::new(requested_quality.unwrap_or(SEARCH_START_QUALITY));
    let mut last = Vec::new();

    for _ in 0..tuning.max_attempts.max(1) {
        let working = if state.scale < 1.0 {
            scale_down(image, state.scale)
        } else {
            image.clone()
        };

        let buffer = encoder.encode(&working, state.quality)?;
        let produced = buffer.len() as u64;
        debug!(
            attempt = state.attempt,
            quality = state.quality,
            scale = state.scale,
            produced,
            "encode attempt"
        );
        last = buffer;

        if produced <= target {
            return Ok(last);
        }
        state = next_state(&state, produced, target, tuning);
    }

    warn!(
        final_bytes = last.len(),
        target, "attempt cap reached without meeting target, returning best effort"
    );
    Ok(last)
}
