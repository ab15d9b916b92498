// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region extractor — clamps and applies a pixel-space crop rectangle.

use bildwerk_core::CropRegion;
use image::DynamicImage;
use tracing::debug;

/// Apply an optional crop region to a decoded image.
///
/// The region is rounded to integer pixels and clamped against the source
/// bounds. Degenerate input degrades to identity: an absent region, or one
/// whose clamped area is zero on either axis, returns the image unchanged.
/// No error conditions are raised.
pub fn extract(image: &DynamicImage, region: Option<&CropRegion>) -> DynamicImage {
    let Some(region) = region else {
        return image.clone();
    };

    let src_w = image.width() as i64;
    let src_h = image.height() as i64;

    let left = (region.x.round() as i64).clamp(0, src_w - 1);
    let top = (region.y.round() as i64).clamp(0, src_h - 1);
    let width = (region.width.round() as i64).min(src_w - left);
    let height = (region.height.round() as i64).min(src_h - top);

    if width <= 0 || height <= 0 {
        debug!(?region, "crop clamps to zero area, skipping");
        return image.clone();
    }

    debug!(left, top, width, height, "cropping image");
    image.crop_imm(left as u32, top as u32, width as u32, height as u32)
}
