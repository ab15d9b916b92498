// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Resizer — fit-inside bounds and scale-factor downscaling.

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::debug;

/// Constrain an image to the given width/height bounds, preserving aspect
/// ratio ("fit inside"). A missing bound leaves that axis unconstrained; with
/// both bounds absent the image is returned unchanged. Bounds are clamped to
/// the source dimensions, so this never enlarges. Uses Lanczos3 filtering for
/// high-quality downscaling.
pub fn fit_inside(
    image: &DynamicImage,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> DynamicImage {
    if max_width.is_none() && max_height.is_none() {
        return image.clone();
    }

    let bound_w = max_width
        .filter(|w| *w > 0)
        .unwrap_or(u32::MAX)
        .min(image.width());
    let bound_h = max_height
        .filter(|h| *h > 0)
        .unwrap_or(u32::MAX)
        .min(image.height());

    if bound_w == image.width() && bound_h == image.height() {
        return image.clone();
    }

    debug!(
        from_w = image.width(),
        from_h = image.height(),
        bound_w,
        bound_h,
        "fit-inside resize"
    );
    image.resize(bound_w, bound_h, FilterType::Lanczos3)
}

/// Scale an image down by `factor` against its current dimensions, preserving
/// aspect ratio and never enlarging. The adaptive encoder calls this with the
/// *original* image each attempt so scale factors do not compound rounding
/// error across attempts.
pub fn scale_down(image: &DynamicImage, factor: f32) -> DynamicImage {
    if factor >= 1.0 {
        return image.clone();
    }
    let target_w = ((image.width() as f32) * factor).round().max(1.0) as u32;
    debug!(factor, target_w, "scaling working image");
    image.resize(target_w, u32::MAX, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn source(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::new(width, height))
    }

    #[test]
    fn no_bounds_is_identity() {
        let img = source(640, 480);
        let out = fit_inside(&img, None, None);
        assert_eq!((out.width(), out.height()), (640, 480));
    }

    #[test]
    fn fits_within_both_bounds_preserving_aspect() {
        let img = source(4000, 3000);
        let out = fit_inside(&img, Some(800), Some(800));
        assert!(out.width() <= 800 && out.height() <= 800);
        // 4:3 aspect preserved within a pixel of rounding.
        let expected_h = (out.width() as f64 * 3.0 / 4.0).round() as i64;
        assert!((out.height() as i64 - expected_h).abs() <= 1);
    }

    #[test]
    fn single_bound_leaves_other_axis_free() {
        let img = source(1000, 500);
        let out = fit_inside(&img, Some(400), None);
        assert_eq!(out.width(), 400);
        assert_eq!(out.height(), 200);
    }

    #[test]
    fn never_enlarges_past_source() {
        let img = source(300, 200);
        let out = fit_inside(&img, Some(900), Some(900));
        assert_eq!((out.width(), out.height()), (300, 200));
    }

    #[test]
    fn zero_bound_is_treated_as_unbounded() {
        let img = source(300, 200);
        let out = fit_inside(&img, Some(0), Some(100));
        assert_eq!((out.width(), out.height()), (150, 100));
    }

    #[test]
    fn scale_down_targets_rounded_width() {
        let img = source(1000, 400);
        let out = scale_down(&img, 0.5);
        assert_eq!(out.width(), 500);
        assert_eq!(out.height(), 200);
    }

    #[test]
    fn scale_down_with_unit_factor_is_identity() {
        let img = source(333, 111);
        let out = scale_down(&img, 1.0);
        assert_eq!((out.width(), out.height()), (333, 111));
    }

    #[test]
    fn scale_down_never_collapses_to_zero() {
        let img = source(3, 3);
        let out = scale_down(&img, 0.01);
        assert!(out.width() >= 1 && out.height() >= 1);
    }
}
