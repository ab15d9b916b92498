// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Container adapter — embed an encoded raster into a single-page PDF using
// `printpdf`, or structurally re-save an existing PDF using `lopdf`.

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::SearchTuning;
use image::DynamicImage;
use lopdf::Document;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use crate::encode::{self, encode_to_target};

/// One PDF point per source pixel (no DPI correction). The page is sized in
/// document units equal to the image's pixel dimensions, a documented
/// simplification rather than a physical-size guarantee.
const PT_PER_PX: f32 = 1.0;
const MM_PER_PT: f32 = 25.4 / 72.0;

/// PDF containers add structural overhead around the embedded image stream,
/// so the adaptive search aims slightly below the caller's byte target.
const CONTAINER_HEADROOM_NUM: u64 = 9;
const CONTAINER_HEADROOM_DEN: u64 = 10;

/// Re-encode `image` as JPEG (searching against 90% of `target_bytes` when a
/// budget is set) and embed it as a single full-bleed PDF page.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn image_to_pdf(
    image: &DynamicImage,
    quality: Option<u8>,
    target_bytes: Option<u64>,
    tuning: &SearchTuning,
) -> Result<Vec<u8>> {
    let budget = target_bytes.map(|t| t * CONTAINER_HEADROOM_NUM / CONTAINER_HEADROOM_DEN);
    let jpeg = encode_to_target(image, &encode::Jpeg, quality, budget, tuning)?;
    debug!(jpeg_bytes = jpeg.len(), "lossy intermediate ready");
    embed_jpeg(&jpeg)
}

/// Build a single-page PDF whose page exactly matches the image's pixel
/// dimensions, with the image drawn full-bleed at the origin.
pub fn embed_jpeg(jpeg_bytes: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(jpeg_bytes).map_err(|err| {
        BildwerkError::PdfError(format!("failed to decode image for PDF embedding: {}", err))
    })?;

    let width_px = decoded.width() as usize;
    let height_px = decoded.height() as usize;

    let rgb = decoded.to_rgb8();
    let raw = RawImage {
        pixels: RawImageData::U8(rgb.into_raw()),
        width: width_px,
        height: height_px,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    };

    let mut doc = PdfDocument::new("Bildwerk Image");
    let xobject_id = doc.add_image(&raw);

    // At 72 dpi one pixel renders as one point, so scale 1.0 at the origin
    // fills the page edge to edge.
    let ops = vec![Op::UseXobject {
        id: xobject_id,
        transform: XObjectTransform {
            translate_x: Some(Pt(0.0)),
            translate_y: Some(Pt(0.0)),
            scale_x: Some(1.0),
            scale_y: Some(1.0),
            dpi: Some(72.0),
            rotate: None,
        },
    }];

    let page_w = Mm(width_px as f32 * PT_PER_PX * MM_PER_PT);
    let page_h = Mm(height_px as f32 * PT_PER_PX * MM_PER_PT);
    doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

    info!(width_px, height_px, "image embedded as single-page PDF");

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    Ok(doc.save(&PdfSaveOptions::default(), &mut warnings))
}

/// Structurally re-save an existing PDF: reload, compress content streams,
/// serialise. This is a best-effort size reduction and does not recompress
/// embedded images, so the gain is typically small.
#[instrument(skip_all, fields(bytes_len = pdf_bytes.len()))]
pub fn resave(pdf_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(pdf_bytes)
        .map_err(|err| BildwerkError::PdfError(format!("failed to load PDF: {}", err)))?;

    doc.compress();

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|err| BildwerkError::PdfError(format!("failed to re-save PDF: {}", err)))?;

    debug!(
        input_bytes = pdf_bytes.len(),
        output_bytes = output.len(),
        "PDF re-saved"
    );
    Ok(output)
}

/// Rasterising PDF pages needs an external renderer this deployment does not
/// carry; the error names the missing capability instead of degrading
/// silently.
pub fn rasterize(_pdf_bytes: &[u8]) -> Result<Vec<u8>> {
    Err(BildwerkError::CapabilityUnavailable(
        "PDF rasterization requires an external page renderer, which is not available".to_string(),
    ))
}
