// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch orchestrator — runs the pipeline per input file, collects per-file
// results, and packages multi-file batches into a zip archive.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::{
    ConversionResult, CropRegion, EncodingTarget, InputFile, OutputFormat, SearchTuning,
    SourceKind, output_filename,
};
use tracing::{info, instrument, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::crop::extract;
use crate::encode::{encode_to_target, encoder_for};
use crate::pdf;
use crate::resize::fit_inside;

/// Aggregate result of one conversion request.
#[derive(Debug)]
pub enum BatchOutcome {
    /// Exactly one input succeeded; its buffer is returned directly.
    Single(ConversionResult),
    /// Multiple inputs succeeded; all results packaged as a zip archive.
    Archive { bytes: Vec<u8>, entry_count: usize },
}

/// Process each input through decode → crop → resize → encode (→ PDF embed),
/// sequentially within the request. A per-file failure is logged and excluded
/// from the results; the whole request only fails when every input does.
#[instrument(skip_all, fields(files = inputs.len(), format = ?target.format))]
pub fn run_batch(
    inputs: &[InputFile],
    target: &EncodingTarget,
    crops: &HashMap<usize, CropRegion>,
    tuning: &SearchTuning,
) -> Result<BatchOutcome> {
    let mut results: Vec<ConversionResult> = Vec::with_capacity(inputs.len());

    for (index, input) in inputs.iter().enumerate() {
        match process_file(input, crops.get(&index), target, tuning) {
            Ok(result) => {
                info!(
                    file = %input.original_name,
                    output_bytes = result.bytes.len(),
                    "file converted"
                );
                results.push(result);
            }
            Err(err) => {
                warn!(file = %input.original_name, error = %err, "file excluded from batch");
            }
        }
    }

    if results.is_empty() {
        return Err(BildwerkError::AllInputsFailed);
    }

    if results.len() == 1 {
        return Ok(BatchOutcome::Single(results.remove(0)));
    }

    let entry_count = results.len();
    let bytes = package_zip(&results)?;
    info!(entry_count, archive_bytes = bytes.len(), "batch archived");
    Ok(BatchOutcome::Archive { bytes, entry_count })
}

/// Run the full pipeline for one input file.
fn process_file(
    input: &InputFile,
    crop: Option<&CropRegion>,
    target: &EncodingTarget,
    tuning: &SearchTuning,
) -> Result<ConversionResult> {
    let kind = SourceKind::from_name(&input.original_name);

    match kind {
        SourceKind::Unsupported => Err(BildwerkError::UnsupportedConversion(format!(
            "no conversion pipeline for '{}'",
            input.original_name
        ))),

        SourceKind::Pdf => {
            let bytes = std::fs::read(&input.path)?;
            match target.format {
                // Document-to-document: structural re-save when compression
                // was asked for, otherwise pass the document through.
                OutputFormat::Pdf => {
                    let output = if target.pdf_compress {
                        pdf::resave(&bytes)?
                    } else {
                        bytes
                    };
                    Ok(ConversionResult {
                        bytes: output,
                        filename: output_filename(&input.original_name, OutputFormat::Pdf),
                        mime_type: OutputFormat::Pdf.mime_type().to_string(),
                    })
                }
                // Document-to-image needs a rasterizer we do not carry.
                _ => match pdf::rasterize(&bytes) {
                    Err(err) => Err(err),
                    Ok(_) => Err(BildwerkError::Internal(
                        "rasterizer produced output but no raster pipeline is wired".to_string(),
                    )),
                },
            }
        }

        SourceKind::Raster => {
            let bytes = std::fs::read(&input.path)?;
            let decoded = image::load_from_memory(&bytes).map_err(|err| {
                BildwerkError::DecodeFailed(format!("{}: {}", input.original_name, err))
            })?;

            let cropped = extract(&decoded, crop);
            let resized = fit_inside(&cropped, target.width, target.height);

            let (output, format) = if target.format == OutputFormat::Pdf {
                (
                    pdf::image_to_pdf(&resized, target.quality, target.target_bytes, tuning)?,
                    OutputFormat::Pdf,
                )
            } else {
                let encoder = encoder_for(target.format).ok_or_else(|| {
                    BildwerkError::Internal(format!("no encoder for {:?}", target.format))
                })?;
                (
                    encode_to_target(
                        &resized,
                        encoder.as_ref(),
                        target.quality,
                        target.target_bytes,
                        tuning,
                    )?,
                    target.format,
                )
            };

            Ok(ConversionResult {
                bytes: output,
                filename: output_filename(&input.original_name, format),
                mime_type: format.mime_type().to_string(),
            })
        }
    }
}

/// Deflate all results into one archive, one entry per result.
fn package_zip(results: &[ConversionResult]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for result in results {
        writer
            .start_file(result.filename.as_str(), options)
            .map_err(|err| BildwerkError::Archive(err.to_string()))?;
        writer.write_all(&result.bytes)?;
    }

    let cursor = writer
        .finish()
        .map_err(|err| BildwerkError::Archive(err.to_string()))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::path::PathBuf;

    use image::{DynamicImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 64, 255])
        }))
    }

    fn write_png(dir: &TempDir, name: &str, width: u32, height: u32) -> InputFile {
        let path: PathBuf = dir.path().join(name);
        gradient(width, height).save(&path).unwrap();
        InputFile {
            original_name: name.to_string(),
            path,
        }
    }

    fn write_garbage(dir: &TempDir, name: &str) -> InputFile {
        let path: PathBuf = dir.path().join(name);
        std::fs::write(&path, b"definitely not an image").unwrap();
        InputFile {
            original_name: name.to_string(),
            path,
        }
    }

    fn jpeg_target() -> EncodingTarget {
        EncodingTarget::new(OutputFormat::Jpeg)
    }

    #[test]
    fn single_file_returns_raw_buffer() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![write_png(&dir, "photo.png", 40, 30)];

        let outcome = run_batch(
            &inputs,
            &jpeg_target(),
            &HashMap::new(),
            &SearchTuning::default(),
        )
        .unwrap();

        match outcome {
            BatchOutcome::Single(result) => {
                assert_eq!(result.filename, "photo.jpg");
                assert_eq!(result.mime_type, "image/jpeg");
                assert_eq!(&result.bytes[0..2], &[0xFF, 0xD8]);
            }
            other => panic!("expected single result, got {:?}", other),
        }
    }

    #[test]
    fn corrupt_file_is_excluded_not_fatal() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![
            write_png(&dir, "a.png", 20, 20),
            write_garbage(&dir, "broken.jpg"),
            write_png(&dir, "c.png", 20, 20),
        ];

        let outcome = run_batch(
            &inputs,
            &jpeg_target(),
            &HashMap::new(),
            &SearchTuning::default(),
        )
        .unwrap();

        match outcome {
            BatchOutcome::Archive { bytes, entry_count } => {
                assert_eq!(entry_count, 2);
                let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
                let names: Vec<String> =
                    (0..archive.len()).map(|i| archive.by_index(i).unwrap().name().to_string()).collect();
                assert_eq!(names, vec!["a.jpg", "c.jpg"]);
            }
            other => panic!("expected archive, got {:?}", other),
        }
    }

    #[test]
    fn all_failures_fail_the_request() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![
            write_garbage(&dir, "x.jpg"),
            write_garbage(&dir, "y.png"),
        ];

        let err = run_batch(
            &inputs,
            &jpeg_target(),
            &HashMap::new(),
            &SearchTuning::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BildwerkError::AllInputsFailed));
    }

    #[test]
    fn unsupported_extension_is_excluded() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![
            write_png(&dir, "keep.png", 20, 20),
            write_garbage(&dir, "notes.txt"),
        ];

        let outcome = run_batch(
            &inputs,
            &jpeg_target(),
            &HashMap::new(),
            &SearchTuning::default(),
        )
        .unwrap();
        assert!(matches!(outcome, BatchOutcome::Single(_)));
    }

    #[test]
    fn crop_map_applies_per_file_index() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![write_png(&dir, "wide.png", 100, 80)];
        let mut crops = HashMap::new();
        crops.insert(
            0,
            CropRegion {
                x: 10.0,
                y: 10.0,
                width: 30.0,
                height: 20.0,
            },
        );

        let outcome = run_batch(
            &inputs,
            &jpeg_target(),
            &crops,
            &SearchTuning::default(),
        )
        .unwrap();

        let BatchOutcome::Single(result) = outcome else {
            panic!("expected single result");
        };
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (30, 20));
    }

    #[test]
    fn resize_bounds_are_applied_before_encoding() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![write_png(&dir, "big.png", 200, 100)];
        let mut target = jpeg_target();
        target.width = Some(50);

        let outcome =
            run_batch(&inputs, &target, &HashMap::new(), &SearchTuning::default()).unwrap();
        let BatchOutcome::Single(result) = outcome else {
            panic!("expected single result");
        };
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (50, 25));
    }

    #[test]
    fn raster_to_pdf_embeds_single_page() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![write_png(&dir, "scan.png", 64, 48)];
        let target = EncodingTarget::new(OutputFormat::Pdf);

        let outcome =
            run_batch(&inputs, &target, &HashMap::new(), &SearchTuning::default()).unwrap();
        let BatchOutcome::Single(result) = outcome else {
            panic!("expected single result");
        };
        assert_eq!(result.filename, "scan.pdf");
        assert_eq!(result.mime_type, "application/pdf");
        assert_eq!(&result.bytes[0..5], b"%PDF-");
    }

    #[test]
    fn pdf_source_with_pdf_target_honors_compress_flag() {
        let dir = TempDir::new().unwrap();
        use crate::encode::QualityEncoder;
        let jpeg = crate::encode::Jpeg.encode(&gradient(50, 50), 85).unwrap();
        let pdf_bytes = crate::pdf::embed_jpeg(&jpeg).unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, &pdf_bytes).unwrap();
        let inputs = vec![InputFile {
            original_name: "doc.pdf".to_string(),
            path,
        }];

        // Without the flag the document passes through byte-identical.
        let target = EncodingTarget::new(OutputFormat::Pdf);
        let outcome =
            run_batch(&inputs, &target, &HashMap::new(), &SearchTuning::default()).unwrap();
        let BatchOutcome::Single(result) = outcome else {
            panic!("expected single result");
        };
        assert_eq!(result.bytes, pdf_bytes);

        // With it, the document is re-saved and stays loadable.
        let mut target = EncodingTarget::new(OutputFormat::Pdf);
        target.pdf_compress = true;
        let outcome =
            run_batch(&inputs, &target, &HashMap::new(), &SearchTuning::default()).unwrap();
        let BatchOutcome::Single(result) = outcome else {
            panic!("expected single result");
        };
        assert_eq!(&result.bytes[0..5], b"%PDF-");
    }

    #[test]
    fn pdf_source_with_raster_target_is_excluded_as_unavailable() {
        let dir = TempDir::new().unwrap();
        // A PDF input asking for a raster output needs rasterization, which
        // is not available; with it being the only file the batch fails.
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.5 minimal").unwrap();
        let inputs = vec![InputFile {
            original_name: "doc.pdf".to_string(),
            path,
        }];

        let err = run_batch(
            &inputs,
            &jpeg_target(),
            &HashMap::new(),
            &SearchTuning::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BildwerkError::AllInputsFailed));
    }

    #[test]
    fn archive_entries_are_readable_converted_files() {
        let dir = TempDir::new().unwrap();
        let inputs = vec![
            write_png(&dir, "one.png", 30, 30),
            write_png(&dir, "two.png", 40, 40),
        ];
        let target = EncodingTarget::new(OutputFormat::Webp);

        let outcome =
            run_batch(&inputs, &target, &HashMap::new(), &SearchTuning::default()).unwrap();
        let BatchOutcome::Archive { bytes, .. } = outcome else {
            panic!("expected archive");
        };

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name("one.webp").unwrap();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        assert_eq!(&contents[0..4], b"RIFF");
    }
}
