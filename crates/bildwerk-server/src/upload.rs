// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multipart upload parsing. File parts are spooled to named temp files whose
// deletion is tied to drop, so every exit path of a request — success,
// per-file failure, whole-batch failure — releases its disk usage.

use std::collections::HashMap;
use std::io::Write;

use axum::extract::Multipart;
use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::{CropRegion, EncodingTarget, OutputFormat, ServerConfig};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// One uploaded file, spooled to disk. The temp file is deleted when this is
/// dropped.
pub struct SpooledUpload {
    pub original_name: String,
    pub temp: NamedTempFile,
}

/// A fully parsed conversion request, ready for the pipeline.
pub struct ConvertJob {
    pub files: Vec<SpooledUpload>,
    pub target: EncodingTarget,
    pub crops: HashMap<usize, CropRegion>,
}

/// Parse the multipart payload into a [`ConvertJob`], enforcing the upload
/// limits before any pipeline work happens.
///
/// Malformed scalar fields (unparseable width, bad crop JSON) degrade to
/// "absent" rather than failing the request; only limit violations and a
/// missing file list are rejected.
pub async fn parse_request(
    multipart: &mut Multipart,
    config: &ServerConfig,
) -> Result<ConvertJob> {
    let mut files: Vec<SpooledUpload> = Vec::new();
    let mut fields: HashMap<String, String> = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| BildwerkError::UploadRejected(format!("malformed multipart: {}", err)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "files" {
            if files.len() >= config.max_files {
                return Err(BildwerkError::UploadRejected(format!(
                    "too many files (limit {})",
                    config.max_files
                )));
            }

            let original_name = field
                .file_name()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or("upload.bin")
                .to_string();
            let data = field.bytes().await.map_err(|err| {
                BildwerkError::UploadRejected(format!(
                    "reading '{}' failed: {}",
                    original_name, err
                ))
            })?;

            if data.len() as u64 > config.max_file_bytes {
                return Err(BildwerkError::UploadRejected(format!(
                    "'{}' exceeds the {} byte per-file limit",
                    original_name, config.max_file_bytes
                )));
            }

            let mut temp = NamedTempFile::with_prefix("bildwerk_upload_")?;
            temp.write_all(&data)?;
            debug!(file = %original_name, bytes = data.len(), "upload spooled");
            files.push(SpooledUpload {
                original_name,
                temp,
            });
        } else {
            // Scalar fields; a field that fails to read is treated as absent.
            let value = field.text().await.unwrap_or_default();
            fields.insert(name, value);
        }
    }

    if files.is_empty() {
        return Err(BildwerkError::UploadRejected("no files uploaded".to_string()));
    }

    let format = fields
        .get("format")
        .and_then(|v| OutputFormat::parse(v))
        .unwrap_or(OutputFormat::Png);

    let mut target = EncodingTarget::new(format);
    target.width = parse_numeric(&fields, "width");
    target.height = parse_numeric(&fields, "height");
    target.quality = parse_numeric::<u8>(&fields, "quality").filter(|q| (1..=100).contains(q));
    target.target_bytes = parse_numeric::<u64>(&fields, "targetSize").filter(|t| *t > 0);
    target.pdf_compress = fields
        .get("pdfCompress")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let crops = parse_crops(fields.get("crops").map(String::as_str));

    Ok(ConvertJob {
        files,
        target,
        crops,
    })
}

fn parse_numeric<T: std::str::FromStr>(fields: &HashMap<String, String>, key: &str) -> Option<T> {
    fields.get(key).and_then(|v| v.trim().parse().ok())
}

/// Decode the per-file crop map, `{"<file index>": {x, y, width, height}}`.
/// Bad JSON or non-numeric keys degrade to "no crops" with a warning.
fn parse_crops(raw: Option<&str>) -> HashMap<usize, CropRegion> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return HashMap::new();
    };

    match serde_json::from_str::<HashMap<String, CropRegion>>(raw) {
        Ok(parsed) => parsed
            .into_iter()
            .filter_map(|(key, region)| key.parse::<usize>().ok().map(|index| (index, region)))
            .collect(),
        Err(err) => {
            warn!(error = %err, "crop map is not valid JSON, ignoring");
            HashMap::new()
        }
    }
}
