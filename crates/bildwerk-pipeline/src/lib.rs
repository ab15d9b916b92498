// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bildwerk-pipeline — the adaptive transcoding pipeline.
//
// Data flow per input: decode → crop (region extractor) → fit-inside resize →
// adaptive size-constrained encode → optional PDF embedding. The batch
// orchestrator runs this per file, collects per-file results, and packages
// multi-file batches into a zip archive.

pub mod batch;
pub mod crop;
pub mod encode;
pub mod pdf;
pub mod resize;

pub use crate::batch::{BatchOutcome, run_batch};
pub use crate::crop::extract;
pub use crate::encode::search::{SearchState, next_state};
pub use crate::encode::{QualityEncoder, encode_to_target};
pub use crate::resize::fit_inside;
