// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Search state machine for the adaptive encoder.
//
// The step policy is ratio-tiered: far above the byte target, quality tuning
// alone cannot converge and the scale factor is cut drastically; close to the
// target, quality is stepped down first to preserve resolution. The step
// function is pure so the policy is unit-testable without any image codec.

use bildwerk_core::SearchTuning;

/// Transient state of one size-target search. `scale` always multiplies the
/// *original* image dimensions, never the previous attempt's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchState {
    pub quality: u8,
    pub scale: f32,
    pub attempt: u32,
}

impl SearchState {
    pub fn new(quality: u8) -> Self {
        Self {
            quality,
            scale: 1.0,
            attempt: 0,
        }
    }
}

/// Compute the next search state after an attempt produced `produced` bytes
/// against a `target` budget.
///
/// Tiers by `ratio = produced / target`:
/// - ratio > 5: halve the scale factor; quality alone will not get there.
/// - 2 < ratio ≤ 5: scale ×0.7 and drop quality by 20.
/// - ratio ≤ 2 with quality above the floor: drop quality by one step.
/// - otherwise: scale ×0.8 and reset quality so further stepping has headroom.
pub fn next_state(
    state: &SearchState,
    produced: u64,
    target: u64,
    tuning: &SearchTuning,
) -> SearchState {
    let ratio = produced as f64 / target.max(1) as f64;

    let (quality, scale) = if ratio > 5.0 {
        (state.quality, state.scale * 0.5)
    } else if ratio > 2.0 {
        (
            state
                .quality
                .saturating_sub(20)
                .max(tuning.quality_floor),
            state.scale * 0.7,
        )
    } else if state.quality > tuning.quality_floor {
        (
            state
                .quality
                .saturating_sub(tuning.quality_step)
                .max(tuning.quality_floor),
            state.scale,
        )
    } else {
        (tuning.reset_quality, state.scale * 0.8)
    };

    SearchState {
        quality,
        scale,
        attempt: state.attempt + 1,
    }
}
