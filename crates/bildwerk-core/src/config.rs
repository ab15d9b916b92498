// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the adaptive encoder's (quality, scale) search.
///
/// These are deployment parameters, not algorithm constants: a smaller
/// deployment may lower `max_attempts` to bound encode latency at the cost of
/// overshooting the byte target more often.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTuning {
    /// Hard cap on encode attempts per file; the search returns its last
    /// buffer when the cap is reached, whether or not the target was met.
    pub max_attempts: u32,
    /// Minimum lossy quality before the search switches to dimension scaling.
    pub quality_floor: u8,
    /// Quality decrement applied when the produced size is close to target.
    pub quality_step: u8,
    /// Quality to reset to after a scale reduction, so the next round of
    /// quality stepping has headroom.
    pub reset_quality: u8,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            quality_floor: 10,
            quality_step: 15,
            reset_quality: 60,
        }
    }
}

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port for the HTTP server.
    pub port: u16,
    /// Per-file upload size cap in bytes, enforced before the pipeline runs.
    pub max_file_bytes: u64,
    /// Maximum number of file parts accepted per request.
    pub max_files: usize,
    /// Adaptive encoder search tunables.
    pub search: SearchTuning,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            max_file_bytes: 1024 * 1024 * 1024,
            max_files: 10,
            search: SearchTuning::default(),
        }
    }
}

impl ServerConfig {
    /// Build a config from environment variables, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("BILDWERK_PORT", defaults.port),
            max_file_bytes: env_parse("BILDWERK_MAX_FILE_BYTES", defaults.max_file_bytes),
            max_files: env_parse("BILDWERK_MAX_FILES", defaults.max_files),
            search: defaults.search,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
