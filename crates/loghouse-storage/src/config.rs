//! Log Configuration
//!
//! This module defines configuration for the segmented log.
//!
//! ## SegmentConfig
//!
//! Controls when the active segment rolls and where a fresh log starts:
//!
//! - **max_store_bytes**: Roll the segment when its store file reaches this size
//! - **max_index_bytes**: Pre-allocated index size; roll when the index fills
//! - **initial_offset**: Base offset of the first segment in an empty log
//!
//! A byte cap of `0` means "unset" and is replaced with the default when the
//! log opens, so a zero-value `Config` is always usable.
//!
//! ## Usage
//!
//! ```ignore
//! use loghouse_storage::{Config, SegmentConfig};
//!
//! // Defaults throughout
//! let config = Config::default();
//!
//! // Small segments for testing roll behavior
//! let config = Config {
//!     segment: SegmentConfig {
//!         max_index_bytes: 36, // three index entries
//!         ..Default::default()
//!     },
//! };
//! ```

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_STORE_BYTES: u64 = 1024;
pub const DEFAULT_MAX_INDEX_BYTES: u64 = 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub segment: SegmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Roll the active segment once its store file reaches this many bytes
    #[serde(default = "default_max_store_bytes")]
    pub max_store_bytes: u64,

    /// Size the index file is pre-grown to; the segment rolls when it fills
    #[serde(default = "default_max_index_bytes")]
    pub max_index_bytes: u64,

    /// Base offset assigned to the first segment of a fresh log
    #[serde(default)]
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: default_max_store_bytes(),
            max_index_bytes: default_max_index_bytes(),
            initial_offset: 0,
        }
    }
}

impl Config {
    /// Replace zero byte caps with the defaults. Zero means "unset".
    pub(crate) fn normalize(&mut self) {
        if self.segment.max_store_bytes == 0 {
            self.segment.max_store_bytes = DEFAULT_MAX_STORE_BYTES;
        }
        if self.segment.max_index_bytes == 0 {
            self.segment.max_index_bytes = DEFAULT_MAX_INDEX_BYTES;
        }
    }
}

fn default_max_store_bytes() -> u64 {
    DEFAULT_MAX_STORE_BYTES
}

fn default_max_index_bytes() -> u64 {
    DEFAULT_MAX_INDEX_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.segment.max_store_bytes, 1024);
        assert_eq!(config.segment.max_index_bytes, 1024);
        assert_eq!(config.segment.initial_offset, 0);
    }

    #[test]
    fn test_normalize_replaces_zero_caps() {
        let mut config = Config {
            segment: SegmentConfig {
                max_store_bytes: 0,
                max_index_bytes: 0,
                initial_offset: 7,
            },
        };
        config.normalize();
        assert_eq!(config.segment.max_store_bytes, DEFAULT_MAX_STORE_BYTES);
        assert_eq!(config.segment.max_index_bytes, DEFAULT_MAX_INDEX_BYTES);
        // initial_offset of zero is a valid value, never "unset"
        assert_eq!(config.segment.initial_offset, 7);
    }

    #[test]
    fn test_normalize_keeps_explicit_caps() {
        let mut config = Config {
            segment: SegmentConfig {
                max_store_bytes: 64,
                max_index_bytes: 36,
                initial_offset: 0,
            },
        };
        config.normalize();
        assert_eq!(config.segment.max_store_bytes, 64);
        assert_eq!(config.segment.max_index_bytes, 36);
    }
}
