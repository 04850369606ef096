//! # Configuration Module
//!
//! Tuning knobs for the playlist strategies and where they are stored.
//!
//! ## Config Location
//!
//! Relisten reads `config.json` from the platform-standard config directory:
//! - Linux: `~/.config/relisten/`
//! - macOS: `~/Library/Application Support/relisten/`
//! - Windows: `%APPDATA%\relisten\`
//!
//! Every field is optional in the file; missing fields take their defaults.
//!
//! ```json
//! { "cluster_count": 6, "scan_mode": "full_scan" }
//! ```

use crate::catalog::{MAX_APPEND_BATCH, MAX_FEATURE_LOOKUP, RECOMMENDATION_SEEDS};
use crate::cluster::KMeans;
use crate::error::EngineError;
use crate::materializer::BatchMaterializer;
use crate::normalizer::FeatureNormalizer;
use crate::timeline::{ScanMode, TimelinePartitioner};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the platform-appropriate config file path.
///
/// Creates the `relisten` directory if it does not exist yet. The file
/// itself is not created.
///
/// # Errors
///
/// This function will return an error if:
/// - The system config directory cannot be determined
/// - The relisten subdirectory cannot be created due to permissions
///
/// # Examples
///
/// ```no_run
/// use relisten::config::get_config_path;
///
/// let path = get_config_path()?;
/// println!("Config location: {}", path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system config directory. Please ensure your platform supports standard config directories."
        )
    })?;

    let relisten_dir = config_dir.join("relisten");
    fs::create_dir_all(&relisten_dir).with_context(|| {
        format!(
            "Failed to create Relisten config directory at {}. Please check file permissions.",
            relisten_dir.display()
        )
    })?;

    Ok(relisten_dir.join("config.json"))
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of cluster playlists.
    pub cluster_count: usize,
    /// Uris per feature lookup, at most 50.
    pub feature_batch_size: usize,
    /// Uris per playlist append, at most 100.
    pub write_batch_size: usize,
    pub max_iterations: usize,
    /// Clustering restarts; the tightest result wins.
    pub restarts: usize,
    /// Centroid movement below which clustering stops early.
    pub tolerance: f64,
    pub top_track_limit: usize,
    pub top_artist_limit: usize,
    pub tracks_per_artist: usize,
    pub recommendation_rounds: usize,
    /// Seeds per recommendation query, also the minimum pool size.
    pub recommendation_seed_count: usize,
    pub scan_mode: ScanMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cluster_count: 4,
            feature_batch_size: MAX_FEATURE_LOOKUP,
            write_batch_size: MAX_APPEND_BATCH,
            max_iterations: 300,
            restarts: 10,
            tolerance: 1e-4,
            top_track_limit: 50,
            top_artist_limit: 25,
            tracks_per_artist: 5,
            recommendation_rounds: 10,
            recommendation_seed_count: RECOMMENDATION_SEEDS,
            scan_mode: ScanMode::Ordered,
        }
    }
}

impl EngineConfig {
    /// Reads and validates a JSON config file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid JSON, or holds
    /// out-of-range values.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        Ok(config)
    }

    /// Like [`EngineConfig::load`], but a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::load`].
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Checks every value against the limits the engine and catalog impose.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        FeatureNormalizer::new(self.feature_batch_size)?;
        BatchMaterializer::new(self.write_batch_size)?;

        let positive = [
            ("cluster_count", self.cluster_count),
            ("max_iterations", self.max_iterations),
            ("restarts", self.restarts),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(EngineError::InvalidConfig(format!("{field} must be at least 1")));
        }
        if self.recommendation_seed_count != RECOMMENDATION_SEEDS {
            return Err(EngineError::InvalidConfig(format!(
                "recommendation_seed_count must be {RECOMMENDATION_SEEDS}, got {}",
                self.recommendation_seed_count
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "tolerance must be a positive number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Out-of-range `feature_batch_size`.
    pub fn normalizer(&self) -> std::result::Result<FeatureNormalizer, EngineError> {
        FeatureNormalizer::new(self.feature_batch_size)
    }

    /// # Errors
    ///
    /// Out-of-range `write_batch_size`.
    pub fn materializer(&self) -> std::result::Result<BatchMaterializer, EngineError> {
        BatchMaterializer::new(self.write_batch_size)
    }

    pub fn kmeans(&self, k: usize) -> KMeans {
        KMeans::new(k)
            .with_max_iterations(self.max_iterations)
            .with_restarts(self.restarts)
            .with_tolerance(self.tolerance)
    }

    pub fn partitioner(&self) -> TimelinePartitioner {
        TimelinePartitioner::new(self.scan_mode)
    }
}
