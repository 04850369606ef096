//! Feature normalization.
//!
//! Raw audio attributes live on unrelated scales, so each dimension is
//! min-max scaled to `[0, 1]` before any distance is computed. Scaling uses
//! the minimum and maximum of the *whole* working set: the full matrix is
//! collected first, and only then is any row scaled. Lookups are split into
//! chunks purely because the catalog limits call size.

use crate::catalog::MAX_FEATURE_LOOKUP;
use crate::error::{CatalogError, EngineError, Result};
use crate::track::{AudioFeatures, FeatureVector, Track, FEATURE_COUNT};
use log::{debug, trace};

/// Raw attribute rows, one per track, in input order.
pub type FeatureMatrix = Vec<[f64; FEATURE_COUNT]>;

#[derive(Debug, Clone, Copy)]
pub struct FeatureNormalizer {
    batch_size: usize,
}

impl Default for FeatureNormalizer {
    fn default() -> Self {
        Self {
            batch_size: MAX_FEATURE_LOOKUP,
        }
    }
}

impl FeatureNormalizer {
    /// # Errors
    ///
    /// `batch_size` must be between 1 and [`MAX_FEATURE_LOOKUP`].
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 || batch_size > MAX_FEATURE_LOOKUP {
            return Err(EngineError::InvalidConfig(format!(
                "feature batch size {batch_size} must be between 1 and {MAX_FEATURE_LOOKUP}"
            )));
        }
        Ok(Self { batch_size })
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Fetches raw attributes for `tracks` through `lookup` and returns one
    /// scaled vector per track, in input order.
    ///
    /// # Errors
    ///
    /// Any lookup failure, or a lookup answering with the wrong number of
    /// records, aborts the whole call with [`EngineError::ExternalCallFailure`].
    pub fn normalize<F>(&self, tracks: &[Track], lookup: F) -> Result<Vec<FeatureVector>>
    where
        F: FnMut(&[String]) -> std::result::Result<Vec<AudioFeatures>, CatalogError>,
    {
        let matrix = self.collect(tracks, lookup)?;
        Ok(min_max_scale(&matrix))
    }

    /// Builds the raw matrix with lookups of at most `batch_size` uris.
    ///
    /// # Errors
    ///
    /// See [`FeatureNormalizer::normalize`].
    pub fn collect<F>(&self, tracks: &[Track], mut lookup: F) -> Result<FeatureMatrix>
    where
        F: FnMut(&[String]) -> std::result::Result<Vec<AudioFeatures>, CatalogError>,
    {
        let uris: Vec<String> = tracks.iter().map(|t| t.uri.clone()).collect();
        let mut matrix = Vec::with_capacity(uris.len());

        for chunk in uris.chunks(self.batch_size) {
            let records = lookup(chunk)?;
            if records.len() != chunk.len() {
                return Err(CatalogError::new(
                    "audio_features",
                    format!("returned {} records for {} uris", records.len(), chunk.len()),
                )
                .into());
            }
            trace!("Fetched features for {} tracks", chunk.len());
            matrix.extend(records.iter().map(AudioFeatures::to_row));
        }

        debug!("Collected a {}x{} feature matrix", matrix.len(), FEATURE_COUNT);
        Ok(matrix)
    }
}

/// Scales every column of `matrix` to `[0, 1]`.
///
/// The column minimum maps to 0.0 and the maximum to 1.0. A constant column
/// maps to 0.0 everywhere. Pure: the same matrix always yields the same output.
#[must_use]
pub fn min_max_scale(matrix: &[[f64; FEATURE_COUNT]]) -> Vec<FeatureVector> {
    let mut min = [f64::INFINITY; FEATURE_COUNT];
    let mut max = [f64::NEG_INFINITY; FEATURE_COUNT];

    for row in matrix {
        for (j, &value) in row.iter().enumerate() {
            min[j] = min[j].min(value);
            max[j] = max[j].max(value);
        }
    }

    matrix
        .iter()
        .map(|row| {
            let mut scaled = [0.0; FEATURE_COUNT];
            for (j, &value) in row.iter().enumerate() {
                let range = max[j] - min[j];
                scaled[j] = if range > 0.0 { (value - min[j]) / range } else { 0.0 };
            }
            FeatureVector(scaled)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::Feature;

    const EPSILON: f64 = 1e-9;

    fn features(seed: f64) -> AudioFeatures {
        AudioFeatures {
            danceability: 0.2 + seed * 0.05,
            energy: 0.9 - seed * 0.07,
            loudness: -20.0 + seed * 1.5,
            speechiness: 0.04,
            acousticness: (seed * 0.37) % 1.0,
            instrumentalness: seed * seed * 0.001,
            valence: 0.5,
            tempo: 80.0 + seed * 3.0,
            mode: if seed as u32 % 2 == 0 { 1.0 } else { 0.0 },
        }
    }

    fn tracks(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track::new(format!("t:{i}"), "2022-01-01T00:00:00Z"))
            .collect()
    }

    fn lookup(uris: &[String]) -> std::result::Result<Vec<AudioFeatures>, CatalogError> {
        Ok(uris
            .iter()
            .map(|uri| {
                let index: f64 = uri.trim_start_matches("t:").parse().unwrap();
                features(index)
            })
            .collect())
    }

    #[test]
    fn test_every_column_spans_unit_interval_or_is_zero() {
        let vectors = FeatureNormalizer::default().normalize(&tracks(120), lookup).unwrap();
        assert_eq!(vectors.len(), 120);

        for feature in Feature::ALL {
            let column: Vec<f64> = vectors.iter().map(|v| v.get(feature)).collect();
            let min = column.iter().copied().fold(f64::INFINITY, f64::min);
            let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            match feature {
                Feature::Speechiness | Feature::Valence => {
                    assert!(column.iter().all(|&v| v == 0.0), "{} is constant", feature.name());
                }
                _ => {
                    assert!(min.abs() < EPSILON, "{} min was {min}", feature.name());
                    assert!((max - 1.0).abs() < EPSILON, "{} max was {max}", feature.name());
                }
            }
        }
    }

    #[test]
    fn test_lookups_are_chunked_at_fifty() {
        let mut sizes = Vec::new();
        FeatureNormalizer::default()
            .normalize(&tracks(120), |uris| {
                sizes.push(uris.len());
                lookup(uris)
            })
            .unwrap();
        assert_eq!(sizes, vec![50, 50, 20]);
    }

    #[test]
    fn test_scaling_uses_the_whole_set_not_each_chunk() {
        // Tempo rises across chunks; per-chunk scaling would give the last row
        // of every chunk a tempo of 1.0.
        let vectors = FeatureNormalizer::new(2).unwrap().normalize(&tracks(5), lookup).unwrap();
        let tempos: Vec<f64> = vectors.iter().map(|v| v.get(Feature::Tempo)).collect();
        assert!((tempos[0] - 0.0).abs() < EPSILON);
        assert!((tempos[1] - 0.25).abs() < EPSILON);
        assert!((tempos[3] - 0.75).abs() < EPSILON);
        assert!((tempos[4] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_empty_input_makes_no_calls() {
        let mut calls = 0;
        let vectors = FeatureNormalizer::default()
            .normalize(&[], |uris| {
                calls += 1;
                lookup(uris)
            })
            .unwrap();
        assert!(vectors.is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let normalizer = FeatureNormalizer::default();
        let first = normalizer.normalize(&tracks(30), lookup).unwrap();
        let second = normalizer.normalize(&tracks(30), lookup).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_track_scales_to_zero() {
        let vectors = FeatureNormalizer::default().normalize(&tracks(1), lookup).unwrap();
        assert_eq!(vectors, vec![FeatureVector([0.0; FEATURE_COUNT])]);
    }

    #[test]
    fn test_lookup_failure_propagates() {
        let err = FeatureNormalizer::default()
            .normalize(&tracks(3), |_| Err(CatalogError::new("audio_features", "timeout")))
            .unwrap_err();
        assert!(matches!(err, EngineError::ExternalCallFailure(_)));
    }

    #[test]
    fn test_short_lookup_answer_is_rejected() {
        let err = FeatureNormalizer::default()
            .normalize(&tracks(3), |uris| lookup(&uris[..1]))
            .unwrap_err();
        assert!(err.to_string().contains("returned 1 records for 3 uris"));
    }

    #[test]
    fn test_batch_size_bounds() {
        assert!(FeatureNormalizer::new(0).is_err());
        assert!(FeatureNormalizer::new(51).is_err());
        assert_eq!(FeatureNormalizer::new(50).unwrap().batch_size(), 50);
    }
}
