//! Writing track lists into playlists.
//!
//! A playlist is created once, then filled with consecutive batches of at
//! most `batch_size` uris. Every batch is attempted even when an earlier one
//! failed, and nothing already written is rolled back: a failed batch leaves
//! the playlist partially populated, and the [`BatchReport`] says exactly
//! which slices are missing.

use crate::catalog::{CatalogClient, PlaylistId, Session, MAX_APPEND_BATCH};
use crate::error::{CatalogError, EngineError, Result};
use crate::track::PlaylistRequest;
use log::{debug, info, warn};
use std::ops::Range;

/// A batch the catalog refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Position of the batch in write order.
    pub batch: usize,
    /// Slice of the input the batch carried.
    pub range: Range<usize>,
    pub error: CatalogError,
}

/// Result of writing one track list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub batches_attempted: usize,
    pub tracks_written: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Tracks in failed batches.
    pub fn tracks_missing(&self) -> usize {
        self.failures.iter().map(|f| f.range.len()).sum()
    }
}

/// A playlist created by the engine and what was written to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedPlaylist {
    pub id: PlaylistId,
    pub name: String,
    pub report: BatchReport,
}

impl MaterializedPlaylist {
    /// Turns a partially written playlist into an error.
    ///
    /// # Errors
    ///
    /// [`EngineError::ExternalCallFailure`] carrying the first failed batch,
    /// annotated with how much of the playlist is missing.
    pub fn into_complete(self) -> Result<Self> {
        let Some(first) = self.report.failures.first() else {
            return Ok(self);
        };
        Err(EngineError::ExternalCallFailure(CatalogError::new(
            first.error.operation,
            format!(
                "{} (playlist `{}` left partially populated: {} of {} batches failed, {} tracks missing)",
                first.error.message,
                self.name,
                self.report.failures.len(),
                self.report.batches_attempted,
                self.report.tracks_missing()
            ),
        )))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchMaterializer {
    batch_size: usize,
}

impl Default for BatchMaterializer {
    fn default() -> Self {
        Self {
            batch_size: MAX_APPEND_BATCH,
        }
    }
}

impl BatchMaterializer {
    /// # Errors
    ///
    /// `batch_size` must be between 1 and [`MAX_APPEND_BATCH`].
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 || batch_size > MAX_APPEND_BATCH {
            return Err(EngineError::InvalidConfig(format!(
                "write batch size {batch_size} must be between 1 and {MAX_APPEND_BATCH}"
            )));
        }
        Ok(Self { batch_size })
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Creates a playlist named after `request` and writes its tracks.
    ///
    /// # Errors
    ///
    /// Only a failed `create_playlist` is an error here. Failed batches are
    /// recorded in the returned report.
    pub fn materialize<C: CatalogClient + ?Sized>(
        &self,
        catalog: &mut C,
        session: &Session,
        request: &PlaylistRequest,
    ) -> Result<MaterializedPlaylist> {
        let id = catalog.create_playlist(session, &request.name)?;
        info!("Created playlist `{}` ({id}) for {} tracks", request.name, request.tracks.len());

        let report = self.write(catalog, session, &id, &request.tracks);
        Ok(MaterializedPlaylist {
            id,
            name: request.name.clone(),
            report,
        })
    }

    /// Appends `uris` to an existing playlist in order, one call per batch.
    /// An empty list makes no call at all.
    pub fn write<C: CatalogClient + ?Sized>(
        &self,
        catalog: &mut C,
        session: &Session,
        playlist: &PlaylistId,
        uris: &[String],
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for (batch, chunk) in uris.chunks(self.batch_size).enumerate() {
            let start = batch * self.batch_size;
            let range = start..start + chunk.len();
            report.batches_attempted += 1;

            match catalog.append_tracks(session, playlist, chunk) {
                Ok(()) => {
                    debug!("Wrote batch {batch} ({} tracks) to {playlist}", chunk.len());
                    report.tracks_written += chunk.len();
                }
                Err(error) => {
                    warn!("Batch {batch} ({range:?}) to {playlist} failed: {error}");
                    report.failures.push(BatchFailure { batch, range, error });
                }
            }
        }

        if !report.is_complete() {
            warn!(
                "Playlist {playlist} is partially populated: {} of {} tracks written",
                report.tracks_written,
                uris.len()
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;

    fn uris(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("track:{i}")).collect()
    }

    fn write_all(n: usize) -> (MemoryCatalog, MaterializedPlaylist) {
        let mut catalog = MemoryCatalog::new(Vec::new());
        let request = PlaylistRequest::new("Mix", uris(n));
        let playlist = BatchMaterializer::default()
            .materialize(&mut catalog, &Session::new("me"), &request)
            .unwrap();
        (catalog, playlist)
    }

    fn batch_sizes(catalog: &MemoryCatalog) -> Vec<usize> {
        catalog.append_log().iter().map(|c| c.uris.len()).collect()
    }

    #[test]
    fn test_250_tracks_in_three_batches() {
        let (catalog, playlist) = write_all(250);
        assert_eq!(batch_sizes(&catalog), vec![100, 100, 50]);
        assert_eq!(catalog.playlist_tracks(&playlist.id), uris(250));
        assert_eq!(playlist.report.tracks_written, 250);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_call() {
        let (catalog, _) = write_all(100);
        assert_eq!(batch_sizes(&catalog), vec![100]);

        let (catalog, _) = write_all(300);
        assert_eq!(batch_sizes(&catalog), vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_list_creates_playlist_without_writes() {
        let (catalog, playlist) = write_all(0);
        assert_eq!(catalog.playlists().len(), 1);
        assert!(catalog.append_log().is_empty());
        assert_eq!(playlist.report.batches_attempted, 0);
        assert!(playlist.report.is_complete());
    }

    #[test]
    fn test_concatenated_batches_preserve_order_for_any_length() {
        for n in [1, 99, 101, 199, 200, 201, 1234] {
            let (catalog, playlist) = write_all(n);
            let written: Vec<String> = catalog.append_log().iter().flat_map(|c| c.uris.clone()).collect();
            assert_eq!(written, uris(n), "length {n}");
            assert!(batch_sizes(&catalog).iter().all(|&s| s > 0 && s <= 100));
            assert_eq!(playlist.report.tracks_written, n);
        }
    }

    #[test]
    fn test_failed_batch_does_not_stop_later_batches() {
        let mut catalog = MemoryCatalog::new(Vec::new()).fail_append_call(1);
        let request = PlaylistRequest::new("Flaky", uris(250));
        let playlist = BatchMaterializer::default()
            .materialize(&mut catalog, &Session::new("me"), &request)
            .unwrap();

        assert_eq!(catalog.append_log().len(), 3);
        assert_eq!(playlist.report.batches_attempted, 3);
        assert_eq!(playlist.report.tracks_written, 150);
        assert_eq!(playlist.report.failures.len(), 1);
        assert_eq!(playlist.report.failures[0].range, 100..200);
        assert_eq!(playlist.report.tracks_missing(), 100);

        let mut expected = uris(100);
        expected.extend(uris(250).into_iter().skip(200));
        assert_eq!(catalog.playlist_tracks(&playlist.id), expected);

        let err = playlist.into_complete().unwrap_err();
        assert!(matches!(err, EngineError::ExternalCallFailure(_)));
        assert!(err.to_string().contains("partially populated"));
    }

    #[test]
    fn test_create_failure_is_an_error() {
        let mut catalog = MemoryCatalog::new(Vec::new()).fail_operation("create_playlist");
        let err = BatchMaterializer::default()
            .materialize(&mut catalog, &Session::new("me"), &PlaylistRequest::new("X", uris(3)))
            .unwrap_err();
        assert!(matches!(err, EngineError::ExternalCallFailure(_)));
        assert!(catalog.append_log().is_empty());
    }

    #[test]
    fn test_smaller_batch_size() {
        let mut catalog = MemoryCatalog::new(Vec::new());
        let materializer = BatchMaterializer::new(40).unwrap();
        materializer
            .materialize(&mut catalog, &Session::new("me"), &PlaylistRequest::new("Small", uris(90)))
            .unwrap();
        assert_eq!(batch_sizes(&catalog), vec![40, 40, 10]);
    }

    #[test]
    fn test_batch_size_bounds() {
        assert!(BatchMaterializer::new(0).is_err());
        assert!(BatchMaterializer::new(101).is_err());
        assert_eq!(BatchMaterializer::new(100).unwrap().batch_size(), 100);
    }
}
