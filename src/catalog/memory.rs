//! Offline catalog held entirely in memory.
//!
//! Serves a fixed library snapshot (optionally loaded from JSON) and records
//! every write, so a run can be inspected afterwards without touching a real
//! service. Individual calls can be made to fail to exercise the engine's
//! partial-write behaviour.

use super::{
    CatalogClient, Page, PlaylistId, Session, MAX_APPEND_BATCH, MAX_FEATURE_LOOKUP,
    RECOMMENDATION_SEEDS,
};
use crate::error::CatalogError;
use crate::track::{AudioFeatures, Term, Track};
use anyhow::{Context, Result};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const DEFAULT_PAGE_SIZE: usize = 50;

/// Library contents served by a [`MemoryCatalog`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSnapshot {
    /// Most recently saved first.
    pub saved_tracks: Vec<Track>,
    pub audio_features: HashMap<String, AudioFeatures>,
    pub top_tracks: HashMap<Term, Vec<String>>,
    pub top_artists: HashMap<Term, Vec<String>>,
    pub artist_top_tracks: HashMap<String, Vec<String>>,
    /// Recommendations produced by each seed track.
    pub recommendations: HashMap<String, Vec<String>>,
}

/// A playlist created through the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPlaylist {
    pub id: PlaylistId,
    pub name: String,
    pub owner: String,
}

/// One `append_tracks` attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendCall {
    pub playlist: PlaylistId,
    pub uris: Vec<String>,
    pub succeeded: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    snapshot: CatalogSnapshot,
    page_size: usize,
    playlists: Vec<CreatedPlaylist>,
    append_log: Vec<AppendCall>,
    feature_lookups: Vec<usize>,
    recommendation_seeds: Vec<Vec<String>>,
    saved_track_calls: usize,
    failing_appends: HashSet<usize>,
    failing_operations: HashSet<&'static str>,
}

impl MemoryCatalog {
    /// Catalog serving `saved_tracks` and nothing else.
    pub fn new(saved_tracks: Vec<Track>) -> Self {
        Self::from_snapshot(CatalogSnapshot {
            saved_tracks,
            ..CatalogSnapshot::default()
        })
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            snapshot,
            page_size: DEFAULT_PAGE_SIZE,
            playlists: Vec::new(),
            append_log: Vec::new(),
            feature_lookups: Vec::new(),
            recommendation_seeds: Vec::new(),
            saved_track_calls: 0,
            failing_appends: HashSet::new(),
            failing_operations: HashSet::new(),
        }
    }

    /// Loads a [`CatalogSnapshot`] from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a valid snapshot.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog snapshot at {}", path.display()))?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Invalid catalog snapshot in {}", path.display()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_features(mut self, uri: impl Into<String>, features: AudioFeatures) -> Self {
        self.snapshot.audio_features.insert(uri.into(), features);
        self
    }

    #[must_use]
    pub fn with_top_tracks(mut self, term: Term, uris: Vec<String>) -> Self {
        self.snapshot.top_tracks.insert(term, uris);
        self
    }

    #[must_use]
    pub fn with_top_artists(mut self, term: Term, artists: Vec<String>) -> Self {
        self.snapshot.top_artists.insert(term, artists);
        self
    }

    #[must_use]
    pub fn with_artist_tracks(mut self, artist: impl Into<String>, uris: Vec<String>) -> Self {
        self.snapshot.artist_top_tracks.insert(artist.into(), uris);
        self
    }

    #[must_use]
    pub fn with_recommendations(mut self, seed: impl Into<String>, uris: Vec<String>) -> Self {
        self.snapshot.recommendations.insert(seed.into(), uris);
        self
    }

    /// Makes the `n`-th `append_tracks` call (0-based, across all playlists) fail.
    #[must_use]
    pub fn fail_append_call(mut self, n: usize) -> Self {
        self.failing_appends.insert(n);
        self
    }

    /// Makes every call of `operation` fail, e.g. `"create_playlist"`.
    #[must_use]
    pub fn fail_operation(mut self, operation: &'static str) -> Self {
        self.failing_operations.insert(operation);
        self
    }

    pub fn playlists(&self) -> &[CreatedPlaylist] {
        &self.playlists
    }

    pub fn append_log(&self) -> &[AppendCall] {
        &self.append_log
    }

    /// Batch sizes of every feature lookup, in call order.
    pub fn feature_lookups(&self) -> &[usize] {
        &self.feature_lookups
    }

    /// Seeds of every accepted recommendation query, in call order.
    pub fn recommendation_seeds(&self) -> &[Vec<String>] {
        &self.recommendation_seeds
    }

    pub fn saved_track_calls(&self) -> usize {
        self.saved_track_calls
    }

    /// Tracks successfully written to `playlist`, in write order.
    pub fn playlist_tracks(&self, playlist: &PlaylistId) -> Vec<String> {
        self.append_log
            .iter()
            .filter(|call| call.succeeded && &call.playlist == playlist)
            .flat_map(|call| call.uris.iter().cloned())
            .collect()
    }

    /// Looks a created playlist up by name; the first match wins.
    pub fn playlist_named(&self, name: &str) -> Option<&CreatedPlaylist> {
        self.playlists.iter().find(|p| p.name == name)
    }

    fn check(&self, operation: &'static str) -> Result<(), CatalogError> {
        if self.failing_operations.contains(operation) {
            return Err(CatalogError::new(operation, "injected failure"));
        }
        Ok(())
    }
}

impl CatalogClient for MemoryCatalog {
    fn saved_tracks(
        &mut self,
        _session: &Session,
        cursor: Option<&str>,
    ) -> Result<Page<Track>, CatalogError> {
        self.check("saved_tracks")?;
        self.saved_track_calls += 1;

        let offset = match cursor {
            None => 0,
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| CatalogError::new("saved_tracks", format!("bad cursor `{raw}`")))?,
        };
        let total = self.snapshot.saved_tracks.len();
        let end = (offset + self.page_size).min(total);
        let items = self
            .snapshot
            .saved_tracks
            .get(offset..end)
            .map(<[Track]>::to_vec)
            .unwrap_or_default();
        let next = (end < total).then(|| end.to_string());

        Ok(Page { items, next })
    }

    fn audio_features(&mut self, uris: &[String]) -> Result<Vec<AudioFeatures>, CatalogError> {
        self.check("audio_features")?;
        if uris.len() > MAX_FEATURE_LOOKUP {
            return Err(CatalogError::new(
                "audio_features",
                format!("{} uris exceed the limit of {MAX_FEATURE_LOOKUP}", uris.len()),
            ));
        }
        self.feature_lookups.push(uris.len());

        uris.iter()
            .map(|uri| {
                self.snapshot
                    .audio_features
                    .get(uri)
                    .copied()
                    .ok_or_else(|| CatalogError::new("audio_features", format!("no features for {uri}")))
            })
            .collect()
    }

    fn create_playlist(&mut self, session: &Session, name: &str) -> Result<PlaylistId, CatalogError> {
        self.check("create_playlist")?;
        let id = PlaylistId(format!("playlist:{}", self.playlists.len()));
        trace!("Created playlist {id} `{name}`");
        self.playlists.push(CreatedPlaylist {
            id: id.clone(),
            name: name.to_string(),
            owner: session.user_id.clone(),
        });
        Ok(id)
    }

    fn append_tracks(
        &mut self,
        _session: &Session,
        playlist: &PlaylistId,
        uris: &[String],
    ) -> Result<(), CatalogError> {
        self.check("append_tracks")?;
        if uris.len() > MAX_APPEND_BATCH {
            return Err(CatalogError::new(
                "append_tracks",
                format!("{} uris exceed the limit of {MAX_APPEND_BATCH}", uris.len()),
            ));
        }
        if !self.playlists.iter().any(|p| &p.id == playlist) {
            return Err(CatalogError::new("append_tracks", format!("unknown playlist {playlist}")));
        }

        let succeeded = !self.failing_appends.contains(&self.append_log.len());
        self.append_log.push(AppendCall {
            playlist: playlist.clone(),
            uris: uris.to_vec(),
            succeeded,
        });

        if succeeded {
            Ok(())
        } else {
            Err(CatalogError::new("append_tracks", "injected failure"))
        }
    }

    fn top_tracks(
        &mut self,
        _session: &Session,
        term: Term,
        limit: usize,
    ) -> Result<Vec<String>, CatalogError> {
        self.check("top_tracks")?;
        Ok(self
            .snapshot
            .top_tracks
            .get(&term)
            .map(|uris| uris.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn top_artists(
        &mut self,
        _session: &Session,
        term: Term,
        limit: usize,
    ) -> Result<Vec<String>, CatalogError> {
        self.check("top_artists")?;
        Ok(self
            .snapshot
            .top_artists
            .get(&term)
            .map(|artists| artists.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn artist_top_tracks(&mut self, artist: &str) -> Result<Vec<String>, CatalogError> {
        self.check("artist_top_tracks")?;
        self.snapshot
            .artist_top_tracks
            .get(artist)
            .cloned()
            .ok_or_else(|| CatalogError::new("artist_top_tracks", format!("unknown artist {artist}")))
    }

    fn recommendations(&mut self, seeds: &[String]) -> Result<Vec<String>, CatalogError> {
        self.check("recommendations")?;
        if seeds.len() != RECOMMENDATION_SEEDS {
            return Err(CatalogError::new(
                "recommendations",
                format!("expected {RECOMMENDATION_SEEDS} seeds, got {}", seeds.len()),
            ));
        }
        self.recommendation_seeds.push(seeds.to_vec());
        Ok(seeds
            .iter()
            .filter_map(|seed| self.snapshot.recommendations.get(seed))
            .flat_map(|uris| uris.iter().cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn session() -> Session {
        Session::new("listener")
    }

    #[test]
    fn test_append_requires_existing_playlist() {
        let mut catalog = MemoryCatalog::new(Vec::new());
        let err = catalog
            .append_tracks(&session(), &PlaylistId("nope".into()), &["a".into()])
            .unwrap_err();
        assert_eq!(err.operation, "append_tracks");
    }

    #[test]
    fn test_append_limit_is_enforced() {
        let mut catalog = MemoryCatalog::new(Vec::new());
        let id = catalog.create_playlist(&session(), "Big").unwrap();
        let uris: Vec<String> = (0..101).map(|i| i.to_string()).collect();
        assert!(catalog.append_tracks(&session(), &id, &uris).is_err());
        assert!(catalog.append_tracks(&session(), &id, &uris[..100]).is_ok());
    }

    #[test]
    fn test_injected_append_failure_is_logged_but_not_stored() {
        let mut catalog = MemoryCatalog::new(Vec::new()).fail_append_call(0);
        let id = catalog.create_playlist(&session(), "Flaky").unwrap();

        assert!(catalog.append_tracks(&session(), &id, &["a".into()]).is_err());
        assert!(catalog.append_tracks(&session(), &id, &["b".into()]).is_ok());

        assert_eq!(catalog.append_log().len(), 2);
        assert_eq!(catalog.playlist_tracks(&id), vec!["b".to_string()]);
    }

    #[test]
    fn test_created_playlists_record_owner() {
        let mut catalog = MemoryCatalog::new(Vec::new());
        catalog.create_playlist(&session(), "Mine").unwrap();
        let created = catalog.playlist_named("Mine").unwrap();
        assert_eq!(created.owner, "listener");
    }

    #[test]
    fn test_feature_lookup_limit_and_missing_uri() {
        let mut catalog = MemoryCatalog::new(Vec::new()).with_features("a", AudioFeatures::default());
        let too_many: Vec<String> = (0..51).map(|i| i.to_string()).collect();
        assert!(catalog.audio_features(&too_many).is_err());
        assert!(catalog.audio_features(&["missing".into()]).is_err());
        assert_eq!(catalog.audio_features(&["a".into()]).unwrap().len(), 1);
    }

    #[test]
    fn test_loads_snapshot_from_json() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{
                "saved_tracks": [{{"uri": "t:1", "added_at": "2021-03-10T00:00:00Z"}}],
                "top_tracks": {{"short_term": ["t:1"]}},
                "audio_features": {{"t:1": {{
                    "danceability": 0.5, "energy": 0.4, "loudness": -7.0,
                    "speechiness": 0.05, "acousticness": 0.1, "instrumentalness": 0.0,
                    "valence": 0.6, "tempo": 120.0, "mode": 1.0
                }}}}
            }}"#
        )?;

        let mut catalog = MemoryCatalog::from_json_file(file.path())?;
        let page = catalog.saved_tracks(&session(), None)?;
        assert_eq!(page.items.len(), 1);
        assert_eq!(catalog.top_tracks(&session(), Term::ShortTerm, 10)?, vec!["t:1"]);
        assert_eq!(catalog.audio_features(&["t:1".into()])?[0].tempo, 120.0);
        Ok(())
    }

    #[test]
    fn test_invalid_snapshot_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = MemoryCatalog::from_json_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid catalog snapshot"));
    }
}
