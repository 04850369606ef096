//! # Playlist Strategies
//!
//! A strategy reads what it needs from the catalog and plans the playlists
//! to create as [`PlaylistRequest`]s. Planning never writes; the
//! [`PlaylistAssembler`](crate::assembler::PlaylistAssembler) materializes
//! the plan afterwards.
//!
//! | Strategy                 | Playlists                           | Name |
//! |--------------------------|-------------------------------------|------|
//! | [`ClusterStrategy`]      | one per similarity cluster          | `Saved Tracks Cluster Playlist <label>` |
//! | [`HalfYearStrategy`]     | one per half year of saves          | `First Half of <year>` / `Second Half of <year>` |
//! | [`TopTracksStrategy`]    | one                                 | `Top Tracks <date> <term>` |
//! | [`TopArtistsStrategy`]   | one                                 | `Top Artists Track List <date>` |
//! | [`RecommendationStrategy`] | one                               | `Recommendation for <term> <date>` |

use crate::catalog::{drain_saved_tracks, CatalogClient, Session};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::track::{PlaylistRequest, Term};
use chrono::NaiveDate;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

/// Inputs every strategy plans against.
#[derive(Debug, Clone)]
pub struct PlanContext<'a> {
    pub session: &'a Session,
    pub config: &'a EngineConfig,
    /// Date embedded in dated playlist names.
    pub today: NaiveDate,
}

pub trait PlaylistStrategy {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Plans the playlists this strategy produces, in creation order.
    ///
    /// # Errors
    ///
    /// Catalog failures and any typed failure of the pure steps.
    fn plan(&self, catalog: &mut dyn CatalogClient, context: &PlanContext<'_>) -> Result<Vec<PlaylistRequest>>;
}

/// Groups saved tracks by audio similarity.
#[derive(Debug, Clone, Copy)]
pub struct ClusterStrategy {
    pub k: usize,
}

impl PlaylistStrategy for ClusterStrategy {
    fn name(&self) -> &'static str {
        "cluster"
    }

    fn plan(&self, catalog: &mut dyn CatalogClient, context: &PlanContext<'_>) -> Result<Vec<PlaylistRequest>> {
        let tracks = drain_saved_tracks(catalog, context.session)?;
        if self.k == 0 || self.k > tracks.len() {
            return Err(EngineError::InvalidClusterCount {
                requested: self.k,
                available: tracks.len(),
            });
        }

        let vectors = context
            .config
            .normalizer()?
            .normalize(&tracks, |uris| catalog.audio_features(uris))?;
        let clustering = context.config.kmeans(self.k).fit(&vectors)?;

        Ok(clustering
            .clusters()
            .into_iter()
            .map(|cluster| {
                debug!("Cluster {} holds {} tracks", cluster.label, cluster.members.len());
                PlaylistRequest::new(
                    format!("Saved Tracks Cluster Playlist {}", cluster.label),
                    cluster.members.iter().map(|&i| tracks[i].uri.clone()).collect(),
                )
            })
            .collect())
    }
}

/// Groups saved tracks by the half year they were saved in.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalfYearStrategy;

impl PlaylistStrategy for HalfYearStrategy {
    fn name(&self) -> &'static str {
        "half-year"
    }

    fn plan(&self, catalog: &mut dyn CatalogClient, context: &PlanContext<'_>) -> Result<Vec<PlaylistRequest>> {
        let tracks = drain_saved_tracks(catalog, context.session)?;
        let windows = context.config.partitioner().partition(&tracks)?;

        Ok(windows
            .into_iter()
            .map(|window| PlaylistRequest::new(window.period.to_string(), window.tracks))
            .collect())
    }
}

/// The user's most played tracks for a term.
#[derive(Debug, Clone, Copy)]
pub struct TopTracksStrategy {
    pub term: Term,
}

impl PlaylistStrategy for TopTracksStrategy {
    fn name(&self) -> &'static str {
        "top-tracks"
    }

    fn plan(&self, catalog: &mut dyn CatalogClient, context: &PlanContext<'_>) -> Result<Vec<PlaylistRequest>> {
        let tracks = catalog.top_tracks(context.session, self.term, context.config.top_track_limit)?;
        Ok(vec![PlaylistRequest::new(
            format!("Top Tracks {} {}", context.today, self.term),
            tracks,
        )])
    }
}

/// The leading tracks of the user's most played artists.
#[derive(Debug, Clone, Copy)]
pub struct TopArtistsStrategy {
    pub term: Term,
}

impl PlaylistStrategy for TopArtistsStrategy {
    fn name(&self) -> &'static str {
        "top-artists"
    }

    fn plan(&self, catalog: &mut dyn CatalogClient, context: &PlanContext<'_>) -> Result<Vec<PlaylistRequest>> {
        let artists = catalog.top_artists(context.session, self.term, context.config.top_artist_limit)?;

        let mut tracks = Vec::new();
        for artist in &artists {
            let top = catalog.artist_top_tracks(artist)?;
            tracks.extend(top.into_iter().take(context.config.tracks_per_artist));
        }
        debug!("{} tracks from {} artists", tracks.len(), artists.len());

        Ok(vec![PlaylistRequest::new(
            format!("Top Artists Track List {}", context.today),
            tracks,
        )])
    }
}

/// Recommendations seeded from random picks of the user's top tracks.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationStrategy {
    pub term: Term,
}

impl PlaylistStrategy for RecommendationStrategy {
    fn name(&self) -> &'static str {
        "recommendation"
    }

    fn plan(&self, catalog: &mut dyn CatalogClient, context: &PlanContext<'_>) -> Result<Vec<PlaylistRequest>> {
        self.plan_with_rng(catalog, context, &mut rand::thread_rng())
    }
}

impl RecommendationStrategy {
    /// Same as [`PlaylistStrategy::plan`] with a caller-supplied RNG for
    /// seed sampling.
    ///
    /// # Errors
    ///
    /// [`EngineError::InsufficientData`] when the term has fewer top tracks
    /// than seeds per round, and any catalog failure.
    pub fn plan_with_rng<R: Rng + ?Sized>(
        &self,
        catalog: &mut dyn CatalogClient,
        context: &PlanContext<'_>,
        rng: &mut R,
    ) -> Result<Vec<PlaylistRequest>> {
        let config = context.config;
        let pool = catalog.top_tracks(context.session, self.term, config.top_track_limit)?;
        if pool.len() < config.recommendation_seed_count {
            return Err(EngineError::InsufficientData {
                operation: "recommendation seeding",
                required: config.recommendation_seed_count,
                available: pool.len(),
            });
        }

        let mut tracks = Vec::new();
        for round in 0..config.recommendation_rounds {
            let seeds: Vec<String> = pool
                .choose_multiple(&mut *rng, config.recommendation_seed_count)
                .cloned()
                .collect();
            let recommended = catalog.recommendations(&seeds)?;
            debug!("Round {round}: {} recommendations", recommended.len());
            tracks.extend(recommended);
        }
        info!(
            "Collected {} recommendations over {} rounds",
            tracks.len(),
            config.recommendation_rounds
        );

        Ok(vec![PlaylistRequest::new(
            format!("Recommendation for {} {}", self.term, context.today),
            tracks,
        )])
    }
}
