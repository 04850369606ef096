//! # Playlist Assembly
//!
//! [`PlaylistAssembler`] is the entry point of the engine. It owns the
//! session and settings, borrows a [`CatalogClient`], lets a
//! [`PlaylistStrategy`] plan the playlists and then writes each one through
//! the [`BatchMaterializer`].
//!
//! Playlists are written one after another. The first playlist that cannot
//! be created, or ends up only partially populated, stops the run with an
//! [`EngineError::ExternalCallFailure`]; playlists written before it stay.
//!
//! ```no_run
//! use relisten::assembler::PlaylistAssembler;
//! use relisten::catalog::{MemoryCatalog, Session};
//! use relisten::config::EngineConfig;
//! use relisten::track::Term;
//!
//! let mut catalog = MemoryCatalog::from_json_file("library.json".as_ref())?;
//! let mut assembler = PlaylistAssembler::new(&mut catalog, Session::new("me"), EngineConfig::default())?;
//!
//! assembler.cluster_playlists()?;
//! assembler.half_year_playlists()?;
//! assembler.top_tracks_playlist(Term::ShortTerm)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::catalog::{CatalogClient, Session};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::materializer::{BatchMaterializer, MaterializedPlaylist};
use crate::strategy::{
    ClusterStrategy, HalfYearStrategy, PlanContext, PlaylistStrategy, RecommendationStrategy,
    TopArtistsStrategy, TopTracksStrategy,
};
use crate::track::Term;
use chrono::NaiveDate;
use log::info;

pub struct PlaylistAssembler<'a, C: CatalogClient> {
    catalog: &'a mut C,
    session: Session,
    config: EngineConfig,
    materializer: BatchMaterializer,
    today: NaiveDate,
}

impl<'a, C: CatalogClient> PlaylistAssembler<'a, C> {
    /// # Errors
    ///
    /// [`EngineError::InvalidConfig`](crate::error::EngineError::InvalidConfig)
    /// when `config` does not validate.
    pub fn new(catalog: &'a mut C, session: Session, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let materializer = config.materializer()?;
        Ok(Self {
            catalog,
            session,
            config,
            materializer,
            today: chrono::Local::now().date_naive(),
        })
    }

    /// Overrides the date used in dated playlist names.
    #[must_use]
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Plans with `strategy` and writes every planned playlist.
    ///
    /// # Errors
    ///
    /// Planning errors, a failed `create_playlist`, or a playlist left
    /// partially populated.
    pub fn run(&mut self, strategy: &dyn PlaylistStrategy) -> Result<Vec<MaterializedPlaylist>> {
        info!("Running {} strategy", strategy.name());
        let context = PlanContext {
            session: &self.session,
            config: &self.config,
            today: self.today,
        };
        let requests = strategy.plan(&mut *self.catalog, &context)?;

        let mut playlists = Vec::with_capacity(requests.len());
        for request in &requests {
            let playlist = self
                .materializer
                .materialize(&mut *self.catalog, &self.session, request)?
                .into_complete()?;
            playlists.push(playlist);
        }

        info!(
            "{} strategy wrote {} playlists",
            strategy.name(),
            playlists.len()
        );
        Ok(playlists)
    }

    /// One playlist per similarity cluster, using the configured count.
    ///
    /// # Errors
    ///
    /// See [`PlaylistAssembler::run`]; also
    /// [`EngineError::InvalidClusterCount`](crate::error::EngineError::InvalidClusterCount)
    /// when the library holds fewer tracks than clusters.
    pub fn cluster_playlists(&mut self) -> Result<Vec<MaterializedPlaylist>> {
        let k = self.config.cluster_count;
        self.cluster_playlists_with(k)
    }

    /// # Errors
    ///
    /// See [`PlaylistAssembler::cluster_playlists`].
    pub fn cluster_playlists_with(&mut self, k: usize) -> Result<Vec<MaterializedPlaylist>> {
        self.run(&ClusterStrategy { k })
    }

    /// One playlist per half year of saved tracks.
    ///
    /// # Errors
    ///
    /// See [`PlaylistAssembler::run`]; also malformed or out-of-order save dates.
    pub fn half_year_playlists(&mut self) -> Result<Vec<MaterializedPlaylist>> {
        self.run(&HalfYearStrategy)
    }

    /// # Errors
    ///
    /// See [`PlaylistAssembler::run`].
    pub fn top_tracks_playlist(&mut self, term: Term) -> Result<MaterializedPlaylist> {
        single(self.run(&TopTracksStrategy { term })?)
    }

    /// # Errors
    ///
    /// See [`PlaylistAssembler::run`].
    pub fn top_artists_playlist(&mut self, term: Term) -> Result<MaterializedPlaylist> {
        single(self.run(&TopArtistsStrategy { term })?)
    }

    /// # Errors
    ///
    /// See [`PlaylistAssembler::run`]; also
    /// [`EngineError::InsufficientData`](crate::error::EngineError::InsufficientData)
    /// when the term has too few top tracks to seed from.
    pub fn recommendation_playlist(&mut self, term: Term) -> Result<MaterializedPlaylist> {
        single(self.run(&RecommendationStrategy { term })?)
    }
}

/// The one playlist a top-N strategy writes.
fn single(mut playlists: Vec<MaterializedPlaylist>) -> Result<MaterializedPlaylist> {
    playlists.pop().ok_or(EngineError::InsufficientData {
        operation: "playlist planning",
        required: 1,
        available: 0,
    })
}
