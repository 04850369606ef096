//! Reorganizes a listening history into new playlists.
//!
//! Core modules:
//! - [`normalizer`] - Min-max scaling of raw audio attributes
//! - [`cluster`] - K-means similarity clustering
//! - [`timeline`] - Half-year partitioning of saved tracks
//! - [`materializer`] - Batched playlist writes
//! - [`assembler`] - Strategy orchestration
//!
//! ### Supporting Modules
//!
//! - [`catalog`] - The external catalog boundary and an in-memory catalog
//! - [`strategy`] - Playlist planning per strategy
//! - [`timestamp`] - `added_at` parsing
//! - [`track`] - Shared records
//! - [`config`] - Engine settings and their location
//! - [`error`] - Error types
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use relisten::assembler::PlaylistAssembler;
//! use relisten::catalog::{MemoryCatalog, Session};
//! use relisten::config::{get_config_path, EngineConfig};
//! use relisten::track::Term;
//!
//! let config = EngineConfig::load_or_default(&get_config_path()?)?;
//! let mut catalog = MemoryCatalog::from_json_file("library.json".as_ref())?;
//! let mut assembler = PlaylistAssembler::new(&mut catalog, Session::new("listener"), config)?;
//!
//! // Four playlists of similar-sounding saved tracks
//! for playlist in assembler.cluster_playlists()? {
//!     println!("{}: {} tracks", playlist.name, playlist.report.tracks_written);
//! }
//!
//! // "First Half of 2020", "Second Half of 2020", ...
//! assembler.half_year_playlists()?;
//!
//! // Top-N playlists
//! for term in Term::ALL {
//!     assembler.top_tracks_playlist(term)?;
//! }
//! assembler.top_artists_playlist(Term::ShortTerm)?;
//! assembler.recommendation_playlist(Term::ShortTerm)?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Strategies
//!
//! ### Cluster
//! - Fetches every saved track and its nine audio attributes
//! - Scales each attribute to `[0, 1]` over the whole library
//! - Splits the library into `k` groups with k-means
//!
//! ### Half Year
//! - Buckets saved tracks into January–June and July–December windows
//! - Windows run contiguously from the first save to the latest one
//!
//! ### Top-N
//! - Top tracks, top artists' leading tracks, and recommendations seeded from top tracks
//!
//! ## Error Handling
//!
//! Engine operations return [`error::Result`]. Catalog failures are never
//! retried; they surface as [`error::EngineError::ExternalCallFailure`]. A
//! playlist whose batches only partly succeeded stays partially populated
//! and is reported as such.
//!
//! ## Logging
//!
//! The engine logs through the `log` facade. In tests, run with
//! `RUST_LOG=relisten=debug` to see per-batch and per-strategy output.

pub mod assembler;
pub mod catalog;
pub mod cluster;
pub mod config;
pub mod error;
pub mod materializer;
pub mod normalizer;
pub mod strategy;
pub mod timeline;
pub mod timestamp;
pub mod track;
