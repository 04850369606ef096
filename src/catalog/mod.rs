//! # Catalog Boundary
//!
//! Everything the engine needs from the music service goes through
//! [`CatalogClient`]. Implementations own transport, authentication and rate
//! limiting; the engine only sees blocking calls that either succeed or
//! return a [`CatalogError`].
//!
//! The user identity lives in an explicit [`Session`] handed to every call
//! that touches a user's library, instead of being held inside the client.
//!
//! ## Call size limits
//!
//! | Call                  | Limit                  |
//! |-----------------------|------------------------|
//! | `audio_features`      | [`MAX_FEATURE_LOOKUP`] |
//! | `append_tracks`       | [`MAX_APPEND_BATCH`]   |
//! | `recommendations`     | [`RECOMMENDATION_SEEDS`] seeds |

use crate::error::CatalogError;
use crate::track::{AudioFeatures, Term, Track};
use log::debug;

pub mod memory;

pub use memory::MemoryCatalog;

/// Most uris a single feature lookup accepts.
pub const MAX_FEATURE_LOOKUP: usize = 50;
/// Most uris a single playlist append accepts.
pub const MAX_APPEND_BATCH: usize = 100;
/// Seeds per recommendation query.
pub const RECOMMENDATION_SEEDS: usize = 5;

/// Identity of the user whose library is being read and written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Opaque identifier returned by `create_playlist`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaylistId(pub String);

impl std::fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation for the following page, `None` on the last one.
    pub next: Option<String>,
}

/// The external music catalog.
///
/// All calls block until the service answers. Nothing here retries; a failed
/// call is reported once and the engine propagates it.
pub trait CatalogClient {
    /// One page of saved tracks, most recently saved first. `cursor` is the
    /// `next` value of the previous page, `None` for the first page.
    fn saved_tracks(
        &mut self,
        session: &Session,
        cursor: Option<&str>,
    ) -> Result<Page<Track>, CatalogError>;

    /// Raw attributes for at most [`MAX_FEATURE_LOOKUP`] uris, one record per
    /// uri in the same order.
    fn audio_features(&mut self, uris: &[String]) -> Result<Vec<AudioFeatures>, CatalogError>;

    fn create_playlist(&mut self, session: &Session, name: &str) -> Result<PlaylistId, CatalogError>;

    /// Appends at most [`MAX_APPEND_BATCH`] uris to the end of a playlist.
    fn append_tracks(
        &mut self,
        session: &Session,
        playlist: &PlaylistId,
        uris: &[String],
    ) -> Result<(), CatalogError>;

    /// The user's most played tracks for `term`, best first.
    fn top_tracks(
        &mut self,
        session: &Session,
        term: Term,
        limit: usize,
    ) -> Result<Vec<String>, CatalogError>;

    /// The user's most played artists for `term`, best first.
    fn top_artists(
        &mut self,
        session: &Session,
        term: Term,
        limit: usize,
    ) -> Result<Vec<String>, CatalogError>;

    fn artist_top_tracks(&mut self, artist: &str) -> Result<Vec<String>, CatalogError>;

    /// Tracks recommended from [`RECOMMENDATION_SEEDS`] seed tracks.
    fn recommendations(&mut self, seeds: &[String]) -> Result<Vec<String>, CatalogError>;
}

/// Follows `next` cursors until the saved library is exhausted.
///
/// # Errors
///
/// Returns the first page failure; pages read before it are discarded.
pub fn drain_saved_tracks<C: CatalogClient + ?Sized>(
    catalog: &mut C,
    session: &Session,
) -> Result<Vec<Track>, CatalogError> {
    let mut page = catalog.saved_tracks(session, None)?;
    let mut tracks = std::mem::take(&mut page.items);
    let mut pages = 1usize;

    while let Some(cursor) = page.next.take() {
        page = catalog.saved_tracks(session, Some(&cursor))?;
        tracks.append(&mut page.items);
        pages += 1;
    }

    debug!("Read {} saved tracks over {} pages", tracks.len(), pages);
    Ok(tracks)
}
