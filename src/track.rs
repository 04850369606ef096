//! Core records shared by every strategy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of audio attributes used for similarity.
pub const FEATURE_COUNT: usize = 9;

/// A saved track as the catalog reports it.
/// Identified by `uri`; never mutated after it is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    pub uri: String,
    /// Raw timestamp of when the track was saved, e.g. `2021-03-10T18:22:01Z`.
    pub added_at: String,
}

impl Track {
    pub fn new(uri: impl Into<String>, added_at: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            added_at: added_at.into(),
        }
    }
}

/// One dimension of the similarity space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Danceability,
    Energy,
    Loudness,
    Speechiness,
    Acousticness,
    Instrumentalness,
    Valence,
    Tempo,
    Mode,
}

impl Feature {
    /// All dimensions, in vector order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Danceability,
        Feature::Energy,
        Feature::Loudness,
        Feature::Speechiness,
        Feature::Acousticness,
        Feature::Instrumentalness,
        Feature::Valence,
        Feature::Tempo,
        Feature::Mode,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Feature::Danceability => "danceability",
            Feature::Energy => "energy",
            Feature::Loudness => "loudness",
            Feature::Speechiness => "speechiness",
            Feature::Acousticness => "acousticness",
            Feature::Instrumentalness => "instrumentalness",
            Feature::Valence => "valence",
            Feature::Tempo => "tempo",
            Feature::Mode => "mode",
        }
    }
}

/// Raw audio attributes as returned by the feature lookup.
///
/// Units differ wildly (loudness in dB, tempo in BPM, mode is 0/1), which is
/// why they are min-max scaled before any distance is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub danceability: f64,
    pub energy: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub mode: f64,
}

impl AudioFeatures {
    /// Attributes in [`Feature::ALL`] order.
    #[must_use]
    pub fn to_row(&self) -> [f64; FEATURE_COUNT] {
        [
            self.danceability,
            self.energy,
            self.loudness,
            self.speechiness,
            self.acousticness,
            self.instrumentalness,
            self.valence,
            self.tempo,
            self.mode,
        ]
    }
}

/// Scaled attributes of one track, every component in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }
}

/// Listening period for top-N queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl Term {
    pub const ALL: [Term; 3] = [Term::ShortTerm, Term::MediumTerm, Term::LongTerm];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Term::ShortTerm => "short_term",
            Term::MediumTerm => "medium_term",
            Term::LongTerm => "long_term",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, ordered list of track uris waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRequest {
    pub name: String,
    pub tracks: Vec<String>,
}

impl PlaylistRequest {
    pub fn new(name: impl Into<String>, tracks: Vec<String>) -> Self {
        Self {
            name: name.into(),
            tracks,
        }
    }
}
