//! Similarity clustering of normalized feature vectors.
//!
//! K-means: assign each point to its nearest centroid (Euclidean), move each
//! centroid to the mean of its points, repeat until the centroids stop moving
//! or the iteration cap is hit. Seeding is k-means++ and the best of several
//! restarts (lowest inertia) is kept.
//!
//! Seeding is random, so two runs may label the same tracks differently.
//! Labels carry no meaning beyond grouping.
//!
//! ```text
//! inertia = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```

use crate::error::{EngineError, Result};
use crate::track::{FeatureVector, FEATURE_COUNT};
use log::{debug, trace};
use rand::Rng;

type Centroid = [f64; FEATURE_COUNT];

/// One label and the input positions assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub label: usize,
    /// Indices into the clustered input, ascending.
    pub members: Vec<usize>,
}

/// Outcome of a clustering run.
#[derive(Debug, Clone)]
pub struct Clustering {
    labels: Vec<usize>,
    k: usize,
    inertia: f64,
    iterations: usize,
}

impl Clustering {
    /// Label of every input vector, in input order. Each is in `0..k`.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Iterations used by the winning restart.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// All `k` clusters in label order. Empty clusters are included.
    pub fn clusters(&self) -> Vec<Cluster> {
        let mut clusters: Vec<Cluster> = (0..self.k)
            .map(|label| Cluster {
                label,
                members: Vec::new(),
            })
            .collect();
        for (index, &label) in self.labels.iter().enumerate() {
            clusters[label].members.push(index);
        }
        clusters
    }
}

#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iterations: usize,
    restarts: usize,
    tolerance: f64,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: 300,
            restarts: 10,
            tolerance: 1e-4,
        }
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    #[must_use]
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts.max(1);
        self
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Clusters `points` using the thread-local RNG for seeding.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidClusterCount`] when `k` is zero or larger than
    /// the number of points.
    pub fn fit(&self, points: &[FeatureVector]) -> Result<Clustering> {
        self.fit_with_rng(points, &mut rand::thread_rng())
    }

    /// Same as [`KMeans::fit`] with a caller-supplied RNG.
    ///
    /// # Errors
    ///
    /// See [`KMeans::fit`].
    pub fn fit_with_rng<R: Rng + ?Sized>(&self, points: &[FeatureVector], rng: &mut R) -> Result<Clustering> {
        if self.k == 0 || self.k > points.len() {
            return Err(EngineError::InvalidClusterCount {
                requested: self.k,
                available: points.len(),
            });
        }

        let mut best: Option<Clustering> = None;
        for restart in 0..self.restarts {
            let run = self.run_once(points, rng);
            trace!(
                "Restart {restart}: inertia {:.6} after {} iterations",
                run.inertia,
                run.iterations
            );
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }

        // `restarts` is at least one, so a run always exists.
        let best = best.ok_or_else(|| EngineError::InvalidConfig("no clustering restarts".into()))?;
        debug!(
            "Clustered {} tracks into {} groups (inertia {:.4})",
            points.len(),
            self.k,
            best.inertia
        );
        Ok(best)
    }

    fn run_once<R: Rng + ?Sized>(&self, points: &[FeatureVector], rng: &mut R) -> Clustering {
        let mut centroids = seed_centroids(points, self.k, rng);
        let mut labels = vec![0; points.len()];
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            assign(points, &centroids, &mut labels);

            let updated = recompute(points, &labels, &centroids);
            let shift: f64 = centroids
                .iter()
                .zip(updated.iter())
                .map(|(old, new)| squared_distance(old, new))
                .sum();
            centroids = updated;

            if shift <= self.tolerance * self.tolerance {
                break;
            }
        }

        let inertia = assign(points, &centroids, &mut labels);
        Clustering {
            labels,
            k: self.k,
            inertia,
            iterations,
        }
    }
}

/// k-means++ seeding: each new centroid is drawn with probability
/// proportional to its squared distance from the nearest chosen centroid.
fn seed_centroids<R: Rng + ?Sized>(points: &[FeatureVector], k: usize, rng: &mut R) -> Vec<Centroid> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].0);

    while centroids.len() < k {
        let distances: Vec<f64> = points
            .iter()
            .map(|p| nearest(&p.0, &centroids).1)
            .collect();
        let total: f64 = distances.iter().sum();

        let chosen = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            distances
                .iter()
                .position(|d| {
                    cumulative += d;
                    cumulative > target
                })
                .unwrap_or(points.len() - 1)
        } else {
            // Every point already coincides with a centroid.
            rng.gen_range(0..points.len())
        };
        centroids.push(points[chosen].0);
    }

    centroids
}

/// Writes the nearest centroid of every point into `labels` and returns the
/// total squared distance.
fn assign(points: &[FeatureVector], centroids: &[Centroid], labels: &mut [usize]) -> f64 {
    points
        .iter()
        .zip(labels.iter_mut())
        .map(|(point, label)| {
            let (index, distance) = nearest(&point.0, centroids);
            *label = index;
            distance
        })
        .sum()
}

/// Mean of each cluster's points. An empty cluster keeps its old centroid.
fn recompute(points: &[FeatureVector], labels: &[usize], previous: &[Centroid]) -> Vec<Centroid> {
    let mut sums = vec![[0.0; FEATURE_COUNT]; previous.len()];
    let mut counts = vec![0usize; previous.len()];

    for (point, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (sum, value) in sums[label].iter_mut().zip(point.0.iter()) {
            *sum += value;
        }
    }

    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), old)| {
            if count == 0 {
                *old
            } else {
                #[allow(clippy::cast_precision_loss)]
                let n = count as f64;
                sum.map(|s| s / n)
            }
        })
        .collect()
}

/// Index of the closest centroid and its squared distance. Ties go to the
/// lowest index.
fn nearest(point: &Centroid, centroids: &[Centroid]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best.1 {
            best = (index, distance);
        }
    }
    best
}

fn squared_distance(a: &Centroid, b: &Centroid) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
