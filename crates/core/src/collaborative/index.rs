use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::sparse::{CsrMatrix, SparseRow};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

/// A fitted k-nearest-neighbor index over the rows of the item-user matrix.
///
/// Results are ordered closest first. Implementations must be deterministic
/// for a given query.
pub trait NeighborIndex: Send + Sync {
    fn kneighbors(&self, query: SparseRow<'_>, n_neighbors: usize) -> Vec<Neighbor>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exhaustive scan over every row. Ties are broken by ascending row index.
pub struct BruteForceIndex {
    matrix: Arc<CsrMatrix>,
    metric: DistanceMetric,
    norms: Vec<f32>,
}

impl BruteForceIndex {
    pub fn new(matrix: Arc<CsrMatrix>, metric: DistanceMetric) -> Self {
        let norms = matrix.rows().map(|row| row.squared_norm().sqrt()).collect();
        Self { matrix, metric, norms }
    }

    fn distance(&self, query: &SparseRow<'_>, query_norm: f32, row: usize) -> f32 {
        let Some(candidate) = self.matrix.row(row) else {
            return f32::INFINITY;
        };
        let candidate_norm = self.norms.get(row).copied().unwrap_or(0.0);
        let dot = query.dot(&candidate);

        match self.metric {
            DistanceMetric::Cosine => {
                if query_norm == 0.0 || candidate_norm == 0.0 {
                    1.0
                } else {
                    1.0 - dot / (query_norm * candidate_norm)
                }
            }
            DistanceMetric::Euclidean => {
                let squared = query_norm * query_norm + candidate_norm * candidate_norm - 2.0 * dot;
                squared.max(0.0).sqrt()
            }
        }
    }
}

impl NeighborIndex for BruteForceIndex {
    fn kneighbors(&self, query: SparseRow<'_>, n_neighbors: usize) -> Vec<Neighbor> {
        let query_norm = query.squared_norm().sqrt();
        let mut neighbors: Vec<Neighbor> = (0..self.matrix.n_rows)
            .map(|row| Neighbor { row, distance: self.distance(&query, query_norm, row) })
            .collect();

        let n_neighbors = n_neighbors.min(neighbors.len());
        if n_neighbors == 0 {
            return Vec::new();
        }
        if n_neighbors < neighbors.len() {
            neighbors.select_nth_unstable_by(n_neighbors - 1, closest_first);
            neighbors.truncate(n_neighbors);
        }
        neighbors.sort_by(closest_first);
        neighbors
    }

    fn len(&self) -> usize {
        self.matrix.n_rows
    }
}

fn closest_first(left: &Neighbor, right: &Neighbor) -> Ordering {
    left.distance.total_cmp(&right.distance).then_with(|| left.row.cmp(&right.row))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{BruteForceIndex, DistanceMetric, NeighborIndex};
    use crate::collaborative::sparse::CsrMatrix;

    fn matrix() -> Arc<CsrMatrix> {
        Arc::new(CsrMatrix::from_dense(&[
            vec![1.0, 1.0, 0.0, 0.0],
            vec![1.0, 1.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 1.0],
            vec![2.0, 2.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ]))
    }

    #[test]
    fn cosine_ranks_parallel_rows_first_and_breaks_ties_by_row() {
        let matrix = matrix();
        let index = BruteForceIndex::new(Arc::clone(&matrix), DistanceMetric::Cosine);
        let query = matrix.row(0).expect("row 0");

        let neighbors = index.kneighbors(query, 3);
        let mut parallel = vec![neighbors[0].row, neighbors[1].row];
        parallel.sort_unstable();

        assert_eq!(parallel, vec![0, 3]);
        assert_eq!(neighbors[2].row, 1);
        assert!(neighbors[0].distance.abs() < 1e-6);
        assert!(neighbors[1].distance.abs() < 1e-6);
    }

    #[test]
    fn exact_ties_resolve_to_the_lower_row() {
        let matrix = Arc::new(CsrMatrix::from_dense(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        ]));
        let index = BruteForceIndex::new(Arc::clone(&matrix), DistanceMetric::Cosine);
        let query = matrix.row(0).expect("row 0");

        let rows: Vec<usize> =
            index.kneighbors(query, 3).iter().map(|neighbor| neighbor.row).collect();

        assert_eq!(rows, vec![0, 1, 2]);
    }

    #[test]
    fn zero_rows_sit_at_cosine_distance_one() {
        let matrix = matrix();
        let index = BruteForceIndex::new(Arc::clone(&matrix), DistanceMetric::Cosine);
        let query = matrix.row(0).expect("row 0");

        let neighbors = index.kneighbors(query, 5);
        let zero_row = neighbors.iter().find(|neighbor| neighbor.row == 4).expect("row 4");

        assert_eq!(zero_row.distance, 1.0);
    }

    #[test]
    fn euclidean_prefers_magnitude_close_rows() {
        let matrix = matrix();
        let index = BruteForceIndex::new(Arc::clone(&matrix), DistanceMetric::Euclidean);
        let query = matrix.row(0).expect("row 0");

        let rows: Vec<usize> =
            index.kneighbors(query, 2).iter().map(|neighbor| neighbor.row).collect();

        assert_eq!(rows, vec![0, 1]);
    }

    #[test]
    fn requesting_more_neighbors_than_rows_returns_every_row() {
        let matrix = matrix();
        let index = BruteForceIndex::new(Arc::clone(&matrix), DistanceMetric::Cosine);
        let query = matrix.row(2).expect("row 2");

        assert_eq!(index.kneighbors(query, 50).len(), 5);
        assert!(index.kneighbors(query, 0).is_empty());
        assert_eq!(index.len(), 5);
    }
}
