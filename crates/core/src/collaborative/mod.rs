//! Item-to-item collaborative filtering over the trained item-user matrix.

pub mod artifact;
pub mod index;
pub mod sparse;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

pub use artifact::{ArtifactFormat, NearestNeighborsModel, TrainedArtifact};
pub use index::{BruteForceIndex, DistanceMetric, Neighbor, NeighborIndex};
pub use sparse::{CsrMatrix, SparseRow};

use crate::errors::ArtifactError;

pub struct CollaborativeEngine {
    matrix: Arc<CsrMatrix>,
    index: Box<dyn NeighborIndex>,
    item_to_row: HashMap<String, usize>,
    row_to_item: HashMap<usize, String>,
}

impl CollaborativeEngine {
    /// Builds the engine from a validated artifact with a brute-force index
    /// using the artifact's fitted metric.
    pub fn from_artifact(artifact: TrainedArtifact) -> Result<Self, ArtifactError> {
        artifact.validate()?;

        let matrix = Arc::new(artifact.item_user_matrix);
        let index = BruteForceIndex::new(Arc::clone(&matrix), artifact.model.metric);

        Ok(Self {
            matrix,
            index: Box::new(index),
            item_to_row: artifact.item_to_row,
            row_to_item: artifact.row_to_item,
        })
    }

    /// Plugs in any conformant index over `matrix`.
    pub fn with_index(
        matrix: Arc<CsrMatrix>,
        index: Box<dyn NeighborIndex>,
        item_to_row: HashMap<String, usize>,
        row_to_item: HashMap<usize, String>,
    ) -> Self {
        Self { matrix, index, item_to_row, row_to_item }
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.item_to_row.contains_key(item_id)
    }

    pub fn item_count(&self) -> usize {
        self.matrix.n_rows
    }

    pub fn user_count(&self) -> usize {
        self.matrix.n_cols
    }

    /// Returns up to `k` most similar items, closest first, never including
    /// `item_id` itself. `None` means the item is unknown to the model.
    pub fn recommend(&self, item_id: &str, k: usize) -> Option<Vec<String>> {
        let &row = self.item_to_row.get(item_id)?;
        if k == 0 {
            return Some(Vec::new());
        }

        let Some(query) = self.matrix.row(row) else {
            warn!(
                event_name = "recommender.collaborative.missing_row",
                item_id = %item_id,
                row = row,
                "item maps to a row outside the matrix"
            );
            return Some(Vec::new());
        };

        let recommendations = self
            .index
            .kneighbors(query, k.saturating_add(1))
            .into_iter()
            .filter(|neighbor| neighbor.row != row)
            .filter_map(|neighbor| self.row_to_item.get(&neighbor.row).cloned())
            .take(k)
            .collect();

        Some(recommendations)
    }
}
