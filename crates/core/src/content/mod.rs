//! Content-based similarity over inventory attributes.
//!
//! Numeric attributes are min-max scaled with state frozen at fit time, makes
//! are one-hot encoded against the fitted schema, and every row is stored
//! L2-normalized so cosine similarity reduces to one matrix-vector product.

pub mod features;
pub mod inventory;

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use ndarray::{Array1, Array2};
use tracing::info;

pub use features::{median, DefaultValues, FeatureSchema, MinMaxScaler};
pub use inventory::{load_inventory, parse_inventory};

use crate::domain::vehicle::{InventoryRecord, VehicleAttributes};
use crate::errors::InventoryError;

pub const DEFAULT_CANDIDATE_OVERSAMPLE: usize = 5;

pub struct ContentEngine {
    item_ids: Vec<String>,
    matrix: Array2<f32>,
    scaler: MinMaxScaler,
    defaults: DefaultValues,
    schema: FeatureSchema,
    oversample: usize,
}

impl ContentEngine {
    pub fn load(path: &Path, oversample: usize) -> Result<Self, InventoryError> {
        let records = load_inventory(path)?;
        Self::fit(&records, oversample)
    }

    /// Fits scaler, defaults and make schema on `records` and builds the
    /// normalized feature matrix in snapshot order.
    pub fn fit(records: &[InventoryRecord], oversample: usize) -> Result<Self, InventoryError> {
        if records.is_empty() {
            return Err(InventoryError::Empty);
        }

        let prices: Vec<f64> = records.iter().filter_map(|record| record.price).collect();
        let horsepowers: Vec<f64> = records.iter().filter_map(|record| record.horsepower).collect();
        let defaults = DefaultValues::from_observations(&prices, &horsepowers);

        let numeric: Vec<[f64; 3]> = records
            .iter()
            .map(|record| {
                [
                    f64::from(record.year_of_making),
                    record.price.unwrap_or(defaults.price),
                    record.horsepower.unwrap_or(defaults.horsepower),
                ]
            })
            .collect();
        let scaler = MinMaxScaler::fit(&numeric);
        let schema = FeatureSchema::from_makes(records.iter().map(|record| record.make.as_str()));

        let mut matrix = Array2::<f32>::zeros((records.len(), schema.width()));
        for (row, (record, values)) in records.iter().zip(&numeric).enumerate() {
            let encoded = unit_vector(schema.encode(scaler.transform(*values), &record.make));
            matrix.row_mut(row).assign(&encoded);
        }

        let engine = Self {
            item_ids: records.iter().map(InventoryRecord::item_id).collect(),
            matrix,
            scaler,
            defaults,
            schema,
            oversample: oversample.max(1),
        };

        info!(
            event_name = "recommender.content.fitted",
            correlation_id = "bootstrap",
            rows = engine.rows(),
            columns = engine.schema.width(),
            default_price = engine.defaults.price,
            default_horsepower = engine.defaults.horsepower,
            "content feature matrix built"
        );

        Ok(engine)
    }

    pub fn rows(&self) -> usize {
        self.item_ids.len()
    }

    pub fn columns(&self) -> Vec<String> {
        self.schema.column_names()
    }

    pub fn defaults(&self) -> DefaultValues {
        self.defaults
    }

    /// Up to `k` distinct inventory ids ordered by descending similarity,
    /// excluding the query's own derived id.
    pub fn recommend(&self, attributes: &VehicleAttributes, k: usize) -> Vec<String> {
        if k == 0 || self.rows() == 0 {
            return Vec::new();
        }

        let similarities = self.matrix.dot(&self.query_vector(attributes));
        let own_id = attributes.item_id();

        let pool = k.saturating_mul(self.oversample).min(self.rows());
        let recommendations = self.collect_unique(&rank(&similarities, pool), &own_id, k);
        if recommendations.len() >= k || pool == self.rows() {
            return recommendations;
        }

        self.collect_unique(&rank(&similarities, self.rows()), &own_id, k)
    }

    fn query_vector(&self, attributes: &VehicleAttributes) -> Array1<f32> {
        let values = [
            f64::from(attributes.year_of_making),
            attributes.price.unwrap_or(self.defaults.price),
            attributes.horsepower.unwrap_or(self.defaults.horsepower),
        ];
        unit_vector(self.schema.encode(self.scaler.transform(values), attributes.make.trim()))
    }

    fn collect_unique(&self, ranked: &[usize], own_id: &str, k: usize) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut recommendations = Vec::with_capacity(k);

        for &row in ranked {
            let item_id = self.item_ids[row].as_str();
            if item_id == own_id || !seen.insert(item_id) {
                continue;
            }
            recommendations.push(item_id.to_owned());
            if recommendations.len() == k {
                break;
            }
        }

        recommendations
    }
}

/// L2-normalizes in `f64` and narrows afterwards. Components are divided by the
/// largest magnitude first so the sum of squares cannot overflow.
fn unit_vector(row: Vec<f64>) -> Array1<f32> {
    let scale = row.iter().fold(0.0_f64, |largest, value| largest.max(value.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return row.into_iter().map(|value| value as f32).collect();
    }

    let norm = row.iter().map(|value| (value / scale).powi(2)).sum::<f64>().sqrt() * scale;
    row.into_iter().map(|value| (value / norm) as f32).collect()
}

/// Top `count` rows by descending similarity, ties by ascending row.
fn rank(similarities: &Array1<f32>, count: usize) -> Vec<usize> {
    let most_similar = |left: &usize, right: &usize| -> Ordering {
        similarities[*right].total_cmp(&similarities[*left]).then_with(|| left.cmp(right))
    };

    let mut rows: Vec<usize> = (0..similarities.len()).collect();
    let count = count.min(rows.len());
    if count == 0 {
        return Vec::new();
    }
    if count < rows.len() {
        rows.select_nth_unstable_by(count - 1, most_similar);
        rows.truncate(count);
    }
    rows.sort_by(most_similar);
    rows
}
