use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::vehicle::{HORSEPOWER, PRICE, YEAR_OF_MAKING};

pub const NUMERIC_COLUMNS: [&str; 3] = [YEAR_OF_MAKING, PRICE, HORSEPOWER];
pub const MAKE_PREFIX: &str = "Make_";

/// Per-column min-max scaler. A degenerate column (max == min) keeps a range
/// of one so its values shift but never divide by zero. Transform never clamps.
#[derive(Clone, Debug, PartialEq)]
pub struct MinMaxScaler {
    min: [f64; 3],
    range: [f64; 3],
}

impl MinMaxScaler {
    pub fn fit(rows: &[[f64; 3]]) -> Self {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];

        for row in rows {
            for column in 0..3 {
                min[column] = min[column].min(row[column]);
                max[column] = max[column].max(row[column]);
            }
        }

        let mut range = [1.0; 3];
        for column in 0..3 {
            if !min[column].is_finite() {
                min[column] = 0.0;
                continue;
            }
            let width = max[column] - min[column];
            if width > 0.0 {
                range[column] = width;
            }
        }

        Self { min, range }
    }

    pub fn transform(&self, row: [f64; 3]) -> [f64; 3] {
        let mut scaled = [0.0; 3];
        for column in 0..3 {
            scaled[column] = (row[column] - self.min[column]) / self.range[column];
        }
        scaled
    }
}

/// Values substituted for optional attributes a query leaves out.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DefaultValues {
    pub price: f64,
    pub horsepower: f64,
}

impl DefaultValues {
    pub fn from_observations(prices: &[f64], horsepowers: &[f64]) -> Self {
        Self {
            price: median(prices).unwrap_or(0.0),
            horsepower: median(horsepowers).unwrap_or(0.0),
        }
    }
}

/// Median with the even-count case averaging the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let middle = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        Some((sorted[middle - 1] + sorted[middle]) / 2.0)
    } else {
        Some(sorted[middle])
    }
}

/// Column layout frozen at fit time: the three numeric columns followed by
/// one indicator per make, sorted.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureSchema {
    makes: Vec<String>,
}

impl FeatureSchema {
    pub fn from_makes<'a>(makes: impl IntoIterator<Item = &'a str>) -> Self {
        let makes: BTreeSet<&str> = makes.into_iter().collect();
        Self { makes: makes.into_iter().map(str::to_owned).collect() }
    }

    pub fn width(&self) -> usize {
        NUMERIC_COLUMNS.len() + self.makes.len()
    }

    /// Position of the indicator column for `make`, if it was seen at fit time.
    pub fn make_column(&self, make: &str) -> Option<usize> {
        self.makes
            .binary_search_by(|known| known.as_str().cmp(make))
            .ok()
            .map(|position| NUMERIC_COLUMNS.len() + position)
    }

    pub fn column_names(&self) -> Vec<String> {
        NUMERIC_COLUMNS
            .iter()
            .map(|column| (*column).to_owned())
            .chain(self.makes.iter().map(|make| format!("{MAKE_PREFIX}{make}")))
            .collect()
    }

    /// Dense feature row for already-scaled numeric values.
    pub fn encode(&self, scaled: [f64; 3], make: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.width()];
        row[..scaled.len()].copy_from_slice(&scaled);
        if let Some(column) = self.make_column(make) {
            row[column] = 1.0;
        }
        row
    }
}
