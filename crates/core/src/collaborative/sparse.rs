use serde::{Deserialize, Serialize};

/// Compressed sparse row matrix, the layout the training pipeline exports the
/// item-by-user interaction matrix in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    pub n_rows: usize,
    pub n_cols: usize,
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<f32>,
}

/// Borrowed view of one matrix row. Column indices are strictly increasing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SparseRow<'a> {
    pub indices: &'a [usize],
    pub values: &'a [f32],
}

impl CsrMatrix {
    pub fn from_dense(rows: &[Vec<f32>]) -> Self {
        let n_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut indptr = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();

        indptr.push(0);
        for row in rows {
            for (column, &value) in row.iter().enumerate() {
                if value != 0.0 {
                    indices.push(column);
                    data.push(value);
                }
            }
            indptr.push(indices.len());
        }

        Self { n_rows: rows.len(), n_cols, indptr, indices, data }
    }

    pub fn row(&self, row: usize) -> Option<SparseRow<'_>> {
        if row >= self.n_rows {
            return None;
        }
        let start = *self.indptr.get(row)?;
        let end = *self.indptr.get(row + 1)?;
        Some(SparseRow { indices: self.indices.get(start..end)?, values: self.data.get(start..end)? })
    }

    pub fn rows(&self) -> impl Iterator<Item = SparseRow<'_>> + '_ {
        (0..self.n_rows).filter_map(move |row| self.row(row))
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Checks the structural invariants of the CSR layout.
    pub fn validate(&self) -> Result<(), String> {
        if self.indptr.len() != self.n_rows + 1 {
            return Err(format!(
                "indptr has {} entries, expected {}",
                self.indptr.len(),
                self.n_rows + 1
            ));
        }
        if self.indptr.first() != Some(&0) {
            return Err("indptr must start at 0".to_owned());
        }
        if self.indices.len() != self.data.len() {
            return Err(format!(
                "indices ({}) and data ({}) lengths differ",
                self.indices.len(),
                self.data.len()
            ));
        }
        if self.indptr.last() != Some(&self.indices.len()) {
            return Err("indptr must end at the number of stored values".to_owned());
        }
        if self.indptr.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err("indptr must be non-decreasing".to_owned());
        }
        if self.data.iter().any(|value| !value.is_finite()) {
            return Err("matrix contains non-finite values".to_owned());
        }

        for (row_index, row) in self.rows().enumerate() {
            if row.indices.iter().any(|&column| column >= self.n_cols) {
                return Err(format!("row {row_index} references a column out of range"));
            }
            if row.indices.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(format!("row {row_index} column indices are not strictly increasing"));
            }
        }

        Ok(())
    }
}

impl SparseRow<'_> {
    pub fn dot(&self, other: &SparseRow<'_>) -> f32 {
        let (mut left, mut right) = (0, 0);
        let mut sum = 0.0;

        while left < self.indices.len() && right < other.indices.len() {
            match self.indices[left].cmp(&other.indices[right]) {
                std::cmp::Ordering::Less => left += 1,
                std::cmp::Ordering::Greater => right += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[left] * other.values[right];
                    left += 1;
                    right += 1;
                }
            }
        }

        sum
    }

    pub fn squared_norm(&self) -> f32 {
        self.values.iter().map(|value| value * value).sum()
    }
}
