//! Cartesian expansion of a grid pair against sampled base rows.
//!
//! ```text
//!   sampled rows (n)        grid A x grid B             synthetic rows
//!   ┌───────────┐         (a1,b1) (a1,b2) ...         ┌───────────────┐
//!   │ r1        │    ──▶  one block per pair    ──▶   │ block (a1,b1) │ n rows
//!   │ ...       │         A-major, B-minor            │ block (a1,b2) │ n rows
//!   │ rn        │                                     │ ...           │
//!   └───────────┘                                     └───────────────┘
//! ```
//!
//! Inside each block the sampled rows keep their sampled order and only
//! the two swept columns are overwritten. The `(a, b)` label of every
//! synthetic row is kept alongside so aggregation never has to read the
//! swept values back out of the scoring response.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::dataset::Dataset;
use crate::error::{PdError, PdResult};
use crate::types::Value;

use super::grid::ValueGrid;

/// The synthetic scoring dataset plus the label of each of its rows.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub rows: Dataset,
    pub labels_a: Vec<Value>,
    pub labels_b: Vec<Value>,
    pub sample_count: usize,
}

impl Expansion {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Draw `sample_count` rows without replacement and expand them over
/// `grid_a x grid_b`. The grids carry their column names.
pub fn expand(
    dataset: &Dataset,
    sample_count: usize,
    grid_a: &ValueGrid,
    grid_b: &ValueGrid,
    seed: u64,
) -> PdResult<Expansion> {
    if grid_a.column() == grid_b.column() {
        return Err(PdError::config(format!(
            "both swept columns are '{}'; a two-way surface needs two distinct columns",
            grid_a.column()
        )));
    }
    let idx_a = dataset.column_index(grid_a.column())?;
    let idx_b = dataset.column_index(grid_b.column())?;

    if sample_count == 0 {
        return Err(PdError::config("sample count must be at least 1"));
    }
    if sample_count > dataset.len() {
        return Err(PdError::insufficient(format!(
            "cannot sample {} rows without replacement from {}",
            sample_count,
            dataset.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let picks = rand::seq::index::sample(&mut rng, dataset.len(), sample_count);
    let sampled: Vec<&Vec<Value>> = picks.iter().map(|i| &dataset.rows()[i]).collect();

    let total = sample_count * grid_a.len() * grid_b.len();
    let mut rows = Dataset::with_columns_of(dataset, total);
    let mut labels_a = Vec::with_capacity(total);
    let mut labels_b = Vec::with_capacity(total);

    for a in grid_a.values() {
        for b in grid_b.values() {
            for base in &sampled {
                let mut row = (*base).clone();
                row[idx_a] = a.clone();
                row[idx_b] = b.clone();
                rows.push_row(row);
                labels_a.push(a.clone());
                labels_b.push(b.clone());
            }
        }
    }

    Ok(Expansion {
        rows,
        labels_a,
        labels_b,
        sample_count,
    })
}
