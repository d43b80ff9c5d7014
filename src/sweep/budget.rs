//! Sample budget: how many base rows to draw for a grid pair.
//!
//! Every sampled base row is replicated once per `(a, b)` pair, so the
//! synthetic dataset has `samples * |A| * |B|` rows. Holding that product
//! near a fixed ceiling keeps scoring cost flat no matter how dense the
//! grids are: dense grids get shallow per-cell samples, sparse grids deep ones.

use crate::error::{PdError, PdResult};

use super::grid::ValueGrid;

/// Default total synthetic-row target.
pub const DEFAULT_ROW_CEILING: usize = 30_000;

/// Number of base rows to sample.
///
/// Returns a value in `[1, row_count]`. When `|A| * |B| <= row_ceiling` the
/// synthetic row count stays within the ceiling; beyond that one row per
/// pair is the floor.
pub fn allocate_samples(
    grid_a: &ValueGrid,
    grid_b: &ValueGrid,
    row_count: usize,
    row_ceiling: usize,
) -> PdResult<usize> {
    for grid in [grid_a, grid_b] {
        if grid.is_empty() {
            return Err(PdError::config(format!(
                "value grid for column '{}' is empty",
                grid.column()
            )));
        }
    }
    if row_count == 0 {
        return Err(PdError::insufficient("base dataset has no rows to sample"));
    }

    let total_variations = grid_a.len().saturating_mul(grid_b.len());
    let samples = (row_ceiling / total_variations).min(row_count).max(1);

    tracing::debug!(
        total_variations,
        row_ceiling,
        row_count,
        samples,
        "allocated sample budget"
    );

    Ok(samples)
}
