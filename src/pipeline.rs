//! End-to-end surface computation.
//!
//! ```text
//! build_grid(A) ─┐
//!                ├─▶ allocate_samples ─▶ expand ─▶ score_with_timeout ─▶ aggregate ─▶ Surface
//! build_grid(B) ─┘                                   (scoped TempDir)
//! ```
//!
//! [`PartialDependence`] owns the decisions the stages leave open: which
//! seed to sample with, how long to wait for the scorer, and where the
//! scorer may write scratch files. The scratch directory is a
//! [`tempfile::TempDir`] created right before scoring and removed on every
//! exit path, timeouts included.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::SurfaceConfig;
use crate::dataset::Dataset;
use crate::error::{PdError, PdResult};
use crate::rendering::plot;
use crate::scoring::{ScoringPort, ScoringRequest, score_with_timeout};
use crate::surface::{EmbeddedSurface, Surface, aggregate};
use crate::sweep::{allocate_samples, build_grid, expand};
use crate::types::TargetDescriptor;

/// Two-way partial dependence over one scoring port.
pub struct PartialDependence {
    config: SurfaceConfig,
    port: Arc<dyn ScoringPort>,
}

impl PartialDependence {
    pub fn new(config: SurfaceConfig, port: Arc<dyn ScoringPort>) -> Self {
        Self { config, port }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Compute the surface of `target` over `column_a x column_b`.
    pub fn compute(
        &self,
        dataset: &Dataset,
        target: &TargetDescriptor,
        column_a: &str,
        column_b: &str,
    ) -> PdResult<Surface> {
        self.config.validate()?;
        let start = Instant::now();

        let grid_a = build_grid(dataset, column_a, self.config.grid_policy)?;
        let grid_b = build_grid(dataset, column_b, self.config.grid_policy)?;
        let variations = grid_a.len() * grid_b.len();
        let sample_count = allocate_samples(&grid_a, &grid_b, dataset.len(), self.config.row_ceiling)?;

        let seed = match self.config.random_seed {
            Some(seed) => seed,
            None => rand::random(),
        };
        tracing::info!(
            rows = dataset.len(),
            variations,
            samples = sample_count,
            seed,
            pinned = self.config.random_seed.is_some(),
            "sweeping {} x {}",
            column_a,
            column_b
        );

        let expansion = expand(dataset, sample_count, &grid_a, &grid_b, seed)?;

        let workdir = tempfile::Builder::new()
            .prefix("pdep-")
            .tempdir()
            .map_err(|e| PdError::scoring(format!("failed to create scoring workdir: {}", e)))?;

        let request = ScoringRequest {
            rows: expansion.rows,
            target: target.clone(),
            keep_columns: vec![column_a.to_string(), column_b.to_string()],
            workdir: workdir.path().to_path_buf(),
            deadline: self.config.scoring_timeout.map(|t| Instant::now() + t),
        };
        tracing::debug!(
            port = %self.port.describe(),
            rows = request.rows.len(),
            workdir = %workdir.path().display(),
            "submitting for scoring"
        );

        let predictions = score_with_timeout(Arc::clone(&self.port), request, self.config.scoring_timeout)?;
        drop(workdir);

        let points = aggregate(&predictions, &expansion.labels_a, &expansion.labels_b, target.kind)?;
        tracing::info!(points = points.len(), elapsed = ?start.elapsed(), "surface computed");

        Ok(Surface {
            column_a: column_a.to_string(),
            column_b: column_b.to_string(),
            target: target.clone(),
            seed,
            sample_count,
            points,
        })
    }

    /// Compute and write the rendered surface to `path` as PNG.
    pub fn render_to_file(
        &self,
        dataset: &Dataset,
        target: &TargetDescriptor,
        column_a: &str,
        column_b: &str,
        path: &Path,
    ) -> PdResult<Surface> {
        let surface = self.compute(dataset, target, column_a, column_b)?;
        plot::save_png(&surface, path)?;
        tracing::info!(path = %path.display(), "surface plot written");
        Ok(surface)
    }

    /// Compute and return the rendered surface as a `data:image/png` URI.
    pub fn render_embedded(
        &self,
        dataset: &Dataset,
        target: &TargetDescriptor,
        column_a: &str,
        column_b: &str,
    ) -> PdResult<EmbeddedSurface> {
        let surface = self.compute(dataset, target, column_a, column_b)?;
        let png = plot::render_png(&surface)?;
        Ok(EmbeddedSurface {
            data_uri: plot::embed_png(&png),
            surface,
        })
    }
}
