//! pdep - two-way partial dependence surfaces
//!
//! Estimates how a model's prediction varies as two input columns are swept
//! over representative values while all other columns hold real, sampled
//! values. The model is reached only through a [`ScoringPort`].
//!
//! # Architecture
//!
//! ```text
//! Dataset → Value grids → Sample budget → Cartesian expansion → Scoring port → Aggregation → Surface
//!              ↓              ↓                  ↓                   ↓              ↓           ↓
//!          ≤25 points    ceiling / |A||B|    seeded StdRng      worker thread    N/A folding   PNG/CSV/
//!          per column                        A-major blocks     + timeout        grouped mean  JSON/table
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pdep::{PartialDependence, Prediction, PdResult, ScoringRequest, SurfaceConfig, TargetDescriptor};
//!
//! let port = |req: &ScoringRequest| -> PdResult<Vec<Prediction>> {
//!     Ok(vec![Prediction::probability(0.5); req.rows.len()])
//! };
//! let pd = PartialDependence::new(SurfaceConfig::default(), Arc::new(port));
//! let surface = pd.compute(&dataset, &TargetDescriptor::binary("churn"), "price", "competitor")?;
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod rendering;
pub mod scoring;
pub mod surface;
pub mod sweep;
pub mod types;

// Re-export core types
pub use types::{MISSING_SENTINEL, Prediction, TargetDescriptor, TargetKind, Value, ValueKey};

pub use config::{Config, ScorerConfig, SurfaceConfig};
pub use dataset::Dataset;
pub use error::{PdError, PdResult};
pub use pipeline::PartialDependence;
pub use scoring::{BatchScorer, ScoringPort, ScoringRequest, score_with_timeout};
pub use surface::{EmbeddedSurface, Surface, SurfacePoint};
pub use sweep::{Expansion, GridPolicy, ValueGrid, allocate_samples, build_grid, expand};
