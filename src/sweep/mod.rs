//! Synthetic dataset construction for a two-way sweep.
//!
//! ```text
//! Dataset ──▶ build_grid(A), build_grid(B) ──▶ allocate_samples ──▶ expand ──▶ scoring port
//! ```
//!
//! Each stage is a pure function of its inputs (the expander's randomness
//! comes only from the caller's seed), so a pinned seed reproduces the
//! exact rows sent for scoring.

pub mod budget;
pub mod expand;
pub mod grid;

pub use budget::{DEFAULT_ROW_CEILING, allocate_samples};
pub use expand::{Expansion, expand};
pub use grid::{EVEN_WIDTH_INTERVALS, GridPolicy, MAX_GRID_POINTS, ValueGrid, build_grid};
