//! Output rendering - from a computed surface to pixels or terminal text.
//!
//! - Plot mode: 3-D surface PNG, written to a file or embedded as a data URI
//! - Table mode: A x B matrix of means with banded colors

pub mod plot;
pub mod table;

pub use plot::{PlotStyle, embed_png, plot_file_name, render_png, render_png_with, save_png};
pub use table::{Band, TableRenderer};
