//! 3-D surface plots.
//!
//! The surface is drawn with plotters into an in-memory RGB buffer and
//! encoded to PNG, so the same bytes can go to a file or into a
//! `data:image/png;base64,...` URI without touching disk.
//!
//! Axes whose values are all numeric are plotted at their numeric
//! positions. An axis holding any text (including the `"N/A"` group) is
//! plotted ordinally, one unit per distinct value in surface order.
//!
//! Requires the `plotters` feature (on by default); without it the render
//! functions return [`PdError::Render`].

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

#[cfg(feature = "plotters")]
use plotters::prelude::*;

use crate::error::{PdError, PdResult};
use crate::surface::Surface;
#[cfg(feature = "plotters")]
use crate::types::Value;

/// Canvas settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    /// Caption and axis tick labels. Needs a system font.
    pub labels: bool,
    /// Rotation around the vertical axis, radians.
    pub yaw: f64,
    pub pitch: f64,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            labels: true,
            yaw: 0.7,
            pitch: 0.35,
        }
    }
}

/// `<project>-<model>-<column_a>-<column_b>.png`, with path-hostile
/// characters replaced.
pub fn plot_file_name(project_id: &str, model_id: &str, column_a: &str, column_b: &str) -> String {
    let parts: Vec<String> = [project_id, model_id, column_a, column_b]
        .iter()
        .map(|p| {
            p.chars()
                .map(|c| if c.is_alphanumeric() || c == '_' || c == '.' { c } else { '_' })
                .collect()
        })
        .collect();
    format!("{}.png", parts.join("-"))
}

/// Wrap PNG bytes in a data URI.
pub fn embed_png(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

pub fn render_png(surface: &Surface) -> PdResult<Vec<u8>> {
    render_png_with(surface, &PlotStyle::default())
}

/// Render and write to `path`, creating parent directories.
pub fn save_png(surface: &Surface, path: &Path) -> PdResult<()> {
    let png = render_png(surface)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| PdError::render(format!("cannot create {}: {}", parent.display(), e)))?;
    }
    fs::write(path, png).map_err(|e| PdError::render(format!("cannot write {}: {}", path.display(), e)))
}

#[cfg(feature = "plotters")]
pub fn render_png_with(surface: &Surface, style: &PlotStyle) -> PdResult<Vec<u8>> {
    if surface.is_empty() {
        return Err(PdError::render("surface has no points"));
    }
    if style.width == 0 || style.height == 0 {
        return Err(PdError::render("canvas must be at least 1x1"));
    }

    let (w, h) = (style.width, style.height);
    let mut buffer = vec![0u8; w as usize * h as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (w, h)).into_drawing_area();
        draw_surface(&root, surface, style).map_err(|e| PdError::render(e.to_string()))?;
        root.present().map_err(|e| PdError::render(e.to_string()))?;
    }

    encode_png(&buffer, w, h)
}

/// Stub when plotters feature is disabled.
#[cfg(not(feature = "plotters"))]
pub fn render_png_with(_surface: &Surface, _style: &PlotStyle) -> PdResult<Vec<u8>> {
    Err(PdError::render("plotting requires the `plotters` feature"))
}

#[cfg(feature = "plotters")]
fn encode_png(rgb: &[u8], width: u32, height: u32) -> PdResult<Vec<u8>> {
    use image::ImageEncoder;
    use image::codecs::png::PngEncoder;

    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(rgb, width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| PdError::render(format!("png encoding failed: {}", e)))?;
    Ok(out)
}

/// Plot position of each axis value.
#[cfg(feature = "plotters")]
fn axis_positions(values: &[Value]) -> Vec<f64> {
    let numeric: Option<Vec<f64>> = values.iter().map(Value::as_number).collect();
    numeric.unwrap_or_else(|| (0..values.len()).map(|i| i as f64).collect())
}

#[cfg(feature = "plotters")]
fn padded_range(lo: f64, hi: f64) -> std::ops::Range<f64> {
    if hi > lo {
        let pad = (hi - lo) * 0.05;
        (lo - pad)..(hi + pad)
    } else {
        (lo - 0.5)..(hi + 0.5)
    }
}

#[cfg(feature = "plotters")]
fn bounds(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
}

/// Blue for the lowest mean through red for the highest.
#[cfg(feature = "plotters")]
fn heat(mean: f64, lo: f64, hi: f64) -> HSLColor {
    let t = if hi > lo { ((mean - lo) / (hi - lo)).clamp(0.0, 1.0) } else { 0.5 };
    HSLColor(240.0 / 360.0 * (1.0 - t), 0.75, 0.5)
}

#[cfg(feature = "plotters")]
fn draw_surface(
    root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
    surface: &Surface,
    style: &PlotStyle,
) -> Result<(), Box<dyn std::error::Error>> {
    root.fill(&WHITE)?;

    let axis_a = surface.axis_a();
    let axis_b = surface.axis_b();
    let xs = axis_positions(&axis_a);
    let zs = axis_positions(&axis_b);
    let (x_lo, x_hi) = bounds(&xs);
    let (z_lo, z_hi) = bounds(&zs);
    let (y_lo, y_hi) = surface.mean_range().unwrap_or((0.0, 1.0));

    // Grid of means indexed [a][b]; absent or non-finite cells are holes.
    let mut grid = vec![vec![None; axis_b.len()]; axis_a.len()];
    for (i, a) in axis_a.iter().enumerate() {
        for (j, b) in axis_b.iter().enumerate() {
            grid[i][j] = surface.mean_at(a, b).filter(|m| m.is_finite());
        }
    }

    let mut builder = ChartBuilder::on(root);
    builder.margin(20);
    if style.labels {
        builder.caption(
            format!("{} by {} and {}", surface.target.name, surface.column_a, surface.column_b),
            ("sans-serif", 24),
        );
    }
    let mut chart = builder.build_cartesian_3d(
        padded_range(x_lo, x_hi),
        padded_range(y_lo, y_hi),
        padded_range(z_lo, z_hi),
    )?;
    chart.with_projection(|mut pb| {
        pb.yaw = style.yaw;
        pb.pitch = style.pitch;
        pb.scale = 0.8;
        pb.into_matrix()
    });

    if style.labels {
        chart
            .configure_axes()
            .light_grid_style(BLACK.mix(0.15))
            .max_light_lines(3)
            .draw()?;
    }

    let mut cells = Vec::new();
    for i in 0..axis_a.len().saturating_sub(1) {
        for j in 0..axis_b.len().saturating_sub(1) {
            let corners = [grid[i][j], grid[i + 1][j], grid[i + 1][j + 1], grid[i][j + 1]];
            let [Some(c00), Some(c10), Some(c11), Some(c01)] = corners else {
                continue;
            };
            let mean = (c00 + c10 + c11 + c01) / 4.0;
            cells.push(Polygon::new(
                vec![
                    (xs[i], c00, zs[j]),
                    (xs[i + 1], c10, zs[j]),
                    (xs[i + 1], c11, zs[j + 1]),
                    (xs[i], c01, zs[j + 1]),
                ],
                heat(mean, y_lo, y_hi).mix(0.85).filled(),
            ));
        }
    }
    chart.draw_series(cells)?;

    // Markers keep single-row or single-column surfaces visible.
    let markers: Vec<_> = axis_a
        .iter()
        .enumerate()
        .flat_map(|(i, _)| (0..axis_b.len()).map(move |j| (i, j)))
        .filter_map(|(i, j)| grid[i][j].map(|m| (xs[i], m, zs[j], m)))
        .collect();
    chart.draw_series(
        markers
            .into_iter()
            .map(|(x, y, z, m)| Circle::new((x, y, z), 3, heat(m, y_lo, y_hi).filled())),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfacePoint;
    use crate::types::{MISSING_SENTINEL, TargetDescriptor, Value};

    fn surface(points: Vec<SurfacePoint>) -> Surface {
        Surface {
            column_a: "price".into(),
            column_b: "region".into(),
            target: TargetDescriptor::regression("revenue"),
            seed: 1,
            sample_count: 10,
            points,
        }
    }

    #[test]
    fn test_plot_file_name() {
        assert_eq!(
            plot_file_name("p1", "m1", "price", "competitor price"),
            "p1-m1-price-competitor_price.png"
        );
        assert_eq!(plot_file_name("p", "m", "a/b", "c"), "p-m-a_b-c.png");
    }

    #[test]
    fn test_embed_png_prefix() {
        let uri = embed_png(&[0x89, b'P', b'N', b'G']);
        assert_eq!(uri, "data:image/png;base64,iVBORw==");
    }

    #[cfg(feature = "plotters")]
    fn unlabeled() -> PlotStyle {
        PlotStyle {
            width: 160,
            height: 120,
            labels: false,
            ..PlotStyle::default()
        }
    }

    #[cfg(feature = "plotters")]
    #[test]
    fn test_render_numeric_surface() {
        let mut points = Vec::new();
        for a in 0..4 {
            for b in 0..3 {
                points.push(SurfacePoint {
                    a: Value::Number(a as f64),
                    b: Value::Number(b as f64 * 2.5),
                    mean: (a * b) as f64,
                });
            }
        }
        let png = render_png_with(&surface(points), &unlabeled()).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[cfg(feature = "plotters")]
    #[test]
    fn test_render_ordinal_axis_with_holes() {
        let points = vec![
            SurfacePoint { a: 1.0.into(), b: "east".into(), mean: 0.2 },
            SurfacePoint { a: 1.0.into(), b: MISSING_SENTINEL.into(), mean: f64::NAN },
            SurfacePoint { a: 2.0.into(), b: "east".into(), mean: 0.4 },
            SurfacePoint { a: 2.0.into(), b: MISSING_SENTINEL.into(), mean: 0.3 },
        ];
        let png = render_png_with(&surface(points), &unlabeled()).unwrap();
        assert!(png.starts_with(b"\x89PNG"));
    }

    #[cfg(feature = "plotters")]
    #[test]
    fn test_render_single_point_and_empty() {
        let one = surface(vec![SurfacePoint { a: 1.0.into(), b: 1.0.into(), mean: 5.0 }]);
        assert!(render_png_with(&one, &unlabeled()).is_ok());

        let err = render_png_with(&surface(vec![]), &unlabeled()).unwrap_err();
        assert!(matches!(err, PdError::Render(_)));
    }

    #[cfg(not(feature = "plotters"))]
    #[test]
    fn test_render_without_feature() {
        let s = surface(vec![SurfacePoint { a: 1.0.into(), b: 1.0.into(), mean: 5.0 }]);
        assert!(matches!(render_png(&s), Err(PdError::Render(_))));
    }
}
