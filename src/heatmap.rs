//! Heatmap layout. Axes given as centers, edges, ranges or categories are reduced to
//! per-cell intervals, laid out as a mesh over z and colored with a [`ColorScale`].
//! Regions no cell covers (gaps) and cells without data (missing) are styled separately.

pub mod axis;
pub mod mesh;
pub mod raster;
pub mod scale;

use crate::error::Result;
use crate::options::{FillStyle, HeatmapOptions};
use crate::Interval;
use axis::Axis;
use log::warn;
use mesh::Mesh;
use ndarray::Array2;
use scale::ColorScale;

pub use raster::rasterize;

/// A heatmap ready to be drawn. The mesh is in display coordinates, so log axes
/// already hold log10 values.
#[derive(Debug, Clone)]
pub struct Heatmap {
    mesh: Mesh,
    scale: ColorScale,
    gap: FillStyle,
    missing: FillStyle,
    logx: bool,
    logy: bool,
    transparent: bool,
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    pub zlabel: String,
}

impl Heatmap {
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    pub fn gap_style(&self) -> &FillStyle {
        &self.gap
    }

    pub fn missing_style(&self) -> &FillStyle {
        &self.missing
    }

    /// Whether the x axis is drawn in log10 coordinates.
    pub fn logx(&self) -> bool {
        self.logx
    }

    pub fn logy(&self) -> bool {
        self.logy
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Display extents of the x and y axes.
    pub fn display_ranges(&self) -> (Interval, Interval) {
        (self.mesh.x().extent(), self.mesh.y().extent())
    }
}

fn log_axis(axis: Axis, enabled: bool, name: &str) -> (Axis, bool) {
    if !enabled {
        return (axis, false);
    }
    match axis.log10() {
        Some(log_axis) => (log_axis, true),
        None => {
            warn!("{name} axis has a boundary <= 0; log scale ignored for it.");
            (axis, false)
        }
    }
}

/// Lays `z` (rows follow `y`, columns follow `x`) out on the two axes and builds its
/// color scale.
pub fn heatmap(x: Axis, y: Axis, z: &Array2<f64>, opts: &HeatmapOptions) -> Result<Heatmap> {
    let mut mesh = Mesh::build(x, y, z, opts.fill)?;

    let logz = opts.logz.unwrap_or(false);
    if logz {
        let masked = mesh.mask_where(|v| v <= 0.0);
        if masked > 0 {
            warn!("{masked} value(s) <= 0 cannot be shown with a log color scale; drawn as missing.");
        }
    }

    let scale = ColorScale::from_values(
        mesh.values(),
        logz,
        opts.categorical,
        opts.colormap.unwrap_or_default(),
    );

    let (x, logx) = log_axis(mesh.x().clone(), opts.logx.unwrap_or(false), "x");
    let (y, logy) = log_axis(mesh.y().clone(), opts.logy.unwrap_or(false), "y");
    let mesh = if logx || logy { mesh.with_axes(x, y) } else { mesh };

    Ok(Heatmap {
        mesh,
        scale,
        gap: opts.gap_style()?,
        missing: opts.missing_style()?,
        logx,
        logy,
        transparent: opts.transparent.unwrap_or(false),
        title: opts.title.clone().unwrap_or_default(),
        xlabel: opts.xlabel.clone().unwrap_or_default(),
        ylabel: opts.ylabel.clone().unwrap_or_default(),
        zlabel: opts.zlabel.clone().unwrap_or_default(),
    })
}

#[cfg(test)]
use axis::{AxisKind, AxisSpec};
#[cfg(test)]
use mesh::CellValue;
#[cfg(test)]
use ndarray::array;
#[cfg(test)]
use scale::ScaleKind;

#[test]
fn test_one_by_one_heatmap() {
    let heatmap = heatmap(
        Axis::normalize(AxisSpec::Centers(vec![1.0]), AxisKind::Numeric).unwrap(),
        Axis::normalize(AxisSpec::Centers(vec![1.0]), AxisKind::Numeric).unwrap(),
        &array![[1.0]],
        &HeatmapOptions::default(),
    )
    .unwrap();

    assert_eq!(heatmap.mesh().cells().len(), 1);
    assert_eq!(heatmap.display_ranges(), ((0.5, 1.5), (0.5, 1.5)));
    // A single integer value is one discrete level.
    assert_eq!(heatmap.scale().levels(), Some(&[1.0][..]));
}

#[test]
fn test_logz_masks_non_positive_values() {
    let x = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.0, 3.0]), AxisKind::Numeric).unwrap();
    let y = Axis::normalize(AxisSpec::Centers(vec![1.0]), AxisKind::Numeric).unwrap();
    let opts = HeatmapOptions {
        logz: Some(true),
        ..Default::default()
    };
    let heatmap = heatmap(x, y, &array![[-1.0, 10.0, 100.0]], &opts).unwrap();

    assert_eq!(heatmap.mesh().cells()[0].value, CellValue::Missing);
    assert_eq!(heatmap.scale().kind(), &ScaleKind::Log);
    assert_eq!(heatmap.scale().range(), (10.0, 100.0));
}

#[test]
fn test_log_axes_fall_back_to_linear() {
    let x = Axis::normalize(AxisSpec::Edges(vec![1.0, 10.0, 100.0]), AxisKind::Numeric).unwrap();
    let y = Axis::normalize(AxisSpec::Centers(vec![0.0, 1.0]), AxisKind::Numeric).unwrap();
    let opts = HeatmapOptions {
        logx: Some(true),
        logy: Some(true),
        ..Default::default()
    };
    let heatmap = heatmap(x, y, &array![[1.0, 2.0], [3.0, 4.0]], &opts).unwrap();

    assert!(heatmap.logx());
    assert!(!heatmap.logy());
    assert_eq!(heatmap.mesh().cells()[1].x, (1.0, 2.0));
    assert_eq!(heatmap.display_ranges(), ((0.0, 2.0), (-0.5, 1.5)));
}

#[test]
fn test_fill_value_from_options() {
    let x = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.0]), AxisKind::Numeric).unwrap();
    let y = Axis::normalize(AxisSpec::Centers(vec![1.0]), AxisKind::Numeric).unwrap();
    let opts = HeatmapOptions {
        fill: Some(-999.0),
        ..Default::default()
    };
    let heatmap = heatmap(x, y, &array![[-999.0, 0.25]], &opts).unwrap();

    assert_eq!(heatmap.mesh().missing_count(), 1);
    assert_eq!(heatmap.scale().range(), (-0.25, 0.75));
}
