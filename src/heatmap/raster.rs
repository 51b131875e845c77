use super::mesh::CellValue;
use super::Heatmap;
use crate::constants::HATCH_SPACING;
use crate::error::{PlotError, Result};
use crate::options::{FillStyle, Hatch};
use crate::Interval;
use plotters::coord::Shift;
use plotters::prelude::*;

type Segment = ((i32, i32), (i32, i32));

/// Maps axis coordinates onto the pixels of a plotting area. Pixel rows grow downwards.
#[derive(Debug, Clone, Copy)]
pub struct PixelMap {
    x: Interval,
    y: Interval,
    width: u32,
    height: u32,
}

impl PixelMap {
    pub fn new(x: Interval, y: Interval, (width, height): (u32, u32)) -> Self {
        PixelMap { x, y, width, height }
    }

    pub fn px(&self, x: f64) -> i32 {
        let (lo, hi) = self.x;
        ((x - lo) / (hi - lo) * self.width as f64).round() as i32
    }

    pub fn py(&self, y: f64) -> i32 {
        let (lo, hi) = self.y;
        ((hi - y) / (hi - lo) * self.height as f64).round() as i32
    }

    /// Half-open pixel rectangle `[x0, x1) x [y0, y1)` covered by a cell.
    fn rect(&self, x: Interval, y: Interval) -> (i32, i32, i32, i32) {
        (self.px(x.0), self.py(y.1), self.px(x.1), self.py(y.0))
    }
}

/// Hatch line segments clipped to the half-open rectangle `[x0, x1) x [y0, y1)`.
/// Lines sit on a grid anchored at pixel (0, 0) so neighbouring cells line up.
pub fn hatch_segments(hatch: Hatch, (x0, y0, x1, y1): (i32, i32, i32, i32), spacing: i32) -> Vec<Segment> {
    if x1 <= x0 || y1 <= y0 || spacing <= 0 {
        return Vec::new();
    }
    let (xmax, ymax) = (x1 - 1, y1 - 1);
    let multiples = |lo: i32, hi: i32| {
        let first = lo.div_euclid(spacing) + i32::from(lo.rem_euclid(spacing) != 0);
        (first..=hi.div_euclid(spacing)).map(move |k| k * spacing)
    };

    // Lines x + y = c, running up to the right on screen.
    let forward = || {
        multiples(x0 + y0, xmax + ymax).filter_map(move |c| {
            let (lo, hi) = (x0.max(c - ymax), xmax.min(c - y0));
            (lo <= hi).then_some(((lo, c - lo), (hi, c - hi)))
        })
    };
    // Lines x - y = c, running down to the right.
    let back = || {
        multiples(x0 - ymax, xmax - y0).filter_map(move |c| {
            let (lo, hi) = (x0.max(y0 + c), xmax.min(ymax + c));
            (lo <= hi).then_some(((lo, lo - c), (hi, hi - c)))
        })
    };
    let horizontal = || multiples(y0, ymax).map(move |y| ((x0, y), (xmax, y)));
    let vertical = || multiples(x0, xmax).map(move |x| ((x, y0), (x, ymax)));

    match hatch {
        Hatch::None => Vec::new(),
        Hatch::Forward => forward().collect(),
        Hatch::Back => back().collect(),
        Hatch::Cross => forward().chain(back()).collect(),
        Hatch::Horizontal => horizontal().collect(),
        Hatch::Vertical => vertical().collect(),
        Hatch::Grid => horizontal().chain(vertical()).collect(),
        Hatch::Dots => {
            let half = spacing / 2;
            multiples(y0 - half, ymax - half)
                .flat_map(|y| multiples(x0 - half, xmax - half).map(move |x| (x + half, y + half)))
                .map(|p| (p, p))
                .collect()
        }
    }
}

fn fill_rect<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    (x0, y0, x1, y1): (i32, i32, i32, i32),
    color: RGBColor,
) -> Result<()> {
    if x1 <= x0 || y1 <= y0 {
        return Ok(());
    }
    area.draw(&Rectangle::new([(x0, y0), (x1, y1)], color.filled()))
        .map_err(PlotError::render)
}

fn draw_hatch<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    rect: (i32, i32, i32, i32),
    style: &FillStyle,
) -> Result<()> {
    for (a, b) in hatch_segments(style.hatch, rect, HATCH_SPACING) {
        if a == b {
            area.draw_pixel(a, &style.hatch_color)
        } else {
            area.draw(&PathElement::new(vec![a, b], style.hatch_color.stroke_width(1)))
        }
        .map_err(PlotError::render)?;
    }
    Ok(())
}

/// Paints the heatmap cells onto `area`, which must cover exactly the plotting region.
/// The gap style fills everything first, so any region no cell covers shows it.
pub fn draw_cells<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, heatmap: &Heatmap) -> Result<()> {
    let (x_range, y_range) = heatmap.display_ranges();
    let dim = area.dim_in_pixel();
    let map = PixelMap::new(x_range, y_range, dim);
    let whole = (0, 0, dim.0 as i32, dim.1 as i32);

    let gap = heatmap.gap_style();
    let missing = heatmap.missing_style();

    // Gap background
    if !heatmap.is_transparent() {
        fill_rect(area, whole, gap.color)?;
    }
    draw_hatch(area, whole, gap)?;

    // Cells; anything the scale cannot color is drawn as missing
    let mut unshown = Vec::new();
    for cell in heatmap.mesh().cells() {
        let rect = map.rect(cell.x, cell.y);
        let color = match cell.value {
            CellValue::Value(v) => heatmap.scale().color(v),
            CellValue::Missing => None,
        };
        match color {
            Some(color) => fill_rect(area, rect, color)?,
            None => {
                fill_rect(area, rect, missing.color)?;
                unshown.push(rect);
            }
        }
    }

    // Missing cell hatches
    for rect in unshown {
        draw_hatch(area, rect, missing)?;
    }

    Ok(())
}

/// Renders the plotting region only (no axes or text) into an RGB buffer of
/// `width * height * 3` bytes.
pub fn rasterize(heatmap: &Heatmap, width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(PlotError::Render(format!("empty raster {width}x{height}")));
    }
    let mut buffer = vec![255u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_cells(&root, heatmap)?;
        root.present().map_err(PlotError::render)?;
    }
    Ok(buffer)
}

#[cfg(test)]
use super::axis::{Axis, AxisKind, AxisSpec};
#[cfg(test)]
use crate::options::{ColorSpec, HeatmapOptions};
#[cfg(test)]
use ndarray::array;

#[cfg(test)]
fn pixel(buffer: &[u8], width: u32, (x, y): (u32, u32)) -> RGBColor {
    let i = ((y * width + x) * 3) as usize;
    RGBColor(buffer[i], buffer[i + 1], buffer[i + 2])
}

#[cfg(test)]
fn gapped_heatmap(opts: &HeatmapOptions) -> Heatmap {
    // Rows cover [0, 1] and [3, 4]; [1, 3] is a gap.
    let x = Axis::normalize(AxisSpec::Centers(vec![0.5, 1.5]), AxisKind::Numeric).unwrap();
    let y = Axis::normalize(AxisSpec::Ranges(vec![(0.0, 1.0), (3.0, 4.0)]), AxisKind::Numeric)
        .unwrap();
    super::heatmap(x, y, &array![[1.5, 2.5], [3.5, f64::NAN]], opts).unwrap()
}

#[test]
fn test_gap_pixels_carry_gap_color() {
    let heatmap = gapped_heatmap(&HeatmapOptions::default());
    let buffer = rasterize(&heatmap, 40, 40).unwrap();

    // y in [1, 3] maps to pixel rows 10..30.
    for y in 11..29 {
        for x in [1, 20, 38] {
            assert_eq!(pixel(&buffer, 40, (x, y)), RGBColor(255, 255, 255));
        }
    }
    // Bottom-left cell holds 1.5, the smallest value.
    assert_eq!(pixel(&buffer, 40, (5, 35)), heatmap.scale().color(1.5).unwrap());
}

#[test]
fn test_missing_cells_never_use_the_colormap() {
    let plain = HeatmapOptions {
        nan_hatch: Some(Hatch::None),
        ..Default::default()
    };
    let heatmap = gapped_heatmap(&plain);
    let buffer = rasterize(&heatmap, 40, 40).unwrap();
    // Top-right cell is NaN.
    for y in 1..9 {
        for x in 21..39 {
            assert_eq!(pixel(&buffer, 40, (x, y)), RGBColor(200, 200, 200));
        }
    }

    let hatched = gapped_heatmap(&HeatmapOptions::default());
    let buffer = rasterize(&hatched, 40, 40).unwrap();
    let missing = hatched.missing_style();
    let mut hatch_pixels = 0;
    for y in 0..10 {
        for x in 20..40 {
            let p = pixel(&buffer, 40, (x, y));
            assert!(p == missing.color || p == missing.hatch_color, "{p:?} at ({x}, {y})");
            hatch_pixels += usize::from(p == missing.hatch_color);
        }
    }
    assert!(hatch_pixels > 0);
}

#[test]
fn test_touching_cells_leave_no_gap_pixels() {
    let centers = || Axis::normalize(AxisSpec::Centers(vec![0.5, 1.5]), AxisKind::Numeric).unwrap();
    let opts = HeatmapOptions {
        gap_color: Some(ColorSpec::Rgb([1.0, 0.0, 1.0])),
        ..Default::default()
    };
    let heatmap = super::heatmap(centers(), centers(), &array![[1.5, 2.5], [3.5, 4.5]], &opts).unwrap();
    assert!(heatmap.mesh().x_gaps().is_empty() && heatmap.mesh().y_gaps().is_empty());

    let buffer = rasterize(&heatmap, 40, 40).unwrap();
    let gap = heatmap.gap_style().color;
    for y in 0..40 {
        for x in 0..40 {
            assert_ne!(pixel(&buffer, 40, (x, y)), gap, "gap color at ({x}, {y})");
        }
    }
}

#[test]
fn test_infinite_values_are_hatched_as_missing() {
    let x = Axis::normalize(AxisSpec::Centers(vec![0.5, 1.5]), AxisKind::Numeric).unwrap();
    let y = Axis::normalize(AxisSpec::Centers(vec![0.5]), AxisKind::Numeric).unwrap();
    let heatmap = super::heatmap(x, y, &array![[1.5, f64::INFINITY]], &HeatmapOptions::default()).unwrap();
    let buffer = rasterize(&heatmap, 40, 20).unwrap();

    let missing = heatmap.missing_style();
    let mut hatch_pixels = 0;
    for y in 0..20 {
        for x in 20..40 {
            let p = pixel(&buffer, 40, (x, y));
            assert!(p == missing.color || p == missing.hatch_color, "{p:?} at ({x}, {y})");
            hatch_pixels += usize::from(p == missing.hatch_color);
        }
    }
    assert!(hatch_pixels > 0);
}

#[test]
fn test_rasterize_is_deterministic() {
    let heatmap = gapped_heatmap(&HeatmapOptions::default());
    assert_eq!(
        rasterize(&heatmap, 64, 48).unwrap(),
        rasterize(&heatmap, 64, 48).unwrap()
    );
    assert!(rasterize(&heatmap, 0, 48).is_err());
}

#[test]
fn test_hatch_segments_stay_inside_rect() {
    let rect = (3, 5, 20, 17);
    for hatch in [
        Hatch::Forward,
        Hatch::Back,
        Hatch::Cross,
        Hatch::Horizontal,
        Hatch::Vertical,
        Hatch::Grid,
        Hatch::Dots,
    ] {
        let segments = hatch_segments(hatch, rect, 4);
        assert!(!segments.is_empty(), "{hatch:?}");
        for ((ax, ay), (bx, by)) in segments {
            for (x, y) in [(ax, ay), (bx, by)] {
                assert!((3..20).contains(&x) && (5..17).contains(&y), "{hatch:?} ({x}, {y})");
            }
        }
    }
    assert!(hatch_segments(Hatch::None, rect, 4).is_empty());
    assert!(hatch_segments(Hatch::Forward, (5, 5, 5, 10), 4).is_empty());
}

#[test]
fn test_hatch_lines_follow_their_direction() {
    // x + y = c for '/', x - y = c for '\'.
    for ((ax, ay), (bx, by)) in hatch_segments(Hatch::Forward, (0, 0, 16, 16), 8) {
        assert_eq!(ax + ay, bx + by);
        assert_eq!((ax + ay) % 8, 0);
    }
    for ((ax, ay), (bx, by)) in hatch_segments(Hatch::Back, (0, 0, 16, 16), 8) {
        assert_eq!(ax - ay, bx - by);
    }
    assert_eq!(
        hatch_segments(Hatch::Horizontal, (0, 0, 16, 16), 8),
        vec![((0, 0), (15, 0)), ((0, 8), (15, 8))]
    );
}
