use crate::constants::{SINGLE_CELL_WIDTH, UNIFORM_RTOL};
use crate::error::{PlotError, Result};
use crate::Interval;
use log::warn;

/// How the values along one side of a heatmap were given.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisSpec {
    /// One value per cell. Edges are placed at midpoints and the outer cells are
    /// extrapolated by the neighbouring half spacing.
    Centers(Vec<f64>),
    /// N + 1 contiguous boundaries for N cells.
    Edges(Vec<f64>),
    /// Explicit `(start, end)` per cell. `end[k] < start[k + 1]` leaves a gap.
    Ranges(Vec<Interval>),
    /// Labelled cells laid out at integer positions.
    Categories(Vec<String>),
}

/// What the axis values mean. Only affects how ticks are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Numeric,
    /// Seconds since the Unix epoch.
    Time,
    Categorical,
}

impl AxisSpec {
    /// Interprets a flat list of values that must describe `n` cells: `n` values are
    /// centers and `n + 1` values are edges.
    pub fn infer(values: Vec<f64>, n: usize, axis: &'static str) -> Result<AxisSpec> {
        if values.len() == n {
            Ok(AxisSpec::Centers(values))
        } else if values.len() == n + 1 {
            Ok(AxisSpec::Edges(values))
        } else {
            Err(PlotError::ShapeMismatch {
                axis,
                found: values.len(),
                expected: n,
                what: "cells (expected that many centers or one more edges)",
            })
        }
    }

    /// Number of cells this spec describes.
    pub fn cell_count(&self) -> usize {
        match self {
            AxisSpec::Centers(centers) => centers.len(),
            AxisSpec::Edges(edges) => edges.len().saturating_sub(1),
            AxisSpec::Ranges(ranges) => ranges.len(),
            AxisSpec::Categories(labels) => labels.len(),
        }
    }
}

/// An axis reduced to one `(lo, hi)` interval per cell, with its gaps precomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    cells: Vec<Interval>,
    kind: AxisKind,
    labels: Option<Vec<String>>,
    nonuniform: bool,
    gaps: Vec<Interval>,
}

impl Axis {
    /// Normalizes `spec` into per-cell intervals.
    pub fn normalize(spec: AxisSpec, kind: AxisKind) -> Result<Axis> {
        let (cells, nonuniform, labels) = match spec {
            AxisSpec::Centers(centers) => {
                check_finite(&centers)?;
                let edges = edges_from_centers(&centers)?;
                let nonuniform = !is_uniform(&centers);
                if nonuniform {
                    warn!(
                        "Centers are not uniformly spaced; edges are placed at midpoints \
                         between centers and the outer cells use the adjacent spacing."
                    );
                }
                (edges_to_cells(&edges), nonuniform, None)
            }
            AxisSpec::Edges(edges) => {
                if edges.len() < 2 {
                    return Err(PlotError::InvalidAxis(format!(
                        "{} edge(s) given, at least 2 are needed",
                        edges.len()
                    )));
                }
                check_finite(&edges)?;
                (edges_to_cells(&edges), !is_uniform(&edges), None)
            }
            AxisSpec::Ranges(ranges) => {
                if ranges.is_empty() {
                    return Err(PlotError::InvalidAxis("no ranges given".to_string()));
                }
                let flat: Vec<f64> = ranges.iter().flat_map(|&(lo, hi)| [lo, hi]).collect();
                check_finite(&flat)?;
                let cells: Vec<Interval> = ranges
                    .into_iter()
                    .map(|(a, b)| (a.min(b), a.max(b)))
                    .collect();
                let widths: Vec<f64> = cells.iter().map(|(lo, hi)| hi - lo).collect();
                (cells, !widths_equal(&widths), None)
            }
            AxisSpec::Categories(labels) => {
                if labels.is_empty() {
                    return Err(PlotError::InvalidAxis("no categories given".to_string()));
                }
                let cells = (0..labels.len())
                    .map(|k| (k as f64 - 0.5, k as f64 + 0.5))
                    .collect();
                (cells, false, Some(labels))
            }
        };

        let kind = if labels.is_some() {
            AxisKind::Categorical
        } else {
            kind
        };
        let gaps = find_gaps(&cells);

        Ok(Axis {
            cells,
            kind,
            labels,
            nonuniform,
            gaps,
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Per-cell `(lo, hi)` intervals, in input order.
    pub fn cells(&self) -> &[Interval] {
        &self.cells
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    /// True when cell widths differ.
    pub fn nonuniform(&self) -> bool {
        self.nonuniform
    }

    /// Empty intervals between consecutive cells, in increasing order.
    pub fn gaps(&self) -> &[Interval] {
        &self.gaps
    }

    /// Sorted, de-duplicated cell boundaries.
    pub fn boundaries(&self) -> Vec<f64> {
        let mut boundaries: Vec<f64> = self
            .cells
            .iter()
            .flat_map(|&(lo, hi)| [lo, hi])
            .collect();
        boundaries.sort_by(f64::total_cmp);
        boundaries.dedup();
        boundaries
    }

    /// Smallest interval containing every cell. Never zero width.
    pub fn extent(&self) -> Interval {
        let (lo, hi) = self.cells.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), &(a, b)| (lo.min(a), hi.max(b)),
        );
        if hi > lo {
            (lo, hi)
        } else {
            (lo - SINGLE_CELL_WIDTH / 2.0, lo + SINGLE_CELL_WIDTH / 2.0)
        }
    }

    /// The same axis in log10 coordinates, or `None` when a boundary is not positive.
    pub fn log10(&self) -> Option<Axis> {
        if self.cells.iter().any(|&(lo, _)| lo <= 0.0) {
            return None;
        }
        let cells: Vec<Interval> = self
            .cells
            .iter()
            .map(|&(lo, hi)| (lo.log10(), hi.log10()))
            .collect();
        let gaps = find_gaps(&cells);
        Some(Axis {
            cells,
            kind: self.kind,
            labels: self.labels.clone(),
            nonuniform: self.nonuniform,
            gaps,
        })
    }
}

/// Edges for a sequence of centers: midpoints inside, half the adjacent spacing outside.
/// A single center gets a cell of unit width.
pub fn edges_from_centers(centers: &[f64]) -> Result<Vec<f64>> {
    match centers {
        [] => Err(PlotError::InvalidAxis("no centers given".to_string())),
        [c] => Ok(vec![c - SINGLE_CELL_WIDTH / 2.0, c + SINGLE_CELL_WIDTH / 2.0]),
        _ => {
            let n = centers.len();
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(centers[0] - (centers[1] - centers[0]) / 2.0);
            edges.extend(centers.windows(2).map(|w| (w[0] + w[1]) / 2.0));
            edges.push(centers[n - 1] + (centers[n - 1] - centers[n - 2]) / 2.0);
            Ok(edges)
        }
    }
}

/// Whether consecutive points are equally spaced (within a relative tolerance).
pub fn is_uniform(points: &[f64]) -> bool {
    let spacings: Vec<f64> = points.windows(2).map(|w| w[1] - w[0]).collect();
    widths_equal(&spacings)
}

fn widths_equal(widths: &[f64]) -> bool {
    let Some(&first) = widths.first() else {
        return true;
    };
    let scale = widths.iter().fold(0.0_f64, |acc, w| acc.max(w.abs()));
    widths
        .iter()
        .all(|w| (w - first).abs() <= UNIFORM_RTOL * scale)
}

fn edges_to_cells(edges: &[f64]) -> Vec<Interval> {
    edges
        .windows(2)
        .map(|w| (w[0].min(w[1]), w[0].max(w[1])))
        .collect()
}

fn check_finite(values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(PlotError::InvalidAxis(format!(
            "value at index {i} is not finite ({})",
            values[i]
        ))),
        None => Ok(()),
    }
}

/// Empty intervals between cells once they are ordered by their lower edge.
fn find_gaps(cells: &[Interval]) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = cells.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut gaps = Vec::new();
    let mut reach = match sorted.first() {
        Some(&(_, hi)) => hi,
        None => return gaps,
    };
    let mut overlaps = 0;
    for &(lo, hi) in sorted.iter().skip(1) {
        if lo > reach {
            gaps.push((reach, lo));
        } else if lo < reach {
            overlaps += 1;
        }
        reach = reach.max(hi);
    }

    if overlaps > 0 {
        warn!("{overlaps} cell(s) overlap the preceding cell; later cells are drawn on top.");
    }

    gaps
}

#[test]
fn test_uniform_centers_give_constant_width_cells() {
    let axis = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.0, 3.0]), AxisKind::Numeric).unwrap();

    assert_eq!(axis.cells(), &[(0.5, 1.5), (1.5, 2.5), (2.5, 3.5)]);
    assert_eq!(axis.boundaries(), vec![0.5, 1.5, 2.5, 3.5]);
    assert!(axis.cells().iter().all(|(lo, hi)| hi - lo == 1.0));
    assert!(!axis.nonuniform());
    assert!(axis.gaps().is_empty());
}

#[test]
fn test_uniform_centers_extrapolate_symmetrically() {
    let centers: Vec<f64> = (0..10).map(|i| 2.5 + 4.0 * i as f64).collect();
    let edges = edges_from_centers(&centers).unwrap();

    assert_eq!(edges.len(), centers.len() + 1);
    assert_eq!(centers[0] - edges[0], edges[10] - centers[9]);
    assert_eq!(edges[0], 0.5);
    assert_eq!(edges[10], 40.5);
    for (k, w) in edges.windows(2).enumerate() {
        assert_eq!(w[1] - w[0], 4.0);
        assert_eq!((w[0] + w[1]) / 2.0, centers[k]);
    }
}

#[test]
fn test_nonuniform_centers_use_midpoints() {
    let axis = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.5, 3.0]), AxisKind::Numeric).unwrap();

    assert!(axis.nonuniform());
    assert_eq!(axis.cells(), &[(0.25, 1.75), (1.75, 2.75), (2.75, 3.25)]);
    assert!(axis.gaps().is_empty());
}

#[test]
fn test_single_center_has_unit_width() {
    let axis = Axis::normalize(AxisSpec::Centers(vec![1.0]), AxisKind::Numeric).unwrap();
    assert_eq!(axis.cells(), &[(0.5, 1.5)]);
    assert_eq!(axis.extent(), (0.5, 1.5));
}

#[test]
fn test_ranges_with_gap() {
    let axis = Axis::normalize(
        AxisSpec::Ranges(vec![(1.0, 2.5), (3.0, 4.0), (7.0, 8.0)]),
        AxisKind::Numeric,
    )
    .unwrap();

    assert_eq!(axis.gaps(), &[(2.5, 3.0), (4.0, 7.0)]);
    assert_eq!(axis.extent(), (1.0, 8.0));
    assert!(axis.nonuniform());
}

#[test]
fn test_descending_ranges_are_normalized_per_cell() {
    let axis = Axis::normalize(
        AxisSpec::Ranges(vec![(4.0, 3.0), (2.0, 1.0)]),
        AxisKind::Numeric,
    )
    .unwrap();

    assert_eq!(axis.cells(), &[(3.0, 4.0), (1.0, 2.0)]);
    assert_eq!(axis.gaps(), &[(2.0, 3.0)]);
}

#[test]
fn test_touching_ranges_have_no_gap() {
    let axis = Axis::normalize(
        AxisSpec::Ranges(vec![(0.0, 1.0), (1.0, 2.0)]),
        AxisKind::Numeric,
    )
    .unwrap();
    assert!(axis.gaps().is_empty());
    assert!(!axis.nonuniform());
}

#[test]
fn test_overlapping_ranges_have_no_gap() {
    let axis = Axis::normalize(
        AxisSpec::Ranges(vec![(0.0, 2.0), (1.0, 3.0), (5.0, 6.0)]),
        AxisKind::Numeric,
    )
    .unwrap();
    assert_eq!(axis.gaps(), &[(3.0, 5.0)]);
}

#[test]
fn test_edges_infer_from_length() {
    assert_eq!(
        AxisSpec::infer(vec![0.0, 10.0], 1, "y").unwrap(),
        AxisSpec::Edges(vec![0.0, 10.0])
    );
    assert_eq!(
        AxisSpec::infer(vec![1.0, 2.0], 2, "x").unwrap(),
        AxisSpec::Centers(vec![1.0, 2.0])
    );
    assert!(matches!(
        AxisSpec::infer(vec![1.0, 2.0, 3.0, 4.0], 2, "x"),
        Err(PlotError::ShapeMismatch { axis: "x", found: 4, expected: 2, .. })
    ));
}

#[test]
fn test_categories_use_integer_positions() {
    let labels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
    let axis = Axis::normalize(AxisSpec::Categories(labels.clone()), AxisKind::Numeric).unwrap();

    assert_eq!(axis.kind(), AxisKind::Categorical);
    assert_eq!(axis.cells(), &[(-0.5, 0.5), (0.5, 1.5), (1.5, 2.5)]);
    assert_eq!(axis.labels(), Some(labels.as_slice()));
}

#[test]
fn test_non_finite_axis_values_are_rejected() {
    assert!(matches!(
        Axis::normalize(AxisSpec::Centers(vec![1.0, f64::NAN]), AxisKind::Numeric),
        Err(PlotError::InvalidAxis(_))
    ));
    assert!(matches!(
        Axis::normalize(AxisSpec::Edges(vec![1.0]), AxisKind::Numeric),
        Err(PlotError::InvalidAxis(_))
    ));
}

#[test]
fn test_log10_requires_positive_edges() {
    let axis = Axis::normalize(
        AxisSpec::Ranges(vec![(1.0, 10.0), (100.0, 1000.0)]),
        AxisKind::Numeric,
    )
    .unwrap();
    let log_axis = axis.log10().unwrap();
    assert_eq!(log_axis.cells(), &[(0.0, 1.0), (2.0, 3.0)]);
    assert_eq!(log_axis.gaps(), &[(1.0, 2.0)]);

    let centered = Axis::normalize(AxisSpec::Centers(vec![0.0, 1.0]), AxisKind::Numeric).unwrap();
    assert!(centered.log10().is_none());
}
