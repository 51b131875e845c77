use super::axis::Axis;
use crate::error::{PlotError, Result};
use crate::utils::fill::is_fill;
use crate::Interval;
use ndarray::Array2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    Value(f64),
    /// NaN, ±Inf, fill value, or a value the color scale cannot show.
    Missing,
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }
}

/// One rectangle of the heatmap, in axis coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshCell {
    pub row: usize,
    pub col: usize,
    pub x: Interval,
    pub y: Interval,
    pub value: CellValue,
}

/// The laid out grid: columns from `x`, rows from `y`, one cell per entry of z.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    x: Axis,
    y: Axis,
    cells: Vec<MeshCell>,
}

impl Mesh {
    /// Lays `z` (rows x columns) out on the two axes. Entries that are NaN or equal to
    /// `fill` become missing cells.
    pub fn build(x: Axis, y: Axis, z: &Array2<f64>, fill: Option<f64>) -> Result<Mesh> {
        let (rows, cols) = z.dim();

        if x.len() != cols {
            return Err(PlotError::ShapeMismatch {
                axis: "x",
                found: x.len(),
                expected: cols,
                what: "columns",
            });
        }
        if y.len() != rows {
            return Err(PlotError::ShapeMismatch {
                axis: "y",
                found: y.len(),
                expected: rows,
                what: "rows",
            });
        }

        let cells = z
            .indexed_iter()
            .map(|((row, col), &v)| {
                let value = if !v.is_finite() || fill.map_or(false, |fill| is_fill(v, fill)) {
                    CellValue::Missing
                } else {
                    CellValue::Value(v)
                };
                MeshCell {
                    row,
                    col,
                    x: x.cells()[col],
                    y: y.cells()[row],
                    value,
                }
            })
            .collect();

        Ok(Mesh { x, y, cells })
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[MeshCell] {
        &self.cells
    }

    pub fn x(&self) -> &Axis {
        &self.x
    }

    pub fn y(&self) -> &Axis {
        &self.y
    }

    pub fn x_gaps(&self) -> &[Interval] {
        self.x.gaps()
    }

    pub fn y_gaps(&self) -> &[Interval] {
        self.y.gaps()
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.value.is_missing()).count()
    }

    /// Values of all non-missing cells.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.cells.iter().filter_map(|c| match c.value {
            CellValue::Value(v) => Some(v),
            CellValue::Missing => None,
        })
    }

    /// Marks every cell for which `reject` holds as missing and returns how many changed.
    pub fn mask_where(&mut self, reject: impl Fn(f64) -> bool) -> usize {
        let mut masked = 0;
        for cell in self.cells.iter_mut() {
            if let CellValue::Value(v) = cell.value {
                if reject(v) {
                    cell.value = CellValue::Missing;
                    masked += 1;
                }
            }
        }
        masked
    }

    /// Replaces both axes with display versions (e.g. log10), keeping cell values.
    pub(crate) fn with_axes(self, x: Axis, y: Axis) -> Mesh {
        let cells = self
            .cells
            .into_iter()
            .map(|cell| MeshCell {
                x: x.cells()[cell.col],
                y: y.cells()[cell.row],
                ..cell
            })
            .collect();
        Mesh { x, y, cells }
    }
}

#[cfg(test)]
use super::axis::{AxisKind, AxisSpec};
#[cfg(test)]
use ndarray::array;

#[test]
fn test_single_cell_from_centers_or_edges() {
    let z = array![[1.0]];

    let from_centers = Mesh::build(
        Axis::normalize(AxisSpec::Centers(vec![1.0]), AxisKind::Numeric).unwrap(),
        Axis::normalize(AxisSpec::Centers(vec![1.0]), AxisKind::Numeric).unwrap(),
        &z,
        None,
    )
    .unwrap();
    let from_edges = Mesh::build(
        Axis::normalize(AxisSpec::Edges(vec![0.0, 10.0]), AxisKind::Numeric).unwrap(),
        Axis::normalize(AxisSpec::Ranges(vec![(0.0, 5.0)]), AxisKind::Numeric).unwrap(),
        &z,
        None,
    )
    .unwrap();

    for mesh in [&from_centers, &from_edges] {
        assert_eq!(mesh.cells().len(), 1);
        assert_eq!(mesh.cells()[0].value, CellValue::Value(1.0));
        assert!(mesh.x_gaps().is_empty() && mesh.y_gaps().is_empty());
    }
    assert_eq!(from_centers.cells()[0].x, (0.5, 1.5));
    assert_eq!(from_edges.cells()[0].x, (0.0, 10.0));
    assert_eq!(from_edges.cells()[0].y, (0.0, 5.0));
}

#[test]
fn test_gap_interval_holds_no_cell() {
    let x = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.0]), AxisKind::Numeric).unwrap();
    let y = Axis::normalize(AxisSpec::Ranges(vec![(1.0, 2.0), (2.5, 3.0)]), AxisKind::Numeric)
        .unwrap();
    let mesh = Mesh::build(x, y, &array![[1.0, 2.0], [4.0, 5.0]], None).unwrap();

    assert_eq!(mesh.y_gaps(), &[(2.0, 2.5)]);
    let (gap_lo, gap_hi) = mesh.y_gaps()[0];
    assert_eq!(gap_hi - gap_lo, 0.5);
    assert!(mesh
        .cells()
        .iter()
        .all(|cell| cell.y.1 <= gap_lo || cell.y.0 >= gap_hi));
}

#[test]
fn test_nan_and_fill_are_missing() {
    let x = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.0, 3.0]), AxisKind::Numeric).unwrap();
    let y = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.0]), AxisKind::Numeric).unwrap();
    let fill = -1e31;
    let z = array![[1.0, f64::NAN, 3.0], [fill, (fill as f32) as f64, 6.0]];
    let mesh = Mesh::build(x, y, &z, Some(fill)).unwrap();

    assert_eq!(mesh.missing_count(), 3);
    assert_eq!(mesh.cells()[1].value, CellValue::Missing);
    assert_eq!(mesh.values().collect::<Vec<_>>(), vec![1.0, 3.0, 6.0]);
}

#[test]
fn test_infinite_values_are_missing() {
    let x = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.0, 3.0]), AxisKind::Numeric).unwrap();
    let y = Axis::normalize(AxisSpec::Centers(vec![1.0]), AxisKind::Numeric).unwrap();
    let z = array![[1.5, f64::INFINITY, f64::NEG_INFINITY]];
    let mesh = Mesh::build(x, y, &z, None).unwrap();

    assert_eq!(mesh.missing_count(), 2);
    assert_eq!(mesh.cells()[1].value, CellValue::Missing);
    assert_eq!(mesh.values().collect::<Vec<_>>(), vec![1.5]);
}

#[test]
fn test_shape_mismatch_is_reported() {
    let x = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.0]), AxisKind::Numeric).unwrap();
    let y = Axis::normalize(AxisSpec::Centers(vec![1.0]), AxisKind::Numeric).unwrap();
    let result = Mesh::build(x, y, &array![[1.0, 2.0, 3.0]], None);

    assert!(matches!(
        result,
        Err(PlotError::ShapeMismatch { axis: "x", found: 2, expected: 3, .. })
    ));
}

#[test]
fn test_mask_where_counts_changes() {
    let x = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.0]), AxisKind::Numeric).unwrap();
    let y = Axis::normalize(AxisSpec::Centers(vec![1.0]), AxisKind::Numeric).unwrap();
    let mut mesh = Mesh::build(x, y, &array![[-1.0, 2.0]], None).unwrap();

    assert_eq!(mesh.mask_where(|v| v <= 0.0), 1);
    assert_eq!(mesh.missing_count(), 1);
}
