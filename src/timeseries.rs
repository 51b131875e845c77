//! Line plots of one or more components against time.

use crate::constants::SINGLE_CELL_WIDTH;
use crate::error::{PlotError, Result};
use crate::options::TimeseriesOptions;
use crate::{Interval, Seconds};
use itertools::{Itertools, MinMaxResult};
use log::warn;
use ndarray::{Array2, ArrayView1, Axis};

/// What the y values mean.
#[derive(Debug, Clone, PartialEq)]
pub enum YValues {
    Numeric(Array2<f64>),
    /// Seconds since the epoch, drawn against a time axis.
    Time(Array2<f64>),
    /// Strings mapped to integer positions, in order of first appearance.
    Categorical {
        positions: Array2<f64>,
        categories: Vec<String>,
    },
}

impl YValues {
    pub fn categorical(values: &Array2<String>) -> YValues {
        let categories: Vec<String> = values.iter().unique().cloned().collect();
        let positions = values.mapv(|v| {
            categories
                .iter()
                .position(|c| *c == v)
                .map_or(f64::NAN, |p| p as f64)
        });
        YValues::Categorical {
            positions,
            categories,
        }
    }

    /// Values as drawn (positions for categories).
    pub fn values(&self) -> &Array2<f64> {
        match self {
            YValues::Numeric(values) | YValues::Time(values) => values,
            YValues::Categorical { positions, .. } => positions,
        }
    }

    pub fn categories(&self) -> Option<&[String]> {
        match self {
            YValues::Categorical { categories, .. } => Some(categories),
            _ => None,
        }
    }

    pub fn is_time(&self) -> bool {
        matches!(self, YValues::Time(_))
    }
}

/// Splits one component into runs of consecutive finite points. Each run is drawn
/// as its own line, so NaN values show as breaks.
pub fn finite_runs(time: &[Seconds], column: ArrayView1<f64>) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (&t, &v) in time.iter().zip(column.iter()) {
        if t.is_finite() && v.is_finite() {
            current.push((t, v));
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn padded_range(values: impl Iterator<Item = f64>, log: bool) -> Interval {
    match values.filter(|v| v.is_finite() && (!log || *v > 0.0)).minmax() {
        MinMaxResult::NoElements => {
            if log {
                (1.0, 10.0)
            } else {
                (0.0, 1.0)
            }
        }
        MinMaxResult::OneElement(v) => {
            if log {
                (v / 2.0, v * 2.0)
            } else if v == 0.0 {
                (-SINGLE_CELL_WIDTH / 2.0, SINGLE_CELL_WIDTH / 2.0)
            } else {
                (v - v.abs() / 10.0, v + v.abs() / 10.0)
            }
        }
        MinMaxResult::MinMax(lo, hi) if lo == hi => padded_range(std::iter::once(lo), log),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    }
}

/// Like [`padded_range`], but a single time gets the width of one cell.
fn time_range(times: impl Iterator<Item = Seconds>) -> Interval {
    match times.filter(|t| t.is_finite()).minmax() {
        MinMaxResult::NoElements => (0.0, 1.0),
        MinMaxResult::OneElement(t) => (t - SINGLE_CELL_WIDTH / 2.0, t + SINGLE_CELL_WIDTH / 2.0),
        MinMaxResult::MinMax(lo, hi) if lo == hi => time_range(std::iter::once(lo)),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    }
}

#[derive(Debug, Clone)]
pub struct Timeseries {
    time: Vec<Seconds>,
    y: YValues,
    legend: Vec<String>,
    logy: bool,
    nodata: bool,
    transparent: bool,
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
}

/// Builds a time series plot. Rows of `y` follow `time`, columns are components.
pub fn timeseries(time: &[Seconds], y: YValues, opts: &TimeseriesOptions) -> Result<Timeseries> {
    let rows = y.values().nrows();
    if rows != time.len() {
        return Err(PlotError::ShapeMismatch {
            axis: "time",
            found: time.len(),
            expected: rows,
            what: "rows",
        });
    }

    if opts.logx.unwrap_or(false) {
        warn!("Log scale is not available for the time axis; ignored.");
    }
    let mut logy = opts.logy.unwrap_or(false);
    if logy && !matches!(y, YValues::Numeric(_)) {
        warn!("Log scale is only available for numeric values; ignored.");
        logy = false;
    }
    if logy && y.values().iter().any(|v| *v <= 0.0) {
        warn!("Values <= 0 are not shown with a log y axis.");
    }

    Ok(Timeseries {
        time: time.to_vec(),
        y,
        legend: opts.legendlabels.clone().unwrap_or_default(),
        logy,
        nodata: opts.nodata.unwrap_or(false),
        transparent: opts.transparent.unwrap_or(false),
        title: opts.title.clone().unwrap_or_default(),
        xlabel: opts.xlabel.clone().unwrap_or_default(),
        ylabel: opts.ylabel.clone().unwrap_or_default(),
    })
}

impl Timeseries {
    pub fn time(&self) -> &[Seconds] {
        &self.time
    }

    pub fn y(&self) -> &YValues {
        &self.y
    }

    pub fn components(&self) -> usize {
        self.y.values().ncols()
    }

    pub fn logy(&self) -> bool {
        self.logy
    }

    pub fn nodata(&self) -> bool {
        self.nodata
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Line segments of component `j`.
    pub fn runs(&self, j: usize) -> Vec<Vec<(f64, f64)>> {
        let column = self.y.values().index_axis(Axis(1), j);
        let runs = finite_runs(&self.time, column);
        if self.logy {
            runs.into_iter()
                .flat_map(|run| split_run(run, |(_, v)| *v > 0.0))
                .collect()
        } else {
            runs
        }
    }

    /// Legend entries, when a legend should be drawn.
    pub fn legend(&self) -> Option<&[String]> {
        let shown = !self.legend.is_empty()
            && (self.components() > 1 || self.legend.iter().any(|l| !l.trim().is_empty()));
        shown.then_some(self.legend.as_slice())
    }

    pub fn x_range(&self) -> Interval {
        time_range(self.time.iter().copied())
    }

    /// Range of the finite y values (positive only for a log axis), never zero width.
    pub fn y_range(&self) -> Interval {
        match &self.y {
            YValues::Categorical { categories, .. } => {
                (-0.5, categories.len().max(1) as f64 - 0.5)
            }
            YValues::Time(values) => time_range(values.iter().copied()),
            YValues::Numeric(values) => padded_range(values.iter().copied(), self.logy),
        }
    }
}

fn split_run(run: Vec<(f64, f64)>, keep: impl Fn(&(f64, f64)) -> bool) -> Vec<Vec<(f64, f64)>> {
    run.into_iter()
        .group_by(|p| keep(p))
        .into_iter()
        .filter(|(kept, _)| *kept)
        .map(|(_, group)| group.collect())
        .collect()
}

#[cfg(test)]
use ndarray::{array, Array1};

#[test]
fn test_finite_runs_break_at_nan() {
    let time = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
    let column = array![1.0, 2.0, f64::NAN, 4.0, f64::NAN, 6.0];
    let runs = finite_runs(&time, column.view());

    assert_eq!(
        runs,
        vec![vec![(0.0, 1.0), (1.0, 2.0)], vec![(3.0, 4.0)], vec![(5.0, 6.0)]]
    );
    assert!(finite_runs(&time, Array1::from_elem(6, f64::NAN).view()).is_empty());
}

#[test]
fn test_shape_mismatch() {
    let result = timeseries(
        &[0.0, 1.0],
        YValues::Numeric(array![[1.0], [2.0], [3.0]]),
        &TimeseriesOptions::default(),
    );
    assert!(matches!(
        result,
        Err(PlotError::ShapeMismatch { axis: "time", found: 2, expected: 3, .. })
    ));
}

#[test]
fn test_ranges() {
    let ts = timeseries(
        &[10.0, 20.0, 30.0],
        YValues::Numeric(array![[1.0], [f64::NAN], [5.0]]),
        &TimeseriesOptions::default(),
    )
    .unwrap();
    assert_eq!(ts.x_range(), (10.0, 30.0));
    assert_eq!(ts.y_range(), (1.0, 5.0));

    let flat = timeseries(
        &[10.0],
        YValues::Numeric(array![[0.0]]),
        &TimeseriesOptions::default(),
    )
    .unwrap();
    assert_eq!(flat.x_range(), (9.5, 10.5));
    assert_eq!(flat.y_range(), (-0.5, 0.5));
}

#[test]
fn test_log_y_drops_non_positive_points() {
    let opts = TimeseriesOptions {
        logy: Some(true),
        ..Default::default()
    };
    let ts = timeseries(
        &[0.0, 1.0, 2.0, 3.0],
        YValues::Numeric(array![[1.0], [-1.0], [10.0], [100.0]]),
        &opts,
    )
    .unwrap();

    assert_eq!(ts.y_range(), (1.0, 100.0));
    assert_eq!(ts.runs(0), vec![vec![(0.0, 1.0)], vec![(2.0, 10.0), (3.0, 100.0)]]);
}

#[test]
fn test_categorical_values() {
    let values = array![["b".to_string()], ["a".to_string()], ["b".to_string()]];
    let y = YValues::categorical(&values);

    assert_eq!(y.categories(), Some(&["b".to_string(), "a".to_string()][..]));
    assert_eq!(y.values().column(0).to_vec(), vec![0.0, 1.0, 0.0]);

    let ts = timeseries(&[0.0, 1.0, 2.0], y, &TimeseriesOptions::default()).unwrap();
    assert_eq!(ts.y_range(), (-0.5, 1.5));
}

#[test]
fn test_legend_visibility() {
    let single = |labels: Vec<&str>| {
        let opts = TimeseriesOptions {
            legendlabels: Some(labels.into_iter().map(String::from).collect()),
            ..Default::default()
        };
        timeseries(&[0.0], YValues::Numeric(array![[1.0]]), &opts).unwrap()
    };
    assert!(single(vec![" "]).legend().is_none());
    assert_eq!(single(vec!["col #0"]).legend(), Some(&["col #0".to_string()][..]));
    assert!(single(vec![]).legend().is_none());
}
