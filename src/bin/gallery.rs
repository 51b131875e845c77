use anyhow::Context;
use hapiplot::figure::Figure;
use hapiplot::heatmap::axis::{Axis, AxisKind, AxisSpec};
use hapiplot::options::{ColorSpec, Hatch, HeatmapOptions, RcParams};
use hapiplot::{heatmap, Interval};
use log::info;
use ndarray::{array, Array2};

/// 2000-01-01T00:00:00Z
const T0: f64 = 946_684_800.0;
const NAN: f64 = f64::NAN;

/// Flat values describing `n` cells: centers or edges.
fn flat(values: &[f64], n: usize, kind: AxisKind) -> anyhow::Result<Axis> {
    let spec = AxisSpec::infer(values.to_vec(), n, "gallery")?;
    Ok(Axis::normalize(spec, kind)?)
}

fn ranges(ranges: &[Interval]) -> anyhow::Result<Axis> {
    Ok(Axis::normalize(AxisSpec::Ranges(ranges.to_vec()), AxisKind::Numeric)?)
}

fn categories(labels: &[&str]) -> anyhow::Result<Axis> {
    let labels = labels.iter().map(|l| l.to_string()).collect();
    Ok(Axis::normalize(AxisSpec::Categories(labels), AxisKind::Categorical)?)
}

fn grid(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |(r, c)| f(r, c))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Initialize output directory and render settings
    let outdir = std::path::Path::new("images");
    std::fs::create_dir_all(outdir)?;
    let rc = RcParams::default();
    let numeric = AxisKind::Numeric;
    let gaps = [(1.0, 2.5), (3.0, 4.0), (7.0, 8.0)];
    let with_nan = array![[1.0, 2.0, 3.0], [4.0, NAN, 6.0], [7.0, 8.0, 9.0]];

    let cases: Vec<(&str, Axis, Axis, Array2<f64>)> = vec![
        // Single cells
        ("0a_1x1_centers", flat(&[1.0], 1, numeric)?, flat(&[1.0], 1, numeric)?, array![[1.0]]),
        ("0b_1x1_row_edges", flat(&[1.0], 1, numeric)?, flat(&[0.0, 10.0], 1, numeric)?, array![[1.0]]),
        ("0c_1x1_edges", flat(&[0.0, 10.0], 1, numeric)?, flat(&[0.0, 5.0], 1, numeric)?, array![[1.0]]),
        // One row or one column
        ("1a_2x1_centers", flat(&[1.0], 1, numeric)?, flat(&[1.0, 2.0], 2, numeric)?, array![[1.0], [2.0]]),
        ("1b_2x1_row_edges", flat(&[1.0, 4.0], 1, numeric)?, flat(&[1.0, 2.0, 3.0], 2, numeric)?, array![[1.0], [2.0]]),
        ("1c_1x2_col_edges", flat(&[1.0, 2.0, 3.0], 2, numeric)?, flat(&[1.0], 1, numeric)?, array![[1.0, 2.0]]),
        ("1d_1x2_edges", flat(&[1.0, 3.0, 4.0], 2, numeric)?, flat(&[1.0, 2.5], 1, numeric)?, array![[1.0, 2.0]]),
        // Integer and float grids
        ("2a_2x2_ints", flat(&[1.0, 2.0], 2, numeric)?, flat(&[1.0, 5.0], 2, numeric)?, array![[1.0, 2.0], [4.0, 5.0]]),
        ("2b_3x3_ints", flat(&[1.0, 2.0, 3.0], 3, numeric)?, flat(&[1.0, 2.0, 3.0], 3, numeric)?, grid(3, 3, |r, c| (3 * r + c + 1) as f64)),
        (
            "2c_10x10_ints",
            flat(&(1..=10).map(f64::from).collect::<Vec<_>>(), 10, numeric)?,
            flat(&(1..=10).map(f64::from).collect::<Vec<_>>(), 10, numeric)?,
            grid(10, 10, |r, c| (10 * r + c + 1) as f64),
        ),
        (
            "3_10x10_floats",
            flat(&(1..=10).map(|v| 1.5 + v as f64).collect::<Vec<_>>(), 10, numeric)?,
            flat(&(1..=10).map(f64::from).collect::<Vec<_>>(), 10, numeric)?,
            grid(10, 10, |r, c| (10 * r + c) as f64 + 1.5),
        ),
        // Non-uniform centers (logged as warnings)
        ("4a_nonuniform_rows", flat(&[1.0, 2.0, 3.0], 3, numeric)?, flat(&[1.0, 2.5, 3.0], 3, numeric)?, grid(3, 3, |r, c| (3 * r + c + 1) as f64)),
        ("4c_nonuniform_both", flat(&[1.0, 2.5, 3.0], 3, numeric)?, flat(&[1.0, 2.5, 3.0], 3, numeric)?, grid(3, 3, |r, c| (3 * r + c + 1) as f64)),
        // Gaps between ranges
        ("5a_row_gap", flat(&[1.0, 2.0], 2, numeric)?, ranges(&[(1.0, 2.0), (2.5, 3.0)])?, array![[1.0, 2.0], [4.0, 5.0]]),
        ("5b_col_and_row_gaps", ranges(&[(1.0, 2.0), (3.0, 4.0)])?, ranges(&[(1.0, 2.0), (2.5, 3.0)])?, array![[1.0, 2.0], [4.0, 5.0]]),
        ("5d_3x3_gaps", ranges(&gaps)?, ranges(&gaps)?, grid(3, 3, |r, c| (3 * r + c + 1) as f64)),
        // No data at all
        ("6a_all_nan", flat(&[1.0, 2.0, 3.0], 3, numeric)?, flat(&[1.0, 2.0, 3.0], 3, numeric)?, Array2::from_elem((3, 3), NAN)),
        ("6c_all_nan_gaps", ranges(&gaps)?, ranges(&gaps)?, Array2::from_elem((3, 3), NAN)),
        // Missing values, time and categorical axes
        ("7a_nan_with_gaps", ranges(&gaps)?, ranges(&gaps)?, with_nan.clone()),
        (
            "7c_time_gaps",
            Axis::normalize(
                AxisSpec::Ranges(vec![(T0, T0 + 60.0), (T0 + 120.0, T0 + 180.0), (T0 + 300.0, T0 + 360.0)]),
                AxisKind::Time,
            )?,
            ranges(&gaps)?,
            with_nan.clone(),
        ),
        ("7d_categorical_rows", ranges(&[(0.0, 1.0), (2.0, 3.0), (4.0, 5.0)])?, categories(&["A", "B", "C"])?, with_nan.clone()),
        ("7e_categorical_both", categories(&["First", "Second", "Third"])?, categories(&["A", "B", "C"])?, with_nan),
        // Awkward value distributions
        ("10b_two_levels", flat(&[1.0, 2.0, 3.0, 4.0], 4, numeric)?, flat(&[1.0, 2.0, 3.0, 4.0], 4, numeric)?, grid(4, 4, |_, c| if c % 2 == 0 { 0.0 } else { 3.0 })),
        (
            "10c_large_values",
            flat(&[1.0, 2.0, 3.0, 4.0], 4, numeric)?,
            flat(&[1.0, 2.0, 3.0, 4.0], 4, numeric)?,
            array![[0.0, 1e9, 0.0, 10.0], [0.0, 10.0, 0.0, 10.0], [0.0, 10.0, 0.0, 10.0], [0.0, 10.0, 0.0, 10.0]],
        ),
    ];

    // Render each case with the default styles, then the gapped ones with custom styles
    for (name, x, y, z) in cases {
        let opts = HeatmapOptions {
            title: Some(name.replace('_', " ")),
            ..Default::default()
        };
        let figure = Figure::Heatmap(heatmap(x.clone(), y.clone(), &z, &opts)?);
        let path = outdir.join(format!("heatmap_{name}.png"));
        figure.save(&path, &rc).with_context(|| format!("rendering {name}"))?;
        info!("wrote {}", path.display());

        if !x.gaps().is_empty() || !y.gaps().is_empty() {
            let styled = HeatmapOptions {
                title: Some(format!("{} (styled gaps)", name.replace('_', " "))),
                gap_color: Some(ColorSpec::Named("lightgray".to_string())),
                gap_hatch: Some(Hatch::Back),
                nan_color: Some(ColorSpec::Rgb([1.0, 1.0, 1.0])),
                nan_hatch: Some(Hatch::Cross),
                colormap: Some(hapiplot::heatmap::scale::Colormap::Copper),
                ..Default::default()
            };
            let figure = Figure::Heatmap(heatmap(x, y, &z, &styled)?);
            let path = outdir.join(format!("heatmap_{name}_styled.png"));
            figure.save(&path, &rc).with_context(|| format!("rendering styled {name}"))?;
            info!("wrote {}", path.display());
        }
    }

    Ok(())
}
