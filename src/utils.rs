pub mod fill;
pub mod io;
pub mod labels;
pub mod loader;
pub mod time;

use crate::Seconds;
use ndarray::{Array2, Axis};

/// Mean of the finite values in each column. Columns without finite values give NaN.
pub fn column_means(values: &Array2<f64>) -> Vec<f64> {
    values
        .axis_iter(Axis(1))
        .map(|column| {
            // Accumulate (sum, count) over finite entries
            let (sum, count) = column
                .iter()
                .filter(|v| v.is_finite())
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

/// Subtracts the per-column mean in place and returns the means.
pub fn remove_column_means(values: &mut Array2<f64>) -> Vec<f64> {
    let means = column_means(values);
    for (mut column, &mean) in values.axis_iter_mut(Axis(1)).zip(means.iter()) {
        if mean.is_finite() {
            column.mapv_inplace(|v| v - mean);
        }
    }
    means
}

/// Spacings between consecutive times.
pub fn time_steps(time: &[Seconds]) -> Vec<Seconds> {
    time.windows(2).map(|w| w[1] - w[0]).collect()
}

#[test]
fn test_column_means_skip_nan() {
    use ndarray::array;

    let values = array![[1.0, f64::NAN], [3.0, f64::NAN], [f64::NAN, f64::NAN]];
    let means = column_means(&values);
    assert_eq!(means[0], 2.0);
    assert!(means[1].is_nan());
}

#[test]
fn test_remove_column_means() {
    use ndarray::array;

    let mut values = array![[1.0, 10.0], [3.0, f64::NAN], [2.0, 20.0]];
    let means = remove_column_means(&mut values);

    assert_eq!(means, vec![2.0, 15.0]);
    assert_eq!(values.column(0).to_vec(), vec![-1.0, 1.0, 0.0]);
    assert_eq!(values[[0, 1]], -5.0);
    assert!(values[[1, 1]].is_nan());
}

#[test]
fn test_time_steps() {
    assert_eq!(time_steps(&[0.0, 1.0, 3.0]), vec![1.0, 2.0]);
    assert!(time_steps(&[5.0]).is_empty());
}
