use crate::error::{PlotError, Result};
use ndarray::{ArrayBase, DataMut, Dimension};

/// Parses a HAPI fill value. `"nan"` in any case means NaN.
pub fn parse_fill(fill: &str) -> Result<f64> {
    let fill = fill.trim();
    if fill.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    fill.parse::<f64>()
        .map_err(|_| PlotError::InvalidMeta(format!("fill value '{fill}' is not a number")))
}

/// Whether `v` is the fill value. Values written out in single precision are
/// matched too, since they no longer compare equal to the double-precision fill.
pub fn is_fill(v: f64, fill: f64) -> bool {
    if fill.is_nan() {
        return v.is_nan();
    }
    v == fill || v == (fill as f32) as f64
}

/// Replaces fill entries with NaN in place and returns how many were replaced.
pub fn fill_to_nan<S, D>(values: &mut ArrayBase<S, D>, fill: f64) -> usize
where
    S: DataMut<Elem = f64>,
    D: Dimension,
{
    let mut replaced = 0;
    values.map_inplace(|v| {
        if !v.is_nan() && is_fill(*v, fill) {
            *v = f64::NAN;
            replaced += 1;
        }
    });
    replaced
}

#[test]
fn test_parse_fill() {
    assert!(parse_fill("NaN").unwrap().is_nan());
    assert!(parse_fill("nan").unwrap().is_nan());
    assert_eq!(parse_fill("-1e31").unwrap(), -1e31);
    assert_eq!(parse_fill(" 0 ").unwrap(), 0.0);
    assert!(matches!(parse_fill("none"), Err(PlotError::InvalidMeta(_))));
}

#[test]
fn test_single_precision_fill_matches() {
    let fill = -1e31;
    assert!(is_fill(fill, fill));
    assert!(is_fill((fill as f32) as f64, fill));
    assert!(!is_fill(-1e30, fill));
    assert!(is_fill(f64::NAN, f64::NAN));
    assert!(!is_fill(1.0, f64::NAN));
}

#[test]
fn test_fill_to_nan_in_place() {
    use ndarray::array;

    let fill = -1e31;
    let mut values = array![[1.0, fill], [(fill as f32) as f64, f64::NAN]];
    assert_eq!(fill_to_nan(&mut values, fill), 2);
    assert_eq!(values[[0, 0]], 1.0);
    assert!(values[[0, 1]].is_nan() && values[[1, 0]].is_nan() && values[[1, 1]].is_nan());

    let mut column = ndarray::Array1::from(vec![-1.0, 2.0]);
    assert_eq!(fill_to_nan(&mut column, -1.0), 1);
}
