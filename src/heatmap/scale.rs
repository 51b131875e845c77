use crate::constants::MAX_DISCRETE_LEVELS;
use crate::Interval;
use itertools::{Itertools, MinMaxResult};
use plotters::style::colors::colormaps::{BlackWhite, Bone, ColorMap, Copper, ViridisRGB};
use plotters::style::RGBColor;
use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Viridis,
    Bone,
    Copper,
    BlackWhite,
}

impl Colormap {
    /// Color at `t` in `0..=1`.
    pub fn sample(&self, t: f64) -> RGBColor {
        let t = t.clamp(0.0, 1.0);
        match self {
            Colormap::Viridis => ViridisRGB.get_color(t),
            Colormap::Bone => Bone.get_color(t),
            Colormap::Copper => Copper.get_color(t),
            Colormap::BlackWhite => BlackWhite.get_color(t),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScaleKind {
    Linear,
    Log,
    /// One color per level actually present in the data, in increasing order.
    Discrete(Vec<f64>),
}

/// Maps finite z values to colors.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    kind: ScaleKind,
    min: f64,
    max: f64,
    colormap: Colormap,
}

impl ColorScale {
    /// Builds a scale spanning the finite (and, for log scales, positive) values.
    /// `categorical = None` picks a discrete scale when every value is an integer
    /// and there are few distinct values.
    pub fn from_values(
        values: impl IntoIterator<Item = f64>,
        logz: bool,
        categorical: Option<bool>,
        colormap: Colormap,
    ) -> ColorScale {
        let values: Vec<f64> = values
            .into_iter()
            .filter(|v| v.is_finite() && (!logz || *v > 0.0))
            .collect();

        if !logz && categorical != Some(false) {
            let mut levels: Vec<f64> = values.clone();
            levels.sort_by(f64::total_cmp);
            levels.dedup();
            let integral = values.iter().all(|v| v.fract() == 0.0);
            let wanted = match categorical {
                Some(forced) => forced,
                None => integral && levels.len() <= MAX_DISCRETE_LEVELS,
            };
            if wanted && !levels.is_empty() {
                let (min, max) = (levels[0], levels[levels.len() - 1]);
                return ColorScale {
                    kind: ScaleKind::Discrete(levels),
                    min,
                    max,
                    colormap,
                };
            }
        }

        let (min, max) = match values.iter().minmax() {
            MinMaxResult::NoElements => (if logz { 1.0 } else { 0.0 }, if logz { 10.0 } else { 1.0 }),
            MinMaxResult::OneElement(&v) => (v, v),
            MinMaxResult::MinMax(&lo, &hi) => (lo, hi),
        };

        let (min, max) = match (logz, min == max) {
            (false, true) => (min - 0.5, max + 0.5),
            (true, true) => (min / 10f64.sqrt(), max * 10f64.sqrt()),
            _ => (min, max),
        };

        ColorScale {
            kind: if logz { ScaleKind::Log } else { ScaleKind::Linear },
            min,
            max,
            colormap,
        }
    }

    pub fn kind(&self) -> &ScaleKind {
        &self.kind
    }

    pub fn colormap(&self) -> Colormap {
        self.colormap
    }

    /// Value range covered by the scale.
    pub fn range(&self) -> Interval {
        (self.min, self.max)
    }

    pub fn levels(&self) -> Option<&[f64]> {
        match &self.kind {
            ScaleKind::Discrete(levels) => Some(levels),
            _ => None,
        }
    }

    pub fn is_log(&self) -> bool {
        matches!(self.kind, ScaleKind::Log)
    }

    /// Position of `v` along the colormap, or `None` when it has no color.
    pub fn normalize(&self, v: f64) -> Option<f64> {
        if !v.is_finite() {
            return None;
        }
        match &self.kind {
            ScaleKind::Linear => Some(((v - self.min) / (self.max - self.min)).clamp(0.0, 1.0)),
            ScaleKind::Log => {
                if v <= 0.0 {
                    return None;
                }
                let (lo, hi) = (self.min.log10(), self.max.log10());
                Some(((v.log10() - lo) / (hi - lo)).clamp(0.0, 1.0))
            }
            ScaleKind::Discrete(levels) => {
                let index = levels.iter().position(|&level| level == v)?;
                Some(level_position(index, levels.len()))
            }
        }
    }

    pub fn color(&self, v: f64) -> Option<RGBColor> {
        self.normalize(v).map(|t| self.colormap.sample(t))
    }

    /// Color of the `index`th discrete level.
    pub fn level_color(&self, index: usize) -> Option<RGBColor> {
        let levels = self.levels()?;
        (index < levels.len()).then(|| self.colormap.sample(level_position(index, levels.len())))
    }

    /// Roughly `n` readable tick values within the range. Log scales tick at powers of ten.
    pub fn ticks(&self, n: usize) -> Vec<f64> {
        match &self.kind {
            ScaleKind::Discrete(levels) => levels.clone(),
            ScaleKind::Log => {
                let lo = (self.min.log10() - 1e-9).ceil() as i32;
                let hi = (self.max.log10() + 1e-9).floor() as i32;
                if hi - lo >= 1 {
                    (lo..=hi).map(|p| 10f64.powi(p)).collect()
                } else {
                    nice_ticks(self.min, self.max, n)
                }
            }
            ScaleKind::Linear => nice_ticks(self.min, self.max, n),
        }
    }
}

fn level_position(index: usize, count: usize) -> f64 {
    if count <= 1 {
        0.5
    } else {
        index as f64 / (count - 1) as f64
    }
}

/// Ticks at multiples of 1, 2 or 5 times a power of ten.
pub fn nice_ticks(min: f64, max: f64, n: usize) -> Vec<f64> {
    if !(max > min) || n < 2 {
        return vec![min];
    }
    let raw = (max - min) / (n - 1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|&s| s >= raw)
        .unwrap_or(10.0 * magnitude);

    let first = (min / step).ceil() as i64;
    let last = (max / step).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}

#[test]
fn test_linear_scale_spans_finite_values() {
    let scale = ColorScale::from_values(
        vec![0.5, f64::NAN, 2.5, 1.5, f64::INFINITY],
        false,
        None,
        Colormap::Viridis,
    );

    assert_eq!(scale.kind(), &ScaleKind::Linear);
    assert_eq!(scale.range(), (0.5, 2.5));
    assert_eq!(scale.normalize(1.5), Some(0.5));
    assert_eq!(scale.normalize(f64::NAN), None);
    assert_eq!(scale.color(0.5), Some(Colormap::Viridis.sample(0.0)));
    assert_eq!(scale.color(2.5), Some(Colormap::Viridis.sample(1.0)));
}

#[test]
fn test_integer_values_get_discrete_levels() {
    let scale = ColorScale::from_values(vec![0.0, 3.0, 0.0, 3.0], false, None, Colormap::Viridis);

    assert_eq!(scale.levels(), Some(&[0.0, 3.0][..]));
    assert_eq!(scale.normalize(0.0), Some(0.0));
    assert_eq!(scale.normalize(3.0), Some(1.0));
    // Levels that are absent from the data have no color.
    assert_eq!(scale.normalize(1.0), None);
}

#[test]
fn test_many_integer_values_stay_continuous() {
    let scale = ColorScale::from_values((1..=100).map(f64::from), false, None, Colormap::Viridis);
    assert_eq!(scale.kind(), &ScaleKind::Linear);
    assert_eq!(scale.range(), (1.0, 100.0));

    let forced = ColorScale::from_values(vec![1.0, 2.0], false, Some(false), Colormap::Viridis);
    assert_eq!(forced.kind(), &ScaleKind::Linear);
}

#[test]
fn test_log_scale_ignores_non_positive() {
    let scale = ColorScale::from_values(vec![-1.0, 0.0, 1.0, 1000.0], true, None, Colormap::Viridis);

    assert!(scale.is_log());
    assert_eq!(scale.range(), (1.0, 1000.0));
    assert_eq!(scale.normalize(0.0), None);
    assert_eq!(scale.ticks(5), vec![1.0, 10.0, 100.0, 1000.0]);
}

#[test]
fn test_degenerate_and_empty_ranges() {
    let constant = ColorScale::from_values(vec![2.5, 2.5], false, None, Colormap::Viridis);
    assert_eq!(constant.range(), (2.0, 3.0));

    let empty = ColorScale::from_values(vec![f64::NAN; 4], false, None, Colormap::Viridis);
    assert_eq!(empty.range(), (0.0, 1.0));
    assert_eq!(empty.kind(), &ScaleKind::Linear);
}

#[test]
fn test_nice_ticks() {
    assert_eq!(nice_ticks(0.0, 10.0, 6), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    assert_eq!(nice_ticks(1.5, 100.5, 5), vec![50.0, 100.0]);
    assert_eq!(nice_ticks(3.0, 3.0, 5), vec![3.0]);
}
