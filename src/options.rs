//! Plot options. Defaults live in the `Default` impls; user options arrive as a JSON
//! object that is merged over those defaults with [`setopts`].

use crate::error::{PlotError, Result};
use crate::heatmap::scale::Colormap;
use plotters::style::RGBColor;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::TryFrom;
use std::path::PathBuf;

/// Recursively merges `overrides` into `defaults`. Nested objects are merged key by
/// key, everything else is replaced.
pub fn setopts(defaults: Value, overrides: &Value) -> Value {
    match (defaults, overrides) {
        (Value::Object(mut merged), Value::Object(overrides)) => {
            for (key, value) in overrides {
                let current = merged.remove(key).unwrap_or(Value::Null);
                merged.insert(key.clone(), setopts(current, value));
            }
            Value::Object(merged)
        }
        (_, overrides) => overrides.clone(),
    }
}

/// Hatch patterns, named after the matplotlib hatch characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Hatch {
    #[default]
    None,
    /// `/`
    Forward,
    /// `\`
    Back,
    /// `x`
    Cross,
    /// `-`
    Horizontal,
    /// `|`
    Vertical,
    /// `+`
    Grid,
    /// `.`
    Dots,
}

impl TryFrom<String> for Hatch {
    type Error = PlotError;

    fn try_from(pattern: String) -> Result<Self> {
        // Repeated characters (e.g. "//") only mean "denser" in matplotlib.
        let mut chars = pattern.chars();
        let first = chars.next();
        if chars.any(|c| Some(c) != first) {
            return Err(PlotError::InvalidOption(format!(
                "hatch '{pattern}' mixes patterns"
            )));
        }
        match first {
            None => Ok(Hatch::None),
            Some('/') => Ok(Hatch::Forward),
            Some('\\') => Ok(Hatch::Back),
            Some('x') | Some('X') => Ok(Hatch::Cross),
            Some('-') => Ok(Hatch::Horizontal),
            Some('|') => Ok(Hatch::Vertical),
            Some('+') => Ok(Hatch::Grid),
            Some('.') | Some('o') | Some('O') => Ok(Hatch::Dots),
            Some(_) => Err(PlotError::InvalidOption(format!("unknown hatch '{pattern}'"))),
        }
    }
}

impl From<Hatch> for String {
    fn from(hatch: Hatch) -> String {
        match hatch {
            Hatch::None => "",
            Hatch::Forward => "/",
            Hatch::Back => "\\",
            Hatch::Cross => "x",
            Hatch::Horizontal => "-",
            Hatch::Vertical => "|",
            Hatch::Grid => "+",
            Hatch::Dots => ".",
        }
        .to_string()
    }
}

/// A color given either as `[r, g, b]` in `0..=1` or as a short matplotlib name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Rgb([f64; 3]),
    Named(String),
}

impl ColorSpec {
    pub fn to_rgb(&self) -> Result<RGBColor> {
        match self {
            ColorSpec::Rgb(rgb) => {
                if rgb.iter().any(|c| !(0.0..=1.0).contains(c)) {
                    return Err(PlotError::InvalidOption(format!(
                        "color components must be in 0..=1, got {rgb:?}"
                    )));
                }
                let [r, g, b] = rgb.map(|c| (c * 255.0).round() as u8);
                Ok(RGBColor(r, g, b))
            }
            ColorSpec::Named(name) => match name.to_lowercase().as_str() {
                "k" | "black" => Ok(RGBColor(0, 0, 0)),
                "w" | "white" => Ok(RGBColor(255, 255, 255)),
                "r" | "red" => Ok(RGBColor(255, 0, 0)),
                "g" | "green" => Ok(RGBColor(0, 128, 0)),
                "b" | "blue" => Ok(RGBColor(0, 0, 255)),
                "c" | "cyan" => Ok(RGBColor(0, 191, 191)),
                "m" | "magenta" => Ok(RGBColor(191, 0, 191)),
                "y" | "yellow" => Ok(RGBColor(191, 191, 0)),
                "gray" | "grey" => Ok(RGBColor(128, 128, 128)),
                "lightgray" | "lightgrey" => Ok(RGBColor(211, 211, 211)),
                other => Err(PlotError::InvalidOption(format!("unknown color '{other}'"))),
            },
        }
    }
}

/// How a region (gap or missing cell) is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillStyle {
    pub color: RGBColor,
    pub hatch: Hatch,
    pub hatch_color: RGBColor,
}

impl FillStyle {
    pub fn gap() -> Self {
        FillStyle {
            color: RGBColor(255, 255, 255),
            hatch: Hatch::None,
            hatch_color: RGBColor(0, 0, 0),
        }
    }

    pub fn missing() -> Self {
        FillStyle {
            color: RGBColor(200, 200, 200),
            hatch: Hatch::Forward,
            hatch_color: RGBColor(96, 96, 96),
        }
    }

    fn with(self, color: &Option<ColorSpec>, hatch: Option<Hatch>, hatch_color: &Option<ColorSpec>) -> Result<Self> {
        Ok(FillStyle {
            color: color.as_ref().map(ColorSpec::to_rgb).transpose()?.unwrap_or(self.color),
            hatch: hatch.unwrap_or(self.hatch),
            hatch_color: hatch_color
                .as_ref()
                .map(ColorSpec::to_rgb)
                .transpose()?
                .unwrap_or(self.hatch_color),
        })
    }
}

/// Options for [`crate::heatmap::heatmap`]. Unset fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapOptions {
    pub title: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub zlabel: Option<String>,
    pub logx: Option<bool>,
    pub logy: Option<bool>,
    pub logz: Option<bool>,
    pub fill: Option<f64>,
    pub categorical: Option<bool>,
    pub colormap: Option<Colormap>,
    pub transparent: Option<bool>,
    #[serde(rename = "nan.color")]
    pub nan_color: Option<ColorSpec>,
    #[serde(rename = "nan.hatch")]
    pub nan_hatch: Option<Hatch>,
    #[serde(rename = "nan.hatch.color")]
    pub nan_hatch_color: Option<ColorSpec>,
    #[serde(rename = "gap.color")]
    pub gap_color: Option<ColorSpec>,
    #[serde(rename = "gap.hatch")]
    pub gap_hatch: Option<Hatch>,
    #[serde(rename = "gap.hatch.color")]
    pub gap_hatch_color: Option<ColorSpec>,
}

impl HeatmapOptions {
    /// Fields set in `over` win; everything else is kept from `self`.
    pub fn merge(&self, over: &HeatmapOptions) -> HeatmapOptions {
        HeatmapOptions {
            title: over.title.clone().or_else(|| self.title.clone()),
            xlabel: over.xlabel.clone().or_else(|| self.xlabel.clone()),
            ylabel: over.ylabel.clone().or_else(|| self.ylabel.clone()),
            zlabel: over.zlabel.clone().or_else(|| self.zlabel.clone()),
            logx: over.logx.or(self.logx),
            logy: over.logy.or(self.logy),
            logz: over.logz.or(self.logz),
            fill: over.fill.or(self.fill),
            categorical: over.categorical.or(self.categorical),
            colormap: over.colormap.or(self.colormap),
            transparent: over.transparent.or(self.transparent),
            nan_color: over.nan_color.clone().or_else(|| self.nan_color.clone()),
            nan_hatch: over.nan_hatch.or(self.nan_hatch),
            nan_hatch_color: over.nan_hatch_color.clone().or_else(|| self.nan_hatch_color.clone()),
            gap_color: over.gap_color.clone().or_else(|| self.gap_color.clone()),
            gap_hatch: over.gap_hatch.or(self.gap_hatch),
            gap_hatch_color: over.gap_hatch_color.clone().or_else(|| self.gap_hatch_color.clone()),
        }
    }

    pub fn missing_style(&self) -> Result<FillStyle> {
        FillStyle::missing().with(&self.nan_color, self.nan_hatch, &self.nan_hatch_color)
    }

    pub fn gap_style(&self) -> Result<FillStyle> {
        FillStyle::gap().with(&self.gap_color, self.gap_hatch, &self.gap_hatch_color)
    }
}

/// Options for [`crate::timeseries::timeseries`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeseriesOptions {
    pub title: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub legendlabels: Option<Vec<String>>,
    pub logx: Option<bool>,
    pub logy: Option<bool>,
    pub nodata: Option<bool>,
    pub transparent: Option<bool>,
}

impl TimeseriesOptions {
    pub fn merge(&self, over: &TimeseriesOptions) -> TimeseriesOptions {
        TimeseriesOptions {
            title: over.title.clone().or_else(|| self.title.clone()),
            xlabel: over.xlabel.clone().or_else(|| self.xlabel.clone()),
            ylabel: over.ylabel.clone().or_else(|| self.ylabel.clone()),
            legendlabels: over.legendlabels.clone().or_else(|| self.legendlabels.clone()),
            logx: over.logx.or(self.logx),
            logy: over.logy.or(self.logy),
            nodata: over.nodata.or(self.nodata),
            transparent: over.transparent.or(self.transparent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
    Pdf,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
            ImageFormat::Pdf => "pdf",
        }
    }
}

/// Figure styling, keyed like the matplotlib rc parameters it mirrors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcParams {
    #[serde(rename = "savefig.dpi")]
    pub savefig_dpi: u32,
    #[serde(rename = "savefig.format")]
    pub savefig_format: ImageFormat,
    #[serde(rename = "savefig.transparent")]
    pub savefig_transparent: bool,
    #[serde(rename = "figure.figsize")]
    pub figure_figsize: (f64, f64),
    #[serde(rename = "axes.titlesize")]
    pub axes_titlesize: f64,
    #[serde(rename = "font.size")]
    pub font_size: f64,
    #[serde(rename = "font.family")]
    pub font_family: String,
}

impl Default for RcParams {
    fn default() -> Self {
        RcParams {
            savefig_dpi: 144,
            savefig_format: ImageFormat::Png,
            savefig_transparent: false,
            figure_figsize: (7.0, 3.0),
            axes_titlesize: 10.0,
            font_size: 10.0,
            font_family: String::from("serif"),
        }
    }
}

impl RcParams {
    /// Output size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = self.savefig_dpi as f64;
        (
            (self.figure_figsize.0 * dpi).round().max(1.0) as u32,
            (self.figure_figsize.1 * dpi).round().max(1.0) as u32,
        )
    }

    /// Converts a size in points to pixels at the output resolution.
    pub fn points_to_pixels(&self, points: f64) -> f64 {
        points * self.savefig_dpi as f64 / 72.0
    }
}

/// Options for [`crate::hapiplot::hapiplot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    pub logging: bool,
    pub saveimage: bool,
    pub returnimage: bool,
    pub useimagecache: bool,
    pub cachedir: Option<PathBuf>,

    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    pub zlabel: String,
    pub logx: bool,
    pub logy: bool,
    pub logz: bool,

    pub tsopts: TimeseriesOptions,
    pub hmopts: HeatmapOptions,

    #[serde(rename = "rcParams")]
    pub rc_params: RcParams,
}

impl Default for PlotOptions {
    fn default() -> Self {
        PlotOptions {
            logging: false,
            saveimage: false,
            returnimage: false,
            useimagecache: true,
            cachedir: None,
            title: String::new(),
            xlabel: String::new(),
            ylabel: String::new(),
            zlabel: String::new(),
            logx: false,
            logy: false,
            logz: false,
            tsopts: TimeseriesOptions::default(),
            hmopts: HeatmapOptions::default(),
            rc_params: RcParams::default(),
        }
    }
}

impl PlotOptions {
    /// Merges a user-supplied JSON object over the defaults.
    pub fn from_json(overrides: &Value) -> Result<PlotOptions> {
        if !overrides.is_object() && !overrides.is_null() {
            return Err(PlotError::InvalidOption(
                "options must be a JSON object".to_string(),
            ));
        }
        let defaults = serde_json::to_value(PlotOptions::default())?;
        Ok(serde_json::from_value(setopts(defaults, overrides))?)
    }

    pub fn from_json_str(overrides: &str) -> Result<PlotOptions> {
        PlotOptions::from_json(&serde_json::from_str(overrides)?)
    }
}

#[test]
fn test_setopts_merges_nested_objects() {
    use serde_json::json;

    let merged = setopts(
        json!({"a": 1, "rc": {"dpi": 144, "format": "png"}, "list": [1, 2]}),
        &json!({"rc": {"format": "svg"}, "list": [3], "new": true}),
    );

    assert_eq!(
        merged,
        json!({"a": 1, "rc": {"dpi": 144, "format": "svg"}, "list": [3], "new": true})
    );
}

#[test]
fn test_plot_options_from_json_keeps_unset_defaults() {
    let opts = PlotOptions::from_json_str(
        r#"{"logging": true, "rcParams": {"savefig.format": "svg"}, "hmopts": {"nan.hatch": "x", "gap.color": [1, 0, 1]}}"#,
    )
    .unwrap();

    assert!(opts.logging);
    assert!(opts.useimagecache);
    assert_eq!(opts.rc_params.savefig_format, ImageFormat::Svg);
    assert_eq!(opts.rc_params.savefig_dpi, 144);
    assert_eq!(opts.rc_params.pixel_size(), (1008, 432));
    assert_eq!(opts.hmopts.nan_hatch, Some(Hatch::Cross));
    assert_eq!(opts.hmopts.gap_style().unwrap().color, RGBColor(255, 0, 255));
    assert_eq!(opts.hmopts.missing_style().unwrap(), FillStyle::missing().with(&None, Some(Hatch::Cross), &None).unwrap());
}

#[test]
fn test_plot_options_reject_non_objects() {
    assert!(matches!(
        PlotOptions::from_json(&serde_json::json!([1, 2])),
        Err(PlotError::InvalidOption(_))
    ));
}

#[test]
fn test_heatmap_options_merge_prefers_override() {
    let base = HeatmapOptions {
        title: Some("base".into()),
        ylabel: Some("bins".into()),
        ..Default::default()
    };
    let over = HeatmapOptions {
        title: Some("over".into()),
        logz: Some(true),
        ..Default::default()
    };
    let merged = base.merge(&over);

    assert_eq!(merged.title.as_deref(), Some("over"));
    assert_eq!(merged.ylabel.as_deref(), Some("bins"));
    assert_eq!(merged.logz, Some(true));
}

#[test]
fn test_hatch_and_color_parsing() {
    assert_eq!(Hatch::try_from(String::from("//")).unwrap(), Hatch::Forward);
    assert_eq!(Hatch::try_from(String::new()).unwrap(), Hatch::None);
    assert!(Hatch::try_from(String::from("/x")).is_err());
    assert_eq!(String::from(Hatch::Back), "\\");

    assert_eq!(ColorSpec::Named("k".into()).to_rgb().unwrap(), RGBColor(0, 0, 0));
    assert_eq!(ColorSpec::Rgb([0.0, 1.0, 1.0]).to_rgb().unwrap(), RGBColor(0, 255, 255));
    assert!(ColorSpec::Rgb([2.0, 0.0, 0.0]).to_rgb().is_err());
    assert!(ColorSpec::Named("chartreuse".into()).to_rgb().is_err());
}
