//! Complete figures: title, axes, tick labels, the heatmap colorbar or the time
//! series legend, encoded as PNG or SVG.

use crate::constants::{COLORBAR_AREA_WIDTH, COLORBAR_STEPS};
use crate::error::{PlotError, Result};
use crate::heatmap::axis::{Axis, AxisKind};
use crate::heatmap::raster::draw_cells;
use crate::heatmap::scale::ColorScale;
use crate::heatmap::Heatmap;
use crate::options::{ImageFormat, RcParams};
use crate::timeseries::{Timeseries, YValues};
use crate::utils::time::{format_time, tick_format};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use plotters::coord::combinators::BindKeyPoints;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

/// Resolution the pixel constants are given at.
const REFERENCE_DPI: f64 = 144.0;

lazy_static! {
    // matplotlib's default color cycle
    static ref LINE_COLORS: Vec<RGBColor> = vec![
        RGBColor(31, 119, 180),
        RGBColor(255, 127, 14),
        RGBColor(44, 160, 44),
        RGBColor(214, 39, 40),
        RGBColor(148, 103, 189),
        RGBColor(140, 86, 75),
        RGBColor(227, 119, 194),
        RGBColor(127, 127, 127),
        RGBColor(188, 189, 34),
        RGBColor(23, 190, 207),
    ];
}

/// A plot ready to be rendered.
#[derive(Debug, Clone)]
pub enum Figure {
    Heatmap(Heatmap),
    Timeseries(Timeseries),
}

impl Figure {
    fn is_transparent(&self) -> bool {
        match self {
            Figure::Heatmap(heatmap) => heatmap.is_transparent(),
            Figure::Timeseries(timeseries) => timeseries.is_transparent(),
        }
    }

    /// Encodes the figure in `rc.savefig_format`, sized by `figure.figsize` and `savefig.dpi`.
    pub fn render(&self, rc: &RcParams) -> Result<Vec<u8>> {
        match rc.savefig_format {
            ImageFormat::Png => self.render_png(rc),
            ImageFormat::Svg => self.render_svg(rc),
            ImageFormat::Pdf => Err(PlotError::UnsupportedFormat("pdf".to_string())),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>, rc: &RcParams) -> Result<()> {
        let bytes = self.render(rc)?;
        Ok(std::fs::write(path, bytes)?)
    }

    fn render_png(&self, rc: &RcParams) -> Result<Vec<u8>> {
        let (width, height) = rc.pixel_size();
        let mut buffer = vec![255u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            self.draw(&root, rc, true)?;
            root.present().map_err(PlotError::render)?;
        }

        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(&buffer, width, height, ColorType::Rgb8)?;
        Ok(png)
    }

    fn render_svg(&self, rc: &RcParams) -> Result<Vec<u8>> {
        let background = !(rc.savefig_transparent || self.is_transparent());
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, rc.pixel_size()).into_drawing_area();
            self.draw(&root, rc, background)?;
            root.present().map_err(PlotError::render)?;
        }
        Ok(svg.into_bytes())
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        rc: &RcParams,
        background: bool,
    ) -> Result<()> {
        if background {
            root.fill(&WHITE).map_err(PlotError::render)?;
        }
        let style = Style::new(rc);
        match self {
            Figure::Heatmap(heatmap) => draw_heatmap(root, heatmap, &style),
            Figure::Timeseries(timeseries) => draw_timeseries(root, timeseries, &style),
        }
    }
}

/// Font sizes and spacings in pixels at the output resolution.
struct Style {
    family: String,
    title: f64,
    label: f64,
    tick: f64,
    scale: f64,
}

impl Style {
    fn new(rc: &RcParams) -> Self {
        Style {
            family: rc.font_family.clone(),
            title: rc.points_to_pixels(rc.axes_titlesize),
            label: rc.points_to_pixels(rc.font_size),
            tick: rc.points_to_pixels(rc.font_size * 0.9),
            scale: rc.savefig_dpi as f64 / REFERENCE_DPI,
        }
    }

    fn font(&self, size: f64) -> TextStyle<'_> {
        TextStyle::from((self.family.as_str(), size).into_font())
    }

    /// Pixels at 144 dpi to pixels at the output resolution.
    fn px(&self, pixels: f64) -> u32 {
        (pixels * self.scale).round().max(0.0) as u32
    }

    fn x_label_area(&self) -> u32 {
        (self.tick * 1.6 + self.label * 1.6).round() as u32
    }

    fn y_label_area(&self) -> u32 {
        (self.tick * 4.5 + self.label * 1.6).round() as u32
    }
}

/// How tick values along one axis are written.
enum TickLabels<'a> {
    Number { log: bool },
    Time { pattern: &'static str },
    Categories(&'a [String]),
}

impl<'a> TickLabels<'a> {
    fn for_axis(axis: &'a Axis, log: bool) -> Self {
        match (axis.kind(), axis.labels()) {
            (AxisKind::Categorical, Some(labels)) => TickLabels::Categories(labels),
            (AxisKind::Time, _) => {
                let (lo, hi) = axis.extent();
                TickLabels::Time {
                    pattern: tick_format(hi - lo),
                }
            }
            _ => TickLabels::Number { log },
        }
    }

    fn format(&self, v: f64) -> String {
        match self {
            TickLabels::Number { log: false } => format_tick(v),
            TickLabels::Number { log: true } => format_tick(10f64.powf(v)),
            TickLabels::Time { pattern } => format_time(v, pattern),
            TickLabels::Categories(labels) => {
                let k = v.round();
                if (v - k).abs() > 1e-6 || k < 0.0 {
                    return String::new();
                }
                labels.get(k as usize).cloned().unwrap_or_default()
            }
        }
    }

    fn count(&self) -> usize {
        match self {
            TickLabels::Categories(labels) => labels.len().clamp(1, 30),
            _ => 6,
        }
    }
}

/// Tick values with at most four significant digits, exponent notation outside
/// `[1e-3, 1e5)`.
fn format_tick(v: f64) -> String {
    if v == 0.0 || !v.is_finite() {
        return format!("{v}");
    }
    let magnitude = v.abs();
    if !(1e-3..1e5).contains(&magnitude) {
        return format!("{v:.1e}");
    }
    let decimals = (3 - magnitude.log10().floor() as i32).max(0) as usize;
    let text = format!("{v:.decimals$}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

/// plotters writes axis descriptions on one line.
fn one_line(label: &str) -> String {
    label.replace('\n', " ")
}

/// Draws the (possibly multi-line) title at the top of `area` and returns the area below it.
fn draw_title<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    style: &Style,
) -> Result<DrawingArea<DB, Shift>> {
    let pad = style.px(8.0);
    if title.trim().is_empty() {
        return Ok(area.margin(pad, 0, 0, 0));
    }

    let line_height = (style.title * 1.25).round() as u32;
    let lines: Vec<&str> = title.lines().collect();
    let height = pad + line_height * lines.len() as u32;
    let (top, body) = area.split_vertically(height);

    let center = top.dim_in_pixel().0 as i32 / 2;
    let font = style.font(style.title).pos(Pos::new(HPos::Center, VPos::Top));
    for (i, line) in lines.iter().enumerate() {
        let y = (pad + line_height * i as u32) as i32;
        top.draw(&Text::new(line.to_string(), (center, y), font.clone()))
            .map_err(PlotError::render)?;
    }
    Ok(body)
}

fn draw_heatmap<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    heatmap: &Heatmap,
    style: &Style,
) -> Result<()> {
    let body = draw_title(root, &heatmap.title, style)?;
    let width = body.dim_in_pixel().0;
    let (plot_area, bar_area) =
        body.split_horizontally(width.saturating_sub(style.px(COLORBAR_AREA_WIDTH as f64)));

    // Axes
    let ((x0, x1), (y0, y1)) = heatmap.display_ranges();
    let x_ticks = TickLabels::for_axis(heatmap.mesh().x(), heatmap.logx());
    let y_ticks = TickLabels::for_axis(heatmap.mesh().y(), heatmap.logy());
    let mut chart = ChartBuilder::on(&plot_area)
        .margin(style.px(10.0))
        .x_label_area_size(style.x_label_area())
        .y_label_area_size(style.y_label_area())
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(PlotError::render)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(x_ticks.count())
        .y_labels(y_ticks.count())
        .x_label_formatter(&|v| x_ticks.format(*v))
        .y_label_formatter(&|v| y_ticks.format(*v))
        .x_desc(one_line(&heatmap.xlabel))
        .y_desc(one_line(&heatmap.ylabel))
        .label_style(style.font(style.tick))
        .axis_desc_style(style.font(style.label))
        .draw()
        .map_err(PlotError::render)?;

    // Cells
    draw_cells(&chart.plotting_area().strip_coord_spec(), heatmap)?;

    draw_colorbar(&bar_area, heatmap, style)
}

/// Colorbar tick positions in bar coordinates: one per level for discrete
/// scales, otherwise the scale ticks (log10 of them for log scales).
fn colorbar_ticks(scale: &ColorScale) -> Vec<f64> {
    match scale.levels() {
        Some(levels) => (0..levels.len()).map(|k| k as f64).collect(),
        None => {
            let (min, max) = scale.range();
            let display = |v: f64| if scale.is_log() { v.log10() } else { v };
            let (lo, hi) = (display(min), display(max));
            let tolerance = (hi - lo).abs() * 1e-9;
            scale
                .ticks(6)
                .into_iter()
                .map(display)
                .filter(|t| *t >= lo - tolerance && *t <= hi + tolerance)
                .collect()
        }
    }
}

/// Continuous colorbars are drawn as stacked steps, discrete ones as one block per level.
fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    heatmap: &Heatmap,
    style: &Style,
) -> Result<()> {
    let scale = heatmap.scale();
    let (min, max) = scale.range();
    let (lo, hi) = match scale.levels() {
        Some(levels) => (-0.5, levels.len() as f64 - 0.5),
        None if scale.is_log() => (min.log10(), max.log10()),
        None => (min, max),
    };

    let mut bar = ChartBuilder::on(area)
        .margin_top(style.px(10.0))
        .margin_bottom(style.x_label_area() + style.px(10.0))
        .margin_left(style.px(10.0))
        .set_label_area_size(LabelAreaPosition::Left, 0)
        .set_label_area_size(LabelAreaPosition::Right, style.px(COLORBAR_AREA_WIDTH as f64 * 0.7))
        .build_cartesian_2d(0.0..1.0, (lo..hi).with_key_points(colorbar_ticks(scale)))
        .map_err(PlotError::render)?;

    match scale.levels() {
        Some(levels) => {
            let blocks = (0..levels.len()).filter_map(|k| {
                let color = scale.level_color(k)?;
                let k = k as f64;
                Some(Rectangle::new([(0.0, k - 0.5), (1.0, k + 0.5)], color.filled()))
            });
            bar.draw_series(blocks).map_err(PlotError::render)?;
        }
        None => {
            let step = (hi - lo) / COLORBAR_STEPS as f64;
            let blocks = (0..COLORBAR_STEPS).map(|i| {
                let t = (i as f64 + 0.5) / COLORBAR_STEPS as f64;
                let v = lo + step * i as f64;
                Rectangle::new([(0.0, v), (1.0, v + step)], scale.colormap().sample(t).filled())
            });
            bar.draw_series(blocks).map_err(PlotError::render)?;
        }
    }

    let levels = scale.levels().unwrap_or(&[]);
    let format = |v: &f64| match scale.levels() {
        Some(_) => {
            let k = v.round();
            if (v - k).abs() > 1e-6 || k < 0.0 {
                String::new()
            } else {
                levels.get(k as usize).map(|l| format_tick(*l)).unwrap_or_default()
            }
        }
        None if scale.is_log() => format_tick(10f64.powf(*v)),
        None => format_tick(*v),
    };
    let count = if levels.is_empty() { 6 } else { levels.len() };

    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(count)
        .y_label_formatter(&format)
        .y_desc(one_line(heatmap.zlabel.trim()))
        .label_style(style.font(style.tick))
        .axis_desc_style(style.font(style.label))
        .draw()
        .map_err(PlotError::render)?;

    Ok(())
}

fn draw_timeseries<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    timeseries: &Timeseries,
    style: &Style,
) -> Result<()> {
    let body = draw_title(root, &timeseries.title, style)?;
    let body = body.margin(0, 0, 0, style.px(20.0));
    let log = |v: f64| if timeseries.logy() { v.log10() } else { v };

    // Axes
    let (x0, x1) = timeseries.x_range();
    let (y0, y1) = timeseries.y_range();
    let x_ticks = TickLabels::Time {
        pattern: tick_format(x1 - x0),
    };
    let y_ticks = match timeseries.y() {
        YValues::Categorical { categories, .. } => TickLabels::Categories(categories),
        YValues::Time(_) => TickLabels::Time {
            pattern: tick_format(y1 - y0),
        },
        YValues::Numeric(_) => TickLabels::Number {
            log: timeseries.logy(),
        },
    };
    let (y0, y1) = (log(y0), log(y1));

    let mut chart = ChartBuilder::on(&body)
        .margin(style.px(10.0))
        .x_label_area_size(style.x_label_area())
        .y_label_area_size(style.y_label_area())
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(PlotError::render)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(x_ticks.count())
        .y_labels(y_ticks.count())
        .x_label_formatter(&|v| x_ticks.format(*v))
        .y_label_formatter(&|v| y_ticks.format(*v))
        .x_desc(one_line(&timeseries.xlabel))
        .y_desc(one_line(&timeseries.ylabel))
        .label_style(style.font(style.tick))
        .axis_desc_style(style.font(style.label))
        .draw()
        .map_err(PlotError::render)?;

    if timeseries.nodata() {
        let font = style.font(style.label).pos(Pos::new(HPos::Center, VPos::Center));
        chart
            .plotting_area()
            .draw(&Text::new(
                "No data in interval",
                ((x0 + x1) / 2.0, (y0 + y1) / 2.0),
                font,
            ))
            .map_err(PlotError::render)?;
        return Ok(());
    }

    // Lines, one color per component
    let line_width = style.px(2.0).max(1);
    let legend = timeseries.legend();
    for j in 0..timeseries.components() {
        let color = LINE_COLORS[j % LINE_COLORS.len()];
        let runs: Vec<Vec<(f64, f64)>> = timeseries
            .runs(j)
            .into_iter()
            .map(|run| run.into_iter().map(|(t, v)| (t, log(v))).collect())
            .collect();

        // An empty series carries the legend entry, so components without data still get one.
        let series = chart
            .draw_series(LineSeries::new(Vec::<(f64, f64)>::new(), color.stroke_width(line_width)))
            .map_err(PlotError::render)?;
        if let Some(label) = legend.and_then(|labels| labels.get(j)) {
            series
                .label(label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        for run in runs {
            if run.len() == 1 {
                chart
                    .draw_series(std::iter::once(Circle::new(run[0], line_width + 1, color.filled())))
                    .map_err(PlotError::render)?;
            } else {
                chart
                    .draw_series(LineSeries::new(run, color.stroke_width(line_width)))
                    .map_err(PlotError::render)?;
            }
        }
    }

    if legend.is_some() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font(style.font(style.tick))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(PlotError::render)?;
    }

    Ok(())
}

#[cfg(test)]
use crate::heatmap::axis::AxisSpec;
#[cfg(test)]
use crate::options::{HeatmapOptions, TimeseriesOptions};
#[cfg(test)]
use ndarray::array;

#[cfg(test)]
fn small_heatmap() -> Figure {
    let x = Axis::normalize(AxisSpec::Centers(vec![0.0, 60.0, 120.0]), AxisKind::Time).unwrap();
    let y = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.0]), AxisKind::Numeric).unwrap();
    let z = array![[1.0, 2.0, 3.0], [4.0, f64::NAN, 6.5]];
    let opts = HeatmapOptions {
        title: Some("server\ndataset | spectra".to_string()),
        zlabel: Some(" [counts]".to_string()),
        ..Default::default()
    };
    Figure::Heatmap(crate::heatmap::heatmap(x, y, &z, &opts).unwrap())
}

#[test]
fn test_format_tick() {
    assert_eq!(format_tick(0.0), "0");
    assert_eq!(format_tick(1.0), "1");
    assert_eq!(format_tick(2.5), "2.5");
    assert_eq!(format_tick(1234.0), "1234");
    assert_eq!(format_tick(0.01234), "0.01234");
    assert_eq!(format_tick(1e6), "1.0e6");
    assert_eq!(format_tick(-0.5), "-0.5");
}

#[test]
fn test_categorical_tick_labels() {
    let labels = vec!["a".to_string(), "b".to_string()];
    let ticks = TickLabels::Categories(&labels);
    assert_eq!(ticks.format(1.0), "b");
    assert_eq!(ticks.format(0.5), "");
    assert_eq!(ticks.format(2.0), "");
    assert_eq!(ticks.count(), 2);
}

#[test]
fn test_colorbar_ticks_label_every_level() {
    let x = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.0]), AxisKind::Numeric).unwrap();
    let y = Axis::normalize(AxisSpec::Centers(vec![1.0, 2.0]), AxisKind::Numeric).unwrap();
    let opts = HeatmapOptions::default();

    let discrete = crate::heatmap::heatmap(x.clone(), y.clone(), &array![[1.0, 2.0], [5.0, 5.0]], &opts).unwrap();
    assert_eq!(discrete.scale().levels(), Some(&[1.0, 2.0, 5.0][..]));
    assert_eq!(colorbar_ticks(discrete.scale()), vec![0.0, 1.0, 2.0]);

    let continuous = crate::heatmap::heatmap(x, y, &array![[0.5, 1.5], [2.5, 4.5]], &opts).unwrap();
    let ticks = colorbar_ticks(continuous.scale());
    assert!(!ticks.is_empty());
    assert!(ticks.iter().all(|t| (0.5..=4.5).contains(t)), "{ticks:?}");
}

#[test]
fn test_pdf_is_unsupported() {
    let rc = RcParams {
        savefig_format: ImageFormat::Pdf,
        ..Default::default()
    };
    assert!(matches!(
        small_heatmap().render(&rc),
        Err(PlotError::UnsupportedFormat(_))
    ));
}

#[test]
#[ignore] /* draws text, so needs the system serif font */
fn test_render_png_heatmap() {
    let rc = RcParams {
        savefig_dpi: 72,
        ..Default::default()
    };
    let png = small_heatmap().render(&rc).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}

#[test]
#[ignore] /* draws text, so needs the system serif font */
fn test_render_svg_timeseries() {
    let rc = RcParams {
        savefig_format: ImageFormat::Svg,
        savefig_transparent: true,
        ..Default::default()
    };
    let opts = TimeseriesOptions {
        legendlabels: Some(vec!["Bx".to_string(), "By".to_string()]),
        ..Default::default()
    };
    let ts = crate::timeseries::timeseries(
        &[0.0, 1.0, 2.0],
        YValues::Numeric(array![[1.0, 2.0], [f64::NAN, 3.0], [2.0, 1.0]]),
        &opts,
    )
    .unwrap();
    let svg = String::from_utf8(Figure::Timeseries(ts).render(&rc).unwrap()).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("Bx"));
}
