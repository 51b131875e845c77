//! Plots every parameter of a HAPI response: heatmaps for binned or wide parameters,
//! time series for the rest.

use crate::constants::{HEATMAP_MIN_COMPONENTS, MEAN_REMOVAL_SERVER_TAG};
use crate::error::{PlotError, Result};
use crate::figure::Figure;
use crate::heatmap::axis::{Axis, AxisKind, AxisSpec};
use crate::heatmap::heatmap;
use crate::meta::{BinCenters, BinRanges, Meta, Parameter, ParameterType, TimeStampLocation};
use crate::options::{HeatmapOptions, PlotOptions, TimeseriesOptions};
use crate::timeseries::{timeseries, YValues};
use crate::utils::fill::{fill_to_nan, parse_fill};
use crate::utils::io::ImageCache;
use crate::utils::labels;
use crate::utils::loader::{Column, ColumnValues, HapiData};
use crate::utils::time::{parse_hapi_time, parse_hapi_times};
use crate::utils::{remove_column_means, time_steps};
use crate::Seconds;
use log::{debug, info, warn};
use ndarray::{Array2, Axis as ArrayAxis};
use std::path::PathBuf;

/// What was produced for one plotted parameter. A slice of a 2-D parameter gets its
/// own entry, named `name[j,:]` or `name[:,j]`.
#[derive(Debug, Clone)]
pub struct ParameterPlot {
    pub name: String,
    /// `None` when the image came from the cache.
    pub figure: Option<Figure>,
    pub image: Option<Vec<u8>>,
    pub imagefile: Option<PathBuf>,
}

/// Progress messages are shown when `logging` is set.
fn progress(opts: &PlotOptions, message: &str) {
    if opts.logging {
        info!("{message}");
    } else {
        debug!("{message}");
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Time values and the request context shared by every parameter.
struct Request<'a> {
    meta: &'a Meta,
    time: Vec<Seconds>,
    nodata: bool,
    opts: &'a PlotOptions,
    cache: ImageCache,
}

pub fn hapiplot(data: &HapiData, meta: &Meta, opts: &PlotOptions) -> Result<Vec<ParameterPlot>> {
    // Without records the x axis spans the requested interval
    let nodata = data.is_empty();
    let time = if nodata {
        vec![parse_hapi_time(&meta.x_time_min)?, parse_hapi_time(&meta.x_time_max)?]
    } else {
        parse_hapi_times(&data.time)?
    };

    let request = Request {
        meta,
        time,
        nodata,
        opts,
        cache: ImageCache::new(opts.cachedir.clone()),
    };

    let time_only = meta.parameters.len() == 1;
    let first = if time_only { 0 } else { 1 };

    let mut plots = Vec::new();
    for parameter in meta.parameters.iter().skip(first) {
        let column = if time_only {
            let values = Array2::from_shape_vec((data.len(), 1), data.time.clone())
                .map_err(|err| PlotError::InvalidData(err.to_string()))?;
            Column {
                name: parameter.name.clone(),
                values: ColumnValues::Text(values),
            }
        } else {
            data.column(&parameter.name)
                .cloned()
                .ok_or_else(|| PlotError::InvalidData(format!("no data for '{}'", parameter.name)))?
        };

        let size = parameter.size();
        match size.len() {
            1 => {
                let title = labels::title(meta, parameter);
                plots.extend(request.plot(parameter, &column, title)?);
            }
            2 => plots.extend(request.plot_slices(parameter, &column, &size)?),
            _ => progress(
                opts,
                &format!("Parameter '{}' has more than two dimensions. Skipping.", parameter.name),
            ),
        }
    }
    Ok(plots)
}

impl Request<'_> {
    /// One plot per index of the shorter dimension of a `[N1, N2]` parameter.
    fn plot_slices(&self, parameter: &Parameter, column: &Column, size: &[usize]) -> Result<Vec<ParameterPlot>> {
        progress(
            self.opts,
            &format!("Parameter '{}' is two-dimensional. Creating one plot per component.", parameter.name),
        );

        let (primary, secondary) = if size[0] > size[1] { (0, 1) } else { (1, 0) };
        let mut count = size[secondary];
        if self.opts.returnimage && count > 1 {
            warn!("Only returning first image for parameter '{}'.", parameter.name);
            count = 1;
        }

        let mut plots = Vec::with_capacity(count);
        for j in 0..count {
            let slice = parameter.slice(j, primary, secondary);
            let bin_title = parameter
                .bins
                .as_ref()
                .filter(|bins| bins.len() > 1)
                .and_then(|bins| bins.get(secondary))
                .map(|bins| labels::bin_title(bins, j))
                .unwrap_or_default();
            let title = format!(
                "{}\n{} | {}{}",
                self.meta.x_server, self.meta.x_dataset, slice.name, bin_title
            );
            let column = column.slice(slice.name.clone(), size, j, secondary);
            plots.extend(self.plot(&slice, &column, title)?);
        }
        Ok(plots)
    }

    /// Plots a parameter with a 1-D size, or returns its cached image.
    fn plot(&self, parameter: &Parameter, column: &Column, title: String) -> Result<Option<ParameterPlot>> {
        let opts = self.opts;
        let rc = &opts.rc_params;

        // Cached image
        let image_path = if opts.saveimage || (opts.returnimage && opts.useimagecache) {
            let extension = rc.savefig_format.extension();
            Some(self.cache.path_for(self.meta, &parameter.name, rc, extension)?)
        } else {
            None
        };
        if let (true, true, Some(path)) = (opts.useimagecache, opts.returnimage, &image_path) {
            if let Some(image) = self.cache.get(path)? {
                progress(opts, &format!("Returning cached image {}", path.display()));
                return Ok(Some(ParameterPlot {
                    name: parameter.name.clone(),
                    figure: None,
                    image: Some(image),
                    imagefile: Some(path.clone()),
                }));
            }
        }

        progress(opts, &format!("Plotting parameter '{}'", parameter.name));
        let mut as_heatmap = parameter.size()[0] > HEATMAP_MIN_COMPONENTS || parameter.bins.is_some();
        if as_heatmap && parameter.units_are_list() {
            warn!(
                "Not plotting {} as heatmap because components have different units.",
                parameter.name
            );
            as_heatmap = false;
        }

        let figure = if as_heatmap {
            if parameter.kind == ParameterType::String {
                warn!(
                    "Plots for only types double, integer, and isotime implemented. Not plotting {}.",
                    parameter.name
                );
                return Ok(None);
            }
            self.heatmap_figure(parameter, column, title)?
        } else {
            self.timeseries_figure(parameter, column, title)?
        };

        let mut plot = ParameterPlot {
            name: parameter.name.clone(),
            figure: None,
            image: None,
            imagefile: None,
        };
        if opts.saveimage || opts.returnimage {
            let image = figure.render(rc)?;
            if let (true, Some(path)) = (opts.saveimage, &image_path) {
                progress(opts, &format!("Writing {}", path.display()));
                self.cache.insert(path, &image)?;
                plot.imagefile = Some(path.clone());
            }
            if opts.returnimage {
                plot.image = Some(image);
            }
        }
        plot.figure = Some(figure);
        Ok(Some(plot))
    }

    fn heatmap_figure(&self, parameter: &Parameter, column: &Column, title: String) -> Result<Figure> {
        let opts = self.opts;
        let n = parameter.size()[0];

        // z: one row per bin, one column per time
        let mut z = if self.nodata {
            Array2::from_elem((n, self.time.len()), f64::NAN)
        } else {
            column
                .numeric()
                .ok_or_else(|| PlotError::InvalidData(format!("'{}' is not numeric", parameter.name)))?
                .t()
                .to_owned()
        };
        if let Some(fill) = parameter.fill() {
            fill_to_nan(&mut z, parse_fill(fill)?);
        }

        let x = self.time_axis()?;
        let y = bin_axis(parameter, n)?;

        let computed = HeatmapOptions {
            title: Some(title),
            ylabel: Some(labels::bin_axis_label(parameter.first_bins())),
            zlabel: Some(labels::zlabel(parameter.single_units())),
            transparent: Some(opts.rc_params.savefig_transparent),
            ..Default::default()
        };
        let top_level = HeatmapOptions {
            title: non_empty(&opts.title),
            xlabel: non_empty(&opts.xlabel),
            ylabel: non_empty(&opts.ylabel),
            zlabel: non_empty(&opts.zlabel),
            logx: opts.logx.then_some(true),
            logy: opts.logy.then_some(true),
            logz: opts.logz.then_some(true),
            ..Default::default()
        };
        let hmopts = computed.merge(&top_level).merge(&opts.hmopts);

        Ok(Figure::Heatmap(heatmap(x, y, &z, &hmopts)?))
    }

    /// Cells along time: edges when time stamps mark the start or end of an interval,
    /// centers otherwise.
    fn time_axis(&self) -> Result<Axis> {
        let time = &self.time;
        let steps = time_steps(time);
        let location = if self.nodata {
            TimeStampLocation::Center
        } else {
            self.meta.time_stamp_location()
        };

        let spec = match (location, steps.first(), steps.last()) {
            (TimeStampLocation::Begin, _, Some(&last)) => {
                let mut edges = time.clone();
                edges.push(time[time.len() - 1] + last);
                AxisSpec::Edges(edges)
            }
            (TimeStampLocation::End, Some(&first), _) => {
                let mut edges = vec![time[0] - first];
                edges.extend_from_slice(time);
                AxisSpec::Edges(edges)
            }
            _ => AxisSpec::Centers(time.clone()),
        };
        Axis::normalize(spec, AxisKind::Time)
    }

    fn timeseries_figure(&self, parameter: &Parameter, column: &Column, title: String) -> Result<Figure> {
        let opts = self.opts;
        let n = parameter.size()[0];
        let mut time = self.time.clone();
        let mut means = None;

        let y = if self.nodata {
            YValues::Numeric(Array2::from_elem((time.len(), n), f64::NAN))
        } else {
            match &column.values {
                ColumnValues::Text(values) => {
                    let values = match parameter.fill() {
                        Some(fill) => {
                            let (kept_time, kept) = remove_fill_rows(&parameter.name, &time, values, fill)?;
                            time = kept_time;
                            kept
                        }
                        None => values.clone(),
                    };
                    if parameter.kind == ParameterType::Isotime {
                        let strings: Vec<&String> = values.iter().collect();
                        let seconds = parse_hapi_times(&strings)?;
                        YValues::Time(to_matrix(seconds, values.ncols())?)
                    } else {
                        YValues::categorical(&values)
                    }
                }
                ColumnValues::Numeric(values) => {
                    let mut values = values.clone();
                    if let Some(fill) = parameter.fill() {
                        fill_to_nan(&mut values, parse_fill(fill)?);
                    }
                    if self.meta.x_server.contains(MEAN_REMOVAL_SERVER_TAG) {
                        means = Some(remove_column_means(&mut values));
                    }
                    YValues::Numeric(values)
                }
            }
        };

        let legendlabels = match &opts.tsopts.legendlabels {
            Some(_) => None,
            None => Some(labels::legend_labels(parameter, self.nodata, means.as_deref())),
        };
        let computed = TimeseriesOptions {
            title: Some(title),
            ylabel: Some(labels::ylabel(&parameter.name, parameter.single_units())),
            legendlabels,
            transparent: Some(opts.rc_params.savefig_transparent),
            ..Default::default()
        };
        let top_level = TimeseriesOptions {
            title: non_empty(&opts.title),
            xlabel: non_empty(&opts.xlabel),
            ylabel: non_empty(&opts.ylabel),
            logx: opts.logx.then_some(true),
            logy: opts.logy.then_some(true),
            ..Default::default()
        };
        let mut tsopts = computed.merge(&top_level).merge(&opts.tsopts);
        if self.nodata {
            tsopts.nodata = Some(true);
        }

        Ok(Figure::Timeseries(timeseries(&time, y, &tsopts)?))
    }
}

fn to_matrix(values: Vec<f64>, width: usize) -> Result<Array2<f64>> {
    let rows = if width == 0 { 0 } else { values.len() / width };
    Array2::from_shape_vec((rows, width), values).map_err(|err| PlotError::InvalidData(err.to_string()))
}

/// Drops the records of a text parameter holding its fill value, along with their times.
fn remove_fill_rows(
    name: &str,
    time: &[Seconds],
    values: &Array2<String>,
    fill: &str,
) -> Result<(Vec<Seconds>, Array2<String>)> {
    let keep: Vec<usize> = values
        .axis_iter(ArrayAxis(0))
        .enumerate()
        .filter(|(_, row)| row.iter().all(|v| v != fill))
        .map(|(i, _)| i)
        .collect();

    let removed = values.nrows() - keep.len();
    if removed > 0 {
        warn!(
            "Parameter {name} has {removed} fill value(s). Masking is not implemented, \
             so removing fill elements before plotting."
        );
    }
    let kept_time = keep
        .iter()
        .map(|&i| {
            time.get(i)
                .copied()
                .ok_or_else(|| PlotError::InvalidData(format!("'{name}' has more records than times")))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((kept_time, values.select(ArrayAxis(0), &keep)))
}

/// Bin axis from `bins[0]`: ranges when listed, else centers. Bins given by reference
/// or with null entries fall back to bin indices.
fn bin_axis(parameter: &Parameter, n: usize) -> Result<Axis> {
    let indices = || AxisSpec::Centers((0..n).map(|k| k as f64).collect());

    let spec = match parameter.first_bins() {
        Some(bins) => {
            let listed = match (&bins.ranges, &bins.centers) {
                (Some(BinRanges::Values(ranges)), _) => (0..ranges.len())
                    .map(|k| bins.range(k))
                    .collect::<Option<Vec<_>>>()
                    .map(AxisSpec::Ranges),
                (Some(BinRanges::Reference(_)), _) => None,
                (None, Some(BinCenters::Values(centers))) => {
                    centers.iter().copied().collect::<Option<Vec<_>>>().map(AxisSpec::Centers)
                }
                (None, _) => None,
            };
            match listed {
                Some(spec) => spec,
                None => {
                    if !bins.is_time_dependent() && (bins.ranges.is_some() || bins.centers.is_some()) {
                        warn!("Bins of {} have null entries; using bin numbers.", parameter.name);
                    }
                    indices()
                }
            }
        }
        None => indices(),
    };
    Axis::normalize(spec, AxisKind::Numeric)
}

#[cfg(test)]
const TEST_META: &str = r#"{
    "parameters": [
        {"name": "Time", "type": "isotime", "length": 20},
        {"name": "scalar", "type": "double", "units": "nT", "fill": "-1e31"},
        {"name": "vector", "type": "double", "units": ["nT", "nT", "deg"], "size": [3],
         "bins": [{"name": "component", "centers": [0, 1, 2]}]},
        {"name": "spectra", "type": "double", "units": "counts", "size": [3], "fill": "-1",
         "bins": [{"name": "energy", "units": "keV",
                   "ranges": [[1, 2], [2, 4], [8, 16]]}]},
        {"name": "matrix", "type": "integer", "size": [2, 3],
         "bins": [{"name": "row", "centers": [10, 20]}, {"name": "col", "centers": [1, 2, 3]}]},
        {"name": "label", "type": "string", "length": 3, "fill": "---"}
    ],
    "x_server": "http://example.org/hapi",
    "x_dataset": "ds",
    "x_time.min": "2000-01-01T00:00:00Z",
    "x_time.max": "2000-01-01T00:00:03Z"
}"#;

#[cfg(test)]
const TEST_CSV: &str = "\
2000-01-01T00:00:00Z,1.0,1,2,3,5,-1,7,0,1,2,3,4,5,abc
2000-01-01T00:00:01Z,-1e31,1,2,3,6,7,8,1,1,2,3,4,5,---
2000-01-01T00:00:02Z,3.0,1,2,3,7,8,9,2,1,2,3,4,5,xyz
";

#[cfg(test)]
fn load(csv: &str) -> (HapiData, Meta) {
    let meta = Meta::from_json_str(TEST_META).unwrap();
    let data = HapiData::from_csv_reader(csv.as_bytes(), &meta).unwrap();
    (data, meta)
}

#[cfg(test)]
fn names(plots: &[ParameterPlot]) -> Vec<&str> {
    plots.iter().map(|plot| plot.name.as_str()).collect()
}

#[test]
fn test_plot_kinds() {
    let (data, meta) = load(TEST_CSV);
    let plots = hapiplot(&data, &meta, &PlotOptions::default()).unwrap();

    assert_eq!(
        names(&plots),
        vec!["scalar", "vector", "spectra", "matrix[0,:]", "matrix[1,:]", "label"]
    );
    let figure = |k: usize| plots[k].figure.as_ref().unwrap();

    // Units given per component rule out a heatmap
    assert!(matches!(figure(1), Figure::Timeseries(_)));
    match figure(0) {
        Figure::Timeseries(ts) => {
            assert_eq!(ts.title, "http://example.org/hapi\nds | scalar");
            assert_eq!(ts.ylabel, "scalar [nT]");
            assert!(ts.y().values()[[1, 0]].is_nan());
        }
        other => panic!("expected a time series, got {other:?}"),
    }
    match figure(2) {
        Figure::Heatmap(hm) => {
            assert_eq!(hm.ylabel, "energy [keV]");
            assert_eq!(hm.zlabel, " [counts]");
            assert_eq!(hm.mesh().y_gaps(), &[(4.0, 8.0)][..]);
            assert_eq!(hm.mesh().missing_count(), 1);
        }
        other => panic!("expected a heatmap, got {other:?}"),
    }
    // The string parameter lost its fill record
    match figure(5) {
        Figure::Timeseries(ts) => {
            assert_eq!(ts.time().len(), 2);
            assert_eq!(ts.y().categories(), Some(&["abc".to_string(), "xyz".to_string()][..]));
        }
        other => panic!("expected a time series, got {other:?}"),
    }
    assert!(plots.iter().all(|plot| plot.image.is_none() && plot.imagefile.is_none()));
}

#[test]
fn test_two_dimensional_slices() {
    let (data, meta) = load(TEST_CSV);
    let plots = hapiplot(&data, &meta, &PlotOptions::default()).unwrap();

    // Size [2, 3]: one slice per row, binned along the columns
    match plots[3].figure.as_ref().unwrap() {
        Figure::Heatmap(hm) => {
            assert_eq!(hm.title, "http://example.org/hapi\nds | matrix[0,:]\nrow = 10");
            assert_eq!(hm.ylabel, "col");
            assert_eq!(hm.mesh().y().len(), 3);
        }
        other => panic!("expected a heatmap, got {other:?}"),
    }
}

#[test]
fn test_no_data_spans_request_interval() {
    let (data, meta) = load("");
    let plots = hapiplot(&data, &meta, &PlotOptions::default()).unwrap();

    match plots[0].figure.as_ref().unwrap() {
        Figure::Timeseries(ts) => {
            assert!(ts.nodata());
            assert_eq!(ts.x_range(), (946684800.0, 946684803.0));
        }
        other => panic!("expected a time series, got {other:?}"),
    }
    match plots[1].figure.as_ref().unwrap() {
        Figure::Timeseries(ts) => {
            assert_eq!(ts.legend().unwrap()[0], "component#0 [no data in interval] [nT] bin:  center = 0");
        }
        other => panic!("expected a time series, got {other:?}"),
    }
}

#[test]
fn test_option_precedence() {
    let (data, meta) = load(TEST_CSV);
    let opts = PlotOptions::from_json_str(
        r#"{"title": "Top", "ylabel": "top y", "tsopts": {"ylabel": "ts y"}, "hmopts": {"colormap": "bone"}}"#,
    )
    .unwrap();
    let plots = hapiplot(&data, &meta, &opts).unwrap();

    match plots[0].figure.as_ref().unwrap() {
        Figure::Timeseries(ts) => {
            assert_eq!(ts.title, "Top");
            assert_eq!(ts.ylabel, "ts y");
        }
        other => panic!("expected a time series, got {other:?}"),
    }
    match plots[2].figure.as_ref().unwrap() {
        Figure::Heatmap(hm) => assert_eq!(hm.ylabel, "top y"),
        other => panic!("expected a heatmap, got {other:?}"),
    }
}

#[test]
fn test_mean_removal_server() {
    let json = TEST_META.replace("http://example.org/hapi", "http://example.org/uk/GIN_hapi");
    let meta = Meta::from_json_str(&json).unwrap();
    let data = HapiData::from_csv_reader(TEST_CSV.as_bytes(), &meta).unwrap();
    let plots = hapiplot(&data, &meta, &PlotOptions::default()).unwrap();

    match plots[1].figure.as_ref().unwrap() {
        Figure::Timeseries(ts) => {
            assert_eq!(ts.y().values().column(0).to_vec(), vec![0.0, 0.0, 0.0]);
            assert_eq!(ts.legend().unwrap()[1], "component#1 - 2.00 [nT] bin:  center = 1");
        }
        other => panic!("expected a time series, got {other:?}"),
    }
}

#[test]
fn test_time_only_dataset() {
    let meta = Meta::from_json_str(
        r#"{"parameters": [{"name": "Time", "type": "isotime", "length": 20}],
            "x_time.min": "2000-01-01Z", "x_time.max": "2000-01-02Z"}"#,
    )
    .unwrap();
    let data = HapiData::from_csv_reader("2000-01-01T00:00:00Z\n2000-01-01T00:00:10Z\n".as_bytes(), &meta)
        .unwrap();
    let plots = hapiplot(&data, &meta, &PlotOptions::default()).unwrap();

    assert_eq!(names(&plots), vec!["Time"]);
    match plots[0].figure.as_ref().unwrap() {
        Figure::Timeseries(ts) => {
            assert!(ts.y().is_time());
            assert_eq!(ts.y_range(), (946684800.0, 946684810.0));
        }
        other => panic!("expected a time series, got {other:?}"),
    }
}

#[test]
fn test_cached_image_is_returned_without_rendering() {
    let (data, meta) = load(TEST_CSV);
    let dir = tempfile::tempdir().unwrap();
    let opts = PlotOptions {
        returnimage: true,
        cachedir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };

    // Prime the cache for every plotted name
    let cache = ImageCache::new(opts.cachedir.clone());
    for name in ["scalar", "vector", "spectra", "matrix[0,:]", "label"] {
        let path = cache.path_for(&meta, name, &opts.rc_params, "png").unwrap();
        cache.insert(&path, name.as_bytes()).unwrap();
    }

    let plots = hapiplot(&data, &meta, &opts).unwrap();
    // Only the first slice of a 2-D parameter is returned as an image
    assert_eq!(names(&plots), vec!["scalar", "vector", "spectra", "matrix[0,:]", "label"]);
    for plot in plots.iter() {
        assert!(plot.figure.is_none());
        assert_eq!(plot.image.as_deref(), Some(plot.name.as_bytes()));
        assert!(plot.imagefile.as_ref().unwrap().exists());
    }
}

#[test]
fn test_saving_pdf_is_unsupported() {
    let (data, meta) = load(TEST_CSV);
    let dir = tempfile::tempdir().unwrap();
    let opts = PlotOptions::from_json(&serde_json::json!({
        "saveimage": true,
        "cachedir": dir.path(),
        "rcParams": {"savefig.format": "pdf"}
    }))
    .unwrap();

    assert!(matches!(
        hapiplot(&data, &meta, &opts),
        Err(PlotError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_bin_axis_fallbacks() {
    let parameter: Parameter = serde_json::from_str(
        r#"{"name": "s", "type": "double", "size": [3],
            "bins": [{"name": "e", "centers": [1, null, 3]}]}"#,
    )
    .unwrap();
    let axis = bin_axis(&parameter, 3).unwrap();
    assert_eq!(axis.cells()[0], (-0.5, 0.5));

    let parameter: Parameter = serde_json::from_str(
        r#"{"name": "s", "type": "double", "size": [2],
            "bins": [{"name": "e", "centers": [1, 3]}]}"#,
    )
    .unwrap();
    assert_eq!(bin_axis(&parameter, 2).unwrap().cells(), &[(0.0, 2.0), (2.0, 4.0)][..]);
}
