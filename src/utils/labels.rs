use crate::constants::{LABEL_WRAP_LENGTH, NO_DATA_SUFFIX};
use crate::meta::{Bins, Label, Meta, Parameter, Units};

/// Numbers as they appear in labels: integral values without a fractional part.
pub fn format_number(v: f64) -> String {
    format!("{v}")
}

/// `server\ndataset | name`, naming the original parameter for a slice.
pub fn title(meta: &Meta, parameter: &Parameter) -> String {
    let name = parameter.name_orig.as_deref().unwrap_or(&parameter.name);
    format!("{}\n{} | {}", meta.x_server, meta.x_dataset, name)
}

/// Title suffix naming the secondary bin a slice was taken at.
pub fn bin_title(secondary: &Bins, j: usize) -> String {
    match secondary.center(j) {
        Some(center) => {
            let units = match &secondary.units {
                Some(Units::Single(units)) => format!(" [{units}]"),
                _ => String::new(),
            };
            format!("\n{} = {}{}", secondary.name, format_number(center), units)
        }
        None => String::new(),
    }
}

/// `name [units]`, broken over two lines when long.
pub fn ylabel(name: &str, units: Option<&str>) -> String {
    match units {
        Some(units) if !units.is_empty() => {
            let nl = if name.len() + units.len() > LABEL_WRAP_LENGTH { "\n" } else { "" };
            format!("{name}{nl} [{units}]")
        }
        _ => name.to_string(),
    }
}

/// Label of the heatmap bin axis.
pub fn bin_axis_label(bins: Option<&Bins>) -> String {
    match bins {
        Some(bins) if bins.is_time_dependent() => "bin #\n(vals are time dependent)".to_string(),
        Some(bins) => match &bins.units {
            Some(Units::Single(units)) => format!("{} [{units}]", bins.name),
            _ => bins.name.clone(),
        },
        None => "bin #".to_string(),
    }
}

/// Colorbar label: the units in brackets.
pub fn zlabel(units: Option<&str>) -> String {
    units.map(|units| format!(" [{units}]")).unwrap_or_default()
}

fn with_mean(col_name: String, mean: Option<f64>) -> String {
    match mean {
        Some(m) if m > 0.0 => format!("{col_name} - {m:.2}"),
        Some(m) if m < 0.0 => format!("{col_name} + {:.2}", -m),
        _ => col_name,
    }
}

/// Legend entry per component of a 1-D parameter.
///
/// Entries combine a column name (bin name, per-component label or `col #l`), the
/// units when they differ per component, and a description of the bin.
pub fn legend_labels(parameter: &Parameter, nodata: bool, means: Option<&[f64]>) -> Vec<String> {
    let Some(size) = parameter.size.as_ref().and_then(|size| size.first()) else {
        return Vec::new();
    };

    let mut labels = Vec::with_capacity(*size);
    for l in 0..*size {
        let mean = means.and_then(|means| means.get(l).copied());
        let mut bin_label = String::new();
        let mut col_name = String::new();

        if let Some(bins) = parameter.first_bins() {
            let mut bin_name = match &bins.label {
                Some(label) => label.get(l).unwrap_or(bins.name.as_str()).to_string(),
                None => bins.name.clone(),
            };
            let mut sep = "";
            if bins.centers.is_some() && bins.ranges.is_some() {
                bin_name.push_str(" bin with");
                sep = ";";
            }

            let bin_units = match bins.units.as_ref().and_then(|units| units.get(l)) {
                Some(units) if !units.is_empty() => format!(" [{units}]"),
                _ => " ".to_string(),
            };

            if let Some(center) = bins.center(l) {
                bin_label += &format!(" center = {}{bin_units}", format_number(center));
            }
            if let Some((lo, hi)) = bins.range(l) {
                bin_label += &format!(
                    "{sep} range = [{}, {}]{bin_units}",
                    format_number(lo),
                    format_number(hi)
                );
            }

            if !bin_label.is_empty() {
                bin_label = format!("bin: {bin_label}");
                col_name = format!("{bin_name}#{l}");
            }
        }

        if col_name.is_empty() {
            col_name = format!("col #{l}");
        }
        if nodata {
            col_name.push_str(NO_DATA_SUFFIX);
        }
        col_name = with_mean(col_name, mean);

        if let Some(Label::PerComponent(component_labels)) = &parameter.label {
            if let Some(label) = component_labels.get(l).filter(|label| !label.trim().is_empty()) {
                col_name = if nodata {
                    format!("{label}{NO_DATA_SUFFIX}")
                } else {
                    with_mean(label.clone(), mean)
                };
            }
        }

        let entry = match &parameter.units {
            Some(Units::PerComponent(units)) if units.len() == 1 => match &units[0] {
                Some(u) if !u.is_empty() => Some(format!("{col_name} [{u}] {bin_label}")),
                _ => None,
            },
            Some(Units::PerComponent(units)) => match units.get(l).cloned().flatten() {
                Some(u) if !u.is_empty() => Some(format!("{col_name} [{u}] {bin_label}")),
                _ => Some(format!("{col_name} {bin_label}")),
            },
            // Shared units go on the y label.
            _ => Some(format!("{col_name} {bin_label}")),
        };
        if let Some(entry) = entry {
            labels.push(entry.trim_end().to_string());
        }
    }
    labels
}

#[cfg(test)]
fn parameter(json: &str) -> Parameter {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_ylabel_wraps_long_names() {
    assert_eq!(ylabel("scalar", Some("m")), "scalar [m]");
    assert_eq!(ylabel("scalar", None), "scalar");
    assert_eq!(
        ylabel("a_rather_long_parameter_name", Some("nT/s")),
        "a_rather_long_parameter_name\n [nT/s]"
    );
    assert_eq!(zlabel(Some("counts")), " [counts]");
    assert_eq!(zlabel(None), "");
}

#[test]
fn test_plain_components_use_column_numbers() {
    let p = parameter(r#"{"name": "vector", "type": "double", "units": "nT", "size": [3]}"#);
    assert_eq!(legend_labels(&p, false, None), vec!["col #0", "col #1", "col #2"]);
    assert_eq!(
        legend_labels(&p, true, None)[0],
        "col #0 [no data in interval]"
    );
    assert_eq!(
        legend_labels(&p, false, Some(&[1.234, -0.5, 0.0][..])),
        vec!["col #0 - 1.23", "col #1 + 0.50", "col #2"]
    );

    let scalar = parameter(r#"{"name": "scalar", "type": "double"}"#);
    assert!(legend_labels(&scalar, false, None).is_empty());
}

#[test]
fn test_component_labels_and_units_lists() {
    let p = parameter(
        r#"{"name": "vector", "type": "double", "size": [3],
            "units": ["nT", null, ""], "label": ["Bx", " ", "Bz"]}"#,
    );
    assert_eq!(legend_labels(&p, false, None), vec!["Bx [nT]", "col #1", "Bz"]);

    let single = parameter(
        r#"{"name": "v", "type": "double", "size": [2], "units": [""]}"#,
    );
    assert!(legend_labels(&single, false, None).is_empty());
}

#[test]
fn test_bin_descriptions() {
    let p = parameter(
        r#"{"name": "spectra", "type": "double", "size": [2], "units": "m",
            "bins": [{"name": "freq", "units": "Hz", "centers": [1, 2.5],
                      "ranges": [[0.5, 1.5], [2, 3]]}]}"#,
    );
    assert_eq!(
        legend_labels(&p, false, None),
        vec![
            "freq bin with#0 bin:  center = 1 [Hz]; range = [0.5, 1.5] [Hz]",
            "freq bin with#1 bin:  center = 2.5 [Hz]; range = [2, 3] [Hz]",
        ]
    );

    let centers_only = parameter(
        r#"{"name": "spectra", "type": "double", "size": [1],
            "bins": [{"name": "freq", "label": ["f0"], "centers": [1]}]}"#,
    );
    assert_eq!(legend_labels(&centers_only, false, None), vec!["f0#0 bin:  center = 1"]);
}

#[test]
fn test_bin_axis_label_and_titles() {
    let bins: Bins = serde_json::from_str(r#"{"name": "energy", "units": "keV", "centers": [10, 20]}"#)
        .unwrap();
    assert_eq!(bin_axis_label(Some(&bins)), "energy [keV]");
    assert_eq!(bin_axis_label(None), "bin #");
    assert_eq!(bin_title(&bins, 1), "\nenergy = 20 [keV]");
    assert_eq!(bin_title(&bins, 5), "");

    let td: Bins = serde_json::from_str(r#"{"name": "energy", "ranges": "energy_ranges"}"#).unwrap();
    assert_eq!(bin_axis_label(Some(&td)), "bin #\n(vals are time dependent)");
}
