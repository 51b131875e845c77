//! HAPI `info` metadata, plus the `x_*` keys the client adds to describe the request.

use crate::error::{PlotError, Result};
use serde::de::Deserializer;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(rename = "HAPI", default)]
    pub hapi: Option<String>,
    pub parameters: Vec<Parameter>,
    #[serde(rename = "timeStampLocation", default)]
    pub time_stamp_location: Option<String>,
    #[serde(default)]
    pub x_server: String,
    #[serde(default)]
    pub x_dataset: String,
    #[serde(rename = "x_time.min", default)]
    pub x_time_min: String,
    #[serde(rename = "x_time.max", default)]
    pub x_time_max: String,
}

/// Where in its measurement interval a time stamp sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStampLocation {
    Begin,
    Center,
    End,
}

impl Meta {
    pub fn from_json_str(json: &str) -> Result<Meta> {
        let meta: Meta = serde_json::from_str(json)?;
        meta.validate()?;
        Ok(meta)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Meta> {
        Meta::from_json_str(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<()> {
        let time = self
            .parameters
            .first()
            .ok_or_else(|| PlotError::InvalidMeta("no parameters".to_string()))?;
        if time.kind != ParameterType::Isotime {
            return Err(PlotError::InvalidMeta(format!(
                "first parameter '{}' must be of type isotime",
                time.name
            )));
        }
        Ok(())
    }

    /// The time parameter, which HAPI always lists first.
    pub fn time_parameter(&self) -> &Parameter {
        &self.parameters[0]
    }

    /// Defaults to center when absent or unrecognized.
    pub fn time_stamp_location(&self) -> TimeStampLocation {
        match self.time_stamp_location.as_deref().map(str::to_lowercase).as_deref() {
            Some("begin") => TimeStampLocation::Begin,
            Some("end") => TimeStampLocation::End,
            _ => TimeStampLocation::Center,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Isotime,
    Double,
    Integer,
    String,
}

impl ParameterType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ParameterType::Double | ParameterType::Integer)
    }
}

/// Units shared by every component, or one entry per component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Units {
    Single(String),
    PerComponent(Vec<Option<String>>),
}

impl Units {
    /// Units of component `j`. A shared unit applies to every component.
    pub fn get(&self, j: usize) -> Option<&str> {
        match self {
            Units::Single(units) => Some(units),
            Units::PerComponent(units) => units.get(j).and_then(|u| u.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Single(String),
    PerComponent(Vec<String>),
}

impl Label {
    pub fn get(&self, j: usize) -> Option<&str> {
        match self {
            Label::Single(label) => Some(label),
            Label::PerComponent(labels) => labels.get(j).map(String::as_str),
        }
    }
}

/// Bin centers, either listed or named by a parameter holding time-dependent values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinCenters {
    Reference(String),
    Values(Vec<Option<f64>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinRanges {
    Reference(String),
    Values(Vec<Option<[Option<f64>; 2]>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bins {
    pub name: String,
    #[serde(default)]
    pub units: Option<Units>,
    #[serde(default)]
    pub label: Option<Label>,
    #[serde(default)]
    pub centers: Option<BinCenters>,
    #[serde(default)]
    pub ranges: Option<BinRanges>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Bins {
    /// True when centers or ranges are given by reference to another parameter.
    pub fn is_time_dependent(&self) -> bool {
        matches!(self.centers, Some(BinCenters::Reference(_)))
            || matches!(self.ranges, Some(BinRanges::Reference(_)))
    }

    pub fn center(&self, j: usize) -> Option<f64> {
        match &self.centers {
            Some(BinCenters::Values(centers)) => centers.get(j).copied().flatten(),
            _ => None,
        }
    }

    /// Both ends of range `j`, when listed and non-null.
    pub fn range(&self, j: usize) -> Option<(f64, f64)> {
        match &self.ranges {
            Some(BinRanges::Values(ranges)) => match ranges.get(j).copied().flatten()? {
                [Some(lo), Some(hi)] => Some((lo, hi)),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(default)]
    pub units: Option<Units>,
    #[serde(default)]
    pub size: Option<Vec<usize>>,
    #[serde(default, deserialize_with = "fill_as_string")]
    pub fill: Option<String>,
    #[serde(default)]
    pub length: Option<usize>,
    #[serde(default)]
    pub label: Option<Label>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bins: Option<Vec<Bins>>,
    /// Name of the parameter this one was split from.
    #[serde(skip)]
    pub name_orig: Option<String>,
}

/// HAPI fills are strings, but some servers send bare numbers.
fn fill_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    let value = <Option<serde_json::Value> as serde::Deserialize>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(fill)) => Some(fill),
        Some(serde_json::Value::Number(fill)) => Some(fill.to_string()),
        _ => None,
    })
}

impl Parameter {
    /// Size per record; scalars have size `[1]`.
    pub fn size(&self) -> Vec<usize> {
        self.size.clone().unwrap_or_else(|| vec![1])
    }

    /// Number of values per record.
    pub fn components(&self) -> usize {
        self.size().iter().product()
    }

    pub fn units_are_list(&self) -> bool {
        matches!(self.units, Some(Units::PerComponent(_)))
    }

    /// Units as a single string, when they are not given per component.
    pub fn single_units(&self) -> Option<&str> {
        match &self.units {
            Some(Units::Single(units)) => Some(units),
            _ => None,
        }
    }

    pub fn first_bins(&self) -> Option<&Bins> {
        self.bins.as_ref().and_then(|bins| bins.first())
    }

    /// A fill value that is present and non-empty.
    pub fn fill(&self) -> Option<&str> {
        self.fill.as_deref().filter(|fill| !fill.is_empty())
    }

    /// For a parameter of size `[N1, N2]`, the 1-D parameter holding index `j` of the
    /// `secondary` dimension. Per-component units and labels are picked by `j`.
    pub fn slice(&self, j: usize, primary: usize, secondary: usize) -> Parameter {
        let size = self.size();
        let name = if primary > secondary {
            format!("{}[{j},:]", self.name)
        } else {
            format!("{}[:,{j}]", self.name)
        };
        let units = match &self.units {
            Some(Units::PerComponent(units)) => units.get(j).cloned().flatten().map(Units::Single),
            other => other.clone(),
        };
        let label = match &self.label {
            Some(Label::PerComponent(labels)) => labels.get(j).cloned().map(Label::Single),
            other => other.clone(),
        };
        let bins = self
            .bins
            .as_ref()
            .and_then(|bins| bins.get(primary).cloned())
            .map(|bins| vec![bins]);

        Parameter {
            name,
            units,
            label,
            bins,
            size: Some(vec![size[primary]]),
            name_orig: Some(self.name.clone()),
            ..self.clone()
        }
    }
}

#[cfg(test)]
const EXAMPLE_META: &str = r#"{
    "HAPI": "3.1",
    "status": {"code": 1200, "message": "OK"},
    "startDate": "1970-01-01Z",
    "stopDate": "2016-12-31Z",
    "timeStampLocation": "Begin",
    "parameters": [
        {"name": "Time", "type": "isotime", "units": "UTC", "fill": null, "length": 24},
        {"name": "vector", "type": "double", "units": ["nT", null, "nT"], "size": [3],
         "fill": "-1e31", "label": ["Bx", "By", "Bz"]},
        {"name": "spectra", "type": "double", "units": "m", "size": [10], "fill": -1,
         "bins": [{"name": "frequency", "units": "Hz",
                   "centers": [0, 1, 2, 3, 4, 5, 6, 7, 8, null],
                   "ranges": [[-0.5, 0.5], [0.5, 1.5], null]}]},
        {"name": "spectra_td", "type": "double", "size": [2],
         "bins": [{"name": "energy", "centers": "energy_centers"}]}
    ],
    "x_server": "http://hapi-server.org/servers/TestData2.0/hapi",
    "x_dataset": "dataset1",
    "x_time.min": "1970-01-01T00:00:00Z",
    "x_time.max": "1970-01-01T00:00:11Z"
}"#;

#[test]
fn test_deserialize_example_meta() {
    let meta = Meta::from_json_str(EXAMPLE_META).unwrap();

    assert_eq!(meta.parameters.len(), 4);
    assert_eq!(meta.time_parameter().name, "Time");
    assert_eq!(meta.time_stamp_location(), TimeStampLocation::Begin);
    assert_eq!(meta.x_time_max, "1970-01-01T00:00:11Z");

    let vector = &meta.parameters[1];
    assert!(vector.units_are_list());
    assert_eq!(vector.units.as_ref().unwrap().get(1), None);
    assert_eq!(vector.units.as_ref().unwrap().get(2), Some("nT"));
    assert_eq!(vector.label.as_ref().unwrap().get(0), Some("Bx"));
    assert_eq!(vector.fill(), Some("-1e31"));
    assert_eq!(vector.components(), 3);

    let spectra = &meta.parameters[2];
    assert_eq!(spectra.fill(), Some("-1"));
    assert_eq!(spectra.single_units(), Some("m"));
    let bins = spectra.first_bins().unwrap();
    assert!(!bins.is_time_dependent());
    assert_eq!(bins.center(3), Some(3.0));
    assert_eq!(bins.center(9), None);
    assert_eq!(bins.range(1), Some((0.5, 1.5)));
    assert_eq!(bins.range(2), None);

    assert!(meta.parameters[3].first_bins().unwrap().is_time_dependent());
    assert_eq!(meta.time_parameter().size(), vec![1]);
}

#[test]
fn test_first_parameter_must_be_time() {
    let json = r#"{"parameters": [{"name": "x", "type": "double"}]}"#;
    assert!(matches!(Meta::from_json_str(json), Err(PlotError::InvalidMeta(_))));
    assert!(matches!(
        Meta::from_json_str(r#"{"parameters": []}"#),
        Err(PlotError::InvalidMeta(_))
    ));
    assert!(matches!(Meta::from_json_str("{"), Err(PlotError::Json(_))));
}

#[test]
fn test_slice_two_dimensional_parameter() {
    let json = r#"{"name": "matrix", "type": "double", "size": [2, 20],
        "units": ["a", "b"], "label": "M",
        "bins": [{"name": "row", "centers": [1, 2]}, {"name": "col", "units": "keV"}]}"#;
    let parameter: Parameter = serde_json::from_str(json).unwrap();

    let slice = parameter.slice(1, 1, 0);
    assert_eq!(slice.name, "matrix[1,:]");
    assert_eq!(slice.name_orig.as_deref(), Some("matrix"));
    assert_eq!(slice.size(), vec![20]);
    assert_eq!(slice.units, Some(Units::Single("b".into())));
    assert_eq!(slice.label, Some(Label::Single("M".into())));
    assert_eq!(slice.first_bins().unwrap().name, "col");

    let column = parameter.slice(0, 0, 1);
    assert_eq!(column.name, "matrix[:,0]");
    assert_eq!(column.size(), vec![2]);
}
