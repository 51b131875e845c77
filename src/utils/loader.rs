use crate::error::{PlotError, Result};
use crate::meta::{Meta, Parameter};
use ndarray::{Array2, Axis};
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Values of one parameter: one row per record, one column per component.
/// Multi-dimensional parameters are flattened in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Array2<f64>),
    Text(Array2<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn numeric(&self) -> Option<&Array2<f64>> {
        match &self.values {
            ColumnValues::Numeric(values) => Some(values),
            ColumnValues::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&Array2<String>> {
        match &self.values {
            ColumnValues::Text(values) => Some(values),
            ColumnValues::Numeric(_) => None,
        }
    }

    /// For a parameter of size `[N1, N2]`, the components at index `j` of the
    /// `secondary` dimension.
    pub fn slice(&self, name: String, size: &[usize], j: usize, secondary: usize) -> Column {
        let (n1, n2) = (size[0], size[1]);
        let indices: Vec<usize> = if secondary == 0 {
            (0..n2).map(|b| j * n2 + b).collect()
        } else {
            (0..n1).map(|a| a * n2 + j).collect()
        };
        let values = match &self.values {
            ColumnValues::Numeric(values) => ColumnValues::Numeric(values.select(Axis(1), &indices)),
            ColumnValues::Text(values) => ColumnValues::Text(values.select(Axis(1), &indices)),
        };
        Column { name, values }
    }
}

/// A HAPI data response: the time stamps and a column block per non-time parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct HapiData {
    pub time: Vec<String>,
    pub columns: Vec<Column>,
}

impl HapiData {
    pub fn new(time: Vec<String>, columns: Vec<Column>) -> Self {
        HapiData { time, columns }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Reads HAPI CSV: one record per line, the time first, then every component of
    /// every parameter in metadata order.
    pub fn from_csv_reader<R: Read>(reader: R, meta: &Meta) -> Result<HapiData> {
        // Initialize reader and accumulators
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let widths: Vec<usize> = meta.parameters.iter().map(Parameter::components).collect();
        let expected: usize = widths.iter().sum();
        let mut records: Vec<Vec<String>> = Vec::new();

        // Collect fields
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != expected {
                return Err(PlotError::InvalidData(format!(
                    "line {} has {} fields, expected {expected}",
                    line + 1,
                    record.len()
                )));
            }
            records.push(record.iter().map(str::to_string).collect());
        }

        HapiData::from_records(records, meta)
    }

    pub fn from_csv_path(path: impl AsRef<Path>, meta: &Meta) -> Result<HapiData> {
        HapiData::from_csv_reader(File::open(path)?, meta)
    }

    /// Reads the `data` array of a HAPI JSON response. Multi-component values are
    /// (possibly nested) arrays.
    pub fn from_json_str(json: &str, meta: &Meta) -> Result<HapiData> {
        let response: Value = serde_json::from_str(json)?;
        let rows = response
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| PlotError::InvalidData("no data array in response".to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for (line, row) in rows.iter().enumerate() {
            let row = row
                .as_array()
                .ok_or_else(|| PlotError::InvalidData(format!("record {line} is not an array")))?;
            if row.len() != meta.parameters.len() {
                return Err(PlotError::InvalidData(format!(
                    "record {line} has {} values, expected {}",
                    row.len(),
                    meta.parameters.len()
                )));
            }
            let mut fields = Vec::new();
            for value in row {
                flatten_json(value, &mut fields);
            }
            records.push(fields);
        }

        HapiData::from_records(records, meta)
    }

    fn from_records(records: Vec<Vec<String>>, meta: &Meta) -> Result<HapiData> {
        let time: Vec<String> = records
            .iter()
            .map(|record| record.first().cloned().unwrap_or_default())
            .collect();

        let mut columns = Vec::with_capacity(meta.parameters.len().saturating_sub(1));
        let mut offset = 1;
        for parameter in meta.parameters.iter().skip(1) {
            let width = parameter.components();
            let fields = |record: &Vec<String>| -> Result<Vec<String>> {
                record
                    .get(offset..offset + width)
                    .map(<[String]>::to_vec)
                    .ok_or_else(|| {
                        PlotError::InvalidData(format!("record too short for '{}'", parameter.name))
                    })
            };

            let values = if parameter.kind.is_numeric() {
                let mut flat = Vec::with_capacity(records.len() * width);
                for record in records.iter() {
                    for field in fields(record)? {
                        flat.push(parse_number(&field, &parameter.name)?);
                    }
                }
                ColumnValues::Numeric(to_array(flat, records.len(), width)?)
            } else {
                let mut flat = Vec::with_capacity(records.len() * width);
                for record in records.iter() {
                    flat.extend(fields(record)?);
                }
                ColumnValues::Text(to_array(flat, records.len(), width)?)
            };

            columns.push(Column {
                name: parameter.name.clone(),
                values,
            });
            offset += width;
        }

        Ok(HapiData { time, columns })
    }
}

fn to_array<T>(flat: Vec<T>, rows: usize, width: usize) -> Result<Array2<T>> {
    Array2::from_shape_vec((rows, width), flat).map_err(|err| PlotError::InvalidData(err.to_string()))
}

fn parse_number(field: &str, name: &str) -> Result<f64> {
    if field.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    field
        .parse::<f64>()
        .map_err(|_| PlotError::InvalidData(format!("'{field}' in '{name}' is not a number")))
}

fn flatten_json(value: &Value, fields: &mut Vec<String>) {
    match value {
        Value::Array(values) => values.iter().for_each(|v| flatten_json(v, fields)),
        Value::String(s) => fields.push(s.clone()),
        Value::Null => fields.push("nan".to_string()),
        other => fields.push(other.to_string()),
    }
}

#[cfg(test)]
fn example_meta() -> Meta {
    Meta::from_json_str(
        r#"{"parameters": [
            {"name": "Time", "type": "isotime", "length": 20},
            {"name": "scalar", "type": "double", "units": "m", "fill": "-1e31"},
            {"name": "matrix", "type": "integer", "size": [2, 3]},
            {"name": "label", "type": "string", "length": 3}
        ]}"#,
    )
    .unwrap()
}

#[test]
fn test_load_csv() {
    let csv = "1970-01-01T00:00:00Z,1.5,0,1,2,3,4,5,\"a,b\"\n\
               1970-01-01T00:00:01Z,-1e31,10,11,12,13,14,15,xyz\n";
    let data = HapiData::from_csv_reader(csv.as_bytes(), &example_meta()).unwrap();

    assert_eq!(data.len(), 2);
    assert_eq!(data.time[1], "1970-01-01T00:00:01Z");
    let scalar = data.column("scalar").unwrap().numeric().unwrap();
    assert_eq!(scalar.dim(), (2, 1));
    assert_eq!(scalar[[1, 0]], -1e31);
    let matrix = data.column("matrix").unwrap().numeric().unwrap();
    assert_eq!(matrix.dim(), (2, 6));
    assert_eq!(matrix[[1, 5]], 15.0);
    let label = data.column("label").unwrap().text().unwrap();
    assert_eq!(label[[0, 0]], "a,b");
}

#[test]
fn test_load_json_flattens_nested_components() {
    let json = r#"{"data": [
        ["1970-01-01T00:00:00Z", 1.5, [[0, 1, 2], [3, 4, 5]], "abc"],
        ["1970-01-01T00:00:01Z", null, [[10, 11, 12], [13, 14, 15]], "xyz"]
    ]}"#;
    let data = HapiData::from_json_str(json, &example_meta()).unwrap();

    assert!(data.column("scalar").unwrap().numeric().unwrap()[[1, 0]].is_nan());
    assert_eq!(data.column("matrix").unwrap().numeric().unwrap()[[0, 4]], 4.0);
    assert_eq!(data.column("label").unwrap().text().unwrap()[[1, 0]], "xyz");
}

#[test]
fn test_load_rejects_bad_records() {
    let meta = example_meta();
    assert!(matches!(
        HapiData::from_csv_reader("1970-01-01, 1.0\n".as_bytes(), &meta),
        Err(PlotError::InvalidData(_))
    ));
    assert!(matches!(
        HapiData::from_csv_reader("1970-01-01, x, 0, 1, 2, 3, 4, 5, a\n".as_bytes(), &meta),
        Err(PlotError::InvalidData(_))
    ));
    assert!(HapiData::from_csv_reader("".as_bytes(), &meta).unwrap().is_empty());
}

#[test]
fn test_slice_two_dimensional_column() {
    let csv = "1970-01-01, 1.0, 0, 1, 2, 3, 4, 5, a\n";
    let data = HapiData::from_csv_reader(csv.as_bytes(), &example_meta()).unwrap();
    let matrix = data.column("matrix").unwrap();

    // Size [2, 3]: row j of the 2x3 block, or column j.
    let row = matrix.slice("matrix[1,:]".into(), &[2, 3], 1, 0);
    assert_eq!(row.numeric().unwrap().row(0).to_vec(), vec![3.0, 4.0, 5.0]);
    let col = matrix.slice("matrix[:,2]".into(), &[2, 3], 2, 1);
    assert_eq!(col.numeric().unwrap().row(0).to_vec(), vec![2.0, 5.0]);
}
