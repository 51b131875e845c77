use anyhow::Context;
use hapiplot::meta::Meta;
use hapiplot::options::{setopts, PlotOptions};
use hapiplot::utils::loader::HapiData;
use serde_json::{json, Value};
use std::path::Path;

const META_FILE: &str = "meta.json";
const CSV_FILE: &str = "data.csv";
const JSON_FILE: &str = "data.json";
const OPTIONS_FILE: &str = "options.json";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Load metadata and data
    let meta = Meta::from_path(META_FILE).with_context(|| format!("reading {META_FILE}"))?;
    let data = if Path::new(CSV_FILE).exists() {
        HapiData::from_csv_path(CSV_FILE, &meta).with_context(|| format!("reading {CSV_FILE}"))?
    } else {
        let json = std::fs::read_to_string(JSON_FILE)
            .with_context(|| format!("neither {CSV_FILE} nor {JSON_FILE} found"))?;
        HapiData::from_json_str(&json, &meta).with_context(|| format!("reading {JSON_FILE}"))?
    };

    // Options: write images under ./images unless options.json says otherwise
    let overrides: Value = match std::fs::read_to_string(OPTIONS_FILE) {
        Ok(text) => serde_json::from_str(&text).with_context(|| format!("parsing {OPTIONS_FILE}"))?,
        Err(_) => json!({}),
    };
    let defaults = json!({"saveimage": true, "logging": true, "cachedir": "images"});
    let opts = PlotOptions::from_json(&setopts(defaults, &overrides))?;

    // Plot
    let plots = hapiplot::hapiplot(&data, &meta, &opts)?;
    for plot in plots.iter() {
        match &plot.imagefile {
            Some(path) => println!("{}: {}", plot.name, path.display()),
            None => println!("{}: plotted", plot.name),
        }
    }

    Ok(())
}
