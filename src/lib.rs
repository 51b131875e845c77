#[macro_use]
extern crate lazy_static;

pub mod constants;
pub mod error;
pub mod figure;
pub mod hapiplot;
pub mod heatmap;
pub mod meta;
pub mod options;
pub mod timeseries;
pub mod utils;

pub use crate::error::PlotError;
pub use crate::hapiplot::{hapiplot, ParameterPlot};
pub use crate::heatmap::{heatmap, Heatmap};
pub use crate::timeseries::{timeseries, Timeseries};

// Every coordinate and value handed to the renderer goes through this type,
// including times, which are seconds since the Unix epoch.
pub type FloatType = f64;

pub type Seconds = FloatType;
pub type Interval = (FloatType, FloatType);
