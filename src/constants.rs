/// Relative tolerance used when deciding whether consecutive cell widths are equal.
pub const UNIFORM_RTOL: f64 = 1e-6;

/// Width given to an axis made of a single center, in axis units (seconds for time).
pub const SINGLE_CELL_WIDTH: f64 = 1.0;

/// Integer-valued z with at most this many distinct values gets a discrete color scale.
pub const MAX_DISCRETE_LEVELS: usize = 10;

/// A 1-D parameter with more components than this is drawn as a heatmap.
pub const HEATMAP_MIN_COMPONENTS: usize = 10;

/// Name and units longer than this (combined) are split over two label lines.
pub const LABEL_WRAP_LENGTH: usize = 30;

/// Servers whose URL contains this have their per-column mean removed before plotting.
pub const MEAN_REMOVAL_SERVER_TAG: &str = "uk/GIN_";

/// Spacing between hatch lines, in pixels.
pub const HATCH_SPACING: i32 = 8;

/// Number of color steps drawn in a continuous colorbar.
pub const COLORBAR_STEPS: usize = 200;

/// Width of the colorbar area, in pixels (at 144 dpi).
pub const COLORBAR_AREA_WIDTH: u32 = 130;

/// Directory name (under the system temp dir) used when no cache directory is configured.
pub const DEFAULT_CACHE_DIRNAME: &str = "hapi-data";

/// Legend suffix used when a parameter has no records in the requested interval.
pub const NO_DATA_SUFFIX: &str = " [no data in interval]";
