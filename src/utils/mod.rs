pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod na;
pub mod nearest;
pub mod progress;
pub mod projection;

pub use constants::*;
pub use coordinates::{haversine_distance, validate_lon_lat};
pub use filename::DataLayout;
pub use nearest::{NearestMatch, NearestStationIndex};
pub use progress::ProgressReporter;
pub use projection::{utm_zone, utm_zone_for_median, Crs};
