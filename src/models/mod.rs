pub mod combined;
pub mod county;
pub mod crop;
pub mod daily;
pub mod mapping;
pub mod normals;
pub mod station;
pub mod table;

pub use combined::CombinedRecord;
pub use county::County;
pub use crop::{CropCountyCount, CropPoint, CropStationCount, LegendEntry, NdviPoint};
pub use daily::{DailyRecord, RawDailyRecord, ShapedDailyRecord, WeatherFlags};
pub use mapping::StationMapping;
pub use normals::{composite_key, NormalRecord, RawNormalRecord};
pub use station::StationLocation;
pub use table::Table;

use serde::Serialize;

/// A row type with a fixed CSV header, written even when there are no rows.
pub trait CsvRecord: Serialize {
    const HEADERS: &'static [&'static str];
}
