pub mod archive_reader;
pub mod county_reader;
pub mod csv_reader;
pub mod raster_reader;

pub use archive_reader::ArchiveExtractor;
pub use county_reader::{CountyLocator, CountyReader};
pub use csv_reader::{decode_text, CsvReader};
pub use raster_reader::{GeoRaster, GeoTransform, RasterReader};
