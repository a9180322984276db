pub mod csv_writer;
pub mod geojson_writer;

pub use csv_writer::{CsvWriter, FileInfo};
pub use geojson_writer::GeoJsonWriter;
