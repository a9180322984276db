pub mod cleaner;
pub mod crop_combiner;
pub mod crop_mapper;
pub mod data_merger;
pub mod imputer;
pub mod parallel_processor;
pub mod raw_combiner;
pub mod shaper;
pub mod station_mapper;

pub use cleaner::{CleanReport, DailyCleaner};
pub use crop_combiner::{CombineReport, CropCountyCombiner, CropReportCombiner};
pub use crop_mapper::{
    CropCountyMapper, CropStationMapper, RasterConverter, RasterMode, YearlyRunReport,
};
pub use data_merger::{DataMerger, MergeReport};
pub use imputer::{ImputationReport, Imputer};
pub use parallel_processor::ParallelProcessor;
pub use raw_combiner::{RawCombiner, SegmentReport};
pub use shaper::{DailyShaper, NormalsShaper, ShapeResult};
pub use station_mapper::{MappingReport, StationMapper};
