pub mod connection_analyzer;
pub mod imputation_analyzer;
pub mod missing_analyzer;

pub use connection_analyzer::{ConnectionAnalyzer, ConnectionReport, StationConnection};
pub use imputation_analyzer::{comparison_summary, ColumnStats, ImputationComparison};
pub use missing_analyzer::{MissingReport, MissingValueAnalyzer};
