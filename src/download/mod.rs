pub mod vegscape;

pub use vegscape::{DownloadOutcome, FailureKind, VegScapeClient};
