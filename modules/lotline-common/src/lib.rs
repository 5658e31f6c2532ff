pub mod config;
pub mod dataset;
pub mod numeric;
pub mod types;

pub use config::Config;
pub use dataset::{DatasetError, SourceDataset};
pub use numeric::parse_decimal;
pub use types::*;
