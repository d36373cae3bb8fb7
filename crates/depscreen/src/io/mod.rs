//! Dataset loading from delimited text files.
pub mod delimited;

pub use delimited::{parse_index_key, read_dataset, DatasetReaderConfig};
