//! Shared utilities for the FIF alignment workspace: 2D buffers, logging
//! setup and configuration file (de)serialization.

pub mod buffer2;
pub mod file_format;
pub mod log_setup;

pub use buffer2::Buffer2;
pub use file_format::{
    deserialize, load_file, serialize, FileExtensionError, FileFormat, SerdeFormatError,
    SerdeFormatResult,
};
pub use log_setup::setup_logging;
