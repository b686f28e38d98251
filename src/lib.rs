pub mod cartography;
pub mod config;
pub mod error;
pub mod fetch;
pub mod geography;
pub mod preprocess;

pub use error::{CartographyError, FetchError, PreprocessError};
