//! Error types for mdocx operations.
//!
//! Only packaging failures are errors in the conversion sense; everything
//! else the pipeline encounters is downgraded and recorded in the
//! [`ConversionReport`](crate::ConversionReport).

use thiserror::Error;

/// Errors that can occur while producing or configuring a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Packaging failed: {0}")]
    Packaging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
