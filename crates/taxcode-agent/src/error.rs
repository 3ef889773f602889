//! Error types for conversion, answering, and the reformatting pipeline.

use std::path::PathBuf;

/// Error during XML to Markdown conversion.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConvertError {
    /// Input document could not be read.
    #[error("failed to read {path}")]
    Read {
        /// Path of the input document.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Output document could not be written.
    #[error("failed to write {path}")]
    Write {
        /// Path of the output document.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// XML parsing error.
    #[error("XML parse error")]
    XmlParse(#[from] quick_xml::Error),

    /// Encoding error during XML parsing.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// Document contained no root element.
    #[error("no root element found in document")]
    EmptyDocument,
}

/// Error from the question-answering layer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AgentError {
    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed")]
    Http(#[from] ureq::Error),

    /// HTTP response error (server returned error status).
    #[error("model endpoint returned HTTP {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}

/// Error from the chunked reformatting pipeline.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// I/O error on input, intermediate, or output files.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Conversion error while preparing the document.
    #[error("conversion error")]
    Convert(#[from] ConvertError),
}
