//! US tax code tooling.
//!
//! Three layers, used in order by the CLI:
//!
//! 1. [`convert`] — a pure tree transformation from US Legislative Markup
//!    (USLM) XML to a Markdown artifact, built on the [`tree`] document
//!    model.
//! 2. [`pipeline`] — chunked reformatting of that artifact through a local
//!    language model, with retry, checkpointing, and resume.
//! 3. [`agent`] — keyword retrieval over the finished document plus
//!    model-backed question answering with citations.
//!
//! The [`ollama`] module is the shared HTTP boundary to the model; all
//! errors live in [`error`].

pub mod agent;
pub mod convert;
pub mod error;
pub mod ollama;
pub mod options;
pub mod pipeline;
pub mod tree;

pub use agent::TaxAgent;
pub use convert::{convert_file, convert_str};
pub use error::{AgentError, ConvertError, PipelineError};
pub use ollama::OllamaClient;
pub use options::ConvertOptions;
