#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Environment-driven configuration for the `DataScribe` service.
//!
//! Layout: `model.rs` (typed config models), `validate.rs` (parsing
//! helpers), `loader.rs` (environment resolution with defaults).

pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_from_env;
pub use model::{AnalyzerConfig, AppConfig};
