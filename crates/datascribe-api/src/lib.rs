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

//! HTTP surface for the `DataScribe` service.
//!
//! Layout: `router.rs` (`ApiServer`, layer stack, serve), `state.rs` (shared
//! handler state), `error.rs` (bootstrap/serve errors), `http/` (handlers,
//! wire constants, response error mapping).

pub mod error;
pub mod http;
pub mod router;
pub mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use router::ApiServer;
