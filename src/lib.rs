#![warn(missing_docs)]
//! GenStudio - prompt-to-image relay backend.
//!
//! Takes a text prompt and a style keyword, enriches the prompt, asks an
//! external text-to-image provider for the picture, and keeps the result in an
//! in-memory store backed by PNG files on disk. A small HTTP surface lets a
//! front-end request generations, poll status and fetch images.
//!
//! # Quick Start
//!
//! ```no_run
//! use genstudio::{router, AppState, ArtifactStore, PollinationsProvider};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> genstudio::Result<()> {
//!     let provider = Arc::new(PollinationsProvider::builder().build()?);
//!     let store = Arc::new(ArtifactStore::open("images")?);
//!     let state = AppState::new(provider, store);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//!     genstudio::serve(listener, state).await
//! }
//! ```
//!
//! # Modules
//!
//! - [`image`]: provider trait, request/response types, the Pollinations client
//! - [`prompt`]: style table, quality descriptors, suggestion pool
//! - [`store`]: id → record map plus on-disk PNGs
//! - [`server`]: axum router and handlers

mod error;

pub mod image;
pub mod prompt;
pub mod server;
pub mod store;

// Re-export error types at crate root
pub use error::{GenStudioError, Result};

// `image` also names the decoding crate, so go through `crate::`.
pub use crate::image::providers::{PollinationsProvider, PollinationsProviderBuilder};
pub use crate::image::{GeneratedImage, GenerationRequest, ImageFormat, ImageProvider};
pub use crate::server::{router, serve, AppState};
pub use crate::store::{ArtifactStore, GenerationRecord, GenerationStatus};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{GenStudioError, Result};
    pub use crate::image::providers::PollinationsProvider;
    pub use crate::image::{GeneratedImage, GenerationRequest, ImageProvider};
    pub use crate::server::AppState;
    pub use crate::store::ArtifactStore;
}
