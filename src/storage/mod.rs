//! Storage module for everything the harvester keeps on disk
//!
//! This module handles:
//! - The SQLite response cache used to resume crawls without the network
//! - Deterministic store paths for harvested PDFs
//! - Artifact sinks that persist PDF bodies

mod artifact;
mod cache;
mod schema;
mod sink;

pub use artifact::{artifact_path, PdfArtifact, DEFAULT_ARTIFACT_NAME};
pub use cache::{ResponseCache, CACHE_DB_NAME};
pub use sink::{ArtifactSink, FsSink, SinkError};
