//! # SpecForge Store
//!
//! Persistence of generated artifacts.

pub mod layout;
pub mod writer;

pub use layout::ArtifactLayout;
pub use writer::{ArtifactWriter, FsArtifactWriter, InMemoryArtifactWriter, StoredFile};
