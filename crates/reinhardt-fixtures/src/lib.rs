//! Fixture loading for the Reinhardt framework.
//!
//! This crate loads declarative datasets ("fixtures") into a store:
//!
//! - **Identity reconciliation**: records whose identifier already exists are
//!   reused instead of inserted again, so loading is idempotent
//! - **Deferred references**: a field may be computed at assignment time,
//!   typically by looking up a record registered by an earlier fixture
//! - **Batched commits**: writes are flushed every N records or once at the end
//! - **Priorities**: fixtures load in ascending priority order
//!
//! # Features
//!
//! - `json` - JSON fixture files (enabled by default)
//! - `yaml` - YAML fixture files
//! - `full` - All features enabled
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use reinhardt_fixtures::prelude::*;
//!
//! let store = Arc::new(
//!     MemoryStore::new()
//!         .with_entity(EntityMetadata::new("blog.Post", "id"))
//!         .with_generated_entity(EntityMetadata::new("blog.Comment", "id")),
//! );
//! let catalog = EntityCatalog::new()
//!     .with(EntityDefinition::open("blog.Post"))
//!     .with(EntityDefinition::open("blog.Comment"));
//!
//! let posts = FixtureSet::new(
//!     FixtureDescriptor::new("blog.Post")
//!         .with_reference_prefix("posts-")
//!         .with_flush_every(1),
//!     vec![RawRecord::new().field("id", "p1").field("title", "First")],
//! );
//! let comments = FixtureSet::new(
//!     FixtureDescriptor::new("blog.Comment").with_priority(10),
//!     vec![RawRecord::new().reference("post", "posts-p1").field("body", "Nice")],
//! );
//!
//! let mut loader = FixtureLoader::new(store, catalog);
//! let result = loader.load_all(&[posts, comments]).await?;
//! println!("Created {} records", result.newly_created);
//! ```
//!
//! ## Fixture Files
//!
//! ```ignore
//! use reinhardt_fixtures::commands::{LoadDataArgs, LoadDataCommand, LoadDataOptions};
//!
//! let cmd = LoadDataCommand::new(store, catalog);
//! let args = LoadDataArgs {
//!     fixture_paths: vec!["fixtures/blog.json".into()],
//! };
//! let result = cmd.execute(args, LoadDataOptions::new().with_verbosity(1)).await?;
//! ```
//!
//! # Architecture
//!
//! - [`FixtureLoader`](loader::FixtureLoader) - orders fixtures and drives each record through the pipeline
//! - [`IdentityResolver`](loader::IdentityResolver) - new-versus-existing classification
//! - [`InstanceBuilder`](loader::InstanceBuilder) - materializes new records
//! - [`ReferenceRegistry`](loader::ReferenceRegistry) - reference keys of one load
//! - [`BatchScheduler`](loader::BatchScheduler) - flush timing
//! - [`FixtureStore`](store::FixtureStore) - the store collaborator; [`MemoryStore`](store::MemoryStore) is bundled

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod commands;
pub mod entity;
pub mod error;
pub mod fixtures;
pub mod loader;
pub mod prelude;
pub mod store;

// Re-export commonly used types at crate root
pub use entity::{EntityHandle, FieldValue, Identifier, Instance};
pub use error::{ErrorKind, SeedingError, SeedingResult};
pub use fixtures::{EntityCatalog, EntityDefinition, FixtureDescriptor, FixtureSet, RawRecord};
pub use loader::{FixtureLoader, LoadOptions, LoadResult};
pub use store::{EntityMetadata, FixtureStore, MemoryStore};
