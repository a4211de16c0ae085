//! Convenience re-exports for common usage.
//!
//! # Example
//!
//! ```ignore
//! use reinhardt_fixtures::prelude::*;
//! ```

// Error types
pub use crate::error::{ErrorKind, SeedingError, SeedingResult};

// Entity types
pub use crate::entity::{EntityHandle, FieldValue, Identifier, Instance};

// Fixture types
pub use crate::fixtures::{
	DeferredContext, DeferredReference, EntityCatalog, EntityDefinition, Evaluation, FixtureData,
	FixtureDescriptor, FixtureFormat, FixtureParser, FixtureSet, RawRecord, RawValue, reference,
};

// Loader types
pub use crate::loader::{
	FieldInjectionBuilder, FixtureLoader, InstanceBuilder, LoadOptions, LoadResult, LoaderState,
	ReferenceRegistry,
};

// Store types
pub use crate::store::{EntityMetadata, FixtureStore, MemoryStore};

// Command types
pub use crate::commands::{LoadDataArgs, LoadDataCommand, LoadDataOptions};
