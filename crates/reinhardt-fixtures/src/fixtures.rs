//! Fixture declarations.
//!
//! - [`FixtureDescriptor`] - per-dataset loading policy
//! - [`RawRecord`] / [`RawValue`] - records as declared, literals or deferred values
//! - [`FixtureSet`] - a descriptor with its records
//! - [`EntityCatalog`] / [`EntityDefinition`] - which entity types exist and how their fields are reached
//! - [`FixtureParser`] - JSON and YAML fixture files

pub mod descriptor;
pub mod format;
pub mod parser;
pub mod registry;

// Re-export commonly used types
pub use descriptor::{
	DeferredContext, DeferredReference, Evaluation, FixtureDescriptor, FixtureSet, RawRecord,
	RawValue, reference,
};
pub use format::{FixtureData, FixtureFormat};
pub use parser::FixtureParser;
pub use registry::{
	DisplayFn, EntityCatalog, EntityDefinition, Getter, Mutator, getter_name, mutator_name,
};
