//! Store collaborator contract.
//!
//! The loader never talks to a database directly. It stages instances with
//! [`FixtureStore::persist`], commits them with [`FixtureStore::flush`] and
//! releases the store's identity cache with [`FixtureStore::clear`].
//! [`MemoryStore`] is the bundled implementation.

mod memory;

pub use memory::{MemoryStore, StoreOperation};

use async_trait::async_trait;

use crate::entity::{EntityHandle, Identifier};
use crate::error::SeedingResult;

/// Identifier metadata of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
	/// Entity type name.
	pub entity: String,

	/// Identifier fields in key order. More than one field is a composite key.
	pub identifier_fields: Vec<String>,

	/// Whether a caller-supplied identifier can bypass generation.
	pub supports_forced_identifier: bool,
}

impl EntityMetadata {
	/// Creates metadata for an entity with a single identifier field.
	pub fn new(entity: impl Into<String>, identifier_field: impl Into<String>) -> Self {
		Self {
			entity: entity.into(),
			identifier_fields: vec![identifier_field.into()],
			supports_forced_identifier: true,
		}
	}

	/// Creates metadata for an entity with a composite identifier.
	pub fn composite<I, S>(entity: impl Into<String>, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			entity: entity.into(),
			identifier_fields: fields.into_iter().map(Into::into).collect(),
			supports_forced_identifier: true,
		}
	}

	/// Sets whether forced identifiers are supported.
	pub fn with_forced_identifier(mut self, supported: bool) -> Self {
		self.supports_forced_identifier = supported;
		self
	}

	/// Returns true if the identifier spans more than one field.
	pub fn is_composite(&self) -> bool {
		self.identifier_fields.len() > 1
	}

	/// Returns the identifier field of a single-field key.
	pub fn single_identifier_field(&self) -> Option<&str> {
		match self.identifier_fields.as_slice() {
			[field] => Some(field),
			_ => None,
		}
	}
}

/// Persistence backend the fixture loader writes through.
///
/// Implementations use interior mutability; the loader only ever calls one
/// method at a time.
#[async_trait]
pub trait FixtureStore: Send + Sync {
	/// Returns identifier metadata for an entity type.
	async fn metadata_for(&self, entity: &str) -> SeedingResult<EntityMetadata>;

	/// Finds a committed instance whose identifier matches exactly.
	async fn find_one(
		&self,
		entity: &str,
		identifier: &Identifier,
	) -> SeedingResult<Option<EntityHandle>>;

	/// Stages an instance for writing. It becomes visible after [`flush`](Self::flush).
	async fn persist(&self, handle: &EntityHandle) -> SeedingResult<()>;

	/// Commits staged writes.
	async fn flush(&self) -> SeedingResult<()>;

	/// Drops the in-process identity cache. Committed data is unaffected.
	async fn clear(&self) -> SeedingResult<()>;

	/// Makes the next [`persist`](Self::persist) of `entity` keep the given
	/// identifier instead of generating one.
	async fn force_identifier(&self, entity: &str, identifier: &Identifier) -> SeedingResult<()>;

	/// Enables or disables statement logging, returning the previous setting.
	///
	/// Stores without logging ignore this.
	fn set_logging_enabled(&self, _enabled: bool) -> bool {
		false
	}
}
