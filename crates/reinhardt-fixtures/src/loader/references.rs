//! Reference registry scoped to one load.

use std::collections::HashMap;

use tracing::debug;

use crate::entity::{EntityHandle, Instance, key_fragment};
use crate::error::{SeedingError, SeedingResult};
use crate::fixtures::{EntityDefinition, FixtureDescriptor};
use crate::store::EntityMetadata;

use super::accessor::read_field;

/// Maps reference keys to committed (or reconciled) instances.
///
/// Entries are write-once: registering a key twice fails and the first
/// handle stays registered.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRegistry {
	entries: HashMap<String, EntityHandle>,
	order: Vec<String>,
}

impl ReferenceRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a handle under a key.
	pub fn register(&mut self, key: impl Into<String>, handle: EntityHandle) -> SeedingResult<()> {
		let key = key.into();
		if self.entries.contains_key(&key) {
			return Err(SeedingError::DuplicateReference(key));
		}
		debug!(key = %key, "registered reference");
		self.order.push(key.clone());
		self.entries.insert(key, handle);
		Ok(())
	}

	/// Looks up a registered handle.
	pub fn lookup(&self, key: &str) -> SeedingResult<EntityHandle> {
		self.entries
			.get(key)
			.cloned()
			.ok_or_else(|| SeedingError::ReferenceNotFound(key.to_string()))
	}

	/// Checks if a key is registered.
	pub fn contains(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Returns registered keys in registration order.
	pub fn keys(&self) -> &[String] {
		&self.order
	}

	/// Returns the number of registered references.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Derives the reference key of a committed instance.
///
/// Returns `Ok(None)` when the descriptor declares no prefix. The key value
/// is read through the reference accessor (the entity's identifier field by
/// default); when that yields nothing the entity's string conversion is
/// used. Having neither is an error.
pub fn reference_key(
	descriptor: &FixtureDescriptor,
	definition: &EntityDefinition,
	metadata: &EntityMetadata,
	instance: &Instance,
) -> SeedingResult<Option<String>> {
	let Some(prefix) = descriptor.reference_prefix.as_deref() else {
		return Ok(None);
	};

	let accessor = descriptor
		.reference_accessor
		.as_deref()
		.or_else(|| metadata.single_identifier_field());
	let value = accessor
		.and_then(|field| read_field(definition, instance, field))
		.and_then(|value| value.as_value().filter(|v| !v.is_null()).map(key_fragment));

	match value.or_else(|| definition.display(instance)) {
		Some(fragment) => Ok(Some(format!("{}{}", prefix, fragment))),
		None => Err(SeedingError::UnkeyedReference {
			entity: instance.entity().to_string(),
			prefix: prefix.to_string(),
		}),
	}
}
