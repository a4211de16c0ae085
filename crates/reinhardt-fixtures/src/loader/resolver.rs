//! New-versus-existing classification of raw records.

use serde_json::Value;
use tracing::trace;

use crate::entity::{EntityHandle, Identifier};
use crate::error::SeedingResult;
use crate::fixtures::{EntityDefinition, FixtureDescriptor, RawRecord, RawValue};
use crate::store::{EntityMetadata, FixtureStore};

use super::accessor::read_field;

/// Outcome of identity resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
	/// The record must be built and persisted.
	New,
	/// The record is already in the store.
	Existing(EntityHandle),
}

/// Extracts identifiers from raw records and reconciles them with the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResolver;

impl IdentityResolver {
	/// Creates a resolver.
	pub fn new() -> Self {
		Self
	}

	/// Reads the identifier fields declared by a record.
	///
	/// Field records are read by key; a missing key or a deferred value
	/// leaves that identifier field empty. Built records are read through
	/// the getter/property chain.
	pub fn identifier(
		&self,
		record: &RawRecord,
		definition: &EntityDefinition,
		metadata: &EntityMetadata,
	) -> Identifier {
		let values = metadata
			.identifier_fields
			.iter()
			.map(|field| {
				let value = match record {
					RawRecord::Fields(fields) => literal_value(fields, field),
					RawRecord::Built(instance) => read_field(definition, instance, field)
						.and_then(|value| value.as_value().cloned()),
				};
				(field.clone(), value)
			})
			.collect();
		Identifier::new(values)
	}

	/// Classifies a record as new or existing.
	pub async fn resolve(
		&self,
		record: &RawRecord,
		descriptor: &FixtureDescriptor,
		definition: &EntityDefinition,
		metadata: &EntityMetadata,
		store: &dyn FixtureStore,
	) -> SeedingResult<(Identifier, Disposition)> {
		let identifier = self.identifier(record, definition, metadata);

		if identifier.is_empty() || !descriptor.reconcile_existing_ids {
			return Ok((identifier, Disposition::New));
		}
		if !identifier.is_complete() {
			trace!(entity = %descriptor.entity, ?identifier, "incomplete identifier, not reconciled");
			return Ok((identifier, Disposition::New));
		}

		let disposition = match store.find_one(&descriptor.entity, &identifier).await? {
			Some(handle) => Disposition::Existing(handle),
			None => Disposition::New,
		};
		Ok((identifier, disposition))
	}
}

fn literal_value(fields: &[(String, RawValue)], field: &str) -> Option<Value> {
	fields
		.iter()
		.find(|(name, _)| name == field)
		.and_then(|(_, value)| match value {
			RawValue::Literal(value) => value.as_value().cloned(),
			RawValue::Deferred(_) => None,
		})
}
