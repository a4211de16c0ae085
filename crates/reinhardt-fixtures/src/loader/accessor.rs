//! Field access for instances under construction.
//!
//! Writes go through a chain of [`FieldWriter`]s: structured property access
//! first, then the conventionally named `set_<field>` mutator. Reads try the
//! `get_<field>` getter before the raw property.

use crate::entity::{FieldValue, Instance};
use crate::error::{SeedingError, SeedingResult};
use crate::fixtures::{EntityDefinition, getter_name, mutator_name};

/// Strategy for assigning one field of an instance.
pub trait FieldWriter: Send + Sync {
	/// Assigns the field if this writer can.
	///
	/// Returns the value back when the writer does not handle the field so
	/// the next writer in a chain can try.
	fn write(
		&self,
		definition: &EntityDefinition,
		instance: &mut Instance,
		field: &str,
		value: FieldValue,
	) -> SeedingResult<Option<FieldValue>>;
}

/// Assigns declared properties directly, skipping any mutator logic.
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyWriter;

impl FieldWriter for PropertyWriter {
	fn write(
		&self,
		definition: &EntityDefinition,
		instance: &mut Instance,
		field: &str,
		value: FieldValue,
	) -> SeedingResult<Option<FieldValue>> {
		if !definition.has_property(field) {
			return Ok(Some(value));
		}
		instance.set(field, value);
		Ok(None)
	}
}

/// Assigns through a `set_<field>` mutator.
#[derive(Debug, Default, Clone, Copy)]
pub struct MutatorWriter;

impl FieldWriter for MutatorWriter {
	fn write(
		&self,
		definition: &EntityDefinition,
		instance: &mut Instance,
		field: &str,
		value: FieldValue,
	) -> SeedingResult<Option<FieldValue>> {
		match definition.mutator(&mutator_name(field)) {
			Some(mutator) => {
				mutator(instance, value)?;
				Ok(None)
			}
			None => Ok(Some(value)),
		}
	}
}

/// Writers tried in order until one accepts the field.
pub struct FieldWriterChain {
	writers: Vec<Box<dyn FieldWriter>>,
}

impl Default for FieldWriterChain {
	fn default() -> Self {
		Self::new(vec![Box::new(PropertyWriter), Box::new(MutatorWriter)])
	}
}

impl FieldWriterChain {
	/// Creates a chain from writers in priority order.
	pub fn new(writers: Vec<Box<dyn FieldWriter>>) -> Self {
		Self { writers }
	}

	/// Assigns a field, failing if no writer accepts it.
	pub fn assign(
		&self,
		definition: &EntityDefinition,
		instance: &mut Instance,
		field: &str,
		value: FieldValue,
	) -> SeedingResult<()> {
		let mut pending = value;
		for writer in &self.writers {
			match writer.write(definition, instance, field, pending)? {
				Some(rejected) => pending = rejected,
				None => return Ok(()),
			}
		}
		Err(SeedingError::Configuration(format!(
			"{} has no property or mutator for field '{}'",
			definition.name(),
			field
		)))
	}
}

impl std::fmt::Debug for FieldWriterChain {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FieldWriterChain")
			.field("writers", &self.writers.len())
			.finish()
	}
}

/// Reads a field through the `get_<field>` getter, falling back to the property.
pub fn read_field(
	definition: &EntityDefinition,
	instance: &Instance,
	field: &str,
) -> Option<FieldValue> {
	match definition.getter(&getter_name(field)) {
		Some(getter) => getter(instance),
		None => instance.get(field).cloned(),
	}
}
