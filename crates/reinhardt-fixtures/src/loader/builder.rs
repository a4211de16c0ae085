//! Materialization of new instances from raw field data.

use async_trait::async_trait;

use crate::entity::{FieldValue, Identifier, Instance};
use crate::error::{SeedingError, SeedingResult};
use crate::fixtures::{
	DeferredContext, DeferredReference, EntityDefinition, FixtureDescriptor, RawValue,
};
use crate::store::{EntityMetadata, FixtureStore};

use super::accessor::FieldWriterChain;
use super::references::ReferenceRegistry;

/// Everything an [`InstanceBuilder`] may consult while building one record.
pub struct BuildContext<'a> {
	/// Definition of the entity type.
	pub definition: &'a EntityDefinition,
	/// Identifier metadata of the entity type.
	pub metadata: &'a EntityMetadata,
	/// Descriptor of the fixture being loaded.
	pub descriptor: &'a FixtureDescriptor,
	/// References registered so far.
	pub references: &'a ReferenceRegistry,
	/// Target store.
	pub store: &'a dyn FixtureStore,
}

/// Creates new instances from raw record fields.
#[async_trait]
pub trait InstanceBuilder: Send + Sync {
	/// Builds an instance. Only called for records resolved as new.
	async fn build(
		&self,
		fields: &[(String, RawValue)],
		identifier: &Identifier,
		context: &BuildContext<'_>,
	) -> SeedingResult<Instance>;
}

/// Allocates a blank instance and injects fields one by one.
///
/// Deferred values are evaluated right before their field is assigned, so
/// an evaluator sees every field declared before it.
#[derive(Debug, Default)]
pub struct FieldInjectionBuilder {
	writers: FieldWriterChain,
}

impl FieldInjectionBuilder {
	/// Creates a builder with the default writer chain.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a builder with a custom writer chain.
	pub fn with_writers(writers: FieldWriterChain) -> Self {
		Self { writers }
	}
}

#[async_trait]
impl InstanceBuilder for FieldInjectionBuilder {
	async fn build(
		&self,
		fields: &[(String, RawValue)],
		identifier: &Identifier,
		context: &BuildContext<'_>,
	) -> SeedingResult<Instance> {
		let definition = context.definition;
		if !definition.is_instantiable() {
			return Err(SeedingError::NotInstantiable(definition.name().to_string()));
		}

		let mut instance = Instance::blank(definition.name());
		for (field, raw) in fields {
			let value = match raw {
				RawValue::Literal(value) => value.clone(),
				RawValue::Deferred(deferred) => evaluate(field, deferred, &instance, context).await?,
			};
			self.writers.assign(definition, &mut instance, field, value)?;
		}

		if identifier.is_complete() && context.metadata.supports_forced_identifier {
			context
				.store
				.force_identifier(definition.name(), identifier)
				.await?;
		}
		Ok(instance)
	}
}

async fn evaluate(
	field: &str,
	deferred: &DeferredReference,
	instance: &Instance,
	context: &BuildContext<'_>,
) -> SeedingResult<FieldValue> {
	let deferred_context = DeferredContext {
		instance,
		descriptor: context.descriptor,
		store: context.store,
		references: context.references,
	};
	deferred
		.evaluate(&deferred_context)
		.await
		.map_err(|error| match error {
			// Lookup failures and evaluator-raised errors keep their own kind.
			SeedingError::ReferenceNotFound(_) | SeedingError::DeferredReference { .. } => error,
			other => SeedingError::deferred(field, other.to_string()),
		})
}
