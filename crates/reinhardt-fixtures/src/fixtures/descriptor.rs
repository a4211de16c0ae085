//! Fixture descriptors and the raw records they declare.

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde::Deserialize;

use crate::entity::{FieldValue, Instance};
use crate::error::{SeedingError, SeedingResult};
use crate::loader::ReferenceRegistry;
use crate::store::FixtureStore;

/// Per-dataset loading policy.
///
/// Defaults: priority `0`, no reference prefix, reference accessor derived
/// from the entity's identifier field, flush once at the end, reconcile
/// existing identifiers, clear the store on flush, disable store logging.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FixtureDescriptor {
	/// Entity type the records materialize into.
	pub entity: String,

	/// Name used in logs and errors. Defaults to the entity type.
	#[serde(default)]
	pub name: Option<String>,

	/// Lower priorities load first; ties keep declaration order.
	#[serde(default)]
	pub priority: i32,

	/// Prefix of the reference keys registered for committed records.
	#[serde(default)]
	pub reference_prefix: Option<String>,

	/// Field read to build reference keys.
	#[serde(default)]
	pub reference_accessor: Option<String>,

	/// Flush after every N records; `0` flushes once at the end.
	#[serde(default)]
	pub flush_every: usize,

	/// Look up records with caller-supplied identifiers before inserting.
	#[serde(default = "default_true")]
	pub reconcile_existing_ids: bool,

	/// Clear the store's identity cache after each flush.
	#[serde(default = "default_true")]
	pub clear_on_flush: bool,

	/// Turn store statement logging off while this fixture loads.
	#[serde(default = "default_true")]
	pub disable_store_logging: bool,
}

fn default_true() -> bool {
	true
}

impl FixtureDescriptor {
	/// Creates a descriptor with default policy.
	pub fn new(entity: impl Into<String>) -> Self {
		Self {
			entity: entity.into(),
			name: None,
			priority: 0,
			reference_prefix: None,
			reference_accessor: None,
			flush_every: 0,
			reconcile_existing_ids: true,
			clear_on_flush: true,
			disable_store_logging: true,
		}
	}

	/// Sets the name used in logs and errors.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Sets the loading priority.
	pub fn with_priority(mut self, priority: i32) -> Self {
		self.priority = priority;
		self
	}

	/// Sets the reference key prefix.
	pub fn with_reference_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.reference_prefix = Some(prefix.into());
		self
	}

	/// Sets the field read to build reference keys.
	pub fn with_reference_accessor(mut self, accessor: impl Into<String>) -> Self {
		self.reference_accessor = Some(accessor.into());
		self
	}

	/// Sets the batch size; `0` flushes once at the end.
	pub fn with_flush_every(mut self, n: usize) -> Self {
		self.flush_every = n;
		self
	}

	/// Sets whether existing identifiers are reconciled.
	pub fn with_reconcile_existing_ids(mut self, reconcile: bool) -> Self {
		self.reconcile_existing_ids = reconcile;
		self
	}

	/// Sets whether the store is cleared on flush.
	pub fn with_clear_on_flush(mut self, clear: bool) -> Self {
		self.clear_on_flush = clear;
		self
	}

	/// Sets whether store logging is disabled during the load.
	pub fn with_disable_store_logging(mut self, disable: bool) -> Self {
		self.disable_store_logging = disable;
		self
	}

	/// Returns the display name of the fixture.
	pub fn display_name(&self) -> &str {
		self.name.as_deref().unwrap_or(&self.entity)
	}

	/// Checks the descriptor for missing required fields.
	pub fn validate(&self) -> SeedingResult<()> {
		if self.entity.trim().is_empty() {
			return Err(SeedingError::Configuration(
				"fixture descriptor has no entity type".to_string(),
			));
		}
		if matches!(&self.reference_prefix, Some(prefix) if prefix.is_empty()) {
			return Err(SeedingError::Configuration(format!(
				"fixture '{}' declares an empty reference prefix",
				self.display_name()
			)));
		}
		Ok(())
	}
}

/// What a deferred reference sees when it is evaluated.
pub struct DeferredContext<'a> {
	/// Instance under construction, with the fields assigned so far.
	pub instance: &'a Instance,
	/// Descriptor of the fixture being loaded.
	pub descriptor: &'a FixtureDescriptor,
	/// Store the fixture is loaded into.
	pub store: &'a dyn FixtureStore,
	/// References registered so far in this load.
	pub references: &'a ReferenceRegistry,
}

/// Future returned by a deferred evaluator.
pub type Evaluation<'c> = BoxFuture<'c, SeedingResult<FieldValue>>;

type Evaluator = dyn for<'c> Fn(&'c DeferredContext<'c>) -> Evaluation<'c> + Send + Sync;

/// Field value computed when the field is assigned.
///
/// Evaluators are asynchronous so they can query the store they are handed;
/// [`DeferredReference::from_fn`] wraps a plain closure.
#[derive(Clone)]
pub struct DeferredReference(Arc<Evaluator>);

impl DeferredReference {
	/// Wraps an asynchronous evaluator.
	///
	/// ```ignore
	/// let post = DeferredReference::new(|context| {
	///     async move {
	///         let id = Identifier::new(vec![("id".to_string(), Some(json!("p1")))]);
	///         let handle = context.store.find_one("blog.Post", &id).await?;
	///         handle
	///             .map(FieldValue::Entity)
	///             .ok_or_else(|| SeedingError::deferred("post", "p1 is not committed"))
	///     }
	///     .boxed()
	/// });
	/// ```
	pub fn new<F>(evaluator: F) -> Self
	where
		F: for<'c> Fn(&'c DeferredContext<'c>) -> Evaluation<'c> + Send + Sync + 'static,
	{
		Self(Arc::new(evaluator))
	}

	/// Wraps a synchronous evaluator.
	pub fn from_fn<F>(evaluator: F) -> Self
	where
		F: Fn(&DeferredContext<'_>) -> SeedingResult<FieldValue> + Send + Sync + 'static,
	{
		Self::new(move |context| future::ready(evaluator(context)).boxed())
	}

	/// Runs the evaluator.
	pub async fn evaluate(&self, context: &DeferredContext<'_>) -> SeedingResult<FieldValue> {
		(self.0)(context).await
	}
}

impl fmt::Debug for DeferredReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("DeferredReference(..)")
	}
}

/// Deferred lookup of a registered reference key.
pub fn reference(key: impl Into<String>) -> DeferredReference {
	let key = key.into();
	DeferredReference::from_fn(move |context| {
		context
			.references
			.lookup(&key)
			.map(FieldValue::Entity)
	})
}

/// Raw value of a record field.
#[derive(Debug, Clone)]
pub enum RawValue {
	/// Assigned as is.
	Literal(FieldValue),
	/// Evaluated at assignment time.
	Deferred(DeferredReference),
}

/// A record declared by a fixture.
#[derive(Debug, Clone)]
pub enum RawRecord {
	/// Field data in declaration order.
	Fields(Vec<(String, RawValue)>),
	/// An instance built by the caller; persisted as is.
	Built(Instance),
}

impl Default for RawRecord {
	fn default() -> Self {
		Self::Fields(Vec::new())
	}
}

impl RawRecord {
	/// Creates an empty field record.
	pub fn new() -> Self {
		Self::default()
	}

	/// Wraps a caller-built instance.
	pub fn built(instance: Instance) -> Self {
		Self::Built(instance)
	}

	/// Appends a literal field.
	pub fn field(self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
		self.push(name.into(), RawValue::Literal(value.into()))
	}

	/// Appends a field resolved from a reference key.
	///
	/// Deferred values are ignored on built records.
	pub fn reference(self, name: impl Into<String>, key: impl Into<String>) -> Self {
		self.push(name.into(), RawValue::Deferred(reference(key)))
	}

	/// Appends a field computed by a synchronous evaluator.
	pub fn deferred<F>(self, name: impl Into<String>, evaluator: F) -> Self
	where
		F: Fn(&DeferredContext<'_>) -> SeedingResult<FieldValue> + Send + Sync + 'static,
	{
		self.push(
			name.into(),
			RawValue::Deferred(DeferredReference::from_fn(evaluator)),
		)
	}

	/// Appends a field computed by an asynchronous evaluator.
	pub fn deferred_async<F>(self, name: impl Into<String>, evaluator: F) -> Self
	where
		F: for<'c> Fn(&'c DeferredContext<'c>) -> Evaluation<'c> + Send + Sync + 'static,
	{
		self.push(name.into(), RawValue::Deferred(DeferredReference::new(evaluator)))
	}

	fn push(self, name: String, value: RawValue) -> Self {
		match self {
			Self::Fields(mut fields) => {
				fields.push((name, value));
				Self::Fields(fields)
			}
			Self::Built(mut instance) => {
				if let RawValue::Literal(value) = value {
					instance.set(name, value);
				}
				Self::Built(instance)
			}
		}
	}
}

/// A descriptor together with the records it declares.
#[derive(Debug, Clone)]
pub struct FixtureSet {
	/// Loading policy.
	pub descriptor: FixtureDescriptor,
	/// Records in declaration order.
	pub records: Vec<RawRecord>,
}

impl FixtureSet {
	/// Creates a fixture set.
	pub fn new(descriptor: FixtureDescriptor, records: Vec<RawRecord>) -> Self {
		Self {
			descriptor,
			records,
		}
	}

	/// Returns the number of records.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Returns true if there are no records.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}
