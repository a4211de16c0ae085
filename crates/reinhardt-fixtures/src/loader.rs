//! Fixture loading.
//!
//! [`FixtureLoader`] drives a batch of [`FixtureSet`]s into a
//! [`FixtureStore`]:
//!
//! 1. fixtures are ordered by ascending priority, ties keeping declaration order;
//! 2. each record is classified as new or existing by the [`IdentityResolver`];
//! 3. new records are materialized by an [`InstanceBuilder`] and persisted;
//! 4. the [`BatchScheduler`] decides when to flush (and optionally clear) the store;
//! 5. the record is registered in the [`ReferenceRegistry`] when the fixture
//!    declares a reference prefix.
//!
//! Loading is strictly sequential. Later records may depend on earlier ones
//! through deferred references, so nothing is reordered or run concurrently.
//! Any failure aborts the remaining load; batches flushed before the failure
//! stay committed.

mod accessor;
mod builder;
mod references;
mod resolver;
mod scheduler;

pub use accessor::{FieldWriter, FieldWriterChain, MutatorWriter, PropertyWriter, read_field};
pub use builder::{BuildContext, FieldInjectionBuilder, InstanceBuilder};
pub use references::{ReferenceRegistry, reference_key};
pub use resolver::{Disposition, IdentityResolver};
pub use scheduler::BatchScheduler;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::entity::EntityHandle;
use crate::error::{SeedingError, SeedingResult};
use crate::fixtures::{EntityCatalog, EntityDefinition, FixtureDescriptor, FixtureSet, RawRecord};
use crate::store::{EntityMetadata, FixtureStore};

/// Options for a fixture load.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
	/// Only load fixtures for these entity types (all when empty).
	pub entities: Vec<String>,

	/// Skip fixtures whose entity type is not in the catalog.
	pub ignore_missing: bool,

	/// Verbosity level. From `1`, per-fixture progress is logged at `INFO`
	/// instead of `DEBUG`; from `2`, per-record outcomes at `DEBUG` instead
	/// of `TRACE`.
	pub verbosity: u8,
}

impl LoadOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the entity filter.
	pub fn with_entities(mut self, entities: Vec<String>) -> Self {
		self.entities = entities;
		self
	}

	/// Sets the ignore missing flag.
	pub fn with_ignore_missing(mut self, ignore: bool) -> Self {
		self.ignore_missing = ignore;
		self
	}

	/// Sets the verbosity level.
	pub fn with_verbosity(mut self, level: u8) -> Self {
		self.verbosity = level;
		self
	}

	fn includes(&self, entity: &str) -> bool {
		self.entities.is_empty() || self.entities.iter().any(|e| e == entity)
	}

	/// Returns true if per-fixture progress is reported at `INFO`.
	pub fn reports_fixtures(&self) -> bool {
		self.verbosity >= 1
	}

	/// Returns true if per-record outcomes are reported at `DEBUG`.
	pub fn reports_records(&self) -> bool {
		self.verbosity >= 2
	}
}

/// Summary of a completed load.
#[derive(Debug, Clone, Default)]
pub struct LoadResult {
	/// Records processed across all fixtures.
	pub total_records: usize,

	/// Records built and persisted.
	pub newly_created: usize,

	/// Records matched to existing store entries.
	pub reconciled: usize,

	/// Flushes issued.
	pub flushes: usize,

	/// Names of fixtures that were loaded.
	pub fixtures_loaded: Vec<String>,

	/// Names of fixtures skipped by the options.
	pub skipped_fixtures: Vec<String>,

	/// References registered during the load.
	pub references: ReferenceRegistry,
}

/// Where the loader is in its run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoaderState {
	/// Not loading.
	#[default]
	Idle,
	/// Processing a record.
	Loading {
		/// Fixture name.
		fixture: String,
		/// Zero-based record index.
		record: usize,
	},
	/// Flushing the store.
	Flushing {
		/// Fixture name.
		fixture: String,
	},
}

/// Store metadata memoised for one load.
struct MetadataCache {
	entries: HashMap<String, Arc<EntityMetadata>>,
}

impl MetadataCache {
	fn new() -> Self {
		Self {
			entries: HashMap::new(),
		}
	}

	async fn get(
		&mut self,
		store: &dyn FixtureStore,
		entity: &str,
	) -> SeedingResult<Arc<EntityMetadata>> {
		if let Some(metadata) = self.entries.get(entity) {
			return Ok(metadata.clone());
		}
		let metadata = Arc::new(store.metadata_for(entity).await?);
		self.entries.insert(entity.to_string(), metadata.clone());
		Ok(metadata)
	}
}

/// Per-load state: caches, references and counters.
struct LoadRun {
	metadata: MetadataCache,
	result: LoadResult,
}

/// Loads fixture sets into a store.
///
/// `load` takes `&mut self`, so one loader never runs two loads at once.
pub struct FixtureLoader {
	store: Arc<dyn FixtureStore>,
	catalog: Arc<EntityCatalog>,
	builder: Arc<dyn InstanceBuilder>,
	resolver: IdentityResolver,
	options: LoadOptions,
	state: LoaderState,
}

impl FixtureLoader {
	/// Creates a loader with default options and the field injection builder.
	pub fn new(store: Arc<dyn FixtureStore>, catalog: EntityCatalog) -> Self {
		Self {
			store,
			catalog: Arc::new(catalog),
			builder: Arc::new(FieldInjectionBuilder::new()),
			resolver: IdentityResolver::new(),
			options: LoadOptions::default(),
			state: LoaderState::Idle,
		}
	}

	/// Sets load options.
	pub fn with_options(mut self, options: LoadOptions) -> Self {
		self.options = options;
		self
	}

	/// Replaces the instance builder.
	pub fn with_builder<B: InstanceBuilder + 'static>(mut self, builder: B) -> Self {
		self.builder = Arc::new(builder);
		self
	}

	/// Returns the load options.
	pub fn options(&self) -> &LoadOptions {
		&self.options
	}

	/// Returns the entity catalog.
	pub fn catalog(&self) -> &EntityCatalog {
		&self.catalog
	}

	/// Returns the current state.
	pub fn state(&self) -> &LoaderState {
		&self.state
	}

	/// Loads one fixture.
	pub async fn load(
		&mut self,
		descriptor: FixtureDescriptor,
		records: Vec<RawRecord>,
	) -> SeedingResult<LoadResult> {
		self.load_all(&[FixtureSet::new(descriptor, records)]).await
	}

	/// Loads fixture sets in priority order.
	///
	/// The reference registry lives for this call only.
	pub async fn load_all(&mut self, sets: &[FixtureSet]) -> SeedingResult<LoadResult> {
		let outcome = self.run(sets).await;
		self.state = LoaderState::Idle;
		outcome
	}

	async fn run(&mut self, sets: &[FixtureSet]) -> SeedingResult<LoadResult> {
		let mut ordered: Vec<&FixtureSet> = sets.iter().collect();
		ordered.sort_by_key(|set| set.descriptor.priority);

		let mut run = LoadRun {
			metadata: MetadataCache::new(),
			result: LoadResult::default(),
		};

		for set in ordered {
			let descriptor = &set.descriptor;
			descriptor.validate()?;
			let name = descriptor.display_name().to_string();

			if !self.options.includes(&descriptor.entity) {
				debug!(fixture = %name, "fixture filtered out");
				run.result.skipped_fixtures.push(name);
				continue;
			}
			let definition = match self.catalog.require(&descriptor.entity) {
				Ok(definition) => definition,
				Err(error) if self.options.ignore_missing => {
					warn!(fixture = %name, %error, "skipping fixture");
					run.result.skipped_fixtures.push(name);
					continue;
				}
				Err(error) => return Err(error),
			};
			let metadata = run
				.metadata
				.get(self.store.as_ref(), &descriptor.entity)
				.await?;
			if descriptor.reference_prefix.is_some() && metadata.is_composite() {
				return Err(SeedingError::CompositeReference {
					fixture: name,
					entity: descriptor.entity.clone(),
					fields: metadata.identifier_fields.clone(),
				});
			}

			let previous_logging = descriptor
				.disable_store_logging
				.then(|| self.store.set_logging_enabled(false));
			let outcome = self
				.load_fixture(set, &definition, &metadata, &mut run)
				.await;
			if let Some(enabled) = previous_logging {
				self.store.set_logging_enabled(enabled);
			}
			outcome?;
			run.result.fixtures_loaded.push(name);
		}

		Ok(run.result)
	}

	async fn load_fixture(
		&mut self,
		set: &FixtureSet,
		definition: &EntityDefinition,
		metadata: &EntityMetadata,
		run: &mut LoadRun,
	) -> SeedingResult<()> {
		let descriptor = &set.descriptor;
		let name = descriptor.display_name();
		if self.options.reports_fixtures() {
			info!(fixture = %name, entity = %descriptor.entity, records = set.len(), "loading fixture");
		} else {
			debug!(fixture = %name, entity = %descriptor.entity, records = set.len(), "loading fixture");
		}

		let mut scheduler = BatchScheduler::new(descriptor.flush_every);
		let created_before = run.result.newly_created;
		let reconciled_before = run.result.reconciled;

		for (index, record) in set.records.iter().enumerate() {
			self.state = LoaderState::Loading {
				fixture: name.to_string(),
				record: index,
			};
			self.load_record(record, descriptor, definition, metadata, &mut scheduler, run)
				.await
				.map_err(|error| error.at_record(name, index))?;
		}

		if scheduler.needs_final_flush() {
			self.flush(descriptor, run)
				.await
				.map_err(|error| error.at_fixture(name))?;
		}

		let created = run.result.newly_created - created_before;
		let reconciled = run.result.reconciled - reconciled_before;
		if self.options.reports_fixtures() {
			info!(fixture = %name, created, reconciled, "fixture loaded");
		} else {
			debug!(fixture = %name, created, reconciled, "fixture loaded");
		}
		Ok(())
	}

	async fn load_record(
		&mut self,
		record: &RawRecord,
		descriptor: &FixtureDescriptor,
		definition: &EntityDefinition,
		metadata: &EntityMetadata,
		scheduler: &mut BatchScheduler,
		run: &mut LoadRun,
	) -> SeedingResult<()> {
		let (identifier, disposition) = self
			.resolver
			.resolve(record, descriptor, definition, metadata, self.store.as_ref())
			.await?;

		let handle = match disposition {
			Disposition::Existing(handle) => {
				if self.options.reports_records() {
					debug!(entity = %descriptor.entity, ?identifier, "record already present");
				} else {
					trace!(entity = %descriptor.entity, ?identifier, "record already present");
				}
				run.result.reconciled += 1;
				handle
			}
			Disposition::New => {
				let instance = match record {
					RawRecord::Fields(fields) => {
						let context = BuildContext {
							definition,
							metadata,
							descriptor,
							references: &run.result.references,
							store: self.store.as_ref(),
						};
						self.builder.build(fields, &identifier, &context).await?
					}
					RawRecord::Built(instance) => {
						if instance.entity() != descriptor.entity {
							return Err(SeedingError::Configuration(format!(
								"built {} record in a {} fixture",
								instance.entity(),
								descriptor.entity
							)));
						}
						if identifier.is_complete() && metadata.supports_forced_identifier {
							self.store
								.force_identifier(&descriptor.entity, &identifier)
								.await?;
						}
						instance.clone()
					}
				};
				let handle = EntityHandle::new(instance);
				self.store.persist(&handle).await?;
				if self.options.reports_records() {
					debug!(entity = %descriptor.entity, ?identifier, "record persisted");
				} else {
					trace!(entity = %descriptor.entity, ?identifier, "record persisted");
				}
				run.result.newly_created += 1;
				handle
			}
		};
		run.result.total_records += 1;

		if scheduler.record_processed() {
			self.flush(descriptor, run).await?;
		}

		// Registered after the flush so store-generated identifiers are visible.
		let key = {
			let instance = handle.read();
			reference_key(descriptor, definition, metadata, &instance)?
		};
		if let Some(key) = key {
			run.result.references.register(key, handle)?;
		}
		Ok(())
	}

	async fn flush(&mut self, descriptor: &FixtureDescriptor, run: &mut LoadRun) -> SeedingResult<()> {
		let name = descriptor.display_name();
		self.state = LoaderState::Flushing {
			fixture: name.to_string(),
		};
		debug!(fixture = %name, "flushing store");
		self.store.flush().await?;
		run.result.flushes += 1;

		if descriptor.clear_on_flush {
			debug!(fixture = %name, "clearing store");
			self.store.clear().await?;
		}
		Ok(())
	}
}

impl std::fmt::Debug for FixtureLoader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FixtureLoader")
			.field("catalog", &self.catalog)
			.field("options", &self.options)
			.field("state", &self.state)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::entity::{FieldValue, Instance};
	use crate::error::ErrorKind;
	use crate::fixtures::EntityDefinition;
	use crate::store::{MemoryStore, StoreOperation};
	use rstest::rstest;
	use serde_json::json;

	fn setup() -> (Arc<MemoryStore>, FixtureLoader) {
		let store = Arc::new(
			MemoryStore::new()
				.with_entity(EntityMetadata::new("blog.Post", "id"))
				.with_generated_entity(EntityMetadata::new("blog.Comment", "id")),
		);
		let catalog = EntityCatalog::new()
			.with(EntityDefinition::open("blog.Post"))
			.with(EntityDefinition::open("blog.Comment"));
		let loader = FixtureLoader::new(store.clone(), catalog);
		(store, loader)
	}

	fn posts(n: usize) -> Vec<RawRecord> {
		(0..n)
			.map(|i| RawRecord::new().field("id", format!("p{}", i)))
			.collect()
	}

	#[rstest]
	#[tokio::test]
	async fn test_batch_boundaries() {
		let (store, mut loader) = setup();
		let result = loader
			.load(FixtureDescriptor::new("blog.Post").with_flush_every(3), posts(7))
			.await
			.unwrap();

		assert_eq!(result.flushes, 3);
		assert_eq!(store.flush_count(), 3);
		let written: Vec<usize> = store
			.operations()
			.into_iter()
			.filter_map(|op| match op {
				StoreOperation::Flush { written } => Some(written),
				_ => None,
			})
			.collect();
		assert_eq!(written, vec![3, 3, 1]);
		assert_eq!(store.count("blog.Post"), 7);
	}

	#[rstest]
	#[tokio::test]
	async fn test_zero_batch_flushes_once() {
		let (store, mut loader) = setup();
		loader
			.load(FixtureDescriptor::new("blog.Post"), posts(4))
			.await
			.unwrap();
		assert_eq!(store.flush_count(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_clear_follows_flush_when_enabled() {
		let (store, mut loader) = setup();
		loader
			.load(
				FixtureDescriptor::new("blog.Post")
					.with_flush_every(1)
					.with_clear_on_flush(false),
				posts(2),
			)
			.await
			.unwrap();
		assert!(!store.operations().contains(&StoreOperation::Clear));

		let (store, mut loader) = setup();
		loader
			.load(FixtureDescriptor::new("blog.Post").with_flush_every(1), posts(2))
			.await
			.unwrap();
		let clears = store
			.operations()
			.iter()
			.filter(|op| **op == StoreOperation::Clear)
			.count();
		assert_eq!(clears, 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_generated_identifier_registered_after_flush() {
		let (_, mut loader) = setup();
		let result = loader
			.load(
				FixtureDescriptor::new("blog.Comment")
					.with_reference_prefix("comments-")
					.with_flush_every(1),
				vec![RawRecord::new().field("body", "a"), RawRecord::new().field("body", "b")],
			)
			.await
			.unwrap();
		assert_eq!(result.references.keys(), &["comments-1", "comments-2"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unflushed_generated_identifier_cannot_be_keyed() {
		let (store, mut loader) = setup();
		let error = loader
			.load(
				FixtureDescriptor::new("blog.Comment").with_reference_prefix("comments-"),
				vec![RawRecord::new().field("body", "a")],
			)
			.await
			.unwrap_err();
		assert!(matches!(error.root(), SeedingError::UnkeyedReference { .. }));
		assert_eq!(store.count("blog.Comment"), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_state_returns_to_idle() {
		let (_, mut loader) = setup();
		loader
			.load(FixtureDescriptor::new("blog.Post"), posts(1))
			.await
			.unwrap();
		assert_eq!(loader.state(), &LoaderState::Idle);

		let failing = vec![RawRecord::new().reference("parent", "missing")];
		assert!(loader.load(FixtureDescriptor::new("blog.Post"), failing).await.is_err());
		assert_eq!(loader.state(), &LoaderState::Idle);
	}

	#[rstest]
	#[tokio::test]
	async fn test_error_carries_record_context() {
		let (store, mut loader) = setup();
		let mut records = posts(2);
		records.push(RawRecord::new().reference("parent", "posts-nope"));

		let error = loader
			.load(
				FixtureDescriptor::new("blog.Post").with_name("posts"),
				records,
			)
			.await
			.unwrap_err();
		assert!(matches!(
			&error,
			SeedingError::Record { fixture, index: 2, .. } if fixture == "posts"
		));
		assert_eq!(error.kind(), ErrorKind::ReferenceResolution);
		assert_eq!(store.persist_count(), 2);
		assert_eq!(store.count("blog.Post"), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_final_flush_error_names_fixture() {
		let (store, mut loader) = setup();
		let records = vec![
			RawRecord::new().field("id", "p1"),
			RawRecord::new().field("title", "no id"),
		];

		let error = loader
			.load(FixtureDescriptor::new("blog.Post").with_name("posts"), records)
			.await
			.unwrap_err();
		assert!(matches!(
			&error,
			SeedingError::Fixture { fixture, .. } if fixture == "posts"
		));
		assert_eq!(error.kind(), ErrorKind::Store);
		assert!(error.to_string().contains("'posts'"));
		assert_eq!(store.count("blog.Post"), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_equal_priorities_keep_declaration_order() {
		let (_, mut loader) = setup();
		let sets = vec![
			FixtureSet::new(FixtureDescriptor::new("blog.Post").with_name("b"), posts(1)),
			FixtureSet::new(
				FixtureDescriptor::new("blog.Comment").with_name("a"),
				vec![RawRecord::new().field("body", "x")],
			),
			FixtureSet::new(
				FixtureDescriptor::new("blog.Comment")
					.with_name("first")
					.with_priority(-1),
				vec![RawRecord::new().field("body", "y")],
			),
		];
		let result = loader.load_all(&sets).await.unwrap();
		assert_eq!(result.fixtures_loaded, vec!["first", "b", "a"]);
	}

	#[rstest]
	#[case(0, false, false)]
	#[case(1, true, false)]
	#[case(2, true, true)]
	fn test_verbosity_levels(#[case] level: u8, #[case] fixtures: bool, #[case] records: bool) {
		let options = LoadOptions::new().with_verbosity(level);
		assert_eq!(options.reports_fixtures(), fixtures);
		assert_eq!(options.reports_records(), records);
	}

	#[rstest]
	#[tokio::test]
	async fn test_verbose_load_matches_quiet_load() {
		let (quiet_store, mut quiet) = setup();
		let (verbose_store, loader) = setup();
		let mut verbose = loader.with_options(LoadOptions::new().with_verbosity(2));

		let descriptor = FixtureDescriptor::new("blog.Post").with_flush_every(2);
		let a = quiet.load(descriptor.clone(), posts(3)).await.unwrap();
		let b = verbose.load(descriptor, posts(3)).await.unwrap();
		assert_eq!((a.newly_created, a.flushes), (b.newly_created, b.flushes));
		assert_eq!(quiet_store.operations(), verbose_store.operations());
	}

	#[rstest]
	#[tokio::test]
	async fn test_store_logging_restored() {
		let (store, mut loader) = setup();
		let observed = Arc::new(parking_lot::Mutex::new(None));
		let seen = observed.clone();
		let logging_store = store.clone();
		let record = RawRecord::new().field("id", "p1").deferred("title", move |_| {
			*seen.lock() = Some(logging_store.logging_enabled());
			Ok(FieldValue::from("x"))
		});

		loader
			.load(FixtureDescriptor::new("blog.Post"), vec![record])
			.await
			.unwrap();
		assert_eq!(*observed.lock(), Some(false));
		assert!(store.logging_enabled());
	}

	#[rstest]
	#[tokio::test]
	async fn test_entity_filter_and_ignore_missing() {
		let (_, loader) = setup();
		let mut loader = loader.with_options(
			LoadOptions::new()
				.with_entities(vec!["blog.Post".to_string(), "blog.Tag".to_string()])
				.with_ignore_missing(true),
		);
		let sets = vec![
			FixtureSet::new(FixtureDescriptor::new("blog.Comment"), vec![RawRecord::new()]),
			FixtureSet::new(FixtureDescriptor::new("blog.Tag"), vec![RawRecord::new()]),
			FixtureSet::new(FixtureDescriptor::new("blog.Post"), posts(1)),
		];
		let result = loader.load_all(&sets).await.unwrap();
		assert_eq!(result.fixtures_loaded, vec!["blog.Post"]);
		assert_eq!(result.skipped_fixtures, vec!["blog.Comment", "blog.Tag"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unknown_entity_is_fatal() {
		let (_, mut loader) = setup();
		let error = loader
			.load(FixtureDescriptor::new("blog.Tag"), vec![RawRecord::new()])
			.await
			.unwrap_err();
		assert!(matches!(error, SeedingError::UnknownEntity(_)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_built_record_persisted_as_is() {
		let (store, mut loader) = setup();
		let result = loader
			.load(
				FixtureDescriptor::new("blog.Post"),
				vec![RawRecord::built(Instance::blank("blog.Post").with("id", "p1").with("title", "Built"))],
			)
			.await
			.unwrap();
		assert_eq!(result.newly_created, 1);
		assert_eq!(store.rows("blog.Post")[0].value("title"), Some(&json!("Built")));
	}

	#[rstest]
	#[tokio::test]
	async fn test_built_record_of_other_entity_rejected() {
		let (_, mut loader) = setup();
		let error = loader
			.load(
				FixtureDescriptor::new("blog.Post"),
				vec![RawRecord::built(Instance::blank("blog.Comment"))],
			)
			.await
			.unwrap_err();
		assert_eq!(error.kind(), ErrorKind::Configuration);
	}
}
