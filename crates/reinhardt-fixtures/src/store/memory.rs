//! In-memory [`FixtureStore`] implementation.
//!
//! Behaves like a unit-of-work ORM session: persisted instances are staged
//! until [`flush`](FixtureStore::flush), generated identifiers are assigned
//! at flush and written back into the staged handles, and
//! [`clear`](FixtureStore::clear) detaches every managed handle so later
//! lookups rehydrate fresh ones from committed rows.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{EntityMetadata, FixtureStore};
use crate::entity::{EntityHandle, Identifier, Instance};
use crate::error::{SeedingError, SeedingResult};

/// Operation recorded by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOperation {
	/// An instance was staged.
	Persist {
		/// Entity type.
		entity: String,
	},
	/// The next persist of an entity keeps its caller-supplied identifier.
	ForceIdentifier {
		/// Entity type.
		entity: String,
	},
	/// Staged instances were committed.
	Flush {
		/// Number of instances written.
		written: usize,
	},
	/// The identity cache was dropped.
	Clear,
}

#[derive(Debug)]
struct EntityTable {
	metadata: EntityMetadata,
	generated: bool,
	next_id: i64,
	rows: Vec<Instance>,
}

impl EntityTable {
	fn find(&self, identifier: &Identifier) -> Option<&Instance> {
		self.rows.iter().find(|row| identifier.matches(row))
	}
}

#[derive(Debug)]
struct Staged {
	handle: EntityHandle,
	keep_identifier: bool,
}

#[derive(Debug, Default)]
struct Inner {
	tables: HashMap<String, EntityTable>,
	staged: Vec<Staged>,
	forced: HashSet<String>,
	managed: Vec<EntityHandle>,
	journal: Vec<StoreOperation>,
	logging_enabled: bool,
}

impl Inner {
	fn table(&self, entity: &str) -> SeedingResult<&EntityTable> {
		self.tables
			.get(entity)
			.ok_or_else(|| SeedingError::UnknownEntity(entity.to_string()))
	}
}

/// In-memory store with ORM-like flush semantics.
#[derive(Debug)]
pub struct MemoryStore {
	inner: Mutex<Inner>,
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryStore {
	/// Creates an empty store with logging enabled.
	pub fn new() -> Self {
		Self {
			inner: Mutex::new(Inner {
				logging_enabled: true,
				..Inner::default()
			}),
		}
	}

	/// Registers an entity whose identifiers are always supplied by the caller.
	pub fn with_entity(self, metadata: EntityMetadata) -> Self {
		self.register(metadata, false);
		self
	}

	/// Registers an entity with an auto-increment integer identifier.
	///
	/// Caller-supplied identifiers are overwritten at flush unless
	/// [`force_identifier`](FixtureStore::force_identifier) was called
	/// before the instance was persisted.
	pub fn with_generated_entity(self, metadata: EntityMetadata) -> Self {
		self.register(metadata, true);
		self
	}

	fn register(&self, metadata: EntityMetadata, generated: bool) {
		let entity = metadata.entity.clone();
		self.inner.lock().tables.insert(
			entity,
			EntityTable {
				metadata,
				generated,
				next_id: 1,
				rows: Vec::new(),
			},
		);
	}

	/// Commits an instance directly, bypassing staging.
	pub fn insert(&self, instance: Instance) -> SeedingResult<()> {
		let mut inner = self.inner.lock();
		let table = inner
			.tables
			.get_mut(instance.entity())
			.ok_or_else(|| SeedingError::UnknownEntity(instance.entity().to_string()))?;
		let identifier = Identifier::from_instance(&instance, &table.metadata.identifier_fields);
		if !identifier.is_complete() {
			return Err(SeedingError::Store(format!(
				"{} row is missing identifier values",
				instance.entity()
			)));
		}
		if table.find(&identifier).is_some() {
			return Err(SeedingError::Store(format!(
				"duplicate key for {}: {:?}",
				instance.entity(),
				identifier
			)));
		}
		if let Some(id) = numeric_id(&table.metadata, &instance) {
			table.next_id = table.next_id.max(id + 1);
		}
		table.rows.push(instance);
		Ok(())
	}

	/// Returns committed rows of an entity in commit order.
	pub fn rows(&self, entity: &str) -> Vec<Instance> {
		self.inner
			.lock()
			.tables
			.get(entity)
			.map(|table| table.rows.clone())
			.unwrap_or_default()
	}

	/// Returns the number of committed rows of an entity.
	pub fn count(&self, entity: &str) -> usize {
		self.inner
			.lock()
			.tables
			.get(entity)
			.map_or(0, |table| table.rows.len())
	}

	/// Returns the number of staged, uncommitted instances.
	pub fn staged_count(&self) -> usize {
		self.inner.lock().staged.len()
	}

	/// Returns the number of handles in the identity cache.
	pub fn managed_count(&self) -> usize {
		self.inner.lock().managed.len()
	}

	/// Returns every recorded operation in order.
	pub fn operations(&self) -> Vec<StoreOperation> {
		self.inner.lock().journal.clone()
	}

	/// Returns how many times the store was flushed.
	pub fn flush_count(&self) -> usize {
		self.inner
			.lock()
			.journal
			.iter()
			.filter(|op| matches!(op, StoreOperation::Flush { .. }))
			.count()
	}

	/// Returns how many instances were staged.
	pub fn persist_count(&self) -> usize {
		self.inner
			.lock()
			.journal
			.iter()
			.filter(|op| matches!(op, StoreOperation::Persist { .. }))
			.count()
	}

	/// Returns the current logging setting.
	pub fn logging_enabled(&self) -> bool {
		self.inner.lock().logging_enabled
	}
}

fn numeric_id(metadata: &EntityMetadata, instance: &Instance) -> Option<i64> {
	let field = metadata.single_identifier_field()?;
	instance.value(field).and_then(Value::as_i64)
}

fn row_key(identifier: &Identifier) -> String {
	let values: Vec<Option<&Value>> = identifier.iter().map(|(_, value)| value).collect();
	serde_json::to_string(&values).unwrap_or_default()
}

#[async_trait]
impl FixtureStore for MemoryStore {
	async fn metadata_for(&self, entity: &str) -> SeedingResult<EntityMetadata> {
		Ok(self.inner.lock().table(entity)?.metadata.clone())
	}

	async fn find_one(
		&self,
		entity: &str,
		identifier: &Identifier,
	) -> SeedingResult<Option<EntityHandle>> {
		let mut inner = self.inner.lock();
		let row = {
			let table = inner.table(entity)?;
			if !identifier.is_complete() {
				return Ok(None);
			}
			match table.find(identifier) {
				Some(row) => row.clone(),
				None => return Ok(None),
			}
		};

		let managed = inner.managed.iter().find(|handle| {
			let instance = handle.read();
			instance.entity() == entity && identifier.matches(&instance)
		});
		if let Some(handle) = managed {
			return Ok(Some(handle.clone()));
		}

		let handle = EntityHandle::new(row);
		inner.managed.push(handle.clone());
		Ok(Some(handle))
	}

	async fn persist(&self, handle: &EntityHandle) -> SeedingResult<()> {
		let entity = handle.entity();
		let mut inner = self.inner.lock();
		inner.table(&entity)?;
		if inner.staged.iter().any(|staged| staged.handle.ptr_eq(handle)) {
			return Ok(());
		}
		let keep_identifier = inner.forced.remove(&entity);
		inner.staged.push(Staged {
			handle: handle.clone(),
			keep_identifier,
		});
		inner.journal.push(StoreOperation::Persist { entity });
		Ok(())
	}

	async fn flush(&self) -> SeedingResult<()> {
		let mut inner = self.inner.lock();
		let staged = std::mem::take(&mut inner.staged);

		// Assign identifiers and check keys before touching any table so a
		// failed flush leaves committed data unchanged.
		let mut sequences: HashMap<String, i64> = HashMap::new();
		let mut batch_keys: HashSet<(String, String)> = HashSet::new();
		let mut assigned: Vec<(EntityHandle, Option<(String, i64)>)> = Vec::new();
		for item in &staged {
			let instance = item.handle.read();
			let entity = instance.entity().to_string();
			let table = inner.table(&entity)?;
			let fields = &table.metadata.identifier_fields;

			let mut generated = None;
			let identifier = if table.generated && !item.keep_identifier {
				let field = table.metadata.single_identifier_field().ok_or_else(|| {
					SeedingError::Store(format!("{} cannot generate a composite identifier", entity))
				})?;
				let next = sequences.entry(entity.clone()).or_insert(table.next_id);
				let id = *next;
				*next += 1;
				generated = Some((field.to_string(), id));
				Identifier::new(vec![(field.to_string(), Some(Value::from(id)))])
			} else {
				Identifier::from_instance(&instance, fields)
			};

			if !identifier.is_complete() {
				return Err(SeedingError::Store(format!(
					"{} row is missing identifier values",
					entity
				)));
			}
			if table.find(&identifier).is_some()
				|| !batch_keys.insert((entity.clone(), row_key(&identifier)))
			{
				return Err(SeedingError::Store(format!(
					"duplicate key for {}: {}",
					entity,
					row_key(&identifier)
				)));
			}
			let forced_id = identifier.single_value().and_then(Value::as_i64);
			if let (true, Some(id)) = (table.generated, forced_id) {
				let next = sequences.entry(entity.clone()).or_insert(table.next_id);
				*next = (*next).max(id + 1);
			}
			drop(instance);
			assigned.push((item.handle.clone(), generated));
		}

		let written = assigned.len();
		for (handle, generated) in assigned {
			if let Some((field, id)) = generated {
				handle.write().set(field, Value::from(id));
			}
			let row = handle.read().clone();
			if let Some(table) = inner.tables.get_mut(row.entity()) {
				table.rows.push(row);
			}
			if !inner.managed.iter().any(|managed| managed.ptr_eq(&handle)) {
				inner.managed.push(handle);
			}
		}
		for (entity, next) in sequences {
			if let Some(table) = inner.tables.get_mut(&entity) {
				table.next_id = table.next_id.max(next);
			}
		}
		inner.journal.push(StoreOperation::Flush { written });
		Ok(())
	}

	async fn clear(&self) -> SeedingResult<()> {
		let mut inner = self.inner.lock();
		inner.managed.clear();
		inner.staged.clear();
		inner.forced.clear();
		inner.journal.push(StoreOperation::Clear);
		Ok(())
	}

	async fn force_identifier(&self, entity: &str, identifier: &Identifier) -> SeedingResult<()> {
		let mut inner = self.inner.lock();
		let table = inner.table(entity)?;
		if !table.metadata.supports_forced_identifier {
			return Err(SeedingError::Store(format!(
				"{} does not accept forced identifiers",
				entity
			)));
		}
		if !identifier.is_complete() {
			return Err(SeedingError::Store(format!(
				"cannot force an incomplete identifier for {}",
				entity
			)));
		}
		inner.forced.insert(entity.to_string());
		inner.journal.push(StoreOperation::ForceIdentifier {
			entity: entity.to_string(),
		});
		Ok(())
	}

	fn set_logging_enabled(&self, enabled: bool) -> bool {
		std::mem::replace(&mut self.inner.lock().logging_enabled, enabled)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn store() -> MemoryStore {
		MemoryStore::new()
			.with_generated_entity(EntityMetadata::new("blog.Post", "id"))
			.with_entity(EntityMetadata::new("blog.Tag", "slug"))
	}

	fn id(field: &str, value: Value) -> Identifier {
		Identifier::new(vec![(field.to_string(), Some(value))])
	}

	#[rstest]
	#[tokio::test]
	async fn test_staged_rows_are_invisible_until_flush(store: MemoryStore) {
		let tag = EntityHandle::new(Instance::blank("blog.Tag").with("slug", "rust"));
		store.persist(&tag).await.unwrap();

		assert!(store.find_one("blog.Tag", &id("slug", json!("rust"))).await.unwrap().is_none());
		store.flush().await.unwrap();

		let found = store.find_one("blog.Tag", &id("slug", json!("rust"))).await.unwrap();
		assert_eq!(found, Some(tag));
		assert_eq!(store.count("blog.Tag"), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_generated_identifier_is_back_filled(store: MemoryStore) {
		let post = EntityHandle::new(Instance::blank("blog.Post").with("title", "First"));
		store.persist(&post).await.unwrap();
		assert!(post.read().value("id").is_none());

		store.flush().await.unwrap();
		assert_eq!(post.read().value("id"), Some(&json!(1)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_caller_identifier_needs_forcing(store: MemoryStore) {
		let ignored = EntityHandle::new(Instance::blank("blog.Post").with("id", 40));
		store.persist(&ignored).await.unwrap();

		let kept = EntityHandle::new(Instance::blank("blog.Post").with("id", 50));
		store
			.force_identifier("blog.Post", &id("id", json!(50)))
			.await
			.unwrap();
		store.persist(&kept).await.unwrap();
		store.flush().await.unwrap();

		assert_eq!(ignored.read().value("id"), Some(&json!(1)));
		assert_eq!(kept.read().value("id"), Some(&json!(50)));

		let next = EntityHandle::new(Instance::blank("blog.Post"));
		store.persist(&next).await.unwrap();
		store.flush().await.unwrap();
		assert_eq!(next.read().value("id"), Some(&json!(51)));
	}

	#[rstest]
	#[tokio::test]
	async fn test_duplicate_key_fails_flush(store: MemoryStore) {
		store
			.insert(Instance::blank("blog.Tag").with("slug", "rust"))
			.unwrap();
		let duplicate = EntityHandle::new(Instance::blank("blog.Tag").with("slug", "rust"));
		store.persist(&duplicate).await.unwrap();

		let result = store.flush().await;
		assert!(matches!(result, Err(SeedingError::Store(_))));
		assert_eq!(store.count("blog.Tag"), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_missing_identifier_fails_flush(store: MemoryStore) {
		let tag = EntityHandle::new(Instance::blank("blog.Tag").with("name", "Rust"));
		store.persist(&tag).await.unwrap();
		assert!(matches!(store.flush().await, Err(SeedingError::Store(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_clear_detaches_handles(store: MemoryStore) {
		let tag = EntityHandle::new(Instance::blank("blog.Tag").with("slug", "rust"));
		store.persist(&tag).await.unwrap();
		store.flush().await.unwrap();
		assert_eq!(store.managed_count(), 1);

		store.clear().await.unwrap();
		assert_eq!(store.managed_count(), 0);

		let found = store
			.find_one("blog.Tag", &id("slug", json!("rust")))
			.await
			.unwrap()
			.unwrap();
		assert!(!found.ptr_eq(&tag));
		assert_eq!(found.read().value("slug"), Some(&json!("rust")));
	}

	#[rstest]
	#[tokio::test]
	async fn test_unknown_entity(store: MemoryStore) {
		assert!(matches!(
			store.metadata_for("blog.Comment").await,
			Err(SeedingError::UnknownEntity(_))
		));
		let comment = EntityHandle::new(Instance::blank("blog.Comment"));
		assert!(store.persist(&comment).await.is_err());
	}

	#[rstest]
	#[tokio::test]
	async fn test_metadata_and_forcing_rules(store: MemoryStore) {
		let metadata = store.metadata_for("blog.Tag").await.unwrap();
		assert_eq!(metadata.identifier_fields, vec!["slug".to_string()]);

		let incomplete = Identifier::new(vec![("id".to_string(), None)]);
		assert!(matches!(
			store.force_identifier("blog.Post", &incomplete).await,
			Err(SeedingError::Store(_))
		));
		store
			.force_identifier("blog.Post", &id("id", json!(3)))
			.await
			.unwrap();
		assert_eq!(
			store.operations(),
			vec![StoreOperation::ForceIdentifier {
				entity: "blog.Post".to_string()
			}]
		);
	}

	#[rstest]
	fn test_logging_toggle_returns_previous(store: MemoryStore) {
		assert!(store.set_logging_enabled(false));
		assert!(!store.logging_enabled());
		assert!(!store.set_logging_enabled(true));
	}

	#[rstest]
	#[tokio::test]
	async fn test_journal_records_operations(store: MemoryStore) {
		let tag = EntityHandle::new(Instance::blank("blog.Tag").with("slug", "rust"));
		store.persist(&tag).await.unwrap();
		store.flush().await.unwrap();
		store.clear().await.unwrap();

		assert_eq!(
			store.operations(),
			vec![
				StoreOperation::Persist {
					entity: "blog.Tag".to_string()
				},
				StoreOperation::Flush { written: 1 },
				StoreOperation::Clear,
			]
		);
	}
}
