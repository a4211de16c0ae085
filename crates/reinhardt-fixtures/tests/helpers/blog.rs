//! Blog schema shared by the integration tests.
//!
//! - `blog.Post`: caller-supplied string `id`
//! - `blog.Comment`: store-generated integer `id`
//! - `blog.Author`: caller-supplied `id`, `title` only reachable through `set_name`
//! - `org.Membership`: composite `(user_id, group_id)` identifier

use std::sync::Arc;

use reinhardt_fixtures::prelude::*;
use rstest::fixture;
use serde_json::Value;

/// Store with the blog entities registered.
#[fixture]
pub fn store() -> Arc<MemoryStore> {
	Arc::new(
		MemoryStore::new()
			.with_entity(EntityMetadata::new("blog.Post", "id"))
			.with_generated_entity(EntityMetadata::new("blog.Comment", "id"))
			.with_entity(EntityMetadata::new("blog.Author", "id"))
			.with_entity(EntityMetadata::composite(
				"org.Membership",
				["user_id", "group_id"],
			)),
	)
}

/// Catalog matching [`store`].
#[fixture]
pub fn catalog() -> EntityCatalog {
	EntityCatalog::new()
		.with(EntityDefinition::open("blog.Post"))
		.with(EntityDefinition::open("blog.Comment"))
		.with(
			EntityDefinition::with_properties("blog.Author", ["id"])
				.with_mutator("set_name", |instance, value| {
					let name = value
						.as_value()
						.and_then(Value::as_str)
						.unwrap_or_default()
						.to_string();
					instance.set("name", name.to_uppercase());
					Ok(())
				})
				.with_display(|instance| {
					instance
						.value("name")
						.and_then(Value::as_str)
						.unwrap_or_default()
						.to_string()
				}),
		)
		.with(EntityDefinition::open("org.Membership"))
}

/// Post records with ids `p1..=pN`.
pub fn posts(n: usize) -> Vec<RawRecord> {
	(1..=n)
		.map(|i| {
			RawRecord::new()
				.field("id", format!("p{}", i))
				.field("title", format!("Post {}", i))
		})
		.collect()
}
