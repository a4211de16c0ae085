//! Entity catalog for fixture loading.
//!
//! The catalog describes how instances of each entity type are populated:
//! which properties can be written directly, which conventionally named
//! mutators (`set_<field>`) and getters (`get_<field>`) exist, and how an
//! instance converts to a string. One catalog is built by the caller and
//! handed to the loader; there is no process-wide registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::entity::{FieldValue, Instance};
use crate::error::{SeedingError, SeedingResult};

/// Mutator invoked as `set_<field>(instance, value)`.
pub type Mutator = Arc<dyn Fn(&mut Instance, FieldValue) -> SeedingResult<()> + Send + Sync>;

/// Getter invoked as `get_<field>(instance)`.
pub type Getter = Arc<dyn Fn(&Instance) -> Option<FieldValue> + Send + Sync>;

/// String conversion of an instance.
pub type DisplayFn = Arc<dyn Fn(&Instance) -> String + Send + Sync>;

/// Returns the conventional mutator name for a field.
pub fn mutator_name(field: &str) -> String {
	format!("set_{}", field)
}

/// Returns the conventional getter name for a field.
pub fn getter_name(field: &str) -> String {
	format!("get_{}", field)
}

/// How an entity type is materialized and accessed.
#[derive(Clone)]
pub struct EntityDefinition {
	name: String,
	/// `None` accepts any property.
	properties: Option<Vec<String>>,
	mutators: HashMap<String, Mutator>,
	getters: HashMap<String, Getter>,
	display: Option<DisplayFn>,
	is_abstract: bool,
}

impl EntityDefinition {
	/// Creates a definition whose instances accept any property.
	pub fn open(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			properties: None,
			mutators: HashMap::new(),
			getters: HashMap::new(),
			display: None,
			is_abstract: false,
		}
	}

	/// Creates a definition restricted to the listed properties.
	///
	/// Fields outside the list can only be assigned through a mutator.
	pub fn with_properties<I, S>(name: impl Into<String>, properties: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut definition = Self::open(name);
		definition.properties = Some(properties.into_iter().map(Into::into).collect());
		definition
	}

	/// Creates a definition for a type that cannot be instantiated.
	pub fn abstract_type(name: impl Into<String>) -> Self {
		let mut definition = Self::open(name);
		definition.is_abstract = true;
		definition
	}

	/// Registers a mutator under its full method name (e.g. `set_title`).
	pub fn with_mutator<F>(mut self, name: impl Into<String>, mutator: F) -> Self
	where
		F: Fn(&mut Instance, FieldValue) -> SeedingResult<()> + Send + Sync + 'static,
	{
		self.mutators.insert(name.into(), Arc::new(mutator));
		self
	}

	/// Registers a getter under its full method name (e.g. `get_id`).
	pub fn with_getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
	where
		F: Fn(&Instance) -> Option<FieldValue> + Send + Sync + 'static,
	{
		self.getters.insert(name.into(), Arc::new(getter));
		self
	}

	/// Registers the string conversion of the entity.
	pub fn with_display<F>(mut self, display: F) -> Self
	where
		F: Fn(&Instance) -> String + Send + Sync + 'static,
	{
		self.display = Some(Arc::new(display));
		self
	}

	/// Returns the entity type name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns true if the property can be written directly.
	pub fn has_property(&self, field: &str) -> bool {
		match &self.properties {
			None => true,
			Some(properties) => properties.iter().any(|p| p == field),
		}
	}

	/// Returns a mutator by method name.
	pub fn mutator(&self, name: &str) -> Option<&Mutator> {
		self.mutators.get(name)
	}

	/// Returns a getter by method name.
	pub fn getter(&self, name: &str) -> Option<&Getter> {
		self.getters.get(name)
	}

	/// Converts an instance to a string, if the entity supports it.
	pub fn display(&self, instance: &Instance) -> Option<String> {
		self.display.as_ref().map(|display| display(instance))
	}

	/// Returns true if instances of this type can be created.
	pub fn is_instantiable(&self) -> bool {
		!self.is_abstract
	}
}

impl fmt::Debug for EntityDefinition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut mutators: Vec<&String> = self.mutators.keys().collect();
		mutators.sort();
		let mut getters: Vec<&String> = self.getters.keys().collect();
		getters.sort();
		f.debug_struct("EntityDefinition")
			.field("name", &self.name)
			.field("properties", &self.properties)
			.field("mutators", &mutators)
			.field("getters", &getters)
			.field("display", &self.display.is_some())
			.field("is_abstract", &self.is_abstract)
			.finish()
	}
}

/// Catalog of entity definitions available to a loader.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
	definitions: HashMap<String, Arc<EntityDefinition>>,
}

impl EntityCatalog {
	/// Creates an empty catalog.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a definition, replacing one with the same name.
	pub fn register(&mut self, definition: EntityDefinition) {
		self.definitions
			.insert(definition.name().to_string(), Arc::new(definition));
	}

	/// Builder-style [`register`](Self::register).
	pub fn with(mut self, definition: EntityDefinition) -> Self {
		self.register(definition);
		self
	}

	/// Gets a definition by entity name.
	pub fn get(&self, entity: &str) -> Option<Arc<EntityDefinition>> {
		self.definitions.get(entity).cloned()
	}

	/// Gets a definition, failing for unknown entity types.
	pub fn require(&self, entity: &str) -> SeedingResult<Arc<EntityDefinition>> {
		self.get(entity)
			.ok_or_else(|| SeedingError::UnknownEntity(entity.to_string()))
	}

	/// Checks if the entity type is registered.
	pub fn contains(&self, entity: &str) -> bool {
		self.definitions.contains_key(entity)
	}

	/// Returns all registered entity names, sorted.
	pub fn entity_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.definitions.keys().cloned().collect();
		names.sort();
		names
	}

	/// Returns the number of registered definitions.
	pub fn len(&self) -> usize {
		self.definitions.len()
	}

	/// Returns true if no definitions are registered.
	pub fn is_empty(&self) -> bool {
		self.definitions.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_register_and_require() {
		let catalog = EntityCatalog::new().with(EntityDefinition::open("blog.Post"));

		assert!(catalog.contains("blog.Post"));
		assert!(!catalog.contains("blog.Comment"));
		assert_eq!(catalog.require("blog.Post").unwrap().name(), "blog.Post");
		assert!(matches!(
			catalog.require("blog.Comment"),
			Err(SeedingError::UnknownEntity(name)) if name == "blog.Comment"
		));
	}

	#[rstest]
	fn test_entity_names_sorted() {
		let catalog = EntityCatalog::new()
			.with(EntityDefinition::open("b.Two"))
			.with(EntityDefinition::open("a.One"));
		assert_eq!(catalog.entity_names(), vec!["a.One", "b.Two"]);
		assert_eq!(catalog.len(), 2);
	}

	#[rstest]
	fn test_closed_properties() {
		let definition = EntityDefinition::with_properties("auth.User", ["id", "username"]);
		assert!(definition.has_property("username"));
		assert!(!definition.has_property("password"));
		assert!(EntityDefinition::open("x.Y").has_property("anything"));
	}

	#[rstest]
	fn test_abstract_type_is_not_instantiable() {
		assert!(!EntityDefinition::abstract_type("x.Base").is_instantiable());
		assert!(EntityDefinition::open("x.Concrete").is_instantiable());
	}

	#[rstest]
	fn test_display_conversion() {
		let definition = EntityDefinition::open("auth.User").with_display(|instance| {
			instance
				.value("username")
				.and_then(|v| v.as_str())
				.unwrap_or_default()
				.to_string()
		});
		let instance = Instance::blank("auth.User").with("username", "admin");
		assert_eq!(definition.display(&instance), Some("admin".to_string()));
		assert_eq!(EntityDefinition::open("x.Y").display(&instance), None);
	}

	#[rstest]
	fn test_conventional_names() {
		assert_eq!(mutator_name("title"), "set_title");
		assert_eq!(getter_name("id"), "get_id");
	}
}
