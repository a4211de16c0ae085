//! In-memory entity instances and the handles shared between the loader,
//! the reference registry and the store.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::Value;

/// Value assigned to a field of an [`Instance`].
#[derive(Debug, Clone)]
pub enum FieldValue {
	/// Plain data.
	Value(Value),
	/// Handle to another entity, usually produced by a deferred reference.
	Entity(EntityHandle),
}

impl FieldValue {
	/// Returns the plain value, if this is not an entity handle.
	pub fn as_value(&self) -> Option<&Value> {
		match self {
			Self::Value(value) => Some(value),
			Self::Entity(_) => None,
		}
	}

	/// Returns the entity handle, if this is one.
	pub fn as_entity(&self) -> Option<&EntityHandle> {
		match self {
			Self::Value(_) => None,
			Self::Entity(handle) => Some(handle),
		}
	}
}

impl From<Value> for FieldValue {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}

impl From<EntityHandle> for FieldValue {
	fn from(handle: EntityHandle) -> Self {
		Self::Entity(handle)
	}
}

impl From<&str> for FieldValue {
	fn from(value: &str) -> Self {
		Self::Value(Value::String(value.to_string()))
	}
}

impl From<String> for FieldValue {
	fn from(value: String) -> Self {
		Self::Value(Value::String(value))
	}
}

impl From<i32> for FieldValue {
	fn from(value: i32) -> Self {
		Self::Value(Value::from(value))
	}
}

impl From<i64> for FieldValue {
	fn from(value: i64) -> Self {
		Self::Value(Value::from(value))
	}
}

impl From<f64> for FieldValue {
	fn from(value: f64) -> Self {
		Self::Value(Value::from(value))
	}
}

impl From<bool> for FieldValue {
	fn from(value: bool) -> Self {
		Self::Value(Value::Bool(value))
	}
}

/// A materialized record of some entity type.
///
/// Fields keep their assignment order. Instances are created blank by the
/// instance builder and populated field by field, bypassing any
/// user-defined construction logic.
#[derive(Debug, Clone)]
pub struct Instance {
	entity: String,
	fields: Vec<(String, FieldValue)>,
}

impl Instance {
	/// Allocates an instance with no fields set.
	pub fn blank(entity: impl Into<String>) -> Self {
		Self {
			entity: entity.into(),
			fields: Vec::new(),
		}
	}

	/// Builder-style field assignment.
	pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
		self.set(field, value);
		self
	}

	/// Returns the entity type.
	pub fn entity(&self) -> &str {
		&self.entity
	}

	/// Returns a field value.
	pub fn get(&self, field: &str) -> Option<&FieldValue> {
		self.fields
			.iter()
			.find(|(name, _)| name == field)
			.map(|(_, value)| value)
	}

	/// Returns a field value if it holds plain data.
	pub fn value(&self, field: &str) -> Option<&Value> {
		self.get(field).and_then(FieldValue::as_value)
	}

	/// Assigns a field, replacing a previous value in place.
	pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
		let field = field.into();
		let value = value.into();
		match self.fields.iter_mut().find(|(name, _)| *name == field) {
			Some(slot) => slot.1 = value,
			None => self.fields.push((field, value)),
		}
	}

	/// Returns true if the field has been assigned.
	pub fn contains(&self, field: &str) -> bool {
		self.get(field).is_some()
	}

	/// Iterates over fields in assignment order.
	pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
		self.fields.iter().map(|(name, value)| (name.as_str(), value))
	}
}

/// Shared handle to a persisted or pending instance.
///
/// Two handles are equal when they point at the same instance.
#[derive(Clone)]
pub struct EntityHandle(Arc<RwLock<Instance>>);

impl EntityHandle {
	/// Wraps an instance in a new handle.
	pub fn new(instance: Instance) -> Self {
		Self(Arc::new(RwLock::new(instance)))
	}

	/// Locks the instance for reading.
	pub fn read(&self) -> RwLockReadGuard<'_, Instance> {
		self.0.read()
	}

	/// Locks the instance for writing.
	pub fn write(&self) -> RwLockWriteGuard<'_, Instance> {
		self.0.write()
	}

	/// Returns the entity type of the instance.
	pub fn entity(&self) -> String {
		self.read().entity().to_string()
	}

	/// Returns true if both handles point at the same instance.
	pub fn ptr_eq(&self, other: &EntityHandle) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl PartialEq for EntityHandle {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl fmt::Debug for EntityHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// Entity fields may point back at this handle; avoid recursing into them.
		match self.0.try_read() {
			Some(instance) => write!(f, "EntityHandle({})", instance.entity()),
			None => write!(f, "EntityHandle(<locked>)"),
		}
	}
}

/// Ordered identifier values of a record.
///
/// Each identifier field of the entity is present; a field whose value was
/// not supplied (or is JSON `null`) holds `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Identifier {
	fields: Vec<(String, Option<Value>)>,
}

impl Identifier {
	/// Creates an identifier from field/value pairs.
	pub fn new(fields: Vec<(String, Option<Value>)>) -> Self {
		let fields = fields
			.into_iter()
			.map(|(name, value)| (name, value.filter(|v| !v.is_null())))
			.collect();
		Self { fields }
	}

	/// Reads the identifier fields from an instance.
	pub fn from_instance(instance: &Instance, fields: &[String]) -> Self {
		Self::new(
			fields
				.iter()
				.map(|name| (name.clone(), instance.value(name).cloned()))
				.collect(),
		)
	}

	/// Returns true if no identifier value was supplied.
	pub fn is_empty(&self) -> bool {
		self.fields.iter().all(|(_, value)| value.is_none())
	}

	/// Returns true if every identifier field has a value.
	pub fn is_complete(&self) -> bool {
		!self.fields.is_empty() && self.fields.iter().all(|(_, value)| value.is_some())
	}

	/// Returns true if the identifier spans more than one field.
	pub fn is_composite(&self) -> bool {
		self.fields.len() > 1
	}

	/// Returns the value of a single-field identifier.
	pub fn single_value(&self) -> Option<&Value> {
		match self.fields.as_slice() {
			[(_, value)] => value.as_ref(),
			_ => None,
		}
	}

	/// Returns the value of a named identifier field.
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.fields
			.iter()
			.find(|(name, _)| name == field)
			.and_then(|(_, value)| value.as_ref())
	}

	/// Iterates over identifier fields in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
		self.fields
			.iter()
			.map(|(name, value)| (name.as_str(), value.as_ref()))
	}

	/// Returns true if the instance carries the same identifier values.
	pub fn matches(&self, instance: &Instance) -> bool {
		self.is_complete()
			&& self
				.fields
				.iter()
				.all(|(name, value)| instance.value(name) == value.as_ref())
	}
}

/// Renders a JSON value as a reference key fragment.
pub(crate) fn key_fragment(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}
