//! Error types for fixture loading.
//!
//! Every failure aborts the remaining load. Errors raised while a record is
//! being processed are wrapped in [`SeedingError::Record`] so callers know
//! which fixture and which record index failed. Errors raised after the last
//! record, by the closing flush, are wrapped in [`SeedingError::Fixture`].
//! [`SeedingError::root`] and [`SeedingError::kind`] look through both.

use thiserror::Error;

/// Errors that can occur during fixture loading.
#[derive(Debug, Error)]
pub enum SeedingError {
	/// Invalid loader or descriptor configuration.
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// Entity type is not registered in the catalog or the store.
	#[error("Unknown entity type: {0}")]
	UnknownEntity(String),

	/// Entity type is registered but cannot be instantiated.
	#[error("Entity type is not instantiable: {0}")]
	NotInstantiable(String),

	/// A reference prefix was declared for an entity with a composite identifier.
	#[error("Fixture '{fixture}' declares a reference prefix but '{entity}' has a composite identifier ({})", .fields.join(", "))]
	CompositeReference {
		/// Fixture name.
		fixture: String,
		/// Entity type.
		entity: String,
		/// Identifier fields of the entity.
		fields: Vec<String>,
	},

	/// A reference key was registered twice in one load.
	#[error("Reference already registered: {0}")]
	DuplicateReference(String),

	/// No key could be derived for a record that must be registered.
	#[error("Cannot derive a reference key for '{entity}' with prefix '{prefix}'")]
	UnkeyedReference {
		/// Entity type.
		entity: String,
		/// Declared reference prefix.
		prefix: String,
	},

	/// Reference lookup on a key that has not been registered.
	#[error("Reference not found: {0}")]
	ReferenceNotFound(String),

	/// A deferred reference evaluator failed.
	#[error("Deferred reference for field '{field}' failed: {message}")]
	DeferredReference {
		/// Field being assigned.
		field: String,
		/// Evaluator error message.
		message: String,
	},

	/// Failure raised by the store collaborator.
	#[error("Store error: {0}")]
	Store(String),

	/// Failure while processing a single record.
	#[error("Failed to load record {index} of fixture '{fixture}': {source}")]
	Record {
		/// Fixture name.
		fixture: String,
		/// Zero-based record index within the fixture.
		index: usize,
		/// Underlying error.
		#[source]
		source: Box<SeedingError>,
	},

	/// Failure after the records of a fixture were processed.
	#[error("Failed to load fixture '{fixture}': {source}")]
	Fixture {
		/// Fixture name.
		fixture: String,
		/// Underlying error.
		#[source]
		source: Box<SeedingError>,
	},

	/// Error parsing fixture data.
	#[error("Parse error: {0}")]
	ParseError(String),

	/// Validation failed for a specific field.
	#[error("Validation error: {field}: {message}")]
	ValidationError {
		/// Field that failed validation.
		field: String,
		/// Validation error message.
		message: String,
	},

	/// I/O operation failed.
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),

	/// YAML deserialization error (when yaml feature is enabled).
	#[cfg(feature = "yaml")]
	#[error("YAML error: {0}")]
	YamlError(#[from] serde_yaml::Error),

	/// Fixture file not found.
	#[error("Fixture file not found: {0}")]
	FileNotFound(String),

	/// Unsupported file extension.
	#[error("Unsupported file extension: {0}")]
	UnsupportedExtension(String),
}

/// Broad classification of a [`SeedingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Unknown entity, composite identifier with a prefix, bad descriptor.
	Configuration,
	/// Lookup of an unregistered reference key.
	ReferenceResolution,
	/// Failure raised by the store collaborator.
	Store,
	/// A deferred reference evaluator failed.
	DeferredReference,
	/// Unreadable or malformed fixture input.
	Input,
}

impl SeedingError {
	/// Creates an error a deferred reference evaluator can return.
	pub fn deferred(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::DeferredReference {
			field: field.into(),
			message: message.into(),
		}
	}

	/// Wraps this error with the fixture and record it was raised for.
	pub fn at_record(self, fixture: impl Into<String>, index: usize) -> Self {
		Self::Record {
			fixture: fixture.into(),
			index,
			source: Box::new(self),
		}
	}

	/// Wraps this error with the fixture it was raised for.
	pub fn at_fixture(self, fixture: impl Into<String>) -> Self {
		Self::Fixture {
			fixture: fixture.into(),
			source: Box::new(self),
		}
	}

	/// Returns the innermost error, skipping record and fixture context.
	pub fn root(&self) -> &SeedingError {
		match self {
			Self::Record { source, .. } | Self::Fixture { source, .. } => source.root(),
			other => other,
		}
	}

	/// Classifies the innermost error.
	pub fn kind(&self) -> ErrorKind {
		match self.root() {
			Self::Configuration(_)
			| Self::UnknownEntity(_)
			| Self::NotInstantiable(_)
			| Self::CompositeReference { .. }
			| Self::DuplicateReference(_)
			| Self::UnkeyedReference { .. } => ErrorKind::Configuration,
			Self::ReferenceNotFound(_) => ErrorKind::ReferenceResolution,
			Self::DeferredReference { .. } => ErrorKind::DeferredReference,
			Self::Store(_) => ErrorKind::Store,
			_ => ErrorKind::Input,
		}
	}
}

/// Result type alias for seeding operations.
pub type SeedingResult<T> = Result<T, SeedingError>;
