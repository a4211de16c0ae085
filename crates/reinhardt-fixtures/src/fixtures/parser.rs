//! Fixture parsing functionality.
//!
//! This module turns fixture files in JSON and YAML into [`FixtureSet`]s.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use super::format::REFERENCE_MARKER;
use super::{FixtureData, FixtureDescriptor, FixtureFormat, FixtureSet, RawRecord};
use crate::error::{SeedingError, SeedingResult};

/// Parser for fixture files.
///
/// Supports both JSON and YAML formats (YAML requires the `yaml` feature).
#[derive(Debug, Default)]
pub struct FixtureParser;

impl FixtureParser {
	/// Creates a new fixture parser.
	pub fn new() -> Self {
		Self
	}

	/// Parses a fixture file from the given path.
	///
	/// The format is automatically detected from the file extension.
	///
	/// # Errors
	///
	/// Returns an error if:
	/// - The file cannot be read
	/// - The file extension is not recognized
	/// - The file content is invalid
	pub fn parse_file(&self, path: &Path) -> SeedingResult<FixtureData> {
		let format = FixtureFormat::from_path(path).ok_or_else(|| {
			SeedingError::UnsupportedExtension(
				path.extension()
					.and_then(|e| e.to_str())
					.unwrap_or("(none)")
					.to_string(),
			)
		})?;

		let content = std::fs::read_to_string(path).map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				SeedingError::FileNotFound(path.display().to_string())
			} else {
				SeedingError::IoError(e)
			}
		})?;

		let data = self.parse_string(&content, format)?;
		debug!(path = %path.display(), %format, sets = data.len(), "parsed fixture file");
		Ok(data.with_source(path.display().to_string()))
	}

	/// Parses fixture data from a string.
	pub fn parse_string(&self, content: &str, format: FixtureFormat) -> SeedingResult<FixtureData> {
		let value = match format {
			FixtureFormat::Json => serde_json::from_str(content)?,
			FixtureFormat::Yaml => self.parse_yaml(content)?,
		};

		let sets = match value {
			Value::Array(items) => items
				.into_iter()
				.enumerate()
				.map(|(idx, item)| {
					self.parse_set(item).map_err(|e| match e {
						SeedingError::ParseError(message) => SeedingError::ParseError(format!(
							"Invalid fixture at index {}: {}",
							idx, message
						)),
						other => other,
					})
				})
				.collect::<SeedingResult<Vec<_>>>()?,
			Value::Object(_) => vec![self.parse_set(value)?],
			_ => {
				return Err(SeedingError::ParseError(
					"Expected array or object".to_string(),
				));
			}
		};

		Ok(FixtureData::from_sets(sets, format))
	}

	/// Parses YAML fixture content.
	#[cfg(feature = "yaml")]
	fn parse_yaml(&self, content: &str) -> SeedingResult<Value> {
		Ok(serde_yaml::from_str(content)?)
	}

	/// Stub for YAML parsing when the feature is not enabled.
	#[cfg(not(feature = "yaml"))]
	fn parse_yaml(&self, _content: &str) -> SeedingResult<Value> {
		Err(SeedingError::UnsupportedExtension(
			"YAML support requires the 'yaml' feature".to_string(),
		))
	}

	fn parse_set(&self, value: Value) -> SeedingResult<FixtureSet> {
		let Value::Object(mut object) = value else {
			return Err(SeedingError::ParseError(
				"Fixture must be an object".to_string(),
			));
		};
		let records = match object.remove("records") {
			Some(Value::Array(records)) => records,
			Some(_) => {
				return Err(SeedingError::ValidationError {
					field: "records".to_string(),
					message: "Records must be an array".to_string(),
				});
			}
			None => Vec::new(),
		};

		let descriptor: FixtureDescriptor = serde_json::from_value(Value::Object(object))
			.map_err(|e| SeedingError::ParseError(e.to_string()))?;
		descriptor.validate()?;

		let records = records
			.into_iter()
			.enumerate()
			.map(|(idx, record)| self.parse_record(idx, record))
			.collect::<SeedingResult<Vec<_>>>()?;
		Ok(FixtureSet::new(descriptor, records))
	}

	fn parse_record(&self, idx: usize, value: Value) -> SeedingResult<RawRecord> {
		let Value::Object(fields) = value else {
			return Err(SeedingError::ValidationError {
				field: format!("records[{}]", idx),
				message: "Record must be an object".to_string(),
			});
		};

		let record = fields
			.into_iter()
			.fold(RawRecord::new(), |record, (name, value)| {
				match reference_key(&value) {
					Some(key) => record.reference(name, key),
					None => record.field(name, value),
				}
			});
		Ok(record)
	}

	/// Parses multiple fixture files.
	///
	/// Sets keep file order, then in-file order.
	pub fn parse_files(&self, paths: &[&Path]) -> SeedingResult<FixtureData> {
		let format = paths
			.first()
			.and_then(|p| FixtureFormat::from_path(p))
			.unwrap_or_default();
		let mut data = FixtureData::new(format);

		for path in paths {
			data.extend(self.parse_file(path)?);
		}

		Ok(data)
	}
}

/// Returns the key of a `{"$ref": "key"}` value.
fn reference_key(value: &Value) -> Option<String> {
	let object: &Map<String, Value> = value.as_object()?;
	if object.len() != 1 {
		return None;
	}
	object
		.get(REFERENCE_MARKER)
		.and_then(Value::as_str)
		.map(str::to_string)
}
