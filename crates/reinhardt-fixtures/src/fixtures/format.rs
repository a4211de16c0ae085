//! Fixture file formats.
//!
//! A fixture file holds one fixture set or an array of them:
//!
//! ```json
//! [
//!   {
//!     "entity": "blog.Post",
//!     "reference_prefix": "posts-",
//!     "flush_every": 1,
//!     "records": [
//!       { "id": "p1", "title": "First" }
//!     ]
//!   },
//!   {
//!     "entity": "blog.Comment",
//!     "priority": 10,
//!     "records": [
//!       { "post": { "$ref": "posts-p1" }, "body": "Nice" }
//!     ]
//!   }
//! ]
//! ```
//!
//! Descriptor keys are those of [`FixtureDescriptor`](super::FixtureDescriptor).
//! A field value of the form `{"$ref": "key"}` becomes a deferred reference
//! lookup; anything else is assigned as is.

use std::path::Path;

use super::FixtureSet;

/// Key marking a reference field value.
pub const REFERENCE_MARKER: &str = "$ref";

/// Supported fixture file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum FixtureFormat {
	/// JSON format (default).
	#[default]
	Json,

	/// YAML format (requires `yaml` feature).
	Yaml,
}

impl FixtureFormat {
	/// Determines the fixture format from a file extension.
	///
	/// # Example
	///
	/// ```
	/// # use reinhardt_fixtures::fixtures::FixtureFormat;
	/// assert_eq!(FixtureFormat::from_extension("json"), Some(FixtureFormat::Json));
	/// assert_eq!(FixtureFormat::from_extension("yml"), Some(FixtureFormat::Yaml));
	/// assert_eq!(FixtureFormat::from_extension("xml"), None);
	/// ```
	pub fn from_extension(ext: &str) -> Option<Self> {
		match ext.to_lowercase().as_str() {
			"json" => Some(Self::Json),
			"yaml" | "yml" => Some(Self::Yaml),
			_ => None,
		}
	}

	/// Determines the fixture format from a file path.
	pub fn from_path(path: &Path) -> Option<Self> {
		path.extension()
			.and_then(|ext| ext.to_str())
			.and_then(Self::from_extension)
	}

	/// Returns the default file extension for this format.
	pub fn extension(&self) -> &'static str {
		match self {
			Self::Json => "json",
			Self::Yaml => "yaml",
		}
	}
}

impl std::fmt::Display for FixtureFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Json => write!(f, "JSON"),
			Self::Yaml => write!(f, "YAML"),
		}
	}
}

/// Parsed fixture sets of one or more files.
#[derive(Debug, Clone)]
pub struct FixtureData {
	/// Fixture sets in file order.
	pub sets: Vec<FixtureSet>,

	/// Format the data was parsed from.
	pub format: FixtureFormat,

	/// Optional source file path.
	pub source: Option<String>,
}

impl FixtureData {
	/// Creates a new empty container.
	pub fn new(format: FixtureFormat) -> Self {
		Self::from_sets(Vec::new(), format)
	}

	/// Creates fixture data from parsed sets.
	pub fn from_sets(sets: Vec<FixtureSet>, format: FixtureFormat) -> Self {
		Self {
			sets,
			format,
			source: None,
		}
	}

	/// Sets the source file path.
	pub fn with_source(mut self, source: impl Into<String>) -> Self {
		self.source = Some(source.into());
		self
	}

	/// Returns the number of fixture sets.
	pub fn len(&self) -> usize {
		self.sets.len()
	}

	/// Returns true if there are no fixture sets.
	pub fn is_empty(&self) -> bool {
		self.sets.is_empty()
	}

	/// Returns the number of records across all sets.
	pub fn record_count(&self) -> usize {
		self.sets.iter().map(FixtureSet::len).sum()
	}

	/// Appends the sets of another container.
	pub fn extend(&mut self, other: FixtureData) {
		self.sets.extend(other.sets);
	}

	/// Returns an iterator over the sets.
	pub fn iter(&self) -> impl Iterator<Item = &FixtureSet> {
		self.sets.iter()
	}
}

impl IntoIterator for FixtureData {
	type Item = FixtureSet;
	type IntoIter = std::vec::IntoIter<FixtureSet>;

	fn into_iter(self) -> Self::IntoIter {
		self.sets.into_iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fixtures::{FixtureDescriptor, RawRecord};
	use rstest::rstest;
	use std::path::PathBuf;

	#[rstest]
	#[case("json", Some(FixtureFormat::Json))]
	#[case("JSON", Some(FixtureFormat::Json))]
	#[case("yaml", Some(FixtureFormat::Yaml))]
	#[case("yml", Some(FixtureFormat::Yaml))]
	#[case("xml", None)]
	fn test_fixture_format_from_extension(
		#[case] ext: &str,
		#[case] expected: Option<FixtureFormat>,
	) {
		assert_eq!(FixtureFormat::from_extension(ext), expected);
	}

	#[rstest]
	fn test_fixture_format_from_path() {
		assert_eq!(
			FixtureFormat::from_path(&PathBuf::from("posts.json")),
			Some(FixtureFormat::Json)
		);
		assert_eq!(FixtureFormat::from_path(&PathBuf::from("no_extension")), None);
	}

	#[rstest]
	fn test_fixture_data_counts() {
		let mut data = FixtureData::new(FixtureFormat::Json);
		assert!(data.is_empty());

		data.extend(FixtureData::from_sets(
			vec![
				FixtureSet::new(
					FixtureDescriptor::new("blog.Post"),
					vec![RawRecord::new(), RawRecord::new()],
				),
				FixtureSet::new(FixtureDescriptor::new("blog.Tag"), vec![RawRecord::new()]),
			],
			FixtureFormat::Json,
		));
		assert_eq!(data.len(), 2);
		assert_eq!(data.record_count(), 3);
	}
}
