//! Test data helper.
//!
//! Resolves fixture files shipped under `tests/data`.

use std::path::{Path, PathBuf};

/// Locates fixture files for tests.
pub struct TestData {
	base_path: PathBuf,
}

impl TestData {
	/// Uses the crate's `tests/data` directory.
	pub fn new() -> Self {
		Self::with_base(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data"))
	}

	/// Uses a custom base directory.
	pub fn with_base<P: AsRef<Path>>(base_path: P) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
		}
	}

	/// Full path to a test data file.
	pub fn path(&self, name: &str) -> PathBuf {
		self.base_path.join(name)
	}

	/// Reads a test data file.
	///
	/// # Panics
	///
	/// Panics if the file cannot be read.
	pub fn read(&self, name: &str) -> String {
		let path = self.path(name);
		std::fs::read_to_string(&path)
			.unwrap_or_else(|_| panic!("Failed to load test data: {:?}", path))
	}
}

impl Default for TestData {
	fn default() -> Self {
		Self::new()
	}
}
