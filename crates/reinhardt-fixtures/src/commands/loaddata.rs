//! loaddata command implementation.
//!
//! This command loads fixture files into a store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::error::{SeedingError, SeedingResult};
use crate::fixtures::{EntityCatalog, FixtureParser};
use crate::loader::{FixtureLoader, LoadOptions, LoadResult};
use crate::store::FixtureStore;

/// Arguments for the loaddata command.
#[derive(Debug, Clone, Default)]
pub struct LoadDataArgs {
	/// Fixture file paths to load.
	pub fixture_paths: Vec<PathBuf>,
}

/// Options for the loaddata command.
#[derive(Debug, Clone, Default)]
pub struct LoadDataOptions {
	/// Only load fixtures for these entity types.
	pub entities: Vec<String>,

	/// Continue even if an entity type is not in the catalog.
	pub ignore_missing: bool,

	/// Verbosity level.
	pub verbosity: u8,
}

impl LoadDataOptions {
	/// Creates new default options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the entity filter.
	pub fn with_entities(mut self, entities: Vec<String>) -> Self {
		self.entities = entities;
		self
	}

	/// Sets ignore missing flag.
	pub fn with_ignore_missing(mut self, ignore: bool) -> Self {
		self.ignore_missing = ignore;
		self
	}

	/// Sets verbosity level.
	pub fn with_verbosity(mut self, level: u8) -> Self {
		self.verbosity = level;
		self
	}
}

impl From<LoadDataOptions> for LoadOptions {
	fn from(options: LoadDataOptions) -> Self {
		LoadOptions::new()
			.with_entities(options.entities)
			.with_ignore_missing(options.ignore_missing)
			.with_verbosity(options.verbosity)
	}
}

/// The loaddata command for loading fixture files into a store.
///
/// All files are parsed first and loaded in one run, so priorities apply
/// across files and later files may reference records of earlier ones.
///
/// # Example
///
/// ```ignore
/// let command = LoadDataCommand::new(store, catalog);
/// let args = LoadDataArgs {
///     fixture_paths: vec![PathBuf::from("fixtures/posts.json")],
/// };
/// let options = LoadDataOptions::new().with_verbosity(1);
/// let result = command.execute(args, options).await?;
/// println!("Loaded {} records", result.total_records);
/// ```
pub struct LoadDataCommand {
	store: Arc<dyn FixtureStore>,
	catalog: EntityCatalog,
	parser: FixtureParser,
}

impl LoadDataCommand {
	/// Creates a new loaddata command.
	pub fn new(store: Arc<dyn FixtureStore>, catalog: EntityCatalog) -> Self {
		Self {
			store,
			catalog,
			parser: FixtureParser::new(),
		}
	}

	/// Returns the command name.
	pub fn name(&self) -> &str {
		"loaddata"
	}

	/// Returns the command description.
	pub fn description(&self) -> &str {
		"Installs the named fixture(s) in the store"
	}

	/// Returns the command help text.
	pub fn help(&self) -> &str {
		r#"
Usage: loaddata [options] fixture [fixture ...]

Installs the named fixture(s) in the store.

Arguments:
  fixture              One or more fixture files to load

Options:
  --entity, -e NAME    Only load fixtures for the specified entity type(s)
  --ignore-missing     Skip fixtures whose entity type is unknown
  --verbosity LEVEL    Verbosity level (0=minimal, 1=normal, 2=verbose)
"#
	}

	/// Executes the loaddata command.
	///
	/// Returns the load result with statistics.
	pub async fn execute(
		&self,
		args: LoadDataArgs,
		options: LoadDataOptions,
	) -> SeedingResult<LoadResult> {
		if args.fixture_paths.is_empty() {
			return Err(SeedingError::ValidationError {
				field: "fixture_paths".to_string(),
				message: "At least one fixture file must be specified".to_string(),
			});
		}

		// Validate all paths exist
		for path in &args.fixture_paths {
			if !path.exists() {
				return Err(SeedingError::FileNotFound(path.display().to_string()));
			}
		}

		let paths: Vec<&Path> = args.fixture_paths.iter().map(|p| p.as_path()).collect();
		let data = self.parser.parse_files(&paths)?;
		info!(
			files = paths.len(),
			fixtures = data.len(),
			records = data.record_count(),
			"loading fixture files"
		);

		let verbosity = options.verbosity;
		let mut loader = FixtureLoader::new(self.store.clone(), self.catalog.clone())
			.with_options(options.into());
		let result = loader.load_all(&data.sets).await?;

		if verbosity > 0 {
			self.print_result(&result);
		}

		Ok(result)
	}

	/// Prints the load result summary.
	fn print_result(&self, result: &LoadResult) {
		println!(
			"Installed {} object(s) from {} fixture(s) ({} already present)",
			result.newly_created,
			result.fixtures_loaded.len(),
			result.reconciled
		);

		if !result.skipped_fixtures.is_empty() {
			println!("Skipped fixtures: {:?}", result.skipped_fixtures);
		}
	}
}

impl std::fmt::Debug for LoadDataCommand {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LoadDataCommand")
			.field("catalog", &self.catalog)
			.finish()
	}
}
