//! Test helpers for reinhardt-fixtures integration tests.
//!
//! This module provides a small blog schema and loaders for the fixture
//! files under `tests/data`.

#[path = "helpers/blog.rs"]
pub mod blog;
#[path = "helpers/test_data.rs"]
pub mod test_data;
