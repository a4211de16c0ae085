//! Management commands.
//!
//! - [`LoadDataCommand`] - load fixture files into a store

pub mod loaddata;

pub use loaddata::{LoadDataArgs, LoadDataCommand, LoadDataOptions};
