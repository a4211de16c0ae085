//! Flush timing for a single fixture.

/// Decides when staged writes are flushed.
///
/// With a batch size of `n > 0` a flush happens after every `n`th record and
/// once more at the end if the last record did not land on a boundary. With
/// a batch size of `0` the only flush is the final one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchScheduler {
	batch_size: usize,
	iteration: usize,
}

impl BatchScheduler {
	/// Creates a scheduler for one fixture.
	pub fn new(batch_size: usize) -> Self {
		Self {
			batch_size,
			iteration: 0,
		}
	}

	/// Counts a processed record and reports whether to flush now.
	pub fn record_processed(&mut self) -> bool {
		self.iteration += 1;
		self.batch_size > 0 && self.iteration % self.batch_size == 0
	}

	/// Reports whether a final flush is needed after the last record.
	pub fn needs_final_flush(&self) -> bool {
		self.batch_size == 0 || self.iteration % self.batch_size != 0
	}

	/// Returns the number of records processed so far.
	pub fn iteration(&self) -> usize {
		self.iteration
	}
}
