//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::num::NonZeroUsize;

use log::warn;

//--------------------------------------------------------------------------------------------------

/// Below this many output elements we don't bother the thread pool.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1 << 15; // 32768

/// Worker slots left free for the rest of the system when sizing chunks.
pub const DEFAULT_RESERVED_WORKERS: usize = 2;

pub const ENV_CPU_NUM: &str = "BCAST_CPU_NUM";
pub const ENV_PARALLEL_THRESHOLD: &str = "BCAST_PARALLEL_THRESHOLD";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecConfig {
	/// Number of workers the host says it has. This is a sizing hint, not a cap.
	pub workers: usize,

	pub reserved_workers: usize,

	/// Default for kernels that don't set their own threshold.
	pub parallel_threshold: usize,
}

impl Default for ExecConfig {
	fn default() -> Self {
		Self {
			workers: std::thread::available_parallelism().map_or(1, NonZeroUsize::get),
			reserved_workers: DEFAULT_RESERVED_WORKERS,
			parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
		}
	}
}

impl ExecConfig {
	pub fn with_workers(workers: usize) -> Self {
		Self { workers, ..Self::default() }
	}

	/// Defaults, overridden by `BCAST_CPU_NUM` and `BCAST_PARALLEL_THRESHOLD` when they are set.
	pub fn from_env() -> Self {
		Self::default().with_overrides(|key| std::env::var(key).ok())
	}

	pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
		if let Some(workers) = parse_var(&lookup, ENV_CPU_NUM) {
			if workers == 0 {
				warn!("{ENV_CPU_NUM}=0 ignored, need at least one worker");
			} else {
				self.workers = workers;
			}
		}
		if let Some(threshold) = parse_var(&lookup, ENV_PARALLEL_THRESHOLD) {
			self.parallel_threshold = threshold;
		}
		self
	}

	/// Number of work units the output range is split into.
	pub fn work_units(&self, total: usize) -> usize {
		let usable = self.workers.saturating_sub(self.reserved_workers).max(1);
		usable.min(total)
	}

	/// `total / min(max(1, workers - reserved), total)`, never 0.
	pub fn chunk_size(&self, total: usize) -> usize {
		let units = self.work_units(total);
		if units == 0 { 1 } else { (total / units).max(1) }
	}
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
	let value = lookup(key)?;
	match value.trim().parse() {
		Ok(v) => Some(v),
		Err(_) => {
			warn!("ignoring {key}={value:?}: not a non-negative integer");
			None
		},
	}
}

//--------------------------------------------------------------------------------------------------
