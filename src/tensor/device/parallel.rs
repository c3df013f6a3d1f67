//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::any::Any;
use std::borrow::Cow;
use std::panic::{AssertUnwindSafe, catch_unwind};

use rayon::prelude::*;

use crate::ErrPack;
use crate::tensor::error::TensorOpError;

//--------------------------------------------------------------------------------------------------

/// A sub-range task: `task(begin, end)` handles the half-open range `[begin, end)`.
pub type RangeTask<'a> = dyn Fn(usize, usize) + Sync + 'a;

/// Fork-join execution of a range split into chunks.
///
/// # Safety
///
/// Callers hand out disjoint parts of an output buffer based on the ranges they receive.
/// An implementation must:
/// - call `task` only with ranges inside `[0, total)`,
/// - never call it twice for overlapping ranges,
/// - cover the whole of `[0, total)` when it returns `Ok`,
/// - not return before every call of `task` has finished.
pub unsafe trait ParallelFor: Sync {
	fn parallel_for(
		&self,
		total: usize,
		chunk: usize,
		task: &RangeTask,
	) -> Result<(), ErrPack<TensorOpError>>;
}

#[inline]
fn chunk_range(i: usize, chunk: usize, total: usize) -> (usize, usize) {
	let begin = i * chunk;
	(begin, (begin + chunk).min(total))
}

//--------------------------------------------------------------------------------------------------

/// Runs all chunks one after another on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlinePool;

unsafe impl ParallelFor for InlinePool {
	fn parallel_for(
		&self,
		total: usize,
		chunk: usize,
		task: &RangeTask,
	) -> Result<(), ErrPack<TensorOpError>> {
		let chunk = chunk.max(1);
		for i in 0..total.div_ceil(chunk) {
			let (begin, end) = chunk_range(i, chunk, total);
			task(begin, end);
		}
		Ok(())
	}
}

//--------------------------------------------------------------------------------------------------

/// A dedicated rayon pool.
pub struct RayonPool {
	pool: rayon::ThreadPool,
}

impl RayonPool {
	pub fn new(threads: usize) -> Result<Self, ErrPack<TensorOpError>> {
		let pool = rayon::ThreadPoolBuilder::new()
			.num_threads(threads)
			.thread_name(|i| format!("bcast-worker-{i}"))
			.build()
			.map_err(|err| {
				TensorOpError::pool_failure("cannot build the thread pool", Some(Box::new(err)))
			})?;
		Ok(Self { pool })
	}

	pub fn num_threads(&self) -> usize {
		self.pool.current_num_threads()
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> Cow<'static, str> {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		Cow::Borrowed(msg)
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		Cow::Owned(msg.clone())
	} else {
		Cow::Borrowed("worker task panicked")
	}
}

unsafe impl ParallelFor for RayonPool {
	fn parallel_for(
		&self,
		total: usize,
		chunk: usize,
		task: &RangeTask,
	) -> Result<(), ErrPack<TensorOpError>> {
		let chunk = chunk.max(1);
		let n_chunks = total.div_ceil(chunk);
		// `install()` re-throws a panic only after all spawned work has joined.
		let result = catch_unwind(AssertUnwindSafe(|| {
			self.pool.install(|| {
				(0..n_chunks).into_par_iter().for_each(|i| {
					let (begin, end) = chunk_range(i, chunk, total);
					task(begin, end);
				});
			});
		}));
		result.map_err(|payload| TensorOpError::pool_failure(panic_message(&*payload), None))
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use std::sync::Mutex;

	use super::*;

	fn collect_ranges(pool: &dyn ParallelFor, total: usize, chunk: usize) -> Vec<(usize, usize)> {
		let ranges = Mutex::new(Vec::new());
		pool.parallel_for(total, chunk, &|begin, end| {
			ranges.lock().unwrap().push((begin, end));
		})
		.unwrap();
		let mut ranges = ranges.into_inner().unwrap();
		ranges.sort_unstable();
		ranges
	}

	#[test]
	fn test_inline_ranges() {
		assert_eq!(collect_ranges(&InlinePool, 10, 4), vec![(0, 4), (4, 8), (8, 10)]);
		assert_eq!(collect_ranges(&InlinePool, 0, 4), vec![]);
		assert_eq!(collect_ranges(&InlinePool, 3, 0), vec![(0, 1), (1, 2), (2, 3)]);
	}

	#[test]
	fn test_rayon_ranges_cover_everything_once() {
		let pool = RayonPool::new(4).unwrap();
		assert_eq!(pool.num_threads(), 4);
		let ranges = collect_ranges(&pool, 1000, 37);
		let mut next = 0;
		for (begin, end) in ranges {
			assert_eq!(begin, next);
			assert!(end > begin);
			next = end;
		}
		assert_eq!(next, 1000);
	}

	#[test]
	fn test_rayon_panic_is_reported() {
		let pool = RayonPool::new(2).unwrap();
		let err = pool
			.parallel_for(100, 10, &|begin, _| {
				if begin == 50 {
					panic!("boom");
				}
			})
			.unwrap_err();
		assert_eq!(err.code, TensorOpError::PoolFailure);
		assert_eq!(err.message(), "boom");
	}
}
