//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use log::{debug, trace};

use crate::ErrPack;
use crate::tensor::bcast::resolve;
use crate::tensor::config::ExecConfig;
use crate::tensor::device::parallel::{ParallelFor, RangeTask};
use crate::tensor::dim_merger::MergedDim;
use crate::tensor::error::TensorOpError;
use crate::tensor::shape::TensorShape;
use crate::util::{SendPtr, cold_path};

use super::calc_info::{CalcInfo, ExecPath};
use super::zip::{map_contiguous, zip_contiguous, zip_strided};

//--------------------------------------------------------------------------------------------------

/// Where and how eagerly to run one kernel invocation.
#[derive(Clone, Copy)]
pub struct ExecEnv<'p> {
	pub pool: &'p dyn ParallelFor,
	pub config: ExecConfig,

	/// Outputs with fewer elements than this run inline on the calling thread.
	pub parallel_threshold: usize,
}

impl<'p> ExecEnv<'p> {
	pub fn new(pool: &'p dyn ParallelFor, config: ExecConfig) -> Self {
		Self { pool, config, parallel_threshold: config.parallel_threshold }
	}

	pub fn with_threshold(self, parallel_threshold: usize) -> Self {
		Self { parallel_threshold, ..self }
	}
}

/// Runs `task` over `[0, total)`, either inline or split into chunks on the pool.
fn run_chunked(
	env: &ExecEnv,
	total: usize,
	task: &RangeTask,
) -> Result<(), ErrPack<TensorOpError>> {
	if total == 0 {
		return Ok(());
	}
	if total < env.parallel_threshold {
		task(0, total);
		return Ok(());
	}
	let chunk = env.config.chunk_size(total);
	trace!("run_chunked: total={total}, chunk={chunk}, workers={}", env.config.workers);
	env.pool.parallel_for(total, chunk, task)
}

//--------------------------------------------------------------------------------------------------

/// Resolves the broadcast of `shape_a` and `shape_b` and writes `out[i] = f(a[..], b[..])`.
///
/// `a` and `b` are flat row-major buffers of their shapes. `out` must have exactly as many
/// elements as the broadcast shape, which is returned.
///
/// On error, `out` may be partially written.
pub fn compute<T, F>(
	shape_a: &[usize],
	shape_b: &[usize],
	a: &[T],
	b: &[T],
	out: &mut [T],
	f: &F,
	env: &ExecEnv,
) -> Result<TensorShape, ErrPack<TensorOpError>>
where
	T: Copy + Send + Sync,
	F: Fn(T, T) -> T + Sync,
{
	let bcast = resolve(shape_a, shape_b)?;
	let calc = CalcInfo::new(bcast, a, b, out)?;
	execute(&calc, f, env)?;
	Ok(calc.shape_out().clone())
}

pub fn execute<T, F>(
	calc: &CalcInfo<T>,
	f: &F,
	env: &ExecEnv,
) -> Result<(), ErrPack<TensorOpError>>
where
	T: Copy + Send + Sync,
	F: Fn(T, T) -> T + Sync,
{
	let path = calc.select_path();
	debug!(
		"binary: {} x {} -> {}, path={path:?}",
		calc.a().len(),
		calc.b().len(),
		calc.shape_out()
	);
	execute_path(calc, path, f, env)
}

/// Runs the given path. The path has to be applicable to `calc`; `execute()` picks the best one.
pub(crate) fn execute_path<T, F>(
	calc: &CalcInfo<T>,
	path: ExecPath,
	f: &F,
	env: &ExecEnv,
) -> Result<(), ErrPack<TensorOpError>>
where
	T: Copy + Send + Sync,
	F: Fn(T, T) -> T + Sync,
{
	let (a, b) = (calc.a(), calc.b());
	let total = calc.total();
	// SAFETY (all tasks below): `ParallelFor` hands out disjoint ranges inside `[0, total)`.
	match path {
		ExecPath::ScalarA => {
			debug_assert!(a.len() == 1 && b.len() == total);
			let s = a[0];
			run_chunked(env, total, &|begin, end| {
				let o = unsafe { calc.out_range(begin, end) };
				map_contiguous(o, &b[begin..end], &|x| f(s, x));
			})
		},
		ExecPath::ScalarB => {
			debug_assert!(b.len() == 1 && a.len() == total);
			let s = b[0];
			run_chunked(env, total, &|begin, end| {
				let o = unsafe { calc.out_range(begin, end) };
				map_contiguous(o, &a[begin..end], &|x| f(x, s));
			})
		},
		ExecPath::Contiguous => {
			debug_assert!(a.len() == total && b.len() == total);
			run_chunked(env, total, &|begin, end| {
				let o = unsafe { calc.out_range(begin, end) };
				zip_contiguous(o, &a[begin..end], &b[begin..end], f);
			})
		},
		ExecPath::Strided(rank) => execute_strided(calc, rank, f, env),
	}
}

fn execute_strided<T, F>(
	calc: &CalcInfo<T>,
	rank: usize,
	f: &F,
	env: &ExecEnv,
) -> Result<(), ErrPack<TensorOpError>>
where
	T: Copy + Send + Sync,
	F: Fn(T, T) -> T + Sync,
{
	match rank {
		0 => execute_rank::<T, F, 0>(calc, f, env),
		1 => execute_rank::<T, F, 1>(calc, f, env),
		2 => execute_rank::<T, F, 2>(calc, f, env),
		3 => execute_rank::<T, F, 3>(calc, f, env),
		4 => execute_rank::<T, F, 4>(calc, f, env),
		5 => execute_rank::<T, F, 5>(calc, f, env),
		6 => execute_rank::<T, F, 6>(calc, f, env),
		7 => execute_rank::<T, F, 7>(calc, f, env),
		8 => execute_rank::<T, F, 8>(calc, f, env),
		_ => {
			cold_path();
			Err(TensorOpError::unsupported_rank(rank))
		},
	}
}

fn execute_rank<T, F, const R: usize>(
	calc: &CalcInfo<T>,
	f: &F,
	env: &ExecEnv,
) -> Result<(), ErrPack<TensorOpError>>
where
	T: Copy + Send + Sync,
	F: Fn(T, T) -> T + Sync,
{
	let Ok(dims) = <&[MergedDim<2>; R]>::try_from(calc.dims().as_slice()) else {
		cold_path();
		return Err(TensorOpError::unsupported_rank(calc.dims().len()));
	};
	let (a, b) = (calc.a(), calc.b());
	run_chunked(env, calc.total(), &|begin, end| {
		// SAFETY: `ParallelFor` hands out disjoint ranges inside `[0, total)`.
		let o = unsafe { calc.out_range(begin, end) };
		zip_strided(o, begin, dims, a, b, f);
	})
}

//--------------------------------------------------------------------------------------------------

/// `out[i] = f(a[i])` over two buffers of the same length, chunked like the binary path.
pub fn compute_unary<T, F>(
	a: &[T],
	out: &mut [T],
	f: &F,
	env: &ExecEnv,
) -> Result<(), ErrPack<TensorOpError>>
where
	T: Copy + Send + Sync,
	F: Fn(T) -> T + Sync,
{
	if a.len() != out.len() {
		cold_path();
		return Err(TensorOpError::output_shape_mismatch(a.len(), out.len()));
	}
	debug!("unary: {} elems", a.len());
	let o = SendPtr(out.as_mut_ptr());
	run_chunked(env, a.len(), &|begin, end| {
		// SAFETY: `ParallelFor` hands out disjoint ranges inside `[0, a.len())`,
		// and `out` is exclusively borrowed for the duration of this call.
		let o = unsafe { o.slice_mut(begin, end - begin) };
		map_contiguous(o, &a[begin..end], f);
	})
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tensor::device::parallel::{InlinePool, RayonPool};

	fn add(a: i64, b: i64) -> i64 {
		a.wrapping_add(b)
	}

	#[test]
	fn test_compute_returns_shape() {
		let env = ExecEnv::new(&InlinePool, ExecConfig::with_workers(4));
		let mut out = [0_i64; 6];
		let shape =
			compute(&[2, 3], &[1, 3], &[1, 2, 3, 4, 5, 6], &[10, 20, 30], &mut out, &add, &env)
				.unwrap();
		assert_eq!(shape.dims(), &[2, 3]);
		assert_eq!(out, [11, 22, 33, 14, 25, 36]);
	}

	#[test]
	fn test_threshold_controls_pool_use() {
		// A pool that refuses all work shows whether it was asked.
		struct NoPool;
		unsafe impl ParallelFor for NoPool {
			fn parallel_for(
				&self,
				_total: usize,
				_chunk: usize,
				_task: &RangeTask,
			) -> Result<(), ErrPack<TensorOpError>> {
				Err(TensorOpError::pool_failure("no workers", None))
			}
		}

		let a = [1_i64; 100];
		let mut out = [0_i64; 100];

		let env = ExecEnv::new(&NoPool, ExecConfig::with_workers(8)).with_threshold(101);
		compute(&[100], &[100], &a, &a, &mut out, &add, &env).unwrap();
		assert_eq!(out, [2; 100]);

		let env = env.with_threshold(100);
		let err = compute(&[100], &[100], &a, &a, &mut out, &add, &env).unwrap_err();
		assert_eq!(err.code, TensorOpError::PoolFailure);
	}

	#[test]
	fn test_strided_rank_outside_table() {
		let a = [0_i64; 2];
		let mut out = [0_i64; 2];
		let calc = CalcInfo::new(resolve(&[2], &[2]).unwrap(), &a, &a, &mut out).unwrap();
		let env = ExecEnv::new(&InlinePool, ExecConfig::default());
		let err = execute_path(&calc, ExecPath::Strided(9), &add, &env).unwrap_err();
		assert_eq!(err.code, TensorOpError::UnsupportedRank);
	}

	#[test]
	fn test_unary_parallel() {
		let pool = RayonPool::new(3).unwrap();
		let env = ExecEnv::new(&pool, ExecConfig::with_workers(5)).with_threshold(0);
		let a: Vec<i64> = (0..1000).collect();
		let mut out = vec![0; 1000];
		compute_unary(&a, &mut out, &|x| x * x, &env).unwrap();
		assert!(out.iter().enumerate().all(|(i, &x)| x == (i * i) as i64));

		let err = compute_unary(&a, &mut out[..999], &|x| x, &env).unwrap_err();
		assert_eq!(err.code, TensorOpError::OutputShapeMismatch);
	}
}
