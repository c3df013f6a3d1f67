//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use arrayvec::ArrayVec;

use crate::util::cold_path;

use super::shape::MAX_RANK;

//--------------------------------------------------------------------------------------------------

/// One iteration axis shared by `N` inputs. The output is always contiguous, so it has no stride.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergedDim<const N: usize> {
	pub size: usize,
	pub strides: [usize; N],
}

pub type MergedDims<const N: usize> = ArrayVec<MergedDim<N>, MAX_RANK>;

/// Collapses adjacent axes that can be walked as one.
///
/// Two neighbouring axes merge when, for every input, stepping over the whole inner axis lands
/// exactly on the next element of the outer axis. Broadcasted axes (stride 0) merge with each
/// other. Size-1 axes are dropped, so the result may be empty (a single element).
///
/// `shape` and every entry of `strides` must have the same length, at most `MAX_RANK`.
/// The result is ordered outermost first, like the input.
pub fn merge_dims<const N: usize>(shape: &[usize], strides: [&[usize]; N]) -> MergedDims<N> {
	debug_assert!(shape.len() <= MAX_RANK);
	debug_assert!(strides.iter().all(|s| s.len() == shape.len()));

	// Built innermost first, reversed at the end.
	let mut dims = MergedDims::<N>::new();
	for axis in (0..shape.len()).rev() {
		let size = shape[axis];
		if size == 1 {
			continue;
		}
		if size == 0 {
			cold_path();
			dims.clear();
			dims.push(MergedDim { size: 0, strides: [0; N] });
			return dims;
		}

		let next = MergedDim {
			size,
			strides: std::array::from_fn(|i| strides[i][axis]),
		};
		if let Some(prev) = dims.last_mut()
			&& (0..N).all(|i| next.strides[i] == prev.size * prev.strides[i])
		{
			// Fast path: Extend the previous dimension
			prev.size *= size;
			continue;
		}
		dims.push(next);
	}
	dims.reverse();
	dims
}

//--------------------------------------------------------------------------------------------------
