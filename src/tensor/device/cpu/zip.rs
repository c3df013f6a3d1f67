//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use crate::tensor::dim_merger::MergedDim;

//--------------------------------------------------------------------------------------------------

/// Address alignment that allows full-width vector loads (AVX).
pub const SIMD_ALIGN: usize = 32;

/// Elements per block in the aligned loops.
const LANES: usize = 8;

/// True if every pointer sits on a `SIMD_ALIGN` boundary.
pub fn aligned_check<const N: usize>(ptrs: [*const u8; N]) -> bool {
	ptrs.iter().all(|&p| (p as usize) % SIMD_ALIGN == 0)
}

//--------------------------------------------------------------------------------------------------

// The aligned and unaligned variants compute exactly the same values. The aligned one walks
// fixed-size blocks so the compiler can keep whole blocks in vector registers.

#[inline(always)]
fn zip_blocks<T: Copy>(o: &mut [T], a: &[T], b: &[T], f: &impl Fn(T, T) -> T) {
	let mut o_blocks = o.chunks_exact_mut(LANES);
	let mut a_blocks = a.chunks_exact(LANES);
	let mut b_blocks = b.chunks_exact(LANES);
	for ((o, a), b) in o_blocks.by_ref().zip(a_blocks.by_ref()).zip(b_blocks.by_ref()) {
		for i in 0..LANES {
			o[i] = f(a[i], b[i]);
		}
	}
	zip_elems(o_blocks.into_remainder(), a_blocks.remainder(), b_blocks.remainder(), f);
}

#[inline(always)]
fn zip_elems<T: Copy>(o: &mut [T], a: &[T], b: &[T], f: &impl Fn(T, T) -> T) {
	for ((o, &a), &b) in o.iter_mut().zip(a).zip(b) {
		*o = f(a, b);
	}
}

/// `o[i] = f(a[i], b[i])`. All three slices have the same length.
pub fn zip_contiguous<T: Copy>(o: &mut [T], a: &[T], b: &[T], f: &impl Fn(T, T) -> T) {
	debug_assert!(a.len() == o.len() && b.len() == o.len());
	if aligned_check([o.as_ptr().cast(), a.as_ptr().cast(), b.as_ptr().cast()]) {
		zip_blocks(o, a, b, f);
	} else {
		zip_elems(o, a, b, f);
	}
}

#[inline(always)]
fn map_blocks<T: Copy>(o: &mut [T], a: &[T], f: &impl Fn(T) -> T) {
	let mut o_blocks = o.chunks_exact_mut(LANES);
	let mut a_blocks = a.chunks_exact(LANES);
	for (o, a) in o_blocks.by_ref().zip(a_blocks.by_ref()) {
		for i in 0..LANES {
			o[i] = f(a[i]);
		}
	}
	map_elems(o_blocks.into_remainder(), a_blocks.remainder(), f);
}

#[inline(always)]
fn map_elems<T: Copy>(o: &mut [T], a: &[T], f: &impl Fn(T) -> T) {
	for (o, &a) in o.iter_mut().zip(a) {
		*o = f(a);
	}
}

/// `o[i] = f(a[i])`. Used for unary kernels and for binary ones with a scalar operand folded
/// into `f`.
pub fn map_contiguous<T: Copy>(o: &mut [T], a: &[T], f: &impl Fn(T) -> T) {
	debug_assert!(a.len() == o.len());
	if aligned_check([o.as_ptr().cast(), a.as_ptr().cast()]) {
		map_blocks(o, a, f);
	} else {
		map_elems(o, a, f);
	}
}

//--------------------------------------------------------------------------------------------------

/// Strided combine over an `R`-dimensional iteration space.
///
/// `o` holds the output elements `[begin, begin + o.len())` of the flat, contiguous output.
/// `dims` is outermost first; `strides[0]` indexes `a`, `strides[1]` indexes `b`.
pub fn zip_strided<T: Copy, const R: usize>(
	o: &mut [T],
	begin: usize,
	dims: &[MergedDim<2>; R],
	a: &[T],
	b: &[T],
	f: &impl Fn(T, T) -> T,
) {
	if o.is_empty() {
		return;
	}

	// Unravel `begin` into coordinates and the matching input offsets.
	let mut coord = [0_usize; R];
	let mut rest = begin;
	let mut off_a = 0;
	let mut off_b = 0;
	for axis in (0..R).rev() {
		let dim = &dims[axis];
		coord[axis] = rest % dim.size;
		rest /= dim.size;
		off_a += coord[axis] * dim.strides[0];
		off_b += coord[axis] * dim.strides[1];
	}
	debug_assert!(rest == 0 || R == 0);

	let Some(last) = R.checked_sub(1) else {
		o[0] = f(a[off_a], b[off_b]);
		return;
	};

	// Innermost axis runs in a tight loop, outer axes advance like an odometer.
	let inner = &dims[last];
	let mut o = o;
	loop {
		let run = (inner.size - coord[last]).min(o.len());
		let (head, tail) = std::mem::take(&mut o).split_at_mut(run);
		for out in head {
			*out = f(a[off_a], b[off_b]);
			off_a += inner.strides[0];
			off_b += inner.strides[1];
		}
		o = tail;
		if o.is_empty() {
			return;
		}

		// We finished the inner axis, rewind it and carry into the outer ones.
		off_a -= inner.size * inner.strides[0];
		off_b -= inner.size * inner.strides[1];
		coord[last] = 0;
		let mut axis = last;
		while axis > 0 {
			axis -= 1;
			let dim = &dims[axis];
			coord[axis] += 1;
			off_a += dim.strides[0];
			off_b += dim.strides[1];
			if coord[axis] < dim.size {
				break;
			}
			off_a -= dim.size * dim.strides[0];
			off_b -= dim.size * dim.strides[1];
			coord[axis] = 0;
		}
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	fn add(a: i32, b: i32) -> i32 {
		a + b
	}

	#[test]
	fn test_aligned_and_unaligned_agree() {
		// one element of offset breaks the alignment of the sub-slices
		let a: Vec<i32> = (0..53).collect();
		let b: Vec<i32> = (0..53).map(|x| x * 100).collect();
		let expected: Vec<i32> = a.iter().zip(&b).map(|(x, y)| x + y).collect();

		let mut o1 = vec![0; 53];
		zip_blocks(&mut o1, &a, &b, &add);
		let mut o2 = vec![0; 53];
		zip_elems(&mut o2, &a, &b, &add);
		let mut o3 = vec![0; 52];
		zip_contiguous(&mut o3, &a[1..], &b[1..], &add);

		assert_eq!(o1, expected);
		assert_eq!(o2, expected);
		assert_eq!(o3, expected[1..]);
	}

	#[test]
	fn test_aligned_check() {
		let p = SIMD_ALIGN as *const u8;
		assert!(aligned_check([p, p.wrapping_add(SIMD_ALIGN)]));
		assert!(!aligned_check([p, p.wrapping_add(4)]));
		assert!(aligned_check::<0>([]));
	}

	#[test]
	fn test_strided_row_broadcast() {
		// [[1, 2, 3], [4, 5, 6]] + [[10, 20, 30]]
		let dims = [MergedDim { size: 2, strides: [3, 0] }, MergedDim { size: 3, strides: [1, 1] }];
		let a = [1, 2, 3, 4, 5, 6];
		let b = [10, 20, 30];
		let mut o = [0; 6];
		zip_strided(&mut o, 0, &dims, &a, &b, &add);
		assert_eq!(o, [11, 22, 33, 14, 25, 36]);
	}

	#[test]
	fn test_strided_partial_ranges() {
		// column vector + row vector: [3, 1] + [1, 4]
		let dims = [MergedDim { size: 3, strides: [1, 0] }, MergedDim { size: 4, strides: [0, 1] }];
		let a = [100, 200, 300];
		let b = [1, 2, 3, 4];
		let mut full = [0; 12];
		zip_strided(&mut full, 0, &dims, &a, &b, &add);
		assert_eq!(full, [101, 102, 103, 104, 201, 202, 203, 204, 301, 302, 303, 304]);

		for begin in 0..12 {
			for end in begin..=12 {
				let mut part = vec![0; end - begin];
				zip_strided(&mut part, begin, &dims, &a, &b, &add);
				assert_eq!(part, full[begin..end]);
			}
		}
	}

	#[test]
	fn test_rank_zero() {
		let mut o = [0];
		zip_strided::<i32, 0>(&mut o, 0, &[], &[4], &[5], &add);
		assert_eq!(o, [9]);
	}
}
