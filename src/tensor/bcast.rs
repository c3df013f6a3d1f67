//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use arrayvec::ArrayVec;

use crate::ErrPack;
use crate::util::cold_path;

use super::error::TensorOpError;
use super::shape::{MAX_RANK, TensorShape};

//--------------------------------------------------------------------------------------------------

pub type RankVec = ArrayVec<usize, MAX_RANK>;

/// How one input is laid over the broadcast output.
///
/// Axes are right-aligned (NumPy convention): `reshape` is the input shape padded on the left
/// with ones up to the iteration rank. Axis 0 is the outermost one.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BroadcastDescriptor {
	pub reshape: RankVec,

	/// Replication factor per axis. Either 1, or `reshape[axis] == 1` and this is the output
	/// size of the axis.
	pub broadcast: RankVec,
}

impl BroadcastDescriptor {
	pub fn rank(&self) -> usize {
		self.reshape.len()
	}

	/// Element strides into the input's flat buffer. Replicated axes get stride 0.
	pub fn strides(&self) -> RankVec {
		let mut strides: RankVec = self.reshape.iter().map(|_| 0).collect();
		let mut elems = 1;
		for (stride, &size) in strides.iter_mut().zip(&self.reshape).rev() {
			if size != 1 {
				*stride = elems;
			}
			elems *= size;
		}
		strides
	}

	pub fn is_broadcasted(&self) -> bool {
		self.broadcast.iter().any(|&b| b != 1)
	}
}

//--------------------------------------------------------------------------------------------------

/// Result of resolving two input shapes against each other.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bcast {
	shape_out: TensorShape,
	a: BroadcastDescriptor,
	b: BroadcastDescriptor,
}

impl Bcast {
	pub fn shape_out(&self) -> &TensorShape {
		&self.shape_out
	}

	pub fn a(&self) -> &BroadcastDescriptor {
		&self.a
	}

	pub fn b(&self) -> &BroadcastDescriptor {
		&self.b
	}

	/// Iteration rank, i.e. the larger of the two input ranks.
	pub fn rank(&self) -> usize {
		self.shape_out.rank()
	}
}

/// Finds the common size of one aligned axis.
///
/// Size 1 yields to the other size. Note that this makes `0` win over `1`.
pub fn merge_single_dim(a: usize, b: usize) -> Option<usize> {
	let size = if a == 1 { b } else { a };
	if (a == size || a == 1) && (b == size || b == 1) {
		Some(size)
	} else {
		cold_path();
		None
	}
}

#[inline]
fn aligned_dim(shape: &[usize], rank: usize, axis: usize) -> usize {
	let pad = rank - shape.len();
	if axis < pad { 1 } else { shape[axis - pad] }
}

/// Resolves NumPy-style broadcasting of `shape_a` against `shape_b`.
///
/// # Errors
/// - `UnsupportedRank` if the longer shape has more than `MAX_RANK` dimensions.
/// - `ShapeIncompatible` for the first axis where the sizes differ and neither is 1.
pub fn resolve(shape_a: &[usize], shape_b: &[usize]) -> Result<Bcast, ErrPack<TensorOpError>> {
	let rank = shape_a.len().max(shape_b.len());
	if rank > MAX_RANK {
		cold_path();
		return Err(TensorOpError::unsupported_rank(rank));
	}

	let mut out = RankVec::new();
	let mut a = BroadcastDescriptor::default();
	let mut b = BroadcastDescriptor::default();
	for axis in 0..rank {
		let dim_a = aligned_dim(shape_a, rank, axis);
		let dim_b = aligned_dim(shape_b, rank, axis);
		let Some(size) = merge_single_dim(dim_a, dim_b) else {
			return Err(TensorOpError::shape_incompatible(axis, dim_a, dim_b));
		};
		out.push(size);
		for (desc, dim) in [(&mut a, dim_a), (&mut b, dim_b)] {
			desc.reshape.push(dim);
			desc.broadcast.push(if dim == size { 1 } else { size });
		}
	}

	Ok(Bcast { shape_out: TensorShape::new(&out), a, b })
}

//--------------------------------------------------------------------------------------------------
