//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::marker::PhantomData;

use crate::ErrPack;
use crate::tensor::bcast::{Bcast, BroadcastDescriptor};
use crate::tensor::dim_merger::{MergedDims, merge_dims};
use crate::tensor::error::TensorOpError;
use crate::tensor::shape::{TensorShape, shape_elems};
use crate::util::{SendPtr, cold_path};

//--------------------------------------------------------------------------------------------------

/// Which loop the executor runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecPath {
	/// `a` is a single element, `b` covers the whole output.
	ScalarA,
	/// `b` is a single element, `a` covers the whole output.
	ScalarB,
	/// Neither input is broadcasted.
	Contiguous,
	/// General case, iterated at the given merged rank.
	Strided(usize),
}

/// Everything one binary invocation needs, shared read-only by all workers.
///
/// The output is kept as a raw pointer so that workers can write disjoint ranges of it.
pub struct CalcInfo<'a, T> {
	a: &'a [T],
	b: &'a [T],
	out: SendPtr<T>,
	out_len: usize,
	bcast: Bcast,
	dims: MergedDims<2>,
	phantom: PhantomData<&'a mut [T]>,
}

fn desc_elems(desc: &BroadcastDescriptor) -> Result<usize, ErrPack<TensorOpError>> {
	Ok(shape_elems(&desc.reshape)?)
}

impl<'a, T: Copy + Send + Sync> CalcInfo<'a, T> {
	/// # Errors
	/// - `InvalidBufferSize` if an input doesn't hold exactly the elements its shape describes.
	/// - `OutputShapeMismatch` if `out` doesn't hold exactly the broadcast result.
	pub fn new(
		bcast: Bcast,
		a: &'a [T],
		b: &'a [T],
		out: &'a mut [T],
	) -> Result<Self, ErrPack<TensorOpError>> {
		let total = bcast.shape_out().elems()?;
		if a.len() != desc_elems(bcast.a())? || b.len() != desc_elems(bcast.b())? {
			cold_path();
			return Err(ErrPack::with_message(
				TensorOpError::InvalidBufferSize,
				format!("input buffers hold {} and {} elements", a.len(), b.len()),
			));
		}
		if out.len() != total {
			cold_path();
			return Err(TensorOpError::output_shape_mismatch(total, out.len()));
		}

		let strides_a = bcast.a().strides();
		let strides_b = bcast.b().strides();
		let dims =
			merge_dims(bcast.shape_out().dims(), [strides_a.as_slice(), strides_b.as_slice()]);

		Ok(Self {
			a,
			b,
			out: SendPtr(out.as_mut_ptr()),
			out_len: out.len(),
			bcast,
			dims,
			phantom: PhantomData,
		})
	}

	pub fn a(&self) -> &'a [T] {
		self.a
	}

	pub fn b(&self) -> &'a [T] {
		self.b
	}

	pub fn bcast(&self) -> &Bcast {
		&self.bcast
	}

	pub fn shape_out(&self) -> &TensorShape {
		self.bcast.shape_out()
	}

	pub fn total(&self) -> usize {
		self.out_len
	}

	/// Iteration axes after merging, outermost first.
	pub fn dims(&self) -> &MergedDims<2> {
		&self.dims
	}

	pub fn select_path(&self) -> ExecPath {
		let total = self.total();
		if self.a.len() == 1 && self.b.len() == total {
			ExecPath::ScalarA
		} else if self.b.len() == 1 && self.a.len() == total {
			ExecPath::ScalarB
		} else if self.a.len() == total && self.b.len() == total {
			ExecPath::Contiguous
		} else {
			ExecPath::Strided(self.dims.len())
		}
	}

	/// # Safety
	///
	/// `begin <= end <= total()`, and no other live reference may overlap `[begin, end)`.
	#[allow(clippy::mut_from_ref)]
	pub unsafe fn out_range(&self, begin: usize, end: usize) -> &mut [T] {
		debug_assert!(begin <= end && end <= self.out_len);
		unsafe { self.out.slice_mut(begin, end - begin) }
	}
}

//--------------------------------------------------------------------------------------------------
