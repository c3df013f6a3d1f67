//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::fmt;

use smallvec::SmallVec;

use crate::util::cold_path;

//--------------------------------------------------------------------------------------------------

pub const INLINE_DIMS: usize = 5;

/// The highest iteration rank the strided executor has a specialisation for.
pub const MAX_RANK: usize = 8;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ElementsOverflowError;

//--------------------------------------------------------------------------------------------------

/// Dimension sizes of a tensor, outermost first. Rank 0 is a scalar.
#[derive(Clone, PartialEq, Eq, Default, Hash)]
pub struct TensorShape {
	dims: SmallVec<[usize; INLINE_DIMS]>,
}

impl TensorShape {
	pub fn new(dims: &[usize]) -> Self {
		Self { dims: SmallVec::from_slice(dims) }
	}

	pub fn scalar() -> Self {
		Self { dims: SmallVec::new() }
	}

	pub fn rank(&self) -> usize {
		self.dims.len()
	}

	pub fn dims(&self) -> &[usize] {
		&self.dims
	}

	pub fn is_scalar(&self) -> bool {
		self.dims.is_empty()
	}

	/// Number of elements. A scalar has one element.
	pub fn elems(&self) -> Result<usize, ElementsOverflowError> {
		shape_elems(&self.dims)
	}
}

/// Checked product of the dimension sizes.
pub fn shape_elems(dims: &[usize]) -> Result<usize, ElementsOverflowError> {
	let mut elems: usize = 1;
	for &dim in dims {
		let Some(e) = elems.checked_mul(dim) else {
			cold_path();
			return Err(ElementsOverflowError);
		};
		elems = e;
	}
	Ok(elems)
}

impl From<&[usize]> for TensorShape {
	fn from(dims: &[usize]) -> Self {
		Self::new(dims)
	}
}

impl<const N: usize> From<[usize; N]> for TensorShape {
	fn from(dims: [usize; N]) -> Self {
		Self::new(&dims)
	}
}

impl<const N: usize> From<&[usize; N]> for TensorShape {
	fn from(dims: &[usize; N]) -> Self {
		Self::new(dims)
	}
}

impl fmt::Display for TensorShape {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "[")?;
		for (i, dim) in self.dims.iter().enumerate() {
			if i > 0 {
				write!(f, ", ")?;
			}
			write!(f, "{dim}")?;
		}
		write!(f, "]")
	}
}

impl fmt::Debug for TensorShape {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

//--------------------------------------------------------------------------------------------------
