//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::alloc::Layout;
use std::ptr::NonNull;

use crate::tensor::dtype::{DType, DTypeMismatchError, Element, MAX_DTYPE_ALIGN};
use crate::tensor::error::BufAllocFailedError;
use crate::util::cold_path;

//--------------------------------------------------------------------------------------------------

/// Every host buffer starts on a cache line, which also satisfies any vector load.
pub const BUFFER_ALIGN: usize = 64;

const _: () = assert!(BUFFER_ALIGN >= MAX_DTYPE_ALIGN);

/// Zero-initialised host memory holding `elems` values of `dtype`.
pub struct HostBuffer {
	memory: NonNull<u8>,
	dtype: DType,
	elems: usize,
}

// The buffer owns its memory exclusively, like a `Vec<u8>`.
unsafe impl Send for HostBuffer {}
unsafe impl Sync for HostBuffer {}

fn layout(dtype: DType, elems: usize) -> Option<Layout> {
	let bytes = dtype.array_bytes(elems)?;
	// zero-sized allocations are not allowed
	Layout::from_size_align(bytes.max(1), BUFFER_ALIGN).ok()
}

impl HostBuffer {
	#[inline(never)]
	pub fn new_zeroed(dtype: DType, elems: usize) -> Result<Self, BufAllocFailedError> {
		if let Some(layout) = layout(dtype, elems)
			&& let Some(memory) = NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
		{
			Ok(Self { memory, dtype, elems })
		} else {
			cold_path();
			Err(BufAllocFailedError)
		}
	}

	pub fn from_slice<T: Element>(data: &[T]) -> Result<Self, BufAllocFailedError> {
		let mut buf = Self::new_zeroed(T::dtype, data.len())?;
		// SAFETY: the buffer was allocated for `data.len()` elements of `T`
		let dst = unsafe { buf.slice_mut_unchecked::<T>() };
		dst.copy_from_slice(data);
		Ok(buf)
	}

	#[inline]
	pub fn memory(&self) -> NonNull<u8> {
		self.memory
	}

	#[inline]
	pub fn dtype(&self) -> DType {
		self.dtype
	}

	#[inline]
	pub fn elems(&self) -> usize {
		self.elems
	}

	/// Size of the data in bytes.
	#[inline]
	pub fn bytes(&self) -> usize {
		self.dtype.bytes() * self.elems
	}

	pub fn as_slice<T: Element>(&self) -> Result<&[T], DTypeMismatchError> {
		if self.dtype != T::dtype {
			cold_path();
			return Err(DTypeMismatchError);
		}
		debug_assert!(T::dtype.bytes() == std::mem::size_of::<T>());
		let slice = unsafe { std::slice::from_raw_parts(self.memory.as_ptr().cast(), self.elems) };
		Ok(slice)
	}

	pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T], DTypeMismatchError> {
		if self.dtype != T::dtype {
			cold_path();
			return Err(DTypeMismatchError);
		}
		Ok(unsafe { self.slice_mut_unchecked() })
	}

	/// # Safety
	///
	/// `T::dtype` must be the dtype of the buffer.
	unsafe fn slice_mut_unchecked<T: Element>(&mut self) -> &mut [T] {
		unsafe { std::slice::from_raw_parts_mut(self.memory.as_ptr().cast(), self.elems) }
	}

	pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, DTypeMismatchError> {
		self.as_slice().map(<[T]>::to_vec)
	}
}

impl Drop for HostBuffer {
	fn drop(&mut self) {
		if let Some(layout) = layout(self.dtype, self.elems) {
			unsafe { std::alloc::dealloc(self.memory.as_ptr(), layout) };
		}
	}
}

impl std::fmt::Debug for HostBuffer {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "HostBuffer({} x {})", self.dtype, self.elems)
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tensor::dtype::HasDType;

	#[test]
	fn test_zeroed_and_aligned() {
		let buf = HostBuffer::new_zeroed(f64::dtype, 7).unwrap();
		assert_eq!(buf.bytes(), 56);
		assert_eq!(buf.memory().as_ptr() as usize % BUFFER_ALIGN, 0);
		assert_eq!(buf.as_slice::<f64>().unwrap(), &[0.0; 7]);
	}

	#[test]
	fn test_typed_views_check_dtype() {
		let mut buf = HostBuffer::from_slice(&[1_i32, 2, 3]).unwrap();
		assert_eq!(buf.as_slice::<u32>(), Err(DTypeMismatchError));
		buf.as_mut_slice::<i32>().unwrap()[1] = 20;
		assert_eq!(buf.to_vec::<i32>().unwrap(), vec![1, 20, 3]);
	}

	#[test]
	fn test_empty_buffer() {
		let buf = HostBuffer::from_slice::<f32>(&[]).unwrap();
		assert_eq!(buf.elems(), 0);
		assert!(buf.as_slice::<f32>().unwrap().is_empty());
	}

	#[test]
	fn test_overflowing_size_fails() {
		assert_eq!(
			HostBuffer::new_zeroed(u64::dtype, usize::MAX).map(|_| ()),
			Err(BufAllocFailedError)
		);
	}
}
