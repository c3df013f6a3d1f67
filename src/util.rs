//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

/// Marks the calling branch as unlikely.
#[cold]
pub fn cold_path() {}

/// Wrapper that lets a raw pointer cross into worker closures.
///
/// Whoever dereferences it is responsible for making sure that no two threads
/// touch the same element.
#[derive(Clone, Copy)]
pub struct SendPtr<T>(pub *mut T);

unsafe impl<T: Send> Send for SendPtr<T> {}
unsafe impl<T: Send> Sync for SendPtr<T> {}

impl<T> SendPtr<T> {
	/// # Safety
	///
	/// `[begin, begin + len)` must be in bounds of the allocation, and nothing else may access
	/// those elements while the returned slice lives.
	#[inline(always)]
	pub unsafe fn slice_mut<'a>(self, begin: usize, len: usize) -> &'a mut [T] {
		unsafe { std::slice::from_raw_parts_mut(self.0.add(begin), len) }
	}
}
