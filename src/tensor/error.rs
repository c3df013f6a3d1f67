//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::borrow::Cow;

use crate::{ErrExtra, ErrPack};

use super::dtype::{DType, DTypeMismatchError};
use super::shape::{ElementsOverflowError, MAX_RANK};

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct NullDataError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct UnsupportedDTypeError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct InvalidBufferSizeError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct BufAllocFailedError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TensorOpError {
	ShapeIncompatible,
	UnsupportedRank,
	NullData,
	PoolFailure,
	DTypeMismatch,
	UnsupportedDType,
	InvalidBufferSize,
	ElementsOverflow,
	MissingTensor,
	OutputShapeMismatch,
	UnknownOp,
	BufAllocFailed,
}

//--------------------------------------------------------------------------------------------------

impl TensorOpError {
	#[cold]
	#[inline(never)]
	pub fn shape_incompatible(axis: usize, a: usize, b: usize) -> ErrPack<Self> {
		ErrPack::with_message(
			Self::ShapeIncompatible,
			format!("cannot broadcast axis {axis}: {a} vs {b}"),
		)
	}

	#[cold]
	#[inline(never)]
	pub fn unsupported_rank(rank: usize) -> ErrPack<Self> {
		ErrPack::with_message(
			Self::UnsupportedRank,
			format!("rank {rank} exceeds the maximum of {MAX_RANK}"),
		)
	}

	#[cold]
	#[inline(never)]
	pub fn dtype_mismatch(expected: DType, got: DType) -> ErrPack<Self> {
		ErrPack::with_message(Self::DTypeMismatch, format!("expected {expected}, got {got}"))
	}

	#[cold]
	#[inline(never)]
	pub fn missing_tensor(what: &'static str, index: usize) -> ErrPack<Self> {
		ErrPack::with_message(Self::MissingTensor, format!("missing {what} {index}"))
	}

	#[cold]
	#[inline(never)]
	pub fn output_shape_mismatch(expected: usize, got: usize) -> ErrPack<Self> {
		ErrPack::with_message(
			Self::OutputShapeMismatch,
			format!("output has {got} elements, broadcast result needs {expected}"),
		)
	}

	#[cold]
	#[inline(never)]
	pub fn unknown_op(op_type: &str) -> ErrPack<Self> {
		ErrPack::with_message(Self::UnknownOp, format!("no kernel registered for `{op_type}`"))
	}

	#[cold]
	#[inline(never)]
	pub fn pool_failure(
		message: impl Into<Cow<'static, str>>,
		nested: Option<Box<dyn std::error::Error + Send + Sync>>,
	) -> ErrPack<Self> {
		ErrPack {
			code: Self::PoolFailure,
			extra: Some(Box::new(ErrExtra { message: message.into(), nested })),
		}
	}
}

//--------------------------------------------------------------------------------------------------

impl From<ElementsOverflowError> for TensorOpError {
	fn from(_: ElementsOverflowError) -> Self {
		Self::ElementsOverflow
	}
}

impl From<ElementsOverflowError> for ErrPack<TensorOpError> {
	fn from(_: ElementsOverflowError) -> Self {
		Self {
			code: TensorOpError::ElementsOverflow,
			extra: None,
		}
	}
}

impl From<NullDataError> for TensorOpError {
	fn from(_: NullDataError) -> Self {
		Self::NullData
	}
}

impl From<NullDataError> for ErrPack<TensorOpError> {
	fn from(_: NullDataError) -> Self {
		Self {
			code: TensorOpError::NullData,
			extra: None,
		}
	}
}

impl From<DTypeMismatchError> for ErrPack<TensorOpError> {
	fn from(_: DTypeMismatchError) -> Self {
		Self {
			code: TensorOpError::DTypeMismatch,
			extra: None,
		}
	}
}

impl From<UnsupportedDTypeError> for ErrPack<TensorOpError> {
	fn from(_: UnsupportedDTypeError) -> Self {
		Self {
			code: TensorOpError::UnsupportedDType,
			extra: None,
		}
	}
}

impl From<InvalidBufferSizeError> for ErrPack<TensorOpError> {
	fn from(_: InvalidBufferSizeError) -> Self {
		Self {
			code: TensorOpError::InvalidBufferSize,
			extra: None,
		}
	}
}

impl From<BufAllocFailedError> for ErrPack<TensorOpError> {
	fn from(_: BufAllocFailedError) -> Self {
		Self {
			code: TensorOpError::BufAllocFailed,
			extra: None,
		}
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display_carries_message() {
		let err = TensorOpError::shape_incompatible(1, 3, 4);
		assert_eq!(err.code, TensorOpError::ShapeIncompatible);
		assert_eq!(err.message(), "cannot broadcast axis 1: 3 vs 4");
		assert_eq!(
			err.to_string(),
			"(ErrPack: code=ShapeIncompatible, message=cannot broadcast axis 1: 3 vs 4)"
		);
	}

	#[test]
	fn test_unit_errors_convert() {
		let err: ErrPack<TensorOpError> = NullDataError.into();
		assert_eq!(err.code, TensorOpError::NullData);
		assert!(err.extra.is_none());
		assert_eq!(err.to_string(), "(ErrPack: code=NullData)");
	}
}
