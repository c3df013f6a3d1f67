//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use crate::ErrPack;
use crate::tensor::error::TensorOpError;

/// Binds `$T` to the Rust type of `$dtype` and evaluates the matching body.
///
/// Types outside the float and integer families fail with `UnsupportedDType`.
macro_rules! dispatch_dtype {
	($dtype:expr, $T:ident, float => $float:expr, int => $int:expr $(,)?) => {{
		use $crate::tensor::dtype::DType;
		let dtype: DType = $dtype;
		if dtype == DType::F32 {
			type $T = f32;
			$float
		} else if dtype == DType::F64 {
			type $T = f64;
			$float
		} else if dtype == DType::I8 {
			type $T = i8;
			$int
		} else if dtype == DType::I16 {
			type $T = i16;
			$int
		} else if dtype == DType::I32 {
			type $T = i32;
			$int
		} else if dtype == DType::I64 {
			type $T = i64;
			$int
		} else if dtype == DType::U8 {
			type $T = u8;
			$int
		} else if dtype == DType::U16 {
			type $T = u16;
			$int
		} else if dtype == DType::U32 {
			type $T = u32;
			$int
		} else if dtype == DType::U64 {
			type $T = u64;
			$int
		} else {
			$crate::util::cold_path();
			Err($crate::tensor::error::UnsupportedDTypeError.into())
		}
	}};
}

pub(crate) use dispatch_dtype;

pub mod binary;
pub mod context;
pub mod registry;
pub mod unary;

pub use binary::{BinaryKernel, BinaryOp};
pub use context::{HostContext, HostTensor, KernelArgs, KernelContext};
pub use registry::KernelRegistry;
pub use unary::{UnaryKernel, UnaryOp};

//--------------------------------------------------------------------------------------------------

/// What the pipeline above a kernel gets to see.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KernelStatus {
	Ok,
	ParamInvalid,
	InnerError,
}

impl KernelStatus {
	pub fn is_ok(self) -> bool {
		self == Self::Ok
	}
}

impl From<TensorOpError> for KernelStatus {
	fn from(code: TensorOpError) -> Self {
		match code {
			TensorOpError::PoolFailure | TensorOpError::BufAllocFailed => Self::InnerError,
			_ => Self::ParamInvalid,
		}
	}
}

impl From<&Result<(), ErrPack<TensorOpError>>> for KernelStatus {
	fn from(result: &Result<(), ErrPack<TensorOpError>>) -> Self {
		match result {
			Ok(()) => Self::Ok,
			Err(err) => err.code.into(),
		}
	}
}

/// One operator type executed on the host.
pub trait CpuKernel: Send + Sync {
	fn op_type(&self) -> &'static str;

	/// Reads the inputs of `ctx`, writes its first output and sets the output's shape.
	///
	/// On error, the output contents are unspecified.
	fn compute(&self, ctx: &mut dyn KernelContext) -> Result<(), ErrPack<TensorOpError>>;
}

//--------------------------------------------------------------------------------------------------
