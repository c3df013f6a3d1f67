//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::fmt;
use std::num::NonZeroU8;

use crate::util::cold_path;

//--------------------------------------------------------------------------------------------------

pub const MAX_DTYPE_ALIGN: usize = 8; // 64-bit

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum DTypeKind {
	Float,
	Int,
	Uint,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct DType {
	pub kind: DTypeKind,
	pub bits: NonZeroU8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct DTypeMismatchError;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct UnknownDTypeError;

#[allow(clippy::unwrap_used)]
impl DType {
	pub const F32: Self = Self { kind: DTypeKind::Float, bits: NonZeroU8::new(32).unwrap() };
	pub const F64: Self = Self { kind: DTypeKind::Float, bits: NonZeroU8::new(64).unwrap() };
	pub const I8: Self = Self { kind: DTypeKind::Int, bits: NonZeroU8::new(8).unwrap() };
	pub const I16: Self = Self { kind: DTypeKind::Int, bits: NonZeroU8::new(16).unwrap() };
	pub const I32: Self = Self { kind: DTypeKind::Int, bits: NonZeroU8::new(32).unwrap() };
	pub const I64: Self = Self { kind: DTypeKind::Int, bits: NonZeroU8::new(64).unwrap() };
	pub const U8: Self = Self { kind: DTypeKind::Uint, bits: NonZeroU8::new(8).unwrap() };
	pub const U16: Self = Self { kind: DTypeKind::Uint, bits: NonZeroU8::new(16).unwrap() };
	pub const U32: Self = Self { kind: DTypeKind::Uint, bits: NonZeroU8::new(32).unwrap() };
	pub const U64: Self = Self { kind: DTypeKind::Uint, bits: NonZeroU8::new(64).unwrap() };

	pub fn is_float(self) -> bool {
		self.kind == DTypeKind::Float
	}

	pub fn bits(self) -> usize {
		usize::from(self.bits.get())
	}

	// NOTE: All supported types are at least one byte wide.
	pub fn bytes(self) -> usize {
		self.bits() / 8
	}

	pub fn array_bytes(self, elems: usize) -> Option<usize> {
		self.bytes().checked_mul(elems)
	}
}

impl std::str::FromStr for DType {
	type Err = UnknownDTypeError;

	fn from_str(s: &str) -> Result<Self, UnknownDTypeError> {
		match s {
			"f32" => Ok(Self::F32),
			"f64" => Ok(Self::F64),
			"i8" => Ok(Self::I8),
			"i16" => Ok(Self::I16),
			"i32" => Ok(Self::I32),
			"i64" => Ok(Self::I64),
			"u8" => Ok(Self::U8),
			"u16" => Ok(Self::U16),
			"u32" => Ok(Self::U32),
			"u64" => Ok(Self::U64),
			_ => {
				cold_path();
				Err(UnknownDTypeError)
			},
		}
	}
}

impl fmt::Display for DType {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let kind = match self.kind {
			DTypeKind::Float => "f",
			DTypeKind::Int => "i",
			DTypeKind::Uint => "u",
		};
		write!(f, "{}{}", kind, self.bits)
	}
}

//--------------------------------------------------------------------------------------------------

pub trait HasDType {
	const dtype: DType;
}

/// A plain numeric type that can live in a host buffer.
///
/// # Safety
///
/// Every bit pattern of `size_of::<Self>()` bytes must be a valid value, and the alignment
/// must not exceed `MAX_DTYPE_ALIGN`.
pub unsafe trait Element:
	HasDType + Copy + Send + Sync + PartialEq + std::fmt::Debug + 'static
{
}

macro_rules! impl_has_dtype {
	($($t:ty => $d:ident),* $(,)?) => {
		$(
			impl HasDType for $t {
				const dtype: DType = DType::$d;
			}

			unsafe impl Element for $t {}
		)*
	};
}

impl_has_dtype!(
	f32 => F32,
	f64 => F64,
	i8 => I8,
	i16 => I16,
	i32 => I32,
	i64 => I64,
	u8 => U8,
	u16 => U16,
	u32 => U32,
	u64 => U64,
);

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_dtype_consts_match_sizes() {
		assert_eq!(f32::dtype.bytes(), std::mem::size_of::<f32>());
		assert_eq!(f64::dtype.bytes(), std::mem::size_of::<f64>());
		assert_eq!(i16::dtype.bytes(), std::mem::size_of::<i16>());
		assert_eq!(u64::dtype.bytes(), std::mem::size_of::<u64>());
		assert!(f64::dtype.is_float());
		assert!(!u8::dtype.is_float());
	}

	#[test]
	fn test_parse_and_display() {
		for name in ["f32", "f64", "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64"] {
			let dtype: DType = name.parse().unwrap();
			assert_eq!(dtype.to_string(), name);
		}
		assert_eq!("bf16".parse::<DType>(), Err(UnknownDTypeError));
	}
}
