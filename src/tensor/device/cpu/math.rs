//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use crate::tensor::dtype::Element;

//--------------------------------------------------------------------------------------------------

/// Elementwise arithmetic with the native semantics of the type.
///
/// Integers wrap around on overflow. Floats follow IEEE 754.
pub trait Arith: Element {
	fn add(a: Self, b: Self) -> Self;
	fn sub(a: Self, b: Self) -> Self;
	fn mul(a: Self, b: Self) -> Self;
	fn maximum(a: Self, b: Self) -> Self;
	fn minimum(a: Self, b: Self) -> Self;
	fn neg(a: Self) -> Self;
	fn abs(a: Self) -> Self;
}

/// Division is only offered for floats. Integer division by zero has no native result.
pub trait FloatArith: Arith {
	fn div(a: Self, b: Self) -> Self;
}

macro_rules! impl_int_arith {
	($abs:ident; $($t:ty),*) => {
		$(
			impl Arith for $t {
				#[inline(always)]
				fn add(a: Self, b: Self) -> Self {
					a.wrapping_add(b)
				}

				#[inline(always)]
				fn sub(a: Self, b: Self) -> Self {
					a.wrapping_sub(b)
				}

				#[inline(always)]
				fn mul(a: Self, b: Self) -> Self {
					a.wrapping_mul(b)
				}

				#[inline(always)]
				fn maximum(a: Self, b: Self) -> Self {
					Ord::max(a, b)
				}

				#[inline(always)]
				fn minimum(a: Self, b: Self) -> Self {
					Ord::min(a, b)
				}

				#[inline(always)]
				fn neg(a: Self) -> Self {
					a.wrapping_neg()
				}

				#[inline(always)]
				fn abs(a: Self) -> Self {
					impl_int_arith!(@abs $abs a)
				}
			}
		)*
	};
	(@abs signed $a:ident) => { $a.wrapping_abs() };
	(@abs unsigned $a:ident) => { $a };
}

impl_int_arith!(signed; i8, i16, i32, i64);
impl_int_arith!(unsigned; u8, u16, u32, u64);

macro_rules! impl_float_arith {
	($($t:ty),*) => {
		$(
			impl Arith for $t {
				#[inline(always)]
				fn add(a: Self, b: Self) -> Self {
					a + b
				}

				#[inline(always)]
				fn sub(a: Self, b: Self) -> Self {
					a - b
				}

				#[inline(always)]
				fn mul(a: Self, b: Self) -> Self {
					a * b
				}

				// NaN loses against a number, like IEEE maxNum
				#[inline(always)]
				fn maximum(a: Self, b: Self) -> Self {
					a.max(b)
				}

				#[inline(always)]
				fn minimum(a: Self, b: Self) -> Self {
					a.min(b)
				}

				#[inline(always)]
				fn neg(a: Self) -> Self {
					-a
				}

				#[inline(always)]
				fn abs(a: Self) -> Self {
					a.abs()
				}
			}

			impl FloatArith for $t {
				#[inline(always)]
				fn div(a: Self, b: Self) -> Self {
					a / b
				}
			}
		)*
	};
}

impl_float_arith!(f32, f64);

//--------------------------------------------------------------------------------------------------
