//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use log::debug;

use crate::ErrPack;
use crate::tensor::device::buffer::HostBuffer;
use crate::tensor::device::cpu::executor::{ExecEnv, compute};
use crate::tensor::device::cpu::math::{Arith, FloatArith};
use crate::tensor::dtype::Element;
use crate::tensor::error::TensorOpError;
use crate::tensor::shape::TensorShape;
use crate::util::cold_path;

use super::context::{KernelArgs, KernelContext};
use super::{CpuKernel, dispatch_dtype};

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOp {
	Add,
	Sub,
	Mul,
	/// Float types only.
	Div,
	Maximum,
	Minimum,
}

impl BinaryOp {
	pub const ALL: [Self; 6] =
		[Self::Add, Self::Sub, Self::Mul, Self::Div, Self::Maximum, Self::Minimum];

	pub fn name(self) -> &'static str {
		match self {
			Self::Add => "Add",
			Self::Sub => "Sub",
			Self::Mul => "Mul",
			Self::Div => "Div",
			Self::Maximum => "Maximum",
			Self::Minimum => "Minimum",
		}
	}
}

//--------------------------------------------------------------------------------------------------

/// Typed views of the three buffers of one invocation.
struct Operands<'t, T> {
	shape_a: &'t [usize],
	shape_b: &'t [usize],
	a: &'t [T],
	b: &'t [T],
	out: &'t mut [T],
}

impl<'t, T: Element> Operands<'t, T> {
	fn new(
		shape_a: &'t TensorShape,
		shape_b: &'t TensorShape,
		a: &'t HostBuffer,
		b: &'t HostBuffer,
		out: &'t mut HostBuffer,
	) -> Result<Self, ErrPack<TensorOpError>> {
		Ok(Self {
			shape_a: shape_a.dims(),
			shape_b: shape_b.dims(),
			a: a.as_slice()?,
			b: b.as_slice()?,
			out: out.as_mut_slice()?,
		})
	}

	fn run<F>(self, f: &F, env: &ExecEnv) -> Result<TensorShape, ErrPack<TensorOpError>>
	where
		F: Fn(T, T) -> T + Sync,
	{
		compute(self.shape_a, self.shape_b, self.a, self.b, self.out, f, env)
	}
}

fn combine<T: Arith>(
	op: BinaryOp,
	x: Operands<T>,
	env: &ExecEnv,
) -> Result<TensorShape, ErrPack<TensorOpError>> {
	match op {
		BinaryOp::Add => x.run(&T::add, env),
		BinaryOp::Sub => x.run(&T::sub, env),
		BinaryOp::Mul => x.run(&T::mul, env),
		BinaryOp::Maximum => x.run(&T::maximum, env),
		BinaryOp::Minimum => x.run(&T::minimum, env),
		BinaryOp::Div => {
			cold_path();
			Err(ErrPack::with_message(
				TensorOpError::UnsupportedDType,
				format!("Div is not defined for {}", T::dtype),
			))
		},
	}
}

fn combine_float<T: FloatArith>(
	op: BinaryOp,
	x: Operands<T>,
	env: &ExecEnv,
) -> Result<TensorShape, ErrPack<TensorOpError>> {
	match op {
		BinaryOp::Div => x.run(&T::div, env),
		_ => combine(op, x, env),
	}
}

//--------------------------------------------------------------------------------------------------

/// `output[0] = op(input[0], input[1])` with broadcasting.
#[derive(Debug, Copy, Clone)]
pub struct BinaryKernel {
	op: BinaryOp,
	parallel_threshold: Option<usize>,
}

impl BinaryKernel {
	pub fn new(op: BinaryOp) -> Self {
		Self { op, parallel_threshold: None }
	}

	/// Overrides the threshold from the context's config.
	pub fn with_threshold(self, parallel_threshold: usize) -> Self {
		Self { parallel_threshold: Some(parallel_threshold), ..self }
	}

	pub fn op(&self) -> BinaryOp {
		self.op
	}

	fn run(&self, args: KernelArgs) -> Result<(), ErrPack<TensorOpError>> {
		let KernelArgs { inputs, outputs, pool, config } = args;
		let Some(out) = outputs.get_mut(0) else {
			cold_path();
			return Err(TensorOpError::missing_tensor("output", 0));
		};
		let a = inputs.first().ok_or_else(|| TensorOpError::missing_tensor("input", 0))?;
		let b = inputs.get(1).ok_or_else(|| TensorOpError::missing_tensor("input", 1))?;

		// No computation starts before every tensor has data.
		let (a_data, b_data) = (a.data()?, b.data()?);
		let dtype = a.dtype();
		if b.dtype() != dtype {
			cold_path();
			return Err(TensorOpError::dtype_mismatch(dtype, b.dtype()));
		}
		if out.dtype() != dtype {
			cold_path();
			return Err(TensorOpError::dtype_mismatch(dtype, out.dtype()));
		}
		let out_data = out.data_mut()?;

		let mut env = ExecEnv::new(pool, config);
		if let Some(threshold) = self.parallel_threshold {
			env = env.with_threshold(threshold);
		}
		debug!("{}: {} x {} ({dtype})", self.op.name(), a.shape(), b.shape());

		let (shape_a, shape_b) = (a.shape(), b.shape());
		let shape = dispatch_dtype!(dtype, T,
			float => combine_float::<T>(
				self.op,
				Operands::new(shape_a, shape_b, a_data, b_data, out_data)?,
				&env,
			),
			int => combine::<T>(
				self.op,
				Operands::new(shape_a, shape_b, a_data, b_data, out_data)?,
				&env,
			),
		)?;
		out.set_shape(shape);
		Ok(())
	}
}

impl CpuKernel for BinaryKernel {
	fn op_type(&self) -> &'static str {
		self.op.name()
	}

	fn compute(&self, ctx: &mut dyn KernelContext) -> Result<(), ErrPack<TensorOpError>> {
		self.run(ctx.args())
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use assert_approx_eq::assert_approx_eq;

	use super::*;
	use crate::tensor::config::ExecConfig;
	use crate::tensor::device::kernel::context::{HostContext, HostTensor};
	use crate::tensor::dtype::{DType, HasDType};

	fn ctx_with(a: HostTensor, b: HostTensor, out: HostTensor) -> HostContext {
		let mut ctx = HostContext::inline(ExecConfig::with_workers(4));
		ctx.push_input(a).push_input(b).push_output(out);
		ctx
	}

	fn run_op(op: BinaryOp, ctx: &mut HostContext) -> Result<(), ErrPack<TensorOpError>> {
		BinaryKernel::new(op).compute(ctx)
	}

	#[test]
	fn test_every_op_on_f32() {
		let expected: [(BinaryOp, [f32; 3]); 6] = [
			(BinaryOp::Add, [3.0, 1.5, 4.0]),
			(BinaryOp::Sub, [-1.0, -2.5, 2.0]),
			(BinaryOp::Mul, [2.0, -1.0, 3.0]),
			(BinaryOp::Div, [0.5, -0.25, 3.0]),
			(BinaryOp::Maximum, [2.0, 2.0, 3.0]),
			(BinaryOp::Minimum, [1.0, -0.5, 1.0]),
		];
		for (op, want) in expected {
			let a = HostTensor::from_slice([3], &[1.0_f32, -0.5, 3.0]).unwrap();
			let b = HostTensor::from_slice([3], &[2.0_f32, 2.0, 1.0]).unwrap();
			let mut ctx = ctx_with(a, b, HostTensor::new_zeroed([3], f32::dtype).unwrap());
			run_op(op, &mut ctx).unwrap();
			let got = ctx.outputs()[0].to_vec::<f32>().unwrap();
			for (g, w) in got.iter().zip(want) {
				assert_approx_eq!(*g, w);
			}
		}
	}

	#[test]
	fn test_output_shape_is_assigned() {
		let a = HostTensor::from_slice([2, 1], &[1_i16, 2]).unwrap();
		let b = HostTensor::from_slice([3], &[10_i16, 20, 30]).unwrap();
		// The declared output shape is replaced, only the element count has to match.
		let out = HostTensor::new_zeroed([6], i16::dtype).unwrap();
		let mut ctx = ctx_with(a, b, out);
		run_op(BinaryOp::Add, &mut ctx).unwrap();
		assert_eq!(ctx.outputs()[0].shape().dims(), &[2, 3]);
		assert_eq!(ctx.outputs()[0].to_vec::<i16>().unwrap(), vec![11, 21, 31, 12, 22, 32]);
	}

	#[test]
	fn test_integer_div_is_rejected() {
		let a = HostTensor::from_slice([2], &[4_u32, 9]).unwrap();
		let b = HostTensor::from_slice([2], &[2_u32, 3]).unwrap();
		let mut ctx = ctx_with(a, b, HostTensor::new_zeroed([2], DType::U32).unwrap());
		let err = run_op(BinaryOp::Div, &mut ctx).unwrap_err();
		assert_eq!(err.code, TensorOpError::UnsupportedDType);
	}

	#[test]
	fn test_validation() {
		let f = |v: &[f64]| HostTensor::from_slice([v.len()], v).unwrap();

		// null input
		let mut ctx = ctx_with(f(&[1.0]), HostTensor::null([1], f64::dtype), f(&[0.0]));
		assert_eq!(run_op(BinaryOp::Add, &mut ctx).unwrap_err().code, TensorOpError::NullData);

		// null output
		let mut ctx = ctx_with(f(&[1.0]), f(&[2.0]), HostTensor::null([1], f64::dtype));
		assert_eq!(run_op(BinaryOp::Add, &mut ctx).unwrap_err().code, TensorOpError::NullData);

		// dtype disagreement
		let b = HostTensor::from_slice([1], &[2.0_f32]).unwrap();
		let mut ctx = ctx_with(f(&[1.0]), b, f(&[0.0]));
		assert_eq!(
			run_op(BinaryOp::Add, &mut ctx).unwrap_err().code,
			TensorOpError::DTypeMismatch
		);

		// output too small for the broadcast result
		let mut ctx = ctx_with(f(&[1.0, 2.0]), f(&[3.0]), f(&[0.0]));
		assert_eq!(
			run_op(BinaryOp::Add, &mut ctx).unwrap_err().code,
			TensorOpError::OutputShapeMismatch
		);

		// missing second input
		let mut ctx = HostContext::inline(ExecConfig::with_workers(1));
		ctx.push_input(f(&[1.0])).push_output(f(&[0.0]));
		assert_eq!(
			run_op(BinaryOp::Add, &mut ctx).unwrap_err().code,
			TensorOpError::MissingTensor
		);
	}

	#[test]
	fn test_threshold_override_uses_pool() {
		let n = 4096;
		let a: Vec<i64> = (0..n).collect();
		let b = [1000_i64];
		let mut ctx = HostContext::with_rayon(ExecConfig::with_workers(4)).unwrap();
		ctx.push_input(HostTensor::from_slice([n as usize], &a).unwrap())
			.push_input(HostTensor::from_slice([1], &b).unwrap())
			.push_output(HostTensor::new_zeroed([n as usize], i64::dtype).unwrap());
		BinaryKernel::new(BinaryOp::Sub).with_threshold(0).compute(&mut ctx).unwrap();
		let got = ctx.outputs()[0].to_vec::<i64>().unwrap();
		assert!(got.iter().enumerate().all(|(i, &x)| x == i as i64 - 1000));
	}
}
