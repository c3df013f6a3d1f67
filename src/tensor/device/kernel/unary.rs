//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use log::debug;

use crate::ErrPack;
use crate::tensor::device::buffer::HostBuffer;
use crate::tensor::device::cpu::executor::{ExecEnv, compute_unary};
use crate::tensor::device::cpu::math::Arith;
use crate::tensor::error::{InvalidBufferSizeError, TensorOpError};
use crate::util::cold_path;

use super::context::{KernelArgs, KernelContext};
use super::{CpuKernel, dispatch_dtype};

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnaryOp {
	Neg,
	Abs,
	Square,
}

impl UnaryOp {
	pub const ALL: [Self; 3] = [Self::Neg, Self::Abs, Self::Square];

	pub fn name(self) -> &'static str {
		match self {
			Self::Neg => "Neg",
			Self::Abs => "Abs",
			Self::Square => "Square",
		}
	}
}

fn apply<T: Arith>(
	op: UnaryOp,
	a: &HostBuffer,
	out: &mut HostBuffer,
	env: &ExecEnv,
) -> Result<(), ErrPack<TensorOpError>> {
	let (a, out) = (a.as_slice::<T>()?, out.as_mut_slice::<T>()?);
	match op {
		UnaryOp::Neg => compute_unary(a, out, &T::neg, env),
		UnaryOp::Abs => compute_unary(a, out, &T::abs, env),
		UnaryOp::Square => compute_unary(a, out, &|x| T::mul(x, x), env),
	}
}

//--------------------------------------------------------------------------------------------------

/// `output[0] = op(input[0])`, same shape in and out.
#[derive(Debug, Copy, Clone)]
pub struct UnaryKernel {
	op: UnaryOp,
	parallel_threshold: Option<usize>,
}

impl UnaryKernel {
	pub fn new(op: UnaryOp) -> Self {
		Self { op, parallel_threshold: None }
	}

	pub fn with_threshold(self, parallel_threshold: usize) -> Self {
		Self { parallel_threshold: Some(parallel_threshold), ..self }
	}

	fn run(&self, args: KernelArgs) -> Result<(), ErrPack<TensorOpError>> {
		let a = args.input(0)?;
		let KernelArgs { outputs, pool, config, .. } = args;
		let Some(out) = outputs.get_mut(0) else {
			cold_path();
			return Err(TensorOpError::missing_tensor("output", 0));
		};

		let a_data = a.data()?;
		if out.dtype() != a.dtype() {
			cold_path();
			return Err(TensorOpError::dtype_mismatch(a.dtype(), out.dtype()));
		}
		if a_data.elems() != a.num_elements()? {
			cold_path();
			return Err(InvalidBufferSizeError.into());
		}
		let out_data = out.data_mut()?;

		let mut env = ExecEnv::new(pool, config);
		if let Some(threshold) = self.parallel_threshold {
			env = env.with_threshold(threshold);
		}
		debug!("{}: {} ({})", self.op.name(), a.shape(), a.dtype());

		dispatch_dtype!(a.dtype(), T,
			float => apply::<T>(self.op, a_data, out_data, &env),
			int => apply::<T>(self.op, a_data, out_data, &env),
		)?;
		out.set_shape(a.shape().clone());
		Ok(())
	}
}

impl CpuKernel for UnaryKernel {
	fn op_type(&self) -> &'static str {
		self.op.name()
	}

	fn compute(&self, ctx: &mut dyn KernelContext) -> Result<(), ErrPack<TensorOpError>> {
		self.run(ctx.args())
	}
}

//--------------------------------------------------------------------------------------------------
