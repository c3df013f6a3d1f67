//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::sync::Arc;

use crate::ErrPack;
use crate::tensor::config::ExecConfig;
use crate::tensor::device::buffer::HostBuffer;
use crate::tensor::device::parallel::{InlinePool, ParallelFor, RayonPool};
use crate::tensor::dtype::{DType, Element};
use crate::tensor::error::{InvalidBufferSizeError, NullDataError, TensorOpError};
use crate::tensor::shape::TensorShape;
use crate::util::cold_path;

//--------------------------------------------------------------------------------------------------

/// A shaped, typed tensor living in host memory.
///
/// `data == None` is a tensor whose data pointer was never set.
#[derive(Debug)]
pub struct HostTensor {
	shape: TensorShape,
	dtype: DType,
	data: Option<HostBuffer>,
}

impl HostTensor {
	/// Allocates a zeroed tensor.
	pub fn new_zeroed(
		shape: impl Into<TensorShape>,
		dtype: DType,
	) -> Result<Self, ErrPack<TensorOpError>> {
		let shape = shape.into();
		let data = HostBuffer::new_zeroed(dtype, shape.elems()?)?;
		Ok(Self { shape, dtype, data: Some(data) })
	}

	pub fn from_slice<T: Element>(
		shape: impl Into<TensorShape>,
		data: &[T],
	) -> Result<Self, ErrPack<TensorOpError>> {
		let shape = shape.into();
		if shape.elems()? != data.len() {
			cold_path();
			return Err(InvalidBufferSizeError.into());
		}
		let data = HostBuffer::from_slice(data)?;
		Ok(Self { shape, dtype: T::dtype, data: Some(data) })
	}

	/// A tensor with a shape and a dtype but without data.
	pub fn null(shape: impl Into<TensorShape>, dtype: DType) -> Self {
		Self { shape: shape.into(), dtype, data: None }
	}

	pub fn shape(&self) -> &TensorShape {
		&self.shape
	}

	pub fn set_shape(&mut self, shape: TensorShape) {
		self.shape = shape;
	}

	pub fn dtype(&self) -> DType {
		self.dtype
	}

	pub fn num_elements(&self) -> Result<usize, ErrPack<TensorOpError>> {
		Ok(self.shape.elems()?)
	}

	/// Size of the data in bytes, 0 for a null tensor.
	pub fn data_size(&self) -> usize {
		self.data.as_ref().map_or(0, HostBuffer::bytes)
	}

	pub fn data(&self) -> Result<&HostBuffer, NullDataError> {
		self.data.as_ref().ok_or(NullDataError)
	}

	pub fn data_mut(&mut self) -> Result<&mut HostBuffer, NullDataError> {
		self.data.as_mut().ok_or(NullDataError)
	}

	pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, ErrPack<TensorOpError>> {
		Ok(self.data()?.to_vec()?)
	}
}

//--------------------------------------------------------------------------------------------------

/// Everything a kernel touches during one invocation, borrowed at once.
pub struct KernelArgs<'c> {
	pub inputs: &'c [HostTensor],
	pub outputs: &'c mut [HostTensor],
	pub pool: &'c dyn ParallelFor,
	pub config: ExecConfig,
}

impl<'c> KernelArgs<'c> {
	pub fn input(&self, index: usize) -> Result<&'c HostTensor, ErrPack<TensorOpError>> {
		self.inputs.get(index).ok_or_else(|| TensorOpError::missing_tensor("input", index))
	}
}

/// The operator context a kernel runs in.
pub trait KernelContext {
	fn input(&self, index: usize) -> Option<&HostTensor>;

	fn output(&mut self, index: usize) -> Option<&mut HostTensor>;

	/// Number of worker threads available for parallel execution.
	fn cpu_num(&self) -> usize {
		self.config().workers
	}

	fn pool(&self) -> &dyn ParallelFor;

	fn config(&self) -> ExecConfig;

	fn args(&mut self) -> KernelArgs<'_>;
}

//--------------------------------------------------------------------------------------------------

/// A context owning its tensors.
pub struct HostContext {
	inputs: Vec<HostTensor>,
	outputs: Vec<HostTensor>,
	pool: Arc<dyn ParallelFor + Send>,
	config: ExecConfig,
}

impl HostContext {
	pub fn new(pool: Arc<dyn ParallelFor + Send>, config: ExecConfig) -> Self {
		Self { inputs: Vec::new(), outputs: Vec::new(), pool, config }
	}

	/// A context that runs everything on the calling thread.
	pub fn inline(config: ExecConfig) -> Self {
		Self::new(Arc::new(InlinePool), config)
	}

	/// A context with its own rayon pool of `config.workers` threads.
	pub fn with_rayon(config: ExecConfig) -> Result<Self, ErrPack<TensorOpError>> {
		let pool = RayonPool::new(config.workers)?;
		Ok(Self::new(Arc::new(pool), config))
	}

	pub fn push_input(&mut self, tensor: HostTensor) -> &mut Self {
		self.inputs.push(tensor);
		self
	}

	pub fn push_output(&mut self, tensor: HostTensor) -> &mut Self {
		self.outputs.push(tensor);
		self
	}

	pub fn outputs(&self) -> &[HostTensor] {
		&self.outputs
	}

	pub fn take_outputs(&mut self) -> Vec<HostTensor> {
		std::mem::take(&mut self.outputs)
	}

	/// Drops all tensors so the context can be reused.
	pub fn clear(&mut self) {
		self.inputs.clear();
		self.outputs.clear();
	}
}

impl KernelContext for HostContext {
	fn input(&self, index: usize) -> Option<&HostTensor> {
		self.inputs.get(index)
	}

	fn output(&mut self, index: usize) -> Option<&mut HostTensor> {
		self.outputs.get_mut(index)
	}

	fn pool(&self) -> &dyn ParallelFor {
		&*self.pool
	}

	fn config(&self) -> ExecConfig {
		self.config
	}

	fn args(&mut self) -> KernelArgs<'_> {
		KernelArgs {
			inputs: &self.inputs,
			outputs: &mut self.outputs,
			pool: &*self.pool,
			config: self.config,
		}
	}
}

//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tensor::dtype::HasDType;

	#[test]
	fn test_host_tensor() {
		let t = HostTensor::from_slice([2, 3], &[1_i32, 2, 3, 4, 5, 6]).unwrap();
		assert_eq!(t.dtype(), i32::dtype);
		assert_eq!(t.num_elements().unwrap(), 6);
		assert_eq!(t.data_size(), 24);
		assert_eq!(t.to_vec::<i32>().unwrap(), vec![1, 2, 3, 4, 5, 6]);

		let err = t.to_vec::<f32>().unwrap_err();
		assert_eq!(err.code, TensorOpError::DTypeMismatch);

		let err = HostTensor::from_slice([4], &[1_i32, 2, 3]).unwrap_err();
		assert_eq!(err.code, TensorOpError::InvalidBufferSize);
	}

	#[test]
	fn test_null_tensor() {
		let t = HostTensor::null([3], f32::dtype);
		assert_eq!(t.data_size(), 0);
		assert_eq!(t.data().unwrap_err(), NullDataError);
		assert_eq!(t.to_vec::<f32>().unwrap_err().code, TensorOpError::NullData);
	}

	#[test]
	fn test_context_args() {
		let mut ctx = HostContext::inline(ExecConfig::with_workers(6));
		ctx.push_input(HostTensor::from_slice([1], &[1.0_f64]).unwrap())
			.push_output(HostTensor::null([1], f64::dtype));
		assert_eq!(ctx.cpu_num(), 6);
		assert!(ctx.input(1).is_none());
		assert!(ctx.output(0).is_some_and(|t| t.data_size() == 0));

		// the inline pool covers the whole range on the calling thread
		let mut seen = std::sync::Mutex::new(Vec::new());
		ctx.pool()
			.parallel_for(5, 2, &|begin, end| seen.lock().unwrap().push((begin, end)))
			.unwrap();
		assert_eq!(seen.get_mut().unwrap().as_slice(), &[(0, 2), (2, 4), (4, 5)]);

		let args = ctx.args();
		assert_eq!(args.input(0).unwrap().dtype(), f64::dtype);
		assert_eq!(args.input(1).unwrap_err().code, TensorOpError::MissingTensor);
		assert_eq!(args.outputs.len(), 1);
	}
}
