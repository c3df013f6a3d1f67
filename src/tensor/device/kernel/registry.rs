//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use log::{debug, warn};

use crate::ErrPack;
use crate::tensor::error::TensorOpError;
use crate::util::cold_path;

use super::binary::{BinaryKernel, BinaryOp};
use super::context::KernelContext;
use super::unary::{UnaryKernel, UnaryOp};
use super::{CpuKernel, KernelStatus};

//--------------------------------------------------------------------------------------------------

/// Maps op type names to kernels.
pub struct KernelRegistry {
	kernels: HashMap<&'static str, Arc<dyn CpuKernel>>,
}

impl Default for KernelRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl KernelRegistry {
	pub fn new() -> Self {
		Self { kernels: HashMap::new() }
	}

	/// A registry with every built-in kernel.
	pub fn with_builtins() -> Self {
		let mut registry = Self::new();
		for op in BinaryOp::ALL {
			registry.register(Arc::new(BinaryKernel::new(op)));
		}
		for op in UnaryOp::ALL {
			registry.register(Arc::new(UnaryKernel::new(op)));
		}
		registry
	}

	/// The process-wide registry, populated with the built-ins on first use.
	pub fn instance() -> &'static RwLock<Self> {
		static instance: OnceLock<RwLock<KernelRegistry>> = OnceLock::new();
		instance.get_or_init(|| RwLock::new(Self::with_builtins()))
	}

	/// Adds `kernel`, replacing any kernel with the same op type. Returns the replaced one.
	pub fn register(&mut self, kernel: Arc<dyn CpuKernel>) -> Option<Arc<dyn CpuKernel>> {
		self.kernels.insert(kernel.op_type(), kernel)
	}

	pub fn get(&self, op_type: &str) -> Option<&Arc<dyn CpuKernel>> {
		self.kernels.get(op_type)
	}

	pub fn op_types(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.kernels.keys().copied()
	}

	pub fn compute(
		&self,
		op_type: &str,
		ctx: &mut dyn KernelContext,
	) -> Result<(), ErrPack<TensorOpError>> {
		let Some(kernel) = self.get(op_type) else {
			cold_path();
			return Err(TensorOpError::unknown_op(op_type));
		};
		debug!("running kernel {op_type}");
		kernel.compute(ctx)
	}

	/// Like `compute()`, but reports only a status. Failures are logged.
	pub fn run(&self, op_type: &str, ctx: &mut dyn KernelContext) -> KernelStatus {
		let result = self.compute(op_type, ctx);
		if let Err(err) = &result {
			warn!("kernel {op_type} failed: {err}");
		}
		KernelStatus::from(&result)
	}
}

/// Runs `op_type` from the process-wide registry.
pub fn run(op_type: &str, ctx: &mut dyn KernelContext) -> KernelStatus {
	let registry = KernelRegistry::instance().read().unwrap_or_else(PoisonError::into_inner);
	registry.run(op_type, ctx)
}

//--------------------------------------------------------------------------------------------------
