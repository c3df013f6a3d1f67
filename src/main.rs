//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use bcast_kernels::ErrPack;
use bcast_kernels::tensor::TensorOpError;
use bcast_kernels::tensor::config::ExecConfig;
use bcast_kernels::tensor::device::kernel::registry::run;
use bcast_kernels::tensor::device::kernel::{HostContext, HostTensor, KernelStatus};
use bcast_kernels::tensor::dtype::HasDType;

fn scenario(
	ctx: &mut HostContext,
	name: &str,
	op: &str,
	(shape_a, a): (&[usize], &[f32]),
	(shape_b, b): (&[usize], &[f32]),
	out_elems: usize,
) -> Result<(), ErrPack<TensorOpError>> {
	ctx.clear();
	ctx.push_input(HostTensor::from_slice(shape_a, a)?)
		.push_input(HostTensor::from_slice(shape_b, b)?)
		.push_output(HostTensor::new_zeroed([out_elems], f32::dtype)?);
	let status = run(op, ctx);
	let out = &ctx.outputs()[0];
	if status == KernelStatus::Ok {
		println!("{name}: {a:?} {op} {b:?} = {} {:?}", out.shape(), out.to_vec::<f32>()?);
	} else {
		println!("{name}: {status:?}");
	}
	Ok(())
}

fn main() -> Result<(), ErrPack<TensorOpError>> {
	let verbosity = 1 + std::env::args().skip(1).filter(|arg| arg == "-v").count();
	if let Err(err) = stderrlog::new().module(module_path!()).verbosity(verbosity).init() {
		eprintln!("cannot initialize logging: {err}");
	}

	let config = ExecConfig::from_env();
	log::info!("workers={}, parallel_threshold={}", config.workers, config.parallel_threshold);
	let mut ctx = HostContext::with_rayon(config)?;

	scenario(&mut ctx, "A", "Add", (&[3], &[1.0, 2.0, 3.0]), (&[3], &[10.0, 20.0, 30.0]), 3)?;
	scenario(&mut ctx, "B", "Add", (&[1], &[5.0]), (&[3], &[1.0, 2.0, 3.0]), 3)?;
	scenario(
		&mut ctx,
		"C",
		"Add",
		(&[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
		(&[1, 3], &[10.0, 20.0, 30.0]),
		6,
	)?;
	scenario(&mut ctx, "D", "Add", (&[2, 3], &[0.0; 6]), (&[2, 4], &[0.0; 8]), 6)?;
	Ok(())
}
