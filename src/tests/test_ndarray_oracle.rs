//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use assert_approx_eq::assert_approx_eq;
use ndarray::{ArrayD, IxDyn};

use crate::tensor::config::ExecConfig;
use crate::tensor::device::kernel::{
	BinaryKernel, BinaryOp, CpuKernel, HostContext, HostTensor, KernelContext,
};
use crate::tensor::dtype::HasDType;
use crate::tensor::shape::shape_elems;

use super::reference_binary;

//--------------------------------------------------------------------------------------------------

fn values(n: usize, seed: f64) -> Vec<f64> {
	(0..n).map(|i| ((i as f64) * 0.37 + seed).sin() * 10.0).collect()
}

fn run_kernel(
	op: BinaryOp,
	shape_a: &[usize],
	a: &[f64],
	shape_b: &[usize],
	b: &[f64],
) -> HostTensor {
	let (out_shape, _) = reference_binary(shape_a, a, shape_b, b, |x, _| x);
	let mut ctx = HostContext::with_rayon(ExecConfig::with_workers(4)).unwrap();
	ctx.push_input(HostTensor::from_slice(shape_a, a).unwrap())
		.push_input(HostTensor::from_slice(shape_b, b).unwrap())
		.push_output(HostTensor::new_zeroed(out_shape.as_slice(), f64::dtype).unwrap());
	BinaryKernel::new(op).with_threshold(64).compute(&mut ctx).unwrap();
	assert_eq!(ctx.cpu_num(), 4);
	ctx.take_outputs().remove(0)
}

#[test]
fn test_matches_ndarray_broadcasting() {
	let cases: &[(&[usize], &[usize])] = &[
		(&[3], &[3]),
		(&[2, 3], &[1, 3]),
		(&[4, 1], &[1, 5]),
		(&[2, 1, 4], &[3, 1]),
		(&[1], &[6, 2, 2]),
		(&[8, 1, 16], &[1, 12, 16]),
		(&[2, 3, 1, 5, 1], &[1, 3, 4, 1, 6]),
	];
	for (shape_a, shape_b) in cases {
		let a = values(shape_elems(shape_a).unwrap(), 0.5);
		let b = values(shape_elems(shape_b).unwrap(), 2.0);
		let nd_a = ArrayD::from_shape_vec(IxDyn(shape_a), a.clone()).unwrap();
		let nd_b = ArrayD::from_shape_vec(IxDyn(shape_b), b.clone()).unwrap();

		let out = run_kernel(BinaryOp::Add, shape_a, &a, shape_b, &b);
		let expected = &nd_a + &nd_b;
		assert_eq!(out.shape().dims(), expected.shape(), "{shape_a:?} x {shape_b:?}");
		for (got, want) in out.to_vec::<f64>().unwrap().iter().zip(expected.iter()) {
			assert_approx_eq!(*got, *want);
		}

		let out = run_kernel(BinaryOp::Div, shape_a, &a, shape_b, &b);
		let expected = &nd_a / &nd_b;
		for (got, want) in out.to_vec::<f64>().unwrap().iter().zip(expected.iter()) {
			assert_approx_eq!(*got, *want);
		}
	}
}

#[test]
fn test_output_shape_law() {
	// out[i] == max(a[i], b[i]) after padding, except that a zero-sized axis wins against one.
	let cases: &[(&[usize], &[usize], &[usize])] = &[
		(&[7], &[], &[7]),
		(&[1, 3], &[2, 1], &[2, 3]),
		(&[5, 1, 1], &[1, 4], &[5, 1, 4]),
		(&[0, 3], &[1, 3], &[0, 3]),
		(&[2, 0], &[1], &[2, 0]),
	];
	for (shape_a, shape_b, shape_out) in cases {
		let a = values(shape_elems(shape_a).unwrap(), 1.0);
		let b = values(shape_elems(shape_b).unwrap(), 3.0);
		let out = run_kernel(BinaryOp::Maximum, shape_a, &a, shape_b, &b);
		assert_eq!(out.shape().dims(), *shape_out);
	}
}
