//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

pub mod calc_info;
pub mod executor;
pub mod math;
pub mod zip;

pub use calc_info::{CalcInfo, ExecPath};
pub use executor::{ExecEnv, compute, compute_unary, execute};
pub use zip::aligned_check;
