//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

pub mod buffer;
pub mod cpu;
pub mod kernel;
pub mod parallel;

pub use buffer::HostBuffer;
pub use parallel::{InlinePool, ParallelFor, RayonPool};
