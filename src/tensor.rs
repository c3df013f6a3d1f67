//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

pub mod bcast;
pub mod config;
pub mod device;
pub mod dim_merger;
pub mod dtype;
pub mod error;
pub mod shape;

pub use bcast::{Bcast, BroadcastDescriptor, resolve};
pub use config::ExecConfig;
pub use dtype::{DType, Element, HasDType};
pub use error::TensorOpError;
pub use shape::{MAX_RANK, TensorShape};
