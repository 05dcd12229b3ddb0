pub mod byteorder;
mod tables;

pub mod generic;
pub use generic::*;

pub(crate) mod lanes;
pub use lanes::block4_lanes;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod amd64;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub(crate) use amd64::*;
