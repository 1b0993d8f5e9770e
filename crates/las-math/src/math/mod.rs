//! Core math modules.

pub mod orthonormal;
pub mod projection;
pub mod rand48;
pub mod svd;
