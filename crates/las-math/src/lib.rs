//! Large action space math utilities.

pub mod math;

pub use math::orthonormal::*;
pub use math::projection::*;
pub use math::rand48::*;
pub use math::svd::*;
