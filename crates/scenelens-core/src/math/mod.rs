//! Closed-form 3D math for the presentation side.
//!
//! Nothing in here touches remote memory or allocates; every function is
//! safe to call per entity, per frame.

mod projection;
mod vector;

pub use projection::*;
pub use vector::*;
