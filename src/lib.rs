//! Immersed finite element simulator for an incompressible viscous fluid interacting with an
//! elastic structure that is meshed independently of (and overlaps) the fluid mesh

/// Defines a type alias for the error type as a static string
pub type StrError = &'static str;

/// Defines a function of (x,t) where x is space and t is time
pub type FnSpaceTime = fn(&[f64], f64) -> f64;

/// Defines a function of (x,t,component) returning one component of a vector field
pub type FnField = fn(&[f64], f64, usize) -> f64;

pub mod analytical;
pub mod base;
pub mod fem;
pub mod material;
pub mod prelude;
