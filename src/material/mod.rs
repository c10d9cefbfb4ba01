//! Implements the stress models of the immersed structure

mod circumferential_fiber;
mod linear_in_f;
mod neo_hookean;
mod stress_model;
#[cfg(test)]
pub(crate) mod testing;
pub use crate::material::circumferential_fiber::*;
pub use crate::material::linear_in_f::*;
pub use crate::material::neo_hookean::*;
pub use crate::material::stress_model::*;
