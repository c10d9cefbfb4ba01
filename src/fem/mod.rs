//! Implements the immersed finite element method

mod assembler;
mod block_system;
mod constraints;
mod diagnostics;
mod immersed_mapping;
mod linear_solver;
mod newton_stepper;
mod point_locator;
mod quadrature;
mod shapes;
mod spaces;
pub use crate::fem::assembler::*;
pub use crate::fem::block_system::*;
pub use crate::fem::constraints::*;
pub use crate::fem::diagnostics::*;
pub use crate::fem::immersed_mapping::*;
pub use crate::fem::linear_solver::*;
pub use crate::fem::newton_stepper::*;
pub use crate::fem::point_locator::*;
pub use crate::fem::quadrature::*;
pub use crate::fem::shapes::*;
pub use crate::fem::spaces::*;
