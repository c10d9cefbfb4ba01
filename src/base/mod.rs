//! Implements the base structures for an immersed simulation

mod config;
mod enums;
mod error;
mod essential;
mod parameters;
mod sample_meshes;
pub use crate::base::config::*;
pub use crate::base::enums::*;
pub use crate::base::error::*;
pub use crate::base::essential::*;
pub use crate::base::parameters::*;
pub use crate::base::sample_meshes::*;
