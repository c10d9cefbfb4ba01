//! Makes available common structures needed to run a simulation
//!
//! You may write `use ifem::prelude::*` in your code and obtain
//! access to commonly used functionality.

pub use crate::base::{Config, Dof, Essential, IfemError, LinSol, ParamImmersed, ParamStress};
pub use crate::base::{PressureSpace, SampleMeshes, SolidQuadrature};
pub use crate::fem::{Diagnostics, GlobalState, NewtonTimeStepper, OutputRecorder, OutputSink, StepReport};
