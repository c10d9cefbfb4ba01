use gemlab::shapes::GeoKind;
use ifem::fem::{BlockMatrix, LinearSolver};
use ifem::prelude::*;
use russell_lab::{approx_eq, Vector};

// Nonconvergence of the Newton iterations
//
// TEST GOAL
//
// Verifies that the iteration budget is enforced: with a linear solver that never improves
// the state, a step with a nonzero residual fails after n_inner × (n_outer + 1) iterations
// and the previously accepted state is left unchanged.
//
// MESH
//
// Fluid: one Qua9 cell over [0,1]²
// Structure: one Qua4 cell over [0.25,0.75]²
//
// BOUNDARY CONDITIONS
//
// No-slip (zero velocity) on the whole fluid boundary
//
// CONFIGURATION AND PARAMETERS
//
// Neo-Hookean structure with ρ = η = μ = Φ_B = 1
// Body force bx = 1 switched on after t = 0.15
// 15 inner iterations and 3 retries (the defaults)
// dt = 0.1 and t_fin = 1.0

/// Linear solver returning a zero update
struct StalledSolver {}

impl LinearSolver for StalledSolver {
    fn factorize(&mut self, _jacobian: &BlockMatrix) -> Result<(), IfemError> {
        Ok(())
    }

    fn solve(&mut self, x: &mut Vector, _rhs: &Vector) -> Result<(), IfemError> {
        x.fill(0.0);
        Ok(())
    }
}

fn allocate_stepper() -> Result<NewtonTimeStepper, IfemError> {
    let fluid_mesh = SampleMeshes::rectangle(GeoKind::Qua9, 1, 1, 0.0, 1.0, 0.0, 1.0)?;
    let solid_mesh = SampleMeshes::rectangle(GeoKind::Qua4, 1, 1, 0.25, 0.75, 0.25, 0.75)?;
    let mut config = Config::new(ParamImmersed::sample());
    config
        .set_time(0.1, 1.0)?
        .set_solid_quadrature(SolidQuadrature::Gauss(2))?
        .set_body_force(|_, t, c| if t > 0.15 && c == 0 { 1.0 } else { 0.0 })?;
    let essential = Essential::no_slip(2);
    NewtonTimeStepper::with_solver(
        &config,
        &fluid_mesh,
        &solid_mesh,
        &essential,
        Box::new(StalledSolver {}),
    )
}

#[test]
fn test_nonconvergence_advance() -> Result<(), IfemError> {
    let mut stepper = allocate_stepper()?;
    let mut state = stepper.initial_state()?;

    // the first step is at rest
    let report = stepper.advance(&mut state)?;
    assert_eq!(report.iterations, 0);
    assert_eq!(state.step, 1);

    // the second step cannot converge
    match stepper.advance(&mut state) {
        Err(IfemError::Nonconvergence {
            time,
            iterations,
            retries,
            norm_rr,
        }) => {
            approx_eq(time, 0.2, 1e-15);
            assert_eq!(iterations, 60);
            assert_eq!(retries, 4);
            assert!(norm_rr > 0.0);
        }
        other => panic!("nonconvergence error expected; got {:?}", other.map(|r| r.step)),
    }

    // the accepted state is unchanged
    assert_eq!(state.step, 1);
    approx_eq(state.time, 0.1, 1e-15);
    assert_eq!(state.current.norm(), 0.0);
    assert_eq!(state.previous.norm(), 0.0);
    Ok(())
}

#[test]
fn test_nonconvergence_run() -> Result<(), IfemError> {
    let mut stepper = allocate_stepper()?;
    let mut recorder = OutputRecorder::new(true);
    let result = stepper.run(&mut recorder);
    assert!(matches!(result, Err(IfemError::Nonconvergence { .. })));

    // the initial state and the first step have been recorded
    assert_eq!(recorder.diagnostics.len(), 2);
    assert_eq!(recorder.states.len(), 2);
    assert_eq!(recorder.states[1].step, 1);
    Ok(())
}
