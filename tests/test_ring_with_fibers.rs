use gemlab::shapes::GeoKind;
use ifem::analytical::RingWithFibers;
use ifem::prelude::*;
use russell_lab::approx_eq;

// Ring with circumferential fibers in equilibrium
//
// TEST GOAL
//
// Verifies that a ring with pre-tensioned circumferential fibers settles into the
// equilibrium of the closed-form solution: the hoop tension is balanced by the pressure jump
// ln(1 + w/R) across the ring, the centroid stays at the center, and the enclosed fluid keeps
// the ring area. The steps continue until the largest change of a velocity DOF between two
// steps falls below 1e-7; then, the pressure error satisfies
//
// ‖p_h - p‖_L2 < 0.3 ln(1 + w/R)
//
// (‖p‖_L2 ≈ 0.41 ln(1 + w/R), thus a zero pressure fails) and the discrete jump between the
// center of the square and its corner is within 25% of ln(1 + w/R).
//
// MESH
//
// Fluid: 8 × 8 Qua9 cells over [0,1]²
// Structure: ring with 1 × 32 Qua4 cells, center (0.5,0.5), R = 0.25, w = 0.0625
//
// BOUNDARY CONDITIONS
//
// No-slip (zero velocity) on the whole fluid boundary
//
// CONFIGURATION AND PARAMETERS
//
// Circumferential fibers with μ = 1; ρ = η = Φ_B = 1
// Implicit mapping, direct coupling, mean pressure gauge
// Gauss quadrature (3 × 3) over the structure cells
// dt = 0.2; at most 300 steps

/// Largest change of a velocity DOF between two steps at the steady state
const TOL_STEADY: f64 = 1e-7;

/// Maximum number of steps to reach the steady state
const MAX_STEPS: usize = 300;

#[test]
fn test_ring_with_fibers() -> Result<(), IfemError> {
    // geometry and meshes
    let ring = RingWithFibers::sample();
    let fluid_mesh = ring.fluid_mesh(GeoKind::Qua9, 8)?;
    let solid_mesh = ring.solid_mesh(GeoKind::Qua4, 1, 32)?;

    // configuration
    let mut config = Config::new(ring.param(1.0, 1.0));
    config
        .set_time(0.2, 0.2 * (MAX_STEPS as f64))?
        .set_solid_quadrature(SolidQuadrature::Gauss(3))?
        .set_lin_sol(LinSol::Umfpack)?;

    // run until the velocity stops changing
    let essential = Essential::no_slip(2);
    let mut stepper = NewtonTimeStepper::new(&config, &fluid_mesh, &solid_mesh, &essential)?;
    let mut state = stepper.initial_state()?;
    let initial = stepper.diagnostics(&state);
    let n_dofs_u = stepper.assembler.fluid.n_dofs_u;
    let mut velocity = state.current.fluid.as_data()[..n_dofs_u].to_vec();
    let mut change = f64::MAX;
    while change > TOL_STEADY {
        assert!(state.step < MAX_STEPS, "no steady state after {} steps", MAX_STEPS);
        let report = stepper.advance(&mut state)?;
        assert!(report.norm_rr < 1e-10);
        change = 0.0;
        for i in 0..n_dofs_u {
            change = f64::max(change, f64::abs(state.current.fluid[i] - velocity[i]));
            velocity[i] = state.current.fluid[i];
        }

        // equilibrium: no drift and no area change
        let diagnostics = stepper.diagnostics(&state);
        assert!(f64::abs(diagnostics.structure_centroid[0] - ring.center[0]) < 1e-2);
        assert!(f64::abs(diagnostics.structure_centroid[1] - ring.center[1]) < 1e-2);
        let area_change = f64::abs(diagnostics.structure_area - initial.structure_area) / initial.structure_area;
        assert!(area_change < 1e-2);
        assert!(f64::abs(diagnostics.boundary_flux) < 1e-14);
    }
    println!("steady state after {} steps (t = {})", state.step, state.time);

    // the discrete ring area (polygon) is close to the exact annulus area
    approx_eq(initial.structure_area, ring.area(), 5e-3);

    // pressure error with respect to the equilibrium solution
    let jump = f64::ln(1.0 + ring.thickness / ring.radius);
    let norms = stepper.error_norms(&state, &ring);
    println!("‖u - u_exact‖_L2 = {:e}", norms.l2_velocity);
    println!("‖p - p_exact‖_L2 = {:e} (jump = {:e})", norms.l2_pressure, jump);
    assert!(norms.l2_velocity.is_finite());
    assert!(norms.l2_pressure < 0.3 * jump);

    // pressure jump between the center and the corner (point 0) of the square
    let fluid = &stepper.assembler.fluid;
    let center = fluid_mesh
        .points
        .iter()
        .position(|point| point.coords == &[0.5, 0.5])
        .unwrap();
    let p_center = state.current.fluid[fluid.eq_pressure(center).unwrap()];
    let p_corner = state.current.fluid[fluid.eq_pressure(0).unwrap()];
    let discrete_jump = p_center - p_corner;
    println!("discrete jump = {:e}", discrete_jump);
    assert!(f64::abs(discrete_jump - jump) < 0.25 * jump);
    Ok(())
}
