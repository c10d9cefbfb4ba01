use gemlab::shapes::GeoKind;
use ifem::analytical::RingWithFibers;
use ifem::fem::{AssemblyArgs, ConstraintMap, ExactSolution, ResidualJacobianAssembler};
use ifem::prelude::*;

// Discrete residual at the equilibrium of a ring with circumferential fibers
//
// TEST GOAL
//
// Verifies that the residual evaluated at the interpolant of the exact equilibrium solution
// (u = 0, w = 0, and the logarithmic pressure profile across the ring) converges with mesh
// refinement at (at least) first order, and that the exact pressure balances (most of) the
// fiber forces. The observed order between two consecutive meshes is log₂(‖R_h‖/‖R_h/2‖);
// the fiber force is a layer of width w resolved by the fluid cells only when h ≪ w, hence
// the first order is expected asymptotically and the slack covers the coarsest pair.
//
// MESH
//
// Fluid: n × n Qua9 cells over [0,1]² with n = 4, 8, and 16
// Structure: ring with 1 × 4n Qua9 cells, center (0.5,0.5), R = 0.25, w = 0.0625
//
// BOUNDARY CONDITIONS
//
// No-slip (zero velocity) on the whole fluid boundary; mean pressure gauge
//
// CONFIGURATION AND PARAMETERS
//
// Circumferential fibers with μ = 1; ρ = η = Φ_B = 1
// Default (trapezoidal) quadrature over the structure cells
// Expected order 1 with slack 0.25

/// Expected order of the residual norm
const EXPECTED_ORDER: f64 = 1.0;

/// Tolerance on the observed order
const ORDER_SLACK: f64 = 0.25;

/// Returns the Euclidean norm of the fluid residual, excluding the gauge equation
fn residual_norm(n: usize, exact_pressure: bool) -> Result<f64, IfemError> {
    let ring = RingWithFibers::sample();
    let fluid_mesh = ring.fluid_mesh(GeoKind::Qua9, n)?;
    let solid_mesh = ring.solid_mesh(GeoKind::Qua9, 1, 4 * n)?;
    let config = Config::new(ring.param(1.0, 1.0));
    let mut assembler = ResidualJacobianAssembler::new(&config, &fluid_mesh, &solid_mesh)?;
    let constraints = ConstraintMap::new(&fluid_mesh, &assembler.fluid, &Essential::no_slip(2), false, 0.0)?;

    // interpolant of the exact solution
    let mut state = assembler.new_vector();
    if exact_pressure {
        for p in 0..assembler.fluid.npoint {
            if let Some(eq) = assembler.fluid.eq_pressure(p) {
                state.fluid[eq] = ring.pressure(&fluid_mesh.points[p].coords);
            }
        }
    }
    let rate = assembler.new_vector();
    let args = AssemblyArgs {
        rate: &rate,
        state: &state,
        previous: &state,
        alpha: 0.0,
        time: 0.0,
        constraints: &constraints,
    };
    let mut rr = assembler.new_vector();
    assembler.assemble(&args, &mut rr, false)?;

    // the solid and continuity equations are satisfied exactly
    assert_eq!(rr.solid.as_data().iter().fold(0.0, |acc: f64, v| acc.max(v.abs())), 0.0);
    let gauge = assembler.enforcer.gauge.as_ref().map(|g| g.dof);
    let mut sum = 0.0;
    for i in 0..rr.fluid.dim() {
        if Some(i) != gauge {
            sum += rr.fluid[i] * rr.fluid[i];
        }
    }
    Ok(f64::sqrt(sum))
}

#[test]
fn test_ring_manufactured_residual() -> Result<(), IfemError> {
    let sizes = [4, 8, 16];
    let mut balanced = Vec::new();
    let mut unbalanced = Vec::new();
    for n in sizes {
        let with_pressure = residual_norm(n, true)?;
        let without_pressure = residual_norm(n, false)?;
        println!(
            "‖R‖ (n = {:>2}) = {:e}, without pressure = {:e}",
            n, with_pressure, without_pressure
        );
        assert!(with_pressure < 0.9 * without_pressure);
        balanced.push(with_pressure);
        unbalanced.push(without_pressure);
    }
    for k in 0..(sizes.len() - 1) {
        let order = f64::log2(balanced[k] / balanced[k + 1]);
        let order_unbalanced = f64::log2(unbalanced[k] / unbalanced[k + 1]);
        println!(
            "order (n = {:>2} → {:>2}) = {:.3}, without pressure = {:.3}",
            sizes[k],
            sizes[k + 1],
            order,
            order_unbalanced
        );
        assert!(order >= EXPECTED_ORDER - ORDER_SLACK, "order = {:?}", order);
        assert!(order > order_unbalanced);
    }
    Ok(())
}
