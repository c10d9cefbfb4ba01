use gemlab::shapes::GeoKind;
use ifem::analytical::RingWithFibers;
use ifem::prelude::*;
use structopt::StructOpt;

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(
    name = "ring_with_fibers",
    about = "Runs the ring with circumferential fibers and compares with the closed-form equilibrium"
)]
struct Options {
    /// Number of fluid cells along each side of the square
    #[structopt(long, default_value = "8")]
    n_fluid: usize,

    /// Number of structure cells around the ring
    #[structopt(long, default_value = "32")]
    n_theta: usize,

    /// Time step
    #[structopt(long, default_value = "0.1")]
    dt: f64,

    /// Final time
    #[structopt(long, default_value = "1.0")]
    t_fin: f64,

    /// Freezes the immersed mapping during each step
    #[structopt(long)]
    semi_implicit: bool,

    /// Transfers the structure stress via the spreading field
    #[structopt(long)]
    use_spread: bool,

    /// Uses a discontinuous (per-cell linear) pressure
    #[structopt(long)]
    dg_pressure: bool,

    /// Uses UMFPACK instead of the dense solver
    #[structopt(long)]
    umfpack: bool,

    /// Shows the convergence table
    #[structopt(short, long)]
    verbose: bool,

    /// Writes the diagnostics history to this JSON file
    #[structopt(long)]
    output: Option<String>,
}

fn main() -> Result<(), IfemError> {
    // parse options
    let options = Options::from_args();

    // meshes and parameters
    let ring = RingWithFibers::sample();
    let fluid_mesh = ring.fluid_mesh(GeoKind::Qua9, options.n_fluid)?;
    let solid_mesh = ring.solid_mesh(GeoKind::Qua4, 1, options.n_theta)?;
    let mut config = Config::new(ring.param(1.0, 1.0));
    config
        .set_time(options.dt, options.t_fin)?
        .set_semi_implicit(options.semi_implicit)?
        .set_use_spread(options.use_spread)?
        .set_pressure_space(if options.dg_pressure {
            PressureSpace::Discontinuous
        } else {
            PressureSpace::Continuous
        })?
        .set_lin_sol(if options.umfpack { LinSol::Umfpack } else { LinSol::Dense })?
        .set_verbose(options.verbose, options.verbose)?;
    let essential = Essential::no_slip(2);

    // run
    let mut stepper = NewtonTimeStepper::new(&config, &fluid_mesh, &solid_mesh, &essential)?;
    let mut recorder = OutputRecorder::new(false);
    let (state, reports) = stepper.run(&mut recorder)?;
    let norms = stepper.error_norms(&state, &ring);

    // results
    let iterations: usize = reports.iter().map(|r| r.iterations).sum();
    let last = recorder.diagnostics.last();
    println!("\nsteps            = {}", reports.len());
    println!("total iterations = {}", iterations);
    if let Some(d) = last {
        println!("structure area   = {:.6e} (reference = {:.6e})", d.structure_area, ring.area());
        println!("centroid         = {:?}", d.structure_centroid);
        println!("boundary flux    = {:.3e}", d.boundary_flux);
    }
    println!("‖u - u_exact‖_L2 = {:.6e}", norms.l2_velocity);
    println!("|u - u_exact|_H1 = {:.6e}", norms.h1_velocity);
    println!("‖p - p_exact‖_L2 = {:.6e}", norms.l2_pressure);
    if let Some(path) = &options.output {
        recorder.write_json(path)?;
        println!("diagnostics written to {}", path);
    }
    Ok(())
}
