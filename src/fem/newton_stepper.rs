use super::{allocate_linear_solver, error_norms, structure_measure, AssemblyArgs, BlockMatrix, BlockVector};
use super::{BoundaryFlux, ConstraintMap, Diagnostics, ErrorNorms, ExactSolution, LinearSolver, OutputSink};
use super::{CellShapes, ResidualJacobianAssembler};
use crate::base::{Config, Essential, IfemError, PressureSpace};
use crate::{FnField, StrError};
use gemlab::mesh::Mesh;
use russell_lab::Vector;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Relative slack on the final time
const T_FIN_SLACK: f64 = 1e-10;

/// Holds the state of the coupled system
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GlobalState {
    /// Time
    pub time: f64,

    /// Time step index (zero is the initial state)
    pub step: usize,

    /// The current estimate ξ (converged after an accepted step)
    pub current: BlockVector,

    /// The state converged at the previous step
    pub previous: BlockVector,
}

impl GlobalState {
    /// Reads a JSON file containing the state data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let input = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(input);
        let state = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(state)
    }

    /// Writes a JSON file with the state data
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create file")?;
        serde_json::to_writer(&mut file, &self).map_err(|_| "cannot write file")?;
        Ok(())
    }
}

/// Holds the convergence statistics of an accepted step
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct StepReport {
    /// Time step index
    pub step: usize,

    /// Time at the end of the step
    pub time: f64,

    /// Number of Newton iterations (linear solves attempted)
    pub iterations: usize,

    /// Number of outer retries
    pub retries: usize,

    /// Final norm of the residual
    pub norm_rr: f64,

    /// Number of Jacobian assemblies
    pub n_jacobian_assemblies: usize,
}

/// Advances the coupled fluid-structure system in time with backward Euler and Newton iterations
///
/// The rate is the backward difference ξ′ = (ξ - ξ_prev)/dt; thus, the Jacobian is
/// ∂R/∂ξ + (1/dt) ∂R/∂ξ′. The Jacobian is refreshed (assembled) only when required by the
/// refresh policy and factorized lazily at the first linear solve that needs it.
pub struct NewtonTimeStepper {
    /// The residual and Jacobian assembler
    pub assembler: ResidualJacobianAssembler,

    /// Linear solver
    solver: Box<dyn LinearSolver>,

    /// Fluid mesh (coordinates of the boundary data and initial conditions)
    fluid_mesh: Mesh,

    /// Structure mesh (coordinates of the initial displacement)
    solid_mesh: Mesh,

    /// Essential boundary conditions
    essential: Essential,

    /// Integrates the boundary flux
    flux: BoundaryFlux,

    /// Prescribed values at the current time
    constraints: ConstraintMap,

    // policy and time control
    dt: f64,
    t_fin: f64,
    output_interval: usize,
    fix_pressure: bool,
    tol_residual: f64,
    tol_refresh: f64,
    n_inner_iterations: usize,
    n_outer_retries: usize,
    update_jacobian_continuously: bool,
    update_jacobian_at_step_beginning: bool,
    initial_fluid: Option<FnField>,
    initial_displacement: Option<FnField>,
    verbose_timesteps: bool,
    verbose_iterations: bool,

    /// Assembles the Jacobian at the next iteration
    refresh: bool,

    /// Indicates that no step has been accepted yet
    first_step: bool,

    /// The last assembled Jacobian
    jacobian: Option<BlockMatrix>,

    /// Indicates that the last assembled Jacobian has been factorized
    factorized: bool,

    // work vectors
    rate: BlockVector,
    residual: BlockVector,
    mdu: Vector,
    rhs: Vector,
}

impl NewtonTimeStepper {
    /// Allocates a new instance with the linear solver selected in the configuration
    pub fn new(config: &Config, fluid_mesh: &Mesh, solid_mesh: &Mesh, essential: &Essential) -> Result<Self, IfemError> {
        let solver = allocate_linear_solver(config.lin_sol)?;
        NewtonTimeStepper::with_solver(config, fluid_mesh, solid_mesh, essential, solver)
    }

    /// Allocates a new instance with a given linear solver
    pub fn with_solver(
        config: &Config,
        fluid_mesh: &Mesh,
        solid_mesh: &Mesh,
        essential: &Essential,
        solver: Box<dyn LinearSolver>,
    ) -> Result<Self, IfemError> {
        let assembler = ResidualJacobianAssembler::new(config, fluid_mesh, solid_mesh)?;
        let constraints = ConstraintMap::new(fluid_mesh, &assembler.fluid, essential, config.fix_pressure, 0.0)
            .map_err(|e| IfemError::Configuration(e.to_string()))?;
        let flux = BoundaryFlux::new(fluid_mesh, &assembler.fluid, config.n_gauss_fluid(assembler.fluid.degree))?;
        if config.verbose_timesteps && assembler.fluid.degree == 1 {
            println!("WARNING: linear velocity cells do not satisfy the inf-sup condition");
        }
        let rate = assembler.new_vector();
        let residual = assembler.new_vector();
        let n = rate.dim();
        Ok(NewtonTimeStepper {
            assembler,
            solver,
            fluid_mesh: fluid_mesh.clone(),
            solid_mesh: solid_mesh.clone(),
            essential: Essential {
                all: essential.all.clone(),
            },
            flux,
            constraints,
            dt: config.dt,
            t_fin: config.t_fin,
            output_interval: config.output_interval,
            fix_pressure: config.fix_pressure,
            tol_residual: config.tol_residual,
            tol_refresh: config.tol_refresh,
            n_inner_iterations: config.n_inner_iterations,
            n_outer_retries: config.n_outer_retries,
            update_jacobian_continuously: config.update_jacobian_continuously,
            update_jacobian_at_step_beginning: config.update_jacobian_at_step_beginning,
            initial_fluid: config.initial_fluid,
            initial_displacement: config.initial_displacement,
            verbose_timesteps: config.verbose_timesteps,
            verbose_iterations: config.verbose_iterations,
            refresh: true,
            first_step: true,
            jacobian: None,
            factorized: false,
            rate,
            residual,
            mdu: Vector::new(n),
            rhs: Vector::new(n),
        })
    }

    /// Returns the state at t = 0
    ///
    /// The fields are the nodal interpolants of the initial conditions (zero if absent)
    /// and the Dirichlet data at t = 0 overrides the fluid values. A discontinuous pressure
    /// takes the value at the cell center and the central differences along each reference
    /// direction.
    pub fn initial_state(&self) -> Result<GlobalState, IfemError> {
        let fluid = &self.assembler.fluid;
        let solid = &self.assembler.solid;
        let ndim = fluid.ndim;
        let mut current = self.assembler.new_vector();
        if let Some(f) = self.initial_fluid {
            for p in 0..fluid.npoint {
                let x = &self.fluid_mesh.points[p].coords;
                for c in 0..ndim {
                    current.fluid[fluid.eq_velocity(p, c)] = f(x, 0.0, c);
                }
                if let Some(eq) = fluid.eq_pressure(p) {
                    current.fluid[eq] = f(x, 0.0, ndim);
                }
            }
            if fluid.pressure_space == PressureSpace::Discontinuous {
                let mut x = vec![0.0; ndim];
                let mut ksi = vec![0.0; ndim];
                for (e, cell) in self.fluid_mesh.cells.iter().enumerate() {
                    let mut corners = CellShapes::corners(&self.fluid_mesh, cell)?;
                    corners.calc_coords(&mut x, &ksi);
                    current.fluid[fluid.eq_pressure_local(e, 0)] = f(&x, 0.0, ndim);
                    for m in 1..fluid.nnode_p {
                        ksi[m - 1] = 1.0;
                        corners.calc_coords(&mut x, &ksi);
                        let plus = f(&x, 0.0, ndim);
                        ksi[m - 1] = -1.0;
                        corners.calc_coords(&mut x, &ksi);
                        let minus = f(&x, 0.0, ndim);
                        ksi[m - 1] = 0.0;
                        current.fluid[fluid.eq_pressure_local(e, m)] = (plus - minus) / 2.0;
                    }
                }
            }
        }
        if let Some(f) = self.initial_displacement {
            for p in 0..solid.npoint {
                let x = &self.solid_mesh.points[p].coords;
                for c in 0..ndim {
                    current.solid[solid.eq(p, c)] = f(x, 0.0, c);
                }
            }
        }
        let constraints = ConstraintMap::new(&self.fluid_mesh, fluid, &self.essential, self.fix_pressure, 0.0)?;
        constraints.apply_to(&mut current.fluid);
        Ok(GlobalState {
            time: 0.0,
            step: 0,
            previous: current.clone(),
            current,
        })
    }

    /// Computes the diagnostics of a state
    pub fn diagnostics(&self, state: &GlobalState) -> Diagnostics {
        let (area, centroid) = structure_measure(
            &self.assembler.solid_data,
            &self.assembler.solid,
            &state.current.solid,
        );
        Diagnostics {
            step: state.step,
            time: state.time,
            boundary_flux: self.flux.calculate(&state.current.fluid),
            structure_area: area,
            structure_centroid: centroid,
        }
    }

    /// Computes the error norms of the fluid fields with respect to an exact solution
    pub fn error_norms(&self, state: &GlobalState, exact: &dyn ExactSolution) -> ErrorNorms {
        error_norms(
            &self.assembler.fluid_data,
            &self.assembler.fluid,
            &state.current.fluid,
            exact,
        )
    }

    /// Runs the simulation from t = 0 to t_fin
    ///
    /// The initial state and the accepted states at the output interval are pushed to the sink.
    /// Returns the final state and the reports of all steps.
    pub fn run(&mut self, sink: &mut dyn OutputSink) -> Result<(GlobalState, Vec<StepReport>), IfemError> {
        let mut state = self.initial_state()?;
        sink.push(&state, &self.diagnostics(&state))?;
        self.print_header();
        let mut reports = Vec::new();
        loop {
            let t_next = ((state.step + 1) as f64) * self.dt;
            if t_next > self.t_fin + T_FIN_SLACK * self.dt {
                break;
            }
            let report = match self.advance(&mut state) {
                Ok(report) => report,
                Err(e) => {
                    self.print_footer();
                    return Err(e);
                }
            };
            if state.step == 1 || state.step % self.output_interval == 0 {
                sink.push(&state, &self.diagnostics(&state))?;
            }
            reports.push(report);
        }
        self.print_footer();
        Ok((state, reports))
    }

    /// Advances the state by one time step
    ///
    /// On failure, the state is restored to the last accepted step.
    pub fn advance(&mut self, state: &mut GlobalState) -> Result<StepReport, IfemError> {
        let (t_old, step_old) = (state.time, state.step);
        state.step += 1;
        state.time = (state.step as f64) * self.dt;
        match self.iterate(state) {
            Ok(report) => Ok(report),
            Err(e) => {
                state.current.set(&state.previous);
                state.time = t_old;
                state.step = step_old;
                self.refresh = true;
                Err(e)
            }
        }
    }

    /// Runs the Newton iterations of one step
    fn iterate(&mut self, state: &mut GlobalState) -> Result<StepReport, IfemError> {
        let time = state.time;
        self.print_timestep(state.step, time);

        // boundary data and warm start
        self.constraints = ConstraintMap::new(
            &self.fluid_mesh,
            &self.assembler.fluid,
            &self.essential,
            self.fix_pressure,
            time,
        )?;
        state.current.set(&state.previous);
        self.constraints.apply_to(&mut state.current.fluid);
        if self.first_step || self.update_jacobian_at_step_beginning {
            self.refresh = true;
        }

        let mut iterations = 0;
        let mut inner = 0;
        let mut retries = 0;
        let mut n_jacobian_assemblies = 0;
        loop {
            // residual (and Jacobian)
            self.rate.set_rate(&state.current, &state.previous, self.dt);
            let with_jacobian = self.refresh;
            let args = AssemblyArgs {
                rate: &self.rate,
                state: &state.current,
                previous: &state.previous,
                alpha: if with_jacobian { 1.0 / self.dt } else { 0.0 },
                time,
                constraints: &self.constraints,
            };
            let jacobian = self.assembler.assemble(&args, &mut self.residual, with_jacobian)?;
            if with_jacobian {
                self.jacobian = jacobian;
                self.factorized = false;
                n_jacobian_assemblies += 1;
                self.refresh = self.update_jacobian_continuously;
            }
            let norm_rr = self.residual.norm();
            self.print_iteration(iterations, retries, norm_rr, with_jacobian);

            // convergence
            if norm_rr < self.tol_residual {
                state.previous.set(&state.current);
                self.first_step = false;
                self.refresh = self.update_jacobian_continuously;
                return Ok(StepReport {
                    step: state.step,
                    time,
                    iterations,
                    retries,
                    norm_rr,
                    n_jacobian_assemblies,
                });
            }

            // update
            match self.solve() {
                Ok(()) => {
                    state.current.add_concatenated(&self.mdu);
                    if norm_rr > self.tol_refresh {
                        self.refresh = true;
                    }
                }
                Err(IfemError::SingularSystem(message)) => {
                    if self.verbose_iterations {
                        println!("{:>8} {}", "·", message);
                    }
                    self.refresh = true;
                }
                Err(e) => return Err(e),
            }
            iterations += 1;
            inner += 1;

            // budget
            if inner == self.n_inner_iterations {
                inner = 0;
                retries += 1;
                self.refresh = true;
                if retries > self.n_outer_retries {
                    return Err(IfemError::Nonconvergence {
                        time,
                        iterations,
                        retries,
                        norm_rr,
                    });
                }
            }
        }
    }

    /// Solves J δ = -R (factorizing the last assembled Jacobian if needed)
    fn solve(&mut self) -> Result<(), IfemError> {
        if !self.factorized {
            match &self.jacobian {
                Some(jj) => self.solver.factorize(jj)?,
                None => {
                    return Err(IfemError::SingularSystem(
                        "the Jacobian matrix is not available".to_string(),
                    ))
                }
            }
            self.factorized = true;
        }
        self.residual.to_concatenated(&mut self.rhs, -1.0);
        self.solver.solve(&mut self.mdu, &self.rhs)
    }

    /// Prints the header of the convergence table
    fn print_header(&self) {
        if self.verbose_timesteps || self.verbose_iterations {
            println!("\nIFEM === TIME STEPPING AND CONVERGENCE STATISTICS =============================");
            println!("\nLegend:");
            println!("✅ ─ converged");
            println!("🔹 ─ converging");
            println!("🔄 ─ Jacobian refreshed");
            println!("\"iter\" means iteration\n");
            println!("{}", "─".repeat(56));
            println!("{:8} {:>11} {:>5} {:>5} {:>9}", "timestep", "t", "iter", "retry", "‖R‖₂");
            println!("{}", "─".repeat(56));
        }
    }

    /// Prints timestep information
    fn print_timestep(&self, step: usize, time: f64) {
        if self.verbose_timesteps {
            println!("{:>8} {:>11.6e}", step, time);
        }
    }

    /// Prints iteration information
    fn print_iteration(&self, iteration: usize, retry: usize, norm_rr: f64, refreshed: bool) {
        if self.verbose_iterations {
            let icon = if norm_rr < self.tol_residual { "✅" } else { "🔹" };
            let refresh = if refreshed { "🔄" } else { "" };
            println!(
                "{:>8} {:>11} {:>5} {:>5} {:>9.2e} {} {}",
                "·", "·", iteration, retry, norm_rr, icon, refresh
            );
        }
    }

    /// Prints the horizontal line at the end of the analysis
    fn print_footer(&self) {
        if self.verbose_timesteps || self.verbose_iterations {
            println!("{}", "─".repeat(56));
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{GlobalState, NewtonTimeStepper};
    use crate::base::{Config, Dof, Essential, IfemError, ParamImmersed, PressureSpace, SampleMeshes};
    use crate::fem::{BlockMatrix, BlockVector, LinearSolver, OutputRecorder};
    use gemlab::shapes::GeoKind;
    use russell_lab::{approx_eq, Vector};

    struct FailingSolver;

    impl LinearSolver for FailingSolver {
        fn factorize(&mut self, _jacobian: &BlockMatrix) -> Result<(), IfemError> {
            Err(IfemError::SingularSystem("always failing".to_string()))
        }
        fn solve(&mut self, _x: &mut Vector, _rhs: &Vector) -> Result<(), IfemError> {
            Err(IfemError::SingularSystem("always failing".to_string()))
        }
    }

    #[test]
    fn global_state_json_works() {
        let mut state = GlobalState {
            time: 0.25,
            step: 2,
            current: BlockVector::new(2, 1),
            previous: BlockVector::new(2, 1),
        };
        state.current.fluid[1] = 3.0;
        let path = "/tmp/ifem/test_global_state_json_works.json";
        state.write_json(path).unwrap();
        let read = GlobalState::read_json(path).unwrap();
        assert_eq!(read.step, 2);
        assert_eq!(read.time, 0.25);
        assert_eq!(read.current.fluid.as_data(), &[0.0, 3.0]);
        assert_eq!(GlobalState::read_json("/tmp/ifem/__not_found__.json").err(), Some("cannot open file"));
    }

    #[test]
    fn initial_state_works() {
        let fluid = SampleMeshes::rectangle(GeoKind::Qua9, 2, 2, 0.0, 1.0, 0.0, 1.0).unwrap();
        let solid = SampleMeshes::rectangle(GeoKind::Qua4, 1, 1, 0.3, 0.7, 0.3, 0.7).unwrap();
        let mut config = Config::new(ParamImmersed::sample());
        config
            .set_initial_fluid(|x, _, c| if c == 2 { 5.0 } else { x[0] + 1.0 })
            .unwrap()
            .set_initial_displacement(|x, _, c| if c == 0 { 0.1 * x[1] } else { 0.0 })
            .unwrap();
        let mut essential = Essential::new();
        essential.on_boundary_where(|x| x[1] < 1e-10, &[Dof::Vx], |_, _| -1.0);
        let stepper = NewtonTimeStepper::new(&config, &fluid, &solid, &essential).unwrap();
        let state = stepper.initial_state().unwrap();
        let space = &stepper.assembler.fluid;
        assert_eq!(state.step, 0);
        assert_eq!(state.current.fluid[space.eq_velocity(0, 0)], -1.0); // prescribed
        assert_eq!(state.current.fluid[space.eq_velocity(0, 1)], 1.0);
        assert_eq!(state.current.fluid[space.eq_velocity(12, 0)], 1.5);
        assert_eq!(state.current.fluid[space.eq_pressure(12).unwrap()], 5.0);
        approx_eq(state.current.solid[stepper.assembler.solid.eq(3, 0)], 0.07, 1e-15);
        assert_eq!(state.previous.solid.as_data(), state.current.solid.as_data());
        let diagnostics = stepper.diagnostics(&state);
        assert_eq!(diagnostics.step, 0);
        approx_eq(diagnostics.structure_area, 0.16, 1e-14);
    }

    #[test]
    fn initial_state_works_discontinuous_pressure() {
        let fluid = SampleMeshes::rectangle(GeoKind::Qua9, 2, 2, 0.0, 1.0, 0.0, 1.0).unwrap();
        let solid = SampleMeshes::rectangle(GeoKind::Qua4, 1, 1, 0.3, 0.7, 0.3, 0.7).unwrap();
        let mut config = Config::new(ParamImmersed::sample());
        config
            .set_pressure_space(PressureSpace::Discontinuous)
            .unwrap()
            .set_initial_fluid(|x, _, c| if c == 2 { 1.0 + 2.0 * x[0] - x[1] } else { 0.0 })
            .unwrap();
        let stepper = NewtonTimeStepper::new(&config, &fluid, &solid, &Essential::no_slip(2)).unwrap();
        let state = stepper.initial_state().unwrap();
        let space = &stepper.assembler.fluid;
        assert_eq!(space.n_dofs_p, 12);
        // cell 0 spans [0,0.5]²: x = 0.25 + 0.25 ξ₀ and y = 0.25 + 0.25 ξ₁
        approx_eq(state.current.fluid[space.eq_pressure_local(0, 0)], 1.25, 1e-15);
        approx_eq(state.current.fluid[space.eq_pressure_local(0, 1)], 0.5, 1e-15);
        approx_eq(state.current.fluid[space.eq_pressure_local(0, 2)], -0.25, 1e-15);
        // cell 3 spans [0.5,1]²
        approx_eq(state.current.fluid[space.eq_pressure_local(3, 0)], 1.75, 1e-15);
    }

    #[test]
    fn failures_restore_the_state() {
        let fluid = SampleMeshes::rectangle(GeoKind::Qua9, 1, 1, 0.0, 1.0, 0.0, 1.0).unwrap();
        let solid = SampleMeshes::rectangle(GeoKind::Qua4, 1, 1, 0.25, 0.75, 0.25, 0.75).unwrap();
        let mut config = Config::new(ParamImmersed::sample());
        config
            .set_body_force(|_, _, c| if c == 0 { 1.0 } else { 0.0 })
            .unwrap()
            .set_iteration_budget(2, 1)
            .unwrap();
        let essential = Essential::no_slip(2);
        let solver = Box::new(FailingSolver);
        let mut stepper = NewtonTimeStepper::with_solver(&config, &fluid, &solid, &essential, solver).unwrap();
        let mut state = stepper.initial_state().unwrap();
        let err = stepper.advance(&mut state).err().unwrap();
        match err {
            IfemError::Nonconvergence {
                iterations, retries, ..
            } => {
                assert_eq!(iterations, 4);
                assert_eq!(retries, 2);
            }
            _ => panic!("Nonconvergence expected"),
        }
        assert_eq!(state.step, 0);
        assert_eq!(state.time, 0.0);

        let mut recorder = OutputRecorder::new(false);
        assert!(stepper.run(&mut recorder).is_err());
        assert_eq!(recorder.diagnostics.len(), 1); // only the initial state
    }
}
