use super::{LinSol, ParamImmersed, ParamStress, PressureSpace, SolidQuadrature};
use crate::{FnField, StrError};
use std::fmt;

/// Minimum allowed time step
pub const CONFIG_DT_MIN: f64 = 1e-10;

/// Minimum allowed tolerance for the residual norm
pub const CONFIG_TOL_MIN: f64 = 1e-15;

/// Holds configuration data such as material constants, policy flags, and time control
pub struct Config {
    /// Material constants of the fluid and the structure
    pub param: ParamImmersed,

    /// Time step
    pub dt: f64,

    /// Final time
    pub t_fin: f64,

    /// Number of steps between two outputs (the first step is always written)
    pub output_interval: usize,

    /// Freezes the immersed mapping at the previous converged displacement during a step
    pub semi_implicit: bool,

    /// Transfers the structure stress via the spreading (projected) field
    pub use_spread: bool,

    /// All fluid boundaries have Dirichlet velocity data
    pub all_dirichlet: bool,

    /// Prescribes the first pressure DOF to zero (instead of the mean pressure gauge)
    pub fix_pressure: bool,

    /// Interpolation of the fluid pressure
    pub pressure_space: PressureSpace,

    /// Assembles the Jacobian at every Newton iteration
    pub update_jacobian_continuously: bool,

    /// Assembles the Jacobian at the beginning of every time step
    pub update_jacobian_at_step_beginning: bool,

    /// Number of Gauss points per direction on fluid cells (None means velocity degree + 2)
    pub n_gauss_fluid: Option<usize>,

    /// Quadrature over structure cells (None means trapezoid with 4·(degree + 8) subdivisions)
    pub solid_quadrature: Option<SolidQuadrature>,

    /// Tolerance for the Euclidean norm of the residual
    pub tol_residual: f64,

    /// Residual norm above which the Jacobian is refreshed at the next iteration
    pub tol_refresh: f64,

    /// Number of non-converging iterations before a forced refresh (a retry)
    pub n_inner_iterations: usize,

    /// Maximum number of retries
    pub n_outer_retries: usize,

    /// Linear solver
    pub lin_sol: LinSol,

    /// Body force b(x,t) per component
    pub body_force: Option<FnField>,

    /// Initial fluid velocity (components 0..ndim) and pressure (component ndim)
    pub initial_fluid: Option<FnField>,

    /// Initial structure displacement
    pub initial_displacement: Option<FnField>,

    /// Shows the time steps
    pub verbose_timesteps: bool,

    /// Shows the Newton iterations
    pub verbose_iterations: bool,
}

impl Config {
    /// Allocates a new instance with default values
    pub fn new(param: ParamImmersed) -> Self {
        Config {
            param,
            dt: 0.1,
            t_fin: 1.0,
            output_interval: 1,
            semi_implicit: false,
            use_spread: false,
            all_dirichlet: true,
            fix_pressure: false,
            pressure_space: PressureSpace::Continuous,
            update_jacobian_continuously: false,
            update_jacobian_at_step_beginning: false,
            n_gauss_fluid: None,
            solid_quadrature: None,
            tol_residual: 1e-10,
            tol_refresh: 1e-2,
            n_inner_iterations: 15,
            n_outer_retries: 3,
            lin_sol: LinSol::Dense,
            body_force: None,
            initial_fluid: None,
            initial_displacement: None,
            verbose_timesteps: false,
            verbose_iterations: false,
        }
    }

    /// Sets the time step and the final time
    pub fn set_time(&mut self, dt: f64, t_fin: f64) -> Result<&mut Self, StrError> {
        if dt < CONFIG_DT_MIN {
            return Err("dt must be ≥ 1e-10");
        }
        if t_fin < 0.0 {
            return Err("t_fin must be ≥ 0.0");
        }
        self.dt = dt;
        self.t_fin = t_fin;
        Ok(self)
    }

    /// Sets the number of steps between outputs
    pub fn set_output_interval(&mut self, interval: usize) -> Result<&mut Self, StrError> {
        if interval < 1 {
            return Err("output_interval must be ≥ 1");
        }
        self.output_interval = interval;
        Ok(self)
    }

    /// Sets the semi-implicit (frozen mapping) option
    pub fn set_semi_implicit(&mut self, flag: bool) -> Result<&mut Self, StrError> {
        self.semi_implicit = flag;
        Ok(self)
    }

    /// Sets the spreading option for the structure stress
    pub fn set_use_spread(&mut self, flag: bool) -> Result<&mut Self, StrError> {
        self.use_spread = flag;
        Ok(self)
    }

    /// Sets the flag indicating that all fluid boundaries have Dirichlet velocity data
    pub fn set_all_dirichlet(&mut self, flag: bool) -> Result<&mut Self, StrError> {
        self.all_dirichlet = flag;
        Ok(self)
    }

    /// Sets the option to prescribe the first pressure DOF to zero
    pub fn set_fix_pressure(&mut self, flag: bool) -> Result<&mut Self, StrError> {
        self.fix_pressure = flag;
        Ok(self)
    }

    /// Sets the interpolation of the fluid pressure
    pub fn set_pressure_space(&mut self, space: PressureSpace) -> Result<&mut Self, StrError> {
        self.pressure_space = space;
        Ok(self)
    }

    /// Sets the Jacobian refresh policy
    pub fn set_update_jacobian(&mut self, continuously: bool, at_step_beginning: bool) -> Result<&mut Self, StrError> {
        self.update_jacobian_continuously = continuously;
        self.update_jacobian_at_step_beginning = at_step_beginning;
        Ok(self)
    }

    /// Sets the number of Gauss points per direction on fluid cells
    pub fn set_n_gauss_fluid(&mut self, n: usize) -> Result<&mut Self, StrError> {
        if n < 1 || n > 4 {
            return Err("n_gauss_fluid must be in [1, 4]");
        }
        self.n_gauss_fluid = Some(n);
        Ok(self)
    }

    /// Sets the quadrature rule over structure cells
    pub fn set_solid_quadrature(&mut self, rule: SolidQuadrature) -> Result<&mut Self, StrError> {
        match rule {
            SolidQuadrature::Gauss(n) => {
                if n < 1 || n > 4 {
                    return Err("the number of Gauss points must be in [1, 4]");
                }
            }
            SolidQuadrature::Trapezoid(n) => {
                if n < 1 {
                    return Err("the number of trapezoid subdivisions must be ≥ 1");
                }
            }
        }
        self.solid_quadrature = Some(rule);
        Ok(self)
    }

    /// Sets the tolerances of the Newton iterations
    pub fn set_tolerances(&mut self, tol_residual: f64, tol_refresh: f64) -> Result<&mut Self, StrError> {
        if tol_residual < CONFIG_TOL_MIN {
            return Err("tol_residual must be ≥ 1e-15");
        }
        if tol_refresh < tol_residual {
            return Err("tol_refresh must be ≥ tol_residual");
        }
        self.tol_residual = tol_residual;
        self.tol_refresh = tol_refresh;
        Ok(self)
    }

    /// Sets the iteration budget (inner iterations per retry and the number of retries)
    pub fn set_iteration_budget(&mut self, n_inner: usize, n_outer: usize) -> Result<&mut Self, StrError> {
        if n_inner < 1 {
            return Err("n_inner_iterations must be ≥ 1");
        }
        self.n_inner_iterations = n_inner;
        self.n_outer_retries = n_outer;
        Ok(self)
    }

    /// Sets the linear solver
    pub fn set_lin_sol(&mut self, lin_sol: LinSol) -> Result<&mut Self, StrError> {
        self.lin_sol = lin_sol;
        Ok(self)
    }

    /// Sets the body force
    pub fn set_body_force(&mut self, f: FnField) -> Result<&mut Self, StrError> {
        self.body_force = Some(f);
        Ok(self)
    }

    /// Sets the initial fluid velocity and pressure
    pub fn set_initial_fluid(&mut self, f: FnField) -> Result<&mut Self, StrError> {
        self.initial_fluid = Some(f);
        Ok(self)
    }

    /// Sets the initial structure displacement
    pub fn set_initial_displacement(&mut self, f: FnField) -> Result<&mut Self, StrError> {
        self.initial_displacement = Some(f);
        Ok(self)
    }

    /// Sets the verbose flags
    pub fn set_verbose(&mut self, timesteps: bool, iterations: bool) -> Result<&mut Self, StrError> {
        self.verbose_timesteps = timesteps;
        self.verbose_iterations = iterations;
        Ok(self)
    }

    /// Returns the number of Gauss points per direction for fluid cells of the given degree
    pub fn n_gauss_fluid(&self, degree: usize) -> usize {
        match self.n_gauss_fluid {
            Some(n) => n,
            None => usize::min(degree + 2, 4),
        }
    }

    /// Returns the quadrature rule for structure cells given the fluid velocity degree
    pub fn solid_quadrature(&self, degree: usize) -> SolidQuadrature {
        match self.solid_quadrature {
            Some(rule) => rule,
            None => SolidQuadrature::Trapezoid(4 * (degree + 8)),
        }
    }

    /// Indicates whether the mean pressure gauge replaces the equation of the first pressure DOF
    pub fn gauge_active(&self) -> bool {
        self.all_dirichlet && !self.fix_pressure
    }

    /// Validates all data
    ///
    /// Returns a message with the inconsistent data, or returns None if everything is all right.
    pub fn validate(&self) -> Option<String> {
        let p = &self.param;
        if p.rho <= 0.0 {
            return Some(format!("rho = {:?} is incorrect; it must be > 0.0", p.rho));
        }
        if p.eta <= 0.0 {
            return Some(format!("eta = {:?} is incorrect; it must be > 0.0", p.eta));
        }
        if p.phi_b <= 0.0 {
            return Some(format!("phi_b = {:?} is incorrect; it must be > 0.0", p.phi_b));
        }
        let mu = p.stress.mu();
        if mu < 0.0 {
            return Some(format!("mu = {:?} is incorrect; it must be ≥ 0.0", mu));
        }
        if let ParamStress::CircumferentialFiber { center, .. } = p.stress {
            if !center[0].is_finite() || !center[1].is_finite() {
                return Some(format!("center = {:?} is incorrect; it must be finite", center));
            }
        }
        if self.dt < CONFIG_DT_MIN {
            return Some(format!("dt = {:?} is incorrect; it must be ≥ {:e}", self.dt, CONFIG_DT_MIN));
        }
        if self.t_fin < 0.0 {
            return Some(format!("t_fin = {:?} is incorrect; it must be ≥ 0.0", self.t_fin));
        }
        if self.output_interval < 1 {
            return Some(format!(
                "output_interval = {:?} is incorrect; it must be ≥ 1",
                self.output_interval
            ));
        }
        if self.tol_residual < CONFIG_TOL_MIN {
            return Some(format!(
                "tol_residual = {:?} is incorrect; it must be ≥ {:e}",
                self.tol_residual, CONFIG_TOL_MIN
            ));
        }
        if self.tol_refresh < self.tol_residual {
            return Some(format!(
                "tol_refresh = {:?} is incorrect; it must be ≥ tol_residual = {:?}",
                self.tol_refresh, self.tol_residual
            ));
        }
        if self.n_inner_iterations < 1 {
            return Some(format!(
                "n_inner_iterations = {:?} is incorrect; it must be ≥ 1",
                self.n_inner_iterations
            ));
        }
        None // all good
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration data\n")?;
        write!(f, "==================\n")?;
        write!(f, "param = {:?}\n", self.param)?;
        write!(f, "dt = {:?}\n", self.dt)?;
        write!(f, "t_fin = {:?}\n", self.t_fin)?;
        write!(f, "output_interval = {:?}\n", self.output_interval)?;
        write!(f, "semi_implicit = {:?}\n", self.semi_implicit)?;
        write!(f, "use_spread = {:?}\n", self.use_spread)?;
        write!(f, "all_dirichlet = {:?}\n", self.all_dirichlet)?;
        write!(f, "fix_pressure = {:?}\n", self.fix_pressure)?;
        write!(f, "pressure_space = {:?}\n", self.pressure_space)?;
        write!(
            f,
            "update_jacobian_continuously = {:?}\n",
            self.update_jacobian_continuously
        )?;
        write!(
            f,
            "update_jacobian_at_step_beginning = {:?}\n",
            self.update_jacobian_at_step_beginning
        )?;
        write!(f, "n_gauss_fluid = {:?}\n", self.n_gauss_fluid)?;
        write!(f, "solid_quadrature = {:?}\n", self.solid_quadrature)?;
        write!(f, "tol_residual = {:?}\n", self.tol_residual)?;
        write!(f, "tol_refresh = {:?}\n", self.tol_refresh)?;
        write!(f, "n_inner_iterations = {:?}\n", self.n_inner_iterations)?;
        write!(f, "n_outer_retries = {:?}\n", self.n_outer_retries)?;
        write!(f, "lin_sol = {:?}\n", self.lin_sol)?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
