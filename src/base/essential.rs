use super::Dof;
use crate::FnSpaceTime;
use std::fmt;

/// Defines a filter selecting boundary points by their coordinates
pub type FnPointFilter = fn(&[f64]) -> bool;

/// Holds one essential (Dirichlet) boundary condition on the fluid velocity
#[derive(Clone, Copy)]
pub struct EssentialBc {
    /// The velocity component
    pub dof: Dof,

    /// Selects a subset of the fluid boundary points (None means all boundary points)
    pub filter: Option<FnPointFilter>,

    /// The prescribed value as a function of (x, t)
    pub value: FnSpaceTime,
}

/// Holds essential boundary conditions
///
/// The conditions are applied to the points of the fluid boundary. Later entries
/// override earlier entries at the same point and DOF.
pub struct Essential {
    pub all: Vec<EssentialBc>,
}

impl Essential {
    /// Allocates a new instance
    pub fn new() -> Self {
        Essential { all: Vec::new() }
    }

    /// Sets essential boundary conditions at all points of the fluid boundary
    pub fn on_boundary(&mut self, dofs: &[Dof], value: FnSpaceTime) -> &mut Self {
        for dof in dofs {
            self.all.push(EssentialBc {
                dof: *dof,
                filter: None,
                value,
            });
        }
        self
    }

    /// Sets essential boundary conditions at the fluid boundary points selected by a filter
    pub fn on_boundary_where(&mut self, filter: FnPointFilter, dofs: &[Dof], value: FnSpaceTime) -> &mut Self {
        for dof in dofs {
            self.all.push(EssentialBc {
                dof: *dof,
                filter: Some(filter),
                value,
            });
        }
        self
    }

    /// Returns the homogeneous (no-slip) conditions on every velocity component
    pub fn no_slip(ndim: usize) -> Self {
        let mut essential = Essential::new();
        let dofs = if ndim == 2 {
            vec![Dof::Vx, Dof::Vy]
        } else {
            vec![Dof::Vx, Dof::Vy, Dof::Vz]
        };
        essential.on_boundary(&dofs, |_, _| 0.0);
        essential
    }
}

impl fmt::Display for Essential {
    /// Prints a formatted summary of Boundary Conditions
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Essential boundary conditions\n")?;
        write!(f, "=============================\n")?;
        for ebc in &self.all {
            let filtered = if ebc.filter.is_some() { " (filtered)" } else { "" };
            write!(f, "{:?}{} : {:?}(t=0) = {:?}\n", ebc.dof, filtered, ebc.dof, (ebc.value)(&[0.0, 0.0, 0.0], 0.0))?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Essential;
    use crate::base::Dof;

    #[test]
    fn essential_works() {
        let mut essential = Essential::new();
        essential
            .on_boundary(&[Dof::Vx, Dof::Vy], |_, _| 0.0)
            .on_boundary_where(|x| x[1] > 0.99, &[Dof::Vx], |x, t| x[0] * (1.0 - x[0]) + t);
        assert_eq!(essential.all.len(), 3);
        assert_eq!(essential.all[2].dof, Dof::Vx);
        assert_eq!((essential.all[2].filter.unwrap())(&[0.5, 1.0]), true);
        assert_eq!((essential.all[2].value)(&[0.5, 1.0], 1.0), 1.25);
        assert_eq!(
            format!("{}", essential),
            "Essential boundary conditions\n\
             =============================\n\
             Vx : Vx(t=0) = 0.0\n\
             Vy : Vy(t=0) = 0.0\n\
             Vx (filtered) : Vx(t=0) = 0.0\n"
        );
    }

    #[test]
    fn no_slip_works() {
        let essential = Essential::no_slip(2);
        assert_eq!(essential.all.len(), 2);
        let essential = Essential::no_slip(3);
        assert_eq!(essential.all.len(), 3);
        assert_eq!(essential.all[2].dof, Dof::Vz);
    }
}
