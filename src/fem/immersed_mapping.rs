use super::{CellShapes, PointGroup, PointLocator, Quadrature, SolidSpace};
use crate::base::IfemError;
use crate::StrError;
use gemlab::mesh::{Cell, Mesh};
use russell_lab::{Matrix, Vector};

/// Holds the interpolation data at the integration points of a structure cell
///
/// All quantities refer to the reference configuration; thus, they are computed once.
pub struct SolidCellData {
    /// Interpolation functions Nᵐ at each integration point
    pub nn: Vec<Vec<f64>>,

    /// Gradients ∂Nᵐ/∂X at each integration point (nnode × ndim)
    pub gg: Vec<Matrix>,

    /// Determinant of the Jacobian times the weight at each integration point
    pub jxw: Vec<f64>,

    /// Reference coordinates X at each integration point
    pub xx: Vec<Vec<f64>>,
}

impl SolidCellData {
    /// Allocates a new instance
    pub fn new(mesh: &Mesh, cell: &Cell, quad: &Quadrature) -> Result<Self, StrError> {
        let mut shapes = CellShapes::new(mesh, cell)?;
        let (ndim, nnode) = (shapes.ndim, shapes.nnode);
        let nip = quad.len();
        let mut nn = Vec::with_capacity(nip);
        let mut gg = Vec::with_capacity(nip);
        let mut jxw = Vec::with_capacity(nip);
        let mut xx = Vec::with_capacity(nip);
        for p in 0..nip {
            let ksi = &quad.points[p];
            let det = shapes.calc_gradient(ksi)?;
            if det <= 0.0 {
                return Err("the Jacobian of a structure cell must be positive");
            }
            let mut x = vec![0.0; ndim];
            shapes.calc_coords(&mut x, ksi);
            nn.push(shapes.pad.interp.as_data().to_vec());
            let mut g = Matrix::new(nnode, ndim);
            for m in 0..nnode {
                for i in 0..ndim {
                    g.set(m, i, shapes.pad.gradient.get(m, i));
                }
            }
            gg.push(g);
            jxw.push(det * quad.weights[p]);
            xx.push(x);
        }
        Ok(SolidCellData { nn, gg, jxw, xx })
    }

    /// Allocates the data for all cells of a mesh
    pub fn all(mesh: &Mesh, quad: &Quadrature) -> Result<Vec<Self>, StrError> {
        mesh.cells.iter().map(|cell| SolidCellData::new(mesh, cell, quad)).collect()
    }

    /// Returns the number of integration points
    pub fn n_points(&self) -> usize {
        self.jxw.len()
    }

    /// Computes the displacement w at an integration point
    pub fn displacement(&self, w_p: &mut [f64], p: usize, l2g: &[usize], w: &Vector) {
        let nnode = self.nn[p].len();
        for i in 0..w_p.len() {
            w_p[i] = 0.0;
            for m in 0..nnode {
                w_p[i] += self.nn[p][m] * w[l2g[i * nnode + m]];
            }
        }
    }

    /// Computes the deformation gradient F = I + ∂w/∂X at an integration point
    pub fn deformation_gradient(&self, ff: &mut Matrix, p: usize, l2g: &[usize], w: &Vector) {
        let (nnode, ndim) = self.gg[p].dims();
        for i in 0..ndim {
            for j in 0..ndim {
                let mut value = if i == j { 1.0 } else { 0.0 };
                for m in 0..nnode {
                    value += w[l2g[i * nnode + m]] * self.gg[p].get(m, j);
                }
                ff.set(i, j, value);
            }
        }
    }
}

/// Maps the structure integration points to the current configuration x = X + w(X)
///
/// In the implicit mode, w is the current iterate; hence, the owners of the points change at
/// every Newton iteration. In the semi-implicit mode, w is the displacement converged at the
/// previous time step; hence, the owners are fixed during the step.
pub struct ImmersedMapping {
    /// Uses the previous displacement instead of the current iterate
    pub semi_implicit: bool,

    /// The current positions of the integration points of each structure cell
    pub positions: Vec<Vec<Vec<f64>>>,

    /// The fluid cells owning the integration points of each structure cell
    pub owners: Vec<Vec<PointGroup>>,
}

impl ImmersedMapping {
    /// Allocates a new (empty) instance
    pub fn new(semi_implicit: bool) -> Self {
        ImmersedMapping {
            semi_implicit,
            positions: Vec::new(),
            owners: Vec::new(),
        }
    }

    /// Selects the displacement driving the mapping
    pub fn displacement<'a>(&self, current: &'a Vector, previous: &'a Vector) -> &'a Vector {
        if self.semi_implicit {
            previous
        } else {
            current
        }
    }

    /// Rebuilds the mapping in place given the displacement field
    pub fn rebuild(
        &mut self,
        locator: &mut PointLocator,
        space: &SolidSpace,
        data: &[SolidCellData],
        w: &Vector,
    ) -> Result<(), IfemError> {
        let ndim = space.ndim;
        let mut w_p = vec![0.0; ndim];
        self.positions.resize(data.len(), Vec::new());
        self.owners.resize(data.len(), Vec::new());
        for (e, cell_data) in data.iter().enumerate() {
            let l2g = &space.local_to_global[e];
            let positions = &mut self.positions[e];
            positions.resize(cell_data.n_points(), vec![0.0; ndim]);
            for p in 0..cell_data.n_points() {
                cell_data.displacement(&mut w_p, p, l2g, w);
                for i in 0..ndim {
                    positions[p][i] = cell_data.xx[p][i] + w_p[i];
                }
            }
            self.owners[e] = locator.query(positions)?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
